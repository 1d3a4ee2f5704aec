use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::Value;
use slotstore::store::User;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print a successful gateway body.
pub fn print_body(body: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if !body.is_null() {
                println!("{body}");
            }
        }
        OutputFormat::Pretty => {
            if !body.is_null() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
                );
            }
        }
        OutputFormat::Table => print_table(body),
    }
}

fn print_table(body: &Value) {
    let users: Vec<User> = match body {
        Value::Array(_) => serde_json::from_value(body.clone()).unwrap_or_default(),
        Value::Object(_) => serde_json::from_value(body.clone()).map(|u| vec![u]).unwrap_or_default(),
        _ => Vec::new(),
    };
    if users.is_empty() && !body.is_array() {
        if !body.is_null() {
            println!("{body}");
        }
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "USERNAME", "AGE", "HOBBIES"]);
    for user in &users {
        table.add_row(vec![
            user.id.clone(),
            user.username.clone(),
            user.age.to_string(),
            user.hobbies.join(", "),
        ]);
    }
    println!("{table}");
}
