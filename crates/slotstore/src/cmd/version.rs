use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("slotstore {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: slotstore");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("relay_protocol: {}", slotstore::relay::PROTOCOL_VERSION);
    println!(
        "store_defaults: capacity={}, slot_width={}",
        slotstore::store::DEFAULT_CAPACITY,
        slotstore::store::DEFAULT_SLOT_WIDTH
    );

    Ok(SUCCESS)
}
