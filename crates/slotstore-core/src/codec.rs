//! User record ⇄ fixed-width slot bytes.
//!
//! Slot layout: UTF-8 JSON of the record, then zero bytes up to the slot
//! width. At least one zero byte always terminates the JSON, so a record can
//! use at most `width - 1` bytes. JSON escapes NUL inside strings, so the
//! first zero byte is always the terminator.

use crate::error::Result;
use crate::record::User;

/// Serialize `user` into `slot`, zero-padding the remainder.
///
/// Returns the length of the full serialized form. When that exceeds
/// `slot.len() - 1` the bytes are cut at `slot.len() - 1` without error; the
/// slot then holds a prefix that will not decode. Callers compare the return
/// value with the slot width to notice.
pub fn encode_slot_into(user: &User, slot: &mut [u8]) -> Result<usize> {
    let json = serde_json::to_vec(user)?;
    let keep = json.len().min(slot.len().saturating_sub(1));
    slot[..keep].copy_from_slice(&json[..keep]);
    slot[keep..].fill(0);
    Ok(json.len())
}

/// Serialize `user` into a freshly allocated slot of `width` bytes.
pub fn encode_slot(user: &User, width: usize) -> Result<Vec<u8>> {
    let mut slot = vec![0u8; width];
    encode_slot_into(user, &mut slot)?;
    Ok(slot)
}

/// Parse the record stored in `slot`.
///
/// `None` covers both an empty slot and bytes that do not parse as a user
/// (truncated, torn by a concurrent writer, or garbage); the two cases are
/// not distinguished.
pub fn decode_slot(slot: &[u8]) -> Option<User> {
    let end = slot.iter().position(|b| *b == 0).unwrap_or(slot.len());
    if end == 0 {
        return None;
    }
    serde_json::from_slice(&slot[..end]).ok()
}
