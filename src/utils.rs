//! Shared helpers and constants.

use chrono::Utc;

pub const APP_NAME: &str = "casagram";

/// RFC 3339 UTC timestamp. All row timestamps are generated through this so
/// that lexicographic comparison agrees with chronological order.
pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
