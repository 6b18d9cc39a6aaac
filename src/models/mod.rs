pub mod coin;
pub mod valuation;
pub mod wishlist;

pub use coin::*;
pub use valuation::*;
pub use wishlist::*;

/// Current UTC time as an ISO-8601 string with millisecond precision
/// (`2024-01-15T09:30:00.000Z`), the format every stored timestamp uses.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Fresh random record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
