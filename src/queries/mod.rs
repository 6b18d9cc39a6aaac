//! Query modules for the catalog.
//!
//! Each module provides a query struct that borrows the
//! [`RecordStore`](crate::store::RecordStore) and exposes typed reads and
//! writes for one collection, returning `Result<T>`.

pub mod coins;
pub mod settings;
pub mod wishlist;

pub use coins::CoinQuery;
pub use settings::SettingsQuery;
pub use wishlist::WishlistQuery;
