//! SQLite driver.
//!
//! Used for local development and for the crate's own integration tests,
//! which run against `sqlite::memory:`.

pub mod dialect;

#[cfg(feature = "sqlite")]
mod connection;

pub use dialect::{dialect, NAME};

#[cfg(feature = "sqlite")]
pub use connection::SqliteConnection;
