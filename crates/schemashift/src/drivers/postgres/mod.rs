//! PostgreSQL driver.
//!
//! - [`dialect()`]: dialect data (quoting, types, catalog queries)
//! - [`PostgresConnection`]: `tokio-postgres` connection

pub mod dialect;

#[cfg(feature = "postgres")]
mod connection;

pub use dialect::{dialect, NAME};

#[cfg(feature = "postgres")]
pub use connection::PostgresConnection;
