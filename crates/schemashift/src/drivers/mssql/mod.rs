//! Microsoft SQL Server driver.
//!
//! - [`dialect()`]: dialect data (bracket quoting, `sp_rename`, `GO` batches)
//! - [`MssqlConnection`]: `tiberius` connection over a tokio TCP stream

pub mod dialect;

#[cfg(feature = "mssql")]
mod connection;

pub use dialect::{dialect, NAME};

#[cfg(feature = "mssql")]
pub use connection::MssqlConnection;
