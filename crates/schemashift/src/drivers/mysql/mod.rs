//! MySQL/MariaDB driver.

pub mod dialect;

#[cfg(feature = "mysql")]
mod connection;

pub use dialect::{dialect, NAME};

#[cfg(feature = "mysql")]
pub use connection::MysqlConnection;
