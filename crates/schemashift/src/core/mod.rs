//! Core abstractions shared by every dialect and driver.
//!
//! - [`identifier`]: identifier validation, quoting and SQL template rendering
//! - [`schema`]: column, key and index descriptions used by migrations
//! - [`value`]: SQL values exchanged with drivers

pub mod identifier;
pub mod schema;
pub mod value;

pub use identifier::{
    validate_check_expression, validate_identifier, FormatArg, IdentifierFormatter, QuoteStyle,
    SchemaQualifiedName,
};
pub use schema::{
    Column, ColumnProperty, ColumnType, DbType, ForeignKey, ForeignKeyAction, ForeignKeyEvent,
    Index,
};
pub use value::{Row, SqlValue};
