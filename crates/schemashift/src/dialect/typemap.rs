//! Capacity-ordered mapping from abstract column types to dialect SQL types.
//!
//! Each base type owns an ordered list of bounded entries plus an optional
//! unbounded default:
//!
//! ```rust,ignore
//! let types = TypeMapBuilder::new("sqlserver")
//!     .put(DbType::AnsiString, Some(8000), "varchar($l)", None)
//!     .put(DbType::AnsiString, None, "varchar(max)", None)
//!     .build();
//!
//! types.resolve(&ColumnType::new(DbType::AnsiString).with_length(50))?; // varchar(50)
//! types.resolve(&ColumnType::new(DbType::AnsiString))?;                // varchar(max)
//! ```
//!
//! Templates may use `$l` for the length and `$s` for the scale. A bounded
//! entry with capacity `c` accepts every length `<= c`; the smallest accepting
//! entry wins.

use std::collections::HashMap;

use crate::core::schema::{ColumnType, DbType};
use crate::error::{MigrateError, Result};

#[derive(Debug, Clone)]
struct TypeTemplate {
    template: String,
    default_scale: Option<u32>,
}

impl TypeTemplate {
    fn render(&self, length: Option<u32>, scale: Option<u32>) -> String {
        let mut sql = self.template.clone();
        if let Some(length) = length {
            sql = sql.replace("$l", &length.to_string());
        }
        if sql.contains("$s") {
            let scale = scale.or(self.default_scale).unwrap_or(0);
            sql = sql.replace("$s", &scale.to_string());
        }
        sql
    }
}

#[derive(Debug, Clone, Default)]
struct TypeSlot {
    /// Sorted by capacity, ascending.
    bounded: Vec<(u32, TypeTemplate)>,
    unbounded: Option<TypeTemplate>,
}

/// Immutable type map of one dialect.
#[derive(Debug, Clone)]
pub struct TypeMap {
    dialect: String,
    slots: HashMap<DbType, TypeSlot>,
}

impl TypeMap {
    /// Resolve a column type to the dialect's SQL type.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::UnsupportedType` when the base type is not
    /// registered, or the length exceeds every bounded entry and no
    /// unbounded default exists.
    pub fn resolve(&self, column_type: &ColumnType) -> Result<String> {
        let unsupported = || MigrateError::UnsupportedType {
            dialect: self.dialect.clone(),
            db_type: column_type.db_type.to_string(),
            length: column_type.length,
        };

        let slot = self.slots.get(&column_type.db_type).ok_or_else(unsupported)?;

        if let Some(length) = column_type.length {
            if let Some((_, entry)) = slot.bounded.iter().find(|(capacity, _)| length <= *capacity) {
                return Ok(entry.render(Some(length), column_type.scale));
            }
        }

        slot.unbounded
            .as_ref()
            .map(|entry| entry.render(column_type.length, column_type.scale))
            .ok_or_else(unsupported)
    }

    /// True when the base type has at least one entry.
    pub fn supports(&self, db_type: DbType) -> bool {
        self.slots.contains_key(&db_type)
    }
}

/// Builder for [`TypeMap`].
#[derive(Debug, Clone)]
pub struct TypeMapBuilder {
    dialect: String,
    slots: HashMap<DbType, TypeSlot>,
}

impl TypeMapBuilder {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            slots: HashMap::new(),
        }
    }

    /// Register a template.
    ///
    /// `max_length = None` sets the unbounded default of the base type;
    /// `Some(capacity)` adds a bounded entry. Registering the same capacity
    /// twice replaces the earlier template.
    pub fn put(
        mut self,
        db_type: DbType,
        max_length: Option<u32>,
        template: impl Into<String>,
        default_scale: Option<u32>,
    ) -> Self {
        let entry = TypeTemplate {
            template: template.into(),
            default_scale,
        };
        let slot = self.slots.entry(db_type).or_default();
        match max_length {
            None => slot.unbounded = Some(entry),
            Some(capacity) => {
                slot.bounded.retain(|(c, _)| *c != capacity);
                let position = slot
                    .bounded
                    .iter()
                    .position(|(c, _)| *c > capacity)
                    .unwrap_or(slot.bounded.len());
                slot.bounded.insert(position, (capacity, entry));
            }
        }
        self
    }

    /// Shorthand for an unbounded default without scale.
    pub fn unbounded(self, db_type: DbType, template: impl Into<String>) -> Self {
        self.put(db_type, None, template, None)
    }

    /// Shorthand for a bounded entry without scale.
    pub fn sized(self, db_type: DbType, capacity: u32, template: impl Into<String>) -> Self {
        self.put(db_type, Some(capacity), template, None)
    }

    pub fn build(self) -> TypeMap {
        TypeMap {
            dialect: self.dialect,
            slots: self.slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(with_default: bool) -> TypeMap {
        let mut builder = TypeMapBuilder::new("test")
            .sized(DbType::AnsiString, 2000, "varchar2($l)")
            .sized(DbType::AnsiString, 255, "varchar($l)")
            .put(DbType::Decimal, Some(38), "decimal($l, $s)", Some(2))
            .unbounded(DbType::Decimal, "decimal");
        if with_default {
            builder = builder.unbounded(DbType::AnsiString, "clob");
        }
        builder.build()
    }

    fn ansi(length: u32) -> ColumnType {
        ColumnType::new(DbType::AnsiString).with_length(length)
    }

    #[test]
    fn test_capacity_boundary() {
        let types = sample(true);
        assert_eq!(types.resolve(&ansi(255)).unwrap(), "varchar(255)");
        assert_eq!(types.resolve(&ansi(256)).unwrap(), "varchar2(256)");
        assert_eq!(types.resolve(&ansi(2000)).unwrap(), "varchar2(2000)");
        assert_eq!(types.resolve(&ansi(2001)).unwrap(), "clob");
    }

    #[test]
    fn test_overflow_without_default_is_unsupported() {
        let types = sample(false);
        let err = types.resolve(&ansi(2001)).unwrap_err();
        match err {
            MigrateError::UnsupportedType {
                dialect,
                db_type,
                length,
            } => {
                assert_eq!(dialect, "test");
                assert_eq!(db_type, "AnsiString");
                assert_eq!(length, Some(2001));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_no_length_uses_default() {
        let types = sample(true);
        assert_eq!(
            types.resolve(&ColumnType::new(DbType::AnsiString)).unwrap(),
            "clob"
        );
        assert!(sample(false)
            .resolve(&ColumnType::new(DbType::AnsiString))
            .is_err());
    }

    #[test]
    fn test_scale_substitution() {
        let types = sample(true);
        let explicit = ColumnType::new(DbType::Decimal).with_length(10).with_scale(4);
        let implicit = ColumnType::new(DbType::Decimal).with_length(10);
        assert_eq!(types.resolve(&explicit).unwrap(), "decimal(10, 4)");
        assert_eq!(types.resolve(&implicit).unwrap(), "decimal(10, 2)");
        assert_eq!(
            types.resolve(&ColumnType::new(DbType::Decimal)).unwrap(),
            "decimal"
        );
    }

    #[test]
    fn test_unregistered_type() {
        let types = sample(true);
        assert!(!types.supports(DbType::Xml));
        assert!(types.resolve(&ColumnType::new(DbType::Xml)).is_err());
    }

    #[test]
    fn test_same_capacity_replaces() {
        let types = TypeMapBuilder::new("test")
            .sized(DbType::Binary, 8000, "binary($l)")
            .sized(DbType::Binary, 8000, "varbinary($l)")
            .build();
        assert_eq!(
            types
                .resolve(&ColumnType::new(DbType::Binary).with_length(16))
                .unwrap(),
            "varbinary(16)"
        );
    }
}
