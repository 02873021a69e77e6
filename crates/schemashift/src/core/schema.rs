//! Schema object descriptions used by migrations.
//!
//! These types describe what a migration wants to create (columns, keys,
//! indexes) in database-agnostic terms. The dialect maps turn them into SQL.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use super::identifier::SchemaQualifiedName;
use super::value::SqlValue;

/// Abstract column base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    String,
    StringFixedLength,
    Binary,
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    Currency,
    Date,
    DateTime,
    DateTimeOffset,
    Time,
    Guid,
    Xml,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Base type plus optional length and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub db_type: DbType,
    pub length: Option<u32>,
    pub scale: Option<u32>,
}

impl ColumnType {
    pub fn new(db_type: DbType) -> Self {
        Self {
            db_type,
            length: None,
            scale: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}

impl From<DbType> for ColumnType {
    fn from(db_type: DbType) -> Self {
        Self::new(db_type)
    }
}

/// Set of column property flags.
///
/// Single flags double as keys into a dialect's property map.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ColumnProperty(u16);

impl ColumnProperty {
    pub const NONE: Self = Self(0);
    pub const NULL: Self = Self(1);
    pub const NOT_NULL: Self = Self(1 << 1);
    pub const IDENTITY: Self = Self(1 << 2);
    pub const UNIQUE: Self = Self(1 << 3);
    pub const INDEXED: Self = Self(1 << 4);
    pub const UNSIGNED: Self = Self(1 << 5);
    pub const FOREIGN_KEY: Self = Self(1 << 6);
    pub const PRIMARY_KEY: Self = Self(1 << 7);
    pub const PRIMARY_KEY_WITH_IDENTITY: Self = Self(Self::PRIMARY_KEY.0 | Self::IDENTITY.0);

    const NAMES: [(Self, &'static str); 8] = [
        (Self::NULL, "Null"),
        (Self::NOT_NULL, "NotNull"),
        (Self::IDENTITY, "Identity"),
        (Self::UNIQUE, "Unique"),
        (Self::INDEXED, "Indexed"),
        (Self::UNSIGNED, "Unsigned"),
        (Self::FOREIGN_KEY, "ForeignKey"),
        (Self::PRIMARY_KEY, "PrimaryKey"),
    ];

    /// True when every flag in `other` is set.
    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ColumnProperty {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ColumnProperty {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ColumnProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub properties: ColumnProperty,
    #[serde(default)]
    pub default_value: Option<SqlValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            properties: ColumnProperty::NONE,
            default_value: None,
        }
    }

    pub fn with_properties(mut self, properties: ColumnProperty) -> Self {
        self.properties |= properties;
        self
    }

    pub fn with_default(mut self, value: impl Into<SqlValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn has(&self, property: ColumnProperty) -> bool {
        self.properties.contains(property)
    }

    pub fn is_primary_key(&self) -> bool {
        self.has(ColumnProperty::PRIMARY_KEY)
    }

    pub fn is_identity(&self) -> bool {
        self.has(ColumnProperty::IDENTITY)
    }
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

/// Which referential event an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKeyEvent {
    Delete,
    Update,
}

impl ForeignKeyEvent {
    pub fn keyword(self) -> &'static str {
        match self {
            ForeignKeyEvent::Delete => "ON DELETE",
            ForeignKeyEvent::Update => "ON UPDATE",
        }
    }
}

/// Foreign key constraint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing table.
    pub table: SchemaQualifiedName,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub ref_table: SchemaQualifiedName,
    /// Referenced columns.
    pub ref_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<SchemaQualifiedName>,
        columns: &[&str],
        ref_table: impl Into<SchemaQualifiedName>,
        ref_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.iter().map(|c| c.to_string()).collect(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub table: SchemaQualifiedName,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, table: impl Into<SchemaQualifiedName>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_with_identity_contains_both() {
        let props = ColumnProperty::PRIMARY_KEY_WITH_IDENTITY;
        assert!(props.contains(ColumnProperty::PRIMARY_KEY));
        assert!(props.contains(ColumnProperty::IDENTITY));
        assert!(!props.contains(ColumnProperty::NOT_NULL));
    }

    #[test]
    fn test_none_contains_nothing() {
        assert!(!ColumnProperty::NONE.contains(ColumnProperty::NONE));
        assert!(ColumnProperty::NONE.is_empty());
    }

    #[test]
    fn test_property_debug_lists_flags() {
        let props = ColumnProperty::NOT_NULL | ColumnProperty::UNIQUE;
        assert_eq!(format!("{:?}", props), "NotNull | Unique");
        assert_eq!(format!("{:?}", ColumnProperty::NONE), "None");
    }

    #[test]
    fn test_column_builder() {
        let column = Column::new("id", DbType::Int64)
            .with_properties(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY)
            .with_default(0i64);
        assert!(column.is_primary_key());
        assert!(column.is_identity());
        assert_eq!(column.default_value, Some(SqlValue::Int(0)));
    }
}
