//! SQLite dialect data.
//!
//! SQLite cannot add or drop constraints on an existing table and has no
//! named schemas (beyond attached databases), so those operations surface
//! `UnsupportedFeature`.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{ColumnProperty, DbType, ForeignKeyAction};
use crate::dialect::{
    BytesLiteral, CatalogQueries, ChangeColumn, Dialect, DialectFeatures, ForeignKeyActionMap,
    ParamStyle, PropertyMap, Statements, TypeMapBuilder,
};

/// Canonical dialect name.
pub const NAME: &str = "sqlite";

/// Build the SQLite dialect.
pub fn dialect() -> Dialect {
    let types = TypeMapBuilder::new(NAME)
        .sized(DbType::AnsiStringFixedLength, 1_000_000_000, "char($l)")
        .unbounded(DbType::AnsiStringFixedLength, "text")
        .sized(DbType::AnsiString, 1_000_000_000, "varchar($l)")
        .unbounded(DbType::AnsiString, "text")
        .sized(DbType::StringFixedLength, 1_000_000_000, "char($l)")
        .unbounded(DbType::StringFixedLength, "text")
        .sized(DbType::String, 1_000_000_000, "varchar($l)")
        .unbounded(DbType::String, "text")
        .unbounded(DbType::Binary, "blob")
        .unbounded(DbType::Boolean, "integer")
        .unbounded(DbType::Byte, "integer")
        .unbounded(DbType::Int16, "integer")
        .unbounded(DbType::Int32, "integer")
        .unbounded(DbType::Int64, "integer")
        .unbounded(DbType::Single, "real")
        .unbounded(DbType::Double, "real")
        .put(DbType::Decimal, Some(1000), "numeric($l, $s)", Some(0))
        .unbounded(DbType::Decimal, "numeric")
        .unbounded(DbType::Currency, "numeric")
        .unbounded(DbType::Date, "date")
        .unbounded(DbType::DateTime, "datetime")
        .unbounded(DbType::DateTimeOffset, "text")
        .unbounded(DbType::Time, "text")
        .unbounded(DbType::Guid, "text")
        .unbounded(DbType::Xml, "text")
        .build();

    // AUTOINCREMENT is only valid on `integer PRIMARY KEY`.
    let properties = PropertyMap::builder()
        .put(ColumnProperty::NOT_NULL, "NOT NULL")
        .put(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY")
        .put(ColumnProperty::UNIQUE, "UNIQUE")
        .put(ColumnProperty::IDENTITY, "AUTOINCREMENT")
        .build();

    let fk_actions = ForeignKeyActionMap::builder()
        .standard()
        .put(ForeignKeyAction::Restrict, "RESTRICT")
        .build();

    let statements = Statements {
        change_column: ChangeColumn::Unsupported,
        ..Statements::default()
    };

    // Numbered parameters let a query skip the schema argument.
    let catalog = CatalogQueries {
        table_exists: "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?2".into(),
        column_exists: "SELECT COUNT(*) FROM pragma_table_info(?2) WHERE name = ?3".into(),
        constraint_exists: None,
        index_exists: "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'index' AND tbl_name = ?2 AND name = ?3"
            .into(),
        tables: "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND ?1 IS NOT NULL \
             ORDER BY name"
            .into(),
    };

    Dialect::builder(NAME, types)
        .quote(QuoteStyle::double_quote())
        .properties(properties)
        .fk_actions(fk_actions)
        .param_style(ParamStyle::NumberedQuestion)
        .features(DialectFeatures {
            identity_needs_type: true,
            needs_not_null_for_identity: false,
            transactional_ddl: true,
            supports_on_update: true,
            supports_alter_constraints: false,
            supports_drop_column: true,
            supports_schemas: false,
        })
        .statements(statements)
        .catalog(catalog)
        .bool_literals("1", "0")
        .bytes_literal(BytesLiteral::HexQuoted)
        .build()
}
