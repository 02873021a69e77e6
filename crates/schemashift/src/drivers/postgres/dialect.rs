//! PostgreSQL dialect data.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{ColumnProperty, DbType, ForeignKeyAction};
use crate::dialect::{
    BytesLiteral, CatalogQueries, ChangeColumn, Dialect, DialectFeatures, ForeignKeyActionMap,
    ParamStyle, PropertyMap, Statements, TypeMapBuilder,
};

/// Canonical dialect name.
pub const NAME: &str = "postgres";

/// Build the PostgreSQL dialect.
pub fn dialect() -> Dialect {
    let types = TypeMapBuilder::new(NAME)
        .sized(DbType::AnsiStringFixedLength, 10_485_760, "char($l)")
        .unbounded(DbType::AnsiStringFixedLength, "char(255)")
        .sized(DbType::AnsiString, 10_485_760, "varchar($l)")
        .unbounded(DbType::AnsiString, "text")
        .sized(DbType::StringFixedLength, 10_485_760, "char($l)")
        .unbounded(DbType::StringFixedLength, "char(255)")
        .sized(DbType::String, 10_485_760, "varchar($l)")
        .unbounded(DbType::String, "text")
        .unbounded(DbType::Binary, "bytea")
        .unbounded(DbType::Boolean, "boolean")
        .unbounded(DbType::Byte, "smallint")
        .unbounded(DbType::Int16, "smallint")
        .unbounded(DbType::Int32, "integer")
        .unbounded(DbType::Int64, "bigint")
        .unbounded(DbType::Single, "real")
        .unbounded(DbType::Double, "double precision")
        .put(DbType::Decimal, Some(1000), "numeric($l, $s)", Some(0))
        .unbounded(DbType::Decimal, "numeric")
        .unbounded(DbType::Currency, "money")
        .unbounded(DbType::Date, "date")
        .unbounded(DbType::DateTime, "timestamp")
        .unbounded(DbType::DateTimeOffset, "timestamptz")
        .unbounded(DbType::Time, "time")
        .unbounded(DbType::Guid, "uuid")
        .unbounded(DbType::Xml, "xml")
        .build();

    let properties = PropertyMap::builder()
        .put(ColumnProperty::NOT_NULL, "NOT NULL")
        .put(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY")
        .put(ColumnProperty::UNIQUE, "UNIQUE")
        .put(ColumnProperty::IDENTITY, "GENERATED BY DEFAULT AS IDENTITY")
        .build();

    let fk_actions = ForeignKeyActionMap::builder()
        .standard()
        .put(ForeignKeyAction::Restrict, "RESTRICT")
        .build();

    let statements = Statements {
        change_column: ChangeColumn::AlterType {
            template: "ALTER TABLE {0:NAME} ALTER COLUMN {1:NAME} TYPE {2}, ALTER COLUMN {1:NAME} {3}"
                .into(),
            set_not_null: "SET NOT NULL".into(),
            drop_not_null: "DROP NOT NULL".into(),
        },
        ..Statements::default()
    };

    let catalog = CatalogQueries {
        table_exists: "SELECT COUNT(*) FROM pg_catalog.pg_tables \
             WHERE schemaname = COALESCE(NULLIF($1::text, ''), current_schema()) \
             AND tablename = $2::text"
            .into(),
        column_exists: "SELECT COUNT(*) FROM information_schema.columns \
             WHERE table_schema = COALESCE(NULLIF($1::text, ''), current_schema()) \
             AND table_name = $2::text AND column_name = $3::text"
            .into(),
        constraint_exists: Some(
            "SELECT COUNT(*) FROM pg_catalog.pg_constraint c \
             JOIN pg_catalog.pg_class t ON t.oid = c.conrelid \
             JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
             WHERE n.nspname = COALESCE(NULLIF($1::text, ''), current_schema()) \
             AND t.relname = $2::text AND c.conname = $3::text"
                .into(),
        ),
        index_exists: "SELECT COUNT(*) FROM pg_catalog.pg_indexes \
             WHERE schemaname = COALESCE(NULLIF($1::text, ''), current_schema()) \
             AND tablename = $2::text AND indexname = $3::text"
            .into(),
        tables: "SELECT tablename::text FROM pg_catalog.pg_tables \
             WHERE schemaname = COALESCE(NULLIF($1::text, ''), current_schema()) \
             ORDER BY tablename"
            .into(),
    };

    Dialect::builder(NAME, types)
        .quote(QuoteStyle::double_quote())
        .properties(properties)
        .fk_actions(fk_actions)
        .param_style(ParamStyle::Dollar)
        .features(DialectFeatures {
            identity_needs_type: true,
            needs_not_null_for_identity: false,
            transactional_ddl: true,
            supports_on_update: true,
            supports_alter_constraints: true,
            supports_drop_column: true,
            supports_schemas: true,
        })
        .statements(statements)
        .catalog(catalog)
        .bool_literals("TRUE", "FALSE")
        .bytes_literal(BytesLiteral::Escaped)
        .build()
}
