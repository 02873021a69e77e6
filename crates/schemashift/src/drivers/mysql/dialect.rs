//! MySQL/MariaDB dialect data.
//!
//! DDL is not transactional: every DDL statement commits implicitly, so a
//! failed step can leave earlier statements of the same step applied.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{ColumnProperty, DbType, ForeignKeyAction};
use crate::dialect::{
    BytesLiteral, CatalogQueries, ChangeColumn, Dialect, DialectFeatures, ForeignKeyActionMap,
    ParamStyle, PropertyMap, Statements, TypeMapBuilder,
};

/// Canonical dialect name.
pub const NAME: &str = "mysql";

/// Build the MySQL dialect.
pub fn dialect() -> Dialect {
    let types = TypeMapBuilder::new(NAME)
        .sized(DbType::AnsiStringFixedLength, 255, "char($l)")
        .unbounded(DbType::AnsiStringFixedLength, "char(255)")
        .sized(DbType::AnsiString, 65_535, "varchar($l)")
        .sized(DbType::AnsiString, 16_777_215, "mediumtext")
        .unbounded(DbType::AnsiString, "longtext")
        .sized(DbType::StringFixedLength, 255, "char($l)")
        .unbounded(DbType::StringFixedLength, "char(255)")
        .sized(DbType::String, 65_535, "varchar($l)")
        .sized(DbType::String, 16_777_215, "mediumtext")
        .unbounded(DbType::String, "longtext")
        .sized(DbType::Binary, 65_535, "varbinary($l)")
        .unbounded(DbType::Binary, "longblob")
        .unbounded(DbType::Boolean, "tinyint(1)")
        .unbounded(DbType::Byte, "tinyint")
        .unbounded(DbType::Int16, "smallint")
        .unbounded(DbType::Int32, "int")
        .unbounded(DbType::Int64, "bigint")
        .unbounded(DbType::Single, "float")
        .unbounded(DbType::Double, "double")
        .put(DbType::Decimal, Some(65), "decimal($l, $s)", Some(2))
        .unbounded(DbType::Decimal, "decimal(18, 2)")
        .unbounded(DbType::Currency, "decimal(19, 4)")
        .unbounded(DbType::Date, "date")
        .unbounded(DbType::DateTime, "datetime")
        .unbounded(DbType::DateTimeOffset, "timestamp")
        .unbounded(DbType::Time, "time")
        .unbounded(DbType::Guid, "char(36)")
        .unbounded(DbType::Xml, "longtext")
        .build();

    let properties = PropertyMap::builder()
        .put(ColumnProperty::NOT_NULL, "NOT NULL")
        .put(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY")
        .put(ColumnProperty::UNIQUE, "UNIQUE")
        .put(ColumnProperty::IDENTITY, "AUTO_INCREMENT")
        .put(ColumnProperty::UNSIGNED, "UNSIGNED")
        .build();

    let fk_actions = ForeignKeyActionMap::builder()
        .standard()
        .put(ForeignKeyAction::Restrict, "RESTRICT")
        .build();

    let statements = Statements {
        rename_table: "RENAME TABLE {0:NAME} TO {4:NAME}".into(),
        change_column: ChangeColumn::Redefine("ALTER TABLE {0:NAME} MODIFY {1}".into()),
        drop_index: "DROP INDEX {2:NAME} ON {1:NAME}".into(),
        begin: "START TRANSACTION".into(),
        ..Statements::default()
    };

    // Positional `?` placeholders: each parameter appears exactly once, in order.
    let catalog = CatalogQueries {
        table_exists: "SELECT COUNT(*) FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE()) \
             AND TABLE_NAME = ? AND TABLE_TYPE = 'BASE TABLE'"
            .into(),
        column_exists: "SELECT COUNT(*) FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE()) \
             AND TABLE_NAME = ? AND COLUMN_NAME = ?"
            .into(),
        constraint_exists: Some(
            "SELECT COUNT(*) FROM information_schema.TABLE_CONSTRAINTS \
             WHERE CONSTRAINT_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE()) \
             AND TABLE_NAME = ? AND CONSTRAINT_NAME = ?"
                .into(),
        ),
        index_exists: "SELECT COUNT(DISTINCT INDEX_NAME) FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE()) \
             AND TABLE_NAME = ? AND INDEX_NAME = ?"
            .into(),
        tables: "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(?, ''), DATABASE()) \
             AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME"
            .into(),
    };

    Dialect::builder(NAME, types)
        .quote(QuoteStyle::backticks())
        .properties(properties)
        .fk_actions(fk_actions)
        .param_style(ParamStyle::Question)
        .features(DialectFeatures {
            identity_needs_type: true,
            needs_not_null_for_identity: false,
            transactional_ddl: false,
            supports_on_update: true,
            supports_alter_constraints: true,
            supports_drop_column: true,
            supports_schemas: true,
        })
        .statements(statements)
        .catalog(catalog)
        .bool_literals("TRUE", "FALSE")
        .backslash_escapes(true)
        .bytes_literal(BytesLiteral::HexQuoted)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnType;

    #[test]
    fn test_text_capacity_tiers() {
        let d = dialect();
        let tier = |l: u32| {
            d.column_type(&ColumnType::new(DbType::String).with_length(l))
                .unwrap()
        };
        assert_eq!(tier(200), "varchar(200)");
        assert_eq!(tier(65_536), "mediumtext");
        assert_eq!(tier(16_777_216), "longtext");
    }

    #[test]
    fn test_unsigned_fragment() {
        let d = dialect();
        assert_eq!(d.properties().resolve(ColumnProperty::UNSIGNED), "UNSIGNED");
        assert!(!d.features().transactional_ddl);
    }
}
