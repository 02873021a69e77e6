//! SQL Server dialect data.
//!
//! Renames go through `sp_rename`, scripts are split on `GO` lines and
//! string literals carry the `N` prefix so Unicode defaults survive.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::{ColumnProperty, DbType};
use crate::dialect::{
    BytesLiteral, CatalogQueries, ChangeColumn, Dialect, DialectFeatures, ForeignKeyActionMap,
    ParamStyle, PropertyMap, Statements, TypeMapBuilder,
};

/// Canonical dialect name.
pub const NAME: &str = "sqlserver";

/// Build the SQL Server dialect.
pub fn dialect() -> Dialect {
    let types = TypeMapBuilder::new(NAME)
        .sized(DbType::AnsiStringFixedLength, 8000, "char($l)")
        .unbounded(DbType::AnsiStringFixedLength, "char(255)")
        .sized(DbType::AnsiString, 8000, "varchar($l)")
        .unbounded(DbType::AnsiString, "varchar(max)")
        .sized(DbType::StringFixedLength, 4000, "nchar($l)")
        .unbounded(DbType::StringFixedLength, "nchar(255)")
        .sized(DbType::String, 4000, "nvarchar($l)")
        .unbounded(DbType::String, "nvarchar(max)")
        .sized(DbType::Binary, 8000, "varbinary($l)")
        .unbounded(DbType::Binary, "varbinary(max)")
        .unbounded(DbType::Boolean, "bit")
        .unbounded(DbType::Byte, "tinyint")
        .unbounded(DbType::Int16, "smallint")
        .unbounded(DbType::Int32, "int")
        .unbounded(DbType::Int64, "bigint")
        .unbounded(DbType::Single, "real")
        .unbounded(DbType::Double, "float")
        .put(DbType::Decimal, Some(38), "decimal($l, $s)", Some(2))
        .unbounded(DbType::Decimal, "decimal(18, 2)")
        .unbounded(DbType::Currency, "money")
        .unbounded(DbType::Date, "date")
        .unbounded(DbType::DateTime, "datetime2")
        .unbounded(DbType::DateTimeOffset, "datetimeoffset")
        .unbounded(DbType::Time, "time")
        .unbounded(DbType::Guid, "uniqueidentifier")
        .unbounded(DbType::Xml, "xml")
        .build();

    let properties = PropertyMap::builder()
        .put(ColumnProperty::NOT_NULL, "NOT NULL")
        .put(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY")
        .put(ColumnProperty::UNIQUE, "UNIQUE")
        .put(ColumnProperty::IDENTITY, "IDENTITY")
        .build();

    // SQL Server has no RESTRICT; NO ACTION is its default behavior.
    let fk_actions = ForeignKeyActionMap::builder().standard().build();

    let statements = Statements {
        rename_table: "EXEC sp_rename {2}, {3}".into(),
        add_column: "ALTER TABLE {0:NAME} ADD {1}".into(),
        rename_column: Some("EXEC sp_rename {3}, {4}, 'COLUMN'".into()),
        change_column: ChangeColumn::Redefine("ALTER TABLE {0:NAME} ALTER COLUMN {1}".into()),
        drop_index: "DROP INDEX {2:NAME} ON {1:NAME}".into(),
        begin: "BEGIN TRANSACTION".into(),
        commit: "COMMIT TRANSACTION".into(),
        rollback: "ROLLBACK TRANSACTION".into(),
        ..Statements::default()
    };

    let catalog = CatalogQueries {
        table_exists: "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(@P1, ''), SCHEMA_NAME()) \
             AND TABLE_NAME = @P2 AND TABLE_TYPE = 'BASE TABLE'"
            .into(),
        column_exists: "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(@P1, ''), SCHEMA_NAME()) \
             AND TABLE_NAME = @P2 AND COLUMN_NAME = @P3"
            .into(),
        constraint_exists: Some(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(@P1, ''), SCHEMA_NAME()) \
             AND TABLE_NAME = @P2 AND CONSTRAINT_NAME = @P3"
                .into(),
        ),
        index_exists: "SELECT COUNT(*) FROM sys.indexes i \
             JOIN sys.tables t ON t.object_id = i.object_id \
             JOIN sys.schemas s ON s.schema_id = t.schema_id \
             WHERE s.name = COALESCE(NULLIF(@P1, ''), SCHEMA_NAME()) \
             AND t.name = @P2 AND i.name = @P3"
            .into(),
        tables: "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = COALESCE(NULLIF(@P1, ''), SCHEMA_NAME()) \
             AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME"
            .into(),
    };

    Dialect::builder(NAME, types)
        .quote(QuoteStyle::brackets())
        .properties(properties)
        .fk_actions(fk_actions)
        .param_style(ParamStyle::AtP)
        .batch_separator("GO")
        .features(DialectFeatures {
            identity_needs_type: true,
            needs_not_null_for_identity: true,
            transactional_ddl: true,
            supports_on_update: true,
            supports_alter_constraints: true,
            supports_drop_column: true,
            supports_schemas: true,
        })
        .statements(statements)
        .catalog(catalog)
        .bool_literals("1", "0")
        .string_prefix("N")
        .bytes_literal(BytesLiteral::ZeroX)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnType, ForeignKeyAction, ForeignKeyEvent};
    use crate::core::value::SqlValue;

    #[test]
    fn test_nvarchar_capacity() {
        let d = dialect();
        let sized = ColumnType::new(DbType::String).with_length(4000);
        let oversized = ColumnType::new(DbType::String).with_length(4001);
        assert_eq!(d.column_type(&sized).unwrap(), "nvarchar(4000)");
        assert_eq!(d.column_type(&oversized).unwrap(), "nvarchar(max)");
    }

    #[test]
    fn test_no_restrict_action() {
        let d = dialect();
        assert_eq!(
            d.fk_action(ForeignKeyAction::Restrict, ForeignKeyEvent::Delete),
            ""
        );
        assert_eq!(
            d.fk_action(ForeignKeyAction::Cascade, ForeignKeyEvent::Update),
            "ON UPDATE CASCADE"
        );
    }

    #[test]
    fn test_unicode_literal() {
        let d = dialect();
        assert_eq!(d.literal(&SqlValue::Text("Zoë".into())), "N'Zoë'");
        assert_eq!(d.literal(&SqlValue::Bool(false)), "0");
    }
}
