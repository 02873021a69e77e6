//! DDL/DML statement assembly.
//!
//! [`SchemaStatementBuilder`] turns schema descriptions into SQL strings
//! using only dialect data. It never talks to a database, so every rule
//! below is checked before a statement is sent:
//!
//! - tables and indexes need at least one column
//! - constraint operations need dialect support for `ALTER TABLE ... CONSTRAINT`
//! - `ON UPDATE` actions need dialect support
//!
//! # Column definition order
//!
//! `name type [identity-without-type] [unsigned] [NOT NULL] [PRIMARY KEY]
//! [identity-with-type] [UNIQUE] [DEFAULT x]`
//!
//! The type is dropped when the dialect encodes identity as a pseudo-type.
//! `NOT NULL` is implied by a single-column primary key and only emitted for
//! it when the dialect needs it on identity columns. Under a compound key the
//! primary key moves to a table-level constraint and its columns get
//! `NOT NULL`.

use crate::core::identifier::{validate_check_expression, FormatArg, SchemaQualifiedName};
use crate::core::schema::{Column, ColumnProperty, ForeignKey, ForeignKeyAction, ForeignKeyEvent, Index};
use crate::core::value::SqlValue;
use crate::dialect::{ChangeColumn, Dialect};
use crate::error::{MigrateError, Result};

/// Assembles SQL statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SchemaStatementBuilder<'a> {
    dialect: &'a Dialect,
}

impl<'a> SchemaStatementBuilder<'a> {
    pub fn new(dialect: &'a Dialect) -> Self {
        Self { dialect }
    }

    fn unsupported(&self, feature: &str) -> MigrateError {
        MigrateError::unsupported(self.dialect.name(), feature)
    }

    fn require_alter_constraints(&self) -> Result<()> {
        if self.dialect.features().supports_alter_constraints {
            Ok(())
        } else {
            Err(self.unsupported("ALTER TABLE constraint changes"))
        }
    }

    fn require_schema_support(&self, name: &SchemaQualifiedName) -> Result<()> {
        if name.schema().is_some() && !self.dialect.features().supports_schemas {
            return Err(self.unsupported("schema-qualified names"));
        }
        Ok(())
    }

    fn literal(&self, text: &str) -> String {
        self.dialect.literal(&SqlValue::Text(text.to_string()))
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Column definition as used inside `CREATE TABLE` and `ADD COLUMN`.
    pub fn column_sql(&self, column: &Column, compound_primary_key: bool) -> Result<String> {
        let features = self.dialect.features();
        let props = self.dialect.properties();
        let identity = column.is_identity();
        let primary_key = column.is_primary_key();
        let single_primary_key = primary_key && !compound_primary_key;

        let mut parts: Vec<String> = vec![self.dialect.quote_ident(&column.name)?];

        if identity && !features.identity_needs_type {
            parts.push(props.resolve(ColumnProperty::IDENTITY).to_string());
        } else {
            parts.push(self.dialect.column_type(&column.column_type)?);
        }

        if column.has(ColumnProperty::UNSIGNED) {
            parts.push(props.resolve(ColumnProperty::UNSIGNED).to_string());
        }

        let not_null = if single_primary_key {
            identity && features.needs_not_null_for_identity
        } else {
            column.has(ColumnProperty::NOT_NULL) || primary_key
        };
        if not_null {
            parts.push(props.resolve(ColumnProperty::NOT_NULL).to_string());
        }

        if single_primary_key {
            parts.push(props.resolve(ColumnProperty::PRIMARY_KEY).to_string());
        }

        if identity && features.identity_needs_type {
            parts.push(props.resolve(ColumnProperty::IDENTITY).to_string());
        }

        if column.has(ColumnProperty::UNIQUE) {
            parts.push(props.resolve(ColumnProperty::UNIQUE).to_string());
        }

        if let Some(default) = &column.default_value {
            parts.push(format!("DEFAULT {}", self.dialect.literal(default)));
        }

        parts.retain(|p| !p.is_empty());
        Ok(parts.join(" "))
    }

    /// Reduced definition for redefining an existing column: name, type and
    /// nullability only.
    fn redefined_column_sql(&self, column: &Column) -> Result<String> {
        let mut sql = format!(
            "{} {}",
            self.dialect.quote_ident(&column.name)?,
            self.dialect.column_type(&column.column_type)?
        );
        if column.has(ColumnProperty::NOT_NULL) {
            sql.push_str(" NOT NULL");
        } else {
            sql.push_str(" NULL");
        }
        Ok(sql)
    }

    pub fn add_column(&self, table: &SchemaQualifiedName, column: &Column) -> Result<String> {
        self.require_schema_support(table)?;
        let definition = self.column_sql(column, false)?;
        self.dialect.format(
            &self.dialect.statements().add_column,
            &[FormatArg::Name(table), FormatArg::Text(&definition)],
        )
    }

    pub fn drop_column(&self, table: &SchemaQualifiedName, column: &str) -> Result<String> {
        self.require_schema_support(table)?;
        if !self.dialect.features().supports_drop_column {
            return Err(self.unsupported("DROP COLUMN"));
        }
        self.dialect.format(
            &self.dialect.statements().drop_column,
            &[FormatArg::Name(table), FormatArg::Text(column)],
        )
    }

    pub fn rename_column(&self, table: &SchemaQualifiedName, old: &str, new: &str) -> Result<String> {
        self.require_schema_support(table)?;
        let template = self
            .dialect
            .statements()
            .rename_column
            .as_deref()
            .ok_or_else(|| self.unsupported("RENAME COLUMN"))?;
        let path = self.literal(&format!("{}.{}", table, old));
        let new_literal = self.literal(new);
        self.dialect.format(
            template,
            &[
                FormatArg::Name(table),
                FormatArg::Text(old),
                FormatArg::Text(new),
                FormatArg::Text(&path),
                FormatArg::Text(&new_literal),
            ],
        )
    }

    pub fn change_column(&self, table: &SchemaQualifiedName, column: &Column) -> Result<String> {
        self.require_schema_support(table)?;
        match &self.dialect.statements().change_column {
            ChangeColumn::Redefine(template) => {
                let definition = self.redefined_column_sql(column)?;
                self.dialect
                    .format(template, &[FormatArg::Name(table), FormatArg::Text(&definition)])
            }
            ChangeColumn::AlterType {
                template,
                set_not_null,
                drop_not_null,
            } => {
                let type_sql = self.dialect.column_type(&column.column_type)?;
                let nullability = if column.has(ColumnProperty::NOT_NULL) {
                    set_not_null
                } else {
                    drop_not_null
                };
                self.dialect.format(
                    template,
                    &[
                        FormatArg::Name(table),
                        FormatArg::Text(&column.name),
                        FormatArg::Text(&type_sql),
                        FormatArg::Text(nullability),
                    ],
                )
            }
            ChangeColumn::Unsupported => Err(self.unsupported("ALTER COLUMN")),
        }
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn create_table(&self, table: &SchemaQualifiedName, columns: &[Column]) -> Result<String> {
        self.require_schema_support(table)?;
        if columns.is_empty() {
            return Err(MigrateError::invalid_object(format!(
                "Table {} must have at least one column",
                table
            )));
        }

        let primary_keys: Vec<String> = columns
            .iter()
            .filter(|c| c.is_primary_key())
            .map(|c| c.name.clone())
            .collect();
        let compound = primary_keys.len() > 1;

        let mut definitions = columns
            .iter()
            .map(|c| self.column_sql(c, compound))
            .collect::<Result<Vec<_>>>()?;

        if compound {
            let constraint_name = format!("PK_{}", table.name);
            definitions.push(self.dialect.format(
                "CONSTRAINT {0:NAME} PRIMARY KEY ({1:COLS})",
                &[FormatArg::Text(&constraint_name), FormatArg::List(&primary_keys)],
            )?);
        }

        let body = definitions.join(", ");
        self.dialect.format(
            &self.dialect.statements().create_table,
            &[FormatArg::Name(table), FormatArg::Text(&body)],
        )
    }

    pub fn drop_table(&self, table: &SchemaQualifiedName) -> Result<String> {
        self.require_schema_support(table)?;
        self.dialect
            .format(&self.dialect.statements().drop_table, &[FormatArg::Name(table)])
    }

    pub fn rename_table(&self, table: &SchemaQualifiedName, new_name: &str) -> Result<String> {
        self.require_schema_support(table)?;
        let renamed = table.sibling(new_name);
        let old_literal = self.literal(&table.to_string());
        let new_literal = self.literal(new_name);
        self.dialect.format(
            &self.dialect.statements().rename_table,
            &[
                FormatArg::Name(table),
                FormatArg::Text(new_name),
                FormatArg::Text(&old_literal),
                FormatArg::Text(&new_literal),
                FormatArg::Name(&renamed),
            ],
        )
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    fn add_constraint(
        &self,
        table: &SchemaQualifiedName,
        name: &str,
        definition: &str,
    ) -> Result<String> {
        self.require_schema_support(table)?;
        self.require_alter_constraints()?;
        self.dialect.format(
            &self.dialect.statements().add_constraint,
            &[
                FormatArg::Name(table),
                FormatArg::Text(name),
                FormatArg::Text(definition),
            ],
        )
    }

    fn require_columns(&self, what: &str, name: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(MigrateError::invalid_object(format!(
                "{} {} must reference at least one column",
                what, name
            )));
        }
        Ok(())
    }

    pub fn primary_key(&self, name: &str, table: &SchemaQualifiedName, columns: &[String]) -> Result<String> {
        self.require_columns("Primary key", name, columns)?;
        let definition = self
            .dialect
            .format("PRIMARY KEY ({0:COLS})", &[FormatArg::List(columns)])?;
        self.add_constraint(table, name, &definition)
    }

    pub fn unique(&self, name: &str, table: &SchemaQualifiedName, columns: &[String]) -> Result<String> {
        self.require_columns("Unique constraint", name, columns)?;
        let definition = self
            .dialect
            .format("UNIQUE ({0:COLS})", &[FormatArg::List(columns)])?;
        self.add_constraint(table, name, &definition)
    }

    pub fn check(&self, name: &str, table: &SchemaQualifiedName, expression: &str) -> Result<String> {
        validate_check_expression(expression)?;
        self.add_constraint(table, name, &format!("CHECK ({})", expression))
    }

    pub fn foreign_key(&self, fk: &ForeignKey) -> Result<String> {
        self.require_columns("Foreign key", &fk.name, &fk.columns)?;
        if fk.columns.len() != fk.ref_columns.len() {
            return Err(MigrateError::invalid_object(format!(
                "Foreign key {} has {} columns but references {}",
                fk.name,
                fk.columns.len(),
                fk.ref_columns.len()
            )));
        }
        if fk.on_update != ForeignKeyAction::NoAction && !self.dialect.features().supports_on_update {
            return Err(self.unsupported("ON UPDATE foreign key actions"));
        }
        for action in [fk.on_delete, fk.on_update] {
            if action != ForeignKeyAction::NoAction && !self.dialect.fk_actions().supports(action) {
                return Err(self.unsupported(&format!("{:?} foreign key action", action)));
            }
        }
        self.require_schema_support(&fk.ref_table)?;

        let mut definition = self.dialect.format(
            "FOREIGN KEY ({0:COLS}) REFERENCES {1:NAME} ({2:COLS})",
            &[
                FormatArg::List(&fk.columns),
                FormatArg::Name(&fk.ref_table),
                FormatArg::List(&fk.ref_columns),
            ],
        )?;
        for clause in [
            self.dialect.fk_action(fk.on_delete, ForeignKeyEvent::Delete),
            self.dialect.fk_action(fk.on_update, ForeignKeyEvent::Update),
        ] {
            if !clause.is_empty() {
                definition.push(' ');
                definition.push_str(&clause);
            }
        }

        self.add_constraint(&fk.table, &fk.name, &definition)
    }

    pub fn drop_constraint(&self, table: &SchemaQualifiedName, name: &str) -> Result<String> {
        self.require_schema_support(table)?;
        self.require_alter_constraints()?;
        self.dialect.format(
            &self.dialect.statements().drop_constraint,
            &[FormatArg::Name(table), FormatArg::Text(name)],
        )
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    pub fn create_index(&self, index: &Index) -> Result<String> {
        self.require_schema_support(&index.table)?;
        self.require_columns("Index", &index.name, &index.columns)?;
        let unique = if index.unique { "UNIQUE " } else { "" };
        self.dialect.format(
            &self.dialect.statements().create_index,
            &[
                FormatArg::Text(unique),
                FormatArg::Text(&index.name),
                FormatArg::Name(&index.table),
                FormatArg::List(&index.columns),
            ],
        )
    }

    pub fn drop_index(&self, table: &SchemaQualifiedName, name: &str) -> Result<String> {
        self.require_schema_support(table)?;
        let qualified = table.sibling(name);
        self.dialect.format(
            &self.dialect.statements().drop_index,
            &[
                FormatArg::Name(&qualified),
                FormatArg::Name(table),
                FormatArg::Text(name),
            ],
        )
    }

    // =========================================================================
    // DML
    // =========================================================================

    pub fn insert(&self, table: &SchemaQualifiedName, columns: &[String]) -> Result<String> {
        self.require_schema_support(table)?;
        if columns.is_empty() {
            return Err(MigrateError::invalid_object(format!(
                "Insert into {} needs at least one column",
                table
            )));
        }
        let params: Vec<String> = (1..=columns.len()).map(|i| self.dialect.param(i)).collect();
        let params = params.join(", ");
        self.dialect.format(
            "INSERT INTO {0:NAME} ({1:COLS}) VALUES ({2})",
            &[
                FormatArg::Name(table),
                FormatArg::List(columns),
                FormatArg::Text(&params),
            ],
        )
    }

    pub fn update(
        &self,
        table: &SchemaQualifiedName,
        columns: &[String],
        where_clause: Option<&str>,
    ) -> Result<String> {
        self.require_schema_support(table)?;
        if columns.is_empty() {
            return Err(MigrateError::invalid_object(format!(
                "Update of {} needs at least one column",
                table
            )));
        }
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Ok::<_, MigrateError>(format!(
                    "{} = {}",
                    self.dialect.quote_ident(c)?,
                    self.dialect.param(i + 1)
                ))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let mut sql = self.dialect.format(
            "UPDATE {0:NAME} SET {1}",
            &[FormatArg::Name(table), FormatArg::Text(&assignments)],
        )?;
        append_where(&mut sql, where_clause);
        Ok(sql)
    }

    pub fn delete(&self, table: &SchemaQualifiedName, where_clause: Option<&str>) -> Result<String> {
        self.require_schema_support(table)?;
        let mut sql = self
            .dialect
            .format("DELETE FROM {0:NAME}", &[FormatArg::Name(table)])?;
        append_where(&mut sql, where_clause);
        Ok(sql)
    }
}

fn append_where(sql: &mut String, where_clause: Option<&str>) {
    if let Some(clause) = where_clause.map(str::trim).filter(|c| !c.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnType, DbType};
    use crate::dialect::{DialectFeatures, PropertyMap, TypeMapBuilder};
    use crate::drivers::{mssql, mysql, postgres, sqlite};

    fn id_column() -> Column {
        Column::new("id", DbType::Int64).with_properties(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY)
    }

    /// Dialect encoding identity as a pseudo-type, like `serial`.
    fn serial_dialect() -> Dialect {
        let types = TypeMapBuilder::new("serialish")
            .unbounded(DbType::Int64, "bigint")
            .unbounded(DbType::Boolean, "boolean")
            .build();
        Dialect::builder("serialish", types)
            .properties(
                PropertyMap::builder()
                    .put(ColumnProperty::NOT_NULL, "NOT NULL")
                    .put(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY")
                    .put(ColumnProperty::IDENTITY, "bigserial")
                    .build(),
            )
            .features(DialectFeatures {
                identity_needs_type: false,
                supports_on_update: false,
                ..DialectFeatures::default()
            })
            .build()
    }

    // =========================================================================
    // Column definition ordering
    // =========================================================================

    #[test]
    fn test_identity_with_type_orders_after_primary_key() {
        let d = postgres::dialect();
        let sql = SchemaStatementBuilder::new(&d).column_sql(&id_column(), false).unwrap();
        assert_eq!(sql, "\"id\" bigint PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY");
    }

    #[test]
    fn test_identity_needs_not_null_on_sqlserver() {
        let d = mssql::dialect();
        let sql = SchemaStatementBuilder::new(&d).column_sql(&id_column(), false).unwrap();
        assert_eq!(sql, "[id] bigint NOT NULL PRIMARY KEY IDENTITY");
    }

    #[test]
    fn test_identity_without_type_replaces_type() {
        let d = serial_dialect();
        let sql = SchemaStatementBuilder::new(&d).column_sql(&id_column(), false).unwrap();
        assert_eq!(sql, "\"id\" bigserial PRIMARY KEY");
    }

    #[test]
    fn test_identity_without_type_skips_type_lookup() {
        // Int32 has no mapping in this dialect; the pseudo-type stands in for it.
        let d = serial_dialect();
        let column = Column::new("id", DbType::Int32)
            .with_properties(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY);
        let sql = SchemaStatementBuilder::new(&d).column_sql(&column, false).unwrap();
        assert_eq!(sql, "\"id\" bigserial PRIMARY KEY");

        let plain = Column::new("n", DbType::Int32);
        assert!(SchemaStatementBuilder::new(&d).column_sql(&plain, false).is_err());
    }

    #[test]
    fn test_sqlite_autoincrement() {
        let d = sqlite::dialect();
        let sql = SchemaStatementBuilder::new(&d).column_sql(&id_column(), false).unwrap();
        assert_eq!(sql, "\"id\" integer PRIMARY KEY AUTOINCREMENT");
    }

    #[test]
    fn test_unsigned_not_null_unique_default() {
        let d = mysql::dialect();
        let column = Column::new("qty", DbType::Int32)
            .with_properties(ColumnProperty::UNSIGNED | ColumnProperty::NOT_NULL | ColumnProperty::UNIQUE)
            .with_default(0i64);
        let sql = SchemaStatementBuilder::new(&d).column_sql(&column, false).unwrap();
        assert_eq!(sql, "`qty` int UNSIGNED NOT NULL UNIQUE DEFAULT 0");
    }

    #[test]
    fn test_single_primary_key_suppresses_not_null() {
        let d = postgres::dialect();
        let column = Column::new("code", ColumnType::new(DbType::String).with_length(10))
            .with_properties(ColumnProperty::PRIMARY_KEY | ColumnProperty::NOT_NULL);
        let sql = SchemaStatementBuilder::new(&d).column_sql(&column, false).unwrap();
        assert_eq!(sql, "\"code\" varchar(10) PRIMARY KEY");
    }

    #[test]
    fn test_text_default_is_quoted() {
        let d = mssql::dialect();
        let column = Column::new("status", ColumnType::new(DbType::String).with_length(20))
            .with_properties(ColumnProperty::NOT_NULL)
            .with_default("new");
        let sql = SchemaStatementBuilder::new(&d).column_sql(&column, false).unwrap();
        assert_eq!(sql, "[status] nvarchar(20) NOT NULL DEFAULT N'new'");
    }

    // =========================================================================
    // Tables
    // =========================================================================

    #[test]
    fn test_compound_primary_key_becomes_constraint() {
        let d = postgres::dialect();
        let table = SchemaQualifiedName::new("SchemaInfo");
        let columns = vec![
            Column::new("Version", DbType::Int64).with_properties(ColumnProperty::PRIMARY_KEY),
            Column::new("Key", ColumnType::new(DbType::String).with_length(200))
                .with_properties(ColumnProperty::PRIMARY_KEY)
                .with_default(""),
        ];
        let sql = SchemaStatementBuilder::new(&d).create_table(&table, &columns).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"SchemaInfo\" (\"Version\" bigint NOT NULL, \
             \"Key\" varchar(200) NOT NULL DEFAULT '', \
             CONSTRAINT \"PK_SchemaInfo\" PRIMARY KEY (\"Version\", \"Key\"))"
        );
    }

    #[test]
    fn test_table_without_columns_is_rejected() {
        let d = postgres::dialect();
        let err = SchemaStatementBuilder::new(&d)
            .create_table(&"empty".into(), &[])
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSchemaObject(_)));
    }

    #[test]
    fn test_rename_table_per_dialect() {
        let table = SchemaQualifiedName::with_schema("dbo", "users");
        let d = mssql::dialect();
        assert_eq!(
            SchemaStatementBuilder::new(&d).rename_table(&table, "people").unwrap(),
            "EXEC sp_rename N'dbo.users', N'people'"
        );

        let d = postgres::dialect();
        let table = SchemaQualifiedName::with_schema("app", "users");
        assert_eq!(
            SchemaStatementBuilder::new(&d).rename_table(&table, "people").unwrap(),
            "ALTER TABLE \"app\".\"users\" RENAME TO \"people\""
        );

        let d = mysql::dialect();
        assert_eq!(
            SchemaStatementBuilder::new(&d).rename_table(&table, "people").unwrap(),
            "RENAME TABLE `app`.`users` TO `app`.`people`"
        );
    }

    #[test]
    fn test_sqlite_rejects_schema_names() {
        let d = sqlite::dialect();
        let err = SchemaStatementBuilder::new(&d)
            .drop_table(&SchemaQualifiedName::with_schema("aux", "t"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedFeature { .. }));
    }

    // =========================================================================
    // Columns
    // =========================================================================

    #[test]
    fn test_change_column_alter_type() {
        let d = postgres::dialect();
        let column = Column::new("name", ColumnType::new(DbType::String).with_length(100))
            .with_properties(ColumnProperty::NOT_NULL);
        let sql = SchemaStatementBuilder::new(&d)
            .change_column(&"users".into(), &column)
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" TYPE varchar(100), ALTER COLUMN \"name\" SET NOT NULL"
        );
    }

    #[test]
    fn test_change_column_redefine() {
        let d = mssql::dialect();
        let column = Column::new("name", ColumnType::new(DbType::String).with_length(100));
        let sql = SchemaStatementBuilder::new(&d)
            .change_column(&"users".into(), &column)
            .unwrap();
        assert_eq!(sql, "ALTER TABLE [users] ALTER COLUMN [name] nvarchar(100) NULL");
    }

    #[test]
    fn test_change_column_unsupported_on_sqlite() {
        let d = sqlite::dialect();
        let column = Column::new("name", DbType::String);
        let err = SchemaStatementBuilder::new(&d)
            .change_column(&"users".into(), &column)
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_rename_column_sqlserver() {
        let d = mssql::dialect();
        let sql = SchemaStatementBuilder::new(&d)
            .rename_column(&"users".into(), "fname", "first_name")
            .unwrap();
        assert_eq!(sql, "EXEC sp_rename N'users.fname', N'first_name', 'COLUMN'");
    }

    // =========================================================================
    // Constraints and indexes
    // =========================================================================

    #[test]
    fn test_foreign_key_with_actions() {
        let d = postgres::dialect();
        let fk = ForeignKey::new("fk_orders_customer", "orders", &["customer_id"], "customers", &["id"])
            .on_delete(ForeignKeyAction::Cascade)
            .on_update(ForeignKeyAction::SetNull);
        let sql = SchemaStatementBuilder::new(&d).foreign_key(&fk).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"orders\" ADD CONSTRAINT \"fk_orders_customer\" FOREIGN KEY (\"customer_id\") \
             REFERENCES \"customers\" (\"id\") ON DELETE CASCADE ON UPDATE SET NULL"
        );
    }

    #[test]
    fn test_on_update_unsupported() {
        let d = serial_dialect();
        let fk = ForeignKey::new("fk", "a", &["b_id"], "b", &["id"]).on_update(ForeignKeyAction::Cascade);
        let err = SchemaStatementBuilder::new(&d).foreign_key(&fk).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedFeature { .. }));

        let no_update = ForeignKey::new("fk", "a", &["b_id"], "b", &["id"]);
        assert!(SchemaStatementBuilder::new(&d).foreign_key(&no_update).is_ok());
    }

    #[test]
    fn test_unmapped_fk_action_unsupported() {
        let d = mssql::dialect();
        let fk = ForeignKey::new("fk", "a", &["b_id"], "b", &["id"]).on_delete(ForeignKeyAction::Restrict);
        let err = SchemaStatementBuilder::new(&d).foreign_key(&fk).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_constraints_unsupported_on_sqlite() {
        let d = sqlite::dialect();
        let err = SchemaStatementBuilder::new(&d)
            .unique("uq", &"t".into(), &["a".to_string()])
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_check_constraint() {
        let d = mssql::dialect();
        let builder = SchemaStatementBuilder::new(&d);
        assert_eq!(
            builder.check("ck_price", &"items".into(), "price >= 0").unwrap(),
            "ALTER TABLE [items] ADD CONSTRAINT [ck_price] CHECK (price >= 0)"
        );
        assert!(builder.check("ck", &"items".into(), "1=1; DROP TABLE items").is_err());
    }

    #[test]
    fn test_index_statements() {
        let d = mysql::dialect();
        let builder = SchemaStatementBuilder::new(&d);
        let index = Index::new("ix_email", "users", &["email"]).unique();
        assert_eq!(
            builder.create_index(&index).unwrap(),
            "CREATE UNIQUE INDEX `ix_email` ON `users` (`email`)"
        );
        assert_eq!(
            builder.drop_index(&"users".into(), "ix_email").unwrap(),
            "DROP INDEX `ix_email` ON `users`"
        );

        let d = postgres::dialect();
        assert_eq!(
            SchemaStatementBuilder::new(&d)
                .drop_index(&SchemaQualifiedName::with_schema("app", "users"), "ix_email")
                .unwrap(),
            "DROP INDEX \"app\".\"ix_email\""
        );
    }

    #[test]
    fn test_index_without_columns_is_rejected() {
        let d = postgres::dialect();
        let err = SchemaStatementBuilder::new(&d)
            .create_index(&Index::new("ix", "t", &[]))
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSchemaObject(_)));
    }

    // =========================================================================
    // DML
    // =========================================================================

    #[test]
    fn test_dml_placeholders() {
        let cols = vec!["Version".to_string(), "Key".to_string()];
        let d = mssql::dialect();
        let builder = SchemaStatementBuilder::new(&d);
        assert_eq!(
            builder.insert(&"SchemaInfo".into(), &cols).unwrap(),
            "INSERT INTO [SchemaInfo] ([Version], [Key]) VALUES (@P1, @P2)"
        );
        assert_eq!(
            builder
                .update(&"SchemaInfo".into(), &cols[1..], Some("[Key] IS NULL"))
                .unwrap(),
            "UPDATE [SchemaInfo] SET [Key] = @P1 WHERE [Key] IS NULL"
        );
        assert_eq!(
            builder.delete(&"SchemaInfo".into(), Some("  ")).unwrap(),
            "DELETE FROM [SchemaInfo]"
        );
    }
}
