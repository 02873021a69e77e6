//! Dialect capability data.
//!
//! A [`Dialect`] is plain data: quoting, type/property/foreign-key maps,
//! feature flags, statement templates and catalog queries. One generic
//! provider ([`crate::provider::Provider`]) is parameterized by a dialect
//! instead of one provider type per database.
//!
//! Built-in dialects live next to their drivers:
//!
//! - [`crate::drivers::postgres::dialect`]
//! - [`crate::drivers::mssql::dialect`]
//! - [`crate::drivers::mysql::dialect`]
//! - [`crate::drivers::sqlite::dialect`]
//!
//! Custom dialects are assembled with [`Dialect::builder`].

mod property;
mod typemap;

pub use property::{
    ForeignKeyActionMap, ForeignKeyActionMapBuilder, PropertyMap, PropertyMapBuilder,
};
pub use typemap::{TypeMap, TypeMapBuilder};

use crate::core::identifier::{FormatArg, IdentifierFormatter, QuoteStyle};
use crate::core::schema::{ColumnProperty, ColumnType, ForeignKeyAction, ForeignKeyEvent};
use crate::core::value::SqlValue;
use crate::error::Result;

/// Bind parameter placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `$1`, `$2` (PostgreSQL)
    Dollar,
    /// `@P1`, `@P2` (SQL Server)
    AtP,
    /// `?` (MySQL)
    Question,
    /// `?1`, `?2` (SQLite)
    NumberedQuestion,
}

impl ParamStyle {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            ParamStyle::Dollar => format!("${}", index),
            ParamStyle::AtP => format!("@P{}", index),
            ParamStyle::Question => "?".to_string(),
            ParamStyle::NumberedQuestion => format!("?{}", index),
        }
    }
}

/// Binary literal syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesLiteral {
    /// `X'0A0B'`
    HexQuoted,
    /// `0x0A0B`
    ZeroX,
    /// `'\x0a0b'`
    Escaped,
}

/// Feature flags consulted by the statement builder and provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectFeatures {
    /// Identity is a modifier after the type (`bigint IDENTITY`) rather than
    /// a pseudo-type replacing it (`serial`).
    pub identity_needs_type: bool,
    /// Single-column primary keys that are identities still need `NOT NULL`.
    pub needs_not_null_for_identity: bool,
    /// DDL participates in transactions.
    pub transactional_ddl: bool,
    /// Foreign keys accept an `ON UPDATE` action.
    pub supports_on_update: bool,
    /// Constraints can be added to and dropped from an existing table.
    pub supports_alter_constraints: bool,
    /// Columns can be dropped from an existing table.
    pub supports_drop_column: bool,
    /// Objects can live in named schemas.
    pub supports_schemas: bool,
}

impl Default for DialectFeatures {
    fn default() -> Self {
        Self {
            identity_needs_type: true,
            needs_not_null_for_identity: false,
            transactional_ddl: true,
            supports_on_update: true,
            supports_alter_constraints: true,
            supports_drop_column: true,
            supports_schemas: true,
        }
    }
}

/// How an existing column is redefined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeColumn {
    /// Template receives `{0:NAME}` table and `{1}` full column definition.
    Redefine(String),
    /// Template receives `{0:NAME}` table, `{1:NAME}` column, `{2}` type and
    /// `{3}` the nullability clause picked from `set_not_null`/`drop_not_null`.
    AlterType {
        template: String,
        set_not_null: String,
        drop_not_null: String,
    },
    Unsupported,
}

/// DDL statement templates rendered by [`IdentifierFormatter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    pub create_table: String,
    pub drop_table: String,
    /// `{0:NAME}` table, `{1:NAME}` bare new name, `{2}` old name and `{3}`
    /// new name as string literals, `{4:NAME}` new name in the old schema.
    pub rename_table: String,
    pub add_column: String,
    pub drop_column: String,
    /// `{0:NAME}` table, `{1:NAME}` old, `{2:NAME}` new, then `{3}` the
    /// `table.old` path and `{4}` the new name as string literals.
    pub rename_column: Option<String>,
    pub change_column: ChangeColumn,
    pub add_constraint: String,
    pub drop_constraint: String,
    /// `{0}` `UNIQUE ` or empty, `{1:NAME}` bare index name, `{2:NAME}`
    /// table, `{3:COLS}` columns.
    pub create_index: String,
    /// `{0:NAME}` schema-qualified index, `{1:NAME}` table, `{2:NAME}` bare
    /// index name.
    pub drop_index: String,
    pub begin: String,
    pub commit: String,
    pub rollback: String,
}

impl Default for Statements {
    fn default() -> Self {
        Self {
            create_table: "CREATE TABLE {0:NAME} ({1})".into(),
            drop_table: "DROP TABLE {0:NAME}".into(),
            rename_table: "ALTER TABLE {0:NAME} RENAME TO {1:NAME}".into(),
            add_column: "ALTER TABLE {0:NAME} ADD COLUMN {1}".into(),
            drop_column: "ALTER TABLE {0:NAME} DROP COLUMN {1:NAME}".into(),
            rename_column: Some("ALTER TABLE {0:NAME} RENAME COLUMN {1:NAME} TO {2:NAME}".into()),
            change_column: ChangeColumn::Unsupported,
            add_constraint: "ALTER TABLE {0:NAME} ADD CONSTRAINT {1:NAME} {2}".into(),
            drop_constraint: "ALTER TABLE {0:NAME} DROP CONSTRAINT {1:NAME}".into(),
            create_index: "CREATE {0}INDEX {1:NAME} ON {2:NAME} ({3:COLS})".into(),
            drop_index: "DROP INDEX {0:NAME}".into(),
            begin: "BEGIN".into(),
            commit: "COMMIT".into(),
            rollback: "ROLLBACK".into(),
        }
    }
}

/// Catalog queries backing the existence checks.
///
/// Every query returns a single count (or, for `tables`, one name per row)
/// and binds its parameters in this order: schema (empty string for the
/// default schema), table, then column/constraint/index name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogQueries {
    pub table_exists: String,
    pub column_exists: String,
    pub constraint_exists: Option<String>,
    pub index_exists: String,
    pub tables: String,
}

/// Literal rendering rules for default values.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Literals {
    bool_true: String,
    bool_false: String,
    string_prefix: String,
    backslash_escapes: bool,
    bytes: BytesLiteral,
}

impl Default for Literals {
    fn default() -> Self {
        Self {
            bool_true: "TRUE".into(),
            bool_false: "FALSE".into(),
            string_prefix: String::new(),
            backslash_escapes: false,
            bytes: BytesLiteral::HexQuoted,
        }
    }
}

/// Immutable capability description of one SQL dialect.
#[derive(Debug, Clone)]
pub struct Dialect {
    name: String,
    quote: QuoteStyle,
    types: TypeMap,
    properties: PropertyMap,
    fk_actions: ForeignKeyActionMap,
    param_style: ParamStyle,
    batch_separator: Option<String>,
    features: DialectFeatures,
    statements: Statements,
    catalog: CatalogQueries,
    literals: Literals,
}

impl Dialect {
    /// Start building a dialect.
    ///
    /// The type map is required; everything else defaults to ANSI behavior.
    pub fn builder(name: impl Into<String>, types: TypeMap) -> DialectBuilder {
        DialectBuilder {
            dialect: Dialect {
                name: name.into(),
                quote: QuoteStyle::double_quote(),
                types,
                properties: PropertyMap::builder()
                    .put(ColumnProperty::NOT_NULL, "NOT NULL")
                    .put(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY")
                    .put(ColumnProperty::UNIQUE, "UNIQUE")
                    .build(),
                fk_actions: ForeignKeyActionMap::builder().standard().build(),
                param_style: ParamStyle::Question,
                batch_separator: None,
                features: DialectFeatures::default(),
                statements: Statements::default(),
                catalog: CatalogQueries::default(),
                literals: Literals::default(),
            },
        }
    }

    /// Reopen this dialect for changes, e.g. to register a variant of a
    /// built-in dialect under another name.
    pub fn into_builder(self) -> DialectBuilder {
        DialectBuilder { dialect: self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quote_style(&self) -> &QuoteStyle {
        &self.quote
    }

    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn fk_actions(&self) -> &ForeignKeyActionMap {
        &self.fk_actions
    }

    pub fn features(&self) -> &DialectFeatures {
        &self.features
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    pub fn catalog(&self) -> &CatalogQueries {
        &self.catalog
    }

    pub fn param_style(&self) -> ParamStyle {
        self.param_style
    }

    pub fn batch_separator(&self) -> Option<&str> {
        self.batch_separator.as_deref()
    }

    /// Formatter quoting with this dialect's quote style.
    pub fn formatter(&self) -> IdentifierFormatter<'_> {
        IdentifierFormatter::new(&self.quote)
    }

    /// Render a SQL template.
    pub fn format(&self, template: &str, args: &[FormatArg<'_>]) -> Result<String> {
        self.formatter().format(template, args)
    }

    /// Quote a single identifier.
    pub fn quote_ident(&self, name: &str) -> Result<String> {
        self.quote.quote(name)
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn param(&self, index: usize) -> String {
        self.param_style.placeholder(index)
    }

    /// SQL type for a column type.
    pub fn column_type(&self, column_type: &ColumnType) -> Result<String> {
        self.types.resolve(column_type)
    }

    /// `ON DELETE ...` / `ON UPDATE ...` clause, or empty.
    pub fn fk_action(&self, action: ForeignKeyAction, event: ForeignKeyEvent) -> String {
        self.fk_actions.resolve(action, event)
    }

    /// Render a value as an inline SQL literal.
    pub fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(true) => self.literals.bool_true.clone(),
            SqlValue::Bool(false) => self.literals.bool_false.clone(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(s) => {
                let mut escaped = s.replace('\'', "''");
                if self.literals.backslash_escapes {
                    escaped = escaped.replace('\\', "\\\\");
                }
                format!("{}'{}'", self.literals.string_prefix, escaped)
            }
            SqlValue::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                match self.literals.bytes {
                    BytesLiteral::HexQuoted => format!("X'{}'", hex),
                    BytesLiteral::ZeroX => format!("0x{}", hex),
                    BytesLiteral::Escaped => format!("'\\x{}'", hex.to_lowercase()),
                }
            }
        }
    }

    /// Split a script into batches on the dialect's batch separator line.
    ///
    /// Dialects without a separator run the whole script as one batch.
    /// Blank batches are dropped.
    pub fn split_batches(&self, script: &str) -> Vec<String> {
        let Some(separator) = self.batch_separator.as_deref() else {
            let trimmed = script.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        };

        let mut batches = Vec::new();
        let mut current = String::new();
        for line in script.lines() {
            if line.trim().eq_ignore_ascii_case(separator) {
                if !current.trim().is_empty() {
                    batches.push(current.trim().to_string());
                }
                current.clear();
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        if !current.trim().is_empty() {
            batches.push(current.trim().to_string());
        }
        batches
    }
}

/// Builder for [`Dialect`].
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    pub fn quote(mut self, quote: QuoteStyle) -> Self {
        self.dialect.quote = quote;
        self
    }

    pub fn properties(mut self, properties: PropertyMap) -> Self {
        self.dialect.properties = properties;
        self
    }

    pub fn fk_actions(mut self, fk_actions: ForeignKeyActionMap) -> Self {
        self.dialect.fk_actions = fk_actions;
        self
    }

    pub fn param_style(mut self, style: ParamStyle) -> Self {
        self.dialect.param_style = style;
        self
    }

    pub fn batch_separator(mut self, separator: impl Into<String>) -> Self {
        self.dialect.batch_separator = Some(separator.into());
        self
    }

    pub fn features(mut self, features: DialectFeatures) -> Self {
        self.dialect.features = features;
        self
    }

    pub fn statements(mut self, statements: Statements) -> Self {
        self.dialect.statements = statements;
        self
    }

    pub fn catalog(mut self, catalog: CatalogQueries) -> Self {
        self.dialect.catalog = catalog;
        self
    }

    pub fn bool_literals(mut self, true_literal: &str, false_literal: &str) -> Self {
        self.dialect.literals.bool_true = true_literal.to_string();
        self.dialect.literals.bool_false = false_literal.to_string();
        self
    }

    /// Prefix for string literals (`N` for national character literals).
    pub fn string_prefix(mut self, prefix: &str) -> Self {
        self.dialect.literals.string_prefix = prefix.to_string();
        self
    }

    pub fn backslash_escapes(mut self, enabled: bool) -> Self {
        self.dialect.literals.backslash_escapes = enabled;
        self
    }

    pub fn bytes_literal(mut self, style: BytesLiteral) -> Self {
        self.dialect.literals.bytes = style;
        self
    }

    pub fn build(self) -> Dialect {
        self.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::DbType;

    fn bare() -> Dialect {
        let types = TypeMapBuilder::new("bare")
            .unbounded(DbType::Int64, "bigint")
            .build();
        Dialect::builder("bare", types).build()
    }

    #[test]
    fn test_param_styles() {
        assert_eq!(ParamStyle::Dollar.placeholder(2), "$2");
        assert_eq!(ParamStyle::AtP.placeholder(2), "@P2");
        assert_eq!(ParamStyle::Question.placeholder(2), "?");
        assert_eq!(ParamStyle::NumberedQuestion.placeholder(2), "?2");
    }

    #[test]
    fn test_text_literal_escaping() {
        let plain = bare();
        assert_eq!(plain.literal(&SqlValue::Text("it's".into())), "'it''s'");

        let types = TypeMapBuilder::new("mysqlish").build();
        let mysqlish = Dialect::builder("mysqlish", types)
            .backslash_escapes(true)
            .build();
        assert_eq!(mysqlish.literal(&SqlValue::Text("a\\b".into())), "'a\\\\b'");
    }

    #[test]
    fn test_bytes_literals() {
        let types = TypeMapBuilder::new("x").build();
        let zero_x = Dialect::builder("x", types)
            .bytes_literal(BytesLiteral::ZeroX)
            .build();
        assert_eq!(zero_x.literal(&SqlValue::Bytes(vec![0x0a, 0xff])), "0x0AFF");
        assert_eq!(bare().literal(&SqlValue::Bytes(vec![0x0a])), "X'0A'");
    }

    #[test]
    fn test_split_batches_without_separator() {
        let dialect = bare();
        assert_eq!(
            dialect.split_batches("  CREATE TABLE a (id int);\nCREATE TABLE b (id int);  "),
            vec!["CREATE TABLE a (id int);\nCREATE TABLE b (id int);".to_string()]
        );
        assert!(dialect.split_batches(" \n ").is_empty());
    }

    #[test]
    fn test_split_batches_on_go_lines() {
        let types = TypeMapBuilder::new("x").build();
        let dialect = Dialect::builder("x", types).batch_separator("GO").build();
        let script = "CREATE TABLE a (id int)\ngo\n\nGO\nCREATE VIEW v AS SELECT 1 AS one\n  GO  \n";
        assert_eq!(
            dialect.split_batches(script),
            vec![
                "CREATE TABLE a (id int)".to_string(),
                "CREATE VIEW v AS SELECT 1 AS one".to_string(),
            ]
        );
    }

    #[test]
    fn test_into_builder_keeps_everything_else() {
        let base = bare().into_builder().param_style(ParamStyle::Dollar).build();
        let variant = base
            .clone()
            .into_builder()
            .features(DialectFeatures {
                transactional_ddl: false,
                ..*base.features()
            })
            .build();

        assert!(!variant.features().transactional_ddl);
        assert_eq!(variant.name(), "bare");
        assert_eq!(variant.param(1), "$1");
    }
}
