//! Identifier validation, quoting and SQL template rendering.
//!
//! SQL identifiers (table names, column names, schema names) cannot be passed as
//! parameters in prepared statements, so every DDL statement the providers emit
//! is rendered from a template by [`IdentifierFormatter`]. Quoting is dialect
//! data ([`QuoteStyle`]), not code:
//!
//! - PostgreSQL / SQLite: `"{0}"`
//! - SQL Server: `[{0}]`
//! - MySQL: `` `{0}` ``
//!
//! # Template placeholders
//!
//! Placeholders are positional, `{index}` or `{index:KIND}`:
//!
//! - `{0:NAME}` quotes a single identifier. A [`SchemaQualifiedName`] with a
//!   schema renders as `quoted_schema.quoted_name`.
//! - `{1:COLS}` quotes every element of a list and joins them with `, `.
//! - `{2}` substitutes the argument verbatim.
//!
//! `{{` and `}}` produce literal braces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier before it is quoted into SQL.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::invalid_object("Identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(MigrateError::invalid_object(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::invalid_object(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Opening and closing quote strings for a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteStyle {
    open: String,
    close: String,
}

impl QuoteStyle {
    /// Create a quote style from its opening and closing delimiters.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// ANSI double quotes.
    pub fn double_quote() -> Self {
        Self::new("\"", "\"")
    }

    /// SQL Server brackets.
    pub fn brackets() -> Self {
        Self::new("[", "]")
    }

    /// MySQL backticks.
    pub fn backticks() -> Self {
        Self::new("`", "`")
    }

    /// Parse a quote template such as `"{0}"` or `[{0}]`.
    pub fn from_template(template: &str) -> Result<Self> {
        let (open, close) = template.split_once("{0}").ok_or_else(|| {
            MigrateError::Template(format!(
                "Quote template {:?} must contain the {{0}} placeholder",
                template
            ))
        })?;
        Ok(Self::new(open, close))
    }

    /// Quote a single identifier, doubling the closing quote inside the name.
    pub fn quote(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        let escaped = if self.close.is_empty() {
            name.to_string()
        } else {
            name.replace(&self.close, &format!("{}{}", self.close, self.close))
        };
        Ok(format!("{}{}{}", self.open, escaped, self.close))
    }

    /// Quote a possibly schema-qualified name.
    pub fn quote_qualified(&self, name: &SchemaQualifiedName) -> Result<String> {
        match name.schema() {
            Some(schema) => Ok(format!("{}.{}", self.quote(schema)?, self.quote(&name.name)?)),
            None => self.quote(&name.name),
        }
    }
}

/// A table or index name with an optional schema.
///
/// An empty schema is treated as absent, so the object resolves to the
/// connection's default schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaQualifiedName {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
}

impl SchemaQualifiedName {
    /// Unqualified name in the default schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Name qualified with a schema.
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// The schema, if one is set and non-empty.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref().filter(|s| !s.is_empty())
    }

    /// The same schema with a different object name.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            schema: self.schema.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SchemaQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.schema() {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for SchemaQualifiedName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SchemaQualifiedName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// An argument for a template placeholder.
#[derive(Debug, Clone, Copy)]
pub enum FormatArg<'a> {
    Text(&'a str),
    Name(&'a SchemaQualifiedName),
    List(&'a [String]),
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(value: &'a str) -> Self {
        FormatArg::Text(value)
    }
}

impl<'a> From<&'a String> for FormatArg<'a> {
    fn from(value: &'a String) -> Self {
        FormatArg::Text(value)
    }
}

impl<'a> From<&'a SchemaQualifiedName> for FormatArg<'a> {
    fn from(value: &'a SchemaQualifiedName) -> Self {
        FormatArg::Name(value)
    }
}

impl<'a> From<&'a [String]> for FormatArg<'a> {
    fn from(value: &'a [String]) -> Self {
        FormatArg::List(value)
    }
}

impl<'a> From<&'a Vec<String>> for FormatArg<'a> {
    fn from(value: &'a Vec<String>) -> Self {
        FormatArg::List(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaceholderKind {
    Plain,
    Name,
    Cols,
}

/// Renders SQL templates with dialect-aware identifier quoting.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierFormatter<'a> {
    quote: &'a QuoteStyle,
}

impl<'a> IdentifierFormatter<'a> {
    pub fn new(quote: &'a QuoteStyle) -> Self {
        Self { quote }
    }

    /// Render `template`, substituting positional placeholders from `args`.
    pub fn format(&self, template: &str, args: &[FormatArg<'_>]) -> Result<String> {
        let mut out = String::with_capacity(template.len() + 16);
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut spec = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => spec.push(ch),
                            None => {
                                return Err(MigrateError::Template(format!(
                                    "Unterminated placeholder in {:?}",
                                    template
                                )))
                            }
                        }
                    }
                    self.render_placeholder(&spec, args, &mut out)?;
                }
                '}' => {
                    return Err(MigrateError::Template(format!(
                        "Unmatched '}}' in {:?}",
                        template
                    )))
                }
                _ => out.push(c),
            }
        }

        Ok(out)
    }

    fn render_placeholder(&self, spec: &str, args: &[FormatArg<'_>], out: &mut String) -> Result<()> {
        let (index, kind) = match spec.split_once(':') {
            Some((index, "NAME")) => (index, PlaceholderKind::Name),
            Some((index, "COLS")) => (index, PlaceholderKind::Cols),
            Some((_, other)) => {
                return Err(MigrateError::Template(format!(
                    "Unknown placeholder kind '{}'",
                    other
                )))
            }
            None => (spec, PlaceholderKind::Plain),
        };

        let index: usize = index.trim().parse().map_err(|_| {
            MigrateError::Template(format!("Placeholder index '{}' is not a number", index))
        })?;
        let arg = args.get(index).ok_or_else(|| {
            MigrateError::Template(format!(
                "Placeholder {{{}}} has no argument ({} given)",
                index,
                args.len()
            ))
        })?;

        match (kind, arg) {
            (PlaceholderKind::Plain, FormatArg::Text(text)) => out.push_str(text),
            (PlaceholderKind::Plain, FormatArg::Name(name)) => out.push_str(&name.to_string()),
            (PlaceholderKind::Plain, FormatArg::List(items)) => out.push_str(&items.join(", ")),
            (PlaceholderKind::Name, FormatArg::Text(text)) => out.push_str(&self.quote.quote(text)?),
            (PlaceholderKind::Name, FormatArg::Name(name)) => {
                out.push_str(&self.quote.quote_qualified(name)?)
            }
            (PlaceholderKind::Cols, FormatArg::List(items)) => {
                let quoted = items
                    .iter()
                    .map(|item| self.quote.quote(item))
                    .collect::<Result<Vec<_>>>()?;
                out.push_str(&quoted.join(", "));
            }
            (PlaceholderKind::Cols, FormatArg::Text(text)) => out.push_str(&self.quote.quote(text)?),
            (kind, arg) => {
                return Err(MigrateError::Template(format!(
                    "Placeholder {{{}}} of kind {:?} cannot render {:?}",
                    index, kind, arg
                )))
            }
        }

        Ok(())
    }
}

/// Validate a check constraint expression before it is embedded in DDL.
///
/// Check expressions are spliced into `ALTER TABLE ... CHECK (...)` verbatim,
/// so statement separators and comment markers are rejected.
pub fn validate_check_expression(expression: &str) -> Result<()> {
    if expression.trim().is_empty() {
        return Err(MigrateError::invalid_object(
            "Check constraint expression cannot be empty",
        ));
    }

    if expression.contains(';') {
        return Err(MigrateError::invalid_object(format!(
            "Check constraint contains semicolon: {:?}",
            expression
        )));
    }

    if expression.contains("--") || expression.contains("/*") || expression.contains("*/") {
        return Err(MigrateError::invalid_object(format!(
            "Check constraint contains SQL comment markers: {:?}",
            expression
        )));
    }

    let lower = expression.to_lowercase();
    if lower.split_whitespace().any(|word| {
        word == "exec" || word == "execute" || word.starts_with("exec(") || word.starts_with("execute(")
    }) {
        return Err(MigrateError::invalid_object(format!(
            "Check constraint contains EXEC/EXECUTE keyword: {:?}",
            expression
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_length_boundary() {
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
        let result = validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1));
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    // =========================================================================
    // Quoting tests
    // =========================================================================

    #[test]
    fn test_quote_doubles_closing_character() {
        assert_eq!(QuoteStyle::double_quote().quote("a\"b").unwrap(), "\"a\"\"b\"");
        assert_eq!(QuoteStyle::brackets().quote("table]name").unwrap(), "[table]]name]");
        assert_eq!(QuoteStyle::backticks().quote("a`b").unwrap(), "`a``b`");
    }

    #[test]
    fn test_quote_injection_is_contained() {
        let quoted = QuoteStyle::brackets()
            .quote("Robert]; DROP TABLE Students;--")
            .unwrap();
        assert_eq!(quoted, "[Robert]]; DROP TABLE Students;--]");
    }

    #[test]
    fn test_quote_style_from_template() {
        let style = QuoteStyle::from_template("[{0}]").unwrap();
        assert_eq!(style, QuoteStyle::brackets());
        assert!(QuoteStyle::from_template("[]").is_err());
    }

    #[test]
    fn test_quote_qualified_skips_empty_schema() {
        let style = QuoteStyle::double_quote();
        let qualified = SchemaQualifiedName::with_schema("audit", "events");
        let blank = SchemaQualifiedName::with_schema("", "events");
        assert_eq!(style.quote_qualified(&qualified).unwrap(), "\"audit\".\"events\"");
        assert_eq!(style.quote_qualified(&blank).unwrap(), "\"events\"");
    }

    // =========================================================================
    // Formatter tests
    // =========================================================================

    #[test]
    fn test_name_placeholder_under_brackets() {
        let style = QuoteStyle::brackets();
        let sql = IdentifierFormatter::new(&style)
            .format("DROP TABLE {0:NAME}", &[FormatArg::Text("Order]s")])
            .unwrap();
        assert_eq!(sql, "DROP TABLE [Order]]s]");
    }

    #[test]
    fn test_name_placeholder_under_double_quotes() {
        let style = QuoteStyle::double_quote();
        let sql = IdentifierFormatter::new(&style)
            .format("DROP TABLE {0:NAME}", &[FormatArg::Text("Order\"s")])
            .unwrap();
        assert_eq!(sql, "DROP TABLE \"Order\"\"s\"");
    }

    #[test]
    fn test_cols_and_plain_placeholders() {
        let style = QuoteStyle::double_quote();
        let table = SchemaQualifiedName::with_schema("sales", "orders");
        let cols = vec!["id".to_string(), "customer_id".to_string()];
        let sql = IdentifierFormatter::new(&style)
            .format(
                "CREATE {2}INDEX {0:NAME} ON {1:NAME} ({3:COLS})",
                &[
                    FormatArg::Text("ix_orders"),
                    FormatArg::Name(&table),
                    FormatArg::Text("UNIQUE "),
                    FormatArg::List(&cols),
                ],
            )
            .unwrap();
        assert_eq!(
            sql,
            "CREATE UNIQUE INDEX \"ix_orders\" ON \"sales\".\"orders\" (\"id\", \"customer_id\")"
        );
    }

    #[test]
    fn test_escaped_braces() {
        let style = QuoteStyle::double_quote();
        let sql = IdentifierFormatter::new(&style)
            .format("SELECT '{{}}' FROM {0:NAME}", &[FormatArg::Text("t")])
            .unwrap();
        assert_eq!(sql, "SELECT '{}' FROM \"t\"");
    }

    #[test]
    fn test_missing_argument_is_error() {
        let style = QuoteStyle::double_quote();
        let result = IdentifierFormatter::new(&style).format("{1:NAME}", &[FormatArg::Text("t")]);
        assert!(matches!(result, Err(MigrateError::Template(_))));
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let style = QuoteStyle::double_quote();
        let result = IdentifierFormatter::new(&style).format("{0:TABLE}", &[FormatArg::Text("t")]);
        assert!(matches!(result, Err(MigrateError::Template(_))));
    }

    // =========================================================================
    // Check expression tests
    // =========================================================================

    #[test]
    fn test_check_expression_valid() {
        assert!(validate_check_expression("value > 0").is_ok());
        assert!(validate_check_expression("status IN ('active', 'inactive')").is_ok());
        assert!(validate_check_expression("status = 'executive'").is_ok());
    }

    #[test]
    fn test_check_expression_rejects_injection() {
        assert!(validate_check_expression("1=1; DROP TABLE users").is_err());
        assert!(validate_check_expression("1=1 -- bypass").is_err());
        assert!(validate_check_expression("1=1 /* x */").is_err());
        assert!(validate_check_expression("EXEC something").is_err());
        assert!(validate_check_expression("   ").is_err());
    }
}
