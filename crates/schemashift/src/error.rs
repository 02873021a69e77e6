//! Error types for the migration library.

use thiserror::Error;

use crate::migration::Direction;

/// Boxed native driver error carried as the `source()` of SQL failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two or more registered units share a version
    #[error("Duplicated migration versions: {}", join_versions(.versions))]
    DuplicatedVersions { versions: Vec<i64> },

    /// Available units older than the current version were never applied
    #[error(
        "Skipped migrations: {} are older than the current version but not applied",
        join_versions(.versions)
    )]
    SkippedMigrations { versions: Vec<i64> },

    /// The plan needs a version that has no registered unit
    #[error("Migration {version} is not registered")]
    MigrationNotFound { version: i64 },

    /// Could not open a database connection
    #[error("Failed to connect to {dialect} database: {source}")]
    Connect {
        dialect: String,
        #[source]
        source: BoxError,
    },

    /// Native driver failure with the statement that caused it
    #[error("SQL execution failed: {source}\n  Statement: {sql}")]
    SqlExecution {
        sql: String,
        #[source]
        source: BoxError,
    },

    /// The dialect has no mapping for the requested column type
    #[error("Dialect {dialect} does not support type {db_type}{}", describe_length(.length))]
    UnsupportedType {
        dialect: String,
        db_type: String,
        length: Option<u32>,
    },

    /// The dialect cannot express the requested operation
    #[error("Dialect {dialect} does not support {feature}")]
    UnsupportedFeature { dialect: String, feature: String },

    /// A schema operation was rejected before any SQL was sent
    #[error("Invalid schema object: {0}")]
    InvalidSchemaObject(String),

    /// SQL template could not be rendered
    #[error("Template error: {0}")]
    Template(String),

    /// No provider registration matches the requested name
    #[error("Unknown dialect or provider '{0}'")]
    UnresolvedDialect(String),

    /// A provider registration cannot be instantiated
    #[error("Provider '{name}' cannot be created: {reason}")]
    InvalidProviderShape { name: String, reason: String },

    /// A migration step failed; the plan stopped at this version
    #[error("Migration {version} ({name}) failed during {direction}{}", partial_note(.partial))]
    Step {
        version: i64,
        name: String,
        direction: Direction,
        /// The failed step's changes could not be fully rolled back.
        partial: bool,
        #[source]
        source: Box<MigrateError>,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_versions(versions: &[i64]) -> String {
    versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_length(length: &Option<u32>) -> String {
    match length {
        Some(l) => format!(" with length {}", l),
        None => String::new(),
    }
}

impl MigrateError {
    /// Wrap a native driver error together with the failing statement.
    pub fn sql(sql: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::SqlExecution {
            sql: sql.into(),
            source: source.into(),
        }
    }

    /// Wrap a driver error raised while connecting.
    pub fn connect(dialect: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::Connect {
            dialect: dialect.into(),
            source: source.into(),
        }
    }

    /// Create an UnsupportedFeature error for a dialect.
    pub fn unsupported(dialect: impl Into<String>, feature: impl Into<String>) -> Self {
        MigrateError::UnsupportedFeature {
            dialect: dialect.into(),
            feature: feature.into(),
        }
    }

    /// Create an InvalidSchemaObject error.
    pub fn invalid_object(message: impl Into<String>) -> Self {
        MigrateError::InvalidSchemaObject(message.into())
    }

    /// Wrap a failure raised while applying or reverting a unit.
    pub fn step(version: i64, name: impl Into<String>, direction: Direction, source: Self) -> Self {
        MigrateError::Step {
            version,
            name: name.into(),
            direction,
            partial: false,
            source: Box::new(source),
        }
    }

    /// Flag a step failure whose changes may have survived the rollback.
    pub fn with_partial_changes(mut self) -> Self {
        if let MigrateError::Step { partial, .. } = &mut self {
            *partial = true;
        }
        self
    }

    /// Returns true for errors raised while validating the migration set
    /// or planning, which never touch the database.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            MigrateError::DuplicatedVersions { .. } | MigrateError::SkippedMigrations { .. }
        )
    }

    /// Process exit code used by the command line runner.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_)
            | MigrateError::UnresolvedDialect(_)
            | MigrateError::InvalidProviderShape { .. } => 1,
            MigrateError::DuplicatedVersions { .. } | MigrateError::SkippedMigrations { .. } => 2,
            MigrateError::MigrationNotFound { .. }
            | MigrateError::SqlExecution { .. }
            | MigrateError::Step { .. } => 3,
            MigrateError::UnsupportedType { .. }
            | MigrateError::UnsupportedFeature { .. }
            | MigrateError::InvalidSchemaObject(_)
            | MigrateError::Template(_) => 4,
            MigrateError::Connect { .. } => 5,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

fn partial_note(partial: &bool) -> &'static str {
    if *partial {
        "; the schema may be partly changed"
    } else {
        ""
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicated_versions_message_lists_versions() {
        let err = MigrateError::DuplicatedVersions {
            versions: vec![3, 7],
        };
        assert_eq!(err.to_string(), "Duplicated migration versions: 3, 7");
        assert_eq!(err.exit_code(), 2);
        assert!(err.is_planning_error());
    }

    #[test]
    fn test_unsupported_type_message() {
        let err = MigrateError::UnsupportedType {
            dialect: "sqlserver".into(),
            db_type: "AnsiString".into(),
            length: Some(9000),
        };
        assert_eq!(
            err.to_string(),
            "Dialect sqlserver does not support type AnsiString with length 9000"
        );
    }

    #[test]
    fn test_step_error_keeps_driver_chain() {
        let driver = std::io::Error::new(std::io::ErrorKind::Other, "relation does not exist");
        let err = MigrateError::step(
            2,
            "add_orders",
            Direction::Apply,
            MigrateError::sql("SELECT * FROM orders", driver),
        );

        let detailed = err.format_detailed();
        assert!(detailed.contains("Migration 2 (add_orders) failed during apply\n"));
        assert!(detailed.contains("Statement: SELECT * FROM orders"));
        assert!(detailed.contains("relation does not exist"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_partial_step_error_mentions_leftover_changes() {
        let driver = std::io::Error::new(std::io::ErrorKind::Other, "syntax error");
        let err = MigrateError::step(
            4,
            "add_index",
            Direction::Revert,
            MigrateError::sql("DROP INDEX ix", driver),
        )
        .with_partial_changes();

        assert_eq!(
            err.to_string(),
            "Migration 4 (add_index) failed during revert; the schema may be partly changed"
        );
        assert_eq!(err.exit_code(), 3);

        // Only step failures carry the flag.
        let other = MigrateError::invalid_object("x").with_partial_changes();
        assert!(!other.to_string().contains("partly"));
    }
}
