//! SQL file migrations.
//!
//! A migrations directory holds `<version>_<name>.up.sql` files with an
//! optional `<version>_<name>.down.sql` partner. Leading comment lines may
//! carry directives:
//!
//! ```sql
//! -- schemashift:no-transaction
//! -- schemashift:series=billing
//! -- schemashift:ignore
//! ```
//!
//! Scripts run through the dialect's batch splitter, so SQL Server files
//! may use `GO` separators.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::provider::TransformationProvider;

use super::{Migration, MigrationDefinition, MigrationInfo};

const DIRECTIVE_PREFIX: &str = "schemashift:";

/// A unit backed by SQL text.
#[derive(Debug, Clone)]
pub struct SqlScriptMigration {
    name: String,
    up: String,
    down: Option<String>,
}

impl SqlScriptMigration {
    pub fn new(name: impl Into<String>, up: impl Into<String>, down: Option<String>) -> Self {
        Self {
            name: name.into(),
            up: up.into(),
            down,
        }
    }

    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }
}

async fn run_script(db: &mut dyn TransformationProvider, script: &str) -> Result<()> {
    let batches = db.dialect().split_batches(script);
    for batch in &batches {
        db.batch(batch).await?;
    }
    Ok(())
}

#[async_trait]
impl Migration for SqlScriptMigration {
    async fn apply(&self, db: &mut dyn TransformationProvider) -> Result<()> {
        run_script(db, &self.up).await
    }

    async fn revert(&self, db: &mut dyn TransformationProvider) -> Result<()> {
        match &self.down {
            Some(down) => run_script(db, down).await,
            None => {
                warn!("Migration {} has no down script; revert does nothing", self.name);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptKind {
    Up,
    Down,
}

fn parse_file_name(file_name: &str) -> Option<(i64, &str, ScriptKind)> {
    let (stem, kind) = if let Some(stem) = file_name.strip_suffix(".up.sql") {
        (stem, ScriptKind::Up)
    } else if let Some(stem) = file_name.strip_suffix(".down.sql") {
        (stem, ScriptKind::Down)
    } else {
        return None;
    };

    let (version, name) = stem.split_once('_')?;
    let version = version.parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((version, name, kind))
}

/// Apply the directives found in the leading comment block to `info`.
fn apply_directives(mut info: MigrationInfo, script: &str) -> MigrationInfo {
    for line in script.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix("--") else {
            break;
        };
        let Some(directive) = comment.trim().strip_prefix(DIRECTIVE_PREFIX) else {
            continue;
        };

        match directive.trim() {
            "no-transaction" => info.without_transaction = true,
            "ignore" => info.ignore = true,
            other => match other.strip_prefix("series=") {
                Some(key) => info.series_key = key.trim().to_string(),
                None => warn!("Unknown directive '{}' in migration {}", other, info.name),
            },
        }
    }
    info
}

#[derive(Default)]
struct ScriptPair {
    up: Option<String>,
    down: Option<String>,
}

/// Migration units discovered from SQL files.
#[derive(Debug, Clone, Default)]
pub struct SqlScriptSource {
    definitions: Vec<MigrationDefinition>,
}

impl SqlScriptSource {
    /// Read every `*.up.sql`/`*.down.sql` file in `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(MigrateError::Config(format!(
                "Migrations directory {} does not exist",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if parse_file_name(&file_name).is_none() {
                debug!("Skipping {}: not a migration script", file_name);
                continue;
            }
            let contents = std::fs::read_to_string(entry.path())?;
            files.push((file_name, contents));
        }

        let source = Self::from_files(files)?;
        info!(
            "Loaded {} SQL migrations from {}",
            source.definitions.len(),
            dir.display()
        );
        Ok(source)
    }

    /// Build units from `(file name, contents)` pairs.
    pub fn from_files(files: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut pairs: BTreeMap<(i64, String), ScriptPair> = BTreeMap::new();

        for (file_name, contents) in files {
            let Some((version, name, kind)) = parse_file_name(&file_name) else {
                continue;
            };
            let pair = pairs.entry((version, name.to_string())).or_default();
            match kind {
                ScriptKind::Up => pair.up = Some(contents),
                ScriptKind::Down => pair.down = Some(contents),
            }
        }

        let mut definitions = Vec::with_capacity(pairs.len());
        for ((version, name), pair) in pairs {
            let Some(up) = pair.up else {
                return Err(MigrateError::Config(format!(
                    "Migration {}_{} has a down script but no up script",
                    version, name
                )));
            };
            let info = apply_directives(MigrationInfo::new(version, name.clone()), &up);
            definitions.push(MigrationDefinition::new(
                info,
                SqlScriptMigration::new(name, up, pair.down),
            ));
        }

        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &[MigrationDefinition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<MigrationDefinition> {
        self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, contents: &str) -> (String, String) {
        (name.to_string(), contents.to_string())
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("20240101_create_users.up.sql"),
            Some((20240101, "create_users", ScriptKind::Up))
        );
        assert_eq!(
            parse_file_name("3_drop.down.sql"),
            Some((3, "drop", ScriptKind::Down))
        );
        assert_eq!(parse_file_name("README.md"), None);
        assert_eq!(parse_file_name("abc_name.up.sql"), None);
        assert_eq!(parse_file_name("7_.up.sql"), None);
    }

    #[test]
    fn test_pairs_and_directives() {
        let source = SqlScriptSource::from_files(vec![
            file("2_orders.up.sql", "-- schemashift:no-transaction\nCREATE TABLE orders (id int);"),
            file("2_orders.down.sql", "DROP TABLE orders;"),
            file(
                "1_users.up.sql",
                "-- header\n-- schemashift:series=billing\n\nCREATE TABLE users (id int);",
            ),
            file("3_old.up.sql", "-- schemashift:ignore\nSELECT 1;"),
        ])
        .unwrap();

        let infos: Vec<&MigrationInfo> = source.definitions().iter().map(|d| &d.info).collect();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].version, 1);
        assert_eq!(infos[0].series_key, "billing");
        assert!(infos[1].without_transaction);
        assert_eq!(infos[1].series_key, "");
        assert!(infos[2].ignore);
    }

    #[test]
    fn test_directive_after_sql_is_ignored() {
        let info = apply_directives(
            MigrationInfo::new(1, "x"),
            "CREATE TABLE t (id int);\n-- schemashift:ignore",
        );
        assert!(!info.ignore);
    }

    #[test]
    fn test_down_without_up_fails() {
        let err = SqlScriptSource::from_files(vec![file("4_orphan.down.sql", "DROP TABLE x;")])
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1_init.up.sql"), "CREATE TABLE a (id int);").unwrap();
        std::fs::write(dir.path().join("1_init.down.sql"), "DROP TABLE a;").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a migration").unwrap();

        let source = SqlScriptSource::load(dir.path()).unwrap();
        assert_eq!(source.definitions().len(), 1);
        assert_eq!(source.definitions()[0].info.name, "init");
    }

    #[test]
    fn test_missing_directory() {
        let err = SqlScriptSource::load("/nonexistent/schemashift/migrations").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
