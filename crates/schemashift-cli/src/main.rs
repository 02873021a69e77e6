//! schemashift CLI - versioned schema migrations.

use clap::{Parser, Subcommand};
use schemashift::{
    Config, ConnectionConfig, MigrateError, MigrationRegistry, MigrationsConfig, Migrator,
    ProviderFactory, SqlScriptSource,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "schemashift")]
#[command(about = "Versioned schema migrations for PostgreSQL, SQL Server, MySQL and SQLite")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "schemashift.yaml")]
    config: PathBuf,

    /// Override connection.dialect
    #[arg(long, global = true)]
    dialect: Option<String>,

    /// Override connection.url
    #[arg(long, global = true)]
    url: Option<String>,

    /// Override migrations.dir
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Override migrations.series_key
    #[arg(long, global = true)]
    series: Option<String>,

    /// Output JSON result to stdout
    #[arg(long, global = true)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply or revert migrations up to a target version
    Migrate {
        /// Target version; omit or pass -1 for the latest available
        #[arg(long, allow_hyphen_values = true)]
        to: Option<i64>,

        /// Dry run: show the plan without changing the database
        #[arg(long)]
        dry_run: bool,
    },

    /// List every known version with its applied and available flags
    Status,

    /// List applied versions
    Applied,

    /// Validate the migration set without connecting to a database
    Check,

    /// Remove a version from the bookkeeping table without reverting it
    Forget {
        /// Version to forget
        version: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    // Check only needs the scripts, so it runs without a config file.
    if let Commands::Check = cli.command {
        let migrations = migrations_config(&cli)?;
        let registry = load_registry(&migrations)?;
        let units = registry.load(&migrations.series_key)?;

        if cli.output_json {
            println!("{}", serde_json::to_string_pretty(&units)?);
        } else {
            println!(
                "{} migrations in series '{}' are valid",
                units.len(),
                migrations.series_key
            );
            for unit in &units {
                println!("  {:>12}  {}", unit.version, unit.name);
            }
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    info!("Loaded configuration from {:?}", cli.config);

    let registry = load_registry(&config.migrations)?;
    let factory = ProviderFactory::with_builtins();
    let provider = factory
        .create(
            &config.connection.dialect,
            &config.connection.url,
            Some(config.connection.command_timeout()),
        )
        .await?;
    let mut migrator = Migrator::new(provider, registry).with_series(&config.migrations.series_key);

    match cli.command {
        Commands::Check => unreachable!(), // Handled above
        Commands::Migrate { to, dry_run } => {
            if dry_run {
                let plan = migrator.plan(to).await?;
                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&plan)?);
                } else if plan.is_empty() {
                    println!("Dry run: nothing to do at version {}", plan.start_version);
                } else {
                    println!(
                        "Dry run: {} -> {} ({} steps)",
                        plan.start_version,
                        plan.target_version,
                        plan.versions.len()
                    );
                    for (version, direction) in plan.steps() {
                        println!("  {} {}", direction, version);
                    }
                }
                return Ok(());
            }

            let report = migrator.migrate(to).await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nMigration completed!");
                println!("  Series: '{}'", report.series_key);
                println!(
                    "  Version: {} -> {}",
                    report.start_version, report.final_version
                );
                println!("  Steps: {}", report.steps.len());
                for step in &report.steps {
                    println!(
                        "    {} {} ({}) {}ms",
                        step.direction, step.version, step.name, step.duration_ms
                    );
                }
            }
        }

        Commands::Status => {
            let rows = migrator.status().await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Migration status for series '{}':", migrator.series_key());
                for row in &rows {
                    let state = match (row.applied, row.available) {
                        (true, true) => "applied",
                        (true, false) => "applied (missing unit)",
                        (false, _) => "pending",
                    };
                    println!(
                        "  {:>12}  {:<24} {}",
                        row.version,
                        row.name.as_deref().unwrap_or("-"),
                        state
                    );
                }
            }
        }

        Commands::Applied => {
            let versions = migrator.applied_versions().await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&versions)?);
            } else {
                for version in &versions {
                    println!("{}", version);
                }
            }
        }

        Commands::Forget { version } => {
            let removed = migrator.forget(version).await?;
            if cli.output_json {
                println!(
                    "{}",
                    serde_json::json!({ "version": version, "removed": removed })
                );
            } else if removed {
                println!("Forgot version {}", version);
            } else {
                println!("Version {} was not applied", version);
            }
        }
    }

    Ok(())
}

/// Migrations settings from the config file (when present) plus flag overrides.
fn migrations_config(cli: &Cli) -> Result<MigrationsConfig, MigrateError> {
    let mut migrations = if cli.config.exists() {
        Config::load(&cli.config)?.migrations
    } else {
        MigrationsConfig::default()
    };
    if let Some(dir) = &cli.dir {
        migrations.dir = dir.clone();
    }
    if let Some(series) = &cli.series {
        migrations.series_key = series.clone();
    }
    Ok(migrations)
}

/// Full configuration with flag overrides applied.
///
/// The config file may be omitted when `--dialect` and `--url` are given.
fn load_config(cli: &Cli) -> Result<Config, MigrateError> {
    let mut config = if cli.config.exists() || cli.dialect.is_none() || cli.url.is_none() {
        Config::load(&cli.config)?
    } else {
        Config {
            connection: ConnectionConfig {
                dialect: String::new(),
                url: String::new(),
                command_timeout_secs: None,
            },
            migrations: MigrationsConfig::default(),
        }
    };

    if let Some(dialect) = &cli.dialect {
        config.connection.dialect = dialect.clone();
    }
    if let Some(url) = &cli.url {
        config.connection.url = url.clone();
    }
    if let Some(dir) = &cli.dir {
        config.migrations.dir = dir.clone();
    }
    if let Some(series) = &cli.series {
        config.migrations.series_key = series.clone();
    }

    config.validate()?;
    Ok(config)
}

fn load_registry(migrations: &MigrationsConfig) -> Result<MigrationRegistry, MigrateError> {
    let source = SqlScriptSource::load(&migrations.dir)?;
    let mut registry = MigrationRegistry::new();
    registry.extend(source.into_definitions());
    Ok(registry)
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
