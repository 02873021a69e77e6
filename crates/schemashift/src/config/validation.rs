//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.connection.dialect.trim().is_empty() {
        return Err(MigrateError::Config("connection.dialect is required".into()));
    }
    if config.connection.url.trim().is_empty() {
        return Err(MigrateError::Config("connection.url is required".into()));
    }
    if let Some(0) = config.connection.command_timeout_secs {
        return Err(MigrateError::Config(
            "connection.command_timeout_secs must be at least 1".into(),
        ));
    }

    if config.migrations.dir.as_os_str().is_empty() {
        return Err(MigrateError::Config("migrations.dir is required".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, MigrationsConfig};

    fn valid_config() -> Config {
        Config {
            connection: ConnectionConfig {
                dialect: "postgres".to_string(),
                url: "host=localhost user=app password=secret dbname=app".to_string(),
                command_timeout_secs: Some(30),
            },
            migrations: MigrationsConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_dialect() {
        let mut config = valid_config();
        config.connection.dialect = " ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_url() {
        let mut config = valid_config();
        config.connection.url = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = valid_config();
        config.connection.command_timeout_secs = Some(0);
        let err = validate(&config).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_dir() {
        let mut config = valid_config();
        config.migrations.dir = Default::default();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let mut config = valid_config();
        config.connection.url = "postgres://app:super_secret_password_123@db/app".to_string();
        let debug_output = format!("{:?}", config.connection);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
