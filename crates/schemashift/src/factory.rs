//! Provider factory: dialect name or alias to a connected provider.
//!
//! The [`ProviderFactory`] is a plain registry, constructed explicitly and
//! handed to whoever needs to open providers. Built-in dialects come from
//! [`ProviderFactory::with_builtins`]; callers add their own with
//! [`ProviderFactory::register`].
//!
//! A registration pairs immutable [`Dialect`] data with an optional
//! connector. Dialect data is always available (statement generation needs
//! no driver), while the connector only exists when the matching driver
//! feature is compiled in.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::dialect::Dialect;
use crate::drivers::{self, Connection};
use crate::error::{MigrateError, Result};
use crate::provider::{Provider, TransformationProvider};

/// Future returned by a [`Connector`].
pub type ConnectFuture = Pin<Box<dyn Future<Output = Result<Box<dyn Connection>>> + Send>>;

/// Opens a driver connection from a connection string.
pub type Connector = fn(String) -> ConnectFuture;

/// One resolvable provider.
#[derive(Debug, Clone)]
pub struct ProviderRegistration {
    name: String,
    qualified_name: String,
    aliases: Vec<String>,
    dialect: Arc<Dialect>,
    connector: Option<Connector>,
}

impl ProviderRegistration {
    /// Create a registration without a connector.
    pub fn new(name: impl Into<String>, qualified_name: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            name: name.into(),
            qualified_name: qualified_name.into(),
            aliases: Vec::new(),
            dialect: Arc::new(dialect),
            connector: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn connector(mut self, connector: Connector) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    pub fn has_connector(&self) -> bool {
        self.connector.is_some()
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.eq_ignore_ascii_case(needle)
            || self.qualified_name.eq_ignore_ascii_case(needle)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
    }
}

/// Registry of provider registrations.
#[derive(Debug, Clone, Default)]
pub struct ProviderFactory {
    registrations: Vec<ProviderRegistration>,
}

impl ProviderFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with PostgreSQL, SQL Server, MySQL and SQLite
    /// registered. Connectors are attached for the compiled-in drivers.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();

        let postgres = ProviderRegistration::new(
            drivers::postgres::NAME,
            "schemashift::drivers::PostgresConnection",
            drivers::postgres::dialect(),
        )
        .alias("postgresql")
        .alias("pg");
        #[cfg(feature = "postgres")]
        let postgres = postgres.connector(connect_postgres);
        factory.register(postgres);

        let mssql = ProviderRegistration::new(
            drivers::mssql::NAME,
            "schemashift::drivers::MssqlConnection",
            drivers::mssql::dialect(),
        )
        .alias("mssql")
        .alias("sql_server");
        #[cfg(feature = "mssql")]
        let mssql = mssql.connector(connect_mssql);
        factory.register(mssql);

        let mysql = ProviderRegistration::new(
            drivers::mysql::NAME,
            "schemashift::drivers::MysqlConnection",
            drivers::mysql::dialect(),
        )
        .alias("mariadb");
        #[cfg(feature = "mysql")]
        let mysql = mysql.connector(connect_mysql);
        factory.register(mysql);

        let sqlite = ProviderRegistration::new(
            drivers::sqlite::NAME,
            "schemashift::drivers::SqliteConnection",
            drivers::sqlite::dialect(),
        );
        #[cfg(feature = "sqlite")]
        let sqlite = sqlite.connector(connect_sqlite);
        factory.register(sqlite);

        factory
    }

    /// Register a provider. A registration with the same name replaces the
    /// earlier one.
    pub fn register(&mut self, registration: ProviderRegistration) {
        self.registrations
            .retain(|r| !r.name.eq_ignore_ascii_case(&registration.name));
        debug!("Registered provider {}", registration.name);
        self.registrations.push(registration);
    }

    /// Canonical names of every registration.
    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name.as_str()).collect()
    }

    /// Find a registration by name, alias or qualified name, ignoring case.
    pub fn resolve(&self, name: &str) -> Result<&ProviderRegistration> {
        let needle = name.trim();
        self.registrations
            .iter()
            .find(|r| r.matches(needle))
            .ok_or_else(|| MigrateError::UnresolvedDialect(name.to_string()))
    }

    /// Connect and wrap the connection in a provider.
    pub async fn create(
        &self,
        name: &str,
        connection_string: &str,
        command_timeout: Option<Duration>,
    ) -> Result<Box<dyn TransformationProvider>> {
        let registration = self.resolve(name)?;
        let connector = registration
            .connector
            .ok_or_else(|| MigrateError::InvalidProviderShape {
                name: registration.name.clone(),
                reason: "no connector registered (driver feature not compiled in?)".into(),
            })?;

        let connection = connector(connection_string.to_string()).await?;
        info!(
            "Opened {} provider using {}",
            registration.name,
            connection.driver_name()
        );
        Ok(Box::new(
            Provider::new(registration.dialect.clone(), connection).with_command_timeout(command_timeout),
        ))
    }

    /// Wrap an already open connection.
    pub fn create_with_connection(
        &self,
        name: &str,
        connection: Box<dyn Connection>,
        command_timeout: Option<Duration>,
    ) -> Result<Box<dyn TransformationProvider>> {
        let registration = self.resolve(name)?;
        Ok(Box::new(
            Provider::new(registration.dialect.clone(), connection).with_command_timeout(command_timeout),
        ))
    }
}

#[cfg(feature = "postgres")]
fn connect_postgres(url: String) -> ConnectFuture {
    Box::pin(async move {
        let connection = drivers::PostgresConnection::connect(&url).await?;
        Ok(Box::new(connection) as Box<dyn Connection>)
    })
}

#[cfg(feature = "mssql")]
fn connect_mssql(url: String) -> ConnectFuture {
    Box::pin(async move {
        let connection = drivers::MssqlConnection::connect(&url).await?;
        Ok(Box::new(connection) as Box<dyn Connection>)
    })
}

#[cfg(feature = "mysql")]
fn connect_mysql(url: String) -> ConnectFuture {
    Box::pin(async move {
        let connection = drivers::MysqlConnection::connect(&url).await?;
        Ok(Box::new(connection) as Box<dyn Connection>)
    })
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: String) -> ConnectFuture {
    Box::pin(async move {
        let connection = drivers::SqliteConnection::connect(&url).await?;
        Ok(Box::new(connection) as Box<dyn Connection>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_aliases_ignore_case() {
        let factory = ProviderFactory::with_builtins();
        for (alias, name) in [
            ("postgres", "postgres"),
            ("PostgreSQL", "postgres"),
            ("pg", "postgres"),
            ("SqlServer", "sqlserver"),
            ("mssql", "sqlserver"),
            ("SQL_SERVER", "sqlserver"),
            ("MariaDB", "mysql"),
            ("sqlite", "sqlite"),
        ] {
            assert_eq!(factory.resolve(alias).unwrap().name(), name, "alias {}", alias);
        }
    }

    #[test]
    fn test_resolve_qualified_name() {
        let factory = ProviderFactory::with_builtins();
        let reg = factory
            .resolve("schemashift::drivers::PostgresConnection")
            .unwrap();
        assert_eq!(reg.name(), "postgres");
        assert_eq!(reg.dialect().name(), "postgres");
    }

    #[test]
    fn test_unknown_dialect() {
        let factory = ProviderFactory::with_builtins();
        let err = factory.resolve("oracle").unwrap_err();
        assert!(matches!(err, MigrateError::UnresolvedDialect(ref n) if n == "oracle"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut factory = ProviderFactory::new();
        factory.register(
            ProviderRegistration::new("sqlite", "custom::Sqlite", drivers::sqlite::dialect())
                .alias("lite"),
        );
        factory.register(ProviderRegistration::new(
            "SQLITE",
            "custom::Sqlite2",
            drivers::sqlite::dialect(),
        ));
        assert_eq!(factory.names(), vec!["SQLITE"]);
        assert!(factory.resolve("lite").is_err());
    }

    #[tokio::test]
    async fn test_registration_without_connector() {
        let mut factory = ProviderFactory::new();
        factory.register(ProviderRegistration::new(
            "dataonly",
            "custom::DataOnly",
            drivers::postgres::dialect(),
        ));

        let err = factory.create("dataonly", "host=localhost", None).await.err().unwrap();
        assert!(matches!(err, MigrateError::InvalidProviderShape { ref name, .. } if name == "dataonly"));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_create_sqlite_in_memory() {
        let factory = ProviderFactory::with_builtins();
        let mut db = factory
            .create("sqlite", "sqlite::memory:", Some(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(db.dialect().name(), "sqlite");
        assert_eq!(db.execute_scalar("SELECT 40 + 2").await.unwrap().as_i64(), Some(42));
    }
}
