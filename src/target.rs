// ABOUTME: Remote sync target configuration and DSN construction
// ABOUTME: Validates engine and coordinates, renders driver-specific connection strings

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dialect::Dialect;
use crate::error::{Result, SyncError};

/// Transport security requested for the remote connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    Disable,
    Require,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Disable => "disable",
            TlsMode::Require => "require",
        }
    }
}

impl FromStr for TlsMode {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(TlsMode::Disable),
            "require" => Ok(TlsMode::Require),
            other => Err(SyncError::InvalidTarget(format!(
                "unsupported ssl mode '{}' (expected 'disable' or 'require')",
                other
            ))),
        }
    }
}

/// Connection coordinates for the remote database.
///
/// Field names on the wire follow the desktop app's sync form
/// (`db_type`, `db_name`, `ssl_mode`); the spelled-out names are accepted
/// as aliases. The engine stays a free-form string until
/// [`SyncTarget::dialect`] is called so that an unknown engine surfaces as
/// [`SyncError::UnsupportedEngine`] from the operation, not as a parse error.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    #[serde(rename = "db_type", alias = "engine")]
    pub engine: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(rename = "db_name", alias = "database", default)]
    pub database: String,
    #[serde(
        rename = "ssl_mode",
        alias = "tls_mode",
        default,
        deserialize_with = "deserialize_tls_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub tls_mode: Option<TlsMode>,
}

fn deserialize_tls_mode<'de, D>(deserializer: D) -> std::result::Result<Option<TlsMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<TlsMode>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl SyncTarget {
    /// Resolve the engine name into a dialect.
    pub fn dialect(&self) -> Result<Dialect> {
        self.engine.parse()
    }

    /// Port to connect to; `0` means the engine's default port.
    pub fn effective_port(&self, dialect: Dialect) -> u16 {
        if self.port == 0 {
            dialect.default_port()
        } else {
            self.port
        }
    }

    /// TLS mode after defaults: PostgreSQL requires TLS unless told otherwise.
    pub fn effective_tls_mode(&self, dialect: Dialect) -> TlsMode {
        match (self.tls_mode, dialect) {
            (Some(mode), _) => mode,
            (None, Dialect::Postgres) => TlsMode::Require,
            (None, Dialect::MySql) => TlsMode::Disable,
        }
    }

    /// Check the engine and required coordinates.
    pub fn validate(&self) -> Result<Dialect> {
        let dialect = self.dialect()?;
        if self.host.trim().is_empty() {
            return Err(SyncError::InvalidTarget("host is required".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(SyncError::InvalidTarget("user is required".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(SyncError::InvalidTarget(
                "database name is required".to_string(),
            ));
        }
        Ok(dialect)
    }

    /// Build the driver connection string for this target.
    ///
    /// PostgreSQL gets libpq-style `key=value` pairs (parsed by
    /// `tokio_postgres::Config`); MySQL gets a `mysql://` URL (parsed by
    /// `mysql_async::Opts::from_url`) with percent-encoded credentials.
    pub fn dsn(&self) -> Result<String> {
        let dialect = self.validate()?;
        let port = self.effective_port(dialect);
        match dialect {
            Dialect::Postgres => Ok(format!(
                "host={} port={} user={} password={} dbname={} sslmode={}",
                conn_value(&self.host),
                port,
                conn_value(&self.user),
                conn_value(&self.password),
                conn_value(&self.database),
                self.effective_tls_mode(dialect).as_str()
            )),
            Dialect::MySql => {
                let mut url = url::Url::parse("mysql://localhost")
                    .map_err(|e| SyncError::InvalidTarget(e.to_string()))?;
                url.set_host(Some(self.host.trim()))
                    .map_err(|e| SyncError::InvalidTarget(format!("invalid host: {}", e)))?;
                url.set_port(Some(port))
                    .map_err(|_| SyncError::InvalidTarget("invalid port".to_string()))?;
                url.set_username(&self.user)
                    .map_err(|_| SyncError::InvalidTarget("invalid user".to_string()))?;
                if !self.password.is_empty() {
                    url.set_password(Some(&self.password))
                        .map_err(|_| SyncError::InvalidTarget("invalid password".to_string()))?;
                }
                url.set_path(&self.database);
                Ok(url.to_string())
            }
        }
    }

    /// Password-free description for logs and CLI output.
    pub fn redacted(&self) -> String {
        let port = match self.dialect() {
            Ok(dialect) => self.effective_port(dialect),
            Err(_) => self.port,
        };
        format!(
            "{}://{}@{}:{}/{}",
            self.engine, self.user, self.host, port, self.database
        )
    }

    /// Copy of this target with the password removed, for persisting.
    pub fn without_password(&self) -> Self {
        Self {
            password: String::new(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTarget")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("tls_mode", &self.tls_mode)
            .finish()
    }
}

/// Quote a libpq connection-string value when it needs it.
fn conn_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\' || c == '=');
    if !needs_quotes {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_target() -> SyncTarget {
        SyncTarget {
            engine: "mysql".to_string(),
            host: "db.example.com".to_string(),
            port: 3306,
            user: "sync".to_string(),
            password: "x".to_string(),
            database: "orange".to_string(),
            tls_mode: None,
        }
    }

    fn postgres_target() -> SyncTarget {
        SyncTarget {
            engine: "postgres".to_string(),
            port: 5432,
            ..mysql_target()
        }
    }

    #[test]
    fn test_postgres_dsn_defaults_to_require() {
        let dsn = postgres_target().dsn().unwrap();
        assert_eq!(
            dsn,
            "host=db.example.com port=5432 user=sync password=x dbname=orange sslmode=require"
        );
    }

    #[test]
    fn test_postgres_dsn_explicit_disable() {
        let target = SyncTarget {
            tls_mode: Some(TlsMode::Disable),
            ..postgres_target()
        };
        assert!(target.dsn().unwrap().ends_with("sslmode=disable"));
    }

    #[test]
    fn test_postgres_dsn_quotes_awkward_values() {
        let target = SyncTarget {
            password: "it's a secret".to_string(),
            ..postgres_target()
        };
        let dsn = target.dsn().unwrap();
        assert!(dsn.contains(r"password='it\'s a secret'"));

        let empty = SyncTarget {
            password: String::new(),
            ..postgres_target()
        };
        assert!(empty.dsn().unwrap().contains("password=''"));
    }

    #[test]
    fn test_postgres_dsn_is_accepted_by_driver() {
        let target = SyncTarget {
            password: "p@ss word".to_string(),
            ..postgres_target()
        };
        let config: tokio_postgres::Config = target.dsn().unwrap().parse().unwrap();
        assert_eq!(config.get_user(), Some("sync"));
        assert_eq!(config.get_password(), Some("p@ss word".as_bytes()));
        assert_eq!(config.get_dbname(), Some("orange"));
    }

    #[test]
    fn test_mysql_dsn() {
        let dsn = mysql_target().dsn().unwrap();
        assert_eq!(dsn, "mysql://sync:x@db.example.com:3306/orange");
    }

    #[test]
    fn test_mysql_dsn_encodes_credentials() {
        let target = SyncTarget {
            password: "p@ss/word".to_string(),
            ..mysql_target()
        };
        let dsn = target.dsn().unwrap();
        assert!(dsn.starts_with("mysql://sync:p%40ss%2Fword@"));
    }

    #[test]
    fn test_zero_port_uses_engine_default() {
        let target = SyncTarget {
            port: 0,
            ..postgres_target()
        };
        assert!(target.dsn().unwrap().contains("port=5432"));
    }

    #[test]
    fn test_unsupported_engine() {
        let target = SyncTarget {
            engine: "oracle".to_string(),
            ..mysql_target()
        };
        assert!(matches!(
            target.dsn().unwrap_err(),
            SyncError::UnsupportedEngine(_)
        ));
    }

    #[test]
    fn test_missing_host_is_invalid() {
        let target = SyncTarget {
            host: "  ".to_string(),
            ..mysql_target()
        };
        assert!(matches!(
            target.validate().unwrap_err(),
            SyncError::InvalidTarget(_)
        ));
    }

    #[test]
    fn test_deserialize_form_payload() {
        let json = r#"{
            "db_type": "postgres",
            "host": "pg.internal",
            "port": 6543,
            "user": "app",
            "password": "pw",
            "db_name": "orange",
            "ssl_mode": ""
        }"#;
        let target: SyncTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target.engine, "postgres");
        assert_eq!(target.database, "orange");
        assert_eq!(target.tls_mode, None);
        assert_eq!(target.effective_tls_mode(Dialect::Postgres), TlsMode::Require);
    }

    #[test]
    fn test_deserialize_aliases_and_bad_ssl_mode() {
        let json = r#"{"engine": "mysql", "host": "h", "user": "u", "database": "d", "tls_mode": "require"}"#;
        let target: SyncTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target.tls_mode, Some(TlsMode::Require));

        let bad = r#"{"engine": "mysql", "ssl_mode": "verify-full"}"#;
        assert!(serde_json::from_str::<SyncTarget>(bad).is_err());
    }

    #[test]
    fn test_debug_and_redacted_hide_password() {
        let target = mysql_target();
        let debug = format!("{:?}", target);
        assert!(!debug.contains("\"x\""));
        assert!(debug.contains("<redacted>"));
        assert_eq!(target.redacted(), "mysql://sync@db.example.com:3306/orange");
        assert!(target.without_password().password.is_empty());
    }
}
