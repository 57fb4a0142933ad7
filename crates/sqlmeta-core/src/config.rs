//! Reference connection configuration.
//!
//! A [`ConnectionConfig`] describes the single reference connection the
//! application configures once. The connection registry clones it, under a
//! fresh name, for every worker thread that talks to the database.

use std::collections::BTreeMap;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConnectionErrorKind, Error, Result};

/// Connection parameters for the reference connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Name of the reference connection; clones are named after it.
    pub name: String,
    /// Driver identifier (`sqlite`, `postgres`, `mysql`)
    pub driver: String,
    /// Hostname or IP address
    pub host: String,
    /// Port number, if not the driver default
    pub port: Option<u16>,
    /// Username for authentication
    pub user: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
    /// Database name, or file path for file-based engines
    pub database: String,
    /// Driver specific options
    pub options: BTreeMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            driver: String::new(),
            host: "localhost".to_string(),
            port: None,
            user: None,
            password: None,
            database: String::new(),
            options: BTreeMap::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for `driver` with default values.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// Parse a connection URL.
    ///
    /// Accepted forms are `sqlite://<path>` (`sqlite::memory:` for an
    /// in-memory database) and `<driver>://[user[:password]@]host[:port]/database`.
    /// Percent-encoded user, password and database parts are decoded.
    pub fn from_url(url: &str) -> Result<Self> {
        let bad = |msg: &str| {
            Error::connection(ConnectionErrorKind::Config, format!("{msg}: `{url}`"))
        };

        // SQLite paths are taken verbatim; a URL parser would read the first
        // segment of a relative path as a host.
        if let Some(rest) = url.strip_prefix("sqlite:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(bad("missing sqlite database path"));
            }
            return Ok(Self::new("sqlite").database(path));
        }

        let parsed =
            Url::parse(url).map_err(|e| bad(&format!("invalid connection url ({e})")))?;
        if parsed.cannot_be_a_base() {
            return Err(bad("missing `://` in connection url"));
        }

        let database = parsed.path().strip_prefix('/').unwrap_or(parsed.path());
        let mut config = Self::new(parsed.scheme()).database(decode(database, &bad)?);
        if !parsed.username().is_empty() {
            config = config.user(decode(parsed.username(), &bad)?);
        }
        if let Some(password) = parsed.password() {
            config = config.password(decode(password, &bad)?);
        }
        if let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) {
            config = config.host(host);
        }
        if let Some(port) = parsed.port() {
            config = config.port(port);
        }

        Ok(config)
    }

    /// Set the reference connection name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database name or path.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set a driver option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Raw option value.
    pub fn get_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Boolean option; accepts `1/0`, `true/false`, `on/off`, `yes/no`.
    pub fn bool_option(&self, key: &str) -> Result<Option<bool>> {
        let Some(raw) = self.get_option(key) else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(Some(true)),
            "0" | "false" | "off" | "no" => Ok(Some(false)),
            _ => Err(Error::connection(
                ConnectionErrorKind::Config,
                format!("option `{key}` expects a boolean, got `{raw}`"),
            )),
        }
    }

    /// Millisecond duration option.
    pub fn duration_ms_option(&self, key: &str) -> Result<Option<Duration>> {
        let Some(raw) = self.get_option(key) else {
            return Ok(None);
        };
        raw.parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| {
                Error::connection(
                    ConnectionErrorKind::Config,
                    format!("option `{key}` expects milliseconds, got `{raw}`"),
                )
            })
    }

    /// A copy of this configuration under a different connection name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

fn decode(part: &str, bad: &impl Fn(&str) -> Error) -> Result<String> {
    percent_decode_str(part)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| bad("connection url is not valid UTF-8 once decoded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("postgres")
            .name("main")
            .host("db.example.com")
            .port(5433)
            .user("app")
            .password("secret")
            .database("inventory")
            .option("sslmode", "disable");

        assert_eq!(config.name, "main");
        assert_eq!(config.driver, "postgres");
        assert_eq!(config.host, "db.example.com");
        assert_eq!(config.port, Some(5433));
        assert_eq!(config.user.as_deref(), Some("app"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.database, "inventory");
        assert_eq!(config.get_option("sslmode"), Some("disable"));
    }

    #[test]
    fn test_from_url_full() {
        let config = ConnectionConfig::from_url("postgres://app:pw@db:5432/shop").unwrap();
        assert_eq!(config.driver, "postgres");
        assert_eq!(config.user.as_deref(), Some("app"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.host, "db");
        assert_eq!(config.port, Some(5432));
        assert_eq!(config.database, "shop");
    }

    #[test]
    fn test_from_url_decodes_credentials() {
        let config = ConnectionConfig::from_url("postgres://app:p%40ss@db:5432/shop").unwrap();
        assert_eq!(config.user.as_deref(), Some("app"));
        assert_eq!(config.password.as_deref(), Some("p@ss"));
        assert_eq!(config.host, "db");

        let config = ConnectionConfig::from_url("mysql://r%C3%A9mi:a%2Fb@db/my%20shop").unwrap();
        assert_eq!(config.user.as_deref(), Some("r\u{e9}mi"));
        assert_eq!(config.password.as_deref(), Some("a/b"));
        assert_eq!(config.port, None);
        assert_eq!(config.database, "my shop");
    }

    #[test]
    fn test_from_url_without_credentials_or_host() {
        let config = ConnectionConfig::from_url("postgres:///shop").unwrap();
        assert_eq!(config.user, None);
        assert_eq!(config.password, None);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.database, "shop");
    }

    #[test]
    fn test_from_url_sqlite() {
        let config = ConnectionConfig::from_url("sqlite:///tmp/app.db").unwrap();
        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.database, "/tmp/app.db");

        let memory = ConnectionConfig::from_url("sqlite::memory:").unwrap();
        assert_eq!(memory.database, ":memory:");
    }

    #[test]
    fn test_from_url_rejects_garbage() {
        assert!(ConnectionConfig::from_url("nonsense").is_err());
        assert!(ConnectionConfig::from_url("mysql://host:notaport/db").is_err());
        assert!(ConnectionConfig::from_url("sqlite:").is_err());
        assert!(ConnectionConfig::from_url("mailto:app@db").is_err());

        // An unescaped `/` ends the authority, leaving `a` as the port.
        let err = ConnectionConfig::from_url("postgres://app:a/b@db:5432/shop").unwrap_err();
        match err {
            Error::Connection(e) => {
                assert_eq!(e.kind, ConnectionErrorKind::Config);
                assert!(e.message.contains("invalid connection url"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_typed_options() {
        let config = ConnectionConfig::new("sqlite")
            .option("foreign_keys", "ON")
            .option("busy_timeout_ms", "250")
            .option("broken", "maybe");
        assert_eq!(config.bool_option("foreign_keys").unwrap(), Some(true));
        assert_eq!(
            config.duration_ms_option("busy_timeout_ms").unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.bool_option("missing").unwrap(), None);
        assert!(config.bool_option("broken").is_err());
    }

    #[test]
    fn test_renamed_keeps_everything_else() {
        let config = ConnectionConfig::new("sqlite").name("ref").database("x.db");
        let clone = config.renamed("ref_3");
        assert_eq!(clone.name, "ref_3");
        assert_eq!(clone.database, "x.db");
        assert_eq!(clone.driver, "sqlite");
    }
}
