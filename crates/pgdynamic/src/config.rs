//! Typed connection descriptor.
//!
//! Serialized keys are lower-case (`host`, `port`, `database`, `user`,
//! `password`, ...). Unknown keys are rejected, so a descriptor written with
//! another casing (`PG_HOST`, `HOST`) fails to load instead of silently
//! falling back to defaults. Environment variables use the upper-case
//! `PG_*` names, see [`ConnectionConfig::from_env`].

use crate::error::{PgdError, PgdResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Environment variable names read by [`ConnectionConfig::from_env`].
pub mod env {
    pub const HOST: &str = "PG_HOST";
    pub const PORT: &str = "PG_PORT";
    pub const DATABASE: &str = "PG_DATABASE";
    pub const USER: &str = "PG_USER";
    pub const PASSWORD: &str = "PG_PASSWORD";
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Handed to the driver; this crate adds no timeouts of its own.
    #[serde(default, with = "opt_secs")]
    pub connect_timeout: Option<Duration>,
    #[serde(default)]
    pub application_name: Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            database: database.into(),
            user: user.into(),
            password: None,
            connect_timeout: None,
            application_name: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Load from `PG_HOST`, `PG_PORT`, `PG_DATABASE`, `PG_USER`, `PG_PASSWORD`.
    pub fn from_env() -> PgdResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup using the `PG_*` names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PgdResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PgdError::config(format!("{key} is not set")))
        };

        let port = match lookup(env::PORT).filter(|v| !v.is_empty()) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| PgdError::config(format!("{}: invalid port '{raw}': {e}", env::PORT)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: required(env::HOST)?,
            port,
            database: required(env::DATABASE)?,
            user: required(env::USER)?,
            password: lookup(env::PASSWORD),
            connect_timeout: None,
            application_name: None,
        })
    }

    /// Parse a libpq-style URL or key/value string (`postgres://user:pw@host:5432/db`).
    pub fn from_url(url: &str) -> PgdResult<Self> {
        let pg: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| PgdError::config(e.to_string()))?;

        let host = match pg.get_hosts().first() {
            Some(tokio_postgres::config::Host::Tcp(h)) => h.clone(),
            #[cfg(unix)]
            Some(tokio_postgres::config::Host::Unix(path)) => path.display().to_string(),
            None => "localhost".to_string(),
        };
        let password = pg
            .get_password()
            .map(|p| String::from_utf8(p.to_vec()))
            .transpose()
            .map_err(|e| PgdError::config(format!("password is not UTF-8: {e}")))?;
        let user = pg
            .get_user()
            .map(str::to_string)
            .ok_or_else(|| PgdError::config("connection URL has no user"))?;

        Ok(Self {
            host,
            port: pg.get_ports().first().copied().unwrap_or(DEFAULT_PORT),
            database: pg.get_dbname().unwrap_or(&user).to_string(),
            user,
            password,
            connect_timeout: pg.get_connect_timeout().copied(),
            application_name: pg.get_application_name().map(str::to_string),
        })
    }

    /// Driver configuration for this descriptor.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user);
        if let Some(password) = &self.password {
            pg.password(password);
        }
        if let Some(timeout) = self.connect_timeout {
            pg.connect_timeout(timeout);
        }
        if let Some(name) = &self.application_name {
            pg.application_name(name);
        }
        pg
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
