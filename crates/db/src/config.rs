/// Pool size used when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Connection string (required).
    pub database_url: String,
    /// Schema whose tables are introspected (default: `public`).
    pub schema: String,
    /// Pool size (default: `20`).
    pub max_connections: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl DbConfig {
    /// Configuration for `database_url` with every other setting defaulted.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            schema: "public".into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Load configuration from the environment, reading `.env` first if one
    /// exists.
    ///
    /// | Env Var                    | Default  |
    /// |----------------------------|----------|
    /// | `DATABASE_URL`             | required |
    /// | `DATABASE_SCHEMA`          | `public` |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let schema = lookup("DATABASE_SCHEMA")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "public".into());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                expected: "u32",
                value,
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            schema,
            max_connections,
        })
    }
}
