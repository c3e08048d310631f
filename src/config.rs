use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                require("DBUSER")?,
                require("DBPASS")?,
                lookup("DBHOST").unwrap_or_else(|| "localhost".into()),
                lookup("DBPORT").unwrap_or_else(|| "5432".into()),
                require("DBBASE")?,
            ),
        };

        let max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let jwt = JwtConfig {
            secret: require("JWT_SECRET")?,
            ttl_minutes: lookup("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            database_url,
            max_connections,
            jwt,
        })
    }
}
