use anyhow::Context;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
}

impl Settings {
    /// Only needed by commands that talk to Postgres; CSV runs skip it.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to the academic platform's Postgres instance")?;
        let max_connections = parse_max_connections(std::env::var("RISK_DB_MAX_CONNECTIONS").ok())?;

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(value: Option<String>) -> anyhow::Result<u32> {
    match value {
        None => Ok(DEFAULT_MAX_CONNECTIONS),
        Some(raw) => {
            let parsed: u32 = raw
                .trim()
                .parse()
                .with_context(|| {
                    format!("RISK_DB_MAX_CONNECTIONS must be a positive integer, got {raw:?}")
                })?;
            anyhow::ensure!(parsed > 0, "RISK_DB_MAX_CONNECTIONS must be at least 1");
            Ok(parsed)
        }
    }
}
