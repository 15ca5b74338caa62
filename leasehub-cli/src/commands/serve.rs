//! `leasehub serve` - run the REST API

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use leasehub_server::db::{connect, ensure_indexes};
use leasehub_server::{run_server, AppConfig, AppState, ServerConfig};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', default_value = "127.0.0.1:3030")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    /// Database name (default: leasehub)
    #[arg(long, env = "MONGODB_DB")]
    pub database: Option<String>,

    /// Skip index creation at startup
    #[arg(long)]
    pub skip_indexes: bool,
}

impl ServeArgs {
    /// Flags win over the environment.
    fn app_config(&self) -> Result<AppConfig> {
        AppConfig::from_lookup(|key| match key {
            "MONGODB_URI" if self.mongodb_uri.is_some() => self.mongodb_uri.clone(),
            "MONGODB_DB" if self.database.is_some() => self.database.clone(),
            _ => std::env::var(key).ok(),
        })
        .context("invalid configuration; set it in the environment or a .env file")
    }
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = args.app_config()?;
    tracing::info!(bind = %args.bind, database = %config.database, "starting leasehub server");

    let db = connect(&config.mongodb_uri, &config.database)
        .await
        .context("Failed to connect to MongoDB")?;
    if !args.skip_indexes {
        ensure_indexes(&db).await.context("Failed to create indexes")?;
    }

    let state = AppState::new(db, config);
    run_server(
        state,
        ServerConfig {
            bind_addr: args.bind,
            cors_permissive: args.cors_permissive,
        },
    )
    .await
    .context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let args = ServeArgs::parse_from([
            "serve",
            "--mongodb-uri",
            "mongodb://db.internal:27017",
            "--database",
            "leasing_staging",
        ]);
        // API_AUTH_KEY is still read from the environment
        std::env::set_var("API_AUTH_KEY", "test-key");
        let config = args.app_config().unwrap();
        assert_eq!(config.mongodb_uri, "mongodb://db.internal:27017");
        assert_eq!(config.database, "leasing_staging");
        assert_eq!(config.api_key, "test-key");
    }

    #[test]
    fn default_bind_is_loopback() {
        let args = ServeArgs::parse_from(["serve", "--mongodb-uri", "mongodb://x"]);
        assert_eq!(args.bind, "127.0.0.1:3030".parse().unwrap());
        assert!(!args.cors_permissive);
    }
}
