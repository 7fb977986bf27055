mod api;
mod compose;
mod config;
mod directory;
mod fetch;
mod http;
mod lang;
mod news;
mod users;
mod wiki;

pub const USER_AGENT: &str = concat!("sift/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::compose::Composer;
use crate::config::Config;
use crate::users::UserStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sift=info".parse()?),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(bind = %config.bind, "starting sift");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .inspect_err(|e| tracing::error!("failed to connect to database: {e}"))?;
    let users = UserStore::new(pool);
    users.migrate().await?;

    let composer = Composer::from_config(&config)?;
    let state = api::AppState {
        composer: Arc::new(composer),
        users,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
    }
}
