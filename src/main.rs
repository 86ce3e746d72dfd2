use axum::{routing::get, Router};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod error;
mod security;
mod shared;
mod tickets;
mod users;

use crate::config::AppConfig;
use crate::security::token::TokenManager;
use crate::shared::state::AppState;
use crate::shared::utils::{create_conn, run_migrations};

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    let pool = create_conn(&config.database_url())?;
    run_migrations(&pool)?;

    let tokens = TokenManager::from_secret(&config.jwt_secret)?;
    let state = Arc::new(AppState { conn: pool, tokens });

    let app = Router::new()
        .route("/health", get(health))
        .merge(auth::configure_auth_routes())
        .merge(tickets::configure_ticket_routes())
        .merge(users::configure_user_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("deskserver listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
