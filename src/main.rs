mod auth;
mod catalog;
mod config;
mod error;
mod middleware;
mod models;
mod notify;
mod routes;
mod store;

use crate::{config::Config, models::AppState, notify::Notifier};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;

    let store = store::connect(&cfg.store).await?;
    store::seed_initial_admins(&store).await?;

    let notifier = Notifier::new(cfg.telegram_bot_token.clone(), cfg.telegram_chat_id.clone())?;

    let state = AppState {
        store,
        notifier,
        jwt_secret: cfg.jwt_secret.clone(),
        token_ttl_hours: cfg.token_ttl_hours,
    };

    // Browser clients (the booking page) call the API cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
