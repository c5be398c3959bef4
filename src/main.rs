mod collection;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod object_id;
mod routes;
mod store;

use std::sync::Arc;

use anyhow::Context;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{collection::FilmCollection, config::Config, store::DocumentStore};

pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmstore=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url, config.max_connections)
        .await
        .context("connecting to the film store")?;

    let state = Arc::new(AppState { store: Arc::new(FilmCollection::new(db)) });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
