mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use studyhall_accounts::AccountBook;
use studyhall_api::auth::{AppState, AppStateInner};
use studyhall_db::{Database, KeyValueStore};
use studyhall_directory::{DirectoryStore, Relay};
use studyhall_gateway::connection;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studyhall=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init storage and the shared directory replica
    let storage: Arc<dyn KeyValueStore> = Arc::new(Database::open(&config.db_path)?);
    let relay = Relay::default();
    let directory = DirectoryStore::open(storage.clone(), Arc::new(relay.clone()))?;

    let state: AppState = Arc::new(AppStateInner {
        accounts: AccountBook::new(storage),
        directory: Arc::new(Mutex::new(directory)),
        relay,
        jwt_secret: config.jwt_secret.clone(),
    });

    let ws_route = Router::new()
        .route("/sync", get(ws_upgrade))
        .with_state(state.clone());

    let app = Router::new()
        .merge(studyhall_api::router(state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Studyhall server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(
            socket,
            state.directory.clone(),
            state.relay.clone(),
            state.jwt_secret.clone(),
        )
    })
}
