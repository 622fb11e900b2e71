use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod session;
mod views;

use app_state::AppState;
use config::load_settings;

const MAX_FORM_BYTES: usize = 64 * 1024;
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = settings.database_url.clone();
    let storage = Storage::new(&database_url)
        .await
        .map_err(|error| {
            error!(
                %database_url,
                %error,
                "failed to open SQLite database; verify parent directory exists and permissions are correct"
            );
            error
        })?
        .with_session_ttl(settings.session_ttl_seconds);

    if settings.seed_catalog {
        if storage.seed_default_catalog().await? {
            info!("seeded default vehicle catalog");
        }
        if storage.seed_sample_products().await? {
            info!("seeded sample product catalog");
        }
    }

    tokio::spawn(purge_sessions_periodically(storage.clone()));

    let state = AppState::new(storage, &settings);
    info!(
        gating = ?settings.gating_redirect,
        cookie = %settings.session_cookie,
        ttl_seconds = settings.session_ttl_seconds,
        "order wizard ready"
    );
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(api::items::index))
        .route("/items", post(api::items::create_item))
        .route("/items/stream", get(api::items::item_stream))
        .route("/todos", get(api::todos::index).post(api::todos::create))
        .route("/todos/:id", put(api::todos::update).delete(api::todos::delete))
        .route("/todos/:id/edit", get(api::todos::edit))
        .route("/todos/:id/toggle", put(api::todos::toggle))
        .route("/products", get(api::products::index))
        .route("/products/table", get(api::products::table))
        .route("/products/:id", delete(api::products::delete))
        .route("/order", get(api::orders::start))
        .route("/order/success", get(api::orders::success))
        .route("/order/api/models", get(api::orders::models_for_make))
        .route(
            "/order/api/models/options",
            get(api::orders::model_options_for_make),
        )
        .route(
            "/order/:step",
            get(api::orders::show_step).post(api::orders::submit_step),
        )
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.storage.health_check().await.map_err(|error| {
        warn!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn purge_sessions_periodically(storage: Storage) {
    let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        ticker.tick().await;
        match storage.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "purged expired wizard sessions"),
            Err(error) => warn!(%error, "session purge failed"),
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
