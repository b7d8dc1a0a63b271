mod config;
mod error;
mod prompt_client;
mod routes;
mod scheduler;
mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use config::AppConfig;
pub use state::AppState;
use tethered_store::{Db, StoreConfig};

fn build_router(state: AppState, blobs_dir: std::path::PathBuf) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Users
        .route("/register", post(routes::auth::register))
        .route(
            "/me",
            get(routes::auth::me).patch(routes::auth::update_me),
        )
        .route("/me/avatar", put(routes::auth::upload_avatar))
        .layer(DefaultBodyLimit::max(routes::auth::MAX_AVATAR_BYTES + 1024))
        // Invite codes
        .route("/invite-codes", post(routes::invites::request_code))
        .route("/invite-codes/{code}", get(routes::invites::verify_code))
        .route(
            "/invite-codes/{code}/redeem",
            post(routes::invites::redeem_code),
        )
        // Connection
        .route("/connection", get(routes::connection::get_connection))
        .route("/connection/partner", get(routes::connection::get_partner))
        .route("/connection/streak", get(routes::connection::get_streak))
        .route(
            "/connection/interactions",
            post(routes::connection::record_interaction)
                .get(routes::connection::list_interactions),
        )
        .route("/connection/events", get(routes::connection::events))
        .route("/connection/{id}", delete(routes::connection::disconnect))
        // Prompts
        .route("/prompts/today", get(routes::prompts::today))
        // Cron
        .route("/cron/sweep-streaks", post(routes::cron::sweep_streaks));

    Router::new()
        .nest("/api", api)
        .nest_service("/blobs", ServeDir::new(blobs_dir))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tethered_server=info,tethered_store=info,tower_http=info".into()
            }),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("data directory: {}", config.data_dir.display());
    if config.cron_secret.is_empty() {
        tracing::warn!("CRON_SECRET not set; /api/cron/sweep-streaks will reject every call");
    }
    if config.prompt.api_key.is_empty() {
        tracing::warn!("PROMPT_API_KEY not set; daily prompts will use the fallback");
    }

    let db = Db::open(&StoreConfig::new(&config.data_dir))?;
    tracing::info!("database initialized");

    let blobs_dir = db.blobs_dir();
    let port = config.port;
    let base_url = config.base_url.clone();
    let sweep_interval = config.sweep_interval_secs;
    let state = AppState::builder(config).db(db).build()?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = tokio::spawn(scheduler::run_sweeper(
        state.sweeper.clone(),
        sweep_interval,
        shutdown_rx,
    ));

    let app = build_router(state, blobs_dir);

    tracing::info!("starting server at {base_url}");
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("listening for shutdown signal: {e}");
            }
            tracing::info!("shutting down");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use state::test_support::TestApp;

    async fn spawn(app: &TestApp) -> String {
        let router = build_router(app.state.clone(), app._dir.path().join("blobs"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let base = spawn(&app).await;
        let resp = reqwest::get(format!("{base}/api/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn connection_routes_require_auth() {
        let app = TestApp::new();
        let base = spawn(&app).await;
        let resp = reqwest::get(format!("{base}/api/connection")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: tethered_api::ApiError = resp.json().await.unwrap();
        assert_eq!(body.code, "unauthorized");
    }

    #[tokio::test]
    async fn register_then_fetch_connection() {
        let app = TestApp::new();
        let base = spawn(&app).await;
        let client = reqwest::Client::new();
        let reg: tethered_api::RegisterResponse = client
            .post(format!("{base}/api/register"))
            .json(&serde_json::json!({ "name": "Mina", "role": "student" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let resp = client
            .get(format!("{base}/api/connection"))
            .bearer_auth(&reg.api_key)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body.is_null());
    }
}
