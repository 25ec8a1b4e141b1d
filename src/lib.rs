pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::services::{
    attempt_log::{AttemptLog, PgAttemptLog},
    attempt_service::AttemptRecorder,
    auth_service::AuthService,
    chart_service::{ChartRenderer, PythonChartRenderer},
    content_service::{ContentProvider, FsContentProvider},
    history_service::HistoryReconstructor,
    progress_service::{PgProgressStore, ProgressStore, UnlockCoordinator},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub content: Arc<dyn ContentProvider>,
    pub unlock: UnlockCoordinator,
    pub recorder: AttemptRecorder,
    pub history: HistoryReconstructor,
    pub charts: Arc<dyn ChartRenderer>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let store: Arc<dyn ProgressStore> = Arc::new(PgProgressStore::new(pool.clone()));
        let log: Arc<dyn AttemptLog> = Arc::new(PgAttemptLog::new(pool.clone()));
        let content: Arc<dyn ContentProvider> =
            Arc::new(FsContentProvider::new(PathBuf::from(&config.quiz_data_dir)));
        let charts: Arc<dyn ChartRenderer> = Arc::new(PythonChartRenderer::from_config(config));

        Self::with_components(pool, store, log, content, charts)
    }

    /// Assembles the state from explicit collaborators. Production wiring
    /// goes through `new`; tests substitute in-memory stores here.
    pub fn with_components(
        pool: PgPool,
        store: Arc<dyn ProgressStore>,
        log: Arc<dyn AttemptLog>,
        content: Arc<dyn ContentProvider>,
        charts: Arc<dyn ChartRenderer>,
    ) -> Self {
        let auth_service = AuthService::new(pool.clone());
        let unlock = UnlockCoordinator::new(store);
        let recorder = AttemptRecorder::new(log.clone());
        let history = HistoryReconstructor::new(log);

        Self {
            pool,
            auth_service,
            content,
            unlock,
            recorder,
            history,
            charts,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let public = Router::new()
        .route("/health", get(routes::health::health))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/auth/google", post(routes::auth::google_sign_in))
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me));

    let session = Router::new()
        .route("/profile", get(routes::auth::profile))
        .route(
            "/progress",
            get(routes::progress::get_progress).post(routes::progress::post_progress),
        )
        .route("/quiz", get(routes::quiz::get_quiz))
        .route("/submit-quiz", post(routes::quiz::submit_quiz))
        .route("/quiz-history", get(routes::history::quiz_history))
        .route("/quiz-details", get(routes::history::quiz_details))
        .layer(axum::middleware::from_fn(
            crate::middleware::auth::require_session,
        ));

    public
        .merge(session)
        .nest_service(
            "/quiz_results",
            ServeDir::new(config.chart_output_dir.clone()),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
