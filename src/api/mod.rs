//! HTTP surface.
//!
//! | Method | Path              | Success                         |
//! |--------|-------------------|---------------------------------|
//! | POST   | `/upload`         | 201 `{metadata, file_url}`      |
//! | GET    | `/documents`      | 200 `[{id, metadata, file_url}]`|
//! | POST   | `/save`           | 201 `{message, id}`             |
//! | GET    | `/document/:id`   | 200 `{id, metadata, file_url}`  |
//! | PUT    | `/document/:id`   | 200 `{message}`                 |
//! | GET    | `/files/:name`    | raw file bytes                  |
//! | GET    | `/health`         | 200 `healthy`                   |
//!
//! Errors are JSON objects with a single `error` field.

pub mod context;
pub mod documents;
pub mod error;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::IntakeConfig;
use crate::error::IntakeError;
pub use context::AppState;

async fn health_handler() -> &'static str {
    "healthy"
}

/// Build the application router over `state`.
pub fn router(state: AppState) -> Router {
    let files = ServeDir::new(&state.config.upload_folder);
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route(
            "/upload",
            post(upload::upload_handler).layer(upload_limit),
        )
        .route("/documents", get(documents::list_documents_handler))
        .route("/save", post(documents::save_document_handler))
        .route(
            "/document/:id",
            get(documents::get_document_handler).put(documents::update_document_handler),
        )
        .route("/health", get(health_handler))
        .nest_service("/files", files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the store, bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: IntakeConfig) -> Result<(), IntakeError> {
    let addr = config.bind_addr;
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IntakeError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("pdf-intake listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| IntakeError::Internal(format!("server error: {e}")))?;

    tracing::info!("pdf-intake stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=?e, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
