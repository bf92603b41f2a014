//! HTTP host for the assistant page.

pub mod page;
pub mod routes;

use std::sync::Arc;

use crate::assistant::InteractionController;
use crate::config::AppConfig;
use crate::factory::ModelClientFactory;

pub use routes::{router, AppState};

/// Serve the assistant until Ctrl-C.
pub async fn serve(config: &AppConfig, factory: Arc<ModelClientFactory>) -> std::io::Result<()> {
    let controller = InteractionController::new(factory);
    let app = router(AppState::new(controller, config.logo_path.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        bind = %config.bind,
        logo = %config.logo_path.display(),
        "Starting assistant server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
