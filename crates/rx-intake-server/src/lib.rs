//! HTTP surface for the prescription intake pipeline.
//!
//! Thin axum layer over [`rx_intake_core::IntakeService`]: multipart
//! submission, patient CRUD, the pharmacist queue and verification
//! decisions. Identity arrives via `x-user-id` / `x-user-role` headers.

use axum::{
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use config::Config;
use state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/prescriptions",
            post(routes::submit_prescription).get(routes::list_prescriptions),
        )
        .route(
            "/prescriptions/admin/pending",
            get(routes::pending_queue),
        )
        .route(
            "/prescriptions/:id",
            get(routes::get_prescription)
                .put(routes::update_prescription)
                .delete(routes::delete_prescription),
        )
        .route("/prescriptions/:id/verify", patch(routes::verify_prescription))
        .route(
            "/prescriptions/:id/reprocess",
            post(routes::reprocess_prescription),
        )
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    let address = format!("0.0.0.0:{}", config.port);
    let state = state::AppState::new(config)?;

    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
