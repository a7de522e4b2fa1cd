//! # Warden Server
//!
//! HTTP front end for guardian-based social recovery. Routes map one to one
//! onto [`RecoveryService`] operations; the server holds no state of its own
//! beyond the effects it composes.

#![allow(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod error;
pub mod routes;
pub mod wire;

pub use config::ServerConfig;
pub use effects::ServerEffects;
pub use error::{ApiError, ErrorBody};
pub use routes::router;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use warden_recovery::RecoveryService;

/// How often expired records are swept from memory
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Run the server until ctrl-c
pub async fn serve(config: ServerConfig) -> Result<()> {
    config.validate()?;
    let addr: SocketAddr = config.bind_address.parse()?;

    let effects = Arc::new(ServerEffects::new());
    let service = RecoveryService::with_policy(Arc::clone(&effects), config.to_policy());
    let app = router(service);

    let storage = Arc::clone(effects.storage());
    let purge = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match storage.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "expired records purged"),
                Err(e) => warn!(error = %e, "purge failed"),
            }
        }
    });

    info!("Starting recovery server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    purge.abort();
    info!("Recovery server stopped");
    Ok(result?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
