pub mod chain;
pub mod claim;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod prover;
pub mod redirect;
pub mod salt;
pub mod session;

pub use self::chain::{ChainClient, JsonRpc};
pub use self::claim::IdentityClaim;
pub use self::error::Error;
pub use self::flow::{Flow, FlowConfig, LoginSession, Resolved};
pub use self::prover::ProofCredential;
pub use self::redirect::CapturedReturn;
pub use self::salt::derive_salt;
pub use self::session::{EphemeralSession, FileStore, MemoryStore, SessionStore};

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::info;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Serve the local login callback until one return has been processed.
///
/// Binds the loopback interface only: this server exists to receive the
/// provider redirect for the current user, nothing else.
pub async fn serve(port: u16, flow: Flow<JsonRpc, FileStore>) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let state = Arc::new(handlers::AppState::new(flow, shutdown_tx));

    let app = Router::new()
        .route("/callback", get(handlers::callback))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("callback server listening on 127.0.0.1:{port}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;

    Ok(())
}
