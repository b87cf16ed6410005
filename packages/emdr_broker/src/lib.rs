//! EMDR session broker
//!
//! Relays animation parameters between a host and the clients of its session
//! over WebSocket. The broker holds no state beyond live sessions.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::info;

mod broadcast;
mod broker;
pub mod config;
mod connection;
mod dispatch;
mod error;
mod handlers;
mod health;
pub mod metrics;
mod registry;
mod session;
mod ws;


pub use broadcast::{Delivery, deliver, send_to};
pub use broker::SessionBroker;
pub use config::{BrokerConfig, FileConfig, Overrides, load_config};
pub use connection::{
    ConnectionHandle, ConnectionId, HOST_DISCONNECTED_CODE, HOST_DISCONNECTED_REASON, Outbound,
    OutboundQueue, SendOutcome,
};
pub use error::DispatchError;
pub use handlers::build_session_url;
pub use metrics::BrokerMetrics;
pub use registry::{ConnectionMeta, ConnectionRegistry, Membership, Role};
pub use session::{Departure, JoinOutcome, Session, SessionId, SessionTable};

/// Span per HTTP request tagged with a request id
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<SessionBroker>,
    pub config: Arc<BrokerConfig>,
}

impl AppState {
    pub fn new(config: BrokerConfig) -> Self {
        let metrics = Arc::new(BrokerMetrics::new());
        Self {
            broker: Arc::new(SessionBroker::new(&config.session, metrics)),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_handler))
        .route("/health/live", get(health::health_live_handler))
        .route("/metrics", get(health::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .with_state(state)
}

/// Serve the broker on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("EMDR broker listening on ws://{}/", addr);
    info!("  GET /ws           - broker WebSocket (also at /)");
    info!("  GET /health       - status");
    info!("  GET /metrics      - counters");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}
