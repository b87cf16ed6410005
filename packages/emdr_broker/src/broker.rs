//! Session broker: the lock-guarded session table plus the entry points the
//! transport calls for connect, frame and disconnect.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::connection::ConnectionHandle;
use crate::dispatch::dispatch;
use crate::error::DispatchError;
use crate::handlers::HandlerContext;
use crate::metrics::BrokerMetrics;
use crate::session::{Departure, SessionTable};

pub struct SessionBroker {
    table: Mutex<SessionTable>,
    join_url_base: String,
    metrics: Arc<BrokerMetrics>,
}

impl SessionBroker {
    pub fn new(config: &SessionConfig, metrics: Arc<BrokerMetrics>) -> Self {
        Self {
            table: Mutex::new(SessionTable::new()),
            join_url_base: config.join_url_base.clone(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<BrokerMetrics> {
        &self.metrics
    }

    /// Track a newly accepted connection.
    pub async fn connect(&self, conn: &ConnectionHandle) {
        self.table.lock().await.register_connection(conn.id());
        self.metrics.connection_opened();
        info!(conn_id = %conn.id(), "connection opened");
    }

    /// Decode and route one inbound frame.
    ///
    /// Errors are already logged and counted; the connection stays open
    /// whatever the outcome.
    pub async fn handle_frame(
        &self,
        conn: &ConnectionHandle,
        bytes: &[u8],
    ) -> Result<(), DispatchError> {
        self.metrics.frame_received();
        let envelope = match emdr_wire::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.metrics.decode_error();
                warn!(conn_id = %conn.id(), error = %e, len = bytes.len(), "dropping undecodable frame");
                return Err(e.into());
            }
        };
        debug!(conn_id = %conn.id(), variant = envelope.variant_name(), "frame received");

        let ctx = HandlerContext {
            join_url_base: &self.join_url_base,
            metrics: &self.metrics,
        };
        let mut table = self.table.lock().await;
        let result = dispatch(&mut table, &ctx, conn, envelope);
        self.metrics.set_active_sessions(table.len());
        drop(table);

        if let Err(e) = &result {
            self.metrics.dispatch_error();
            warn!(conn_id = %conn.id(), error = %e, kind = e.kind(), "dropping frame");
        }
        result
    }

    /// Release the connection's session role and forget it. Idempotent.
    pub async fn disconnect(&self, conn_id: &str) -> Option<Departure> {
        let mut table = self.table.lock().await;
        if table.registry().get(conn_id).is_none() {
            return None;
        }
        let departure = table.deregister_connection(conn_id);
        self.metrics.set_active_sessions(table.len());
        drop(table);

        self.metrics.connection_closed();
        info!(conn_id = %conn_id, ?departure, "connection closed");
        departure
    }

    pub async fn session_count(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.table.lock().await.registry().len()
    }

    #[cfg(test)]
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, SessionTable> {
        self.table.lock().await
    }
}
