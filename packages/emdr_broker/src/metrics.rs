//! Broker metrics for observability
//!
//! Plain relaxed atomics, read out as a serializable snapshot by `/metrics`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct BrokerMetrics {
    // Connection metrics
    /// Currently open WebSocket connections
    pub active_connections: AtomicU64,
    /// Connections accepted since start
    pub total_connections: AtomicU64,

    // Session metrics
    /// Sessions currently in the table
    pub active_sessions: AtomicU64,
    /// Sessions created since start
    pub sessions_created: AtomicU64,
    pub joins_accepted: AtomicU64,
    pub joins_rejected: AtomicU64,

    // Frame metrics
    pub frames_received: AtomicU64,
    pub frames_sent: AtomicU64,
    /// Frames dropped because a peer's outbound queue was full
    pub frames_dropped: AtomicU64,

    // Error metrics
    pub decode_errors: AtomicU64,
    pub dispatch_errors: AtomicU64,

    start_time: Option<Instant>,
}

impl BrokerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Sessions come and go inside the table, so the gauge is set rather than stepped.
    pub fn set_active_sessions(&self, count: usize) {
        self.active_sessions.store(count as u64, Ordering::Relaxed);
    }

    pub fn join(&self, accepted: bool) {
        let counter = if accepted {
            &self.joins_accepted
        } else {
            &self.joins_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_delivered(&self, sent: u64, dropped: u64) {
        self.frames_sent.fetch_add(sent, Ordering::Relaxed);
        self.frames_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatch_error(&self) {
        self.dispatch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            connections: ConnectionMetrics {
                active: self.active_connections.load(Ordering::Relaxed),
                total: self.total_connections.load(Ordering::Relaxed),
            },
            sessions: SessionMetrics {
                active: self.active_sessions.load(Ordering::Relaxed),
                created: self.sessions_created.load(Ordering::Relaxed),
                joins_accepted: self.joins_accepted.load(Ordering::Relaxed),
                joins_rejected: self.joins_rejected.load(Ordering::Relaxed),
            },
            frames: FrameMetrics {
                received: self.frames_received.load(Ordering::Relaxed),
                sent: self.frames_sent.load(Ordering::Relaxed),
                dropped: self.frames_dropped.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                decode: self.decode_errors.load(Ordering::Relaxed),
                dispatch: self.dispatch_errors.load(Ordering::Relaxed),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionMetrics,
    pub sessions: SessionMetrics,
    pub frames: FrameMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub active: u64,
    pub created: u64,
    pub joins_accepted: u64,
    pub joins_rejected: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub received: u64,
    pub sent: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub decode: u64,
    pub dispatch: u64,
}

/// Body of `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub sessions: u64,
    pub connections: u64,
    pub uptime_secs: u64,
}
