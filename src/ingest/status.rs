//! Observable ingestion status
//!
//! The ingestor and its supervisor publish state changes and counters on a
//! watch channel so readiness probes can see when ingestion has stopped.

use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle of the ingestion loop
///
/// `Stopped → Starting → Running → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for IngestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestState::Stopped => write!(f, "stopped"),
            IngestState::Starting => write!(f, "starting"),
            IngestState::Running => write!(f, "running"),
            IngestState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Ingestion counters
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Messages pulled from the stream
    pub received: u64,
    /// Proofs written to the store
    pub inserted: u64,
    /// Malformed messages acknowledged without storing
    pub skipped: u64,
    /// Messages whose insert failed after retries
    pub failed: u64,
    /// Offset of the last acknowledged message
    pub last_offset: Option<i64>,
}

impl IngestStats {
    /// Messages that were acknowledged, stored or skipped
    pub fn handled(&self) -> u64 {
        self.inserted + self.skipped
    }
}

/// Snapshot of ingestion health
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatus {
    pub state: IngestState,
    /// False once the supervisor has given up restarting
    pub healthy: bool,
    pub restarts: u32,
    pub last_error: Option<String>,
    pub stats: IngestStats,
}

impl Default for IngestStatus {
    fn default() -> Self {
        Self {
            state: IngestState::Stopped,
            healthy: true,
            restarts: 0,
            last_error: None,
            stats: IngestStats::default(),
        }
    }
}

/// Publisher side of the ingestion status
pub struct IngestMonitor {
    tx: watch::Sender<IngestStatus>,
}

impl IngestMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(IngestStatus::default());
        Self { tx }
    }

    /// Current status snapshot
    pub fn current(&self) -> IngestStatus {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> IngestState {
        self.tx.borrow().state
    }

    /// Receive every status change
    pub fn subscribe(&self) -> watch::Receiver<IngestStatus> {
        self.tx.subscribe()
    }

    pub fn set_state(&self, state: IngestState) {
        self.tx.send_modify(|status| status.state = state);
    }

    pub fn update_stats(&self, f: impl FnOnce(&mut IngestStats)) {
        self.tx.send_modify(|status| f(&mut status.stats));
    }

    pub fn record_failure(&self, error: impl Into<String>, restarts: u32) {
        let error = error.into();
        self.tx.send_modify(|status| {
            status.last_error = Some(error);
            status.restarts = restarts;
        });
    }

    pub fn set_restarts(&self, restarts: u32) {
        self.tx.send_modify(|status| status.restarts = restarts);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.tx.send_modify(|status| status.healthy = healthy);
    }
}

impl Default for IngestMonitor {
    fn default() -> Self {
        Self::new()
    }
}
