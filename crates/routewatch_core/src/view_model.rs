use std::path::PathBuf;

use serde_json::Value;

use crate::{JobProgress, JobStatus, Notification, PollerState, ProcessingOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Submission sent, waiting for the backend to accept it.
    Submitting,
    Processing,
    /// Tracking ended with this terminal status.
    Finished(JobStatus),
}

/// Advisory only; a degraded connection never stops polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionHealth {
    #[default]
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub file: Option<PathBuf>,
    pub options: ProcessingOptions,
    pub processing_id: Option<String>,
    pub progress: Option<JobProgress>,
    pub percent: u8,
    pub poller: PollerState,
    pub connection: ConnectionHealth,
    pub last_poll_error: Option<String>,
    pub notification: Option<Notification>,
    pub results: Option<Value>,
    pub dirty: bool,
}
