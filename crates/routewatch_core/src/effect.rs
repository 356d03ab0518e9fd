use std::path::PathBuf;

use crate::{JobDescriptor, ProcessingOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Overwrite the persisted descriptor.
    PersistJob(JobDescriptor),
    ClearPersistedJob,
    SubmitJob {
        file: PathBuf,
        options: ProcessingOptions,
        processing_id: String,
    },
    StartPolling {
        interval_ms: u64,
        stale_check_ms: u64,
    },
    StopPolling,
    FetchStatus { seq: u64 },
    /// Best-effort; failure only stops local tracking.
    CancelRemoteJob,
}
