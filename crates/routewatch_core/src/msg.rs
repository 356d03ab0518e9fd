use std::path::PathBuf;

use serde_json::Value;

use crate::{JobDescriptor, ProcessingOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Startup: offer the persisted descriptor, if any, for resumption.
    Initialize {
        persisted: Option<JobDescriptor>,
        now_ms: i64,
    },
    /// User picked a CSV file.
    FileSelected(PathBuf),
    /// User removed the selected file.
    FileCleared,
    /// User edited the processing options.
    OptionsChanged(ProcessingOptions),
    /// User clicked Start.
    StartClicked { now_ms: i64 },
    /// The backend accepted the submission.
    SubmitSucceeded {
        processing_id: String,
        message: Option<String>,
        now_ms: i64,
    },
    /// The submission request failed or was rejected.
    SubmitFailed {
        processing_id: String,
        error: String,
    },
    /// Poll interval elapsed.
    PollTick,
    /// A status request resolved.
    PollResponse {
        seq: u64,
        now_ms: i64,
        outcome: PollOutcome,
    },
    /// Stale-check interval elapsed.
    StaleCheck { now_ms: i64 },
    /// User clicked Stop.
    StopClicked,
    /// Best-effort server-side cancel finished. `cancelled` is false when the
    /// server could not cancel; local tracking has stopped either way.
    RemoteCancelFinished { cancelled: bool },
    /// The session is going away; later async results must be ignored.
    Teardown,
    NotificationDismissed,
    NoOp,
}

/// Result of one status request, as classified by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// 2xx with a JSON body.
    Status(Value),
    /// 404: the job no longer exists server-side.
    NotFound,
    /// Non-2xx other than 404.
    ServerError { status: u16, message: String },
    /// Network failure, timeout or unreadable body.
    Transport(String),
}
