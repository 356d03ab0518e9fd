//! Routewatch core: pure bulk-job tracking state machine, response
//! normalization and view-model helpers.
mod effect;
mod job;
mod msg;
mod normalize;
mod poller;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{
    processing_id, read_text, AnalysisDepth, DataCollectionStats, JobDescriptor, JobProgress,
    JobStatus, ProcessingMode, ProcessingOptions, VisibilityOptions, VisibilityStats,
    FRESHNESS_WINDOW_MS, MAX_CONCURRENCY, MIN_CONCURRENCY, PLACEHOLDER_CURRENT_ROUTE,
    PLACEHOLDER_TIME_REMAINING,
};
pub use msg::{Msg, PollOutcome};
pub use normalize::{normalize, unwrap_payload, Normalizer, Record, Shape};
pub use poller::{
    PollTiming, Poller, PollerState, POLL_INTERVAL_MS, STALE_AFTER_MS, STALE_CHECK_INTERVAL_MS,
};
pub use state::{AppState, Notification, NotificationLevel};
pub use update::{
    update, MSG_CANCELLED, MSG_CANCEL_UNAVAILABLE, MSG_COMPLETED, MSG_FAILED, MSG_NO_FILE,
    MSG_STARTED, MSG_STOPPED,
};
pub use view_model::{AppViewModel, ConnectionHealth, Phase};
