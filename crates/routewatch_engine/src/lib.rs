//! Routewatch engine: backend client, job-state store, timers and effect
//! execution.
mod api;
mod clock;
mod engine;
mod export;
mod persist;
mod scheduler;
mod store;
mod types;

pub use api::{ApiSettings, BulkRoutesApi, ReqwestApi, CANCEL_PATH, STATUS_PATH, SUBMIT_PATH};
pub use clock::{fixed_clock, rfc3339, system_clock, Clock};
pub use engine::{poll_outcome, EngineEvent, EngineHandle};
pub use export::{export_records, export_stem, ExportError, ExportSummary};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use scheduler::{ManualScheduler, Scheduler, TickFn, TokioScheduler};
pub use store::{FileJobStore, JobStore, MemoryJobStore, StoreError, STATE_FILENAME};
pub use types::{ApiError, StatusReply, SubmitAccepted};
