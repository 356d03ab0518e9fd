use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::job::read_text;
use crate::{
    unwrap_payload, AppState, Effect, JobDescriptor, JobProgress, JobStatus, Msg,
    NotificationLevel, PollOutcome, PollerState, FRESHNESS_WINDOW_MS,
};

pub const MSG_NO_FILE: &str = "Please select a CSV file first";
pub const MSG_STARTED: &str = "Bulk processing started";
pub const MSG_COMPLETED: &str = "Bulk processing completed successfully";
pub const MSG_FAILED: &str = "Bulk processing failed";
pub const MSG_CANCELLED: &str = "Bulk processing was cancelled";
pub const MSG_STOPPED: &str = "Stopped tracking bulk processing";
pub const MSG_CANCEL_UNAVAILABLE: &str =
    "Server did not confirm cancellation; tracking stopped locally";

/// Pure update function: applies a message to state and returns any effects.
///
/// After `Msg::Teardown` every message is ignored, so results of requests
/// that were in flight during teardown cannot touch state.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    if !state.is_active() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Initialize { persisted, now_ms } => resume(&mut state, persisted, now_ms),
        Msg::FileSelected(path) => {
            let Some(path) = clean_path(path) else {
                return (state, Vec::new());
            };
            if state.job_in_progress() {
                return (state, Vec::new());
            }
            state.set_file(Some(path));
            if state.job().is_some() {
                state.clear_job();
            }
            vec![Effect::ClearPersistedJob]
        }
        Msg::FileCleared => {
            if state.job_in_progress() || state.file().is_none() {
                return (state, Vec::new());
            }
            state.set_file(None);
            Vec::new()
        }
        Msg::OptionsChanged(options) => {
            if !state.job_in_progress() {
                state.set_options(options.sanitized());
            }
            Vec::new()
        }
        Msg::StartClicked { now_ms } => start(&mut state, now_ms),
        Msg::SubmitSucceeded {
            processing_id,
            message,
            now_ms,
        } => {
            if !is_current_submission(&state, &processing_id) {
                return (state, Vec::new());
            }
            state.poller_mut().start(now_ms);
            state.notify(
                NotificationLevel::Info,
                message.unwrap_or_else(|| MSG_STARTED.to_owned()),
            );
            let timing = state.timing();
            vec![Effect::StartPolling {
                interval_ms: timing.interval_ms,
                stale_check_ms: timing.stale_check_ms,
            }]
        }
        Msg::SubmitFailed {
            processing_id,
            error,
        } => {
            if !is_current_submission(&state, &processing_id) {
                return (state, Vec::new());
            }
            state.clear_job();
            state.notify(NotificationLevel::Error, error);
            vec![Effect::ClearPersistedJob]
        }
        Msg::PollTick => match state.poller_mut().tick() {
            Some(seq) => vec![Effect::FetchStatus { seq }],
            None => Vec::new(),
        },
        Msg::PollResponse {
            seq,
            now_ms,
            outcome,
        } => poll_response(&mut state, seq, now_ms, outcome),
        Msg::StaleCheck { now_ms } => {
            if state.poller_mut().check_staleness(now_ms) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::StopClicked => {
            let cancel_remote = state.job_in_progress();
            state.clear_job();
            state.notify(NotificationLevel::Info, MSG_STOPPED);
            let mut effects = vec![Effect::StopPolling];
            if cancel_remote {
                effects.push(Effect::CancelRemoteJob);
            }
            effects.push(Effect::ClearPersistedJob);
            effects
        }
        Msg::RemoteCancelFinished { cancelled } => {
            if !cancelled && !state.job_in_progress() {
                state.notify(NotificationLevel::Warning, MSG_CANCEL_UNAVAILABLE);
            }
            Vec::new()
        }
        Msg::Teardown => {
            state.deactivate();
            vec![Effect::StopPolling]
        }
        Msg::NotificationDismissed => {
            state.dismiss_notification();
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Trims surrounding whitespace from UTF-8 paths; other paths pass through
/// untouched. Empty paths are rejected.
fn clean_path(path: PathBuf) -> Option<PathBuf> {
    let trimmed = path.to_str().map(|text| PathBuf::from(text.trim()));
    let cleaned = trimmed.unwrap_or(path);
    (!cleaned.as_os_str().is_empty()).then_some(cleaned)
}

fn resume(state: &mut AppState, persisted: Option<JobDescriptor>, now_ms: i64) -> Vec<Effect> {
    if state.job_in_progress() {
        return Vec::new();
    }
    let Some(descriptor) = persisted else {
        return Vec::new();
    };
    if !descriptor.is_in_progress() || !descriptor.is_fresh(now_ms, FRESHNESS_WINDOW_MS) {
        return vec![Effect::ClearPersistedJob];
    }

    state.resume_job(descriptor, now_ms);
    let timing = state.timing();
    vec![Effect::StartPolling {
        interval_ms: timing.interval_ms,
        stale_check_ms: timing.stale_check_ms,
    }]
}

fn start(state: &mut AppState, now_ms: i64) -> Vec<Effect> {
    if state.job_in_progress() {
        return Vec::new();
    }
    let Some(file) = state.file().map(Path::to_path_buf) else {
        state.notify(NotificationLevel::Error, MSG_NO_FILE);
        return Vec::new();
    };

    let options = state.options().clone();
    let processing_id = state.next_processing_id(now_ms);
    let descriptor = JobDescriptor::new(processing_id.clone(), options.clone(), now_ms);
    state.begin_job(descriptor.clone());

    vec![
        Effect::PersistJob(descriptor),
        Effect::SubmitJob {
            file,
            options,
            processing_id,
        },
    ]
}

/// A submission reply only counts for the job still waiting on it.
fn is_current_submission(state: &AppState, processing_id: &str) -> bool {
    state.poller().state() == PollerState::Idle
        && state
            .job()
            .is_some_and(|job| job.processing_id == processing_id && job.is_in_progress())
}

fn poll_response(
    state: &mut AppState,
    seq: u64,
    now_ms: i64,
    outcome: PollOutcome,
) -> Vec<Effect> {
    match outcome {
        PollOutcome::Status(raw) => {
            if !state.poller_mut().accept(seq, now_ms) {
                return Vec::new();
            }
            state.set_poll_error(None);
            apply_status(state, unwrap_payload(&raw), now_ms)
        }
        PollOutcome::NotFound => {
            if !state.poller_mut().accept(seq, now_ms) {
                return Vec::new();
            }
            // The job is gone server-side; report it as finished without results.
            finish(state, JobStatus::Completed, now_ms);
            state.notify(NotificationLevel::Success, MSG_COMPLETED);
            vec![Effect::StopPolling, Effect::ClearPersistedJob]
        }
        PollOutcome::ServerError { status, message } => {
            if state.poller_mut().release(seq) {
                state.set_poll_error(Some(format!("server error {status}: {message}")));
            }
            Vec::new()
        }
        PollOutcome::Transport(message) => {
            if state.poller_mut().release(seq) {
                state.set_poll_error(Some(message));
            }
            Vec::new()
        }
    }
}

fn apply_status(state: &mut AppState, payload: &Value, now_ms: i64) -> Vec<Effect> {
    let Some(job) = state.job() else {
        return Vec::new();
    };
    let mut descriptor = job.clone();
    descriptor.progress = JobProgress::from_payload(payload).merge_monotonic(&job.progress);
    descriptor.timestamp_ms = now_ms;
    let status = descriptor.progress.status;

    if !status.is_terminal() {
        state.set_job(descriptor.clone());
        return vec![Effect::PersistJob(descriptor)];
    }

    descriptor.processing = false;
    state.set_job(descriptor);
    state.poller_mut().stop();

    match status {
        JobStatus::Completed => {
            let results = payload.get("results").filter(|value| !value.is_null()).cloned();
            state.set_results(results);
            let message = payload_text(payload, &["message"])
                .unwrap_or_else(|| MSG_COMPLETED.to_owned());
            state.notify(NotificationLevel::Success, message);
        }
        JobStatus::Failed => {
            let error = payload_text(payload, &["error", "message"])
                .unwrap_or_else(|| MSG_FAILED.to_owned());
            state.notify(NotificationLevel::Error, error);
        }
        _ => state.notify(NotificationLevel::Info, MSG_CANCELLED),
    }

    vec![Effect::StopPolling, Effect::ClearPersistedJob]
}

fn payload_text(payload: &Value, keys: &[&str]) -> Option<String> {
    payload.as_object().and_then(|object| read_text(object, keys))
}

fn finish(state: &mut AppState, status: JobStatus, now_ms: i64) {
    if let Some(job) = state.job() {
        let mut descriptor = job.clone();
        descriptor.processing = false;
        descriptor.progress.status = status;
        descriptor.timestamp_ms = now_ms;
        state.set_job(descriptor);
    }
    state.poller_mut().stop();
    state.set_results(None);
}
