use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use routewatch_core::{Effect, Msg, Record};
use routewatch_engine::{ApiError, Clock, EngineEvent, EngineHandle, JobStore};
use routewatch_logging::{rw_debug, rw_error, rw_info};

/// Results of record fetches, which have no core message.
pub type RecordsReply = (String, Result<Vec<Record>, ApiError>);

/// Executes core effects against the engine and the job store.
pub struct EffectRunner {
    engine: EngineHandle,
    store: Arc<dyn JobStore>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, store: Arc<dyn JobStore>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PersistJob(descriptor) => {
                    if let Err(err) = self.store.save(&descriptor) {
                        rw_error!("Failed to persist job {}: {}", descriptor.processing_id, err);
                    }
                }
                Effect::ClearPersistedJob => {
                    if let Err(err) = self.store.clear() {
                        rw_error!("Failed to clear persisted job: {}", err);
                    }
                }
                Effect::SubmitJob {
                    file,
                    options,
                    processing_id,
                } => {
                    rw_info!("Submitting {} as {}", file.display(), processing_id);
                    self.engine.submit(file, options, processing_id);
                }
                Effect::StartPolling {
                    interval_ms,
                    stale_check_ms,
                } => self.engine.start_polling(
                    Duration::from_millis(interval_ms),
                    Duration::from_millis(stale_check_ms),
                ),
                Effect::StopPolling => self.engine.stop_polling(),
                Effect::FetchStatus { seq } => {
                    rw_debug!("Polling status (seq {})", seq);
                    self.engine.fetch_status(seq);
                }
                Effect::CancelRemoteJob => self.engine.cancel(),
            }
        }
    }

    /// Forwards engine events as core messages, stamped with `clock`.
    /// Record fetches go to `records_tx` instead. The loop ends, dropping
    /// both senders, once the engine or either receiver is gone.
    pub fn spawn_event_loop(
        &self,
        msg_tx: mpsc::Sender<Msg>,
        records_tx: mpsc::Sender<RecordsReply>,
        clock: Clock,
    ) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            let event = match engine.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => event,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    rw_error!("Engine stopped; no further events");
                    break;
                }
            };
            let delivered = match event {
                EngineEvent::Records { path, result } => records_tx.send((path, result)).is_ok(),
                event => match event_to_msg(event, clock()) {
                    Some(msg) => msg_tx.send(msg).is_ok(),
                    None => true,
                },
            };
            if !delivered {
                break;
            }
        });
    }
}

/// Maps an engine event to the message the core expects.
pub fn event_to_msg(event: EngineEvent, now_ms: i64) -> Option<Msg> {
    let msg = match event {
        EngineEvent::Submitted {
            processing_id,
            result: Ok(accepted),
        } => Msg::SubmitSucceeded {
            processing_id,
            message: accepted.message,
            now_ms,
        },
        EngineEvent::Submitted {
            processing_id,
            result: Err(err),
        } => Msg::SubmitFailed {
            processing_id,
            error: submit_error_text(&err),
        },
        EngineEvent::Status { seq, outcome } => Msg::PollResponse {
            seq,
            now_ms,
            outcome,
        },
        EngineEvent::CancelFinished { cancelled } => Msg::RemoteCancelFinished { cancelled },
        EngineEvent::PollDue => Msg::PollTick,
        EngineEvent::StaleCheckDue => Msg::StaleCheck { now_ms },
        EngineEvent::Records { .. } => return None,
    };
    Some(msg)
}

fn submit_error_text(err: &ApiError) -> String {
    match err {
        ApiError::Rejected(message) => message.clone(),
        ApiError::HttpStatus { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
