use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use routewatch_core::{PollOutcome, ProcessingOptions, Record};
use routewatch_logging::{rw_debug, rw_info, rw_warn};

use crate::api::BulkRoutesApi;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::{ApiError, StatusReply, SubmitAccepted};

enum EngineCommand {
    Submit {
        file: PathBuf,
        options: ProcessingOptions,
        processing_id: String,
    },
    FetchStatus {
        seq: u64,
    },
    Cancel,
    FetchRecords {
        path: String,
    },
    StartPolling {
        interval: Duration,
        stale_check: Duration,
    },
    StopPolling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted {
        processing_id: String,
        result: Result<SubmitAccepted, ApiError>,
    },
    Status {
        seq: u64,
        outcome: PollOutcome,
    },
    CancelFinished {
        cancelled: bool,
    },
    Records {
        path: String,
        result: Result<Vec<Record>, ApiError>,
    },
    /// Poll timer fired.
    PollDue,
    /// Stale-check timer fired.
    StaleCheckDue,
}

/// Runs backend requests and poll timers on a background tokio runtime.
///
/// Commands go in through the handle; results come back as [`EngineEvent`]s.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<std::sync::Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(api: Arc<dyn BulkRoutesApi>) -> Self {
        Self::with_schedulers(
            api,
            Box::new(TokioScheduler::new()),
            Box::new(TokioScheduler::new()),
        )
    }

    pub fn with_schedulers(
        api: Arc<dyn BulkRoutesApi>,
        mut poll_timer: Box<dyn Scheduler>,
        mut stale_timer: Box<dyn Scheduler>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let _context = runtime.enter();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartPolling {
                        interval,
                        stale_check,
                    } => {
                        rw_debug!(
                            "Polling every {:?}, stale check every {:?}",
                            interval,
                            stale_check
                        );
                        poll_timer.start(interval, notifier(&event_tx, EngineEvent::PollDue));
                        stale_timer.start(
                            stale_check,
                            notifier(&event_tx, EngineEvent::StaleCheckDue),
                        );
                    }
                    EngineCommand::StopPolling => {
                        poll_timer.stop();
                        stale_timer.stop();
                    }
                    request => {
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            handle_request(api.as_ref(), request, event_tx).await;
                        });
                    }
                }
            }
            poll_timer.stop();
            stale_timer.stop();
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(std::sync::Mutex::new(event_rx)),
        }
    }

    pub fn submit(
        &self,
        file: impl Into<PathBuf>,
        options: ProcessingOptions,
        processing_id: String,
    ) {
        self.send(EngineCommand::Submit {
            file: file.into(),
            options,
            processing_id,
        });
    }

    pub fn fetch_status(&self, seq: u64) {
        self.send(EngineCommand::FetchStatus { seq });
    }

    pub fn cancel(&self) {
        self.send(EngineCommand::Cancel);
    }

    /// Fetches and normalizes a collection endpoint, e.g. `routes`.
    pub fn fetch_records(&self, path: impl Into<String>) {
        self.send(EngineCommand::FetchRecords { path: path.into() });
    }

    pub fn start_polling(&self, interval: Duration, stale_check: Duration) {
        self.send(EngineCommand::StartPolling {
            interval,
            stale_check,
        });
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event. `Disconnected` means the
    /// engine thread is gone and no further events will arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, mpsc::RecvTimeoutError> {
        let events = self
            .event_rx
            .lock()
            .map_err(|_| mpsc::RecvTimeoutError::Disconnected)?;
        events.recv_timeout(timeout)
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            rw_warn!("Engine thread is gone; command dropped");
        }
    }
}

fn notifier(event_tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) -> Box<dyn FnMut() + Send> {
    let event_tx = event_tx.clone();
    Box::new(move || {
        let _ = event_tx.send(event.clone());
    })
}

async fn handle_request(
    api: &dyn BulkRoutesApi,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::Submit {
            file,
            options,
            processing_id,
        } => {
            let result = api.submit(&file, &options, &processing_id).await;
            match &result {
                Ok(_) => rw_info!("Bulk job {} accepted", processing_id),
                Err(err) => rw_warn!("Bulk job {} not started: {}", processing_id, err),
            }
            EngineEvent::Submitted {
                processing_id,
                result,
            }
        }
        EngineCommand::FetchStatus { seq } => EngineEvent::Status {
            seq,
            outcome: poll_outcome(api.status().await),
        },
        EngineCommand::Cancel => {
            let cancelled = match api.cancel().await {
                Ok(cancelled) => cancelled,
                Err(err) => {
                    rw_warn!("Server-side cancel failed: {}", err);
                    false
                }
            };
            EngineEvent::CancelFinished { cancelled }
        }
        EngineCommand::FetchRecords { path } => {
            let result = api.records(&path).await;
            if let Ok(records) = &result {
                rw_debug!("Fetched {} records from {}", records.len(), path);
            }
            EngineEvent::Records { path, result }
        }
        EngineCommand::StartPolling { .. } | EngineCommand::StopPolling => return,
    };
    let _ = event_tx.send(event);
}

/// Classifies a status call for the poller: 404 and bodies are data, HTTP
/// errors are server faults and anything else is a transport fault.
pub fn poll_outcome(result: Result<StatusReply, ApiError>) -> PollOutcome {
    match result {
        Ok(StatusReply::Status(value)) => PollOutcome::Status(value),
        Ok(StatusReply::NotFound) => PollOutcome::NotFound,
        Err(ApiError::HttpStatus { status, message }) => {
            rw_warn!("Status poll failed with {}: {}", status, message);
            PollOutcome::ServerError { status, message }
        }
        Err(err) => {
            rw_warn!("Status poll failed: {}", err);
            PollOutcome::Transport(err.to_string())
        }
    }
}
