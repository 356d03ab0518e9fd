use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use routewatch_core::{
    normalize, update, AppState, AppViewModel, ConnectionHealth, JobStatus, Msg, Notification,
    NotificationLevel, Phase, ProcessingOptions,
};
use routewatch_engine::{export_records, rfc3339, Clock, EngineHandle, ExportSummary, JobStore};
use routewatch_logging::{rw_error, rw_info, rw_warn};

use crate::effects::{EffectRunner, RecordsReply};

const CANCEL_WAIT: Duration = Duration::from_secs(15);
const FETCH_WAIT: Duration = Duration::from_secs(60);

/// Drives the core state machine from engine events until a job ends.
pub struct Runner {
    state: AppState,
    effects: EffectRunner,
    store: Arc<dyn JobStore>,
    clock: Clock,
    msg_rx: mpsc::Receiver<Msg>,
    records_rx: mpsc::Receiver<RecordsReply>,
    reported: Reported,
}

#[derive(Default)]
struct Reported {
    line: Option<String>,
    notification: Option<Notification>,
    connection: ConnectionHealth,
}

impl Runner {
    pub fn new(engine: EngineHandle, store: Arc<dyn JobStore>, clock: Clock) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel();
        let (records_tx, records_rx) = mpsc::channel();
        let effects = EffectRunner::new(engine, store.clone());
        effects.spawn_event_loop(msg_tx, records_tx, clock.clone());
        Self {
            state: AppState::new(),
            effects,
            store,
            clock,
            msg_rx,
            records_rx,
            reported: Reported::default(),
        }
    }

    /// Resumes a persisted job, or submits `csv` when none is running, and
    /// tracks it to the end. Returns the final view.
    pub fn track(
        &mut self,
        csv: Option<&Path>,
        options: ProcessingOptions,
    ) -> anyhow::Result<AppViewModel> {
        self.initialize();
        if self.state.job_in_progress() {
            let resumed = self.state.view().processing_id.unwrap_or_default();
            rw_info!("Resuming bulk job {}", resumed);
            if csv.is_some() {
                rw_warn!("A bulk job is already running; the given CSV is ignored");
            }
        } else if let Some(csv) = csv {
            self.dispatch(Msg::OptionsChanged(options));
            self.dispatch(Msg::FileSelected(csv.to_path_buf()));
            let now_ms = (self.clock)();
            self.dispatch(Msg::StartClicked { now_ms });
        } else {
            rw_info!("No active bulk job and no CSV given; nothing to track");
            return Ok(self.finish());
        }

        while self.state.job_in_progress() {
            let msg = self
                .msg_rx
                .recv()
                .map_err(|_| anyhow!("engine event loop stopped"))?;
            self.dispatch(msg);
        }
        Ok(self.finish())
    }

    /// Stops tracking the persisted job and asks the server to cancel it.
    pub fn stop(&mut self) -> anyhow::Result<AppViewModel> {
        self.initialize();
        if !self.state.job_in_progress() {
            rw_info!("No bulk job to stop");
            return Ok(self.finish());
        }

        self.dispatch(Msg::StopClicked);
        loop {
            match self.msg_rx.recv_timeout(CANCEL_WAIT) {
                Ok(msg) => {
                    let answered = matches!(msg, Msg::RemoteCancelFinished { .. });
                    self.dispatch(msg);
                    if answered {
                        break;
                    }
                }
                Err(_) => {
                    rw_warn!("No answer to the cancel request within {:?}", CANCEL_WAIT);
                    break;
                }
            }
        }
        Ok(self.finish())
    }

    /// Fetches a collection endpoint and exports its records to `dir`.
    pub fn fetch(&mut self, endpoint: &str, dir: &Path) -> anyhow::Result<ExportSummary> {
        self.effects.engine().fetch_records(endpoint);
        let (path, result) = self
            .records_rx
            .recv_timeout(FETCH_WAIT)
            .map_err(|_| anyhow!("no response from {endpoint} within {FETCH_WAIT:?}"))?;
        let records = result.with_context(|| format!("fetching {path}"))?;
        let summary = export_records(dir, &path, &records, &rfc3339((self.clock)()))?;
        rw_info!(
            "Exported {} records from {} to {:?}",
            summary.record_count,
            path,
            summary.output_path
        );
        Ok(summary)
    }

    /// Writes the records of a completed job's results to `dir`.
    pub fn export_results(
        &self,
        view: &AppViewModel,
        dir: &Path,
    ) -> anyhow::Result<Option<ExportSummary>> {
        let (Phase::Finished(JobStatus::Completed), Some(results)) = (view.phase, &view.results)
        else {
            return Ok(None);
        };
        let label = view.processing_id.as_deref().unwrap_or("results");
        let records = normalize(results);
        let summary = export_records(dir, label, &records, &rfc3339((self.clock)()))?;
        rw_info!(
            "Saved {} result records to {:?}",
            summary.record_count,
            summary.output_path
        );
        Ok(Some(summary))
    }

    fn initialize(&mut self) {
        let persisted = self.store.load();
        let now_ms = (self.clock)();
        self.dispatch(Msg::Initialize { persisted, now_ms });
    }

    fn finish(&mut self) -> AppViewModel {
        let view = self.state.view();
        self.dispatch(Msg::Teardown);
        view
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = was_dirty.then(|| state.view());
        self.state = state;
        if let Some(view) = view {
            self.report(&view);
        }
        self.effects.run(effects);
    }

    fn report(&mut self, view: &AppViewModel) {
        if view.notification.is_some() && view.notification != self.reported.notification {
            if let Some(notification) = &view.notification {
                log_notification(notification);
            }
        }
        self.reported.notification = view.notification.clone();

        if view.connection != self.reported.connection {
            match view.connection {
                ConnectionHealth::Degraded => {
                    rw_warn!("No status update for over a minute; still polling")
                }
                ConnectionHealth::Healthy => rw_info!("Status updates resumed"),
            }
            self.reported.connection = view.connection;
        }

        let line = describe(view);
        if line.is_some() && line != self.reported.line {
            if let Some(line) = &line {
                rw_info!("{}", line);
            }
        }
        self.reported.line = line;
    }
}

fn log_notification(notification: &Notification) {
    match notification.level {
        NotificationLevel::Error => rw_error!("{}", notification.text),
        NotificationLevel::Warning => rw_warn!("{}", notification.text),
        NotificationLevel::Info | NotificationLevel::Success => {
            rw_info!("{}", notification.text)
        }
    }
}

/// One-line progress summary, or `None` when there is nothing to show.
pub fn describe(view: &AppViewModel) -> Option<String> {
    let progress = view.progress.as_ref()?;
    let line = match view.phase {
        Phase::Idle => return None,
        Phase::Submitting => match &view.file {
            Some(file) => format!("Submitting {}", file.display()),
            None => "Submitting CSV".to_string(),
        },
        Phase::Processing => {
            let mut line = format!(
                "{}/{} routes ({}%), {} failed; current: {}; remaining: {}",
                progress.processed_routes(),
                progress.total_routes,
                view.percent,
                progress.failed_routes,
                progress.current_route,
                progress.estimated_time_remaining
            );
            if view.options.visibility.enabled {
                line.push_str(&format!(
                    "; sharp turns: {}, blind spots: {}",
                    progress.visibility.sharp_turns_found, progress.visibility.blind_spots_found
                ));
            }
            line
        }
        Phase::Finished(status) => format!(
            "Bulk job {}: {} of {} routes done, {} failed",
            status.as_str(),
            progress.completed_routes,
            progress.total_routes,
            progress.failed_routes
        ),
    };
    Some(line)
}

/// Fails when the final view ended in an error notification.
pub fn outcome(view: &AppViewModel) -> anyhow::Result<()> {
    match &view.notification {
        Some(notification) if notification.level == NotificationLevel::Error => {
            bail!("{}", notification.text)
        }
        _ => Ok(()),
    }
}
