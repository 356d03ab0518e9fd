use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::job::processing_id;
use crate::view_model::{AppViewModel, ConnectionHealth, Phase};
use crate::{JobDescriptor, PollTiming, Poller, ProcessingOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    active: bool,
    dirty: bool,
    file: Option<PathBuf>,
    options: ProcessingOptions,
    timing: PollTiming,
    job: Option<JobDescriptor>,
    poller: Poller,
    submissions: u64,
    last_poll_error: Option<String>,
    notification: Option<Notification>,
    results: Option<Value>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_timing(PollTiming::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timing(timing: PollTiming) -> Self {
        Self {
            active: true,
            dirty: false,
            file: None,
            options: ProcessingOptions::default(),
            timing,
            job: None,
            poller: Poller::new(timing),
            submissions: 0,
            last_poll_error: None,
            notification: None,
            results: None,
        }
    }

    pub fn view(&self) -> AppViewModel {
        let progress = self.job.as_ref().map(|job| job.progress.clone());
        AppViewModel {
            phase: self.phase(),
            file: self.file.clone(),
            options: self.options.clone(),
            processing_id: self.job.as_ref().map(|job| job.processing_id.clone()),
            percent: progress.as_ref().map_or(0, |p| p.percent_complete()),
            progress,
            poller: self.poller.state(),
            connection: if self.poller.is_degraded() {
                ConnectionHealth::Degraded
            } else {
                ConnectionHealth::Healthy
            },
            last_poll_error: self.last_poll_error.clone(),
            notification: self.notification.clone(),
            results: self.results.clone(),
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.job {
            None => Phase::Idle,
            Some(job) if !job.processing => Phase::Finished(job.progress.status),
            Some(_) if self.poller.is_polling() => Phase::Processing,
            Some(_) => Phase::Submitting,
        }
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn job(&self) -> Option<&JobDescriptor> {
        self.job.as_ref()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn results(&self) -> Option<&Value> {
        self.results.as_ref()
    }

    /// True while a job is submitted or being polled.
    pub fn job_in_progress(&self) -> bool {
        self.job.as_ref().is_some_and(JobDescriptor::is_in_progress)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn poller_mut(&mut self) -> &mut Poller {
        &mut self.poller
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.poller.stop();
        self.mark_dirty();
    }

    pub(crate) fn set_file(&mut self, file: Option<PathBuf>) {
        self.file = file;
        self.mark_dirty();
    }

    pub(crate) fn set_options(&mut self, options: ProcessingOptions) {
        self.options = options;
        self.mark_dirty();
    }

    pub(crate) fn next_processing_id(&mut self, now_ms: i64) -> String {
        self.submissions += 1;
        processing_id(now_ms, self.submissions)
    }

    /// Installs a new job with a fresh, idle poller.
    pub(crate) fn begin_job(&mut self, descriptor: JobDescriptor) {
        self.poller.stop();
        self.poller = Poller::new(self.timing);
        self.job = Some(descriptor);
        self.last_poll_error = None;
        self.notification = None;
        self.results = None;
        self.mark_dirty();
    }

    /// Installs a persisted job and starts polling for it immediately.
    pub(crate) fn resume_job(&mut self, descriptor: JobDescriptor, now_ms: i64) {
        self.options = descriptor.options.clone();
        self.begin_job(descriptor);
        self.poller.start(now_ms);
    }

    pub(crate) fn set_job(&mut self, descriptor: JobDescriptor) {
        self.job = Some(descriptor);
        self.mark_dirty();
    }

    pub(crate) fn clear_job(&mut self) {
        self.poller.stop();
        self.job = None;
        self.last_poll_error = None;
        self.results = None;
        self.mark_dirty();
    }

    pub(crate) fn set_poll_error(&mut self, error: Option<String>) {
        if self.last_poll_error != error {
            self.last_poll_error = error;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_results(&mut self, results: Option<Value>) {
        self.results = results;
        self.mark_dirty();
    }

    pub(crate) fn notify(&mut self, level: NotificationLevel, text: impl Into<String>) {
        self.notification = Some(Notification {
            level,
            text: text.into(),
        });
        self.mark_dirty();
    }

    pub(crate) fn dismiss_notification(&mut self) {
        if self.notification.take().is_some() {
            self.mark_dirty();
        }
    }
}
