//! Single-slot persistence of the active bulk-processing session.
//!
//! The slot survives restarts so tracking can resume. A value that is
//! missing, unparsable or older than the freshness window is reported as
//! "no active job"; the three cases are indistinguishable to callers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use routewatch_core::{JobDescriptor, FRESHNESS_WINDOW_MS};
use routewatch_logging::{rw_debug, rw_warn};
use thiserror::Error;

use crate::clock::{system_clock, Clock};
use crate::persist::{AtomicFileWriter, PersistError};

pub const STATE_FILENAME: &str = "bulk_processing_state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not serialize job state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not write job state: {0}")]
    Persist(#[from] PersistError),
}

pub trait JobStore: Send + Sync {
    /// Overwrites the slot, stamping the descriptor with the capture time.
    fn save(&self, descriptor: &JobDescriptor) -> Result<(), StoreError>;
    /// Returns the stored descriptor if present, readable and fresh.
    fn load(&self) -> Option<JobDescriptor>;
    /// Empties the slot. Idempotent.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Stores the descriptor as JSON in `{dir}/bulk_processing_state.json`.
pub struct FileJobStore {
    writer: AtomicFileWriter,
    clock: Clock,
    freshness_window_ms: i64,
}

impl FileJobStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            clock: system_clock(),
            freshness_window_ms: FRESHNESS_WINDOW_MS,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_freshness_window(mut self, window_ms: i64) -> Self {
        self.freshness_window_ms = window_ms;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(STATE_FILENAME)
    }

    fn discard(&self, path: &Path, reason: &str) -> Option<JobDescriptor> {
        rw_debug!("Discarding persisted job state at {:?}: {}", path, reason);
        if let Err(err) = self.writer.remove(STATE_FILENAME) {
            rw_warn!("Failed to remove persisted job state {:?}: {}", path, err);
        }
        None
    }
}

impl JobStore for FileJobStore {
    fn save(&self, descriptor: &JobDescriptor) -> Result<(), StoreError> {
        let stamped = stamp(descriptor, (self.clock)());
        let content = serde_json::to_string_pretty(&stamped)?;
        self.writer.write(STATE_FILENAME, &content)?;
        Ok(())
    }

    fn load(&self) -> Option<JobDescriptor> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                rw_warn!("Failed to read persisted job state from {:?}: {}", path, err);
                return None;
            }
        };

        let descriptor: JobDescriptor = match serde_json::from_str(&content) {
            Ok(descriptor) => descriptor,
            Err(err) => return self.discard(&path, &format!("unparsable ({err})")),
        };

        if !descriptor.is_fresh((self.clock)(), self.freshness_window_ms) {
            return self.discard(&path, "expired");
        }
        Some(descriptor)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.writer.remove(STATE_FILENAME)?;
        Ok(())
    }
}

/// Keeps the serialized form in memory; useful for embedding and tests.
pub struct MemoryJobStore {
    slot: Mutex<Option<String>>,
    clock: Clock,
    freshness_window_ms: i64,
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl MemoryJobStore {
    pub fn new(clock: Clock) -> Self {
        Self {
            slot: Mutex::new(None),
            clock,
            freshness_window_ms: FRESHNESS_WINDOW_MS,
        }
    }

    /// Replaces the raw stored text, e.g. to simulate a corrupted slot.
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self.lock() = Some(raw.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JobStore for MemoryJobStore {
    fn save(&self, descriptor: &JobDescriptor) -> Result<(), StoreError> {
        let content = serde_json::to_string(&stamp(descriptor, (self.clock)()))?;
        *self.lock() = Some(content);
        Ok(())
    }

    fn load(&self) -> Option<JobDescriptor> {
        let raw = self.lock().clone()?;
        serde_json::from_str::<JobDescriptor>(&raw)
            .ok()
            .filter(|descriptor| descriptor.is_fresh((self.clock)(), self.freshness_window_ms))
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.lock() = None;
        Ok(())
    }
}

fn stamp(descriptor: &JobDescriptor, now_ms: i64) -> JobDescriptor {
    JobDescriptor {
        timestamp_ms: now_ms,
        ..descriptor.clone()
    }
}
