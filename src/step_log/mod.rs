//! Step log: the persisted, append-only record of provisioning progress
//!
//! ## Layout
//!
//! ```text
//! <state dir>/
//! ├── steps.jsonl          # Current generation, one StepRecord per line
//! ├── steps.gen-1.jsonl    # Archived generations (written by `reset`)
//! └── .lock                # Advisory lock while a bootstrap is running
//! ```
//!
//! A step's lifecycle is journaled as lines: a `pending` line when it starts
//! and a `succeeded`/`failed` line when it ends. [`StepLog::records`] folds
//! these into one logical record per step per attempt. Every append is synced
//! to disk before returning.

pub mod guard;
pub mod record;

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{self, Result};

pub use guard::StepLogGuard;
pub use record::{Outcome, StepRecord};

/// Current generation log file
pub const LOG_FILE: &str = "steps.jsonl";

const ARCHIVE_PREFIX: &str = "steps.gen-";
const ARCHIVE_SUFFIX: &str = ".jsonl";

/// Handle on the step log of one state directory
#[derive(Debug)]
pub struct StepLog {
    path: PathBuf,
    /// Append handle; `None` for read-only snapshots
    file: Option<File>,
    /// Raw journal lines in write order
    entries: Vec<StepRecord>,
    attempt: u32,
    generation: u32,
    _guard: Option<StepLogGuard>,
}

impl StepLog {
    /// Open the step log for writing, taking the state directory lock
    pub fn open(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(LOG_FILE);
        fs::create_dir_all(state_dir)
            .map_err(|e| error::step_log::unavailable(&path, e.to_string()))?;

        let guard = StepLogGuard::acquire(state_dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| error::step_log::unavailable(&path, e.to_string()))?;

        let entries = load_entries(&mut file, &path, true)?;
        let generation = last_archived_generation(state_dir)?.saturating_add(1);

        debug!(
            path = %path.display(),
            records = entries.len(),
            generation,
            "Opened step log"
        );

        Ok(Self {
            path,
            file: Some(file),
            entries,
            attempt: 0,
            generation,
            _guard: Some(guard),
        })
    }

    /// Read-only snapshot of the step log; does not take the lock
    pub fn read(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(LOG_FILE);
        let entries = if path.exists() {
            let mut file =
                File::open(&path).map_err(|e| error::step_log::unavailable(&path, e.to_string()))?;
            load_entries(&mut file, &path, false)?
        } else {
            Vec::new()
        };
        let generation = if state_dir.is_dir() {
            last_archived_generation(state_dir)?.saturating_add(1)
        } else {
            1
        };
        let attempt = entries.iter().map(|r| r.attempt).max().unwrap_or(0);

        Ok(Self {
            path,
            file: None,
            entries,
            attempt,
            generation,
            _guard: None,
        })
    }

    /// Archive the current generation so the next run starts from scratch
    ///
    /// The log file is renamed, never deleted. Returns the archive path, or
    /// `None` when there was nothing to archive.
    pub fn reset(state_dir: &Path) -> Result<Option<PathBuf>> {
        let path = state_dir.join(LOG_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let _guard = StepLogGuard::acquire(state_dir)?;
        let generation = last_archived_generation(state_dir)?.saturating_add(1);
        let archive = state_dir.join(format!("{ARCHIVE_PREFIX}{generation}{ARCHIVE_SUFFIX}"));
        if archive.exists() {
            return Err(error::step_log::unavailable(
                &archive,
                "archive already exists; refusing to overwrite it",
            ));
        }

        fs::rename(&path, &archive)
            .map_err(|e| error::step_log::unavailable(&path, e.to_string()))?;

        Ok(Some(archive))
    }

    /// Begin a new orchestrator pass; records written from now on carry its number
    pub fn start_attempt(&mut self) -> u32 {
        self.attempt = self.entries.iter().map(|r| r.attempt).max().unwrap_or(0) + 1;
        self.attempt
    }

    /// Current attempt number (0 before the first [`StepLog::start_attempt`])
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Generation number of the current log file, starting at 1
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True only if the step has a `succeeded` record in the current generation
    pub fn has_succeeded(&self, step_name: &str) -> bool {
        self.entries
            .iter()
            .any(|r| r.step_name == step_name && r.outcome == Outcome::Succeeded)
    }

    /// Version stored by the latest successful record of a step
    pub fn last_version(&self, step_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .filter(|r| r.step_name == step_name && r.outcome == Outcome::Succeeded)
            .find_map(|r| r.version.as_deref())
    }

    /// Append a record for the current attempt
    pub fn record(
        &mut self,
        step_name: &str,
        outcome: Outcome,
        message: impl Into<String>,
    ) -> Result<()> {
        let record = StepRecord::new(step_name, outcome, message, self.attempt);
        self.append(record)
    }

    /// Append a fully built record and sync it to disk
    pub fn append(&mut self, record: StepRecord) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(error::step_log::unavailable(
                &self.path,
                "step log was opened read-only",
            ));
        };

        let mut line = serde_json::to_string(&record)
            .map_err(|e| error::step_log::unavailable(&self.path, e.to_string()))?;
        line.push('\n');

        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| error::step_log::unavailable(&self.path, e.to_string()))?;

        self.entries.push(record);
        Ok(())
    }

    /// One logical record per (attempt, step), latest state, in attempt order
    pub fn records(&self) -> Vec<StepRecord> {
        let mut folded: Vec<StepRecord> = Vec::new();
        for entry in &self.entries {
            match folded
                .iter_mut()
                .find(|r| r.attempt == entry.attempt && r.step_name == entry.step_name)
            {
                Some(existing) => *existing = entry.clone(),
                None => folded.push(entry.clone()),
            }
        }
        folded
    }

    /// Logical records of one attempt
    pub fn attempt_records(&self, attempt: u32) -> Vec<StepRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.attempt == attempt)
            .collect()
    }
}

/// Parse journal lines, tolerating a truncated final line from a crash
///
/// When `writable`, a truncated final line is cut off and a missing trailing
/// newline is added, so the next record starts on its own line.
fn load_entries(file: &mut File, path: &Path, writable: bool) -> Result<Vec<StepRecord>> {
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| error::step_log::unavailable(path, e.to_string()))?;

    let mut entries = Vec::new();
    let mut offset = 0usize;
    let mut truncate_at = None;

    for (index, chunk) in content.split_inclusive('\n').enumerate() {
        let line = chunk.trim_end();
        let is_last = offset + chunk.len() == content.len();

        if !line.is_empty() {
            match serde_json::from_str::<StepRecord>(line) {
                Ok(record) => entries.push(record),
                Err(e) if is_last => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring truncated final step log line"
                    );
                    truncate_at = Some(offset);
                }
                Err(e) => {
                    return Err(error::step_log::unavailable(
                        path,
                        format!("corrupt record on line {}: {e}", index + 1),
                    ));
                }
            }
        }
        offset += chunk.len();
    }

    if !writable {
        return Ok(entries);
    }

    let repair = if let Some(at) = truncate_at {
        file.set_len(at as u64)
    } else if !content.is_empty() && !content.ends_with('\n') {
        file.write_all(b"\n")
    } else {
        return Ok(entries);
    };
    repair
        .and_then(|()| file.sync_data())
        .map_err(|e| error::step_log::unavailable(path, e.to_string()))?;

    Ok(entries)
}

/// Highest archived generation number in the state directory, 0 when none
fn last_archived_generation(state_dir: &Path) -> Result<u32> {
    let entries = fs::read_dir(state_dir)
        .map_err(|e| error::step_log::unavailable(state_dir, e.to_string()))?;

    let last = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.strip_prefix(ARCHIVE_PREFIX)
                .and_then(|rest| rest.strip_suffix(ARCHIVE_SUFFIX))
                .and_then(|n| n.parse::<u32>().ok())
        })
        .max()
        .unwrap_or(0);

    Ok(last)
}
