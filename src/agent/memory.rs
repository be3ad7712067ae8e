//! Persistent agent memory
//!
//! Each agent with memory enabled keeps a JSON Lines file of past tasks and
//! results. The most recent entries are rendered into the agent's system
//! prompt; a new entry is appended after every successful run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{DelegateError, Result};

/// Source of the current time for memory timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Read/append access to agent memory
pub trait MemoryStore: Send + Sync {
    /// Render the last `last_n` entries for `agent`; empty when there are none
    fn load_entries(&self, agent: &str, path: &Path, last_n: usize) -> Result<String>;

    /// Record a completed task
    fn append_entry(&self, path: &Path, task: &str, result: &str) -> Result<()>;
}

/// One remembered task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub result: String,
}

impl MemoryEntry {
    fn render(&self) -> String {
        format!(
            "- [{}] Task: {}\n  Result: {}",
            self.timestamp.format("%Y-%m-%d %H:%M UTC"),
            self.task.trim(),
            self.result.trim().replace('\n', "\n  ")
        )
    }
}

/// JSON Lines memory files
#[derive(Clone)]
pub struct JsonlMemoryStore {
    clock: Arc<dyn Clock>,
}

impl JsonlMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Parse every well-formed entry in `path`; a missing file has none
    pub fn read_entries(&self, path: &Path) -> Result<Vec<MemoryEntry>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DelegateError::memory(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mut entries = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MemoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::debug!(
                    path = %path.display(),
                    line = number + 1,
                    error = %e,
                    "skipping malformed memory entry"
                ),
            }
        }
        Ok(entries)
    }
}

impl Default for JsonlMemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore for JsonlMemoryStore {
    fn load_entries(&self, agent: &str, path: &Path, last_n: usize) -> Result<String> {
        let entries = self.read_entries(path)?;
        let skip = entries.len().saturating_sub(last_n);
        let rendered: Vec<String> = entries[skip..].iter().map(MemoryEntry::render).collect();
        tracing::debug!(agent, loaded = rendered.len(), "loaded memory entries");
        Ok(rendered.join("\n"))
    }

    fn append_entry(&self, path: &Path, task: &str, result: &str) -> Result<()> {
        let entry = MemoryEntry {
            timestamp: self.clock.now(),
            task: task.to_string(),
            result: result.to_string(),
        };
        let line = serde_json::to_string(&entry)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DelegateError::memory(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DelegateError::memory(format!("cannot open {}: {}", path.display(), e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| DelegateError::memory(format!("cannot write {}: {}", path.display(), e)))
    }
}
