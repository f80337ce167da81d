//! Audit event log
//!
//! Every kernel state transition is reported to an `EventLog`. The sink is
//! injected at construction time, so components never check whether a
//! logger exists: callers that don't care pass a `NullLog`.
//!
//! Sinks:
//! - `FileLog`: append-only text file, one `[YYYY-MM-DD HH:MM:SS] message` line per event (UTC)
//! - `MemoryLog`: bounded ring buffer for observers and tests
//! - `NullLog`: discards everything
//!
//! Logging never fails from the caller's point of view. I/O errors are
//! reported through `tracing` and otherwise swallowed.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of records kept by a `MemoryLog`
pub const MEMORY_LOG_CAPACITY: usize = 1000;

/// A one-method audit sink
pub trait EventLog: Send + Sync {
    fn log(&self, message: &str);
}

/// Shared handle to an audit sink
pub type SharedLog = Arc<dyn EventLog>;

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl EventLog for NullLog {
    fn log(&self, _message: &str) {}
}

/// Append-only file sink
///
/// Timestamps are UTC, not local time.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    /// Serializes appends from concurrent callers
    lock: Mutex<()>,
}

impl FileLog {
    /// Open (and create if needed) the log file and its parent directory
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl EventLog for FileLog {
    fn log(&self, message: &str) {
        let line = format!("[{}] {}\n", timestamp_now(), message);
        if let Err(e) = self.append(&line) {
            tracing::warn!(path = %self.path.display(), error = %e, "audit log write failed");
        }
    }
}

/// Ring buffer sink
///
/// Keeps the most recent messages without timestamps.
#[derive(Debug)]
pub struct MemoryLog {
    messages: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity.min(MEMORY_LOG_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Recorded messages, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().iter().cloned().collect()
    }

    /// True if any recorded message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for MemoryLog {
    fn log(&self, message: &str) {
        let mut messages = self.messages.lock();
        if messages.len() >= self.capacity {
            messages.pop_front();
        }
        messages.push_back(message.to_string());
    }
}

/// Current wall-clock time as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn timestamp_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_timestamp(secs)
}

/// Format seconds since the Unix epoch as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn format_timestamp(secs: u64) -> String {
    let mut remaining_days = secs / 86400;
    let secs_of_day = secs % 86400;

    let mut year = 1970u32;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let mut month = 1u32;
    loop {
        let days = days_in_month(month, year) as u64;
        if remaining_days < days {
            break;
        }
        remaining_days -= days;
        month += 1;
    }

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        remaining_days + 1,
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(month: u32, year: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}
