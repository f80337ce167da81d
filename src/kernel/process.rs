//! Process abstraction
//!
//! A process is the unit of scheduling in vkernel. It carries an
//! immutable identity (pid, name, parent) and a lifecycle state that only
//! the scheduler mutates.
//!
//! Lifecycle:
//! - Ready -> Running (picked by the scheduler)
//! - Running -> Blocked (block_process)
//! - Blocked -> Ready (unblock_process)
//! - any -> Terminated (terminate_process, absorbing)

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Process identifier
///
/// Assigned from a monotonic counter starting at 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u64);

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority. Higher values win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low = 0,
    Normal = 1,
    High = 2,
}

impl Priority {
    /// Numeric weight used for display and comparison
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "low" => Ok(Priority::Low),
            "1" | "normal" => Ok(Priority::Normal),
            "2" | "high" => Ok(Priority::High),
            _ => Err(format!("invalid priority '{}' (expected 0-2 or low/normal/high)", s)),
        }
    }
}

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Waiting in the ready queue
    Ready,
    /// Occupying the single running slot
    Running,
    /// Parked in the blocked set until unblocked
    Blocked,
    /// Removed from the system
    Terminated,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Ready => write!(f, "Ready"),
            ProcessState::Running => write!(f, "Running"),
            ProcessState::Blocked => write!(f, "Blocked"),
            ProcessState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// A process in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    /// Unique process identifier
    pub pid: Pid,

    /// Process name (for display)
    pub name: String,

    /// Scheduling priority
    pub priority: Priority,

    /// Current state. Only the scheduler writes this.
    pub state: ProcessState,

    /// Parent process (None for top-level processes)
    pub parent: Option<Pid>,
}

impl Process {
    /// Create a new process in the Ready state
    pub fn new(pid: Pid, name: String, priority: Priority, parent: Option<Pid>) -> Self {
        Self {
            pid,
            name,
            priority,
            state: ProcessState::Ready,
            parent,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state != ProcessState::Terminated
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID: {}, Name: {}, Priority: {}, State: {}",
            self.pid, self.name, self.priority, self.state
        )
    }
}
