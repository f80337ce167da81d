//! Process scheduler
//!
//! Owns the process table, the ready queue, the blocked set, and the single
//! running slot. Every mutating operation ends with a scheduling pass.
//!
//! Scheduling is non-preemptive and priority-based: when the running slot
//! is empty, the ready queue is stably re-sorted by priority (highest first)
//! and its head runs next. A running process is never displaced.
//!
//! Invariants:
//! - At most one process is Running
//! - A live process is in exactly one of {ready queue, blocked set, running slot}
//! - Pids are assigned from a counter starting at 1 and never reused

use super::logger::{NullLog, SharedLog};
use super::process::{Pid, Priority, Process, ProcessState};
use serde::Serialize;
use slab::Slab;
use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;

/// Scheduler error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Unknown pid
    #[error("Process with PID {0} not found.")]
    NotFound(Pid),

    /// block_process on a pid that is not the running process
    #[error("Process with PID {0} not running or not found.")]
    NotRunning(Pid),

    /// unblock_process on a pid that is not in the blocked set
    #[error("Process with PID {0} not blocked or not found.")]
    NotBlocked(Pid),
}

/// Read-only view of the scheduler queues
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessListing {
    pub running: Option<Process>,
    /// Ready queue in current order
    pub ready: Vec<Process>,
    /// Blocked set in blocking order
    pub blocked: Vec<Process>,
}

impl ProcessListing {
    pub fn is_empty(&self) -> bool {
        self.running.is_none() && self.ready.is_empty() && self.blocked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.running.iter().count() + self.ready.len() + self.blocked.len()
    }
}

/// The process scheduler
pub struct Scheduler {
    /// Process table
    table: Slab<Process>,
    /// Pid to table slot
    index: HashMap<Pid, usize>,
    ready: VecDeque<Pid>,
    blocked: Vec<Pid>,
    running: Option<Pid>,
    next_pid: u64,
    log: SharedLog,
}

impl Scheduler {
    pub fn new(log: SharedLog) -> Self {
        Self {
            table: Slab::new(),
            index: HashMap::new(),
            ready: VecDeque::new(),
            blocked: Vec::new(),
            running: None,
            next_pid: 1,
            log,
        }
    }

    /// Create a process and put it on the ready queue
    ///
    /// Always succeeds; no process limit is enforced.
    pub fn create_process(
        &mut self,
        name: impl Into<String>,
        priority: Priority,
        parent: Option<Pid>,
    ) -> Pid {
        let pid = Pid(self.next_pid);
        self.next_pid += 1;

        let process = Process::new(pid, name.into(), priority, parent);
        self.log.log(&format!("Process created: {}", process));
        tracing::debug!(%pid, name = %process.name, ?priority, "process created");

        let slot = self.table.insert(process);
        self.index.insert(pid, slot);
        self.ready.push_back(pid);

        self.schedule();
        pid
    }

    /// Remove a process from the system, wherever it is
    ///
    /// Returns the removed process with its state set to Terminated.
    pub fn terminate_process(&mut self, pid: Pid) -> Result<Process, SchedulerError> {
        let slot = self.index.remove(&pid).ok_or(SchedulerError::NotFound(pid))?;
        let mut process = self.table.remove(slot);
        process.state = ProcessState::Terminated;

        self.ready.retain(|p| *p != pid);
        self.blocked.retain(|p| *p != pid);

        if self.running == Some(pid) {
            self.running = None;
            self.log.log(&format!("Running process terminated: {}", process));
            tracing::debug!(%pid, "running process terminated");
            self.schedule();
        } else {
            self.log.log(&format!("Process terminated: {}", process));
            tracing::debug!(%pid, "process terminated");
        }

        Ok(process)
    }

    /// Move the running process to the blocked set
    pub fn block_process(&mut self, pid: Pid) -> Result<(), SchedulerError> {
        if self.running != Some(pid) {
            return Err(SchedulerError::NotRunning(pid));
        }
        let process = self.process_mut(pid).ok_or(SchedulerError::NotRunning(pid))?;
        process.state = ProcessState::Blocked;
        let entry = format!("Process blocked: {}", process);

        self.running = None;
        self.blocked.push(pid);
        self.log.log(&entry);
        tracing::debug!(%pid, "process blocked");

        self.schedule();
        Ok(())
    }

    /// Move a blocked process back to the tail of the ready queue
    pub fn unblock_process(&mut self, pid: Pid) -> Result<(), SchedulerError> {
        let pos = self
            .blocked
            .iter()
            .position(|p| *p == pid)
            .ok_or(SchedulerError::NotBlocked(pid))?;
        let process = self.process_mut(pid).ok_or(SchedulerError::NotBlocked(pid))?;
        process.state = ProcessState::Ready;
        let entry = format!("Process unblocked: {}", process);

        self.blocked.remove(pos);
        self.ready.push_back(pid);
        self.log.log(&entry);
        tracing::debug!(%pid, "process unblocked");

        self.schedule();
        Ok(())
    }

    /// Fill the running slot if it is empty
    ///
    /// Re-sorts the ready queue by priority, highest first and stable among
    /// equals, then runs its head. Returns the pid that was scheduled, if
    /// any. Calling this with the slot occupied or the queue empty changes
    /// nothing.
    pub fn schedule(&mut self) -> Option<Pid> {
        if self.running.is_some() || self.ready.is_empty() {
            return None;
        }

        let mut ready: Vec<Pid> = self.ready.drain(..).collect();
        ready.sort_by_key(|pid| Reverse(self.process(*pid).map(|p| p.priority)));
        self.ready = ready.into();

        let pid = self.ready.pop_front()?;
        let process = self.process_mut(pid)?;
        process.state = ProcessState::Running;
        let entry = format!("Process scheduled: {}", process);

        self.running = Some(pid);
        self.log.log(&entry);
        tracing::debug!(%pid, "process scheduled");
        Some(pid)
    }

    /// Snapshot of {running, ready queue, blocked set}
    pub fn list_processes(&self) -> ProcessListing {
        ProcessListing {
            running: self.running.and_then(|pid| self.process(pid).cloned()),
            ready: self.snapshot(self.ready.iter()),
            blocked: self.snapshot(self.blocked.iter()),
        }
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.process(pid)
    }

    /// The process in the running slot
    pub fn running(&self) -> Option<&Process> {
        self.running.and_then(|pid| self.process(pid))
    }

    /// Ready queue pids in order
    pub fn ready_queue(&self) -> Vec<Pid> {
        self.ready.iter().copied().collect()
    }

    /// Blocked set pids in blocking order
    pub fn blocked_set(&self) -> Vec<Pid> {
        self.blocked.clone()
    }

    /// All live pids, ascending
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.index.keys().copied().collect();
        pids.sort();
        pids
    }

    /// Number of live processes
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn snapshot<'a>(&self, pids: impl Iterator<Item = &'a Pid>) -> Vec<Process> {
        pids.filter_map(|pid| self.process(*pid).cloned()).collect()
    }

    fn process(&self, pid: Pid) -> Option<&Process> {
        self.index.get(&pid).and_then(|slot| self.table.get(*slot))
    }

    fn process_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        let slot = *self.index.get(&pid)?;
        self.table.get_mut(slot)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(NullLog))
    }
}
