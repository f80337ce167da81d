//! The kernel - scheduling, paged memory, and IPC
//!
//! The three components are independent: none calls another. `Kernel`
//! owns one of each behind its own lock, so every public operation is a
//! single critical section and concurrent callers never interleave inside
//! a queue change and its scheduling pass.
//!
//! There is no global kernel. Build one at startup and pass it by
//! reference (or `Arc`) to every caller.

pub mod ipc;
pub mod logger;
pub mod memory;
pub mod process;
pub mod scheduler;


pub use ipc::{Ipc, Message};
pub use logger::{EventLog, FileLog, MemoryLog, NullLog, SharedLog};
pub use memory::{DefragReport, MemoryError, MemoryManager, MemoryStats, Page, PageId};
pub use process::{Pid, Priority, Process, ProcessState};
pub use scheduler::{ProcessListing, Scheduler, SchedulerError};

use crate::config::{ConfigError, KernelConfig};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use thiserror::Error;

/// Kernel construction errors
#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("cannot open audit log: {0}")]
    Log(#[from] std::io::Error),
}

/// The kernel manages all system state
pub struct Kernel {
    scheduler: Mutex<Scheduler>,
    memory: Mutex<MemoryManager>,
    ipc: Mutex<Ipc>,
    log: SharedLog,
}

impl Kernel {
    /// Build a kernel with an explicit audit sink
    pub fn new(config: &KernelConfig, log: SharedLog) -> Result<Self, KernelError> {
        config.validate()?;
        let memory = MemoryManager::new(config.total_memory_mb, config.page_size_mb, log.clone())?;
        tracing::info!(
            total_memory_mb = config.total_memory_mb,
            page_size_mb = config.page_size_mb,
            pages = memory.page_count(),
            "kernel initialized"
        );
        Ok(Self {
            scheduler: Mutex::new(Scheduler::new(log.clone())),
            memory: Mutex::new(memory),
            ipc: Mutex::new(Ipc::new(log.clone())),
            log,
        })
    }

    /// Build a kernel whose audit sink follows `config.log_file`
    pub fn from_config(config: &KernelConfig) -> Result<Self, KernelError> {
        let log: SharedLog = match &config.log_file {
            Some(path) => Arc::new(FileLog::open(path)?),
            None => Arc::new(NullLog),
        };
        Self::new(config, log)
    }

    /// The audit sink shared by all components
    pub fn log(&self) -> &SharedLog {
        &self.log
    }

    /// Lock the scheduler for a multi-step inspection
    pub fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock()
    }

    pub fn memory(&self) -> MutexGuard<'_, MemoryManager> {
        self.memory.lock()
    }

    pub fn ipc(&self) -> MutexGuard<'_, Ipc> {
        self.ipc.lock()
    }

    // ========== PROCESSES ==========

    pub fn create_process(&self, name: &str, priority: Priority, parent: Option<Pid>) -> Pid {
        self.scheduler.lock().create_process(name, priority, parent)
    }

    pub fn terminate_process(&self, pid: Pid) -> Result<Process, SchedulerError> {
        self.scheduler.lock().terminate_process(pid)
    }

    pub fn block_process(&self, pid: Pid) -> Result<(), SchedulerError> {
        self.scheduler.lock().block_process(pid)
    }

    pub fn unblock_process(&self, pid: Pid) -> Result<(), SchedulerError> {
        self.scheduler.lock().unblock_process(pid)
    }

    pub fn list_processes(&self) -> ProcessListing {
        self.scheduler.lock().list_processes()
    }

    // ========== MEMORY ==========

    pub fn allocate(&self, size_mb: u32) -> Result<Vec<PageId>, MemoryError> {
        self.memory.lock().allocate(size_mb)
    }

    pub fn free(&self, size_mb: u32) -> Result<Vec<PageId>, MemoryError> {
        self.memory.lock().free(size_mb)
    }

    pub fn handle_page_fault(&self, page_id: PageId) -> bool {
        self.memory.lock().handle_page_fault(page_id)
    }

    pub fn defragment(&self) -> DefragReport {
        self.memory.lock().defragment()
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.memory.lock().stats()
    }

    // ========== IPC ==========

    pub fn send(&self, sender: Pid, receiver: Pid, body: &str) {
        self.ipc.lock().send(sender, receiver, body)
    }

    pub fn receive(&self, receiver: Pid) -> Vec<Message> {
        self.ipc.lock().receive(receiver)
    }

    pub fn shared_memory_write(&self, key: &str, value: &str) {
        self.ipc.lock().shared_memory_write(key, value)
    }

    pub fn shared_memory_read(&self, key: &str) -> Option<String> {
        self.ipc.lock().shared_memory_read(key).map(str::to_string)
    }

    pub fn shared_memory_list(&self) -> Vec<String> {
        self.ipc.lock().shared_memory_list()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        let log: SharedLog = Arc::new(NullLog);
        Self {
            scheduler: Mutex::new(Scheduler::new(log.clone())),
            memory: Mutex::new(MemoryManager::default()),
            ipc: Mutex::new(Ipc::new(log.clone())),
            log,
        }
    }
}
