//! vkernel - A teaching kernel simulator
//!
//! Design principles:
//! - Tractable: bounded complexity, comprehensible by one human
//! - Deterministic: no time-slicing, no preemption, a logical clock for LRU
//! - True ownership: the caller builds the kernel and passes it around
//!
//! Components:
//! - `kernel::scheduler`: priority scheduler over a process table
//! - `kernel::memory`: fixed page pool with LRU swap to a disk store
//! - `kernel::ipc`: per-process mailboxes and a shared key/value store
//! - `shell`: line-oriented command interpreter over a `Kernel`

pub mod config;
pub mod kernel;
pub mod shell;

pub use config::KernelConfig;
pub use kernel::Kernel;
