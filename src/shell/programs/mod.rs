//! Shell programs
//!
//! Every program has the same shape: it receives the kernel and its
//! arguments, writes to `stdout`/`stderr`, and returns an exit code.
//! Arguments are validated here, at the boundary, so the kernel never sees
//! a malformed pid or size.

use crate::kernel::{Pid, PageId};
use serde::Serialize;

pub mod ipc;
pub mod memory;
pub mod process;

pub use ipc::*;
pub use memory::*;
pub use process::*;

/// Flag appended by the executor in JSON mode
pub const JSON_FLAG: &str = "--json";

// ============ Shared Utilities ============

/// Check if args contain -h or --help and return usage message if so
pub fn check_help(args: &[&str], usage: &str) -> Option<String> {
    if args.iter().any(|a| *a == "-h" || *a == "--help") {
        Some(usage.to_string())
    } else {
        None
    }
}

/// Convert String slice to &str slice for easier handling
pub fn args_to_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(|s| s.as_str()).collect()
}

/// Split off the JSON flag, wherever it appears
pub fn take_json_flag<'a>(args: &[&'a str]) -> (bool, Vec<&'a str>) {
    let json = args.contains(&JSON_FLAG);
    let rest = args.iter().copied().filter(|a| *a != JSON_FLAG).collect();
    (json, rest)
}

/// Parse a pid argument: a positive integer
pub fn parse_pid(arg: &str) -> Result<Pid, String> {
    match arg.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!("invalid pid: '{}'", arg)),
        Ok(n) => Ok(Pid(n)),
    }
}

/// Parse a size argument in MB: a positive integer
pub fn parse_size(arg: &str) -> Result<u32, String> {
    match arg.parse::<u32>() {
        Ok(0) | Err(_) => Err(format!("invalid size: '{}'", arg)),
        Ok(n) => Ok(n),
    }
}

/// Parse a page id argument: a non-negative integer
pub fn parse_page_id(arg: &str) -> Result<PageId, String> {
    arg.parse::<u32>()
        .map(PageId)
        .map_err(|_| format!("invalid page id: '{}'", arg))
}

/// Serialize `value` as pretty JSON onto `stdout`
pub fn write_json<T: Serialize>(value: &T, stdout: &mut String, stderr: &mut String) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            stdout.push_str(&json);
            stdout.push('\n');
            0
        }
        Err(e) => {
            stderr.push_str(&format!("json: {}\n", e));
            1
        }
    }
}

/// Write a usage line to `stderr` and return the usage exit code
pub fn usage_error(usage: &str, stderr: &mut String) -> i32 {
    stderr.push_str(usage);
    stderr.push('\n');
    2
}

/// Usage lines shown by `help`, grouped by category
pub const HELP_SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Process Management",
        &[
            (process::CREATE_USAGE, "Create new process (priority 0-2 or low/normal/high)"),
            (process::TERMINATE_USAGE, "Terminate process"),
            (process::LIST_USAGE, "Show all processes"),
            (process::BLOCK_USAGE, "Block the running process"),
            (process::UNBLOCK_USAGE, "Unblock a process"),
        ],
    ),
    (
        "Memory Management",
        &[
            (memory::ALLOCATE_USAGE, "Allocate memory (MB)"),
            (memory::FREE_USAGE, "Free memory (MB)"),
            (memory::DEFRAGMENT_USAGE, "Show memory fragmentation"),
            (memory::STATUS_USAGE, "Show every page"),
            (memory::PAGE_FAULT_USAGE, "Swap a page in from disk"),
            (memory::SWAP_STORE_USAGE, "Place a page image on disk"),
            (memory::PAGE_WRITE_USAGE, "Write data to an allocated page"),
            (memory::PAGE_READ_USAGE, "Read an allocated page"),
        ],
    ),
    (
        "IPC",
        &[
            (ipc::SEND_USAGE, "Send a message"),
            (ipc::RECEIVE_USAGE, "Drain a mailbox"),
            (ipc::SHM_WRITE_USAGE, "Write shared memory"),
            (ipc::SHM_READ_USAGE, "Read shared memory"),
            (ipc::SHM_LIST_USAGE, "List shared memory keys"),
        ],
    ),
    ("System", &[("exit", "Quit the shell"), ("help", "Show this help")]),
];

/// Render the help text
pub fn help_text() -> String {
    let mut out = String::from("Available commands:\n");
    for (section, commands) in HELP_SECTIONS {
        out.push_str(&format!("{}:\n", section));
        for (usage, about) in *commands {
            out.push_str(&format!("  {:<32} - {}\n", usage, about));
        }
    }
    out
}
