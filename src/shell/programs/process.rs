//! Process management programs

use super::{args_to_strs, check_help, parse_pid, take_json_flag, usage_error, write_json};
use crate::kernel::{Kernel, Pid, Priority, SchedulerError};

pub const CREATE_USAGE: &str = "create_process <name> [priority]";
pub const TERMINATE_USAGE: &str = "terminate_process <pid>";
pub const LIST_USAGE: &str = "list_processes";
pub const BLOCK_USAGE: &str = "block_process <pid>";
pub const UNBLOCK_USAGE: &str = "unblock_process <pid>";

pub fn prog_create_process(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", CREATE_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let (name, priority) = match args.as_slice() {
        [name] => (*name, Priority::default()),
        [name, priority] => match priority.parse::<Priority>() {
            Ok(p) => (*name, p),
            Err(e) => {
                stderr.push_str(&format!("{}\n", e));
                return usage_error(&format!("Usage: {}", CREATE_USAGE), stderr);
            }
        },
        _ => return usage_error(&format!("Usage: {}", CREATE_USAGE), stderr),
    };

    let pid = kernel.create_process(name, priority, None);
    stdout.push_str(&format!("Process '{}' created with PID {}\n", name, pid));
    0
}

pub fn prog_terminate_process(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    with_pid(args, TERMINATE_USAGE, stdout, stderr, |pid, stdout| {
        let process = kernel.terminate_process(pid)?;
        stdout.push_str(&format!("Process {} ({}) terminated.\n", pid, process.name));
        Ok(())
    })
}

pub fn prog_block_process(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    with_pid(args, BLOCK_USAGE, stdout, stderr, |pid, stdout| {
        kernel.block_process(pid)?;
        stdout.push_str(&format!("Process {} blocked.\n", pid));
        Ok(())
    })
}

pub fn prog_unblock_process(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    with_pid(args, UNBLOCK_USAGE, stdout, stderr, |pid, stdout| {
        kernel.unblock_process(pid)?;
        stdout.push_str(&format!("Process {} unblocked.\n", pid));
        Ok(())
    })
}

pub fn prog_list_processes(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {} [--json]", LIST_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let (json, rest) = take_json_flag(&args);
    if !rest.is_empty() {
        return usage_error(&format!("Usage: {} [--json]", LIST_USAGE), stderr);
    }

    let listing = kernel.list_processes();
    if json {
        return write_json(&listing, stdout, stderr);
    }

    if listing.is_empty() {
        stdout.push_str("No processes.\n");
        return 0;
    }

    match &listing.running {
        Some(p) => stdout.push_str(&format!("Running: {}\n", p)),
        None => stdout.push_str("Running: (none)\n"),
    }
    stdout.push_str("Ready Queue:\n");
    for p in &listing.ready {
        stdout.push_str(&format!("  {}\n", p));
    }
    stdout.push_str("Blocked Processes:\n");
    for p in &listing.blocked {
        stdout.push_str(&format!("  {}\n", p));
    }
    0
}

/// Shared shape of the single-pid commands
fn with_pid(
    args: &[String],
    usage: &str,
    stdout: &mut String,
    stderr: &mut String,
    op: impl FnOnce(Pid, &mut String) -> Result<(), SchedulerError>,
) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", usage)) {
        stdout.push_str(&help);
        return 0;
    }

    let [arg] = args.as_slice() else {
        return usage_error(&format!("Usage: {}", usage), stderr);
    };
    let pid = match parse_pid(arg) {
        Ok(pid) => pid,
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            return usage_error(&format!("Usage: {}", usage), stderr);
        }
    };

    match op(pid, stdout) {
        Ok(()) => 0,
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(prog: crate::shell::executor::ProgramFn, kernel: &Kernel, args: &[&str]) -> (i32, String, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = String::new();
        let mut err = String::new();
        let code = prog(kernel, &args, &mut out, &mut err);
        (code, out, err)
    }

    #[test]
    fn test_create_default_priority() {
        let kernel = Kernel::default();
        let (code, out, _) = run(prog_create_process, &kernel, &["init"]);
        assert_eq!(code, 0);
        assert_eq!(out, "Process 'init' created with PID 1\n");
        assert_eq!(kernel.scheduler().get(Pid(1)).unwrap().priority, Priority::Low);
    }

    #[test]
    fn test_create_with_named_priority() {
        let kernel = Kernel::default();
        run(prog_create_process, &kernel, &["a"]);
        let (code, _, _) = run(prog_create_process, &kernel, &["b", "high"]);
        assert_eq!(code, 0);
        assert_eq!(kernel.scheduler().get(Pid(2)).unwrap().priority, Priority::High);
    }

    #[test]
    fn test_create_rejects_bad_priority() {
        let kernel = Kernel::default();
        let (code, _, err) = run(prog_create_process, &kernel, &["a", "9"]);
        assert_eq!(code, 2);
        assert!(err.contains("invalid priority"));
        assert!(kernel.scheduler().is_empty());
    }

    #[test]
    fn test_create_requires_name() {
        let kernel = Kernel::default();
        let (code, _, err) = run(prog_create_process, &kernel, &[]);
        assert_eq!(code, 2);
        assert!(err.starts_with("Usage:"));
    }

    #[test]
    fn test_terminate_unknown_pid() {
        let kernel = Kernel::default();
        let (code, _, err) = run(prog_terminate_process, &kernel, &["4"]);
        assert_eq!(code, 1);
        assert_eq!(err, "Process with PID 4 not found.\n");
    }

    #[test]
    fn test_pid_validated_at_boundary() {
        let kernel = Kernel::default();
        for bad in ["0", "-3", "abc"] {
            let (code, _, err) = run(prog_block_process, &kernel, &[bad]);
            assert_eq!(code, 2);
            assert!(err.contains("invalid pid"));
        }
    }

    #[test]
    fn test_block_and_unblock() {
        let kernel = Kernel::default();
        run(prog_create_process, &kernel, &["a"]);

        let (code, out, _) = run(prog_block_process, &kernel, &["1"]);
        assert_eq!(code, 0);
        assert_eq!(out, "Process 1 blocked.\n");

        let (code, out, _) = run(prog_unblock_process, &kernel, &["1"]);
        assert_eq!(code, 0);
        assert_eq!(out, "Process 1 unblocked.\n");
        assert!(kernel.scheduler().running().is_some());
    }

    #[test]
    fn test_list_text() {
        let kernel = Kernel::default();
        let (_, out, _) = run(prog_list_processes, &kernel, &[]);
        assert_eq!(out, "No processes.\n");

        run(prog_create_process, &kernel, &["a"]);
        run(prog_create_process, &kernel, &["b", "1"]);
        let (code, out, _) = run(prog_list_processes, &kernel, &[]);
        assert_eq!(code, 0);
        assert!(out.contains("Running: PID: 1, Name: a, Priority: 0, State: Running"));
        assert!(out.contains("  PID: 2, Name: b, Priority: 1, State: Ready"));
    }

    #[test]
    fn test_list_json() {
        let kernel = Kernel::default();
        run(prog_create_process, &kernel, &["a"]);
        let (code, out, _) = run(prog_list_processes, &kernel, &["--json"]);
        assert_eq!(code, 0);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["running"]["pid"], 1);
        assert_eq!(value["ready"].as_array().unwrap().len(), 0);
    }
}
