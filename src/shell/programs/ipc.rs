//! IPC (Inter-Process Communication) programs

use super::{args_to_strs, check_help, parse_pid, take_json_flag, usage_error, write_json};
use crate::kernel::Kernel;

pub const SEND_USAGE: &str = "send <from_pid> <to_pid> <message>";
pub const RECEIVE_USAGE: &str = "receive <pid>";
pub const SHM_WRITE_USAGE: &str = "shm_write <key> <value>";
pub const SHM_READ_USAGE: &str = "shm_read <key>";
pub const SHM_LIST_USAGE: &str = "shm_list";

pub fn prog_send(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", SEND_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let [from, to, body @ ..] = args.as_slice() else {
        return usage_error(&format!("Usage: {}", SEND_USAGE), stderr);
    };
    if body.is_empty() {
        return usage_error(&format!("Usage: {}", SEND_USAGE), stderr);
    }
    let (sender, receiver) = match (parse_pid(from), parse_pid(to)) {
        (Ok(s), Ok(r)) => (s, r),
        (Err(e), _) | (_, Err(e)) => {
            stderr.push_str(&format!("{}\n", e));
            return usage_error(&format!("Usage: {}", SEND_USAGE), stderr);
        }
    };

    kernel.send(sender, receiver, &body.join(" "));
    stdout.push_str(&format!("Message sent from {} to {}.\n", sender, receiver));
    0
}

pub fn prog_receive(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {} [--json]", RECEIVE_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let (json, rest) = take_json_flag(&args);
    let [arg] = rest.as_slice() else {
        return usage_error(&format!("Usage: {} [--json]", RECEIVE_USAGE), stderr);
    };
    let pid = match parse_pid(arg) {
        Ok(pid) => pid,
        Err(e) => {
            stderr.push_str(&format!("{}\n", e));
            return usage_error(&format!("Usage: {} [--json]", RECEIVE_USAGE), stderr);
        }
    };

    let messages = kernel.receive(pid);
    if json {
        return write_json(&messages, stdout, stderr);
    }

    if messages.is_empty() {
        stdout.push_str(&format!("No messages for {}.\n", pid));
    }
    for m in &messages {
        stdout.push_str(&format!("From {}: {}\n", m.sender, m.body));
    }
    0
}

pub fn prog_shm_write(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", SHM_WRITE_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let [key, value @ ..] = args.as_slice() else {
        return usage_error(&format!("Usage: {}", SHM_WRITE_USAGE), stderr);
    };
    if value.is_empty() {
        return usage_error(&format!("Usage: {}", SHM_WRITE_USAGE), stderr);
    }

    kernel.shared_memory_write(key, &value.join(" "));
    stdout.push_str(&format!("Shared memory '{}' updated.\n", key));
    0
}

pub fn prog_shm_read(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {}", SHM_READ_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let [key] = args.as_slice() else {
        return usage_error(&format!("Usage: {}", SHM_READ_USAGE), stderr);
    };

    match kernel.shared_memory_read(key) {
        Some(value) => {
            stdout.push_str(&value);
            stdout.push('\n');
            0
        }
        // An unwritten key is an answer, not a failure
        None => {
            stdout.push_str(&format!("Key '{}' not found.\n", key));
            0
        }
    }
}

pub fn prog_shm_list(kernel: &Kernel, args: &[String], stdout: &mut String, stderr: &mut String) -> i32 {
    let args = args_to_strs(args);

    if let Some(help) = check_help(&args, &format!("Usage: {} [--json]", SHM_LIST_USAGE)) {
        stdout.push_str(&help);
        return 0;
    }

    let (json, rest) = take_json_flag(&args);
    if !rest.is_empty() {
        return usage_error(&format!("Usage: {} [--json]", SHM_LIST_USAGE), stderr);
    }

    let keys = kernel.shared_memory_list();
    if json {
        return write_json(&keys, stdout, stderr);
    }
    for key in keys {
        stdout.push_str(&key);
        stdout.push('\n');
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Message, Pid};

    fn run(prog: crate::shell::executor::ProgramFn, kernel: &Kernel, args: &[&str]) -> (i32, String, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = String::new();
        let mut err = String::new();
        let code = prog(kernel, &args, &mut out, &mut err);
        (code, out, err)
    }

    #[test]
    fn test_send_joins_words() {
        let kernel = Kernel::default();
        let (code, out, _) = run(prog_send, &kernel, &["1", "2", "hello", "there"]);
        assert_eq!(code, 0);
        assert_eq!(out, "Message sent from 1 to 2.\n");
        assert_eq!(kernel.receive(Pid(2)), vec![Message::new(Pid(1), "hello there")]);
    }

    #[test]
    fn test_send_validates_pids() {
        let kernel = Kernel::default();
        let (code, _, err) = run(prog_send, &kernel, &["1", "zero", "hi"]);
        assert_eq!(code, 2);
        assert!(err.contains("invalid pid: 'zero'"));
        assert!(kernel.receive(Pid(1)).is_empty());
    }

    #[test]
    fn test_send_requires_body() {
        let kernel = Kernel::default();
        let (code, _, _) = run(prog_send, &kernel, &["1", "2"]);
        assert_eq!(code, 2);
    }

    #[test]
    fn test_receive_text() {
        let kernel = Kernel::default();
        run(prog_send, &kernel, &["1", "3", "a"]);
        run(prog_send, &kernel, &["2", "3", "b"]);

        let (code, out, _) = run(prog_receive, &kernel, &["3"]);
        assert_eq!(code, 0);
        assert_eq!(out, "From 1: a\nFrom 2: b\n");

        let (_, out, _) = run(prog_receive, &kernel, &["3"]);
        assert_eq!(out, "No messages for 3.\n");
    }

    #[test]
    fn test_receive_json() {
        let kernel = Kernel::default();
        run(prog_send, &kernel, &["1", "3", "a"]);
        let (code, out, _) = run(prog_receive, &kernel, &["--json", "3"]);
        assert_eq!(code, 0);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["sender"], 1);
        assert_eq!(value[0]["body"], "a");
    }

    #[test]
    fn test_shm_round_trip() {
        let kernel = Kernel::default();
        let (code, _, _) = run(prog_shm_write, &kernel, &["greeting", "hi", "all"]);
        assert_eq!(code, 0);

        let (code, out, _) = run(prog_shm_read, &kernel, &["greeting"]);
        assert_eq!(code, 0);
        assert_eq!(out, "hi all\n");
    }

    #[test]
    fn test_shm_read_missing() {
        let kernel = Kernel::default();
        let (code, out, err) = run(prog_shm_read, &kernel, &["nope"]);
        assert_eq!(code, 0);
        assert_eq!(out, "Key 'nope' not found.\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_shm_list() {
        let kernel = Kernel::default();
        run(prog_shm_write, &kernel, &["b", "2"]);
        run(prog_shm_write, &kernel, &["a", "1"]);

        let (_, out, _) = run(prog_shm_list, &kernel, &[]);
        assert_eq!(out, "a\nb\n");

        let (_, out, _) = run(prog_shm_list, &kernel, &["--json"]);
        let keys: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
