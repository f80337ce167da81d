//! Shell command executor
//!
//! Executes a command line by:
//! 1. Parsing it into a program and arguments
//! 2. Handling the built-ins (`help`, `exit`) directly
//! 3. Running everything else via the program registry against the kernel
//!
//! A failing program is recorded in the audit log with its error text.

use super::parser::{self, SimpleCommand};
use super::programs::{self, JSON_FLAG};
use crate::kernel::Kernel;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of executing a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Exit code (0 = success)
    pub code: i32,
    /// Output from the command
    pub output: String,
    /// Error output
    pub error: String,
    /// Should the shell exit?
    pub should_exit: bool,
}

impl ExecResult {
    pub fn success() -> Self {
        Self {
            code: 0,
            output: String::new(),
            error: String::new(),
            should_exit: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self.code = 1;
        self
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn exit(code: i32) -> Self {
        Self {
            code,
            output: String::new(),
            error: String::new(),
            should_exit: true,
        }
    }
}

/// A program that can be executed by the shell
pub type ProgramFn = fn(&Kernel, &[String], &mut String, &mut String) -> i32;

struct Program {
    func: ProgramFn,
    /// Accepts `--json`
    json: bool,
}

/// Registry of available programs
pub struct ProgramRegistry {
    programs: HashMap<String, Program>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            programs: HashMap::new(),
        };

        // Process management
        reg.register("create_process", programs::prog_create_process);
        reg.register("terminate_process", programs::prog_terminate_process);
        reg.register_json("list_processes", programs::prog_list_processes);
        reg.register("block_process", programs::prog_block_process);
        reg.register("unblock_process", programs::prog_unblock_process);

        // Memory management
        reg.register("allocate_memory", programs::prog_allocate_memory);
        reg.register("free_memory", programs::prog_free_memory);
        reg.register_json("defragment", programs::prog_defragment);
        reg.register_json("memory_status", programs::prog_memory_status);
        reg.register("page_fault", programs::prog_page_fault);
        reg.register("swap_store", programs::prog_swap_store);
        reg.register("page_write", programs::prog_page_write);
        reg.register("page_read", programs::prog_page_read);

        // IPC
        reg.register("send", programs::prog_send);
        reg.register_json("receive", programs::prog_receive);
        reg.register("shm_write", programs::prog_shm_write);
        reg.register("shm_read", programs::prog_shm_read);
        reg.register_json("shm_list", programs::prog_shm_list);

        reg
    }

    pub fn register(&mut self, name: &str, func: ProgramFn) {
        self.programs
            .insert(name.to_string(), Program { func, json: false });
    }

    /// Register a program that understands `--json`
    pub fn register_json(&mut self, name: &str, func: ProgramFn) {
        self.programs
            .insert(name.to_string(), Program { func, json: true });
    }

    pub fn get(&self, name: &str) -> Option<ProgramFn> {
        self.programs.get(name).map(|p| p.func)
    }

    pub fn accepts_json(&self, name: &str) -> bool {
        self.programs.get(name).is_some_and(|p| p.json)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.programs.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

impl Default for ProgramRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The shell executor
pub struct Executor {
    kernel: Arc<Kernel>,
    pub registry: ProgramRegistry,
    /// Machine-readable listings
    pub json: bool,
    /// Exit code of the last command
    pub last_status: i32,
}

impl Executor {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self {
            kernel,
            registry: ProgramRegistry::new(),
            json: false,
            last_status: 0,
        }
    }

    /// Emit JSON from every program that supports it
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Execute a command line string
    pub fn execute_line(&mut self, line: &str) -> ExecResult {
        // Skip empty lines and comments
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return ExecResult::success();
        }

        let cmd = match parser::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                let result = ExecResult::success().with_error(format!("parse error: {}", e));
                self.last_status = result.code;
                self.record_failure(line, &result.error);
                return result;
            }
        };

        tracing::trace!(program = %cmd.program, args = ?cmd.args, "executing");
        let result = self.execute(&cmd);
        self.last_status = result.code;

        if result.code != 0 && !result.error.is_empty() {
            self.record_failure(line, &result.error);
        }
        result
    }

    /// Execute a parsed command
    pub fn execute(&mut self, cmd: &SimpleCommand) -> ExecResult {
        match cmd.program.as_str() {
            "exit" => {
                self.kernel.log().log("Shell session ended");
                return ExecResult::exit(0).with_output("Exiting shell.\n");
            }
            "help" => return ExecResult::success().with_output(programs::help_text()),
            _ => {}
        }

        let Some(prog) = self.registry.get(&cmd.program) else {
            return ExecResult::success()
                .with_error(format!(
                    "Command not recognized: {}. Type 'help' for available commands.\n",
                    cmd.program
                ))
                .with_code(127);
        };

        let mut args = cmd.args.clone();
        if self.json && self.registry.accepts_json(&cmd.program) && !args.iter().any(|a| a == JSON_FLAG) {
            args.push(JSON_FLAG.to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let code = prog(&self.kernel, &args, &mut stdout, &mut stderr);

        ExecResult {
            code,
            output: stdout,
            error: stderr,
            should_exit: false,
        }
    }

    fn record_failure(&self, line: &str, error: &str) {
        tracing::debug!(line, error = error.trim_end(), "command failed");
        self.kernel
            .log()
            .log(&format!("Command failed: {} - Error: {}", line, error.trim_end()));
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(Arc::new(Kernel::default()))
    }
}
