//! Shell - Command-line interpreter
//!
//! A line-oriented front end for the kernel. Features:
//! - Word splitting with single and double quotes
//! - Built-in `help` and `exit`
//! - Named programs for processes, memory, and IPC
//! - Optional JSON output for the listing commands

pub mod executor;
pub mod parser;
pub mod programs;

pub use executor::{ExecResult, Executor, ProgramFn, ProgramRegistry};
pub use parser::{parse, ParseError, SimpleCommand};

/// Combine a result's output and error into one display string
pub fn render(result: &ExecResult) -> String {
    let mut output = String::new();

    if !result.output.is_empty() {
        output.push_str(&result.output);
    }
    if !result.error.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&result.error);
    }

    output
}
