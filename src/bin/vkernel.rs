//! vkernel CLI - interactive kernel shell
//!
//! # Usage
//!
//! ```bash
//! # Interactive shell with the default 1024MB / 128MB-page layout
//! vkernel
//!
//! # Custom layout, audit log elsewhere, debug diagnostics
//! vkernel --memory 512 --page-size 64 --log-file /tmp/audit.log -vv
//!
//! # Run commands without a prompt
//! vkernel --no-log -c "create_process init" -c list_processes
//! ```

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vkernel::KernelConfig;
use vkernel::kernel::Kernel;
use vkernel::shell::{self, Executor};

/// vkernel - a teaching kernel simulator
#[derive(Parser)]
#[command(name = "vkernel")]
#[command(version)]
#[command(about = "Process scheduler, paged memory, and IPC simulator", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Audit log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable the audit log file
    #[arg(long, conflicts_with = "log_file")]
    no_log: bool,

    /// Total simulated memory in MB
    #[arg(long)]
    memory: Option<u32>,

    /// Page size in MB
    #[arg(long)]
    page_size: Option<u32>,

    /// Machine-readable output for listing commands
    #[arg(long)]
    json: bool,

    /// Run a command and exit instead of starting the prompt (repeatable)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,
}

impl Cli {
    /// File values first, then flags on top
    fn kernel_config(&self) -> Result<KernelConfig, vkernel::config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => KernelConfig::load(path)?,
            None => KernelConfig::default(),
        };
        if let Some(memory) = self.memory {
            config.total_memory_mb = memory;
        }
        if let Some(page_size) = self.page_size {
            config.page_size_mb = page_size;
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
        if self.no_log {
            config.log_file = None;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never interleave with command output
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let config = match cli.kernel_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vkernel: {}", e);
            return ExitCode::from(2);
        }
    };

    let kernel = match Kernel::from_config(&config) {
        Ok(kernel) => Arc::new(kernel),
        Err(e) => {
            eprintln!("vkernel: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(log_file = ?config.log_file, "audit log configured");

    let mut executor = Executor::new(kernel).with_json(cli.json);

    if !cli.commands.is_empty() {
        return run_batch(&mut executor, &cli.commands);
    }
    run_repl(&mut executor)
}

/// Run each `-c` command in order; the exit code is the last command's
fn run_batch(executor: &mut Executor, commands: &[String]) -> ExitCode {
    let mut status = 0;
    for line in commands {
        let result = executor.execute_line(line);
        print!("{}", result.output);
        eprint!("{}", result.error);
        status = result.code;
        if result.should_exit {
            break;
        }
    }
    ExitCode::from(status.clamp(0, 255) as u8)
}

fn run_repl(executor: &mut Executor) -> ExitCode {
    println!("vkernel v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for available commands or 'exit' to quit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("$ ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                // EOF ends the session like `exit`
                println!();
                executor.execute_line("exit");
                break;
            }
            Ok(_) => {
                let result = executor.execute_line(&line);
                print!("{}", shell::render(&result));
                if result.should_exit {
                    break;
                }
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
