mod commands;

use burrow_driver::{InstanceDriver, InstanceLayout, InterruptToken};
use clap::{Parser, Subcommand};
use commands::EXIT_FAILURE;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "burrow",
    version,
    about = "QEMU virtual machine instance lifecycle driver"
)]
struct Cli {
    /// Persistent instance data root (disk images, firmware, pid files).
    #[arg(long, default_value = "~/.local/share/burrow")]
    data_root: String,

    /// Volatile runtime root (monitor and serial sockets).
    #[arg(long, default_value = "/tmp/burrow")]
    runtime_root: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Clone a base image into a new instance and print its id.
    Import {
        /// Path to the launch config TOML file.
        config: PathBuf,
    },
    /// Start an instance (no-op when already running).
    Start {
        /// Instance id returned by import.
        id: String,
        /// Path to the launch config TOML file.
        config: PathBuf,
    },
    /// Request a graceful shutdown over the monitor channel.
    Stop {
        /// Instance id.
        id: String,
        /// Path to the launch config TOML file.
        config: PathBuf,
    },
    /// Remove an instance's data and runtime directories.
    Delete {
        /// Instance id.
        id: String,
    },
    /// Report the instance state (not_created, stopped, running).
    Status {
        /// Instance id.
        id: String,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BURROW_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    // Ctrl-c raises the driver's interrupt token: a foreground command
    // killed under the user's finger is a benign abort, not a failure.
    let interrupt = InterruptToken::new();
    {
        let interrupt = interrupt.clone();
        let _ = ctrlc::set_handler(move || {
            if interrupt.is_raised() {
                std::process::exit(1);
            }
            interrupt.raise();
            eprintln!("\ninterrupt requested, finishing current operation...");
        });
    }

    let layout = InstanceLayout::new(
        expand_tilde(&cli.data_root),
        expand_tilde(&cli.runtime_root),
    );
    tracing::debug!(
        "data root: {}, runtime root: {}",
        layout.data_root().display(),
        layout.runtime_root().display()
    );
    let driver = InstanceDriver::new(layout, interrupt);
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Import { config } => commands::import::run(&driver, &config, json_output),
        Commands::Start { id, config } => commands::start::run(&driver, &id, &config),
        Commands::Stop { id, config } => commands::stop::run(&driver, &id, &config),
        Commands::Delete { id } => commands::delete::run(&driver, &id),
        Commands::Status { id } => commands::status::run(&driver, &id, json_output),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("launch config error:")
                || msg.starts_with("failed to parse launch config")
                || msg.starts_with("failed to read launch config")
            {
                commands::EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
