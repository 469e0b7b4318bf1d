//! Server CLI implementation.
//!
//! Provides command-line argument parsing for the qctl endpoint.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use qctl_core::constants::DEFAULT_QUANTUM;

use crate::config::ServerConfig;

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for qctl_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => qctl_core::LogFormat::Text,
            CliLogFormat::Json => qctl_core::LogFormat::Json,
        }
    }
}

/// qctl server - control endpoint holding the quantum and the registration ledger.
#[derive(Debug, Parser)]
#[command(
    name = "qctl-server",
    version,
    about = "qctl server - control endpoint holding the quantum and the registration ledger"
)]
pub struct Cli {
    /// Control socket path (default: $XDG_RUNTIME_DIR/qctl/control.sock)
    #[arg(short = 's', long = "socket", value_name = "PATH", env = "QCTL_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Initial quantum (reset still restores the built-in default)
    #[arg(
        short = 'q',
        long = "quantum",
        default_value_t = DEFAULT_QUANTUM,
        allow_negative_numbers = true
    )]
    pub quantum: i32,

    /// Permission bits applied to the socket file, in octal
    #[arg(
        long = "socket-mode",
        value_parser = parse_octal_mode,
        default_value = "666",
        value_name = "OCTAL"
    )]
    pub socket_mode: u32,

    /// Increase verbosity beyond info (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text")]
    pub log_format: CliLogFormat,
}

/// The endpoint logs at info with no `-v`, so the shutdown drain is visible.
const BASE_VERBOSITY: u8 = 2;

impl Cli {
    /// Verbosity handed to [`qctl_core::init_logging`].
    pub fn log_verbosity(&self) -> u8 {
        self.verbose.saturating_add(BASE_VERBOSITY)
    }

    /// Resolve the arguments into the endpoint configuration.
    pub fn to_config(&self) -> ServerConfig {
        let mut config = ServerConfig {
            initial_quantum: self.quantum,
            socket_mode: self.socket_mode,
            ..ServerConfig::default()
        };
        if let Some(path) = &self.socket {
            config.socket_path = path.clone();
        }
        config
    }
}

fn parse_octal_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode =
        u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode: {}", e))?;
    if mode > 0o777 {
        return Err(format!("mode {:o} has bits outside 0777", mode));
    }
    Ok(mode)
}

// =============================================================================
// Tests
// =============================================================================
