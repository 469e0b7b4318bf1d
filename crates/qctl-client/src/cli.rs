//! Client CLI implementation.
//!
//! The verb and its argument are positional, the way operators have always
//! typed them (`qctl T 5`). clap handles the options around them; the verb
//! itself is checked by [`Cli::action`].

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use thiserror::Error;

use qctl_control::default_socket_path;
use qctl_core::constants::CLIENT_ARG_RANGE;

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

/// qctl - issue control verbs to a qctl endpoint.
#[derive(Debug, Parser)]
#[command(
    name = "qctl",
    version,
    about = "qctl - issue control verbs to a qctl endpoint",
    after_help = VERB_HELP
)]
pub struct Cli {
    /// Control socket path (default: $XDG_RUNTIME_DIR/qctl/control.sock)
    #[arg(short = 's', long = "socket", value_name = "PATH", env = "QCTL_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text")]
    pub log_format: CliLogFormat,

    /// Verb to run (see below)
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,

    /// Integer argument of the verb
    #[arg(value_name = "INT", allow_hyphen_values = true)]
    pub value: Option<String>,
}

const VERB_HELP: &str = "\
Commands:
  R          Reset quantum
  S <int>    Set quantum
  T <int>    Tell quantum
  G          Get quantum
  Q          Query quantum
  X <int>    Exchange quantum
  H <int>    Shift quantum
  h          Print this message
  K          Runs 1 step of K case
  p <int>    Runs the K case <int> times
  t <int>    Runs <int> threads of the K case";

/// Usage text printed for `h` and for invalid invocations.
pub fn usage(program: &str) -> String {
    format!("Usage: {} <command>\n{}\n", program, VERB_HELP)
}

/// A single verb sent over one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Reset,
    Set(i32),
    Tell(i32),
    Get,
    Query,
    Exchange(i32),
    Shift(i32),
    Register,
}

/// What one invocation of the client does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Call(Call),
    /// `p <n>`: n processes, one `Register` each.
    Processes(usize),
    /// `t <n>`: n threads, one `Register` each.
    Threads(usize),
    Help,
}

/// Why a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Invalid number of arguments")]
    MissingCommand,

    #[error("Invalid command '{0}'")]
    InvalidCommand(String),

    #[error("Missing quantum")]
    MissingValue,

    #[error("'{0}' is not an integer")]
    NotAnInteger(String),

    #[error("{what} {value} not between {} and {}", CLIENT_ARG_RANGE.start(), CLIENT_ARG_RANGE.end())]
    OutOfRange { what: &'static str, value: i64 },
}

impl Cli {
    /// Socket to connect to: `--socket`/`QCTL_SOCKET`, else the default path.
    pub fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(default_socket_path)
    }

    /// Validate the positional verb and its argument.
    ///
    /// Only the first character of the verb is significant.
    pub fn action(&self) -> Result<Action, UsageError> {
        let command = self.command.as_deref().ok_or(UsageError::MissingCommand)?;
        let verb = command
            .chars()
            .next()
            .ok_or_else(|| UsageError::InvalidCommand(command.to_string()))?;

        let action = match verb {
            'R' => Action::Call(Call::Reset),
            'G' => Action::Call(Call::Get),
            'Q' => Action::Call(Call::Query),
            'K' => Action::Call(Call::Register),
            'h' => Action::Help,
            'S' => Action::Call(Call::Set(self.bounded("quantum")? as i32)),
            'T' => Action::Call(Call::Tell(self.bounded("quantum")? as i32)),
            'H' => Action::Call(Call::Shift(self.bounded("quantum")? as i32)),
            'p' => Action::Processes(self.bounded("num_processes")? as usize),
            't' => Action::Threads(self.bounded("num_threads")? as usize),
            'X' => {
                let value = self.integer()?;
                let value = i32::try_from(value)
                    .map_err(|_| UsageError::NotAnInteger(value.to_string()))?;
                Action::Call(Call::Exchange(value))
            }
            _ => return Err(UsageError::InvalidCommand(command.to_string())),
        };

        Ok(action)
    }

    fn integer(&self) -> Result<i64, UsageError> {
        let raw = self.value.as_deref().ok_or(UsageError::MissingValue)?;
        raw.trim()
            .parse()
            .map_err(|_| UsageError::NotAnInteger(raw.to_string()))
    }

    fn bounded(&self, what: &'static str) -> Result<i64, UsageError> {
        let value = self.integer()?;
        if !CLIENT_ARG_RANGE.contains(&value) {
            return Err(UsageError::OutOfRange { what, value });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn action(args: &[&str]) -> Result<Action, UsageError> {
        let mut argv = vec!["qctl"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().action()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbs_without_argument() {
        assert_eq!(action(&["R"]), Ok(Action::Call(Call::Reset)));
        assert_eq!(action(&["G"]), Ok(Action::Call(Call::Get)));
        assert_eq!(action(&["Q"]), Ok(Action::Call(Call::Query)));
        assert_eq!(action(&["K"]), Ok(Action::Call(Call::Register)));
        assert_eq!(action(&["h"]), Ok(Action::Help));
    }

    #[test]
    fn only_first_character_counts() {
        assert_eq!(action(&["Reset"]), Ok(Action::Call(Call::Reset)));
    }

    #[test]
    fn bounded_verbs() {
        assert_eq!(action(&["S", "3"]), Ok(Action::Call(Call::Set(3))));
        assert_eq!(action(&["T", "10"]), Ok(Action::Call(Call::Tell(10))));
        assert_eq!(action(&["H", "1"]), Ok(Action::Call(Call::Shift(1))));
        assert_eq!(action(&["p", "10"]), Ok(Action::Processes(10)));
        assert_eq!(action(&["t", "4"]), Ok(Action::Threads(4)));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(
            action(&["T", "11"]),
            Err(UsageError::OutOfRange {
                what: "quantum",
                value: 11
            })
        );
        assert!(matches!(action(&["p", "0"]), Err(UsageError::OutOfRange { .. })));
        assert!(matches!(action(&["t", "-2"]), Err(UsageError::OutOfRange { .. })));
    }

    #[test]
    fn exchange_takes_any_int() {
        assert_eq!(action(&["X", "-7"]), Ok(Action::Call(Call::Exchange(-7))));
        assert_eq!(action(&["X", "4000"]), Ok(Action::Call(Call::Exchange(4000))));
        assert!(matches!(
            action(&["X", "99999999999"]),
            Err(UsageError::NotAnInteger(_))
        ));
    }

    #[test]
    fn missing_or_bad_values() {
        assert_eq!(action(&["S"]), Err(UsageError::MissingValue));
        assert_eq!(action(&["X"]), Err(UsageError::MissingValue));
        assert!(matches!(action(&["S", "five"]), Err(UsageError::NotAnInteger(_))));
    }

    #[test]
    fn unknown_or_missing_verb() {
        assert_eq!(action(&[]), Err(UsageError::MissingCommand));
        assert!(matches!(action(&["Z"]), Err(UsageError::InvalidCommand(_))));
        assert!(matches!(action(&["r"]), Err(UsageError::InvalidCommand(_))));
    }

    #[test]
    fn usage_lists_every_verb() {
        let text = usage("qctl");
        assert!(text.starts_with("Usage: qctl <command>"));
        for verb in ["R ", "S <int>", "T <int>", "G ", "Q ", "X <int>", "H <int>", "h ", "K ", "p <int>", "t <int>"] {
            assert!(text.contains(&format!("  {}", verb)), "missing {verb}");
        }
    }
}
