//! CLI validation tests for qctl-server.

use std::path::PathBuf;

use clap::Parser;
use qctl_core::logging::level_for;
use qctl_server::cli::{Cli, CliLogFormat};

#[test]
fn test_defaults_resolve_to_builtin_config() {
    let cli = Cli::try_parse_from(["qctl-server"]).unwrap();
    assert_eq!(cli.quantum, 4000);
    assert_eq!(cli.socket_mode, 0o666);
    assert_eq!(cli.log_format, CliLogFormat::Text);
    assert_eq!(level_for(cli.log_verbosity()), "info");

    let config = cli.to_config();
    assert_eq!(config.initial_quantum, 4000);
    assert_eq!(config.socket_mode, 0o666);
}

#[test]
fn test_socket_flag_overrides_default_path() {
    let cli = Cli::try_parse_from(["qctl-server", "--socket", "/tmp/x/control.sock"]).unwrap();
    assert_eq!(
        cli.to_config().socket_path,
        PathBuf::from("/tmp/x/control.sock")
    );
}

#[test]
fn test_negative_initial_quantum_is_accepted() {
    let cli = Cli::try_parse_from(["qctl-server", "--quantum", "-5"]).unwrap();
    assert_eq!(cli.to_config().initial_quantum, -5);
}

#[test]
fn test_non_numeric_quantum_fails() {
    assert!(Cli::try_parse_from(["qctl-server", "--quantum", "lots"]).is_err());
}

#[test]
fn test_socket_mode_is_octal() {
    let cli = Cli::try_parse_from(["qctl-server", "--socket-mode", "600"]).unwrap();
    assert_eq!(cli.socket_mode, 0o600);

    assert!(Cli::try_parse_from(["qctl-server", "--socket-mode", "999"]).is_err());
}
