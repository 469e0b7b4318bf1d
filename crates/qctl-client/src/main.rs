//! qctl client binary entry point.

use std::path::Path;

use clap::Parser;
use tracing::{error, info};

use qctl_client::{
    run_call, spawn_processes, spawn_threads, usage, Action, Call, Cli, HarnessError,
    HarnessReport,
};

const PROGRAM: &str = "qctl";

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = qctl_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let action = match cli.action() {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{}: {}", PROGRAM, e);
            eprint!("{}", usage(PROGRAM));
            std::process::exit(1);
        }
    };

    let socket = cli.socket_path();
    info!(?action, socket = %socket.display(), "qctl starting");

    // No runtime may exist before the process harness forks
    let code = match action {
        Action::Help => {
            print!("{}", usage(PROGRAM));
            0
        }
        Action::Processes(count) => finish_harness(spawn_processes(&socket, count)),
        Action::Threads(count) => finish_harness(spawn_threads(&socket, count)),
        Action::Call(call) => call_once(&socket, call),
    };

    std::process::exit(code);
}

fn call_once(socket: &Path, call: Call) -> i32 {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to create tokio runtime: {}", PROGRAM, e);
            return 1;
        }
    };

    let mut out = std::io::stdout();
    match rt.block_on(run_call(socket, call, &mut out)) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}: {}", PROGRAM, e);
            1
        }
    }
}

fn finish_harness(result: Result<HarnessReport, HarnessError>) -> i32 {
    match result {
        Ok(report) if report.is_success() => 0,
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("{}: {}", PROGRAM, failure);
            }
            1
        }
        Err(e) => {
            eprintln!("{}: {}", PROGRAM, e);
            1
        }
    }
}
