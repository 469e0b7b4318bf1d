//! qctl server binary entry point.

use clap::Parser;
use tracing::{error, info};

use qctl_server::{run_endpoint, shutdown_signal, Cli};

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) =
        qctl_core::init_logging(cli.log_verbosity(), cli.log_file.as_deref(), log_format)
    {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "qctl-server starting");

    let config = cli.to_config();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("qctl-server: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run_endpoint(&config, shutdown_signal())) {
        error!(error = %e, "Endpoint failed");
        eprintln!("qctl-server: {}", e);
        std::process::exit(1);
    }
}
