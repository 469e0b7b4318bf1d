//! Running a single verb and reporting its outcome.

use std::io::Write;
use std::path::Path;

use qctl_control::ControlClient;
use qctl_core::Result;

use crate::cli::Call;

/// Issue `call` and write the operator-facing line for it to `out`.
pub async fn perform<W: Write>(client: &mut ControlClient, call: Call, out: &mut W) -> Result<()> {
    match call {
        Call::Reset => {
            client.reset().await?;
            writeln!(out, "Quantum reset")?;
        }
        Call::Set(value) => {
            client.set(value).await?;
            writeln!(out, "Quantum set")?;
        }
        Call::Tell(value) => {
            client.tell(value).await?;
            writeln!(out, "Quantum set")?;
        }
        Call::Get => {
            let quantum = client.get().await?;
            writeln!(out, "Quantum: {}", quantum)?;
        }
        Call::Query => {
            // Raw result code; a negative quantum prints as-is
            let quantum = client.query().await?;
            writeln!(out, "Quantum: {}", quantum)?;
        }
        Call::Exchange(value) => {
            let previous = client.exchange(value).await?;
            writeln!(out, "Quantum exchanged, old quantum: {}", previous)?;
        }
        Call::Shift(value) => {
            let previous = client.shift(value).await?;
            writeln!(out, "Quantum shifted, old quantum: {}", previous)?;
        }
        Call::Register => {
            let snapshot = client.register().await?;
            writeln!(out, "{}", snapshot)?;
        }
    }
    Ok(())
}

/// Open a connection, perform `call`, and close it again.
///
/// The close line is written even when the verb fails.
pub async fn run_call<W: Write>(socket: &Path, call: Call, out: &mut W) -> Result<()> {
    let mut client = ControlClient::connect(socket).await?;
    writeln!(out, "Endpoint ({}) opened", socket.display())?;

    let result = perform(&mut client, call, out).await;
    if let Err(e) = &result {
        tracing::debug!(?call, error = %e, "Verb failed");
    }

    drop(client);
    writeln!(out, "Endpoint ({}) closed", socket.display())?;
    result
}
