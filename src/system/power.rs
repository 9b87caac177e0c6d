use tokio::process::Command;
use tracing::{error, warn};

use crate::error::DashboardError;

/// Run the configured shutdown command and wait for it to exit.
pub async fn shutdown(command: &[String]) -> Result<(), DashboardError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| DashboardError::ShutdownFailed("no shutdown command configured".into()))?;

    warn!("Shutdown requested: running {}", command.join(" "));

    let status = Command::new(program).args(args).status().await.map_err(|e| {
        error!("Shutdown failed: {e}");
        DashboardError::ShutdownFailed(e.to_string())
    })?;

    if !status.success() {
        error!("Shutdown failed: {program} exited with {status}");
        return Err(DashboardError::ShutdownFailed(format!("{program} exited with {status}")));
    }

    Ok(())
}
