//! Running external notification programs

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::NotificationError;

/// Run `program <title> <body>` and wait for it to finish
pub async fn run_notification_command(program: &str, title: &str, body: &str) -> Result<(), NotificationError> {
    debug!("Running {} for notification '{}'", program, title);

    let output = Command::new(program)
        .args([title, body])
        .output()
        .await
        .map_err(|source| NotificationError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NotificationError::CommandFailed {
            program: program.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    info!("Notification '{}' delivered through {}", title, program);
    Ok(())
}

/// Check that a notification program can be started at all
pub async fn check_command_available(program: &str) -> Result<(), NotificationError> {
    Command::new(program)
        .arg("--version")
        .output()
        .await
        .map_err(|_| NotificationError::Unavailable(program.to_string()))?;

    info!("{} is available", program);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "countdown-keeper-no-such-program";

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let result = run_notification_command(MISSING, "title", "body").await;
        assert!(matches!(result, Err(NotificationError::Spawn { .. })));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let result = check_command_available(MISSING).await;
        assert!(matches!(result, Err(NotificationError::Unavailable(p)) if p == MISSING));
    }
}
