use std::{
    ffi::OsStr,
    process::Stdio,
    time::{Duration, Instant},
};

use tokio::process::Command;

use crate::{error_code::ErrorCode, future::WithTimeout};

struct MetricsGuard {
    start: Instant,
    armed: bool,
    command: String,
}

impl MetricsGuard {
    fn guard(command: &str) -> Self {
        metrics::counter!(crate::init_metrics::PROCESS_START, "command" => command.to_string())
            .increment(1);

        Self {
            start: Instant::now(),
            armed: true,
            command: command.to_string(),
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for MetricsGuard {
    fn drop(&mut self) {
        metrics::histogram!(
            crate::init_metrics::PROCESS_DURATION,
            "command" => self.command.clone(),
            "completed" => (!self.armed).to_string(),
        )
        .record(self.start.elapsed().as_secs_f64());

        metrics::counter!(
            crate::init_metrics::PROCESS_END,
            "completed" => (!self.armed).to_string(),
            "command" => self.command.clone(),
        )
        .increment(1);
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ProcessError {
    #[error("Required command {0} not found, make sure it exists in tubely's $PATH")]
    NotFound(String),

    #[error("Cannot run command {0} due to invalid permissions on binary, make sure the tubely user has permission to run it")]
    PermissionDenied(String),

    #[error("{0} timed out")]
    Timeout(String),

    #[error("{command} failed with status {}: {stderr}", display_code(.code))]
    Status {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Unknown process error")]
    Other(#[source] std::io::Error),
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|code| code.to_string())
        .unwrap_or_else(|| String::from("signal"))
}

impl ProcessError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::COMMAND_NOT_FOUND,
            Self::PermissionDenied(_) => ErrorCode::COMMAND_PERMISSION_DENIED,
            Self::Other(_) => ErrorCode::COMMAND_ERROR,
            Self::Timeout(_) => ErrorCode::COMMAND_TIMEOUT,
            Self::Status { .. } => ErrorCode::COMMAND_FAILURE,
        }
    }

    /// The diagnostic output of a command that ran and failed
    pub(crate) fn stderr(&self) -> Option<&str> {
        match self {
            Self::Status { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    fn spawn(command: &str, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(command.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(command.to_string()),
            _ => Self::Other(error),
        }
    }
}

/// Run `command` to completion, returning its stdout
///
/// The child is killed if it outlives `timeout` or if the returned future is dropped.
#[tracing::instrument(skip(args))]
pub(crate) async fn run<T>(
    command: &str,
    args: &[T],
    timeout: Duration,
) -> Result<Vec<u8>, ProcessError>
where
    T: AsRef<OsStr>,
{
    let guard = MetricsGuard::guard(command);

    let child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProcessError::spawn(command, e))?;

    match child.wait_with_output().with_timeout(timeout).await {
        Ok(Ok(output)) if output.status.success() => {
            guard.disarm();

            Ok(output.stdout)
        }
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!("{command} exited with {}: {stderr}", output.status);

            Err(ProcessError::Status {
                command: command.to_string(),
                code: output.status.code(),
                stderr,
            })
        }
        Ok(Err(e)) => Err(ProcessError::Other(e)),
        Err(_) => Err(ProcessError::Timeout(command.to_string())),
    }
}
