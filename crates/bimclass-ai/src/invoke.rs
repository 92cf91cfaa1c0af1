//! External classifier process invocation.
//!
//! The classifier is launched once per run with three trailing positional
//! arguments: the CSV input, the JSON input, and the model directory. Its
//! output streams are captured in full. Success requires both a zero exit
//! status and the result file being present afterwards.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Everything needed to launch the classifier once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationDescriptor {
    pub program: PathBuf,
    /// Arguments placed before the three positional paths, e.g. a script path.
    pub leading_args: Vec<String>,
    pub tabular_input: PathBuf,
    pub structured_input: PathBuf,
    pub model_dir: PathBuf,
    /// File the classifier must produce on success.
    pub result_path: PathBuf,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl InvocationDescriptor {
    /// Full argument list passed to the program.
    pub fn args(&self) -> Vec<&OsStr> {
        self.leading_args
            .iter()
            .map(OsStr::new)
            .chain([
                self.tabular_input.as_os_str(),
                self.structured_input.as_os_str(),
                self.model_dir.as_os_str(),
            ])
            .collect()
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub stdout: String,
    pub stderr: String,
    pub result_path: PathBuf,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("classifier exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("classifier succeeded but wrote no result file at {0}")]
    MissingOutput(PathBuf),

    #[error("classifier did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Run the classifier to completion and check for its result file.
///
/// A result file left over from an earlier run is removed first. On timeout
/// the child is killed.
pub async fn invoke(desc: &InvocationDescriptor) -> Result<InvocationReport, InvocationError> {
    remove_stale(&desc.result_path).await?;

    let mut command = Command::new(&desc.program);
    command
        .args(desc.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!(program = %desc.program.display(), "launching classifier");
    let started = Instant::now();
    let child = command.spawn().map_err(|source| InvocationError::Spawn {
        program: desc.program.clone(),
        source,
    })?;

    let wait = child.wait_with_output();
    let output = match desc.timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(output) => output,
            Err(_) => {
                warn!(timeout = ?limit, "classifier timed out, killed");
                return Err(InvocationError::TimedOut(limit));
            }
        },
        None => wait.await,
    }
    .map_err(|source| InvocationError::Io {
        path: desc.program.clone(),
        source,
    })?;
    let elapsed = started.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    debug!(
        status = %output.status,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "classifier exited"
    );

    if !output.status.success() {
        warn!(status = %output.status, "classifier failed");
        return Err(InvocationError::Failed {
            status: output.status,
            stderr: stderr.trim_end().to_string(),
        });
    }

    let present = tokio::fs::try_exists(&desc.result_path)
        .await
        .map_err(|source| InvocationError::Io {
            path: desc.result_path.clone(),
            source,
        })?;
    if !present {
        return Err(InvocationError::MissingOutput(desc.result_path.clone()));
    }

    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        result = %desc.result_path.display(),
        "classifier finished"
    );
    Ok(InvocationReport {
        stdout,
        stderr,
        result_path: desc.result_path.clone(),
        elapsed,
    })
}

async fn remove_stale(path: &Path) -> Result<(), InvocationError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale result file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(InvocationError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
