//! Child process management for the toolchain executor.
//!
//! [`run_command`] spawns a program with an argument list, captures
//! stdout/stderr, and enforces a wall-clock timeout. On unix the child leads
//! its own process group, and on timeout the whole group is killed before
//! the error is returned.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::ExecutorError;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Pipes are always drained to EOF. Past this limit only the most recent
/// bytes are kept, since the verdict line comes last.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// What to run and under which constraints.
#[derive(Debug, Clone)]
pub struct ProcessInput {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<PathBuf>,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
}

/// Captured output from a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn the process described by `input` and wait for it to finish.
///
/// Stdin is closed immediately. A non-zero exit code is *not* an error at
/// this level; callers decide how to classify it.
pub async fn run_command(input: ProcessInput) -> Result<ProcessOutput, ExecutorError> {
    let mut cmd = Command::new(&input.program);
    cmd.args(&input.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(ExecutorError::Spawn)?;
    let pid = child.id();
    tracing::debug!(
        program = %input.program,
        pid,
        args = ?input.args,
        "Spawned external process",
    );

    // Read both pipes in their own tasks so a chatty child cannot block on a
    // full pipe while we wait for it.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let wait_result = tokio::time::timeout(input.timeout, child.wait()).await;

    match wait_result {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Ok(Err(e)) => Err(ExecutorError::Spawn(e)),
        Err(_elapsed) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            #[cfg(unix)]
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to kill timed-out process");
            }
            stdout_task.abort();
            stderr_task.abort();
            tracing::warn!(
                program = %input.program,
                elapsed_ms,
                "External process killed after timeout",
            );
            Err(ExecutorError::Timeout { elapsed_ms })
        }
    }
}

/// Kill every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // Safety: killpg takes plain integers and touches no memory of ours.
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret != 0 {
        tracing::warn!(
            pid,
            error = %std::io::Error::last_os_error(),
            "Failed to kill process group",
        );
    }
}

/// Read an output stream to EOF, keeping at most the last
/// [`MAX_OUTPUT_BYTES`] bytes.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut h) = handle else {
        return buf;
    };
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match h.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > 2 * MAX_OUTPUT_BYTES {
                    buf.drain(..buf.len() - MAX_OUTPUT_BYTES);
                }
            }
        }
    }
    if buf.len() > MAX_OUTPUT_BYTES {
        buf.drain(..buf.len() - MAX_OUTPUT_BYTES);
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
