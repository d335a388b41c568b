//! Bounded subprocess execution shared by run_command and run_python.
//!
//! Spawns the executable directly (no shell interpreter), with the working
//! directory pinned to the agent workspace and the environment scrubbed to
//! the inherited whitelist. Output captured so far survives a timeout kill.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use engram_security::command::INHERITED_ENV;

/// Result of a bounded subprocess run.
pub(crate) struct BoundedOutput {
    /// Combined stdout + stderr, capped and annotated
    pub output: String,
    /// Exit status was zero and no timeout occurred
    pub success: bool,
    /// The process was killed at the deadline
    pub timed_out: bool,
}

/// Run `argv` under `timeout`, capturing combined output up to `output_cap`.
pub(crate) async fn run_bounded(
    argv: &[String],
    cwd: &Path,
    timeout: Duration,
    output_cap: usize,
) -> std::io::Result<BoundedOutput> {
    debug!(command = ?argv, cwd = %cwd.display(), "Spawning subprocess");

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .current_dir(cwd)
        .env_clear()
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    for key in INHERITED_ENV {
        if let Ok(value) = std::env::var(key) {
            command.env(key, value);
        }
    }

    let mut child = command.spawn()?;

    // Drain pipes concurrently so a chatty child can't dead-lock on a full
    // pipe buffer, and so partial output survives a timeout kill.
    let mut stdout_pipe = child.stdout.take().expect("stdout piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr piped");
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf).await;
        buf
    });

    let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (Some(status?), false),
        Err(_) => {
            warn!(command = %argv[0], timeout_secs = timeout.as_secs(), "Subprocess timed out");
            let _ = child.kill().await;
            let _ = child.wait().await;
            (None, true)
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    let mut output = String::new();
    output.push_str(&String::from_utf8_lossy(&stdout));
    if !stderr.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str("[stderr]\n");
        output.push_str(&String::from_utf8_lossy(&stderr));
    }

    let mut truncated = false;
    if output.len() > output_cap {
        let mut cut = output_cap;
        while cut > 0 && !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        truncated = true;
    }

    if truncated {
        output.push_str(&format!("\n[output truncated at {output_cap} bytes]"));
    }

    if timed_out {
        output.push_str(&format!(
            "\n[timeout: process killed after {}s]",
            timeout.as_secs()
        ));
    } else if let Some(status) = status {
        let code = status.code().unwrap_or(-1);
        // Truncated output still reports how the run ended.
        if code != 0 || truncated {
            output.push_str(&format!("\n[exit code: {code}]"));
        }
    }

    let success = !timed_out && status.map(|s| s.success()).unwrap_or(false);

    Ok(BoundedOutput {
        output: output.trim_end().to_string(),
        success,
        timed_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_bounded(
            &argv(&["echo", "hello"]),
            dir.path(),
            Duration::from_secs(5),
            1024 * 1024,
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_bounded(
            &argv(&["ls", "/nonexistent-engram-test-dir"]),
            dir.path(),
            Duration::from_secs(5),
            1024 * 1024,
        )
        .await
        .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("[exit code:"));
    }

    #[tokio::test]
    async fn timeout_kills_and_annotates() {
        let dir = tempfile::tempdir().unwrap();
        let start = std::time::Instant::now();
        let result = run_bounded(
            &argv(&["sleep", "30"]),
            dir.path(),
            Duration::from_millis(200),
            1024 * 1024,
        )
        .await
        .unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(result.timed_out);
        assert!(!result.success);
        assert!(result.output.contains("[timeout:"));
    }

    #[tokio::test]
    async fn output_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        // `find /` style floods are the realistic case; use yes-like output
        // via python for portability of content size.
        let result = run_bounded(
            &argv(&["python3", "-c", "print('x' * 100000)"]),
            dir.path(),
            Duration::from_secs(10),
            1024,
        )
        .await
        .unwrap();
        assert!(result.output.contains("[output truncated at 1024 bytes]"));
        assert!(result.output.contains("[exit code: 0]"));
        assert!(result.output.len() < 2048);
    }

    #[tokio::test]
    async fn missing_executable_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_bounded(
            &argv(&["engram-definitely-not-a-binary"]),
            dir.path(),
            Duration::from_secs(1),
            1024,
        )
        .await;
        assert!(result.is_err());
    }
}
