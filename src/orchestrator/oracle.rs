//! The external sort process.
//!
//! `OracleCommand` describes how to start it; `OracleProcess` owns the child
//! and both of its pipes. The child is spawned with kill-on-drop, so a
//! process that is dropped without `wait` or `abort` is still killed.

use crate::errors::{FilterError, FilterResult, OracleFailure};
use crate::protocol::KeyLine;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

pub const DEFAULT_SORT_COMMAND: &str = "sort";

/// How to invoke the sort process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCommand {
    program: String,
    temp_dir: Option<PathBuf>,
    buffer_size: Option<String>,
}

impl Default for OracleCommand {
    fn default() -> Self {
        Self::new(DEFAULT_SORT_COMMAND)
    }
}

impl OracleCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            temp_dir: None,
            buffer_size: None,
        }
    }

    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn with_buffer_size(mut self, size: Option<String>) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Stable sort on the first field; spill directory and memory budget if
    /// configured.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-s".to_string(), "-k".to_string(), "1,1".to_string()];
        if let Some(dir) = &self.temp_dir {
            args.push("-T".to_string());
            args.push(dir.display().to_string());
        }
        if let Some(size) = &self.buffer_size {
            args.push("-S".to_string());
            args.push(size.clone());
        }
        args
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args());
        parts.join(" ")
    }

    /// Start the process with byte-order collation. Its stderr is inherited.
    pub fn spawn(&self) -> FilterResult<OracleProcess> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .env("LC_ALL", "C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OracleFailure::SpawnFailed {
                command: self.command_line(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            OracleFailure::Pipe(io::Error::other("sort process has no stdin"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            OracleFailure::Pipe(io::Error::other("sort process has no stdout"))
        })?;

        tracing::debug!(
            pid = child.id().unwrap_or(0),
            command = %self.command_line(),
            "sort process started"
        );

        Ok(OracleProcess {
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout: Some(BufReader::new(stdout).lines()),
            sent: 0,
            received: 0,
        })
    }
}

/// A running sort process.
pub struct OracleProcess {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
    sent: u64,
    received: u64,
}

impl OracleProcess {
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub async fn send(&mut self, line: &KeyLine) -> FilterResult<()> {
        let text = line.to_line()?;
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(FilterError::Protocol(
                "input to sort process is already closed".to_string(),
            ));
        };
        let written = stdin.write_all(text.as_bytes()).await;
        if let Err(e) = written {
            return Err(self.pipe_failure(e).await);
        }
        self.sent += 1;
        Ok(())
    }

    /// Flush and close the write side. This is the only end-of-input signal
    /// the sort process gets.
    pub async fn finish_input(&mut self) -> FilterResult<()> {
        if let Some(mut stdin) = self.stdin.take()
            && let Err(e) = stdin.shutdown().await
        {
            return Err(self.pipe_failure(e).await);
        }
        tracing::debug!(sent = self.sent, "sort input closed");
        Ok(())
    }

    /// Next sorted line, or `None` at end of output.
    pub async fn next_line(&mut self) -> FilterResult<Option<KeyLine>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        match stdout.next_line().await {
            Ok(Some(line)) => {
                self.received += 1;
                Ok(Some(KeyLine::parse(&line)?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(OracleFailure::Pipe(e).into()),
        }
    }

    /// Reap the process. A bad exit status is reported before a short count.
    pub async fn wait(&mut self) -> FilterResult<()> {
        self.stdin = None;
        self.stdout = None;
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| FilterError::io("can't wait for sort process", e))?;
        tracing::debug!(%status, received = self.received, "sort process exited");
        if let Some(failure) = status_failure(status) {
            return Err(failure.into());
        }
        if self.received != self.sent {
            return Err(OracleFailure::PrematureEof {
                expected: self.sent,
                received: self.received,
            }
            .into());
        }
        Ok(())
    }

    /// Close both pipes, kill the process and reap it.
    pub async fn abort(&mut self) {
        self.stdin = None;
        self.stdout = None;
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = self.child.kill().await {
                    tracing::debug!(error = %e, "sort process could not be killed");
                }
            }
        }
    }

    /// A failed write usually means the process died; prefer its exit status
    /// over the pipe error.
    async fn pipe_failure(&mut self, e: io::Error) -> FilterError {
        self.stdin = None;
        if e.kind() == io::ErrorKind::BrokenPipe {
            self.stdout = None;
            if let Ok(status) = self.child.wait().await
                && let Some(failure) = status_failure(status)
            {
                return failure.into();
            }
        }
        OracleFailure::Pipe(e).into()
    }
}

fn status_failure(status: ExitStatus) -> Option<OracleFailure> {
    if status.success() {
        return None;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(OracleFailure::Signal(signal));
        }
    }
    Some(OracleFailure::ExitCode(status.code().unwrap_or(-1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_script(dir: &Path, name: &str, content: &str) -> PathBuf {
        let script_path = dir.join(name);
        std::fs::write(&script_path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&script_path, perms).unwrap();
        }
        script_path
    }

    async fn feed(process: &mut OracleProcess, forms: &[&str]) {
        for form in forms {
            process.send(&KeyLine::new(*form)).await.unwrap();
        }
        process.finish_input().await.unwrap();
    }

    async fn drain(process: &mut OracleProcess) -> Vec<KeyLine> {
        let mut out = Vec::new();
        while let Some(line) = process.next_line().await.unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn test_args() {
        let cmd = OracleCommand::default()
            .with_temp_dir(Some(PathBuf::from("/var/tmp")))
            .with_buffer_size(Some("50%".to_string()));
        assert_eq!(
            cmd.args(),
            vec!["-s", "-k", "1,1", "-T", "/var/tmp", "-S", "50%"]
        );
        assert_eq!(cmd.command_line(), "sort -s -k 1,1 -T /var/tmp -S 50%");
    }

    #[tokio::test]
    async fn test_sort_is_stable_on_first_field() {
        let mut process = OracleCommand::default().spawn().unwrap();
        let lines = [
            KeyLine::new("b").with_original("x").with_index(1),
            KeyLine::new("a").with_original("y").with_index(2),
            KeyLine::new("b").with_original("a").with_index(3),
        ];
        for line in &lines {
            process.send(line).await.unwrap();
        }
        process.finish_input().await.unwrap();
        let out = drain(&mut process).await;
        process.wait().await.unwrap();
        let order: Vec<u64> = out.iter().filter_map(|l| l.sequence_index).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_byte_order_collation() {
        let mut process = OracleCommand::default().spawn().unwrap();
        feed(&mut process, &["Bw", "BW", "B_"]).await;
        let out = drain(&mut process).await;
        process.wait().await.unwrap();
        let forms: Vec<&str> = out.iter().map(|l| l.canonical_form.as_str()).collect();
        assert_eq!(forms, vec!["BW", "B_", "Bw"]);
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let dir = tempdir().unwrap();
        let script = create_test_script(
            dir.path(),
            "sort.sh",
            "#!/bin/sh\ncat > /dev/null\necho Bw\nexit 2\n",
        );
        let mut process = OracleCommand::new(script.to_string_lossy())
            .spawn()
            .unwrap();
        feed(&mut process, &["Bw", "Bw"]).await;
        drain(&mut process).await;
        let err = process.wait().await.unwrap_err();
        assert!(matches!(
            err,
            FilterError::OracleFailed(OracleFailure::ExitCode(2))
        ));
    }

    #[tokio::test]
    async fn test_signal_is_reported() {
        let dir = tempdir().unwrap();
        let script = create_test_script(
            dir.path(),
            "sort.sh",
            "#!/bin/sh\ncat > /dev/null\nkill -9 $$\n",
        );
        let mut process = OracleCommand::new(script.to_string_lossy())
            .spawn()
            .unwrap();
        feed(&mut process, &["Bw"]).await;
        drain(&mut process).await;
        let err = process.wait().await.unwrap_err();
        assert!(matches!(
            err,
            FilterError::OracleFailed(OracleFailure::Signal(9))
        ));
    }

    #[tokio::test]
    async fn test_short_output_is_premature_eof() {
        let dir = tempdir().unwrap();
        let script = create_test_script(
            dir.path(),
            "sort.sh",
            "#!/bin/sh\ncat > /dev/null\necho Bw\n",
        );
        let mut process = OracleCommand::new(script.to_string_lossy())
            .spawn()
            .unwrap();
        feed(&mut process, &["Bw", "Bw", "Bw"]).await;
        drain(&mut process).await;
        let err = process.wait().await.unwrap_err();
        assert!(matches!(
            err,
            FilterError::OracleFailed(OracleFailure::PrematureEof {
                expected: 3,
                received: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let result = OracleCommand::new("/nonexistent/isofilter-sort").spawn();
        assert!(matches!(
            result,
            Err(FilterError::OracleFailed(OracleFailure::SpawnFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_abort_reaps_a_blocked_process() {
        let mut process = OracleCommand::default().spawn().unwrap();
        process.send(&KeyLine::new("Bw")).await.unwrap();
        process.abort().await;
        assert!(process.child.try_wait().unwrap().is_some());
    }
}
