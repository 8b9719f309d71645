use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;

use anyhow::Context;

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Stdout and stderr lines in the order they arrived, terminators kept.
    pub combined: String,
    pub exit_code: i32,
}

/// Extract an exit code from a process status, mapping signals to 128+N on Unix.
fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(1, |s| 128 + s))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}

/// Forward every line of `pipe` to `tx`, line terminator included. Invalid
/// UTF-8 is decoded lossily so a single odd byte cannot cut the stream short.
///
/// A read error ends the stream and is returned; hashes parsed from a
/// truncated capture would be wrong.
fn forward_lines(pipe: impl Read, tx: &mpsc::Sender<String>) -> std::io::Result<()> {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    }
}

/// Drain stdout and stderr concurrently so `combined` keeps the real
/// interleaving and neither pipe can fill up and stall the child.
fn run_interleaved(mut child: Child) -> anyhow::Result<CommandOutput> {
    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout not captured"))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr not captured"))?;

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();

    let stdout_thread = thread::spawn(move || forward_lines(stdout_pipe, &tx));
    let stderr_thread = thread::spawn(move || forward_lines(stderr_pipe, &tx2));

    let stdout_read = stdout_thread
        .join()
        .map_err(|_| anyhow::anyhow!("stdout reader thread panicked"))?;
    let stderr_read = stderr_thread
        .join()
        .map_err(|_| anyhow::anyhow!("stderr reader thread panicked"))?;

    // Reap the child before reporting a read error so it is not left behind.
    let status = child.wait()?;
    stdout_read.context("failed to read command stdout")?;
    stderr_read.context("failed to read command stderr")?;

    // All senders dropped → rx iteration will terminate
    let combined: String = rx.into_iter().collect();

    Ok(CommandOutput {
        combined,
        exit_code: exit_code_from_status(status),
    })
}

/// Execute `command` with `args` appended.
///
/// `command` is split on whitespace: the first word is the program, the rest
/// are leading arguments (e.g. `"ewfverify -q"`).
///
/// # Errors
///
/// Returns an error if the command string is empty or the process fails to spawn.
pub fn execute<I, S>(command: &str, args: I) -> anyhow::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty command"))?;
    let base_args: Vec<&str> = parts.collect();

    let child = Command::new(program)
        .args(&base_args)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    run_interleaved(child)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const NO_ARGS: [&str; 0] = [];

    #[test]
    fn test_execute_echo() {
        let result = execute("echo hello", NO_ARGS).unwrap();
        assert_eq!(result.combined, "hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn test_execute_embedded_and_extra_args() {
        let result = execute("echo hello", ["world"]).unwrap();
        assert_eq!(result.combined, "hello world\n");
    }

    #[test]
    fn test_execute_path_argument_passed_literally() {
        let path = std::path::Path::new("image with spaces.E01");
        let result = execute("echo", [path]).unwrap();
        assert_eq!(result.combined, "image with spaces.E01\n");
    }

    #[test]
    fn test_execute_failure() {
        let result = execute("false", NO_ARGS).unwrap();
        assert_ne!(result.exit_code, 0);
    }

    #[test]
    fn test_execute_specific_exit_code() {
        let result = execute("sh -c", ["exit 42"]).unwrap();
        assert_eq!(result.exit_code, 42);
    }

    #[test]
    fn test_execute_empty_command() {
        assert!(execute("", NO_ARGS).is_err());
        assert!(execute("   ", NO_ARGS).is_err());
    }

    #[test]
    fn test_execute_nonexistent_command() {
        let err = execute("nonexistent_cmd_xyz", NO_ARGS).unwrap_err();
        assert!(
            format!("{err:#}").contains("nonexistent_cmd_xyz"),
            "error should name the program: {err:#}"
        );
    }

    #[test]
    fn test_combined_both_empty() {
        let result = execute("true", NO_ARGS).unwrap();
        assert_eq!(result.combined, "");
    }

    #[test]
    fn test_combined_stderr_only() {
        let result = execute("sh -c", ["echo err >&2"]).unwrap();
        assert_eq!(result.combined, "err\n");
    }

    #[test]
    fn test_combined_both_streams() {
        let result = execute("sh -c", ["echo out1; echo err1 >&2; echo out2"]).unwrap();
        // Exact order between the two pipes depends on scheduling.
        assert!(result.combined.contains("out1"));
        assert!(result.combined.contains("out2"));
        assert!(result.combined.contains("err1"));
        assert_eq!(result.combined.lines().count(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let result = execute("printf", ["abc\\377def\\nnext\\n"]).unwrap();
        assert!(result.combined.starts_with("abc"));
        assert!(result.combined.ends_with("def\nnext\n"));
    }

    /// Yields one line, then fails like a pipe torn down mid-read.
    struct BrokenPipe {
        sent: bool,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::other("device went away"));
            }
            self.sent = true;
            let line = b"first line\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_forward_lines_propagates_read_error() {
        let (tx, rx) = mpsc::channel();
        let err = forward_lines(BrokenPipe { sent: false }, &tx).unwrap_err();
        assert_eq!(err.to_string(), "device went away");
        drop(tx);
        let lines: Vec<String> = rx.into_iter().collect();
        assert_eq!(lines, vec!["first line\n"]);
    }

    #[test]
    fn test_forward_lines_clean_eof() {
        let (tx, rx) = mpsc::channel();
        forward_lines(&b"a\nb"[..], &tx).unwrap();
        drop(tx);
        let lines: Vec<String> = rx.into_iter().collect();
        assert_eq!(lines, vec!["a\n", "b"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_signal_exit_code() {
        // SIGTERM = 15, expected exit code = 128 + 15 = 143
        let result = execute("sh -c", ["kill -TERM $$"]).unwrap();
        assert_eq!(result.exit_code, 143);
    }
}
