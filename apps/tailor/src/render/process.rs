//! Bounded external process invocation. Every run has a timeout; a process that
//! overruns it is killed and reported as a failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Lines of process output kept in error reports.
const OUTPUT_TAIL_LINES: usize = 20;

/// An external binary plus the arguments that precede every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalTool {
    pub program: String,
    pub leading_args: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("'{program}' exited with {}: {output_tail}", describe_exit(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        output_tail: String,
    },

    #[error("input file '{}' does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("expected output '{}' was not produced", .0.display())]
    MissingOutput(PathBuf),

    #[error("I/O error talking to '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

fn tail(stdout: &[u8], stderr: &[u8]) -> String {
    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    );
    let lines: Vec<&str> = combined.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

/// Runs `tool` with `args` appended to its leading arguments. Optional `stdin`
/// is written to the process and then closed. Nonzero exit is an error.
pub async fn run(
    tool: &ExternalTool,
    args: &[String],
    cwd: Option<&Path>,
    stdin: Option<&str>,
) -> Result<ProcessOutput, ProcessError> {
    let mut cmd = Command::new(&tool.program);
    cmd.args(&tool.leading_args)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: tool.program.clone(),
        source,
    })?;
    let input = stdin.map(str::to_owned);

    // Dropping this future on timeout drops the child, which kills it.
    let interaction = async move {
        if let (Some(input), Some(mut pipe)) = (input, child.stdin.take()) {
            match pipe.write_all(input.as_bytes()).await {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }
        child.wait_with_output().await
    };

    let output = match tokio::time::timeout(tool.timeout, interaction).await {
        Ok(result) => result.map_err(|source| ProcessError::Io {
            program: tool.program.clone(),
            source,
        })?,
        Err(_) => {
            return Err(ProcessError::TimedOut {
                program: tool.program.clone(),
                timeout: tool.timeout,
            })
        }
    };
    let duration = start.elapsed();
    debug!(
        "'{}' finished in {}ms with {:?}",
        tool.program,
        duration.as_millis(),
        output.status.code()
    );

    if !output.status.success() {
        return Err(ProcessError::Failed {
            program: tool.program.clone(),
            code: output.status.code(),
            output_tail: tail(&output.stdout, &output.stderr),
        });
    }

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration,
    })
}
