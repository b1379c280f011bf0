// Copyright 2025 Perf Gate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Invoking the external benchmark process.
//!
//! The benchmark is an opaque command. It receives the workload path, the
//! query string and the iteration count as trailing arguments and prints
//! metrics somewhere in its stdout or stderr.

use std::ffi::OsString;
use std::io;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Errors raised while running the benchmark.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Benchmark process could not be started
    #[error("failed to start benchmark `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Benchmark process exited unsuccessfully
    #[error("benchmark command failed ({status})")]
    Failed {
        /// Exit status description, e.g. `exit code 4`.
        status: String,
        /// Combined stdout and stderr, for diagnosis.
        output: String,
    },
}

/// Parameters passed to every benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Workload path (`--path`).
    pub workload: String,
    /// Query string (`--query`).
    pub query: String,
    /// Iterations inside one run (`--iterations`).
    pub iterations: u32,
}

impl Invocation {
    /// Trailing arguments appended to the benchmark command.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--path".to_string(),
            self.workload.clone(),
            "--query".to_string(),
            self.query.clone(),
            "--iterations".to_string(),
            self.iterations.to_string(),
        ]
    }
}

/// Runs the benchmark once and returns its combined output.
#[cfg_attr(test, mockall::automock)]
pub trait BenchmarkRunner {
    /// Execute one run.
    ///
    /// Implementations return stdout and stderr joined by a newline, and
    /// fail when the benchmark exits non-zero.
    fn run(&self, invocation: &Invocation) -> Result<String, RunnerError>;
}

/// Program and leading arguments of the benchmark command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchCommand {
    /// Executable to spawn.
    pub program: String,
    /// Arguments placed before the invocation arguments.
    pub args: Vec<String>,
}

impl Default for BenchCommand {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: ["run", "-p", "xtask", "--", "perf"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl BenchCommand {
    /// Full argument vector for one invocation.
    pub fn argv(&self, invocation: &Invocation) -> Vec<OsString> {
        self.args
            .iter()
            .cloned()
            .chain(invocation.args())
            .map(OsString::from)
            .collect()
    }
}

/// [`BenchmarkRunner`] that spawns a real process and blocks until it exits.
///
/// No timeout is applied; a hung benchmark hangs the gate.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    command: BenchCommand,
}

impl CommandRunner {
    /// Create a runner for `command`.
    pub fn new(command: BenchCommand) -> Self {
        Self { command }
    }
}

impl BenchmarkRunner for CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<String, RunnerError> {
        let argv = self.command.argv(invocation);
        debug!(program = %self.command.program, args = ?argv, "spawning benchmark");

        let output = Command::new(&self.command.program)
            .args(&argv)
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let combined = combine_output(&output.stdout, &output.stderr);
        if !output.status.success() {
            return Err(RunnerError::Failed {
                status: describe_status(output.status),
                output: combined,
            });
        }

        Ok(combined)
    }
}

/// Join stdout and stderr, decoding invalid UTF-8 lossily.
pub fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    )
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> Invocation {
        Invocation {
            workload: "Knowledge.vault".into(),
            query: "note".into(),
            iterations: 20,
        }
    }

    #[test]
    fn test_default_command_line() {
        let argv: Vec<String> = BenchCommand::default()
            .argv(&invocation())
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();

        assert_eq!(
            argv,
            vec![
                "run",
                "-p",
                "xtask",
                "--",
                "perf",
                "--path",
                "Knowledge.vault",
                "--query",
                "note",
                "--iterations",
                "20"
            ]
        );
    }

    #[test]
    fn test_combine_output_is_lossy() {
        let combined = combine_output(b"open_ms: 3\n", b"scan_ms: \xff4");
        assert_eq!(combined, "open_ms: 3\n\nscan_ms: \u{fffd}4");
    }

    #[test]
    fn test_missing_program() {
        let runner = CommandRunner::new(BenchCommand {
            program: "perf-gate-definitely-not-a-program".into(),
            args: Vec::new(),
        });
        let err = runner.run(&invocation()).unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_process_and_captures_both_streams() {
        let runner = CommandRunner::new(BenchCommand {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                "echo open_ms: 4; echo scan_ms: 9 >&2".into(),
                "bench".into(),
            ],
        });
        let output = runner.run(&invocation()).unwrap();
        assert_eq!(output, "open_ms: 4\n\nscan_ms: 9\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_keeps_output() {
        let runner = CommandRunner::new(BenchCommand {
            program: "sh".into(),
            args: vec!["-c".into(), "echo vault missing; exit 3".into(), "bench".into()],
        });
        match runner.run(&invocation()).unwrap_err() {
            RunnerError::Failed { status, output } => {
                assert_eq!(status, "exit code 3");
                assert!(output.contains("vault missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
