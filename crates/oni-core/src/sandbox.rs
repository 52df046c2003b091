//! Sandboxed trial execution
//!
//! A trial is one match attempt that may never return, so it runs in a
//! disposable child process the supervisor can kill from outside. Threads
//! cannot be terminated preemptively; processes can, and the kernel
//! reclaims everything they held. The protocol is one JSON request on the
//! worker's stdin and one JSON response on its stdout, one trial per
//! process.
//!
//! The worker half ([`run_worker`]) is reused by the CLI's hidden `probe`
//! subcommand; the supervisor half is [`ProcessSandbox`].

use crate::matcher::CompiledPattern;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to spawn probe worker '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe worker i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One match attempt, sent to the worker on stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub pattern: String,
    pub input: String,
}

/// The worker's reply. Timeouts never produce a reply; the supervisor
/// observes them as a kill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeResponse {
    Completed { matched: bool, duration_us: u64 },
    Invalid { error: String },
}

/// Outcome of one sandboxed trial as seen by the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// The match attempt finished inside the budget. `duration` is the
    /// worker's own measurement of the match alone, so process startup does
    /// not pollute the growth signal.
    Completed { matched: bool, duration: Duration },
    /// The worker was killed at the budget. A timeout is a positive result,
    /// not an error.
    TimedOut { budget: Duration },
    /// The pattern was rejected before any matching ran.
    Invalid { error: String },
    /// The worker died abnormally or replied with garbage. Inconclusive for
    /// the pattern; the scan continues.
    Crashed { detail: String },
}

/// Executes trials. The process sandbox is the production implementation;
/// tests substitute deterministic fakes.
pub trait TrialExecutor: Sync {
    fn execute(&self, pattern: &str, input: &str, budget: Duration) -> TrialOutcome;
}

/// How to launch a worker process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// The current executable re-invoked as a probe worker.
    pub fn current_exe() -> Result<Self, SandboxError> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, vec!["probe".to_string()]))
    }
}

/// Supervisor for worker processes: spawns, feeds, polls and kills.
pub struct ProcessSandbox {
    worker: WorkerCommand,
}

impl ProcessSandbox {
    pub fn new(worker: WorkerCommand) -> Self {
        Self { worker }
    }

    fn run_once(
        &self,
        pattern: &str,
        input: &str,
        budget: Duration,
    ) -> Result<TrialOutcome, SandboxError> {
        let mut child = Command::new(&self.worker.program)
            .args(&self.worker.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SandboxError::Spawn {
                command: self.worker.program.display().to_string(),
                source: e,
            })?;

        let request = ProbeRequest {
            pattern: pattern.to_string(),
            input: input.to_string(),
        };
        let payload = serde_json::to_string(&request).unwrap_or_default();
        if let Some(stdin) = child.stdin.as_mut() {
            // A worker that already died surfaces via try_wait below; a
            // broken pipe here is not itself a failure.
            let _ = writeln!(stdin, "{payload}");
        }
        drop(child.stdin.take());

        let deadline = Instant::now() + budget;
        let poll = poll_interval(budget);
        loop {
            if let Some(status) = child.try_wait()? {
                let mut output = String::new();
                if let Some(mut stdout) = child.stdout.take() {
                    let _ = stdout.read_to_string(&mut output);
                }
                return Ok(interpret_exit(status, &output));
            }
            if Instant::now() >= deadline {
                debug!(pattern, budget_ms = budget.as_millis() as u64, "budget exhausted, killing worker");
                let _ = child.kill();
                let _ = child.wait();
                return Ok(TrialOutcome::TimedOut { budget });
            }
            thread::sleep(poll);
        }
    }
}

impl TrialExecutor for ProcessSandbox {
    fn execute(&self, pattern: &str, input: &str, budget: Duration) -> TrialOutcome {
        match self.run_once(pattern, input, budget) {
            Ok(outcome) => outcome,
            Err(e) => TrialOutcome::Crashed {
                detail: e.to_string(),
            },
        }
    }
}

fn poll_interval(budget: Duration) -> Duration {
    (budget / 20).clamp(Duration::from_millis(1), Duration::from_millis(10))
}

fn interpret_exit(status: ExitStatus, output: &str) -> TrialOutcome {
    if !status.success() {
        return TrialOutcome::Crashed {
            detail: format!("worker exited with {status}"),
        };
    }
    let line = output.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    match serde_json::from_str::<ProbeResponse>(line) {
        Ok(ProbeResponse::Completed {
            matched,
            duration_us,
        }) => TrialOutcome::Completed {
            matched,
            duration: Duration::from_micros(duration_us),
        },
        Ok(ProbeResponse::Invalid { error }) => TrialOutcome::Invalid { error },
        Err(e) => TrialOutcome::Crashed {
            detail: format!("unreadable worker reply: {e}"),
        },
    }
}

/// Worker side: reads one request, runs the match, writes one response.
///
/// Compilation failures come back as `invalid`; they are detected before
/// any clock starts. The match itself is self-timed so the reported
/// duration covers exactly the backtracking work.
pub fn run_worker<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<(), SandboxError> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let response = match serde_json::from_str::<ProbeRequest>(line.trim()) {
        Ok(request) => probe(&request),
        Err(e) => ProbeResponse::Invalid {
            error: format!("malformed request: {e}"),
        },
    };
    let payload = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"outcome":"invalid","error":"response serialization failed"}"#.to_string());
    writeln!(writer, "{payload}")?;
    writer.flush()?;
    Ok(())
}

/// Compiles and runs one match attempt, timing only the match.
pub fn probe(request: &ProbeRequest) -> ProbeResponse {
    let compiled = match CompiledPattern::compile(&request.pattern) {
        Ok(compiled) => compiled,
        Err(e) => {
            return ProbeResponse::Invalid {
                error: e.to_string(),
            };
        }
    };
    let start = Instant::now();
    let matched = compiled.matches(&request.input);
    let duration_us = start.elapsed().as_micros() as u64;
    ProbeResponse::Completed {
        matched,
        duration_us,
    }
}
