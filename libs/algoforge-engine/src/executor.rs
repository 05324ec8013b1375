//! Drives one request's toolchain steps and classifies what happened.
//!
//! Compile and run are observed as separate steps but share one deadline,
//! so the whole request gets exactly the language's configured budget.
//! Classification is the same for every language:
//! - deadline passed → Timeout
//! - compile step exited nonzero or wrote to stderr → CompileError
//! - run step exited nonzero or wrote to stderr → RuntimeError
//! - otherwise → Success, with the run step's stdout

use algoforge_common::types::{JobStatus, Language};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::LanguageConfig;
use crate::error::ExecutionError;
use crate::process::{self, CommandSpec, ProcessError};
use crate::runners::{LanguageRunner, RunWorkspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    CompileError,
    RuntimeError,
    Timeout,
    /// Rejected before any file was written; only counted, never stored on a job
    UnsupportedLanguage,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::CompileError => "compile_error",
            Outcome::RuntimeError => "runtime_error",
            Outcome::Timeout => "timeout",
            Outcome::UnsupportedLanguage => "unsupported_language",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub stdout: String,
    pub diagnostic: String,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Terminal job status and output text for this result
    pub fn job_terminal(&self) -> (JobStatus, String) {
        if self.is_success() {
            (JobStatus::Success, self.stdout.clone())
        } else {
            (JobStatus::Error, self.diagnostic.clone())
        }
    }

    fn failure(outcome: Outcome, diagnostic: String, started: Instant) -> Self {
        // a terminal error never carries an empty output
        let diagnostic = if diagnostic.trim().is_empty() {
            format!("{} with no diagnostic output", outcome)
        } else {
            diagnostic
        };
        Self {
            outcome,
            stdout: String::new(),
            diagnostic,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// "Time Limit Exceeded (2s)" style rendering of a budget
pub fn time_limit_message(budget: Duration) -> String {
    let ms = budget.as_millis();
    if ms % 1000 == 0 {
        format!("Time Limit Exceeded ({}s)", ms / 1000)
    } else {
        format!("Time Limit Exceeded ({}ms)", ms)
    }
}

/// Hide host paths from diagnostics. The submitted file is shown as
/// `solution.<ext>` and the storage root is stripped from anything else.
pub fn sanitize_diagnostic(text: &str, workspace: &RunWorkspace) -> String {
    let source = workspace.source_path.to_string_lossy();
    let mut cleaned = text.replace(source.as_ref(), &solution_name(workspace.language));

    let root = workspace.root.to_string_lossy();
    if !root.is_empty() {
        let prefix = format!("{}/", root.trim_end_matches('/'));
        cleaned = cleaned.replace(&prefix, "");
    }
    cleaned
}

fn solution_name(language: Language) -> String {
    format!("solution.{}", language.extension())
}

enum Stage {
    Compile,
    Run,
}

impl Stage {
    fn failure_outcome(&self) -> Outcome {
        match self {
            Stage::Compile => Outcome::CompileError,
            Stage::Run => Outcome::RuntimeError,
        }
    }
}

enum StepResult {
    Clean(String),
    Failed(ExecutionResult),
}

async fn run_step(
    stage: Stage,
    spec: &CommandSpec,
    workspace: &RunWorkspace,
    budget: Duration,
    started: Instant,
    deadline: Instant,
) -> StepResult {
    match process::run_until(spec, deadline).await {
        Ok(output) if output.is_clean() => StepResult::Clean(output.stdout),
        Ok(output) => {
            let diagnostic = sanitize_diagnostic(&output.diagnostic(spec), workspace);
            StepResult::Failed(ExecutionResult::failure(stage.failure_outcome(), diagnostic, started))
        }
        Err(ProcessError::TimedOut) => StepResult::Failed(ExecutionResult::failure(
            Outcome::Timeout,
            time_limit_message(budget),
            started,
        )),
        Err(e) => {
            warn!(command = %spec, error = %e, "Toolchain step could not run");
            let diagnostic = sanitize_diagnostic(&e.to_string(), workspace);
            StepResult::Failed(ExecutionResult::failure(stage.failure_outcome(), diagnostic, started))
        }
    }
}

/// Compile (if the language needs it) and run one materialized submission
#[instrument(skip_all, fields(language = %workspace.language, job_name = %workspace.job_name))]
pub async fn execute(
    runner: &dyn LanguageRunner,
    workspace: &RunWorkspace,
    config: &LanguageConfig,
) -> Result<ExecutionResult, ExecutionError> {
    tokio::fs::create_dir_all(&workspace.outputs_dir)
        .await
        .map_err(ExecutionError::Materialization)?;
    runner
        .prepare(workspace)
        .await
        .map_err(ExecutionError::Materialization)?;

    let budget = config.timeout();
    let started = Instant::now();
    let deadline = started + budget;

    if let Some(compile) = runner.compile_command(workspace, config) {
        debug!(command = %compile, "Compiling");
        if let StepResult::Failed(result) =
            run_step(Stage::Compile, &compile, workspace, budget, started, deadline).await
        {
            return Ok(result);
        }
    }

    let run = runner.run_command(workspace, config);
    debug!(command = %run, "Running");
    let result = match run_step(Stage::Run, &run, workspace, budget, started, deadline).await {
        StepResult::Clean(stdout) => ExecutionResult {
            outcome: Outcome::Success,
            stdout,
            diagnostic: String::new(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
        StepResult::Failed(result) => result,
    };

    Ok(result)
}
