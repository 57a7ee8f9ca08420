//! Runs an operation through the launcher and turns the outcome into either a
//! JSON value or a classified [`ExtractionError`].

use std::path::Path;

use serde_json::{Value, json};

use crate::command::{Invocation, Operation};
use crate::error::{DETAILS_LIMIT, ExtractionError, PREVIEW_LIMIT, truncate_chars};
use crate::process::{LaunchError, Launcher, ProcessResult};

// Matched case-sensitively against stderr, in this order.
const NOT_FOUND_MARKERS: [&str; 3] = ["Video unavailable", "404 Not Found", "channel not found"];
const INVALID_URL_MARKER: &str = "Invalid URL";

/// Executes `operation` with the extractor at `program`.
pub async fn run_operation(
    launcher: &dyn Launcher,
    program: &Path,
    operation: &Operation,
) -> Result<Value, ExtractionError> {
    let invocation = operation.invocation(program);
    tracing::info!(
        operation = operation.label(),
        command = %invocation.command_line(),
        "executing extractor"
    );
    run_invocation(launcher, &invocation).await
}

pub async fn run_invocation(
    launcher: &dyn Launcher,
    invocation: &Invocation,
) -> Result<Value, ExtractionError> {
    match launcher.launch(invocation).await {
        Err(err) => {
            tracing::warn!(error = %err, "extractor could not be run");
            Err(classify_launch_error(invocation, &err))
        }
        Ok(result) if !result.succeeded() => {
            let stderr = result.stderr_text();
            tracing::warn!(
                exit_code = ?result.exit_code,
                killed = result.killed,
                stderr = %stderr.trim(),
                "extractor failed"
            );
            Err(classify_exit(invocation, &result))
        }
        Ok(result) => normalize_output(&result.stdout_text(), &result.stderr_text()),
    }
}

/// Facts about a failed run that decide its classification.
struct FailureFacts<'a> {
    text: &'a str,
    killed: bool,
    missing_executable: bool,
}

fn classify(invocation: &Invocation, facts: FailureFacts<'_>) -> ExtractionError {
    let details = truncate_chars(facts.text, DETAILS_LIMIT);
    if NOT_FOUND_MARKERS
        .iter()
        .any(|marker| facts.text.contains(marker))
    {
        ExtractionError::ResourceNotFound { details }
    } else if facts.text.contains(INVALID_URL_MARKER) {
        ExtractionError::BadUpstreamUrl { details }
    } else if facts.killed {
        ExtractionError::Killed { details }
    } else if facts.missing_executable {
        ExtractionError::MissingExecutable {
            program: invocation.program.display().to_string(),
            details,
        }
    } else {
        ExtractionError::ExecutionFailed { details }
    }
}

pub fn classify_launch_error(invocation: &Invocation, err: &LaunchError) -> ExtractionError {
    let text = err.to_string();
    classify(
        invocation,
        FailureFacts {
            text: &text,
            killed: false,
            missing_executable: err.is_missing_executable(),
        },
    )
}

/// Classifies a run that finished without success. stderr is the primary
/// diagnostic; a synthesized "Command failed" line stands in when it is empty.
pub fn classify_exit(invocation: &Invocation, result: &ProcessResult) -> ExtractionError {
    let stderr = result.stderr_text();
    let text = if stderr.is_empty() {
        match result.exit_code {
            Some(code) => format!(
                "Command failed: {} (exit code {code})",
                invocation.command_line()
            ),
            None => format!(
                "Command failed: {} (terminated by signal)",
                invocation.command_line()
            ),
        }
    } else {
        stderr
    };
    classify(
        invocation,
        FailureFacts {
            text: &text,
            killed: result.killed,
            missing_executable: result.command_not_found(),
        },
    )
}

/// Accepts either one consolidated JSON document or one document per line.
///
/// Blank lines are skipped in the per-line fallback; any other line that
/// fails to parse fails the whole output.
pub fn normalize_output(stdout: &str, stderr: &str) -> Result<Value, ExtractionError> {
    let whole_error = match serde_json::from_str::<Value>(stdout) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    match parse_lines(stdout) {
        Ok(entries) => Ok(json!({ "entries": entries })),
        Err(line_error) => {
            tracing::error!(
                parse_error = %whole_error,
                line_error = %line_error,
                "extractor output is not JSON"
            );
            if !stderr.is_empty() {
                Err(ExtractionError::NonJsonOutput {
                    details: truncate_chars(stderr, DETAILS_LIMIT),
                })
            } else {
                Err(ExtractionError::OutputParse {
                    details: whole_error.to_string(),
                    preview: truncate_chars(stdout, PREVIEW_LIMIT),
                })
            }
        }
    }
}

fn parse_lines(stdout: &str) -> Result<Vec<Value>, String> {
    let mut entries = Vec::new();
    for (index, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(line)
            .map_err(|err| format!("line {}: {err}", index + 1))?;
        entries.push(value);
    }
    if entries.is_empty() {
        return Err("no JSON lines in output".to_string());
    }
    Ok(entries)
}
