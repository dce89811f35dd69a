//! Classification of a finished toolchain process.
//!
//! The exit code alone decides system-level success. For a clean exit the
//! business verdict is read from the last stdout line that is a JSON object;
//! when the toolchain prints no such line, the legacy human-readable markers
//! are consulted and the verdict is tagged with `source: "markers"` so
//! callers can tell the two apart.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::subprocess::ProcessOutput;
use super::ExecutorError;

/// Longest failure detail carried into an error message.
const MAX_ERROR_DETAIL_CHARS: usize = 2000;

const FAILURE_MARKERS: &[&str] = &[
    "Verification failed",
    "Risk threshold not met",
    "Compliance check failed",
];

const PASS_MARKERS: &[&str] = &[
    "Verification successful",
    "Proof verified",
    "Compliance check passed",
];

static TIMING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s*ms\b").expect("valid regex"));

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+\s*(?:bytes|kb|mb)\b").expect("valid regex"));

/// Where a verdict was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    Structured,
    Markers,
    None,
}

/// Business outcome of a run that exited cleanly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// `None` when the output carried no recognisable verdict.
    pub success: Option<bool>,
    pub status: &'static str,
    pub source: VerdictSource,
    pub reason: &'static str,
}

impl Verdict {
    fn new(success: Option<bool>, source: VerdictSource) -> Self {
        let (status, reason) = match success {
            Some(true) => ("verification_passed", "Verification completed successfully"),
            Some(false) => (
                "verification_failed",
                "Business logic verification failed; the proof run itself succeeded",
            ),
            None => ("inconclusive", "Output carried no verdict"),
        };
        Self {
            success,
            status,
            source,
            reason,
        }
    }
}

/// Turn a finished process into the executor's result payload.
///
/// A non-zero exit is an [`ExecutorError::ExternalProcessFailure`]; a clean
/// exit is always `Ok`, even when the verdict is negative.
pub fn classify(output: &ProcessOutput) -> Result<Value, ExecutorError> {
    if !output.success() {
        return Err(ExecutorError::ExternalProcessFailure {
            exit_code: output.exit_code,
            detail: failure_detail(output),
        });
    }

    let structured = structured_line(&output.stdout);
    let verdict = match &structured {
        Some(fields) => Verdict::new(structured_verdict(fields), VerdictSource::Structured),
        None => marker_verdict(&output.stdout, &output.stderr),
    };

    let metrics = extract_metrics(&output.stdout);
    let proof_generated = metrics
        .get("proofGenerated")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut payload = structured.unwrap_or_default();
    let fixed = json!({
        "status": "completed",
        "zkProofGenerated": proof_generated,
        "systemExecution": {
            "status": "success",
            "exitCode": output.exit_code,
            "durationMs": output.duration_ms,
        },
        "verificationResult": verdict,
        "output": output.stdout,
        "stderr": output.stderr,
        "executionMetrics": metrics,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Value::Object(fixed) = fixed {
        payload.extend(fixed);
    }

    Ok(Value::Object(payload))
}

fn failure_detail(output: &ProcessOutput) -> String {
    let text = [output.stderr.trim(), output.stdout.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("No output");
    text.chars().take(MAX_ERROR_DETAIL_CHARS).collect()
}

/// Last stdout line that parses as a JSON object.
fn structured_line(stdout: &str) -> Option<Map<String, Value>> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

fn structured_verdict(fields: &Map<String, Value>) -> Option<bool> {
    if let Some(success) = fields.get("success").and_then(Value::as_bool) {
        return Some(success);
    }
    let verdict = fields.get("verdict").and_then(Value::as_str)?;
    match verdict.to_ascii_lowercase().as_str() {
        "valid" | "passed" | "verified" | "success" => Some(true),
        "invalid" | "failed" | "rejected" | "failure" => Some(false),
        _ => None,
    }
}

fn marker_verdict(stdout: &str, stderr: &str) -> Verdict {
    let failed = FAILURE_MARKERS.iter().any(|m| stdout.contains(m))
        || stderr.contains("verification failed");
    let passed = PASS_MARKERS.iter().any(|m| stdout.contains(m));

    match (passed, failed) {
        (_, true) => Verdict::new(Some(false), VerdictSource::Markers),
        (true, false) => Verdict::new(Some(true), VerdictSource::Markers),
        (false, false) => Verdict::new(None, VerdictSource::None),
    }
}

/// Pull timing and size figures plus milestone flags out of stdout.
pub fn extract_metrics(stdout: &str) -> Value {
    let mut metrics = Map::new();

    let timings: Vec<Value> = TIMING_RE
        .captures_iter(stdout)
        .map(|c| Value::String(c[1].to_string()))
        .collect();
    if !timings.is_empty() {
        metrics.insert("timings".into(), Value::Array(timings));
    }

    let sizes: Vec<Value> = SIZE_RE
        .find_iter(stdout)
        .map(|m| Value::String(m.as_str().to_string()))
        .collect();
    if !sizes.is_empty() {
        metrics.insert("sizeMetrics".into(), Value::Array(sizes));
    }

    for (marker, key) in [
        ("Proof generated successfully", "proofGenerated"),
        ("Circuit compiled", "circuitCompiled"),
        ("Verification successful", "verificationSuccessful"),
    ] {
        if stdout.contains(marker) {
            metrics.insert(key.into(), Value::Bool(true));
        }
    }

    Value::Object(metrics)
}
