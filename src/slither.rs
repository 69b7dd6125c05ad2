use crate::config::SlitherConfig;
use crate::error::ProcessError;
use crate::process::{self, CommandOutput};
use crate::rules::categorize;
use crate::types::{Finding, ToolOutcome};
use log::{debug, warn};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slither exits with 255 when detectors fired and `--json` is used.
const EXIT_FINDINGS: i32 = 255;

pub const JSON_FALLBACK_WARNING: &str =
    "Slither analysis completed but JSON parsing failed. Check output manually.";

pub struct Slither {
    binary: PathBuf,
    timeout: Duration,
}

impl Slither {
    pub fn new(config: &SlitherConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn run(&self, file: &Path) -> ToolOutcome {
        let file_arg = file.as_os_str();
        let output = match process::run(
            &self.binary,
            &[file_arg, OsStr::new("--json"), OsStr::new("-")],
            None,
            self.timeout,
        ) {
            Ok(output) => output,
            Err(e) => return ToolOutcome::failed(self.describe_process_error(&e)),
        };

        match output.code {
            Some(0) => {
                if output.stdout.trim().is_empty() {
                    return ToolOutcome::clean();
                }
                match serde_json::from_str::<SlitherOutput>(&output.stdout) {
                    Ok(parsed) => normalize(parsed, file),
                    Err(e) => {
                        warn!(
                            "Slither output for {} did not match the expected JSON report, treating it as clean: {}",
                            file.display(),
                            e
                        );
                        ToolOutcome::clean()
                    }
                }
            }
            Some(EXIT_FINDINGS) => {
                if output.stdout.trim().is_empty() {
                    return ToolOutcome::clean();
                }
                match serde_json::from_str::<SlitherOutput>(&output.stdout) {
                    Ok(parsed) => normalize(parsed, file),
                    Err(e) => {
                        debug!("Slither JSON parse error: {}", e);
                        ToolOutcome::failed(describe_failure(&output))
                    }
                }
            }
            _ => {
                let message = describe_failure(&output);
                warn!("{}", message.lines().next().unwrap_or_default());
                self.retry_without_json(file, message)
            }
        }
    }

    /// A plain run that succeeds means the file is analyzable and only the
    /// JSON mode broke, so report an empty result with a warning instead.
    fn retry_without_json(&self, file: &Path, message: String) -> ToolOutcome {
        match process::run(&self.binary, &[file.as_os_str()], None, self.timeout) {
            Ok(alt) if matches!(alt.code, Some(0) | Some(EXIT_FINDINGS)) => {
                ToolOutcome::Completed {
                    findings: Vec::new(),
                    warning: Some(JSON_FALLBACK_WARNING.to_string()),
                }
            }
            Ok(alt) => {
                debug!("Slither plain run exited with {}", alt.code_display());
                ToolOutcome::failed(message)
            }
            Err(e) => {
                debug!("Slither plain run failed: {}", e);
                ToolOutcome::failed(message)
            }
        }
    }

    fn describe_process_error(&self, err: &ProcessError) -> String {
        match err {
            ProcessError::NotFound { .. } => {
                "Slither not found. Please install it: pip install slither-analyzer".to_string()
            }
            ProcessError::TimedOut { timeout, .. } => format!(
                "Slither analysis timed out ({}). File may be too complex or have dependency issues.",
                format_limit(*timeout)
            ),
            ProcessError::Io { source, .. } => {
                format!("Unexpected error running Slither: {}", source)
            }
        }
    }
}

fn format_limit(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!(">{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        format!(">{} seconds", secs)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SlitherOutput {
    success: Option<bool>,
    error: Option<String>,
    results: SlitherResults,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SlitherResults {
    detectors: Vec<Detector>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Detector {
    description: String,
    impact: Option<String>,
    elements: Vec<Element>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Element {
    source_mapping: Option<SourceMapping>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceMapping {
    filename_short: Option<String>,
    lines: Vec<u64>,
}

fn normalize(output: SlitherOutput, file: &Path) -> ToolOutcome {
    if output.success == Some(false) {
        if let Some(error) = output.error.filter(|e| !e.trim().is_empty()) {
            return ToolOutcome::failed(error);
        }
    }

    let fallback_name = file.display().to_string();
    let mut findings = Vec::new();

    for detector in output.results.detectors {
        let impact = detector.impact.unwrap_or_else(|| "Info".to_string());
        let category = categorize(&detector.description);

        for element in detector.elements {
            let mapping = element.source_mapping.unwrap_or_default();
            let location = format!(
                "{}:{}",
                mapping.filename_short.as_deref().unwrap_or(&fallback_name),
                format_lines(&mapping.lines)
            );
            findings.push(Finding::new(
                detector.description.clone(),
                impact.clone(),
                location,
                category,
            ));
        }
    }

    ToolOutcome::found(findings)
}

/// `12`, `12-14` for a contiguous span, `3,7` otherwise, `?` when unknown.
pub fn format_lines(lines: &[u64]) -> String {
    match lines {
        [] => "?".to_string(),
        [single] => single.to_string(),
        [first, .., last] if lines.windows(2).all(|w| w[1] == w[0] + 1) => {
            format!("{}-{}", first, last)
        }
        _ => lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Turn a failed run into a short message, with a hint when the output
/// matches a known failure mode.
pub fn describe_failure(output: &CommandOutput) -> String {
    let mut message = format!("Slither exited with code {}", output.code_display());

    let text = if !output.stderr.is_empty() {
        output.stderr.as_str()
    } else {
        output.stdout.as_str()
    };

    if text.contains("Compilation error") || text.contains("ParserError") {
        let error_lines: Vec<&str> = text
            .lines()
            .filter(|line| line.to_lowercase().contains("error"))
            .collect();
        if let Some((first, rest)) = error_lines.split_first() {
            message.push_str(&format!("\nCompilation Error: {}", first));
            for line in rest.iter().take(2) {
                message.push('\n');
                message.push_str(line);
            }
        }
    } else if text.contains("No contracts were found") {
        message.push_str("\nNo contracts found in the file");
    } else if text.contains("FileNotFoundError") || text.contains("No such file") {
        message.push_str("\nFile not found or cannot be read");
    } else if text.contains("Import error") || text.contains("ImportError") {
        message.push_str("\nImport/dependency error - missing library or incorrect path");
    } else if text.to_lowercase().contains("solc") {
        message.push_str("\nSolidity compiler issue - check compiler version");
    } else if !output.stderr.trim().is_empty() {
        for line in output.stderr.trim().lines().take(3) {
            message.push('\n');
            message.push_str(line);
        }
    } else if let Some(line) = output.stdout.trim().lines().next() {
        message.push('\n');
        message.push_str(line);
    }

    message
}
