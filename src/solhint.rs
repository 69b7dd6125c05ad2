use crate::config::SolhintConfig;
use crate::error::ProcessError;
use crate::process::{self, CommandOutput};
use crate::types::{Category, Finding, ToolOutcome};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = ".solhint.json";

/// Files whose presence marks the root of a Solidity project.
const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "package.json",
    "foundry.toml",
    "hardhat.config.js",
    "hardhat.config.ts",
];

pub fn default_config() -> Value {
    json!({
        "extends": "solhint:recommended",
        "rules": {
            "compiler-version": ["error", "^0.8.0"],
            "func-visibility": ["warn", {"ignoreConstructors": true}],
            "max-line-length": ["warn", 120]
        }
    })
}

pub struct Solhint {
    binary: PathBuf,
    timeout: Duration,
    create_config: bool,
}

impl Solhint {
    pub fn new(config: &SolhintConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            create_config: config.create_config,
        }
    }

    pub fn run(&self, file: &Path) -> ToolOutcome {
        let abs_file = absolute(file);
        let file_dir = abs_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let config = ensure_config(&file_dir, self.create_config);

        let attempt = match &config {
            Some(config_path) => self.lint_with_config(&abs_file, config_path),
            None => self.lint_in_dir(&abs_file, &file_dir),
        };
        let output = match attempt {
            Ok(output) => output,
            Err(e) => return ToolOutcome::failed(self.describe_process_error(&e)),
        };

        // Solhint exits non-zero whenever an error-level rule fires, so the
        // JSON on stdout is authoritative when it parses.
        let parse_error = match serde_json::from_str::<Value>(&output.stdout) {
            Ok(report) => return normalize(&report, file),
            Err(e) => e,
        };

        if output.success() {
            return ToolOutcome::failed(format!(
                "Failed to parse Solhint JSON output: {}",
                parse_error
            ));
        }

        if config.is_some() && is_config_load_error(&output.stderr) {
            warn!(
                "Solhint could not load its config, retrying from {}",
                file_dir.display()
            );
            match self.lint_in_dir(&abs_file, &file_dir) {
                Ok(retry) => {
                    if let Ok(report) = serde_json::from_str::<Value>(&retry.stdout) {
                        return normalize(&report, file);
                    }
                    debug!("Solhint retry exited with {}", retry.code_display());
                }
                Err(e) => debug!("Solhint retry failed: {}", e),
            }
        }

        ToolOutcome::failed(describe_failure(&output))
    }

    fn lint_with_config(&self, file: &Path, config: &Path) -> Result<CommandOutput, ProcessError> {
        process::run(
            &self.binary,
            &[
                file.as_os_str(),
                OsStr::new("--formatter"),
                OsStr::new("json"),
                OsStr::new("--config"),
                config.as_os_str(),
            ],
            None,
            self.timeout,
        )
    }

    /// Run from the file's directory so Solhint resolves its own config.
    fn lint_in_dir(&self, file: &Path, dir: &Path) -> Result<CommandOutput, ProcessError> {
        let name = file.file_name().unwrap_or(file.as_os_str());
        process::run(
            &self.binary,
            &[name, OsStr::new("--formatter"), OsStr::new("json")],
            Some(dir),
            self.timeout,
        )
    }

    fn describe_process_error(&self, err: &ProcessError) -> String {
        match err {
            ProcessError::NotFound { .. } => {
                "Solhint not found. Please install it: npm install -g solhint".to_string()
            }
            ProcessError::TimedOut { timeout, .. } => {
                format!("Solhint timed out after {}s", timeout.as_secs())
            }
            ProcessError::Io { source, .. } => {
                format!("Unexpected error running Solhint: {}", source)
            }
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

fn is_config_load_error(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("config") && (lower.contains("failed to load") || lower.contains("cannot read"))
}

fn describe_failure(output: &CommandOutput) -> String {
    let mut message = format!("Solhint failed: exit status {}", output.code_display());
    if !output.stderr.is_empty() {
        message.push_str("\nSTDERR: ");
        message.push_str(&output.stderr);
    }
    message
}

/// Nearest `.solhint.json` at or above `start_dir`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Nearest ancestor carrying a project marker, else `start_dir` itself.
pub fn find_project_root(start_dir: &Path) -> PathBuf {
    start_dir
        .ancestors()
        .find(|dir| PROJECT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start_dir)
        .to_path_buf()
}

/// Locate a config, or write the default one at the project root (falling
/// back to `start_dir`). `None` lets Solhint pick its own defaults.
pub fn ensure_config(start_dir: &Path, create: bool) -> Option<PathBuf> {
    if let Some(existing) = find_config(start_dir) {
        debug!("Using Solhint config {}", existing.display());
        return Some(existing);
    }
    if !create {
        return None;
    }

    let project_root = find_project_root(start_dir);
    let mut targets = vec![project_root];
    if targets[0] != start_dir {
        targets.push(start_dir.to_path_buf());
    }

    for dir in targets {
        let path = dir.join(CONFIG_FILE);
        match write_default_config(&path) {
            Ok(()) => {
                info!("Created default Solhint config at {}", path.display());
                return Some(path);
            }
            Err(e) => warn!("Cannot write {}: {}", path.display(), e),
        }
    }

    None
}

fn write_default_config(path: &Path) -> io::Result<()> {
    let body = serde_json::to_string_pretty(&default_config())?;
    fs::write(path, body)
}

fn normalize(report: &Value, file: &Path) -> ToolOutcome {
    let empty = Vec::new();
    let issues = match report {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("issues")
            .and_then(Value::as_array)
            .unwrap_or(&empty),
        _ => &empty,
    };

    let fallback_file = file.display().to_string();
    let findings = issues
        .iter()
        .filter(|issue| !(issue.get("message").is_none() && issue.get("conclusion").is_some()))
        .map(|issue| {
            let message = issue
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown issue");
            let severity = issue
                .get("severity")
                .and_then(Value::as_str)
                .unwrap_or("info");
            let source = issue
                .get("filePath")
                .or_else(|| issue.get("file"))
                .and_then(Value::as_str)
                .unwrap_or(&fallback_file);

            Finding::new(
                message.to_string(),
                capitalize(severity),
                format!(
                    "{}:{}:{}",
                    source,
                    position(issue.get("line")),
                    position(issue.get("column"))
                ),
                Category::BestPractice,
            )
        })
        .collect();

    ToolOutcome::found(findings)
}

fn position(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => "?".to_string(),
    }
}

/// Upper-case the first character, lower-case the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn normalizes_array_output() {
        let report = json!([
            {"line": 1, "column": 1, "severity": "Error", "message": "Compiler version must be ^0.8.0",
             "ruleId": "compiler-version", "filePath": "contracts/A.sol"},
            {"line": 9, "severity": "WARNING", "message": "Line length must be no more than 120"},
            {"conclusion": "2 problems"}
        ]);
        let outcome = normalize(&report, Path::new("fallback/A.sol"));
        let findings = outcome.findings();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].location, "contracts/A.sol:1:1");
        assert_eq!(findings[0].severity, "Error");
        assert_eq!(findings[1].location, "fallback/A.sol:9:?");
        assert_eq!(findings[1].severity, "Warning");
        assert!(findings.iter().all(|f| f.category == Category::BestPractice));
    }

    #[test]
    fn normalizes_object_with_issues() {
        let report = json!({"issues": [{"file": "B.sol", "line": 2, "column": 4}]});
        let outcome = normalize(&report, Path::new("B.sol"));
        let finding = &outcome.findings()[0];
        assert_eq!(finding.issue, "Unknown issue");
        assert_eq!(finding.severity, "Info");
        assert_eq!(finding.location, "B.sol:2:4");
    }

    #[test]
    fn unexpected_shapes_have_no_findings() {
        assert_eq!(normalize(&json!({}), Path::new("A.sol")), ToolOutcome::clean());
        assert_eq!(normalize(&json!(3), Path::new("A.sol")), ToolOutcome::clean());
    }

    #[test]
    fn capitalize_matches_title_style() {
        assert_eq!(capitalize("warning"), "Warning");
        assert_eq!(capitalize("ERROR"), "Error");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn config_load_errors_are_recognized() {
        assert!(is_config_load_error("Error: Failed to load config \"solhint:recommended\""));
        assert!(is_config_load_error("cannot read config file"));
        assert!(!is_config_load_error("Failed to load plugin"));
    }

    #[test]
    fn failure_message_includes_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: "boom".to_string(),
        };
        assert_eq!(describe_failure(&output), "Solhint failed: exit status 1\nSTDERR: boom");
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use pretty_assertions::assert_eq;
        use crate::config::SolhintConfig;
        use std::os::unix::fs::PermissionsExt;

        struct Project {
            dir: TempDir,
            contract: PathBuf,
        }

        impl Project {
            fn new(with_config: bool) -> Self {
                let dir = TempDir::new().unwrap();
                let contract = dir.path().join("contracts/A.sol");
                fs::create_dir_all(contract.parent().unwrap()).unwrap();
                fs::write(&contract, "pragma solidity ^0.8.0;\n").unwrap();
                if with_config {
                    fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
                }
                Self { dir, contract }
            }

            fn solhint(&self, body: &str) -> Solhint {
                let bin = self.dir.path().join("bin");
                fs::create_dir_all(&bin).unwrap();
                let path = bin.join("solhint");
                fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
                Solhint::new(&SolhintConfig {
                    binary: path,
                    timeout_secs: 10,
                    create_config: false,
                })
            }
        }

        const ONE_ISSUE: &str = r#"echo '[{"line": 2, "column": 1, "severity": "Error", "message": "Compiler version must be ^0.8.20", "filePath": "A.sol"}]'"#;

        #[test]
        fn findings_on_error_exit_are_kept() {
            let project = Project::new(true);
            let outcome = project
                .solhint(&format!("{}; exit 1", ONE_ISSUE))
                .run(&project.contract);
            assert_eq!(outcome.findings().len(), 1);
            assert_eq!(outcome.findings()[0].location, "A.sol:2:1");
            assert_eq!(outcome.findings()[0].severity, "Error");
        }

        #[test]
        fn garbage_on_clean_exit_is_failure() {
            let project = Project::new(true);
            let outcome = project.solhint("echo 'oops'; exit 0").run(&project.contract);
            let error = outcome.error().unwrap();
            assert!(error.starts_with("Failed to parse Solhint JSON output: "), "{}", error);
        }

        #[test]
        fn config_load_failure_retries_without_config() {
            let project = Project::new(true);
            let body = r#"for arg in "$@"; do
  if [ "$arg" = "--config" ]; then echo 'Error: Failed to load config "solhint:recommended"' >&2; exit 1; fi
done
echo '[]'"#;
            let outcome = project.solhint(body).run(&project.contract);
            assert_eq!(outcome, ToolOutcome::clean());
        }

        #[test]
        fn other_failures_report_exit_status_and_stderr() {
            let project = Project::new(true);
            let outcome = project
                .solhint("echo 'Parse error' >&2; exit 2")
                .run(&project.contract);
            assert_eq!(
                outcome.error(),
                Some("Solhint failed: exit status 2\nSTDERR: Parse error\n")
            );
        }

        #[test]
        fn runs_from_file_directory_without_config() {
            let project = Project::new(false);
            let body = r#"if [ "$1" = "A.sol" ] && [ -f A.sol ]; then echo '[]'; else exit 3; fi"#;
            let outcome = project.solhint(body).run(&project.contract);
            assert_eq!(outcome, ToolOutcome::clean());
        }

        #[test]
        fn missing_binary_is_explained() {
            let project = Project::new(true);
            let outcome = Solhint::new(&SolhintConfig {
                binary: "no-such-solhint-4242".into(),
                timeout_secs: 10,
                create_config: false,
            })
            .run(&project.contract);
            assert_eq!(
                outcome.error(),
                Some("Solhint not found. Please install it: npm install -g solhint")
            );
        }
    }

    #[test]
    fn existing_config_in_ancestor_is_used() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("contracts/tokens");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();

        let found = ensure_config(&nested, true).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE));
        assert!(!nested.join(CONFIG_FILE).exists());
    }

    #[test]
    fn default_config_is_created_at_project_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src/vault");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();

        let created = ensure_config(&nested, true).unwrap();
        assert_eq!(created, dir.path().join(CONFIG_FILE));

        let written: Value = serde_json::from_str(&fs::read_to_string(&created).unwrap()).unwrap();
        assert_eq!(written, default_config());
    }

    #[test]
    fn without_markers_config_lands_next_to_file() {
        let dir = TempDir::new().unwrap();
        let created = ensure_config(dir.path(), true).unwrap();
        assert_eq!(created, dir.path().join(CONFIG_FILE));
    }

    #[test]
    fn creation_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ensure_config(dir.path(), false), None);
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }
}
