use crate::types::{display_name, Category, FileAudit, Finding, ToolOutcome};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a senior smart contract security auditor. \
Summarize the combined Slither and Solhint findings, prioritize by risk, \
and propose concrete, code-level remediation steps. \
Group results by: Critical/High, Medium, Low/Informational, and Style/Best Practices. \
Prefer concise, actionable guidance. Where helpful, include short Solidity snippets.";

pub const MISSING_KEY_MESSAGE: &str = "AI summary unavailable: OPENAI_API_KEY is not set. \
Set it in the environment or pass --api-key.";

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Ask the model for a Markdown summary. Never fails: problems are reported
/// as the returned text so they end up in the report.
pub fn generate_summary(results: &[FileAudit], files: &[PathBuf], settings: &AiSettings) -> String {
    let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return MISSING_KEY_MESSAGE.to_string();
    };

    let messages = build_prompt(results, files);
    info!("Requesting AI summary from {}", settings.model);

    match request_summary(&messages, api_key, settings) {
        Ok(text) => text,
        Err(e) => format!("AI summary failed: {:#}", e),
    }
}

fn request_summary(messages: &[ChatMessage], api_key: &str, settings: &AiSettings) -> Result<String> {
    let url = format!("{}/chat/completions", settings.api_base.trim_end_matches('/'));
    debug!("POST {}", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .header("User-Agent", concat!("somnia-auditor/", env!("CARGO_PKG_VERSION")))
        .json(&ChatRequest {
            model: &settings.model,
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
        .send()
        .context("request to the model API failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        anyhow::bail!("HTTP {}: {}", status, body.trim());
    }

    let parsed: ChatResponse = response.json().context("unexpected response from the model API")?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    Ok(content.trim().to_string())
}

pub fn build_prompt(results: &[FileAudit], files: &[PathBuf]) -> Vec<ChatMessage> {
    let mut lines = Vec::new();

    for result in results {
        let name = result.file_name();

        match &result.slither {
            ToolOutcome::Failed { error } => lines.push(format!("Slither Error in {}: {}", name, error)),
            outcome => {
                for category in Category::ALL {
                    lines.extend(outcome.in_category(category).map(|f| issue_line(&name, f)));
                }
            }
        }

        match &result.solhint {
            ToolOutcome::Failed { error } => lines.push(format!("Solhint Error in {}: {}", name, error)),
            outcome => lines.extend(outcome.findings().iter().map(|f| issue_line(&name, f))),
        }
    }

    let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
    let user_prompt = format!(
        "Project files: {}\n\nFindings (Slither + Solhint):\n{}",
        names.join(", "),
        lines.join("\n")
    );

    vec![
        ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: user_prompt,
        },
    ]
}

fn issue_line(file_name: &str, finding: &Finding) -> String {
    format!(
        "- [{}] {} @ {} ({})",
        finding.severity, finding.issue, file_name, finding.location
    )
}
