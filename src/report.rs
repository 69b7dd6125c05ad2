use crate::rules;
use crate::types::{AuditSummary, Category, FileAudit, Finding, IssueCounts, ToolOutcome};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the Markdown report needs besides the per-file results.
pub struct ReportContext<'a> {
    pub files: &'a [PathBuf],
    pub generated_at: DateTime<Local>,
    /// Model name when an AI summary was requested.
    pub ai_model: Option<&'a str>,
    pub ai_summary: Option<&'a str>,
}

pub fn default_report_name(now: &DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("audit-report-{}.md", now.format("%Y%m%d_%H%M%S")))
}

pub fn render_markdown(results: &[FileAudit], ctx: &ReportContext<'_>) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "# Audit Report - {}\n\n",
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let scanned: Vec<String> = ctx.files.iter().map(|p| p.display().to_string()).collect();
    let _ = write!(
        out,
        "**Files Scanned**: {} ({})\n\n",
        ctx.files.len(),
        scanned.join(", ")
    );
    match ctx.ai_model {
        Some(model) => {
            let _ = write!(out, "**Mode**: AI-assisted (Slither, Solhint, {})\n\n", model);
        }
        None => out.push_str("**Mode**: Offline (Slither, Solhint)\n\n"),
    }

    for result in results {
        let _ = writeln!(out, "## {}", result.file_name());

        match &result.slither {
            ToolOutcome::Failed { error } => {
                let _ = write!(out, "### Slither Error\n{}\n\n", error);
            }
            ToolOutcome::Completed { warning, .. } => {
                for category in Category::ALL {
                    let issues: Vec<&Finding> = result.slither.in_category(category).collect();
                    write_section(&mut out, category.heading(), &issues);
                }
                if let Some(warning) = warning {
                    let _ = write!(out, "> Warning: {}\n\n", warning);
                }
            }
        }

        match &result.solhint {
            ToolOutcome::Failed { error } => {
                let _ = write!(out, "### Solhint Error\n{}\n\n", error);
            }
            ToolOutcome::Completed { findings, .. } => {
                let issues: Vec<&Finding> = findings.iter().collect();
                write_section(&mut out, "Best Practices (Solhint)", &issues);
            }
        }

        out.push('\n');
    }

    if let Some(summary) = ctx.ai_summary {
        let _ = write!(out, "## AI Summary\n{}\n\n", summary);
    }

    let counts = IssueCounts::tally(results);
    out.push_str("## Summary\n");
    let _ = writeln!(out, "- Total Issues: {}", counts.total_issues);
    let _ = writeln!(out, "- Vulnerabilities: {}", counts.vulnerabilities);
    let _ = writeln!(out, "- Inefficiencies: {}", counts.inefficiencies);
    let _ = writeln!(out, "- Best Practices: {}", counts.best_practices);

    out
}

fn write_section(out: &mut String, heading: &str, issues: &[&Finding]) {
    if issues.is_empty() {
        return;
    }
    let _ = writeln!(out, "### {}", heading);
    for issue in issues {
        let _ = writeln!(
            out,
            "- **{}**: {} at {}",
            issue.severity, issue.issue, issue.location
        );
    }
    out.push('\n');
}

/// Render and write the report, returning the counts that went into it.
pub fn write_report(
    results: &[FileAudit],
    ctx: &ReportContext<'_>,
    output: &Path,
) -> Result<AuditSummary> {
    let markdown = render_markdown(results, ctx);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create report directory {}", parent.display()))?;
    }
    fs::write(output, markdown)
        .with_context(|| format!("Cannot write report to {}", output.display()))?;

    Ok(AuditSummary {
        counts: IssueCounts::tally(results),
        report_file: output.to_path_buf(),
    })
}

pub fn print_summary(summary: &AuditSummary) {
    let counts = &summary.counts;
    println!("\n{}", "Audit Summary:".bold());
    println!("- Total Issues: {}", counts.total_issues.to_string().bold());

    let vulns = format!("- Vulnerabilities: {}", counts.vulnerabilities);
    if counts.vulnerabilities > 0 {
        println!("{}", vulns.red().bold());
    } else {
        println!("{}", vulns.green());
    }

    let ineff = format!("- Inefficiencies: {}", counts.inefficiencies);
    if counts.inefficiencies > 0 {
        println!("{}", ineff.yellow());
    } else {
        println!("{}", ineff);
    }

    println!("- Best Practices: {}", counts.best_practices);
    println!(
        "- Report saved to: {}",
        summary.report_file.display().to_string().cyan()
    );
}

pub fn print_legend() {
    println!("\n{}", "SLITHER CATEGORY RULES".bold().white());
    println!("{}", "═".repeat(80).bright_black());
    println!();

    for rule in rules::all_rules() {
        let keywords = if rule.keywords.is_empty() {
            "(anything else)".to_string()
        } else {
            rule.keywords.join(", ")
        };
        println!(
            "{} | {:<14} | {:<28} | {}",
            rule.id.cyan().bold(),
            rule.category.heading(),
            keywords.yellow(),
            rule.message
        );
    }

    println!("\nSolhint findings are always reported as best practices.");
}
