mod ai;
mod audit;
mod cli;
mod config;
mod discovery;
mod error;
mod process;
mod report;
mod rules;
mod slither;
mod solhint;
mod types;

use anyhow::{Context, Result};
use chrono::Local;
use cli::{AuditArgs, Commands};
use colored::*;
use config::Config;
use discovery::DiscoveryOptions;
use log::info;
use serde::Serialize;
use std::env;
use std::path::Path;

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: &'a types::AuditSummary,
    files: &'a [types::FileAudit],
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_summary: Option<&'a str>,
}

fn main() -> Result<()> {
    let cli = cli::parse();
    cli.init_logging();

    let cwd = env::current_dir().context("Cannot determine the working directory")?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Audit(args) => {
            let code = run_audit(&args, &config, &cwd)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Tools => {
            if !print_tools(&config) {
                std::process::exit(1);
            }
        }
        Commands::Rules => report::print_legend(),
    }

    Ok(())
}

/// Returns the process exit code.
fn run_audit(args: &AuditArgs, config: &Config, cwd: &Path) -> Result<i32> {
    let quiet = args.quiet || args.json;

    let mut exclude_dirs = config.discovery.exclude_dirs.clone();
    exclude_dirs.extend(args.exclude.iter().cloned());
    let options = DiscoveryOptions {
        recursive: !args.no_recursive,
        exclude_dirs,
    };

    let files = discovery::find_sol_files(&args.path, &options, cwd);
    if files.is_empty() {
        eprintln!("No .sol files found.");
        return Ok(1);
    }

    let slither = slither::Slither::new(&config.slither);
    let solhint = solhint::Solhint::new(&config.solhint);
    let results = audit::audit_files(&files, &slither, &solhint, quiet);

    let ai_settings = args.ai.then(|| ai::AiSettings {
        model: args.model.clone().unwrap_or_else(|| config.ai.model.clone()),
        api_base: config.ai.api_base.clone(),
        api_key: args.api_key.clone(),
        temperature: config.ai.temperature,
        max_tokens: config.ai.max_tokens,
    });
    let ai_summary = ai_settings.as_ref().map(|settings| {
        if !quiet {
            println!("Generating AI summary with {}...", settings.model);
        }
        ai::generate_summary(&results, &files, settings)
    });

    let now = Local::now();
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| report::default_report_name(&now));
    let ctx = report::ReportContext {
        files: &files,
        generated_at: now,
        ai_model: ai_settings.as_ref().map(|s| s.model.as_str()),
        ai_summary: ai_summary.as_deref(),
    };
    let summary = report::write_report(&results, &ctx, &output)?;
    info!("Report written to {}", summary.report_file.display());

    if args.json {
        let payload = JsonOutput {
            summary: &summary,
            files: &results,
            ai_summary: ai_summary.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !args.quiet {
        report::print_summary(&summary);
    }

    if summary.counts.vulnerabilities > 0 && !args.no_fail {
        return Ok(1);
    }
    Ok(0)
}

/// Print availability of the external tools; true when both are usable.
fn print_tools(config: &Config) -> bool {
    let tools = [
        (&config.slither.binary, "pip install slither-analyzer"),
        (&config.solhint.binary, "npm install -g solhint"),
    ];

    let mut all_found = true;
    for (binary, install_hint) in tools {
        match process::tool_version(binary) {
            Some(version) => println!(
                "{} {:<10} {}",
                "✓".green(),
                binary.display().to_string(),
                version.bright_black()
            ),
            None => {
                all_found = false;
                println!(
                    "{} {:<10} {}",
                    "✗".red(),
                    binary.display().to_string(),
                    format!("not found - install with: {}", install_hint).yellow()
                );
            }
        }
    }
    all_found
}
