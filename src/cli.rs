use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

const TAGLINE: &str = "Run Slither and Solhint over Solidity contracts and write one Markdown audit report";

#[derive(Parser, Debug)]
#[command(name = "somnia-auditor")]
#[command(version)]
#[command(about = TAGLINE, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file (default: ./.somnia-auditor.toml if present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the offline audit on a file, directory or project
    Audit(AuditArgs),

    /// Check that slither and solhint are installed
    Tools,

    /// Print the rules used to categorize Slither findings
    Rules,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// File, directory or project root to scan
    #[arg(default_value = ".", value_parser = existing_path)]
    pub path: PathBuf,

    /// Only scan .sol files directly inside the directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Custom output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Additional directory name to skip while scanning (repeatable)
    #[arg(long = "exclude", value_name = "DIR")]
    pub exclude: Vec<String>,

    /// Ask a language model for a prioritized summary and add it to the report
    #[arg(long)]
    pub ai: bool,

    /// Model used for the AI summary
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// API key for the AI summary
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print the summary and per-file results as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with status 0 even when vulnerabilities are found
    #[arg(long)]
    pub no_fail: bool,
}

fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("Path '{}' does not exist", value))
    }
}

impl Cli {
    /// Initialize logging based on verbosity level; `RUST_LOG` takes precedence.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(Env::default().default_filter_or(level))
            .format_timestamp(None)
            .init();
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
