use crate::slither::Slither;
use crate::solhint::Solhint;
use crate::types::{display_name, FileAudit};
use colored::*;
use log::{info, warn};
use std::path::PathBuf;

/// Run both tools over every file, one after the other.
pub fn audit_files(files: &[PathBuf], slither: &Slither, solhint: &Solhint, quiet: bool) -> Vec<FileAudit> {
    if !quiet {
        println!("Scanning {} files...", files.len());
    }

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        if !quiet {
            println!("  - {}", path.display());
        }
        info!("Auditing {}", path.display());

        let audit = FileAudit {
            path: path.clone(),
            slither: slither.run(path),
            solhint: solhint.run(path),
        };

        for (tool, outcome) in [("Slither", &audit.slither), ("Solhint", &audit.solhint)] {
            if let Some(error) = outcome.error() {
                warn!("{} failed on {}: {}", tool, path.display(), error.lines().next().unwrap_or_default());
            }
        }

        if audit.has_errors() && !quiet {
            println!("    {}", format!("Errors in {}", display_name(path)).yellow());
        }

        results.push(audit);
    }

    results
}
