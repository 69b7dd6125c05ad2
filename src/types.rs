use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vulnerability, // Reentrancy and other exploitable patterns
    Inefficiency,  // Gas / optimization opportunities
    BestPractice,  // Everything else, including all Solhint output
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Vulnerability,
        Category::Inefficiency,
        Category::BestPractice,
    ];

    /// Section heading used in the per-file part of the report.
    pub fn heading(self) -> &'static str {
        match self {
            Category::Vulnerability => "Vulnerabilities",
            Category::Inefficiency => "Inefficiencies",
            Category::BestPractice => "Best_practices",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub issue: String,
    pub severity: String,
    pub location: String,
    pub category: Category,
}

impl Finding {
    pub fn new(issue: String, severity: String, location: String, category: Category) -> Self {
        Self {
            issue,
            severity,
            location,
            category,
        }
    }
}

/// What one tool produced for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Completed {
        findings: Vec<Finding>,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    Failed { error: String },
}

impl ToolOutcome {
    pub fn clean() -> Self {
        ToolOutcome::Completed {
            findings: Vec::new(),
            warning: None,
        }
    }

    pub fn found(findings: Vec<Finding>) -> Self {
        ToolOutcome::Completed {
            findings,
            warning: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        ToolOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ToolOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ToolOutcome::Failed { error } => Some(error),
            ToolOutcome::Completed { .. } => None,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            ToolOutcome::Completed { findings, .. } => findings,
            ToolOutcome::Failed { .. } => &[],
        }
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings()
            .iter()
            .filter(move |f| f.category == category)
    }

    pub fn count(&self, category: Category) -> usize {
        self.in_category(category).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileAudit {
    pub path: PathBuf,
    pub slither: ToolOutcome,
    pub solhint: ToolOutcome,
}

impl FileAudit {
    pub fn has_errors(&self) -> bool {
        self.slither.is_failed() || self.solhint.is_failed()
    }

    /// Last path component, used for headings and prompts.
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

pub fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub total_issues: usize,
    pub vulnerabilities: usize,
    pub inefficiencies: usize,
    pub best_practices: usize,
}

impl IssueCounts {
    /// Vulnerabilities and inefficiencies come from Slither only; best
    /// practices add Slither's remainder to everything Solhint reported.
    pub fn tally(results: &[FileAudit]) -> Self {
        let vulnerabilities = results
            .iter()
            .map(|r| r.slither.count(Category::Vulnerability))
            .sum();
        let inefficiencies = results
            .iter()
            .map(|r| r.slither.count(Category::Inefficiency))
            .sum();
        let best_practices = results
            .iter()
            .map(|r| r.slither.count(Category::BestPractice) + r.solhint.findings().len())
            .sum();

        Self {
            total_issues: vulnerabilities + inefficiencies + best_practices,
            vulnerabilities,
            inefficiencies,
            best_practices,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    #[serde(flatten)]
    pub counts: IssueCounts,
    pub report_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(category: Category) -> Finding {
        Finding::new("x".into(), "High".into(), "a.sol:1".into(), category)
    }

    #[test]
    fn tally_splits_sources_by_tool() {
        let results = vec![
            FileAudit {
                path: PathBuf::from("contracts/A.sol"),
                slither: ToolOutcome::found(vec![
                    finding(Category::Vulnerability),
                    finding(Category::Inefficiency),
                    finding(Category::BestPractice),
                ]),
                solhint: ToolOutcome::found(vec![
                    finding(Category::BestPractice),
                    finding(Category::BestPractice),
                ]),
            },
            FileAudit {
                path: PathBuf::from("contracts/B.sol"),
                slither: ToolOutcome::failed("boom"),
                solhint: ToolOutcome::found(vec![finding(Category::BestPractice)]),
            },
        ];

        let counts = IssueCounts::tally(&results);
        assert_eq!(counts.vulnerabilities, 1);
        assert_eq!(counts.inefficiencies, 1);
        assert_eq!(counts.best_practices, 4);
        assert_eq!(counts.total_issues, 6);
    }

    #[test]
    fn failed_outcome_has_no_findings() {
        let outcome = ToolOutcome::failed("Slither not found");
        assert!(outcome.is_failed());
        assert_eq!(outcome.error(), Some("Slither not found"));
        assert!(outcome.findings().is_empty());
    }

    #[test]
    fn summary_serializes_every_key() {
        let summary = AuditSummary {
            counts: IssueCounts::default(),
            report_file: PathBuf::from("report.md"),
        };
        let value = serde_json::to_value(&summary).unwrap();
        for key in [
            "total_issues",
            "vulnerabilities",
            "inefficiencies",
            "best_practices",
            "report_file",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
