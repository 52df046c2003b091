//! Scan results
//!
//! A [`ScanReport`] is the engine's complete answer for one scan: findings
//! ordered by (file, line, pattern), the files that could not be loaded,
//! and summary counters. The three-way [`ScanStatus`] drives the process
//! exit code so CI can distinguish "suspicion only" from "reproduced".

use crate::ast::AstError;
use crate::extract::PatternSite;
use crate::fuzz::{Evidence, Trial, Verdict};
use crate::rules::{RiskTier, RuleHit};

/// Everything known about one pattern site after both scan stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub site: PatternSite,
    pub tier: RiskTier,
    pub hits: Vec<RuleHit>,
    /// `None` when the site was never fuzzed: benign tier, fuzzing
    /// disabled, or the pattern was structurally invalid.
    pub verdict: Option<Verdict>,
    pub evidence: Option<Evidence>,
    pub trials: Vec<Trial>,
    /// Parse or compile failure for the pattern itself. Reported as its own
    /// category; an unparseable pattern cannot be fuzzed.
    pub pattern_error: Option<String>,
}

impl Finding {
    pub fn is_confirmed(&self) -> bool {
        self.verdict == Some(Verdict::Confirmed)
    }

    /// Whether the finding appears in a default (non-verbose) report.
    pub fn is_reportable(&self) -> bool {
        self.tier.is_suspicious() || self.pattern_error.is_some()
    }
}

/// A file-scoped load failure. The scan continued without the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

impl From<AstError> for FileError {
    fn from(e: AstError) -> Self {
        Self {
            file: e.file(),
            message: e.to_string(),
        }
    }
}

/// Summary counters for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    /// Files successfully loaded.
    pub files: usize,
    /// Pattern sites extracted.
    pub sites: usize,
    /// Sites at a suspicious tier.
    pub suspicious: usize,
    /// Sites actually handed to the fuzz driver.
    pub fuzzed: usize,
}

/// Aggregate scan outcome, ordered and ready to render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub file_errors: Vec<FileError>,
    pub stats: ScanStats,
}

/// Three-way outcome for exit-status purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// No suspicious site.
    Clean,
    /// Suspicious sites exist but none was confirmed.
    Suspect,
    /// At least one site was dynamically confirmed.
    Confirmed,
}

impl ScanStatus {
    /// Exit codes: 1 and 2 stay reserved for runtime and usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanStatus::Clean => 0,
            ScanStatus::Suspect => 3,
            ScanStatus::Confirmed => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Clean => "clean",
            ScanStatus::Suspect => "suspect",
            ScanStatus::Confirmed => "confirmed",
        }
    }
}

impl ScanReport {
    /// Sorts findings into report order and file errors by file.
    pub fn assemble(
        mut findings: Vec<Finding>,
        mut file_errors: Vec<FileError>,
        stats: ScanStats,
    ) -> Self {
        findings.sort_by(|a, b| a.site.cmp(&b.site));
        file_errors.sort_by(|a, b| a.file.cmp(&b.file));
        Self {
            findings,
            file_errors,
            stats,
        }
    }

    pub fn status(&self) -> ScanStatus {
        if self.findings.iter().any(Finding::is_confirmed) {
            ScanStatus::Confirmed
        } else if self.findings.iter().any(|f| f.tier.is_suspicious()) {
            ScanStatus::Suspect
        } else {
            ScanStatus::Clean
        }
    }

    pub fn confirmed_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_confirmed()).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.pattern_error.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(file: &str, line: usize, pattern: &str) -> Finding {
        Finding {
            site: PatternSite {
                file: file.to_string(),
                line,
                pattern: pattern.to_string(),
                call: "search".to_string(),
            },
            tier: RiskTier::None,
            hits: Vec::new(),
            verdict: None,
            evidence: None,
            trials: Vec::new(),
            pattern_error: None,
        }
    }

    #[test]
    fn findings_sort_by_file_line_pattern() {
        let report = ScanReport::assemble(
            vec![
                finding("b.py", 1, "z+"),
                finding("a.py", 9, "a+"),
                finding("a.py", 2, "m+"),
                finding("a.py", 2, "b+"),
            ],
            Vec::new(),
            ScanStats::default(),
        );
        let order: Vec<(String, usize, String)> = report
            .findings
            .iter()
            .map(|f| (f.site.file.clone(), f.site.line, f.site.pattern.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.py".to_string(), 2, "b+".to_string()),
                ("a.py".to_string(), 2, "m+".to_string()),
                ("a.py".to_string(), 9, "a+".to_string()),
                ("b.py".to_string(), 1, "z+".to_string()),
            ]
        );
    }

    #[test]
    fn status_is_clean_without_suspicion() {
        let report = ScanReport::assemble(
            vec![finding("a.py", 1, "a+")],
            Vec::new(),
            ScanStats::default(),
        );
        assert_eq!(report.status(), ScanStatus::Clean);
        assert_eq!(report.status().exit_code(), 0);
    }

    #[test]
    fn status_is_suspect_with_unconfirmed_suspicion() {
        let mut suspect = finding("a.py", 1, "a+a+");
        suspect.tier = RiskTier::Medium;
        suspect.verdict = Some(Verdict::Inconclusive);
        let report = ScanReport::assemble(vec![suspect], Vec::new(), ScanStats::default());
        assert_eq!(report.status(), ScanStatus::Suspect);
        assert_eq!(report.status().exit_code(), 3);
    }

    #[test]
    fn status_is_confirmed_when_any_finding_confirms() {
        let mut confirmed = finding("a.py", 1, "(a+)+");
        confirmed.tier = RiskTier::High;
        confirmed.verdict = Some(Verdict::Confirmed);
        let mut benign = finding("a.py", 5, "b");
        benign.tier = RiskTier::None;
        let report =
            ScanReport::assemble(vec![benign, confirmed], Vec::new(), ScanStats::default());
        assert_eq!(report.status(), ScanStatus::Confirmed);
        assert_eq!(report.status().exit_code(), 4);
        assert_eq!(report.confirmed_count(), 1);
    }

    #[test]
    fn file_errors_sort_by_file() {
        let report = ScanReport::assemble(
            Vec::new(),
            vec![
                FileError {
                    file: "z.py".to_string(),
                    message: "bad".to_string(),
                },
                FileError {
                    file: "a.py".to_string(),
                    message: "bad".to_string(),
                },
            ],
            ScanStats::default(),
        );
        assert_eq!(report.file_errors[0].file, "a.py");
    }

    #[test]
    fn invalid_pattern_is_reportable_but_not_suspicious() {
        let mut invalid = finding("a.py", 1, "(broken");
        invalid.pattern_error = Some("pattern does not parse".to_string());
        assert!(invalid.is_reportable());
        let report = ScanReport::assemble(vec![invalid], Vec::new(), ScanStats::default());
        assert_eq!(report.status(), ScanStatus::Clean);
        assert_eq!(report.invalid_count(), 1);
    }
}
