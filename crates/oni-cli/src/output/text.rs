//! Human-readable terminal output

use colored::Colorize;
use oni_core::fuzz::{Evidence, Verdict};
use oni_core::report::{Finding, ScanReport};
use oni_core::rules::RiskTier;

/// Renders findings for a terminal, one line per site plus a verdict line
/// for everything that was fuzzed.
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, findings: &[Finding], report: &ScanReport) -> String {
        let mut out = String::new();

        for finding in findings {
            out.push_str(&self.format_finding(finding));
        }

        for error in &report.file_errors {
            out.push_str(&format!(
                "{} skipped {}: {}\n",
                "warning:".yellow().bold(),
                error.file,
                error.message
            ));
        }

        if findings.is_empty() && report.file_errors.is_empty() {
            out.push_str("No suspicious patterns found.\n");
        }

        out.push('\n');
        out.push_str(&self.format_summary(report));
        out
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let mut out = String::new();
        let location = format!("{}:{}", finding.site.file, finding.site.line).bold();

        if let Some(error) = &finding.pattern_error {
            out.push_str(&format!(
                "{} {} `{}`\n    {} {}\n",
                location,
                "invalid pattern:".magenta(),
                finding.site.pattern,
                "error:".magenta(),
                error
            ));
            return out;
        }

        let rule_ids = finding
            .hits
            .iter()
            .map(|h| h.rule_id)
            .collect::<Vec<_>>()
            .join(",");
        let tier = tier_label(finding.tier);
        if rule_ids.is_empty() {
            out.push_str(&format!("{location} {tier}: `{}`\n", finding.site.pattern));
        } else {
            out.push_str(&format!(
                "{location} {tier} [{}]: `{}`\n",
                rule_ids.dimmed(),
                finding.site.pattern
            ));
        }

        match finding.verdict {
            Some(Verdict::Confirmed) => {
                out.push_str(&format!(
                    "    {} {}\n",
                    "confirmed:".red().bold(),
                    evidence_line(finding)
                ));
            }
            Some(Verdict::Inconclusive) => {
                out.push_str(&format!(
                    "    {} not reproduced within budget ({} trials)\n",
                    "inconclusive:".dimmed(),
                    finding.trials.len()
                ));
            }
            None => {}
        }
        out
    }

    fn format_summary(&self, report: &ScanReport) -> String {
        let stats = &report.stats;
        let mut out = format!(
            "Scanned {} files, {} pattern sites ({} suspicious, {} fuzzed).\n",
            stats.files, stats.sites, stats.suspicious, stats.fuzzed
        );

        let confirmed = report.confirmed_count();
        let suspects = stats.suspicious - confirmed;
        let invalid = report.invalid_count();
        if confirmed == 0 && suspects == 0 && invalid == 0 {
            out.push_str(&format!("{}\n", "No backtracking risk found.".green()));
            return out;
        }

        let mut parts = Vec::new();
        if confirmed > 0 {
            parts.push(format!("{confirmed} confirmed").red().bold().to_string());
        }
        if suspects > 0 {
            parts.push(format!("{suspects} unconfirmed suspect(s)").yellow().to_string());
        }
        if invalid > 0 {
            parts.push(format!("{invalid} invalid pattern(s)").magenta().to_string());
        }
        out.push_str(&format!("Found {}.\n", parts.join(", ")));
        out
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn tier_label(tier: RiskTier) -> String {
    match tier {
        RiskTier::High => "high".red().bold().to_string(),
        RiskTier::Medium => "medium".yellow().bold().to_string(),
        RiskTier::Low => "low".blue().to_string(),
        RiskTier::None => "clean".green().to_string(),
    }
}

fn evidence_line(finding: &Finding) -> String {
    match &finding.evidence {
        Some(Evidence::Timeout { input_len, budget }) => format!(
            "trial timed out at input length {} (budget {} ms)",
            input_len,
            budget.as_millis()
        ),
        Some(Evidence::Growth {
            from_len,
            to_len,
            ratio,
        }) => format!(
            "match time grew {ratio:.1}x between input lengths {from_len} and {to_len}"
        ),
        None => "reproduced".to_string(),
    }
}
