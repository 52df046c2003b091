//! JSON and NDJSON output
//!
//! The JSON document carries the full scan: metadata, summary counters,
//! findings with their trial histories, and skipped files. NDJSON streams
//! the same data one record per line for log pipelines.

use anyhow::Result;
use oni_core::fuzz::{Evidence, Trial};
use oni_core::report::{Finding, ScanReport};
use oni_core::rules::{RuleHit, RuleRegistry};
use oni_core::sandbox::TrialOutcome;
use serde::Serialize;
use std::io::Write;

pub struct JsonFormatter<'a> {
    registry: Option<&'a RuleRegistry>,
}

#[derive(Serialize)]
struct JsonOutput {
    version: &'static str,
    metadata: JsonMetadata,
    summary: JsonSummary,
    findings: Vec<JsonFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped_files: Vec<JsonSkippedFile>,
}

#[derive(Serialize)]
struct JsonMetadata {
    oni_version: &'static str,
    working_directory: String,
    scanned_path: String,
}

#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    pattern_sites: usize,
    suspicious: usize,
    fuzzed: usize,
    confirmed: usize,
    invalid: usize,
    status: String,
}

#[derive(Serialize)]
struct JsonFinding {
    file: String,
    line: usize,
    call: String,
    pattern: String,
    tier: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rules: Vec<JsonRuleHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evidence: Option<JsonEvidence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trials: Vec<JsonTrial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct JsonRuleHit {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    detail: String,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonEvidence {
    Timeout {
        input_len: usize,
        budget_ms: u64,
    },
    Growth {
        from_len: usize,
        to_len: usize,
        ratio: f64,
    },
}

#[derive(Serialize)]
struct JsonTrial {
    input_len: usize,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Serialize)]
struct JsonSkippedFile {
    file: String,
    message: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NdjsonRecord {
    Metadata {
        oni_version: &'static str,
        scanned_path: String,
    },
    SkippedFile {
        #[serde(flatten)]
        skipped: JsonSkippedFile,
    },
    Finding {
        #[serde(flatten)]
        finding: JsonFinding,
    },
    Summary {
        #[serde(flatten)]
        summary: JsonSummary,
    },
}

impl<'a> JsonFormatter<'a> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    /// With a registry, rule hits carry their human-readable names.
    pub fn with_registry(registry: &'a RuleRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn format(&self, findings: &[Finding], report: &ScanReport, scanned_path: &str) -> String {
        let output = JsonOutput {
            version: "1.0",
            metadata: metadata(scanned_path),
            summary: summary(report),
            findings: findings.iter().map(|f| self.finding_to_json(f)).collect(),
            skipped_files: report.file_errors.iter().map(skipped_to_json).collect(),
        };
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    /// Streams one JSON object per line: metadata, skipped files, findings,
    /// then the summary.
    pub fn format_ndjson(
        &self,
        findings: &[Finding],
        report: &ScanReport,
        scanned_path: &str,
        writer: &mut impl Write,
    ) -> Result<()> {
        let mut write_record = |record: &NdjsonRecord| -> Result<()> {
            writeln!(writer, "{}", serde_json::to_string(record)?)?;
            Ok(())
        };

        write_record(&NdjsonRecord::Metadata {
            oni_version: env!("CARGO_PKG_VERSION"),
            scanned_path: scanned_path.to_string(),
        })?;
        for error in &report.file_errors {
            write_record(&NdjsonRecord::SkippedFile {
                skipped: skipped_to_json(error),
            })?;
        }
        for finding in findings {
            write_record(&NdjsonRecord::Finding {
                finding: self.finding_to_json(finding),
            })?;
        }
        write_record(&NdjsonRecord::Summary {
            summary: summary(report),
        })?;
        Ok(())
    }

    fn finding_to_json(&self, finding: &Finding) -> JsonFinding {
        JsonFinding {
            file: finding.site.file.clone(),
            line: finding.site.line,
            call: finding.site.call.clone(),
            pattern: finding.site.pattern.clone(),
            tier: finding.tier.as_str().to_string(),
            rules: finding.hits.iter().map(|h| self.hit_to_json(h)).collect(),
            verdict: finding.verdict.map(|v| v.as_str().to_string()),
            evidence: finding.evidence.as_ref().map(evidence_to_json),
            trials: finding.trials.iter().map(trial_to_json).collect(),
            error: finding.pattern_error.clone(),
        }
    }

    fn hit_to_json(&self, hit: &RuleHit) -> JsonRuleHit {
        JsonRuleHit {
            id: hit.rule_id.to_string(),
            name: self
                .registry
                .and_then(|r| r.get_rule(hit.rule_id))
                .map(|r| r.metadata().name.to_string()),
            detail: hit.detail.clone(),
        }
    }
}

impl Default for JsonFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata(scanned_path: &str) -> JsonMetadata {
    JsonMetadata {
        oni_version: env!("CARGO_PKG_VERSION"),
        working_directory: std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        scanned_path: scanned_path.to_string(),
    }
}

fn summary(report: &ScanReport) -> JsonSummary {
    JsonSummary {
        files: report.stats.files,
        pattern_sites: report.stats.sites,
        suspicious: report.stats.suspicious,
        fuzzed: report.stats.fuzzed,
        confirmed: report.confirmed_count(),
        invalid: report.invalid_count(),
        status: report.status().as_str().to_string(),
    }
}

fn skipped_to_json(error: &oni_core::report::FileError) -> JsonSkippedFile {
    JsonSkippedFile {
        file: error.file.clone(),
        message: error.message.clone(),
    }
}

fn evidence_to_json(evidence: &Evidence) -> JsonEvidence {
    match evidence {
        Evidence::Timeout { input_len, budget } => JsonEvidence::Timeout {
            input_len: *input_len,
            budget_ms: budget.as_millis() as u64,
        },
        Evidence::Growth {
            from_len,
            to_len,
            ratio,
        } => JsonEvidence::Growth {
            from_len: *from_len,
            to_len: *to_len,
            ratio: *ratio,
        },
    }
}

fn trial_to_json(trial: &Trial) -> JsonTrial {
    let (outcome, duration_us, matched, detail) = match &trial.outcome {
        TrialOutcome::Completed { matched, duration } => (
            "completed",
            Some(duration.as_micros() as u64),
            Some(*matched),
            None,
        ),
        TrialOutcome::TimedOut { .. } => ("timed_out", None, None, None),
        TrialOutcome::Invalid { error } => ("invalid", None, None, Some(error.clone())),
        TrialOutcome::Crashed { detail } => ("crashed", None, None, Some(detail.clone())),
    };
    JsonTrial {
        input_len: trial.input_len,
        outcome,
        duration_us,
        matched,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oni_core::extract::PatternSite;
    use oni_core::fuzz::Verdict;
    use oni_core::report::{FileError, ScanStats};
    use oni_core::rules::RiskTier;
    use serde_json::Value;
    use std::time::Duration;

    fn finding(file: &str, line: usize, pattern: &str, tier: RiskTier) -> Finding {
        Finding {
            site: PatternSite {
                file: file.to_string(),
                line,
                pattern: pattern.to_string(),
                call: "compile".to_string(),
            },
            tier,
            hits: Vec::new(),
            verdict: None,
            evidence: None,
            trials: Vec::new(),
            pattern_error: None,
        }
    }

    fn confirmed_finding() -> Finding {
        let mut f = finding("app.py", 4, "(a+)+$", RiskTier::High);
        f.hits.push(RuleHit::new("R001", 3, "nested repetition"));
        f.verdict = Some(Verdict::Confirmed);
        f.evidence = Some(Evidence::Timeout {
            input_len: 256,
            budget: Duration::from_millis(250),
        });
        f.trials.push(Trial {
            input_len: 64,
            outcome: TrialOutcome::Completed {
                matched: false,
                duration: Duration::from_micros(120),
            },
        });
        f.trials.push(Trial {
            input_len: 256,
            outcome: TrialOutcome::TimedOut {
                budget: Duration::from_millis(250),
            },
        });
        f
    }

    fn report_for(findings: Vec<Finding>) -> ScanReport {
        let suspicious = findings.iter().filter(|f| f.tier.is_suspicious()).count();
        let stats = ScanStats {
            files: 1,
            sites: findings.len(),
            suspicious,
            fuzzed: findings.iter().filter(|f| f.verdict.is_some()).count(),
        };
        ScanReport::assemble(findings, Vec::new(), stats)
    }

    #[test]
    fn output_is_valid_json_with_version() {
        let report = report_for(vec![confirmed_finding()]);
        let out = JsonFormatter::new().format(&report.findings, &report, ".");

        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["metadata"]["oni_version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(value["metadata"]["scanned_path"], ".");
    }

    #[test]
    fn summary_reflects_report_counters() {
        let report = report_for(vec![confirmed_finding()]);
        let out = JsonFormatter::new().format(&report.findings, &report, ".");

        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["pattern_sites"], 1);
        assert_eq!(value["summary"]["suspicious"], 1);
        assert_eq!(value["summary"]["confirmed"], 1);
        assert_eq!(value["summary"]["status"], "confirmed");
    }

    #[test]
    fn finding_serializes_site_and_evidence() {
        let report = report_for(vec![confirmed_finding()]);
        let out = JsonFormatter::new().format(&report.findings, &report, ".");

        let value: Value = serde_json::from_str(&out).unwrap();
        let f = &value["findings"][0];
        assert_eq!(f["file"], "app.py");
        assert_eq!(f["line"], 4);
        assert_eq!(f["call"], "compile");
        assert_eq!(f["pattern"], "(a+)+$");
        assert_eq!(f["tier"], "high");
        assert_eq!(f["verdict"], "confirmed");
        assert_eq!(f["evidence"]["kind"], "timeout");
        assert_eq!(f["evidence"]["input_len"], 256);
        assert_eq!(f["evidence"]["budget_ms"], 250);
        assert_eq!(f["trials"][1]["outcome"], "timed_out");
        assert!(f.get("error").is_none());
    }

    #[test]
    fn growth_evidence_serializes_with_ratio() {
        let mut f = finding("app.py", 9, "a+a+b", RiskTier::Medium);
        f.verdict = Some(Verdict::Confirmed);
        f.evidence = Some(Evidence::Growth {
            from_len: 128,
            to_len: 256,
            ratio: 6.5,
        });
        let report = report_for(vec![f]);
        let out = JsonFormatter::new().format(&report.findings, &report, ".");

        let value: Value = serde_json::from_str(&out).unwrap();
        let evidence = &value["findings"][0]["evidence"];
        assert_eq!(evidence["kind"], "growth");
        assert_eq!(evidence["from_len"], 128);
        assert_eq!(evidence["to_len"], 256);
        assert!((evidence["ratio"].as_f64().unwrap() - 6.5).abs() < f64::EPSILON);
    }

    #[test]
    fn registry_resolves_rule_names() {
        let registry = RuleRegistry::new();
        let report = report_for(vec![confirmed_finding()]);
        let out =
            JsonFormatter::with_registry(&registry).format(&report.findings, &report, ".");

        let value: Value = serde_json::from_str(&out).unwrap();
        let rule = &value["findings"][0]["rules"][0];
        assert_eq!(rule["id"], "R001");
        assert_eq!(rule["name"], "nested-repetition");
    }

    #[test]
    fn skipped_files_appear_in_document() {
        let report = ScanReport::assemble(
            Vec::new(),
            vec![FileError {
                file: "broken.ast.json".to_string(),
                message: "malformed dump".to_string(),
            }],
            ScanStats::default(),
        );
        let out = JsonFormatter::new().format(&[], &report, ".");

        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["skipped_files"][0]["file"], "broken.ast.json");
    }

    #[test]
    fn ndjson_emits_one_record_per_line() {
        let report = report_for(vec![confirmed_finding()]);
        let mut buf = Vec::new();
        JsonFormatter::new()
            .format_ndjson(&report.findings, &report, ".", &mut buf)
            .unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        let last: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(first["type"], "metadata");
        assert_eq!(second["type"], "finding");
        assert_eq!(second["pattern"], "(a+)+$");
        assert_eq!(last["type"], "summary");
        assert_eq!(last["status"], "confirmed");
    }
}
