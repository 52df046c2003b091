//! SARIF output formatter for GitHub Code Scanning
//!
//! Provides SARIF 2.1.0 output for integration with GitHub Code Scanning and
//! other tools that consume the SARIF standard. Only findings with a fired
//! rule or a pattern error become results; SARIF has no notion of a clean
//! site.

use oni_core::fuzz::{Evidence, Verdict};
use oni_core::report::Finding;
use oni_core::rules::RuleRegistry;
use serde::Serialize;
use std::collections::BTreeSet;

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

/// Rule id for results whose pattern failed to parse.
const INVALID_PATTERN_RULE: &str = "invalid-pattern";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifOutput {
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub version: &'static str,
    pub runs: Vec<SarifRun>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<SarifArtifact>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifDriver {
    pub name: &'static str,
    pub semantic_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_uri: Option<&'static str>,
    pub rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub short_description: SarifMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_description: Option<SarifMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_uri: Option<String>,
    pub default_configuration: SarifRuleConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<SarifRuleProperties>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRuleConfiguration {
    pub level: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRuleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "security-severity")]
    pub security_severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
    pub partial_fingerprints: SarifPartialFingerprints,
    pub properties: SarifResultProperties,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPhysicalLocation {
    pub artifact_location: SarifArtifactLocation,
    pub region: SarifRegion,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifArtifactLocation {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_base_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRegion {
    pub start_line: usize,
    pub start_column: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPartialFingerprints {
    #[serde(rename = "primaryLocationLineHash")]
    pub primary_location_line_hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifArtifact {
    pub location: SarifArtifactLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResultProperties {
    pub pattern: String,
    pub tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
}

pub struct SarifFormatter<'a> {
    registry: Option<&'a RuleRegistry>,
}

impl<'a> SarifFormatter<'a> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    pub fn with_registry(registry: &'a RuleRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn format(&self, findings: &[Finding]) -> String {
        let output = self.build_output(findings);
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn build_output(&self, findings: &[Finding]) -> SarifOutput {
        let reportable: Vec<&Finding> = findings
            .iter()
            .filter(|f| !f.hits.is_empty() || f.pattern_error.is_some())
            .collect();

        let rule_ids: BTreeSet<&str> = reportable.iter().map(|f| primary_rule_id(f)).collect();
        let rules = rule_ids.iter().map(|&id| self.build_rule(id)).collect();
        let results = reportable.iter().map(|f| self.convert_result(f)).collect();
        let artifacts = build_artifacts(&reportable);

        SarifOutput {
            schema: SARIF_SCHEMA,
            version: SARIF_VERSION,
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: "Oni",
                        semantic_version: env!("CARGO_PKG_VERSION"),
                        information_uri: Some("https://github.com/kzn-tools/oni"),
                        rules,
                    },
                },
                results,
                artifacts,
            }],
        }
    }

    fn build_rule(&self, rule_id: &str) -> SarifRule {
        if rule_id == INVALID_PATTERN_RULE {
            return SarifRule {
                id: INVALID_PATTERN_RULE.to_string(),
                name: None,
                short_description: SarifMessage {
                    text: "Pattern does not parse".to_string(),
                },
                full_description: Some(SarifMessage {
                    text: "The regex literal failed to parse and could not be analyzed."
                        .to_string(),
                }),
                help_uri: None,
                default_configuration: SarifRuleConfiguration {
                    level: "note".to_string(),
                },
                properties: None,
            };
        }

        if let Some(registry) = self.registry {
            if let Some(rule) = registry.get_rule(rule_id) {
                let metadata = rule.metadata();
                let (level, security_severity) = weight_to_sarif(metadata.weight);

                return SarifRule {
                    id: metadata.id.to_string(),
                    name: Some(metadata.name.to_string()),
                    short_description: SarifMessage {
                        text: metadata.name.to_string(),
                    },
                    full_description: Some(SarifMessage {
                        text: metadata.description.to_string(),
                    }),
                    help_uri: metadata.docs_url.map(|u| u.to_string()),
                    default_configuration: SarifRuleConfiguration { level },
                    properties: Some(SarifRuleProperties {
                        security_severity,
                        precision: Some("medium".to_string()),
                        tags: vec![
                            "security".to_string(),
                            "external/cwe/cwe-1333".to_string(),
                        ],
                    }),
                };
            }
        }

        SarifRule {
            id: rule_id.to_string(),
            name: None,
            short_description: SarifMessage {
                text: rule_id.to_string(),
            },
            full_description: None,
            help_uri: None,
            default_configuration: SarifRuleConfiguration {
                level: "warning".to_string(),
            },
            properties: None,
        }
    }

    fn convert_result(&self, finding: &Finding) -> SarifResult {
        let locations = vec![SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation {
                    uri: normalize_path(&finding.site.file),
                    uri_base_id: Some("%SRCROOT%".to_string()),
                },
                region: SarifRegion {
                    start_line: finding.site.line,
                    // Dumps carry no column information.
                    start_column: 1,
                },
            },
        }];

        let fingerprint =
            generate_fingerprint(&finding.site.file, finding.site.line, &finding.site.pattern);

        SarifResult {
            rule_id: primary_rule_id(finding).to_string(),
            level: result_level(finding).to_string(),
            message: SarifMessage {
                text: message_for(finding),
            },
            locations,
            partial_fingerprints: SarifPartialFingerprints {
                primary_location_line_hash: fingerprint,
            },
            properties: SarifResultProperties {
                pattern: finding.site.pattern.clone(),
                tier: finding.tier.as_str().to_string(),
                verdict: finding.verdict.map(|v| v.as_str().to_string()),
            },
        }
    }
}

impl Default for SarifFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn build_artifacts(findings: &[&Finding]) -> Vec<SarifArtifact> {
    let files: BTreeSet<&str> = findings.iter().map(|f| f.site.file.as_str()).collect();
    files
        .into_iter()
        .map(|file| SarifArtifact {
            location: SarifArtifactLocation {
                uri: normalize_path(file),
                uri_base_id: Some("%SRCROOT%".to_string()),
            },
        })
        .collect()
}

/// Hits are ordered by descending weight, so the first one names the result.
fn primary_rule_id(finding: &Finding) -> &str {
    if finding.pattern_error.is_some() {
        return INVALID_PATTERN_RULE;
    }
    finding
        .hits
        .first()
        .map(|h| h.rule_id)
        .unwrap_or(INVALID_PATTERN_RULE)
}

fn result_level(finding: &Finding) -> &'static str {
    if finding.pattern_error.is_some() {
        "note"
    } else if finding.is_confirmed() {
        "error"
    } else if finding.tier.is_suspicious() {
        "warning"
    } else {
        "note"
    }
}

fn weight_to_sarif(weight: u8) -> (String, Option<String>) {
    let (level, security_severity) = match weight {
        3 => ("error", "8.0"),
        2 => ("warning", "6.0"),
        _ => ("note", "3.0"),
    };
    (level.to_string(), Some(security_severity.to_string()))
}

fn message_for(finding: &Finding) -> String {
    let pattern = &finding.site.pattern;
    if let Some(error) = &finding.pattern_error {
        return format!("Regex `{pattern}` does not parse: {error}");
    }
    match (finding.verdict, &finding.evidence) {
        (Some(Verdict::Confirmed), Some(Evidence::Timeout { input_len, .. })) => format!(
            "Catastrophic backtracking confirmed for `{pattern}`: a trial timed out at input length {input_len}"
        ),
        (Some(Verdict::Confirmed), Some(Evidence::Growth { from_len, to_len, ratio })) => format!(
            "Catastrophic backtracking confirmed for `{pattern}`: match time grew {ratio:.1}x between input lengths {from_len} and {to_len}"
        ),
        (Some(Verdict::Confirmed), None) => {
            format!("Catastrophic backtracking confirmed for `{pattern}`")
        }
        (Some(Verdict::Inconclusive), _) => format!(
            "Regex `{pattern}` has a structure prone to catastrophic backtracking; not reproduced within budget"
        ),
        (None, _) => {
            format!("Regex `{pattern}` has a structure prone to catastrophic backtracking")
        }
    }
}

fn normalize_path(path: &str) -> String {
    path.trim_start_matches("./").to_string()
}

fn generate_fingerprint(file: &str, line: usize, pattern: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    file.hash(&mut hasher);
    line.hash(&mut hasher);
    pattern.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
