//! Scan orchestration
//!
//! [`ScanEngine`] runs the full pipeline: extract pattern sites, classify
//! each one, fuzz the suspicious ones through a [`TrialExecutor`], and
//! assemble the ordered report. Patterns are fuzzed in parallel; the trials
//! of any single pattern stay strictly sequential so its growth sequence is
//! well-ordered.

use crate::ast::SourceTree;
use crate::config::Config;
use crate::corpus::DefaultCorpus;
use crate::extract::{Extractor, PatternSite};
use crate::fuzz::{FuzzDriver, FuzzSettings};
use crate::report::{FileError, Finding, ScanReport, ScanStats};
use crate::rules::{Classification, RuleRegistry};
use crate::sandbox::TrialExecutor;
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

pub struct ScanEngine {
    extractor: Extractor,
    registry: RuleRegistry,
    settings: FuzzSettings,
    seed: u64,
}

impl ScanEngine {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let mut registry = RuleRegistry::new();
        registry.configure(&config.rules);
        Self {
            extractor: Extractor::new(&config.extract),
            registry,
            settings: config.fuzz.settings(),
            seed: config.fuzz.seed,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// The static half of the pipeline for one file.
    pub fn extract_and_classify(&self, tree: &SourceTree) -> Vec<(PatternSite, Classification)> {
        self.extractor
            .extract(tree)
            .into_iter()
            .map(|site| {
                let classification = self.registry.classify(&site.pattern);
                (site, classification)
            })
            .collect()
    }

    /// Heuristics only; no trial ever runs.
    pub fn scan_static(&self, trees: &[SourceTree], file_errors: Vec<FileError>) -> ScanReport {
        self.scan_inner(trees, file_errors, None, None)
    }

    /// Full scan with dynamic confirmation of suspicious sites.
    pub fn scan(
        &self,
        trees: &[SourceTree],
        file_errors: Vec<FileError>,
        executor: &dyn TrialExecutor,
        deadline: Option<Instant>,
    ) -> ScanReport {
        self.scan_inner(trees, file_errors, Some(executor), deadline)
    }

    fn scan_inner(
        &self,
        trees: &[SourceTree],
        file_errors: Vec<FileError>,
        executor: Option<&dyn TrialExecutor>,
        deadline: Option<Instant>,
    ) -> ScanReport {
        let classified: Vec<(PatternSite, Classification)> = trees
            .iter()
            .flat_map(|tree| self.extract_and_classify(tree))
            .collect();

        let mut stats = ScanStats {
            files: trees.len(),
            sites: classified.len(),
            suspicious: classified
                .iter()
                .filter(|(_, c)| c.tier.is_suspicious() && c.error.is_none())
                .count(),
            fuzzed: 0,
        };
        debug!(
            files = stats.files,
            sites = stats.sites,
            suspicious = stats.suspicious,
            "classification complete"
        );

        let findings: Vec<Finding> = match executor {
            None => classified
                .into_iter()
                .map(|(site, c)| static_finding(site, c))
                .collect(),
            Some(executor) => {
                let driver = FuzzDriver::new(self.settings.clone(), executor);
                let seed = self.seed;
                classified
                    .into_par_iter()
                    .map(|(site, classification)| {
                        if classification.error.is_some() || !classification.tier.is_suspicious() {
                            return static_finding(site, classification);
                        }
                        let corpus = DefaultCorpus::new(
                            mix_seed(seed, &site.pattern),
                            &site.pattern,
                            classification.attack.as_ref(),
                        );
                        let result = driver.probe_pattern(&site.pattern, &corpus, deadline);
                        Finding {
                            site,
                            tier: classification.tier,
                            hits: classification.hits,
                            verdict: Some(result.verdict),
                            evidence: result.evidence,
                            trials: result.trials,
                            pattern_error: None,
                        }
                    })
                    .collect()
            }
        };

        stats.fuzzed = findings.iter().filter(|f| f.verdict.is_some()).count();
        ScanReport::assemble(findings, file_errors, stats)
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn static_finding(site: PatternSite, classification: Classification) -> Finding {
    Finding {
        site,
        tier: classification.tier,
        hits: classification.hits,
        verdict: None,
        evidence: None,
        trials: Vec::new(),
        pattern_error: classification.error,
    }
}

/// FNV-1a over the pattern folded into the scan seed, so every pattern gets
/// its own corpus stream while the whole scan stays reproducible.
fn mix_seed(seed: u64, pattern: &str) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in pattern.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash ^ seed
}
