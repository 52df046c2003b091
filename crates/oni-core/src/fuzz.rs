//! Dynamic confirmation
//!
//! The fuzz driver probes one pattern with inputs of geometrically growing
//! length and watches how the match time scales. Two signals confirm a
//! vulnerability: a trial that blows its wall-clock budget outright, or a
//! pairwise duration growth ratio that exceeds the superlinear threshold
//! scaled by the length ratio. A timeout short-circuits the rest of the
//! schedule; nothing a longer input could show is stronger evidence.
//!
//! Lengths are probed shortest first so the cheap trials run before the
//! expensive ones and the growth sequence is well-ordered.

use crate::corpus::CorpusProvider;
use crate::sandbox::{TrialExecutor, TrialOutcome};
use std::time::{Duration, Instant};
use tracing::debug;

/// Tunables for the fuzz stage, built from `[fuzz]` config.
#[derive(Debug, Clone)]
pub struct FuzzSettings {
    /// Per-trial wall-clock budget.
    pub budget: Duration,
    /// First input length in the schedule.
    pub base_len: usize,
    /// Multiplier between consecutive lengths.
    pub growth_factor: usize,
    /// Number of lengths probed.
    pub steps: usize,
    /// Candidate inputs tried at each length.
    pub inputs_per_length: usize,
    /// Confirm when duration ratio > threshold x length ratio.
    pub superlinear_threshold: f64,
    /// Durations below this are scheduling noise, not signal.
    pub noise_floor: Duration,
}

impl Default for FuzzSettings {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(250),
            base_len: 64,
            growth_factor: 2,
            steps: 4,
            inputs_per_length: 3,
            superlinear_threshold: 1.5,
            noise_floor: Duration::from_millis(5),
        }
    }
}

/// One executed trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub input_len: usize,
    pub outcome: TrialOutcome,
}

/// Dynamic verdict for a fuzzed pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Catastrophic backtracking reproduced.
    Confirmed,
    /// The heuristic suspicion was not reproduced within budget. Not an
    /// exoneration.
    Inconclusive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Confirmed => "confirmed",
            Verdict::Inconclusive => "inconclusive",
        }
    }
}

/// Why a pattern was confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    Timeout { input_len: usize, budget: Duration },
    Growth { from_len: usize, to_len: usize, ratio: f64 },
}

/// Everything the fuzz stage learned about one pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzResult {
    pub verdict: Verdict,
    pub evidence: Option<Evidence>,
    pub trials: Vec<Trial>,
}

impl FuzzResult {
    fn inconclusive(trials: Vec<Trial>) -> Self {
        Self {
            verdict: Verdict::Inconclusive,
            evidence: None,
            trials,
        }
    }
}

/// Drives sandboxed trials for individual patterns.
pub struct FuzzDriver<'a> {
    settings: FuzzSettings,
    executor: &'a dyn TrialExecutor,
}

impl<'a> FuzzDriver<'a> {
    pub fn new(settings: FuzzSettings, executor: &'a dyn TrialExecutor) -> Self {
        Self { settings, executor }
    }

    /// The geometric length schedule, shortest first.
    pub fn lengths(&self) -> Vec<usize> {
        let mut lengths = Vec::with_capacity(self.settings.steps);
        let mut len = self.settings.base_len.max(1);
        for _ in 0..self.settings.steps {
            lengths.push(len);
            len = len.saturating_mul(self.settings.growth_factor.max(2));
        }
        lengths
    }

    /// Probes one pattern. `deadline` is the scan-global cutoff: trials not
    /// started before it are not started at all, and the pattern stays
    /// inconclusive rather than silently vanishing.
    pub fn probe_pattern(
        &self,
        pattern: &str,
        corpus: &dyn CorpusProvider,
        deadline: Option<Instant>,
    ) -> FuzzResult {
        let mut trials: Vec<Trial> = Vec::new();
        // Worst completed duration per length, for the growth test.
        let mut observed: Vec<(usize, Duration)> = Vec::new();

        for input_len in self.lengths() {
            let mut worst: Option<Duration> = None;
            for attempt in 0..self.settings.inputs_per_length.max(1) {
                let Some(input) = corpus.next_input(input_len, attempt) else {
                    if attempt == 0 && trials.is_empty() {
                        debug!(pattern, input_len, "corpus exhausted before any trial");
                        return FuzzResult::inconclusive(trials);
                    }
                    break;
                };
                let Some(budget) = effective_budget(self.settings.budget, deadline) else {
                    debug!(pattern, "scan deadline reached, abandoning remaining trials");
                    return FuzzResult::inconclusive(trials);
                };

                let outcome = self.executor.execute(pattern, &input, budget);
                trials.push(Trial {
                    input_len,
                    outcome: outcome.clone(),
                });
                match outcome {
                    TrialOutcome::TimedOut { budget } => {
                        // Already-maximal evidence; the longer lengths have
                        // nothing to add.
                        return FuzzResult {
                            verdict: Verdict::Confirmed,
                            evidence: Some(Evidence::Timeout { input_len, budget }),
                            trials,
                        };
                    }
                    TrialOutcome::Completed { duration, .. } => {
                        worst = Some(worst.map_or(duration, |w| w.max(duration)));
                    }
                    TrialOutcome::Invalid { .. } => {
                        return FuzzResult::inconclusive(trials);
                    }
                    TrialOutcome::Crashed { .. } => {
                        // Keep probing; the crash stays visible in the
                        // trial list.
                    }
                }
            }
            if let Some(duration) = worst {
                observed.push((input_len, duration));
            }
        }

        if let Some(evidence) = self.growth_evidence(&observed) {
            return FuzzResult {
                verdict: Verdict::Confirmed,
                evidence: Some(evidence),
                trials,
            };
        }
        FuzzResult::inconclusive(trials)
    }

    /// Compares consecutive completed lengths. Durations under the noise
    /// floor are ignored; a fast trial proves nothing either way.
    fn growth_evidence(&self, observed: &[(usize, Duration)]) -> Option<Evidence> {
        for pair in observed.windows(2) {
            let (from_len, from_duration) = pair[0];
            let (to_len, to_duration) = pair[1];
            if to_duration < self.settings.noise_floor {
                continue;
            }
            let floor = Duration::from_micros(50);
            let ratio = to_duration.as_secs_f64() / from_duration.max(floor).as_secs_f64();
            let length_ratio = to_len as f64 / from_len.max(1) as f64;
            if ratio > self.settings.superlinear_threshold * length_ratio {
                return Some(Evidence::Growth {
                    from_len,
                    to_len,
                    ratio,
                });
            }
        }
        None
    }
}

fn effective_budget(budget: Duration, deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        None => Some(budget),
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                None
            } else {
                Some(budget.min(deadline - now))
            }
        }
    }
}
