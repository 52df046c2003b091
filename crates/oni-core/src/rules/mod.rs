//! Heuristic pattern rules
//!
//! Every extracted pattern is parsed once and handed to each registered
//! rule. Rules inspect the parsed structure and report a hit when they see a
//! shape associated with catastrophic backtracking. Hits are weighted by
//! structural specificity and folded into a [`RiskTier`]; only medium and
//! high tiers are handed to the fuzz driver for dynamic confirmation.

pub mod adjacent_repetition;
pub mod empty_repeat;
pub mod helpers;
pub mod nested_repetition;
pub mod wildcard_repetition;

use crate::config::RulesConfig;
use regex_syntax::hir::Hir;
use std::collections::HashSet;

/// Static risk assigned to a pattern by the heuristic stage.
///
/// Tiers are ordered; adding hits can only raise the tier, never lower it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskTier {
    None,
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Suspicious tiers are the ones worth spending fuzz budget on.
    pub fn is_suspicious(&self) -> bool {
        *self >= RiskTier::Medium
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::None => "none",
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Static metadata describing a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMetadata {
    /// Stable identifier, e.g. "R001".
    pub id: &'static str,
    /// Human-readable kebab-case name, e.g. "nested-repetition".
    pub name: &'static str,
    /// One-line description of what the rule detects.
    pub description: &'static str,
    /// Structural specificity. Drives tier derivation: 3 is a direct
    /// exponential shape, 2 an ambiguity that is usually polynomial, 1 a
    /// weak hint.
    pub weight: u8,
    /// Optional URL to documentation.
    pub docs_url: Option<&'static str>,
    /// Optional flagged/clean pattern examples.
    pub examples: Option<&'static str>,
}

/// One rule firing on a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub rule_id: &'static str,
    pub weight: u8,
    pub detail: String,
}

impl RuleHit {
    pub fn new(rule_id: &'static str, weight: u8, detail: impl Into<String>) -> Self {
        Self {
            rule_id,
            weight,
            detail: detail.into(),
        }
    }
}

/// Pump and poison characters for building adversarial inputs.
///
/// The pump character is repeated to drive the suspect repetition; the
/// poison, when one exists, is appended so the overall match is forced to
/// fail and backtrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackPlan {
    pub pump: char,
    pub poison: Option<char>,
}

/// The heuristic stage's verdict on a single pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: RiskTier,
    /// Hits ordered by descending weight, then rule id.
    pub hits: Vec<RuleHit>,
    /// Input recipe for the fuzz stage, derived from the parsed structure.
    pub attack: Option<AttackPlan>,
    /// Set when the pattern does not parse. Such patterns are never fuzzed
    /// and are reported separately.
    pub error: Option<String>,
}

impl Classification {
    fn invalid(message: String) -> Self {
        Self {
            tier: RiskTier::None,
            hits: Vec::new(),
            attack: None,
            error: Some(message),
        }
    }
}

/// Trait implemented by all pattern rules.
pub trait PatternRule: Send + Sync {
    /// Returns the rule's metadata.
    fn metadata(&self) -> &RuleMetadata;

    /// Checks a parsed pattern, returning a hit when the rule fires.
    fn check(&self, hir: &Hir) -> Option<RuleHit>;
}

/// Declares a rule struct with its metadata.
///
/// The `check` logic is implemented separately via the [`PatternRule`] trait.
#[macro_export]
macro_rules! declare_rule {
    (
        $vis:vis $rule:ident,
        id = $id:literal,
        name = $name:literal,
        description = $description:literal,
        weight = $weight:literal
        $(, docs_url = $docs_url:literal)?
        $(, examples = $examples:literal)?
    ) => {
        $vis struct $rule {
            metadata: $crate::rules::RuleMetadata,
        }

        impl $rule {
            pub fn new() -> Self {
                Self {
                    metadata: $crate::rules::RuleMetadata {
                        id: $id,
                        name: $name,
                        description: $description,
                        weight: $weight,
                        docs_url: $crate::declare_rule!(@docs_url $($docs_url)?),
                        examples: $crate::declare_rule!(@examples $($examples)?),
                    },
                }
            }
        }

        impl Default for $rule {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    (@docs_url $url:literal) => { Some($url) };
    (@docs_url) => { None };
    (@examples $ex:literal) => { Some($ex) };
    (@examples) => { None };
}

/// Registry of all pattern rules.
pub struct RuleRegistry {
    rules: Vec<Box<dyn PatternRule>>,
    disabled: HashSet<String>,
}

impl RuleRegistry {
    /// Creates a registry with all built-in rules registered.
    pub fn new() -> Self {
        let mut registry = Self {
            rules: Vec::new(),
            disabled: HashSet::new(),
        };
        registry.register(Box::new(nested_repetition::NestedRepetitionRule::new()));
        registry.register(Box::new(adjacent_repetition::AdjacentRepetitionRule::new()));
        registry.register(Box::new(empty_repeat::EmptyRepeatRule::new()));
        registry.register(Box::new(wildcard_repetition::WildcardRepetitionRule::new()));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn PatternRule>) {
        self.rules.push(rule);
    }

    /// Applies rule config. Disabled rules stay registered (so `explain`
    /// still finds them) but never fire.
    pub fn configure(&mut self, config: &RulesConfig) {
        self.disabled = config.disabled.iter().cloned().collect();
    }

    pub fn is_rule_enabled(&self, id: &str) -> bool {
        !self.disabled.contains(id)
            && !self
                .rules
                .iter()
                .any(|r| r.metadata().id == id && self.disabled.contains(r.metadata().name))
    }

    pub fn get_rule(&self, id: &str) -> Option<&dyn PatternRule> {
        self.rules
            .iter()
            .find(|r| r.metadata().id == id)
            .map(|r| r.as_ref())
    }

    pub fn get_rule_by_name(&self, name: &str) -> Option<&dyn PatternRule> {
        self.rules
            .iter()
            .find(|r| r.metadata().name == name)
            .map(|r| r.as_ref())
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn PatternRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parses a pattern and runs every enabled rule over it.
    ///
    /// Patterns that fail to parse come back with an error and an empty hit
    /// list; they are structurally invalid and must not reach the fuzzer.
    pub fn classify(&self, pattern: &str) -> Classification {
        let mut parser = regex_syntax::Parser::new();
        let hir = match parser.parse(pattern) {
            Ok(hir) => hir,
            Err(e) => return Classification::invalid(e.to_string()),
        };

        let mut hits: Vec<RuleHit> = self
            .rules
            .iter()
            .filter(|r| self.is_rule_enabled(r.metadata().id))
            .filter_map(|r| r.check(&hir))
            .collect();
        hits.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.rule_id.cmp(b.rule_id)));

        let tier = derive_tier(&hits);
        let attack = if tier.is_suspicious() {
            helpers::attack_plan(&hir)
        } else {
            None
        };

        Classification {
            tier,
            hits,
            attack,
            error: None,
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds weighted hits into a tier. Monotonic: a superset of hits never maps
/// to a lower tier.
fn derive_tier(hits: &[RuleHit]) -> RiskTier {
    let max_weight = hits.iter().map(|h| h.weight).max().unwrap_or(0);
    let strong_hits = hits.iter().filter(|h| h.weight >= 2).count();
    match max_weight {
        0 => RiskTier::None,
        1 => RiskTier::Low,
        2 if strong_hits >= 2 => RiskTier::High,
        2 => RiskTier::Medium,
        _ => RiskTier::High,
    }
}
