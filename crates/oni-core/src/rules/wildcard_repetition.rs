//! R004: unbounded repetition over a near-universal character class

use crate::declare_rule;
use crate::rules::helpers;
use crate::rules::{PatternRule, RuleHit, RuleMetadata};
use regex_syntax::hir::{Hir, HirKind};

/// Classes at least this large count as wildcard-like. Plain ASCII ranges
/// stay below it; `.`, `\w`, `\S` and friends are far above it.
const BROAD_CLASS_MIN: u64 = 1_000;

declare_rule! {
    pub WildcardRepetitionRule,
    id = "R004",
    name = "wildcard-repetition",
    description = "Unbounded repetition over a near-universal character class",
    weight = 1,
    docs_url = "https://kzn-tools.github.io/oni/rules/R004",
    examples = r#"# flagged
.*
^.+$
\w+

# clean
[a-z]+
.{1,40}"#
}

impl PatternRule for WildcardRepetitionRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    /// A weak signal on its own. Wildcard runs are harmless in isolation but
    /// are the usual fuel when combined with the stronger shapes, and they
    /// dominate scan time in confirmed incidents.
    fn check(&self, hir: &Hir) -> Option<RuleHit> {
        let mut hit = None;
        helpers::for_each(hir, |node| {
            if hit.is_some() {
                return;
            }
            let HirKind::Repetition(rep) = node.kind() else {
                return;
            };
            if !helpers::is_unbounded(rep) {
                return;
            }
            if helpers::class_size(&helpers::first_set(&rep.sub)) >= BROAD_CLASS_MIN {
                hit = Some(RuleHit::new(
                    self.metadata.id,
                    self.metadata.weight,
                    "unbounded repetition over a near-universal character class",
                ));
            }
        });
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pattern: &str) -> Option<RuleHit> {
        let hir = regex_syntax::Parser::new().parse(pattern).unwrap();
        WildcardRepetitionRule::new().check(&hir)
    }

    #[test]
    fn detects_dot_star() {
        assert!(check(".*").is_some());
    }

    #[test]
    fn detects_anchored_dot_plus() {
        assert!(check("^.+$").is_some());
    }

    #[test]
    fn detects_word_class_run() {
        assert!(check(r"\w+").is_some());
    }

    #[test]
    fn no_false_positive_on_narrow_class() {
        assert!(check("[a-z]+").is_none());
        assert!(check("[0-9a-f]*").is_none());
    }

    #[test]
    fn no_false_positive_on_bounded_wildcard() {
        assert!(check(".{1,40}").is_none());
    }
}
