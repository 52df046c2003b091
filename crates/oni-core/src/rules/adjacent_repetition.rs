//! R002: adjacent unbounded repetitions with overlapping character sets

use crate::declare_rule;
use crate::rules::helpers;
use crate::rules::{PatternRule, RuleHit, RuleMetadata};
use regex_syntax::hir::{Hir, HirKind, Repetition};

declare_rule! {
    pub AdjacentRepetitionRule,
    id = "R002",
    name = "adjacent-repetition",
    description = "Adjacent unbounded repetitions that accept overlapping characters",
    weight = 2,
    docs_url = "https://kzn-tools.github.io/oni/rules/R002",
    examples = r#"# flagged
a+a+b
\d+[0-9]*;

# clean
a+b+
[a-f]+[g-z]+"#
}

impl PatternRule for AdjacentRepetitionRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    /// Fires when two unbounded repetitions sit next to each other in a
    /// concatenation and can consume the same characters. A run of shared
    /// characters has quadratically many split points between the two loops,
    /// all of which get explored when the overall match fails.
    fn check(&self, hir: &Hir) -> Option<RuleHit> {
        let mut hit = None;
        helpers::for_each(hir, |node| {
            if hit.is_some() {
                return;
            }
            let HirKind::Concat(parts) = node.kind() else {
                return;
            };
            for pair in parts.windows(2) {
                let (Some(left), Some(right)) = (tail_repetition(&pair[0]), head_repetition(&pair[1]))
                else {
                    continue;
                };
                let left_first = helpers::first_set(&left.sub);
                let right_first = helpers::first_set(&right.sub);
                if helpers::overlaps(&left_first, &right_first) {
                    hit = Some(RuleHit::new(
                        self.metadata.id,
                        self.metadata.weight,
                        "adjacent unbounded repetitions accept the same characters at their boundary",
                    ));
                    return;
                }
            }
        });
        hit
    }
}

/// The unbounded repetition an expression ends with, looking through groups.
fn tail_repetition<'h>(hir: &'h Hir) -> Option<&'h Repetition> {
    match hir.kind() {
        HirKind::Repetition(rep) if helpers::is_unbounded(rep) => Some(rep),
        HirKind::Capture(cap) => tail_repetition(&cap.sub),
        HirKind::Concat(parts) => parts.last().and_then(tail_repetition),
        _ => None,
    }
}

/// The unbounded repetition an expression starts with.
fn head_repetition<'h>(hir: &'h Hir) -> Option<&'h Repetition> {
    match hir.kind() {
        HirKind::Repetition(rep) if helpers::is_unbounded(rep) => Some(rep),
        HirKind::Capture(cap) => head_repetition(&cap.sub),
        HirKind::Concat(parts) => parts.first().and_then(head_repetition),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pattern: &str) -> Option<RuleHit> {
        let hir = regex_syntax::Parser::new().parse(pattern).unwrap();
        AdjacentRepetitionRule::new().check(&hir)
    }

    #[test]
    fn detects_duplicate_adjacent_plus() {
        assert!(check("a+a+").is_some());
    }

    #[test]
    fn detects_overlapping_classes() {
        assert!(check(r"\d+[0-9]+;").is_some());
    }

    #[test]
    fn detects_adjacency_through_groups() {
        assert!(check("(a+)(a*)$").is_some());
    }

    #[test]
    fn detects_star_then_plus() {
        assert!(check(r"\s*\s+").is_some());
    }

    #[test]
    fn detects_wildcard_before_word_run() {
        assert!(check(r".*\w+").is_some());
    }

    #[test]
    fn no_false_positive_on_disjoint_runs() {
        assert!(check("a+b+").is_none());
        assert!(check("[a-f]+[g-z]+").is_none());
    }

    #[test]
    fn no_false_positive_with_separator() {
        assert!(check("a+-a+").is_none());
    }

    #[test]
    fn no_false_positive_on_bounded_repetitions() {
        assert!(check("a{1,3}a{1,3}").is_none());
    }

    #[test]
    fn no_false_positive_on_single_run() {
        assert!(check("^a+$").is_none());
    }
}
