//! R001: unbounded repetition nested inside another unbounded repetition

use crate::declare_rule;
use crate::rules::helpers;
use crate::rules::{PatternRule, RuleHit, RuleMetadata};
use regex_syntax::hir::{Hir, HirKind, Repetition};

declare_rule! {
    pub NestedRepetitionRule,
    id = "R001",
    name = "nested-repetition",
    description = "Unbounded repetition nested inside another unbounded repetition over the same characters",
    weight = 3,
    docs_url = "https://kzn-tools.github.io/oni/rules/R001",
    examples = r#"# flagged
(a+)+
([a-z]*)*$

# clean
(ab+)+
(a{1,3}){1,3}"#
}

impl PatternRule for NestedRepetitionRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    /// Fires when some unbounded repetition contains, at any depth, another
    /// unbounded repetition whose first set lies inside the enclosing body's
    /// first set. The same run of input can then be split between the two
    /// loops in exponentially many ways.
    fn check(&self, hir: &Hir) -> Option<RuleHit> {
        let mut outers: Vec<&Repetition> = Vec::new();
        helpers::for_each(hir, |node| {
            if let HirKind::Repetition(rep) = node.kind() {
                if helpers::is_unbounded(rep) {
                    outers.push(rep);
                }
            }
        });

        for outer in outers {
            let outer_first = helpers::first_set(&outer.sub);
            let mut inners: Vec<&Repetition> = Vec::new();
            helpers::for_each(&outer.sub, |node| {
                if let HirKind::Repetition(rep) = node.kind() {
                    if helpers::is_unbounded(rep) {
                        inners.push(rep);
                    }
                }
            });
            for inner in inners {
                let inner_first = helpers::first_set(&inner.sub);
                if inner_first.ranges().is_empty() {
                    continue;
                }
                if helpers::is_subset(&inner_first, &outer_first) {
                    return Some(RuleHit::new(
                        self.metadata.id,
                        self.metadata.weight,
                        "nested unbounded repetitions compete for the same input characters",
                    ));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pattern: &str) -> Option<RuleHit> {
        let hir = regex_syntax::Parser::new().parse(pattern).unwrap();
        NestedRepetitionRule::new().check(&hir)
    }

    #[test]
    fn detects_classic_nested_plus() {
        assert!(check("(a+)+").is_some());
    }

    #[test]
    fn detects_star_over_group_star() {
        assert!(check("([a-z]*)*").is_some());
    }

    #[test]
    fn detects_non_capturing_nesting() {
        assert!(check("(?:x+)+y").is_some());
    }

    #[test]
    fn detects_inner_subset_of_outer() {
        assert!(check("([ab]+c?)+").is_some());
    }

    #[test]
    fn detects_lazy_outer_repetition() {
        // Laziness changes exploration order, not the amount of ambiguity.
        assert!(check("(a+)+?").is_some());
    }

    #[test]
    fn no_false_positive_on_disjoint_prefix() {
        // Every iteration of the outer group must start with 'a', so runs
        // of 'b' cannot be redistributed between the loops.
        assert!(check("(ab+)+").is_none());
    }

    #[test]
    fn no_false_positive_on_bounded_repetition() {
        assert!(check("(a{1,3}){1,3}").is_none());
    }

    #[test]
    fn no_false_positive_on_single_repetition() {
        assert!(check("a+").is_none());
        assert!(check("^[a-z]+$").is_none());
    }

    #[test]
    fn no_false_positive_on_disjoint_classes() {
        assert!(check("([a-c]x+)+y").is_none());
    }
}
