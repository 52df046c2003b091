//! R003: unbounded repetition of a group that can match the empty string

use crate::declare_rule;
use crate::rules::helpers;
use crate::rules::{PatternRule, RuleHit, RuleMetadata};
use regex_syntax::hir::{Hir, HirKind};

declare_rule! {
    pub EmptyRepeatRule,
    id = "R003",
    name = "empty-repeat",
    description = "Unbounded repetition of a subexpression that can match the empty string",
    weight = 2,
    docs_url = "https://kzn-tools.github.io/oni/rules/R003",
    examples = r#"# flagged
(a?)*
(a|)+x
(a|a?)+

# clean
(a?){3}
(ab)+"#
}

impl PatternRule for EmptyRepeatRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    /// Fires when an unbounded loop's body is nullable. Every position then
    /// admits both a consuming and a non-consuming iteration, which inflates
    /// the number of distinct backtracking states. Bodies that consume
    /// nothing at all (pure anchors) are ignored.
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
            if helpers::matches_empty(&rep.sub) && rep.sub.properties().maximum_len() != Some(0) {
                hit = Some(RuleHit::new(
                    self.metadata.id,
                    self.metadata.weight,
                    "repeated subexpression can match the empty string",
                ));
            }
        });
        hit
    }
}
