//! Shared analysis over parsed patterns
//!
//! Rules reason about the set of characters a subexpression can start with
//! (its first set) and about containment between those sets. Everything here
//! works on the parsed `Hir` from regex-syntax; flags like case-insensitivity
//! are already folded into classes by the time rules see the tree.

use crate::rules::AttackPlan;
use regex_syntax::hir::{Class, ClassUnicode, ClassUnicodeRange, Hir, HirKind, Repetition};

/// Visits every node of the tree in document order, without recursion.
pub fn for_each<'h, F: FnMut(&'h Hir)>(hir: &'h Hir, mut f: F) {
    let mut work: Vec<&'h Hir> = vec![hir];
    while let Some(node) = work.pop() {
        f(node);
        match node.kind() {
            HirKind::Repetition(rep) => work.push(&rep.sub),
            HirKind::Capture(cap) => work.push(&cap.sub),
            HirKind::Concat(parts) | HirKind::Alternation(parts) => {
                work.extend(parts.iter().rev());
            }
            _ => {}
        }
    }
}

/// The set of characters a match of `hir` can begin with.
pub fn first_set(hir: &Hir) -> ClassUnicode {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => ClassUnicode::empty(),
        HirKind::Literal(lit) => {
            let mut set = ClassUnicode::empty();
            if let Some(ch) = first_literal_char(&lit.0) {
                set.push(ClassUnicodeRange::new(ch, ch));
            }
            set
        }
        HirKind::Class(class) => unicode_class(class),
        HirKind::Repetition(rep) => first_set(&rep.sub),
        HirKind::Capture(cap) => first_set(&cap.sub),
        HirKind::Concat(parts) => {
            let mut set = ClassUnicode::empty();
            for part in parts {
                set.union(&first_set(part));
                if !matches_empty(part) {
                    break;
                }
            }
            set
        }
        HirKind::Alternation(parts) => {
            let mut set = ClassUnicode::empty();
            for part in parts {
                set.union(&first_set(part));
            }
            set
        }
    }
}

/// Whether `hir` can match the empty string.
pub fn matches_empty(hir: &Hir) -> bool {
    hir.properties().minimum_len() == Some(0)
}

/// Whether the repetition has no upper bound.
pub fn is_unbounded(rep: &Repetition) -> bool {
    rep.max.is_none()
}

/// Whether the two sets share at least one character.
pub fn overlaps(a: &ClassUnicode, b: &ClassUnicode) -> bool {
    let mut i = a.clone();
    i.intersect(b);
    !i.ranges().is_empty()
}

/// Whether every character of `inner` is also in `outer`.
pub fn is_subset(inner: &ClassUnicode, outer: &ClassUnicode) -> bool {
    let mut i = inner.clone();
    i.intersect(outer);
    i.ranges() == inner.ranges()
}

pub fn class_contains(class: &ClassUnicode, ch: char) -> bool {
    class
        .ranges()
        .iter()
        .any(|r| r.start() <= ch && ch <= r.end())
}

/// Number of scalar values in the set.
pub fn class_size(class: &ClassUnicode) -> u64 {
    class
        .ranges()
        .iter()
        .map(|r| u64::from(r.end() as u32) - u64::from(r.start() as u32) + 1)
        .sum()
}

/// Every character the pattern can consume anywhere, used to pick a poison
/// character the pattern cannot absorb.
pub fn alphabet(hir: &Hir) -> ClassUnicode {
    let mut set = ClassUnicode::empty();
    for_each(hir, |node| match node.kind() {
        HirKind::Literal(lit) => {
            if let Ok(text) = std::str::from_utf8(&lit.0) {
                for ch in text.chars() {
                    set.push(ClassUnicodeRange::new(ch, ch));
                }
            }
        }
        HirKind::Class(class) => set.union(&unicode_class(class)),
        _ => {}
    });
    set
}

/// Derives an adversarial input recipe from the first unbounded repetition.
///
/// The pump comes from the repetition's first set. The poison is a character
/// the whole pattern cannot consume, so an input ending in it forces the
/// match to fail and backtrack; when the pattern accepts every candidate, no
/// poison exists and the recipe is pump-only.
pub fn attack_plan(hir: &Hir) -> Option<AttackPlan> {
    let mut reps: Vec<&Repetition> = Vec::new();
    for_each(hir, |node| {
        if let HirKind::Repetition(rep) = node.kind() {
            if is_unbounded(rep) {
                reps.push(rep);
            }
        }
    });

    let full = alphabet(hir);
    for rep in reps {
        let set = first_set(&rep.sub);
        let Some(pump) = pick_pump(&set) else {
            continue;
        };
        return Some(AttackPlan {
            pump,
            poison: pick_poison(&full),
        });
    }
    None
}

fn pick_pump(set: &ClassUnicode) -> Option<char> {
    for candidate in ['a', '0', 'x', ' '] {
        if class_contains(set, candidate) {
            return Some(candidate);
        }
    }
    set.ranges().first().map(|r| r.start())
}

fn pick_poison(alphabet: &ClassUnicode) -> Option<char> {
    ['!', '\n', '#', '~', '\u{1}']
        .into_iter()
        .find(|&c| !class_contains(alphabet, c))
}

fn first_literal_char(bytes: &[u8]) -> Option<char> {
    std::str::from_utf8(bytes).ok().and_then(|s| s.chars().next())
}

fn unicode_class(class: &Class) -> ClassUnicode {
    match class {
        Class::Unicode(c) => c.clone(),
        // The default parser only produces unicode classes; approximate the
        // byte form with its ASCII portion if it ever shows up.
        Class::Bytes(b) => {
            let mut set = ClassUnicode::empty();
            for r in b.ranges() {
                let start = r.start().min(0x7f) as char;
                let end = r.end().min(0x7f) as char;
                set.push(ClassUnicodeRange::new(start, end));
            }
            set
        }
    }
}
