//! Fuzz input generation
//!
//! Inputs come from a [`CorpusProvider`]. Providers are stateless: an input
//! is a pure function of (seed, target length, attempt), so a scan with a
//! fixed seed reproduces byte-identical trials regardless of worker
//! scheduling.

use crate::rules::AttackPlan;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of candidate inputs for one pattern.
pub trait CorpusProvider: Sync {
    /// Returns the input for the given attempt at the given target length,
    /// or `None` when the provider has nothing more to offer there.
    fn next_input(&self, target_len: usize, attempt: usize) -> Option<String>;
}

/// Crafted adversarial inputs from a classifier attack plan: a run of the
/// pump character, with the poison appended when one exists so the match is
/// forced to fail at the very end.
#[derive(Debug, Clone)]
pub struct AttackCorpus {
    pump: char,
    poison: Option<char>,
}

impl AttackCorpus {
    pub fn from_plan(plan: &AttackPlan) -> Self {
        Self {
            pump: plan.pump,
            poison: plan.poison,
        }
    }
}

impl CorpusProvider for AttackCorpus {
    fn next_input(&self, target_len: usize, attempt: usize) -> Option<String> {
        if attempt > 0 {
            return None;
        }
        let pump_len = match self.poison {
            Some(_) => target_len.saturating_sub(1),
            None => target_len,
        };
        let mut input = String::with_capacity(target_len * 4);
        for _ in 0..pump_len {
            input.push(self.pump);
        }
        if let Some(poison) = self.poison {
            input.push(poison);
        }
        Some(input)
    }
}

/// Seeded random inputs over an alphabet sampled from the pattern text,
/// so generated candidates actually make progress into the pattern instead
/// of failing at the first character.
#[derive(Debug, Clone)]
pub struct SeededCorpus {
    seed: u64,
    alphabet: Vec<char>,
}

impl SeededCorpus {
    pub fn new(seed: u64, pattern: &str) -> Self {
        let mut alphabet: Vec<char> = pattern.chars().filter(|c| c.is_alphanumeric()).collect();
        alphabet.sort_unstable();
        alphabet.dedup();
        if alphabet.is_empty() {
            alphabet.extend(['a', 'b', '0', '1']);
        }
        // Characters most patterns reject, so random inputs can also fail.
        alphabet.extend(['!', '\n']);
        Self { seed, alphabet }
    }
}

impl CorpusProvider for SeededCorpus {
    fn next_input(&self, target_len: usize, attempt: usize) -> Option<String> {
        let mut rng = StdRng::seed_from_u64(mix(self.seed, target_len as u64, attempt as u64));
        Some(
            (0..target_len)
                .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
                .collect(),
        )
    }
}

/// The scan's standard composition: the crafted input first, seeded random
/// fill for the remaining attempts.
#[derive(Debug, Clone)]
pub struct DefaultCorpus {
    attack: Option<AttackCorpus>,
    random: SeededCorpus,
}

impl DefaultCorpus {
    pub fn new(seed: u64, pattern: &str, plan: Option<&AttackPlan>) -> Self {
        Self {
            attack: plan.map(AttackCorpus::from_plan),
            random: SeededCorpus::new(seed, pattern),
        }
    }
}

impl CorpusProvider for DefaultCorpus {
    fn next_input(&self, target_len: usize, attempt: usize) -> Option<String> {
        if attempt == 0 {
            if let Some(attack) = &self.attack {
                return attack.next_input(target_len, 0);
            }
        }
        self.random.next_input(target_len, attempt)
    }
}

/// Splitmix-style combiner; keeps per-length streams decorrelated without
/// any shared state.
fn mix(seed: u64, a: u64, b: u64) -> u64 {
    let mut x = seed
        .wrapping_add(a.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(b.wrapping_mul(0xBF58_476D_1CE4_E5B9));
    x ^= x >> 30;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_corpus_builds_pump_and_poison() {
        let corpus = AttackCorpus::from_plan(&AttackPlan {
            pump: 'a',
            poison: Some('!'),
        });
        let input = corpus.next_input(8, 0).unwrap();
        assert_eq!(input, "aaaaaaa!");
        assert!(corpus.next_input(8, 1).is_none());
    }

    #[test]
    fn attack_corpus_without_poison_is_pump_only() {
        let corpus = AttackCorpus::from_plan(&AttackPlan {
            pump: 'x',
            poison: None,
        });
        assert_eq!(corpus.next_input(4, 0).unwrap(), "xxxx");
    }

    #[test]
    fn seeded_corpus_is_deterministic() {
        let a = SeededCorpus::new(42, "(a+)+");
        let b = SeededCorpus::new(42, "(a+)+");
        for attempt in 0..4 {
            assert_eq!(a.next_input(32, attempt), b.next_input(32, attempt));
        }
    }

    #[test]
    fn seeded_corpus_varies_with_seed_and_attempt() {
        let a = SeededCorpus::new(1, "(a+)+");
        let b = SeededCorpus::new(2, "(a+)+");
        assert_ne!(a.next_input(64, 0), b.next_input(64, 0));
        assert_ne!(a.next_input(64, 0), a.next_input(64, 1));
    }

    #[test]
    fn seeded_corpus_respects_target_length() {
        let corpus = SeededCorpus::new(7, "[0-9]+");
        assert_eq!(corpus.next_input(256, 0).unwrap().chars().count(), 256);
    }

    #[test]
    fn default_corpus_serves_attack_first_then_random() {
        let plan = AttackPlan {
            pump: 'a',
            poison: Some('!'),
        };
        let corpus = DefaultCorpus::new(3, "(a+)+", Some(&plan));
        assert_eq!(corpus.next_input(6, 0).unwrap(), "aaaaa!");
        let second = corpus.next_input(6, 1).unwrap();
        assert_eq!(second.chars().count(), 6);
    }

    #[test]
    fn default_corpus_without_plan_is_all_random() {
        let corpus = DefaultCorpus::new(3, "abc", None);
        let first = corpus.next_input(10, 0).unwrap();
        assert_eq!(first.chars().count(), 10);
    }
}
