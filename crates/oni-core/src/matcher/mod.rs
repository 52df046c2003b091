//! Backtracking probe engine
//!
//! Vulnerability confirmation needs an engine that behaves like the
//! backtracking matchers patterns are deployed under, so this one is
//! deliberately unmemoized: a pattern is compiled to a small instruction
//! program and executed with an explicit backtrack stack. Exponential blowup
//! on ambiguous patterns is the sensor, not a bug. The only concession to
//! termination is a per-loop progress guard, which cuts zero-width
//! iterations exactly like the engines being modeled and keeps every match
//! attempt finite.
//!
//! Matching is whole-input (`re.fullmatch` semantics). Adversarial inputs
//! end in a poison character precisely so the forced failure exercises the
//! backtracking worst case.

mod compile;
mod vm;

pub(crate) use compile::Program;

use thiserror::Error;

/// Why a pattern cannot be probed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("pattern does not parse: {0}")]
    Parse(String),

    #[error("pattern uses an unsupported construct: {0}")]
    Unsupported(&'static str),

    #[error("compiled pattern exceeds {max} instructions")]
    TooLarge { max: usize },
}

/// A pattern compiled for probing.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    program: Program,
}

impl CompiledPattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            program: compile::compile(pattern)?,
        })
    }

    /// Runs the pattern against the whole input. No time limit; callers
    /// that need one run this inside the sandbox.
    pub fn matches(&self, input: &str) -> bool {
        vm::run(&self.program, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_matches(pattern: &str, input: &str) -> bool {
        let wrapped = format!("^(?:{pattern})$");
        regex::Regex::new(&wrapped).unwrap().is_match(input)
    }

    #[test]
    fn agrees_with_reference_engine() {
        let cases: &[(&str, &[&str])] = &[
            ("", &["", "a"]),
            ("abc", &["abc", "ab", "abcd", ""]),
            ("a?b+c*", &["b", "abc", "bccc", "ab", "c", "", "aabbcc"]),
            ("(foo|bar)+", &["foo", "bar", "foobar", "fooba", ""]),
            ("[a-f0-9]{2,4}", &["ab", "a1f9", "a", "abcde", "gg"]),
            ("colou?r", &["color", "colour", "colouur"]),
            (r"\d+\.\d+", &["3.14", "10.01", "3.", ".5", "314"]),
            ("^start", &["start", "xstart"]),
            ("(a|ab)(c|bcd)", &["ac", "abc", "abcd", "ab", "abbcd"]),
            (r"[^x]+", &["abc", "axc", ""]),
            ("a*?b", &["b", "aab", "a"]),
            (r"\bword\b", &["word", "wordx"]),
            ("(x+x+)+y", &["xxy", "xxxxy", "xy", "y"]),
            ("(a*)*", &["", "aaa", "b"]),
            ("(?i)hello", &["HELLO", "Hello", "hells"]),
        ];
        for (pattern, inputs) in cases {
            let compiled = CompiledPattern::compile(pattern).unwrap();
            for input in *inputs {
                assert_eq!(
                    compiled.matches(input),
                    reference_matches(pattern, input),
                    "pattern {pattern:?} on input {input:?}"
                );
            }
        }
    }

    #[test]
    fn fullmatch_requires_consuming_everything() {
        let compiled = CompiledPattern::compile("a+").unwrap();
        assert!(compiled.matches("aaa"));
        assert!(!compiled.matches("aaab"));
        assert!(!compiled.matches("baaa"));
    }

    #[test]
    fn exhaustive_backtracking_still_terminates() {
        // Exponential in the pump count; sixteen keeps it well under a
        // second while exercising the worst case for real.
        let compiled = CompiledPattern::compile("(a+)+b").unwrap();
        let input = format!("{}!", "a".repeat(16));
        assert!(!compiled.matches(&input));
    }

    #[test]
    fn empty_loop_bodies_cannot_spin() {
        let compiled = CompiledPattern::compile("(a?)*").unwrap();
        assert!(compiled.matches(""));
        assert!(compiled.matches("aaaa"));
        assert!(!compiled.matches("aab"));
    }

    #[test]
    fn rejects_unparseable_pattern() {
        let err = CompiledPattern::compile("(unclosed").unwrap_err();
        assert!(matches!(err, PatternError::Parse(_)));
    }

    #[test]
    fn rejects_lookahead_at_parse_time() {
        let err = CompiledPattern::compile("(?=a)b").unwrap_err();
        assert!(matches!(err, PatternError::Parse(_)));
    }

    #[test]
    fn rejects_oversized_expansion() {
        let err = CompiledPattern::compile("(?:a{80}){80}").unwrap_err();
        assert!(matches!(err, PatternError::TooLarge { .. }));
    }
}
