//! Pattern to probe-program compilation
//!
//! Bounded repetitions are unrolled and unbounded ones become explicit
//! loops with a progress guard. Unrolling is capped so pathological counted
//! repetitions surface as [`PatternError::TooLarge`] instead of exhausting
//! memory.

use super::PatternError;
use regex_syntax::hir::{self, Class, Hir, HirKind, Look};

pub(crate) const MAX_PROGRAM: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inst {
    Char(char),
    Class(Vec<(char, char)>),
    /// Try `primary` first, queue `secondary` as the backtrack target.
    Split { primary: usize, secondary: usize },
    Jmp(usize),
    Look(LookKind),
    /// Record the current position in the loop's slot.
    EnterLoop(usize),
    /// Fail the current path if the loop body consumed nothing.
    CheckProgress(usize),
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookKind {
    Start,
    End,
    LineStart,
    LineEnd,
    WordBoundary,
    NotWordBoundary,
}

#[derive(Debug, Clone)]
pub(crate) struct Program {
    pub(crate) insts: Vec<Inst>,
    pub(crate) loop_slots: usize,
}

pub(crate) fn compile(pattern: &str) -> Result<Program, PatternError> {
    let mut parser = regex_syntax::Parser::new();
    let hir = parser
        .parse(pattern)
        .map_err(|e| PatternError::Parse(e.to_string()))?;
    let mut compiler = Compiler {
        insts: Vec::new(),
        loop_slots: 0,
    };
    compiler.emit(&hir)?;
    compiler.push(Inst::Match)?;
    Ok(Program {
        insts: compiler.insts,
        loop_slots: compiler.loop_slots,
    })
}

struct Compiler {
    insts: Vec<Inst>,
    loop_slots: usize,
}

impl Compiler {
    fn push(&mut self, inst: Inst) -> Result<usize, PatternError> {
        if self.insts.len() >= MAX_PROGRAM {
            return Err(PatternError::TooLarge { max: MAX_PROGRAM });
        }
        self.insts.push(inst);
        Ok(self.insts.len() - 1)
    }

    fn set_split(&mut self, at: usize, primary: usize, secondary: usize) {
        self.insts[at] = Inst::Split { primary, secondary };
    }

    fn emit(&mut self, hir: &Hir) -> Result<(), PatternError> {
        match hir.kind() {
            HirKind::Empty => Ok(()),
            HirKind::Literal(lit) => {
                let text = std::str::from_utf8(&lit.0)
                    .map_err(|_| PatternError::Unsupported("non-utf8 literal"))?;
                for ch in text.chars() {
                    self.push(Inst::Char(ch))?;
                }
                Ok(())
            }
            HirKind::Class(class) => {
                let ranges = class_ranges(class)?;
                self.push(Inst::Class(ranges))?;
                Ok(())
            }
            HirKind::Look(look) => {
                self.push(Inst::Look(look_kind(*look)?))?;
                Ok(())
            }
            // Group boundaries do not affect accept/reject, and the probe
            // reports nothing but accept/reject.
            HirKind::Capture(cap) => self.emit(&cap.sub),
            HirKind::Concat(parts) => {
                for part in parts {
                    self.emit(part)?;
                }
                Ok(())
            }
            HirKind::Alternation(parts) => self.emit_alternation(parts),
            HirKind::Repetition(rep) => self.emit_repetition(rep),
        }
    }

    fn emit_alternation(&mut self, parts: &[Hir]) -> Result<(), PatternError> {
        if parts.is_empty() {
            return Ok(());
        }
        let mut jumps = Vec::new();
        for part in &parts[..parts.len() - 1] {
            let split = self.push(Inst::Split {
                primary: 0,
                secondary: 0,
            })?;
            let body = self.insts.len();
            self.emit(part)?;
            jumps.push(self.push(Inst::Jmp(0))?);
            let next = self.insts.len();
            self.set_split(split, body, next);
        }
        if let Some(last) = parts.last() {
            self.emit(last)?;
        }
        let end = self.insts.len();
        for jump in jumps {
            self.insts[jump] = Inst::Jmp(end);
        }
        Ok(())
    }

    fn emit_repetition(&mut self, rep: &hir::Repetition) -> Result<(), PatternError> {
        let min = rep.min as usize;
        for _ in 0..min {
            self.emit(&rep.sub)?;
        }
        match rep.max {
            Some(max) => {
                let optional = (max as usize).saturating_sub(min);
                let mut splits = Vec::new();
                for _ in 0..optional {
                    let split = self.push(Inst::Split {
                        primary: 0,
                        secondary: 0,
                    })?;
                    let body = self.insts.len();
                    splits.push((split, body));
                    self.emit(&rep.sub)?;
                }
                let after = self.insts.len();
                for (split, body) in splits {
                    if rep.greedy {
                        self.set_split(split, body, after);
                    } else {
                        self.set_split(split, after, body);
                    }
                }
                Ok(())
            }
            None => {
                let slot = self.loop_slots;
                self.loop_slots += 1;
                let split = self.push(Inst::Split {
                    primary: 0,
                    secondary: 0,
                })?;
                let body = self.insts.len();
                self.push(Inst::EnterLoop(slot))?;
                self.emit(&rep.sub)?;
                self.push(Inst::CheckProgress(slot))?;
                self.push(Inst::Jmp(split))?;
                let after = self.insts.len();
                if rep.greedy {
                    self.set_split(split, body, after);
                } else {
                    self.set_split(split, after, body);
                }
                Ok(())
            }
        }
    }
}

fn class_ranges(class: &Class) -> Result<Vec<(char, char)>, PatternError> {
    match class {
        Class::Unicode(c) => Ok(c.ranges().iter().map(|r| (r.start(), r.end())).collect()),
        Class::Bytes(_) => Err(PatternError::Unsupported("byte-oriented character class")),
    }
}

fn look_kind(look: Look) -> Result<LookKind, PatternError> {
    match look {
        Look::Start => Ok(LookKind::Start),
        Look::End => Ok(LookKind::End),
        Look::StartLF => Ok(LookKind::LineStart),
        Look::EndLF => Ok(LookKind::LineEnd),
        Look::WordAscii | Look::WordUnicode => Ok(LookKind::WordBoundary),
        Look::WordAsciiNegate | Look::WordUnicodeNegate => Ok(LookKind::NotWordBoundary),
        _ => Err(PatternError::Unsupported("unsupported zero-width assertion")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_compiles_to_char_sequence() {
        let program = compile("ab").unwrap();
        assert_eq!(
            program.insts,
            vec![Inst::Char('a'), Inst::Char('b'), Inst::Match]
        );
    }

    #[test]
    fn alternation_compiles_to_split_chain() {
        let program = compile("a|b").unwrap();
        assert_eq!(
            program.insts,
            vec![
                Inst::Split {
                    primary: 1,
                    secondary: 3
                },
                Inst::Char('a'),
                Inst::Jmp(4),
                Inst::Char('b'),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn unbounded_repetition_compiles_to_guarded_loop() {
        let program = compile("a*").unwrap();
        assert_eq!(
            program.insts,
            vec![
                Inst::Split {
                    primary: 1,
                    secondary: 5
                },
                Inst::EnterLoop(0),
                Inst::Char('a'),
                Inst::CheckProgress(0),
                Inst::Jmp(0),
                Inst::Match,
            ]
        );
        assert_eq!(program.loop_slots, 1);
    }

    #[test]
    fn lazy_repetition_swaps_split_order() {
        let program = compile("a*?").unwrap();
        let Inst::Split { primary, secondary } = program.insts[0] else {
            panic!("expected split at entry");
        };
        assert_eq!(primary, 5);
        assert_eq!(secondary, 1);
    }

    #[test]
    fn bounded_repetition_unrolls() {
        let program = compile("a{2,3}").unwrap();
        assert_eq!(
            program.insts,
            vec![
                Inst::Char('a'),
                Inst::Char('a'),
                Inst::Split {
                    primary: 3,
                    secondary: 4
                },
                Inst::Char('a'),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn each_unbounded_loop_gets_its_own_slot() {
        let program = compile("(a*)*b").unwrap();
        assert_eq!(program.loop_slots, 2);
    }

    #[test]
    fn case_insensitive_literal_becomes_classes() {
        let program = compile("(?i)a").unwrap();
        assert!(matches!(program.insts[0], Inst::Class(_)));
    }

    #[test]
    fn unrolling_is_capped() {
        assert!(matches!(
            compile("(?:a{80}){80}"),
            Err(PatternError::TooLarge { max: MAX_PROGRAM })
        ));
    }
}
