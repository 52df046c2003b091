//! Probe program execution
//!
//! A single-threaded backtracking interpreter. The backtrack stack carries
//! two kinds of frames: alternatives to resume, and loop-mark restores that
//! undo progress bookkeeping when unwinding past a loop entry. No host
//! recursion, so input depth cannot touch the call stack.

use super::compile::{Inst, LookKind, Program};

enum Frame {
    Alt { pc: usize, pos: usize },
    RestoreMark { slot: usize, mark: usize },
}

pub(crate) fn run(program: &Program, input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let mut marks: Vec<usize> = vec![usize::MAX; program.loop_slots];
    let mut stack: Vec<Frame> = Vec::new();
    let mut pc = 0usize;
    let mut pos = 0usize;

    loop {
        let failed = match &program.insts[pc] {
            Inst::Char(ch) => {
                if pos < chars.len() && chars[pos] == *ch {
                    pos += 1;
                    pc += 1;
                    false
                } else {
                    true
                }
            }
            Inst::Class(ranges) => {
                if pos < chars.len() && in_ranges(ranges, chars[pos]) {
                    pos += 1;
                    pc += 1;
                    false
                } else {
                    true
                }
            }
            Inst::Split { primary, secondary } => {
                stack.push(Frame::Alt {
                    pc: *secondary,
                    pos,
                });
                pc = *primary;
                false
            }
            Inst::Jmp(target) => {
                pc = *target;
                false
            }
            Inst::Look(kind) => {
                if look_holds(*kind, &chars, pos) {
                    pc += 1;
                    false
                } else {
                    true
                }
            }
            Inst::EnterLoop(slot) => {
                stack.push(Frame::RestoreMark {
                    slot: *slot,
                    mark: marks[*slot],
                });
                marks[*slot] = pos;
                pc += 1;
                false
            }
            Inst::CheckProgress(slot) => {
                if marks[*slot] == pos {
                    true
                } else {
                    pc += 1;
                    false
                }
            }
            Inst::Match => {
                if pos == chars.len() {
                    return true;
                }
                true
            }
        };

        if failed {
            let mut resumed = false;
            while let Some(frame) = stack.pop() {
                match frame {
                    Frame::RestoreMark { slot, mark } => marks[slot] = mark,
                    Frame::Alt {
                        pc: alt_pc,
                        pos: alt_pos,
                    } => {
                        pc = alt_pc;
                        pos = alt_pos;
                        resumed = true;
                        break;
                    }
                }
            }
            if !resumed {
                return false;
            }
        }
    }
}

fn in_ranges(ranges: &[(char, char)], ch: char) -> bool {
    ranges.iter().any(|&(start, end)| start <= ch && ch <= end)
}

fn look_holds(kind: LookKind, chars: &[char], pos: usize) -> bool {
    match kind {
        LookKind::Start => pos == 0,
        LookKind::End => pos == chars.len(),
        LookKind::LineStart => pos == 0 || chars[pos - 1] == '\n',
        LookKind::LineEnd => pos == chars.len() || chars[pos] == '\n',
        LookKind::WordBoundary => word_before(chars, pos) != word_after(chars, pos),
        LookKind::NotWordBoundary => word_before(chars, pos) == word_after(chars, pos),
    }
}

fn word_before(chars: &[char], pos: usize) -> bool {
    pos > 0 && is_word(chars[pos - 1])
}

fn word_after(chars: &[char], pos: usize) -> bool {
    pos < chars.len() && is_word(chars[pos])
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::super::compile::compile;
    use super::*;

    fn matches(pattern: &str, input: &str) -> bool {
        run(&compile(pattern).unwrap(), input)
    }

    #[test]
    fn anchors_respect_position() {
        assert!(matches("^a$", "a"));
        assert!(!matches("^a$", "ab"));
    }

    #[test]
    fn multiline_anchors_see_newlines() {
        assert!(matches("(?m)a$\nb", "a\nb"));
        assert!(matches("(?m)a\n^b", "a\nb"));
        assert!(!matches("(?m)a$b", "ab"));
    }

    #[test]
    fn word_boundaries() {
        assert!(matches(r"\bab\b", "ab"));
        assert!(!matches(r"a\bb", "ab"));
        assert!(matches(r"a\Bb", "ab"));
    }

    #[test]
    fn greedy_and_lazy_reach_the_same_accepts() {
        assert!(matches("a*b", "aaab"));
        assert!(matches("a*?b", "aaab"));
        assert!(!matches("a*b", "aaac"));
        assert!(!matches("a*?b", "aaac"));
    }

    #[test]
    fn backtrack_restores_loop_marks() {
        // The outer loop re-enters after backtracking out of the inner one;
        // stale marks would wrongly cut the second attempt short.
        assert!(matches("(a*b)*c", "aabbc"));
        assert!(!matches("(a*b)*c", "aabb"));
    }

    #[test]
    fn non_ascii_input_is_matched_per_scalar() {
        assert!(matches("é+", "ééé"));
        assert!(matches(".", "日"));
        assert!(!matches(".", "日本"));
    }
}
