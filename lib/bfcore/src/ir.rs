//! # IR optimizer
//!
//! Folds a brainfuck source byte stream into a compact opcode stream: runs
//! of `+`/`-` and `>`/`<` collapse into a single counted operation, and the
//! literal three-byte clear-loop idioms `[-]`/`[+]` collapse into a single
//! `clear_cell`. Everything else streams through as one opcode per token.
//!
//! The pass is O(N) in the length of the source and performs no allocation
//! beyond the output vector.

use alloc::vec::Vec;

/// One opcode in the optimized stream. `operand` in the spec's sense is
/// folded into each variant: a count for arithmetic/motion, absent
/// (zero) for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Move the tape pointer right by `n` cells, `n >= 1`.
    MoveRight(u64),
    /// Move the tape pointer left by `n` cells, `n >= 1`.
    MoveLeft(u64),
    /// Add `n` to the current cell, modulo 256, `n` in `1..=255`.
    IncCell(u8),
    /// Subtract `n` from the current cell, modulo 256, `n` in `1..=255`.
    DecCell(u8),
    Read,
    Write,
    JumpIfZero,
    JumpIfNonzero,
    /// Collapsed `[-]` or `[+]`.
    ClearCell,
}

/// A source location. Inside a collapsed run this names the position of
/// the run's first byte — see the module doc on the relaxed-accuracy
/// contract for collapsed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// One entry of the optimized opcode stream, carrying the source location
/// of the first byte that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub op: Op,
    pub location: Location,
}

struct Cursor<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self { source, pos: 0, line: 1, column: 1 }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if self.source[self.pos] == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn location(&self) -> Location {
        Location { line: self.line, column: self.column }
    }
}

/// Tokenizes `source` one operator byte at a time, with no run-length
/// folding and no clear-loop detection: every `+`/`-`/`>`/`<` becomes its
/// own `IncCell(1)`/`DecCell(1)`/`MoveRight(1)`/`MoveLeft(1)` entry, and
/// `[-]`/`[+]` pass through as an ordinary (balanced) loop. This is what
/// the driver streams when `--optimize` is not given; it exists so the
/// driver has a single opcode-stream shape to emit regardless of whether
/// folding ran, rather than a separate code path per raw source byte.
///
/// Comment bytes are dropped exactly as in [`optimize`].
pub fn raw(source: &[u8]) -> Vec<Instr> {
    let mut out = Vec::new();
    let mut cur = Cursor::new(source);

    while let Some(b) = cur.peek() {
        let location = cur.location();
        let op = match b {
            b'+' => Some(Op::IncCell(1)),
            b'-' => Some(Op::DecCell(1)),
            b'>' => Some(Op::MoveRight(1)),
            b'<' => Some(Op::MoveLeft(1)),
            b'[' => Some(Op::JumpIfZero),
            b']' => Some(Op::JumpIfNonzero),
            b',' => Some(Op::Read),
            b'.' => Some(Op::Write),
            _ => None,
        };
        if let Some(op) = op {
            out.push(Instr { op, location });
        }
        cur.advance();
    }

    out
}

/// Runs the optimizer over `source`, producing the collapsed opcode
/// stream. Comment bytes (anything outside `+-<>[],.`) are dropped
/// without affecting any counts, but do interrupt a run: `+` then a
/// comment then `+` is two separate runs of length one, not one run of
/// two, since the spec defines runs as *consecutive* operator bytes.
pub fn optimize(source: &[u8]) -> Vec<Instr> {
    let mut out = Vec::new();
    let mut cur = Cursor::new(source);

    while let Some(b) = cur.peek() {
        match b {
            b'+' | b'-' => {
                let loc = cur.location();
                let mut delta: i64 = 0;
                while let Some(c) = cur.peek() {
                    match c {
                        b'+' => delta += 1,
                        b'-' => delta -= 1,
                        _ => break,
                    }
                    cur.advance();
                }
                let magnitude = (delta.unsigned_abs() % 256) as u8;
                if magnitude != 0 {
                    let op = if delta > 0 { Op::IncCell(magnitude) } else { Op::DecCell(magnitude) };
                    out.push(Instr { op, location: loc });
                }
            }
            b'>' | b'<' => {
                let loc = cur.location();
                let mut delta: i64 = 0;
                while let Some(c) = cur.peek() {
                    match c {
                        b'>' => delta += 1,
                        b'<' => delta -= 1,
                        _ => break,
                    }
                    cur.advance();
                }
                if delta > 0 {
                    out.push(Instr { op: Op::MoveRight(delta as u64), location: loc });
                } else if delta < 0 {
                    out.push(Instr { op: Op::MoveLeft((-delta) as u64), location: loc });
                }
            }
            b'[' => {
                let loc = cur.location();
                let is_clear_loop = matches!(cur.peek_at(1), Some(b'-') | Some(b'+'))
                    && cur.peek_at(2) == Some(b']');
                if is_clear_loop {
                    out.push(Instr { op: Op::ClearCell, location: loc });
                    cur.advance();
                    cur.advance();
                    cur.advance();
                } else {
                    out.push(Instr { op: Op::JumpIfZero, location: loc });
                    cur.advance();
                }
            }
            b']' => {
                let loc = cur.location();
                out.push(Instr { op: Op::JumpIfNonzero, location: loc });
                cur.advance();
            }
            b',' => {
                let loc = cur.location();
                out.push(Instr { op: Op::Read, location: loc });
                cur.advance();
            }
            b'.' => {
                let loc = cur.location();
                out.push(Instr { op: Op::Write, location: loc });
                cur.advance();
            }
            _ => {
                // Comment byte: dropped, but the line counter still advances
                // across newlines.
                cur.advance();
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_empty_stream() {
        assert!(optimize(b"").is_empty());
    }

    #[test]
    fn run_length_folds_arithmetic_and_motion() {
        let stream = optimize(b"+++>><<<,.");
        let ops: Vec<Op> = stream.iter().map(|i| i.op).collect();
        assert_eq!(
            ops,
            alloc::vec![
                Op::IncCell(3),
                Op::MoveRight(2),
                Op::MoveLeft(3),
                Op::Read,
                Op::Write,
            ]
        );
    }

    #[test]
    fn net_zero_run_is_fully_elided() {
        let stream = optimize(b"+++---");
        assert!(stream.is_empty());

        let stream = optimize(b">>><<<");
        assert!(stream.is_empty());
    }

    #[test]
    fn arithmetic_wraps_modulo_256() {
        let plus_256 = alloc::vec![b'+'; 256];
        assert!(optimize(&plus_256).is_empty());

        let plus_257 = alloc::vec![b'+'; 257];
        let stream = optimize(&plus_257);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].op, Op::IncCell(1));
    }

    #[test]
    fn comment_bytes_interrupt_a_run_and_are_dropped() {
        let stream = optimize(b"+x+");
        let ops: Vec<Op> = stream.iter().map(|i| i.op).collect();
        assert_eq!(ops, alloc::vec![Op::IncCell(1), Op::IncCell(1)]);
    }

    #[test]
    fn clear_loop_patterns_collapse() {
        let stream = optimize(b"[-]");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].op, Op::ClearCell);

        let stream = optimize(b"[+]");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].op, Op::ClearCell);
    }

    #[test]
    fn non_clear_loops_pass_through_as_balanced_jumps() {
        let stream = optimize(b"[>+<-]");
        let ops: Vec<Op> = stream.iter().map(|i| i.op).collect();
        assert_eq!(
            ops,
            alloc::vec![
                Op::JumpIfZero,
                Op::MoveRight(1),
                Op::IncCell(1),
                Op::MoveLeft(1),
                Op::DecCell(1),
                Op::JumpIfNonzero,
            ]
        );
    }

    #[test]
    fn unmatched_brackets_pass_through_unbalanced_for_the_driver_to_catch() {
        let stream = optimize(b"[");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].op, Op::JumpIfZero);

        let stream = optimize(b"]");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].op, Op::JumpIfNonzero);
    }

    #[test]
    fn line_and_column_tracking_survives_comments_and_newlines() {
        let stream = optimize(b"a\nb+");
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0].location, Location { line: 2, column: 2 });
    }

    #[test]
    fn raw_stream_does_not_fold_runs() {
        let stream = raw(b"+++>><,.");
        let ops: Vec<Op> = stream.iter().map(|i| i.op).collect();
        assert_eq!(
            ops,
            alloc::vec![
                Op::IncCell(1),
                Op::IncCell(1),
                Op::IncCell(1),
                Op::MoveRight(1),
                Op::MoveRight(1),
                Op::MoveLeft(1),
                Op::Read,
                Op::Write,
            ]
        );
    }

    #[test]
    fn raw_stream_does_not_collapse_clear_loops() {
        let stream = raw(b"[-]");
        let ops: Vec<Op> = stream.iter().map(|i| i.op).collect();
        assert_eq!(ops, alloc::vec![Op::JumpIfZero, Op::DecCell(1), Op::JumpIfNonzero]);
    }

    #[test]
    fn raw_stream_drops_comments_like_optimize_does() {
        let stream = raw(b"hello+world");
        let ops: Vec<Op> = stream.iter().map(|i| i.op).collect();
        assert_eq!(ops, alloc::vec![Op::IncCell(1)]);
    }
}
