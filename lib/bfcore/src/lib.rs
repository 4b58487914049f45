//! # Cross-architecture ahead-of-time brainfuck compiler core
//!
//! This crate is the compilation pipeline at the heart of `bfc`: it turns a
//! brainfuck source buffer directly into a statically linked, directly
//! executable ELF image, without invoking an assembler or linker. Four
//! architecture backends ([`backend`]) each implement the same small
//! instruction-emitter contract; the [`driver`] streams source (optionally
//! pre-folded by the [`ir`] optimizer) through whichever backend was
//! selected and hands the result to `binfmt::elf` for header splicing.
//!
//! Everything a caller needs lives behind [`driver::compile`]. The rest of
//! the crate is public so that a frontend (a CLI, a test harness) can drive
//! individual pieces — e.g. listing backend names, or constructing
//! [`error::CompileError`] values of its own for errors detected outside the
//! core (a missing file, say).
//!
//! The core never formats a diagnostic for a human or for JSON and never
//! touches a filesystem; both are the frontend's job.

#![no_std]

extern crate alloc;
extern crate core;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod backend;
pub mod buffer;
pub mod driver;
pub mod error;
pub mod ir;
