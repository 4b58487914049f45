//! # Capability-based Binary Format Interfaces
//!
//! Hand-rolled encoders for the executable container formats this project
//! emits directly, without involving a system assembler or linker.

#![no_std]

extern crate alloc;
extern crate core;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod elf;
