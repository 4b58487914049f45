//! # Capability-based Standard Interfaces
//!
//! This library provides _**O**perating **S**ystem **I**ndependent_ standard
//! interfaces following a **capability-based design**. It does not require any
//! particular runtime, but can optionally be combined with the Rust Standard
//! Library.

#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::redundant_field_names)]

#![no_std]

extern crate alloc;
extern crate core;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod align;
pub mod ffi;
pub mod mem;
