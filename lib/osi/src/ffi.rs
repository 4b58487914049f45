//! # Foreign Function Interfaces
//!
//! This module is a collection of utilities that aid implementation of foreign
//! function interfaces in Rust.

pub mod endian;
pub mod integer;
pub mod packed;

pub use endian::{
    BigEndian,
    LittleEndian,
    NativeEndian,
};
pub use integer::Integer;
pub use packed::Packed;
