//! # Backend interface
//!
//! Every supported ISA is a pure function table: a fixed set of emitters
//! plus the handful of constants (register assignment, syscall numbers,
//! ELF identification) the driver needs to drive them. There is no dynamic
//! dispatch inside an emitter — the driver picks one concrete backend per
//! compilation (via [`Arch`]) and monomorphizes against it.

pub mod aarch64;
pub mod riscv64;
pub mod s390x;
pub mod x86_64;

use crate::buffer::Buffer;
use crate::error::{CompileError, ErrorKind};

/// An architecture-neutral register handle. Each backend interprets this as
/// its own native register number; the driver never inspects the value,
/// only passes around the constants a [`Backend`] publishes.
pub type Reg = u8;

/// Every backend exposes exactly this set of emitters (§4.3). All of them
/// append to, or patch in place, a [`Buffer`]; none of them fail except
/// `jump_open`/`jump_close`, whose only failure mode is a branch target
/// outside the backend's encodable range.
pub trait Backend {
    /// Canonical name, as reported by `--list-targets`.
    const NAME: &'static str;
    /// Additional accepted spellings for `--target-arch`.
    const ALIASES: &'static [&'static str];

    /// ELF `e_machine` value for this backend.
    const ELF_MACHINE: u16;
    /// ELF byte order for this backend.
    const ELF_DATA: ElfData;
    /// ELF `e_flags` value for this backend (0 unless the ABI mandates one).
    const ELF_FLAGS: u32;

    const SYS_READ: u64;
    const SYS_WRITE: u64;
    const SYS_EXIT: u64;

    /// Tape-pointer register: survives a Linux syscall on this ABI.
    const BF_PTR: Reg;
    const SC_NUM: Reg;
    const ARG1: Reg;
    const ARG2: Reg;
    const ARG3: Reg;
    /// Scratch register used by multi-instruction byte/immediate sequences.
    /// Must not collide with `BF_PTR`, `SC_NUM`, or the argument registers.
    const SCRATCH: Reg;

    /// Fixed length, in bytes, of the loop-open branch sequence. This is
    /// also the length `pad_loop_open` reserves and `jump_open` overwrites
    /// in place — the two must always agree (§8 pad/patch agreement).
    const LOOP_OPEN_LEN: usize;
    /// Fixed length, in bytes, of the loop-close branch sequence.
    const LOOP_CLOSE_LEN: usize;

    fn set_reg(buf: &mut Buffer, reg: Reg, imm: u64);
    fn reg_copy(buf: &mut Buffer, dst: Reg, src: Reg);
    fn syscall(buf: &mut Buffer);

    /// Emits a fixed-size placeholder for a loop-open branch. Must be
    /// exactly [`Backend::LOOP_OPEN_LEN`] bytes, and — left unpatched —
    /// should be a trap or otherwise diagnosably broken sequence.
    fn pad_loop_open(buf: &mut Buffer);
    /// Patches the placeholder reserved by `pad_loop_open` at `buf[index..]`
    /// in place. Must not change `buf.len()`. `offset` is the signed byte
    /// distance from the start of the patched sequence to the branch
    /// target.
    fn jump_open(buf: &mut [u8], index: usize, reg: Reg, offset: i64) -> Result<(), CompileError>;
    /// Appends a loop-close branch sequence testing `reg` and branching
    /// back by `offset` bytes (negative: backward) if non-zero.
    fn jump_close(buf: &mut Buffer, reg: Reg, offset: i64) -> Result<(), CompileError>;

    fn inc_reg(buf: &mut Buffer, reg: Reg);
    fn dec_reg(buf: &mut Buffer, reg: Reg);
    /// `imm == 0` is a no-op the caller should elide; implementations must
    /// still behave correctly if called with it. Fails with
    /// `TooManyInstructions` if `imm` cannot be represented by this
    /// backend's large-immediate strategy (only reachable on AArch64, for
    /// immediates `>= 2^63`).
    fn add_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError>;
    fn sub_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError>;

    fn inc_byte(buf: &mut Buffer, reg: Reg);
    fn dec_byte(buf: &mut Buffer, reg: Reg);
    fn add_byte(buf: &mut Buffer, reg: Reg, imm: u8);
    fn sub_byte(buf: &mut Buffer, reg: Reg, imm: u8);
    fn zero_byte(buf: &mut Buffer, reg: Reg);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfData {
    Le,
    Be,
}

/// Runtime selector for the four compiled-in backends. `--target-arch`
/// resolves to one of these; from here on, dispatch is static (the driver
/// matches once and calls a function generic over a concrete [`Backend`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Riscv64,
    S390x,
}

impl Arch {
    pub const ALL: [Arch; 4] = [Arch::X86_64, Arch::Aarch64, Arch::Riscv64, Arch::S390x];

    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => x86_64::X86_64::NAME,
            Arch::Aarch64 => aarch64::Aarch64::NAME,
            Arch::Riscv64 => riscv64::Riscv64::NAME,
            Arch::S390x => s390x::S390x::NAME,
        }
    }

    /// Resolves a `--target-arch` value (including aliases) to an [`Arch`].
    pub fn from_name(name: &str) -> Result<Self, CompileError> {
        let candidates: [(Arch, &'static str, &'static [&'static str]); 4] = [
            (Arch::X86_64, x86_64::X86_64::NAME, x86_64::X86_64::ALIASES),
            (Arch::Aarch64, aarch64::Aarch64::NAME, aarch64::Aarch64::ALIASES),
            (Arch::Riscv64, riscv64::Riscv64::NAME, riscv64::Riscv64::ALIASES),
            (Arch::S390x, s390x::S390x::NAME, s390x::S390x::ALIASES),
        ];
        for (arch, canonical, aliases) in candidates {
            if name == canonical || aliases.contains(&name) {
                return Ok(arch);
            }
        }
        Err(CompileError::new(
            ErrorKind::UnknownArch,
            alloc::format!("no backend named {name:?}"),
        ))
    }
}

/// Verifies that a computed branch byte-offset both respects the backend's
/// encodable range and lands on an instruction-word boundary. Shared by
/// every backend's `jump_open`/`jump_close`.
pub(crate) fn check_branch_range(rel: i64, max_abs: i64, align: i64) -> Result<(), CompileError> {
    if rel < -max_abs || rel > max_abs {
        return Err(CompileError::new(
            ErrorKind::JumpTooLong,
            alloc::format!("branch offset {rel} exceeds backend range of +-{max_abs}"),
        ));
    }
    if rel % align != 0 {
        // Misaligned branch offsets are an internal invariant violation:
        // the driver always emits whole instructions, so this can only
        // happen if a backend's own instruction lengths are inconsistent.
        return Err(CompileError::new(
            ErrorKind::InternalError,
            alloc::format!("branch offset {rel} is not a multiple of {align}"),
        ));
    }
    Ok(())
}
