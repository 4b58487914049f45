//! AArch64 backend.
//!
//! Register assignment follows the Linux AArch64 syscall ABI: `x8` carries
//! the syscall number, `x0`/`x1`/`x2` are the first three arguments. `x19`
//! (callee-saved, untouched by `svc`) is the tape pointer; `x9` is scratch.
//! `ldrb`/`strb` give single-instruction zero-extending byte load/store, and
//! `cbz`/`cbnz` test-and-branch in one instruction, so the AArch64 loop
//! sequence is just load-then-branch — no separate compare is needed.

use super::{check_branch_range, Backend, ElfData, Reg};
use crate::buffer::Buffer;
use crate::error::{CompileError, ErrorKind};
use binfmt::elf;

const X0: Reg = 0;
const X1: Reg = 1;
const X2: Reg = 2;
const X8: Reg = 8;
const X9: Reg = 9;
const X19: Reg = 19;

pub struct Aarch64;

impl Aarch64 {
    const LOAD_LEN: usize = 4;
    const BRANCH_LEN: usize = 4;
}

fn word(buf: &mut Buffer, w: u32) {
    buf.append(&w.to_le_bytes());
}

const MOVW_FIXED: u32 = 0b100101;

fn movz(reg: Reg, imm16: u16, hw: u32) -> u32 {
    (1 << 31) | (0b10 << 29) | (MOVW_FIXED << 23) | (hw << 21) | ((imm16 as u32) << 5) | reg as u32
}

fn movk(reg: Reg, imm16: u16, hw: u32) -> u32 {
    (1 << 31) | (0b11 << 29) | (MOVW_FIXED << 23) | (hw << 21) | ((imm16 as u32) << 5) | reg as u32
}

fn emit_set_reg(buf: &mut Buffer, reg: Reg, imm: u64) {
    word(buf, movz(reg, imm as u16, 0));
    word(buf, movk(reg, (imm >> 16) as u16, 1));
    word(buf, movk(reg, (imm >> 32) as u16, 2));
    word(buf, movk(reg, (imm >> 48) as u16, 3));
}

fn add_imm(reg_d: Reg, reg_n: Reg, imm12: u32, shift12: bool, w64: bool) -> u32 {
    let sf = if w64 { 1u32 } else { 0 };
    (sf << 31) | (0b00_100010 << 23) | ((shift12 as u32) << 22) | (imm12 << 10) | ((reg_n as u32) << 5) | reg_d as u32
}

fn sub_imm(reg_d: Reg, reg_n: Reg, imm12: u32, shift12: bool, w64: bool) -> u32 {
    let sf = if w64 { 1u32 } else { 0 };
    (sf << 31) | (0b10_100010 << 23) | ((shift12 as u32) << 22) | (imm12 << 10) | ((reg_n as u32) << 5) | reg_d as u32
}

fn add_reg_reg(reg_d: Reg, reg_n: Reg, reg_m: Reg) -> u32 {
    0x8B000000 | ((reg_m as u32) << 16) | ((reg_n as u32) << 5) | reg_d as u32
}

fn ldrb(reg_t: Reg, reg_n: Reg) -> u32 {
    0x39400000 | ((reg_n as u32) << 5) | reg_t as u32
}

fn strb(reg_t: Reg, reg_n: Reg) -> u32 {
    0x39000000 | ((reg_n as u32) << 5) | reg_t as u32
}

fn cbz(reg_t: Reg, imm19: i32) -> u32 {
    0x34000000 | (((imm19 as u32) & 0x7FFFF) << 5) | reg_t as u32
}

fn cbnz(reg_t: Reg, imm19: i32) -> u32 {
    0x35000000 | (((imm19 as u32) & 0x7FFFF) << 5) | reg_t as u32
}

fn branch_rel(offset: i64) -> Result<i32, CompileError> {
    let rel = offset - Aarch64::LOAD_LEN as i64;
    // `cbz`/`cbnz`'s signed 19-bit word-count immediate maxes out at
    // 262143 words (`2^20 - 4` bytes); `rel == 2^20` must be rejected, not
    // silently mis-encoded by wrapping the immediate's sign bit.
    check_branch_range(rel, (1i64 << 20) - 4, 4)?;
    Ok((rel / 4) as i32)
}

impl Backend for Aarch64 {
    const NAME: &'static str = "aarch64";
    const ALIASES: &'static [&'static str] = &["arm64"];

    const ELF_MACHINE: u16 = elf::EM_AARCH64;
    const ELF_DATA: ElfData = ElfData::Le;
    const ELF_FLAGS: u32 = 0;

    const SYS_READ: u64 = sys::ffi::linux::aarch64::SYS_READ;
    const SYS_WRITE: u64 = sys::ffi::linux::aarch64::SYS_WRITE;
    const SYS_EXIT: u64 = sys::ffi::linux::aarch64::SYS_EXIT;

    const BF_PTR: Reg = X19;
    const SC_NUM: Reg = X8;
    const ARG1: Reg = X0;
    const ARG2: Reg = X1;
    const ARG3: Reg = X2;
    const SCRATCH: Reg = X9;

    const LOOP_OPEN_LEN: usize = Self::LOAD_LEN + Self::BRANCH_LEN;
    const LOOP_CLOSE_LEN: usize = Self::LOAD_LEN + Self::BRANCH_LEN;

    fn set_reg(buf: &mut Buffer, reg: Reg, imm: u64) {
        emit_set_reg(buf, reg, imm);
    }

    fn reg_copy(buf: &mut Buffer, dst: Reg, src: Reg) {
        word(buf, 0xAA0003E0 | ((src as u32) << 16) | dst as u32);
    }

    fn syscall(buf: &mut Buffer) {
        word(buf, 0xD4000001);
    }

    fn pad_loop_open(buf: &mut Buffer) {
        word(buf, ldrb(Self::SCRATCH, Self::BF_PTR));
        // Poisoned `cbz`: an out-of-range-looking branch that, if ever
        // reached unpatched, jumps far outside the mapped segments.
        word(buf, 0x34000000 | (0x7FFFF << 5) | Self::SCRATCH as u32);
    }

    fn jump_open(buf: &mut [u8], index: usize, _reg: Reg, offset: i64) -> Result<(), CompileError> {
        // `_reg` (the tape pointer) isn't the tested register here: the
        // `ldrb` that `pad_loop_open` already placed at `index` loaded the
        // cell byte into `SCRATCH`, and `cbz`/`cbnz` test a register value
        // directly rather than a condition-code flag, so the register
        // field patched back in must stay `SCRATCH`, matching the
        // placeholder's encoding.
        let imm19 = branch_rel(offset)?;
        let insn = cbz(Self::SCRATCH, imm19);
        buf[index + Self::LOAD_LEN..index + Self::LOAD_LEN + 4].copy_from_slice(&insn.to_le_bytes());
        Ok(())
    }

    fn jump_close(buf: &mut Buffer, reg: Reg, offset: i64) -> Result<(), CompileError> {
        let imm19 = branch_rel(offset)?;
        word(buf, ldrb(Self::SCRATCH, reg));
        word(buf, cbnz(Self::SCRATCH, imm19));
        Ok(())
    }

    fn inc_reg(buf: &mut Buffer, reg: Reg) {
        word(buf, add_imm(reg, reg, 1, false, true));
    }

    fn dec_reg(buf: &mut Buffer, reg: Reg) {
        word(buf, sub_imm(reg, reg, 1, false, true));
    }

    fn add_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError> {
        large_imm_op(buf, reg, imm, true)
    }

    fn sub_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError> {
        large_imm_op(buf, reg, imm, false)
    }

    fn inc_byte(buf: &mut Buffer, reg: Reg) {
        word(buf, ldrb(Self::SCRATCH, reg));
        word(buf, add_imm(Self::SCRATCH, Self::SCRATCH, 1, false, false));
        word(buf, strb(Self::SCRATCH, reg));
    }

    fn dec_byte(buf: &mut Buffer, reg: Reg) {
        word(buf, ldrb(Self::SCRATCH, reg));
        word(buf, sub_imm(Self::SCRATCH, Self::SCRATCH, 1, false, false));
        word(buf, strb(Self::SCRATCH, reg));
    }

    fn add_byte(buf: &mut Buffer, reg: Reg, imm: u8) {
        word(buf, ldrb(Self::SCRATCH, reg));
        word(buf, add_imm(Self::SCRATCH, Self::SCRATCH, imm as u32, false, false));
        word(buf, strb(Self::SCRATCH, reg));
    }

    fn sub_byte(buf: &mut Buffer, reg: Reg, imm: u8) {
        word(buf, ldrb(Self::SCRATCH, reg));
        word(buf, sub_imm(Self::SCRATCH, Self::SCRATCH, imm as u32, false, false));
        word(buf, strb(Self::SCRATCH, reg));
    }

    fn zero_byte(buf: &mut Buffer, reg: Reg) {
        const WZR: Reg = 31;
        word(buf, strb(WZR, reg));
    }
}

/// Implements the §9 large-immediate strategy: a 12-bit immediate, a
/// 12-bit immediate shifted left by 12, and a scratch-register fallback
/// for anything wider than 24 bits. Values `>= 2^63` are refused.
fn large_imm_op(buf: &mut Buffer, reg: Reg, imm: u64, is_add: bool) -> Result<(), CompileError> {
    if imm == 0 {
        return Ok(());
    }
    if imm >= 1u64 << 63 {
        return Err(CompileError::new(
            ErrorKind::TooManyInstructions,
            "immediate too wide for AArch64 add/sub lowering",
        ));
    }
    if imm <= 0xFF_FFFF {
        let low = (imm & 0xFFF) as u32;
        let high = ((imm >> 12) & 0xFFF) as u32;
        if high != 0 {
            word(buf, if is_add { add_imm(reg, reg, high, true, true) } else { sub_imm(reg, reg, high, true, true) });
        }
        if low != 0 {
            word(buf, if is_add { add_imm(reg, reg, low, false, true) } else { sub_imm(reg, reg, low, false, true) });
        }
    } else {
        emit_set_reg(buf, Aarch64::SCRATCH, imm);
        word(
            buf,
            if is_add {
                add_reg_reg(reg, reg, Aarch64::SCRATCH)
            } else {
                // SUB Xd, Xn, Xm (shifted register): same family as ADD with op=1.
                0xCB000000 | ((Aarch64::SCRATCH as u32) << 16) | ((reg as u32) << 5) | reg as u32
            },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reg_is_fixed_length() {
        let mut buf = Buffer::new();
        Aarch64::set_reg(&mut buf, X0, 0);
        assert_eq!(buf.len(), 16);
        let mut buf = Buffer::new();
        Aarch64::set_reg(&mut buf, X0, u64::MAX);
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn pad_and_jump_open_agree_on_length() {
        let mut buf = Buffer::new();
        let start = buf.len();
        Aarch64::pad_loop_open(&mut buf);
        assert_eq!(buf.len() - start, Aarch64::LOOP_OPEN_LEN);

        let len_before = buf.len();
        Aarch64::jump_open(buf.as_mut_slice(), start, Aarch64::BF_PTR, 40).unwrap();
        assert_eq!(buf.len(), len_before);
    }

    #[test]
    fn jump_open_tests_the_scratch_register_not_the_tape_pointer() {
        // `pad_loop_open` loads the cell into SCRATCH; `jump_open` must
        // patch a `cbz` that tests SCRATCH, never BF_PTR (which holds the
        // tape address and is never zero).
        let mut buf = Buffer::new();
        let start = buf.len();
        Aarch64::pad_loop_open(&mut buf);
        Aarch64::jump_open(buf.as_mut_slice(), start, Aarch64::BF_PTR, 40).unwrap();

        let insn = u32::from_le_bytes(buf.as_slice()[start + Aarch64::LOAD_LEN..start + Aarch64::LOAD_LEN + 4].try_into().unwrap());
        assert_eq!(insn & 0x1F, Aarch64::SCRATCH as u32);
    }

    #[test]
    fn jump_too_long_is_rejected() {
        let mut buf = Buffer::new();
        let start = buf.len();
        Aarch64::pad_loop_open(&mut buf);
        let err = Aarch64::jump_open(buf.as_mut_slice(), start, Aarch64::BF_PTR, 1 << 24).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::JumpTooLong);
    }

    #[test]
    fn large_immediate_add_uses_scratch_register_path() {
        let mut buf = Buffer::new();
        Aarch64::add_reg(&mut buf, X19, 0xFFFF_FFFF).unwrap();
        // movz/movk x9 (16 bytes) + add x19, x19, x9 (4 bytes)
        assert_eq!(buf.len(), 20);
    }

    #[test]
    fn huge_immediate_is_refused() {
        let mut buf = Buffer::new();
        let err = Aarch64::add_reg(&mut buf, X19, 1u64 << 63).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::TooManyInstructions);
    }
}
