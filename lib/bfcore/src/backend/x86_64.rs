//! x86-64 backend.
//!
//! Register assignment: `rax` carries the syscall number (as the ABI
//! requires), `rdi`/`rsi`/`rdx` are the first three syscall arguments, `r8`
//! is the tape pointer (callee- and syscall-safe), `r9` is the scratch
//! register used for byte load/operate/store sequences and large-immediate
//! staging.

use super::{check_branch_range, Backend, ElfData, Reg};
use crate::buffer::Buffer;
use crate::error::CompileError;
use binfmt::elf;

const RAX: Reg = 0;
const RDX: Reg = 2;
const RSI: Reg = 6;
const RDI: Reg = 7;
const R8: Reg = 8;
const R9: Reg = 9;

pub struct X86_64;

impl X86_64 {
    const LOAD_TEST_LEN: usize = 4 + 3; // movzx + test
    const BRANCH_LEN: usize = 6; // 0F 8x rel32
}

fn rex(w: bool, r: bool, x: bool, b: bool) -> u8 {
    0x40 | (u8::from(w) << 3) | (u8::from(r) << 2) | (u8::from(x) << 1) | u8::from(b)
}

fn modrm(md: u8, reg: u8, rm: u8) -> u8 {
    (md << 6) | ((reg & 7) << 3) | (rm & 7)
}

fn emit_set_reg(buf: &mut Buffer, reg: Reg, imm: u64) {
    let out = buf.reserve(10);
    out[0] = rex(true, false, false, reg >= 8);
    out[1] = 0xB8 + (reg & 7);
    out[2..10].copy_from_slice(&imm.to_le_bytes());
}

fn emit_reg_copy(buf: &mut Buffer, dst: Reg, src: Reg) {
    let out = buf.reserve(3);
    out[0] = rex(true, src >= 8, false, dst >= 8);
    out[1] = 0x89;
    out[2] = modrm(0b11, src, dst);
}

fn emit_load_test(buf: &mut Buffer, reg: Reg) {
    // movzx r9d, byte [reg]
    let out = buf.reserve(4);
    out[0] = rex(false, true, false, reg >= 8);
    out[1] = 0x0F;
    out[2] = 0xB6;
    out[3] = modrm(0b00, R9, reg);
    // test r9d, r9d
    let out = buf.reserve(3);
    out[0] = rex(false, true, false, true);
    out[1] = 0x85;
    out[2] = modrm(0b11, R9, R9);
}

fn branch_rel(offset: i64, seq_len: usize) -> Result<i32, CompileError> {
    let rel = offset - seq_len as i64;
    // rel32 is two's-complement and asymmetric: -2^31..=2^31-1. `2^31`
    // itself must be rejected, not silently wrapped to `i32::MIN`.
    check_branch_range(rel, (1i64 << 31) - 1, 1)?;
    Ok(rel as i32)
}

impl Backend for X86_64 {
    const NAME: &'static str = "x86_64";
    const ALIASES: &'static [&'static str] = &["x64", "amd64"];

    const ELF_MACHINE: u16 = elf::EM_X86_64;
    const ELF_DATA: ElfData = ElfData::Le;
    const ELF_FLAGS: u32 = 0;

    const SYS_READ: u64 = sys::ffi::linux::x86_64::SYS_READ;
    const SYS_WRITE: u64 = sys::ffi::linux::x86_64::SYS_WRITE;
    const SYS_EXIT: u64 = sys::ffi::linux::x86_64::SYS_EXIT;

    const BF_PTR: Reg = R8;
    const SC_NUM: Reg = RAX;
    const ARG1: Reg = RDI;
    const ARG2: Reg = RSI;
    const ARG3: Reg = RDX;
    const SCRATCH: Reg = R9;

    const LOOP_OPEN_LEN: usize = Self::LOAD_TEST_LEN + Self::BRANCH_LEN;
    const LOOP_CLOSE_LEN: usize = Self::LOAD_TEST_LEN + Self::BRANCH_LEN;

    fn set_reg(buf: &mut Buffer, reg: Reg, imm: u64) {
        emit_set_reg(buf, reg, imm);
    }

    fn reg_copy(buf: &mut Buffer, dst: Reg, src: Reg) {
        emit_reg_copy(buf, dst, src);
    }

    fn syscall(buf: &mut Buffer) {
        buf.append(&[0x0F, 0x05]);
    }

    fn pad_loop_open(buf: &mut Buffer) {
        emit_load_test(buf, Self::BF_PTR);
        // `jz` with a poisoned rel32: if ever executed unpatched this
        // branches to a wild address and faults instead of silently
        // running past an incompletely-compiled loop.
        let out = buf.reserve(Self::BRANCH_LEN);
        out[0] = 0x0F;
        out[1] = 0x84;
        out[2..6].copy_from_slice(&[0xCC; 4]);
    }

    fn jump_open(buf: &mut [u8], index: usize, _reg: Reg, offset: i64) -> Result<(), CompileError> {
        let rel = branch_rel(offset, Self::LOOP_OPEN_LEN)?;
        let branch_at = index + Self::LOAD_TEST_LEN;
        buf[branch_at + 2..branch_at + 6].copy_from_slice(&rel.to_le_bytes());
        Ok(())
    }

    fn jump_close(buf: &mut Buffer, reg: Reg, offset: i64) -> Result<(), CompileError> {
        let rel = branch_rel(offset, Self::LOOP_CLOSE_LEN)?;
        emit_load_test(buf, reg);
        let out = buf.reserve(Self::BRANCH_LEN);
        out[0] = 0x0F;
        out[1] = 0x85;
        out[2..6].copy_from_slice(&rel.to_le_bytes());
        Ok(())
    }

    fn inc_reg(buf: &mut Buffer, reg: Reg) {
        let out = buf.reserve(3);
        out[0] = rex(true, false, false, reg >= 8);
        out[1] = 0xFF;
        out[2] = modrm(0b11, 0, reg);
    }

    fn dec_reg(buf: &mut Buffer, reg: Reg) {
        let out = buf.reserve(3);
        out[0] = rex(true, false, false, reg >= 8);
        out[1] = 0xFF;
        out[2] = modrm(0b11, 1, reg);
    }

    fn add_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError> {
        if let Ok(imm32) = i32::try_from(imm as i64) {
            let out = buf.reserve(7);
            out[0] = rex(true, false, false, reg >= 8);
            out[1] = 0x81;
            out[2] = modrm(0b11, 0, reg);
            out[3..7].copy_from_slice(&imm32.to_le_bytes());
        } else {
            emit_set_reg(buf, Self::SCRATCH, imm);
            let out = buf.reserve(3);
            out[0] = rex(true, Self::SCRATCH >= 8, false, reg >= 8);
            out[1] = 0x01;
            out[2] = modrm(0b11, Self::SCRATCH, reg);
        }
        Ok(())
    }

    fn sub_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError> {
        if let Ok(imm32) = i32::try_from(imm as i64) {
            let out = buf.reserve(7);
            out[0] = rex(true, false, false, reg >= 8);
            out[1] = 0x81;
            out[2] = modrm(0b11, 5, reg);
            out[3..7].copy_from_slice(&imm32.to_le_bytes());
        } else {
            emit_set_reg(buf, Self::SCRATCH, imm);
            let out = buf.reserve(3);
            out[0] = rex(true, Self::SCRATCH >= 8, false, reg >= 8);
            out[1] = 0x29;
            out[2] = modrm(0b11, Self::SCRATCH, reg);
        }
        Ok(())
    }

    fn inc_byte(buf: &mut Buffer, reg: Reg) {
        let out = buf.reserve(3);
        out[0] = rex(false, false, false, reg >= 8);
        out[1] = 0xFE;
        out[2] = modrm(0b00, 0, reg);
    }

    fn dec_byte(buf: &mut Buffer, reg: Reg) {
        let out = buf.reserve(3);
        out[0] = rex(false, false, false, reg >= 8);
        out[1] = 0xFE;
        out[2] = modrm(0b00, 1, reg);
    }

    fn add_byte(buf: &mut Buffer, reg: Reg, imm: u8) {
        let out = buf.reserve(4);
        out[0] = rex(false, false, false, reg >= 8);
        out[1] = 0x80;
        out[2] = modrm(0b00, 0, reg);
        out[3] = imm;
    }

    fn sub_byte(buf: &mut Buffer, reg: Reg, imm: u8) {
        let out = buf.reserve(4);
        out[0] = rex(false, false, false, reg >= 8);
        out[1] = 0x80;
        out[2] = modrm(0b00, 5, reg);
        out[3] = imm;
    }

    fn zero_byte(buf: &mut Buffer, reg: Reg) {
        let out = buf.reserve(4);
        out[0] = rex(false, false, false, reg >= 8);
        out[1] = 0xC6;
        out[2] = modrm(0b00, 0, reg);
        out[3] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reg_is_fixed_length() {
        let mut buf = Buffer::new();
        X86_64::set_reg(&mut buf, RAX, 0);
        assert_eq!(buf.len(), 10);
        let mut buf = Buffer::new();
        X86_64::set_reg(&mut buf, R8, u64::MAX);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn pad_and_jump_open_agree_on_length() {
        let mut buf = Buffer::new();
        let start = buf.len();
        X86_64::pad_loop_open(&mut buf);
        let pad_len = buf.len() - start;
        assert_eq!(pad_len, X86_64::LOOP_OPEN_LEN);

        let before = buf.as_slice().to_vec();
        X86_64::jump_open(buf.as_mut_slice(), start, X86_64::BF_PTR, 20).unwrap();
        assert_eq!(buf.len(), before.len());
    }

    #[test]
    fn jump_too_long_is_rejected_without_mutating_length() {
        let mut buf = Buffer::new();
        let start = buf.len();
        X86_64::pad_loop_open(&mut buf);
        let len_before = buf.len();
        let snapshot = buf.as_slice().to_vec();

        let huge = (1i64 << 40) + 13;
        let err = X86_64::jump_open(buf.as_mut_slice(), start, X86_64::BF_PTR, huge).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::JumpTooLong);
        assert_eq!(buf.len(), len_before);
        assert_eq!(buf.as_slice(), snapshot.as_slice());
    }
}
