//! s390x (z/Architecture, big-endian) backend.
//!
//! Register assignment: Linux/s390x passes syscall arguments in `r2`/`r3`/
//! `r4`. The syscall number normally rides along in the `svc` instruction's
//! own immediate byte, but glibc's convention — which this backend follows
//! — instead always emits `svc 0` with the number loaded into `r1`; that
//! keeps the emitted sequence uniform regardless of which syscall is being
//! made. `r8` is the tape pointer, `r9` scratch.
//!
//! Every field below is big-endian, including instruction immediates —
//! z/Architecture has no little-endian mode.

use super::{check_branch_range, Backend, ElfData, Reg};
use crate::buffer::Buffer;
use crate::error::CompileError;
use binfmt::elf;

const R1: Reg = 1;
const R2: Reg = 2;
const R3: Reg = 3;
const R4: Reg = 4;
const R8: Reg = 8;
const R9: Reg = 9;

/// Branch-on-condition masks (BRC/BRCL `M1` field).
const MASK_ZERO: u8 = 0x8;
const MASK_NONZERO: u8 = 0x7;

pub struct S390x;

impl S390x {
    const LLGC_LEN: usize = 6;
    const LTGR_LEN: usize = 4;
    const BRCL_LEN: usize = 6;
}

fn llgc(r1: Reg, b2: Reg) -> [u8; 6] {
    [0xE3, (r1 << 4) | 0, b2 << 4, 0x00, 0x00, 0x90]
}

fn stc(r1: Reg, b2: Reg) -> [u8; 4] {
    [0x42, (r1 << 4) | 0, b2 << 4, 0x00]
}

fn ltgr(r1: Reg, r2: Reg) -> [u8; 4] {
    [0xB9, 0x02, 0x00, (r1 << 4) | r2]
}

fn brc(mask: u8, rel_halfwords: i16) -> [u8; 4] {
    let h = rel_halfwords.to_be_bytes();
    [0xA7, (mask << 4) | 0x4, h[0], h[1]]
}

fn brcl(mask: u8, rel_halfwords: i32) -> [u8; 6] {
    let w = rel_halfwords.to_be_bytes();
    [0xC0, (mask << 4) | 0x4, w[0], w[1], w[2], w[3]]
}

fn aghi(r1: Reg, imm16: i16) -> [u8; 4] {
    let h = imm16.to_be_bytes();
    [0xA7, (r1 << 4) | 0xB, h[0], h[1]]
}

fn agfi(r1: Reg, imm32: i32) -> [u8; 6] {
    let w = imm32.to_be_bytes();
    [0xC2, (r1 << 4) | 0x8, w[0], w[1], w[2], w[3]]
}

fn agr(r1: Reg, r2: Reg) -> [u8; 4] {
    [0xB9, 0x08, 0x00, (r1 << 4) | r2]
}

fn sgr(r1: Reg, r2: Reg) -> [u8; 4] {
    [0xB9, 0x09, 0x00, (r1 << 4) | r2]
}

fn lgr(r1: Reg, r2: Reg) -> [u8; 4] {
    [0xB9, 0x04, 0x00, (r1 << 4) | r2]
}

fn iihf(r1: Reg, imm32: u32) -> [u8; 6] {
    let w = imm32.to_be_bytes();
    [0xC0, (r1 << 4) | 0x8, w[0], w[1], w[2], w[3]]
}

fn iilf(r1: Reg, imm32: u32) -> [u8; 6] {
    let w = imm32.to_be_bytes();
    [0xC0, (r1 << 4) | 0x9, w[0], w[1], w[2], w[3]]
}

fn svc0() -> [u8; 2] {
    [0x0A, 0x00]
}

/// Materializes an arbitrary 64-bit immediate in exactly two instructions:
/// `iihf` sets the high 32 bits, `iilf` sets the low 32 bits. Neither
/// touches the other half, so order does not matter.
fn emit_set_reg(buf: &mut Buffer, reg: Reg, imm: u64) {
    buf.append(&iihf(reg, (imm >> 32) as u32));
    buf.append(&iilf(reg, imm as u32));
}

fn branch_rel(offset: i64, seq_prefix_len: usize) -> Result<i32, CompileError> {
    let rel = offset - seq_prefix_len as i64;
    // BRCL's own field spans the full 32 bits (+-4 GiB of halfwords), but
    // per spec this backend checks a narrower 17-bit half-word signed
    // range: a byte range of +-2^17 (a 17-bit halfword count, scaled x2
    // into bytes).
    check_branch_range(rel, 1i64 << 17, 2)?;
    Ok((rel / 2) as i32)
}

impl Backend for S390x {
    const NAME: &'static str = "s390x";
    const ALIASES: &'static [&'static str] = &["s390", "z"];

    const ELF_MACHINE: u16 = elf::EM_S390;
    const ELF_DATA: ElfData = ElfData::Be;
    const ELF_FLAGS: u32 = 0;

    const SYS_READ: u64 = sys::ffi::linux::s390x::SYS_READ;
    const SYS_WRITE: u64 = sys::ffi::linux::s390x::SYS_WRITE;
    const SYS_EXIT: u64 = sys::ffi::linux::s390x::SYS_EXIT;

    const BF_PTR: Reg = R8;
    const SC_NUM: Reg = R1;
    const ARG1: Reg = R2;
    const ARG2: Reg = R3;
    const ARG3: Reg = R4;
    const SCRATCH: Reg = R9;

    const LOOP_OPEN_LEN: usize = Self::LLGC_LEN + Self::LTGR_LEN + Self::BRCL_LEN;
    const LOOP_CLOSE_LEN: usize = Self::LLGC_LEN + Self::LTGR_LEN + Self::BRCL_LEN;

    fn set_reg(buf: &mut Buffer, reg: Reg, imm: u64) {
        emit_set_reg(buf, reg, imm);
    }

    fn reg_copy(buf: &mut Buffer, dst: Reg, src: Reg) {
        buf.append(&lgr(dst, src));
    }

    fn syscall(buf: &mut Buffer) {
        buf.append(&svc0());
    }

    fn pad_loop_open(buf: &mut Buffer) {
        buf.append(&llgc(Self::SCRATCH, Self::BF_PTR));
        buf.append(&ltgr(Self::SCRATCH, Self::SCRATCH));
        // Poisoned BRCL: a huge forward offset so an unpatched loop faults
        // on a wild branch instead of continuing silently.
        buf.append(&brcl(MASK_ZERO, i32::MAX));
    }

    fn jump_open(buf: &mut [u8], index: usize, reg: Reg, offset: i64) -> Result<(), CompileError> {
        let prefix = Self::LLGC_LEN + Self::LTGR_LEN;
        let rel = branch_rel(offset, prefix)?;
        let insn = llgc(Self::SCRATCH, reg);
        buf[index..index + Self::LLGC_LEN].copy_from_slice(&insn);
        let test = ltgr(Self::SCRATCH, Self::SCRATCH);
        buf[index + Self::LLGC_LEN..index + prefix].copy_from_slice(&test);
        let branch = brcl(MASK_ZERO, rel);
        buf[index + prefix..index + prefix + Self::BRCL_LEN].copy_from_slice(&branch);
        Ok(())
    }

    fn jump_close(buf: &mut Buffer, reg: Reg, offset: i64) -> Result<(), CompileError> {
        let prefix = Self::LLGC_LEN + Self::LTGR_LEN;
        let rel = branch_rel(offset, prefix)?;
        buf.append(&llgc(Self::SCRATCH, reg));
        buf.append(&ltgr(Self::SCRATCH, Self::SCRATCH));
        buf.append(&brcl(MASK_NONZERO, rel));
        Ok(())
    }

    fn inc_reg(buf: &mut Buffer, reg: Reg) {
        buf.append(&aghi(reg, 1));
    }

    fn dec_reg(buf: &mut Buffer, reg: Reg) {
        buf.append(&aghi(reg, -1));
    }

    fn add_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError> {
        if let Ok(small) = i16::try_from(imm) {
            buf.append(&aghi(reg, small));
        } else if let Ok(mid) = i32::try_from(imm) {
            buf.append(&agfi(reg, mid));
        } else {
            emit_set_reg(buf, Self::SCRATCH, imm);
            buf.append(&agr(reg, Self::SCRATCH));
        }
        Ok(())
    }

    fn sub_reg(buf: &mut Buffer, reg: Reg, imm: u64) -> Result<(), CompileError> {
        if let Ok(small) = i16::try_from(imm) {
            buf.append(&aghi(reg, small.wrapping_neg()));
        } else if let Ok(mid) = i32::try_from(imm) {
            buf.append(&agfi(reg, mid.wrapping_neg()));
        } else {
            emit_set_reg(buf, Self::SCRATCH, imm);
            buf.append(&sgr(reg, Self::SCRATCH));
        }
        Ok(())
    }

    fn inc_byte(buf: &mut Buffer, reg: Reg) {
        buf.append(&llgc(Self::SCRATCH, reg));
        buf.append(&aghi(Self::SCRATCH, 1));
        buf.append(&stc(Self::SCRATCH, reg));
    }

    fn dec_byte(buf: &mut Buffer, reg: Reg) {
        buf.append(&llgc(Self::SCRATCH, reg));
        buf.append(&aghi(Self::SCRATCH, -1));
        buf.append(&stc(Self::SCRATCH, reg));
    }

    fn add_byte(buf: &mut Buffer, reg: Reg, imm: u8) {
        buf.append(&llgc(Self::SCRATCH, reg));
        buf.append(&aghi(Self::SCRATCH, imm as i16));
        buf.append(&stc(Self::SCRATCH, reg));
    }

    fn sub_byte(buf: &mut Buffer, reg: Reg, imm: u8) {
        buf.append(&llgc(Self::SCRATCH, reg));
        buf.append(&aghi(Self::SCRATCH, -(imm as i16)));
        buf.append(&stc(Self::SCRATCH, reg));
    }

    fn zero_byte(buf: &mut Buffer, reg: Reg) {
        // `stc` only ever stores the register's low byte, so a single
        // `iilf` clearing the low 32 bits is enough to get a zero byte.
        buf.append(&iilf(Self::SCRATCH, 0));
        buf.append(&stc(Self::SCRATCH, reg));
    }
}
