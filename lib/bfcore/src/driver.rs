//! # Compile driver
//!
//! Orchestrates a single compilation end to end (§4.6): reserve header
//! space, emit the tape-pointer setup, stream source (raw or optimized)
//! through the selected backend while patching loop branches, emit the
//! exit sequence, and splice the ELF header once the final size is known.
//!
//! The driver owns exactly two pieces of mutable state for the duration of
//! one compilation: the output [`Buffer`] and the [`LoopStack`] of deferred
//! `[` fixups. Neither survives past [`compile`] returning.

use alloc::vec::Vec;

use crate::backend::{self, Arch, Backend, ElfData};
use crate::buffer::Buffer;
use crate::error::{CompileError, ErrorKind, Location as ErrLocation};
use crate::ir::{self, Instr, Op};
use binfmt::elf;

/// Bound on `[` nesting depth (§3: "bounded LIFO (>= 64 entries)").
pub const MAX_NESTING: usize = 64;

/// Parameters a frontend supplies for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Which backend emits the machine code.
    pub arch: Arch,
    /// Whether to run the IR optimizer (§4.5) before streaming.
    pub optimize: bool,
    /// Tape size in 4 KiB blocks (CLI default: 8).
    pub tape_blocks: u64,
}

/// The result of one compilation.
///
/// `bytes` is always a well-formed (spliced) ELF image when `errors` is
/// empty. When `errors` is non-empty, `bytes` still holds whatever the
/// driver managed to assemble — including any poisoned, unpatched
/// `pad_loop_open` placeholders — so that a frontend honoring
/// `keep-failed` writes out something a standard ELF tool can at least
/// parse and disassemble (§4.8, §9).
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub bytes: Vec<u8>,
    pub errors: Vec<CompileError>,
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One deferred `[` fixup: the code-buffer offset of its `pad_loop_open`
/// placeholder, plus the source location for diagnostics.
#[derive(Debug, Clone, Copy)]
struct LoopFrame {
    offset: usize,
    location: ErrLocation,
}

/// Bounded LIFO of open-branch fixups (§3).
#[derive(Default)]
struct LoopStack {
    frames: Vec<LoopFrame>,
}

impl LoopStack {
    fn push(&mut self, frame: LoopFrame) -> Result<(), CompileError> {
        if self.frames.len() >= MAX_NESTING {
            return Err(CompileError::new(
                ErrorKind::NestedTooDeep,
                alloc::format!("loop nesting exceeds the bound of {MAX_NESTING}"),
            )
            .with_location(frame.location.line, frame.location.column));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn pop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    fn drain_unclosed(&mut self) -> Vec<LoopFrame> {
        core::mem::take(&mut self.frames)
    }
}

fn to_err_location(loc: ir::Location) -> ErrLocation {
    ErrLocation { line: loc.line, column: loc.column }
}

/// Validates the tape size against the spec's constraints, returning the
/// byte count of the tape segment's `PT_LOAD` `p_memsz` on success.
fn tape_bytes(tape_blocks: u64) -> Result<u64, CompileError> {
    if tape_blocks == 0 {
        return Err(CompileError::new(ErrorKind::TapeSizeZero, "tape size must be at least one 4 KiB block"));
    }
    // "must fit in 52 bits": the block count itself, before the implicit
    // *4096 (12-bit) scaling that would otherwise silently overflow a
    // 64-bit byte count.
    if tape_blocks >= (1u64 << 52) {
        return Err(CompileError::new(ErrorKind::TapeTooLarge, "tape size exceeds 52 bits of 4 KiB blocks"));
    }
    Ok(tape_blocks * 4096)
}

/// Compiles `source` for the backend selected by `options.arch`.
pub fn compile(source: &[u8], options: &CompileOptions) -> CompileResult {
    match options.arch {
        Arch::X86_64 => compile_with::<backend::x86_64::X86_64>(source, options),
        Arch::Aarch64 => compile_with::<backend::aarch64::Aarch64>(source, options),
        Arch::Riscv64 => compile_with::<backend::riscv64::Riscv64>(source, options),
        Arch::S390x => compile_with::<backend::s390x::S390x>(source, options),
    }
}

fn compile_with<B: Backend>(source: &[u8], options: &CompileOptions) -> CompileResult {
    let tape_bytes = match tape_bytes(options.tape_blocks) {
        Ok(bytes) => bytes,
        Err(e) => return CompileResult { bytes: Vec::new(), errors: alloc::vec![e] },
    };

    let mut buf = Buffer::new();
    let mut errors = Vec::new();
    let mut stack = LoopStack::default();

    // Step 2: reserve the header region; it is spliced in at the end once
    // the final file size is known (step 7).
    buf.reserve(elf::HEADERS_SIZE as usize);

    // Step 3: materialize the tape pointer.
    B::set_reg(&mut buf, B::BF_PTR, elf::TAPE_VADDR);

    let stream = if options.optimize { ir::optimize(source) } else { ir::raw(source) };

    for instr in &stream {
        if let Err(e) = emit::<B>(&mut buf, &mut stack, *instr) {
            if e.kind.is_fatal() {
                // §7 category 2: an IR-invariant violation (e.g. a
                // misaligned branch offset, which can only arise from a
                // backend's own instruction lengths disagreeing with
                // themselves) is never recoverable.
                panic!("bfcore: internal compiler error: {e}");
            }
            let abort = e.kind == ErrorKind::NestedTooDeep;
            errors.push(e);
            if abort {
                // §4.6: "abort this compilation" — unlike other compile
                // errors, which are recorded and streaming continues, a
                // stack overflow leaves the rest of the source unparsed.
                // Whatever loops are still open fall out through the
                // UnmatchedOpen sweep below.
                break;
            }
        }
    }

    // Step 5: exit(0).
    B::set_reg(&mut buf, B::SC_NUM, B::SYS_EXIT);
    B::set_reg(&mut buf, B::ARG1, 0);
    B::syscall(&mut buf);

    // Step 6: anything left on the stack never saw a matching `]`.
    for frame in stack.drain_unclosed() {
        errors.push(
            CompileError::new(ErrorKind::UnmatchedOpen, "`[` has no matching `]`")
                .with_location(frame.location.line, frame.location.column),
        );
    }

    // Step 7: splice the ELF header now that the total size is known.
    let code_size = buf.len() as u64;
    let layout = elf::Layout {
        machine: B::ELF_MACHINE,
        flags: B::ELF_FLAGS,
        tape_bytes,
        code_size,
    };
    let header_region = &mut buf.as_mut_slice()[..elf::HEADERS_SIZE as usize];
    match B::ELF_DATA {
        ElfData::Le => elf::write_headers::<elf::format::Le>(header_region, &layout),
        ElfData::Be => elf::write_headers::<elf::format::Be>(header_region, &layout),
    }

    CompileResult { bytes: buf.into_vec(), errors }
}

/// Emits one opcode. Returns `Err` on a backend-reported failure
/// (`JumpTooLong`, `TooManyInstructions`, or an internal-compiler-error
/// kind); all of these are attributed the opcode's source location.
fn emit<B: Backend>(buf: &mut Buffer, stack: &mut LoopStack, instr: Instr) -> Result<(), CompileError> {
    let loc = to_err_location(instr.location);
    let attribute = |e: CompileError| e.with_location(loc.line, loc.column);

    match instr.op {
        Op::MoveRight(1) => B::inc_reg(buf, B::BF_PTR),
        Op::MoveRight(n) => B::add_reg(buf, B::BF_PTR, n).map_err(attribute)?,
        Op::MoveLeft(1) => B::dec_reg(buf, B::BF_PTR),
        Op::MoveLeft(n) => B::sub_reg(buf, B::BF_PTR, n).map_err(attribute)?,
        Op::IncCell(1) => B::inc_byte(buf, B::BF_PTR),
        Op::IncCell(n) => B::add_byte(buf, B::BF_PTR, n),
        Op::DecCell(1) => B::dec_byte(buf, B::BF_PTR),
        Op::DecCell(n) => B::sub_byte(buf, B::BF_PTR, n),
        Op::ClearCell => B::zero_byte(buf, B::BF_PTR),
        Op::Read => {
            B::set_reg(buf, B::SC_NUM, B::SYS_READ);
            B::set_reg(buf, B::ARG1, 0);
            B::reg_copy(buf, B::ARG2, B::BF_PTR);
            B::set_reg(buf, B::ARG3, 1);
            B::syscall(buf);
        }
        Op::Write => {
            B::set_reg(buf, B::SC_NUM, B::SYS_WRITE);
            B::set_reg(buf, B::ARG1, 1);
            B::reg_copy(buf, B::ARG2, B::BF_PTR);
            B::set_reg(buf, B::ARG3, 1);
            B::syscall(buf);
        }
        Op::JumpIfZero => {
            let offset = buf.len();
            stack.push(LoopFrame { offset, location: loc })?;
            B::pad_loop_open(buf);
        }
        Op::JumpIfNonzero => match stack.pop() {
            Some(frame) => {
                let distance = (buf.len() - frame.offset) as i64;
                B::jump_open(buf.as_mut_slice(), frame.offset, B::BF_PTR, distance).map_err(attribute)?;
                B::jump_close(buf, B::BF_PTR, -distance).map_err(attribute)?;
            }
            None => {
                return Err(CompileError::new(ErrorKind::UnmatchedClose, "`]` has no matching `[`").with_location(loc.line, loc.column));
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Arch;
    use alloc::vec;

    fn opts(arch: Arch, optimize: bool) -> CompileOptions {
        CompileOptions { arch, optimize, tape_blocks: 8 }
    }

    #[test]
    fn empty_source_compiles_on_every_backend() {
        for arch in Arch::ALL {
            let result = compile(b"", &opts(arch, false));
            assert!(result.is_success(), "{}: {:?}", arch.name(), result.errors);
            assert!(result.bytes.len() >= elf::HEADERS_SIZE as usize);
        }
    }

    #[test]
    fn elf_header_has_two_load_segments_and_correct_entry() {
        for arch in Arch::ALL {
            let result = compile(b"+.", &opts(arch, false));
            assert!(result.is_success());
            let bytes = &result.bytes;

            assert_eq!(&bytes[0..4], &elf::MAG);
            assert_eq!(bytes[elf::EI_CLASS], elf::CLASS_64);

            let read_u16 = |off: usize, be: bool| -> u16 {
                let b = [bytes[off], bytes[off + 1]];
                if be { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) }
            };
            let read_u64 = |off: usize, be: bool| -> u64 {
                let b: [u8; 8] = bytes[off..off + 8].try_into().unwrap();
                if be { u64::from_be_bytes(b) } else { u64::from_le_bytes(b) }
            };

            let be = bytes[elf::EI_DATA] == elf::DATA_MSB;
            assert_eq!(read_u16(56, be), 2, "e_phnum must be 2");
            let entry = read_u64(24, be);
            assert_eq!(entry, elf::CODE_VADDR + elf::HEADERS_SIZE);

            let phdr_tape = elf::EHDR64_SIZE;
            let phdr_code = elf::EHDR64_SIZE + elf::PHDR64_SIZE;
            let be32 = |off: usize| -> u32 {
                let b: [u8; 4] = bytes[off..off + 4].try_into().unwrap();
                if be { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) }
            };
            assert_eq!(be32(phdr_tape), elf::PT_LOAD);
            assert_eq!(be32(phdr_code), elf::PT_LOAD);
        }
    }

    #[test]
    fn unmatched_open_is_reported_with_location() {
        let result = compile(b"[", &opts(Arch::X86_64, false));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::UnmatchedOpen);
        assert_eq!(result.errors[0].location.map(|l| l.column), Some(1));
    }

    #[test]
    fn unmatched_close_is_reported_and_compilation_continues() {
        let result = compile(b"]+.", &opts(Arch::X86_64, false));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::UnmatchedClose);
    }

    #[test]
    fn nested_too_deep_aborts_the_instruction_stream() {
        // MAX_NESTING+1 consecutive opens and nothing else: the (MAX_NESTING+1)-th
        // push fails, aborting the stream immediately, so none of the
        // `[` tokens ever gets a matching close. The driver still reports
        // the MAX_NESTING frames left on the stack as unmatched opens.
        let src = vec![b'['; MAX_NESTING + 1];
        let result = compile(&src, &opts(Arch::X86_64, false));
        assert_eq!(result.errors.iter().filter(|e| e.kind == ErrorKind::NestedTooDeep).count(), 1);
        assert_eq!(result.errors.iter().filter(|e| e.kind == ErrorKind::UnmatchedOpen).count(), MAX_NESTING);
    }

    #[test]
    fn tape_size_zero_is_rejected() {
        let result = compile(b"", &CompileOptions { arch: Arch::X86_64, optimize: false, tape_blocks: 0 });
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::TapeSizeZero);
    }

    #[test]
    fn tape_too_large_is_rejected() {
        let result = compile(b"", &CompileOptions { arch: Arch::X86_64, optimize: false, tape_blocks: 1u64 << 52 });
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::TapeTooLarge);
    }

    #[test]
    fn optimizer_and_raw_mode_both_compile_a_loop_successfully() {
        let src = b"++++++++[>++++++++<-]>+.";
        for optimize in [false, true] {
            let result = compile(src, &opts(Arch::X86_64, optimize));
            assert!(result.is_success(), "optimize={optimize}: {:?}", result.errors);
        }
    }

    #[test]
    fn balanced_nested_loops_compile_on_every_backend() {
        let src = b"+[->+<[->+<]]";
        for arch in Arch::ALL {
            for optimize in [false, true] {
                let result = compile(src, &opts(arch, optimize));
                assert!(result.is_success(), "{} optimize={}: {:?}", arch.name(), optimize, result.errors);
            }
        }
    }

    #[test]
    fn read_and_write_compile_on_every_backend() {
        for arch in Arch::ALL {
            let result = compile(b",.", &opts(arch, false));
            assert!(result.is_success(), "{}: {:?}", arch.name(), result.errors);
        }
    }

    #[test]
    fn clear_loop_compiles_only_under_optimize() {
        // Under raw streaming `[-]` is just an ordinary balanced loop;
        // under optimize it collapses to `ClearCell`. Both must compile.
        let result_raw = compile(b"[-]", &opts(Arch::X86_64, false));
        let result_opt = compile(b"[-]", &opts(Arch::X86_64, true));
        assert!(result_raw.is_success());
        assert!(result_opt.is_success());
    }
}
