//! Executable and Linkable Format
//!
//! The ELF format is the standard object and executable format on Linux and
//! most other UNIX-like systems. This module provides a hand-rolled encoder
//! for the minimal subset of ELF64 needed to describe a statically-linked,
//! directly executable binary: the file header and a two-entry program
//! header table (no section headers, no dynamic segment, no symbol table).
//!
//! Both byte orders are supported; the header layout is parameterized over
//! [`format::Endian`] so a single set of struct definitions serves LSB and
//! MSB targets alike.

use osi::align::AlignAs;
use osi::ffi::{
    BigEndian,
    Integer,
    LittleEndian,
};

type U16Le = Integer<LittleEndian<u16>, AlignAs<2>>;
type U32Le = Integer<LittleEndian<u32>, AlignAs<4>>;
type U64Le = Integer<LittleEndian<u64>, AlignAs<8>>;
type U16Be = Integer<BigEndian<u16>, AlignAs<2>>;
type U32Be = Integer<BigEndian<u32>, AlignAs<4>>;
type U64Be = Integer<BigEndian<u64>, AlignAs<8>>;

/// `e_ident[EI_MAG0..EI_MAG3]`.
pub const MAG: [u8; 4] = [0x7f, b'E', b'L', b'F'];

pub const EI_MAG0: usize = 0;
pub const EI_CLASS: usize = 4;
pub const EI_DATA: usize = 5;
pub const EI_VERSION: usize = 6;
pub const EI_OSABI: usize = 7;
pub const EI_ABIVERSION: usize = 8;
pub const EI_PAD: usize = 9;
pub const EI_NIDENT: usize = 16;

pub const CLASS_64: u8 = 2;

pub const DATA_LSB: u8 = 1;
pub const DATA_MSB: u8 = 2;

pub const VERSION_CURRENT: u8 = 1;

pub const OSABI_SYSV: u8 = 0;

pub const ET_EXEC: u16 = 2;

pub const EM_386: u16 = 3;
pub const EM_S390: u16 = 22;
pub const EM_X86_64: u16 = 62;
pub const EM_AARCH64: u16 = 183;
pub const EM_RISCV: u16 = 243;

pub const PT_LOAD: u32 = 1;

pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

/// Size in bytes of [`Ehdr64`], for either byte order.
pub const EHDR64_SIZE: usize = 64;
/// Size in bytes of [`Phdr64`], for either byte order.
pub const PHDR64_SIZE: usize = 56;

/// Byte-order parameterization of the ELF64 header types.
///
/// `Le` and `Be` are the two predefined instances, selecting the little- and
/// big-endian field encodings respectively. Backends select one of these via
/// their `elf_data` tag (see `bfcore::backend::Backend`).
pub mod format {
    use osi::ffi::NativeEndian;

    pub trait Endian {
        type U16: NativeEndian<u16> + Copy;
        type U32: NativeEndian<u32> + Copy;
        type U64: NativeEndian<u64> + Copy;

        /// `e_ident[EI_DATA]` value matching this byte order.
        const EI_DATA: u8;
    }

    pub struct Le {}

    impl Endian for Le {
        type U16 = super::U16Le;
        type U32 = super::U32Le;
        type U64 = super::U64Le;

        const EI_DATA: u8 = super::DATA_LSB;
    }

    pub struct Be {}

    impl Endian for Be {
        type U16 = super::U16Be;
        type U32 = super::U32Be;
        type U64 = super::U64Be;

        const EI_DATA: u8 = super::DATA_MSB;
    }
}

/// The 64-byte ELF64 file header.
#[repr(C)]
pub struct Ehdr64<FORMAT: format::Endian = format::Le> {
    pub e_ident: [u8; EI_NIDENT],
    pub e_type: FORMAT::U16,
    pub e_machine: FORMAT::U16,
    pub e_version: FORMAT::U32,
    pub e_entry: FORMAT::U64,
    pub e_phoff: FORMAT::U64,
    pub e_shoff: FORMAT::U64,
    pub e_flags: FORMAT::U32,
    pub e_ehsize: FORMAT::U16,
    pub e_phentsize: FORMAT::U16,
    pub e_phnum: FORMAT::U16,
    pub e_shentsize: FORMAT::U16,
    pub e_shnum: FORMAT::U16,
    pub e_shstrndx: FORMAT::U16,
}

/// One entry of the ELF64 program header table.
#[repr(C)]
pub struct Phdr64<FORMAT: format::Endian = format::Le> {
    pub p_type: FORMAT::U32,
    pub p_flags: FORMAT::U32,
    pub p_offset: FORMAT::U64,
    pub p_vaddr: FORMAT::U64,
    pub p_paddr: FORMAT::U64,
    pub p_filesz: FORMAT::U64,
    pub p_memsz: FORMAT::U64,
    pub p_align: FORMAT::U64,
}

fn ident(data: u8) -> [u8; EI_NIDENT] {
    let mut v = [0u8; EI_NIDENT];
    v[EI_MAG0..EI_MAG0 + 4].copy_from_slice(&MAG);
    v[EI_CLASS] = CLASS_64;
    v[EI_DATA] = data;
    v[EI_VERSION] = VERSION_CURRENT;
    v[EI_OSABI] = OSABI_SYSV;
    v[EI_ABIVERSION] = 0;
    let _ = EI_PAD;
    v
}

/// Parameters needed to compose the header region of a compiled artifact.
///
/// `code_size` is the size, in bytes, of the *entire* output file (headers
/// included), matching the code segment's `PT_LOAD` contract in which file
/// offset 0 maps the whole file read+execute.
pub struct Layout {
    pub machine: u16,
    pub flags: u32,
    pub tape_bytes: u64,
    pub code_size: u64,
}

pub const TAPE_VADDR: u64 = 0x10000;
pub const CODE_VADDR: u64 = 0x20000;
pub const HEADERS_SIZE: u64 = EHDR64_SIZE as u64 + 2 * PHDR64_SIZE as u64;

fn u16field<FORMAT: format::Endian>(v: u16) -> FORMAT::U16 {
    <FORMAT::U16 as osi::ffi::NativeEndian<u16>>::from_native(v)
}

fn u32field<FORMAT: format::Endian>(v: u32) -> FORMAT::U32 {
    <FORMAT::U32 as osi::ffi::NativeEndian<u32>>::from_native(v)
}

fn u64field<FORMAT: format::Endian>(v: u64) -> FORMAT::U64 {
    <FORMAT::U64 as osi::ffi::NativeEndian<u64>>::from_native(v)
}

fn ehdr64<FORMAT: format::Endian>(layout: &Layout) -> Ehdr64<FORMAT> {
    Ehdr64 {
        e_ident: ident(FORMAT::EI_DATA),
        e_type: u16field::<FORMAT>(ET_EXEC),
        e_machine: u16field::<FORMAT>(layout.machine),
        e_version: u32field::<FORMAT>(VERSION_CURRENT as u32),
        e_entry: u64field::<FORMAT>(CODE_VADDR + HEADERS_SIZE),
        e_phoff: u64field::<FORMAT>(EHDR64_SIZE as u64),
        e_shoff: u64field::<FORMAT>(0),
        e_flags: u32field::<FORMAT>(layout.flags),
        e_ehsize: u16field::<FORMAT>(EHDR64_SIZE as u16),
        e_phentsize: u16field::<FORMAT>(PHDR64_SIZE as u16),
        e_phnum: u16field::<FORMAT>(2),
        e_shentsize: u16field::<FORMAT>(0),
        e_shnum: u16field::<FORMAT>(0),
        e_shstrndx: u16field::<FORMAT>(0),
    }
}

fn phdr_tape64<FORMAT: format::Endian>(layout: &Layout) -> Phdr64<FORMAT> {
    Phdr64 {
        p_type: u32field::<FORMAT>(PT_LOAD),
        p_flags: u32field::<FORMAT>(PF_R | PF_W),
        p_offset: u64field::<FORMAT>(0),
        p_vaddr: u64field::<FORMAT>(TAPE_VADDR),
        p_paddr: u64field::<FORMAT>(TAPE_VADDR),
        p_filesz: u64field::<FORMAT>(0),
        p_memsz: u64field::<FORMAT>(layout.tape_bytes),
        p_align: u64field::<FORMAT>(0x1000),
    }
}

fn phdr_code64<FORMAT: format::Endian>(layout: &Layout) -> Phdr64<FORMAT> {
    Phdr64 {
        p_type: u32field::<FORMAT>(PT_LOAD),
        p_flags: u32field::<FORMAT>(PF_R | PF_X),
        p_offset: u64field::<FORMAT>(0),
        p_vaddr: u64field::<FORMAT>(CODE_VADDR),
        p_paddr: u64field::<FORMAT>(CODE_VADDR),
        p_filesz: u64field::<FORMAT>(layout.code_size),
        p_memsz: u64field::<FORMAT>(layout.code_size),
        p_align: u64field::<FORMAT>(1),
    }
}

/// Write the ELF header and the two program header entries into `out`, which
/// must be at least [`HEADERS_SIZE`] bytes long. `FORMAT` selects the byte
/// order; both orderings produce header structs of identical size, so the
/// layout of `out` does not depend on it.
pub fn write_headers<FORMAT: format::Endian>(out: &mut [u8], layout: &Layout) {
    assert!(out.len() as u64 >= HEADERS_SIZE);

    let ehdr = ehdr64::<FORMAT>(layout);
    let phdr_tape = phdr_tape64::<FORMAT>(layout);
    let phdr_code = phdr_code64::<FORMAT>(layout);

    let mut offset = 0;
    out[offset..offset + EHDR64_SIZE].copy_from_slice(osi::mem::as_bytes(&ehdr));
    offset += EHDR64_SIZE;
    out[offset..offset + PHDR64_SIZE].copy_from_slice(osi::mem::as_bytes(&phdr_tape));
    offset += PHDR64_SIZE;
    out[offset..offset + PHDR64_SIZE].copy_from_slice(osi::mem::as_bytes(&phdr_code));
}
