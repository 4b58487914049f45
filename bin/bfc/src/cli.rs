//! Command-line surface.
//!
//! This is the "external collaborator" the core spec refers to: argument
//! parsing, the flags' defaults, and their validation all live here so
//! `bfcore` stays oblivious to how a user invokes the compiler.

use std::path::PathBuf;

use clap::Parser;

/// Ahead-of-time brainfuck compiler: brainfuck source straight to a static
/// ELF executable, no assembler or linker involved.
#[derive(Parser, Debug)]
#[command(name = "bfc", version, about, long_about = None)]
pub struct Cli {
    /// Source files to compile. Each must end in `--source-extension`.
    pub files: Vec<PathBuf>,

    /// Suppress human-readable error output on stderr.
    #[arg(long)]
    pub quiet: bool,

    /// Emit errors as JSON records on stdout instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Run the run-length/clear-loop optimizer before code generation.
    #[arg(long)]
    pub optimize: bool,

    /// Preserve partial output on a failed compilation.
    #[arg(long = "keep-failed")]
    pub keep_failed: bool,

    /// Do not stop after the first file that fails to compile.
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,

    /// Print the backends compiled into this binary and exit.
    #[arg(long = "list-targets")]
    pub list_targets: bool,

    /// Required suffix on input filenames; stripped to form the output name.
    #[arg(long = "source-extension", default_value = ".bf")]
    pub source_extension: String,

    /// String appended to the output filename after extension stripping.
    #[arg(long = "output-suffix", default_value = "")]
    pub output_suffix: String,

    /// Tape size, in 4 KiB blocks. Must be at least 1.
    #[arg(long = "tape-size", default_value_t = 8)]
    pub tape_size: u64,

    /// Target backend (x86_64, aarch64, riscv64, s390x, or an alias).
    /// Defaults to the host architecture if it is one of the four.
    #[arg(long = "target-arch")]
    pub target_arch: Option<String>,
}
