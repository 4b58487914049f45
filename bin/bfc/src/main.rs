//! `bfc` — ahead-of-time brainfuck compiler frontend.
//!
//! Everything architecture-specific lives in `bfcore`; this binary is the
//! "external collaborator" the spec describes: it parses arguments, opens
//! and closes files, formats diagnostics, and maps the result onto a shell
//! exit code.

mod arch;
mod cli;
mod diagnostics;
mod resources;
mod run;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bfcore::backend::Arch;
use bfcore::error::{CompileError, ErrorKind};

use cli::Cli;
use diagnostics::{ErrorRecord, Reporter};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let reporter = Reporter::new(cli.quiet, cli.json);

    if cli.list_targets {
        for arch in Arch::ALL {
            println!("{}", arch.name());
        }
        std::process::exit(0);
    }

    let arch = match resolve_arch(&cli, &reporter) {
        Some(arch) => arch,
        None => std::process::exit(1),
    };

    if cli.files.is_empty() {
        let e = CompileError::new(ErrorKind::NoSourceFiles, "no source files given");
        reporter.report(&ErrorRecord::from_core(&e, None));
        std::process::exit(1);
    }

    let mut any_failed = false;
    for file in &cli.files {
        let ok = run::compile_file(file, &cli, arch, &reporter);
        if !ok {
            any_failed = true;
            if !cli.continue_on_error {
                break;
            }
        }
    }

    // §6: exit codes are shell-portable, i.e. only the low 8 bits matter.
    std::process::exit(if any_failed { 1 } else { 0 });
}

fn resolve_arch(cli: &cli::Cli, reporter: &Reporter) -> Option<Arch> {
    match &cli.target_arch {
        Some(name) => match Arch::from_name(name) {
            Ok(arch) => Some(arch),
            Err(e) => {
                reporter.report(&ErrorRecord::from_core(&e, None));
                None
            }
        },
        None => match arch::host_arch() {
            Some(arch) => Some(arch),
            None => {
                let e = CompileError::new(
                    ErrorKind::UnknownArch,
                    "host architecture has no built-in backend; pass --target-arch explicitly",
                );
                reporter.report(&ErrorRecord::from_core(&e, None));
                None
            }
        },
    }
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
