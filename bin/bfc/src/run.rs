//! Per-file compile pipeline: extension stripping, the read/compile/write
//! sequence, and exit-status bookkeeping. This is the file-descriptor and
//! allocation lifecycle the core spec keeps external (§5): `bfcore` never
//! opens a file or holds one across a call.

use std::path::{Path, PathBuf};

use bfcore::backend::Arch;
use bfcore::driver::{self, CompileOptions};
use bfcore::error::{CompileError, ErrorKind};
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::diagnostics::{ErrorRecord, Reporter};
use crate::resources::OutputGuard;

/// Strips `source_extension` from `input`'s filename and appends
/// `output_suffix`, operating on the full (lossy) path string so the
/// extension is matched regardless of any directory components.
///
/// `MultipleExtensions` fires when the extension occurs twice in a row at
/// the end of the name (e.g. `prog.bf.bf` against `.bf`): which occurrence
/// is "the" extension is ambiguous, so this is treated as a user error
/// rather than silently stripping one of them.
fn output_path(input: &Path, source_extension: &str, output_suffix: &str) -> Result<PathBuf, CompileError> {
    let name = input.to_string_lossy();
    if source_extension.is_empty() || !name.ends_with(source_extension) {
        return Err(CompileError::new(
            ErrorKind::BadSourceExtension,
            format!("filename does not end in {source_extension:?}"),
        )
        .with_file(name.into_owned()));
    }
    let stripped = &name[..name.len() - source_extension.len()];
    if stripped.ends_with(source_extension) {
        return Err(CompileError::new(
            ErrorKind::MultipleExtensions,
            format!("filename ends in {source_extension:?} more than once"),
        )
        .with_file(name.into_owned()));
    }
    Ok(PathBuf::from(format!("{stripped}{output_suffix}")))
}

/// Compiles one source file end to end. Returns whether it succeeded.
pub fn compile_file(input: &Path, cli: &Cli, arch: Arch, reporter: &Reporter) -> bool {
    let report_one = |err: &CompileError, file: Option<&Path>| {
        reporter.report(&ErrorRecord::from_core(err, file));
    };

    let output = match output_path(input, &cli.source_extension, &cli.output_suffix) {
        Ok(path) => path,
        Err(e) => {
            report_one(&e, Some(input));
            return false;
        }
    };

    info!(file = %input.display(), target = %arch.name(), "compiling");

    let source = match std::fs::read(input) {
        Ok(bytes) => bytes,
        Err(io_err) => {
            let e = CompileError::new(ErrorKind::FailedRead, io_err.to_string()).with_file(input.to_string_lossy().into_owned());
            report_one(&e, Some(input));
            return false;
        }
    };
    debug!(bytes = source.len(), "read source");

    let options = CompileOptions { arch, optimize: cli.optimize, tape_blocks: cli.tape_size };
    let result = driver::compile(&source, &options);

    for err in &result.errors {
        report_one(err, Some(input));
    }

    let succeeded = result.is_success();
    if !succeeded && !cli.keep_failed {
        warn!(file = %input.display(), "compilation failed, discarding output");
        return false;
    }

    let guard = OutputGuard::new(output.clone());
    if let Err(io_err) = write_executable(guard.path(), &result.bytes) {
        let e = CompileError::new(ErrorKind::FailedWrite, io_err.to_string()).with_file(output.to_string_lossy().into_owned());
        report_one(&e, Some(input));
        return false;
    }
    guard.commit();

    succeeded
}

#[cfg(unix)]
fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o755)
        .open(path)?;
    std::io::Write::write_all(&mut file, bytes)?;
    // `mode()` only applies at creation time if the file is new; make sure
    // an existing, reused path still ends up executable.
    let mut perms = std::fs::metadata(path)?.permissions();
    std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_extension_and_appends_suffix() {
        let out = output_path(Path::new("prog.bf"), ".bf", "").unwrap();
        assert_eq!(out, PathBuf::from("prog"));

        let out = output_path(Path::new("prog.bf"), ".bf", ".out").unwrap();
        assert_eq!(out, PathBuf::from("prog.out"));
    }

    #[test]
    fn keeps_directory_components() {
        let out = output_path(Path::new("dir/sub/prog.bf"), ".bf", "").unwrap();
        assert_eq!(out, PathBuf::from("dir/sub/prog"));
    }

    #[test]
    fn rejects_a_filename_missing_the_extension() {
        let err = output_path(Path::new("prog.txt"), ".bf", "").unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadSourceExtension);
    }

    #[test]
    fn rejects_a_doubled_extension() {
        let err = output_path(Path::new("prog.bf.bf"), ".bf", "").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MultipleExtensions);
    }

    #[test]
    fn rejects_an_empty_extension() {
        let err = output_path(Path::new("prog"), "", "").unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadSourceExtension);
    }
}
