//! Host-architecture default for `--target-arch`.

use bfcore::backend::Arch;

/// The backend matching the architecture `bfc` itself was built for, if
/// one of the four is supported. Cross-compiling to another backend
/// always requires an explicit `--target-arch`.
pub fn host_arch() -> Option<Arch> {
    if cfg!(target_arch = "x86_64") {
        Some(Arch::X86_64)
    } else if cfg!(target_arch = "aarch64") {
        Some(Arch::Aarch64)
    } else if cfg!(target_arch = "riscv64") {
        Some(Arch::Riscv64)
    } else if cfg!(target_arch = "s390x") {
        Some(Arch::S390x)
    } else {
        None
    }
}
