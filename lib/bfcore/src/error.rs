//! # Error Record Contract
//!
//! The core never formats errors for a human or for JSON; it only
//! constructs [`CompileError`] values. Formatting, escaping, and exit-code
//! mapping are the responsibility of the external collaborator (the CLI
//! frontend). This module defines the closed vocabulary both sides agree on.

use alloc::string::String;

/// The closed set of error identifiers the core can ever report.
///
/// This enum is intentionally closed: adding a new compile-time failure
/// mode means adding a variant here, not inventing a string elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Compile errors (bad user input), §7 category 1.
    BadSourceExtension,
    MultipleExtensions,
    NoSourceFiles,
    UnknownArch,
    TapeSizeZero,
    TapeTooLarge,
    FailedRead,
    FailedWrite,
    UnmatchedOpen,
    UnmatchedClose,
    NestedTooDeep,
    JumpTooLong,
    ImmediateTooLarge,
    TooManyInstructions,

    // Internal compiler errors (invariant violated), §7 category 2.
    InternalError,

    // Fatal system errors, §7 category 3.
    BufferTooLarge,
    AllocFailure,
}

impl ErrorKind {
    /// Whether this kind belongs to §7 category 1 (recoverable per file).
    pub const fn is_compile_error(self) -> bool {
        !matches!(self, Self::InternalError | Self::BufferTooLarge | Self::AllocFailure)
    }

    /// Whether this kind is fatal and must abort the whole process, not
    /// just the current file.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InternalError | Self::BufferTooLarge | Self::AllocFailure)
    }

    /// The tag as it appears in the error record's `id` field.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::BadSourceExtension => "BadSourceExtension",
            Self::MultipleExtensions => "MultipleExtensions",
            Self::NoSourceFiles => "NoSourceFiles",
            Self::UnknownArch => "UnknownArch",
            Self::TapeSizeZero => "TapeSizeZero",
            Self::TapeTooLarge => "TapeTooLarge",
            Self::FailedRead => "FailedRead",
            Self::FailedWrite => "FailedWrite",
            Self::UnmatchedOpen => "UnmatchedOpen",
            Self::UnmatchedClose => "UnmatchedClose",
            Self::NestedTooDeep => "NestedTooDeep",
            Self::JumpTooLong => "JumpTooLong",
            Self::ImmediateTooLarge => "ImmediateTooLarge",
            Self::TooManyInstructions => "TooManyInstructions",
            Self::InternalError => "InternalError",
            Self::BufferTooLarge => "BufferTooLarge",
            Self::AllocFailure => "AllocFailure",
        }
    }
}

/// A source location, relaxed-accuracy inside an optimizer-collapsed run
/// (see `ir::optimize`'s doc comment for the exact contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// The error record contract shared between the core and its formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub file: Option<String>,
    pub location: Option<Location>,
    pub instruction: Option<u8>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            location: None,
            instruction: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.location = Some(Location { line, column });
        self
    }

    pub fn with_instruction(mut self, byte: u8) -> Self {
        self.instruction = Some(byte);
        self
    }
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        write!(fmt, "{}: {}", self.kind.tag(), self.message)
    }
}

impl core::error::Error for CompileError {}
