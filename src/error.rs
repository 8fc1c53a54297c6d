//! Internal failure kinds and process exit codes.
//!
//! Diagnostic severities (what the analyzer tells the user about their code)
//! live in [`crate::errorlogger`]; the types here describe what went wrong
//! inside the analyzer itself. No failure escapes the core as a panic: every
//! variant maps to a diagnostic or a clean early return.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes for the cppscan CLI.
///
/// The analyzer itself exits with the number of files that produced at least
/// one error-severity diagnostic (capped at 255). The constants below cover
/// the non-analysis exits.
pub mod exit_code {
    /// No error-severity findings.
    pub const CLEAN: i32 = 0;
    /// Bad command line or unreadable config file.
    pub const CONFIG_ERROR: i32 = 2;
    /// Internal error (a bug in cppscan itself).
    pub const INTERNAL_ERROR: i32 = 4;
}

// ---------------------------------------------------------------------------
// Analyzer errors
// ---------------------------------------------------------------------------

/// Errors that can occur while reading or preparing a file for analysis.
///
/// These are all per-file recoverable: the analyzer logs them and moves on to
/// the next file.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("I/O error reading {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file is not valid UTF-8: {path}")]
    Encoding { path: PathBuf },

    #[error("path is neither a file nor a directory: {path}")]
    NotFound { path: PathBuf },
}

/// Errors from parsing a suppressions list (`--suppressions <file>` or a
/// repeated `--suppress=` flag).
#[derive(Error, Debug)]
pub enum SuppressionError {
    #[error("empty suppression id")]
    EmptyId,

    #[error("invalid line number '{0}' in suppression")]
    BadLine(String),

    #[error("I/O error reading suppressions file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
