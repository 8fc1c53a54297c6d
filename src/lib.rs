//! cppscan: static analysis for C and C++ code.
//!
//! The pipeline: the [`preprocessor`] expands one translation unit into a
//! textual slice per interesting preprocessor configuration; the
//! [`simplifier`] lexes each slice into a doubly-linked [`token`] stream and
//! rewrites it into a canonical form; the [`checks`] registry pattern-matches
//! that stream (with an execution-path engine for the flow-sensitive
//! analyses) and reports [`errorlogger::ErrorMessage`] diagnostics. The
//! [`analyzer::Analyzer`] orchestrates all of it per file and computes the
//! exit code.
//!
//! ```no_run
//! use cppscan::{Analyzer, CollectingLogger, MemoryLister, Settings};
//!
//! let mut analyzer = Analyzer::new(Settings::default());
//! let mut logger = CollectingLogger::new();
//! let files = vec![(
//!     "example.cpp".to_string(),
//!     Some("void f() { char* p = malloc(10); }".to_string()),
//! )];
//! let exit_code = analyzer.check(&files, &MemoryLister::new(), &mut logger);
//! assert_eq!(exit_code, 1);
//! ```

pub mod analyzer;
pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod errorlogger;
pub mod filelister;
pub mod lexer;
pub mod mathlib;
pub mod preprocessor;
pub mod settings;
pub mod simplifier;
pub mod suppressions;
pub mod token;

pub use analyzer::{Analyzer, SourceFile};
pub use checks::{Check, CheckContext, CheckRegistry};
pub use cli::Cli;
pub use config::{discover as discover_config, FileConfig, CONFIG_FILE_NAME};
pub use error::{exit_code, AnalyzerError};
pub use errorlogger::{
    CollectingLogger, ErrorLogger, ErrorMessage, FileLocation, Severity, TextLogger, XmlLogger,
};
pub use filelister::{FileLister, FsLister, MemoryLister};
pub use preprocessor::Preprocessor;
pub use settings::{Checkable, Platform, Settings, Standards};
pub use simplifier::Simplifier;
pub use suppressions::Suppressions;
pub use token::{Token, TokenId, TokenKind, TokenList};
