//! Analyzer settings: which checks run, how the preprocessor searches for
//! headers, and which platform's type widths apply.
//!
//! `Settings` is built once by the CLI front-end (optionally merged with a
//! discovered `.cppscan.toml`) and is immutable for the duration of a run,
//! except for the cooperative terminate flag.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Checkable message classes
// ---------------------------------------------------------------------------

/// Optional diagnostic classes that can be switched on with `--enable`.
///
/// Error-severity findings are always emitted and have no entry here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Checkable {
    Style,
    Warning,
    Performance,
    Portability,
    Information,
    UnusedFunction,
    MissingInclude,
}

impl Checkable {
    /// All classes, in the order `--enable=all` switches them on.
    pub fn all() -> &'static [Checkable] {
        &[
            Checkable::Style,
            Checkable::Warning,
            Checkable::Performance,
            Checkable::Portability,
            Checkable::Information,
            Checkable::UnusedFunction,
            Checkable::MissingInclude,
        ]
    }

    /// Parse one `--enable` list element.
    pub fn parse_name(s: &str) -> Option<Checkable> {
        match s {
            "style" => Some(Checkable::Style),
            "warning" => Some(Checkable::Warning),
            "performance" => Some(Checkable::Performance),
            "portability" => Some(Checkable::Portability),
            "information" => Some(Checkable::Information),
            "unusedFunction" => Some(Checkable::UnusedFunction),
            "missingInclude" => Some(Checkable::MissingInclude),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Platform type widths
// ---------------------------------------------------------------------------

/// Target platform, controlling `sizeof` folding and the width limits the
/// checkers assume for integer types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// No assumptions beyond the C minimums.
    #[default]
    Unspecified,
    Unix32,
    Unix64,
    Win32A,
    Win32W,
    Win64,
}

impl Platform {
    pub fn parse_name(s: &str) -> Option<Platform> {
        match s {
            "unspecified" => Some(Platform::Unspecified),
            "unix32" => Some(Platform::Unix32),
            "unix64" => Some(Platform::Unix64),
            "win32A" => Some(Platform::Win32A),
            "win32W" => Some(Platform::Win32W),
            "win64" => Some(Platform::Win64),
            _ => None,
        }
    }

    /// `sizeof` in bytes for a built-in type name, or `None` when the type is
    /// not a recognized built-in or the platform leaves it unspecified.
    pub fn sizeof(&self, type_name: &str) -> Option<u32> {
        let (short, int, long, long_long, pointer) = match self {
            // Fall back to the common ILP32 widths so constant folding still
            // has something to work with on unspecified platforms.
            Platform::Unspecified | Platform::Unix32 | Platform::Win32A | Platform::Win32W => {
                (2, 4, 4, 8, 4)
            }
            Platform::Unix64 => (2, 4, 8, 8, 8),
            Platform::Win64 => (2, 4, 4, 8, 8),
        };
        match type_name {
            "bool" | "char" => Some(1),
            "short" => Some(short),
            "int" => Some(int),
            "long" => Some(long),
            "size_t" => Some(pointer),
            "float" => Some(4),
            "double" => Some(8),
            "wchar_t" => Some(if matches!(self, Platform::Win32A | Platform::Win32W | Platform::Win64) {
                2
            } else {
                4
            }),
            _ if type_name == "long long" => Some(long_long),
            _ => None,
        }
    }

    /// Width of a data pointer in bytes.
    pub fn sizeof_pointer(&self) -> u32 {
        match self {
            Platform::Unix64 | Platform::Win64 => 8,
            _ => 4,
        }
    }

    /// Preprocessor symbols a platform implies, fed into every configuration.
    pub fn implied_defines(&self) -> &'static [&'static str] {
        match self {
            Platform::Unspecified => &[],
            Platform::Unix32 | Platform::Unix64 => &["__unix__"],
            Platform::Win32A => &["_WIN32"],
            Platform::Win32W => &["_WIN32", "UNICODE", "_UNICODE"],
            Platform::Win64 => &["_WIN32", "_WIN64"],
        }
    }
}

// ---------------------------------------------------------------------------
// Language standards
// ---------------------------------------------------------------------------

/// Which header sets the preprocessor treats as known when an include is
/// missing. Controlled by repeated `--std=` flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Standards {
    pub c99: bool,
    pub cpp: bool,
    pub posix: bool,
}

impl Default for Standards {
    fn default() -> Self {
        Standards {
            c99: true,
            cpp: true,
            posix: false,
        }
    }
}

impl Standards {
    /// Apply one `--std=` value. Returns false for unrecognized names.
    pub fn set(&mut self, s: &str) -> bool {
        match s {
            "c89" => {
                self.c99 = false;
                true
            }
            "c99" => {
                self.c99 = true;
                true
            }
            "c++03" | "c++11" => {
                self.cpp = true;
                true
            }
            "posix" => {
                self.posix = true;
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything the core needs to know about how to run.
///
/// Cloning is cheap enough for the per-worker copies the parallel driver
/// makes; the terminate flag is shared through an `Arc` so that a signal
/// handler can stop all workers at once.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Optional diagnostic classes switched on with `--enable`.
    pub enabled: FxHashSet<Checkable>,
    /// Emit lower-confidence findings too.
    pub inconclusive: bool,
    /// Honor `// cppcheck-suppress <id>` comments.
    pub inline_suppressions: bool,
    /// Check all configurations even when enumeration would explode.
    pub force: bool,
    /// Cap on enumerated preprocessor configurations per file.
    pub max_configs: usize,
    /// Extra `-D` symbols, in `NAME` or `NAME=VALUE` form.
    pub user_defines: Vec<String>,
    /// `-U` symbols, never considered for configuration enumeration.
    pub user_undefs: Vec<String>,
    /// `-I` search roots, in command-line order.
    pub include_paths: Vec<PathBuf>,
    pub standards: Standards,
    pub platform: Platform,
    /// Worker parallelism for the multi-file driver (`-j`).
    pub job_count: usize,
    /// Text output template; `None` means the classic
    /// `[file:line]: (severity) message` form.
    pub template: Option<String>,
    /// Emit XML instead of text.
    pub xml: bool,
    /// XML format version (1 or 2).
    pub xml_version: u8,
    pub quiet: bool,
    pub verbose: bool,
    /// Bound on recursive template instantiation.
    pub max_template_depth: usize,
    /// Bound on visited states per function in the execution-path engine.
    pub max_path_states: usize,
    terminate: Arc<AtomicBool>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enabled: FxHashSet::default(),
            inconclusive: false,
            inline_suppressions: false,
            force: false,
            max_configs: 12,
            user_defines: Vec::new(),
            user_undefs: Vec::new(),
            include_paths: Vec::new(),
            standards: Standards::default(),
            platform: Platform::default(),
            job_count: 1,
            template: None,
            xml: false,
            xml_version: 1,
            quiet: false,
            verbose: false,
            max_template_depth: 100,
            max_path_states: 10_000,
            terminate: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Settings {
    /// Whether diagnostics of the given class should be emitted.
    pub fn is_enabled(&self, c: Checkable) -> bool {
        self.enabled.contains(&c)
    }

    /// Enable a diagnostic class.
    pub fn enable(&mut self, c: Checkable) {
        self.enabled.insert(c);
    }

    /// Parse an `--enable` argument (`all` or a comma-separated class list).
    /// Returns the first unrecognized name on failure.
    pub fn enable_list(&mut self, arg: &str) -> std::result::Result<(), String> {
        for name in arg.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if name == "all" {
                self.enabled.extend(Checkable::all());
            } else if let Some(c) = Checkable::parse_name(name) {
                self.enabled.insert(c);
            } else {
                return Err(name.to_string());
            }
        }
        Ok(())
    }

    /// Request cooperative termination. Long-running loops in the
    /// preprocessor, the simplifier, and the path engine poll this.
    pub fn terminate(&self) {
        self.terminate.store(true, Ordering::Relaxed);
    }

    /// True once termination has been requested. Advisory only.
    pub fn terminated(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }
}
