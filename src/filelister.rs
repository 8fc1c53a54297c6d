//! File enumeration and reading behind a trait, so the analyzer can run
//! against the real filesystem or against an in-memory map in tests.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::AnalyzerError;

/// Source-file extensions the directory walk picks up.
const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "txx", "tpp"];

/// Abstraction over the filesystem for listing source files and reading
/// file contents (sources and headers alike).
pub trait FileLister: Sync {
    /// Expand a path into source files. A file path yields itself; a
    /// directory is scanned, recursively when asked.
    fn list(&self, path: &Path, recursive: bool) -> Vec<PathBuf>;

    /// Read a file as UTF-8 text.
    fn read(&self, path: &Path) -> Result<String, AnalyzerError>;

    /// Whether the path exists at all (used by include resolution).
    fn exists(&self, path: &Path) -> bool;
}

/// True when the extension marks a checkable source file.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

// ---------------------------------------------------------------------------
// Real filesystem
// ---------------------------------------------------------------------------

/// The real filesystem.
#[derive(Debug, Default)]
pub struct FsLister;

impl FileLister for FsLister {
    fn list(&self, path: &Path, recursive: bool) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if path.is_file() {
            out.push(path.to_path_buf());
            return out;
        }
        if path.is_dir() {
            walk(path, recursive, &mut out);
        }
        out.sort();
        out
    }

    fn read(&self, path: &Path) -> Result<String, AnalyzerError> {
        let bytes = fs::read(path).map_err(|source| AnalyzerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| AnalyzerError::Encoding {
            path: path.to_path_buf(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

fn walk(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                walk(&path, true, out);
            }
        } else if is_source_file(&path) {
            out.push(path);
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory map
// ---------------------------------------------------------------------------

/// In-memory file map for tests and for `(path, content)` pairs supplied
/// directly by an embedding front-end.
#[derive(Debug, Default)]
pub struct MemoryLister {
    files: FxHashMap<PathBuf, String>,
}

impl MemoryLister {
    pub fn new() -> Self {
        MemoryLister::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl FileLister for MemoryLister {
    fn list(&self, path: &Path, recursive: bool) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| {
                if *p == path {
                    return true;
                }
                if !is_source_file(p) {
                    return false;
                }
                match p.parent() {
                    Some(_) if recursive => p.starts_with(path),
                    Some(parent) => parent == path,
                    None => false,
                }
            })
            .cloned()
            .collect();
        out.sort();
        out
    }

    fn read(&self, path: &Path) -> Result<String, AnalyzerError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AnalyzerError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
