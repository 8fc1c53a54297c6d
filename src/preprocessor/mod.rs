//! The preprocessor: strips comments, splices continuation lines, inlines
//! `#include`s, expands macros, and enumerates the interesting
//! configurations of a translation unit.
//!
//! One input file produces 1..N configurations, each named by the conjunction
//! of the `#ifdef` symbols that distinguish it (`"WIN32;DEBUG"`). Every kept
//! configuration yields one fully expanded source text for an independent
//! tokenization pass. Line structure is preserved throughout so token
//! provenance stays exact: directive lines and inactive regions become blank
//! lines, spliced lines are compensated with padding newlines, and inlined
//! includes are bracketed with `#file`/`#endfile` markers the lexer
//! understands.

pub mod condition;
pub mod configs;
pub mod macros;

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::filelister::FileLister;
use crate::settings::Settings;
use macros::{MacroDef, MacroMap};

/// Headers that are "known" per language standard: a missing include of one
/// of these is not worth an information message.
static KNOWN_C_HEADERS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "assert.h", "ctype.h", "errno.h", "float.h", "limits.h", "locale.h", "math.h",
        "setjmp.h", "signal.h", "stdarg.h", "stddef.h", "stdio.h", "stdlib.h", "string.h",
        "time.h", "stdbool.h", "stdint.h", "inttypes.h", "wchar.h", "wctype.h",
    ]
    .into_iter()
    .collect()
});

static KNOWN_CPP_HEADERS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "algorithm", "bitset", "deque", "exception", "fstream", "functional", "iomanip",
        "iostream", "iterator", "limits", "list", "map", "memory", "new", "numeric", "ostream",
        "queue", "set", "sstream", "stack", "stdexcept", "string", "typeinfo", "utility",
        "vector", "cassert", "cctype", "cerrno", "cmath", "cstddef", "cstdio", "cstdlib",
        "cstring", "ctime",
    ]
    .into_iter()
    .collect()
});

static KNOWN_POSIX_HEADERS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "unistd.h", "fcntl.h", "pthread.h", "sys/types.h", "sys/stat.h", "sys/time.h",
        "dirent.h", "dlfcn.h", "netdb.h", "regex.h", "semaphore.h", "syslog.h", "termios.h",
    ]
    .into_iter()
    .collect()
});

/// Hard bound on include nesting, against include cycles the dedup set
/// cannot break (e.g. self-include through differing relative paths).
const MAX_INCLUDE_DEPTH: usize = 40;

/// Bound on the number of enumerable symbols; 2^16 candidate subsets is
/// already far beyond any sane `--max-configs`.
const MAX_CONFIG_SYMBOLS: usize = 16;

/// An in-source suppression comment, pointing at the line it suppresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSuppression {
    pub id: String,
    pub file: String,
    /// The line the suppression applies to (the line after the comment).
    pub line: u32,
}

/// Everything preprocessing one file produces.
#[derive(Debug, Default)]
pub struct PreprocessResult {
    /// `(configuration name, expanded source)` in deterministic order.
    pub configs: Vec<(String, String)>,
    pub inline_suppressions: Vec<InlineSuppression>,
}

pub struct Preprocessor<'a> {
    settings: &'a Settings,
    lister: &'a dyn FileLister,
}

impl<'a> Preprocessor<'a> {
    pub fn new(settings: &'a Settings, lister: &'a dyn FileLister) -> Self {
        Preprocessor { settings, lister }
    }

    /// Preprocess one translation unit. Returns `None` after logging a
    /// `syntaxError` when the directive structure is unbalanced; the file is
    /// abandoned.
    pub fn preprocess(
        &self,
        code: &str,
        path: &str,
        logger: &mut dyn ErrorLogger,
    ) -> Option<PreprocessResult> {
        let mut result = PreprocessResult::default();

        let clean = read_code(code, path, &mut result.inline_suppressions);

        let mut included = FxHashSet::default();
        let mut missing = Vec::new();
        let full = self.handle_includes(
            &clean,
            path,
            0,
            &mut included,
            &mut result.inline_suppressions,
            &mut missing,
        );

        for miss in &missing {
            if self.is_known_header(&miss.header) {
                continue;
            }
            logger.report_err(&ErrorMessage::at(
                Severity::Information,
                "missingInclude",
                format!("Include file: \"{}\" not found.", miss.header),
                miss.file.clone(),
                miss.line,
            ));
        }

        // With explicit -D defines the user has picked the configuration;
        // only enumerate when forced.
        if !self.settings.user_defines.is_empty() && !self.settings.force {
            let name = self.settings.user_defines.join(";");
            match self.build_config(&full, &self.settings.user_defines, path, logger) {
                Some(text) => result.configs.push((name, text)),
                None => return None,
            }
            return Some(result);
        }

        let mut excluded = self.settings.user_undefs.clone();
        excluded.extend(self.settings.user_defines.iter().cloned());
        let mut symbols = configs::collect_symbols(&full, &excluded);
        if symbols.len() > MAX_CONFIG_SYMBOLS {
            debug!(
                file = path,
                symbols = symbols.len(),
                "truncating configuration symbol set"
            );
            symbols.truncate(MAX_CONFIG_SYMBOLS);
        }

        let mut seen_slices: FxHashSet<String> = FxHashSet::default();
        let total_masks: u64 = 1u64 << symbols.len();
        let mut truncated = false;
        for mask in 0..total_masks {
            if self.settings.terminated() {
                break;
            }
            if result.configs.len() >= self.settings.max_configs {
                truncated = true;
                break;
            }
            let mut defines = configs::subset_defines(&symbols, mask);
            defines.extend(self.settings.user_defines.iter().cloned());
            let name = configs::subset_name(&symbols, mask);
            let text = match self.build_config(&full, &defines, path, logger) {
                Some(text) => text,
                None => return None,
            };
            // Two subsets with the same textual slice are one configuration.
            if seen_slices.insert(text.clone()) {
                result.configs.push((name, text));
            }
        }

        if truncated {
            logger.report_err(&ErrorMessage::at(
                Severity::Information,
                "toomanyconfigs",
                format!(
                    "Too many #ifdef configurations - only {} were checked. \
                     Use --force or raise --max-configs to check them all.",
                    result.configs.len()
                ),
                path,
                1,
            ));
        }

        Some(result)
    }

    /// Expand one configuration; `None` after logging `syntaxError`.
    fn build_config(
        &self,
        full: &str,
        defines: &[String],
        path: &str,
        logger: &mut dyn ErrorLogger,
    ) -> Option<String> {
        match self.getcode(full, defines) {
            Ok(text) => Some(text),
            Err(line) => {
                logger.report_err(&ErrorMessage::at(
                    Severity::Error,
                    "syntaxError",
                    "Unbalanced #if/#endif in preprocessor directives.",
                    path,
                    line,
                ));
                None
            }
        }
    }

    fn is_known_header(&self, header: &str) -> bool {
        let std = &self.settings.standards;
        (std.c99 && KNOWN_C_HEADERS.contains(header))
            || (std.cpp && KNOWN_CPP_HEADERS.contains(header))
            || (std.posix && KNOWN_POSIX_HEADERS.contains(header))
    }

    // -- include handling ---------------------------------------------------

    fn handle_includes(
        &self,
        code: &str,
        current_file: &str,
        depth: usize,
        included: &mut FxHashSet<PathBuf>,
        suppressions: &mut Vec<InlineSuppression>,
        missing: &mut Vec<MissingIncludeRecord>,
    ) -> String {
        if depth >= MAX_INCLUDE_DEPTH {
            return code.to_string();
        }
        let mut out = String::with_capacity(code.len());
        for (line_no, line) in code.lines().enumerate() {
            let line_no = (line_no + 1) as u32;
            let trimmed = line.trim_start();
            let include = trimmed
                .strip_prefix('#')
                .map(str::trim_start)
                .and_then(|d| d.strip_prefix("include"));
            let Some(spec) = include else {
                out.push_str(line);
                out.push('\n');
                continue;
            };
            let Some((header, quoted)) = parse_include_target(spec) else {
                out.push('\n');
                continue;
            };
            match self.resolve_include(&header, quoted, current_file) {
                Some(resolved) => {
                    if !included.insert(resolved.clone()) {
                        // Second include of the same file contributes nothing.
                        out.push('\n');
                        continue;
                    }
                    let resolved_str = resolved.to_string_lossy().to_string();
                    match self.lister.read(&resolved) {
                        Ok(raw) => {
                            let clean = read_code(&raw, &resolved_str, suppressions);
                            let inner = self.handle_includes(
                                &clean,
                                &resolved_str,
                                depth + 1,
                                included,
                                suppressions,
                                missing,
                            );
                            out.push_str(&format!("#file \"{resolved_str}\"\n"));
                            out.push_str(&inner);
                            if !inner.ends_with('\n') && !inner.is_empty() {
                                out.push('\n');
                            }
                            out.push_str("#endfile\n");
                        }
                        Err(_) => {
                            missing.push(MissingIncludeRecord {
                                header,
                                file: current_file.to_string(),
                                line: line_no,
                            });
                            out.push('\n');
                        }
                    }
                }
                None => {
                    missing.push(MissingIncludeRecord {
                        header,
                        file: current_file.to_string(),
                        line: line_no,
                    });
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Quote form searches the including file's directory first, then the
    /// `-I` roots; angle form searches only the `-I` roots.
    fn resolve_include(&self, header: &str, quoted: bool, current_file: &str) -> Option<PathBuf> {
        if quoted {
            let local = Path::new(current_file)
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(header);
            if self.lister.exists(&local) {
                return Some(local);
            }
        }
        for root in &self.settings.include_paths {
            let candidate = root.join(header);
            if self.lister.exists(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    // -- conditional expansion ----------------------------------------------

    /// Produce the textual slice for one set of configuration defines.
    /// `Err(line)` on unbalanced directives.
    fn getcode(&self, code: &str, defines: &[String]) -> Result<String, u32> {
        let mut table = MacroMap::new();
        for sym in self.settings.platform.implied_defines() {
            table.define_flag(sym);
        }
        for def in defines {
            table.define_flag(def);
        }
        for undef in &self.settings.user_undefs {
            table.undef(undef);
        }

        struct Frame {
            /// This branch is currently selected.
            active: bool,
            /// Some earlier branch of this chain was selected.
            taken: bool,
            /// The enclosing context was active at `#if` time.
            parent_active: bool,
        }

        let mut stack: Vec<Frame> = Vec::new();
        let mut out = String::with_capacity(code.len());
        let mut last_line: u32 = 0;

        for (idx, line) in code.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            last_line = line_no;
            let active = stack.iter().all(|f| f.active);
            let trimmed = line.trim_start();

            if trimmed.starts_with("#file \"") || trimmed == "#endfile" {
                // Provenance markers pass through even in inactive regions;
                // the lexer needs them to keep file/line accounting intact.
                out.push_str(trimmed);
                out.push('\n');
                continue;
            }

            if let Some(directive) = trimmed.strip_prefix('#').map(str::trim_start) {
                if let Some(rest) = directive.strip_prefix("ifdef") {
                    let name = rest.trim();
                    let cond = active && table.is_defined(name);
                    stack.push(Frame {
                        active: cond,
                        taken: cond,
                        parent_active: active,
                    });
                } else if let Some(rest) = directive.strip_prefix("ifndef") {
                    let name = rest.trim();
                    let cond = active && !table.is_defined(name);
                    stack.push(Frame {
                        active: cond,
                        taken: cond,
                        parent_active: active,
                    });
                } else if let Some(rest) = directive.strip_prefix("elif") {
                    let Some(frame) = stack.last_mut() else {
                        return Err(line_no);
                    };
                    if frame.taken || !frame.parent_active {
                        frame.active = false;
                    } else {
                        let cond = condition::eval(rest, &table).unwrap_or(0) != 0;
                        frame.active = cond;
                        frame.taken = cond;
                    }
                } else if let Some(rest) = directive.strip_prefix("if") {
                    let cond = active && condition::eval(rest, &table).unwrap_or(0) != 0;
                    stack.push(Frame {
                        active: cond,
                        taken: cond,
                        parent_active: active,
                    });
                } else if directive.starts_with("else") {
                    let Some(frame) = stack.last_mut() else {
                        return Err(line_no);
                    };
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                } else if directive.starts_with("endif") {
                    if stack.pop().is_none() {
                        return Err(line_no);
                    }
                } else if let Some(rest) = directive.strip_prefix("define") {
                    if active {
                        if let Some(def) = MacroDef::parse(rest) {
                            table.define(def);
                        }
                    }
                } else if let Some(rest) = directive.strip_prefix("undef") {
                    if active {
                        table.undef(rest.trim());
                    }
                }
                // Every directive line becomes a blank line in the output.
                out.push('\n');
                continue;
            }

            if active {
                out.push_str(&table.expand_line(line));
            }
            out.push('\n');
        }

        if !stack.is_empty() {
            return Err(last_line);
        }
        Ok(out)
    }
}

#[derive(Debug)]
struct MissingIncludeRecord {
    header: String,
    file: String,
    line: u32,
}

/// Parse the target of an `#include` directive. Returns the header name and
/// whether it used the quote form.
fn parse_include_target(spec: &str) -> Option<(String, bool)> {
    let spec = spec.trim();
    if let Some(rest) = spec.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some((rest[..end].to_string(), true));
    }
    if let Some(rest) = spec.strip_prefix('<') {
        let end = rest.find('>')?;
        return Some((rest[..end].to_string(), false));
    }
    None
}

// ---------------------------------------------------------------------------
// Raw text cleanup
// ---------------------------------------------------------------------------

/// Normalize newlines, join line continuations (compensating with padding
/// newlines so line numbers survive), strip comments while preserving line
/// counts, and harvest `cppcheck-suppress` comments.
fn read_code(code: &str, file: &str, suppressions: &mut Vec<InlineSuppression>) -> String {
    let normalized = code.replace("\r\n", "\n").replace('\r', "\n");
    let spliced = splice_lines(&normalized);
    strip_comments(&spliced, file, suppressions)
}

fn splice_lines(code: &str) -> String {
    // Byte-wise copy: every delimiter is ASCII, so UTF-8 passes through
    // untouched.
    let bytes = code.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut pending = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            pending += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'\n' {
            out.push(b'\n');
            out.extend(std::iter::repeat(b'\n').take(pending));
            pending = 0;
            i += 1;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out.extend(std::iter::repeat(b'\n').take(pending));
    String::from_utf8(out).unwrap_or_default()
}

fn strip_comments(code: &str, file: &str, suppressions: &mut Vec<InlineSuppression>) -> String {
    // Byte-wise scan; all delimiters are ASCII and copied ranges land on
    // ASCII boundaries, so UTF-8 content passes through untouched.
    let bytes = code.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut line: u32 = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                line += 1;
                out.push(b'\n');
                i += 1;
            }
            quote @ (b'"' | b'\'') => {
                out.push(quote);
                i += 1;
                while i < bytes.len() {
                    let d = bytes[i];
                    out.push(d);
                    if d == b'\\' && i + 1 < bytes.len() {
                        out.push(bytes[i + 1]);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if d == quote || d == b'\n' {
                        if d == b'\n' {
                            line += 1;
                        }
                        break;
                    }
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                let start_line = line;
                let end = code[i..].find('\n').map_or(bytes.len(), |n| i + n);
                harvest_suppression(&code[i + 2..end], file, start_line, suppressions);
                out.push(b' ');
                i = end;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                let start_line = line;
                let mut j = i + 2;
                while j + 1 < bytes.len() && !(bytes[j] == b'*' && bytes[j + 1] == b'/') {
                    if bytes[j] == b'\n' {
                        line += 1;
                        out.push(b'\n');
                    }
                    j += 1;
                }
                let mut text_end = j.min(bytes.len());
                while text_end > i + 2 && !code.is_char_boundary(text_end) {
                    text_end -= 1;
                }
                harvest_suppression(&code[i + 2..text_end], file, start_line, suppressions);
                out.push(b' ');
                i = (j + 2).min(bytes.len());
            }
            _ => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Record `cppcheck-suppress <id>`; the suppression applies to the line
/// after the comment.
fn harvest_suppression(
    comment: &str,
    file: &str,
    comment_line: u32,
    suppressions: &mut Vec<InlineSuppression>,
) {
    const MARKER: &str = "cppcheck-suppress";
    let Some(idx) = comment.find(MARKER) else {
        return;
    };
    let rest = comment[idx + MARKER.len()..].trim_start();
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if !id.is_empty() {
        suppressions.push(InlineSuppression {
            id,
            file: file.to_string(),
            line: comment_line + 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errorlogger::CollectingLogger;
    use crate::filelister::MemoryLister;
    use crate::settings::Settings;

    fn preprocess_with(
        code: &str,
        settings: &Settings,
        lister: &MemoryLister,
    ) -> (Option<PreprocessResult>, CollectingLogger) {
        let mut logger = CollectingLogger::new();
        let pp = Preprocessor::new(settings, lister);
        let result = pp.preprocess(code, "test.cpp", &mut logger);
        (result, logger)
    }

    fn config_names(result: &PreprocessResult) -> Vec<&str> {
        result.configs.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn comments_are_stripped_preserving_lines() {
        let mut sup = Vec::new();
        let out = read_code("a // one\nb /* two\nthree */ c\n", "f.c", &mut sup);
        assert_eq!(out, "a  \nb \n c\n");
    }

    #[test]
    fn line_continuations_are_spliced_with_padding() {
        let mut sup = Vec::new();
        let out = read_code("#define X \\\n 1\nnext\n", "f.c", &mut sup);
        // The define is one logical line; a padding newline keeps `next` on
        // its original line 3.
        assert_eq!(out, "#define X  1\n\nnext\n");
    }

    #[test]
    fn comment_inside_string_survives() {
        let mut sup = Vec::new();
        let out = read_code("s = \"no // comment\";\n", "f.c", &mut sup);
        assert_eq!(out, "s = \"no // comment\";\n");
    }

    #[test]
    fn suppression_comments_are_harvested() {
        let mut sup = Vec::new();
        read_code(
            "// cppcheck-suppress memleak\nchar* p = malloc(10);\n",
            "f.c",
            &mut sup,
        );
        assert_eq!(
            sup,
            vec![InlineSuppression {
                id: "memleak".to_string(),
                file: "f.c".to_string(),
                line: 2,
            }]
        );
    }

    #[test]
    fn two_ifdefs_enumerate_four_configs() {
        let code = "#ifdef A\nint a;\n#endif\n#ifdef B\nint b;\n#endif\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        assert_eq!(config_names(&result), vec!["", "A", "B", "A;B"]);
    }

    #[test]
    fn max_configs_truncates_enumeration() {
        let code = "#ifdef A\nint a;\n#endif\n#ifdef B\nint b;\n#endif\n";
        let mut settings = Settings::default();
        settings.max_configs = 2;
        let lister = MemoryLister::new();
        let (result, logger) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        assert_eq!(config_names(&result), vec!["", "A"]);
        assert!(logger.ids().contains(&"toomanyconfigs"));
    }

    #[test]
    fn equivalent_slices_are_deduplicated() {
        // B never changes the text, so only A matters.
        let code = "#ifdef A\nint a;\n#endif\n#ifdef B\n#endif\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        assert_eq!(config_names(&result), vec!["", "A"]);
    }

    #[test]
    fn ifdef_selects_content() {
        let code = "#ifdef A\nint a;\n#else\nint b;\n#endif\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        let base = &result.configs[0].1;
        assert!(base.contains("int b;"));
        assert!(!base.contains("int a;"));
        let a_cfg = &result.configs[1].1;
        assert!(a_cfg.contains("int a;"));
        assert!(!a_cfg.contains("int b;"));
    }

    #[test]
    fn elif_chains_take_one_branch() {
        let code = "#if defined(A)\nint a;\n#elif defined(B)\nint b;\n#else\nint c;\n#endif\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        for (name, text) in &result.configs {
            let hits = ["int a;", "int b;", "int c;"]
                .iter()
                .filter(|s| text.contains(**s))
                .count();
            assert_eq!(hits, 1, "config '{name}' selected {hits} branches");
        }
    }

    #[test]
    fn unbalanced_endif_is_a_syntax_error() {
        let code = "#endif\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, logger) = preprocess_with(code, &settings, &lister);
        assert!(result.is_none());
        assert_eq!(logger.ids(), vec!["syntaxError"]);
    }

    #[test]
    fn missing_if_termination_is_a_syntax_error() {
        let code = "#ifdef A\nint a;\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, logger) = preprocess_with(code, &settings, &lister);
        assert!(result.is_none());
        assert!(logger.ids().contains(&"syntaxError"));
    }

    #[test]
    fn user_defines_pick_a_single_configuration() {
        let code = "#ifdef A\nint a;\n#endif\n#ifdef B\nint b;\n#endif\n";
        let mut settings = Settings::default();
        settings.user_defines = vec!["A".to_string()];
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        assert_eq!(config_names(&result), vec!["A"]);
        assert!(result.configs[0].1.contains("int a;"));
        assert!(!result.configs[0].1.contains("int b;"));
    }

    #[test]
    fn quote_include_searches_current_dir_then_include_paths() {
        let mut lister = MemoryLister::new();
        lister.add("dir/header.h", "int from_header;\n");
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let pp = Preprocessor::new(&settings, &lister);
        let result = pp
            .preprocess("#include \"header.h\"\nint x;\n", "dir/main.cpp", &mut logger)
            .unwrap();
        let text = &result.configs[0].1;
        assert!(text.contains("#file \"dir/header.h\""));
        assert!(text.contains("from_header"));
        assert!(text.contains("#endfile"));
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn angle_include_ignores_current_dir() {
        let mut lister = MemoryLister::new();
        lister.add("dir/sys.h", "int x;\n");
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let pp = Preprocessor::new(&settings, &lister);
        pp.preprocess("#include <sys.h>\n", "dir/main.cpp", &mut logger)
            .unwrap();
        assert!(logger.ids().contains(&"missingInclude"));
    }

    #[test]
    fn known_system_headers_are_not_reported_missing() {
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, logger) =
            preprocess_with("#include <stdio.h>\nint x;\n", &settings, &lister);
        assert!(result.is_some());
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn repeated_includes_are_inlined_once() {
        let mut lister = MemoryLister::new();
        lister.add("h.h", "int once;\n");
        let mut settings = Settings::default();
        settings.include_paths = vec![PathBuf::from("")];
        let mut logger = CollectingLogger::new();
        let pp = Preprocessor::new(&settings, &lister);
        let result = pp
            .preprocess("#include \"h.h\"\n#include \"h.h\"\nint x;\n", "main.cpp", &mut logger)
            .unwrap();
        let text = &result.configs[0].1;
        assert_eq!(text.matches("once").count(), 1);
    }

    #[test]
    fn macros_expand_in_output() {
        let code = "#define N 10\nint a[N];\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        assert!(result.configs[0].1.contains("int a[10];"));
    }

    #[test]
    fn inactive_defines_do_not_take_effect() {
        let code = "#ifdef A\n#define N 10\n#endif\nint a[N];\n";
        let settings = Settings::default();
        let lister = MemoryLister::new();
        let (result, _) = preprocess_with(code, &settings, &lister);
        let result = result.unwrap();
        let base = &result.configs[0].1;
        assert!(base.contains("int a[N];"), "base slice: {base}");
        let with_a = &result.configs[1].1;
        assert!(with_a.contains("int a[10];"));
    }
}
