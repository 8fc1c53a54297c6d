//! Configuration enumeration: which preprocessor symbols produce distinct
//! textual slices of a translation unit.

use rustc_hash::FxHashSet;

/// Collect the configuration symbols of a translation unit: macro names
/// appearing in any `#if*` condition that the file does not define itself
/// before their first use. Order is first-encountered, which fixes the
/// order configurations are later emitted in.
pub fn collect_symbols(code: &str, excluded: &[String]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut file_defined: FxHashSet<String> = FxHashSet::default();
    for (name, _) in excluded.iter().map(|u| split_define(u)) {
        file_defined.insert(name.to_string());
    }

    let mut lines = code.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') {
            continue;
        }
        let directive = trimmed[1..].trim_start();

        if let Some(rest) = directive.strip_prefix("define") {
            if let Some(name) = first_identifier(rest) {
                file_defined.insert(name.to_string());
            }
        } else if let Some(rest) = directive.strip_prefix("ifndef") {
            // An include guard (`#ifndef X` immediately followed by
            // `#define X`) is not an interesting configuration.
            let name = first_identifier(rest);
            let guard = match (name, lines.peek()) {
                (Some(n), Some(next)) => {
                    let next = next.trim_start();
                    next.strip_prefix('#')
                        .map(|d| d.trim_start())
                        .and_then(|d| d.strip_prefix("define"))
                        .and_then(first_identifier)
                        == Some(n)
                }
                _ => false,
            };
            if let Some(n) = name {
                if guard {
                    file_defined.insert(n.to_string());
                } else {
                    push_symbol(n, &file_defined, &mut seen, &mut symbols);
                }
            }
        } else if let Some(rest) = directive.strip_prefix("ifdef") {
            if let Some(n) = first_identifier(rest) {
                push_symbol(n, &file_defined, &mut seen, &mut symbols);
            }
        } else if let Some(rest) = directive
            .strip_prefix("elif")
            .or_else(|| directive.strip_prefix("if"))
        {
            for name in condition_identifiers(rest) {
                push_symbol(&name, &file_defined, &mut seen, &mut symbols);
            }
        }
    }
    symbols
}

fn push_symbol(
    name: &str,
    file_defined: &FxHashSet<String>,
    seen: &mut FxHashSet<String>,
    symbols: &mut Vec<String>,
) {
    if file_defined.contains(name) || seen.contains(name) {
        return;
    }
    seen.insert(name.to_string());
    symbols.push(name.to_string());
}

/// Split a `-D` style `NAME=VALUE` flag.
pub fn split_define(flag: &str) -> (&str, &str) {
    match flag.split_once('=') {
        Some((n, v)) => (n.trim(), v),
        None => (flag.trim(), "1"),
    }
}

fn first_identifier(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(text.len());
    if end == 0 {
        None
    } else {
        Some(&text[..end])
    }
}

/// All macro-like identifiers mentioned in an `#if`/`#elif` condition,
/// in appearance order. `defined` itself and literal words are skipped.
fn condition_identifiers(condition: &str) -> Vec<String> {
    let mut out = Vec::new();
    let bytes = condition.as_bytes();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < bytes.len()
                && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
            {
                pos += 1;
            }
            let word = &condition[start..pos];
            if word != "defined" && word != "true" && word != "false" {
                out.push(word.to_string());
            }
            continue;
        }
        // Numbers may carry suffix letters; skip them as one unit.
        if c.is_ascii_digit() {
            while pos < bytes.len() && (bytes[pos] as char).is_ascii_alphanumeric() {
                pos += 1;
            }
            continue;
        }
        pos += 1;
    }
    out
}

/// Deterministic name of a configuration subset: the selected symbols joined
/// with `;`, in symbol order. The empty subset is the unnamed base
/// configuration.
pub fn subset_name(symbols: &[String], mask: u64) -> String {
    let mut parts = Vec::new();
    for (i, sym) in symbols.iter().enumerate() {
        if mask & (1 << i) != 0 {
            parts.push(sym.as_str());
        }
    }
    parts.join(";")
}

/// The symbols selected by a subset mask.
pub fn subset_defines(symbols: &[String], mask: u64) -> Vec<String> {
    symbols
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, s)| s.clone())
        .collect()
}
