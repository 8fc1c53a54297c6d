//! Macro definitions and expansion.
//!
//! Expansion works on one logical line at a time (line continuations are
//! already spliced). Object-like and function-like macros are supported,
//! including `#` stringize and `##` concatenation, with parameter
//! substitution and re-scanning. A macro currently being expanded is treated
//! as a plain identifier, which breaks self-recursion the same way a real
//! preprocessor does.

use rustc_hash::FxHashMap;

/// One `#define`.
#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    /// `None` for object-like macros.
    pub params: Option<Vec<String>>,
    pub body: String,
}

impl MacroDef {
    /// Parse the text after `#define `, e.g. `MAX(a,b) ((a)>(b)?(a):(b))`.
    pub fn parse(text: &str) -> Option<MacroDef> {
        let text = text.trim();
        let name_end = text
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(text.len());
        if name_end == 0 {
            return None;
        }
        let name = &text[..name_end];
        let rest = &text[name_end..];
        // A '(' immediately after the name (no space) makes it function-like.
        if let Some(after_paren) = rest.strip_prefix('(') {
            let close = after_paren.find(')')?;
            let params = after_paren[..close]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            Some(MacroDef {
                name: name.to_string(),
                params: Some(params),
                body: after_paren[close + 1..].trim().to_string(),
            })
        } else {
            Some(MacroDef {
                name: name.to_string(),
                params: None,
                body: rest.trim().to_string(),
            })
        }
    }

    fn is_function_like(&self) -> bool {
        self.params.is_some()
    }
}

/// The set of macros in effect at some point of the expansion.
#[derive(Debug, Clone, Default)]
pub struct MacroMap {
    defs: FxHashMap<String, MacroDef>,
}

impl MacroMap {
    pub fn new() -> Self {
        MacroMap::default()
    }

    pub fn define(&mut self, def: MacroDef) {
        self.defs.insert(def.name.clone(), def);
    }

    /// Define `NAME` or `NAME=VALUE` (the `-D` form).
    pub fn define_flag(&mut self, flag: &str) {
        let (name, value) = match flag.split_once('=') {
            Some((n, v)) => (n.trim(), v),
            None => (flag.trim(), "1"),
        };
        if name.is_empty() {
            return;
        }
        self.define(MacroDef {
            name: name.to_string(),
            params: None,
            body: value.to_string(),
        });
    }

    pub fn undef(&mut self, name: &str) {
        self.defs.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(name)
    }

    /// Expand all macros in one logical line.
    pub fn expand_line(&self, line: &str) -> String {
        let mut active = Vec::new();
        self.expand(line, &mut active)
    }

    fn expand(&self, text: &str, active: &mut Vec<String>) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut pos = 0usize;

        while pos < bytes.len() {
            let Some(c) = text[pos..].chars().next() else {
                break;
            };

            // Literals are opaque to expansion.
            if c == '"' || c == '\'' {
                let end = skip_literal(text, pos);
                out.push_str(&text[pos..end]);
                pos = end;
                continue;
            }

            if c.is_ascii_alphabetic() || c == '_' {
                let start = pos;
                while pos < bytes.len()
                    && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let word = &text[start..pos];
                let recursing = active.iter().any(|a| a == word);
                match self.defs.get(word) {
                    Some(def) if !recursing => {
                        if def.is_function_like() {
                            // Needs an argument list right here, else the name
                            // stays a plain identifier.
                            let after_ws = skip_spaces(text, pos);
                            if after_ws < bytes.len() && bytes[after_ws] == b'(' {
                                if let Some((args, call_end)) = parse_args(text, after_ws) {
                                    let substituted = substitute(def, &args);
                                    active.push(word.to_string());
                                    out.push_str(&self.expand(&substituted, active));
                                    active.pop();
                                    pos = call_end;
                                    continue;
                                }
                            }
                            out.push_str(word);
                        } else {
                            active.push(word.to_string());
                            out.push_str(&self.expand(&def.body, active));
                            active.pop();
                        }
                    }
                    _ => out.push_str(word),
                }
                continue;
            }

            out.push(c);
            pos += c.len_utf8();
        }
        out
    }
}

/// Skip a string or character literal starting at `pos`; returns the index
/// past the closing quote (or end of text for an unclosed literal).
fn skip_literal(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_spaces(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    pos
}

/// Parse a balanced argument list starting at the `(` at `open`. Returns the
/// comma-separated top-level arguments and the index past the closing `)`.
fn parse_args(text: &str, open: usize) -> Option<(Vec<String>, usize)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut current = String::new();
    let mut i = open;
    while i < bytes.len() {
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        if c == '"' || c == '\'' {
            let end = skip_literal(text, i);
            current.push_str(&text[i..end]);
            i = end;
            continue;
        }
        if !c.is_ascii() {
            current.push(c);
            i += c.len_utf8();
            continue;
        }
        match c {
            '(' => {
                depth += 1;
                if depth > 1 {
                    current.push('(');
                }
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    if !current.trim().is_empty() || !args.is_empty() {
                        args.push(current.trim().to_string());
                    }
                    return Some((args, i + 1));
                }
                current.push(')');
            }
            ',' if depth == 1 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
        i += 1;
    }
    None
}

/// Substitute parameters into a function-like macro body, handling `#` and
/// `##`.
fn substitute(def: &MacroDef, args: &[String]) -> String {
    let params = def.params.as_deref().unwrap_or(&[]);
    let body = &def.body;
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut pos = 0usize;

    while pos < bytes.len() {
        let Some(c) = body[pos..].chars().next() else {
            break;
        };

        if c == '"' || c == '\'' {
            let end = skip_literal(body, pos);
            out.push_str(&body[pos..end]);
            pos = end;
            continue;
        }

        // Token paste: drop the operator and the whitespace around it so the
        // neighbors concatenate.
        if c == '#' && pos + 1 < bytes.len() && bytes[pos + 1] == b'#' {
            while out.ends_with(' ') || out.ends_with('\t') {
                out.pop();
            }
            pos = skip_spaces(body, pos + 2);
            continue;
        }

        // Stringize: `#param` becomes the argument in quotes.
        if c == '#' {
            let start = skip_spaces(body, pos + 1);
            let mut end = start;
            while end < bytes.len()
                && ((bytes[end] as char).is_ascii_alphanumeric() || bytes[end] == b'_')
            {
                end += 1;
            }
            let word = &body[start..end];
            if let Some(idx) = params.iter().position(|p| p == word) {
                let arg = args.get(idx).map(String::as_str).unwrap_or("");
                out.push('"');
                // Escape embedded quotes and backslashes.
                for ch in arg.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
                pos = end;
                continue;
            }
            out.push('#');
            pos += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < bytes.len()
                && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
            {
                pos += 1;
            }
            let word = &body[start..pos];
            match params.iter().position(|p| p == word) {
                Some(idx) => out.push_str(args.get(idx).map(String::as_str).unwrap_or("")),
                None => out.push_str(word),
            }
            continue;
        }

        out.push(c);
        pos += c.len_utf8();
    }
    out
}
