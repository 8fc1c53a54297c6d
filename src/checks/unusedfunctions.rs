//! Cross-file unused function analysis.
//!
//! Unlike the other checks this one accumulates state across every file of
//! the run: the set of defined non-static free functions and the set of
//! called names. The difference (minus `main`) is reported once, after the
//! last file. The orchestrator owns the accumulator and merges per-worker
//! instances when files are checked in parallel.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errorlogger::{ErrorLogger, ErrorMessage, FileLocation, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::functions;

#[derive(Debug, Default)]
pub struct UnusedFunctions {
    /// name -> definition location.
    defined: FxHashMap<String, FileLocation>,
    called: FxHashSet<String>,
}

impl UnusedFunctions {
    pub fn new() -> Self {
        UnusedFunctions::default()
    }

    /// Accumulate definitions and calls from one simplified stream.
    pub fn parse_tokens(&mut self, list: &TokenList) {
        let mut definition_names: FxHashSet<TokenId> = FxHashSet::default();

        for function in functions(list) {
            if !is_free_function(list, function.name_token) {
                continue;
            }
            definition_names.insert(function.name_token);
            let name = list.text(function.name_token).to_string();
            let location = list.location(function.name_token);
            self.defined.entry(name).or_insert(location);
        }

        for id in list.ids() {
            let tok = list.token(id);
            if tok.kind != TokenKind::Identifier || definition_names.contains(&id) {
                continue;
            }
            let is_call = list.next(id).is_some_and(|n| list.text(n) == "(");
            // A bare or address-taken mention also keeps a function alive
            // (function pointers).
            let is_reference = list.prev(id).is_some_and(|p| list.text(p) == "&")
                || matches!(
                    list.next(id).map(|n| list.text(n).to_string()).as_deref(),
                    Some(";" | "," | ")" | "=")
                );
            if is_call || is_reference {
                self.called.insert(tok.text.clone());
            }
        }
    }

    /// Merge another accumulator (a parallel worker's result).
    pub fn merge(&mut self, other: UnusedFunctions) {
        for (name, location) in other.defined {
            self.defined.entry(name).or_insert(location);
        }
        self.called.extend(other.called);
    }

    /// Report functions that were defined but never referenced. Called once
    /// at the very end of the run.
    pub fn check(&self, logger: &mut dyn ErrorLogger) {
        let mut unused: Vec<(&String, &FileLocation)> = self
            .defined
            .iter()
            .filter(|(name, _)| name.as_str() != "main" && !self.called.contains(*name))
            .collect();
        unused.sort_by(|a, b| (&a.1.file, a.1.line, a.0).cmp(&(&b.1.file, b.1.line, b.0)));
        for (name, location) in unused {
            logger.report_err(&ErrorMessage::new(
                Severity::Style,
                "unusedFunction",
                format!("The function '{name}' is never used."),
                vec![location.clone()],
            ));
        }
    }
}

/// Free function definitions only: not class methods (the stream position
/// is inside a class body) and not static file-local helpers.
fn is_free_function(list: &TokenList, name_token: TokenId) -> bool {
    // Walk the declaration prefix backwards; a `static` storage class or a
    // `::` qualifier disqualifies.
    let mut p = list.prev(name_token);
    while let Some(prev) = p {
        let tok = list.token(prev);
        match tok.text.as_str() {
            "static" => return false,
            "::" => return false,
            "*" | "&" | "const" | "inline" | "extern" => {}
            _ => {
                if !(tok.flags.is_standard_type || tok.kind == TokenKind::TypeName) {
                    break;
                }
            }
        }
        p = list.prev(prev);
    }

    // Reject definitions nested inside a class/struct body.
    !inside_class_body(list, name_token)
}

fn inside_class_body(list: &TokenList, token: TokenId) -> bool {
    // Count still-open braces before the token, remembering what opened them.
    let mut stack: Vec<bool> = Vec::new();
    for id in list.ids() {
        if id == token {
            return stack.iter().any(|is_class| *is_class);
        }
        match list.text(id) {
            "{" => {
                let is_class = class_keyword_before(list, id);
                stack.push(is_class);
            }
            "}" => {
                stack.pop();
            }
            _ => {}
        }
    }
    false
}

/// Does this `{` open a class/struct body? Look back over the name and base
/// clause for the keyword.
fn class_keyword_before(list: &TokenList, brace: TokenId) -> bool {
    let mut cur = list.prev(brace);
    for _ in 0..16 {
        let Some(id) = cur else { return false };
        match list.text(id) {
            "class" | "struct" | "union" => return true,
            ";" | "}" | "{" | ")" => return false,
            _ => cur = list.prev(id),
        }
    }
    false
}
