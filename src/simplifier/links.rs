//! Bracket linking: annotate every `(`/`)`, `[`/`]`, `{`/`}` pair, then the
//! `<`/`>` pairs of template syntax.
//!
//! Round and square brackets and braces must balance; a mismatch is fatal for
//! the configuration. Angle brackets are matched heuristically and never
//! fail: an unmatchable `<` simply stays unlinked.

use crate::errorlogger::FileLocation;
use crate::token::{TokenId, TokenList};

/// Link `()`, `[]` and `{}`. On imbalance returns the offending location.
pub fn link_brackets(list: &mut TokenList) -> Result<(), FileLocation> {
    let mut stack: Vec<(TokenId, &'static str)> = Vec::new();
    for id in list.ids() {
        let closer = match list.text(id) {
            "(" => Some(")"),
            "[" => Some("]"),
            "{" => Some("}"),
            _ => None,
        };
        if let Some(closer) = closer {
            stack.push((id, closer));
            continue;
        }
        let text = list.text(id);
        if text == ")" || text == "]" || text == "}" {
            match stack.pop() {
                Some((open, expected)) if expected == text => {
                    list.set_link(open, id);
                }
                _ => return Err(list.location(id)),
            }
        }
    }
    if let Some((open, _)) = stack.first() {
        return Err(list.location(*open));
    }
    Ok(())
}

/// Heuristic `<`/`>` linking for template syntax: a `<` participates when it
/// directly follows a name (`vector<int>`) or the `template` keyword. The
/// candidate stack is abandoned at tokens that cannot appear inside a
/// template argument list.
pub fn link_angles(list: &mut TokenList) {
    let mut stack: Vec<TokenId> = Vec::new();
    for id in list.ids() {
        match list.text(id) {
            "<" => {
                let after_name = list
                    .prev(id)
                    .is_some_and(|p| list.token(p).is_name());
                if after_name {
                    stack.push(id);
                }
            }
            ">" => {
                if let Some(open) = stack.pop() {
                    list.set_link(open, id);
                }
            }
            ";" | "{" | "}" | "&&" | "||" => stack.clear(),
            _ => {}
        }
    }
}
