//! Constant folding: collapse literal arithmetic, comparisons and shifts,
//! resolve `sizeof` of built-in types through the platform table, and unwrap
//! parenthesized literals.
//!
//! Folding is precedence-aware but deliberately conservative: a fold only
//! happens when the neighboring operators cannot change the result
//! (`x - 3 + 5` keeps its tokens, `x + 3 + 5` becomes `x + 8`).

use crate::mathlib;
use crate::settings::Settings;
use crate::token::{TokenKind, TokenList};

pub fn simplify(list: &mut TokenList, settings: &Settings) {
    fold_sizeof(list, settings);
    merge_unary_minus(list);
    let mut rounds = 0;
    loop {
        if settings.terminated() {
            return;
        }
        let mut changed = unwrap_literal_parens(list);
        changed |= fold_pass(list);
        rounds += 1;
        if !changed || rounds > 100 {
            break;
        }
    }
}

/// Precedence level of a binary operator, higher binds tighter. Only the
/// foldable arithmetic set is ranked.
fn level(op: &str) -> Option<u8> {
    match op {
        "*" | "/" | "%" => Some(10),
        "+" | "-" => Some(9),
        "<<" | ">>" => Some(8),
        "<" | "<=" | ">" | ">=" => Some(7),
        "==" | "!=" => Some(6),
        "&" => Some(5),
        "^" => Some(4),
        "|" => Some(3),
        _ => None,
    }
}

/// Same-level neighbors on the left are only safe when the operation is
/// associative and commutative.
fn reassociates(op: &str) -> bool {
    matches!(op, "+" | "*" | "&" | "^" | "|")
}

fn fold_pass(list: &mut TokenList) -> bool {
    let mut changed = false;
    for id in list.ids() {
        if !list.is_live(id) || !list.token(id).is_number() {
            continue;
        }
        let Some(op_tok) = list.next(id) else { continue };
        let Some(op_level) = level(list.text(op_tok)) else {
            continue;
        };
        let Some(rhs) = list.next(op_tok) else { continue };
        if !list.token(rhs).is_number() {
            continue;
        }

        // A tighter (or unsafe same-level) operator on the left owns the
        // left literal.
        if let Some(prev) = list.prev(id) {
            if let Some(prev_level) = level(list.text(prev)) {
                if prev_level > op_level || (prev_level == op_level && !reassociates(list.text(prev)))
                {
                    continue;
                }
            }
        }
        // A tighter operator on the right owns the right literal; postfix
        // contexts disqualify it entirely.
        if let Some(next) = list.next(rhs) {
            let next_text = list.text(next);
            if level(next_text).is_some_and(|l| l > op_level) {
                continue;
            }
            if matches!(next_text, "[" | "(" | "." | "->" | "::" | "++" | "--") {
                continue;
            }
        }

        let op = list.text(op_tok).to_string();
        let Some(folded) = mathlib::calculate(list.text(id), list.text(rhs), &op) else {
            continue;
        };
        list.token_mut(id).text = folded;
        list.delete(op_tok);
        list.delete(rhs);
        changed = true;
    }
    changed
}

/// `( 5 )` loses its parentheses unless the open paren follows a name (a
/// call) or a closing bracket.
fn unwrap_literal_parens(list: &mut TokenList) -> bool {
    let mut changed = false;
    for id in list.ids() {
        if !list.is_live(id) || list.text(id) != "(" {
            continue;
        }
        let Some(num) = list.next(id) else { continue };
        if !list.token(num).is_number() {
            continue;
        }
        let Some(close) = list.next(num) else { continue };
        if list.text(close) != ")" || list.link(id) != Some(close) {
            continue;
        }
        if let Some(prev) = list.prev(id) {
            let prev_tok = list.token(prev);
            if prev_tok.is_name() || matches!(prev_tok.text.as_str(), ")" | "]") {
                continue;
            }
        }
        list.delete(close);
        list.delete(id);
        changed = true;
    }
    changed
}

/// Merge a unary `-` into the literal that follows it, so folding and the
/// array-bounds checks see negative constants as one token.
fn merge_unary_minus(list: &mut TokenList) {
    for id in list.ids() {
        if !list.is_live(id) || list.text(id) != "-" {
            continue;
        }
        let Some(num) = list.next(id) else { continue };
        if !list.token(num).is_number() || list.text(num).starts_with('-') {
            continue;
        }
        let unary = match list.prev(id) {
            None => true,
            Some(p) => {
                let t = list.token(p);
                (t.is_op() && !matches!(t.text.as_str(), ")" | "]" | "++" | "--"))
                    || matches!(t.text.as_str(), "return" | "case")
            }
        };
        if !unary {
            continue;
        }
        let text = format!("-{}", list.text(num));
        list.token_mut(num).text = text;
        list.delete(id);
    }
}

/// `sizeof ( type )` for built-in types, using the platform width table.
/// Pointers use the platform pointer width. Unknown types are left alone.
fn fold_sizeof(list: &mut TokenList, settings: &Settings) {
    for id in list.ids() {
        if !list.is_live(id) || list.text(id) != "sizeof" {
            continue;
        }
        let Some(open) = list.next(id).filter(|n| list.text(*n) == "(") else {
            continue;
        };
        let Some(close) = list.link(open) else { continue };

        // Collect the type words inside the parentheses.
        let mut words: Vec<String> = Vec::new();
        let mut pointer = false;
        let mut supported = true;
        let mut cur = list.next(open);
        while let Some(c) = cur {
            if c == close {
                break;
            }
            let tok = list.token(c);
            if tok.text == "*" {
                pointer = true;
            } else if tok.flags.is_standard_type || tok.text == "const" {
                words.push(tok.text.clone());
            } else {
                supported = false;
                break;
            }
            cur = list.next(c);
        }
        if !supported || (words.is_empty() && !pointer) {
            continue;
        }

        let size = if pointer {
            Some(settings.platform.sizeof_pointer())
        } else {
            sizeof_words(&words, settings)
        };
        let Some(size) = size else { continue };

        // The `sizeof` token itself becomes the literal; the parenthesized
        // type is deleted.
        {
            let t = list.token_mut(id);
            t.text = size.to_string();
            t.kind = TokenKind::Number;
            t.flags = Default::default();
        }
        list.delete_range(open, close);
    }
}

/// Resolve a multi-word built-in type to its size.
fn sizeof_words(words: &[String], settings: &Settings) -> Option<u32> {
    let significant: Vec<&str> = words
        .iter()
        .map(String::as_str)
        .filter(|w| !matches!(*w, "const" | "signed" | "unsigned"))
        .collect();
    let name = match significant.as_slice() {
        [] => "int",
        ["long", "long"] | ["long", "long", "int"] => "long long",
        ["long", "int"] => "long",
        ["short", "int"] => "short",
        [single] => single,
        _ => return None,
    };
    settings.platform.sizeof(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::simplifier::links;

    fn fold(code: &str) -> String {
        let mut list = tokenize(code, "t.cpp");
        links::link_brackets(&mut list).unwrap();
        simplify(&mut list, &Settings::default());
        list.stringify()
    }

    #[test]
    fn adjacent_literals_fold() {
        assert_eq!(fold("int a[2 + 3];"), "int a [ 5 ] ;");
        assert_eq!(fold("x = 10 * 4;"), "x = 40 ;");
        assert_eq!(fold("x = 1 << 4;"), "x = 16 ;");
    }

    #[test]
    fn precedence_is_respected() {
        assert_eq!(fold("x = 1 + 2 * 3;"), "x = 7 ;");
        assert_eq!(fold("x = y - 3 + 5;"), "x = y - 3 + 5 ;");
        assert_eq!(fold("x = y + 3 + 5;"), "x = y + 8 ;");
        assert_eq!(fold("x = y / 3 * 5;"), "x = y / 3 * 5 ;");
        assert_eq!(fold("x = 3 + 5 * y;"), "x = 3 + 5 * y ;");
    }

    #[test]
    fn parenthesized_literals_unwrap_and_cascade() {
        assert_eq!(fold("x = 2 * (3 + 4);"), "x = 14 ;");
        assert_eq!(fold("x = (5);"), "x = 5 ;");
    }

    #[test]
    fn call_arguments_keep_their_parens_content() {
        // f(5) must not lose its argument parentheses.
        assert_eq!(fold("f(5);"), "f ( 5 ) ;");
    }

    #[test]
    fn division_by_zero_stays() {
        assert_eq!(fold("x = 1 / 0;"), "x = 1 / 0 ;");
    }

    #[test]
    fn unary_minus_merges_into_literal() {
        assert_eq!(fold("x = -5;"), "x = -5 ;");
        assert_eq!(fold("x = a - 5;"), "x = a - 5 ;");
        assert_eq!(fold("x = 8 + -5;"), "x = 3 ;");
        assert_eq!(fold("return -1;"), "return -1 ;");
    }

    #[test]
    fn comparisons_fold() {
        assert_eq!(fold("x = 2 < 3;"), "x = 1 ;");
        assert_eq!(fold("x = 4 == 5;"), "x = 0 ;");
    }

    #[test]
    fn sizeof_builtin_types() {
        assert_eq!(fold("x = sizeof(int);"), "x = 4 ;");
        assert_eq!(fold("x = sizeof(char);"), "x = 1 ;");
        assert_eq!(fold("x = sizeof(unsigned long long);"), "x = 8 ;");
        assert_eq!(fold("x = sizeof(char*);"), "x = 4 ;");
    }

    #[test]
    fn sizeof_unknown_type_is_left_alone() {
        assert_eq!(fold("x = sizeof(struct S);"), "x = sizeof ( struct S ) ;");
    }

    #[test]
    fn folding_is_idempotent() {
        let once = fold("int a[2 + 3 * 4];");
        assert_eq!(once, "int a [ 14 ] ;");
        assert_eq!(fold(&once), once);
    }
}
