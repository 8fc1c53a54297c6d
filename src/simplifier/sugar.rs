//! Sugar removal: small semantics-preserving rewrites that normalize the
//! stream so checker patterns have fewer shapes to match.
//!
//! - `>>` closing two template argument lists becomes `> >`
//! - combined declarations `int a, b;` are split into separate statements
//! - `else if` becomes `else { if ... }`
//! - exactly-nested redundant parentheses and braces are dropped, as are
//!   parentheses around a whole `return` expression
//!
//! Every rewrite leaves already-rewritten code untouched, so the phase is
//! idempotent.

use crate::token::{Token, TokenId, TokenKind, TokenList};

pub fn simplify(list: &mut TokenList) {
    split_shift_in_template_args(list);
    split_comma_declarations(list);
    remove_redundant_parentheses(list);
    remove_redundant_braces(list);
    rewrite_else_if(list);
}

/// `map<int, vector<int>> m` carries a `>>` token that closes two template
/// argument lists; split it so angle linking can pair them.
fn split_shift_in_template_args(list: &mut TokenList) {
    let mut open_angles: Vec<TokenId> = Vec::new();
    for id in list.ids() {
        if !list.is_live(id) {
            continue;
        }
        match list.text(id) {
            "<" => {
                if list.prev(id).is_some_and(|p| list.token(p).is_name()) {
                    open_angles.push(id);
                }
            }
            ">" => {
                open_angles.pop();
            }
            ">>" if open_angles.len() >= 2 => {
                let tok = list.token(id);
                let (file_index, line) = (tok.file_index, tok.line);
                list.token_mut(id).text = ">".to_string();
                list.insert_after(id, Token::new(">", TokenKind::Operator, file_index, line));
                open_angles.pop();
                open_angles.pop();
            }
            ";" | "{" | "}" => open_angles.clear(),
            _ => {}
        }
    }
}

/// Split `int a, b;` into `int a; int b;`, duplicating the base type in
/// front of each declarator. Statements containing parentheses (function
/// declarations, initializer calls) are left alone.
fn split_comma_declarations(list: &mut TokenList) {
    for id in list.ids() {
        if !list.is_live(id) || !at_statement_start(list, id) || !is_type_start(list, id) {
            continue;
        }
        // Collect the base type tokens.
        let mut type_ids = vec![id];
        let mut cur = list.next(id);
        while let Some(c) = cur {
            if is_type_continuation(list, c) {
                type_ids.push(c);
                cur = list.next(c);
            } else {
                break;
            }
        }
        // First declarator must be `*`* name.
        let mut declarator = cur;
        while let Some(d) = declarator.filter(|d| list.text(*d) == "*") {
            declarator = list.next(d);
        }
        let Some(name) = declarator else { continue };
        if list.token(name).kind != TokenKind::Identifier {
            continue;
        }

        // Scan the rest of the statement; bail out on parentheses or braces.
        let mut commas = Vec::new();
        let mut bracket_depth = 0usize;
        let mut scan = list.next(name);
        let mut ok = false;
        while let Some(c) = scan {
            match list.text(c) {
                ";" => {
                    ok = true;
                    break;
                }
                "(" | ")" | "{" | "}" => break,
                "[" => bracket_depth += 1,
                "]" => bracket_depth = bracket_depth.saturating_sub(1),
                "," if bracket_depth == 0 => commas.push(c),
                _ => {}
            }
            scan = list.next(c);
        }
        if !ok || commas.is_empty() {
            continue;
        }

        let type_lexemes: Vec<(String, TokenKind, bool)> = type_ids
            .iter()
            .map(|t| {
                let tok = list.token(*t);
                (tok.text.clone(), tok.kind, tok.flags.is_standard_type)
            })
            .collect();
        for comma in commas {
            let (file_index, line) = {
                let t = list.token(comma);
                (t.file_index, t.line)
            };
            list.token_mut(comma).text = ";".to_string();
            let mut insert_at = comma;
            for (text, kind, std_type) in &type_lexemes {
                let mut tok = Token::new(text.clone(), *kind, file_index, line);
                tok.flags.is_standard_type = *std_type;
                insert_at = list.insert_after(insert_at, tok);
            }
        }
    }
}

fn at_statement_start(list: &TokenList, id: TokenId) -> bool {
    match list.prev(id) {
        None => true,
        Some(p) => matches!(list.text(p), ";" | "{" | "}"),
    }
}

fn is_type_start(list: &TokenList, id: TokenId) -> bool {
    let tok = list.token(id);
    tok.flags.is_standard_type
        || tok.kind == TokenKind::TypeName
        || matches!(tok.text.as_str(), "const" | "static")
}

fn is_type_continuation(list: &TokenList, id: TokenId) -> bool {
    let tok = list.token(id);
    tok.flags.is_standard_type || tok.kind == TokenKind::TypeName || tok.text == "const"
}

/// `( ( ... ) )` with exact nesting loses the outer pair; `return ( ... ) ;`
/// loses the parentheses entirely.
fn remove_redundant_parentheses(list: &mut TokenList) {
    for id in list.ids() {
        if !list.is_live(id) || list.text(id) != "(" {
            continue;
        }
        let Some(close) = list.link(id) else { continue };

        // return ( expr ) ;
        if list.prev(id).is_some_and(|p| list.text(p) == "return")
            && list.next(close).is_some_and(|n| list.text(n) == ";")
            && list.next(id) != Some(close)
        {
            list.delete(close);
            list.delete(id);
            continue;
        }

        // ( ( ... ) )
        if let Some(inner) = list.next(id).filter(|n| list.text(*n) == "(") {
            if let Some(inner_close) = list.link(inner) {
                if list.next(inner_close) == Some(close) {
                    list.delete(close);
                    list.delete(id);
                }
            }
        }
    }
}

/// `{ { ... } }` with exact nesting loses the outer pair.
fn remove_redundant_braces(list: &mut TokenList) {
    for id in list.ids() {
        if !list.is_live(id) || list.text(id) != "{" {
            continue;
        }
        let Some(close) = list.link(id) else { continue };
        if let Some(inner) = list.next(id).filter(|n| list.text(*n) == "{") {
            if let Some(inner_close) = list.link(inner) {
                if list.next(inner_close) == Some(close) {
                    list.delete(close);
                    list.delete(id);
                }
            }
        }
    }
}

/// Rewrite `else if (...) ...` as `else { if (...) ... }` so scope walks see
/// one statement per branch. The inserted block swallows the whole trailing
/// `else` chain of the inner `if`.
fn rewrite_else_if(list: &mut TokenList) {
    for id in list.ids() {
        if !list.is_live(id) || list.text(id) != "else" {
            continue;
        }
        let Some(if_tok) = list.next(id).filter(|n| list.text(*n) == "if") else {
            continue;
        };
        let Some(end) = if_chain_end(list, if_tok) else {
            continue;
        };
        let (file_index, line) = {
            let t = list.token(id);
            (t.file_index, t.line)
        };
        list.insert_after(id, Token::new("{", TokenKind::Operator, file_index, line));
        let end_line = list.token(end).line;
        list.insert_after(end, Token::new("}", TokenKind::Operator, file_index, end_line));
    }
}

/// Last token of an `if` statement including its `else` chain.
fn if_chain_end(list: &TokenList, if_tok: TokenId) -> Option<TokenId> {
    let cond_open = list.next(if_tok).filter(|n| list.text(*n) == "(")?;
    let cond_close = list.link(cond_open)?;
    let mut end = statement_end(list, list.next(cond_close)?)?;
    loop {
        let Some(next) = list.next(end) else {
            return Some(end);
        };
        if list.text(next) != "else" {
            return Some(end);
        }
        let after_else = list.next(next)?;
        if list.text(after_else) == "if" {
            end = if_chain_end(list, after_else)?;
        } else {
            end = statement_end(list, after_else)?;
        }
    }
}

/// End of one statement starting at `from`: the matching `}` of a block, or
/// the next `;` at paren depth zero.
fn statement_end(list: &TokenList, from: TokenId) -> Option<TokenId> {
    if list.text(from) == "{" {
        return list.link(from);
    }
    let mut depth = 0usize;
    let mut cur = Some(from);
    while let Some(id) = cur {
        match list.text(id) {
            "(" | "[" => depth += 1,
            ")" | "]" => depth = depth.saturating_sub(1),
            ";" if depth == 0 => return Some(id),
            "{" | "}" => return None,
            _ => {}
        }
        cur = list.next(id);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::simplifier::links;

    fn sugar(code: &str) -> String {
        let mut list = tokenize(code, "t.cpp");
        links::link_brackets(&mut list).unwrap();
        links::link_angles(&mut list);
        simplify(&mut list);
        list.stringify()
    }

    #[test]
    fn shift_inside_template_args_is_split() {
        assert_eq!(
            sugar("vector<vector<int>> v;"),
            "vector < vector < int > > v ;"
        );
    }

    #[test]
    fn real_shift_is_untouched() {
        assert_eq!(sugar("x = a >> 2;"), "x = a >> 2 ;");
    }

    #[test]
    fn comma_declaration_is_split() {
        assert_eq!(sugar("int a, b;"), "int a ; int b ;");
    }

    #[test]
    fn comma_declaration_with_initializers() {
        assert_eq!(sugar("int a = 1, b = 2;"), "int a = 1 ; int b = 2 ;");
    }

    #[test]
    fn pointer_declarators_keep_their_stars() {
        assert_eq!(sugar("char *p, *q;"), "char * p ; char * q ;");
    }

    #[test]
    fn array_subscript_commas_are_not_declarators() {
        assert_eq!(sugar("int a[2], b;"), "int a [ 2 ] ; int b ;");
    }

    #[test]
    fn function_declarations_are_not_split() {
        assert_eq!(sugar("int f(int a, int b);"), "int f ( int a , int b ) ;");
    }

    #[test]
    fn else_if_gains_a_block() {
        assert_eq!(
            sugar("if (a) x; else if (b) y; else z;"),
            "if ( a ) x ; else { if ( b ) y ; else z ; }"
        );
    }

    #[test]
    fn else_if_rewrite_is_idempotent() {
        let once = sugar("if (a) x; else if (b) y;");
        let mut list = tokenize(&once, "t.cpp");
        links::link_brackets(&mut list).unwrap();
        simplify(&mut list);
        assert_eq!(list.stringify(), once);
    }

    #[test]
    fn double_parentheses_lose_the_outer_pair() {
        assert_eq!(sugar("x = ((a + b));"), "x = ( a + b ) ;");
    }

    #[test]
    fn return_parentheses_are_dropped() {
        assert_eq!(sugar("int f() { return (x); }"), "int f ( ) { return x ; }");
    }

    #[test]
    fn call_argument_parentheses_survive_once() {
        assert_eq!(sugar("f((a));"), "f ( a ) ;");
    }

    #[test]
    fn double_braces_lose_the_outer_pair() {
        assert_eq!(sugar("void f() { { int x; } }"), "void f ( ) { int x ; }");
    }
}
