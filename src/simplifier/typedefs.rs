//! Typedef resolution: replace uses of a typedef name with the underlying
//! type tokens, honoring shadowing in inner scopes.
//!
//! Only declaration-style typedefs (`typedef unsigned long ulong;`,
//! `typedef std::vector<int> IntVec;`) are resolved. Function-pointer and
//! array typedefs are left alone; the checkers treat the unresolved name as
//! an ordinary type.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::token::{Token, TokenId, TokenKind, TokenList};

#[derive(Debug, Clone)]
struct TypedefDef {
    /// Replacement lexemes, in order.
    tokens: Vec<String>,
}

/// Resolve typedefs in place.
pub fn simplify(list: &mut TokenList) {
    let mut defs: FxHashMap<String, TypedefDef> = FxHashMap::default();

    // Pass 1: collect and remove typedef declarations.
    let ids = list.ids();
    let mut i = 0usize;
    while i < ids.len() {
        let id = ids[i];
        if !list.is_live(id) || list.text(id) != "typedef" {
            i += 1;
            continue;
        }
        if let Some((name, def, end)) = parse_typedef(list, id) {
            defs.insert(name, def);
            list.delete_range(id, end);
        } else {
            debug!("skipping unsupported typedef form");
        }
        i += 1;
    }

    if defs.is_empty() {
        return;
    }

    // Pass 2: substitute uses, tracking shadowing per brace scope.
    let mut shadow_stack: Vec<FxHashSet<String>> = vec![FxHashSet::default()];
    for id in list.ids() {
        if !list.is_live(id) {
            continue;
        }
        match list.text(id) {
            "{" => shadow_stack.push(FxHashSet::default()),
            "}" => {
                if shadow_stack.len() > 1 {
                    shadow_stack.pop();
                }
            }
            _ => {}
        }
        let tok = list.token(id);
        if tok.kind != TokenKind::Identifier {
            continue;
        }
        let name = tok.text.clone();
        let Some(def) = defs.get(&name) else {
            continue;
        };
        // Member access and qualified names are not type uses.
        if let Some(prev) = list.prev(id) {
            if matches!(list.text(prev), "." | "->" | "::") {
                continue;
            }
            // `int Size;` declares a variable shadowing the typedef name.
            if list.token(prev).flags.is_standard_type || list.token(prev).kind == TokenKind::TypeName
            {
                if let Some(scope) = shadow_stack.last_mut() {
                    scope.insert(name.clone());
                }
                continue;
            }
        }
        if shadow_stack.iter().any(|s| s.contains(&name)) {
            continue;
        }

        // Substitute: retarget this token to the first lexeme and insert the
        // rest after it, with fresh copies.
        let (file_index, line) = (tok.file_index, tok.line);
        let first = &def.tokens[0];
        {
            let t = list.token_mut(id);
            t.text = first.clone();
            t.kind = word_kind(first);
            t.flags.is_standard_type = crate::lexer::is_standard_type(first);
        }
        let mut insert_at = id;
        for lexeme in &def.tokens[1..] {
            let mut copy = Token::new(lexeme.clone(), word_kind(lexeme), file_index, line);
            copy.flags.is_standard_type = crate::lexer::is_standard_type(lexeme);
            insert_at = list.insert_after(insert_at, copy);
        }
    }
}

fn word_kind(lexeme: &str) -> TokenKind {
    let first = lexeme.chars().next().unwrap_or(' ');
    if crate::lexer::is_standard_type(lexeme) {
        TokenKind::TypeName
    } else if crate::lexer::is_keyword(lexeme) {
        TokenKind::Keyword
    } else if first.is_ascii_alphabetic() || first == '_' {
        TokenKind::TypeName
    } else if first.is_ascii_digit() {
        TokenKind::Number
    } else {
        TokenKind::Operator
    }
}

/// Parse `typedef <tokens> <name> ;`. Returns the new name, its definition,
/// and the terminating `;`. `None` for forms that are not plain
/// declaration typedefs (function pointers, arrays, multi-declarator).
fn parse_typedef(list: &TokenList, typedef_tok: TokenId) -> Option<(String, TypedefDef, TokenId)> {
    let mut lexemes = Vec::new();
    let mut cur = list.next(typedef_tok)?;
    let end = loop {
        let text = list.text(cur);
        match text {
            ";" => break cur,
            "(" | ")" | "[" | "]" | "," | "{" | "}" => return None,
            _ => lexemes.push(text.to_string()),
        }
        cur = list.next(cur)?;
    };
    // The last name is the typedef'd alias; everything before it is the type.
    let name = lexemes.pop()?;
    if lexemes.is_empty() || !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
        return None;
    }
    Some((name, TypedefDef { tokens: lexemes }, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn simplify_code(code: &str) -> String {
        let mut list = tokenize(code, "t.cpp");
        simplify(&mut list);
        list.stringify()
    }

    #[test]
    fn simple_typedef_is_substituted() {
        assert_eq!(
            simplify_code("typedef unsigned int uint; uint x;"),
            "unsigned int x ;"
        );
    }

    #[test]
    fn pointer_typedef() {
        assert_eq!(
            simplify_code("typedef char* str; str s;"),
            "char * s ;"
        );
    }

    #[test]
    fn multiple_uses_are_all_replaced() {
        assert_eq!(
            simplify_code("typedef long LL; LL a; LL b;"),
            "long a ; long b ;"
        );
    }

    #[test]
    fn function_pointer_typedef_is_left_alone() {
        assert_eq!(
            simplify_code("typedef int (*fp)(void); fp f;"),
            "typedef int ( * fp ) ( void ) ; fp f ;"
        );
    }

    #[test]
    fn member_access_is_not_a_type_use() {
        assert_eq!(
            simplify_code("typedef int len; s.len = 1;"),
            "s . len = 1 ;"
        );
    }

    #[test]
    fn shadowed_name_is_not_substituted() {
        // Inside the block, `size` is a variable of type int.
        assert_eq!(
            simplify_code("typedef unsigned size; void f() { int size; size = 1; }"),
            "void f ( ) { int size ; size = 1 ; }"
        );
    }

    #[test]
    fn substituted_tokens_are_type_names() {
        let mut list = tokenize("typedef unsigned long ull; ull x;", "t.cpp");
        simplify(&mut list);
        let first = list.front().unwrap();
        assert!(list.token(first).flags.is_standard_type);
    }
}
