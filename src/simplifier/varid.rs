//! Variable id assignment: walk scopes and give every declared variable a
//! dense integer id, then annotate every use with the id of the innermost
//! visible declaration. Shadowing yields distinct ids.

use rustc_hash::FxHashMap;

use crate::token::{TokenId, TokenKind, TokenList};

struct Scope {
    vars: FxHashMap<String, u32>,
    /// Token that pops this scope (`}` of a block, or the body `}` for a
    /// parameter-list scope). `None` for the file scope.
    closer: Option<TokenId>,
}

/// Assign variable ids in place. Ids start at 1; 0 means "no variable".
pub fn assign(list: &mut TokenList) {
    let mut next_id: u32 = 1;
    let mut scopes: Vec<Scope> = vec![Scope {
        vars: FxHashMap::default(),
        closer: None,
    }];

    for id in list.ids() {
        if !list.is_live(id) {
            continue;
        }
        while scopes.len() > 1 && scopes.last().is_some_and(|s| s.closer == Some(id)) {
            scopes.pop();
        }

        match list.text(id) {
            "{" => {
                if let Some(close) = list.link(id) {
                    scopes.push(Scope {
                        vars: FxHashMap::default(),
                        closer: Some(close),
                    });
                }
                continue;
            }
            "(" => {
                // A parameter list scope extends over the following body so
                // parameters stay visible inside it.
                if let Some(close) = list.link(id) {
                    let closer = match list.next(close) {
                        Some(brace) if list.text(brace) == "{" => {
                            list.link(brace).or(Some(close))
                        }
                        _ => Some(close),
                    };
                    scopes.push(Scope {
                        vars: FxHashMap::default(),
                        closer,
                    });
                }
                continue;
            }
            _ => {}
        }

        if list.token(id).kind != TokenKind::Identifier {
            continue;
        }

        if is_declaration_name(list, id) {
            let name = list.text(id).to_string();
            let var_id = next_id;
            next_id += 1;
            if let Some(scope) = scopes.last_mut() {
                scope.vars.insert(name, var_id);
            }
            list.token_mut(id).var_id = var_id;
            continue;
        }

        if is_use(list, id) {
            let name = list.text(id).to_string();
            if let Some(&var_id) = scopes.iter().rev().find_map(|s| s.vars.get(&name)) {
                list.token_mut(id).var_id = var_id;
            }
        }
    }
}

/// Is this identifier the name in a variable declaration? The token before
/// it (skipping `*`, `&`, `const`) must be a type, and the token after it
/// must continue a declarator rather than a call.
fn is_declaration_name(list: &TokenList, id: TokenId) -> bool {
    let Some(next) = list.next(id) else {
        return false;
    };
    if !matches!(list.text(next), ";" | "=" | "," | ")" | "[") {
        return false;
    }

    let mut p = list.prev(id);
    while let Some(prev) = p {
        if matches!(list.text(prev), "*" | "&" | "const") {
            p = list.prev(prev);
        } else {
            break;
        }
    }
    let Some(type_tok) = p else { return false };
    let tok = list.token(type_tok);
    if tok.flags.is_standard_type || tok.kind == TokenKind::TypeName {
        return true;
    }
    if tok.kind != TokenKind::Identifier {
        return false;
    }
    // `struct Foo x;` style declarations.
    match list.prev(type_tok) {
        Some(pp) if matches!(list.text(pp), "struct" | "class" | "union" | "enum") => true,
        // `FILE * fp;` is an unknown type name at statement or parameter
        // start. (`a * b;` as an expression statement has no effect, so
        // reading it as a declaration is harmless.)
        Some(pp) => matches!(list.text(pp), ";" | "{" | "}" | "(" | ","),
        None => true,
    }
}

/// Is this identifier a candidate variable use? Member accesses through
/// another object and qualified names are not; neither are calls.
fn is_use(list: &TokenList, id: TokenId) -> bool {
    if let Some(prev) = list.prev(id) {
        if matches!(list.text(prev), "." | "->" | "::") {
            return false;
        }
    }
    if let Some(next) = list.next(id) {
        if list.text(next) == "(" {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::simplifier::links;

    fn assign_code(code: &str) -> (TokenList, Vec<(String, u32)>) {
        let mut list = tokenize(code, "t.cpp");
        links::link_brackets(&mut list).unwrap();
        assign(&mut list);
        let annotated = list
            .ids()
            .into_iter()
            .filter(|id| list.token(*id).var_id != 0)
            .map(|id| (list.text(id).to_string(), list.token(id).var_id))
            .collect();
        (list, annotated)
    }

    #[test]
    fn declaration_and_use_share_an_id() {
        let (_, vars) = assign_code("void f() { int x; x = 1; }");
        assert_eq!(vars, vec![("x".into(), 1), ("x".into(), 1)]);
    }

    #[test]
    fn distinct_variables_get_distinct_ids() {
        let (_, vars) = assign_code("void f() { int x; int y; x = y; }");
        assert_eq!(
            vars,
            vec![
                ("x".into(), 1),
                ("y".into(), 2),
                ("x".into(), 1),
                ("y".into(), 2),
            ]
        );
    }

    #[test]
    fn shadowing_gets_a_fresh_id() {
        let (_, vars) = assign_code("void f() { int x; { int x; x = 1; } x = 2; }");
        assert_eq!(
            vars,
            vec![
                ("x".into(), 1),
                ("x".into(), 2),
                ("x".into(), 2),
                ("x".into(), 1),
            ]
        );
    }

    #[test]
    fn parameters_are_visible_in_the_body() {
        let (_, vars) = assign_code("void f(int a) { a = 1; }");
        assert_eq!(vars, vec![("a".into(), 1), ("a".into(), 1)]);
    }

    #[test]
    fn pointer_declarations() {
        let (_, vars) = assign_code("void f() { char *p; p = 0; }");
        assert_eq!(vars, vec![("p".into(), 1), ("p".into(), 1)]);
    }

    #[test]
    fn function_names_are_not_variables() {
        let (_, vars) = assign_code("void f() { g(); }");
        assert!(vars.is_empty());
    }

    #[test]
    fn member_access_is_not_a_use_of_the_local() {
        let (_, vars) = assign_code("void f() { int n; s.n = 1; n = 2; }");
        assert_eq!(vars, vec![("n".into(), 1), ("n".into(), 1)]);
    }

    #[test]
    fn struct_declarations() {
        let (_, vars) = assign_code("void f() { struct Point p; p = q; }");
        assert!(vars.contains(&("p".into(), 1)));
    }

    #[test]
    fn array_declaration() {
        let (_, vars) = assign_code("void f() { int a[10]; a[0] = 1; }");
        assert_eq!(vars, vec![("a".into(), 1), ("a".into(), 1)]);
    }

    #[test]
    fn two_functions_with_same_parameter_name() {
        let (_, vars) = assign_code("void f(int n) { n = 1; } void g(int n) { n = 2; }");
        assert_eq!(
            vars,
            vec![
                ("n".into(), 1),
                ("n".into(), 1),
                ("n".into(), 2),
                ("n".into(), 2),
            ]
        );
    }
}
