//! Bounded template instantiation.
//!
//! For every `template<...> class|struct` or function template definition and
//! every explicit instantiation point `Name<args>` in the stream, a
//! specialized copy of the definition is appended to the token list with the
//! formal parameters textually substituted, and the instantiation point is
//! collapsed to the single specialized name (`Pair<int,char>`). Template
//! definitions are removed afterwards. Recursive instantiation is bounded;
//! hitting the bound stops expansion, leaving the remaining names unresolved.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::settings::Settings;
use crate::token::{Token, TokenId, TokenKind, TokenList};

#[derive(Debug, Clone)]
struct TemplateDef {
    name: String,
    formals: Vec<String>,
    /// The `template` keyword token.
    start: TokenId,
    /// First token of the specializable part (`class`/`struct` or the
    /// return type of a function template).
    decl_start: TokenId,
    /// Closing `}` of the definition (or trailing `;` for classes).
    end: TokenId,
    /// The token carrying the template's own name inside the definition.
    name_token: TokenId,
}

/// Instantiate templates in place.
pub fn instantiate(
    list: &mut TokenList,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
) {
    let defs = collect_definitions(list);
    if defs.is_empty() {
        return;
    }
    let by_name: FxHashMap<String, usize> = defs
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.clone(), i))
        .collect();

    // Tokens belonging to any definition are not instantiation points.
    let mut def_tokens: FxHashSet<TokenId> = FxHashSet::default();
    for def in &defs {
        let mut cur = Some(def.start);
        while let Some(id) = cur {
            def_tokens.insert(id);
            if id == def.end {
                break;
            }
            cur = list.next(id);
        }
    }

    let mut expanded: FxHashSet<String> = FxHashSet::default();
    for depth in 0.. {
        if settings.terminated() {
            return;
        }
        if depth >= settings.max_template_depth {
            debug!("template instantiation depth limit reached");
            logger.report_err(&ErrorMessage::at(
                Severity::Debug,
                "templateRecursion",
                "Template instantiation depth limit reached; remaining instantiations skipped.",
                list.file_name(0),
                1,
            ));
            break;
        }
        let Some(site) = find_instantiation(list, &by_name, &def_tokens) else {
            break;
        };
        expand_site(list, &defs[site.def_index], site, &mut expanded);
    }

    // Finally remove the definitions themselves.
    for def in &defs {
        if list.is_live(def.start) && list.is_live(def.end) {
            list.delete_range(def.start, def.end);
        }
    }
}

struct Site {
    def_index: usize,
    /// The name token at the instantiation point.
    name_token: TokenId,
    open: TokenId,
    close: TokenId,
    args: Vec<Vec<String>>,
    key: String,
}

fn collect_definitions(list: &TokenList) -> Vec<TemplateDef> {
    let mut out = Vec::new();
    for id in list.ids() {
        if list.text(id) != "template" {
            continue;
        }
        let Some(open) = list.next(id).filter(|n| list.text(*n) == "<") else {
            continue;
        };
        let Some(close) = list.link(open) else {
            continue;
        };
        let formals = parse_formals(list, open, close);
        if formals.is_empty() {
            continue;
        }
        let Some(decl_start) = list.next(close) else {
            continue;
        };

        if matches!(list.text(decl_start), "class" | "struct") {
            // template < ... > class NAME { ... } ;
            let Some(name_token) = list.next(decl_start) else {
                continue;
            };
            if !list.token(name_token).is_name() {
                continue;
            }
            let Some(body_open) = find_forward(list, name_token, "{", 4) else {
                continue;
            };
            let Some(body_close) = list.link(body_open) else {
                continue;
            };
            let end = match list.next(body_close) {
                Some(semi) if list.text(semi) == ";" => semi,
                _ => body_close,
            };
            out.push(TemplateDef {
                name: list.text(name_token).to_string(),
                formals,
                start: id,
                decl_start,
                end,
                name_token,
            });
        } else {
            // template < ... > TYPE NAME ( ... ) { ... }
            let Some((name_token, paren)) = find_function_name(list, decl_start) else {
                continue;
            };
            let Some(paren_close) = list.link(paren) else {
                continue;
            };
            let Some(body_open) = list.next(paren_close).filter(|n| list.text(*n) == "{") else {
                continue;
            };
            let Some(body_close) = list.link(body_open) else {
                continue;
            };
            out.push(TemplateDef {
                name: list.text(name_token).to_string(),
                formals,
                start: id,
                decl_start,
                end: body_close,
                name_token,
            });
        }
    }
    out
}

/// Formal parameter names from `template < class T , int N >`: the last
/// identifier of each comma-separated part.
fn parse_formals(list: &TokenList, open: TokenId, close: TokenId) -> Vec<String> {
    let mut formals = Vec::new();
    let mut last_name: Option<String> = None;
    let mut cur = list.next(open);
    while let Some(id) = cur {
        if id == close {
            break;
        }
        let tok = list.token(id);
        if tok.kind == TokenKind::Identifier {
            last_name = Some(tok.text.clone());
        } else if tok.text == "," {
            if let Some(name) = last_name.take() {
                formals.push(name);
            }
        }
        cur = list.next(id);
    }
    if let Some(name) = last_name {
        formals.push(name);
    }
    formals
}

/// First identifier followed by a linked `(` within the next few tokens;
/// that is the function template's name.
fn find_function_name(list: &TokenList, from: TokenId) -> Option<(TokenId, TokenId)> {
    let mut cur = Some(from);
    for _ in 0..8 {
        let id = cur?;
        if list.token(id).is_name() {
            if let Some(next) = list.next(id) {
                if list.text(next) == "(" && list.link(next).is_some() {
                    return Some((id, next));
                }
            }
        }
        cur = list.next(id);
    }
    None
}

fn find_forward(list: &TokenList, from: TokenId, text: &str, limit: usize) -> Option<TokenId> {
    let mut cur = Some(from);
    for _ in 0..=limit {
        let id = cur?;
        if list.text(id) == text {
            return Some(id);
        }
        cur = list.next(id);
    }
    None
}

fn find_instantiation(
    list: &TokenList,
    by_name: &FxHashMap<String, usize>,
    def_tokens: &FxHashSet<TokenId>,
) -> Option<Site> {
    for id in list.ids() {
        if def_tokens.contains(&id) {
            continue;
        }
        let tok = list.token(id);
        if tok.kind != TokenKind::Identifier {
            continue;
        }
        let Some(&def_index) = by_name.get(&tok.text) else {
            continue;
        };
        let Some(open) = list.next(id).filter(|n| list.text(*n) == "<") else {
            continue;
        };
        let Some(close) = list.link(open) else {
            continue;
        };
        let args = parse_args(list, open, close);
        if args.is_empty() {
            continue;
        }
        let key = format!(
            "{}<{}>",
            tok.text,
            args.iter()
                .map(|a| a.join(" "))
                .collect::<Vec<_>>()
                .join(",")
        );
        return Some(Site {
            def_index,
            name_token: id,
            open,
            close,
            args,
            key,
        });
    }
    None
}

/// Argument lexeme sequences between `<` and `>`, split at top-level commas.
fn parse_args(list: &TokenList, open: TokenId, close: TokenId) -> Vec<Vec<String>> {
    let mut args = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut cur = list.next(open);
    while let Some(id) = cur {
        if id == close && depth == 0 {
            break;
        }
        let text = list.text(id);
        match text {
            "<" => depth += 1,
            ">" if depth > 0 => depth -= 1,
            "," if depth == 0 => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
                cur = list.next(id);
                continue;
            }
            _ => {}
        }
        current.push(text.to_string());
        cur = list.next(id);
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn expand_site(
    list: &mut TokenList,
    def: &TemplateDef,
    site: Site,
    expanded: &mut FxHashSet<String>,
) {
    // Append the specialized copy once per unique key.
    if expanded.insert(site.key.clone()) {
        let substitution: FxHashMap<&str, &Vec<String>> = def
            .formals
            .iter()
            .map(String::as_str)
            .zip(site.args.iter())
            .collect();

        let copy_ids: Vec<TokenId> = {
            let mut ids = Vec::new();
            let mut cur = Some(def.decl_start);
            while let Some(id) = cur {
                ids.push(id);
                if id == def.end {
                    break;
                }
                cur = list.next(id);
            }
            ids
        };

        for id in copy_ids {
            let tok = list.token(id).clone();
            if id == def.name_token {
                let mut named = Token::new(site.key.clone(), TokenKind::TypeName, tok.file_index, tok.line);
                named.flags = tok.flags;
                list.push_back(named);
                continue;
            }
            if tok.kind == TokenKind::Identifier {
                if let Some(arg) = substitution.get(tok.text.as_str()) {
                    for lexeme in arg.iter() {
                        list.push_back(make_token(lexeme, tok.file_index, tok.line));
                    }
                    continue;
                }
            }
            let mut copy = tok.clone();
            copy.link = None;
            copy.var_id = 0;
            list.push_back(copy);
        }
    }

    // Collapse the instantiation point to the specialized name.
    list.delete_range(site.open, site.close);
    let name_tok = list.token_mut(site.name_token);
    name_tok.text = site.key;
    name_tok.kind = TokenKind::TypeName;
}

fn make_token(lexeme: &str, file_index: u32, line: u32) -> Token {
    let kind = if crate::lexer::is_standard_type(lexeme) {
        TokenKind::TypeName
    } else if crate::lexer::is_keyword(lexeme) {
        TokenKind::Keyword
    } else if lexeme.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        TokenKind::Number
    } else if lexeme.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
        TokenKind::Identifier
    } else {
        TokenKind::Operator
    };
    let mut tok = Token::new(lexeme, kind, file_index, line);
    tok.flags.is_standard_type = crate::lexer::is_standard_type(lexeme);
    tok
}
