//! The pattern mini-language the checkers and the simplifier match the token
//! stream with.
//!
//! A pattern is a space-separated sequence of atoms, compiled once into a
//! small op vector. Matching advances one token per atom with at most a
//! single-alternative choice per position, so a match is O(pattern length).
//!
//! Atoms:
//!
//! | atom        | matches                                             |
//! |-------------|-----------------------------------------------------|
//! | `foo`       | exactly the lexeme `foo`                            |
//! | `%any%`     | any single token                                    |
//! | `%name%`    | any identifier-like token                           |
//! | `%var%`     | an identifier classified as a variable (var id set) |
//! | `%num%`     | a numeric literal                                   |
//! | `%str%`     | a string literal                                    |
//! | `%type%`    | a built-in or resolved type name                    |
//! | `%op%`      | any operator token                                  |
//! | `%or%`      | the `\|` operator (which can't be written literally) |
//! | `%oror%`    | the `\|\|` operator                                 |
//! | `a\|b\|c`   | one of the alternatives at this position            |
//! | `[a\|b]`    | same, bracketed form                                |
//! | `!!foo`     | a token that is not `foo` (also matches list end)   |

use super::{TokenId, TokenKind, TokenList};

/// One compiled pattern position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    Literal(String),
    Any,
    Name,
    Var,
    Num,
    Str,
    Type,
    Op,
    /// Alternatives, each itself a non-alternative atom.
    OneOf(Vec<Atom>),
    Not(String),
}

impl Atom {
    /// Parse a single non-alternative atom word.
    fn parse_single(word: &str) -> Atom {
        match word {
            "%any%" => Atom::Any,
            "%name%" => Atom::Name,
            "%var%" => Atom::Var,
            "%num%" => Atom::Num,
            "%str%" => Atom::Str,
            "%type%" => Atom::Type,
            "%op%" => Atom::Op,
            "%or%" => Atom::Literal("|".to_string()),
            "%oror%" => Atom::Literal("||".to_string()),
            _ => {
                if let Some(neg) = word.strip_prefix("!!") {
                    Atom::Not(neg.to_string())
                } else {
                    Atom::Literal(word.to_string())
                }
            }
        }
    }

    fn parse(word: &str) -> Atom {
        // Bracketed and bare alternative lists: "[ab|cd]", ";|{".
        let inner = word
            .strip_prefix('[')
            .and_then(|w| w.strip_suffix(']'))
            .unwrap_or(word);
        if inner.contains('|') && !matches!(word, "%or%" | "%oror%") {
            let alts = inner
                .split('|')
                .filter(|a| !a.is_empty())
                .map(Atom::parse_single)
                .collect::<Vec<_>>();
            if alts.len() > 1 {
                return Atom::OneOf(alts);
            }
        }
        Atom::parse_single(inner)
    }

    /// Whether the token at `id` satisfies this atom.
    fn accepts(&self, list: &TokenList, id: TokenId) -> bool {
        let tok = list.token(id);
        match self {
            Atom::Literal(s) => tok.text == *s,
            Atom::Any => true,
            Atom::Name => tok.is_name(),
            Atom::Var => tok.kind == TokenKind::Identifier && tok.var_id != 0,
            Atom::Num => tok.kind == TokenKind::Number,
            Atom::Str => tok.kind == TokenKind::StringLit,
            Atom::Type => tok.kind == TokenKind::TypeName || tok.flags.is_standard_type,
            Atom::Op => tok.kind == TokenKind::Operator,
            Atom::OneOf(alts) => alts.iter().any(|a| a.accepts(list, id)),
            Atom::Not(s) => tok.text != *s,
        }
    }
}

/// A compiled pattern. Compile once (typically behind a
/// `once_cell::sync::Lazy`) and reuse; compilation is the expensive half.
#[derive(Debug, Clone)]
pub struct Pattern {
    atoms: Vec<Atom>,
    source: String,
}

impl Pattern {
    pub fn compile(source: &str) -> Pattern {
        Pattern {
            atoms: source.split_whitespace().map(Atom::parse).collect(),
            source: source.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match at `start`; returns the number of tokens consumed, 0 on
    /// mismatch. A trailing `!!foo` atom is satisfied by the end of the list
    /// without consuming anything.
    pub fn match_at(&self, list: &TokenList, start: TokenId) -> usize {
        let mut cursor = Some(start);
        let mut consumed = 0usize;
        for atom in &self.atoms {
            match cursor {
                Some(id) => {
                    if !atom.accepts(list, id) {
                        return 0;
                    }
                    consumed += 1;
                    cursor = list.next(id);
                }
                // Past the end: only a negation is satisfiable here.
                None => match atom {
                    Atom::Not(_) => {}
                    _ => return 0,
                },
            }
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenFlags, TokenKind, TokenList};

    fn build(words: &[(&str, TokenKind)]) -> TokenList {
        let mut list = TokenList::new();
        list.add_file("p.cpp");
        for (text, kind) in words {
            list.push_back(Token::new(*text, *kind, 0, 1));
        }
        list
    }

    fn simple(words: &[&str]) -> TokenList {
        build(
            &words
                .iter()
                .map(|w| {
                    let kind = if w.chars().next().unwrap().is_ascii_digit() {
                        TokenKind::Number
                    } else if w.chars().next().unwrap().is_alphabetic() || w.starts_with('_') {
                        TokenKind::Identifier
                    } else {
                        TokenKind::Operator
                    };
                    (*w, kind)
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn literal_sequence() {
        let list = simple(&["if", "(", "x", ")"]);
        let p = Pattern::compile("if (");
        assert_eq!(p.match_at(&list, list.front().unwrap()), 2);
        let p2 = Pattern::compile("while (");
        assert_eq!(p2.match_at(&list, list.front().unwrap()), 0);
    }

    #[test]
    fn wildcard_atoms() {
        let list = simple(&["x", "=", "10", ";"]);
        let p = Pattern::compile("%name% = %num% ;");
        assert_eq!(p.match_at(&list, list.front().unwrap()), 4);
    }

    #[test]
    fn var_requires_a_variable_id() {
        let mut list = simple(&["x", "=", "0"]);
        let p = Pattern::compile("%var% = %num%");
        assert_eq!(p.match_at(&list, list.front().unwrap()), 0);
        let x = list.front().unwrap();
        list.token_mut(x).var_id = 1;
        assert_eq!(p.match_at(&list, x), 3);
    }

    #[test]
    fn type_atom_matches_standard_types() {
        let mut list = simple(&["int", "x"]);
        let int_tok = list.front().unwrap();
        list.token_mut(int_tok).flags = TokenFlags {
            is_standard_type: true,
            ..TokenFlags::default()
        };
        let p = Pattern::compile("%type% %name%");
        assert_eq!(p.match_at(&list, int_tok), 2);
    }

    #[test]
    fn alternatives_bare_and_bracketed() {
        let list = simple(&["{", "x"]);
        assert!(list.matches(list.front().unwrap(), ";|{"));
        assert!(list.matches(list.front().unwrap(), "[;|{]"));
        assert!(!list.matches(list.front().unwrap(), ";|}"));
    }

    #[test]
    fn alternatives_with_wildcards() {
        let list = simple(&["10", ")"]);
        assert!(list.matches(list.front().unwrap(), "%num%|%name% )"));
    }

    #[test]
    fn or_atom_matches_pipe_operator() {
        let list = simple(&["a", "|", "b", "||", "c"]);
        let a = list.front().unwrap();
        assert!(list.matches(a, "%name% %or% %name% %oror% %name%"));
    }

    #[test]
    fn negation() {
        let list = simple(&["else", "if"]);
        let else_tok = list.front().unwrap();
        assert!(list.matches(else_tok, "else !!{"));
        assert!(!list.matches(else_tok, "else !!if"));
    }

    #[test]
    fn negation_matches_past_list_end() {
        let list = simple(&["return", ";"]);
        let semi = list.back().unwrap();
        assert!(list.matches(semi, "; !!else"));
    }

    #[test]
    fn str_and_char_atoms() {
        let list = build(&[("\"hi\"", TokenKind::StringLit), (";", TokenKind::Operator)]);
        assert!(list.matches(list.front().unwrap(), "%str% ;"));
    }

    #[test]
    fn match_count_is_exact() {
        let list = simple(&["a", "(", ")", ";"]);
        let p = Pattern::compile("%name% ( ) ;");
        assert_eq!(p.match_at(&list, list.front().unwrap()), 4);
    }
}
