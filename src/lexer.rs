//! Raw text to token list.
//!
//! The input is preprocessed source: comments stripped, macros expanded, and
//! includes inlined between `#file "path"` / `#endfile` markers that carry
//! provenance. The lexer keeps a file stack so every token knows its original
//! file and 1-based line.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use crate::mathlib;
use crate::token::{Token, TokenKind, TokenList};

/// The closed keyword set. Anything here lexes as `TokenKind::Keyword`.
static KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "if", "else", "for", "while", "do", "switch", "case", "default", "break", "continue",
        "return", "goto", "sizeof", "typedef", "struct", "class", "union", "enum", "namespace",
        "template", "typename", "public", "private", "protected", "virtual", "operator", "new",
        "delete", "const", "static", "extern", "inline", "friend", "using", "try", "catch",
        "throw", "this", "true", "false", "const_cast", "static_cast", "dynamic_cast",
        "reinterpret_cast", "explicit", "mutable", "register", "volatile", "asm",
    ]
    .into_iter()
    .collect()
});

/// Built-in type names, marked with the standard-type flag.
static STANDARD_TYPES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "void", "bool", "char", "short", "int", "long", "float", "double", "unsigned", "signed",
        "wchar_t", "size_t",
    ]
    .into_iter()
    .collect()
});

/// Multi-character operators, longest first so maximal munch works.
const OPERATORS_3: &[&str] = &["<<=", ">>=", "...", "->*"];
const OPERATORS_2: &[&str] = &[
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "->", "::",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

pub fn is_standard_type(word: &str) -> bool {
    STANDARD_TYPES.contains(word)
}

/// Tokenize preprocessed source for one configuration.
pub fn tokenize(code: &str, main_file: &str) -> TokenList {
    let mut list = TokenList::new();
    let main_index = list.add_file(main_file);

    let bytes = code.as_bytes();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut file_index = main_index;
    // (file index, line to resume at) for each enclosing include.
    let mut file_stack: Vec<(u32, u32)> = Vec::new();
    let mut at_line_start = true;

    while pos < bytes.len() {
        let Some(c) = code[pos..].chars().next() else {
            break;
        };

        if c == '\n' {
            line += 1;
            pos += 1;
            at_line_start = true;
            continue;
        }
        if c == ' ' || c == '\t' || c == '\r' {
            pos += 1;
            continue;
        }

        // Provenance markers from the preprocessor. Only honored at line
        // start; the marker line itself does not count as a source line.
        if c == '#' && at_line_start {
            let end = code[pos..].find('\n').map_or(bytes.len(), |n| pos + n);
            let directive = code[pos..end].trim();
            if let Some(rest) = directive.strip_prefix("#file") {
                let name = rest.trim().trim_matches('"');
                file_stack.push((file_index, line));
                file_index = find_or_add_file(&mut list, name);
                line = 1;
            } else if directive == "#endfile" {
                if let Some((parent, parent_line)) = file_stack.pop() {
                    file_index = parent;
                    // The include directive consumed one line of the parent.
                    line = parent_line + 1;
                }
            }
            // Unknown directives surviving preprocessing are dropped.
            pos = end + 1;
            at_line_start = true;
            continue;
        }
        at_line_start = false;

        // Identifiers, keywords, type names.
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < bytes.len()
                && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
            {
                pos += 1;
            }
            let word = &code[start..pos];
            let mut tok = if is_keyword(word) {
                Token::new(word, TokenKind::Keyword, file_index, line)
            } else if is_standard_type(word) {
                Token::new(word, TokenKind::TypeName, file_index, line)
            } else {
                Token::new(word, TokenKind::Identifier, file_index, line)
            };
            tok.flags.is_standard_type = is_standard_type(word);
            list.push_back(tok);
            continue;
        }

        // Numeric literals, including a leading '.' form like ".5".
        if c.is_ascii_digit()
            || (c == '.' && pos + 1 < bytes.len() && (bytes[pos + 1] as char).is_ascii_digit())
        {
            let start = pos;
            pos += 1;
            while pos < bytes.len() {
                let d = bytes[pos] as char;
                if d.is_ascii_alphanumeric() || d == '.' || d == '_' {
                    pos += 1;
                } else if (d == '+' || d == '-')
                    && matches!(bytes[pos - 1], b'e' | b'E' | b'p' | b'P')
                {
                    pos += 1;
                } else {
                    break;
                }
            }
            let text = &code[start..pos];
            let mut tok = Token::new(text, TokenKind::Number, file_index, line);
            tok.flags.is_unsigned = mathlib::has_unsigned_suffix(text);
            tok.flags.is_long = mathlib::has_long_suffix(text);
            list.push_back(tok);
            continue;
        }

        // String and character literals, with escape handling. An unclosed
        // literal runs to end of line, best effort.
        if c == '"' || c == '\'' {
            let quote = c;
            let start = pos;
            pos += 1;
            while pos < bytes.len() {
                let d = bytes[pos] as char;
                if d == '\\' && pos + 1 < bytes.len() {
                    pos += 2;
                    continue;
                }
                if d == quote || d == '\n' {
                    if d == quote {
                        pos += 1;
                    }
                    break;
                }
                pos += 1;
            }
            let kind = if quote == '"' {
                TokenKind::StringLit
            } else {
                TokenKind::CharLit
            };
            list.push_back(Token::new(&code[start..pos], kind, file_index, line));
            continue;
        }

        // Operators, maximal munch.
        let rest = &code[pos..];
        if let Some(op) = OPERATORS_3.iter().find(|op| rest.starts_with(**op)) {
            list.push_back(Token::new(*op, TokenKind::Operator, file_index, line));
            pos += op.len();
            continue;
        }
        if let Some(op) = OPERATORS_2.iter().find(|op| rest.starts_with(**op)) {
            list.push_back(Token::new(*op, TokenKind::Operator, file_index, line));
            pos += op.len();
            continue;
        }
        list.push_back(Token::new(
            &code[pos..pos + c.len_utf8()],
            TokenKind::Operator,
            file_index,
            line,
        ));
        pos += c.len_utf8();
    }

    list
}

fn find_or_add_file(list: &mut TokenList, name: &str) -> u32 {
    if let Some(i) = list.file_names.iter().position(|f| f == name) {
        i as u32
    } else {
        list.add_file(name)
    }
}
