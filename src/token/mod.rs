//! The token stream every later stage works on.
//!
//! Tokens live in an index-based arena: the list is a contiguous vector of
//! slots, the doubly-linked order and the bracket links are 32-bit slot
//! indices, and a free list recycles deleted slots. Cursors (`TokenId`) stay
//! valid across unrelated insertions and deletions, which the simplifier
//! relies on while it rewrites the stream in place.
//!
//! Lifecycle: built by the lexer, mutated only by the simplifier, then
//! read-only for the checkers.

pub mod pattern;

pub use pattern::Pattern;

use crate::errorlogger::FileLocation;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Classification of a token, assigned by the lexer and refined by the
/// simplifier (identifiers promoted to `TypeName` after typedef resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLit,
    CharLit,
    Operator,
    /// A built-in or resolved type name.
    TypeName,
    Keyword,
}

/// Boolean annotations carried by a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenFlags {
    pub is_unsigned: bool,
    pub is_long: bool,
    /// Built-in type (`int`, `char`, ...), set by the lexer.
    pub is_standard_type: bool,
}

/// The atomic unit of the stream.
#[derive(Debug, Clone)]
pub struct Token {
    /// Lexeme, often a small canonical form (`"123"`, `"x"`).
    pub text: String,
    pub kind: TokenKind,
    /// Index into [`TokenList::file_names`].
    pub file_index: u32,
    /// 1-based source line.
    pub line: u32,
    /// Paired bracket, when linked.
    pub link: Option<TokenId>,
    /// Dense variable id assigned during scope resolution; 0 = none.
    pub var_id: u32,
    pub flags: TokenFlags,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, file_index: u32, line: u32) -> Self {
        Token {
            text: text.into(),
            kind,
            file_index,
            line,
            link: None,
            var_id: 0,
            flags: TokenFlags::default(),
        }
    }

    /// Identifier or keyword-like word (starts with a letter or underscore).
    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::TypeName | TokenKind::Keyword
        )
    }

    pub fn is_number(&self) -> bool {
        self.kind == TokenKind::Number
    }

    pub fn is_op(&self) -> bool {
        self.kind == TokenKind::Operator
    }
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Stable handle to a token slot. Valid until that exact token is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// TokenList
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Slot {
    token: Token,
    prev: Option<TokenId>,
    next: Option<TokenId>,
    in_use: bool,
}

/// Doubly-linked token sequence backed by an arena.
///
/// All structural operations are O(1). Deleting a linked bracket clears the
/// partner's link so that a link, when present, always points at a live
/// matching bracket.
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<TokenId>,
    tail: Option<TokenId>,
    len: usize,
    /// File-id to path mapping for provenance; index 0 is the main file.
    pub file_names: Vec<String>,
}

impl TokenList {
    pub fn new() -> Self {
        TokenList::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<TokenId> {
        self.head
    }

    pub fn back(&self) -> Option<TokenId> {
        self.tail
    }

    /// Register a file path, returning its file index.
    pub fn add_file(&mut self, path: impl Into<String>) -> u32 {
        self.file_names.push(path.into());
        (self.file_names.len() - 1) as u32
    }

    pub fn file_name(&self, index: u32) -> &str {
        self.file_names
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    // -- accessors ----------------------------------------------------------

    pub fn token(&self, id: TokenId) -> &Token {
        &self.slots[id.index()].token
    }

    pub fn token_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.slots[id.index()].token
    }

    pub fn text(&self, id: TokenId) -> &str {
        &self.token(id).text
    }

    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.slots[id.index()].next
    }

    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self.slots[id.index()].prev
    }

    /// Cursor `n` tokens forward, `None` when the list ends first.
    pub fn at(&self, id: TokenId, n: usize) -> Option<TokenId> {
        let mut cur = id;
        for _ in 0..n {
            cur = self.next(cur)?;
        }
        Some(cur)
    }

    /// Cursor `n` tokens backward.
    pub fn at_back(&self, id: TokenId, n: usize) -> Option<TokenId> {
        let mut cur = id;
        for _ in 0..n {
            cur = self.prev(cur)?;
        }
        Some(cur)
    }

    /// The paired bracket, when this token is linked.
    pub fn link(&self, id: TokenId) -> Option<TokenId> {
        self.token(id).link
    }

    /// Annotate `open` and `close` as a matched pair.
    pub fn set_link(&mut self, open: TokenId, close: TokenId) {
        self.token_mut(open).link = Some(close);
        self.token_mut(close).link = Some(open);
    }

    /// Source location of a token, resolved through the file table.
    pub fn location(&self, id: TokenId) -> FileLocation {
        let tok = self.token(id);
        FileLocation::new(self.file_name(tok.file_index), tok.line)
    }

    // -- structural mutation ------------------------------------------------

    fn alloc(&mut self, token: Token) -> TokenId {
        if let Some(raw) = self.free.pop() {
            let slot = &mut self.slots[raw as usize];
            slot.token = token;
            slot.prev = None;
            slot.next = None;
            slot.in_use = true;
            TokenId(raw)
        } else {
            self.slots.push(Slot {
                token,
                prev: None,
                next: None,
                in_use: true,
            });
            TokenId((self.slots.len() - 1) as u32)
        }
    }

    pub fn push_back(&mut self, token: Token) -> TokenId {
        let id = self.alloc(token);
        match self.tail {
            Some(tail) => {
                self.slots[tail.index()].next = Some(id);
                self.slots[id.index()].prev = Some(tail);
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    pub fn insert_after(&mut self, at: TokenId, token: Token) -> TokenId {
        let id = self.alloc(token);
        let old_next = self.slots[at.index()].next;
        self.slots[at.index()].next = Some(id);
        self.slots[id.index()].prev = Some(at);
        self.slots[id.index()].next = old_next;
        match old_next {
            Some(n) => self.slots[n.index()].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
        id
    }

    pub fn insert_before(&mut self, at: TokenId, token: Token) -> TokenId {
        let id = self.alloc(token);
        let old_prev = self.slots[at.index()].prev;
        self.slots[at.index()].prev = Some(id);
        self.slots[id.index()].next = Some(at);
        self.slots[id.index()].prev = old_prev;
        match old_prev {
            Some(p) => self.slots[p.index()].next = Some(id),
            None => self.head = Some(id),
        }
        self.len += 1;
        id
    }

    /// Delete one token. If it is half of a linked pair, the partner's link
    /// is cleared so no dangling link survives.
    pub fn delete(&mut self, id: TokenId) {
        if let Some(partner) = self.token(id).link {
            if self.slots[partner.index()].in_use {
                self.token_mut(partner).link = None;
            }
        }
        let (prev, next) = {
            let slot = &self.slots[id.index()];
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p.index()].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n.index()].prev = prev,
            None => self.tail = prev,
        }
        let slot = &mut self.slots[id.index()];
        slot.in_use = false;
        slot.prev = None;
        slot.next = None;
        slot.token.link = None;
        self.free.push(id.0);
        self.len -= 1;
    }

    /// Delete the inclusive range `[first, last]`. The range must be
    /// well-ordered (last reachable from first); otherwise deletion stops at
    /// the end of the list.
    pub fn delete_range(&mut self, first: TokenId, last: TokenId) {
        let mut cur = Some(first);
        while let Some(id) = cur {
            let next = self.next(id);
            self.delete(id);
            if id == last {
                break;
            }
            cur = next;
        }
    }

    /// Delete the tokens between `first` and `last`, keeping both ends.
    pub fn delete_between(&mut self, first: TokenId, last: TokenId) {
        while let Some(id) = self.next(first) {
            if id == last {
                break;
            }
            self.delete(id);
        }
    }

    // -- iteration ----------------------------------------------------------

    /// Iterate token ids in sequence order. Snapshots the chain first, so the
    /// caller may mutate the list while walking (deleted ids are skipped).
    pub fn ids(&self) -> Vec<TokenId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while let Some(id) = cur {
            out.push(id);
            cur = self.next(id);
        }
        out
    }

    /// True when `id` still refers to a live token.
    pub fn is_live(&self, id: TokenId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.in_use)
    }

    /// Render the stream as space-separated lexemes. Debug/test aid.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        let mut cur = self.head;
        while let Some(id) = cur {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(self.text(id));
            cur = self.next(id);
        }
        out
    }

    // -- text helpers used throughout the simplifier and checkers -----------

    pub fn str_eq(&self, id: TokenId, s: &str) -> bool {
        self.text(id) == s
    }

    /// `self.next(id)` has exactly this text.
    pub fn next_is(&self, id: TokenId, s: &str) -> bool {
        self.next(id).is_some_and(|n| self.str_eq(n, s))
    }

    pub fn prev_is(&self, id: TokenId, s: &str) -> bool {
        self.prev(id).is_some_and(|p| self.str_eq(p, s))
    }

    /// Match a compiled pattern at `id`; returns the number of tokens
    /// consumed, or 0 on mismatch.
    pub fn match_pattern(&self, id: TokenId, pattern: &Pattern) -> usize {
        pattern.match_at(self, id)
    }

    /// Convenience: compile-and-match for cold call sites and tests. Hot
    /// paths keep a `Lazy<Pattern>` instead.
    pub fn matches(&self, id: TokenId, pattern_src: &str) -> bool {
        Pattern::compile(pattern_src).match_at(self, id) > 0
    }
}
