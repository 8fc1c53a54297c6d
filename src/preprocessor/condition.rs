//! `#if` / `#elif` integer constant-expression evaluation.
//!
//! `defined(X)` is resolved first, then macros are expanded, then any
//! identifier still standing evaluates to 0, and the result is parsed with a
//! conventional recursive-descent grammar over `i64`. A malformed expression
//! evaluates to `None`; the caller treats that branch as not taken and logs
//! a debug diagnostic.

use super::macros::MacroMap;
use crate::mathlib;

/// Evaluate a directive condition. `None` when the expression is malformed.
pub fn eval(condition: &str, macros: &MacroMap) -> Option<i64> {
    let resolved = resolve_defined(condition, macros);
    let expanded = macros.expand_line(&resolved);
    let tokens = lex(&expanded)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.ternary()?;
    if parser.pos != parser.tokens.len() {
        return None;
    }
    Some(value)
}

/// Replace `defined(NAME)` and `defined NAME` with `1`/`0` before macro
/// expansion, per the usual preprocessor evaluation order.
fn resolve_defined(condition: &str, macros: &MacroMap) -> String {
    let bytes = condition.as_bytes();
    let mut out = String::with_capacity(condition.len());
    let mut pos = 0usize;
    while pos < bytes.len() {
        let Some(c) = condition[pos..].chars().next() else {
            break;
        };
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < bytes.len()
                && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
            {
                pos += 1;
            }
            let word = &condition[start..pos];
            if word == "defined" {
                let mut i = pos;
                while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                    i += 1;
                }
                let parenthesized = i < bytes.len() && bytes[i] == b'(';
                if parenthesized {
                    i += 1;
                    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                        i += 1;
                    }
                }
                let name_start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                let name = &condition[name_start..i];
                if parenthesized {
                    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                        i += 1;
                    }
                    if i < bytes.len() && bytes[i] == b')' {
                        i += 1;
                    }
                }
                out.push_str(if macros.is_defined(name) { "1" } else { "0" });
                pos = i;
            } else {
                out.push_str(word);
            }
            continue;
        }
        out.push(c);
        pos += c.len_utf8();
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum CTok {
    Num(i64),
    Op(String),
}

fn lex(expr: &str) -> Option<Vec<CTok>> {
    let bytes = expr.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c == ' ' || c == '\t' {
            pos += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len()
                && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'.')
            {
                pos += 1;
            }
            out.push(CTok::Num(mathlib::parse_int(&expr[start..pos])?));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            // An identifier that survived expansion is an undefined macro.
            while pos < bytes.len()
                && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
            {
                pos += 1;
            }
            out.push(CTok::Num(0));
            continue;
        }
        if c == '\'' {
            // Simple character constants: 'a' and the common escapes.
            let end = expr[pos + 1..].find('\'').map(|n| pos + 1 + n)?;
            let inner = &expr[pos + 1..end];
            let value = match inner {
                "\\n" => 10,
                "\\t" => 9,
                "\\r" => 13,
                "\\0" => 0,
                "\\\\" => 92,
                "\\'" => 39,
                _ => i64::from(inner.chars().next()? as u32),
            };
            out.push(CTok::Num(value));
            pos = end + 1;
            continue;
        }
        let rest = &expr[pos..];
        let op = ["<<", ">>", "<=", ">=", "==", "!=", "&&", "||"]
            .iter()
            .find(|op| rest.starts_with(**op));
        match op {
            Some(op) => {
                out.push(CTok::Op((*op).to_string()));
                pos += op.len();
            }
            None => {
                if "+-*/%<>&|^!~()?:".contains(c) {
                    out.push(CTok::Op(c.to_string()));
                    pos += 1;
                } else {
                    return None;
                }
            }
        }
    }
    Some(out)
}

struct Parser {
    tokens: Vec<CTok>,
    pos: usize,
}

impl Parser {
    fn peek_op(&self) -> Option<&str> {
        match self.tokens.get(self.pos) {
            Some(CTok::Op(op)) => Some(op.as_str()),
            _ => None,
        }
    }

    fn eat(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ternary(&mut self) -> Option<i64> {
        let cond = self.logical_or()?;
        if self.eat("?") {
            let then = self.ternary()?;
            if !self.eat(":") {
                return None;
            }
            let otherwise = self.ternary()?;
            return Some(if cond != 0 { then } else { otherwise });
        }
        Some(cond)
    }

    fn logical_or(&mut self) -> Option<i64> {
        let mut lhs = self.logical_and()?;
        while self.eat("||") {
            let rhs = self.logical_and()?;
            lhs = i64::from(lhs != 0 || rhs != 0);
        }
        Some(lhs)
    }

    fn logical_and(&mut self) -> Option<i64> {
        let mut lhs = self.bit_or()?;
        while self.eat("&&") {
            let rhs = self.bit_or()?;
            lhs = i64::from(lhs != 0 && rhs != 0);
        }
        Some(lhs)
    }

    fn bit_or(&mut self) -> Option<i64> {
        let mut lhs = self.bit_xor()?;
        while self.eat("|") {
            lhs |= self.bit_xor()?;
        }
        Some(lhs)
    }

    fn bit_xor(&mut self) -> Option<i64> {
        let mut lhs = self.bit_and()?;
        while self.eat("^") {
            lhs ^= self.bit_and()?;
        }
        Some(lhs)
    }

    fn bit_and(&mut self) -> Option<i64> {
        let mut lhs = self.equality()?;
        while self.eat("&") {
            lhs &= self.equality()?;
        }
        Some(lhs)
    }

    fn equality(&mut self) -> Option<i64> {
        let mut lhs = self.relational()?;
        loop {
            if self.eat("==") {
                lhs = i64::from(lhs == self.relational()?);
            } else if self.eat("!=") {
                lhs = i64::from(lhs != self.relational()?);
            } else {
                return Some(lhs);
            }
        }
    }

    fn relational(&mut self) -> Option<i64> {
        let mut lhs = self.shift()?;
        loop {
            if self.eat("<=") {
                lhs = i64::from(lhs <= self.shift()?);
            } else if self.eat(">=") {
                lhs = i64::from(lhs >= self.shift()?);
            } else if self.eat("<") {
                lhs = i64::from(lhs < self.shift()?);
            } else if self.eat(">") {
                lhs = i64::from(lhs > self.shift()?);
            } else {
                return Some(lhs);
            }
        }
    }

    fn shift(&mut self) -> Option<i64> {
        let mut lhs = self.additive()?;
        loop {
            if self.eat("<<") {
                lhs = mathlib::calculate_int(lhs, self.additive()?, "<<")?;
            } else if self.eat(">>") {
                lhs = mathlib::calculate_int(lhs, self.additive()?, ">>")?;
            } else {
                return Some(lhs);
            }
        }
    }

    fn additive(&mut self) -> Option<i64> {
        let mut lhs = self.multiplicative()?;
        loop {
            if self.eat("+") {
                lhs = lhs.wrapping_add(self.multiplicative()?);
            } else if self.eat("-") {
                lhs = lhs.wrapping_sub(self.multiplicative()?);
            } else {
                return Some(lhs);
            }
        }
    }

    fn multiplicative(&mut self) -> Option<i64> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat("*") {
                lhs = lhs.wrapping_mul(self.unary()?);
            } else if self.eat("/") {
                let rhs = self.unary()?;
                if rhs == 0 {
                    return None;
                }
                lhs = lhs.wrapping_div(rhs);
            } else if self.eat("%") {
                let rhs = self.unary()?;
                if rhs == 0 {
                    return None;
                }
                lhs = lhs.wrapping_rem(rhs);
            } else {
                return Some(lhs);
            }
        }
    }

    fn unary(&mut self) -> Option<i64> {
        if self.eat("!") {
            return Some(i64::from(self.unary()? == 0));
        }
        if self.eat("~") {
            return Some(!self.unary()?);
        }
        if self.eat("-") {
            return Some(self.unary()?.wrapping_neg());
        }
        if self.eat("+") {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<i64> {
        if self.eat("(") {
            let v = self.ternary()?;
            if !self.eat(")") {
                return None;
            }
            return Some(v);
        }
        match self.tokens.get(self.pos) {
            Some(CTok::Num(n)) => {
                let n = *n;
                self.pos += 1;
                Some(n)
            }
            _ => None,
        }
    }
}
