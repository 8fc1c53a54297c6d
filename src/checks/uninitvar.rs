//! Uninitialized variables: a scalar local whose first use on some path
//! precedes any store.

use rustc_hash::FxHashSet;

use crate::errorlogger::{DedupLogger, ErrorLogger, ErrorMessage, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::executionpath::{ExecutionState, PathEngine};
use super::{functions, Check, CheckContext};

pub struct UninitVarCheck;

impl Check for UninitVarCheck {
    fn name(&self) -> &'static str {
        "UninitVar"
    }

    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        let engine = PathEngine::new(ctx.settings);
        let mut dedup = DedupLogger::new(logger);
        for function in functions(ctx.tokens) {
            if ctx.settings.terminated() {
                return;
            }
            engine.walk(
                ctx.tokens,
                function.body_open,
                UninitVarState::default(),
                &mut dedup,
            );
        }
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "uninitvar",
            "Uninitialized variable: x",
            "",
            0,
        ));
    }
}

/// Tracked facts: the set of declared-but-unwritten scalar locals, plus the
/// findings accumulated along this path (flushed at function exit).
#[derive(Debug, Clone, Default)]
struct UninitVarState {
    uninit: FxHashSet<u32>,
    errors: Vec<ErrorMessage>,
}

impl ExecutionState for UninitVarState {
    fn parse(&mut self, list: &TokenList, tok: TokenId) -> bool {
        let token = list.token(tok);
        if token.kind != TokenKind::Identifier || token.var_id == 0 {
            return true;
        }
        let var_id = token.var_id;

        if is_scalar_declaration(list, tok) {
            match list.next(tok).map(|n| list.text(n).to_string()).as_deref() {
                // `int x;` is declared but not stored.
                Some(";") => {
                    self.uninit.insert(var_id);
                }
                // `int x = ...;`, `int x(...)`, parameters: initialized.
                _ => {}
            }
            return true;
        }

        let next = list.next(tok).map(|n| list.text(n).to_string());
        let next = next.as_deref();

        // Plain assignment initializes without reading.
        if next == Some("=") {
            self.uninit.remove(&var_id);
            return true;
        }
        // Compound assignment reads first.
        if matches!(
            next,
            Some("+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=")
        ) {
            self.report_use(list, tok);
            self.uninit.remove(&var_id);
            return true;
        }
        // Address-of hands the variable to something that may initialize it.
        if is_address_of(list, tok) {
            self.uninit.remove(&var_id);
            return true;
        }

        self.report_use(list, tok);
        true
    }

    fn merge(&mut self, other: &Self) {
        // Uninitialized on some path is uninitialized.
        self.uninit.extend(other.uninit.iter().copied());
        for err in &other.errors {
            if !self.errors.contains(err) {
                self.errors.push(err.clone());
            }
        }
    }

    fn bail_out(&mut self, _list: &TokenList, logger: &mut dyn ErrorLogger) {
        for err in self.errors.drain(..) {
            logger.report_err(&err);
        }
    }

    fn dominated_by(&self, recorded: &Self) -> bool {
        self.uninit.is_subset(&recorded.uninit)
            && self.errors.iter().all(|e| recorded.errors.contains(e))
    }
}

impl UninitVarState {
    fn report_use(&mut self, list: &TokenList, tok: TokenId) {
        let var_id = list.token(tok).var_id;
        if !self.uninit.remove(&var_id) {
            return;
        }
        let loc = list.location(tok);
        self.errors.push(ErrorMessage::new(
            Severity::Error,
            "uninitvar",
            format!("Uninitialized variable: {}", list.text(tok)),
            vec![loc],
        ));
    }
}

/// The identifier is the name of a scalar (or pointer) declaration:
/// `int x ;`, `char * p ;`. Arrays are not tracked.
fn is_scalar_declaration(list: &TokenList, tok: TokenId) -> bool {
    if list.next(tok).is_some_and(|n| list.text(n) == "[") {
        return false;
    }
    let mut p = list.prev(tok);
    while let Some(prev) = p {
        match list.text(prev) {
            "*" | "&" | "const" => p = list.prev(prev),
            _ => break,
        }
    }
    let Some(type_tok) = p else { return false };
    let t = list.token(type_tok);
    t.flags.is_standard_type || t.kind == TokenKind::TypeName
}

/// `& x` where the `&` is unary (not a binary AND).
fn is_address_of(list: &TokenList, tok: TokenId) -> bool {
    let Some(amp) = list.prev(tok) else {
        return false;
    };
    if list.text(amp) != "&" {
        return false;
    }
    match list.prev(amp) {
        None => true,
        Some(before) => {
            let b = list.token(before);
            !(b.is_name() || b.is_number() || matches!(b.text.as_str(), ")" | "]"))
        }
    }
}
