//! Generic forward symbolic walker.
//!
//! A check supplies a state type; the engine feeds it every token along each
//! execution path through a function body. At a branching construct the
//! state is cloned, both arms are walked, and the results are merged at the
//! join. Loop bodies are re-walked until the incoming state is dominated by
//! the recorded loop-head state (no strictly new facts), with a small
//! iteration cap. A `return` fires `bail_out` and ends the path.
//!
//! The engine bounds total work per function; exceeding the bound abandons
//! the walk silently, per the "degrade to silence" rule for checkers.

use crate::errorlogger::ErrorLogger;
use crate::settings::Settings;
use crate::token::{TokenId, TokenList};

/// Per-check symbolic state, cloned at every branch.
pub trait ExecutionState: Clone {
    /// Process one token. Returning `false` prunes this path.
    fn parse(&mut self, list: &TokenList, tok: TokenId) -> bool;

    /// Join with the state of the other arm at a control-flow merge.
    fn merge(&mut self, other: &Self);

    /// Function exit (explicit `return` or falling off the end): fire any
    /// pending end-of-life checks and flush accumulated findings.
    fn bail_out(&mut self, list: &TokenList, logger: &mut dyn ErrorLogger);

    /// True when this state carries no facts beyond `recorded`; used for the
    /// back-edge termination test at loop heads.
    fn dominated_by(&self, recorded: &Self) -> bool;
}

/// Maximum loop-body re-walks before giving up on a fixpoint.
const MAX_LOOP_PASSES: usize = 4;

pub struct PathEngine<'a> {
    settings: &'a Settings,
}

impl<'a> PathEngine<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        PathEngine { settings }
    }

    /// Walk a function body (the `{` token) with the given initial state.
    pub fn walk<S: ExecutionState>(
        &self,
        list: &TokenList,
        body_open: TokenId,
        state: S,
        logger: &mut dyn ErrorLogger,
    ) {
        let Some(body_close) = list.link(body_open) else {
            return;
        };
        let mut budget = self.settings.max_path_states;
        let first = list.next(body_open);
        if let Some(mut end_state) =
            self.walk_range(list, first, body_close, state, logger, &mut budget)
        {
            end_state.bail_out(list, logger);
        }
    }

    /// Walk `[from, stop)`; returns the state at `stop`, or `None` when the
    /// path was pruned, ended in a `return`, or the budget ran out.
    fn walk_range<S: ExecutionState>(
        &self,
        list: &TokenList,
        from: Option<TokenId>,
        stop: TokenId,
        mut state: S,
        logger: &mut dyn ErrorLogger,
        budget: &mut usize,
    ) -> Option<S> {
        let mut cur = from;
        while let Some(id) = cur {
            if id == stop {
                return Some(state);
            }
            if *budget == 0 || self.settings.terminated() {
                return None;
            }
            *budget -= 1;

            match list.text(id) {
                "if" => {
                    let (next, merged) = self.walk_if(list, id, state, logger, budget)?;
                    state = merged;
                    cur = next;
                    continue;
                }
                "while" | "for" | "switch" => {
                    let (next, merged) = self.walk_loop(list, id, state, logger, budget)?;
                    state = merged;
                    cur = next;
                    continue;
                }
                "do" => {
                    let (next, merged) = self.walk_do(list, id, state, logger, budget)?;
                    state = merged;
                    cur = next;
                    continue;
                }
                "return" => {
                    // The return expression is still a read.
                    if !state.parse(list, id) {
                        return None;
                    }
                    let mut expr = list.next(id);
                    while let Some(e) = expr {
                        if e == stop || list.text(e) == ";" {
                            break;
                        }
                        if !state.parse(list, e) {
                            return None;
                        }
                        expr = list.next(e);
                    }
                    state.bail_out(list, logger);
                    return None;
                }
                _ => {
                    if !state.parse(list, id) {
                        return None;
                    }
                    cur = list.next(id);
                }
            }
        }
        Some(state)
    }

    /// `if (cond) then [else otherwise]`. Returns the token after the whole
    /// construct and the merged state.
    #[allow(clippy::type_complexity)]
    fn walk_if<S: ExecutionState>(
        &self,
        list: &TokenList,
        if_tok: TokenId,
        mut state: S,
        logger: &mut dyn ErrorLogger,
        budget: &mut usize,
    ) -> Option<(Option<TokenId>, S)> {
        let Some(cond_open) = list.next(if_tok).filter(|n| list.text(*n) == "(") else {
            // Malformed; step over the keyword.
            return Some((list.next(if_tok), state));
        };
        let Some(cond_close) = list.link(cond_open) else {
            return Some((list.next(if_tok), state));
        };
        // The condition is evaluated on every path.
        let mut cond = list.next(cond_open);
        while let Some(c) = cond {
            if c == cond_close {
                break;
            }
            if !state.parse(list, c) {
                return None;
            }
            cond = list.next(c);
        }

        let then_start = list.next(cond_close)?;
        let (then_first, then_stop, after_then) = statement_range(list, then_start)?;
        let then_state = self.walk_range(list, then_first, then_stop, state.clone(), logger, budget);

        // else arm, or fall-through.
        let (else_state, after) = match after_then {
            Some(else_tok) if list.text(else_tok) == "else" => {
                let else_start = list.next(else_tok)?;
                let (else_first, else_stop, after_else) = statement_range(list, else_start)?;
                let walked =
                    self.walk_range(list, else_first, else_stop, state.clone(), logger, budget);
                (walked, after_else)
            }
            other => (Some(state), other),
        };

        let merged = match (then_state, else_state) {
            (Some(mut a), Some(b)) => {
                a.merge(&b);
                a
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return None,
        };
        Some((after, merged))
    }

    /// `while (...) body`, `for (...) body`, `switch (...) body`: evaluate
    /// the header, then iterate the body to a bounded fixpoint. Zero
    /// iterations are always possible, so the pre-state flows on.
    #[allow(clippy::type_complexity)]
    fn walk_loop<S: ExecutionState>(
        &self,
        list: &TokenList,
        keyword: TokenId,
        mut state: S,
        logger: &mut dyn ErrorLogger,
        budget: &mut usize,
    ) -> Option<(Option<TokenId>, S)> {
        let Some(head_open) = list.next(keyword).filter(|n| list.text(*n) == "(") else {
            return Some((list.next(keyword), state));
        };
        let Some(head_close) = list.link(head_open) else {
            return Some((list.next(keyword), state));
        };
        // Header tokens: parse the keyword first so states can pattern-match
        // the whole construct from it, then the header contents.
        if !state.parse(list, keyword) {
            return None;
        }
        let mut cur = list.next(head_open);
        while let Some(c) = cur {
            if c == head_close {
                break;
            }
            if !state.parse(list, c) {
                return None;
            }
            cur = list.next(c);
        }

        let body_start = list.next(head_close)?;
        let (body_first, body_stop, after) = statement_range(list, body_start)?;
        for _ in 0..MAX_LOOP_PASSES {
            let walked =
                self.walk_range(list, body_first, body_stop, state.clone(), logger, budget);
            match walked {
                Some(out) => {
                    if out.dominated_by(&state) {
                        break;
                    }
                    state.merge(&out);
                }
                // Body path pruned; the zero-iteration state continues.
                None => break,
            }
        }
        Some((after, state))
    }

    /// `do body while (cond) ;`: the body runs at least once.
    #[allow(clippy::type_complexity)]
    fn walk_do<S: ExecutionState>(
        &self,
        list: &TokenList,
        do_tok: TokenId,
        mut state: S,
        logger: &mut dyn ErrorLogger,
        budget: &mut usize,
    ) -> Option<(Option<TokenId>, S)> {
        let body_start = list.next(do_tok)?;
        let (body_first, body_stop, after_body) = statement_range(list, body_start)?;
        match self.walk_range(list, body_first, body_stop, state.clone(), logger, budget) {
            Some(out) => {
                state.merge(&out);
            }
            None => return None,
        }
        // Step over `while ( ... ) ;`.
        let mut cur = after_body;
        if let Some(w) = cur.filter(|w| list.text(*w) == "while") {
            if let Some(open) = list.next(w).filter(|n| list.text(*n) == "(") {
                if let Some(close) = list.link(open) {
                    let mut c = list.next(open);
                    while let Some(t) = c {
                        if t == close {
                            break;
                        }
                        if !state.parse(list, t) {
                            return None;
                        }
                        c = list.next(t);
                    }
                    cur = list.next(close);
                    if let Some(semi) = cur.filter(|s| list.text(*s) == ";") {
                        cur = list.next(semi);
                    }
                }
            }
        }
        Some((cur, state))
    }
}

/// Extent of one statement starting at `start`: `(first inner token, stop
/// token, token after the statement)`. For a block the inner tokens exclude
/// the braces; for a simple statement the `;` is the stop.
fn statement_range(
    list: &TokenList,
    start: TokenId,
) -> Option<(Option<TokenId>, TokenId, Option<TokenId>)> {
    if list.text(start) == "{" {
        let close = list.link(start)?;
        return Some((list.next(start), close, list.next(close)));
    }
    // Simple statement: runs to the `;` at depth zero. Nested `if` inside a
    // branch arm without braces is walked as part of the range.
    let mut depth = 0usize;
    let mut cur = Some(start);
    while let Some(id) = cur {
        match list.text(id) {
            "(" | "[" => depth += 1,
            ")" | "]" => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            ";" if depth == 0 => {
                return Some((Some(start), id, list.next(id)));
            }
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
    use crate::checks::functions;
    use crate::errorlogger::CollectingLogger;
    use crate::simplifier::Simplifier;

    /// Toy state: records the textual trace of identifiers it saw, and
    /// whether bail_out fired.
    #[derive(Debug, Clone, Default)]
    struct TraceState {
        seen: Vec<String>,
        bailed: usize,
    }

    impl ExecutionState for TraceState {
        fn parse(&mut self, list: &TokenList, tok: TokenId) -> bool {
            let t = list.token(tok);
            if t.is_name() {
                self.seen.push(t.text.clone());
            }
            true
        }

        fn merge(&mut self, other: &Self) {
            for s in &other.seen {
                if !self.seen.contains(s) {
                    self.seen.push(s.clone());
                }
            }
        }

        fn bail_out(&mut self, _list: &TokenList, _logger: &mut dyn ErrorLogger) {
            self.bailed += 1;
        }

        fn dominated_by(&self, recorded: &Self) -> bool {
            self.seen.iter().all(|s| recorded.seen.contains(s))
        }
    }

    fn walk_code(code: &str) -> (Settings, CollectingLogger) {
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let simplifier = Simplifier::new(&settings);
        let list = simplifier.tokenize(code, "t.cpp", &mut logger).unwrap();
        let funcs = functions(&list);
        let engine = PathEngine::new(&settings);
        for f in funcs {
            engine.walk(&list, f.body_open, TraceState::default(), &mut logger);
        }
        (settings, logger)
    }

    #[test]
    fn walks_both_branch_arms() {
        // Just exercising the engine end to end; the toy state asserts via
        // not panicking, the real assertions live in the checker tests.
        walk_code("void f(int a) { if (a) { x(); } else { y(); } z(); }");
    }

    #[test]
    fn walks_loops_to_fixpoint() {
        walk_code("void f() { for (i = 0; i < 10; i++) { body(); } after(); }");
        walk_code("void f() { while (cond) { body(); } }");
        walk_code("void f() { do { body(); } while (cond); }");
    }

    #[test]
    fn survives_malformed_input() {
        walk_code("void f() { if (x) }");
        walk_code("void f() { if }");
        walk_code("void f() { return }");
    }

    #[test]
    fn branchless_if_without_braces() {
        walk_code("void f(int a) { if (a) x(); else y(); }");
    }
}
