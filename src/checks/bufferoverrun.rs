//! Buffer overruns on constant-size arrays.
//!
//! Constant indices outside `[0, N)` are caught with a direct pattern walk.
//! Loop-bound overruns need flow sensitivity: the execution-path engine
//! carries the induction variable's range from the `for` header to the
//! subscript expressions in the body.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errorlogger::{DedupLogger, ErrorLogger, ErrorMessage, Severity};
use crate::mathlib;
use crate::token::{TokenId, TokenKind, TokenList};

use super::executionpath::{ExecutionState, PathEngine};
use super::{functions, Check, CheckContext};

pub struct BufferOverrunCheck;

impl Check for BufferOverrunCheck {
    fn name(&self) -> &'static str {
        "BufferOverrun"
    }

    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        let list = ctx.tokens;
        let arrays = collect_arrays(list);
        if arrays.is_empty() {
            return;
        }

        check_constant_indices(list, &arrays, logger);

        // Loop-bound overruns.
        let engine = PathEngine::new(ctx.settings);
        let mut dedup = DedupLogger::new(logger);
        for function in functions(list) {
            if ctx.settings.terminated() {
                return;
            }
            let state = OverrunState {
                sizes: arrays.sizes.clone(),
                names: arrays.names.clone(),
                ranges: FxHashMap::default(),
                ignore_next_write: None,
                errors: Vec::new(),
            };
            engine.walk(list, function.body_open, state, &mut dedup);
        }
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "arrayIndexOutOfBounds",
            "Array 'a[10]' index 10 out of bounds",
            "",
            0,
        ));
    }
}

#[derive(Debug, Clone, Default)]
struct Arrays {
    /// var id -> element count
    sizes: FxHashMap<u32, i64>,
    /// var id -> declared name (for messages)
    names: FxHashMap<u32, String>,
    /// The declaration name tokens, which are not accesses.
    decl_tokens: FxHashSet<TokenId>,
}

impl Arrays {
    fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Find `type name [ N ] ;` declarations with a constant size.
fn collect_arrays(list: &TokenList) -> Arrays {
    let mut arrays = Arrays::default();
    for id in list.ids() {
        let tok = list.token(id);
        if tok.kind != TokenKind::Identifier || tok.var_id == 0 {
            continue;
        }
        let Some(open) = list.next(id).filter(|n| list.text(*n) == "[") else {
            continue;
        };
        let Some(size_tok) = list.next(open) else { continue };
        let Some(close) = list.next(size_tok).filter(|n| list.text(*n) == "]") else {
            continue;
        };
        // Declaration: preceded by a type, terminated by `;` or `=`.
        if !list
            .next(close)
            .is_some_and(|n| matches!(list.text(n), ";" | "="))
        {
            continue;
        }
        let is_decl = list.prev(id).is_some_and(|p| {
            let pt = list.token(p);
            pt.flags.is_standard_type || pt.kind == TokenKind::TypeName
        });
        if !is_decl {
            continue;
        }
        let Some(size) = mathlib::parse_int(list.text(size_tok)) else {
            continue;
        };
        if size <= 0 {
            continue;
        }
        arrays.sizes.insert(tok.var_id, size);
        arrays.names.insert(tok.var_id, tok.text.clone());
        arrays.decl_tokens.insert(id);
    }
    arrays
}

/// `a [ 12 ]` with a constant index outside the declared bounds.
fn check_constant_indices(list: &TokenList, arrays: &Arrays, logger: &mut dyn ErrorLogger) {
    for id in list.ids() {
        let tok = list.token(id);
        if tok.kind != TokenKind::Identifier || tok.var_id == 0 {
            continue;
        }
        if arrays.decl_tokens.contains(&id) {
            continue;
        }
        let Some(&size) = arrays.sizes.get(&tok.var_id) else {
            continue;
        };
        let Some(open) = list.next(id).filter(|n| list.text(*n) == "[") else {
            continue;
        };
        let Some(index_tok) = list.next(open) else { continue };
        if !list.next(index_tok).is_some_and(|n| list.text(n) == "]") {
            continue;
        }
        let Some(index) = mathlib::parse_int(list.text(index_tok)) else {
            continue;
        };
        if index >= size || index < 0 {
            logger.report_err(&ErrorMessage::new(
                Severity::Error,
                "arrayIndexOutOfBounds",
                format!(
                    "Array '{}[{}]' index {} out of bounds",
                    list.text(id),
                    size,
                    index
                ),
                vec![list.location(id)],
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Loop-bound analysis
// ---------------------------------------------------------------------------

/// Per-path facts: the inclusive maximum each induction variable can reach.
#[derive(Debug, Clone)]
struct OverrunState {
    sizes: FxHashMap<u32, i64>,
    names: FxHashMap<u32, String>,
    /// var id -> inclusive maximum value along this path.
    ranges: FxHashMap<u32, i64>,
    /// The `i = 0` inside a just-matched `for` header must not clear the
    /// range the header itself established.
    ignore_next_write: Option<u32>,
    errors: Vec<ErrorMessage>,
}

impl ExecutionState for OverrunState {
    fn parse(&mut self, list: &TokenList, tok: TokenId) -> bool {
        if list.text(tok) == "for" {
            if let Some((var, max)) = parse_for_header(list, tok) {
                self.ranges.insert(var, max);
                self.ignore_next_write = Some(var);
            }
            return true;
        }

        let token = list.token(tok);
        if token.kind != TokenKind::Identifier || token.var_id == 0 {
            return true;
        }
        let var_id = token.var_id;

        // A write invalidates a previously established range.
        if list.next(tok).is_some_and(|n| list.text(n) == "=") {
            if self.ignore_next_write == Some(var_id) {
                self.ignore_next_write = None;
            } else {
                self.ranges.remove(&var_id);
            }
            return true;
        }

        // arr [ i ]
        if let Some(&size) = self.sizes.get(&var_id) {
            if let Some(open) = list.next(tok).filter(|n| list.text(*n) == "[") {
                if let Some(index_tok) = list.next(open) {
                    let index = list.token(index_tok);
                    if index.var_id != 0 {
                        if let Some(&max) = self.ranges.get(&index.var_id) {
                            if max >= size {
                                let name = self
                                    .names
                                    .get(&var_id)
                                    .cloned()
                                    .unwrap_or_else(|| list.text(tok).to_string());
                                self.errors.push(ErrorMessage::new(
                                    Severity::Error,
                                    "arrayIndexOutOfBounds",
                                    format!("Array '{name}[{size}]' index {max} out of bounds"),
                                    vec![list.location(tok)],
                                ));
                            }
                        }
                    }
                }
            }
        }
        true
    }

    fn merge(&mut self, other: &Self) {
        // Keep the larger bound; a variable only ranged on one path keeps
        // that range (it may still overrun there).
        for (&var, &max) in &other.ranges {
            let entry = self.ranges.entry(var).or_insert(max);
            *entry = (*entry).max(max);
        }
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
        self.ranges
            .iter()
            .all(|(v, max)| recorded.ranges.get(v).is_some_and(|r| r >= max))
            && self.errors.iter().all(|e| recorded.errors.contains(e))
    }
}

/// Match `for ( [type] i = <num> ; i <|<= <num> ; i ++ )`, returning the
/// induction variable and its inclusive maximum.
fn parse_for_header(list: &TokenList, for_tok: TokenId) -> Option<(u32, i64)> {
    let open = list.next(for_tok).filter(|n| list.text(*n) == "(")?;
    let mut cur = list.next(open)?;
    // Optional declaration type.
    while {
        let t = list.token(cur);
        t.flags.is_standard_type || t.kind == TokenKind::TypeName
    } {
        cur = list.next(cur)?;
    }
    let var_tok = cur;
    let var_id = list.token(var_tok).var_id;
    if var_id == 0 {
        return None;
    }
    let eq = list.next(var_tok).filter(|n| list.text(*n) == "=")?;
    let init = list.next(eq)?;
    let init_val = mathlib::parse_int(list.text(init))?;
    let semi1 = list.next(init).filter(|n| list.text(*n) == ";")?;
    let cond_var = list.next(semi1)?;
    if list.token(cond_var).var_id != var_id {
        return None;
    }
    let cmp = list.next(cond_var)?;
    let bound_tok = list.next(cmp)?;
    let bound = mathlib::parse_int(list.text(bound_tok))?;
    let max = match list.text(cmp) {
        "<" => bound - 1,
        "<=" => bound,
        _ => return None,
    };
    let semi2 = list.next(bound_tok).filter(|n| list.text(*n) == ";")?;
    let step_var = list.next(semi2)?;
    if list.token(step_var).var_id != var_id {
        return None;
    }
    if !list.next(step_var).is_some_and(|n| list.text(n) == "++") {
        return None;
    }
    if max < init_val {
        return None;
    }
    Some((var_id, max))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::run_check;
    use super::*;

    #[test]
    fn constant_index_at_size_is_out_of_bounds() {
        let logger = run_check(&BufferOverrunCheck, "void f() { int a[10]; a[10] = 0; }");
        assert_eq!(logger.ids(), vec!["arrayIndexOutOfBounds"]);
        assert_eq!(logger.errors[0].msg, "Array 'a[10]' index 10 out of bounds");
    }

    #[test]
    fn last_valid_index_is_clean() {
        let logger = run_check(&BufferOverrunCheck, "void f() { int a[10]; a[9] = 0; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn negative_index_is_out_of_bounds() {
        let logger = run_check(&BufferOverrunCheck, "void f() { int a[10]; a[-1] = 0; }");
        assert_eq!(logger.ids(), vec!["arrayIndexOutOfBounds"]);
    }

    #[test]
    fn folded_constant_size_is_used() {
        // 2 * 5 folds to 10 before the check runs.
        let logger = run_check(&BufferOverrunCheck, "void f() { int a[2 * 5]; a[10] = 0; }");
        assert_eq!(logger.ids(), vec!["arrayIndexOutOfBounds"]);
    }

    #[test]
    fn loop_overruns_with_less_equal_bound() {
        let logger = run_check(
            &BufferOverrunCheck,
            "void f() { int a[10]; for (int i = 0; i <= 10; i++) { a[i] = 0; } }",
        );
        assert_eq!(logger.ids(), vec!["arrayIndexOutOfBounds"]);
        assert_eq!(logger.errors[0].msg, "Array 'a[10]' index 10 out of bounds");
    }

    #[test]
    fn loop_within_bounds_is_clean() {
        let logger = run_check(
            &BufferOverrunCheck,
            "void f() { int a[10]; for (int i = 0; i < 10; i++) { a[i] = 0; } }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn loop_with_oversized_bound_overruns() {
        let logger = run_check(
            &BufferOverrunCheck,
            "void f() { int a[10]; for (int i = 0; i < 20; i++) { a[i] = 0; } }",
        );
        assert_eq!(logger.ids(), vec!["arrayIndexOutOfBounds"]);
    }

    #[test]
    fn range_is_cleared_by_reassignment() {
        let logger = run_check(
            &BufferOverrunCheck,
            "void f() { int a[10]; int j; for (int i = 0; i <= 10; i++) { j = i; } j = 0; a[j] = 1; }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn unknown_size_arrays_are_ignored() {
        let logger = run_check(&BufferOverrunCheck, "void f(int n) { int a[n]; a[10] = 0; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn other_variables_are_not_confused() {
        let logger = run_check(
            &BufferOverrunCheck,
            "void f() { int a[10]; int b[20]; b[15] = 0; }",
        );
        assert!(logger.errors.is_empty());
    }
}
