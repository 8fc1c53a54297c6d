//! Auto-variable misuse: the address of a local escaping the function, either
//! stored through an out-parameter or returned directly.

use rustc_hash::FxHashSet;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::{functions, Check, CheckContext, Function};

pub struct AutoVariableCheck;

impl Check for AutoVariableCheck {
    fn name(&self) -> &'static str {
        "AutoVariables"
    }

    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        for function in functions(ctx.tokens) {
            if ctx.settings.terminated() {
                return;
            }
            check_function(ctx.tokens, &function, logger);
        }
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "autoVariables",
            "Assigning address of local auto-variable to a function parameter.",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "returnAddressOfAutoVariable",
            "Returning address of local auto-variable",
            "",
            0,
        ));
    }
}

fn check_function(list: &TokenList, function: &Function, logger: &mut dyn ErrorLogger) {
    let params: FxHashSet<u32> = function.param_ids(list).into_iter().collect();
    let body = function.body_ids(list);

    // Locals are everything declared inside the body.
    let mut locals: FxHashSet<u32> = FxHashSet::default();
    for &id in &body {
        let tok = list.token(id);
        if tok.kind == TokenKind::Identifier && tok.var_id != 0 && !params.contains(&tok.var_id) {
            locals.insert(tok.var_id);
        }
    }

    for &id in &body {
        // * param = & local ;
        if list.text(id) == "*" {
            let Some(param_tok) = list.next(id) else { continue };
            if !params.contains(&list.token(param_tok).var_id) {
                continue;
            }
            if starts_statement(list, id)
                && assigns_address_of_local(list, param_tok, &locals)
            {
                logger.report_err(&ErrorMessage::new(
                    Severity::Error,
                    "autoVariables",
                    "Assigning address of local auto-variable to a function parameter.",
                    vec![list.location(param_tok)],
                ));
            }
            continue;
        }
        // return & local ;
        if list.text(id) == "return" {
            let Some(amp) = list.next(id).filter(|n| list.text(*n) == "&") else {
                continue;
            };
            let Some(var_tok) = list.next(amp) else { continue };
            let var = list.token(var_tok);
            if var.var_id != 0
                && locals.contains(&var.var_id)
                && list.next(var_tok).is_some_and(|n| list.text(n) == ";")
            {
                logger.report_err(&ErrorMessage::new(
                    Severity::Error,
                    "returnAddressOfAutoVariable",
                    "Returning address of local auto-variable",
                    vec![list.location(var_tok)],
                ));
            }
        }
    }
}

/// The `*` begins a statement (so it is a dereference, not multiplication).
fn starts_statement(list: &TokenList, star: TokenId) -> bool {
    match list.prev(star) {
        None => true,
        Some(p) => matches!(list.text(p), ";" | "{" | "}" | ")"),
    }
}

/// `param = & local ;` following the dereferenced parameter.
fn assigns_address_of_local(list: &TokenList, param_tok: TokenId, locals: &FxHashSet<u32>) -> bool {
    let Some(eq) = list.next(param_tok).filter(|n| list.text(*n) == "=") else {
        return false;
    };
    let Some(amp) = list.next(eq).filter(|n| list.text(*n) == "&") else {
        return false;
    };
    let Some(var_tok) = list.next(amp) else {
        return false;
    };
    let var = list.token(var_tok);
    var.var_id != 0
        && locals.contains(&var.var_id)
        && list.next(var_tok).is_some_and(|n| list.text(n) == ";")
}

#[cfg(test)]
mod tests {
    use super::super::testutil::run_check;
    use super::*;

    #[test]
    fn address_of_local_through_out_parameter() {
        let logger = run_check(
            &AutoVariableCheck,
            "void f(int** out) { int local; *out = &local; }",
        );
        assert_eq!(logger.ids(), vec!["autoVariables"]);
    }

    #[test]
    fn returning_address_of_local() {
        let logger = run_check(
            &AutoVariableCheck,
            "int* f() { int local; local = 1; return &local; }",
        );
        assert_eq!(logger.ids(), vec!["returnAddressOfAutoVariable"]);
    }

    #[test]
    fn returning_address_of_parameter_is_not_reported() {
        // A parameter outlives the call frame from the caller's view only;
        // the classic checker keeps quiet here.
        let logger = run_check(&AutoVariableCheck, "int* f(int a) { return &a; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn storing_heap_address_is_clean() {
        let logger = run_check(
            &AutoVariableCheck,
            "void f(int** out) { *out = malloc(4); }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn returning_value_of_local_is_clean() {
        let logger = run_check(&AutoVariableCheck, "int f() { int local; local = 1; return local; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn multiplication_is_not_a_dereference() {
        let logger = run_check(
            &AutoVariableCheck,
            "void f(int p) { int local; int x; x = local * p; }",
        );
        assert!(logger.errors.is_empty());
    }
}
