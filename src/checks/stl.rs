//! STL usage checks: iterators used after `erase`/`clear`, iterators from
//! one container used against another, and `size()` comparisons that should
//! be `empty()`.

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::{functions, Check, CheckContext, Function};

pub struct StlCheck;

impl Check for StlCheck {
    fn name(&self) -> &'static str {
        "Stl"
    }

    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        let list = ctx.tokens;
        for function in functions(list) {
            if ctx.settings.terminated() {
                return;
            }
            check_erase(list, &function, logger);
        }
        check_mismatching_containers(list, logger);
        check_size_comparisons(list, logger);
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "eraseDereference",
            "Dereferenced iterator 'it' after erase",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "mismatchingContainers",
            "Iterators of different containers are used together.",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Style,
            "stlSize",
            "Use x.empty() instead of x.size() to guarantee fast code.",
            "",
            0,
        ));
    }
}

/// `c.erase(it)` followed by a use of `it` before it is reassigned.
fn check_erase(list: &TokenList, function: &Function, logger: &mut dyn ErrorLogger) {
    let body = function.body_ids(list);
    for (idx, &id) in body.iter().enumerate() {
        // %name% . erase ( %var% )
        if list.text(id) != "erase" {
            continue;
        }
        if !list.prev(id).is_some_and(|p| list.text(p) == ".") {
            continue;
        }
        let Some(open) = list.next(id).filter(|n| list.text(*n) == "(") else {
            continue;
        };
        let Some(arg) = list.next(open) else { continue };
        let iter_id = list.token(arg).var_id;
        let Some(close) = list.next(arg).filter(|n| list.text(*n) == ")") else {
            continue;
        };
        if iter_id == 0 {
            continue;
        }
        // `it = c.erase(it)` repositions the iterator; no hazard.
        let container = list.prev(list.prev(id).unwrap_or(id));
        if let Some(container_tok) = container {
            if let Some(eq) = list.prev(container_tok).filter(|p| list.text(*p) == "=") {
                if list.prev(eq).is_some_and(|lhs| list.token(lhs).var_id == iter_id) {
                    continue;
                }
            }
        }
        // Scan forward from after the call for a use before reassignment.
        let after_call = body[idx + 1..]
            .iter()
            .position(|&t| t == close)
            .map(|p| idx + 1 + p + 1)
            .unwrap_or(body.len());
        for &later in &body[after_call..] {
            let tok = list.token(later);
            if tok.var_id != iter_id {
                continue;
            }
            // `it = ...` ends the hazard; `++it`/`it++` also repositions it.
            if list.next(later).is_some_and(|n| matches!(list.text(n), "=" | "++" | "--")) {
                break;
            }
            if list.prev(later).is_some_and(|p| matches!(list.text(p), "++" | "--")) {
                break;
            }
            logger.report_err(&ErrorMessage::new(
                Severity::Error,
                "eraseDereference",
                format!("Dereferenced iterator '{}' after erase", tok.text),
                vec![list.location(later)],
            ));
            break;
        }
    }
}

/// `x.begin(), y.end()` handed to the same algorithm call.
fn check_mismatching_containers(list: &TokenList, logger: &mut dyn ErrorLogger) {
    for id in list.ids() {
        // %name% . begin ( ) , %name2% . end ( )
        let Some(first) = container_of_call(list, id, "begin") else {
            continue;
        };
        let Some(close) = list.at(id, 4) else { continue };
        let Some(comma) = list.next(close).filter(|n| list.text(*n) == ",") else {
            continue;
        };
        let Some(second_tok) = list.next(comma) else { continue };
        let Some(second) = container_of_call(list, second_tok, "end") else {
            continue;
        };
        if first != second {
            logger.report_err(&ErrorMessage::new(
                Severity::Error,
                "mismatchingContainers",
                "Iterators of different containers are used together.".to_string(),
                vec![list.location(id)],
            ));
        }
    }
}

/// For a token sequence `name . method ( )` starting at `name`, return the
/// container name when `method` matches.
fn container_of_call(list: &TokenList, id: TokenId, method: &str) -> Option<String> {
    let tok = list.token(id);
    if tok.kind != TokenKind::Identifier {
        return None;
    }
    let dot = list.next(id).filter(|n| list.text(*n) == ".")?;
    let m = list.next(dot).filter(|n| list.text(*n) == method)?;
    let open = list.next(m).filter(|n| list.text(*n) == "(")?;
    list.next(open).filter(|n| list.text(*n) == ")")?;
    Some(tok.text.clone())
}

/// `x.size() == 0`, `x.size() != 0`, `x.size() > 0`. `empty()` is O(1) on
/// every container, `size()` is not.
fn check_size_comparisons(list: &TokenList, logger: &mut dyn ErrorLogger) {
    for id in list.ids() {
        let Some(container) = container_of_call(list, id, "size") else {
            continue;
        };
        // id . size ( ) <cmp> 0
        let Some(close) = list.at(id, 4) else { continue };
        let Some(cmp) = list.next(close) else { continue };
        if !matches!(list.text(cmp), "==" | "!=" | ">") {
            continue;
        }
        let Some(zero) = list.next(cmp) else { continue };
        if list.text(zero) != "0" {
            continue;
        }
        logger.report_err(&ErrorMessage::new(
            Severity::Style,
            "stlSize",
            format!("Use {container}.empty() instead of {container}.size() to guarantee fast code."),
            vec![list.location(id)],
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::run_check;
    use super::*;

    #[test]
    fn iterator_used_after_erase() {
        let logger = run_check(
            &StlCheck,
            "void f(List l) { Iter it; it = l.find(5); l.erase(it); use(*it); }",
        );
        assert_eq!(logger.ids(), vec!["eraseDereference"]);
    }

    #[test]
    fn iterator_reassigned_after_erase_is_clean() {
        let logger = run_check(
            &StlCheck,
            "void f(List l) { Iter it; it = l.find(5); it = l.erase(it); use(*it); }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn mismatching_containers_in_algorithm_call() {
        let logger = run_check(
            &StlCheck,
            "void f(Vec a, Vec b) { sort(a.begin(), b.end()); }",
        );
        assert_eq!(logger.ids(), vec!["mismatchingContainers"]);
    }

    #[test]
    fn matching_containers_are_clean() {
        let logger = run_check(
            &StlCheck,
            "void f(Vec a) { sort(a.begin(), a.end()); }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn size_equals_zero_should_be_empty() {
        let logger = run_check(&StlCheck, "void f(Vec v) { if (v.size() == 0) { g(); } }");
        assert_eq!(logger.ids(), vec!["stlSize"]);
        assert!(logger.errors[0].msg.contains("v.empty()"));
    }

    #[test]
    fn size_greater_than_zero_should_be_empty() {
        let logger = run_check(&StlCheck, "void f(Vec v) { while (v.size() > 0) { pop(v); } }");
        assert_eq!(logger.ids(), vec!["stlSize"]);
    }

    #[test]
    fn size_compared_to_nonzero_is_clean() {
        let logger = run_check(&StlCheck, "void f(Vec v) { if (v.size() == 10) { g(); } }");
        assert!(logger.errors.is_empty());
    }
}
