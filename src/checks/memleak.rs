//! Memory and resource leaks.
//!
//! An allocation bound to a variable leaks when no path from the allocation
//! to the end of the function passes ownership on: returning it, storing it
//! through something non-local, passing it to a function, or freeing it.
//! Scalar/array `new`/`delete` mismatches are a separate diagnostic.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::{functions, Check, CheckContext, Function};

/// C allocation primitives returning heap memory.
static MALLOC_FUNCTIONS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["malloc", "calloc", "realloc", "strdup", "strndup"]
        .into_iter()
        .collect()
});

/// Resource-handle allocators paired with their own closers.
static FILE_FUNCTIONS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| ["fopen", "tmpfile", "opendir", "popen"].into_iter().collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllocKind {
    Malloc,
    New,
    NewArray,
    File,
}

impl AllocKind {
    fn matches_dealloc(self, dealloc: DeallocKind) -> bool {
        matches!(
            (self, dealloc),
            (AllocKind::Malloc, DeallocKind::Free)
                | (AllocKind::New, DeallocKind::Delete)
                | (AllocKind::NewArray, DeallocKind::DeleteArray)
                | (AllocKind::File, DeallocKind::Close)
        )
    }

    fn leak_id(self) -> &'static str {
        match self {
            AllocKind::File => "resourceLeak",
            _ => "memleak",
        }
    }

    fn leak_message(self, name: &str) -> String {
        match self {
            AllocKind::File => format!("Resource leak: {name}"),
            _ => format!("Memory leak: {name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeallocKind {
    Free,
    Delete,
    DeleteArray,
    Close,
}

pub struct MemLeakCheck;

impl Check for MemLeakCheck {
    fn name(&self) -> &'static str {
        "MemLeak"
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
            "memleak",
            "Memory leak: p",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "resourceLeak",
            "Resource leak: f",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "mismatchAllocDealloc",
            "Mismatching allocation and deallocation: p",
            "",
            0,
        ));
    }
}

fn check_function(list: &TokenList, function: &Function, logger: &mut dyn ErrorLogger) {
    let body = function.body_ids(list);

    // Find allocations bound to a variable.
    for (idx, &id) in body.iter().enumerate() {
        let tok = list.token(id);
        if tok.kind != TokenKind::Identifier || tok.var_id == 0 {
            continue;
        }
        // Stores through a dereference (`*out = ...`) hand the memory to the
        // caller. A `*` preceded by a type name is just a pointer
        // declaration.
        if is_dereference_store(list, id) {
            continue;
        }
        if !list.next(id).is_some_and(|n| list.text(n) == "=") {
            continue;
        }
        let Some(kind) = allocation_kind(list, id) else {
            continue;
        };
        track(list, function, &body, idx, id, kind, logger);
    }
}

/// Classify `var = <alloc>`; `None` when the right-hand side is not an
/// allocation primitive.
fn allocation_kind(list: &TokenList, var_tok: TokenId) -> Option<AllocKind> {
    let eq = list.next(var_tok)?;
    let first = list.next(eq)?;
    let text = list.text(first);
    if text == "new" {
        // Scan the initializer for an array form.
        let mut cur = list.next(first);
        while let Some(c) = cur {
            match list.text(c) {
                ";" => break,
                "[" => return Some(AllocKind::NewArray),
                "(" => break,
                _ => {}
            }
            cur = list.next(c);
        }
        return Some(AllocKind::New);
    }
    if !list.next(first).is_some_and(|n| list.text(n) == "(") {
        return None;
    }
    if MALLOC_FUNCTIONS.contains(text) {
        Some(AllocKind::Malloc)
    } else if FILE_FUNCTIONS.contains(text) {
        Some(AllocKind::File)
    } else {
        None
    }
}

/// Follow one allocation through the rest of the function body.
fn track(
    list: &TokenList,
    function: &Function,
    body: &[TokenId],
    alloc_idx: usize,
    var_tok: TokenId,
    kind: AllocKind,
    logger: &mut dyn ErrorLogger,
) {
    let var_id = list.token(var_tok).var_id;
    let name = list.text(var_tok).to_string();

    for &id in &body[alloc_idx + 1..] {
        if list.token(id).var_id != var_id {
            continue;
        }
        // Reassignment ends this allocation's story.
        if list.next(id).is_some_and(|n| list.text(n) == "=") {
            return;
        }
        if let Some(dealloc) = deallocation_kind(list, id) {
            if !kind.matches_dealloc(dealloc) {
                logger.report_err(&ErrorMessage::new(
                    Severity::Error,
                    "mismatchAllocDealloc",
                    format!("Mismatching allocation and deallocation: {name}"),
                    vec![list.location(id)],
                ));
            }
            return;
        }
        if escapes(list, id) {
            return;
        }
        // Any other appearance is a plain use; keep tracking.
    }

    logger.report_err(&ErrorMessage::new(
        Severity::Error,
        kind.leak_id(),
        kind.leak_message(&name),
        vec![list.location(function.body_close)],
    ));
}

/// Is this occurrence the operand of a deallocation?
fn deallocation_kind(list: &TokenList, id: TokenId) -> Option<DeallocKind> {
    let prev = list.prev(id)?;
    match list.text(prev) {
        "delete" => return Some(DeallocKind::Delete),
        "]" => {
            // delete [ ] v
            let open = list.prev(prev)?;
            let kw = list.prev(open)?;
            if list.text(open) == "[" && list.text(kw) == "delete" {
                return Some(DeallocKind::DeleteArray);
            }
        }
        "(" => {
            let callee = list.prev(prev)?;
            match list.text(callee) {
                "free" | "cfree" => return Some(DeallocKind::Free),
                "fclose" | "pclose" | "closedir" => return Some(DeallocKind::Close),
                _ => {}
            }
        }
        _ => {}
    }
    None
}

/// `* var = ...` where the star is a dereference rather than part of a
/// pointer declaration.
fn is_dereference_store(list: &TokenList, id: TokenId) -> bool {
    let mut p = list.prev(id);
    let mut saw_star = false;
    while let Some(prev) = p {
        if list.text(prev) == "*" {
            saw_star = true;
            p = list.prev(prev);
        } else {
            break;
        }
    }
    if !saw_star {
        return false;
    }
    match p {
        None => true,
        Some(before) => !list.token(before).is_name(),
    }
}

/// Does this occurrence pass ownership out of the function?
fn escapes(list: &TokenList, id: TokenId) -> bool {
    if let Some(prev) = list.prev(id) {
        match list.text(prev) {
            // return p; something = p; f(p); f(x, p)
            "return" | "=" | "," => return true,
            "(" => {
                // An argument of some call that is not a deallocation.
                if let Some(callee) = list.prev(prev) {
                    if list.token(callee).is_name() {
                        return true;
                    }
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::super::testutil::run_check;
    use super::*;

    #[test]
    fn simple_malloc_leak() {
        let logger = run_check(&MemLeakCheck, "void f() { char* p = malloc(10); }");
        assert_eq!(logger.ids(), vec!["memleak"]);
        assert_eq!(logger.errors[0].msg, "Memory leak: p");
        assert_eq!(logger.errors[0].primary_location().unwrap().line, 1);
    }

    #[test]
    fn freed_allocation_is_clean() {
        let logger = run_check(&MemLeakCheck, "void f() { char* p = malloc(10); free(p); }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn returned_allocation_is_clean() {
        let logger = run_check(&MemLeakCheck, "char* f() { char* p = malloc(10); return p; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn allocation_passed_to_function_is_clean() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { char* p = malloc(10); store(p); }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn allocation_stored_elsewhere_is_clean() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { char* p = malloc(10); global = p; }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn new_delete_is_clean() {
        let logger = run_check(&MemLeakCheck, "void f() { int* p = new int; delete p; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn new_array_delete_array_is_clean() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { int* p = new int[10]; delete [] p; }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn new_array_with_scalar_delete_is_a_mismatch() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { int* p = new int[10]; delete p; }",
        );
        assert_eq!(logger.ids(), vec!["mismatchAllocDealloc"]);
    }

    #[test]
    fn malloc_with_delete_is_a_mismatch() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { char* p = malloc(10); delete p; }",
        );
        assert_eq!(logger.ids(), vec!["mismatchAllocDealloc"]);
    }

    #[test]
    fn fopen_without_fclose_is_a_resource_leak() {
        let logger = run_check(&MemLeakCheck, "void f() { FILE* fp = fopen(\"x\", \"r\"); }");
        assert_eq!(logger.ids(), vec!["resourceLeak"]);
        assert_eq!(logger.errors[0].msg, "Resource leak: fp");
    }

    #[test]
    fn fopen_with_fclose_is_clean() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { FILE* fp = fopen(\"x\", \"r\"); fclose(fp); }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn reassigned_pointer_is_not_tracked_further() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { char* p = malloc(10); free(p); p = q; }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn store_through_out_parameter_is_clean() {
        let logger = run_check(
            &MemLeakCheck,
            "void f(char** out) { *out = malloc(10); }",
        );
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn plain_use_keeps_tracking() {
        let logger = run_check(
            &MemLeakCheck,
            "void f() { char* p = malloc(10); p[0] = 'a'; }",
        );
        assert_eq!(logger.ids(), vec!["memleak"]);
    }
}
