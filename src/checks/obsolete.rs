//! Obsolete function usage. Pure pattern match against a fixed table.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::{Check, CheckContext};

/// Obsolete function -> recommended replacement text.
static OBSOLETE_FUNCTIONS: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        (
            "gets",
            "Found obsolete function 'gets'. It is recommended to use the function 'fgets' instead.",
        ),
        (
            "mktemp",
            "Found obsolete function 'mktemp'. It is recommended to use the function 'mkstemp' instead.",
        ),
        (
            "tmpnam",
            "Found obsolete function 'tmpnam'. It is recommended to use the functions 'tmpfile' or 'mkstemp' instead.",
        ),
        (
            "bcopy",
            "Found obsolete function 'bcopy'. It is recommended to use the function 'memmove' instead.",
        ),
        (
            "bcmp",
            "Found obsolete function 'bcmp'. It is recommended to use the function 'memcmp' instead.",
        ),
        (
            "bzero",
            "Found obsolete function 'bzero'. It is recommended to use the function 'memset' instead.",
        ),
        (
            "index",
            "Found obsolete function 'index'. It is recommended to use the function 'strchr' instead.",
        ),
        (
            "rindex",
            "Found obsolete function 'rindex'. It is recommended to use the function 'strrchr' instead.",
        ),
        (
            "usleep",
            "Found obsolete function 'usleep'. It is recommended to use the 'nanosleep' function instead.",
        ),
        (
            "vfork",
            "Found obsolete function 'vfork'. It is recommended to use the function 'fork' instead.",
        ),
        (
            "getwd",
            "Found obsolete function 'getwd'. It is recommended to use the function 'getcwd' instead.",
        ),
    ]
    .into_iter()
    .collect()
});

pub struct ObsoleteFunctionsCheck;

impl Check for ObsoleteFunctionsCheck {
    fn name(&self) -> &'static str {
        "ObsoleteFunctions"
    }

    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        let list = ctx.tokens;
        for id in list.ids() {
            let tok = list.token(id);
            if tok.kind != TokenKind::Identifier {
                continue;
            }
            let Some(message) = OBSOLETE_FUNCTIONS.get(tok.text.as_str()) else {
                continue;
            };
            if !is_call(list, id) {
                continue;
            }
            logger.report_err(&ErrorMessage::new(
                Severity::Style,
                format!("obsoleteFunctions{}", tok.text),
                (*message).to_string(),
                vec![list.location(id)],
            ));
        }
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        for (name, message) in OBSOLETE_FUNCTIONS.iter() {
            logger.report_err(&ErrorMessage::at(
                Severity::Style,
                format!("obsoleteFunctions{name}"),
                (*message).to_string(),
                "",
                0,
            ));
        }
    }
}

/// A call of the obsolete function itself, not a member with the same name
/// or a local (re)definition.
fn is_call(list: &TokenList, id: TokenId) -> bool {
    if !list.next(id).is_some_and(|n| list.text(n) == "(") {
        return false;
    }
    if let Some(prev) = list.prev(id) {
        let pt = list.token(prev);
        // obj.gets(...), ns::gets(...), or a declaration `int gets(...)`.
        if matches!(pt.text.as_str(), "." | "->" | "::") {
            return false;
        }
        if pt.flags.is_standard_type || pt.kind == TokenKind::TypeName {
            return false;
        }
    }
    true
}
