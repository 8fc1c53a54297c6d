//! The check framework: a polymorphic check interface, an explicit registry
//! built by the orchestrator, and the helpers every checker shares.
//!
//! Checks only ever read the simplified token stream and emit diagnostics
//! through the error-logger interface. Every check is written to survive
//! malformed input: no check may read past the list ends, assume a bracket
//! is linked, or panic on anomalies; the worst allowed outcome is silence.

pub mod autovariable;
pub mod bufferoverrun;
pub mod classinfo;
pub mod executionpath;
pub mod memleak;
pub mod obsolete;
pub mod stl;
pub mod uninitvar;
pub mod unusedfunctions;

use crate::errorlogger::ErrorLogger;
use crate::settings::Settings;
use crate::token::{TokenId, TokenKind, TokenList};

/// Everything a check needs to run over one simplified stream.
pub struct CheckContext<'a> {
    pub tokens: &'a TokenList,
    pub settings: &'a Settings,
}

/// A named analysis producing diagnostics.
pub trait Check: Sync {
    /// Stable check name ("MemLeak", "BufferOverrun", ...).
    fn name(&self) -> &'static str;

    /// Run over the simplified token stream.
    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger);

    /// Run over the raw (pre-simplification) stream. Rarely needed.
    fn run_raw(&self, _ctx: &CheckContext<'_>, _logger: &mut dyn ErrorLogger) {}

    /// Report one example of every message this check can produce, for the
    /// documentation dump (`--errorlist`).
    fn error_messages(&self, logger: &mut dyn ErrorLogger);
}

/// Explicit registry, built once by the orchestrator and then read-only.
/// Tests instantiate their own registries with whatever subset they need.
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::with_default_checks()
    }
}

impl CheckRegistry {
    pub fn empty() -> Self {
        CheckRegistry { checks: Vec::new() }
    }

    /// The full production check set.
    pub fn with_default_checks() -> Self {
        let mut registry = CheckRegistry::empty();
        registry.register(Box::new(memleak::MemLeakCheck));
        registry.register(Box::new(bufferoverrun::BufferOverrunCheck));
        registry.register(Box::new(uninitvar::UninitVarCheck));
        registry.register(Box::new(classinfo::ClassCheck));
        registry.register(Box::new(stl::StlCheck));
        registry.register(Box::new(autovariable::AutoVariableCheck));
        registry.register(Box::new(obsolete::ObsoleteFunctionsCheck));
        registry
    }

    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Dispatch every check on one simplified stream, honoring the
    /// terminate flag between checks.
    pub fn run_all(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        for check in self.iter() {
            if ctx.settings.terminated() {
                return;
            }
            check.run_simplified(ctx, logger);
        }
    }

    /// Dispatch the raw-stream hooks (run before simplification).
    pub fn run_all_raw(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        for check in self.iter() {
            if ctx.settings.terminated() {
                return;
            }
            check.run_raw(ctx, logger);
        }
    }
}

// ---------------------------------------------------------------------------
// Shared stream helpers
// ---------------------------------------------------------------------------

/// A function definition found in the stream.
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub name_token: TokenId,
    pub params_open: TokenId,
    pub params_close: TokenId,
    pub body_open: TokenId,
    pub body_close: TokenId,
}

/// Find function definitions: an identifier followed by a linked `(...)` and
/// a linked `{...}` body. Methods inside class bodies are included.
pub fn functions(list: &TokenList) -> Vec<Function> {
    let mut out = Vec::new();
    for id in list.ids() {
        if list.token(id).kind != TokenKind::Identifier {
            continue;
        }
        let Some(params_open) = list.next(id).filter(|n| list.text(*n) == "(") else {
            continue;
        };
        let Some(params_close) = list.link(params_open) else {
            continue;
        };
        let Some(body_open) = list.next(params_close).filter(|n| list.text(*n) == "{") else {
            continue;
        };
        let Some(body_close) = list.link(body_open) else {
            continue;
        };
        out.push(Function {
            name_token: id,
            params_open,
            params_close,
            body_open,
            body_close,
        });
    }
    out
}

impl Function {
    /// Variable ids of the parameters.
    pub fn param_ids(&self, list: &TokenList) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cur = list.next(self.params_open);
        while let Some(id) = cur {
            if id == self.params_close {
                break;
            }
            let var_id = list.token(id).var_id;
            if var_id != 0 {
                out.push(var_id);
            }
            cur = list.next(id);
        }
        out
    }

    /// Iterate the body tokens (exclusive of the braces).
    pub fn body_ids(&self, list: &TokenList) -> Vec<TokenId> {
        let mut out = Vec::new();
        let mut cur = list.next(self.body_open);
        while let Some(id) = cur {
            if id == self.body_close {
                break;
            }
            out.push(id);
            cur = list.next(id);
        }
        out
    }
}
