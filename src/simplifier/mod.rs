//! The simplifier: raw configuration text to the canonical token list the
//! checkers pattern-match against.
//!
//! Phases, in order: lex, link brackets, resolve typedefs, instantiate
//! templates, remove sugar, fold constants, assign variable ids. Each phase
//! is idempotent against its own output and never panics; anomalies degrade
//! to a best-effort stream. Bracket imbalance is the one fatal condition;
//! it abandons the configuration with a `syntaxError` diagnostic.

pub mod constfold;
pub mod links;
pub mod sugar;
pub mod templates;
pub mod typedefs;
pub mod varid;

use tracing::debug;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::lexer;
use crate::settings::Settings;
use crate::token::TokenList;

pub struct Simplifier<'a> {
    settings: &'a Settings,
}

impl<'a> Simplifier<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Simplifier { settings }
    }

    /// Lex and simplify one configuration's expanded source. `None` after a
    /// `syntaxError` diagnostic; the configuration is abandoned.
    pub fn tokenize(
        &self,
        code: &str,
        path: &str,
        logger: &mut dyn ErrorLogger,
    ) -> Option<TokenList> {
        let mut list = lexer::tokenize(code, path);
        if list.is_empty() {
            return Some(list);
        }
        if let Err(loc) = links::link_brackets(&mut list) {
            logger.report_err(&ErrorMessage::new(
                Severity::Error,
                "syntaxError",
                format!("Invalid number of brackets at {}:{}.", loc.file, loc.line),
                vec![loc],
            ));
            return None;
        }
        links::link_angles(&mut list);
        self.simplify(&mut list, logger);
        Some(list)
    }

    /// Run the rewrite phases over an already-linked token list. Running
    /// this a second time is a no-op.
    pub fn simplify(&self, list: &mut TokenList, logger: &mut dyn ErrorLogger) {
        let settings = self.settings;

        if settings.terminated() {
            return;
        }
        typedefs::simplify(list);
        relink(list);

        if settings.terminated() {
            return;
        }
        templates::instantiate(list, settings, logger);
        relink(list);

        if settings.terminated() {
            return;
        }
        sugar::simplify(list);
        relink(list);

        if settings.terminated() {
            return;
        }
        constfold::simplify(list, settings);
        relink(list);

        varid::assign(list);
    }
}

/// Refresh bracket links after a mutating phase. The phases keep brackets
/// balanced; if one ever does not, the stream stays partially linked and the
/// checkers' own guards take over.
fn relink(list: &mut TokenList) {
    if let Err(loc) = links::link_brackets(list) {
        debug!(file = %loc.file, line = loc.line, "bracket imbalance after simplification phase");
    }
    links::link_angles(list);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errorlogger::CollectingLogger;

    fn simplify_code(code: &str) -> String {
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let simplifier = Simplifier::new(&settings);
        let list = simplifier.tokenize(code, "t.cpp", &mut logger).unwrap();
        list.stringify()
    }

    #[test]
    fn full_pipeline_combines_phases() {
        assert_eq!(
            simplify_code("typedef unsigned int uint; void f() { uint a = 2 + 3, b; }"),
            "void f ( ) { unsigned int a = 5 ; unsigned int b ; }"
        );
    }

    #[test]
    fn simplification_is_a_fixpoint() {
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let simplifier = Simplifier::new(&settings);
        let mut list = simplifier
            .tokenize(
                "typedef long LL; void f() { LL x = 1 + 2; if (x) x = 3; else if (x) x = (4); }",
                "t.cpp",
                &mut logger,
            )
            .unwrap();
        let once = list.stringify();
        simplifier.simplify(&mut list, &mut logger);
        assert_eq!(list.stringify(), once, "second simplification changed the stream");
    }

    #[test]
    fn unbalanced_braces_abandon_the_configuration() {
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let simplifier = Simplifier::new(&settings);
        let result = simplifier.tokenize("void f() {", "t.cpp", &mut logger);
        assert!(result.is_none());
        assert_eq!(logger.ids(), vec!["syntaxError"]);
    }

    #[test]
    fn empty_input_produces_an_empty_list() {
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        let simplifier = Simplifier::new(&settings);
        let list = simplifier.tokenize("", "t.cpp", &mut logger).unwrap();
        assert!(list.is_empty());
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn terminate_flag_short_circuits_phases() {
        let settings = Settings::default();
        settings.terminate();
        let mut logger = CollectingLogger::new();
        let simplifier = Simplifier::new(&settings);
        // Lexing still happens; the rewrite phases bail out immediately.
        let list = simplifier
            .tokenize("typedef int t; t x;", "t.cpp", &mut logger)
            .unwrap();
        assert_eq!(list.stringify(), "typedef int t ; t x ;");
    }
}
