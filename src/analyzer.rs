//! The orchestrator: drives preprocessing, tokenization, and the check
//! registry for every file and every preprocessor configuration, filters and
//! orders the resulting diagnostics, and computes the exit code.

use std::path::PathBuf;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::checks::unusedfunctions::UnusedFunctions;
use crate::checks::{CheckContext, CheckRegistry};
use crate::errorlogger::{CollectingLogger, ErrorLogger, ErrorMessage, Severity};
use crate::filelister::FileLister;
use crate::preprocessor::Preprocessor;
use crate::settings::{Checkable, Settings};
use crate::simplifier::Simplifier;
use crate::suppressions::Suppressions;

/// One input: a path and, for embedded/test use, optional in-memory content.
pub type SourceFile = (String, Option<String>);

pub struct Analyzer {
    settings: Settings,
    suppressions: Suppressions,
    registry: CheckRegistry,
}

/// Everything checking one file produced, batched so the parallel driver can
/// emit per-file results in deterministic order.
struct FileReport {
    diagnostics: Vec<ErrorMessage>,
    unused_functions: UnusedFunctions,
    has_error: bool,
}

impl Analyzer {
    pub fn new(settings: Settings) -> Self {
        Analyzer {
            settings,
            suppressions: Suppressions::new(),
            registry: CheckRegistry::with_default_checks(),
        }
    }

    pub fn with_suppressions(mut self, suppressions: Suppressions) -> Self {
        self.suppressions = suppressions;
        self
    }

    pub fn with_registry(mut self, registry: CheckRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Check every file. Returns the number of files with at least one
    /// error-severity diagnostic, capped at 255; the process exit code.
    pub fn check(
        &mut self,
        files: &[SourceFile],
        lister: &dyn FileLister,
        logger: &mut dyn ErrorLogger,
    ) -> u32 {
        let total = files.len();
        let reports: Vec<Option<FileReport>> = if self.settings.job_count > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.settings.job_count)
                .build();
            match pool {
                Ok(pool) => pool.install(|| {
                    files
                        .par_iter()
                        .map(|file| self.check_one(file, lister))
                        .collect()
                }),
                Err(_) => files.iter().map(|f| self.check_one(f, lister)).collect(),
            }
        } else {
            files.iter().map(|f| self.check_one(f, lister)).collect()
        };

        let mut exit_count: u32 = 0;
        let mut unused = UnusedFunctions::new();
        for (index, (file, report)) in files.iter().zip(reports).enumerate() {
            info!(file = %file.0, "checked");
            logger.report_out(&format!("Checking {}...", file.0));
            let progress = format!(
                "{}/{} files checked {}% done",
                index + 1,
                total,
                (index + 1) * 100 / total.max(1)
            );
            let Some(report) = report else {
                logger.report_out(&progress);
                continue;
            };
            for msg in &report.diagnostics {
                logger.report_err(msg);
            }
            if report.has_error {
                exit_count = exit_count.saturating_add(1);
            }
            unused.merge(report.unused_functions);
            logger.report_out(&progress);
        }

        // Whole-program analysis runs after the last file.
        if self.settings.is_enabled(Checkable::UnusedFunction) && !self.settings.terminated() {
            let mut collector = CollectingLogger::new();
            unused.check(&mut collector);
            for msg in &collector.errors {
                if !self.suppressions.is_suppressed(msg) {
                    logger.report_err(msg);
                }
            }
        }

        exit_count.min(255)
    }

    /// Check a single file across all of its configurations. `None` when
    /// the file could not be read (reported as information).
    fn check_one(&self, file: &SourceFile, lister: &dyn FileLister) -> Option<FileReport> {
        let (path, content) = file;
        if self.settings.terminated() {
            return None;
        }

        let code = match content {
            Some(text) => text.clone(),
            None => match lister.read(&PathBuf::from(path)) {
                Ok(text) => text,
                Err(err) => {
                    debug!(file = %path, error = %err, "unreadable file");
                    let mut report = FileReport {
                        diagnostics: Vec::new(),
                        unused_functions: UnusedFunctions::new(),
                        has_error: false,
                    };
                    report.diagnostics.push(ErrorMessage::at(
                        Severity::Information,
                        "fileError",
                        format!("File cannot be read: {path}"),
                        path.clone(),
                        0,
                    ));
                    self.filter_report(&mut report, &Suppressions::new());
                    return Some(report);
                }
            },
        };

        let mut raw = CollectingLogger::new();
        let preprocessor = Preprocessor::new(&self.settings, lister);
        let mut unused_functions = UnusedFunctions::new();

        let mut inline = Suppressions::new();
        if let Some(result) = preprocessor.preprocess(&code, path, &mut raw) {
            if self.settings.inline_suppressions {
                for suppression in &result.inline_suppressions {
                    inline.add_inline(suppression);
                }
            }
            let simplifier = Simplifier::new(&self.settings);
            for (config_name, config_code) in &result.configs {
                if self.settings.terminated() {
                    break;
                }
                if !config_name.is_empty() {
                    debug!(file = %path, config = %config_name, "checking configuration");
                }
                // Raw-stream hooks run on the unsimplified tokens.
                let raw_tokens = crate::lexer::tokenize(config_code, path);
                if !raw_tokens.is_empty() {
                    let raw_ctx = CheckContext {
                        tokens: &raw_tokens,
                        settings: &self.settings,
                    };
                    self.registry.run_all_raw(&raw_ctx, &mut raw);
                }

                let Some(tokens) = simplifier.tokenize(config_code, path, &mut raw) else {
                    continue;
                };
                if tokens.is_empty() {
                    continue;
                }
                let ctx = CheckContext {
                    tokens: &tokens,
                    settings: &self.settings,
                };
                self.registry.run_all(&ctx, &mut raw);
                unused_functions.parse_tokens(&tokens);
            }
        }

        let mut report = FileReport {
            diagnostics: raw.errors,
            unused_functions,
            has_error: false,
        };
        self.filter_report(&mut report, &inline);
        Some(report)
    }

    /// Deduplicate (configurations overlap), filter by enabled classes and
    /// suppressions, and order by source position.
    fn filter_report(&self, report: &mut FileReport, inline: &Suppressions) {
        let mut seen: FxHashSet<ErrorMessage> = FxHashSet::default();
        let mut kept: Vec<ErrorMessage> = Vec::new();
        for msg in report.diagnostics.drain(..) {
            if !seen.insert(msg.clone()) {
                continue;
            }
            if !self.message_enabled(&msg) {
                continue;
            }
            if self.suppressions.is_suppressed(&msg) || inline.is_suppressed(&msg) {
                continue;
            }
            kept.push(msg);
        }
        kept.sort_by(|a, b| {
            let ka = a
                .primary_location()
                .map(|l| (l.file.clone(), l.line))
                .unwrap_or_default();
            let kb = b
                .primary_location()
                .map(|l| (l.file.clone(), l.line))
                .unwrap_or_default();
            ka.cmp(&kb).then_with(|| a.id.cmp(&b.id))
        });
        report.has_error = kept.iter().any(|m| m.severity == Severity::Error);
        report.diagnostics = kept;
    }

    /// Severity/class gate. Error always passes; `missingInclude` and
    /// `unusedFunction` have their own enable classes; debug messages need
    /// verbose mode; inconclusive findings need `--inconclusive`.
    fn message_enabled(&self, msg: &ErrorMessage) -> bool {
        if msg.inconclusive && !self.settings.inconclusive {
            return false;
        }
        match msg.id.as_str() {
            "missingInclude" => return self.settings.is_enabled(Checkable::MissingInclude),
            "unusedFunction" => return self.settings.is_enabled(Checkable::UnusedFunction),
            _ => {}
        }
        match msg.severity {
            Severity::Error => true,
            Severity::Warning => self.settings.is_enabled(Checkable::Warning),
            Severity::Style => self.settings.is_enabled(Checkable::Style),
            Severity::Performance => self.settings.is_enabled(Checkable::Performance),
            Severity::Portability => self.settings.is_enabled(Checkable::Portability),
            Severity::Information => self.settings.is_enabled(Checkable::Information),
            Severity::Debug => self.settings.verbose,
        }
    }

    /// Dump one example of every message every registered check can produce,
    /// for `--errorlist`.
    pub fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        for check in self.registry.iter() {
            check.error_messages(logger);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filelister::MemoryLister;

    fn run(code: &str, configure: impl FnOnce(&mut Settings)) -> (u32, CollectingLogger) {
        let mut settings = Settings::default();
        configure(&mut settings);
        let mut analyzer = Analyzer::new(settings);
        let mut logger = CollectingLogger::new();
        let files = vec![("test.cpp".to_string(), Some(code.to_string()))];
        let lister = MemoryLister::new();
        let exit = analyzer.check(&files, &lister, &mut logger);
        (exit, logger)
    }

    #[test]
    fn memleak_scenario() {
        let (exit, logger) = run("void f(){ char* p = malloc(10); }", |_| {});
        assert_eq!(logger.ids(), vec!["memleak"]);
        assert_eq!(exit, 1);
        let loc = logger.errors[0].primary_location().unwrap();
        assert_eq!(loc.file, "test.cpp");
        assert_eq!(loc.line, 1);
    }

    #[test]
    fn empty_input_is_clean() {
        let (exit, logger) = run("", |_| {});
        assert!(logger.errors.is_empty());
        assert_eq!(exit, 0);
    }

    #[test]
    fn comments_only_is_clean() {
        let (exit, logger) = run("// just a comment\n/* and another */\n", |_| {});
        assert!(logger.errors.is_empty());
        assert_eq!(exit, 0);
    }

    #[test]
    fn style_messages_need_enable() {
        let code = "void f(char* b) { gets(b); }";
        let (exit, logger) = run(code, |_| {});
        assert!(logger.errors.is_empty());
        assert_eq!(exit, 0);

        let (exit, logger) = run(code, |s| s.enable_list("style").unwrap());
        assert_eq!(logger.ids(), vec!["obsoleteFunctionsgets"]);
        // Style findings do not affect the exit code.
        assert_eq!(exit, 0);
    }

    #[test]
    fn duplicate_diagnostics_across_configs_collapse() {
        let code = "#ifdef A\nint unused_config_marker;\n#endif\nvoid f(){ char* p = malloc(10); }\n";
        let (_, logger) = run(code, |_| {});
        let leaks = logger.ids().iter().filter(|id| **id == "memleak").count();
        assert_eq!(leaks, 1);
    }

    #[test]
    fn inline_suppression_silences_the_finding() {
        let code = "// cppcheck-suppress memleak\nvoid f(){ char* p = malloc(10); }\n";
        let (exit, logger) = run(code, |s| s.inline_suppressions = true);
        assert!(logger.errors.is_empty());
        assert_eq!(exit, 0);
    }

    #[test]
    fn inline_suppression_ignored_without_flag() {
        let code = "// cppcheck-suppress memleak\nvoid f(){ char* p = malloc(10); }\n";
        let (exit, logger) = run(code, |_| {});
        assert_eq!(logger.ids(), vec!["memleak"]);
        assert_eq!(exit, 1);
    }

    #[test]
    fn terminate_flag_stops_checking() {
        let mut settings = Settings::default();
        settings.terminate();
        let mut analyzer = Analyzer::new(settings);
        let mut logger = CollectingLogger::new();
        let files = vec![(
            "test.cpp".to_string(),
            Some("void f(){ char* p = malloc(10); }".to_string()),
        )];
        let exit = analyzer.check(&files, &MemoryLister::new(), &mut logger);
        assert_eq!(exit, 0);
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn diagnostics_are_ordered_by_line() {
        let code = "void g(){ int a[3]; a[5] = 0; }\nvoid f(){ char* p = malloc(10); }\n";
        let (_, logger) = run(code, |_| {});
        let lines: Vec<u32> = logger
            .errors
            .iter()
            .map(|e| e.primary_location().unwrap().line)
            .collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn determinism_two_runs_identical() {
        let code = "#ifdef A\nvoid a(){ char* p = malloc(1); }\n#endif\nvoid f(){ int x; int y = x; }\n";
        let (_, first) = run(code, |s| s.enable_list("all").unwrap());
        let (_, second) = run(code, |s| s.enable_list("all").unwrap());
        let first_text: Vec<String> = first.errors.iter().map(|e| e.to_text()).collect();
        let second_text: Vec<String> = second.errors.iter().map(|e| e.to_text()).collect();
        assert_eq!(first_text, second_text);
    }

    #[test]
    fn unused_function_check_runs_at_end() {
        let code = "void helper() { }\nint main() { return 0; }\n";
        let (_, logger) = run(code, |s| s.enable(Checkable::UnusedFunction));
        assert_eq!(logger.ids(), vec!["unusedFunction"]);
    }

    #[test]
    fn unreadable_file_is_information_not_fatal() {
        let mut analyzer = Analyzer::new(Settings::default());
        let mut logger = CollectingLogger::new();
        let files = vec![("missing.cpp".to_string(), None)];
        let exit = analyzer.check(&files, &MemoryLister::new(), &mut logger);
        // Information severity is filtered by default; the run stays clean.
        assert_eq!(exit, 0);
    }
}
