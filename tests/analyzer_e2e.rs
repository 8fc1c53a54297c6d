//! End-to-end scenarios against the public API, driving the full pipeline
//! (preprocess, simplify, check) over in-memory sources.

use cppscan::{
    Analyzer, Checkable, CollectingLogger, MemoryLister, Preprocessor, Settings, Simplifier,
    TokenList,
};

fn run_with(code: &str, configure: impl FnOnce(&mut Settings)) -> (u32, CollectingLogger) {
    let mut settings = Settings::default();
    configure(&mut settings);
    let mut analyzer = Analyzer::new(settings);
    let mut logger = CollectingLogger::new();
    let files = vec![("test.cpp".to_string(), Some(code.to_string()))];
    let exit = analyzer.check(&files, &MemoryLister::new(), &mut logger);
    (exit, logger)
}

fn run(code: &str) -> (u32, CollectingLogger) {
    run_with(code, |_| {})
}

// ---------------------------------------------------------------------------
// Literal scenarios
// ---------------------------------------------------------------------------

#[test]
fn s1_memleak() {
    let (exit, logger) = run("void f(){ char* p = malloc(10); }");
    assert_eq!(logger.ids(), vec!["memleak"]);
    let err = &logger.errors[0];
    assert_eq!(err.severity, cppscan::Severity::Error);
    assert_eq!(err.primary_location().unwrap().line, 1);
    assert_eq!(exit, 1);
}

#[test]
fn s2_bufferoverrun() {
    let (exit, logger) = run("void f(){ int a[10]; a[10]=0; }");
    assert_eq!(logger.ids(), vec!["arrayIndexOutOfBounds"]);
    assert_eq!(logger.errors[0].primary_location().unwrap().line, 1);
    assert_eq!(exit, 1);
}

#[test]
fn s3_uninitvar() {
    let (exit, logger) = run("int f(){ int x; return x; }");
    assert_eq!(logger.ids(), vec!["uninitvar"]);
    assert_eq!(logger.errors[0].primary_location().unwrap().line, 1);
    assert_eq!(exit, 1);
}

#[test]
fn s4_obsolete_function_with_enable_style() {
    let (exit, logger) = run_with("#include <stdio.h>\nvoid f(char*b){gets(b);}", |s| {
        s.enable_list("style").unwrap();
    });
    assert_eq!(logger.ids(), vec!["obsoleteFunctionsgets"]);
    assert_eq!(logger.errors[0].severity, cppscan::Severity::Style);
    assert_eq!(exit, 0);
}

#[test]
fn s5_configuration_enumeration() {
    let code = "#ifdef A\nint a;\n#endif\n#ifdef B\nint b;\n#endif\n";
    let settings = Settings::default();
    let lister = MemoryLister::new();
    let mut logger = CollectingLogger::new();
    let preprocessor = Preprocessor::new(&settings, &lister);
    let result = preprocessor.preprocess(code, "test.cpp", &mut logger).unwrap();
    let names: Vec<&str> = result.configs.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["", "A", "B", "A;B"]);
}

#[test]
fn s5_configuration_enumeration_with_max_configs() {
    let code = "#ifdef A\nint a;\n#endif\n#ifdef B\nint b;\n#endif\n";
    let mut settings = Settings::default();
    settings.max_configs = 2;
    let lister = MemoryLister::new();
    let mut logger = CollectingLogger::new();
    let preprocessor = Preprocessor::new(&settings, &lister);
    let result = preprocessor.preprocess(code, "test.cpp", &mut logger).unwrap();
    let names: Vec<&str> = result.configs.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["", "A"]);
}

#[test]
fn s6_inline_suppression() {
    let code = "// cppcheck-suppress memleak\nvoid f(){ char* p = malloc(10); }\n";
    let (exit, logger) = run_with(code, |s| s.inline_suppressions = true);
    assert!(logger.errors.is_empty(), "got: {:?}", logger.ids());
    assert_eq!(exit, 0);
}

// ---------------------------------------------------------------------------
// Invariants and boundary behaviors
// ---------------------------------------------------------------------------

fn simplify(code: &str) -> TokenList {
    let settings = Settings::default();
    let mut logger = CollectingLogger::new();
    Simplifier::new(&settings)
        .tokenize(code, "inv.cpp", &mut logger)
        .expect("simplification should succeed")
}

#[test]
fn every_bracket_link_is_mutual_and_matching() {
    let list = simplify(
        "void f(int n) { if (n) { int a[3]; g(a[0], (n + 1)); } } \
         class C { public: void m() { } };",
    );
    for id in list.ids() {
        let Some(partner) = list.link(id) else { continue };
        assert_eq!(list.link(partner), Some(id), "links must be mutual");
        let pair = (list.text(id).to_string(), list.text(partner).to_string());
        let (open, close) = if id < partner {
            (pair.0, pair.1)
        } else {
            (pair.1, pair.0)
        };
        // Recorded by insertion order, not position; normalize.
        let valid = matches!(
            (open.as_str(), close.as_str()),
            ("(", ")") | (")", "(") | ("[", "]") | ("]", "[") | ("{", "}") | ("}", "{")
                | ("<", ">") | (">", "<")
        );
        assert!(valid, "bad link pair {open:?} {close:?}");
    }
}

#[test]
fn variable_ids_are_distinct_per_scope() {
    let list = simplify("void f() { int a; int b; { int a; int c; } }");
    // Collect (declaration order) ids; all four declarations distinct.
    let mut ids: Vec<u32> = list
        .ids()
        .into_iter()
        .map(|id| list.token(id).var_id)
        .filter(|v| *v != 0)
        .collect();
    ids.dedup();
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(ids.len(), unique.len(), "duplicate variable ids: {ids:?}");
}

#[test]
fn output_is_deterministic_across_runs() {
    let code = "#ifdef A\nvoid a(){ char* p = malloc(1); }\n#endif\n\
                void f(){ int x; int y = x; int b[2]; b[5] = 1; }\n";
    let render = || {
        let (_, logger) = run_with(code, |s| s.enable_list("all").unwrap());
        logger
            .errors
            .iter()
            .map(|e| e.to_text())
            .collect::<Vec<_>>()
            .join("\n")
    };
    assert_eq!(render(), render());
}

#[test]
fn filtered_severities_are_never_emitted() {
    // Default settings: no style class enabled.
    let (_, logger) = run("void f(char*b){ gets(b); }");
    assert!(logger
        .errors
        .iter()
        .all(|e| e.severity == cppscan::Severity::Error));
}

#[test]
fn terminate_flag_stops_promptly() {
    let settings = Settings::default();
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
fn empty_input_is_clean() {
    let (exit, logger) = run("");
    assert!(logger.errors.is_empty());
    assert_eq!(exit, 0);
}

#[test]
fn comments_and_whitespace_only_is_clean() {
    let (exit, logger) = run("  \n// nothing here\n/* or\n   here */\n\t\n");
    assert!(logger.errors.is_empty());
    assert_eq!(exit, 0);
}

#[test]
fn simplifier_is_idempotent_on_its_output() {
    let settings = Settings::default();
    let mut logger = CollectingLogger::new();
    let simplifier = Simplifier::new(&settings);
    let mut list = simplifier
        .tokenize(
            "typedef unsigned uns; void f() { uns a = 1 + 2, b; if (a) b = 3; else if (b) a = (4); }",
            "fix.cpp",
            &mut logger,
        )
        .unwrap();
    let once = list.stringify();
    simplifier.simplify(&mut list, &mut logger);
    assert_eq!(list.stringify(), once);
}

// ---------------------------------------------------------------------------
// Cross-cutting pipeline behaviors
// ---------------------------------------------------------------------------

#[test]
fn include_resolution_feeds_checks_with_provenance() {
    let mut settings = Settings::default();
    settings.enable_list("style").unwrap();
    let mut lister = MemoryLister::new();
    lister.add("dir/bad.h", "void helper(char* b) { gets(b); }\n");
    let mut analyzer = Analyzer::new(settings);
    let mut logger = CollectingLogger::new();
    let files = vec![(
        "dir/main.cpp".to_string(),
        Some("#include \"bad.h\"\nint main() { return 0; }\n".to_string()),
    )];
    analyzer.check(&files, &lister, &mut logger);
    let gets = logger
        .errors
        .iter()
        .find(|e| e.id == "obsoleteFunctionsgets")
        .expect("finding from included header");
    let loc = gets.primary_location().unwrap();
    assert_eq!(loc.file, "dir/bad.h");
    assert_eq!(loc.line, 1);
}

#[test]
fn config_dependent_code_is_checked_in_every_configuration() {
    let code = "#ifdef BUGGY\nvoid f(){ char* p = malloc(10); }\n#else\nvoid f(){ }\n#endif\n";
    let (exit, logger) = run(code);
    assert_eq!(logger.ids(), vec!["memleak"]);
    assert_eq!(exit, 1);
}

#[test]
fn macro_expansion_reaches_the_checks() {
    let code = "#define ALLOC(n) malloc(n)\nvoid f(){ char* p = ALLOC(10); }\n";
    let (_, logger) = run(code);
    assert_eq!(logger.ids(), vec!["memleak"]);
}

#[test]
fn unused_function_needs_its_enable_class() {
    let code = "void helper() { }\nint main() { return 0; }\n";
    let (_, logger) = run(code);
    assert!(logger.errors.is_empty());
    let (_, logger) = run_with(code, |s| s.enable(Checkable::UnusedFunction));
    assert_eq!(logger.ids(), vec!["unusedFunction"]);
}

#[test]
fn exit_code_counts_failing_files_not_findings() {
    let mut analyzer = Analyzer::new(Settings::default());
    let mut logger = CollectingLogger::new();
    let files = vec![
        (
            "two_leaks.cpp".to_string(),
            Some("void f(){ char* p = malloc(1); }\nvoid g(){ char* q = malloc(2); }\n".to_string()),
        ),
        ("clean.cpp".to_string(), Some("int main(){ return 0; }\n".to_string())),
        (
            "one_leak.cpp".to_string(),
            Some("void h(){ char* r = malloc(3); }\n".to_string()),
        ),
    ];
    let exit = analyzer.check(&files, &MemoryLister::new(), &mut logger);
    assert_eq!(logger.errors.len(), 3);
    assert_eq!(exit, 2);
}

#[test]
fn suppress_flag_beats_enable() {
    let code = "void f(char*b){ gets(b); }";
    let mut suppressions = cppscan::Suppressions::new();
    suppressions.parse_line("obsoleteFunctionsgets").unwrap();
    let mut settings = Settings::default();
    settings.enable_list("style").unwrap();
    let mut analyzer = Analyzer::new(settings).with_suppressions(suppressions);
    let mut logger = CollectingLogger::new();
    let files = vec![("test.cpp".to_string(), Some(code.to_string()))];
    analyzer.check(&files, &MemoryLister::new(), &mut logger);
    assert!(logger.errors.is_empty());
}

#[test]
fn missing_include_is_information_class() {
    let code = "#include \"no_such_header.h\"\nint main(){ return 0; }\n";
    let (_, logger) = run(code);
    assert!(logger.errors.is_empty());
    let (_, logger) = run_with(code, |s| s.enable(Checkable::MissingInclude));
    assert_eq!(logger.ids(), vec!["missingInclude"]);
}
