//! CLI argument validation, exercised through
//! [`clap::Parser::try_parse_from`] without spawning a subprocess.

use clap::Parser;
use cppscan::{Checkable, Cli, Platform};

fn try_parse(args: &[&str]) -> Result<Cli, String> {
    Cli::try_parse_from(args).map_err(|e| e.to_string())
}

fn must_parse(args: &[&str]) -> Cli {
    try_parse(args).unwrap_or_else(|e| panic!("expected parse to succeed, got:\n{e}"))
}

fn must_fail_containing(args: &[&str], needle: &str) {
    let err = try_parse(args).expect_err("expected parse to fail");
    assert!(
        err.contains(needle),
        "error does not contain '{needle}'. Full error:\n{err}",
    );
}

#[test]
fn paths_are_required() {
    must_fail_containing(&["cppscan"], "required");
}

#[test]
fn errorlist_needs_no_paths() {
    let cli = must_parse(&["cppscan", "--errorlist"]);
    assert!(cli.errorlist);
    assert!(cli.paths.is_empty());
}

#[test]
fn unknown_enable_id_rejected() {
    must_fail_containing(&["cppscan", "--enable=nonsense", "f.cpp"], "unknown id");
}

#[test]
fn enable_all_parses() {
    let cli = must_parse(&["cppscan", "--enable=all", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    for class in Checkable::all() {
        assert!(settings.is_enabled(*class));
    }
}

#[test]
fn enable_list_with_spaces_and_commas() {
    let cli = must_parse(&["cppscan", "--enable=style, warning", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert!(settings.is_enabled(Checkable::Style));
    assert!(settings.is_enabled(Checkable::Warning));
}

#[test]
fn platform_validation() {
    let cli = must_parse(&["cppscan", "--platform=win64", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert_eq!(settings.platform, Platform::Win64);
    must_fail_containing(&["cppscan", "--platform=amiga", "f.cpp"], "unknown platform");
}

#[test]
fn std_flags_accumulate() {
    let cli = must_parse(&["cppscan", "--std=posix", "--std=c99", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert!(settings.standards.posix);
    assert!(settings.standards.c99);
    must_fail_containing(&["cppscan", "--std=c++99", "f.cpp"], "unknown standard");
}

#[test]
fn max_configs_must_be_positive() {
    must_fail_containing(&["cppscan", "--max-configs=0", "f.cpp"], "at least 1");
    let cli = must_parse(&["cppscan", "--max-configs=7", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert_eq!(settings.max_configs, 7);
}

#[test]
fn jobs_must_be_positive() {
    must_fail_containing(&["cppscan", "-j0", "f.cpp"], "at least 1");
    let cli = must_parse(&["cppscan", "-j8", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert_eq!(settings.job_count, 8);
}

#[test]
fn xml_version_out_of_range_rejected() {
    assert!(try_parse(&["cppscan", "--xml-version=0", "f.cpp"]).is_err());
    assert!(try_parse(&["cppscan", "--xml-version=3", "f.cpp"]).is_err());
}

#[test]
fn suppress_specs_reach_the_suppression_set() {
    let cli = must_parse(&[
        "cppscan",
        "--suppress=memleak:a.c:10",
        "--suppress=uninitvar",
        "f.cpp",
    ]);
    let (_, _, suppressions) = cli.into_settings().unwrap();
    assert!(!suppressions.is_empty());
}

#[test]
fn malformed_suppress_spec_fails_translation() {
    let cli = must_parse(&["cppscan", "--suppress=memleak:a.c:badline", "f.cpp"]);
    assert!(cli.into_settings().is_err());
}

#[test]
fn defines_undefine_and_template() {
    let cli = must_parse(&[
        "cppscan",
        "-DDEBUG",
        "-DMAX=10",
        "-UNDEBUG",
        "--template=gcc",
        "f.cpp",
    ]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert_eq!(settings.user_defines, vec!["DEBUG", "MAX=10"]);
    assert_eq!(settings.user_undefs, vec!["NDEBUG"]);
    assert_eq!(settings.template.as_deref(), Some("gcc"));
}

#[test]
fn quiet_and_verbose_flags() {
    let cli = must_parse(&["cppscan", "-q", "-v", "f.cpp"]);
    let (settings, _, _) = cli.into_settings().unwrap();
    assert!(settings.quiet);
    assert!(settings.verbose);
}
