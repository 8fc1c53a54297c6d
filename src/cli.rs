//! CLI argument definitions and translation into [`Settings`].
//!
//! Kept in its own module so integration tests can use
//! [`clap::Parser::try_parse_from`] to exercise argument validation without
//! spawning a subprocess.

use std::path::PathBuf;

use clap::Parser;

use crate::settings::{Checkable, Platform, Settings, Standards};
use crate::suppressions::Suppressions;

/// Validate an `--enable` list at parse time.
fn validate_enable(s: &str) -> Result<String, String> {
    for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if name != "all" && Checkable::parse_name(name).is_none() {
            return Err(format!(
                "unknown id '{name}'. Valid ids: all, style, warning, performance, \
                 portability, information, unusedFunction, missingInclude"
            ));
        }
    }
    Ok(s.to_string())
}

fn validate_platform(s: &str) -> Result<String, String> {
    Platform::parse_name(s)
        .map(|_| s.to_string())
        .ok_or_else(|| {
            format!("unknown platform '{s}'. Valid platforms: unspecified, unix32, unix64, win32A, win32W, win64")
        })
}

fn validate_std(s: &str) -> Result<String, String> {
    let mut probe = Standards::default();
    if probe.set(s) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "unknown standard '{s}'. Valid standards: c89, c99, c++03, c++11, posix"
        ))
    }
}

fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let val: usize = s.parse().map_err(|e| format!("invalid integer: {e}"))?;
    if val == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(val)
}

/// cppscan: static analysis of C/C++ code.
///
/// Checks every source file in the given paths, once per interesting
/// preprocessor configuration, and prints the findings as text or XML.
///
/// Quick start:
///   cppscan src/                  Check all sources under src/
///   cppscan --enable=all src/     Also report style/portability/... findings
///   cppscan -DDEBUG file.cpp      Check one configuration only
///   cppscan --errorlist           List every message the checks can produce
#[derive(Parser, Debug)]
#[command(name = "cppscan")]
#[command(version)]
#[command(about = "Static analysis of C/C++ code", long_about = None)]
#[command(after_help = "\
CONFIGURATION:\n\
  cppscan looks for a .cppscan.toml config file, searching from the current\n\
  directory up to the nearest .git root. CLI flags always override config\n\
  file settings.\n\
\n\
EXIT CODE:\n\
  The number of files with at least one error-severity finding (capped at\n\
  255); 0 when the analysis is clean.")]
pub struct Cli {
    /// Files or directories to check (directories are scanned recursively).
    #[arg(required_unless_present_any = ["errorlist"])]
    pub paths: Vec<PathBuf>,

    /// Define a preprocessor symbol: -D<ID> or -D<ID>=<VALUE>.
    ///
    /// With -D, only the given configuration is checked (unless --force).
    #[arg(short = 'D', value_name = "ID[=VALUE]", action = clap::ArgAction::Append)]
    pub define: Vec<String>,

    /// Undefine a preprocessor symbol, excluding it from configuration
    /// enumeration.
    #[arg(short = 'U', value_name = "ID", action = clap::ArgAction::Append)]
    pub undefine: Vec<String>,

    /// Add a path to search for #include'd headers.
    #[arg(short = 'I', value_name = "PATH", action = clap::ArgAction::Append)]
    pub include_path: Vec<PathBuf>,

    /// Enable additional message classes, comma separated:
    /// all, style, warning, performance, portability, information,
    /// unusedFunction, missingInclude.
    #[arg(long, value_name = "LIST", value_parser = validate_enable)]
    pub enable: Option<String>,

    /// Also report findings the analysis is not certain about.
    #[arg(long)]
    pub inconclusive: bool,

    /// Honor `// cppcheck-suppress <id>` comments in the sources.
    #[arg(long = "inline-suppr")]
    pub inline_suppr: bool,

    /// Check all preprocessor configurations, even with -D and even when
    /// enumeration would explode.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Maximum number of configurations to check per file (>= 1).
    #[arg(long, value_name = "N", value_parser = parse_positive_usize)]
    pub max_configs: Option<usize>,

    /// Target platform for type widths: unspecified, unix32, unix64,
    /// win32A, win32W, win64.
    #[arg(long, value_name = "PLATFORM", value_parser = validate_platform)]
    pub platform: Option<String>,

    /// Language standard; repeatable: c89, c99, c++03, c++11, posix.
    #[arg(long = "std", value_name = "STD", value_parser = validate_std, action = clap::ArgAction::Append)]
    pub std: Vec<String>,

    /// Suppress a message: <id>[:<file>[:<line>]]. Repeatable.
    #[arg(long, value_name = "SPEC", action = clap::ArgAction::Append)]
    pub suppress: Vec<String>,

    /// Read suppressions from a file, one <id>[:<file>[:<line>]] per line.
    #[arg(long = "suppressions-list", value_name = "FILE")]
    pub suppressions_list: Option<PathBuf>,

    /// Write results as XML.
    #[arg(long)]
    pub xml: bool,

    /// XML format version (1 or 2).
    #[arg(long, value_name = "V", default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
    pub xml_version: u8,

    /// Format text output: 'gcc', 'vs', or a custom string with {file},
    /// {line}, {severity}, {id}, {message} placeholders.
    #[arg(long, value_name = "FMT")]
    pub template: Option<String>,

    /// Number of parallel jobs (>= 1).
    #[arg(short = 'j', value_name = "N", default_value = "1", value_parser = parse_positive_usize)]
    pub jobs: usize,

    /// Print one example of every message the checks can produce, as XML,
    /// and exit.
    #[arg(long)]
    pub errorlist: bool,

    /// Only print the findings, no progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Show additional details while checking (including debug-severity
    /// messages).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Path to a .cppscan.toml config file, overriding discovery.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ignore any .cppscan.toml config file.
    #[arg(long)]
    pub no_config: bool,
}

impl Cli {
    /// Translate parsed arguments into the immutable settings struct and the
    /// CLI-level suppressions. Values validated at parse time cannot fail
    /// here.
    pub fn into_settings(self) -> Result<(Settings, Vec<PathBuf>, Suppressions), String> {
        let mut settings = Settings::default();

        if let Some(enable) = &self.enable {
            settings.enable_list(enable).map_err(|bad| format!("unknown id '{bad}'"))?;
        }
        settings.inconclusive = self.inconclusive;
        settings.inline_suppressions = self.inline_suppr;
        settings.force = self.force;
        if let Some(max) = self.max_configs {
            settings.max_configs = max;
        } else if self.force {
            // --force means "check everything" unless explicitly capped.
            settings.max_configs = usize::MAX;
        }
        settings.user_defines = self.define;
        settings.user_undefs = self.undefine;
        settings.include_paths = self.include_path;
        if let Some(platform) = &self.platform {
            settings.platform =
                Platform::parse_name(platform).ok_or_else(|| format!("unknown platform '{platform}'"))?;
        }
        for std in &self.std {
            if !settings.standards.set(std) {
                return Err(format!("unknown standard '{std}'"));
            }
        }
        settings.job_count = self.jobs;
        settings.xml = self.xml;
        settings.xml_version = self.xml_version;
        settings.template = self.template;
        settings.quiet = self.quiet;
        settings.verbose = self.verbose;

        let mut suppressions = Suppressions::new();
        for spec in &self.suppress {
            suppressions
                .parse_line(spec)
                .map_err(|e| format!("bad suppression '{spec}': {e}"))?;
        }

        Ok((settings, self.paths, suppressions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, String> {
        Cli::try_parse_from(args).map_err(|e| e.to_string())
    }

    #[test]
    fn minimal_invocation() {
        let cli = parse(&["cppscan", "src/"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("src/")]);
        assert_eq!(cli.jobs, 1);
    }

    #[test]
    fn paths_required_without_errorlist() {
        assert!(parse(&["cppscan"]).is_err());
        assert!(parse(&["cppscan", "--errorlist"]).is_ok());
    }

    #[test]
    fn defines_and_includes_accumulate() {
        let cli = parse(&["cppscan", "-DA", "-DB=2", "-Iinc", "-Ithird", "f.cpp"]).unwrap();
        assert_eq!(cli.define, vec!["A", "B=2"]);
        assert_eq!(cli.include_path.len(), 2);
    }

    #[test]
    fn bad_enable_rejected_at_parse_time() {
        let err = parse(&["cppscan", "--enable=bogus", "f.cpp"]).unwrap_err();
        assert!(err.contains("unknown id 'bogus'"));
    }

    #[test]
    fn bad_platform_rejected() {
        assert!(parse(&["cppscan", "--platform=dos", "f.cpp"]).is_err());
    }

    #[test]
    fn zero_jobs_rejected() {
        let err = parse(&["cppscan", "-j", "0", "f.cpp"]).unwrap_err();
        assert!(err.contains("at least 1"));
    }

    #[test]
    fn xml_version_range() {
        assert!(parse(&["cppscan", "--xml", "--xml-version=2", "f.cpp"]).is_ok());
        assert!(parse(&["cppscan", "--xml", "--xml-version=3", "f.cpp"]).is_err());
    }

    #[test]
    fn into_settings_translates_flags() {
        let cli = parse(&[
            "cppscan",
            "--enable=style,warning",
            "--inline-suppr",
            "--max-configs=3",
            "--platform=unix64",
            "--suppress=memleak:f.c",
            "-j4",
            "f.cpp",
        ])
        .unwrap();
        let (settings, paths, suppressions) = cli.into_settings().unwrap();
        assert!(settings.is_enabled(Checkable::Style));
        assert!(settings.is_enabled(Checkable::Warning));
        assert!(!settings.is_enabled(Checkable::Performance));
        assert!(settings.inline_suppressions);
        assert_eq!(settings.max_configs, 3);
        assert_eq!(settings.platform, Platform::Unix64);
        assert_eq!(settings.job_count, 4);
        assert_eq!(paths, vec![PathBuf::from("f.cpp")]);
        assert!(!suppressions.is_empty());
    }

    #[test]
    fn force_without_max_configs_lifts_the_cap() {
        let cli = parse(&["cppscan", "--force", "f.cpp"]).unwrap();
        let (settings, _, _) = cli.into_settings().unwrap();
        assert_eq!(settings.max_configs, usize::MAX);
    }

    #[test]
    fn force_with_explicit_max_configs_keeps_it() {
        let cli = parse(&["cppscan", "--force", "--max-configs=2", "f.cpp"]).unwrap();
        let (settings, _, _) = cli.into_settings().unwrap();
        assert_eq!(settings.max_configs, 2);
    }
}
