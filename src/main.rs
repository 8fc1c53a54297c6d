//! cppscan CLI entry point: logging setup, config discovery, file
//! enumeration, and result output.
//!
//! Findings go to stderr (text or XML); progress lines go to stdout.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cppscan::error::exit_code;
use cppscan::{
    discover_config, Analyzer, Cli, ErrorLogger, ErrorMessage, FileConfig, FileLister, FsLister,
    TextLogger, XmlLogger,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set up logging");
        return ExitCode::from(exit_code::INTERNAL_ERROR as u8);
    }

    let config_override = cli.config.clone();
    let skip_config = cli.no_config;
    let errorlist = cli.errorlist;
    let suppressions_list = cli.suppressions_list.clone();

    let (mut settings, paths, mut suppressions) = match cli.into_settings() {
        Ok(parts) => parts,
        Err(message) => {
            eprintln!("cppscan: {message}");
            return ExitCode::from(exit_code::CONFIG_ERROR as u8);
        }
    };

    // Project config file, unless disabled.
    if !skip_config {
        let config_path = config_override.or_else(|| {
            std::env::current_dir()
                .ok()
                .and_then(|cwd| discover_config(&cwd))
        });
        if let Some(path) = config_path {
            match FileConfig::load(&path) {
                Ok(config) => {
                    if let Err(err) = config.apply(&mut settings, &mut suppressions) {
                        eprintln!("cppscan: {err}");
                        return ExitCode::from(exit_code::CONFIG_ERROR as u8);
                    }
                }
                Err(err) => {
                    eprintln!("cppscan: {err}");
                    return ExitCode::from(exit_code::CONFIG_ERROR as u8);
                }
            }
        }
    }

    if let Some(path) = suppressions_list {
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                if let Err(err) = suppressions.parse_file(&content) {
                    eprintln!("cppscan: bad suppressions file {}: {err}", path.display());
                    return ExitCode::from(exit_code::CONFIG_ERROR as u8);
                }
            }
            Err(err) => {
                eprintln!("cppscan: cannot read {}: {err}", path.display());
                return ExitCode::from(exit_code::CONFIG_ERROR as u8);
            }
        }
    }

    let mut analyzer = Analyzer::new(settings.clone()).with_suppressions(suppressions);

    if errorlist {
        let mut xml = XmlLogger::new(io::stdout(), settings.xml_version.max(2));
        xml.open();
        analyzer.error_messages(&mut xml);
        xml.close();
        return ExitCode::from(exit_code::CLEAN as u8);
    }

    // Expand directory arguments into source files.
    let lister = FsLister;
    let mut files: Vec<(String, Option<String>)> = Vec::new();
    for path in &paths {
        let expanded = lister.list(path, true);
        if expanded.is_empty() {
            eprintln!("cppscan: no source files found in '{}'", path.display());
        }
        for file in expanded {
            files.push((file.display().to_string(), None));
        }
    }
    if files.is_empty() {
        return ExitCode::from(exit_code::CONFIG_ERROR as u8);
    }

    let count = if settings.xml {
        let mut logger = XmlLogger::new(io::stderr(), settings.xml_version);
        logger.open();
        let count = analyzer.check(&files, &lister, &mut logger);
        logger.close();
        count
    } else {
        let mut logger = CliLogger::new(settings.template.clone(), settings.quiet);
        analyzer.check(&files, &lister, &mut logger)
    };

    ExitCode::from(count.min(255) as u8)
}

/// Findings to stderr, progress to stdout.
struct CliLogger {
    errors: TextLogger<io::Stderr>,
    quiet: bool,
}

impl CliLogger {
    fn new(template: Option<String>, quiet: bool) -> Self {
        CliLogger {
            errors: TextLogger::new(io::stderr(), template, quiet),
            quiet,
        }
    }
}

impl ErrorLogger for CliLogger {
    fn report_err(&mut self, msg: &ErrorMessage) {
        self.errors.report_err(msg);
    }

    fn report_out(&mut self, line: &str) {
        if !self.quiet {
            let mut stdout = io::stdout();
            let _ = writeln!(stdout, "{line}");
        }
    }
}
