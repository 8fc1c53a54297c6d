//! Project configuration file (`.cppscan.toml`).
//!
//! Discovered by walking from the working directory up to the nearest `.git`
//! root (or the filesystem root). CLI flags always override file settings.
//!
//! ```toml
//! defines = ["DEBUG", "VERSION=2"]
//! include-paths = ["include", "third_party/include"]
//! enable = ["style", "performance"]
//! platform = "unix64"
//! suppress = ["memleak:legacy/old.c"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::settings::{Platform, Settings};
use crate::suppressions::Suppressions;

pub const CONFIG_FILE_NAME: &str = ".cppscan.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Value(String),
}

/// Settings loadable from `.cppscan.toml`. Everything is optional; absent
/// fields leave the defaults (or the CLI values) untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub undefines: Vec<String>,
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    #[serde(default)]
    pub enable: Vec<String>,
    #[serde(default)]
    pub suppress: Vec<String>,
    pub platform: Option<String>,
    pub max_configs: Option<usize>,
    pub inline_suppressions: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fold the file config into settings and suppressions. CLI-provided
    /// values are already in `settings`; the file only appends list values
    /// and fills scalar options the CLI left at their defaults.
    pub fn apply(
        &self,
        settings: &mut Settings,
        suppressions: &mut Suppressions,
    ) -> Result<(), ConfigError> {
        settings.user_defines.extend(self.defines.iter().cloned());
        settings.user_undefs.extend(self.undefines.iter().cloned());
        settings
            .include_paths
            .extend(self.include_paths.iter().cloned());
        for class in &self.enable {
            settings
                .enable_list(class)
                .map_err(|bad| ConfigError::Value(format!("unknown enable class '{bad}'")))?;
        }
        if let Some(platform) = &self.platform {
            settings.platform = Platform::parse_name(platform)
                .ok_or_else(|| ConfigError::Value(format!("unknown platform '{platform}'")))?;
        }
        if let Some(max) = self.max_configs {
            settings.max_configs = max.max(1);
        }
        if let Some(inline) = self.inline_suppressions {
            settings.inline_suppressions = inline;
        }
        for entry in &self.suppress {
            suppressions
                .parse_line(entry)
                .map_err(|e| ConfigError::Value(format!("bad suppression '{entry}': {e}")))?;
        }
        Ok(())
    }
}

/// Walk from `start` upward, stopping at the first directory containing a
/// config file. The search ends at the first `.git` root (inclusive).
pub fn discover(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errorlogger::{ErrorMessage, Severity};
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn parse_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            defines = ["DEBUG", "LEVEL=2"]
            include-paths = ["include"]
            enable = ["style"]
            platform = "unix64"
            max-configs = 4
            suppress = ["memleak:legacy.c"]
            "#,
        )
        .unwrap();
        let mut settings = Settings::default();
        let mut suppressions = Suppressions::new();
        config.apply(&mut settings, &mut suppressions).unwrap();
        assert_eq!(settings.user_defines, vec!["DEBUG", "LEVEL=2"]);
        assert_eq!(settings.platform, Platform::Unix64);
        assert_eq!(settings.max_configs, 4);
        assert!(suppressions.is_suppressed(&ErrorMessage::at(
            Severity::Error,
            "memleak",
            "x",
            "legacy.c",
            3
        )));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("no-such-key = 1");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_platform_is_an_error() {
        let config: FileConfig = toml::from_str("platform = \"dos\"").unwrap();
        let mut settings = Settings::default();
        let mut suppressions = Suppressions::new();
        assert!(config.apply(&mut settings, &mut suppressions).is_err());
    }

    #[test]
    fn discover_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let mut f = File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(f, "defines = []").unwrap();
        let found = discover(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn discover_stops_at_git_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let nested = repo.join("src");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        // Config above the git root must not be found.
        let mut f = File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(f, "defines = []").unwrap();
        assert!(discover(&nested).is_none());
    }
}
