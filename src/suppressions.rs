//! Diagnostic suppression: `--suppress=id[:file[:line]]` flags, suppression
//! list files, and in-source `// cppcheck-suppress <id>` comments.
//!
//! A suppression always wins: a message matching any suppression entry is
//! dropped even when its class was explicitly enabled.

use crate::error::SuppressionError;
use crate::errorlogger::ErrorMessage;
use crate::preprocessor::InlineSuppression;

/// One suppression rule. Omitted fields match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub id: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Suppression {
    fn matches(&self, msg: &ErrorMessage) -> bool {
        if self.id != msg.id {
            return false;
        }
        let (file, line) = match msg.primary_location() {
            Some(loc) => (loc.file.as_str(), loc.line),
            None => ("", 0),
        };
        if let Some(want_file) = &self.file {
            if want_file != file {
                return false;
            }
        }
        if let Some(want_line) = self.line {
            if want_line != line {
                return false;
            }
        }
        true
    }
}

/// The set of active suppressions for a run.
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    entries: Vec<Suppression>,
}

impl Suppressions {
    pub fn new() -> Self {
        Suppressions::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add one `id[:file[:line]]` entry (the `--suppress=` form).
    pub fn parse_line(&mut self, line: &str) -> Result<(), SuppressionError> {
        let mut parts = line.trim().splitn(3, ':');
        let id = parts.next().unwrap_or("").trim();
        if id.is_empty() {
            return Err(SuppressionError::EmptyId);
        }
        let file = parts.next().map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        let line_no = match parts.next() {
            Some(raw) => {
                let raw = raw.trim();
                Some(
                    raw.parse::<u32>()
                        .map_err(|_| SuppressionError::BadLine(raw.to_string()))?,
                )
            }
            None => None,
        };
        self.entries.push(Suppression {
            id: id.to_string(),
            file,
            line: line_no,
        });
        Ok(())
    }

    /// Parse a suppressions file: one entry per line, `#` comments and blank
    /// lines ignored.
    pub fn parse_file(&mut self, content: &str) -> Result<(), SuppressionError> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.parse_line(line)?;
        }
        Ok(())
    }

    /// Add an inline suppression harvested from a source comment.
    pub fn add_inline(&mut self, inline: &InlineSuppression) {
        self.entries.push(Suppression {
            id: inline.id.clone(),
            file: Some(inline.file.clone()),
            line: Some(inline.line),
        });
    }

    pub fn is_suppressed(&self, msg: &ErrorMessage) -> bool {
        self.entries.iter().any(|s| s.matches(msg))
    }
}
