//! Diagnostics and the sinks they are reported through.
//!
//! Every checker, the preprocessor, and the simplifier emit findings as
//! [`ErrorMessage`] values through the [`ErrorLogger`] trait. Implementations
//! here cover the classic text form, both XML stream versions, and an
//! in-memory collector for tests and for the parallel driver's per-worker
//! batches.

use std::fmt;
use std::io::Write;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Diagnostic severity, as reported to the user. Data, not control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Style,
    Performance,
    Portability,
    Information,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Style => "style",
            Severity::Performance => "performance",
            Severity::Portability => "portability",
            Severity::Information => "information",
            Severity::Debug => "debug",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorMessage
// ---------------------------------------------------------------------------

/// One location in a diagnostic's call stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLocation {
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl FileLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        FileLocation {
            file: file.into(),
            line,
        }
    }
}

/// A single diagnostic: severity, stable id, message text, and the call
/// stack it refers to, innermost location first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub severity: Severity,
    /// Stable id, e.g. `"memleak"`.
    pub id: String,
    /// Short human-readable text.
    pub msg: String,
    /// Longer explanation for the XML `verbose` attribute. Falls back to
    /// `msg` when empty.
    pub verbose: String,
    /// Newest (innermost) location first.
    pub locations: Vec<FileLocation>,
    /// Lower-confidence finding, only emitted with `--inconclusive`.
    pub inconclusive: bool,
}

impl ErrorMessage {
    pub fn new(
        severity: Severity,
        id: impl Into<String>,
        msg: impl Into<String>,
        locations: Vec<FileLocation>,
    ) -> Self {
        let msg = msg.into();
        ErrorMessage {
            severity,
            id: id.into(),
            verbose: msg.clone(),
            msg,
            locations,
            inconclusive: false,
        }
    }

    /// Shorthand for the common one-location case.
    pub fn at(
        severity: Severity,
        id: impl Into<String>,
        msg: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        ErrorMessage::new(severity, id, msg, vec![FileLocation::new(file, line)])
    }

    /// Attach a longer explanation for verbose/XML output.
    pub fn with_verbose(mut self, verbose: impl Into<String>) -> Self {
        self.verbose = verbose.into();
        self
    }

    pub fn inconclusive(mut self) -> Self {
        self.inconclusive = true;
        self
    }

    /// Innermost location, if any.
    pub fn primary_location(&self) -> Option<&FileLocation> {
        self.locations.first()
    }

    /// Classic text rendering: `[file:line]: (severity) message`, with the
    /// outer call-stack locations prepended `[a.c:1] -> [b.c:2]` style when
    /// there is more than one.
    pub fn to_text(&self) -> String {
        match self.locations.len() {
            0 => format!("({}) {}", self.severity, self.msg),
            1 => {
                let loc = &self.locations[0];
                format!("[{}:{}]: ({}) {}", loc.file, loc.line, self.severity, self.msg)
            }
            _ => {
                // Stack is stored newest first; print it caller-to-callee.
                let chain: Vec<String> = self
                    .locations
                    .iter()
                    .rev()
                    .map(|l| format!("[{}:{}]", l.file, l.line))
                    .collect();
                format!("{}: ({}) {}", chain.join(" -> "), self.severity, self.msg)
            }
        }
    }

    /// Render through a user `--template`. Recognized placeholders:
    /// `{file}`, `{line}`, `{severity}`, `{id}`, `{message}`. The shorthand
    /// templates `gcc` and `vs` expand to the usual compiler formats.
    pub fn to_template(&self, template: &str) -> String {
        let expanded = match template {
            "gcc" => "{file}:{line}: {severity}: {message}",
            "vs" => "{file}({line}): {severity}: {message}",
            other => other,
        };
        let (file, line) = match self.primary_location() {
            Some(loc) => (loc.file.as_str(), loc.line),
            None => ("", 0),
        };
        expanded
            .replace("{file}", file)
            .replace("{line}", &line.to_string())
            .replace("{severity}", &self.severity.to_string())
            .replace("{id}", &self.id)
            .replace("{message}", &self.msg)
    }

    /// Flat XML element used by `--xml-version=1`.
    pub fn to_xml_v1(&self) -> String {
        let (file, line) = match self.primary_location() {
            Some(loc) => (loc.file.as_str(), loc.line),
            None => ("", 0),
        };
        format!(
            "    <error file=\"{}\" line=\"{}\" id=\"{}\" severity=\"{}\" msg=\"{}\"/>",
            xml_escape(file),
            line,
            xml_escape(&self.id),
            self.severity,
            xml_escape(&self.msg),
        )
    }

    /// Nested XML element used by `--xml-version=2`: attributes plus one
    /// `<location>` child per stack entry, innermost first.
    pub fn to_xml_v2(&self) -> String {
        let mut out = format!(
            "        <error id=\"{}\" severity=\"{}\" msg=\"{}\" verbose=\"{}\"",
            xml_escape(&self.id),
            self.severity,
            xml_escape(&self.msg),
            xml_escape(if self.verbose.is_empty() {
                &self.msg
            } else {
                &self.verbose
            }),
        );
        if self.inconclusive {
            out.push_str(" inconclusive=\"true\"");
        }
        if self.locations.is_empty() {
            out.push_str("/>");
            return out;
        }
        out.push('>');
        for loc in &self.locations {
            out.push_str(&format!(
                "\n            <location file=\"{}\" line=\"{}\"/>",
                xml_escape(&loc.file),
                loc.line
            ));
        }
        out.push_str("\n        </error>");
        out
    }
}

/// Escape the five XML special characters.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// ErrorLogger trait and sinks
// ---------------------------------------------------------------------------

/// Abstract sink for diagnostics and progress output.
pub trait ErrorLogger {
    /// A finding about the user's code.
    fn report_err(&mut self, msg: &ErrorMessage);

    /// A progress line ("Checking foo.cpp...").
    fn report_out(&mut self, line: &str);
}

/// Collects everything in memory. Used by tests and by the parallel driver
/// to batch one worker's diagnostics before merging.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    pub errors: Vec<ErrorMessage>,
    pub output: Vec<String>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        CollectingLogger::default()
    }

    /// Ids of all collected diagnostics, for terse assertions.
    pub fn ids(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.id.as_str()).collect()
    }
}

impl ErrorLogger for CollectingLogger {
    fn report_err(&mut self, msg: &ErrorMessage) {
        self.errors.push(msg.clone());
    }

    fn report_out(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}

/// Forwards each distinct diagnostic once. Execution-path checks walk both
/// arms of every branch, so the same finding can surface on several paths;
/// this wrapper collapses them.
pub struct DedupLogger<'a> {
    inner: &'a mut dyn ErrorLogger,
    seen: FxHashSet<ErrorMessage>,
}

impl<'a> DedupLogger<'a> {
    pub fn new(inner: &'a mut dyn ErrorLogger) -> Self {
        DedupLogger {
            inner,
            seen: FxHashSet::default(),
        }
    }
}

impl ErrorLogger for DedupLogger<'_> {
    fn report_err(&mut self, msg: &ErrorMessage) {
        if self.seen.insert(msg.clone()) {
            self.inner.report_err(msg);
        }
    }

    fn report_out(&mut self, line: &str) {
        self.inner.report_out(line);
    }
}

/// Formats diagnostics as text lines onto a writer (stderr in the CLI).
pub struct TextLogger<W: Write> {
    writer: W,
    template: Option<String>,
    quiet: bool,
}

impl<W: Write> TextLogger<W> {
    pub fn new(writer: W, template: Option<String>, quiet: bool) -> Self {
        TextLogger {
            writer,
            template,
            quiet,
        }
    }
}

impl<W: Write> ErrorLogger for TextLogger<W> {
    fn report_err(&mut self, msg: &ErrorMessage) {
        let line = match &self.template {
            Some(t) => msg.to_template(t),
            None => msg.to_text(),
        };
        let _ = writeln!(self.writer, "{line}");
    }

    fn report_out(&mut self, line: &str) {
        if !self.quiet {
            let _ = writeln!(self.writer, "{line}");
        }
    }
}

/// Streams diagnostics as an XML document. `open()` writes the header,
/// `close()` the footer; progress output is discarded.
pub struct XmlLogger<W: Write> {
    writer: W,
    version: u8,
}

impl<W: Write> XmlLogger<W> {
    pub fn new(writer: W, version: u8) -> Self {
        XmlLogger { writer, version }
    }

    pub fn open(&mut self) {
        let _ = writeln!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        if self.version >= 2 {
            let _ = writeln!(self.writer, "<results version=\"2\">");
            let _ = writeln!(self.writer, "    <errors>");
        } else {
            let _ = writeln!(self.writer, "<results>");
        }
    }

    pub fn close(&mut self) {
        if self.version >= 2 {
            let _ = writeln!(self.writer, "    </errors>");
        }
        let _ = writeln!(self.writer, "</results>");
    }
}

impl<W: Write> ErrorLogger for XmlLogger<W> {
    fn report_err(&mut self, msg: &ErrorMessage) {
        let element = if self.version >= 2 {
            msg.to_xml_v2()
        } else {
            msg.to_xml_v1()
        };
        let _ = writeln!(self.writer, "{element}");
    }

    fn report_out(&mut self, _line: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ErrorMessage {
        ErrorMessage::at(Severity::Error, "memleak", "Memory leak: p", "test.cpp", 3)
    }

    #[test]
    fn text_form_matches_classic_layout() {
        assert_eq!(sample().to_text(), "[test.cpp:3]: (error) Memory leak: p");
    }

    #[test]
    fn text_form_prints_call_stack_outermost_first() {
        let msg = ErrorMessage::new(
            Severity::Error,
            "bad",
            "boom",
            vec![
                FileLocation::new("inner.h", 7),
                FileLocation::new("outer.cpp", 2),
            ],
        );
        assert_eq!(msg.to_text(), "[outer.cpp:2] -> [inner.h:7]: (error) boom");
    }

    #[test]
    fn gcc_template() {
        assert_eq!(
            sample().to_template("gcc"),
            "test.cpp:3: error: Memory leak: p"
        );
    }

    #[test]
    fn custom_template_placeholders() {
        assert_eq!(
            sample().to_template("{id}|{severity}|{file}|{line}"),
            "memleak|error|test.cpp|3"
        );
    }

    #[test]
    fn xml_v2_nests_locations_innermost_first() {
        let msg = ErrorMessage::new(
            Severity::Warning,
            "w",
            "a \"quoted\" <msg>",
            vec![
                FileLocation::new("a.c", 10),
                FileLocation::new("b.c", 20),
            ],
        );
        let xml = msg.to_xml_v2();
        assert!(xml.contains("msg=\"a &quot;quoted&quot; &lt;msg&gt;\""));
        let first = xml.find("file=\"a.c\"").unwrap();
        let second = xml.find("file=\"b.c\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn xml_escape_covers_all_specials() {
        assert_eq!(xml_escape("<&>'\""), "&lt;&amp;&gt;&apos;&quot;");
    }

    #[test]
    fn xml_logger_writes_header_and_footer() {
        let mut buf = Vec::new();
        {
            let mut logger = XmlLogger::new(&mut buf, 2);
            logger.open();
            logger.report_err(&sample());
            logger.close();
        }
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("<?xml"));
        assert!(out.contains("<results version=\"2\">"));
        assert!(out.contains("id=\"memleak\""));
        assert!(out.trim_end().ends_with("</results>"));
    }
}
