//! Diagnostic - rustc-style error reporting
//!
//! A diagnostic carries:
//! - A severity and an error code (ET001, EN003, ...)
//! - Labels pointing into the source
//! - Notes and fix suggestions

use crate::span::Span;
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Fatal - compilation stops at the first one
    Error,
    /// Soft condition - the construct is skipped and compilation continues
    Warning,
    Note,
    Help,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Note => "note",
            Level::Help => "help",
        }
    }

    /// ANSI color for the level header
    pub fn color_code(&self) -> &'static str {
        match self {
            Level::Error => "\x1b[1;31m",
            Level::Warning => "\x1b[1;33m",
            Level::Note => "\x1b[1;36m",
            Level::Help => "\x1b[1;32m",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fix suggestion
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub span: Option<Span>,
    pub replacement: Option<String>,
}

impl Suggestion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, span: Span, replacement: impl Into<String>) -> Self {
        self.span = Some(span);
        self.replacement = Some(replacement.into());
        self
    }
}

/// A label pointing at a region of the source
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            primary: false,
        }
    }
}

/// Structured error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (T = types, N = names and declarations, S = structure)
    pub category: char,
    pub number: u16,
}

impl ErrorCode {
    pub const fn new(category: char, number: u16) -> Self {
        Self { category, number }
    }

    // Type errors
    pub const TYPE_MISMATCH: Self = Self::new('T', 1);
    pub const UNKNOWN_TYPE: Self = Self::new('T', 2);
    pub const CANNOT_INFER: Self = Self::new('T', 3);
    pub const UNSUPPORTED_OPERATOR: Self = Self::new('T', 4);
    pub const INVALID_CONDITION: Self = Self::new('T', 5);
    pub const VOID_VALUE: Self = Self::new('T', 6);
    pub const NOT_A_SCALAR: Self = Self::new('T', 7);

    // Name resolution and declaration errors
    pub const UNKNOWN_VARIABLE: Self = Self::new('N', 1);
    pub const UNKNOWN_FUNCTION: Self = Self::new('N', 2);
    pub const UNKNOWN_CLASS: Self = Self::new('N', 3);
    pub const UNKNOWN_MEMBER: Self = Self::new('N', 4);
    pub const UNKNOWN_METHOD: Self = Self::new('N', 5);
    pub const DUPLICATE_VARIABLE: Self = Self::new('N', 6);
    pub const DUPLICATE_FUNCTION: Self = Self::new('N', 7);
    pub const DUPLICATE_CLASS: Self = Self::new('N', 8);
    pub const DUPLICATE_PARAMETER: Self = Self::new('N', 9);
    pub const DUPLICATE_FIELD: Self = Self::new('N', 10);

    // Structural errors
    pub const MALFORMED_TREE: Self = Self::new('S', 1);
    pub const INVALID_PLACEMENT: Self = Self::new('S', 2);
    pub const ARITY_MISMATCH: Self = Self::new('S', 3);
    pub const INVALID_AGGREGATE: Self = Self::new('S', 4);
    pub const ENGINE_INVARIANT: Self = Self::new('S', 5);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}{:03}", self.category, self.number)
    }
}

/// A complete diagnostic
#[derive(Debug, Clone, thiserror::Error)]
#[error("{level}: {message}")]
pub struct Diagnostic {
    pub level: Level,
    pub code: Option<ErrorCode>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestions: Vec<Suggestion>,
}

impl Diagnostic {
    fn with_level(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(Level::Warning, message)
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.suggestions.push(Suggestion::new(help));
        self
    }

    /// Source line of the primary label, if any
    pub fn line(&self) -> Option<u32> {
        self.labels
            .iter()
            .find(|l| l.primary)
            .map(|l| l.span.start.line)
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

/// Source files known to the driver, for rendering snippets
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Text of a 1-indexed line, without its newline
    pub fn get_line(&self, line: u32) -> Option<&str> {
        let idx = line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e.saturating_sub(1))
            .unwrap_or(self.source.len());

        self.source.get(start..end)
    }
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> u32 {
        let id = self.files.len() as u32;
        self.files.push(SourceFile::new(name, source));
        id
    }

    pub fn get(&self, id: u32) -> Option<&SourceFile> {
        self.files.get(id as usize)
    }
}

/// Renders diagnostics for a terminal
pub struct DiagnosticRenderer<'a> {
    cache: &'a SourceCache,
    use_colors: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(cache: &'a SourceCache) -> Self {
        Self {
            cache,
            use_colors: true,
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.use_colors {
            code
        } else {
            ""
        }
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let reset = self.paint("\x1b[0m");
        let bold = self.paint("\x1b[1m");
        let blue = self.paint("\x1b[1;34m");
        let color = self.paint(diagnostic.level.color_code());

        let mut out = String::new();
        out.push_str(color);
        out.push_str(diagnostic.level.as_str());
        if let Some(code) = &diagnostic.code {
            out.push_str(&format!("[{}]", code));
        }
        out.push_str(&format!("{}{}: {}{}\n", reset, bold, diagnostic.message, reset));

        for label in &diagnostic.labels {
            let line = label.span.start.line;
            let Some(file) = self.cache.get(label.span.file_id) else {
                // No source text: still point at the line
                out.push_str(&format!(" {}-->{} line {}\n", blue, reset, line));
                continue;
            };

            out.push_str(&format!(
                " {}-->{} {}:{}:{}\n",
                blue, reset, file.name, line, label.span.start.column
            ));

            if let Some(text) = file.get_line(line) {
                let padding = " ".repeat(line.to_string().len());
                let col = label.span.start.column.max(1) as usize;
                let width = if label.span.start.line == label.span.end.line {
                    label.span.end.column.saturating_sub(label.span.start.column).max(1) as usize
                } else {
                    text.len().saturating_sub(col - 1).max(1)
                };
                let marker = if label.primary { '^' } else { '-' };
                let label_color = if label.primary { color } else { blue };

                out.push_str(&format!(" {} {}|{}\n", padding, blue, reset));
                out.push_str(&format!(" {}{}{} |{} {}\n", blue, line, reset, reset, text));
                out.push_str(&format!(
                    " {} {}|{} {}{}{}{} {}\n",
                    padding,
                    blue,
                    reset,
                    " ".repeat(col - 1),
                    label_color,
                    marker.to_string().repeat(width),
                    reset,
                    label.message
                ));
            }
        }

        for note in &diagnostic.notes {
            out.push_str(&format!("  = {}note{}: {}\n", bold, reset, note));
        }

        let green = self.paint("\x1b[1;32m");
        for suggestion in &diagnostic.suggestions {
            out.push_str(&format!("  = {}help{}: {}\n", green, reset, suggestion.message));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_with_source() {
        let mut cache = SourceCache::new();
        let file_id = cache.add("prog.rl", "int x = 2;\nbool y = x;");

        let span = Span::new(Position::new(2, 10, 20), Position::new(2, 11, 21), file_id);
        let diagnostic = Diagnostic::error("type mismatch: `int` != `bool`")
            .with_code(ErrorCode::TYPE_MISMATCH)
            .with_label(span, "expected `bool`")
            .with_help("declare `y` as `int`");

        let output = DiagnosticRenderer::new(&cache).without_colors().render(&diagnostic);

        assert!(output.starts_with("error[ET001]: type mismatch"));
        assert!(output.contains("prog.rl:2:10"));
        assert!(output.contains("bool y = x;"));
        assert!(output.contains("help: declare `y` as `int`"));
    }

    #[test]
    fn test_render_without_source_points_at_line() {
        let cache = SourceCache::new();
        let diagnostic = Diagnostic::warning("variable `q` not found")
            .with_code(ErrorCode::UNKNOWN_VARIABLE)
            .with_label(Span::line(4), "skipped");

        let output = DiagnosticRenderer::new(&cache).without_colors().render(&diagnostic);
        assert_eq!(output, "warning[EN001]: variable `q` not found\n --> line 4\n");
    }

    #[test]
    fn test_primary_line() {
        let diagnostic = Diagnostic::error("boom")
            .with_secondary_label(Span::line(1), "first seen here")
            .with_label(Span::line(9), "here");
        assert_eq!(diagnostic.line(), Some(9));
        assert_eq!(diagnostic.to_string(), "error: boom");
    }
}
