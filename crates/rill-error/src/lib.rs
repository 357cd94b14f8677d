//! rill-error - Diagnostics for the Rill IR emitter
//!
//! Every engine action returns [`Result`]; the first fatal [`Diagnostic`]
//! aborts compilation. Soft conditions are collected as warnings in a
//! [`Diagnostics`] list.
//!
//! # Example
//!
//! ```rust
//! use rill_error::{Diagnostic, DiagnosticRenderer, ErrorCode, SourceCache};
//! use rill_error::span::{Position, Span};
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add("prog.rl", "print(q);");
//!
//! let span = Span::new(Position::new(1, 7, 6), Position::new(1, 8, 7), file_id);
//!
//! let diagnostic = Diagnostic::warning("variable `q` not found")
//!     .with_code(ErrorCode::UNKNOWN_VARIABLE)
//!     .with_label(span, "print skipped");
//!
//! let renderer = DiagnosticRenderer::new(&cache);
//! println!("{}", renderer.render(&diagnostic));
//! ```

pub mod diagnostic;
pub mod span;

pub use diagnostic::{
    Diagnostic, DiagnosticRenderer, ErrorCode, Label, Level, SourceCache, SourceFile, Suggestion,
};
pub use span::{Position, Span, Spanned};

/// Result type for operations that may fail with a diagnostic
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Diagnostics accumulated during compilation
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.items.push(Diagnostic::warning(message));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
