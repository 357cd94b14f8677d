//! Span - location of a syntax-tree node in the source text
//!
//! The engine never sees source text; spans only travel from the external
//! parser into diagnostics.

/// A position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Line (1-indexed, 0 when unknown)
    pub line: u32,
    /// Column (1-indexed, 0 when unknown)
    pub column: u32,
    /// Byte offset from the beginning of the file
    pub offset: usize,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

/// A region of the source text (start to end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    /// Source file ID, as handed out by `SourceCache::add`
    pub file_id: u32,
}

impl Span {
    pub fn new(start: Position, end: Position, file_id: u32) -> Self {
        Self { start, end, file_id }
    }

    /// A span covering a whole line, for trees built without column data
    pub fn line(line: u32) -> Self {
        let pos = Position::new(line, 1, 0);
        Self::point(pos, 0)
    }

    pub fn point(pos: Position, file_id: u32) -> Self {
        Self {
            start: pos,
            end: pos,
            file_id,
        }
    }

    /// Combines two spans into one that covers both
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(self.file_id, other.file_id, "Cannot merge spans from different files");
        Span {
            start: if self.start.offset <= other.start.offset {
                self.start
            } else {
                other.start
            },
            end: if self.end.offset >= other.end.offset {
                self.end
            } else {
                other.end
            },
            file_id: self.file_id,
        }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for things that carry a location
pub trait Spanned {
    fn span(&self) -> Span;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_keeps_outer_bounds() {
        let a = Span::new(Position::new(1, 1, 0), Position::new(1, 4, 3), 0);
        let b = Span::new(Position::new(2, 1, 10), Position::new(2, 8, 17), 0);

        let merged = b.merge(a);
        assert_eq!(merged.start.line, 1);
        assert_eq!(merged.end.line, 2);
        assert_eq!(merged.len(), 17);
    }

    #[test]
    fn test_line_span() {
        let span = Span::line(7);
        assert_eq!(span.start.line, 7);
        assert!(span.is_empty());
    }
}
