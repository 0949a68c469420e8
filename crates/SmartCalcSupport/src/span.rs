/// A half-open character range `[start, start + length)` inside one line of text.
///
/// Offsets are byte offsets into the line, so a span can always be used to slice the
/// original text back out (`&line[span.start..span.end()]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextSpan {
    /// Byte offset of the first character covered by the span.
    pub start: usize,
    /// Number of bytes covered by the span.
    pub length: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Builds a span from an inclusive start and an exclusive end offset.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns true when both spans share at least one character.
    pub fn overlaps(&self, other: &TextSpan) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end() && other.start < self.end()
    }

    /// Returns true when `other` lies entirely within this span.
    pub fn contains(&self, other: &TextSpan) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: &TextSpan) -> TextSpan {
        TextSpan::from_bounds(self.start.min(other.start), self.end().max(other.end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let a = TextSpan::new(0, 3);
        assert!(a.overlaps(&TextSpan::new(2, 4)));
        assert!(!a.overlaps(&TextSpan::new(3, 1)));
        assert!(!a.overlaps(&TextSpan::new(1, 0)));
    }

    #[test]
    fn test_cover_and_contains() {
        let covered = TextSpan::new(4, 2).cover(&TextSpan::new(0, 1));
        assert_eq!(covered, TextSpan::new(0, 6));
        assert!(covered.contains(&TextSpan::new(2, 3)));
        assert!(!covered.contains(&TextSpan::new(5, 3)));
    }
}
