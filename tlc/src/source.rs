//! Types related to source files.

use std::fmt;
use std::ops::Range;

/// File id, as handed out by [`codespan_reporting::files::SimpleFiles`].
pub type FileId = usize;

/// Byte offsets into source files.
pub type BytePos = u32;

/// The largest schema that can be addressed by a [`BytePos`].
pub const MAX_SOURCE_LEN: usize = u32::MAX as usize;

/// Byte ranges in source files.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ByteRange {
    start: BytePos,
    end: BytePos,
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRange({}..{})", self.start, self.end)
    }
}

impl ByteRange {
    pub const fn new(start: BytePos, end: BytePos) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<ByteRange> for Range<usize> {
    fn from(range: ByteRange) -> Self {
        (range.start as usize)..(range.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// `ByteRange` is stored on every combinator. Ensure it doesn't grow accidentally.
    fn byte_range_size() {
        assert_eq!(std::mem::size_of::<ByteRange>(), 8);
    }

    #[test]
    fn merge_covers_both() {
        let range = ByteRange::new(4, 9).merge(ByteRange::new(1, 6));
        assert_eq!(Range::<usize>::from(range), 1..9);
    }
}
