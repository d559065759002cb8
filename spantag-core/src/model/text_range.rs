/// Half-open range of character offsets into a document's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this range contains the given offset
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the character at `offset`, clamped to the end of `text`.
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Slice `text` by character offsets. Offsets past the end are clamped.
pub fn char_slice(text: &str, range: TextRange) -> &str {
    let start = byte_index(text, range.start);
    let end = byte_index(text, range.end);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_orders_endpoints() {
        let range = TextRange::new(9, 3);
        assert_eq!(range, TextRange { start: 3, end: 9 });
        assert_eq!(range.len(), 6);
    }

    #[test]
    fn test_overlaps() {
        let a = TextRange::new(0, 5);
        assert!(a.overlaps(&TextRange::new(4, 8)));
        assert!(!a.overlaps(&TextRange::new(5, 8)));
    }

    #[test]
    fn test_char_slice_counts_characters() {
        let text = "naïve café";
        assert_eq!(char_len(text), 10);
        assert_eq!(char_slice(text, TextRange::new(6, 10)), "café");
        assert_eq!(char_slice(text, TextRange::new(6, 99)), "café");
        assert_eq!(char_slice(text, TextRange::new(40, 99)), "");
    }
}
