/// Precomputed line-start table over a text.
///
/// Built once per text and shared by line-addressed chunking, line-number
/// resolution in search results, and line-ranged reads. Offsets are in
/// characters (the unit every public offset in the server uses); byte
/// offsets are kept alongside so slicing stays O(1) per lookup. Lookups are
/// binary searches over the start table.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Char offset of the first character of each line. Always starts with 0.
    starts: Vec<usize>,
    /// Byte offset matching each entry of `starts`.
    byte_starts: Vec<usize>,
    /// Total length of the text in chars.
    len: usize,
    /// Total length of the text in bytes.
    byte_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        let mut byte_starts = vec![0];
        let mut len = 0;
        for (idx, ch) in text.char_indices() {
            len += 1;
            if ch == '\n' {
                starts.push(len);
                byte_starts.push(idx + 1);
            }
        }
        Self {
            starts,
            byte_starts,
            len,
            byte_len: text.len(),
        }
    }

    /// Number of lines. A trailing newline does not open a counted line
    /// unless the text is empty (an empty text has one empty line).
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            return 1;
        }
        if *self.starts.last().expect("non-empty starts") == self.len {
            self.starts.len() - 1
        } else {
            self.starts.len()
        }
    }

    /// Char offset of the first character of `line` (0-indexed).
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line).copied()
    }

    /// Byte offset of the first character of `line` (0-indexed).
    pub fn line_byte_start(&self, line: usize) -> Option<usize> {
        self.byte_starts.get(line).copied()
    }

    /// Char offset one past the last content character of `line`, excluding
    /// the newline itself.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        match self.starts.get(line + 1) {
            Some(next) => Some(next - 1),
            None if start <= self.len => Some(self.len),
            None => None,
        }
    }

    /// Byte offset matching [`Self::line_end`].
    pub fn line_byte_end(&self, line: usize) -> Option<usize> {
        let start = self.line_byte_start(line)?;
        match self.byte_starts.get(line + 1) {
            Some(next) => Some(next - 1),
            None if start <= self.byte_len => Some(self.byte_len),
            None => None,
        }
    }

    /// 0-indexed line containing the character at `offset`.
    pub fn line_for_offset(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insertion) => insertion - 1,
        }
    }

    pub fn text_len(&self) -> usize {
        self.len
    }
}

/// Slice `text` by character offsets. Offsets beyond the end are clamped.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let mut start_byte = None;
    let mut end_byte = text.len();
    for (seen, (idx, _)) in text.char_indices().enumerate() {
        if seen == start {
            start_byte = Some(idx);
        }
        if seen == end {
            end_byte = idx;
            break;
        }
    }
    match start_byte {
        Some(s) => &text[s..end_byte],
        None => "",
    }
}

/// Char count of a string without allocating.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
