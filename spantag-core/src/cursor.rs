/// Line/column view of a document's text for terminal hosts.
///
/// Rows split on `\n` only, so every character of the text (including `\r`)
/// lives on exactly one row and `cursor_to_offset`/`offset_to_cursor` are
/// exact inverses over character offsets.
#[derive(Debug, Clone)]
pub struct CursorState {
    /// Current cursor position (row, col)
    pub row: usize,
    pub col: usize,
    /// Character offset at which each row starts
    line_starts: Vec<usize>,
    lines: Vec<Vec<char>>,
    total: usize,
}

impl CursorState {
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            line_starts: vec![0],
            lines: vec![Vec::new()],
            total: 0,
        }
    }

    /// Load content and compute row offsets
    pub fn set_content(&mut self, content: &str) {
        self.lines = content.split('\n').map(|l| l.chars().collect()).collect();
        self.line_starts.clear();

        let mut offset = 0;
        for line in &self.lines {
            self.line_starts.push(offset);
            offset += line.len() + 1;
        }
        self.total = offset.saturating_sub(1);

        self.row = 0;
        self.col = 0;
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Absolute offset of the cursor
    pub fn offset(&self) -> usize {
        self.cursor_to_offset(self.row, self.col)
    }

    /// Convert (row, col) to a character offset, clamping to the text
    pub fn cursor_to_offset(&self, row: usize, col: usize) -> usize {
        match self.line_starts.get(row) {
            Some(&start) => start + col.min(self.line_len(row)),
            None => self.total,
        }
    }

    /// Convert a character offset to (row, col)
    pub fn offset_to_cursor(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.total);
        let row = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        (row, offset - self.line_starts[row])
    }

    pub fn set_cursor_offset(&mut self, offset: usize) {
        let (row, col) = self.offset_to_cursor(offset);
        self.row = row;
        self.col = col;
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(Vec::len).unwrap_or(0)
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    /// Move right; the column may rest one past the last character so a
    /// selection can include the end of a line.
    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_to_start(&mut self) {
        self.col = 0;
    }

    pub fn move_to_end(&mut self) {
        self.col = self.line_len(self.row);
    }

    pub fn move_to_top(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    pub fn move_to_bottom(&mut self) {
        self.row = self.lines.len().saturating_sub(1);
        self.col = self.line_len(self.row);
    }

    /// Jump to the end of the current or next word
    pub fn move_word_forward(&mut self) {
        let Some(chars) = self.lines.get(self.row) else {
            return;
        };
        let mut col = self.col;

        while col < chars.len() && chars[col].is_whitespace() {
            col += 1;
        }
        while col < chars.len() && !chars[col].is_whitespace() {
            col += 1;
        }

        if col == self.col && self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        } else {
            self.col = col;
        }
    }

    /// Jump to the start of the current or previous word
    pub fn move_word_back(&mut self) {
        if self.col == 0 {
            if self.row > 0 {
                self.row -= 1;
                self.col = self.line_len(self.row);
            }
            return;
        }

        let Some(chars) = self.lines.get(self.row) else {
            return;
        };
        let mut col = self.col.min(chars.len());

        while col > 0 && chars[col - 1].is_whitespace() {
            col -= 1;
        }
        while col > 0 && !chars[col - 1].is_whitespace() {
            col -= 1;
        }

        self.col = col;
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new()
    }
}
