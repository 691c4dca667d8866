//! Editable input buffer with a caret
//!
//! The caret is a character offset, not a byte offset, so it survives
//! multi-byte input such as `λ`.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    /// Caret position in characters
    caret: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    #[allow(dead_code)]
    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of characters in the buffer
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Insert a character at the caret and step past it
    pub fn insert(&mut self, ch: char) {
        let at = self.byte_offset(self.caret);
        self.text.insert(at, ch);
        self.caret += 1;
    }

    /// Insert a whole string at the caret
    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_offset(self.caret);
        self.text.insert_str(at, s);
        self.caret += s.chars().count();
    }

    /// Replace the content, leaving the caret at the end
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.caret = self.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.caret = 0;
    }

    /// Take the content, leaving the buffer empty
    pub fn take(&mut self) -> String {
        self.caret = 0;
        std::mem::take(&mut self.text)
    }

    /// Delete the character before the caret
    pub fn backspace(&mut self) {
        if self.caret == 0 {
            return;
        }
        self.caret -= 1;
        let at = self.byte_offset(self.caret);
        self.text.remove(at);
    }

    /// Delete the character under the caret
    pub fn delete(&mut self) {
        if self.caret < self.len() {
            let at = self.byte_offset(self.caret);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.caret = self.caret.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.caret < self.len() {
            self.caret += 1;
        }
    }

    /// Move to the start of the caret's line
    pub fn move_line_start(&mut self) {
        let before: Vec<char> = self.text.chars().take(self.caret).collect();
        self.caret = match before.iter().rposition(|&c| c == '\n') {
            Some(nl) => nl + 1,
            None => 0,
        };
    }

    /// Move to the end of the caret's line
    pub fn move_line_end(&mut self) {
        let after = self.text.chars().skip(self.caret).take_while(|&c| c != '\n').count();
        self.caret += after;
    }

    /// Caret as (line, column) in characters
    pub fn caret_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for ch in self.text.chars().take(self.caret) {
            if ch == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}
