//! Editable text buffer shared by the compose box, auth form and prompts.

/// Text plus a cursor measured in characters.
#[derive(Debug, Default, Clone)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let end = self.char_to_byte(self.cursor);
            let start = self.char_to_byte(self.cursor - 1);
            self.text.drain(start..end);
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let start = self.char_to_byte(self.cursor);
            let end = self.char_to_byte(self.cursor + 1);
            self.text.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Return the whole text and empty the buffer.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Single-line view of the text, `width` columns wide, scrolled so the
    /// cursor stays visible. Newlines show as " | ". With `mask`, every
    /// character is replaced by it.
    pub fn window(&self, width: usize, mask: Option<char>) -> DisplayText {
        let mut flat: Vec<char> = Vec::with_capacity(self.text.len());
        let mut flat_cursor = 0;
        for (idx, ch) in self.text.chars().enumerate() {
            if idx == self.cursor {
                flat_cursor = flat.len();
            }
            match (ch, mask) {
                (_, Some(m)) => flat.push(m),
                ('\n', None) => flat.extend([' ', '|', ' ']),
                (c, None) => flat.push(c),
            }
        }
        if self.cursor >= self.text.chars().count() {
            flat_cursor = flat.len();
        }

        if width == 0 {
            return DisplayText::default();
        }
        if flat.len() < width {
            return DisplayText {
                visible: flat.into_iter().collect(),
                cursor_offset: flat_cursor,
            };
        }

        // Keep one column free for the cursor at the end.
        let start = (flat_cursor + 1).saturating_sub(width);
        let end = (start + width).min(flat.len());
        DisplayText {
            visible: flat[start..end].iter().collect(),
            cursor_offset: flat_cursor - start,
        }
    }
}

/// The visible slice of an input and the cursor column within it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DisplayText {
    pub visible: String,
    pub cursor_offset: usize,
}
