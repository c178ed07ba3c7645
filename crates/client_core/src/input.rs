use shared::protocol::ClientRequest;

use crate::render::Clock;

/// Height cap of the compose field, in text rows.
pub const MAX_COMPOSE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    EmojiButton,
    EmojiPicker,
    Elsewhere,
}

/// Compose field state: text, cursor (in chars), autosized height and the
/// emoji picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputController {
    buffer: String,
    cursor: usize,
    rows: usize,
    emoji_picker_open: bool,
    focused: bool,
}

impl Default for InputController {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            rows: 1,
            emoji_picker_open: false,
            focused: false,
        }
    }
}

impl InputController {
    pub fn value(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_emoji_picker_open(&self) -> bool {
        self.emoji_picker_open
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Replaces the whole field, as an `input` event does. The cursor moves
    /// to the end unless given.
    pub fn set_value(&mut self, value: impl Into<String>, cursor: Option<usize>) {
        self.buffer = value.into();
        let len = self.char_len();
        self.cursor = cursor.map_or(len, |c| c.min(len));
        self.autosize();
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.char_len());
    }

    pub fn insert_text(&mut self, text: &str) {
        let at = self.byte_offset(self.cursor);
        self.buffer.insert_str(at, text);
        self.cursor += text.chars().count();
        self.autosize();
    }

    /// Sends on Enter without Shift; Shift+Enter adds a line.
    pub fn on_key(&mut self, press: KeyPress, clock: &dyn Clock) -> Option<ClientRequest> {
        match press.key {
            Key::Enter if !press.shift => return self.submit(clock),
            Key::Enter => self.insert_text("\n"),
            Key::Char(c) => self.insert_text(c.encode_utf8(&mut [0; 4])),
            Key::Backspace => self.delete_backward(),
        }
        None
    }

    /// Empty or all-whitespace input is left untouched and emits nothing.
    pub fn submit(&mut self, clock: &dyn Clock) -> Option<ClientRequest> {
        let message = self.buffer.trim();
        if message.is_empty() {
            return None;
        }
        let request = ClientRequest::SendMessage {
            message: message.to_string(),
            timestamp: clock.now_hhmm(),
        };
        self.buffer.clear();
        self.cursor = 0;
        self.rows = 1;
        Some(request)
    }

    pub fn toggle_emoji_picker(&mut self) {
        self.emoji_picker_open = !self.emoji_picker_open;
    }

    pub fn insert_emoji(&mut self, glyph: &str) {
        self.insert_text(glyph);
        self.focused = true;
    }

    pub fn on_click(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::EmojiButton => self.toggle_emoji_picker(),
            ClickTarget::EmojiPicker => {}
            ClickTarget::Elsewhere => self.on_click_outside(),
        }
    }

    pub fn on_click_outside(&mut self) {
        self.emoji_picker_open = false;
    }

    fn delete_backward(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_offset(self.cursor - 1);
        let end = self.byte_offset(self.cursor);
        self.buffer.replace_range(start..end, "");
        self.cursor -= 1;
        self.autosize();
    }

    fn autosize(&mut self) {
        let lines = self.buffer.split('\n').count();
        self.rows = lines.clamp(1, MAX_COMPOSE_ROWS);
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(chars)
            .map_or(self.buffer.len(), |(i, _)| i)
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
