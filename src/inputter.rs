use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Line editor for the search box. The text may span several lines; the cursor
/// is counted in characters.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl InputResult {
    /// Line and column of the cursor within `input`.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.input.chars().take(self.cursor_pos).collect();
        let line = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|l| l.chars().count())
            .unwrap_or(0);
        (line, col)
    }
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::ALT) => self.insert('\n'),
            (KeyCode::Char('j'), KeyModifiers::CONTROL) => self.insert('\n'),
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Replaces the input and puts the cursor behind it.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = s.chars().count();
    }

    /// Inserts `s` at the cursor. Windows line endings are folded into `\n`.
    pub fn paste(&mut self, s: &str) -> InputResult {
        let text = s.replace("\r\n", "\n").replace('\r', "\n");
        let pos = self.byte_pos();
        self.current_input.insert_str(pos, &text);
        self.cursor_pos += text.chars().count();
        trace!("Pasted {} chars", text.chars().count());
        self.get()
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
        }
    }

    /// Starts a new edit of the current text.
    pub fn resume(&mut self) {
        self.canceled = false;
        self.finished = false;
    }

    pub fn clear(&mut self) {
        self.resume();
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn insert(&mut self, chr: char) -> InputResult {
        let pos = self.byte_pos();
        self.current_input.insert(pos, chr);
        self.cursor_pos += 1;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.cursor_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.cursor_pos = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        match code.as_char() {
            Some(chr) => self.insert(chr),
            None => self.get(),
        }
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(inputter: &mut Inputter, code: KeyCode) -> InputResult {
        inputter.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(inputter: &mut Inputter, s: &str) {
        for chr in s.chars() {
            press(inputter, KeyCode::Char(chr));
        }
    }

    #[test]
    fn typing_and_editing_in_the_middle() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "agx");
        press(&mut inputter, KeyCode::Left);
        press(&mut inputter, KeyCode::Backspace);
        type_str(&mut inputter, "ge");
        let result = press(&mut inputter, KeyCode::Delete);
        assert_eq!(result.input, "age");
        assert_eq!(result.cursor_pos, 3);
        assert!(!result.finished);
    }

    #[test]
    fn multibyte_characters() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "größe");
        press(&mut inputter, KeyCode::Home);
        press(&mut inputter, KeyCode::Right);
        press(&mut inputter, KeyCode::Right);
        press(&mut inputter, KeyCode::Right);
        let result = press(&mut inputter, KeyCode::Backspace);
        assert_eq!(result.input, "grße");
        assert_eq!(result.cursor_pos, 2);
    }

    #[test]
    fn new_lines_and_paste() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "age");
        inputter.read(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        inputter.paste("city\r\nzip");
        let result = inputter.get();
        assert_eq!(result.input, "age\ncity\nzip");
        assert_eq!(result.cursor_line_col(), (2, 3));
        assert!(!result.finished);
    }

    #[test]
    fn enter_finishes_and_escape_cancels() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "a");
        let done = press(&mut inputter, KeyCode::Enter);
        assert!(done.finished && !done.canceled);

        inputter.resume();
        let canceled = press(&mut inputter, KeyCode::Esc);
        assert!(canceled.finished && canceled.canceled);
        assert_eq!(canceled.input, "a");
    }

    #[test]
    fn set_moves_cursor_to_end() {
        let mut inputter = Inputter::default();
        inputter.set("äbc");
        assert_eq!(inputter.get().cursor_pos, 3);
        inputter.clear();
        assert_eq!(inputter.get(), InputResult::default());
    }
}
