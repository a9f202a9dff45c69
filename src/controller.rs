use std::time::Duration;
use tracing::trace;

use crate::domain::{CVConfig, CVError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &CVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, CVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                self.handle_key(key, model.raw_keyevents())
            }
            Event::Paste(text) => Some(Message::Paste(text)),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent, raw: bool) -> Option<Message> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Message::Quit);
        }
        // The search box consumes every key while it is being edited.
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => Some(Message::NextSection),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => Some(Message::PrevSection),
            KeyCode::Char(' ') => Some(Message::TogglePanel),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('/') => Some(Message::EditSearch),
            KeyCode::Char('f') => Some(Message::OpenFilePicker),
            KeyCode::Char('c') | KeyCode::Char('y') => Some(Message::CopyValues),
            KeyCode::Char('r') => Some(Message::Rescan),
            KeyCode::Char('?') => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_navigation_keys() {
        let controller = Controller::new(&CVConfig::default());
        assert_eq!(controller.handle_key(key(KeyCode::Char('q')), false), Some(Message::Quit));
        assert_eq!(controller.handle_key(key(KeyCode::Down), false), Some(Message::MoveDown));
        assert_eq!(
            controller.handle_key(key(KeyCode::Tab), false),
            Some(Message::NextSection)
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('/')), false),
            Some(Message::EditSearch)
        );
        assert_eq!(controller.handle_key(key(KeyCode::F(5)), false), None);
    }

    #[test]
    fn raw_mode_forwards_keys() {
        let controller = Controller::new(&CVConfig::default());
        let q = key(KeyCode::Char('q'));
        assert_eq!(controller.handle_key(q, true), Some(Message::RawKey(q)));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(ctrl_c, true), Some(Message::Quit));
    }
}
