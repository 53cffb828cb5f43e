//! Component trait: the interface every screen implements.
//!
//! - Components own their editing state (text fields, scroll, selection).
//! - They read `ClientState` but never mutate it.
//! - They produce `Vec<Action>`; the App hands those to the core.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::Action;
use crate::app_state::ClientState;
use crate::widgets::status_bar::InputMode;

pub trait Component {
    /// Handle a key event while this screen is showing.
    fn handle_key(&mut self, key: KeyEvent, state: &ClientState) -> Vec<Action>;

    /// Called when the screen becomes the active one.
    fn on_enter(&mut self, _state: &ClientState) {}

    /// Render into `area`.
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &ClientState);

    /// Current input mode, for the footer label.
    fn input_mode(&self, _state: &ClientState) -> InputMode {
        InputMode::Normal
    }

    /// Key hints for the footer.
    fn keys_hint(&self, state: &ClientState) -> &'static str;
}
