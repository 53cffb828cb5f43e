//! Server address screen: manual entry or QR scan.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::action::Action;
use crate::app_state::ClientState;
use crate::component::Component;
use crate::theme::{style_accent, style_focused_border, style_muted, style_secondary, C_PRIMARY};
use crate::widgets::status_bar::InputMode;

const SCAN_SPINNER: &[&str] = &["◐", "◓", "◑", "◒"];

#[derive(Default)]
pub struct IpConfigPanel {
    input: Input,
    frame: usize,
}

impl IpConfigPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently in the address field.
    pub fn value(&self) -> &str {
        self.input.value()
    }
}

impl Component for IpConfigPanel {
    fn handle_key(&mut self, key: KeyEvent, state: &ClientState) -> Vec<Action> {
        if state.screen.is_scanning() {
            return match key.code {
                KeyCode::Esc => vec![Action::CancelScan],
                _ => vec![],
            };
        }
        match key.code {
            KeyCode::Enter => vec![Action::SaveAddress(self.input.value().to_string())],
            KeyCode::Esc => vec![Action::CloseSettings],
            KeyCode::F(3) => vec![Action::StartScan],
            _ => {
                self.input.handle_event(&Event::Key(key));
                vec![]
            }
        }
    }

    /// Seeds the field from the current address, including right after a
    /// scan has replaced it. Typed text survives the start of a scan.
    fn on_enter(&mut self, state: &ClientState) {
        if !state.screen.is_scanning() {
            self.input = Input::new(state.address.clone());
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &ClientState) {
        let width = area.width.min(60);
        let x = area.x + (area.width - width) / 2;
        let height = 9.min(area.height);
        let y = area.y + area.height.saturating_sub(height) / 2;
        let panel = Rect {
            x,
            y,
            width,
            height,
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(panel);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" server address ")
            .border_style(style_focused_border());
        let inner_width = rows[0].width.saturating_sub(2) as usize;
        let scroll = self.input.visual_scroll(inner_width);
        let shown: String = self.input.value().chars().skip(scroll).collect();
        frame.render_widget(
            Paragraph::new(Span::styled(shown, Style::default().fg(C_PRIMARY))).block(block),
            rows[0],
        );

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("current endpoint {}", state.endpoint),
                style_muted(),
            )),
            rows[1],
        );

        let help = if state.screen.is_scanning() {
            self.frame = (self.frame + 1) % SCAN_SPINNER.len();
            Line::from(vec![
                Span::styled(SCAN_SPINNER[self.frame], style_accent()),
                Span::styled(
                    " scanning: point the camera at the server's QR code (Esc cancels)",
                    style_secondary(),
                ),
            ])
        } else {
            let x = rows[0].x + 1 + self.input.visual_cursor().saturating_sub(scroll) as u16;
            let max_x = rows[0].x + rows[0].width.saturating_sub(2);
            frame.set_cursor_position((x.min(max_x), rows[0].y + 1));
            let scan = if state.scanner_ready {
                "F3 scan a QR code"
            } else {
                "QR scanner not installed"
            };
            Line::from(Span::styled(
                format!("host (default port is added) or full URL  ·  {scan}"),
                style_secondary(),
            ))
        };
        frame.render_widget(Paragraph::new(help).wrap(Wrap { trim: true }), rows[2]);
    }

    fn input_mode(&self, state: &ClientState) -> InputMode {
        if state.screen.is_scanning() {
            InputMode::Normal
        } else {
            InputMode::Input
        }
    }

    fn keys_hint(&self, state: &ClientState) -> &'static str {
        if state.screen.is_scanning() {
            "Esc cancel scan"
        } else {
            "Enter save  F3 scan QR  Esc back"
        }
    }
}
