//! Login form: username and password.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::action::Action;
use crate::app_state::ClientState;
use crate::component::Component;
use crate::theme::{
    style_focused_border, style_muted, style_secondary, style_unfocused_border, C_PRIMARY,
};
use crate::widgets::status_bar::InputMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

pub struct LoginForm {
    username: Input,
    password: Input,
    focus: Field,
}

impl LoginForm {
    pub fn new() -> Self {
        Self {
            username: Input::default(),
            password: Input::default(),
            focus: Field::Username,
        }
    }

    fn focused_input(&mut self) -> &mut Input {
        match self.focus {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }

    fn swap_focus(&mut self) {
        self.focus = match self.focus {
            Field::Username => Field::Password,
            Field::Password => Field::Username,
        };
    }

    fn draw_field(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        input: &Input,
        field: Field,
        masked: bool,
    ) {
        let focused = self.focus == field;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {title} "))
            .border_style(if focused {
                style_focused_border()
            } else {
                style_unfocused_border()
            });
        let inner_width = area.width.saturating_sub(2) as usize;
        let scroll = input.visual_scroll(inner_width);
        let shown: String = if masked {
            "•".repeat(input.value().chars().count().saturating_sub(scroll))
        } else {
            input.value().chars().skip(scroll).collect()
        };
        let paragraph =
            Paragraph::new(Span::styled(shown, Style::default().fg(C_PRIMARY))).block(block);
        frame.render_widget(paragraph, area);

        if focused {
            let x = area.x + 1 + input.visual_cursor().saturating_sub(scroll) as u16;
            frame.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
        }
    }
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for LoginForm {
    fn handle_key(&mut self, key: KeyEvent, state: &ClientState) -> Vec<Action> {
        match key.code {
            KeyCode::F(2) => vec![Action::OpenSettings],
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.swap_focus();
                vec![]
            }
            KeyCode::Enter => {
                if self.focus == Field::Username && self.password.value().is_empty() {
                    self.focus = Field::Password;
                    return vec![];
                }
                if state.login_pending {
                    return vec![];
                }
                vec![Action::SubmitLogin {
                    username: self.username.value().to_string(),
                    password: self.password.value().to_string(),
                }]
            }
            _ => {
                self.focused_input().handle_event(&Event::Key(key));
                vec![]
            }
        }
    }

    fn on_enter(&mut self, _state: &ClientState) {
        self.password = Input::default();
        self.focus = if self.username.value().is_empty() {
            Field::Username
        } else {
            Field::Password
        };
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &ClientState) {
        let width = area.width.min(48);
        let x = area.x + (area.width - width) / 2;
        let height = 11.min(area.height);
        let y = area.y + area.height.saturating_sub(height) / 2;
        let form = Rect {
            x,
            y,
            width,
            height,
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(form);

        let title = Line::from(vec![Span::styled(
            "ECHO",
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        )]);
        frame.render_widget(Paragraph::new(title).alignment(Alignment::Center), rows[0]);

        self.draw_field(frame, rows[1], "user", &self.username, Field::Username, false);
        self.draw_field(frame, rows[2], "password", &self.password, Field::Password, true);

        let footer = if state.login_pending {
            Span::styled("signing in…", style_secondary())
        } else {
            Span::styled(format!("server {}", state.endpoint), style_muted())
        };
        frame.render_widget(Paragraph::new(footer).alignment(Alignment::Center), rows[3]);
    }

    fn input_mode(&self, _state: &ClientState) -> InputMode {
        InputMode::Input
    }

    fn keys_hint(&self, _state: &ClientState) -> &'static str {
        "Tab switch field  Enter sign in  F2 server address  Ctrl-C quit"
    }
}
