//! Song detail: lyrics, or chords in musician mode.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::action::Action;
use crate::app_state::ClientState;
use crate::component::Component;
use crate::theme::{style_muted, style_secondary, C_KEY, C_PRIMARY};
use crate::widgets::status_bar::draw_separator;

#[derive(Default)]
pub struct SongView {
    scroll: u16,
}

impl SongView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Component for SongView {
    fn handle_key(&mut self, key: KeyEvent, _state: &ClientState) -> Vec<Action> {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                vec![Action::Back]
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                vec![]
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                vec![]
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                self.scroll = self.scroll.saturating_add(10);
                vec![]
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.scroll = 0;
                vec![]
            }
            KeyCode::Char('m') => vec![Action::ToggleMusicianMode],
            KeyCode::Char('r') => vec![Action::ToggleRouter],
            KeyCode::Char('q') => vec![Action::Quit],
            _ => vec![],
        }
    }

    fn on_enter(&mut self, _state: &ClientState) {
        self.scroll = 0;
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &ClientState) {
        let Some(song) = state.screen.song() else {
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(area);

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", song.title),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            rows[0],
        );

        let mode = if state.musician_mode { "chords" } else { "lyrics" };
        let mut meta = vec![Span::styled(format!(" {}", song.band), style_secondary())];
        if !song.key.is_empty() {
            meta.push(Span::styled(format!("  key {}", song.key), Style::default().fg(C_KEY)));
        }
        meta.push(Span::styled(format!("  · {mode}"), style_muted()));
        frame.render_widget(Paragraph::new(Line::from(meta)), rows[1]);

        draw_separator(frame, rows[2]);

        let body = song.body(state.musician_mode);
        let text = if body.trim().is_empty() {
            Text::from(Span::styled(format!(" (no {mode} for this song)"), style_muted()))
        } else {
            Text::from(body.to_string())
        };
        let line_count = body.lines().count() as u16;
        self.scroll = self.scroll.min(line_count.saturating_sub(1));
        frame.render_widget(
            Paragraph::new(text)
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            rows[3],
        );
    }

    fn keys_hint(&self, state: &ClientState) -> &'static str {
        if state.can_route() {
            "↑↓/jk scroll  m lyrics/chords  r router  Esc back  q quit"
        } else {
            "↑↓/jk scroll  m lyrics/chords  Esc back  q quit"
        }
    }
}
