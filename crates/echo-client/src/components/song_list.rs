//! Main screen: searchable song list.
//!
//! The filtered view itself lives in the catalog; this component only owns
//! the search bar text and the selection. Selection follows the song id, so
//! narrowing or widening the filter keeps the same song highlighted while it
//! is still visible.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use echo_proto::catalog::Catalog;
use echo_proto::protocol::{Song, SongId};

use crate::action::Action;
use crate::app_state::ClientState;
use crate::component::Component;
use crate::theme::{style_default, style_muted, style_secondary, style_selected_focused, C_KEY};
use crate::widgets::filter_input::{FilterAction, FilterInput};
use crate::widgets::status_bar::InputMode;

pub struct SongList {
    filter: FilterInput,
    selected_id: Option<SongId>,
    list_state: ListState,
}

impl SongList {
    pub fn new() -> Self {
        Self {
            filter: FilterInput::default(),
            selected_id: None,
            list_state: ListState::default(),
        }
    }

    pub fn selected_id(&self) -> Option<SongId> {
        self.selected_id
    }

    /// Re-anchor the selection after the visible list changed.
    fn sync_selection(&mut self, catalog: &Catalog) {
        if catalog.visible_len() == 0 {
            self.list_state.select(None);
            return;
        }
        let pos = self
            .selected_id
            .and_then(|id| catalog.visible_position(id))
            .unwrap_or_else(|| {
                self.list_state
                    .selected()
                    .unwrap_or(0)
                    .min(catalog.visible_len() - 1)
            });
        self.list_state.select(Some(pos));
        self.selected_id = catalog.visible_at(pos).map(|s| s.id);
    }

    fn move_by(&mut self, catalog: &Catalog, delta: isize) {
        let len = catalog.visible_len();
        if len == 0 {
            return;
        }
        let cur = self.list_state.selected().unwrap_or(0) as isize;
        let next = (cur + delta).clamp(0, len as isize - 1) as usize;
        self.list_state.select(Some(next));
        self.selected_id = catalog.visible_at(next).map(|s| s.id);
    }

    fn open_selected(&self) -> Vec<Action> {
        self.selected_id.map(Action::OpenSong).into_iter().collect()
    }
}

impl Default for SongList {
    fn default() -> Self {
        Self::new()
    }
}

fn row(song: &Song, width: usize) -> Line<'static> {
    let key = if song.key.is_empty() {
        String::new()
    } else {
        format!(" [{}]", song.key)
    };
    let band = format!(" · {}", song.band);
    let budget = width.saturating_sub(key.width() + 1);
    let title = truncate(&song.title, budget);
    let band = truncate(&band, budget.saturating_sub(title.width()));
    Line::from(vec![
        Span::styled(format!(" {title}"), style_default()),
        Span::styled(band, style_secondary()),
        Span::styled(key, Style::default().fg(C_KEY)),
    ])
}

fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

impl Component for SongList {
    fn handle_key(&mut self, key: KeyEvent, state: &ClientState) -> Vec<Action> {
        let catalog = &state.catalog;
        self.sync_selection(catalog);

        if self.filter.is_active() {
            return match key.code {
                KeyCode::Up => {
                    self.move_by(catalog, -1);
                    vec![]
                }
                KeyCode::Down => {
                    self.move_by(catalog, 1);
                    vec![]
                }
                _ => match self.filter.handle_key(key) {
                    FilterAction::Changed(q) => vec![Action::FilterChanged(q)],
                    FilterAction::Confirmed | FilterAction::Cancelled => vec![],
                },
            };
        }

        match key.code {
            KeyCode::Char('/') => {
                self.filter.activate();
                vec![]
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_by(catalog, -1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_by(catalog, 1);
                vec![]
            }
            KeyCode::PageUp => {
                self.move_by(catalog, -10);
                vec![]
            }
            KeyCode::PageDown => {
                self.move_by(catalog, 10);
                vec![]
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.move_by(catalog, isize::MIN / 2);
                vec![]
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.move_by(catalog, isize::MAX / 2);
                vec![]
            }
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('m') => vec![Action::ToggleMusicianMode],
            KeyCode::Char('r') => vec![Action::ToggleRouter],
            KeyCode::Char('R') => vec![Action::RefreshCatalog],
            KeyCode::Char('L') => vec![Action::SwitchUser],
            KeyCode::F(2) => vec![Action::OpenSettings],
            KeyCode::Char('q') => vec![Action::Quit],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &ClientState) {
        let catalog = &state.catalog;
        self.sync_selection(catalog);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);

        self.filter.draw(frame, rows[0]);

        if catalog.visible_len() == 0 {
            let msg = if state.catalog_pending {
                "loading songs…".to_string()
            } else if catalog.is_empty() {
                "no songs on this server (R to refresh)".to_string()
            } else {
                format!("no song matches {:?}", catalog.query())
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), rows[1]);
            return;
        }

        let width = rows[1].width as usize;
        let items: Vec<ListItem> = catalog
            .visible()
            .map(|song| ListItem::new(row(song, width)))
            .collect();
        let list = List::new(items).highlight_style(style_selected_focused());
        frame.render_stateful_widget(list, rows[1], &mut self.list_state);
    }

    fn input_mode(&self, _state: &ClientState) -> InputMode {
        if self.filter.is_active() {
            InputMode::Filter
        } else {
            InputMode::Normal
        }
    }

    fn keys_hint(&self, state: &ClientState) -> &'static str {
        if self.filter.is_active() {
            "type to filter  Up/Down move  Enter keep  Esc clear+close"
        } else if state.can_route() {
            "↑↓/jk select  Enter open  / filter  m chords  r router  R refresh  F2 server  L switch user  q quit"
        } else {
            "↑↓/jk select  Enter open  / filter  m chords  R refresh  F2 server  L switch user  q quit"
        }
    }
}
