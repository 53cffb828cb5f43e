//! Status bar: server, realtime link, router role, and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::{ClientState, LinkStatus};
use crate::router::RoleDisplay;
use crate::theme::{
    C_ACCENT, C_CONNECTING, C_MODE_FILTER, C_MODE_INPUT, C_MODE_NORMAL, C_MUTED, C_ONLINE,
    C_ROUTER, C_SECONDARY, C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    /// Typing into a form field.
    Input,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "FILTER",
            Self::Input => "INPUT",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
            Self::Input => C_MODE_INPUT,
        }
    }
}

/// Connection line: link dot, endpoint, user, router holder and own role.
pub fn draw_status(frame: &mut Frame, area: Rect, state: &ClientState) {
    let (dot, dot_color) = match state.link {
        LinkStatus::Online => ("●", C_ONLINE),
        LinkStatus::Connecting => ("◌", C_CONNECTING),
        LinkStatus::Offline => ("○", C_ACCENT),
    };

    let mut spans = vec![
        Span::styled(dot, Style::default().fg(dot_color)),
        Span::raw(" "),
        Span::styled(state.endpoint.as_str(), Style::default().fg(C_SECONDARY)),
    ];

    if let Some(session) = &state.session {
        spans.push(Span::styled("  │ ", Style::default().fg(C_SEPARATOR)));
        spans.push(Span::styled(
            format!("{} ({})", session.username, session.level_label()),
            Style::default().fg(C_SECONDARY),
        ));
    }

    spans.push(Span::styled("  │ router: ", Style::default().fg(C_SEPARATOR)));
    spans.push(Span::styled(
        state.router.holder().unwrap_or("nobody").to_string(),
        Style::default().fg(C_ROUTER),
    ));

    if state.can_route() {
        let (label, style) = role_badge(state.router.is_router(), state.router.display());
        spans.push(Span::raw("  "));
        spans.push(Span::styled(label, style));
    }

    if state.musician_mode {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("♪ chords", Style::default().fg(C_MODE_FILTER)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn role_badge(is_router: bool, display: RoleDisplay) -> (String, Style) {
    let base = if is_router { "[ROUTER]" } else { "[listener]" };
    let color = if is_router { C_ROUTER } else { C_MUTED };
    match display {
        RoleDisplay::Settled => (
            base.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        RoleDisplay::Pending { lit: true } => (base.to_string(), Style::default().fg(color)),
        RoleDisplay::Pending { lit: false } => (" ".repeat(base.len()), Style::default()),
        RoleDisplay::Unconfirmed => (format!("{base}?"), Style::default().fg(C_CONNECTING)),
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, keys: &str) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(keys.to_string(), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}
