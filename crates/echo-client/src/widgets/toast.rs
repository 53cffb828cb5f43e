//! Toast notification system: transient status messages.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::app_state::{Notice, NoticeLevel};
use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

struct Toast {
    message: String,
    level: NoticeLevel,
    expires: Instant,
}

/// A persistent spinner toast that animates until dismissed.
struct SpinnerToast {
    message: String,
    frame: usize,
}

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    spinner: Option<SpinnerToast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            spinner: None,
            max_visible: 4,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, level: NoticeLevel, duration: Duration) {
        // Remove duplicates (same message)
        let msg = message.into();
        self.toasts.retain(|t| t.message != msg);
        self.toasts.push_back(Toast {
            message: msg,
            level,
            expires: Instant::now() + duration,
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    /// Show a core notice with the duration its level calls for.
    pub fn notice(&mut self, notice: Notice) {
        let secs = match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => 3,
            NoticeLevel::Warning => 4,
            NoticeLevel::Error => 5,
        };
        self.push(notice.message, notice.level, Duration::from_secs(secs));
    }

    /// Start or replace the spinner. It animates on every `tick()` until
    /// `dismiss_spinner` is called.
    pub fn spinner(&mut self, message: impl Into<String>) {
        let message = message.into();
        match self.spinner.as_mut() {
            Some(s) => s.message = message,
            None => {
                self.spinner = Some(SpinnerToast { message, frame: 0 });
            }
        }
    }

    pub fn dismiss_spinner(&mut self) {
        self.spinner = None;
    }

    pub fn has_spinner(&self) -> bool {
        self.spinner.is_some()
    }

    /// Remove expired toasts and advance the spinner frame. Call each tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| t.expires > now);
        if let Some(ref mut s) = self.spinner {
            s.frame = (s.frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty() && self.spinner.is_none()
    }

    /// Render toasts in the top-right corner of `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() {
            return;
        }
        let max_width = (area.width / 2).clamp(30, 60).min(area.width);
        let mut y = area.y + 1;

        if let Some(ref s) = self.spinner {
            let icon = SPINNER_FRAMES[s.frame % SPINNER_FRAMES.len()];
            let text = format!(" {} {} ", icon, &s.message);
            render_line(frame, area, y, max_width, text, Style::default().fg(C_TOAST_INFO));
            y += 1;
        }

        for toast in self.toasts.iter().rev().take(self.max_visible) {
            if y >= area.y + area.height {
                break;
            }
            let (color, icon) = match toast.level {
                NoticeLevel::Info => (C_TOAST_INFO, "·"),
                NoticeLevel::Success => (C_TOAST_SUCCESS, "✓"),
                NoticeLevel::Warning => (C_TOAST_WARNING, "!"),
                NoticeLevel::Error => (C_TOAST_ERROR, "✗"),
            };
            let text = format!(" {} {} ", icon, &toast.message);
            render_line(frame, area, y, max_width, text, Style::default().fg(color));
            y += 1;
        }
    }
}

fn render_line(frame: &mut Frame, area: Rect, y: u16, max_width: u16, text: String, style: Style) {
    if y >= area.y + area.height {
        return;
    }
    let w = (text.chars().count() as u16).min(max_width);
    let x = area.x + area.width.saturating_sub(w + 1);
    let toast_area = Rect {
        x,
        y,
        width: w,
        height: 1,
    };
    frame.render_widget(Clear, toast_area);
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        style.add_modifier(Modifier::BOLD),
    )]));
    frame.render_widget(paragraph, toast_area);
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}
