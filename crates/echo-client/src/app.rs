//! App: terminal front end over `ClientCore`.
//!
//! Architecture:
//! - `App` owns the core and one component per screen.
//! - Terminal input is read on a blocking thread and forwarded over a channel.
//! - The core's own queue carries REST completions and realtime pushes.
//! - The loop draws, then awaits whichever arrives first: a key, a core event
//!   or the UI tick. Everything is applied on this one task.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Modifier,
    text::{Line, Span},
    widgets::Paragraph,
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    action::Action,
    app_state::{Screen, ScreenKey},
    component::Component,
    components::{
        ip_config::IpConfigPanel, login::LoginForm, song_list::SongList, song_view::SongView,
    },
    core::{ClientCore, CoreEvent},
    theme::{style_accent, style_muted, style_secondary},
    widgets::{
        status_bar::{draw_keys_bar, draw_separator, draw_status},
        toast::ToastManager,
    },
};

/// Upper bound on queued core events applied between two draws.
const MAX_DRAIN: usize = 256;

pub struct App {
    core: ClientCore,
    login: LoginForm,
    ip_config: IpConfigPanel,
    song_list: SongList,
    song_view: SongView,
    toast: ToastManager,
    /// Screen the components were last prepared for.
    shown: Option<ScreenKey>,
}

impl App {
    pub fn new(core: ClientCore) -> Self {
        Self {
            core,
            login: LoginForm::new(),
            ip_config: IpConfigPanel::new(),
            song_list: SongList::new(),
            song_view: SongView::new(),
            toast: ToastManager::new(),
            shown: None,
        }
    }

    pub async fn run(mut self, core_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, core_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("echo exiting");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut core_rx: mpsc::Receiver<CoreEvent>,
    ) -> anyhow::Result<()> {
        // ── Background task: keyboard events ──────────────────────────────────
        let (term_tx, mut term_rx) = mpsc::channel::<Event>(256);
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if term_tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Intent timeouts, toast expiry and spinner animation.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            self.sync_screen();
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.core.should_quit() {
                break;
            }

            tokio::select! {
                Some(ev) = term_rx.recv() => {
                    needs_redraw = self.handle_terminal_event(ev);
                }

                Some(ev) = core_rx.recv() => {
                    let mut redraw = self.core.handle(ev);
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = core_rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.core.handle(next);
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    self.core.apply(Action::Tick);
                    self.toast.tick();
                    needs_redraw = true;
                }
            }

            self.flush_notices();
        }
        Ok(())
    }

    fn handle_terminal_event(&mut self, ev: Event) -> bool {
        match ev {
            Event::Key(key) => {
                let actions = self.handle_key(key);
                for action in actions {
                    self.core.apply(action);
                    // A screen change must reach the next component before
                    // it sees another action.
                    self.sync_screen();
                }
                true
            }
            Event::Resize(_, _) => true,
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind != KeyEventKind::Press {
            return vec![];
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Action::Quit];
        }
        let state = self.core.state();
        let component: &mut dyn Component = match state.screen {
            Screen::Login => &mut self.login,
            Screen::IpConfig { .. } => &mut self.ip_config,
            Screen::Main => &mut self.song_list,
            Screen::SongDetail(_) => &mut self.song_view,
        };
        component.handle_key(key, state)
    }

    /// Give the newly active screen a chance to reset its editing state.
    /// A scan starting or ending and a swapped song both count as new.
    fn sync_screen(&mut self) {
        let state = self.core.state();
        let current = state.screen.key();
        if self.shown == Some(current) {
            return;
        }
        debug!("screen -> {}", state.screen.name());
        self.shown = Some(current);
        let component: &mut dyn Component = match state.screen {
            Screen::Login => &mut self.login,
            Screen::IpConfig { .. } => &mut self.ip_config,
            Screen::Main => &mut self.song_list,
            Screen::SongDetail(_) => &mut self.song_view,
        };
        component.on_enter(state);
    }

    #[cfg(test)]
    fn ip_config_value(&self) -> &str {
        self.ip_config.value()
    }

    fn flush_notices(&mut self) {
        for notice in self.core.take_notices() {
            self.toast.notice(notice);
        }
        let state = self.core.state();
        if state.login_pending {
            self.toast.spinner("Signing in");
        } else if state.catalog_pending {
            self.toast.spinner("Loading songs");
        } else if self.toast.has_spinner() {
            self.toast.dismiss_spinner();
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let state = self.core.state();

        let mut header = vec![
            Span::styled(" echo ", style_accent().add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}", state.screen.name()), style_secondary()),
        ];
        if state.screen == Screen::Main {
            header.push(Span::styled(
                format!("  {}/{} songs", state.catalog.visible_len(), state.catalog.len()),
                style_muted(),
            ));
        }
        let header = Line::from(header);
        frame.render_widget(Paragraph::new(header), chunks[0]);
        draw_separator(frame, chunks[1]);

        let component: &mut dyn Component = match state.screen {
            Screen::Login => &mut self.login,
            Screen::IpConfig { .. } => &mut self.ip_config,
            Screen::Main => &mut self.song_list,
            Screen::SongDetail(_) => &mut self.song_view,
        };
        component.draw(frame, chunks[2], state);

        draw_status(frame, chunks[3], state);
        let mode = component.input_mode(state);
        draw_keys_bar(frame, chunks[4], mode, component.keys_hint(state));

        self.toast.draw(frame, area);
    }
}
