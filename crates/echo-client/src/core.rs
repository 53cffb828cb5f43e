//! ClientCore: single owner of all client state.
//!
//! User actions arrive as `Action`s from the front end. Every network call
//! runs in a spawned task that posts its result back as a `CoreEvent` on the
//! core's queue, so REST completions, realtime pushes and key presses are all
//! applied one at a time on the UI loop. Whatever arrives last wins; in-flight
//! requests are never cancelled and late results still apply.
//!
//! Realtime events carry the generation of the channel they came from. Only
//! the current generation is honoured; a replaced channel is silenced even if
//! its task still has frames in the queue.

use std::future::Future;
use std::sync::Arc;

use echo_proto::address::{AddressError, ConnectionDirectory, ServerAddress};
use echo_proto::protocol::{AccessLevel, Inbound, Outbound, Song, SongId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::api::{AuthError, FetchError, SongApi};
use crate::app_state::{ClientState, LinkStatus, Notice, NoticeLevel, Screen, Session};
use crate::realtime::{ChannelEvent, ChannelSlot, RealtimeConnector};
use crate::scanner::{CodeScanner, ScanError};

pub const LOGIN_FAILED: &str = "Connection or credentials failure.";
pub const SCAN_CONNECTED: &str = "Echo server connected!";

// ── CoreEvent ─────────────────────────────────────────────────────────────────

/// All inputs into the core.
#[derive(Debug)]
pub enum CoreEvent {
    /// A user intent from the front end.
    Action(Action),
    LoginFinished {
        username: String,
        result: Result<Option<AccessLevel>, AuthError>,
    },
    CatalogFetched(Result<Vec<Song>, FetchError>),
    /// Hydration of a remote `open_song`.
    SongHydrated {
        song_id: SongId,
        result: Result<Song, FetchError>,
    },
    ScanFinished(Result<String, ScanError>),
    Realtime {
        generation: u64,
        event: ChannelEvent,
    },
}

// ── ClientCore ────────────────────────────────────────────────────────────────

pub struct ClientCore {
    state: ClientState,
    directory: ConnectionDirectory,
    api: Arc<dyn SongApi>,
    connector: Arc<dyn RealtimeConnector>,
    scanner: Arc<dyn CodeScanner>,
    channel: ChannelSlot,
    /// Sender side of our own queue, handed to spawned tasks.
    events: mpsc::Sender<CoreEvent>,
    scan_task: Option<JoinHandle<()>>,
    notices: Vec<Notice>,
    should_quit: bool,
}

impl ClientCore {
    pub fn new(
        directory: ConnectionDirectory,
        api: Arc<dyn SongApi>,
        connector: Arc<dyn RealtimeConnector>,
        scanner: Arc<dyn CodeScanner>,
        events: mpsc::Sender<CoreEvent>,
        musician_mode: bool,
    ) -> Self {
        let state = ClientState::new(
            directory.current().to_string(),
            directory.endpoint(),
            musician_mode,
            scanner.permission(),
        );
        Self {
            state,
            directory,
            api,
            connector,
            scanner,
            channel: ChannelSlot::new(),
            events,
            scan_task: None,
            notices: Vec::new(),
            should_quit: false,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn channel(&self) -> &ChannelSlot {
        &self.channel
    }

    pub fn directory(&self) -> &ConnectionDirectory {
        &self.directory
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Alerts raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Apply one event. Returns `true` when the screen needs a redraw.
    pub fn handle(&mut self, event: CoreEvent) -> bool {
        match event {
            CoreEvent::Action(action) => {
                self.apply(action);
                true
            }
            CoreEvent::LoginFinished { username, result } => {
                self.on_login_finished(username, result);
                true
            }
            CoreEvent::CatalogFetched(result) => {
                self.state.catalog_pending = false;
                match result {
                    Ok(songs) => {
                        info!("catalog: {} songs", songs.len());
                        self.state.catalog.replace(songs);
                    }
                    Err(e) => warn!("catalog fetch failed: {}", e),
                }
                true
            }
            CoreEvent::SongHydrated { song_id, result } => match result {
                Ok(_) if self.state.session.is_none() => {
                    debug!("dropping open_song {} after sign-out", song_id);
                    false
                }
                Ok(song) => {
                    info!("remote open_song {} -> {:?}", song_id, song.title);
                    self.stop_scan();
                    self.state.screen = Screen::SongDetail(song);
                    true
                }
                Err(e) => {
                    warn!("remote open_song {} could not be hydrated: {}", song_id, e);
                    false
                }
            },
            CoreEvent::ScanFinished(result) => self.on_scan_finished(result),
            CoreEvent::Realtime { generation, event } => self.on_realtime(generation, event),
        }
    }

    pub fn apply(&mut self, action: Action) {
        debug!("action {:?} on {}", action, self.state.screen.name());
        match action {
            Action::SubmitLogin { username, password } => self.submit_login(username, password),
            Action::SwitchUser => {
                if matches!(self.state.screen, Screen::Main | Screen::SongDetail(_)) {
                    self.sign_out();
                }
            }
            Action::OpenSettings => {
                if matches!(self.state.screen, Screen::Login | Screen::Main) {
                    self.state.screen = Screen::IpConfig { scanning: false };
                }
            }
            Action::CloseSettings => {
                if matches!(self.state.screen, Screen::IpConfig { .. }) {
                    self.stop_scan();
                    self.close_settings();
                }
            }
            Action::SaveAddress(text) => self.save_address(text),
            Action::StartScan => self.start_scan(),
            Action::CancelScan => {
                if self.state.screen.is_scanning() {
                    self.stop_scan();
                    self.state.screen = Screen::IpConfig { scanning: false };
                }
            }
            Action::FilterChanged(query) => self.state.catalog.set_filter(&query),
            Action::RefreshCatalog => {
                if self.state.session.is_some() {
                    self.fetch_catalog();
                }
            }
            Action::OpenSong(id) => self.open_song(id),
            Action::Back => {
                if matches!(self.state.screen, Screen::SongDetail(_)) {
                    self.state.screen = Screen::Main;
                }
            }
            Action::ToggleRouter => self.toggle_router(),
            Action::ToggleMusicianMode => {
                self.state.musician_mode = !self.state.musician_mode;
            }
            Action::Tick => {
                self.state.router.tick();
            }
            Action::Quit => {
                self.channel.close();
                self.should_quit = true;
            }
        }
    }

    // ── Session ───────────────────────────────────────────────────────────────

    fn submit_login(&mut self, username: String, password: String) {
        if self.state.login_pending {
            debug!("login already in flight");
            return;
        }
        let username = username.trim().to_string();
        let endpoint = self.directory.endpoint();
        info!("login as {:?} via {}", username, endpoint);
        self.state.login_pending = true;
        let api = Arc::clone(&self.api);
        self.spawn_post(async move {
            let result = api.login(&endpoint, &username, &password).await;
            CoreEvent::LoginFinished { username, result }
        });
    }

    fn on_login_finished(&mut self, username: String, result: Result<Option<AccessLevel>, AuthError>) {
        self.state.login_pending = false;
        match result {
            Ok(access_level) => {
                self.state.session = Some(Session {
                    username,
                    access_level,
                });
                self.state.router.reset();
                self.stop_scan();
                self.state.screen = Screen::Main;
                self.open_channel();
                self.fetch_catalog();
            }
            Err(e) => {
                warn!("login failed: {}", e);
                self.notify(NoticeLevel::Error, LOGIN_FAILED);
            }
        }
    }

    /// Back to the login screen with no session. The realtime channel goes
    /// too, so nothing pushed by the server can open a song while logged out.
    fn sign_out(&mut self) {
        info!("signing out {:?}", self.state.username());
        self.state.session = None;
        self.state.router.reset();
        self.channel.close();
        self.state.link = LinkStatus::Offline;
        self.state.screen = Screen::Login;
    }

    fn fetch_catalog(&mut self) {
        self.state.catalog_pending = true;
        let endpoint = self.directory.endpoint();
        let api = Arc::clone(&self.api);
        self.spawn_post(async move { CoreEvent::CatalogFetched(api.fetch_catalog(&endpoint).await) });
    }

    // ── Realtime ──────────────────────────────────────────────────────────────

    fn open_channel(&mut self) {
        let Some(username) = self.state.username().map(str::to_string) else {
            return;
        };
        let url = match self.directory.current().realtime_url(self.directory.default_port()) {
            Ok(url) => url,
            Err(e) => {
                warn!("no realtime channel: {}", e);
                self.channel.close();
                self.state.link = LinkStatus::Offline;
                return;
            }
        };
        let connector = Arc::clone(&self.connector);
        let events = self.events.clone();
        self.channel
            .replace_with(|generation| connector.open(url, &username, generation, events));
        self.state.link = LinkStatus::Connecting;
    }

    fn on_realtime(&mut self, generation: u64, event: ChannelEvent) -> bool {
        if !self.channel.is_current(generation) {
            debug!("dropping event from stale channel gen={}: {:?}", generation, event);
            return false;
        }
        match event {
            ChannelEvent::Connected => self.state.link = LinkStatus::Online,
            ChannelEvent::Disconnected(reason) => {
                debug!("realtime link lost: {}", reason);
                self.state.link = LinkStatus::Connecting;
            }
            ChannelEvent::Inbound(Inbound::RouterClaimed { holder }) => {
                let me = self.state.username().unwrap_or_default().to_string();
                info!("router_claimed holder={:?}", holder);
                return self.state.router.on_claimed(holder, &me);
            }
            ChannelEvent::Inbound(Inbound::OpenSong { song_id }) => {
                self.hydrate(song_id);
                return false;
            }
        }
        true
    }

    fn hydrate(&mut self, song_id: SongId) {
        let endpoint = self.directory.endpoint();
        let api = Arc::clone(&self.api);
        self.spawn_post(async move {
            let result = api.fetch_song(&endpoint, song_id).await;
            CoreEvent::SongHydrated { song_id, result }
        });
    }

    // ── Songs / router ────────────────────────────────────────────────────────

    fn open_song(&mut self, id: SongId) {
        let Some(song) = self.state.catalog.get(id).cloned() else {
            warn!("open_song: {} not in catalog", id);
            return;
        };
        self.state.screen = Screen::SongDetail(song);

        if !self.state.router.is_router() || !self.channel.is_connected() {
            return;
        }
        if let (Some(user), Some(handle)) = (self.state.username(), self.channel.current()) {
            let ev = Outbound::OpenSong {
                song_id: id,
                user: user.to_string(),
            };
            if !handle.send(ev) {
                warn!("open_song broadcast dropped: channel closed");
            }
        }
    }

    fn toggle_router(&mut self) {
        let Some(username) = self.state.username().map(str::to_string) else {
            return;
        };
        if !self.state.can_route() {
            self.notify(NoticeLevel::Warning, "Router mode needs Router access");
            return;
        }
        let Some(handle) = self.channel.current() else {
            warn!("toggle router without a realtime channel");
            return;
        };
        let ev = self.state.router.toggle(&username);
        info!("router -> {}", ev.name());
        if !handle.send(ev) {
            warn!("router event dropped: channel closed");
        }
    }

    // ── Server address ────────────────────────────────────────────────────────

    fn close_settings(&mut self) {
        self.state.screen = if self.state.session.is_some() {
            Screen::Main
        } else {
            Screen::Login
        };
    }

    fn save_address(&mut self, text: String) {
        if !matches!(self.state.screen, Screen::IpConfig { .. }) {
            return;
        }
        match self.directory.save(ServerAddress::new(text)) {
            Ok(()) => {
                self.sync_address();
                self.notify(NoticeLevel::Success, "Server address saved");
                self.stop_scan();
                self.close_settings();
            }
            Err(AddressError::Invalid(_)) => {
                self.notify(NoticeLevel::Warning, "Enter a server address");
            }
            Err(e) => {
                // In-memory address already switched; only persistence failed.
                warn!("{}", e);
                self.sync_address();
                self.notify(NoticeLevel::Error, "Address not saved for next launch");
                self.stop_scan();
                self.close_settings();
            }
        }
    }

    fn sync_address(&mut self) {
        self.state.address = self.directory.current().to_string();
        self.state.endpoint = self.directory.endpoint();
        info!("server endpoint now {}", self.state.endpoint);
    }

    // ── Scanner ───────────────────────────────────────────────────────────────

    fn start_scan(&mut self) {
        if self.state.screen != (Screen::IpConfig { scanning: false }) {
            return;
        }
        if !self.scanner.permission() {
            self.notify(NoticeLevel::Warning, "QR scanner not available");
            return;
        }
        self.state.screen = Screen::IpConfig { scanning: true };
        self.spawn_scan();
    }

    fn spawn_scan(&mut self) {
        let scanner = Arc::clone(&self.scanner);
        let task = self.spawn_post(async move { CoreEvent::ScanFinished(scanner.scan().await) });
        self.scan_task = Some(task);
    }

    fn stop_scan(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
    }

    fn on_scan_finished(&mut self, result: Result<String, ScanError>) -> bool {
        self.scan_task = None;
        if !self.state.screen.is_scanning() {
            debug!("dropping late scan result");
            return false;
        }
        match result {
            Ok(payload) => match self.directory.set_from_scan(&payload) {
                Ok(addr) => {
                    info!("scanned server address {}", addr);
                    self.sync_address();
                    self.state.screen = Screen::IpConfig { scanning: false };
                    self.notify(NoticeLevel::Success, SCAN_CONNECTED);
                }
                Err(AddressError::Invalid(e)) => {
                    // Not a server code; keep the camera open.
                    debug!("{}", e);
                    self.spawn_scan();
                }
                Err(e) => {
                    warn!("{}", e);
                    self.sync_address();
                    self.state.screen = Screen::IpConfig { scanning: false };
                    self.notify(NoticeLevel::Error, "Address not saved for next launch");
                }
            },
            Err(e) => {
                warn!("scan failed: {}", e);
                self.state.screen = Screen::IpConfig { scanning: false };
                self.notify(NoticeLevel::Warning, format!("Scan failed: {e}"));
            }
        }
        true
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }

    /// Run `fut` in the background and post its result onto our queue.
    fn spawn_post<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = CoreEvent> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let event = fut.await;
            if tx.send(event).await.is_err() {
                debug!("core gone; dropping completion");
            }
        })
    }
}
