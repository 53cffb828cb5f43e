//! ClientState: everything the screens render from.
//!
//! Components read this; only `ClientCore` writes to it.

use echo_proto::catalog::Catalog;
use echo_proto::protocol::{AccessLevel, Song, SongId};

use crate::router::RouterCoordinator;

/// Who is logged in. Lives in memory only.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: String,
    pub access_level: Option<AccessLevel>,
}

impl Session {
    pub fn can_route(&self) -> bool {
        self.access_level.as_ref().is_some_and(AccessLevel::can_route)
    }

    pub fn level_label(&self) -> &str {
        self.access_level.as_ref().map_or("-", AccessLevel::label)
    }
}

/// What the front end must re-prepare for. Changes whenever a scan starts
/// or ends, and when a different song is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKey {
    Login,
    IpConfig { scanning: bool },
    Main,
    SongDetail(SongId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Login,
    IpConfig { scanning: bool },
    Main,
    SongDetail(Song),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Login => "login",
            Screen::IpConfig { scanning: false } => "ip-config",
            Screen::IpConfig { scanning: true } => "scanning",
            Screen::Main => "main",
            Screen::SongDetail(_) => "song",
        }
    }

    pub fn key(&self) -> ScreenKey {
        match self {
            Screen::Login => ScreenKey::Login,
            Screen::IpConfig { scanning } => ScreenKey::IpConfig {
                scanning: *scanning,
            },
            Screen::Main => ScreenKey::Main,
            Screen::SongDetail(song) => ScreenKey::SongDetail(song.id),
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, Screen::IpConfig { scanning: true })
    }

    pub fn song(&self) -> Option<&Song> {
        match self {
            Screen::SongDetail(song) => Some(song),
            _ => None,
        }
    }
}

/// Realtime link as seen by the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Offline,
    Connecting,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing alert, drained by the front end into toasts.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

pub struct ClientState {
    pub screen: Screen,
    pub session: Option<Session>,
    pub catalog: Catalog,
    pub router: RouterCoordinator,
    pub link: LinkStatus,
    pub musician_mode: bool,

    // ── Server ─────────────────────────────────────────────────────────────
    /// Address as typed or scanned.
    pub address: String,
    /// Canonical REST base derived from `address`.
    pub endpoint: String,
    pub scanner_ready: bool,

    // ── In-flight requests ─────────────────────────────────────────────────
    pub login_pending: bool,
    pub catalog_pending: bool,
}

impl ClientState {
    pub fn new(address: String, endpoint: String, musician_mode: bool, scanner_ready: bool) -> Self {
        Self {
            screen: Screen::Login,
            session: None,
            catalog: Catalog::default(),
            router: RouterCoordinator::new(),
            link: LinkStatus::Offline,
            musician_mode,
            address,
            endpoint,
            scanner_ready,
            login_pending: false,
            catalog_pending: false,
        }
    }

    pub fn loading(&self) -> bool {
        self.login_pending || self.catalog_pending
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }

    pub fn can_route(&self) -> bool {
        self.session.as_ref().is_some_and(Session::can_route)
    }
}
