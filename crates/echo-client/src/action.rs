//! Action enum: every user intent the core understands.
//!
//! Components translate keys into Actions; the App hands them to the core.

use echo_proto::protocol::SongId;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Session ──────────────────────────────────────────────────────────────
    SubmitLogin { username: String, password: String },
    /// Back to the login screen; the current channel stays until the next login.
    SwitchUser,

    // ── Server address ───────────────────────────────────────────────────────
    OpenSettings,
    CloseSettings,
    SaveAddress(String),
    StartScan,
    CancelScan,

    // ── Catalog ──────────────────────────────────────────────────────────────
    FilterChanged(String),
    RefreshCatalog,
    OpenSong(SongId),
    Back,

    // ── Role / display ───────────────────────────────────────────────────────
    ToggleRouter,
    ToggleMusicianMode,

    // ── System ───────────────────────────────────────────────────────────────
    Tick,
    Quit,
}
