//! REST bodies and realtime event payloads exchanged with the Echo server.
//!
//! Field names on the wire are the server's (Portuguese) column names; the
//! Rust side uses English names and maps them with `serde(rename)`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::socketio::ProtocolError;

/// Primary key of a song in the server catalog.
pub type SongId = i64;

/// One catalog entry. Owned by the server; the client only holds copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "banda")]
    pub band: String,
    #[serde(rename = "tom", default)]
    pub key: String,
    #[serde(rename = "letra", default)]
    pub lyrics: String,
    #[serde(rename = "cifra", default)]
    pub chords: String,
}

impl Song {
    /// The text shown on the detail screen.
    pub fn body(&self, musician_mode: bool) -> &str {
        if musician_mode {
            &self.chords
        } else {
            &self.lyrics
        }
    }
}

/// Access level reported by `/api/login` (`nivel`).
///
/// Only `Router` changes client behaviour (it unlocks the router toggle);
/// any other level is carried verbatim for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessLevel {
    Router,
    Other(String),
}

impl AccessLevel {
    pub fn can_route(&self) -> bool {
        matches!(self, AccessLevel::Router)
    }

    pub fn label(&self) -> &str {
        match self {
            AccessLevel::Router => "Router",
            AccessLevel::Other(s) => s,
        }
    }
}

impl From<String> for AccessLevel {
    fn from(s: String) -> Self {
        if s == "Router" {
            AccessLevel::Router
        } else {
            AccessLevel::Other(s)
        }
    }
}

impl From<AccessLevel> for String {
    fn from(level: AccessLevel) -> Self {
        match level {
            AccessLevel::Router => "Router".to_string(),
            AccessLevel::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "nivel", default)]
    pub access_level: Option<AccessLevel>,
}

/// Events pushed by the server over the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// `router_claimed { router_user }`, `None` when nobody holds the role.
    RouterClaimed { holder: Option<String> },
    /// `open_song { song_id }`; only the id, the body must be fetched.
    OpenSong { song_id: SongId },
}

#[derive(Deserialize)]
struct RouterClaimedPayload {
    #[serde(default)]
    router_user: Option<String>,
}

#[derive(Deserialize)]
struct OpenSongPayload {
    song_id: SongIdRepr,
}

/// Song ids arrive as numbers from the server but tolerate numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum SongIdRepr {
    Int(SongId),
    Text(String),
}

impl Inbound {
    /// Decode a named Socket.IO event. Returns `Ok(None)` for events this
    /// client does not consume.
    pub fn from_event(name: &str, payload: Value) -> Result<Option<Self>, ProtocolError> {
        let bad = |e: serde_json::Error| ProtocolError::Payload {
            event: name.to_string(),
            reason: e.to_string(),
        };
        match name {
            "router_claimed" => {
                let p: RouterClaimedPayload = serde_json::from_value(payload).map_err(bad)?;
                Ok(Some(Inbound::RouterClaimed {
                    holder: p.router_user.filter(|u| !u.is_empty()),
                }))
            }
            "open_song" => {
                let p: OpenSongPayload = serde_json::from_value(payload).map_err(bad)?;
                let song_id = match p.song_id {
                    SongIdRepr::Int(id) => id,
                    SongIdRepr::Text(s) => {
                        s.trim().parse().map_err(|_| ProtocolError::Payload {
                            event: name.to_string(),
                            reason: format!("song_id {s:?} is not a number"),
                        })?
                    }
                };
                Ok(Some(Inbound::OpenSong { song_id }))
            }
            _ => Ok(None),
        }
    }
}

/// Events this client emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Identify { username: String },
    ClaimRouter { user: String },
    ReleaseRouter { user: String },
    OpenSong { song_id: SongId, user: String },
}

impl Outbound {
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::Identify { .. } => "identify",
            Outbound::ClaimRouter { .. } => "claim_router",
            Outbound::ReleaseRouter { .. } => "release_router",
            Outbound::OpenSong { .. } => "open_song",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Outbound::Identify { username } => json!({ "username": username }),
            Outbound::ClaimRouter { user } | Outbound::ReleaseRouter { user } => {
                json!({ "user": user })
            }
            Outbound::OpenSong { song_id, user } => json!({ "song_id": song_id, "user": user }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_decodes_server_row() {
        let row = json!({
            "id": 7,
            "titulo": "Echo of Time",
            "banda": "The Hollow",
            "tom": "G",
            "letra": "la la",
            "cifra": "G D Em C",
            "created_at": "2024-01-01T00:00:00"
        });
        let song: Song = serde_json::from_value(row).unwrap();
        assert_eq!(song.id, 7);
        assert_eq!(song.title, "Echo of Time");
        assert_eq!(song.band, "The Hollow");
        assert_eq!(song.body(false), "la la");
        assert_eq!(song.body(true), "G D Em C");
    }

    #[test]
    fn test_access_level_router_is_recognised() {
        let resp: LoginResponse =
            serde_json::from_value(json!({"status": "success", "nivel": "Router"})).unwrap();
        assert_eq!(resp.access_level, Some(AccessLevel::Router));
        assert!(resp.access_level.unwrap().can_route());

        let resp: LoginResponse =
            serde_json::from_value(json!({"status": "success", "nivel": "Musico"})).unwrap();
        let level = resp.access_level.unwrap();
        assert!(!level.can_route());
        assert_eq!(level.label(), "Musico");
    }

    #[test]
    fn test_router_claimed_with_null_holder() {
        let ev = Inbound::from_event("router_claimed", json!({"router_user": null})).unwrap();
        assert_eq!(ev, Some(Inbound::RouterClaimed { holder: None }));
    }

    #[test]
    fn test_open_song_accepts_string_ids() {
        let ev = Inbound::from_event("open_song", json!({"song_id": "12"})).unwrap();
        assert_eq!(ev, Some(Inbound::OpenSong { song_id: 12 }));
        assert!(Inbound::from_event("open_song", json!({"song_id": "x"})).is_err());
    }

    #[test]
    fn test_unknown_events_are_ignored() {
        assert_eq!(Inbound::from_event("user_list", json!({})).unwrap(), None);
    }

    #[test]
    fn test_outbound_payload_shapes() {
        let ev = Outbound::OpenSong {
            song_id: 3,
            user: "alice".into(),
        };
        assert_eq!(ev.name(), "open_song");
        assert_eq!(ev.payload(), json!({"song_id": 3, "user": "alice"}));
        let ev = Outbound::Identify {
            username: "alice".into(),
        };
        assert_eq!(ev.payload(), json!({"username": "alice"}));
    }
}
