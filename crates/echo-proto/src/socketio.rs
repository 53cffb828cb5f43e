//! Minimal Engine.IO v4 / Socket.IO v5 text-frame codec.
//!
//! Only the websocket transport and the default namespace are used. Each
//! websocket text frame carries one Engine.IO packet:
//!
//! ```text
//!  0{"sid":..,"pingInterval":..}   open (server → client)
//!  2 / 3                           ping / pong
//!  40                              socket.io CONNECT (client → server)
//!  40{"sid":..}                    CONNECT ack (server → client)
//!  42["event",{..}]                socket.io EVENT
//!  44{"message":..}                CONNECT_ERROR
//! ```

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Engine.IO protocol revision requested in the handshake query.
pub const ENGINE_IO_VERSION: u8 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownPacket(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownMessage(char),
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
    #[error("bad payload for {event}: {reason}")]
    Payload { event: String, reason: String },
}

/// Engine.IO open-packet body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Client request carries no sid; the server ack carries one.
    Connect { sid: Option<String> },
    Disconnect,
    Event { name: String, payload: Value },
    ConnectError { message: String },
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();
        match kind {
            '0' => {
                let hs: Handshake =
                    serde_json::from_str(rest).map_err(|e| ProtocolError::Malformed {
                        what: "open packet",
                        reason: e.to_string(),
                    })?;
                Ok(EnginePacket::Open(hs))
            }
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(rest.to_string())),
            '3' => Ok(EnginePacket::Pong(rest.to_string())),
            '4' => Ok(EnginePacket::Message(SocketPacket::decode(rest)?)),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ProtocolError::UnknownPacket(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(hs) => format!(
                "0{{\"sid\":{},\"pingInterval\":{},\"pingTimeout\":{}}}",
                Value::String(hs.sid.clone()),
                hs.ping_interval,
                hs.ping_timeout
            ),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(msg) => format!("4{}", msg.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }

    /// Shorthand for an outgoing `42["name",payload]` frame.
    pub fn event(name: &str, payload: Value) -> Self {
        EnginePacket::Message(SocketPacket::Event {
            name: name.to_string(),
            payload,
        })
    }
}

impl SocketPacket {
    fn decode(body: &str) -> Result<Self, ProtocolError> {
        let mut chars = body.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = strip_ack_id(strip_namespace(chars.as_str()));
        match kind {
            '0' => {
                let sid = if rest.is_empty() {
                    None
                } else {
                    let v: Value = parse_json(rest, "connect packet")?;
                    v.get("sid").and_then(Value::as_str).map(str::to_string)
                };
                Ok(SocketPacket::Connect { sid })
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let args: Value = parse_json(rest, "event packet")?;
                let mut items = match args {
                    Value::Array(items) => items.into_iter(),
                    _ => {
                        return Err(ProtocolError::Malformed {
                            what: "event packet",
                            reason: "arguments are not an array".to_string(),
                        })
                    }
                };
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(ProtocolError::Malformed {
                            what: "event packet",
                            reason: "missing event name".to_string(),
                        })
                    }
                };
                let payload = items.next().unwrap_or(Value::Null);
                Ok(SocketPacket::Event { name, payload })
            }
            '4' => {
                let v: Value = parse_json(rest, "connect error")?;
                let message = v
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| v.to_string());
                Ok(SocketPacket::ConnectError { message })
            }
            other => Err(ProtocolError::UnknownMessage(other)),
        }
    }

    fn encode(&self) -> String {
        match self {
            SocketPacket::Connect { sid: None } => "0".to_string(),
            SocketPacket::Connect { sid: Some(sid) } => {
                format!("0{{\"sid\":{}}}", Value::String(sid.clone()))
            }
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, payload } => {
                let args = if payload.is_null() {
                    Value::Array(vec![Value::String(name.clone())])
                } else {
                    Value::Array(vec![Value::String(name.clone()), payload.clone()])
                };
                format!("2{args}")
            }
            SocketPacket::ConnectError { message } => {
                format!("4{{\"message\":{}}}", Value::String(message.clone()))
            }
        }
    }
}

/// Drop a leading `/namespace,` prefix.
fn strip_namespace(s: &str) -> &str {
    if s.starts_with('/') {
        match s.find(',') {
            Some(idx) => &s[idx + 1..],
            None => "",
        }
    } else {
        s
    }
}

/// Drop a leading numeric ack id.
fn strip_ack_id(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_json(s: &str, what: &'static str) -> Result<Value, ProtocolError> {
    serde_json::from_str(s).map_err(|e| ProtocolError::Malformed {
        what,
        reason: e.to_string(),
    })
}
