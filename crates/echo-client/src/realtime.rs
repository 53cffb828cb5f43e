//! Realtime channel: one Socket.IO connection per login.
//!
//! The channel task owns the websocket. It answers Engine.IO pings, joins the
//! default namespace, announces `identify` once the namespace ack arrives and
//! then forwards decoded server events into the core's event queue, tagged
//! with the generation it was opened under. Outbound events travel through an
//! unbounded queue held by [`ChannelHandle`]; anything sent before the
//! namespace ack is buffered and flushed right after `identify`.
//!
//! A dropped connection is retried with backoff inside the same generation,
//! so the app never holds more than one live socket.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use echo_proto::protocol::{Inbound, Outbound};
use echo_proto::socketio::{EnginePacket, ProtocolError, SocketPacket};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::core::CoreEvent;

const RECONNECT_MIN: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("server refused namespace: {0}")]
    Refused(String),
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
}

/// What a channel reports back to the core.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Namespace joined and `identify` sent.
    Connected,
    Disconnected(String),
    Inbound(Inbound),
}

/// Owning handle to one channel generation. Dropping it tears the channel down.
pub struct ChannelHandle {
    generation: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn new(
        generation: u64,
        outbound: mpsc::UnboundedSender<Outbound>,
        connected: Arc<AtomicBool>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            generation,
            outbound,
            connected,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue an event for the server. Returns `false` once the channel is gone.
    pub fn send(&self, event: Outbound) -> bool {
        self.outbound.send(event).is_ok()
    }

    pub fn close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens channels. The core only ever talks to this seam.
pub trait RealtimeConnector: Send + Sync {
    fn open(
        &self,
        url: Url,
        username: &str,
        generation: u64,
        events: mpsc::Sender<CoreEvent>,
    ) -> ChannelHandle;
}

/// The single live channel plus the generation counter.
#[derive(Default)]
pub struct ChannelSlot {
    current: Option<ChannelHandle>,
    last_generation: u64,
}

impl ChannelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the live channel, then install the one built by `open` under a
    /// fresh generation. The old socket is gone before the new one identifies.
    pub fn replace_with(&mut self, open: impl FnOnce(u64) -> ChannelHandle) -> u64 {
        self.close();
        self.last_generation += 1;
        let generation = self.last_generation;
        self.current = Some(open(generation));
        generation
    }

    pub fn close(&mut self) {
        if let Some(mut old) = self.current.take() {
            info!("closing realtime channel gen={}", old.generation());
            old.close();
        }
    }

    pub fn current(&self) -> Option<&ChannelHandle> {
        self.current.as_ref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|h| h.generation() == generation)
    }

    pub fn is_connected(&self) -> bool {
        self.current.as_ref().is_some_and(ChannelHandle::is_connected)
    }

    /// Number of open channels (0 or 1).
    pub fn live_count(&self) -> usize {
        usize::from(self.current.is_some())
    }
}

/// Socket.IO over tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct SocketIoConnector;

impl RealtimeConnector for SocketIoConnector {
    fn open(
        &self,
        url: Url,
        username: &str,
        generation: u64,
        events: mpsc::Sender<CoreEvent>,
    ) -> ChannelHandle {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        info!("opening realtime channel gen={} url={}", generation, url);
        let task = tokio::spawn(run_channel(
            url,
            username.to_string(),
            generation,
            events,
            out_rx,
            connected.clone(),
        ));
        ChannelHandle::new(generation, out_tx, connected, Some(task))
    }
}

enum SessionEnd {
    ServerClosed,
    HandleDropped,
    CoreGone,
}

async fn run_channel(
    url: Url,
    username: String,
    generation: u64,
    events: mpsc::Sender<CoreEvent>,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
    connected: Arc<AtomicBool>,
) {
    let mut delay = RECONNECT_MIN;
    // Outbound events waiting for a namespace ack. Survives reconnects.
    let mut pending: VecDeque<Outbound> = VecDeque::new();
    loop {
        let result = session(
            &url,
            &username,
            generation,
            &events,
            &mut out_rx,
            &mut pending,
            &connected,
        )
        .await;
        if connected.swap(false, Ordering::SeqCst) {
            delay = RECONNECT_MIN;
        }
        let reason = match result {
            Ok(SessionEnd::HandleDropped) | Ok(SessionEnd::CoreGone) => return,
            Ok(SessionEnd::ServerClosed) => "closed by server".to_string(),
            Err(e) => e.to_string(),
        };
        warn!("realtime gen={} disconnected: {}", generation, reason);
        let ev = CoreEvent::Realtime {
            generation,
            event: ChannelEvent::Disconnected(reason),
        };
        if events.send(ev).await.is_err() {
            return;
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(RECONNECT_MAX);
    }
}

async fn session(
    url: &Url,
    username: &str,
    generation: u64,
    events: &mpsc::Sender<CoreEvent>,
    out_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    pending: &mut VecDeque<Outbound>,
    connected: &AtomicBool,
) -> Result<SessionEnd, RealtimeError> {
    let (ws, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = ws.split();
    debug!("realtime gen={} websocket open", generation);

    loop {
        tokio::select! {
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::ServerClosed),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };
                trace!("realtime gen={} <- {}", generation, text);
                let packet = match EnginePacket::decode(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("realtime gen={} undecodable frame: {}", generation, e);
                        continue;
                    }
                };
                match packet {
                    EnginePacket::Open(hs) => {
                        debug!("engine.io open sid={} ping={}ms", hs.sid, hs.ping_interval);
                        let join = EnginePacket::Message(SocketPacket::Connect { sid: None });
                        sink.send(Message::Text(join.encode())).await?;
                    }
                    EnginePacket::Ping(data) => {
                        sink.send(Message::Text(EnginePacket::Pong(data).encode())).await?;
                    }
                    EnginePacket::Message(SocketPacket::Connect { .. }) => {
                        if !username.is_empty() {
                            let identify = Outbound::Identify { username: username.to_string() };
                            sink.send(Message::Text(frame_for(&identify))).await?;
                        }
                        // Dequeue only once written, so a failed flush is retried.
                        while let Some(ev) = pending.front() {
                            sink.send(Message::Text(frame_for(ev))).await?;
                            pending.pop_front();
                        }
                        connected.store(true, Ordering::SeqCst);
                        info!("realtime gen={} connected as {}", generation, username);
                        if !forward(events, generation, ChannelEvent::Connected).await {
                            return Ok(SessionEnd::CoreGone);
                        }
                    }
                    EnginePacket::Message(SocketPacket::Event { name, payload }) => {
                        match Inbound::from_event(&name, payload) {
                            Ok(Some(ev)) => {
                                if !forward(events, generation, ChannelEvent::Inbound(ev)).await {
                                    return Ok(SessionEnd::CoreGone);
                                }
                            }
                            Ok(None) => trace!("ignoring event {}", name),
                            Err(e) => warn!("realtime gen={} {}", generation, e),
                        }
                    }
                    EnginePacket::Message(SocketPacket::ConnectError { message }) => {
                        return Err(RealtimeError::Refused(message));
                    }
                    EnginePacket::Message(SocketPacket::Disconnect) | EnginePacket::Close => {
                        return Ok(SessionEnd::ServerClosed);
                    }
                    EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
                }
            }

            out = out_rx.recv() => {
                let Some(ev) = out else {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::HandleDropped);
                };
                if connected.load(Ordering::SeqCst) {
                    debug!("realtime gen={} -> {}", generation, ev.name());
                    if let Err(e) = sink.send(Message::Text(frame_for(&ev))).await {
                        pending.push_back(ev);
                        return Err(e.into());
                    }
                } else {
                    pending.push_back(ev);
                }
            }
        }
    }
}

fn frame_for(ev: &Outbound) -> String {
    EnginePacket::event(ev.name(), ev.payload()).encode()
}

async fn forward(events: &mpsc::Sender<CoreEvent>, generation: u64, event: ChannelEvent) -> bool {
    events
        .send(CoreEvent::Realtime { generation, event })
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(generation: u64) -> (ChannelHandle, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let h = ChannelHandle::new(generation, tx, Arc::new(AtomicBool::new(true)), None);
        (h, rx)
    }

    #[test]
    fn test_frame_for_claim() {
        let ev = Outbound::ClaimRouter {
            user: "alice".into(),
        };
        assert_eq!(frame_for(&ev), r#"42["claim_router",{"user":"alice"}]"#);
    }

    #[test]
    fn test_slot_replaces_and_bumps_generation() {
        let mut slot = ChannelSlot::new();
        let mut receivers = Vec::new();

        let g1 = slot.replace_with(|g| {
            let (h, rx) = handle(g);
            receivers.push(rx);
            h
        });
        let g2 = slot.replace_with(|g| {
            let (h, rx) = handle(g);
            receivers.push(rx);
            h
        });

        assert!(g2 > g1);
        assert_eq!(slot.live_count(), 1);
        assert!(slot.is_current(g2));
        assert!(!slot.is_current(g1));
    }

    #[test]
    fn test_close_clears_connected_flag() {
        let (mut h, _rx) = handle(1);
        assert!(h.is_connected());
        h.close();
        assert!(!h.is_connected());
    }

    #[test]
    fn test_send_after_receiver_gone_reports_failure() {
        let (h, rx) = handle(1);
        drop(rx);
        assert!(!h.send(Outbound::Identify {
            username: "a".into()
        }));
    }
}
