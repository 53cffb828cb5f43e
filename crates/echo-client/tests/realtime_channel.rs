//! `SocketIoConnector` against a hand-driven Engine.IO/Socket.IO peer.

use std::time::Duration;

use echo_client::core::CoreEvent;
use echo_client::realtime::{ChannelEvent, RealtimeConnector, SocketIoConnector};
use echo_proto::protocol::{Inbound, Outbound};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

async fn next_text(ws: &mut ServerWs) -> Option<String> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for client frame")?;
        match msg {
            Ok(Message::Text(t)) => return Some(t),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

async fn next_event(rx: &mut mpsc::Receiver<CoreEvent>) -> (u64, ChannelEvent) {
    let ev = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for channel event")
        .expect("queue closed");
    match ev {
        CoreEvent::Realtime { generation, event } => (generation, event),
        other => panic!("unexpected core event {other:?}"),
    }
}

async fn listen() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = Url::parse(&format!(
        "ws://127.0.0.1:{port}/socket.io/?EIO=4&transport=websocket"
    ))
    .unwrap();
    (listener, url)
}

#[tokio::test]
async fn test_handshake_identify_events_and_outbound() {
    let (listener, url) = listen().await;
    let (tx, mut rx) = mpsc::channel(16);
    let mut handle = SocketIoConnector.open(url, "alice", 3, tx);
    assert_eq!(handle.generation(), 3);

    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

    ws.send(Message::Text(
        r#"0{"sid":"e1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#.into(),
    ))
    .await
    .unwrap();
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("40"));

    // Queued before the namespace ack: must be held back until after identify.
    assert!(handle.send(Outbound::ClaimRouter {
        user: "alice".into()
    }));

    ws.send(Message::Text(r#"40{"sid":"n1"}"#.into()))
        .await
        .unwrap();
    assert_eq!(
        next_text(&mut ws).await.as_deref(),
        Some(r#"42["identify",{"username":"alice"}]"#)
    );
    assert_eq!(
        next_text(&mut ws).await.as_deref(),
        Some(r#"42["claim_router",{"user":"alice"}]"#)
    );
    assert_eq!(next_event(&mut rx).await, (3, ChannelEvent::Connected));
    assert!(handle.is_connected());

    ws.send(Message::Text("2".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("3"));

    ws.send(Message::Text(
        r#"42["router_claimed",{"router_user":"bob"}]"#.into(),
    ))
    .await
    .unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        (
            3,
            ChannelEvent::Inbound(Inbound::RouterClaimed {
                holder: Some("bob".into())
            })
        )
    );

    ws.send(Message::Text(r#"42["open_song",{"song_id":7}]"#.into()))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        (3, ChannelEvent::Inbound(Inbound::OpenSong { song_id: 7 }))
    );

    handle.send(Outbound::OpenSong {
        song_id: 7,
        user: "alice".into(),
    });
    assert_eq!(
        next_text(&mut ws).await.as_deref(),
        Some(r#"42["open_song",{"song_id":7,"user":"alice"}]"#)
    );

    handle.close();
    assert!(!handle.is_connected());
    assert_eq!(next_text(&mut ws).await, None);
}

#[tokio::test]
async fn test_server_disconnect_is_reported() {
    let (listener, url) = listen().await;
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = SocketIoConnector.open(url, "alice", 1, tx);

    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    ws.send(Message::Text(r#"0{"sid":"e1","pingInterval":25000,"pingTimeout":20000}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("40"));
    ws.send(Message::Text("40".into())).await.unwrap();
    let _identify = next_text(&mut ws).await;
    assert_eq!(next_event(&mut rx).await, (1, ChannelEvent::Connected));

    ws.send(Message::Text("41".into())).await.unwrap();
    let (generation, event) = next_event(&mut rx).await;
    assert_eq!(generation, 1);
    assert!(matches!(event, ChannelEvent::Disconnected(_)));
}

#[tokio::test]
async fn test_events_queued_before_ack_survive_a_reconnect() {
    let (listener, url) = listen().await;
    let (tx, mut rx) = mpsc::channel(16);
    let handle = SocketIoConnector.open(url, "alice", 2, tx);

    // First socket dies between the client's CONNECT and the server's ack.
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    ws.send(Message::Text(r#"0{"sid":"e1","pingInterval":25000,"pingTimeout":20000}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("40"));
    assert!(handle.send(Outbound::ClaimRouter {
        user: "alice".into()
    }));
    // Let the channel task take the claim off its queue before the drop.
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(ws);

    let (generation, event) = next_event(&mut rx).await;
    assert_eq!(generation, 2);
    assert!(matches!(event, ChannelEvent::Disconnected(_)));
    assert!(!handle.is_connected());

    // Backoff, then a fresh handshake on the same generation.
    let (stream, _) = tokio::time::timeout(Duration::from_secs(3), listener.accept())
        .await
        .expect("no reconnect")
        .unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    ws.send(Message::Text(r#"0{"sid":"e2","pingInterval":25000,"pingTimeout":20000}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("40"));
    ws.send(Message::Text("40".into())).await.unwrap();
    assert_eq!(
        next_text(&mut ws).await.as_deref(),
        Some(r#"42["identify",{"username":"alice"}]"#)
    );
    assert_eq!(
        next_text(&mut ws).await.as_deref(),
        Some(r#"42["claim_router",{"user":"alice"}]"#)
    );
    assert_eq!(next_event(&mut rx).await, (2, ChannelEvent::Connected));
}
