// Integration tests for the reconnecting `Connection` against an
// in-process tokio-tungstenite server.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use devforge_api::{Connection, ConnectionState, ReconnectConfig};

// ── Test server ─────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Script {
    /// Send one frame, then close with the given code.
    SendThenClose(u16),
    /// Keep the socket open until the client closes it.
    Hold,
}

#[derive(Debug, PartialEq)]
enum ServerEvent {
    Accepted(Instant),
    ClientClosed(Option<(u16, String)>),
}

async fn spawn_server(script: Script) -> (Url, mpsc::UnboundedReceiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(tcp).await else {
                    return;
                };
                let _ = tx.send(ServerEvent::Accepted(Instant::now()));
                match script {
                    Script::SendThenClose(code) => {
                        let frame = r#"{"type":"project_deleted","payload":{"projectId":"p1"}}"#;
                        let _ = ws.send(Message::Text(frame.into())).await;
                        let _ = ws
                            .close(Some(CloseFrame {
                                code: CloseCode::from(code),
                                reason: "server closing".into(),
                            }))
                            .await;
                        while ws.next().await.is_some() {}
                    }
                    Script::Hold => {
                        while let Some(msg) = ws.next().await {
                            if let Ok(Message::Close(frame)) = msg {
                                let detail =
                                    frame.map(|f| (u16::from(f.code), f.reason.as_str().to_owned()));
                                let _ = tx.send(ServerEvent::ClientClosed(detail));
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    let url = Url::parse(&format!("ws://{addr}/ws/projects")).unwrap();
    (url, rx)
}

fn reconnect(delay_ms: u64) -> ReconnectConfig {
    ReconnectConfig {
        auto_reconnect: true,
        delay: Duration::from_millis(delay_ms),
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("server event within 5s")
        .unwrap()
}

async fn wait_for_state(conn: &Connection, pred: impl Fn(ConnectionState) -> bool) {
    let mut rx = conn.watch_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| pred(*s)))
        .await
        .expect("state reached within 5s")
        .unwrap();
}

fn accepted_at(event: ServerEvent) -> Instant {
    match event {
        ServerEvent::Accepted(at) => at,
        other => panic!("expected accept, got {other:?}"),
    }
}

// ── Reconnect contract ──────────────────────────────────────────────

#[tokio::test]
async fn reconnects_after_abnormal_close() {
    let (url, mut events) = spawn_server(Script::SendThenClose(4000)).await;
    let frames = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&frames);

    let conn = Connection::new(url, reconnect(300), move |envelope| {
        assert_eq!(envelope.kind, "project_deleted");
        counter.fetch_add(1, Ordering::SeqCst);
    });
    conn.connect();

    let first = accepted_at(next_event(&mut events).await);
    let second = accepted_at(next_event(&mut events).await);

    assert!(second.duration_since(first) >= Duration::from_millis(300));
    assert!(conn.attempts() >= 2);
    assert!(frames.load(Ordering::SeqCst) >= 1);
    conn.disconnect();
}

#[tokio::test]
async fn manual_disconnect_sends_normal_close_and_never_reconnects() {
    let (url, mut events) = spawn_server(Script::Hold).await;
    let conn = Connection::new(url, reconnect(200), |_| {});
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, ConnectionState::is_open).await;

    conn.disconnect();

    assert_eq!(
        next_event(&mut events).await,
        ServerEvent::ClientClosed(Some((1000, "Manual disconnect".into())))
    );
    assert_eq!(conn.state(), ConnectionState::Closed { clean: true });

    // Several reconnect delays pass without a new connection.
    let quiet = tokio::time::timeout(Duration::from_millis(900), events.recv()).await;
    assert!(quiet.is_err(), "unexpected reconnect: {quiet:?}");
    assert_eq!(conn.attempts(), 1);
}

#[tokio::test]
async fn disconnect_cancels_pending_reconnect() {
    let (url, mut events) = spawn_server(Script::SendThenClose(4000)).await;
    let conn = Connection::new(url, reconnect(300), |_| {});
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, |s| s == ConnectionState::Closed { clean: false }).await;

    conn.disconnect();
    assert_eq!(conn.state(), ConnectionState::Closed { clean: true });

    // Well past the reconnect delay: no second attempt, no new accept.
    let quiet = tokio::time::timeout(Duration::from_millis(900), events.recv()).await;
    assert!(quiet.is_err(), "unexpected reconnect: {quiet:?}");
    assert_eq!(conn.attempts(), 1);
}

#[tokio::test]
async fn clean_server_close_does_not_reconnect() {
    let (url, mut events) = spawn_server(Script::SendThenClose(1000)).await;
    let conn = Connection::new(url, reconnect(200), |_| {});
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, |s| s == ConnectionState::Closed { clean: true }).await;

    let quiet = tokio::time::timeout(Duration::from_millis(800), events.recv()).await;
    assert!(quiet.is_err());
    assert_eq!(conn.attempts(), 1);
    assert!(conn.error().is_none());
}

#[tokio::test]
async fn auto_reconnect_disabled_stays_closed() {
    let (url, mut events) = spawn_server(Script::SendThenClose(4001)).await;
    let conn = Connection::new(
        url,
        ReconnectConfig {
            auto_reconnect: false,
            delay: Duration::from_millis(100),
        },
        |_| {},
    );
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, |s| s == ConnectionState::Closed { clean: false }).await;

    let quiet = tokio::time::timeout(Duration::from_millis(600), events.recv()).await;
    assert!(quiet.is_err());
    assert!(conn.error().is_some_and(|e| e.contains("4001")));
}

// ── At-most-one socket ──────────────────────────────────────────────

#[tokio::test]
async fn connect_while_open_is_a_noop() {
    let (url, mut events) = spawn_server(Script::Hold).await;
    let conn = Connection::new(url, reconnect(200), |_| {});
    conn.connect();
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, ConnectionState::is_open).await;
    conn.connect();

    let quiet = tokio::time::timeout(Duration::from_millis(500), events.recv()).await;
    assert!(quiet.is_err());
    assert_eq!(conn.attempts(), 1);
}

#[tokio::test]
async fn connect_during_pending_reconnect_wakes_it_early() {
    let (url, mut events) = spawn_server(Script::SendThenClose(4002)).await;
    let conn = Connection::new(url, reconnect(10_000), |_| {});
    conn.connect();

    let first = accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, |s| s == ConnectionState::Closed { clean: false }).await;

    conn.connect();
    let second = accepted_at(next_event(&mut events).await);

    assert!(second.duration_since(first) < Duration::from_secs(5));
    assert_eq!(conn.attempts(), 2);
    drop(conn);
}

#[tokio::test]
async fn repeated_connect_keeps_the_next_reconnect_delay() {
    let (url, mut events) = spawn_server(Script::SendThenClose(4003)).await;
    let conn = Connection::new(url, reconnect(600), |_| {});
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, |s| s == ConnectionState::Closed { clean: false }).await;
    conn.connect();
    conn.connect();

    // The woken attempt is closed again; that close waits the full delay.
    let second = accepted_at(next_event(&mut events).await);
    let third = accepted_at(next_event(&mut events).await);
    assert!(third.duration_since(second) >= Duration::from_millis(600));
    conn.disconnect();
}

// ── Teardown & errors ───────────────────────────────────────────────

#[tokio::test]
async fn dropping_the_handle_closes_the_socket() {
    let (url, mut events) = spawn_server(Script::Hold).await;
    let conn = Connection::new(url, reconnect(200), |_| {});
    conn.connect();

    accepted_at(next_event(&mut events).await);
    wait_for_state(&conn, ConnectionState::is_open).await;
    drop(conn);

    assert_eq!(
        next_event(&mut events).await,
        ServerEvent::ClientClosed(Some((1000, "Manual disconnect".into())))
    );
}

#[tokio::test]
async fn failed_handshake_is_unclean_and_retried() {
    // Grab a free port and release it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws/projects")).unwrap();
    let conn = Connection::new(url, reconnect(100), |_| {});
    conn.connect();

    wait_for_state(&conn, |s| s == ConnectionState::Closed { clean: false }).await;
    assert!(conn.error().is_some());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(conn.attempts() >= 2);
    conn.disconnect();
}
