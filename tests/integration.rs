//! Integration tests against an in-process mock GRX processor.
//!
//! Each test binds a local `TcpListener` that speaks the processor's
//! side of the protocol: the `login: ` prompt, the
//! `connection established` banner, status broadcasts, and button
//! echoes. No external hardware or environment setup is required.

use grx_client::{
    events, ClientBuilder, Config, ConnectionState, ControllerEvent, Scene, StatusSnapshot,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const USERNAME: &str = "nwk";

fn test_config(port: u16) -> Config {
    Config::builder()
        .host("127.0.0.1")
        .port(port)
        .username(USERNAME)
        .poll_interval(Duration::from_millis(50))
        .login_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

/// Read one CRLF-terminated line from the client.
async fn read_line(sock: &mut TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = sock.read(&mut byte).await.expect("client read");
        assert!(n > 0, "client closed mid-line");
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    String::from_utf8(line).expect("client sent non-utf8")
}

/// Accept a connection and walk it through the login handshake,
/// consuming the automatic `:G` that follows.
async fn accept_and_login(listener: &TcpListener) -> TcpStream {
    let (mut sock, _) = listener.accept().await.expect("accept");
    sock.write_all(b"login: ").await.expect("write prompt");

    let username = read_line(&mut sock).await;
    assert_eq!(username, format!("{USERNAME}\r\n"));

    sock.write_all(b"connection established\r\n")
        .await
        .expect("write banner");

    let status_req = read_line(&mut sock).await;
    assert_eq!(status_req, ":G\r\n");

    sock
}

async fn recv_event(rx: &flume::Receiver<ControllerEvent>) -> ControllerEvent {
    timeout(Duration::from_secs(5), rx.recv_async())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

fn expect_status(event: ControllerEvent) -> StatusSnapshot {
    match event {
        ControllerEvent::Status(snapshot) => snapshot,
        other => panic!("expected status snapshot, got {other:?}"),
    }
}

/// Login handshake succeeds and the initial snapshot arrives with no
/// caller action beyond `build()`.
#[tokio::test]
async fn test_login_and_initial_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut sock = accept_and_login(&listener).await;
        sock.write_all(b":ss 12345678\r\n").await.unwrap();
        sock
    });

    let (on_event, rx) = events::channel(16);
    let client = ClientBuilder::new(test_config(port))
        .on_event(on_event)
        .build()
        .await
        .expect("build should succeed against mock processor");
    let handle = client.handle();

    let snapshot = expect_status(recv_event(&rx).await);
    for unit in 1..=8u8 {
        assert_eq!(snapshot.scene(unit), Some(Scene::Number(unit)));
    }

    assert_eq!(handle.current_state(), ConnectionState::Ready);
    assert_eq!(handle.last_status(), Some(snapshot));

    handle.close();
    timeout(Duration::from_secs(5), client.join())
        .await
        .expect("join should resolve promptly after close")
        .unwrap();
    drop(server);
}

/// `set_scene` writes the exact command bytes; button echoes come back
/// as typed events.
#[tokio::test]
async fn test_set_scene_and_button_press() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(async move {
        let mut sock = accept_and_login(&listener).await;
        ready_tx.send(()).unwrap();

        let cmd = read_line(&mut sock).await;
        assert_eq!(cmd, ":A53\r\n");

        // Echo a keypad press back.
        sock.write_all(b"C5\r\n").await.unwrap();
        sock
    });

    let (on_event, rx) = events::channel(16);
    let client = ClientBuilder::new(test_config(port))
        .on_event(on_event)
        .build()
        .await
        .unwrap();
    let handle = client.handle();
    ready_rx.await.unwrap();

    let sent = handle.set_scene(Scene::Number(5), "3").await.unwrap();
    assert!(sent);

    match recv_event(&rx).await {
        ControllerEvent::ButtonPress(press) => {
            assert_eq!(press.unit, 3);
            assert_eq!(press.scene, 5);
        }
        other => panic!("expected button press, got {other:?}"),
    }

    handle.close();
    client.join().await.unwrap();
    drop(server);
}

/// A dropped connection moves the state to Disconnected, sends report
/// `false`, and the loop reconnects by itself once the processor is
/// back.
#[tokio::test]
async fn test_reconnect_after_connection_loss() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (resume_tx, resume_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        // First connection dies right after the handshake.
        let sock = accept_and_login(&listener).await;
        drop(sock);

        // Hold the second handshake until the test has observed the
        // outage, then serve a snapshot on the new connection.
        resume_rx.await.unwrap();
        let mut sock = accept_and_login(&listener).await;
        sock.write_all(b":ss M1234567\r\n").await.unwrap();
        sock
    });

    let (on_event, rx) = events::channel(16);
    let client = ClientBuilder::new(test_config(port))
        .on_event(on_event)
        .build()
        .await
        .unwrap();
    let handle = client.handle();
    let mut state = handle.state();

    // Ready is left the moment the loss is noticed; the watch only keeps
    // the latest value, so match any of the recovery states.
    timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s != ConnectionState::Ready),
    )
    .await
    .expect("should observe the connection loss")
    .unwrap();

    assert!(!handle.status_request().await);
    resume_tx.send(()).unwrap();

    timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Ready),
    )
    .await
    .expect("should reconnect without caller intervention")
    .unwrap();

    let snapshot = expect_status(recv_event(&rx).await);
    assert_eq!(snapshot.scene(1), Some(Scene::Missing));
    for unit in 2..=8u8 {
        assert_eq!(snapshot.scene(unit), Some(Scene::Number(unit - 1)));
    }

    handle.close();
    client.join().await.unwrap();
    drop(server);
}

/// Undecodable bytes are one bad chunk, not a dead loop; a later
/// well-formed status line still parses on the same connection.
#[tokio::test]
async fn test_undecodable_chunk_does_not_kill_loop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut sock = accept_and_login(&listener).await;
        sock.write_all(&[0xFF, 0xFE, 0x80, b'\r', b'\n']).await.unwrap();
        // Give the client a beat to process the garbage separately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        sock.write_all(b":ss 00000000\r\n").await.unwrap();
        sock
    });

    let (on_event, rx) = events::channel(16);
    let client = ClientBuilder::new(test_config(port))
        .on_event(on_event)
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    let snapshot = expect_status(recv_event(&rx).await);
    for unit in 1..=8u8 {
        assert_eq!(snapshot.scene(unit), Some(Scene::Number(0)));
    }

    handle.close();
    client.join().await.unwrap();
    drop(server);
}

/// A handshake that never produces the prompt fails `build()` — the
/// initial attempt is the one fatal path.
#[tokio::test]
async fn test_build_fails_on_bad_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        sock.write_all(b"go away\r\n").await.unwrap();
        sock
    });

    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .username(USERNAME)
        .login_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let (on_event, _rx) = events::channel(16);
    let result = ClientBuilder::new(config).on_event(on_event).build().await;
    match result {
        Err(e) => assert!(e.is_retryable(), "login failures are retryable: {e}"),
        Ok(_) => panic!("build should fail when the prompt never arrives"),
    }
    drop(server);
}

/// Nothing listening at all: `build()` surfaces a connection failure.
#[tokio::test]
async fn test_build_fails_when_unreachable() {
    // Bind then drop to get a port with nothing behind it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (on_event, _rx) = events::channel(16);
    let result = ClientBuilder::new(test_config(port))
        .on_event(on_event)
        .build()
        .await;
    assert!(result.is_err());
}
