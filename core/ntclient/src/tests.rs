//! FILENAME: core/ntclient/src/tests.rs

use super::*;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// VALUE COERCION
// ============================================================================

#[test]
fn test_parse_number() {
    assert_eq!(EntryValue::parse("3.5"), EntryValue::Number(3.5));
    assert_eq!(EntryValue::parse("-100"), EntryValue::Number(-100.0));
    assert_eq!(EntryValue::parse("0"), EntryValue::Number(0.0));
}

#[test]
fn test_parse_boolean() {
    assert_eq!(EntryValue::parse("true"), EntryValue::Boolean(true));
    assert_eq!(EntryValue::parse("false"), EntryValue::Boolean(false));
}

#[test]
fn test_parse_falls_back_to_text() {
    assert_eq!(
        EntryValue::parse("hello"),
        EntryValue::Text("hello".to_string())
    );
    assert_eq!(EntryValue::parse(""), EntryValue::Text(String::new()));
    // Strict numeric parsing: a numeric prefix is not a number.
    assert_eq!(
        EntryValue::parse("12abc"),
        EntryValue::Text("12abc".to_string())
    );
}

#[test]
fn test_parse_keeps_non_finite_numerics_as_text() {
    // `f64` parses these, but they have no JSON scalar form.
    assert_eq!(EntryValue::parse("NaN"), EntryValue::Text("NaN".to_string()));
    assert_eq!(EntryValue::parse("inf"), EntryValue::Text("inf".to_string()));
    assert_eq!(
        EntryValue::parse("-infinity"),
        EntryValue::Text("-infinity".to_string())
    );
}

#[test]
fn test_parse_number_wins_over_text() {
    // "7" is a number, never the string "7".
    assert_eq!(EntryValue::parse("7"), EntryValue::Number(7.0));
}

#[test]
fn test_type_names() {
    assert_eq!(EntryValue::Boolean(true).type_name(), "boolean");
    assert_eq!(EntryValue::Number(1.0).type_name(), "double");
    assert_eq!(EntryValue::Text("x".into()).type_name(), "string");
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[test]
fn test_decode_announce_and_update_batch() {
    let frame = r#"[
        {"method":"announce","params":{"name":"/status/armed","id":7,"type":"string","flags":1}},
        {"method":"update","params":{"id":7,"value":"true"}}
    ]"#;
    let messages = proto::decode(frame).unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[1],
        proto::WireMessage::Update {
            id: 7,
            value: EntryValue::Text("true".to_string()),
        }
    );
}

#[test]
fn test_untagged_values_keep_their_json_type() {
    let frame = r#"[{"method":"update","params":{"id":1,"value":true}},
                    {"method":"update","params":{"id":2,"value":2.5}}]"#;
    let messages = proto::decode(frame).unwrap();

    assert_eq!(
        messages[0],
        proto::WireMessage::Update {
            id: 1,
            value: EntryValue::Boolean(true),
        }
    );
    assert_eq!(
        messages[1],
        proto::WireMessage::Update {
            id: 2,
            value: EntryValue::Number(2.5),
        }
    );
}

#[test]
fn test_subscribe_all_is_a_prefix_subscription() {
    let frame = proto::subscribe_all(1).unwrap();
    let messages = proto::decode(&frame).unwrap();

    assert_eq!(
        messages,
        vec![proto::WireMessage::Subscribe {
            topics: vec![String::new()],
            subuid: 1,
            options: proto::SubscribeOptions { prefix: true },
        }]
    );
}

// ============================================================================
// DISCONNECTED CLIENT
// ============================================================================

#[test]
fn test_writes_refused_while_disconnected() {
    let client = Client::new("test");

    assert!(!client.is_connected());
    assert!(matches!(
        client.update(1, EntryValue::Number(5.0)),
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        client.assign("/x", EntryValue::Boolean(true), false),
        Err(ClientError::NotConnected)
    ));
    assert_eq!(client.key_id("/x"), None);
}

// ============================================================================
// LOOPBACK SESSION
// ============================================================================

#[tokio::test]
async fn test_connects_and_forwards_updates() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        // The client subscribes before anything else.
        let subscribe = socket.next().await.unwrap().unwrap();
        let Message::Text(text) = subscribe else {
            panic!("expected a text frame");
        };
        assert!(text.as_str().contains("subscribe"));

        let announce = r#"[{"method":"announce","params":{"name":"/status/armed","id":7,"type":"string","flags":0}}]"#;
        socket.send(Message::text(announce)).await.unwrap();
        let update = r#"[{"method":"update","params":{"id":7,"value":"true"}}]"#;
        socket.send(Message::text(update)).await.unwrap();

        // The client's write arrives as a publish for an unannounced key.
        let outbound = timeout(Duration::from_secs(2), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let Message::Text(text) = outbound else {
            panic!("expected a text frame");
        };
        let messages = proto::decode(text.as_str()).unwrap();
        assert_eq!(
            messages,
            vec![proto::WireMessage::Publish {
                name: "/dash/speed".to_string(),
                value_type: "double".to_string(),
                persistent: false,
                value: EntryValue::Number(0.5),
            }]
        );
    });

    let client = Client::new("test");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    client.add_listener(move |update| {
        let _ = tx.send(update);
    });

    let connected = client.start(&addr.to_string()).await.unwrap();
    assert!(connected);
    assert!(client.is_connected());

    // The announced entry becomes addressable, and the update reaches the
    // listener with its wire value untouched (coercion is the host's job).
    let update = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.key, "/status/armed");
    assert_eq!(update.value, EntryValue::Text("true".to_string()));
    assert_eq!(update.msg_type, "update");
    assert_eq!(update.id, 7);
    assert_eq!(client.key_id("/status/armed"), Some(7));

    client
        .assign("/dash/speed", EntryValue::Number(0.5), false)
        .unwrap();

    server.await.unwrap();
}

#[tokio::test]
async fn test_dropped_session_reconnects_and_forwarding_resumes() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First session: handshake, then drop the socket under the client.
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _subscribe = socket.next().await.unwrap().unwrap();
        let announce = r#"[{"method":"announce","params":{"name":"/status/armed","id":7,"type":"string","flags":0}}]"#;
        socket.send(Message::text(announce)).await.unwrap();
        drop(socket);

        // The reconnected session subscribes from scratch, and its updates
        // must reach the listener registered before the drop.
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let subscribe = socket.next().await.unwrap().unwrap();
        let Message::Text(text) = subscribe else {
            panic!("expected a text frame");
        };
        assert!(text.as_str().contains("subscribe"));
        let announce = r#"[{"method":"announce","params":{"name":"/status/armed","id":7,"type":"string","flags":0,"value":"resumed"}}]"#;
        socket.send(Message::text(announce)).await.unwrap();
        // Hold the session open long enough for the client to observe it.
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let mut client = Client::new("test");
    client.set_reconnect_delay(Duration::from_millis(100));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    client.add_listener(move |update| {
        let _ = tx.send(update);
    });

    assert!(client.start(&addr.to_string()).await.unwrap());

    let update = timeout(Duration::from_secs(3), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.key, "/status/armed");
    assert_eq!(update.value, EntryValue::Text("resumed".to_string()));
    assert_eq!(update.msg_type, "announce");
    assert!(client.is_connected());

    server.await.unwrap();
}

#[tokio::test]
async fn test_duplicate_start_during_reconnect_gap_dials_once() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First session: handshake, then drop it to open a reconnect gap.
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _subscribe = socket.next().await.unwrap().unwrap();
        let announce = r#"[{"method":"announce","params":{"name":"/status/armed","id":7,"type":"string","flags":0}}]"#;
        socket.send(Message::text(announce)).await.unwrap();
        drop(socket);

        // Exactly one further dial may arrive: the reconnect loop's. A
        // second `start` racing it would show up as a second session here.
        let mut sockets = Vec::new();
        while let Ok(Ok((stream, _))) =
            timeout(Duration::from_millis(900), listener.accept()).await
        {
            let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _subscribe = socket.next().await.unwrap().unwrap();
            socket.send(Message::text(announce)).await.unwrap();
            sockets.push(socket);
        }
        sockets.len()
    });

    let mut client = Client::new("test");
    client.set_reconnect_delay(Duration::from_millis(300));
    assert!(client.start(&addr.to_string()).await.unwrap());

    // Wait for the dropped session to tear down, then call `start` inside
    // the reconnect gap. The session task owns the link; no second dial.
    timeout(Duration::from_secs(2), async {
        while client.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(client.start(&addr.to_string()).await.unwrap(), false);

    // The reconnect loop restores the link on its own.
    timeout(Duration::from_secs(2), async {
        while !client.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(server.await.unwrap(), 1);
}

#[tokio::test]
async fn test_unresponsive_server_means_no_robot() {
    // Accepts TCP but never completes the websocket handshake.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hold = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let client = Client::new("test");
    let connected = client.start(&addr.to_string()).await.unwrap();

    assert!(!connected);
    assert!(!client.is_connected());
    hold.abort();
}

#[tokio::test]
async fn test_refused_connection_is_a_failure_not_no_robot() {
    // Bind then drop so nothing listens on the port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new("test");
    let result = client.start(&addr.to_string()).await;

    assert!(matches!(result, Err(ClientError::Transport(_)) | Ok(false)));
    assert!(!client.is_connected());
}
