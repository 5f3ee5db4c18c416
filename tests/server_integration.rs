//! End-to-end tests for the chat server over TCP.

mod common;

use std::time::Duration;

use camix::SessionSettings;
use common::{TestClient, TestServer};

/// Wait until the registry has seen `count` members in the default channel.
async fn wait_for_members(server: &TestServer, count: usize) {
    for _ in 0..100 {
        if server.registry().default_channel().member_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("default channel never reached {count} members");
}

#[tokio::test]
async fn test_welcome_names_default_channel() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(server.addr()).await.unwrap();

    let welcome = client.recv_line().await.unwrap();
    assert_eq!(
        welcome,
        "* Welcome to Camix, anonymous. You are in channel 'general'. \
         Type /help for the list of commands."
    );
}

#[tokio::test]
async fn test_arrival_and_chat_between_clients() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    alice.send_line("/nick alice").await.unwrap();
    alice
        .recv_until("anonymous is now known as alice")
        .await
        .unwrap();

    let mut bob = server.connect().await;
    assert_eq!(
        alice.recv_line().await.unwrap(),
        "* anonymous has joined the chat."
    );

    bob.send_line("hello alice").await.unwrap();
    assert_eq!(alice.recv_line().await.unwrap(), "<anonymous> hello alice");
    assert_eq!(bob.recv_line().await.unwrap(), "<anonymous> hello alice");
}

#[tokio::test]
async fn test_create_join_and_list() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_line("/create news").await.unwrap();
    assert_eq!(client.recv_line().await.unwrap(), "* Channel 'news' created.");

    client.send_line("/join news").await.unwrap();
    assert_eq!(
        client.recv_line().await.unwrap(),
        "* You are now in channel 'news'."
    );

    client.send_line("/list").await.unwrap();
    assert_eq!(client.recv_line().await.unwrap(), "* Channels (2):");
    assert_eq!(
        client.recv_line().await.unwrap(),
        "  general (0 members) [default]"
    );
    assert_eq!(
        client.recv_line().await.unwrap(),
        "  news (1 member) <- you are here"
    );
}

#[tokio::test]
async fn test_duplicate_channel_is_refused() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_line("/create general").await.unwrap();
    assert_eq!(
        client.recv_line().await.unwrap(),
        "* Channel 'general' cannot be created: the name is already taken."
    );
    assert_eq!(server.registry().channel_count().await, 1);
}

#[tokio::test]
async fn test_quit_announces_departure() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.recv_until("has joined the chat").await.unwrap();

    bob.send_line("/quit").await.unwrap();
    assert!(bob.expect_closed().await);
    assert_eq!(
        alice.recv_line().await.unwrap(),
        "* anonymous has left the chat."
    );

    wait_for_members(&server, 1).await;
}

#[tokio::test]
async fn test_disconnect_cleans_up_membership() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    alice.send_line("/create news").await.unwrap();
    alice.recv_line().await.unwrap();
    alice.send_line("/join news").await.unwrap();
    alice.recv_line().await.unwrap();

    drop(alice);

    let news = server.registry().channel("news").await.unwrap();
    for _ in 0..100 {
        if news.member_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(news.member_count(), 0);
    assert!(server.registry().remove_channel("news").await.is_ok());
}

#[tokio::test]
async fn test_message_length_limit() {
    let settings = SessionSettings {
        default_nickname: "guest".to_string(),
        max_message_length: 10,
    };
    let server = TestServer::start_with(settings, 4).await;
    let mut client = server.connect().await;

    client.send_line("this line is too long").await.unwrap();
    assert_eq!(
        client.recv_line().await.unwrap(),
        "* Message too long (maximum 10 characters)."
    );

    client.send_line("short").await.unwrap();
    assert_eq!(client.recv_line().await.unwrap(), "<guest> short");
}

#[tokio::test]
async fn test_invalid_utf8_line_keeps_session() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw(b"caf\xe9\r\n").await.unwrap();
    assert_eq!(client.recv_line().await.unwrap(), "<anonymous> caf\u{FFFD}");

    client.send_line("still here").await.unwrap();
    assert_eq!(client.recv_line().await.unwrap(), "<anonymous> still here");
    assert_eq!(server.registry().default_channel().member_count(), 1);
}

#[tokio::test]
async fn test_oversized_line_is_discarded() {
    let settings = SessionSettings {
        default_nickname: "guest".to_string(),
        max_message_length: 10,
    };
    let server = TestServer::start_with(settings, 4).await;
    let mut client = server.connect().await;

    client.send_raw(&vec![b'x'; 64 * 1024]).await.unwrap();
    client.send_raw(b"\r\nok\r\n").await.unwrap();

    assert_eq!(
        client.recv_line().await.unwrap(),
        "* Message too long (maximum 10 characters)."
    );
    assert_eq!(client.recv_line().await.unwrap(), "<guest> ok");
    assert_eq!(server.registry().default_channel().member_count(), 1);
}

#[tokio::test]
async fn test_create_channel_with_spaces() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_line("/create salle des profs").await.unwrap();
    assert_eq!(
        client.recv_line().await.unwrap(),
        "* Channel 'salle des profs' created."
    );

    client.send_line("/join salle des profs").await.unwrap();
    assert_eq!(
        client.recv_line().await.unwrap(),
        "* You are now in channel 'salle des profs'."
    );
}
