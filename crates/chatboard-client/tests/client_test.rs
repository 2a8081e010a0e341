//! Client pipe behavior against scripted and real servers.

use std::time::Duration;

use chatboard_client::{FAREWELL, run};
use chatboard_core::MemoryUserStore;
use chatboard_proto::line;
use chatboard_server::{RouterConfig, spawn_router};
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn input_reaches_server_and_replies_reach_output() {
    let (client, server) = tokio::io::duplex(4096);

    // Echo each line, then say goodbye once the client stops sending
    let server_task = tokio::spawn(async move {
        let mut framed = Framed::new(server, LinesCodec::new());
        while let Some(Ok(line)) = framed.next().await {
            framed.send(format!("echo: {line}")).await.unwrap();
        }
        framed.send("bye").await.unwrap();
    });

    let mut output = Vec::new();
    timeout(WAIT, run(client, &b"hello\nworld\n"[..], &mut output)).await.unwrap().unwrap();
    server_task.await.unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("echo: hello\necho: world\nbye\n{FAREWELL}\n")
    );
}

#[tokio::test]
async fn invalid_utf8_input_is_sent_lossily() {
    let (client, server) = tokio::io::duplex(4096);

    let server_task = tokio::spawn(async move {
        let mut framed = Framed::new(server, LinesCodec::new());
        let line = framed.next().await.unwrap().unwrap();
        framed.send(format!("echo: {line}")).await.unwrap();
    });

    let mut output = Vec::new();
    timeout(WAIT, run(client, &b"caf\xe9\r\n"[..], &mut output)).await.unwrap().unwrap();
    server_task.await.unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("echo: caf\u{FFFD}\n{FAREWELL}\n")
    );
}

#[tokio::test]
async fn server_hangup_ends_the_session() {
    let (client, server) = tokio::io::duplex(4096);
    let (input_reader, _input_writer) = tokio::io::duplex(64);

    tokio::spawn(async move {
        let mut framed = Framed::new(server, LinesCodec::new());
        framed.send("Server: Server is full, please try again later.").await.unwrap();
    });

    let mut output = Vec::new();
    // Input never ends; only the server closing can stop the client
    timeout(WAIT, run(client, input_reader, &mut output)).await.unwrap().unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!("Server: Server is full, please try again later.\n{FAREWELL}\n")
    );
}

#[tokio::test]
async fn full_session_against_router() {
    let store = MemoryUserStore::with_users([("alice", "pw12")]);
    let router = spawn_router(store, RouterConfig::default());
    let (client, server) = tokio::io::duplex(4096);
    router.admit(server).await.unwrap();

    let input = b"who\nlogin alice pw12\nsend all hi\nlogout\n";
    let mut output = Vec::new();
    timeout(WAIT, run(client, &input[..], &mut output)).await.unwrap().unwrap();

    let printed = String::from_utf8(output).unwrap();
    let lines: Vec<_> = printed.lines().collect();
    assert_eq!(lines, vec![
        "Server: Please log in first.".to_string(),
        line::welcome_login("alice"),
        line::joined("alice"),
        "alice: hi".to_string(),
        line::goodbye("alice"),
        FAREWELL.to_string(),
    ]);
}
