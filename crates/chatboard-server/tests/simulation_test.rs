//! Router tests over turmoil's simulated TCP.
//!
//! The server host runs a real router behind a simulated listener; clients
//! are ordinary line-framed TCP peers on other hosts.

use chatboard_core::MemoryUserStore;
use chatboard_proto::{DEFAULT_PORT, line};
use chatboard_server::{RouterConfig, spawn_router};
use futures::{SinkExt, StreamExt};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use turmoil::{
    Builder,
    net::{TcpListener, TcpStream},
};

type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

struct Peer {
    lines: FramedRead<ReadHalf<TcpStream>, LinesCodec>,
    sink: FramedWrite<WriteHalf<TcpStream>, LinesCodec>,
}

impl Peer {
    async fn connect() -> Result<Self> {
        let stream = TcpStream::connect(format!("server:{DEFAULT_PORT}").as_str()).await?;
        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Self {
            lines: FramedRead::new(read_half, LinesCodec::new()),
            sink: FramedWrite::new(write_half, LinesCodec::new()),
        })
    }

    async fn send(&mut self, line: &str) -> Result {
        self.sink.send(line).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<String> {
        match self.lines.next().await {
            Some(line) => Ok(line?),
            None => Err("connection closed".into()),
        }
    }

    async fn is_closed(&mut self) -> bool {
        self.lines.next().await.is_none()
    }
}

/// Server host: a router fed by a simulated listener.
fn serve(sim: &mut turmoil::Sim<'_>, config: RouterConfig) {
    sim.host("server", move || {
        let config = config.clone();
        async move {
            let listener = TcpListener::bind(format!("0.0.0.0:{DEFAULT_PORT}").as_str()).await?;
            let router = spawn_router(
                MemoryUserStore::with_users([("alice", "pw12"), ("bob", "pw34")]),
                config,
            );

            loop {
                let (stream, _) = listener.accept().await?;
                router.admit(stream).await?;
            }
        }
    });
}

#[test]
fn chat_session_over_simulated_network() {
    let mut sim = Builder::new().build();
    serve(&mut sim, RouterConfig::default());

    sim.client("client", async {
        let mut alice = Peer::connect().await?;
        let mut bob = Peer::connect().await?;

        alice.send("login alice pw12").await?;
        assert_eq!(alice.recv().await?, line::welcome_login("alice"));
        assert_eq!(alice.recv().await?, line::joined("alice"));

        bob.send("newuser carol pw56").await?;
        assert_eq!(bob.recv().await?, line::welcome_registered("carol"));
        assert_eq!(bob.recv().await?, line::joined("carol"));
        assert_eq!(alice.recv().await?, line::joined("carol"));

        bob.send("send alice hello there").await?;
        assert_eq!(alice.recv().await?, "carol: hello there");

        alice.send("who").await?;
        assert_eq!(alice.recv().await?, line::server(line::WHO_HEADER));
        assert_eq!(alice.recv().await?, line::WHO_RULE);
        assert_eq!(alice.recv().await?, "alice");
        assert_eq!(alice.recv().await?, "carol");

        bob.send("logout").await?;
        assert_eq!(bob.recv().await?, line::goodbye("carol"));
        assert!(bob.is_closed().await);
        assert_eq!(alice.recv().await?, line::left("carol"));

        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn refused_connection_gets_a_notice() {
    let mut sim = Builder::new().build();
    serve(&mut sim, RouterConfig { max_sessions: 1, ..RouterConfig::default() });

    sim.client("client", async {
        let mut first = Peer::connect().await?;
        first.send("login alice pw12").await?;
        assert_eq!(first.recv().await?, line::welcome_login("alice"));

        let mut second = Peer::connect().await?;
        assert_eq!(second.recv().await?, "Server: Server is full, please try again later.");
        assert!(second.is_closed().await);

        Ok(())
    });

    sim.run().unwrap();
}

#[test]
fn peers_on_different_hosts_see_each_other() {
    let mut sim = Builder::new().build();
    serve(&mut sim, RouterConfig::default());

    sim.client("alice", async {
        let mut alice = Peer::connect().await?;
        alice.send("login alice pw12").await?;
        assert_eq!(alice.recv().await?, line::welcome_login("alice"));
        assert_eq!(alice.recv().await?, line::joined("alice"));

        // Wait for bob, then greet him
        assert_eq!(alice.recv().await?, line::joined("bob"));
        alice.send("send bob hi bob").await?;

        assert_eq!(alice.recv().await?, "bob: hi everyone");
        Ok(())
    });

    sim.client("bob", async {
        // Let alice log in first
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let mut bob = Peer::connect().await?;
        bob.send("login bob pw34").await?;
        assert_eq!(bob.recv().await?, line::welcome_login("bob"));
        assert_eq!(bob.recv().await?, line::joined("bob"));

        assert_eq!(bob.recv().await?, "alice: hi bob");
        bob.send("send all hi everyone").await?;
        assert_eq!(bob.recv().await?, "bob: hi everyone");
        Ok(())
    });

    sim.run().unwrap();
}
