//! Chatboard line client.
//!
//! A thin pipe between a terminal and the relay: every input line goes to
//! the server verbatim, every server line is printed as is. All command
//! handling happens server side.

#![forbid(unsafe_code)]

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead, FramedWrite, LinesCodec, LinesCodecError,
};

/// Line printed once the server has closed the connection.
pub const FAREWELL: &str = "Goodbye!";

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("connection to {addr} failed: {source}")]
    Connect {
        /// Server address as given
        addr: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Reading from or writing to the server failed.
    #[error("server stream error: {0}")]
    Server(LinesCodecError),

    /// Writing output failed.
    #[error("terminal error: {0}")]
    Terminal(LinesCodecError),

    /// Reading input failed.
    #[error("input error: {0}")]
    Input(AnyDelimiterCodecError),
}

/// Open a TCP connection to the server.
pub async fn connect(addr: &str) -> Result<TcpStream, ClientError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect { addr: addr.to_string(), source })?;

    tracing::debug!("connected to {}", addr);
    Ok(stream)
}

/// Pipe `input` lines to the server and server lines to `output`.
///
/// Returns once the server closes the stream, after writing [`FAREWELL`].
/// End of input only half-closes the connection; lines still in flight from
/// the server are printed until it hangs up. Input that is not valid UTF-8 is
/// sent with the bad bytes replaced by U+FFFD.
pub async fn run<C, I, O>(connection: C, input: I, output: O) -> Result<(), ClientError>
where
    C: AsyncRead + AsyncWrite,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (server_read, server_write) = tokio::io::split(connection);
    let mut from_server = FramedRead::new(server_read, LinesCodec::new());
    let mut to_server = FramedWrite::new(server_write, LinesCodec::new());
    let mut input = FramedRead::new(input, AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec()));
    let mut output = FramedWrite::new(output, LinesCodec::new());
    let mut input_open = true;

    loop {
        tokio::select! {
            line = from_server.next() => match line {
                Some(Ok(line)) => output.send(line).await.map_err(ClientError::Terminal)?,
                Some(Err(e)) => return Err(ClientError::Server(e)),
                None => break,
            },

            line = input.next(), if input_open => match line {
                Some(Ok(raw)) => {
                    let line = String::from_utf8_lossy(&raw);
                    let line = line.trim_end_matches('\r');
                    to_server.send(line).await.map_err(ClientError::Server)?;
                },
                Some(Err(e)) => return Err(ClientError::Input(e)),
                None => {
                    tracing::debug!("input closed");
                    input_open = false;
                    SinkExt::<String>::close(&mut to_server).await.map_err(ClientError::Server)?;
                },
            },
        }
    }

    tracing::debug!("server closed the connection");
    output.send(FAREWELL).await.map_err(ClientError::Terminal)?;
    Ok(())
}
