//! Session actors.
//!
//! Each admitted connection is split into a reader task and a writer task.
//!
//! - The reader splits the stream on `\n`, decodes each line lossily (a bad
//!   byte becomes U+FFFD, never a disconnect), runs the command processor
//!   against its own [`SessionState`] and forwards router-directed events.
//!   Read failure or end of stream is reported to the router as a departure.
//! - The writer drains the session's bounded outbound queue in order and
//!   flushes after every line. It stops once every sender is gone, or on a
//!   write failure (reported as a departure).
//!
//! Neither task touches the registry. A connection the router refuses gets
//! no reader at all, only [`refuse`].

use chatboard_core::{
    CommandError, DepartReason, Outcome, SessionEvent, SessionId, SessionState, UserStore,
    processor,
};
use chatboard_proto::{MAX_LINE_LENGTH, line};
use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot},
    task::AbortHandle,
};
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead, FramedWrite, LinesCodec,
};

use crate::error::RouterError;

/// Verdict on a join request, answered by the router.
pub(crate) type JoinVerdict = Result<(), RouterError>;

/// A session event on its way to the router.
#[derive(Debug)]
pub(crate) struct Envelope {
    /// Emitting session
    pub session_id: SessionId,
    /// The event
    pub event: SessionEvent,
    /// Present for joins: the reader waits on it before authenticating
    pub verdict: Option<oneshot::Sender<JoinVerdict>>,
}

impl Envelope {
    fn event(session_id: SessionId, event: SessionEvent) -> Self {
        Self { session_id, event, verdict: None }
    }

    pub(crate) fn departed(session_id: SessionId, reason: DepartReason) -> Self {
        Self::event(session_id, SessionEvent::Departed { reason })
    }
}

/// Router-side handle to a running session.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    /// Outbound queue, drained by the writer
    pub outbound: mpsc::Sender<String>,
    /// Reader task
    pub reader: AbortHandle,
    /// Writer task
    pub writer: AbortHandle,
}

/// Start the reader and writer tasks for `connection`.
pub(crate) fn spawn<C, S>(
    session_id: SessionId,
    connection: C,
    store: S,
    router: mpsc::Sender<Envelope>,
    outbound_capacity: usize,
) -> SessionHandle
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    S: UserStore,
{
    let (read_half, write_half) = tokio::io::split(connection);
    let (outbound_tx, outbound_rx) = mpsc::channel(outbound_capacity.max(1));

    let writer = tokio::spawn(write_loop(session_id, write_half, outbound_rx, router.clone()));
    let reader =
        tokio::spawn(read_loop(session_id, read_half, store, outbound_tx.clone(), router));

    SessionHandle {
        outbound: outbound_tx,
        reader: reader.abort_handle(),
        writer: writer.abort_handle(),
    }
}

async fn read_loop<R, S>(
    session_id: SessionId,
    reader: R,
    store: S,
    outbound: mpsc::Sender<String>,
    router: mpsc::Sender<Envelope>,
) where
    R: AsyncRead + Unpin,
    S: UserStore,
{
    let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_LINE_LENGTH);
    let mut lines = FramedRead::new(reader, codec);
    let mut state = SessionState::new();
    // FramedRead yields one `None` right after a decode error before resuming
    let mut after_decode_error = false;

    let reason = loop {
        let raw = match lines.next().await {
            Some(Ok(raw)) => {
                after_decode_error = false;
                String::from_utf8_lossy(&raw).into_owned()
            },
            Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                after_decode_error = true;
                if reply(&outbound, &CommandError::LineTooLong).await.is_err() {
                    break DepartReason::Disconnected;
                }
                continue;
            },
            None if after_decode_error => {
                after_decode_error = false;
                continue;
            },
            Some(Err(AnyDelimiterCodecError::Io(e))) => {
                tracing::debug!(session_id, "read error: {}", e);
                break DepartReason::Disconnected;
            },
            None => {
                tracing::debug!(session_id, "peer closed stream");
                break DepartReason::Disconnected;
            },
        };

        tracing::debug!(session_id, name = state.display_name(), "received: {}", raw);

        match processor::process(&state, &raw, &store) {
            Outcome::Reject(err) => {
                if reply(&outbound, &err).await.is_err() {
                    break DepartReason::Disconnected;
                }
            },
            Outcome::Join { name, kind } => {
                let (verdict_tx, verdict_rx) = oneshot::channel();
                let envelope = Envelope {
                    session_id,
                    event: SessionEvent::Joined { name: name.clone(), kind },
                    verdict: Some(verdict_tx),
                };
                if router.send(envelope).await.is_err() {
                    return;
                }

                match verdict_rx.await {
                    Ok(Ok(())) => {
                        if let Err(e) = state.authenticate(name) {
                            tracing::warn!(session_id, "session state out of sync: {}", e);
                        }
                    },
                    Ok(Err(RouterError::NameInUse(name))) => {
                        if reply(&outbound, &CommandError::NameInUse(name)).await.is_err() {
                            break DepartReason::Disconnected;
                        }
                    },
                    Ok(Err(e)) => tracing::warn!(session_id, "join refused: {}", e),
                    Err(_) => return,
                }
            },
            Outcome::Forward(event) => {
                if router.send(Envelope::event(session_id, event)).await.is_err() {
                    return;
                }
            },
            Outcome::Logout => break DepartReason::Logout,
            Outcome::Ignore => {},
        }
    };

    state.terminate();
    // The router may already be gone during shutdown
    let _ = router.send(Envelope::departed(session_id, reason)).await;
}

async fn write_loop<W>(
    session_id: SessionId,
    writer: W,
    mut outbound: mpsc::Receiver<String>,
    router: mpsc::Sender<Envelope>,
) where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    while let Some(line) = outbound.recv().await {
        // `send` flushes after every line
        if let Err(e) = sink.send(line).await {
            tracing::debug!(session_id, "write error: {}", e);
            let _ = router.send(Envelope::departed(session_id, DepartReason::Disconnected)).await;
            return;
        }
    }

    if let Err(e) = SinkExt::<String>::close(&mut sink).await {
        tracing::debug!(session_id, "shutdown error: {}", e);
    }
}

/// Write `notices` to a connection the router did not admit, then shut it
/// down. Nothing is read from it.
pub(crate) fn refuse<C>(session_id: SessionId, connection: C, notices: Vec<String>)
where
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        let (_read_half, write_half) = tokio::io::split(connection);
        let mut sink = FramedWrite::new(write_half, LinesCodec::new());

        for notice in notices {
            if let Err(e) = sink.send(notice).await {
                tracing::debug!(session_id, "refusal write error: {}", e);
                return;
            }
        }
        if let Err(e) = SinkExt::<String>::close(&mut sink).await {
            tracing::debug!(session_id, "shutdown error: {}", e);
        }
    });
}

/// Queue a refusal for the caller. Fails only once the writer is gone.
async fn reply(
    outbound: &mpsc::Sender<String>,
    err: &CommandError,
) -> Result<(), mpsc::error::SendError<String>> {
    outbound.send(line::server(err.to_string())).await
}
