//! Router runtime.
//!
//! A single task owns the [`RouterDriver`] and the outbound handle of every
//! session. It multiplexes two event sources, admissions and session events,
//! and processes them strictly one at a time. Actions are executed before the
//! next event is taken, so no two broadcasts or registry edits interleave.
//!
//! # Outbound overflow
//!
//! Outbound queues are bounded and the router never waits on them. When a
//! queue is full the session is closed as a slow consumer: it departs with
//! [`DepartReason::Overflow`], its tasks are aborted without draining, and
//! the remaining sessions see the usual departure notice.
//!
//! # Admission
//!
//! The driver rules on capacity before any session task exists. A refused
//! connection only gets its notice written back; no reader is ever started
//! for it. Every admission is acknowledged once the active count reflects
//! it, so an accept loop gated on [`RouterHandle::active_count`] never
//! overshoots.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use chatboard_core::{DepartReason, SessionEvent, SessionId, UserStore};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{Notify, mpsc, mpsc::error::TrySendError, oneshot},
};

use crate::{
    driver::{LogLevel, RouterAction, RouterConfig, RouterDriver, RouterEvent},
    error::ServerError,
    session::{self, Envelope, SessionHandle},
};

/// Capacity of the admission channel.
const ADMISSION_QUEUE: usize = 16;

/// Capacity of the session-event channel shared by all sessions.
const EVENT_QUEUE: usize = 1024;

/// Cloneable handle to a running router.
///
/// The router task stops once every handle is dropped.
pub struct RouterHandle<C> {
    admissions: mpsc::Sender<Admission<C>>,
    active: Arc<AtomicUsize>,
    capacity: Arc<Notify>,
}

impl<C> Clone for RouterHandle<C> {
    fn clone(&self) -> Self {
        Self {
            admissions: self.admissions.clone(),
            active: Arc::clone(&self.active),
            capacity: Arc::clone(&self.capacity),
        }
    }
}

impl<C> RouterHandle<C>
where
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Hand a newly accepted connection to the router.
    ///
    /// Returns once the router has admitted or refused it; by then
    /// [`active_count`](Self::active_count) includes it if it was admitted.
    pub async fn admit(&self, connection: C) -> Result<(), ServerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.admissions
            .send(Admission { connection, ack: ack_tx })
            .await
            .map_err(|_| ServerError::RouterClosed)?;
        ack_rx.await.map_err(|_| ServerError::RouterClosed)
    }

    /// Number of sessions currently registered.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Wait until fewer than `max` sessions are registered.
    pub async fn wait_for_capacity(&self, max: usize) {
        loop {
            // Register interest before checking so a removal in between is
            // not missed
            let notified = self.capacity.notified();
            if self.active_count() < max {
                return;
            }
            notified.await;
        }
    }
}

/// Spawn the router task.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_router<S, C>(store: S, config: RouterConfig) -> RouterHandle<C>
where
    S: UserStore,
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    let (admissions_tx, admissions_rx) = mpsc::channel(ADMISSION_QUEUE);
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
    let active = Arc::new(AtomicUsize::new(0));
    let capacity = Arc::new(Notify::new());

    let router = Router {
        outbound_capacity: config.outbound_capacity,
        driver: RouterDriver::new(config),
        store,
        sessions: HashMap::new(),
        admissions: admissions_rx,
        events: events_rx,
        events_tx,
        next_session_id: 1,
        active: Arc::clone(&active),
        capacity: Arc::clone(&capacity),
    };

    tokio::spawn(router.run());

    RouterHandle { admissions: admissions_tx, active, capacity }
}

/// A connection waiting for the router's ruling.
struct Admission<C> {
    connection: C,
    /// Answered after the ruling is reflected in the active count
    ack: oneshot::Sender<()>,
}

struct Router<S, C> {
    driver: RouterDriver,
    store: S,
    /// Session ID → outbound handle. Mirrors the driver's registry
    sessions: HashMap<SessionId, SessionHandle>,
    admissions: mpsc::Receiver<Admission<C>>,
    events: mpsc::Receiver<Envelope>,
    /// Cloned into every session
    events_tx: mpsc::Sender<Envelope>,
    next_session_id: SessionId,
    outbound_capacity: usize,
    active: Arc<AtomicUsize>,
    capacity: Arc<Notify>,
}

impl<S, C> Router<S, C>
where
    S: UserStore,
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn run(mut self) {
        tracing::debug!("router started");

        loop {
            tokio::select! {
                biased;

                Some(envelope) = self.events.recv() => self.handle_envelope(envelope),

                admission = self.admissions.recv() => match admission {
                    Some(Admission { connection, ack }) => {
                        self.handle_admission(connection);
                        self.publish_active_count();
                        let _ = ack.send(());
                    },
                    None => break,
                },
            }

            self.publish_active_count();
        }

        for (_, handle) in self.sessions.drain() {
            handle.reader.abort();
            handle.writer.abort();
        }
        tracing::debug!("router stopped");
    }

    fn handle_admission(&mut self, connection: C) {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let actions = match self.driver.process_event(RouterEvent::Admitted { session_id }) {
            Ok(actions) => actions,
            Err(e) => {
                tracing::error!("admission of session {} failed: {}", session_id, e);
                return;
            },
        };

        if !self.driver.registry().has_session(session_id) {
            self.refuse(session_id, connection, actions);
            return;
        }

        let handle = session::spawn(
            session_id,
            connection,
            self.store.clone(),
            self.events_tx.clone(),
            self.outbound_capacity,
        );
        self.sessions.insert(session_id, handle);
        self.execute(actions);
    }

    /// Send the refusal notices straight to the connection; log the rest.
    fn refuse(&mut self, session_id: SessionId, connection: C, actions: Vec<RouterAction>) {
        let mut notices = Vec::new();
        let mut rest = Vec::new();

        for action in actions {
            match action {
                RouterAction::Send { session_id: target, line } if target == session_id => {
                    notices.push(line);
                },
                RouterAction::Close { session_id: target, .. } if target == session_id => {},
                other => rest.push(other),
            }
        }

        session::refuse(session_id, connection, notices);
        self.execute(rest);
    }

    fn handle_envelope(&mut self, envelope: Envelope) {
        let Envelope { session_id, event, verdict } = envelope;
        let kind = event_name(&event);
        let result = self.driver.process_event(RouterEvent::Session { session_id, event });

        match (result, verdict) {
            (Ok(actions), verdict) => {
                self.execute(actions);
                if let Some(verdict) = verdict {
                    let _ = verdict.send(Ok(()));
                }
            },
            (Err(e), Some(verdict)) => {
                tracing::info!("session {} join refused: {}", session_id, e);
                let _ = verdict.send(Err(e));
            },
            (Err(e), None) => {
                tracing::warn!("session {} {} event rejected: {}", session_id, kind, e);
            },
        }
    }

    /// Execute actions, then close every session whose queue overflowed.
    fn execute(&mut self, actions: Vec<RouterAction>) {
        let mut overflowed = Vec::new();
        self.run_actions(actions, &mut overflowed);

        while let Some(session_id) = overflowed.pop() {
            let event = SessionEvent::Departed { reason: DepartReason::Overflow };
            match self.driver.process_event(RouterEvent::Session { session_id, event }) {
                Ok(actions) => self.run_actions(actions, &mut overflowed),
                Err(e) => tracing::warn!("overflow close of session {} failed: {}", session_id, e),
            }
        }
    }

    fn run_actions(&mut self, actions: Vec<RouterAction>, overflowed: &mut Vec<SessionId>) {
        for action in actions {
            match action {
                RouterAction::Send { session_id, line } => {
                    let Some(handle) = self.sessions.get(&session_id) else {
                        tracing::debug!("send: session {} not found", session_id);
                        continue;
                    };

                    match handle.outbound.try_send(line) {
                        Ok(()) => {},
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!("session {} outbound queue full, closing", session_id);
                            if !overflowed.contains(&session_id) {
                                overflowed.push(session_id);
                            }
                        },
                        // Writer already stopped; its departure is on the way
                        Err(TrySendError::Closed(_)) => {
                            tracing::debug!("send: session {} writer closed", session_id);
                        },
                    }
                },

                RouterAction::Close { session_id, reason } => {
                    tracing::debug!("closing session {}: {:?}", session_id, reason);
                    self.drop_session(session_id, reason.drains_queue());
                },

                RouterAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                },
            }
        }
    }

    /// Release a session's handle. The reader stops immediately; the writer
    /// either drains what is queued and shuts the connection down, or is
    /// aborted.
    fn drop_session(&mut self, session_id: SessionId, drain: bool) {
        if let Some(handle) = self.sessions.remove(&session_id) {
            handle.reader.abort();
            if !drain {
                handle.writer.abort();
            }
        }
    }

    fn publish_active_count(&self) {
        let current = self.driver.active_count();
        let previous = self.active.swap(current, Ordering::AcqRel);
        if current < previous {
            self.capacity.notify_waiters();
        }
    }
}

fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Joined { .. } => "joined",
        SessionEvent::Message { .. } => "message",
        SessionEvent::Departed { .. } => "departed",
        SessionEvent::Who => "who",
    }
}
