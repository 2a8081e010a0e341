//! Router driver.
//!
//! Owns the [`SessionRegistry`] and turns [`RouterEvent`]s into
//! [`RouterAction`]s. Pure: no I/O, no channels, no clock. The router runtime
//! feeds it one event at a time and executes the returned actions in order,
//! which is what serializes every registry mutation and every broadcast.

use chatboard_core::{DepartReason, JoinKind, SessionEvent, SessionId};
use chatboard_proto::{DEFAULT_MAX_CLIENTS, Target, line};

use crate::{error::RouterError, registry::SessionRegistry};

/// Default per-session outbound queue capacity.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Maximum concurrently registered sessions
    pub max_sessions: usize,
    /// Lines a session's outbound queue holds before the session is closed
    pub outbound_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { max_sessions: DEFAULT_MAX_CLIENTS, outbound_capacity: DEFAULT_OUTBOUND_CAPACITY }
    }
}

/// Events that the router driver processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// A new connection was accepted and became a session
    Admitted {
        /// Unique ID assigned by the runtime
        session_id: SessionId,
    },

    /// A session emitted an event
    Session {
        /// Emitting session
        session_id: SessionId,
        /// What the session asks for
        event: SessionEvent,
    },
}

/// Why a connection is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The session departed
    Departed(DepartReason),
    /// Admission refused: too many sessions
    CapacityExceeded,
}

impl CloseReason {
    /// Whether queued lines should still be written before closing.
    ///
    /// A session closed for overflow is not draining its queue, so waiting
    /// for it would never finish.
    pub fn drains_queue(self) -> bool {
        !matches!(self, Self::Departed(DepartReason::Overflow))
    }
}

/// Actions that the router driver produces.
///
/// Executed by the router runtime in the order returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Enqueue a line on a session's outbound queue
    Send {
        /// Target session ID
        session_id: SessionId,
        /// Line without terminator
        line: String,
    },

    /// Close a connection
    Close {
        /// Session to close
        session_id: SessionId,
        /// Reason for closure
        reason: CloseReason,
    },

    /// Log a message
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for router actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
}

/// Action-based router driver.
#[derive(Debug, Default)]
pub struct RouterDriver {
    /// Session registry
    registry: SessionRegistry,
    /// Router configuration
    config: RouterConfig,
}

impl RouterDriver {
    /// Create a new router driver.
    pub fn new(config: RouterConfig) -> Self {
        Self { registry: SessionRegistry::new(), config }
    }

    /// Process a router event and return actions to execute.
    ///
    /// On error no state has changed.
    pub fn process_event(&mut self, event: RouterEvent) -> Result<Vec<RouterAction>, RouterError> {
        match event {
            RouterEvent::Admitted { session_id } => self.handle_admitted(session_id),
            RouterEvent::Session { session_id, event } => match event {
                SessionEvent::Joined { name, kind } => self.handle_joined(session_id, name, kind),
                SessionEvent::Message { target, text } => {
                    self.handle_message(session_id, &target, &text)
                },
                SessionEvent::Departed { reason } => Ok(self.handle_departed(session_id, reason)),
                SessionEvent::Who => self.handle_who(session_id),
            },
        }
    }

    fn handle_admitted(&mut self, session_id: SessionId) -> Result<Vec<RouterAction>, RouterError> {
        if self.registry.session_count() >= self.config.max_sessions {
            return Ok(vec![
                RouterAction::Send {
                    session_id,
                    line: line::server("Server is full, please try again later."),
                },
                RouterAction::Close { session_id, reason: CloseReason::CapacityExceeded },
                RouterAction::Log {
                    level: LogLevel::Warn,
                    message: format!("session {session_id} refused: max connections exceeded"),
                },
            ]);
        }

        if !self.registry.register_session(session_id) {
            return Err(RouterError::SessionAlreadyExists(session_id));
        }

        Ok(vec![RouterAction::Log {
            level: LogLevel::Debug,
            message: format!("session {session_id} admitted"),
        }])
    }

    fn handle_joined(
        &mut self,
        session_id: SessionId,
        name: String,
        kind: JoinKind,
    ) -> Result<Vec<RouterAction>, RouterError> {
        self.registry.authenticate(session_id, &name)?;

        let welcome = match kind {
            JoinKind::Login => line::welcome_login(&name),
            JoinKind::Registration => line::welcome_registered(&name),
        };

        let mut actions = vec![RouterAction::Send { session_id, line: welcome }];
        actions.extend(self.broadcast(&line::joined(&name)));
        actions.push(RouterAction::Log {
            level: LogLevel::Info,
            message: format!("{name} logged in on session {session_id}"),
        });

        Ok(actions)
    }

    fn handle_message(
        &self,
        session_id: SessionId,
        target: &Target,
        text: &str,
    ) -> Result<Vec<RouterAction>, RouterError> {
        let sender = self.authenticated_name(session_id)?;
        let line = line::chat(sender, text);

        match target {
            Target::All => Ok(self.broadcast(&line)),
            Target::User(name) => match self.registry.session_for_name(name) {
                Some(recipient) => Ok(vec![RouterAction::Send { session_id: recipient, line }]),
                None => Ok(vec![RouterAction::Log {
                    level: LogLevel::Debug,
                    message: format!("unicast from {sender} to unknown user {name} dropped"),
                }]),
            },
        }
    }

    /// Idempotent: a session that is already gone yields no actions.
    fn handle_departed(&mut self, session_id: SessionId, reason: DepartReason) -> Vec<RouterAction> {
        let Some(info) = self.registry.unregister_session(session_id) else {
            return Vec::new();
        };

        let mut actions = Vec::new();

        if let Some(name) = &info.name {
            if reason == DepartReason::Logout {
                actions.push(RouterAction::Send { session_id, line: line::goodbye(name) });
            }
        }

        actions.push(RouterAction::Close { session_id, reason: CloseReason::Departed(reason) });

        match &info.name {
            Some(name) => {
                actions.extend(self.broadcast(&line::left(name)));
                actions.push(RouterAction::Log {
                    level: LogLevel::Info,
                    message: format!("{name} left session {session_id}: {}", reason.as_str()),
                });
            },
            None => actions.push(RouterAction::Log {
                level: LogLevel::Debug,
                message: format!("anonymous session {session_id} closed: {}", reason.as_str()),
            }),
        }

        actions
    }

    fn handle_who(&self, session_id: SessionId) -> Result<Vec<RouterAction>, RouterError> {
        self.authenticated_name(session_id)?;

        let names = self.registry.authenticated_names();
        Ok(vec![RouterAction::Send { session_id, line: line::who(&names) }])
    }

    /// One `Send` per authenticated session.
    fn broadcast(&self, line: &str) -> Vec<RouterAction> {
        self.registry
            .authenticated_sessions()
            .map(|session_id| RouterAction::Send { session_id, line: line.to_string() })
            .collect()
    }

    fn authenticated_name(&self, session_id: SessionId) -> Result<&str, RouterError> {
        let info =
            self.registry.session(session_id).ok_or(RouterError::SessionNotFound(session_id))?;
        info.name.as_deref().ok_or(RouterError::NotAuthenticated(session_id))
    }

    /// Number of registered sessions, authenticated or not.
    pub fn active_count(&self) -> usize {
        self.registry.session_count()
    }

    /// Configured session limit.
    pub fn max_sessions(&self) -> usize {
        self.config.max_sessions
    }

    /// Names of authenticated sessions, sorted.
    pub fn authenticated_names(&self) -> Vec<&str> {
        self.registry.authenticated_names()
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted(driver: &mut RouterDriver, session_id: SessionId) {
        driver.process_event(RouterEvent::Admitted { session_id }).unwrap();
    }

    fn session(session_id: SessionId, event: SessionEvent) -> RouterEvent {
        RouterEvent::Session { session_id, event }
    }

    fn joined(name: &str) -> SessionEvent {
        SessionEvent::Joined { name: name.to_string(), kind: JoinKind::Login }
    }

    fn logged_in(driver: &mut RouterDriver, session_id: SessionId, name: &str) {
        admitted(driver, session_id);
        driver.process_event(session(session_id, joined(name))).unwrap();
    }

    /// `(session_id, line)` for every `Send`, sorted for set comparison.
    fn sends(actions: &[RouterAction]) -> Vec<(SessionId, String)> {
        let mut sends: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                RouterAction::Send { session_id, line } => Some((*session_id, line.clone())),
                _ => None,
            })
            .collect();
        sends.sort();
        sends
    }

    #[test]
    fn router_admits_session() {
        let mut driver = RouterDriver::default();

        let actions = driver.process_event(RouterEvent::Admitted { session_id: 1 }).unwrap();

        assert_eq!(driver.active_count(), 1);
        assert!(matches!(actions[0], RouterAction::Log { level: LogLevel::Debug, .. }));
    }

    #[test]
    fn router_rejects_when_max_sessions_exceeded() {
        let mut driver = RouterDriver::new(RouterConfig { max_sessions: 2, ..Default::default() });

        admitted(&mut driver, 1);
        admitted(&mut driver, 2);
        let actions = driver.process_event(RouterEvent::Admitted { session_id: 3 }).unwrap();

        assert_eq!(driver.active_count(), 2);
        assert!(actions.contains(&RouterAction::Close {
            session_id: 3,
            reason: CloseReason::CapacityExceeded
        }));
    }

    #[test]
    fn duplicate_admission_is_an_error() {
        let mut driver = RouterDriver::default();
        admitted(&mut driver, 1);

        let result = driver.process_event(RouterEvent::Admitted { session_id: 1 });
        assert_eq!(result, Err(RouterError::SessionAlreadyExists(1)));
    }

    #[test]
    fn join_welcomes_caller_then_notifies_authenticated() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        admitted(&mut driver, 2);

        let actions = driver.process_event(session(2, joined("bob"))).unwrap();

        assert_eq!(actions[0], RouterAction::Send {
            session_id: 2,
            line: line::welcome_login("bob")
        });
        assert_eq!(sends(&actions[1..]), vec![
            (1, line::joined("bob")),
            (2, line::joined("bob")),
        ]);
    }

    #[test]
    fn join_does_not_notify_anonymous_sessions() {
        let mut driver = RouterDriver::default();
        admitted(&mut driver, 1);
        admitted(&mut driver, 2);

        let actions = driver.process_event(session(2, joined("bob"))).unwrap();

        assert!(sends(&actions).iter().all(|(id, _)| *id == 2));
    }

    #[test]
    fn registration_uses_registration_welcome() {
        let mut driver = RouterDriver::default();
        admitted(&mut driver, 1);

        let event = SessionEvent::Joined { name: "carol".into(), kind: JoinKind::Registration };
        let actions = driver.process_event(session(1, event)).unwrap();

        assert_eq!(actions[0], RouterAction::Send {
            session_id: 1,
            line: line::welcome_registered("carol")
        });
    }

    #[test]
    fn duplicate_name_is_rejected_without_state_change() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        admitted(&mut driver, 2);

        let result = driver.process_event(session(2, joined("alice")));

        assert_eq!(result, Err(RouterError::NameInUse("alice".to_string())));
        assert_eq!(driver.authenticated_names(), vec!["alice"]);
        assert!(!driver.registry().session(2).unwrap().is_authenticated());
    }

    #[test]
    fn broadcast_reaches_every_authenticated_session_including_sender() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        logged_in(&mut driver, 2, "bob");
        admitted(&mut driver, 3);

        let event = SessionEvent::Message { target: Target::All, text: "hi".into() };
        let actions = driver.process_event(session(1, event)).unwrap();

        assert_eq!(sends(&actions), vec![
            (1, "alice: hi".to_string()),
            (2, "alice: hi".to_string())
        ]);
    }

    #[test]
    fn unicast_reaches_only_the_named_session() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        logged_in(&mut driver, 2, "bob");

        let event =
            SessionEvent::Message { target: Target::User("bob".into()), text: "psst".into() };
        let actions = driver.process_event(session(1, event)).unwrap();

        assert_eq!(sends(&actions), vec![(2, "alice: psst".to_string())]);
    }

    #[test]
    fn unicast_to_unknown_user_is_a_noop() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");

        let event =
            SessionEvent::Message { target: Target::User("nobody".into()), text: "hi".into() };
        let actions = driver.process_event(session(1, event)).unwrap();

        assert!(sends(&actions).is_empty());
    }

    #[test]
    fn message_from_anonymous_session_is_an_error() {
        let mut driver = RouterDriver::default();
        admitted(&mut driver, 1);

        let event = SessionEvent::Message { target: Target::All, text: "hi".into() };
        assert_eq!(
            driver.process_event(session(1, event)),
            Err(RouterError::NotAuthenticated(1))
        );
    }

    #[test]
    fn who_lists_authenticated_names_to_requester_only() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "bob");
        logged_in(&mut driver, 2, "alice");
        admitted(&mut driver, 3);

        let actions = driver.process_event(session(1, SessionEvent::Who)).unwrap();

        assert_eq!(sends(&actions), vec![(1, line::who(&["alice", "bob"]))]);
    }

    #[test]
    fn who_from_unknown_session_is_an_error() {
        let mut driver = RouterDriver::default();

        let result = driver.process_event(session(42, SessionEvent::Who));
        assert_eq!(result, Err(RouterError::SessionNotFound(42)));
    }

    #[test]
    fn logout_says_goodbye_closes_and_notifies_others() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        logged_in(&mut driver, 2, "bob");

        let event = SessionEvent::Departed { reason: DepartReason::Logout };
        let actions = driver.process_event(session(1, event)).unwrap();

        assert_eq!(actions[0], RouterAction::Send { session_id: 1, line: line::goodbye("alice") });
        assert_eq!(actions[1], RouterAction::Close {
            session_id: 1,
            reason: CloseReason::Departed(DepartReason::Logout)
        });
        assert_eq!(sends(&actions[2..]), vec![(2, line::left("alice"))]);
        assert_eq!(driver.active_count(), 1);
        assert_eq!(driver.authenticated_names(), vec!["bob"]);
    }

    #[test]
    fn disconnect_of_anonymous_session_is_silent() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        admitted(&mut driver, 2);

        let event = SessionEvent::Departed { reason: DepartReason::Disconnected };
        let actions = driver.process_event(session(2, event)).unwrap();

        assert!(sends(&actions).is_empty());
        assert!(actions.contains(&RouterAction::Close {
            session_id: 2,
            reason: CloseReason::Departed(DepartReason::Disconnected)
        }));
    }

    #[test]
    fn departure_is_idempotent() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");

        let event = SessionEvent::Departed { reason: DepartReason::Disconnected };
        driver.process_event(session(1, event.clone())).unwrap();
        let actions = driver.process_event(session(1, event)).unwrap();

        assert!(actions.is_empty());
    }

    #[test]
    fn departed_name_can_log_in_again() {
        let mut driver = RouterDriver::default();
        logged_in(&mut driver, 1, "alice");
        let event = SessionEvent::Departed { reason: DepartReason::Logout };
        driver.process_event(session(1, event)).unwrap();

        admitted(&mut driver, 2);
        assert!(driver.process_event(session(2, joined("alice"))).is_ok());
    }

    #[test]
    fn overflow_close_does_not_drain() {
        assert!(!CloseReason::Departed(DepartReason::Overflow).drains_queue());
        assert!(CloseReason::Departed(DepartReason::Logout).drains_queue());
        assert!(CloseReason::CapacityExceeded.drains_queue());
    }
}
