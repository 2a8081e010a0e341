//! Fuzz target for the command processor feeding the router driver
//!
//! Drives several sessions through arbitrary lines, connects and
//! disconnects, wiring each processor outcome into the driver the same way
//! the session actors do.
//!
//! # Invariants
//!
//! - NEVER panic
//! - The driver accepts every event forwarded from an authenticated session
//! - A session becomes authenticated only after the driver accepts its join
//! - The registry's authenticated names always equal the names held by live
//!   authenticated sessions
//! - Never more than `max_sessions` live sessions

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use chatboard_core::{
    DepartReason, MemoryUserStore, Outcome, SessionEvent, SessionId, SessionState, processor,
};
use chatboard_server::{RouterConfig, RouterDriver, RouterError, RouterEvent};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Connect,
    Line { session: u8, line: Line },
    Disconnect { session: u8 },
}

#[derive(Debug, Arbitrary)]
enum Line {
    Login { user: u8, good_password: bool },
    NewUser { name: String, password: String },
    SendAll(String),
    SendTo { user: u8, text: String },
    Who,
    Logout,
    Raw(String),
}

const USERS: [(&str, &str); 3] = [("alice", "pw12"), ("bob", "pw34"), ("carol", "pw56")];

impl Line {
    fn render(&self) -> String {
        match self {
            Self::Login { user, good_password } => {
                let (name, password) = USERS[usize::from(*user) % USERS.len()];
                let password = if *good_password { password } else { "wrong" };
                format!("login {name} {password}")
            },
            Self::NewUser { name, password } => format!("newuser {name} {password}"),
            Self::SendAll(text) => format!("send all {text}"),
            Self::SendTo { user, text } => {
                format!("send {} {text}", USERS[usize::from(*user) % USERS.len()].0)
            },
            Self::Who => "who".to_string(),
            Self::Logout => "logout".to_string(),
            Self::Raw(line) => line.clone(),
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let store = MemoryUserStore::with_users(USERS);
    let config = RouterConfig { max_sessions: 4, ..RouterConfig::default() };
    let mut driver = RouterDriver::new(config);
    let mut sessions: BTreeMap<SessionId, SessionState> = BTreeMap::new();
    let mut next_id: SessionId = 1;

    for op in ops.into_iter().take(256) {
        match op {
            Op::Connect => {
                let session_id = next_id;
                next_id += 1;
                driver.process_event(RouterEvent::Admitted { session_id }).expect("fresh id");
                if driver.registry().has_session(session_id) {
                    sessions.insert(session_id, SessionState::new());
                }
            },

            Op::Line { session, line } => {
                let Some(session_id) = pick(&sessions, session) else { continue };
                let state = &sessions[&session_id];

                match processor::process(state, &line.render(), &store) {
                    Outcome::Join { name, kind } => {
                        let event = SessionEvent::Joined { name: name.clone(), kind };
                        match driver.process_event(RouterEvent::Session { session_id, event }) {
                            Ok(_) => {
                                let state = sessions.get_mut(&session_id).expect("live session");
                                state.authenticate(name).expect("anonymous before join");
                            },
                            Err(RouterError::NameInUse(_)) => {},
                            Err(e) => panic!("join rejected: {e}"),
                        }
                    },
                    Outcome::Forward(event) => {
                        assert!(state.is_authenticated());
                        driver
                            .process_event(RouterEvent::Session { session_id, event })
                            .expect("authenticated session event");
                    },
                    Outcome::Logout => {
                        depart(&mut driver, session_id, DepartReason::Logout);
                        sessions.remove(&session_id);
                    },
                    Outcome::Reject(_) | Outcome::Ignore => {},
                }
            },

            Op::Disconnect { session } => {
                let Some(session_id) = pick(&sessions, session) else { continue };
                depart(&mut driver, session_id, DepartReason::Disconnected);
                sessions.remove(&session_id);
            },
        }

        let mut expected: Vec<&str> = sessions
            .values()
            .filter(|state| state.is_authenticated())
            .map(SessionState::display_name)
            .collect();
        expected.sort_unstable();
        assert_eq!(driver.authenticated_names(), expected);
        assert_eq!(driver.active_count(), sessions.len());
        assert!(sessions.len() <= driver.max_sessions());
    }
});

fn pick(sessions: &BTreeMap<SessionId, SessionState>, index: u8) -> Option<SessionId> {
    if sessions.is_empty() {
        return None;
    }
    sessions.keys().nth(usize::from(index) % sessions.len()).copied()
}

fn depart(driver: &mut RouterDriver, session_id: SessionId, reason: DepartReason) {
    let event = SessionEvent::Departed { reason };
    driver.process_event(RouterEvent::Session { session_id, event }).expect("departure");
}
