//! Fuzz target for client line parsing
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary input decoded lossily, as the line codec would hand
//!   it over
//! - Shaped lines: a known or garbled verb followed by arbitrary arguments
//!
//! # Invariants
//!
//! - NEVER panic
//! - A parsed command renders to a line that parses to the same kind
//! - Verb matching ignores case

#![no_main]

use arbitrary::Arbitrary;
use chatboard_proto::{Command, CommandKind};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    Shaped { verb: Verb, upper: bool, args: Vec<String> },
}

#[derive(Debug, Arbitrary)]
enum Verb {
    Login,
    NewUser,
    Send,
    Logout,
    Who,
    Other(String),
}

fuzz_target!(|input: Input| {
    let line = match input {
        Input::Raw(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Input::Shaped { verb, upper, args } => {
            let verb = match verb {
                Verb::Login => "login".to_string(),
                Verb::NewUser => "newuser".to_string(),
                Verb::Send => "send".to_string(),
                Verb::Logout => "logout".to_string(),
                Verb::Who => "who".to_string(),
                Verb::Other(s) => s,
            };
            let verb = if upper { verb.to_uppercase() } else { verb };
            let mut line = verb;
            for arg in args {
                line.push(' ');
                line.push_str(&arg);
            }
            line
        },
    };

    let Ok(command) = Command::parse(&line) else {
        return;
    };

    let rendered = command.to_string();
    let reparsed = Command::parse(&rendered).expect("rendered command must parse");
    assert_eq!(reparsed.kind(), command.kind());

    let first = line.trim_start().split_ascii_whitespace().next().unwrap_or_default();
    assert_eq!(CommandKind::parse_verb(first), Some(command.kind()));
});
