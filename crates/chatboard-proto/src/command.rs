//! Client command grammar.

use std::fmt;

use thiserror::Error;

use crate::BROADCAST_TARGET;

/// Recipient of a `send` command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every authenticated session, sender included
    All,
    /// The session authenticated under exactly this name
    User(String),
}

impl Target {
    /// Interpret a target token. `all` matches case-insensitively, user
    /// names are kept verbatim.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case(BROADCAST_TARGET) {
            Self::All
        } else {
            Self::User(token.to_string())
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(BROADCAST_TARGET),
            Self::User(name) => f.write_str(name),
        }
    }
}

/// Command verbs, independent of their arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `login <username> <password>`
    Login,
    /// `newuser <username> <password>`
    NewUser,
    /// `send <target> <message...>`
    Send,
    /// `logout`
    Logout,
    /// `who`
    Who,
}

impl CommandKind {
    /// Match a verb token, ignoring ASCII case.
    pub fn parse_verb(token: &str) -> Option<Self> {
        const VERBS: [(&str, CommandKind); 5] = [
            ("login", CommandKind::Login),
            ("newuser", CommandKind::NewUser),
            ("send", CommandKind::Send),
            ("logout", CommandKind::Logout),
            ("who", CommandKind::Who),
        ];

        VERBS.iter().find(|(verb, _)| verb.eq_ignore_ascii_case(token)).map(|(_, kind)| *kind)
    }

    /// Canonical lowercase verb.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::NewUser => "newuser",
            Self::Send => "send",
            Self::Logout => "logout",
            Self::Who => "who",
        }
    }

    /// Usage string shown when the argument shape is wrong.
    pub fn usage(self) -> &'static str {
        match self {
            Self::Login => "login <username> <password>",
            Self::NewUser => "newuser <username> <password>",
            Self::Send => "send <all|username> <message>",
            Self::Logout => "logout",
            Self::Who => "who",
        }
    }

    /// Whether the verb is only accepted from an authenticated session.
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Send | Self::Logout | Self::Who)
    }
}

/// Errors produced while parsing a client line.
///
/// Both variants are recoverable: the reply goes back to the caller and the
/// connection stays open. The `Display` text is the reply body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First token is not a known verb (includes blank lines)
    #[error("Command not found.")]
    UnknownCommand(String),

    /// Known verb with the wrong argument shape
    #[error("Usage: {}", .0.usage())]
    Usage(CommandKind),
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate with existing credentials
    Login {
        /// Account name
        username: String,
        /// Account password
        password: String,
    },
    /// Register new credentials, then authenticate with them
    NewUser {
        /// Requested account name
        username: String,
        /// Requested password
        password: String,
    },
    /// Relay a message
    Send {
        /// Broadcast or a single named session
        target: Target,
        /// Message body, interior whitespace preserved
        text: String,
    },
    /// Leave the chat and close the connection
    Logout,
    /// List authenticated users
    Who,
}

impl Command {
    /// Parse one line, with or without its `\n` / `\r\n` terminator.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']).trim_start();
        let (verb, rest) = split_token(line);

        let kind = CommandKind::parse_verb(verb)
            .ok_or_else(|| ParseError::UnknownCommand(verb.to_string()))?;

        match kind {
            CommandKind::Login | CommandKind::NewUser => {
                let args: Vec<&str> = rest.split_ascii_whitespace().collect();
                let [username, password] = args.as_slice() else {
                    return Err(ParseError::Usage(kind));
                };
                let (username, password) = (username.to_string(), password.to_string());

                Ok(if kind == CommandKind::Login {
                    Self::Login { username, password }
                } else {
                    Self::NewUser { username, password }
                })
            },
            CommandKind::Send => {
                let (target, text) = split_token(rest.trim_start());
                let text = text.trim();
                if target.is_empty() || text.is_empty() {
                    return Err(ParseError::Usage(kind));
                }

                Ok(Self::Send { target: Target::from_token(target), text: text.to_string() })
            },
            CommandKind::Logout | CommandKind::Who => {
                if !rest.trim().is_empty() {
                    return Err(ParseError::Usage(kind));
                }

                Ok(if kind == CommandKind::Logout { Self::Logout } else { Self::Who })
            },
        }
    }

    /// Verb of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Login { .. } => CommandKind::Login,
            Self::NewUser { .. } => CommandKind::NewUser,
            Self::Send { .. } => CommandKind::Send,
            Self::Logout => CommandKind::Logout,
            Self::Who => CommandKind::Who,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { username, password } | Self::NewUser { username, password } => {
                write!(f, "{} {username} {password}", self.kind().verb())
            },
            Self::Send { target, text } => write!(f, "send {target} {text}"),
            Self::Logout | Self::Who => f.write_str(self.kind().verb()),
        }
    }
}

/// Split off the first whitespace-delimited token. The remainder keeps its
/// leading whitespace.
fn split_token(s: &str) -> (&str, &str) {
    match s.find(|c: char| c.is_ascii_whitespace()) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}
