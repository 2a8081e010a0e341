//! Server-originated lines.
//!
//! Every function returns a line without its terminator; the transport
//! appends `\n`. System notices carry the `Server: ` prefix, relayed chat
//! text does not.

/// Prefix of every system notice.
pub const SERVER_PREFIX: &str = "Server: ";

/// Header of the `who` listing.
pub const WHO_HEADER: &str = "Current online users";

/// Rule printed under [`WHO_HEADER`].
pub const WHO_RULE: &str = "--------------------";

/// Wrap `text` as a system notice.
pub fn server(text: impl AsRef<str>) -> String {
    format!("{SERVER_PREFIX}{}", text.as_ref())
}

/// Reply to a successful `login`.
pub fn welcome_login(name: &str) -> String {
    server(format!("Welcome {name}, your login request was successful."))
}

/// Reply to a successful `newuser`.
pub fn welcome_registered(name: &str) -> String {
    server(format!("Welcome {name}, you are currently logged in."))
}

/// Notice broadcast when a session authenticates.
pub fn joined(name: &str) -> String {
    server(format!("{name} has joined the chat."))
}

/// Notice broadcast when an authenticated session leaves.
pub fn left(name: &str) -> String {
    server(format!("{name} has left the chat."))
}

/// Final line sent to a session that logged out.
pub fn goodbye(name: &str) -> String {
    server(format!("Goodbye {name}."))
}

/// Relayed chat text.
pub fn chat(sender: &str, text: &str) -> String {
    format!("{sender}: {text}")
}

/// The `who` listing: header, rule, then one name per line.
///
/// Names are emitted in the order given. The result contains embedded
/// newlines and is delivered as a single queue entry so no other line can
/// land inside it.
pub fn who<S: AsRef<str>>(names: &[S]) -> String {
    let mut out = server(WHO_HEADER);
    out.push('\n');
    out.push_str(WHO_RULE);
    for name in names {
        out.push('\n');
        out.push_str(name.as_ref());
    }
    out
}
