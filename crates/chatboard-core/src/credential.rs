//! Credentials and the rules for registering new ones.

use chatboard_proto::BROADCAST_TARGET;

use crate::error::CredentialError;

/// Usernames must be strictly shorter than this many characters.
pub const MAX_USERNAME_LEN: usize = 32;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Longest accepted password, in characters.
pub const MAX_PASSWORD_LEN: usize = 8;

/// Characters that delimit a record in the on-disk format.
const RESERVED_CHARS: [char; 3] = ['(', ')', ','];

/// A username/password pair owned by the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Unique within the store
    pub username: String,
    /// Stored and compared verbatim
    pub password: String,
}

impl Credential {
    /// Build a credential from borrowed parts.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Both fields equal.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Check the shape of a credential about to be registered.
///
/// Does not check for duplicates; the store does that under its own lock.
pub fn validate_new_credential(username: &str, password: &str) -> Result<(), CredentialError> {
    if username.chars().count() >= MAX_USERNAME_LEN {
        return Err(CredentialError::UsernameTooLong);
    }

    let password_len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return Err(CredentialError::PasswordLength);
    }

    if username.eq_ignore_ascii_case(BROADCAST_TARGET) {
        return Err(CredentialError::ReservedName);
    }

    if username.contains(RESERVED_CHARS) || password.contains(RESERVED_CHARS) {
        return Err(CredentialError::InvalidCharacters);
    }

    Ok(())
}

/// In-memory credential list shared by the store implementations.
///
/// Lookups are linear; the store is loaded once and only grows by
/// registration.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    entries: Vec<Credential>,
}

impl CredentialTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table from already-loaded credentials.
    pub fn from_credentials(entries: Vec<Credential>) -> Self {
        Self { entries }
    }

    /// Whether `username` is registered.
    pub fn exists(&self, username: &str) -> bool {
        self.entries.iter().any(|c| c.username == username)
    }

    /// Whether the pair matches a registered credential.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.entries.iter().any(|c| c.matches(username, password))
    }

    /// Validate a new credential and make sure the name is free.
    pub fn check_new(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        validate_new_credential(username, password)?;
        if self.exists(username) {
            return Err(CredentialError::UserExists);
        }
        Ok(())
    }

    /// Add a credential that already passed [`Self::check_new`].
    pub fn insert(&mut self, credential: Credential) {
        debug_assert!(!self.exists(&credential.username));
        self.entries.push(credential);
    }

    /// All credentials in load/registration order.
    pub fn entries(&self) -> &[Credential] {
        &self.entries
    }

    /// Number of credentials.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
