//! Credential store interface.
//!
//! The trait is synchronous; implementations keep their state behind a lock
//! and share it across clones, so every session task can hold its own handle.

mod memory;

pub use memory::MemoryUserStore;

use crate::{
    credential::Credential,
    error::{CredentialError, StoreError},
};

/// Source of truth for credentials.
///
/// # Invariants
///
/// - Usernames are unique within the store
/// - `append` is atomic with respect to `exists`, `verify` and other `append`
///   calls: two concurrent registrations of the same name cannot both succeed
pub trait UserStore: Clone + Send + Sync + 'static {
    /// Every credential currently known, in load/registration order.
    fn load_all(&self) -> Result<Vec<Credential>, StoreError>;

    /// Whether `username` is registered.
    fn exists(&self, username: &str) -> bool;

    /// Whether the pair matches a registered credential.
    fn verify(&self, username: &str, password: &str) -> bool;

    /// Validate and register a new credential.
    ///
    /// # Errors
    ///
    /// - `UsernameTooLong`, `PasswordLength`, `ReservedName`,
    ///   `InvalidCharacters` when the shape is wrong
    /// - `UserExists` when the name is taken
    /// - `Storage` when the backing store could not persist it; the
    ///   credential is then not registered
    fn append(&self, username: &str, password: &str) -> Result<(), CredentialError>;
}
