use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::UserStore;
use crate::{
    credential::{Credential, CredentialTable},
    error::{CredentialError, StoreError},
};

/// In-memory credential store.
///
/// Nothing is persisted. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Mutex<CredentialTable>>,
}

impl MemoryUserStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(username, password)` pairs.
    pub fn with_users<'a>(users: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = users.into_iter().map(|(u, p)| Credential::new(u, p)).collect();
        Self { inner: Arc::new(Mutex::new(CredentialTable::from_credentials(entries))) }
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Whether no user is registered.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    // The table is never left half-updated, so a poisoned lock is still usable
    fn table(&self) -> MutexGuard<'_, CredentialTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserStore for MemoryUserStore {
    fn load_all(&self) -> Result<Vec<Credential>, StoreError> {
        Ok(self.table().entries().to_vec())
    }

    fn exists(&self, username: &str) -> bool {
        self.table().exists(username)
    }

    fn verify(&self, username: &str, password: &str) -> bool {
        self.table().verify(username, password)
    }

    fn append(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        let mut table = self.table();
        table.check_new(username, password)?;
        table.insert(Credential::new(username, password));
        Ok(())
    }
}
