//! File-backed credential store.
//!
//! One record per line:
//!
//! ```text
//! (alice, pw12)
//! (bob, pw34)
//! ```
//!
//! The whole file is loaded once at open. Registrations are appended and
//! flushed before they become visible, under the same lock that guards
//! lookups.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chatboard_core::{
    Credential, CredentialError, StoreError, UserStore, credential::CredentialTable,
};

/// Credential store persisted to a text file.
///
/// Clones share the same table and file.
#[derive(Debug, Clone)]
pub struct FileUserStore {
    inner: Arc<Mutex<FileInner>>,
}

#[derive(Debug)]
struct FileInner {
    path: PathBuf,
    table: CredentialTable,
    /// File does not end with a newline; the next record must start one
    needs_newline: bool,
}

impl FileUserStore {
    /// Open and load an existing credential file.
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be opened or read
    /// - `Malformed` if a non-blank line is not a `(username, password)`
    ///   record
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path)?;

        let mut table = CredentialTable::new();
        for (idx, raw) in contents.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }

            let credential = parse_record(raw)
                .ok_or_else(|| StoreError::Malformed { line: idx + 1, content: raw.to_string() })?;

            if table.exists(&credential.username) {
                tracing::warn!(
                    "{}:{}: duplicate user {}, keeping the first record",
                    path.display(),
                    idx + 1,
                    credential.username
                );
                continue;
            }
            table.insert(credential);
        }

        tracing::info!("loaded {} users from {}", table.len(), path.display());

        let needs_newline = !contents.is_empty() && !contents.ends_with('\n');
        Ok(Self { inner: Arc::new(Mutex::new(FileInner { path, table, needs_newline })) })
    }

    /// Path of the backing file.
    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.lock().table.len()
    }

    /// Whether no user is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().table.is_empty()
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still holds a consistent table
    fn lock(&self) -> MutexGuard<'_, FileInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserStore for FileUserStore {
    fn load_all(&self) -> Result<Vec<Credential>, StoreError> {
        Ok(self.lock().table.entries().to_vec())
    }

    fn exists(&self, username: &str) -> bool {
        self.lock().table.exists(username)
    }

    fn verify(&self, username: &str, password: &str) -> bool {
        self.lock().table.verify(username, password)
    }

    fn append(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        let mut inner = self.lock();
        inner.table.check_new(username, password)?;

        let mut record = String::new();
        if inner.needs_newline {
            record.push('\n');
        }
        record.push_str(&format_record(username, password));
        record.push('\n');

        let written = OpenOptions::new()
            .append(true)
            .open(&inner.path)
            .and_then(|mut file| {
                file.write_all(record.as_bytes())?;
                file.flush()
            });

        if let Err(e) = written {
            tracing::error!("cannot write new user to {}: {}", inner.path.display(), e);
            return Err(CredentialError::Storage(e.to_string()));
        }

        inner.needs_newline = false;
        inner.table.insert(Credential::new(username, password));
        Ok(())
    }
}

/// Parse one `(username, password)` record.
pub fn parse_record(raw: &str) -> Option<Credential> {
    let body = raw.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (username, password) = body.split_once(", ")?;

    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some(Credential::new(username, password))
}

/// Render one record, without terminator.
pub fn format_record(username: &str, password: &str) -> String {
    format!("({username}, {password})")
}
