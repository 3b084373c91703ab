use crate::licensing::config::{accounts, SECURE_STORE_FILE};
use crate::licensing::types::{StorageError, TrialRecord};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Secure key-value persistence (stand-in for the OS keychain).
///
/// Entries are addressed by `(service, account)` and hold opaque bytes.
pub trait SecureStore: Send + Sync {
    fn save(&self, service: &str, account: &str, value: &[u8]) -> Result<(), StorageError>;

    /// `Ok(None)` when no entry exists
    fn load(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Deleting a missing entry is not an error
    fn delete(&self, service: &str, account: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
}

/// In-memory store, used by tests and as a scratch store for previews
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemoryStore {
    fn save(&self, service: &str, account: &str, value: &[u8]) -> Result<(), StorageError> {
        lock(&self.entries)?.insert((service.to_string(), account.to_string()), value.to_vec());
        Ok(())
    }

    fn load(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(lock(&self.entries)?
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), StorageError> {
        lock(&self.entries)?.remove(&(service.to_string(), account.to_string()));
        Ok(())
    }
}

type FileContents = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// JSON-file backed store for builds without keychain access
pub struct FileStore {
    path: PathBuf,
    /// In-memory cache of the file contents
    cache: Mutex<Option<FileContents>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Store at the default location in the user's local data directory
    pub fn open_default() -> Result<Self, StorageError> {
        let data_dir = dirs::data_local_dir().ok_or_else(|| {
            StorageError::Unavailable("Failed to get local data dir".to_string())
        })?;
        Ok(Self::new(data_dir.join("lingobar").join(SECURE_STORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<FileContents, StorageError> {
        if !self.path.exists() {
            return Ok(FileContents::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_file(&self, contents: &FileContents) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(contents)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply `f` to the current contents, then persist and cache the result
    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut FileContents),
    {
        let mut cache = lock(&self.cache)?;
        let mut contents = match cache.as_ref() {
            Some(contents) => contents.clone(),
            None => self.read_file()?,
        };
        f(&mut contents);
        self.write_file(&contents)?;
        *cache = Some(contents);
        Ok(())
    }
}

impl SecureStore for FileStore {
    fn save(&self, service: &str, account: &str, value: &[u8]) -> Result<(), StorageError> {
        self.update(|contents| {
            contents
                .entry(service.to_string())
                .or_default()
                .insert(account.to_string(), value.to_vec());
        })
    }

    fn load(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut cache = lock(&self.cache)?;
        if cache.is_none() {
            *cache = Some(self.read_file()?);
        }
        Ok(cache
            .as_ref()
            .and_then(|contents| contents.get(service))
            .and_then(|entries| entries.get(account))
            .cloned())
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), StorageError> {
        self.update(|contents| {
            if let Some(entries) = contents.get_mut(service) {
                entries.remove(account);
                if entries.is_empty() {
                    contents.remove(service);
                }
            }
        })
    }
}

/// Load one string entry. Read failures are reported as absent (see `load_trial_record`).
fn load_string(store: &dyn SecureStore, service: &str, account: &str) -> Option<String> {
    match store.load(service, account) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(account, "{}", StorageError::InvalidUtf8 { account: account.to_string() });
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(account, error = %e, "Failed to read secure storage entry, treating as absent");
            None
        }
    }
}

fn load_date(store: &dyn SecureStore, service: &str, account: &str) -> Option<DateTime<Utc>> {
    let raw = load_string(store, service, account)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            warn!(account, error = %e, "Stored date is unparseable, treating as absent");
            None
        }
    }
}

/// Load the trial record.
///
/// Unreadable entries are indistinguishable from missing ones here, so a
/// storage failure on first use starts a fresh trial. Each swallowed failure
/// is logged at warn level.
pub fn load_trial_record(store: &dyn SecureStore, service: &str) -> TrialRecord {
    TrialRecord {
        trial_start_date: load_date(store, service, accounts::TRIAL_START_DATE),
        last_used_date: load_date(store, service, accounts::LAST_USED_DATE),
        license_key: load_string(store, service, accounts::LICENSE_KEY),
    }
}

pub fn save_date(
    store: &dyn SecureStore,
    service: &str,
    account: &str,
    date: DateTime<Utc>,
) -> Result<(), StorageError> {
    store.save(service, account, date.to_rfc3339().as_bytes())
}

pub fn save_license_key(store: &dyn SecureStore, service: &str, key: &str) -> Result<(), StorageError> {
    store.save(service, accounts::LICENSE_KEY, key.as_bytes())
}

/// Delete all stored trial data (for testing or reset)
pub fn clear_trial_record(store: &dyn SecureStore, service: &str) -> Result<(), StorageError> {
    for account in accounts::ALL {
        store.delete(service, account)?;
    }
    Ok(())
}
