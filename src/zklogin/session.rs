//! Ephemeral key material for one login attempt.
//!
//! Nothing in memory survives the redirect to the identity provider, so the
//! whole session is serialized into a [`SessionStore`] before the navigation
//! URL is handed out, and read back when the provider returns. The store is
//! an injected seam: tests use [`MemoryStore`], the CLI uses [`FileStore`].

use crate::zklogin::error::Error;
use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use std::{fs, io};

/// Well-known store key for the persisted session record.
pub const SESSION_KEY: &str = "zklogin_ephemeral_data";

/// The ephemeral key is acceptable for this many epochs past the current one.
pub const EPOCH_VALIDITY_WINDOW: u64 = 2;

/// Persisted session record. Replaced wholesale on each fresh login, never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralSession {
    pub max_epoch: u64,
    /// Large unsigned integer as a decimal string. Kept as a string so the
    /// value survives JSON round-tripping without floating-point loss.
    pub randomness: String,
    /// base64url (unpadded) encoding of the Ed25519 seed.
    pub ephemeral_secret_key: String,
}

impl EphemeralSession {
    /// Generate a fresh keypair and randomness, valid until
    /// `current_epoch + EPOCH_VALIDITY_WINDOW`.
    #[must_use]
    pub fn generate(current_epoch: u64) -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let randomness: u128 = OsRng.gen();

        Self {
            max_epoch: current_epoch + EPOCH_VALIDITY_WINDOW,
            randomness: randomness.to_string(),
            ephemeral_secret_key: Base64UrlUnpadded::encode_string(&signing_key.to_bytes()),
        }
    }

    /// Decode the stored secret key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the stored encoding is not a 32-byte
    /// base64url seed.
    pub fn signing_key(&self) -> Result<SigningKey, Error> {
        let bytes = Base64UrlUnpadded::decode_vec(&self.ephemeral_secret_key)
            .map_err(|_| Error::Storage("ephemeral secret key is not valid base64url".to_string()))?;

        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("ephemeral secret key must be 32 bytes".to_string()))?;

        Ok(SigningKey::from_bytes(&seed))
    }

    /// Parse the stored randomness back into its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the stored string is not decimal.
    pub fn randomness_value(&self) -> Result<u128, Error> {
        self.randomness
            .parse()
            .map_err(|_| Error::Storage("randomness is not a decimal string".to_string()))
    }
}

/// Session-scoped key/value store surviving the redirect round-trip.
pub trait SessionStore: Send + Sync {
    /// Absent keys are `Ok(None)`, the expected state for any page load that
    /// is not a login return.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn clear(&self, key: &str) -> Result<(), Error>;
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("session store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("session store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("session store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One file per key under a directory. The CLI analogue of browser session
/// storage: the record outlives the process that wrote it.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn storage_error(err: &io::Error) -> Error {
        Error::Storage(err.to_string())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::storage_error(&err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::storage_error(&err))?;

        let path = self.path(key);
        fs::write(&path, value).map_err(|err| Self::storage_error(&err))?;

        // key material, keep it owner-readable only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|err| Self::storage_error(&err))?;
        }

        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::storage_error(&err)),
        }
    }
}

/// Generate a fresh session and persist it under [`SESSION_KEY`].
///
/// The write completes before the session is returned: the caller may issue
/// the redirect immediately afterwards.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the record cannot be written. The caller
/// must treat this as "cannot complete login", not proceed with defaults.
pub fn begin_session<S: SessionStore>(store: &S, current_epoch: u64) -> Result<EphemeralSession, Error> {
    let session = EphemeralSession::generate(current_epoch);
    let encoded = serde_json::to_string(&session)?;
    store.set(SESSION_KEY, &encoded)?;
    Ok(session)
}

/// Read back the persisted session. Absence is `Ok(None)`, corrupted content
/// is an [`Error::Storage`].
///
/// # Errors
///
/// Returns [`Error::Storage`] if the store fails or holds malformed JSON.
pub fn load_session<S: SessionStore>(store: &S) -> Result<Option<EphemeralSession>, Error> {
    let Some(raw) = store.get(SESSION_KEY)? else {
        return Ok(None);
    };

    let session = serde_json::from_str(&raw)
        .map_err(|err| Error::Storage(format!("stored session is not valid JSON: {err}")))?;

    Ok(Some(session))
}

/// Drop the persisted session, if any.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the store fails.
pub fn clear_session<S: SessionStore>(store: &S) -> Result<(), Error> {
    store.clear(SESSION_KEY)
}
