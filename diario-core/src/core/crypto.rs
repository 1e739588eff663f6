//! Password-based encryption of journal entries.
//!
//! A per-installation random salt is persisted once in the data directory.
//! The entry key is derived from the password and that salt with Argon2id and
//! lives only in memory, inside a [`Session`]. Each entry is sealed on its own
//! with AES-256-GCM under a fresh 16-byte IV:
//!
//! ```text
//! [16-byte IV][ciphertext][16-byte tag]
//! ```

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::{OsRng, RngCore};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use zeroize::Zeroize;

use crate::{JournalError, KdfParams, Result};

/// Length of the persisted salt in bytes.
pub const SALT_LEN: usize = 16;
/// Length of the derived entry key in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// Length of the IV prefixed to every sealed entry.
pub const IV_LEN: usize = 16;
/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

type EntryCipher = AesGcm<Aes256, U16>;

/// A 256-bit symmetric key. Wiped from memory on drop.
#[derive(Clone)]
pub struct EntryKey([u8; KEY_LEN]);

impl EntryKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Compares two keys without short-circuiting on the first differing byte.
    pub fn matches(&self, other: &EntryKey) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Drop for EntryKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntryKey(..)")
    }
}

/// Derives the entry key for `password` and `salt`.
///
/// Deterministic: the same password, salt and parameters always produce the
/// same key.
///
/// # Errors
///
/// Returns [`JournalError::KeyDerivation`] if `params` are rejected by Argon2
/// (for example a memory cost below `8 * parallelism` KiB) or the salt is
/// shorter than Argon2 allows.
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<EntryKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| JournalError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = EntryKey([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key.0)
        .map_err(|e| JournalError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Reads the installation salt at `path`, generating and persisting one first
/// if the file does not exist yet.
///
/// # Errors
///
/// Returns [`JournalError::InvalidDataDir`] if the file exists but is not
/// exactly [`SALT_LEN`] bytes, or [`JournalError::Io`] if it cannot be read
/// or written.
pub fn load_or_create_salt(path: &Path) -> Result<[u8; SALT_LEN]> {
    match fs::read(path) {
        Ok(bytes) => <[u8; SALT_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            JournalError::InvalidDataDir(format!(
                "salt file {} has {} bytes, expected {SALT_LEN}",
                path.display(),
                bytes.len()
            ))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(path)?;
            file.write_all(&salt)?;
            file.sync_all()?;
            log::info!("Generated new salt at {}", path.display());
            Ok(salt)
        }
        Err(e) => Err(e.into()),
    }
}

/// Seals `plaintext` under `key` with a fresh random IV.
///
/// # Errors
///
/// Returns [`JournalError::Decrypt`] only if the cipher refuses the input,
/// which AES-GCM does for payloads beyond its length limit.
pub fn seal(plaintext: &[u8], key: &EntryKey) -> Result<Vec<u8>> {
    let cipher = EntryCipher::new_from_slice(key.as_bytes())
        .map_err(|e| JournalError::Decrypt(e.to_string()))?;
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let ciphertext = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
        .map_err(|_| JournalError::Decrypt("encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Opens a blob produced by [`seal`].
///
/// # Errors
///
/// Returns [`JournalError::Decrypt`] if the blob is too short to hold an IV and
/// tag, was sealed under a different key, or has been modified.
pub fn open(blob: &[u8], key: &EntryKey) -> Result<Vec<u8>> {
    if blob.len() < IV_LEN + TAG_LEN {
        return Err(JournalError::Decrypt(format!(
            "payload of {} bytes is too short",
            blob.len()
        )));
    }
    let (iv, ciphertext) = blob.split_at(IV_LEN);
    let cipher = EntryCipher::new_from_slice(key.as_bytes())
        .map_err(|e| JournalError::Decrypt(e.to_string()))?;
    cipher
        .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
        .map_err(|_| JournalError::Decrypt("authentication failed".to_string()))
}

/// The key material a journal is currently operating under.
///
/// A session without a key means encryption is disabled and entries are
/// stored as plain JSON.
#[derive(Debug, Clone, Default)]
pub struct Session {
    key: Option<EntryKey>,
}

impl Session {
    /// A session that stores entries unencrypted.
    pub fn plaintext() -> Self {
        Self { key: None }
    }

    pub fn with_key(key: EntryKey) -> Self {
        Self { key: Some(key) }
    }

    /// Builds a session for `password`.
    ///
    /// An empty password yields a plaintext session and leaves the salt file
    /// untouched; otherwise the salt is loaded (or created) and the key derived.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`load_or_create_salt`] and [`derive_key`].
    pub fn unlock(password: &str, salt_path: &Path, params: &KdfParams) -> Result<Self> {
        if password.is_empty() {
            return Ok(Self::plaintext());
        }
        let salt = load_or_create_salt(salt_path)?;
        Ok(Self::with_key(derive_key(password, &salt, params)?))
    }

    pub fn key(&self) -> Option<&EntryKey> {
        self.key.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }
}
