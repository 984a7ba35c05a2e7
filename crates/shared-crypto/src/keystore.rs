//! # Validator Keystore
//!
//! One JSON file per validator key, named by the hex of the public key:
//!
//! ```json
//! { "type": "secp256k1", "publicKey": "c004…", "crypto": { … } }
//! ```
//!
//! The secret is sealed with XChaCha20-Poly1305 under a key derived with
//! BLAKE3 from the password and a random salt. Files are written to a
//! temporary path, synced and renamed; the directory is `0700` and files are
//! `0600`.
//!
//! [`SyncedKeystore`] caches unlocked keys behind one mutex and keeps at most
//! one decrypted copy per public key.

use crate::ecdsa::{Secp256k1KeyPair, ValidatorPubKey};
use crate::sealing::{random_salt, Sealed, SealingKey};
use crate::CryptoError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroize;

const KEY_TYPE: &str = "secp256k1";
const CIPHER: &str = "xchacha20-poly1305";
const KDF: &str = "blake3-derive-key";

/// Sealed secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoJson {
    /// Cipher name.
    pub cipher: String,
    /// Hex ciphertext.
    pub ciphertext: String,
    /// Hex nonce.
    pub nonce: String,
    /// Key derivation name.
    pub kdf: String,
    /// Hex salt.
    pub salt: String,
}

/// On-disk key file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKeyJson {
    /// Key type.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Hex public key.
    pub public_key: String,
    /// Sealed secret.
    pub crypto: CryptoJson,
}

/// Produces validator signatures over 32-byte digests.
pub trait ValidatorSigner: Send + Sync {
    /// Public key of the signing validator.
    fn pubkey(&self) -> ValidatorPubKey;

    /// 64-byte R‖S signature over `digest`.
    fn sign_hash(&self, digest: &Hash) -> Result<[u8; 64], CryptoError>;
}

impl ValidatorSigner for Secp256k1KeyPair {
    fn pubkey(&self) -> ValidatorPubKey {
        self.validator_pubkey()
    }

    fn sign_hash(&self, digest: &Hash) -> Result<[u8; 64], CryptoError> {
        Secp256k1KeyPair::sign_hash(self, digest)
    }
}

/// Directory of encrypted key files.
#[derive(Clone, Debug)]
pub struct FileKeystore {
    dir: PathBuf,
}

impl FileKeystore {
    /// Keystore rooted at `dir`; the directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Keystore directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, pubkey: &ValidatorPubKey) -> PathBuf {
        self.dir.join(pubkey.to_hex())
    }

    /// True if a file for `pubkey` exists.
    pub fn has(&self, pubkey: &ValidatorPubKey) -> bool {
        self.path_of(pubkey).is_file()
    }

    /// Encrypt and store `key`. Fails if a file already exists.
    pub fn add(&self, key: &Secp256k1KeyPair, password: &str) -> Result<ValidatorPubKey, CryptoError> {
        let pubkey = key.validator_pubkey();
        let path = self.path_of(&pubkey);
        if path.exists() {
            return Err(CryptoError::KeyExists(pubkey.to_string()));
        }
        let json = encrypt_key(key, password)?;
        let body = serde_json::to_vec_pretty(&json)
            .map_err(|e| CryptoError::InvalidKeystore(e.to_string()))?;
        self.ensure_dir()?;
        write_atomic(&path, &body)?;
        tracing::info!(pubkey = %pubkey, "[keystore] 🔑 Stored validator key");
        Ok(pubkey)
    }

    /// Decrypt the key of `pubkey`.
    pub fn get(&self, pubkey: &ValidatorPubKey, password: &str) -> Result<Secp256k1KeyPair, CryptoError> {
        let path = self.path_of(pubkey);
        let body = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CryptoError::KeyNotFound(pubkey.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let json: EncryptedKeyJson = serde_json::from_slice(&body)
            .map_err(|e| CryptoError::InvalidKeystore(e.to_string()))?;
        let stored = ValidatorPubKey::from_hex(&json.public_key)?;
        if &stored != pubkey {
            return Err(CryptoError::InvalidKeystore("public key mismatch".into()));
        }
        let key = decrypt_key(&json, password)?;
        if &key.validator_pubkey() != pubkey {
            return Err(CryptoError::InvalidKeystore("secret does not match public key".into()));
        }
        Ok(key)
    }

    /// Public keys of all stored keys, sorted.
    pub fn list(&self) -> Result<Vec<ValidatorPubKey>, CryptoError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(pk) = ValidatorPubKey::from_hex(name) {
                    keys.push(pk);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn ensure_dir(&self) -> Result<(), CryptoError> {
        fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }
}

fn encrypt_key(key: &Secp256k1KeyPair, password: &str) -> Result<EncryptedKeyJson, CryptoError> {
    let salt = random_salt();
    let mut secret = key.to_bytes();
    let sealed = SealingKey::derive(password, &salt).seal(&secret);
    secret.zeroize();
    let sealed = sealed?;
    Ok(EncryptedKeyJson {
        key_type: KEY_TYPE.to_string(),
        public_key: key.validator_pubkey().to_hex(),
        crypto: CryptoJson {
            cipher: CIPHER.to_string(),
            ciphertext: hex::encode(&sealed.ciphertext),
            nonce: hex::encode(sealed.nonce),
            kdf: KDF.to_string(),
            salt: hex::encode(salt),
        },
    })
}

fn decrypt_key(json: &EncryptedKeyJson, password: &str) -> Result<Secp256k1KeyPair, CryptoError> {
    if json.key_type != KEY_TYPE || json.crypto.cipher != CIPHER || json.crypto.kdf != KDF {
        return Err(CryptoError::InvalidKeystore(format!(
            "unsupported key type {} / cipher {} / kdf {}",
            json.key_type, json.crypto.cipher, json.crypto.kdf
        )));
    }
    let bad_hex = |e: hex::FromHexError| CryptoError::InvalidKeystore(e.to_string());
    let salt = hex::decode(&json.crypto.salt).map_err(bad_hex)?;
    let sealed = Sealed {
        ciphertext: hex::decode(&json.crypto.ciphertext).map_err(bad_hex)?,
        nonce: hex::decode(&json.crypto.nonce)
            .map_err(bad_hex)?
            .try_into()
            .map_err(|_| CryptoError::InvalidKeystore("nonce length".into()))?,
    };
    let mut plain = SealingKey::derive(password, &salt).open(&sealed)?;
    let plain_len = plain.len();
    let secret: Result<[u8; 32], _> = plain.as_slice().try_into();
    plain.zeroize();
    let mut secret = secret.map_err(|_| CryptoError::InvalidKeyLength {
        expected: 32,
        actual: plain_len,
    })?;
    let key = Secp256k1KeyPair::from_bytes(secret);
    secret.zeroize();
    key
}

/// Write `data` to `path` via a synced temporary file and rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut opts = fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Thread-safe keystore with an unlocked-key cache.
pub struct SyncedKeystore {
    store: FileKeystore,
    unlocked: Mutex<HashMap<ValidatorPubKey, Arc<Secp256k1KeyPair>>>,
}

impl SyncedKeystore {
    /// Wrap a file keystore.
    pub fn new(store: FileKeystore) -> Self {
        Self {
            store,
            unlocked: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying file keystore.
    pub fn store(&self) -> &FileKeystore {
        &self.store
    }

    /// Decrypt and cache `pubkey`. Unlocking twice keeps the first copy.
    pub fn unlock(&self, pubkey: &ValidatorPubKey, password: &str) -> Result<(), CryptoError> {
        let mut unlocked = self.unlocked.lock();
        if unlocked.contains_key(pubkey) {
            return Ok(());
        }
        let key = self.store.get(pubkey, password)?;
        unlocked.insert(pubkey.clone(), Arc::new(key));
        Ok(())
    }

    /// Drop the cached copy of `pubkey`.
    pub fn lock(&self, pubkey: &ValidatorPubKey) {
        self.unlocked.lock().remove(pubkey);
    }

    /// True if `pubkey` is unlocked.
    pub fn is_unlocked(&self, pubkey: &ValidatorPubKey) -> bool {
        self.unlocked.lock().contains_key(pubkey)
    }

    /// Sign `digest` with the unlocked key of `pubkey`.
    pub fn sign(&self, pubkey: &ValidatorPubKey, digest: &Hash) -> Result<[u8; 64], CryptoError> {
        let key = self
            .unlocked
            .lock()
            .get(pubkey)
            .cloned()
            .ok_or_else(|| CryptoError::KeyLocked(pubkey.to_string()))?;
        key.sign_hash(digest)
    }
}

/// [`ValidatorSigner`] backed by a [`SyncedKeystore`].
#[derive(Clone)]
pub struct KeystoreSigner {
    keystore: Arc<SyncedKeystore>,
    pubkey: ValidatorPubKey,
}

impl KeystoreSigner {
    /// Signer for `pubkey`; the key must be unlocked before signing.
    pub fn new(keystore: Arc<SyncedKeystore>, pubkey: ValidatorPubKey) -> Self {
        Self { keystore, pubkey }
    }
}

impl ValidatorSigner for KeystoreSigner {
    fn pubkey(&self) -> ValidatorPubKey {
        self.pubkey.clone()
    }

    fn sign_hash(&self, digest: &Hash) -> Result<[u8; 64], CryptoError> {
        self.keystore.sign(&self.pubkey, digest)
    }
}
