// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The parameter store gateway (C3): decrypts stored task/repository
//! parameters and attaches them to a context at creation time.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};
use murmur_core::StoredEnv;
use thiserror::Error;

use crate::brain::{Brain, BrainError};

const STORED_ENV_KEY: &str = "stored_env";
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum ParamStoreError {
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),
    #[error("decryption failed")]
    Decrypt,
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("stored blob is shorter than the nonce prefix")]
    Truncated,
}

/// AES-256-GCM key used to encrypt parameter bundles at rest.
///
/// Holding one of these is what "the encryption key is initialised" means
/// throughout the rest of the spec: a context created while this is `None`
/// gets an empty [`StoredEnv`], permanently (frozen at registration time).
#[derive(Clone)]
pub struct EncryptionKey(Key<Aes256Gcm>);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(*Key::<Aes256Gcm>::from_slice(&bytes))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(&self.0)
    }
}

/// Fetches and decrypts the process-wide `StoredEnv` bundle, or hands back
/// an empty one when no key is initialised yet or nothing has been stored.
pub struct ParameterStoreGateway;

impl ParameterStoreGateway {
    /// See C3: silent fallback to empty on an uninitialised key, matching
    /// the spec's "permits early pipelines to run with defaults".
    pub async fn fetch(brain: &dyn Brain, key: Option<&EncryptionKey>) -> Result<StoredEnv, ParamStoreError> {
        let Some(key) = key else {
            return Ok(StoredEnv::empty());
        };
        let Some(blob) = brain.get(STORED_ENV_KEY).await? else {
            return Ok(StoredEnv::empty());
        };
        decrypt_stored_env(key, &blob)
    }

    pub async fn store(brain: &dyn Brain, key: &EncryptionKey, env: &StoredEnv) -> Result<(), ParamStoreError> {
        let blob = encrypt_stored_env(key, env)?;
        brain.set(STORED_ENV_KEY, blob).await?;
        Ok(())
    }
}

fn encrypt_stored_env(key: &EncryptionKey, env: &StoredEnv) -> Result<Vec<u8>, ParamStoreError> {
    let plaintext = serde_json::to_vec(env)?;
    let cipher = key.cipher();
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_ref())
        .map_err(|_| ParamStoreError::Decrypt)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn decrypt_stored_env(key: &EncryptionKey, blob: &[u8]) -> Result<StoredEnv, ParamStoreError> {
    if blob.len() < NONCE_LEN {
        return Err(ParamStoreError::Truncated);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = key.cipher();
    let plaintext = cipher
        .decrypt(nonce_bytes.into(), ciphertext)
        .map_err(|_| ParamStoreError::Decrypt)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
