// SSH Honeypot - Host Identity
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use russh_keys::{encode_pkcs8_pem, key, load_public_key, load_secret_key, write_public_key_base64};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{HoneypotError, HoneypotResult};

/// The server's long-term host key pair.
///
/// Loaded once at startup and shared read-only by every connection.
pub struct HostIdentity {
    algorithm: &'static str,
    public_key: key::PublicKey,
    key_pair: key::KeyPair,
}

impl std::fmt::Debug for HostIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostIdentity")
            .field("algorithm", &self.algorithm)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl HostIdentity {
    /// Load the private and public key files.
    ///
    /// Both files must exist and parse, and the public key must belong to
    /// the private key.
    pub fn load(private_path: &Path, public_path: &Path) -> HoneypotResult<Self> {
        if !private_path.exists() {
            return Err(HoneypotError::identity(private_path, "private key file does not exist"));
        }
        if !public_path.exists() {
            return Err(HoneypotError::identity(public_path, "public key file does not exist"));
        }

        let key_pair = load_secret_key(private_path, None)
            .map_err(|e| HoneypotError::identity(private_path, e))?;
        let public_key =
            load_public_key(public_path).map_err(|e| HoneypotError::identity(public_path, e))?;

        let derived = key_pair
            .clone_public_key()
            .map_err(|e| HoneypotError::identity(private_path, e))?;
        if derived.fingerprint() != public_key.fingerprint() {
            return Err(HoneypotError::identity(
                public_path,
                "public key does not match private key",
            ));
        }

        Ok(Self {
            algorithm: public_key.name(),
            public_key,
            key_pair,
        })
    }

    /// Generate an Ed25519 pair at the given paths unless both already exist
    pub fn generate_if_missing(private_path: &Path, public_path: &Path) -> HoneypotResult<bool> {
        if private_path.exists() && public_path.exists() {
            info!("Using existing SSH host key: {:?}", private_path);
            return Ok(false);
        }
        if private_path.exists() || public_path.exists() {
            return Err(HoneypotError::identity(
                private_path,
                "only one half of the host key pair exists; refusing to overwrite",
            ));
        }

        info!("Generating new SSH host key: {:?}", private_path);
        for path in [private_path, public_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| HoneypotError::identity(parent, e))?;
            }
        }

        let key_pair = key::KeyPair::generate_ed25519()
            .ok_or_else(|| HoneypotError::identity(private_path, "Ed25519 key generation failed"))?;

        let mut pem_data = Vec::new();
        encode_pkcs8_pem(&key_pair, &mut pem_data)
            .map_err(|e| HoneypotError::identity(private_path, e))?;
        fs::write(private_path, &pem_data).map_err(|e| HoneypotError::identity(private_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(private_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| HoneypotError::identity(private_path, e))?;
        }

        let public_key = key_pair
            .clone_public_key()
            .map_err(|e| HoneypotError::identity(private_path, e))?;
        let mut public_data = Vec::new();
        write_public_key_base64(&mut public_data, &public_key)
            .map_err(|e| HoneypotError::identity(public_path, e))?;
        fs::write(public_path, &public_data).map_err(|e| HoneypotError::identity(public_path, e))?;

        Ok(true)
    }

    /// SSH algorithm name, e.g. `ssh-ed25519`
    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    pub fn public_key(&self) -> &key::PublicKey {
        &self.public_key
    }

    pub fn key_pair(&self) -> &key::KeyPair {
        &self.key_pair
    }

    /// SHA-256 fingerprint of the public key
    pub fn fingerprint(&self) -> String {
        self.public_key.fingerprint()
    }
}
