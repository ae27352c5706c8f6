// SSH Honeypot - Credential Store
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashSet;

use crate::error::{HoneypotError, HoneypotResult};

/// Username accepted out of the box
pub const DEFAULT_USERNAME: &str = "test";
/// Password accepted out of the box
pub const DEFAULT_PASSWORD: &str = "test";

/// A username/password pair the honeypot lets in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl Credential {
    pub fn new(username: impl AsRef<[u8]>, password: impl AsRef<[u8]>) -> Self {
        Self {
            username: username.as_ref().to_vec(),
            password: password.as_ref().to_vec(),
        }
    }

    /// Parse a `USER:PASS` pair, splitting at the first colon
    pub fn parse(pair: &str) -> HoneypotResult<Self> {
        match pair.split_once(':') {
            Some((user, pass)) => Ok(Self::new(user, pass)),
            None => Err(HoneypotError::ConfigurationInvalid(format!(
                "credential '{pair}' is not in USER:PASS form"
            ))),
        }
    }
}

/// In-memory set of accepted credentials.
///
/// Populated at startup and only read afterwards; matching is exact byte
/// comparison with no hashing or lockout.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    pairs: HashSet<Credential>,
}

impl CredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the built-in `test`/`test` pair
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.add(Credential::new(DEFAULT_USERNAME, DEFAULT_PASSWORD));
        store
    }

    pub fn add(&mut self, credential: Credential) {
        self.pairs.insert(credential);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Fail unless at least one pair is configured
    pub fn validate(&self) -> HoneypotResult<()> {
        if self.pairs.is_empty() {
            return Err(HoneypotError::ConfigurationInvalid(
                "no credentials configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Check a presented username/password pair
    pub fn accepts(&self, username: &[u8], password: &[u8]) -> bool {
        self.pairs
            .iter()
            .any(|c| c.username == username && c.password == password)
    }
}

impl FromIterator<Credential> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_accept_test_pair() {
        let store = CredentialStore::with_defaults();
        assert!(store.accepts(b"test", b"test"));
        assert!(!store.accepts(b"test", b"wrong"));
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_added_pairs_are_exact_match() {
        let mut store = CredentialStore::new();
        store.add(Credential::new("admin", "hunter2"));
        store.add(Credential::new("root", ""));

        assert!(store.accepts(b"admin", b"hunter2"));
        assert!(store.accepts(b"root", b""));

        assert!(!store.accepts(b"Admin", b"hunter2"));
        assert!(!store.accepts(b"admin", b"HUNTER2"));
        assert!(!store.accepts(b"admin", b"hunter2 "));
        assert!(!store.accepts(b"", b""));
        assert!(!store.accepts(b"attacker", b"wrongpass"));
        assert!(!store.accepts(b"root", b"hunter2"));
    }

    #[test]
    fn test_empty_store_is_invalid() {
        let store = CredentialStore::new();
        assert!(store.is_empty());
        assert!(matches!(
            store.validate(),
            Err(HoneypotError::ConfigurationInvalid(_))
        ));
        assert!(!store.accepts(b"", b""));
    }

    #[test]
    fn test_parse_pair() {
        let cred = Credential::parse("ubuntu:pa:ss").unwrap();
        assert_eq!(cred.username, b"ubuntu");
        assert_eq!(cred.password, b"pa:ss");

        let empty_pass = Credential::parse("guest:").unwrap();
        assert_eq!(empty_pass.password, b"");

        assert!(Credential::parse("nocolon").is_err());
    }

    #[test]
    fn test_collect_deduplicates() {
        let store: CredentialStore = vec![
            Credential::new("a", "b"),
            Credential::new("a", "b"),
            Credential::new("c", "d"),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.len(), 2);
    }
}
