// SSH Honeypot - Error Types
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types shared by the honeypot core

use std::path::PathBuf;
use thiserror::Error;

/// Honeypot error type
#[derive(Error, Debug)]
pub enum HoneypotError {
    #[error("Host identity unavailable ({path:?}): {reason}")]
    IdentityUnavailable { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("GeoIP dataset unavailable ({path:?}): {reason}")]
    DatasetUnavailable { path: PathBuf, reason: String },

    #[error("Audit log write failed: {0}")]
    AuditWrite(#[from] std::io::Error),

    #[error("Audit event encoding failed: {0}")]
    AuditEncode(#[from] serde_json::Error),

    #[error("Invalid session transition: {0}")]
    SessionState(String),
}

/// Result type for honeypot operations
pub type HoneypotResult<T> = Result<T, HoneypotError>;

impl HoneypotError {
    pub(crate) fn identity(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::IdentityUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from the audit pipeline
    pub fn is_audit_failure(&self) -> bool {
        matches!(self, Self::AuditWrite(_) | Self::AuditEncode(_))
    }
}
