// SSH Honeypot - Audit Logger
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Append-only JSON Lines audit log
//!
//! Every event becomes exactly one newline-terminated JSON object. Appends are
//! serialized through a mutex, written with a single `write_all` and synced to
//! disk before returning, so the file stays parseable line by line even when
//! many sessions log at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::HoneypotResult;
use crate::geo::GeoLocation;

/// Default audit log location, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "honeypot.log";

/// Client location as written into `connection_made` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub ip: String,
    #[serde(flatten)]
    pub geo: GeoLocation,
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    ConnectionMade {
        timestamp: DateTime<Utc>,
        username: String,
        location: LocationRecord,
    },
    CommandReceived {
        timestamp: DateTime<Utc>,
        username: String,
        command: String,
        client_ip: String,
    },
}

impl LogEvent {
    pub fn connection_made(username: &str, client_ip: IpAddr, geo: GeoLocation) -> Self {
        Self::ConnectionMade {
            timestamp: Utc::now(),
            username: username.to_string(),
            location: LocationRecord {
                ip: client_ip.to_string(),
                geo,
            },
        }
    }

    pub fn command_received(username: &str, command: &str, client_ip: IpAddr) -> Self {
        Self::CommandReceived {
            timestamp: Utc::now(),
            username: username.to_string(),
            command: command.to_string(),
            client_ip: client_ip.to_string(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::ConnectionMade { username, .. } | Self::CommandReceived { username, .. } => {
                username
            }
        }
    }

    /// Encode as one newline-terminated JSON line
    pub fn to_line(&self) -> HoneypotResult<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Single-writer audit log backed by a file
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create a logger for the given path; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event and wait until it is on disk
    pub async fn append(&self, event: &LogEvent) -> HoneypotResult<()> {
        let line = event.to_line()?;

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;

        trace!("Appended {} byte audit record to {:?}", line.len(), self.path);
        Ok(())
    }
}
