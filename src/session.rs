// SSH Honeypot - Session Engine
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-connection fake shell
//!
//! The engine never executes anything. It logs the connection once, then
//! logs every line it is handed and answers each one with the same
//! "command not found" reply and a fresh prompt. Output is returned to the
//! caller rather than written, so any transport can drive it.

use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit::{AuditLogger, LogEvent};
use crate::error::{HoneypotError, HoneypotResult};
use crate::geo::GeoResolver;

/// Hostname shown in the prompt unless configured otherwise
pub const DEFAULT_HOSTNAME: &str = "honeypot";

/// Lifecycle of one shell session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Active,
    Closed,
}

/// What the fake shell prints
#[derive(Debug, Clone)]
pub struct ShellProfile {
    pub hostname: String,
}

impl Default for ShellProfile {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
        }
    }
}

impl ShellProfile {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn prompt(&self) -> String {
        format!("root@{}:~# ", self.hostname)
    }

    fn greeting(&self, username: &str) -> String {
        format!("Welcome to the honeypot, {username}!\r\n{}", self.prompt())
    }

    fn rejection(&self, command: &str) -> String {
        format!("Command not found: {command}\r\n{}", self.prompt())
    }
}

/// Handles shared by every session
#[derive(Clone)]
pub struct SessionContext {
    pub audit: Arc<AuditLogger>,
    pub geo: Arc<dyn GeoResolver>,
    pub profile: Arc<ShellProfile>,
}

/// Session engine for a single authenticated connection
pub struct ShellSession {
    username: String,
    client_addr: Option<SocketAddr>,
    created_at: DateTime<Utc>,
    state: SessionState,
    lines_seen: u64,
    ctx: SessionContext,
}

impl ShellSession {
    pub fn new(username: impl Into<String>, ctx: SessionContext) -> Self {
        Self {
            username: username.into(),
            client_addr: None,
            created_at: Utc::now(),
            state: SessionState::Unauthenticated,
            lines_seen: 0,
            ctx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enter the shell: log `connection_made` and return the greeting
    pub async fn on_open(&mut self, client_addr: SocketAddr) -> HoneypotResult<String> {
        if self.state != SessionState::Unauthenticated {
            return Err(HoneypotError::SessionState(format!(
                "open called in state {:?}",
                self.state
            )));
        }

        self.client_addr = Some(client_addr);
        let location = self.ctx.geo.resolve(client_addr.ip());
        let event = LogEvent::connection_made(&self.username, client_addr.ip(), location);

        if let Err(e) = self.ctx.audit.append(&event).await {
            self.fail(&e);
            return Err(e);
        }

        self.state = SessionState::Active;
        info!(
            "Shell session opened: user={} client={}",
            self.username, client_addr
        );
        Ok(self.ctx.profile.greeting(&self.username))
    }

    /// Log one line of input and return the canned reply
    pub async fn on_line(&mut self, line: &[u8]) -> HoneypotResult<String> {
        let client_addr = match (self.state, self.client_addr) {
            (SessionState::Active, Some(addr)) => addr,
            _ => {
                return Err(HoneypotError::SessionState(format!(
                    "line received in state {:?}",
                    self.state
                )));
            }
        };

        let command = String::from_utf8_lossy(line);
        let event = LogEvent::command_received(&self.username, &command, client_addr.ip());

        if let Err(e) = self.ctx.audit.append(&event).await {
            self.fail(&e);
            return Err(e);
        }

        self.lines_seen += 1;
        debug!("Command from {}: {:?}", client_addr, command);
        Ok(self.ctx.profile.rejection(&command))
    }

    /// Transport went away; nothing is logged
    pub fn on_close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        let duration = Utc::now().signed_duration_since(self.created_at);
        debug!(
            "Shell session closed: user={} client={:?} lines={} duration={}s",
            self.username,
            self.client_addr,
            self.lines_seen,
            duration.num_seconds().max(0)
        );
    }

    fn fail(&mut self, error: &HoneypotError) {
        warn!(
            "Terminating session for user={} client={:?}: {}",
            self.username, self.client_addr, error
        );
        self.state = SessionState::Closed;
    }
}
