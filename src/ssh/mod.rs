// SSH Honeypot - SSH Module
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SSH front end of the honeypot
//!
//! Listens for SSH connections (port 2222 by default), authenticates them
//! against the credential store and attaches a fake shell to every shell
//! channel. The wire protocol itself is handled by `russh`.

pub mod handler;
pub mod server;
pub mod terminal;

pub use handler::HoneypotSshHandler;
pub use server::{SshServer, SshServerConfig};
pub use terminal::{LineEditor, TerminalEvent};
