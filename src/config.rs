// SSH Honeypot - Process Configuration
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use clap::Parser;
use std::path::PathBuf;

use crate::audit::DEFAULT_LOG_FILE;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{HoneypotError, HoneypotResult};
use crate::geo::DEFAULT_GEOIP_DB;
use crate::session::DEFAULT_HOSTNAME;
use crate::ssh::SshServerConfig;

pub const DEFAULT_SSH_PORT: u16 = 2222;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Simple SSH honeypot")]
pub struct Cli {
    /// Listen address
    #[arg(short = 'H', long, env = "HONEYPOT_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub listen_addr: String,

    /// Port to run the honeypot on
    #[arg(short, long, env = "HONEYPOT_PORT", default_value_t = DEFAULT_SSH_PORT)]
    pub port: u16,

    /// Username for an extra honeypot login (needs --password)
    #[arg(short, long, env = "HONEYPOT_USER")]
    pub user: Option<String>,

    /// Password for the extra honeypot login (needs --user)
    #[arg(long, env = "HONEYPOT_PASSWORD")]
    pub password: Option<String>,

    /// Additional accepted login as USER:PASS (repeatable)
    #[arg(long = "credential", value_name = "USER:PASS")]
    pub credentials: Vec<String>,

    /// Do not accept the built-in test/test login
    #[arg(long)]
    pub no_default_credential: bool,

    /// Hostname shown in the shell prompt
    #[arg(long, env = "HONEYPOT_HOSTNAME", default_value = DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// Private host key (PEM / OpenSSH format)
    #[arg(long, env = "HONEYPOT_HOST_KEY", default_value = "ssh_host_key")]
    pub host_key: PathBuf,

    /// Public host key (OpenSSH format)
    #[arg(long, env = "HONEYPOT_HOST_PUBKEY", default_value = "ssh_host_key.pub")]
    pub host_pubkey: PathBuf,

    /// Generate an Ed25519 host key pair if none exists yet
    #[arg(long)]
    pub generate_host_key: bool,

    /// MaxMind City database
    #[arg(long, env = "HONEYPOT_GEOIP_DB", default_value = DEFAULT_GEOIP_DB)]
    pub geoip_db: PathBuf,

    /// Audit log (JSON Lines, append-only)
    #[arg(long, env = "HONEYPOT_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Enable trace output (extremely verbose)
    #[arg(short, long)]
    pub trace: bool,
}

impl Cli {
    /// Build the credential store from the command line
    pub fn credential_store(&self) -> HoneypotResult<CredentialStore> {
        let mut store = if self.no_default_credential {
            CredentialStore::new()
        } else {
            CredentialStore::with_defaults()
        };

        match (&self.user, &self.password) {
            (Some(user), Some(password)) => store.add(Credential::new(user, password)),
            (None, None) => {}
            _ => {
                return Err(HoneypotError::ConfigurationInvalid(
                    "--user and --password must be given together".to_string(),
                ));
            }
        }
        for pair in &self.credentials {
            store.add(Credential::parse(pair)?);
        }

        store.validate()?;
        Ok(store)
    }

    pub fn server_config(&self) -> SshServerConfig {
        SshServerConfig {
            listen_addr: self.listen_addr.clone(),
            port: self.port,
        }
    }
}
