/*
 * SSH Honeypot
 * Copyright (C) 2025 Akaere Networks
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::fmt::format::FmtSpan;

use ssh_honeypot::audit::AuditLogger;
use ssh_honeypot::config::Cli;
use ssh_honeypot::geo::MaxMindResolver;
use ssh_honeypot::identity::HostIdentity;
use ssh_honeypot::session::{SessionContext, ShellProfile};
use ssh_honeypot::ssh::SshServer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Cli::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let credentials = args
        .credential_store()
        .context("Invalid credential configuration")?;
    info!("Accepting {} credential pair(s)", credentials.len());

    if args.generate_host_key {
        HostIdentity::generate_if_missing(&args.host_key, &args.host_pubkey)
            .context("Failed to generate SSH host key")?;
    }
    let identity = HostIdentity::load(&args.host_key, &args.host_pubkey)
        .context("Failed to load SSH host key")?;
    info!(
        "SSH host key: {} {}",
        identity.algorithm(),
        identity.fingerprint()
    );

    let geo = MaxMindResolver::open(&args.geoip_db).context("Failed to open GeoIP database")?;
    info!("GeoIP database: {:?}", args.geoip_db);
    info!("Audit log: {:?}", args.log_file);

    let ctx = SessionContext {
        audit: Arc::new(AuditLogger::new(args.log_file.clone())),
        geo: Arc::new(geo),
        profile: Arc::new(ShellProfile::new(args.hostname.clone())),
    };

    let server = SshServer::new(
        args.server_config(),
        Arc::new(identity),
        Arc::new(credentials),
        ctx,
    )?;

    info!("Honeypot running on port {}", args.port);
    server.start().await
}
