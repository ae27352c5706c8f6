// SSH Honeypot - SSH Server Implementation
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, Result};
use russh::server;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::handler::HoneypotSshHandler;
use crate::credentials::CredentialStore;
use crate::identity::HostIdentity;
use crate::session::SessionContext;

/// SSH server configuration
#[derive(Debug, Clone)]
pub struct SshServerConfig {
    pub listen_addr: String,
    pub port: u16,
}

impl Default for SshServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 2222,
        }
    }
}

/// Connection dispatcher: one russh session per accepted TCP connection
pub struct SshServer {
    config: SshServerConfig,
    credentials: Arc<CredentialStore>,
    ctx: SessionContext,
    russh_config: Arc<server::Config>,
}

impl SshServer {
    /// Create a new SSH server; refuses to build without credentials
    pub fn new(
        config: SshServerConfig,
        identity: Arc<HostIdentity>,
        credentials: Arc<CredentialStore>,
        ctx: SessionContext,
    ) -> Result<Self> {
        credentials
            .validate()
            .with_context(|| "Refusing to start SSH server")?;

        let russh_config = Arc::new(server::Config {
            inactivity_timeout: Some(Duration::from_secs(3600)),
            auth_rejection_time: Duration::from_secs(3),
            auth_rejection_time_initial: Some(Duration::from_secs(0)),
            keys: vec![identity.key_pair().clone()],
            ..Default::default()
        });

        Ok(Self {
            config,
            credentials,
            ctx,
            russh_config,
        })
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let bind_addr = format!("{}:{}", self.config.listen_addr, self.config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind SSH server to {}", bind_addr))?;
        info!("SSH honeypot listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Start the SSH server
    pub async fn start(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections forever, each on its own task
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, client_addr)) => {
                    info!("SSH connection from {}", client_addr);

                    let mut handler =
                        HoneypotSshHandler::new(Arc::clone(&self.credentials), self.ctx.clone());
                    handler.set_client_addr(client_addr);
                    let config = Arc::clone(&self.russh_config);

                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(stream, client_addr, handler, config).await
                        {
                            error!("SSH connection error from {}: {:#}", client_addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept SSH connection: {}", e);
                }
            }
        }
    }

    /// Handle a single SSH connection until the client goes away
    async fn handle_connection(
        stream: tokio::net::TcpStream,
        client_addr: SocketAddr,
        handler: HoneypotSshHandler,
        config: Arc<server::Config>,
    ) -> Result<()> {
        let running = server::run_stream(config, stream, handler)
            .await
            .with_context(|| format!("SSH handshake failed for {}", client_addr))?;

        running
            .await
            .with_context(|| format!("SSH session failed for {}", client_addr))?;

        debug!("SSH session completed for {}", client_addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLogger;
    use crate::geo::NullResolver;
    use crate::session::ShellProfile;
    use russh::{Channel, ChannelMsg, client};
    use russh_keys::key;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const WAIT: Duration = Duration::from_secs(10);
    const PROMPT: &str = "root@honeypot:~# ";

    struct TestClient;

    #[async_trait::async_trait]
    impl client::Handler for TestClient {
        type Error = russh::Error;

        async fn check_server_key(
            &mut self,
            _server_public_key: &key::PublicKey,
        ) -> Result<bool, Self::Error> {
            Ok(true)
        }
    }

    /// Serve on an ephemeral loopback port with the audit log at `log_path`
    async fn spawn_server(log_path: &Path) -> (SocketAddr, TempDir) {
        let key_dir = tempdir().unwrap();
        let private_path = key_dir.path().join("host");
        let public_path = key_dir.path().join("host.pub");
        HostIdentity::generate_if_missing(&private_path, &public_path).unwrap();
        let identity = HostIdentity::load(&private_path, &public_path).unwrap();

        let ctx = SessionContext {
            audit: Arc::new(AuditLogger::new(log_path)),
            geo: Arc::new(NullResolver),
            profile: Arc::new(ShellProfile::default()),
        };
        let config = SshServerConfig {
            listen_addr: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = SshServer::new(
            config,
            Arc::new(identity),
            Arc::new(CredentialStore::with_defaults()),
            ctx,
        )
        .unwrap();

        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server.serve(listener).await });
        (addr, key_dir)
    }

    async fn open_shell(
        addr: SocketAddr,
        pty: bool,
    ) -> (client::Handle<TestClient>, Channel<client::Msg>) {
        let config = Arc::new(client::Config::default());
        let mut handle = client::connect(config, addr, TestClient).await.unwrap();
        assert!(handle.authenticate_password("test", "test").await.unwrap());

        let channel = handle.channel_open_session().await.unwrap();
        if pty {
            channel
                .request_pty(false, "xterm", 80, 24, 0, 0, &[])
                .await
                .unwrap();
        }
        channel.request_shell(false).await.unwrap();
        (handle, channel)
    }

    /// Collect channel data until `needle` shows up; `None` if the channel
    /// closes first
    async fn read_until(channel: &mut Channel<client::Msg>, needle: &[u8]) -> Option<Vec<u8>> {
        let mut received = Vec::new();
        tokio::time::timeout(WAIT, async {
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { data } => {
                        received.extend_from_slice(&data);
                        if received.windows(needle.len()).any(|w| w == needle) {
                            return Some(received);
                        }
                    }
                    ChannelMsg::Eof | ChannelMsg::Close => return None,
                    _ => {}
                }
            }
            None
        })
        .await
        .expect("timed out waiting for server output")
    }

    /// Wait for the channel to go away, returning any data seen on the way
    async fn drain_until_closed(channel: &mut Channel<client::Msg>) -> Vec<u8> {
        let mut received = Vec::new();
        tokio::time::timeout(WAIT, async {
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { data } => received.extend_from_slice(&data),
                    ChannelMsg::Close => break,
                    _ => {}
                }
            }
        })
        .await
        .expect("channel was not closed");
        received
    }

    #[tokio::test]
    async fn test_shell_round_trip() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("honeypot.log");
        let (addr, _keys) = spawn_server(&log_path).await;

        let (_handle, mut channel) = open_shell(addr, true).await;
        let greeting = read_until(&mut channel, PROMPT.as_bytes()).await.unwrap();
        assert!(greeting.starts_with(b"Welcome to the honeypot, test!\r\n"));

        channel.data(&b"ls -la\r"[..]).await.unwrap();
        let reply = read_until(&mut channel, PROMPT.as_bytes()).await.unwrap();
        assert_eq!(
            reply,
            format!("ls -la\r\nCommand not found: ls -la\r\n{PROMPT}").into_bytes()
        );

        let log = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event\":\"connection_made\""));
        assert!(lines[1].contains("\"command\":\"ls -la\""));
    }

    #[tokio::test]
    async fn test_shell_without_pty_is_not_echoed() {
        let dir = tempdir().unwrap();
        let (addr, _keys) = spawn_server(&dir.path().join("honeypot.log")).await;

        let (_handle, mut channel) = open_shell(addr, false).await;
        read_until(&mut channel, PROMPT.as_bytes()).await.unwrap();

        channel.data(&b"whoami\r"[..]).await.unwrap();
        let reply = read_until(&mut channel, PROMPT.as_bytes()).await.unwrap();
        assert_eq!(
            reply,
            format!("Command not found: whoami\r\n{PROMPT}").into_bytes()
        );
    }

    #[tokio::test]
    async fn test_unwritable_log_drops_connection_only() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("honeypot.log");
        std::fs::create_dir(&log_path).unwrap();
        let (addr, _keys) = spawn_server(&log_path).await;

        // The connection record cannot be written: no greeting, no shell
        let (_handle, mut channel) = open_shell(addr, true).await;
        assert!(drain_until_closed(&mut channel).await.is_empty());

        // The dispatcher keeps accepting once the log is writable again
        std::fs::remove_dir(&log_path).unwrap();
        let (_handle, mut channel) = open_shell(addr, true).await;
        let greeting = read_until(&mut channel, PROMPT.as_bytes()).await.unwrap();
        assert!(greeting.starts_with(b"Welcome to the honeypot, test!\r\n"));
    }

    #[tokio::test]
    async fn test_audit_failure_mid_session_closes_shell() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("honeypot.log");
        let (addr, _keys) = spawn_server(&log_path).await;

        let (_handle, mut channel) = open_shell(addr, false).await;
        read_until(&mut channel, PROMPT.as_bytes()).await.unwrap();

        std::fs::remove_file(&log_path).unwrap();
        std::fs::create_dir(&log_path).unwrap();

        channel.data(&b"ls\r"[..]).await.unwrap();
        let after = drain_until_closed(&mut channel).await;
        assert!(!after.windows(17).any(|w| w == b"Command not found"));
    }
}
