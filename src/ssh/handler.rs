// SSH Honeypot - SSH Connection Handler
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::Result;
use russh::{Channel, ChannelId, CryptoVec, MethodSet, server};
use russh_keys::key;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use super::terminal::{LineEditor, TerminalEvent};
use crate::credentials::CredentialStore;
use crate::session::{SessionContext, ShellSession};

/// An open shell channel: the engine plus its line discipline
struct ShellChannel {
    engine: ShellSession,
    editor: LineEditor,
}

/// Per-connection russh handler.
///
/// Authenticates against the credential store and gives every shell channel
/// its own [`ShellSession`].
pub struct HoneypotSshHandler {
    credentials: Arc<CredentialStore>,
    ctx: SessionContext,
    client_addr: Option<SocketAddr>,
    username: Option<String>,
    shells: HashMap<ChannelId, ShellChannel>,
    /// Channels granted a PTY; only these get keystroke echo
    ptys: HashSet<ChannelId>,
}

impl HoneypotSshHandler {
    pub fn new(credentials: Arc<CredentialStore>, ctx: SessionContext) -> Self {
        Self {
            credentials,
            ctx,
            client_addr: None,
            username: None,
            shells: HashMap::new(),
            ptys: HashSet::new(),
        }
    }

    /// Set the client address
    pub fn set_client_addr(&mut self, addr: SocketAddr) {
        self.client_addr = Some(addr);
    }

    fn peer(&self) -> String {
        self.client_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn close_shell(&mut self, channel: ChannelId) {
        self.ptys.remove(&channel);
        if let Some(mut shell) = self.shells.remove(&channel) {
            shell.engine.on_close();
        }
    }
}

impl Drop for HoneypotSshHandler {
    fn drop(&mut self) {
        for (_, mut shell) in self.shells.drain() {
            shell.engine.on_close();
        }
    }
}

#[async_trait::async_trait]
impl server::Handler for HoneypotSshHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> Result<server::Auth, Self::Error> {
        debug!("SSH auth_none from {} as '{}'", self.peer(), user);
        Ok(server::Auth::Reject {
            proceed_with_methods: Some(MethodSet::PASSWORD),
        })
    }

    async fn auth_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> Result<server::Auth, Self::Error> {
        if !self.credentials.accepts(user.as_bytes(), password.as_bytes()) {
            info!(
                "SSH authentication rejected: user='{}' client={}",
                user,
                self.peer()
            );
            return Ok(server::Auth::Reject {
                proceed_with_methods: Some(MethodSet::PASSWORD),
            });
        }

        info!(
            "SSH authentication accepted: user='{}' client={}",
            user,
            self.peer()
        );
        self.username = Some(user.to_string());
        Ok(server::Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &key::PublicKey,
    ) -> Result<server::Auth, Self::Error> {
        debug!("SSH public key offered by {} as '{}'", self.peer(), user);
        Ok(server::Auth::Reject {
            proceed_with_methods: Some(MethodSet::PASSWORD),
        })
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<server::Msg>,
        _session: &mut server::Session,
    ) -> Result<bool, Self::Error> {
        debug!("SSH channel opened: {:?}", channel.id());
        Ok(self.username.is_some())
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(russh::Pty, u32)],
        session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        debug!("SSH PTY request for channel: {:?}", channel);
        self.ptys.insert(channel);
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        let (Some(username), Some(client_addr)) = (self.username.clone(), self.client_addr)
        else {
            session.channel_failure(channel);
            return Ok(());
        };
        if self.shells.contains_key(&channel) {
            session.channel_failure(channel);
            return Ok(());
        }

        let mut engine = ShellSession::new(username, self.ctx.clone());
        let greeting = match engine.on_open(client_addr).await {
            Ok(greeting) => greeting,
            Err(e) => {
                session.close(channel);
                return Err(e.into());
            }
        };

        session.channel_success(channel);
        session.data(channel, CryptoVec::from_slice(greeting.as_bytes()));

        let mut editor = LineEditor::new(self.ctx.profile.prompt());
        editor.set_echo(self.ptys.contains(&channel));
        self.shells.insert(channel, ShellChannel { engine, editor });
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        info!(
            "SSH exec request refused from {}: {:?}",
            self.peer(),
            String::from_utf8_lossy(data)
        );
        session.channel_failure(channel);
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        let Some(shell) = self.shells.get_mut(&channel) else {
            return Ok(());
        };

        let mut end_of_input = false;
        for event in shell.editor.feed(data) {
            match event {
                TerminalEvent::Output(bytes) => {
                    session.data(channel, CryptoVec::from_slice(&bytes));
                }
                TerminalEvent::Line(line) => match shell.engine.on_line(&line).await {
                    Ok(reply) => {
                        session.data(channel, CryptoVec::from_slice(reply.as_bytes()));
                    }
                    Err(e) => {
                        self.shells.remove(&channel);
                        self.ptys.remove(&channel);
                        session.close(channel);
                        return Err(e.into());
                    }
                },
                TerminalEvent::EndOfInput => {
                    end_of_input = true;
                    break;
                }
            }
        }

        if end_of_input {
            self.close_shell(channel);
            session.data(channel, CryptoVec::from_slice(b"logout\r\n"));
            session.exit_status_request(channel, 0);
            session.close(channel);
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        debug!("SSH channel EOF: {:?}", channel);
        if self.shells.contains_key(&channel) {
            self.close_shell(channel);
            session.close(channel);
        }
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        debug!("SSH channel closed: {:?}", channel);
        self.close_shell(channel);
        Ok(())
    }
}

impl std::fmt::Debug for HoneypotSshHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoneypotSshHandler")
            .field("client_addr", &self.client_addr)
            .field("username", &self.username)
            .field("shells", &self.shells.len())
            .field("ptys", &self.ptys.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLogger;
    use crate::credentials::Credential;
    use crate::geo::NullResolver;
    use crate::session::ShellProfile;
    use russh::server::Handler;
    use tempfile::tempdir;

    fn handler(log_path: &std::path::Path) -> HoneypotSshHandler {
        let mut credentials = CredentialStore::with_defaults();
        credentials.add(Credential::new("admin", "admin123"));
        let ctx = SessionContext {
            audit: Arc::new(AuditLogger::new(log_path)),
            geo: Arc::new(NullResolver),
            profile: Arc::new(ShellProfile::default()),
        };
        let mut handler = HoneypotSshHandler::new(Arc::new(credentials), ctx);
        handler.set_client_addr("203.0.113.5:40000".parse().unwrap());
        handler
    }

    #[tokio::test]
    async fn test_password_gate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("honeypot.log");
        let mut handler = handler(&path);

        let rejected = handler.auth_password("attacker", "wrongpass").await.unwrap();
        assert!(matches!(rejected, server::Auth::Reject { .. }));
        assert!(handler.username.is_none());

        let accepted = handler.auth_password("admin", "admin123").await.unwrap();
        assert!(matches!(accepted, server::Auth::Accept));
        assert_eq!(handler.username.as_deref(), Some("admin"));

        // Authentication alone never touches the audit log.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_none_auth_offers_password() {
        let dir = tempdir().unwrap();
        let mut handler = handler(&dir.path().join("honeypot.log"));
        let auth = handler.auth_none("root").await.unwrap();
        assert!(matches!(
            auth,
            server::Auth::Reject {
                proceed_with_methods: Some(_)
            }
        ));
    }
}
