//! # SSH Honeypot Library
//!
//! A decoy SSH server that lets in a configured set of username/password
//! pairs, presents a fake shell, and records every connection and every line
//! typed into a GeoIP-enriched JSON Lines audit log.
//!
//! - [`credentials`]: the accepted logins
//! - [`identity`]: the server host key
//! - [`geo`]: address to location lookup (MaxMind City)
//! - [`audit`]: append-only audit log
//! - [`session`]: the fake shell state machine
//! - [`ssh`]: russh front end (dispatcher, handler, line discipline)
//!
//! ## Driving a session without SSH
//!
//! ```no_run
//! use std::sync::Arc;
//! use ssh_honeypot::audit::AuditLogger;
//! use ssh_honeypot::geo::NullResolver;
//! use ssh_honeypot::session::{SessionContext, ShellProfile, ShellSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = SessionContext {
//!         audit: Arc::new(AuditLogger::new("honeypot.log")),
//!         geo: Arc::new(NullResolver),
//!         profile: Arc::new(ShellProfile::default()),
//!     };
//!     let mut session = ShellSession::new("test", ctx);
//!     print!("{}", session.on_open("203.0.113.5:50022".parse()?).await?);
//!     print!("{}", session.on_line(b"ls -la").await?);
//!     session.on_close();
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod credentials;
pub mod error;
pub mod geo;
pub mod identity;
pub mod session;
pub mod ssh;

pub use audit::{AuditLogger, LogEvent};
pub use credentials::{Credential, CredentialStore};
pub use error::{HoneypotError, HoneypotResult};
pub use geo::{GeoLocation, GeoResolver, MaxMindResolver};
pub use identity::HostIdentity;
pub use session::{SessionContext, SessionState, ShellProfile, ShellSession};
