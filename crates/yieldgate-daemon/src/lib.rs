//! # yieldgate-daemon
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon with newline-delimited JSON-RPC over a Unix socket. Mutating
//! methods are signed by the caller's Ed25519 key (see [`auth`]); every
//! committed command is persisted before its response is sent.
//!
//! ## Modules
//!
//! - [`auth`] — Signed request envelopes
//! - [`commands`] — JSON-RPC method handlers
//! - [`config`] — `config.toml` loading
//! - [`events`] — Event bus for subscribers
//! - [`rpc`] — Socket server and dispatch

pub mod auth;
pub mod commands;
pub mod config;
pub mod events;
pub mod rpc;

use anyhow::Context;
use tokio::sync::{broadcast, Mutex};
use yieldgate_db::state::{self, StoredLedgers};
use yieldgate_protocol::{PayoutJournal, Protocol};

use crate::config::DaemonConfig;
use crate::events::EventBus;

/// Database file name inside the data directory.
pub const DB_FILE: &str = "yieldgate.db";

/// Ledger state and its storage, locked together.
#[derive(Debug)]
pub struct Core {
    pub protocol: Protocol<PayoutJournal>,
    pub db: rusqlite::Connection,
    /// Sequence number of the last committed command.
    pub seq: u64,
}

impl Core {
    fn from_stored(stored: StoredLedgers, db: rusqlite::Connection) -> Self {
        Self {
            protocol: Protocol::from_parts(
                stored.ledger,
                stored.registry,
                stored.vault,
                PayoutJournal::new(),
            ),
            db,
            seq: stored.seq,
        }
    }

    /// Discard in-memory state and reload the last committed snapshot.
    ///
    /// # Errors
    ///
    /// Propagates storage errors; the in-memory state is then unchanged.
    pub fn reload(&mut self) -> yieldgate_db::Result<()> {
        match state::load(&self.db)? {
            Some(stored) => {
                self.protocol = Protocol::from_parts(
                    stored.ledger,
                    stored.registry,
                    stored.vault,
                    PayoutJournal::new(),
                );
                self.seq = stored.seq;
            }
            None => {
                let ledger = self.protocol.ledger();
                self.protocol = Protocol::new(
                    ledger.authority(),
                    ledger.slash_policy(),
                    PayoutJournal::new(),
                );
                self.seq = 0;
            }
        }
        tracing::warn!(seq = self.seq, "ledger state reloaded from storage");
        Ok(())
    }
}

/// Daemon-wide shared state.
#[derive(Debug)]
pub struct DaemonState {
    /// Protocol ledgers and database connection.
    pub core: Mutex<Core>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Open the database in the configured data directory and restore the
    /// ledgers, or start empty ones for a fresh database.
    pub fn open(config: DaemonConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;
        let db = yieldgate_db::open(&data_dir.join(DB_FILE))?;
        Self::with_connection(config, db)
    }

    /// State backed by an in-memory database.
    pub fn in_memory(config: DaemonConfig) -> anyhow::Result<Self> {
        Self::with_connection(config, yieldgate_db::open_memory()?)
    }

    fn with_connection(config: DaemonConfig, db: rusqlite::Connection) -> anyhow::Result<Self> {
        let core = match state::load(&db)? {
            Some(stored) => {
                let core = Core::from_stored(stored, db);
                let stored_authority = core.protocol.ledger().authority();
                if let Ok(configured) = config.protocol.authority() {
                    if configured != stored_authority {
                        tracing::warn!(
                            configured = %configured,
                            stored = %stored_authority,
                            "configured authority differs from stored ledgers; keeping stored"
                        );
                    }
                }
                core
            }
            None => {
                let authority = config.protocol.authority()?;
                tracing::info!(authority = %authority, policy = ?config.protocol.slash_policy, "starting empty ledgers");
                Core {
                    protocol: Protocol::new(
                        authority,
                        config.protocol.slash_policy,
                        PayoutJournal::new(),
                    ),
                    db,
                    seq: 0,
                }
            }
        };

        let event_bus = EventBus::new(config.rpc.event_buffer.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            core: Mutex::new(core),
            config,
            event_bus,
            shutdown_tx,
        })
    }
}
