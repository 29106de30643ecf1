//! Shared traits and interfaces
//!
//! Narrow seams between the round engine and the systems it talks to. The
//! engine only ever sees these traits, which keeps it testable with in-memory
//! stand-ins.

use crate::games::types::{GameRecord, RoundEvent};
use async_trait::async_trait;

/// Balance ledger owned by the surrounding application.
///
/// The engine debits on bet placement and credits on cash-out; it never
/// reads balances itself.
pub trait Ledger: Send + Sync {
    /// Remove `amount` from the player's balance
    fn debit(&self, player_id: &str, amount: f64) -> Result<(), LedgerError>;

    /// Add `amount` to the player's balance
    fn credit(&self, player_id: &str, amount: f64) -> Result<(), LedgerError>;
}

/// Ledger failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient funds for {player_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        player_id: String,
        requested: f64,
        available: f64,
    },

    #[error("Invalid ledger amount: {0}")]
    InvalidAmount(f64),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Receiver of engine events. Fire-and-forget: no acknowledgment.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RoundEvent);
}

/// Wall-clock time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Persistence for resolved bets (the backend's `game_results` table)
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Record one resolved bet
    async fn record(&self, record: GameRecord) -> Result<(), StoreError>;
}

/// Result store failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Result store rejected record for bet {bet_id}: {reason}")]
    Rejected { bet_id: String, reason: String },

    #[error("Result store unavailable: {0}")]
    Unavailable(String),
}
