use crate::common::traits::{Ledger, LedgerError};
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe in-memory balances, keyed by player id
#[derive(Clone, Default)]
pub struct MemoryLedger {
    balances: Arc<DashMap<String, f64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or top up) an account
    pub fn deposit(&self, player_id: &str, amount: f64) -> Result<f64, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut balance = self.balances.entry(player_id.to_string()).or_insert(0.0);
        *balance += amount;
        Ok(*balance)
    }

    /// Take money out of an existing account
    pub fn withdraw(&self, player_id: &str, amount: f64) -> Result<f64, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.debit(player_id, amount)?;
        Ok(self.balance(player_id).unwrap_or(0.0))
    }

    pub fn balance(&self, player_id: &str) -> Option<f64> {
        self.balances.get(player_id).map(|b| *b)
    }

    pub fn accounts(&self) -> usize {
        self.balances.len()
    }
}

impl Ledger for MemoryLedger {
    fn debit(&self, player_id: &str, amount: f64) -> Result<(), LedgerError> {
        let mut balance = self
            .balances
            .get_mut(player_id)
            .ok_or_else(|| LedgerError::UnknownAccount(player_id.to_string()))?;

        if amount > *balance {
            return Err(LedgerError::InsufficientFunds {
                player_id: player_id.to_string(),
                requested: amount,
                available: *balance,
            });
        }

        *balance -= amount;
        Ok(())
    }

    fn credit(&self, player_id: &str, amount: f64) -> Result<(), LedgerError> {
        *self.balances.entry(player_id.to_string()).or_insert(0.0) += amount;
        Ok(())
    }
}
