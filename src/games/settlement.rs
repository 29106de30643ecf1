//! Result recording
//!
//! Resolved bets (cash-outs and losses) are persisted through a
//! [`ResultStore`] off the engine's hot path: the engine emits events
//! synchronously, the forwarder queues the matching [`GameRecord`]s and a
//! background task writes them in order. The queue is bounded; records that
//! do not fit are dropped and counted.

use crate::common::traits::{EventSink, ResultStore, StoreError};
use crate::games::types::{BetId, GameOutcome, GameRecord, RoundEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Records queued for the store before new ones are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Totals reported by the recorder task when it drains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub recorded: u64,
    pub failed: u64,
    /// Records dropped because the queue was full
    pub dropped: u64,
}

/// Event sink that queues resolved bets for the result store
#[derive(Debug, Clone)]
pub struct ResultForwarder {
    sender: mpsc::Sender<GameRecord>,
    dropped: Arc<AtomicU64>,
}

impl ResultForwarder {
    /// Start the recorder task with [`DEFAULT_QUEUE_CAPACITY`]
    pub fn spawn(store: Arc<dyn ResultStore>) -> (Self, JoinHandle<RecorderStats>) {
        Self::spawn_with_capacity(store, DEFAULT_QUEUE_CAPACITY)
    }

    /// Start the recorder task. It runs until every forwarder clone is
    /// dropped, then returns its totals.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_with_capacity(
        store: Arc<dyn ResultStore>,
        capacity: usize,
    ) -> (Self, JoinHandle<RecorderStats>) {
        let (sender, mut receiver) = mpsc::channel::<GameRecord>(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let task_dropped = dropped.clone();

        let handle = tokio::spawn(async move {
            let mut stats = RecorderStats::default();
            while let Some(record) = receiver.recv().await {
                let bet_id = record.bet_id;
                match store.record(record).await {
                    Ok(()) => stats.recorded += 1,
                    Err(e) => {
                        stats.failed += 1;
                        warn!(%bet_id, "Failed to record game result: {}", e);
                    }
                }
            }
            stats.dropped = task_dropped.load(Ordering::SeqCst);
            debug!(
                recorded = stats.recorded,
                failed = stats.failed,
                dropped = stats.dropped,
                "Result recorder stopped"
            );
            stats
        });

        (Self { sender, dropped }, handle)
    }

    /// Records dropped so far because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl EventSink for ResultForwarder {
    fn emit(&self, event: &RoundEvent) {
        if let Some(record) = GameRecord::from_event(event) {
            match self.sender.try_send(record) {
                Ok(()) => {}
                Err(TrySendError::Full(record)) => {
                    self.dropped.fetch_add(1, Ordering::SeqCst);
                    warn!(bet_id = %record.bet_id, "Result queue full, dropping record");
                }
                Err(TrySendError::Closed(record)) => {
                    warn!(bet_id = %record.bet_id, "Result recorder is gone, dropping record");
                }
            }
        }
    }
}

/// In-memory result store; one record per bet
#[derive(Debug, Clone, Default)]
pub struct MemoryResultStore {
    records: Arc<DashMap<BetId, GameRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bet_id: &BetId) -> Option<GameRecord> {
        self.records.get(bet_id).map(|r| r.clone())
    }

    /// Records for one player, oldest round first
    pub fn for_player(&self, player_id: &str) -> Vec<GameRecord> {
        let mut records: Vec<GameRecord> = self
            .records
            .iter()
            .filter(|r| r.player_id == player_id)
            .map(|r| r.clone())
            .collect();
        records.sort_by_key(|r| r.round_number);
        records
    }

    pub fn count_by_outcome(&self, outcome: GameOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn record(&self, record: GameRecord) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(record.bet_id) {
            Entry::Occupied(_) => Err(StoreError::Rejected {
                bet_id: record.bet_id.to_string(),
                reason: "bet already recorded".to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}
