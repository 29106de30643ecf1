//! Event sinks
//!
//! The engine hands every state change to one [`EventSink`]. Presentation,
//! metrics and persistence subscribe by implementing or wrapping a sink.

use crate::common::traits::EventSink;
use crate::common::types::format_multiplier;
use crate::games::types::RoundEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &RoundEvent) {}
}

/// Logs events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RoundEvent) {
        match event {
            RoundEvent::RoundOpened { round_number, countdown, seed_hash, .. } => {
                info!(round_number, countdown, seed_hash = ?seed_hash, "Round open for bets");
            }
            RoundEvent::CountdownTick { round_number, remaining } => {
                debug!(round_number, remaining, "Countdown");
            }
            RoundEvent::RoundStarted { round_number, seed_hash, .. } => {
                info!(round_number, seed_hash = ?seed_hash, "Round started");
            }
            RoundEvent::MultiplierUpdated { round_number, multiplier } => {
                trace!(round_number, multiplier = %format_multiplier(*multiplier), "Multiplier");
            }
            RoundEvent::BetPlaced { round_number, bet_id, player_id, amount, auto_cashout } => {
                info!(round_number, %bet_id, %player_id, amount, auto_cashout = ?auto_cashout, "Bet placed");
            }
            RoundEvent::CashedOut { round_number, bet_id, player_id, multiplier, winnings, trigger, .. } => {
                info!(
                    round_number,
                    %bet_id,
                    %player_id,
                    multiplier = %format_multiplier(*multiplier),
                    winnings,
                    trigger = ?trigger,
                    "Cashed out"
                );
            }
            RoundEvent::BetLost { round_number, bet_id, player_id, amount, .. } => {
                info!(round_number, %bet_id, %player_id, amount, "Bet lost");
            }
            RoundEvent::Crashed { round_number, crash_point, .. } => {
                info!(round_number, crash_point = %format_multiplier(*crash_point), "Plane crashed");
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<RoundEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RoundEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of one kind, e.g. `"cashed_out"`
    pub fn of_kind(&self, kind: &str) -> Vec<RoundEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind() == kind)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &RoundEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Publishes events on a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<RoundEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<RoundEvent> {
        self.sender.clone()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: &RoundEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event.clone());
    }
}

/// Forwards to several sinks in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &RoundEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
