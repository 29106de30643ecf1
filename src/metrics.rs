//! Engine metrics collection
//!
//! Counters are fed from engine events and rendered in Prometheus text
//! format.

use crate::common::traits::EventSink;
use crate::games::types::RoundEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Money totals are kept in cents so they fit atomics
fn to_cents(amount: f64) -> u64 {
    (amount * 100.0).round().max(0.0) as u64
}

#[derive(Clone)]
pub struct EngineMetrics {
    start_time: Instant,
    rounds_started: Arc<AtomicU64>,
    rounds_crashed: Arc<AtomicU64>,
    bets_placed: Arc<AtomicU64>,
    cashouts_manual: Arc<AtomicU64>,
    cashouts_auto: Arc<AtomicU64>,
    bets_lost: Arc<AtomicU64>,
    wagered_cents: Arc<AtomicU64>,
    paid_out_cents: Arc<AtomicU64>,
    last_crash_cents: Arc<AtomicU64>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rounds_started: Arc::new(AtomicU64::new(0)),
            rounds_crashed: Arc::new(AtomicU64::new(0)),
            bets_placed: Arc::new(AtomicU64::new(0)),
            cashouts_manual: Arc::new(AtomicU64::new(0)),
            cashouts_auto: Arc::new(AtomicU64::new(0)),
            bets_lost: Arc::new(AtomicU64::new(0)),
            wagered_cents: Arc::new(AtomicU64::new(0)),
            paid_out_cents: Arc::new(AtomicU64::new(0)),
            last_crash_cents: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn rounds_crashed(&self) -> u64 {
        self.rounds_crashed.load(Ordering::SeqCst)
    }

    pub fn bets_placed(&self) -> u64 {
        self.bets_placed.load(Ordering::SeqCst)
    }

    pub fn cashouts(&self) -> u64 {
        self.cashouts_manual.load(Ordering::SeqCst) + self.cashouts_auto.load(Ordering::SeqCst)
    }

    pub fn total_wagered(&self) -> f64 {
        self.wagered_cents.load(Ordering::SeqCst) as f64 / 100.0
    }

    pub fn total_paid_out(&self) -> f64 {
        self.paid_out_cents.load(Ordering::SeqCst) as f64 / 100.0
    }

    /// Paid out / wagered; 0 before any bet
    pub fn return_to_player(&self) -> f64 {
        let wagered = self.total_wagered();
        if wagered == 0.0 {
            return 0.0;
        }
        self.total_paid_out() / wagered
    }

    pub fn total_runtime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Rounds per minute since start
    pub fn round_rate(&self) -> f64 {
        let minutes = self.total_runtime().as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        self.rounds_crashed() as f64 / minutes
    }

    pub fn to_prometheus_format(&self) -> String {
        let load = |c: &AtomicU64| c.load(Ordering::SeqCst);
        format!(
            "# HELP aviator_rounds_started_total Rounds that started running\n\
             # TYPE aviator_rounds_started_total counter\n\
             aviator_rounds_started_total {}\n\
             # HELP aviator_rounds_crashed_total Rounds that crashed\n\
             # TYPE aviator_rounds_crashed_total counter\n\
             aviator_rounds_crashed_total {}\n\
             # HELP aviator_bets_placed_total Accepted bets\n\
             # TYPE aviator_bets_placed_total counter\n\
             aviator_bets_placed_total {}\n\
             # HELP aviator_cashouts_total Cash-outs by trigger\n\
             # TYPE aviator_cashouts_total counter\n\
             aviator_cashouts_total{{trigger=\"manual\"}} {}\n\
             aviator_cashouts_total{{trigger=\"auto\"}} {}\n\
             # HELP aviator_bets_lost_total Bets lost to a crash\n\
             # TYPE aviator_bets_lost_total counter\n\
             aviator_bets_lost_total {}\n\
             # HELP aviator_wagered_total Total amount wagered\n\
             # TYPE aviator_wagered_total counter\n\
             aviator_wagered_total {:.2}\n\
             # HELP aviator_paid_out_total Total amount paid out\n\
             # TYPE aviator_paid_out_total counter\n\
             aviator_paid_out_total {:.2}\n\
             # HELP aviator_last_crash_point Crash point of the latest round\n\
             # TYPE aviator_last_crash_point gauge\n\
             aviator_last_crash_point {:.2}\n\
             # HELP aviator_round_rate Rounds crashed per minute since start\n\
             # TYPE aviator_round_rate gauge\n\
             aviator_round_rate {:.2}\n\
             # HELP aviator_uptime_seconds Time since metrics started\n\
             # TYPE aviator_uptime_seconds gauge\n\
             aviator_uptime_seconds {}\n",
            load(&self.rounds_started),
            load(&self.rounds_crashed),
            load(&self.bets_placed),
            load(&self.cashouts_manual),
            load(&self.cashouts_auto),
            load(&self.bets_lost),
            self.total_wagered(),
            self.total_paid_out(),
            load(&self.last_crash_cents) as f64 / 100.0,
            self.round_rate(),
            self.total_runtime().as_secs(),
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EngineMetrics {
    fn emit(&self, event: &RoundEvent) {
        use crate::games::types::CashoutTrigger;

        match event {
            RoundEvent::RoundStarted { .. } => {
                self.rounds_started.fetch_add(1, Ordering::SeqCst);
            }
            RoundEvent::BetPlaced { amount, .. } => {
                self.bets_placed.fetch_add(1, Ordering::SeqCst);
                self.wagered_cents.fetch_add(to_cents(*amount), Ordering::SeqCst);
            }
            RoundEvent::CashedOut { winnings, trigger, .. } => {
                let counter = match trigger {
                    CashoutTrigger::Manual => &self.cashouts_manual,
                    CashoutTrigger::Auto => &self.cashouts_auto,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                self.paid_out_cents.fetch_add(to_cents(*winnings), Ordering::SeqCst);
            }
            RoundEvent::BetLost { .. } => {
                self.bets_lost.fetch_add(1, Ordering::SeqCst);
            }
            RoundEvent::Crashed { crash_point, .. } => {
                self.rounds_crashed.fetch_add(1, Ordering::SeqCst);
                self.last_crash_cents.store(to_cents(*crash_point), Ordering::SeqCst);
            }
            _ => {}
        }
    }
}
