//! Aviator round engine
//!
//! One explicit state machine per table: `Waiting -> Running -> Crashed ->
//! Waiting`. The engine is a plain owned value. Every external command and
//! every tick takes `&mut self`, so each one is an atomic step against the
//! round and its bets. Whoever owns the engine decides how ticks are
//! scheduled: tests call [`RoundEngine::step`] directly and the driver turns
//! the returned delay into a timer.

use crate::common::clock::SystemClock;
use crate::common::traits::{Clock, EventSink, Ledger, LedgerError};
use crate::config::{AviatorConfig, BettingConfig, TimingConfig};
use crate::errors::ConfigurationError;
use crate::games::crash_point::{CrashPointGenerator, CrashPointSource, FairCrashSource};
use crate::games::events::NullSink;
use crate::games::fairness::RoundSeed;
use crate::games::growth::GrowthCurve;
use crate::games::history::{BetArchive, RoundHistory};
use crate::games::types::{
    Bet, BetId, BetStatus, CashoutTrigger, RoundEvent, RoundSnapshot, RoundState, RoundSummary,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a stake was refused
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountRejection {
    NotFinite,
    BelowMinimum { min: f64 },
    AboveMaximum { max: f64 },
    InsufficientBalance,
}

impl fmt::Display for AmountRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountRejection::NotFinite => write!(f, "amount is not a finite number"),
            AmountRejection::BelowMinimum { min } => write!(f, "minimum bet is {}", min),
            AmountRejection::AboveMaximum { max } => write!(f, "maximum bet is {}", max),
            AmountRejection::InsufficientBalance => write!(f, "insufficient balance"),
        }
    }
}

/// Errors returned by engine commands. All are recoverable; none change
/// engine state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoundError {
    #[error("Round {round_number} is {actual}, operation requires {required}")]
    InvalidState {
        round_number: u64,
        actual: RoundState,
        required: RoundState,
    },

    #[error("Invalid bet amount {amount}: {reason}")]
    InvalidAmount { amount: f64, reason: AmountRejection },

    #[error("Auto cash-out {value}x is below the minimum of {min}x")]
    InvalidAutoCashout { value: f64, min: f64 },

    #[error("Player {player_id} already has bet {bet_id} in round {round_number}")]
    DuplicateBet {
        player_id: String,
        bet_id: BetId,
        round_number: u64,
    },

    #[error("No bet {0} is known to this engine")]
    NotFound(BetId),

    #[error("Bet {bet_id} is already {status}")]
    AlreadyResolved { bet_id: BetId, status: BetStatus },

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
}

/// Live state of the current round
struct Round {
    round_number: u64,
    state: RoundState,
    crash_point: f64,
    current_multiplier: f64,
    countdown_remaining: u32,
    opened_at_ms: u64,
    started_at_ms: Option<u64>,
    seed: Option<RoundSeed>,
    seed_hash: Option<String>,
}

impl Round {
    /// The crash point is drawn and committed to before any bet is taken
    fn open(
        round_number: u64,
        countdown: u32,
        now_ms: u64,
        source: &mut dyn CrashPointSource,
        generator: &CrashPointGenerator,
    ) -> Self {
        let draw = source.draw(round_number);
        let seed_hash = draw.seed.as_ref().map(RoundSeed::commitment);
        Self {
            round_number,
            state: RoundState::Waiting,
            crash_point: generator.normalize(draw.crash_point),
            current_multiplier: 1.0,
            countdown_remaining: countdown,
            opened_at_ms: now_ms,
            started_at_ms: None,
            seed: draw.seed,
            seed_hash,
        }
    }
}

/// Assembles a [`RoundEngine`] from configuration and collaborators
pub struct EngineBuilder {
    config: AviatorConfig,
    crash_source: Option<Box<dyn CrashPointSource>>,
    ledger: Option<Arc<dyn Ledger>>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn new(config: AviatorConfig) -> Self {
        Self {
            config,
            crash_source: None,
            ledger: None,
            events: None,
            clock: None,
        }
    }

    /// Defaults to a [`FairCrashSource`] seeded from the OS
    pub fn crash_source(mut self, source: impl CrashPointSource + 'static) -> Self {
        self.crash_source = Some(Box::new(source));
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Defaults to [`NullSink`]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Defaults to [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and open the first round
    pub fn build(self) -> Result<RoundEngine, ConfigurationError> {
        self.config.validate()?;
        let ledger = self
            .ledger
            .ok_or_else(|| ConfigurationError::MissingRequired("ledger".to_string()))?;
        let generator = self.config.crash_generator();
        let mut crash_source = self
            .crash_source
            .unwrap_or_else(|| Box::new(FairCrashSource::from_entropy(generator.clone())));
        let events = self.events.unwrap_or_else(|| Arc::new(NullSink));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let config = self.config;
        let first_round = Round::open(
            config.history.first_round_number,
            config.timing.countdown_ticks,
            clock.now_ms(),
            crash_source.as_mut(),
            &generator,
        );

        let engine = RoundEngine {
            betting: config.betting.clone(),
            timing: config.timing.clone(),
            emit_multiplier_updates: config.monitoring.emit_multiplier_updates,
            generator,
            growth: config.growth.clone(),
            crash_source,
            ledger,
            events,
            clock,
            round: first_round,
            bets: Vec::new(),
            history: RoundHistory::new(config.history.round_capacity),
            archive: BetArchive::new(config.history.bet_capacity),
        };
        engine.announce_open();
        Ok(engine)
    }
}

/// Crash-game round engine
pub struct RoundEngine {
    betting: BettingConfig,
    timing: TimingConfig,
    emit_multiplier_updates: bool,
    generator: CrashPointGenerator,
    growth: GrowthCurve,
    crash_source: Box<dyn CrashPointSource>,
    ledger: Arc<dyn Ledger>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    round: Round,
    /// Bets of the current round, in placement order
    bets: Vec<Bet>,
    history: RoundHistory,
    archive: BetArchive,
}

impl RoundEngine {
    pub fn builder(config: AviatorConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Run one tick of the current phase and return the delay until the next
    /// tick is due
    pub fn step(&mut self) -> Duration {
        match self.round.state {
            RoundState::Waiting => self.tick_countdown(),
            RoundState::Running => self.tick_running(),
            RoundState::Crashed => {
                let next = self.round.round_number + 1;
                let now_ms = self.clock.now_ms();
                self.round = Round::open(
                    next,
                    self.timing.countdown_ticks,
                    now_ms,
                    self.crash_source.as_mut(),
                    &self.generator,
                );
                self.announce_open();
                self.next_tick_delay()
            }
        }
    }

    /// Delay the current phase waits between ticks
    pub fn next_tick_delay(&self) -> Duration {
        match self.round.state {
            RoundState::Waiting => Duration::from_millis(self.timing.waiting_tick_ms),
            RoundState::Running => Duration::from_millis(self.timing.running_tick_ms),
            RoundState::Crashed => Duration::from_millis(self.timing.crash_delay_ms),
        }
    }

    /// Place a bet for the round that is currently open
    pub fn place_bet(
        &mut self,
        player_id: &str,
        amount: f64,
        auto_cashout: Option<f64>,
    ) -> Result<BetId, RoundError> {
        self.require_state(RoundState::Waiting)?;

        let reject = |reason| RoundError::InvalidAmount { amount, reason };
        if !amount.is_finite() {
            return Err(reject(AmountRejection::NotFinite));
        }
        if amount < self.betting.min_bet {
            return Err(reject(AmountRejection::BelowMinimum {
                min: self.betting.min_bet,
            }));
        }
        if amount > self.betting.max_bet {
            return Err(reject(AmountRejection::AboveMaximum {
                max: self.betting.max_bet,
            }));
        }

        if let Some(target) = auto_cashout {
            if !target.is_finite() || target < self.betting.min_auto_cashout {
                return Err(RoundError::InvalidAutoCashout {
                    value: target,
                    min: self.betting.min_auto_cashout,
                });
            }
        }

        if let Some(existing) = self.active_bet(player_id) {
            return Err(RoundError::DuplicateBet {
                player_id: player_id.to_string(),
                bet_id: existing.id,
                round_number: self.round.round_number,
            });
        }

        self.ledger.debit(player_id, amount).map_err(|e| match e {
            LedgerError::InsufficientFunds { .. } => reject(AmountRejection::InsufficientBalance),
            other => RoundError::Ledger(other),
        })?;

        let bet = Bet {
            id: BetId::new(),
            player_id: player_id.to_string(),
            round_number: self.round.round_number,
            amount,
            auto_cashout,
            status: BetStatus::Active,
            cashout_multiplier: None,
            winnings: 0.0,
            trigger: None,
            placed_at_ms: self.clock.now_ms(),
            resolved_at_ms: None,
        };
        let bet_id = bet.id;
        self.bets.push(bet);

        self.events.emit(&RoundEvent::BetPlaced {
            round_number: self.round.round_number,
            bet_id,
            player_id: player_id.to_string(),
            amount,
            auto_cashout,
        });
        Ok(bet_id)
    }

    /// Cash a bet out at the current multiplier
    pub fn cash_out(&mut self, bet_id: BetId) -> Result<Bet, RoundError> {
        self.require_state(RoundState::Running)?;

        let Some(index) = self.bets.iter().position(|bet| bet.id == bet_id) else {
            // Bets from earlier rounds are settled and sit in the archive
            return match self.archive.iter().find(|bet| bet.id == bet_id) {
                Some(bet) => Err(RoundError::AlreadyResolved {
                    bet_id,
                    status: bet.status,
                }),
                None => Err(RoundError::NotFound(bet_id)),
            };
        };

        let status = self.bets[index].status;
        if status != BetStatus::Active {
            return Err(RoundError::AlreadyResolved { bet_id, status });
        }

        Ok(self.settle_cashout(index, CashoutTrigger::Manual))
    }

    pub fn state(&self) -> RoundState {
        self.round.state
    }

    pub fn round_number(&self) -> u64 {
        self.round.round_number
    }

    pub fn current_multiplier(&self) -> f64 {
        self.round.current_multiplier
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.round.countdown_remaining
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        let crash_point = match self.round.state {
            RoundState::Crashed => Some(self.round.crash_point),
            _ => None,
        };
        RoundSnapshot {
            round_number: self.round.round_number,
            state: self.round.state,
            current_multiplier: self.round.current_multiplier,
            countdown_remaining: self.round.countdown_remaining,
            crash_point,
            seed_hash: self.round.seed_hash.clone(),
            opened_at_ms: self.round.opened_at_ms,
            started_at_ms: self.round.started_at_ms,
            active_bets: self.bets.iter().filter(|bet| bet.is_active()).count(),
        }
    }

    pub fn history(&self) -> &RoundHistory {
        &self.history
    }

    /// Bets of the current round
    pub fn current_bets(&self) -> &[Bet] {
        &self.bets
    }

    /// Bet by id, from the current round or the archive
    pub fn bet(&self, bet_id: BetId) -> Option<&Bet> {
        self.bets
            .iter()
            .chain(self.archive.iter())
            .find(|bet| bet.id == bet_id)
    }

    pub fn active_bet(&self, player_id: &str) -> Option<&Bet> {
        self.bets
            .iter()
            .find(|bet| bet.player_id == player_id && bet.is_active())
    }

    /// Player's bets, most recent first
    pub fn player_bets(&self, player_id: &str) -> Vec<Bet> {
        self.bets
            .iter()
            .rev()
            .filter(|bet| bet.player_id == player_id)
            .chain(self.archive.for_player(player_id))
            .cloned()
            .collect()
    }

    pub fn crash_generator(&self) -> &CrashPointGenerator {
        &self.generator
    }

    fn require_state(&self, required: RoundState) -> Result<(), RoundError> {
        if self.round.state != required {
            return Err(RoundError::InvalidState {
                round_number: self.round.round_number,
                actual: self.round.state,
                required,
            });
        }
        Ok(())
    }

    fn announce_open(&self) {
        debug!(round_number = self.round.round_number, "Round opened");
        self.events.emit(&RoundEvent::RoundOpened {
            round_number: self.round.round_number,
            countdown: self.round.countdown_remaining,
            opened_at_ms: self.round.opened_at_ms,
            seed_hash: self.round.seed_hash.clone(),
        });
    }

    fn tick_countdown(&mut self) -> Duration {
        self.round.countdown_remaining = self.round.countdown_remaining.saturating_sub(1);
        self.events.emit(&RoundEvent::CountdownTick {
            round_number: self.round.round_number,
            remaining: self.round.countdown_remaining,
        });

        if self.round.countdown_remaining == 0 {
            self.start_running();
        }
        self.next_tick_delay()
    }

    fn start_running(&mut self) {
        let started_at_ms = self.clock.now_ms();

        self.round.state = RoundState::Running;
        self.round.current_multiplier = 1.0;
        self.round.started_at_ms = Some(started_at_ms);

        debug!(
            round_number = self.round.round_number,
            bets = self.bets.len(),
            "Round running"
        );
        self.events.emit(&RoundEvent::RoundStarted {
            round_number: self.round.round_number,
            started_at_ms,
            seed_hash: self.round.seed_hash.clone(),
        });
    }

    fn tick_running(&mut self) -> Duration {
        let crash_point = self.round.crash_point;
        let multiplier = self
            .growth
            .advance(self.round.current_multiplier)
            .min(crash_point);
        self.round.current_multiplier = multiplier;

        if self.emit_multiplier_updates {
            self.events.emit(&RoundEvent::MultiplierUpdated {
                round_number: self.round.round_number,
                multiplier,
            });
        }

        // Auto cash-outs settle before the crash check, so a target equal to
        // the crash point wins.
        let due: Vec<usize> = self
            .bets
            .iter()
            .enumerate()
            .filter(|(_, bet)| {
                bet.is_active() && bet.auto_cashout.map_or(false, |target| target <= multiplier)
            })
            .map(|(index, _)| index)
            .collect();
        for index in due {
            self.settle_cashout(index, CashoutTrigger::Auto);
        }

        if multiplier >= crash_point {
            self.crash(crash_point);
        }
        self.next_tick_delay()
    }

    fn settle_cashout(&mut self, index: usize, trigger: CashoutTrigger) -> Bet {
        let multiplier = self.round.current_multiplier;
        let now = self.clock.now_ms();

        let bet = &mut self.bets[index];
        bet.status = BetStatus::CashedOut;
        bet.cashout_multiplier = Some(multiplier);
        bet.winnings = bet.amount * multiplier;
        bet.trigger = Some(trigger);
        bet.resolved_at_ms = Some(now);
        let settled = bet.clone();

        // The cash-out stands even if the credit does not go through
        if let Err(e) = self.ledger.credit(&settled.player_id, settled.winnings) {
            warn!(
                bet_id = %settled.id,
                player_id = %settled.player_id,
                winnings = settled.winnings,
                "Failed to credit winnings: {}",
                e
            );
        }

        self.events.emit(&RoundEvent::CashedOut {
            round_number: settled.round_number,
            bet_id: settled.id,
            player_id: settled.player_id.clone(),
            amount: settled.amount,
            multiplier,
            winnings: settled.winnings,
            trigger,
        });
        settled
    }

    fn crash(&mut self, crash_point: f64) {
        let crashed_at_ms = self.clock.now_ms();
        self.round.state = RoundState::Crashed;
        self.round.current_multiplier = crash_point;

        let mut lost = Vec::new();
        for bet in self.bets.iter_mut().filter(|bet| bet.is_active()) {
            bet.status = BetStatus::Lost;
            bet.winnings = 0.0;
            bet.resolved_at_ms = Some(crashed_at_ms);
            lost.push(bet.clone());
        }

        let server_seed = self.round.seed.as_ref().map(RoundSeed::to_hex);
        self.history.push(RoundSummary {
            round_number: self.round.round_number,
            crash_point,
            started_at_ms: self.round.started_at_ms.unwrap_or(crashed_at_ms),
            crashed_at_ms,
            bet_count: self.bets.len(),
            total_wagered: self.bets.iter().map(|bet| bet.amount).sum(),
            total_paid_out: self.bets.iter().map(|bet| bet.winnings).sum(),
            server_seed: server_seed.clone(),
            seed_hash: self.round.seed_hash.clone(),
        });

        for bet in self.bets.drain(..) {
            self.archive.push(bet);
        }

        debug!(
            round_number = self.round.round_number,
            crash_point,
            lost = lost.len(),
            "Round crashed"
        );

        for bet in lost {
            self.events.emit(&RoundEvent::BetLost {
                round_number: bet.round_number,
                bet_id: bet.id,
                player_id: bet.player_id,
                amount: bet.amount,
                crash_point,
            });
        }
        self.events.emit(&RoundEvent::Crashed {
            round_number: self.round.round_number,
            crash_point,
            crashed_at_ms,
            server_seed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::clock::ManualClock;
    use crate::games::crash_point::ScriptedCrashSource;
    use crate::games::events::RecordingSink;
    use crate::games::fairness::verify_summary;
    use crate::games::growth::GrowthBand;
    use crate::games::ledger::MemoryLedger;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Table {
        engine: RoundEngine,
        ledger: MemoryLedger,
        events: Arc<RecordingSink>,
    }

    fn table(crash_points: Vec<f64>) -> Table {
        let mut config = AviatorConfig::default();
        config.growth = GrowthCurve::Stepped {
            bands: vec![GrowthBand { from: 1.0, increment: 0.05 }],
        };
        table_with(config, crash_points)
    }

    fn table_with(config: AviatorConfig, crash_points: Vec<f64>) -> Table {
        let ledger = MemoryLedger::new();
        ledger.deposit("alice", 10_000.0).unwrap();
        ledger.deposit("bob", 10_000.0).unwrap();
        let events = Arc::new(RecordingSink::new());
        let engine = RoundEngine::builder(config)
            .crash_source(ScriptedCrashSource::new(crash_points))
            .ledger(Arc::new(ledger.clone()))
            .events(events.clone())
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .expect("valid config");
        Table {
            engine,
            ledger,
            events,
        }
    }

    fn run_countdown(engine: &mut RoundEngine) {
        while engine.state() == RoundState::Waiting {
            engine.step();
        }
    }

    fn run_until(engine: &mut RoundEngine, multiplier: f64) {
        while engine.state() == RoundState::Running && engine.current_multiplier() < multiplier {
            engine.step();
        }
    }

    #[test]
    fn test_manual_cashout_scenario() {
        let mut t = table(vec![3.0]);
        let bet_id = t.engine.place_bet("alice", 1000.0, None).unwrap();
        assert_eq!(t.ledger.balance("alice"), Some(9_000.0));

        run_countdown(&mut t.engine);
        assert_eq!(t.engine.state(), RoundState::Running);

        run_until(&mut t.engine, 2.5);
        assert_eq!(t.engine.current_multiplier(), 2.5);

        let bet = t.engine.cash_out(bet_id).unwrap();
        assert_eq!(bet.status, BetStatus::CashedOut);
        assert_eq!(bet.cashout_multiplier, Some(2.5));
        assert_eq!(bet.winnings, 2500.0);
        assert_eq!(bet.trigger, Some(CashoutTrigger::Manual));
        assert_eq!(t.ledger.balance("alice"), Some(11_500.0));
    }

    #[test]
    fn test_auto_cashout_above_crash_loses() {
        let mut t = table(vec![1.5]);
        let bet_id = t.engine.place_bet("alice", 500.0, Some(2.0)).unwrap();
        run_countdown(&mut t.engine);
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }

        let bet = t.engine.bet(bet_id).unwrap();
        assert_eq!(bet.status, BetStatus::Lost);
        assert_eq!(bet.winnings, 0.0);
        assert_eq!(t.ledger.balance("alice"), Some(9_500.0));
        assert_eq!(t.events.of_kind("bet_lost").len(), 1);
    }

    #[test]
    fn test_auto_cashout_equal_to_crash_wins() {
        let mut t = table(vec![2.0]);
        let bet_id = t.engine.place_bet("alice", 100.0, Some(2.0)).unwrap();
        run_countdown(&mut t.engine);
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }

        let bet = t.engine.bet(bet_id).unwrap();
        assert_eq!(bet.status, BetStatus::CashedOut);
        assert_eq!(bet.cashout_multiplier, Some(2.0));
        assert_eq!(bet.trigger, Some(CashoutTrigger::Auto));
        assert_eq!(bet.winnings, 200.0);
    }

    #[test]
    fn test_tie_wins_when_growth_overshoots() {
        // Steps of 0.3 jump from 1.9 past the 2.05 crash point
        let mut config = AviatorConfig::default();
        config.growth = GrowthCurve::Stepped {
            bands: vec![GrowthBand { from: 1.0, increment: 0.3 }],
        };
        let mut t = table_with(config, vec![2.05]);
        let bet_id = t.engine.place_bet("alice", 100.0, Some(2.05)).unwrap();
        run_countdown(&mut t.engine);
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }
        let bet = t.engine.bet(bet_id).unwrap();
        assert_eq!(bet.status, BetStatus::CashedOut);
        assert_eq!(bet.cashout_multiplier, Some(2.05));
    }

    #[test]
    fn test_bet_while_running_is_rejected_without_debit() {
        let mut t = table(vec![3.0]);
        run_countdown(&mut t.engine);

        let err = t.engine.place_bet("bob", 100.0, None).unwrap_err();
        assert!(matches!(
            err,
            RoundError::InvalidState {
                actual: RoundState::Running,
                required: RoundState::Waiting,
                ..
            }
        ));
        assert_eq!(t.ledger.balance("bob"), Some(10_000.0));
    }

    #[test]
    fn test_duplicate_bet_rejected() {
        let mut t = table(vec![3.0]);
        let first = t.engine.place_bet("alice", 100.0, None).unwrap();
        let err = t.engine.place_bet("alice", 200.0, None).unwrap_err();
        assert_eq!(
            err,
            RoundError::DuplicateBet {
                player_id: "alice".to_string(),
                bet_id: first,
                round_number: 1,
            }
        );
        assert_eq!(t.ledger.balance("alice"), Some(9_900.0));
        // Other players are unaffected
        assert!(t.engine.place_bet("bob", 200.0, None).is_ok());
    }

    #[test]
    fn test_amount_validation() {
        let mut t = table(vec![3.0]);
        let cases = [
            (5.0, AmountRejection::BelowMinimum { min: 10.0 }),
            (200_000.0, AmountRejection::AboveMaximum { max: 100_000.0 }),
            (f64::NAN, AmountRejection::NotFinite),
            (50_000.0, AmountRejection::InsufficientBalance),
        ];
        for (amount, expected) in cases {
            match t.engine.place_bet("alice", amount, None) {
                Err(RoundError::InvalidAmount { reason, .. }) => assert_eq!(reason, expected),
                other => panic!("Expected InvalidAmount for {}, got {:?}", amount, other),
            }
        }
        assert_eq!(t.ledger.balance("alice"), Some(10_000.0));
        assert!(t.engine.current_bets().is_empty());
    }

    #[test]
    fn test_auto_cashout_below_minimum_rejected() {
        let mut t = table(vec![3.0]);
        let err = t.engine.place_bet("alice", 100.0, Some(1.0)).unwrap_err();
        assert_eq!(err, RoundError::InvalidAutoCashout { value: 1.0, min: 1.01 });
    }

    #[test]
    fn test_unknown_account_surfaces_ledger_error() {
        let mut t = table(vec![3.0]);
        let err = t.engine.place_bet("mallory", 100.0, None).unwrap_err();
        assert_eq!(
            err,
            RoundError::Ledger(LedgerError::UnknownAccount("mallory".to_string()))
        );
    }

    #[test]
    fn test_double_cashout_is_idempotent() {
        let mut t = table(vec![3.0]);
        let bet_id = t.engine.place_bet("alice", 100.0, None).unwrap();
        run_countdown(&mut t.engine);
        run_until(&mut t.engine, 1.5);

        t.engine.cash_out(bet_id).unwrap();
        let balance = t.ledger.balance("alice");
        let err = t.engine.cash_out(bet_id).unwrap_err();
        assert_eq!(
            err,
            RoundError::AlreadyResolved {
                bet_id,
                status: BetStatus::CashedOut,
            }
        );
        assert_eq!(t.ledger.balance("alice"), balance);
        assert_eq!(t.events.of_kind("cashed_out").len(), 1);
    }

    #[test]
    fn test_cashout_errors() {
        let mut t = table(vec![3.0]);
        let bet_id = t.engine.place_bet("alice", 100.0, None).unwrap();

        // Still waiting
        assert!(matches!(
            t.engine.cash_out(bet_id),
            Err(RoundError::InvalidState { .. })
        ));

        run_countdown(&mut t.engine);
        let unknown = BetId::new();
        assert_eq!(t.engine.cash_out(unknown), Err(RoundError::NotFound(unknown)));

        // After the crash the round no longer accepts cash-outs
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }
        assert!(matches!(
            t.engine.cash_out(bet_id),
            Err(RoundError::InvalidState {
                actual: RoundState::Crashed,
                ..
            })
        ));
    }

    #[test]
    fn test_multiplier_monotonic_and_capped() {
        let mut t = table_with(AviatorConfig::default(), vec![7.77]);
        run_countdown(&mut t.engine);
        let mut last = t.engine.current_multiplier();
        while t.engine.state() == RoundState::Running {
            t.engine.step();
            let m = t.engine.current_multiplier();
            assert!(m >= last);
            assert!(m <= 7.77);
            last = m;
        }
        assert_eq!(last, 7.77);
    }

    #[test]
    fn test_crash_point_hidden_until_crash() {
        let mut t = table(vec![1.2]);
        run_countdown(&mut t.engine);
        assert_eq!(t.engine.snapshot().crash_point, None);
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }
        let snapshot = t.engine.snapshot();
        assert_eq!(snapshot.state, RoundState::Crashed);
        assert_eq!(snapshot.crash_point, Some(1.2));
    }

    #[test]
    fn test_round_cycle_and_history() {
        let mut t = table(vec![1.1, 1.3]);
        let mut delays = Vec::new();
        for _ in 0..2 {
            run_countdown(&mut t.engine);
            while t.engine.state() == RoundState::Running {
                delays.push(t.engine.step());
            }
            // Crashed -> next round opens
            t.engine.step();
        }
        assert_eq!(t.engine.round_number(), 3);
        assert_eq!(t.engine.state(), RoundState::Waiting);
        assert_eq!(t.engine.current_multiplier(), 1.0);
        assert_eq!(delays.last(), Some(&Duration::from_millis(3000)));

        let crash_points: Vec<f64> = t.engine.history().iter().map(|s| s.crash_point).collect();
        assert_eq!(crash_points, vec![1.3, 1.1]);
        assert_eq!(t.events.of_kind("round_opened").len(), 3);
        assert_eq!(t.events.of_kind("crashed").len(), 2);
    }

    #[test]
    fn test_countdown_events_and_delays() {
        let mut t = table(vec![2.0]);
        assert_eq!(t.engine.next_tick_delay(), Duration::from_millis(1000));
        for expected in (1..5).rev() {
            assert_eq!(t.engine.step(), Duration::from_millis(1000));
            assert_eq!(t.engine.countdown_remaining(), expected);
        }
        assert_eq!(t.engine.step(), Duration::from_millis(50));
        assert_eq!(t.engine.state(), RoundState::Running);
        assert_eq!(t.events.of_kind("countdown_tick").len(), 5);
        assert_eq!(t.events.of_kind("round_started").len(), 1);
    }

    #[test]
    fn test_summary_totals_and_archive() {
        let mut t = table(vec![2.0]);
        let winner = t.engine.place_bet("alice", 100.0, Some(1.5)).unwrap();
        let loser = t.engine.place_bet("bob", 300.0, None).unwrap();
        run_countdown(&mut t.engine);
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }

        let summary = t.engine.history().latest().unwrap().clone();
        assert_eq!(summary.bet_count, 2);
        assert_eq!(summary.total_wagered, 400.0);
        assert_eq!(summary.total_paid_out, 150.0);
        assert!(t.engine.current_bets().is_empty());
        assert_eq!(t.engine.bet(winner).unwrap().status, BetStatus::CashedOut);
        assert_eq!(t.engine.bet(loser).unwrap().status, BetStatus::Lost);
        assert_eq!(t.engine.player_bets("bob").len(), 1);
    }

    #[test]
    fn test_fair_rounds_reveal_verifiable_seed() {
        let config = AviatorConfig::default();
        let generator = config.crash_generator();
        let ledger = MemoryLedger::new();
        let mut engine = RoundEngine::builder(config)
            .crash_source(FairCrashSource::seeded(generator.clone(), 77))
            .ledger(Arc::new(ledger))
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap();

        run_countdown(&mut engine);
        let commitment = engine.snapshot().seed_hash.expect("fair rounds publish a hash");
        while engine.state() == RoundState::Running {
            engine.step();
        }

        let summary = engine.history().latest().unwrap();
        assert_eq!(summary.seed_hash.as_deref(), Some(commitment.as_str()));
        assert!(verify_summary(summary, &generator).unwrap().is_valid());
    }

    #[test]
    fn test_cashout_of_bet_from_earlier_round() {
        let mut t = table(vec![3.0, 3.0]);
        let cashed = t.engine.place_bet("alice", 100.0, None).unwrap();
        let lost = t.engine.place_bet("bob", 100.0, None).unwrap();
        run_countdown(&mut t.engine);
        run_until(&mut t.engine, 1.5);
        t.engine.cash_out(cashed).unwrap();
        while t.engine.state() == RoundState::Running {
            t.engine.step();
        }
        t.engine.step();
        run_countdown(&mut t.engine);
        assert_eq!(t.engine.round_number(), 2);
        let balance = t.ledger.balance("alice");

        assert_eq!(
            t.engine.cash_out(cashed),
            Err(RoundError::AlreadyResolved {
                bet_id: cashed,
                status: BetStatus::CashedOut,
            })
        );
        assert_eq!(
            t.engine.cash_out(lost),
            Err(RoundError::AlreadyResolved {
                bet_id: lost,
                status: BetStatus::Lost,
            })
        );
        let unknown = BetId::new();
        assert_eq!(t.engine.cash_out(unknown), Err(RoundError::NotFound(unknown)));
        assert_eq!(t.ledger.balance("alice"), balance);
        assert_eq!(t.events.of_kind("cashed_out").len(), 1);
    }

    #[test]
    fn test_commitment_published_while_betting_is_open() {
        let config = AviatorConfig::default();
        let generator = config.crash_generator();
        let events = Arc::new(RecordingSink::new());
        let mut engine = RoundEngine::builder(config)
            .crash_source(FairCrashSource::seeded(generator.clone(), 11))
            .ledger(Arc::new(MemoryLedger::new()))
            .events(events.clone())
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap();

        let waiting = engine.snapshot();
        assert_eq!(waiting.state, RoundState::Waiting);
        assert_eq!(waiting.crash_point, None);
        let commitment = waiting.seed_hash.expect("commitment before bets");

        match &events.of_kind("round_opened")[0] {
            RoundEvent::RoundOpened { seed_hash, .. } => {
                assert_eq!(seed_hash.as_deref(), Some(commitment.as_str()))
            }
            other => panic!("Expected RoundOpened, got {:?}", other),
        }

        run_countdown(&mut engine);
        match &events.of_kind("round_started")[0] {
            RoundEvent::RoundStarted { seed_hash, .. } => {
                assert_eq!(seed_hash.as_deref(), Some(commitment.as_str()))
            }
            other => panic!("Expected RoundStarted, got {:?}", other),
        }
        assert_eq!(engine.snapshot().crash_point, None);

        while engine.state() == RoundState::Running {
            engine.step();
        }
        let summary = engine.history().latest().unwrap().clone();
        assert_eq!(summary.seed_hash.as_deref(), Some(commitment.as_str()));
        assert!(verify_summary(&summary, &generator).unwrap().is_valid());

        engine.step();
        let next = engine.snapshot().seed_hash.unwrap();
        assert_ne!(next, commitment);
    }

    /// Ledger whose calls can be switched to fail
    #[derive(Default)]
    struct FlakyLedger {
        inner: MemoryLedger,
        fail_debit: AtomicBool,
        fail_credit: AtomicBool,
    }

    impl Ledger for FlakyLedger {
        fn debit(&self, player_id: &str, amount: f64) -> Result<(), LedgerError> {
            if self.fail_debit.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("ledger offline".to_string()));
            }
            self.inner.debit(player_id, amount)
        }

        fn credit(&self, player_id: &str, amount: f64) -> Result<(), LedgerError> {
            if self.fail_credit.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("ledger offline".to_string()));
            }
            self.inner.credit(player_id, amount)
        }
    }

    fn flaky_table() -> (RoundEngine, Arc<FlakyLedger>, Arc<RecordingSink>) {
        let mut config = AviatorConfig::default();
        config.growth = GrowthCurve::Stepped {
            bands: vec![GrowthBand { from: 1.0, increment: 0.05 }],
        };
        let ledger = Arc::new(FlakyLedger::default());
        ledger.inner.deposit("alice", 1_000.0).unwrap();
        let events = Arc::new(RecordingSink::new());
        let engine = RoundEngine::builder(config)
            .crash_source(ScriptedCrashSource::new(vec![3.0]))
            .ledger(ledger.clone())
            .events(events.clone())
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap();
        (engine, ledger, events)
    }

    #[test]
    fn test_credit_failure_keeps_cashout() {
        let (mut engine, ledger, events) = flaky_table();
        let bet_id = engine.place_bet("alice", 100.0, None).unwrap();
        run_countdown(&mut engine);
        run_until(&mut engine, 1.5);

        ledger.fail_credit.store(true, Ordering::SeqCst);
        let bet = engine.cash_out(bet_id).unwrap();
        assert_eq!(bet.status, BetStatus::CashedOut);
        assert_eq!(bet.winnings, 150.0);
        assert_eq!(ledger.inner.balance("alice"), Some(900.0));
        assert_eq!(engine.bet(bet_id).unwrap().status, BetStatus::CashedOut);
        assert_eq!(events.of_kind("cashed_out").len(), 1);

        // The crash does not turn it into a loss
        while engine.state() == RoundState::Running {
            engine.step();
        }
        assert_eq!(engine.bet(bet_id).unwrap().status, BetStatus::CashedOut);
        assert!(events.of_kind("bet_lost").is_empty());
    }

    #[test]
    fn test_debit_failure_creates_no_bet() {
        let (mut engine, ledger, events) = flaky_table();
        ledger.fail_debit.store(true, Ordering::SeqCst);

        let err = engine.place_bet("alice", 100.0, None).unwrap_err();
        assert_eq!(
            err,
            RoundError::Ledger(LedgerError::Unavailable("ledger offline".to_string()))
        );
        assert!(engine.current_bets().is_empty());
        assert!(engine.active_bet("alice").is_none());
        assert!(events.of_kind("bet_placed").is_empty());
        assert_eq!(ledger.inner.balance("alice"), Some(1_000.0));

        // Not counted as a bet, so the retry is not a duplicate
        ledger.fail_debit.store(false, Ordering::SeqCst);
        assert!(engine.place_bet("alice", 100.0, None).is_ok());
    }

    #[test]
    fn test_builder_requires_ledger() {
        let result = RoundEngine::builder(AviatorConfig::default()).build();
        assert!(matches!(result, Err(ConfigurationError::MissingRequired(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = AviatorConfig::default();
        config.history.round_capacity = 0;
        let result = RoundEngine::builder(config)
            .ledger(Arc::new(MemoryLedger::new()))
            .build();
        assert!(result.is_err());
    }
}
