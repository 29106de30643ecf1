use crate::common::types::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Round phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    /// Countdown running, bets accepted
    Waiting,
    /// Multiplier climbing, cash-outs accepted
    Running,
    /// Round over, waiting for the next one
    Crashed,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Waiting => write!(f, "waiting"),
            RoundState::Running => write!(f, "running"),
            RoundState::Crashed => write!(f, "crashed"),
        }
    }
}

/// Unique bet identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BetId(Uuid);

impl BetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bet status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Active,
    CashedOut,
    Lost,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Active => write!(f, "active"),
            BetStatus::CashedOut => write!(f, "cashed out"),
            BetStatus::Lost => write!(f, "lost"),
        }
    }
}

/// What caused a cash-out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CashoutTrigger {
    Manual,
    Auto,
}

/// A single wager on one round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub id: BetId,
    pub player_id: PlayerId,
    pub round_number: u64,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_cashout: Option<f64>,
    pub status: BetStatus,
    /// Set only once the bet is cashed out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashout_multiplier: Option<f64>,
    pub winnings: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<CashoutTrigger>,
    pub placed_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
}

impl Bet {
    pub fn is_active(&self) -> bool {
        self.status == BetStatus::Active
    }

    /// Winnings minus stake (negative for a loss)
    pub fn profit(&self) -> f64 {
        self.winnings - self.amount
    }
}

/// Live view of the current round. The crash point is only present once the
/// round has crashed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSnapshot {
    pub round_number: u64,
    pub state: RoundState,
    pub current_multiplier: f64,
    pub countdown_remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_hash: Option<String>,
    pub opened_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    pub active_bets: usize,
}

/// History entry for a finished round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSummary {
    pub round_number: u64,
    pub crash_point: f64,
    pub started_at_ms: u64,
    pub crashed_at_ms: u64,
    pub bet_count: usize,
    pub total_wagered: f64,
    pub total_paid_out: f64,
    /// Revealed server seed (hex)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    /// Commitment published when the round opened (hex SHA-256)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_hash: Option<String>,
}

/// Events emitted by the round engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// A new round accepts bets. Fair rounds carry the seed commitment so
    /// the crash point is fixed before any bet is seen.
    RoundOpened {
        round_number: u64,
        countdown: u32,
        opened_at_ms: u64,
        seed_hash: Option<String>,
    },

    CountdownTick {
        round_number: u64,
        remaining: u32,
    },

    /// The multiplier starts climbing
    RoundStarted {
        round_number: u64,
        started_at_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        seed_hash: Option<String>,
    },

    MultiplierUpdated {
        round_number: u64,
        multiplier: f64,
    },

    BetPlaced {
        round_number: u64,
        bet_id: BetId,
        player_id: PlayerId,
        amount: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        auto_cashout: Option<f64>,
    },

    CashedOut {
        round_number: u64,
        bet_id: BetId,
        player_id: PlayerId,
        amount: f64,
        multiplier: f64,
        winnings: f64,
        trigger: CashoutTrigger,
    },

    BetLost {
        round_number: u64,
        bet_id: BetId,
        player_id: PlayerId,
        amount: f64,
        crash_point: f64,
    },

    Crashed {
        round_number: u64,
        crash_point: f64,
        crashed_at_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        server_seed: Option<String>,
    },
}

impl RoundEvent {
    pub fn round_number(&self) -> u64 {
        match self {
            RoundEvent::RoundOpened { round_number, .. }
            | RoundEvent::CountdownTick { round_number, .. }
            | RoundEvent::RoundStarted { round_number, .. }
            | RoundEvent::MultiplierUpdated { round_number, .. }
            | RoundEvent::BetPlaced { round_number, .. }
            | RoundEvent::CashedOut { round_number, .. }
            | RoundEvent::BetLost { round_number, .. }
            | RoundEvent::Crashed { round_number, .. } => *round_number,
        }
    }

    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            RoundEvent::RoundOpened { .. } => "round_opened",
            RoundEvent::CountdownTick { .. } => "countdown_tick",
            RoundEvent::RoundStarted { .. } => "round_started",
            RoundEvent::MultiplierUpdated { .. } => "multiplier_updated",
            RoundEvent::BetPlaced { .. } => "bet_placed",
            RoundEvent::CashedOut { .. } => "cashed_out",
            RoundEvent::BetLost { .. } => "bet_lost",
            RoundEvent::Crashed { .. } => "crashed",
        }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

/// Row written to the result store for every resolved bet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub bet_id: BetId,
    pub player_id: PlayerId,
    pub round_number: u64,
    pub game: String,
    pub outcome: GameOutcome,
    pub bet_amount: f64,
    pub winnings: f64,
    pub multiplier: f64,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl GameRecord {
    /// Build a record from a settlement event; `None` for other events
    pub fn from_event(event: &RoundEvent) -> Option<Self> {
        let recorded_at = chrono::Utc::now();
        match event {
            RoundEvent::CashedOut {
                round_number,
                bet_id,
                player_id,
                amount,
                multiplier,
                winnings,
                ..
            } => Some(Self {
                bet_id: *bet_id,
                player_id: player_id.clone(),
                round_number: *round_number,
                game: "aviator".to_string(),
                outcome: GameOutcome::Win,
                bet_amount: *amount,
                winnings: *winnings,
                multiplier: *multiplier,
                recorded_at,
            }),
            RoundEvent::BetLost {
                round_number,
                bet_id,
                player_id,
                amount,
                crash_point,
            } => Some(Self {
                bet_id: *bet_id,
                player_id: player_id.clone(),
                round_number: *round_number,
                game: "aviator".to_string(),
                outcome: GameOutcome::Loss,
                bet_amount: *amount,
                winnings: 0.0,
                multiplier: *crash_point,
                recorded_at,
            }),
            _ => None,
        }
    }
}
