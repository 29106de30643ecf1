//! Per-player standings built from settlement events

use crate::common::traits::EventSink;
use crate::games::types::RoundEvent;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub player_id: String,
    pub wagered: f64,
    pub won: f64,
    pub wins: u64,
    pub losses: u64,
    pub best_multiplier: f64,
}

impl PlayerStanding {
    pub fn net_profit(&self) -> f64 {
        self.won - self.wagered
    }

    pub fn rounds(&self) -> u64 {
        self.wins + self.losses
    }
}

#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    standings: Arc<DashMap<String, PlayerStanding>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standing(&self, player_id: &str) -> Option<PlayerStanding> {
        self.standings.get(player_id).map(|s| s.clone())
    }

    /// Top `n` players by net profit
    pub fn top(&self, n: usize) -> Vec<PlayerStanding> {
        let mut all: Vec<PlayerStanding> = self.standings.iter().map(|s| s.clone()).collect();
        all.sort_by(|a, b| b.net_profit().total_cmp(&a.net_profit()));
        all.truncate(n);
        all
    }

    pub fn len(&self) -> usize {
        self.standings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }

    fn update(&self, player_id: &str, apply: impl FnOnce(&mut PlayerStanding)) {
        let mut standing = self
            .standings
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerStanding {
                player_id: player_id.to_string(),
                ..Default::default()
            });
        apply(&mut standing);
    }
}

impl EventSink for Leaderboard {
    fn emit(&self, event: &RoundEvent) {
        match event {
            RoundEvent::CashedOut { player_id, amount, multiplier, winnings, .. } => {
                self.update(player_id, |s| {
                    s.wagered += amount;
                    s.won += winnings;
                    s.wins += 1;
                    s.best_multiplier = s.best_multiplier.max(*multiplier);
                });
            }
            RoundEvent::BetLost { player_id, amount, .. } => {
                self.update(player_id, |s| {
                    s.wagered += amount;
                    s.losses += 1;
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{BetId, CashoutTrigger};

    fn win(player: &str, amount: f64, multiplier: f64) -> RoundEvent {
        RoundEvent::CashedOut {
            round_number: 1,
            bet_id: BetId::new(),
            player_id: player.to_string(),
            amount,
            multiplier,
            winnings: amount * multiplier,
            trigger: CashoutTrigger::Auto,
        }
    }

    fn loss(player: &str, amount: f64) -> RoundEvent {
        RoundEvent::BetLost {
            round_number: 1,
            bet_id: BetId::new(),
            player_id: player.to_string(),
            amount,
            crash_point: 1.5,
        }
    }

    #[test]
    fn test_standings_accumulate() {
        let board = Leaderboard::new();
        board.emit(&win("alice", 100.0, 3.0));
        board.emit(&loss("alice", 50.0));
        board.emit(&win("alice", 10.0, 1.5));

        let alice = board.standing("alice").unwrap();
        assert_eq!(alice.wagered, 160.0);
        assert_eq!(alice.won, 315.0);
        assert_eq!(alice.rounds(), 3);
        assert_eq!(alice.best_multiplier, 3.0);
        assert_eq!(alice.net_profit(), 155.0);
    }

    #[test]
    fn test_top_orders_by_net_profit() {
        let board = Leaderboard::new();
        board.emit(&loss("bob", 200.0));
        board.emit(&win("alice", 100.0, 2.0));
        board.emit(&win("carol", 100.0, 5.0));
        board.emit(&RoundEvent::CountdownTick { round_number: 1, remaining: 0 });

        let top = board.top(2);
        let names: Vec<&str> = top.iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(names, vec!["carol", "alice"]);
        assert_eq!(board.len(), 3);
    }
}
