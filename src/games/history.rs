use crate::games::types::{Bet, RoundSummary};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded, most-recent-first list of finished rounds
#[derive(Debug, Clone)]
pub struct RoundHistory {
    entries: VecDeque<RoundSummary>,
    capacity: usize,
}

impl RoundHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Record a finished round, evicting the oldest past capacity
    pub fn push(&mut self, summary: RoundSummary) {
        self.entries.push_front(summary);
        if self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn latest(&self) -> Option<&RoundSummary> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoundSummary> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<RoundSummary> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats::from_summaries(self.entries.iter())
    }
}

/// Aggregate view over crash points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub rounds: usize,
    pub average_crash_point: f64,
    pub highest_crash_point: f64,
    pub lowest_crash_point: f64,
    /// Fraction of rounds that crashed below 2x
    pub share_below_two: f64,
}

impl HistoryStats {
    pub fn from_summaries<'a>(summaries: impl Iterator<Item = &'a RoundSummary>) -> Self {
        Self::from_crash_points(summaries.map(|s| s.crash_point))
    }

    pub fn from_crash_points(points: impl Iterator<Item = f64>) -> Self {
        let mut stats = HistoryStats {
            lowest_crash_point: f64::INFINITY,
            ..Default::default()
        };
        let mut total = 0.0;
        let mut below_two = 0usize;

        for point in points {
            stats.rounds += 1;
            total += point;
            stats.highest_crash_point = stats.highest_crash_point.max(point);
            stats.lowest_crash_point = stats.lowest_crash_point.min(point);
            if point < 2.0 {
                below_two += 1;
            }
        }

        if stats.rounds == 0 {
            return HistoryStats::default();
        }

        stats.average_crash_point = total / stats.rounds as f64;
        stats.share_below_two = below_two as f64 / stats.rounds as f64;
        stats
    }
}

/// Bounded, most-recent-first archive of resolved bets
#[derive(Debug, Clone)]
pub struct BetArchive {
    bets: VecDeque<Bet>,
    capacity: usize,
}

impl BetArchive {
    pub fn new(capacity: usize) -> Self {
        Self {
            bets: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, bet: Bet) {
        self.bets.push_front(bet);
        if self.bets.len() > self.capacity {
            self.bets.pop_back();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bet> {
        self.bets.iter()
    }

    pub fn for_player<'a>(&'a self, player_id: &'a str) -> impl Iterator<Item = &'a Bet> + 'a {
        self.bets.iter().filter(move |bet| bet.player_id == player_id)
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}
