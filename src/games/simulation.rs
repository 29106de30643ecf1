//! Headless batch simulation
//!
//! Plays many rounds back to back with scripted players and reports the
//! house's realised edge. Useful for checking a crash distribution or growth
//! curve before putting it on a table.

use crate::common::clock::ManualClock;
use crate::common::traits::EventSink;
use crate::config::AviatorConfig;
use crate::errors::AviatorResult;
use crate::games::crash_point::{CrashPointSource, FairCrashSource};
use crate::games::history::HistoryStats;
use crate::games::ledger::MemoryLedger;
use crate::games::round_engine::{AmountRejection, RoundEngine, RoundError};
use crate::games::types::{BetStatus, RoundState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Player that stakes the same amount every round with a fixed auto
/// cash-out target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedPlayer {
    pub id: String,
    pub bankroll: f64,
    pub stake: f64,
    pub auto_cashout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationScenario {
    pub rounds: u64,
    pub players: Vec<SimulatedPlayer>,
}

impl SimulationScenario {
    /// `count` identical players cashing out at `auto_cashout`
    pub fn uniform(rounds: u64, count: usize, stake: f64, auto_cashout: f64) -> Self {
        let players = (0..count)
            .map(|i| SimulatedPlayer {
                id: format!("sim-player-{}", i),
                bankroll: stake * rounds as f64,
                stake,
                auto_cashout,
            })
            .collect();
        Self { rounds, players }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub rounds_played: u64,
    pub bets_placed: u64,
    pub bets_rejected: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_wagered: f64,
    pub total_paid_out: f64,
    /// Paid out / wagered
    pub return_to_player: f64,
    pub house_edge: f64,
    pub win_rate: f64,
    pub crash_stats: HistoryStats,
    pub execution_time: Duration,
}

impl SimulationReport {
    pub fn format(&self) -> String {
        let mut report = String::new();
        report.push_str("Aviator simulation\n");
        report.push_str(&format!("{}\n", "=".repeat(40)));
        report.push_str(&format!("Rounds:          {}\n", self.rounds_played));
        report.push_str(&format!(
            "Bets:            {} placed, {} rejected\n",
            self.bets_placed, self.bets_rejected
        ));
        report.push_str(&format!("Win rate:        {:.1}%\n", self.win_rate * 100.0));
        report.push_str(&format!(
            "Wagered:         {:.2}, paid out {:.2}\n",
            self.total_wagered, self.total_paid_out
        ));
        report.push_str(&format!("Return to player {:.2}%\n", self.return_to_player * 100.0));
        report.push_str(&format!("House edge:      {:.2}%\n", self.house_edge * 100.0));
        report.push_str(&format!(
            "Crash points:    avg {:.2}x, max {:.2}x, {:.1}% below 2x\n",
            self.crash_stats.average_crash_point,
            self.crash_stats.highest_crash_point,
            self.crash_stats.share_below_two * 100.0
        ));
        report.push_str(&format!("Execution time:  {:?}\n", self.execution_time));
        report
    }
}

/// Runs scenarios against a fresh engine per run
pub struct Simulator {
    config: AviatorConfig,
    events: Option<Arc<dyn EventSink>>,
}

impl Simulator {
    pub fn new(config: AviatorConfig) -> Self {
        Self { config, events: None }
    }

    /// Also send engine events to `events`
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Simulate with a reproducible fair crash source
    pub fn run_seeded(&self, scenario: &SimulationScenario, seed: u64) -> AviatorResult<SimulationReport> {
        let source = FairCrashSource::seeded(self.config.crash_generator(), seed);
        self.run(scenario, source)
    }

    pub fn run(
        &self,
        scenario: &SimulationScenario,
        crash_source: impl CrashPointSource + 'static,
    ) -> AviatorResult<SimulationReport> {
        let start_time = Instant::now();
        let ledger = MemoryLedger::new();
        for player in &scenario.players {
            if player.bankroll > 0.0 {
                ledger.deposit(&player.id, player.bankroll)?;
            }
        }

        let clock = Arc::new(ManualClock::new(0));
        let mut builder = RoundEngine::builder(self.config.clone())
            .crash_source(crash_source)
            .ledger(Arc::new(ledger))
            .clock(clock.clone());
        if let Some(events) = &self.events {
            builder = builder.events(events.clone());
        }
        let mut engine = builder.build()?;

        let mut report = SimulationReport {
            rounds_played: 0,
            bets_placed: 0,
            bets_rejected: 0,
            wins: 0,
            losses: 0,
            total_wagered: 0.0,
            total_paid_out: 0.0,
            return_to_player: 0.0,
            house_edge: 0.0,
            win_rate: 0.0,
            crash_stats: HistoryStats::default(),
            execution_time: Duration::default(),
        };
        let mut crash_points = Vec::with_capacity(scenario.rounds as usize);

        for _ in 0..scenario.rounds {
            let mut bet_ids = Vec::with_capacity(scenario.players.len());
            for player in &scenario.players {
                match engine.place_bet(&player.id, player.stake, Some(player.auto_cashout)) {
                    Ok(bet_id) => {
                        report.bets_placed += 1;
                        report.total_wagered += player.stake;
                        bet_ids.push(bet_id);
                    }
                    Err(RoundError::InvalidAmount {
                        reason: AmountRejection::InsufficientBalance,
                        ..
                    }) => report.bets_rejected += 1,
                    Err(e) => return Err(e.into()),
                }
            }

            // Countdown, flight and crash
            loop {
                let delay = engine.step();
                clock.advance(delay.as_millis() as u64);
                if engine.state() == RoundState::Crashed {
                    break;
                }
            }

            for bet_id in bet_ids {
                if let Some(bet) = engine.bet(bet_id) {
                    match bet.status {
                        BetStatus::CashedOut => {
                            report.wins += 1;
                            report.total_paid_out += bet.winnings;
                        }
                        BetStatus::Lost => report.losses += 1,
                        BetStatus::Active => {}
                    }
                }
            }

            if let Some(summary) = engine.history().latest() {
                crash_points.push(summary.crash_point);
            }
            report.rounds_played += 1;

            // Open the next round
            engine.step();
        }

        let resolved = report.wins + report.losses;
        report.win_rate = if resolved > 0 {
            report.wins as f64 / resolved as f64
        } else {
            0.0
        };
        if report.total_wagered > 0.0 {
            report.return_to_player = report.total_paid_out / report.total_wagered;
            report.house_edge = 1.0 - report.return_to_player;
        }
        report.crash_stats = HistoryStats::from_crash_points(crash_points.into_iter());
        report.execution_time = start_time.elapsed();

        debug!(
            rounds = report.rounds_played,
            bets = report.bets_placed,
            rtp = report.return_to_player,
            "Simulation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::crash_point::ScriptedCrashSource;
    use crate::games::growth::{GrowthBand, GrowthCurve};

    #[test]
    fn test_scripted_simulation_totals() {
        let scenario = SimulationScenario {
            rounds: 4,
            players: vec![SimulatedPlayer {
                id: "p1".to_string(),
                bankroll: 1_000.0,
                stake: 100.0,
                auto_cashout: 2.0,
            }],
        };
        let mut config = AviatorConfig::fast_simulation();
        config.growth = GrowthCurve::Stepped {
            bands: vec![GrowthBand { from: 1.0, increment: 0.05 }],
        };
        // Wins at 2.0 twice, loses twice
        let source = ScriptedCrashSource::new(vec![1.5, 3.0, 1.2, 2.0]);
        let report = Simulator::new(config)
            .run(&scenario, source)
            .unwrap();

        assert_eq!(report.rounds_played, 4);
        assert_eq!(report.bets_placed, 4);
        assert_eq!(report.wins, 2);
        assert_eq!(report.losses, 2);
        assert_eq!(report.total_wagered, 400.0);
        assert_eq!(report.total_paid_out, 400.0);
        assert_eq!(report.return_to_player, 1.0);
        assert_eq!(report.win_rate, 0.5);
        assert_eq!(report.crash_stats.rounds, 4);
    }

    #[test]
    fn test_broke_players_are_skipped() {
        let scenario = SimulationScenario {
            rounds: 3,
            players: vec![SimulatedPlayer {
                id: "short".to_string(),
                bankroll: 150.0,
                stake: 100.0,
                auto_cashout: 5.0,
            }],
        };
        let report = Simulator::new(AviatorConfig::fast_simulation())
            .run(&scenario, ScriptedCrashSource::new(vec![1.1]))
            .unwrap();

        assert_eq!(report.bets_placed, 1);
        assert_eq!(report.bets_rejected, 2);
        assert_eq!(report.losses, 1);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let scenario = SimulationScenario::uniform(50, 3, 10.0, 1.5);
        let simulator = Simulator::new(AviatorConfig::fast_simulation());
        let a = simulator.run_seeded(&scenario, 11).unwrap();
        let b = simulator.run_seeded(&scenario, 11).unwrap();

        assert_eq!(a.total_paid_out, b.total_paid_out);
        assert_eq!(a.crash_stats, b.crash_stats);
        assert!(a.win_rate >= 0.0 && a.win_rate <= 1.0);
        assert!(a.format().contains("Rounds:          50"));
    }
}
