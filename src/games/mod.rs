//! Aviator game logic: the round engine and everything it talks to

pub mod crash_point;
pub mod events;
pub mod fairness;
pub mod growth;
pub mod history;
pub mod leaderboard;
pub mod ledger;
pub mod round_engine;
pub mod settlement;
pub mod simulation;
pub mod types;

pub use crash_point::{CrashDistribution, CrashPointGenerator, CrashPointSource, FairCrashSource, ScriptedCrashSource};
pub use events::{BroadcastSink, FanoutSink, NullSink, RecordingSink, TracingSink};
pub use fairness::{verify_round, verify_summary, FairnessError, FairnessVerdict, RoundSeed};
pub use growth::{GrowthBand, GrowthCurve};
pub use history::{BetArchive, HistoryStats, RoundHistory};
pub use leaderboard::{Leaderboard, PlayerStanding};
pub use ledger::MemoryLedger;
pub use round_engine::{AmountRejection, EngineBuilder, RoundEngine, RoundError};
pub use settlement::{MemoryResultStore, RecorderStats, ResultForwarder};
pub use simulation::{SimulatedPlayer, SimulationReport, SimulationScenario, Simulator};
pub use types::*;
