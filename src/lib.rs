//! FeeCasino Aviator - crash game round engine
//!
//! A multiplier climbs from 1.00x until it crashes at a point drawn, and
//! committed to, before any bet is taken. Players stake during a countdown and must cash out
//! before the crash; anything still in the air at the crash is lost.
//!
//! [`RoundEngine`] is the synchronous state machine, driven by ticks.
//! [`RoundDriver`] runs it in real time on tokio. Balances, events, time and
//! result persistence are injected through the traits in
//! [`common::traits`].

pub mod common;
pub mod config;
pub mod driver;
pub mod errors;
pub mod games;
pub mod metrics;

pub use common::clock::{ManualClock, SystemClock};
pub use common::config::{ConfigBuilder, ConfigLoader};
pub use common::traits::{Clock, EventSink, Ledger, LedgerError, ResultStore, StoreError};
pub use config::AviatorConfig;
pub use driver::{DriverClient, DriverError, DriverHandle, RoundDriver};
pub use errors::{AviatorError, AviatorResult, ConfigurationError};
pub use games::round_engine::{EngineBuilder, RoundEngine, RoundError};
pub use games::types::{Bet, BetId, BetStatus, RoundEvent, RoundSnapshot, RoundState, RoundSummary};
pub use metrics::EngineMetrics;
