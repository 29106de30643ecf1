//! Real-time round driver
//!
//! Owns a [`RoundEngine`] inside one tokio task. Ticks are scheduled from the
//! delay each step returns; commands arrive over a channel and are applied
//! between ticks, so the engine never sees concurrent access.

use crate::games::round_engine::{RoundEngine, RoundError};
use crate::games::types::{Bet, BetId, RoundSnapshot, RoundSummary};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("Round driver has stopped")]
    Stopped,

    #[error("Round driver task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Round(#[from] RoundError),
}

/// Requests served by the driver task
#[derive(Debug)]
pub enum EngineCommand {
    PlaceBet {
        player_id: String,
        amount: f64,
        auto_cashout: Option<f64>,
        reply: oneshot::Sender<Result<BetId, RoundError>>,
    },
    CashOut {
        bet_id: BetId,
        reply: oneshot::Sender<Result<Bet, RoundError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoundSnapshot>,
    },
    History {
        reply: oneshot::Sender<Vec<RoundSummary>>,
    },
    PlayerBets {
        player_id: String,
        reply: oneshot::Sender<Vec<Bet>>,
    },
}

/// Cloneable client for a running driver
#[derive(Debug, Clone)]
pub struct DriverClient {
    commands: mpsc::Sender<EngineCommand>,
}

impl DriverClient {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| DriverError::Stopped)?;
        response.await.map_err(|_| DriverError::Stopped)
    }

    pub async fn place_bet(
        &self,
        player_id: &str,
        amount: f64,
        auto_cashout: Option<f64>,
    ) -> Result<BetId, DriverError> {
        let player_id = player_id.to_string();
        let result = self
            .request(|reply| EngineCommand::PlaceBet {
                player_id,
                amount,
                auto_cashout,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn cash_out(&self, bet_id: BetId) -> Result<Bet, DriverError> {
        let result = self
            .request(|reply| EngineCommand::CashOut { bet_id, reply })
            .await?;
        Ok(result?)
    }

    pub async fn snapshot(&self) -> Result<RoundSnapshot, DriverError> {
        self.request(|reply| EngineCommand::Snapshot { reply }).await
    }

    /// Recent rounds, newest first
    pub async fn history(&self) -> Result<Vec<RoundSummary>, DriverError> {
        self.request(|reply| EngineCommand::History { reply }).await
    }

    pub async fn player_bets(&self, player_id: &str) -> Result<Vec<Bet>, DriverError> {
        let player_id = player_id.to_string();
        self.request(|reply| EngineCommand::PlayerBets { player_id, reply })
            .await
    }
}

/// Handle to the driver task
pub struct DriverHandle {
    client: DriverClient,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<RoundEngine>,
}

impl DriverHandle {
    pub fn client(&self) -> DriverClient {
        self.client.clone()
    }

    /// Stop ticking and hand the engine back
    pub async fn shutdown(mut self) -> Result<RoundEngine, DriverError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task
            .await
            .map_err(|e| DriverError::TaskFailed(e.to_string()))
    }
}

pub struct RoundDriver;

impl RoundDriver {
    /// Move `engine` into a new task and start ticking. Must be called from
    /// within a tokio runtime.
    pub fn spawn(engine: RoundEngine) -> DriverHandle {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(Self::run(engine, receiver, stopped));

        DriverHandle {
            client: DriverClient { commands },
            stop: Some(stop),
            task,
        }
    }

    async fn run(
        mut engine: RoundEngine,
        mut commands: mpsc::Receiver<EngineCommand>,
        mut stopped: oneshot::Receiver<()>,
    ) -> RoundEngine {
        info!(round_number = engine.round_number(), "Round driver started");
        let mut deadline = Instant::now() + engine.next_tick_delay();

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => break,
                command = commands.recv() => match command {
                    Some(command) => Self::apply(&mut engine, command),
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    // Deadlines advance from the previous one so a slow tick
                    // does not shift every following tick.
                    let delay = engine.step();
                    deadline += delay;
                }
            }
        }

        info!(round_number = engine.round_number(), "Round driver stopped");
        engine
    }

    fn apply(engine: &mut RoundEngine, command: EngineCommand) {
        // A dropped reply means the caller gave up; the command still applies.
        match command {
            EngineCommand::PlaceBet {
                player_id,
                amount,
                auto_cashout,
                reply,
            } => {
                let result = engine.place_bet(&player_id, amount, auto_cashout);
                if let Err(e) = &result {
                    debug!(%player_id, amount, "Bet rejected: {}", e);
                }
                let _ = reply.send(result);
            }
            EngineCommand::CashOut { bet_id, reply } => {
                let result = engine.cash_out(bet_id);
                if let Err(e) = &result {
                    debug!(%bet_id, "Cash-out rejected: {}", e);
                }
                let _ = reply.send(result);
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(engine.snapshot());
            }
            EngineCommand::History { reply } => {
                let _ = reply.send(engine.history().to_vec());
            }
            EngineCommand::PlayerBets { player_id, reply } => {
                let _ = reply.send(engine.player_bets(&player_id));
            }
        }
    }
}
