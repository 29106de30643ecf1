//! Aviator command line
//!
//! Runs a live table with demo players, batch simulations, crash point
//! distribution sampling and round verification.

use clap::{Parser, Subcommand};
use feecasino_aviator::{
    common::config::{generate_sample_config, ConfigLoader},
    config::AviatorConfig,
    driver::{DriverError, RoundDriver},
    errors::AviatorResult,
    games::{
        events::{BroadcastSink, FanoutSink, TracingSink},
        fairness::verify_round,
        history::HistoryStats,
        leaderboard::Leaderboard,
        ledger::MemoryLedger,
        settlement::{MemoryResultStore, ResultForwarder},
        simulation::{SimulationScenario, Simulator},
        types::RoundEvent,
    },
    metrics::EngineMetrics,
    RoundEngine,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Aviator crash game CLI
#[derive(Parser)]
#[command(name = "aviator")]
#[command(about = "Crash game round engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live table with demo players
    Play {
        /// Rounds to play before stopping
        #[arg(short, long, default_value = "3")]
        rounds: u64,

        /// Number of demo players
        #[arg(short, long, default_value = "3")]
        players: usize,

        /// Stake per player per round
        #[arg(short, long, default_value = "100")]
        stake: f64,

        /// Auto cash-out target for every player (staggered when omitted)
        #[arg(short, long)]
        auto_cashout: Option<f64>,

        /// Use millisecond timings instead of the configured ones
        #[arg(long)]
        fast: bool,

        /// Print every engine event as a JSON line on stdout
        #[arg(long)]
        json: bool,
    },

    /// Play many rounds headlessly and report the realised edge
    Simulate {
        #[arg(short, long, default_value = "10000")]
        rounds: u64,

        #[arg(short, long, default_value = "10")]
        players: usize,

        #[arg(short, long, default_value = "10")]
        stake: f64,

        #[arg(short, long, default_value = "2.0")]
        auto_cashout: f64,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sample the configured crash point distribution
    Distribution {
        #[arg(short, long, default_value = "100000")]
        samples: usize,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check a revealed server seed against its hash and crash point
    Verify {
        /// Revealed server seed (hex)
        #[arg(long)]
        seed: String,

        /// Published seed hash (hex)
        #[arg(long)]
        hash: String,

        /// Crash point the round reported
        #[arg(long)]
        crash_point: f64,
    },

    /// Write a sample configuration file
    InitConfig {
        #[arg(short, long, default_value = "aviator.toml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> AviatorResult<ExitCode> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    let default_level = if cli.verbose {
        "debug"
    } else {
        config.monitoring.log_level.as_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let verdict_ok = match cli.command {
        Commands::Play { rounds, players, stake, auto_cashout, fast, json } => {
            let config = if fast {
                AviatorConfig {
                    timing: AviatorConfig::fast_simulation().timing,
                    ..config
                }
            } else {
                config
            };
            run_play(config, rounds, players, stake, auto_cashout, json).await?;
            true
        }
        Commands::Simulate { rounds, players, stake, auto_cashout, seed, json } => {
            run_simulate(config, rounds, players, stake, auto_cashout, seed, json)?;
            true
        }
        Commands::Distribution { samples, seed } => {
            run_distribution(&config, samples, seed);
            true
        }
        Commands::Verify { seed, hash, crash_point } => {
            run_verify(&config, &seed, &hash, crash_point)?
        }
        Commands::InitConfig { output } => {
            generate_sample_config(&output)?;
            println!("Wrote sample configuration to {}", output);
            true
        }
    };

    // A round that fails verification exits with status 2
    Ok(if verdict_ok { ExitCode::SUCCESS } else { ExitCode::from(2) })
}

async fn run_play(
    config: AviatorConfig,
    rounds: u64,
    players: usize,
    stake: f64,
    auto_cashout: Option<f64>,
    json: bool,
) -> AviatorResult<()> {
    if rounds == 0 || players == 0 {
        return Ok(());
    }

    let ledger = MemoryLedger::new();
    let player_ids: Vec<String> = (1..=players).map(|i| format!("player-{}", i)).collect();
    for id in &player_ids {
        ledger.deposit(id, stake * rounds as f64)?;
    }

    let metrics = Arc::new(EngineMetrics::new());
    let leaderboard = Arc::new(Leaderboard::new());
    let broadcast = BroadcastSink::new(4096);
    let store = MemoryResultStore::new();
    let (forwarder, recorder) = ResultForwarder::spawn(Arc::new(store.clone()));

    let sink = FanoutSink::new()
        .with(Arc::new(TracingSink))
        .with(metrics.clone())
        .with(leaderboard.clone())
        .with(Arc::new(forwarder))
        .with(Arc::new(broadcast.clone()));
    let mut events = broadcast.subscribe();

    let engine = RoundEngine::builder(config)
        .ledger(Arc::new(ledger.clone()))
        .events(Arc::new(sink))
        .build()?;
    let handle = RoundDriver::spawn(engine);
    let client = handle.client();

    let mut completed = 0;
    while completed < rounds {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event stream lagged; skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            RoundEvent::RoundOpened { .. } => {
                for (i, player_id) in player_ids.iter().enumerate() {
                    let target = auto_cashout.unwrap_or(1.5 + i as f64 * 0.5);
                    if let Err(e) = client.place_bet(player_id, stake, Some(target)).await {
                        warn!(%player_id, "Demo bet rejected: {}", e);
                    }
                }
            }
            RoundEvent::Crashed { .. } => completed += 1,
            _ => {}
        }
    }

    let engine = handle.shutdown().await?;
    let stats = HistoryStats::from_summaries(engine.history().iter());
    drop(engine);
    let recorded = recorder
        .await
        .map_err(|e| DriverError::TaskFailed(e.to_string()))?;

    info!(rounds = completed, recorded = recorded.recorded, "Table closed");

    if !json {
        println!("\nRounds: {}, average crash {:.2}x", stats.rounds, stats.average_crash_point);
        println!(
            "Results recorded: {} ({} failed, {} dropped)",
            recorded.recorded, recorded.failed, recorded.dropped
        );
        println!("\nLeaderboard:");
        for standing in leaderboard.top(players) {
            println!(
                "  {:<10} net {:>10.2}  wins {:>3}  losses {:>3}  best {:.2}x",
                standing.player_id,
                standing.net_profit(),
                standing.wins,
                standing.losses,
                standing.best_multiplier
            );
        }
        println!("\n{}", metrics.to_prometheus_format());
    }
    Ok(())
}

fn run_simulate(
    config: AviatorConfig,
    rounds: u64,
    players: usize,
    stake: f64,
    auto_cashout: f64,
    seed: Option<u64>,
    json: bool,
) -> AviatorResult<()> {
    let scenario = SimulationScenario::uniform(rounds, players, stake, auto_cashout);
    let simulator = Simulator::new(config);
    let seed = seed.unwrap_or_else(rand::random);
    let report = simulator.run_seeded(&scenario, seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Seed: {}", seed);
        print!("{}", report.format());
    }
    Ok(())
}

fn run_distribution(config: &AviatorConfig, samples: usize, seed: Option<u64>) {
    let generator = config.crash_generator();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let points: Vec<f64> = (0..samples).map(|_| generator.generate(&mut rng)).collect();
    let stats = HistoryStats::from_crash_points(points.iter().copied());

    const BUCKETS: [(f64, f64); 6] = [
        (1.0, 1.5),
        (1.5, 2.0),
        (2.0, 5.0),
        (5.0, 10.0),
        (10.0, 100.0),
        (100.0, f64::INFINITY),
    ];

    println!("Distribution: {:?}", generator.distribution());
    println!(
        "Bounds: [{:.2}x, {:.2}x]",
        generator.min_crash(),
        generator.max_crash()
    );
    println!("Samples: {}", stats.rounds);
    println!(
        "Average {:.2}x, lowest {:.2}x, highest {:.2}x",
        stats.average_crash_point, stats.lowest_crash_point, stats.highest_crash_point
    );
    for (low, high) in BUCKETS {
        let count = points.iter().filter(|p| **p >= low && **p < high).count();
        let share = if samples > 0 { count as f64 / samples as f64 } else { 0.0 };
        println!("  [{:>6.2}x, {:>6.2}x)  {:>6.2}%", low, high, share * 100.0);
    }
}

/// Returns whether the round checks out
fn run_verify(config: &AviatorConfig, seed: &str, hash: &str, crash_point: f64) -> AviatorResult<bool> {
    let verdict = verify_round(seed, hash, crash_point, &config.crash_generator())?;

    println!("Commitment matches: {}", verdict.commitment_matches);
    println!("Computed crash point: {:.2}x", verdict.computed_crash_point);
    println!("Crash point matches: {}", verdict.crash_point_matches);

    if !verdict.is_valid() {
        println!("Round is NOT valid");
        return Ok(false);
    }
    println!("Round is valid");
    Ok(true)
}
