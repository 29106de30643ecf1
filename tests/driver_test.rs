//! Real-time driver behaviour with tokio's paused clock

use feecasino_aviator::{
    config::AviatorConfig,
    games::{
        crash_point::ScriptedCrashSource,
        events::BroadcastSink,
        growth::{GrowthBand, GrowthCurve},
        ledger::MemoryLedger,
        types::{BetStatus, CashoutTrigger, RoundEvent, RoundState},
    },
    DriverError, RoundDriver, RoundEngine, RoundError,
};
use std::sync::Arc;
use std::time::Duration;

fn config() -> AviatorConfig {
    let mut config = AviatorConfig::default();
    config.growth = GrowthCurve::Stepped {
        bands: vec![GrowthBand { from: 1.0, increment: 0.05 }],
    };
    config
}

#[tokio::test(start_paused = true)]
async fn test_manual_cashout_through_driver() {
    let ledger = MemoryLedger::new();
    ledger.deposit("alice", 5_000.0).unwrap();
    let engine = RoundEngine::builder(config())
        .crash_source(ScriptedCrashSource::new(vec![10.0]))
        .ledger(Arc::new(ledger.clone()))
        .build()
        .unwrap();
    let handle = RoundDriver::spawn(engine);
    let client = handle.client();

    let bet_id = client.place_bet("alice", 1_000.0, None).await.unwrap();
    assert_eq!(ledger.balance("alice"), Some(4_000.0));

    // Countdown ends at 5s; twenty 50ms ticks later the multiplier is 2.00x
    tokio::time::sleep(Duration::from_millis(6_025)).await;
    let snapshot = client.snapshot().await.unwrap();
    assert_eq!(snapshot.state, RoundState::Running);
    assert_eq!(snapshot.current_multiplier, 2.0);

    let bet = client.cash_out(bet_id).await.unwrap();
    assert_eq!(bet.trigger, Some(CashoutTrigger::Manual));
    assert_eq!(bet.winnings, 2_000.0);
    assert_eq!(ledger.balance("alice"), Some(6_000.0));

    let err = client.cash_out(bet_id).await.unwrap_err();
    assert!(matches!(err, DriverError::Round(RoundError::AlreadyResolved { .. })));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rounds_cycle_and_history_is_served() {
    let ledger = MemoryLedger::new();
    ledger.deposit("bob", 1_000.0).unwrap();
    let broadcast = BroadcastSink::new(1024);
    let mut events = broadcast.subscribe();
    let engine = RoundEngine::builder(config())
        .crash_source(ScriptedCrashSource::new(vec![1.5, 1.2]))
        .ledger(Arc::new(ledger))
        .events(Arc::new(broadcast))
        .build()
        .unwrap();
    let handle = RoundDriver::spawn(engine);
    let client = handle.client();

    let bet_id = client.place_bet("bob", 100.0, Some(2.0)).await.unwrap();

    let mut crashes = 0;
    while crashes < 2 {
        if let RoundEvent::Crashed { .. } = events.recv().await.unwrap() {
            crashes += 1;
        }
    }

    let history = client.history().await.unwrap();
    let points: Vec<f64> = history.iter().map(|s| s.crash_point).collect();
    assert_eq!(points, vec![1.2, 1.5]);

    let bets = client.player_bets("bob").await.unwrap();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].id, bet_id);
    assert_eq!(bets[0].status, BetStatus::Lost);

    let engine = handle.shutdown().await.unwrap();
    assert!(engine.round_number() >= 2);
}
