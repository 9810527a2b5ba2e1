//! Full play-through: clicks, purchases, persistence and offline catch-up.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};

use idle_economy::economy::buildings::PurchaseOutcome;
use idle_economy::economy::config::{BuildingConfig, EconomyConfig};
use idle_economy::economy::prestige::PrestigeOutcome;
use idle_economy::persistence::{JsonFileStore, SnapshotStore};
use idle_economy::worker::{save_now, GameWorker, Shutdown};
use idle_economy::Game;

fn d(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

/// One grower and nothing else, so the numbers are easy to follow.
fn grower_only() -> EconomyConfig {
    EconomyConfig {
        buildings: vec![BuildingConfig {
            id: "grower".into(),
            name: "Grower".into(),
            base_cost: d("15"),
            cost_multiplier: d("1.15"),
            base_production: d("0.1"),
        }],
        ..EconomyConfig::default()
    }
}

#[test]
fn first_building_scenario() {
    let mut game = Game::new(grower_only()).unwrap();
    assert_eq!(game.ledger().primary_amount(), BigDecimal::zero());

    assert_eq!(game.click_action(), BigDecimal::one());
    assert_eq!(game.ledger().primary_amount(), BigDecimal::one());

    assert_eq!(
        game.purchase_building("grower"),
        PurchaseOutcome::CannotAfford { cost: d("15") }
    );

    for _ in 0..14 {
        game.click_action();
    }
    assert_eq!(game.ledger().primary_amount(), d("15"));
    assert_eq!(
        game.purchase_building("grower"),
        PurchaseOutcome::Purchased {
            cost: d("15"),
            count: 1
        }
    );
    assert_eq!(game.ledger().primary_amount(), BigDecimal::zero());
    assert_eq!(game.buildings().next_cost("grower"), Some(d("17.25")));

    // grower 0.1/s + base 0.1/s for ten seconds, in 50ms ticks
    for _ in 0..200 {
        game.tick(50);
    }
    assert_eq!(game.ledger().primary_amount(), d("2"));
}

#[test]
fn save_load_and_offline_catch_up() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("save.json"));

    let mut game = Game::new(grower_only()).unwrap();
    for _ in 0..40 {
        game.click_action();
    }
    game.purchase_building("grower");
    game.purchase_upgrade("basic_click");
    let before = game.status();

    let saved_at = 1_700_000_000_000;
    store.save(&game.snapshot(saved_at)).unwrap();

    let snapshot = store.load().unwrap().expect("snapshot was written");
    let mut restored = Game::restore(grower_only(), &snapshot).unwrap();
    assert_eq!(restored.status(), before);

    // 100 seconds away at 0.2/s, credited at 50%
    let report = restored.apply_offline_progress(100_000);
    assert_eq!(report.credited_ms, 100_000);
    assert_eq!(report.earnings, d("10"));
    assert_eq!(restored.ledger().primary_amount(), &before.amount + d("10"));
}

#[test]
fn prestige_cycle_keeps_buildings() {
    let mut config = grower_only();
    config.prestige.requirement = d("20");
    let mut game = Game::new(config).unwrap();

    for _ in 0..35 {
        game.click_action();
    }
    game.purchase_building("grower");
    assert_eq!(game.ledger().primary_amount(), d("20"));

    match game.prestige() {
        PrestigeOutcome::Prestiged {
            points_gained,
            multiplier,
            ..
        } => {
            assert_eq!(points_gained, d("1.15"));
            assert_eq!(multiplier, d("1.0115"));
        }
        other => panic!("expected prestige, got {other:?}"),
    }
    assert_eq!(game.ledger().primary_amount(), BigDecimal::zero());
    assert_eq!(game.buildings().get("grower").unwrap().count, 1);
    // (0.1 + 0.1) × 1.0115
    assert_eq!(game.production_per_second(), d("0.2023"));
}

#[tokio::test]
async fn worker_round_trip_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(dir.path().join("save.json")));

    let shutdown = Shutdown::new();
    let (handle, worker) = GameWorker::spawn(Game::new(grower_only()).unwrap(), shutdown.signal());
    for _ in 0..20 {
        handle.click().await.unwrap();
    }
    assert!(handle.purchase_building("grower").await.unwrap().is_purchased());
    save_now(&handle, Arc::clone(&store)).await.unwrap();

    shutdown.trigger();
    let final_game = worker.await.unwrap();

    let snapshot = store.load().unwrap().unwrap();
    let restored = Game::restore(grower_only(), &snapshot).unwrap();
    assert_eq!(restored.buildings().get("grower").unwrap().count, 1);
    assert_eq!(restored.achievements().total_clicks(), 20);
    assert!(restored.ledger().primary_amount() >= d("5"));
    assert!(restored.ledger().primary_amount() <= final_game.ledger().primary_amount());
}
