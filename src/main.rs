//! Terminal front end for the idle economy.
//!
//! Loads (or creates) a save, credits offline progress, then runs the game
//! worker and autosave in the background while reading commands from stdin.
//! Logs go to stderr; filter them with `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use idle_economy::economy::buildings::PurchaseOutcome;
use idle_economy::economy::prestige::PrestigeOutcome;
use idle_economy::economy::upgrades::UpgradeOutcome;
use idle_economy::error::WorkerError;
use idle_economy::input::{parse_line, InputEvent, HELP};
use idle_economy::persistence::{load_or_discard, JsonFileStore, SnapshotStore};
use idle_economy::worker::{save_now, spawn_autosave, unix_millis, GameHandle, GameWorker, Shutdown};
use idle_economy::{EconomyConfig, Game, GameStatus};

/// Run the idle economy in the terminal
#[derive(Parser)]
#[command(name = "idle-economy", version)]
struct Args {
    /// Economy config (JSON). Omitted fields keep their defaults.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save file
    #[arg(short, long, value_name = "PATH", default_value = "idle-economy-save.json")]
    save: PathBuf,

    /// Ignore any existing save and start over
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EconomyConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EconomyConfig::default(),
    };
    let autosave_interval_ms = config.autosave_interval_ms;
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(&args.save));

    let game = load_game(config, store.as_ref(), args.fresh)?;

    let shutdown = Shutdown::new();
    let (handle, worker) = GameWorker::spawn(game, shutdown.signal());
    let autosave = spawn_autosave(
        handle.clone(),
        Arc::clone(&store),
        autosave_interval_ms,
        shutdown.signal(),
    );

    println!("{HELP}");
    let result = command_loop(&handle, &store).await;

    match save_now(&handle, Arc::clone(&store)).await {
        Ok(()) => info!("saved to {}", args.save.display()),
        Err(e) => error!("final save failed: {e}"),
    }
    shutdown.trigger();
    autosave.await.context("autosave task")?;
    worker.await.map_err(WorkerError::Join)?;

    result
}

fn setup_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Restore from the store when possible, crediting the time since the save.
fn load_game(config: EconomyConfig, store: &dyn SnapshotStore, fresh: bool) -> Result<Game> {
    if fresh {
        info!("starting a fresh game");
        return Ok(Game::new(config)?);
    }
    let Some(snapshot) = load_or_discard(store).context("loading save")? else {
        info!("no save found, starting a fresh game");
        return Ok(Game::new(config)?);
    };

    let mut game = Game::restore(config, &snapshot)?;
    let gap = unix_millis().saturating_sub(snapshot.saved_at);
    let report = game.apply_offline_progress(gap);
    if report.earnings > BigDecimal::zero() {
        println!(
            "Welcome back! {} {} earned while away ({}s).",
            fmt(&report.earnings),
            game.ledger().primary_id(),
            report.credited_ms / 1000
        );
    }
    Ok(game)
}

async fn command_loop(handle: &GameHandle, store: &Arc<dyn SnapshotStore>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match parse_line(&line) {
                    Ok(Some(InputEvent::Quit)) => break,
                    Ok(Some(event)) => handle_event(event, handle, store).await?,
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    Ok(())
}

async fn handle_event(event: InputEvent, handle: &GameHandle, store: &Arc<dyn SnapshotStore>) -> Result<()> {
    match event {
        InputEvent::Click => {
            let gained = handle.click().await?;
            println!("+{}", fmt(&gained));
        }
        InputEvent::BuyBuilding(id) => match handle.purchase_building(&id).await? {
            PurchaseOutcome::Purchased { cost, count } => {
                println!("bought {id} for {} (now {count})", fmt(&cost));
            }
            PurchaseOutcome::CannotAfford { cost } => println!("{id} costs {}", fmt(&cost)),
            PurchaseOutcome::UnknownBuilding => println!("no building called {id}"),
        },
        InputEvent::BuyUpgrade(id) => match handle.purchase_upgrade(&id).await? {
            UpgradeOutcome::Purchased { cost } => println!("bought {id} for {}", fmt(&cost)),
            UpgradeOutcome::AlreadyOwned => println!("{id} is already owned"),
            UpgradeOutcome::CannotAfford { cost } => println!("{id} costs {}", fmt(&cost)),
            UpgradeOutcome::UnknownUpgrade => println!("no upgrade called {id}"),
        },
        InputEvent::Prestige => match handle.prestige().await? {
            PrestigeOutcome::Prestiged {
                points_gained,
                total_points,
                multiplier,
            } => println!(
                "prestiged: +{} points ({} total), production x{}",
                fmt(&points_gained),
                fmt(&total_points),
                multiplier.normalized()
            ),
            PrestigeOutcome::NotEligible { required, current } => {
                println!("need {} to prestige, have {}", fmt(&required), fmt(&current));
            }
        },
        InputEvent::Status => print_status(&handle.status().await?),
        InputEvent::Save => match save_now(handle, Arc::clone(store)).await {
            Ok(()) => println!("saved"),
            Err(e) => println!("save failed: {e}"),
        },
        InputEvent::Help => println!("{HELP}"),
        InputEvent::Quit => {}
    }
    Ok(())
}

fn print_status(status: &GameStatus) {
    println!(
        "{}: {}  ({}/s, {} per click)",
        status.primary_resource,
        fmt(&status.amount),
        fmt(&status.production_per_second),
        fmt(&status.click_value)
    );
    println!(
        "clicks: {}  achievements: {}  prestige: {} points (x{})",
        status.total_clicks,
        status.achievements_unlocked,
        fmt(&status.prestige_points),
        status.prestige_multiplier.normalized()
    );
    if status.can_prestige {
        println!("prestige now for {} points", fmt(&status.next_prestige_points));
    }
    for (id, count, next_cost) in &status.buildings {
        println!("  {id:<16} {count:>6}  next {}", fmt(next_cost));
    }
}

fn fmt(value: &BigDecimal) -> String {
    value.round(2).normalized().to_string()
}
