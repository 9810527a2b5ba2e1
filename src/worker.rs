//! Game worker that owns the authoritative [`Game`].
//!
//! Ticks are driven by a tokio interval and converted to fixed steps by
//! [`GameTime`]. Player actions arrive as [`Command`]s through a cloneable
//! [`GameHandle`] and are applied between ticks, so every mutation is
//! serialized through one task.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bigdecimal::BigDecimal;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::economy::buildings::PurchaseOutcome;
use crate::economy::prestige::PrestigeOutcome;
use crate::economy::snapshot::StateSnapshot;
use crate::economy::upgrades::UpgradeOutcome;
use crate::economy::{Game, GameStatus};
use crate::error::{PersistenceError, SaveError, WorkerError};
use crate::persistence::SnapshotStore;
use crate::time::GameTime;

const COMMAND_BUFFER: usize = 64;

/// Milliseconds since the Unix epoch, for `saved_at` stamps.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Owner side of the cancellation token.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side. Dropping the [`Shutdown`] also counts as cancellation.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Commands that can be sent to the game worker
pub enum Command {
    Click {
        reply: oneshot::Sender<BigDecimal>,
    },
    PurchaseBuilding {
        id: String,
        reply: oneshot::Sender<PurchaseOutcome>,
    },
    PurchaseUpgrade {
        id: String,
        reply: oneshot::Sender<UpgradeOutcome>,
    },
    Prestige {
        reply: oneshot::Sender<PrestigeOutcome>,
    },
    Status {
        reply: oneshot::Sender<GameStatus>,
    },
    Snapshot {
        saved_at_ms: i64,
        reply: oneshot::Sender<StateSnapshot>,
    },
}

/// Client-facing handle to the worker.
#[derive(Clone, Debug)]
pub struct GameHandle {
    command_tx: mpsc::Sender<Command>,
}

impl GameHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| WorkerError::CommandChannelClosed)?;
        reply_rx.await.map_err(WorkerError::ReplyChannelClosed)
    }

    pub async fn click(&self) -> Result<BigDecimal, WorkerError> {
        self.request(|reply| Command::Click { reply }).await
    }

    pub async fn purchase_building(&self, id: impl Into<String>) -> Result<PurchaseOutcome, WorkerError> {
        let id = id.into();
        self.request(|reply| Command::PurchaseBuilding { id, reply }).await
    }

    pub async fn purchase_upgrade(&self, id: impl Into<String>) -> Result<UpgradeOutcome, WorkerError> {
        let id = id.into();
        self.request(|reply| Command::PurchaseUpgrade { id, reply }).await
    }

    pub async fn prestige(&self) -> Result<PrestigeOutcome, WorkerError> {
        self.request(|reply| Command::Prestige { reply }).await
    }

    pub async fn status(&self) -> Result<GameStatus, WorkerError> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub async fn snapshot(&self, saved_at_ms: i64) -> Result<StateSnapshot, WorkerError> {
        self.request(|reply| Command::Snapshot { saved_at_ms, reply })
            .await
    }
}

/// Background task that advances the game and processes commands.
pub struct GameWorker {
    game: Game,
    time: GameTime,
    command_rx: mpsc::Receiver<Command>,
    shutdown: ShutdownSignal,
    started: Instant,
}

impl GameWorker {
    pub fn new(game: Game, command_rx: mpsc::Receiver<Command>, shutdown: ShutdownSignal) -> Self {
        let config = game.config();
        let time = GameTime::new(config.tick_duration_ms, config.max_frame_catchup_ms);
        Self {
            game,
            time,
            command_rx,
            shutdown,
            started: Instant::now(),
        }
    }

    /// Spawn the worker on the current runtime. The join handle yields the
    /// final game state once the worker stops.
    pub fn spawn(game: Game, shutdown: ShutdownSignal) -> (GameHandle, JoinHandle<Game>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let worker = Self::new(game, command_rx, shutdown);
        let join = tokio::spawn(worker.run());
        (GameHandle { command_tx }, join)
    }

    /// Main worker loop. Stops on shutdown or when every handle is dropped.
    pub async fn run(mut self) -> Game {
        let mut ticker = time::interval(Duration::from_millis(self.time.ms_per_tick()));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("game worker started ({} ms per tick)", self.time.ms_per_tick());

        loop {
            tokio::select! {
                _ = ticker.tick() => self.advance(),
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = self.shutdown.cancelled() => break,
            }
        }

        info!("game worker stopped after {} ticks", self.time.total_ticks);
        self.game
    }

    fn advance(&mut self) {
        let now = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let step = self.time.ms_per_tick();
        for _ in 0..self.time.update(now) {
            self.game.tick(step);
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Click { reply } => {
                if reply.send(self.game.click_action()).is_err() {
                    debug!("Click reply channel closed (caller dropped)");
                }
            }
            Command::PurchaseBuilding { id, reply } => {
                if reply.send(self.game.purchase_building(&id)).is_err() {
                    debug!("PurchaseBuilding reply channel closed (caller dropped)");
                }
            }
            Command::PurchaseUpgrade { id, reply } => {
                if reply.send(self.game.purchase_upgrade(&id)).is_err() {
                    debug!("PurchaseUpgrade reply channel closed (caller dropped)");
                }
            }
            Command::Prestige { reply } => {
                if reply.send(self.game.prestige()).is_err() {
                    debug!("Prestige reply channel closed (caller dropped)");
                }
            }
            Command::Status { reply } => {
                if reply.send(self.game.status()).is_err() {
                    debug!("Status reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { saved_at_ms, reply } => {
                if reply.send(self.game.snapshot(saved_at_ms)).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
        }
    }
}

/// Take a snapshot through the handle and write it on a blocking task.
pub async fn save_now(handle: &GameHandle, store: Arc<dyn SnapshotStore>) -> Result<(), SaveError> {
    let snapshot = handle.snapshot(unix_millis()).await?;
    tokio::task::spawn_blocking(move || store.save(&snapshot))
        .await
        .map_err(PersistenceError::Join)??;
    Ok(())
}

/// Periodically persist the game until shutdown. Save failures are logged
/// and retried on the next interval.
pub fn spawn_autosave(
    handle: GameHandle,
    store: Arc<dyn SnapshotStore>,
    interval_ms: u64,
    mut shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match save_now(&handle, Arc::clone(&store)).await {
                        Ok(()) => debug!("autosave complete"),
                        Err(SaveError::Worker(e)) => {
                            warn!("autosave stopping: {e}");
                            break;
                        }
                        Err(e) => warn!("autosave failed: {e}"),
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }
    })
}
