//! Incremental ("idle") game economy engine.
//!
//! - [`economy`]: the synchronous core. Resources, buildings, achievements,
//!   upgrades, prestige, offline progress and snapshots.
//! - [`time`]: fixed-timestep accumulator.
//! - [`worker`]: tokio task that owns a [`economy::Game`] and ticks it.
//! - [`persistence`]: where snapshots are kept.

pub mod economy;
pub mod error;
pub mod input;
pub mod persistence;
pub mod time;
pub mod worker;

pub use economy::config::EconomyConfig;
pub use economy::snapshot::StateSnapshot;
pub use economy::{Game, GameStatus};
