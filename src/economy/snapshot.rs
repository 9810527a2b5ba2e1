//! Saved game state.
//!
//! ## Versioning
//!
//! - `SNAPSHOT_VERSION`: current format version. Bump it when fields are added.
//! - `MIN_COMPATIBLE_VERSION`: oldest version that still loads. Adding
//!   fields leaves it alone so older saves keep working; only a breaking
//!   change (a field removed or its meaning changed) bumps it.
//!
//! A snapshot at or above `MIN_COMPATIBLE_VERSION` loads with missing fields
//! filled from defaults.
//!
//! Restore validates field by field. A negative value or unknown id falls
//! back to the configured default for that field alone; the document as a
//! whole is never rejected. Click and production multipliers are not saved;
//! they are rebuilt from achievements, upgrades and prestige.

use std::collections::{BTreeMap, BTreeSet};

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Game;
use crate::error::SnapshotError;

/// Snapshot format version.
/// v2: added `upgrades` and `stats`.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Oldest version that still loads.
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ResourceEntry {
    pub amount: Option<BigDecimal>,
    pub rate: Option<BigDecimal>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildingEntry {
    /// Signed so a negative count parses and is rejected on restore.
    pub count: Option<i64>,
    pub efficiency_bonus: Option<BigDecimal>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PrestigeEntry {
    pub points: Option<BigDecimal>,
    /// Informational. Restore derives it from `points`.
    pub multiplier: Option<BigDecimal>,
}

/// Cumulative counters behind the achievements (v2).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsEntry {
    pub total_clicks: Option<i64>,
    pub total_gained: Option<BigDecimal>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StateSnapshot {
    pub version: u32,
    pub resources: BTreeMap<String, ResourceEntry>,
    pub buildings: BTreeMap<String, BuildingEntry>,
    pub achievements: BTreeSet<String>,
    pub prestige: PrestigeEntry,
    /// Unix epoch milliseconds, supplied by the caller.
    pub saved_at: i64,

    // v2
    pub upgrades: BTreeSet<String>,
    pub stats: StatsEntry,
}

impl StateSnapshot {
    /// Capture the game's persistent state at the current version.
    pub fn capture(game: &Game, saved_at_ms: i64) -> Self {
        let resources = game
            .ledger
            .resources()
            .map(|r| {
                (
                    r.id.clone(),
                    ResourceEntry {
                        amount: Some(r.amount.clone()),
                        rate: Some(r.generation_rate.clone()),
                    },
                )
            })
            .collect();
        let buildings = game
            .buildings
            .iter()
            .map(|b| {
                (
                    b.id.clone(),
                    BuildingEntry {
                        count: Some(i64::try_from(b.count).unwrap_or(i64::MAX)),
                        efficiency_bonus: Some(b.efficiency_bonus.clone()),
                    },
                )
            })
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            resources,
            buildings,
            achievements: game.achievements.unlocked().clone(),
            prestige: PrestigeEntry {
                points: Some(game.prestige.points().clone()),
                multiplier: Some(game.prestige.multiplier().clone()),
            },
            saved_at: saved_at_ms,
            upgrades: game.upgrades.owned(),
            stats: StatsEntry {
                total_clicks: Some(i64::try_from(game.achievements.total_clicks()).unwrap_or(i64::MAX)),
                total_gained: Some(game.achievements.total_gained().clone()),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(SnapshotError::Encode)
    }

    /// Parse and check the version. Anything below `MIN_COMPATIBLE_VERSION`
    /// is rejected.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json).map_err(SnapshotError::Parse)?;
        if snapshot.version < MIN_COMPATIBLE_VERSION {
            return Err(SnapshotError::IncompatibleVersion {
                saved: snapshot.version,
                min: MIN_COMPATIBLE_VERSION,
            });
        }
        if snapshot.version < SNAPSHOT_VERSION {
            info!(
                "migrating snapshot (saved={}, current={})",
                snapshot.version, SNAPSHOT_VERSION
            );
        } else if snapshot.version > SNAPSHOT_VERSION {
            warn!(
                "snapshot version {} is newer than {}; unknown fields are ignored",
                snapshot.version, SNAPSHOT_VERSION
            );
        }
        Ok(snapshot)
    }
}

fn non_negative(value: Option<&BigDecimal>, field: &str, fallback: &BigDecimal) -> BigDecimal {
    match value {
        Some(v) if *v >= BigDecimal::zero() => v.clone(),
        Some(v) => {
            warn!("snapshot field {field} is negative ({v}), using {fallback}");
            fallback.clone()
        }
        None => fallback.clone(),
    }
}

fn non_negative_count(value: Option<i64>, field: &str) -> u64 {
    match value {
        Some(v) => u64::try_from(v).unwrap_or_else(|_| {
            warn!("snapshot field {field} is negative ({v}), using 0");
            0
        }),
        None => 0,
    }
}

/// Apply a snapshot to a freshly built game.
pub(super) fn apply_snapshot(game: &mut Game, snapshot: &StateSnapshot) {
    for (id, entry) in &snapshot.resources {
        let Some(defaults) = game.config.resource(id) else {
            warn!("snapshot names unknown resource {id}, skipping");
            continue;
        };
        let amount = non_negative(
            entry.amount.as_ref(),
            &format!("resources.{id}.amount"),
            &defaults.initial,
        );
        let rate = non_negative(
            entry.rate.as_ref(),
            &format!("resources.{id}.rate"),
            &defaults.generation_rate,
        );
        game.ledger.restore(id, amount, rate);
    }

    for (id, entry) in &snapshot.buildings {
        let count = non_negative_count(entry.count, &format!("buildings.{id}.count"));
        let efficiency = match &entry.efficiency_bonus {
            Some(e) if *e > BigDecimal::zero() => e.clone(),
            Some(e) => {
                warn!("snapshot field buildings.{id}.efficiencyBonus is not positive ({e}), using 1");
                BigDecimal::one()
            }
            None => BigDecimal::one(),
        };
        if !game.buildings.restore(id, count, efficiency) {
            warn!("snapshot names unknown building {id}, skipping");
        }
    }

    let points = non_negative(
        snapshot.prestige.points.as_ref(),
        "prestige.points",
        &BigDecimal::zero(),
    );
    game.prestige
        .restore(points, snapshot.prestige.multiplier.as_ref());

    let total_clicks = non_negative_count(snapshot.stats.total_clicks, "stats.totalClicks");
    let total_gained = non_negative(
        snapshot.stats.total_gained.as_ref(),
        "stats.totalGained",
        &BigDecimal::zero(),
    );
    game.achievements
        .restore(&snapshot.achievements, total_clicks, total_gained);
    game.upgrades.restore(&snapshot.upgrades);

    game.reinstall_bonuses();
    // Achievements whose thresholds were already met at save time unlock now.
    let unlocked = game.check_all_achievements();
    if !unlocked.is_empty() {
        info!("unlocked {} achievements while restoring", unlocked.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::buildings::{PurchaseOutcome, MAX_COUNT};
    use crate::economy::config::EconomyConfig;

    fn d(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn played_game() -> Game {
        let mut game = Game::new(EconomyConfig::default()).unwrap();
        for _ in 0..120 {
            game.click_action();
        }
        assert!(matches!(
            game.purchase_building("grower"),
            PurchaseOutcome::Purchased { .. }
        ));
        game.purchase_upgrade("basic_click");
        game.tick(2_000);
        game
    }

    #[test]
    fn capture_and_restore_roundtrip() {
        let game = played_game();
        let snapshot = game.snapshot(1_700_000_000_000);
        let json = snapshot.to_json().unwrap();
        let loaded = StateSnapshot::from_json(&json).unwrap();
        assert_eq!(loaded, snapshot);

        let restored = Game::restore(EconomyConfig::default(), &loaded).unwrap();
        assert_eq!(restored.ledger().primary_amount(), game.ledger().primary_amount());
        assert_eq!(restored.ledger().amount("seeds"), game.ledger().amount("seeds"));
        assert_eq!(restored.buildings().get("grower").unwrap().count, 1);
        assert_eq!(restored.upgrades().owned(), game.upgrades().owned());
        assert_eq!(restored.achievements().unlocked(), game.achievements().unlocked());
        assert_eq!(restored.achievements().total_clicks(), 120);
        // click multiplier rebuilt from the achievement (×1.1) and upgrade (×2)
        assert_eq!(restored.ledger().click_value(), d("2.2"));
        assert_eq!(restored.ledger().click_value(), game.ledger().click_value());
        assert_eq!(restored.production_per_second(), game.production_per_second());
    }

    #[test]
    fn decimals_are_saved_as_strings() {
        let game = played_game();
        let json = game.snapshot(0).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["resources"]["buds"]["amount"].is_string());
        assert_eq!(value["version"], SNAPSHOT_VERSION);
        assert!(value["savedAt"].is_number());
    }

    #[test]
    fn huge_amounts_survive_a_roundtrip() {
        let json = r#"{
            "version": 2,
            "resources": { "buds": { "amount": "123456789012345678901234567890123.000000001" } }
        }"#;
        let loaded = StateSnapshot::from_json(json).unwrap();
        let game = Game::restore(EconomyConfig::default(), &loaded).unwrap();
        let again = StateSnapshot::from_json(&game.snapshot(0).to_json().unwrap()).unwrap();
        assert_eq!(
            again.resources["buds"].amount,
            Some(d("123456789012345678901234567890123.000000001"))
        );
    }

    /// An older save without `upgrades` or `stats` keeps every field it has.
    #[test]
    fn migrate_v1_preserves_compatible_fields() {
        let old_json = r#"{
            "version": 1,
            "resources": {
                "buds": { "amount": "250.5", "rate": "0.1" },
                "seeds": { "amount": "12" }
            },
            "buildings": {
                "grower": { "count": 3, "efficiencyBonus": "1.1" }
            },
            "achievements": ["clicks_100"],
            "prestige": { "points": "10", "multiplier": "1.1" },
            "savedAt": 1000
        }"#;

        let loaded = StateSnapshot::from_json(old_json).unwrap();
        assert_eq!(loaded.version, 1);
        let game = Game::restore(EconomyConfig::default(), &loaded).unwrap();

        assert_eq!(game.ledger().primary_amount(), d("250.5"));
        assert_eq!(game.ledger().amount("seeds"), d("12"));
        // missing rate falls back to the configured one
        assert_eq!(game.ledger().generation_rate("seeds"), d("0.1"));
        // resources not in the save keep their initial amount
        assert_eq!(game.ledger().amount("strains"), d("5"));
        let grower = game.buildings().get("grower").unwrap();
        assert_eq!(grower.count, 3);
        assert_eq!(grower.efficiency_bonus, d("1.1"));
        assert_eq!(game.prestige_engine().multiplier(), &d("1.1"));
        assert_eq!(game.ledger().click_value(), d("1.1"));

        // v2 fields get defaults
        assert!(game.upgrades().owned().is_empty());
        assert_eq!(game.achievements().total_clicks(), 0);
    }

    #[test]
    fn version_below_min_compatible_is_rejected() {
        let err = StateSnapshot::from_json(r#"{ "version": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::IncompatibleVersion { saved: 0, min: 1 }
        ));
        // a missing version reads as 0
        assert!(StateSnapshot::from_json("{}").is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = StateSnapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }

    #[test]
    fn unknown_fields_in_json_are_ignored() {
        let json = r#"{
            "version": 2,
            "resources": { "buds": { "amount": "7", "sparkle": true } },
            "futureUnknownField": "should be ignored"
        }"#;
        let loaded = StateSnapshot::from_json(json).unwrap();
        assert_eq!(loaded.resources["buds"].amount, Some(d("7")));
    }

    #[test]
    fn invalid_fields_fall_back_individually() {
        let json = r#"{
            "version": 2,
            "resources": {
                "buds": { "amount": "-40", "rate": "0.5" },
                "gold": { "amount": "9" }
            },
            "buildings": {
                "grower": { "count": -2, "efficiencyBonus": "0" },
                "greenhouse": { "count": 4 },
                "time_machine": { "count": 1 }
            },
            "upgrades": ["basic_click", "warp_drive"],
            "prestige": { "points": "-1" },
            "stats": { "totalClicks": -5, "totalGained": "30" }
        }"#;
        let loaded = StateSnapshot::from_json(json).unwrap();
        let game = Game::restore(EconomyConfig::default(), &loaded).unwrap();

        assert_eq!(game.ledger().primary_amount(), BigDecimal::zero());
        assert_eq!(game.ledger().generation_rate("buds"), d("0.5"));
        assert!(game.ledger().resource("gold").is_none());
        let grower = game.buildings().get("grower").unwrap();
        assert_eq!(grower.count, 0);
        assert_eq!(grower.efficiency_bonus, BigDecimal::one());
        assert_eq!(game.buildings().get("greenhouse").unwrap().count, 4);
        assert_eq!(game.upgrades().owned().len(), 1);
        assert_eq!(game.prestige_engine().points(), &BigDecimal::zero());
        assert_eq!(game.achievements().total_clicks(), 0);
        assert_eq!(game.achievements().total_gained(), &d("30"));
    }

    #[test]
    fn huge_building_counts_are_clamped_on_restore() {
        let json = r#"{
            "version": 2,
            "buildings": {
                "grower": { "count": 9223372036854775807 },
                "greenhouse": { "count": 9223372036854775807 },
                "hydroponic": { "count": 9223372036854775807 }
            }
        }"#;
        let loaded = StateSnapshot::from_json(json).unwrap();
        let game = Game::restore(EconomyConfig::default(), &loaded).unwrap();

        assert_eq!(game.buildings().get("grower").unwrap().count, MAX_COUNT);
        assert_eq!(game.buildings().total_count(), 3 * MAX_COUNT);
        // every building-count achievement is met
        assert!(game.achievements().is_unlocked("buildings_100"));
    }

    #[test]
    fn restore_unlocks_met_but_missing_achievements() {
        let json = r#"{ "version": 2, "stats": { "totalClicks": 150 } }"#;
        let loaded = StateSnapshot::from_json(json).unwrap();
        let game = Game::restore(EconomyConfig::default(), &loaded).unwrap();
        assert!(game.achievements().is_unlocked("clicks_100"));
        assert_eq!(game.ledger().click_value(), d("1.1"));
    }
}
