//! Idle economy core: ledger, buildings, achievements, upgrades, prestige and
//! offline progress, composed by [`Game`].
//!
//! [`Game`] is a plain single-owner value. Every entry point is synchronous,
//! reads no wall clock and never fails for routine refusals; callers that
//! share it across tasks go through [`crate::worker`].

pub mod achievements;
pub mod buildings;
pub mod config;
pub mod ledger;
pub mod multiplier;
pub mod offline;
pub mod prestige;
pub mod snapshot;
pub mod upgrades;

mod simulator;

use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::error::ConfigError;

use achievements::{AchievementTracker, RewardSink};
use buildings::{BonusTarget, BuildingRegistry, PurchaseOutcome};
use config::{EconomyConfig, RewardKind};
use ledger::ResourceLedger;
use multiplier::MultiplierSource;
use offline::{OfflineProgressCalculator, OfflineReport};
use prestige::{PrestigeEngine, PrestigeOutcome};
use snapshot::StateSnapshot;
use upgrades::{UpgradeCatalog, UpgradeOutcome};

/// Routes achievement rewards into the ledger and buildings.
struct Rewards<'a> {
    ledger: &'a mut ResourceLedger,
    buildings: &'a mut BuildingRegistry,
}

impl RewardSink for Rewards<'_> {
    fn apply_reward(&mut self, kind: RewardKind, factor: &BigDecimal) {
        match kind {
            RewardKind::ClickBonus => {
                self.ledger.apply_click_bonus(MultiplierSource::Achievement, factor);
            }
            RewardKind::GenerationBonus => {
                let primary = self.ledger.primary_id().to_string();
                self.ledger
                    .apply_generation_bonus(&primary, MultiplierSource::Achievement, factor);
            }
            RewardKind::BuildingEfficiencyBonus => {
                self.buildings.apply_efficiency_bonus(&BonusTarget::All, factor);
            }
        }
    }
}

/// Read-only summary for display.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStatus {
    pub primary_resource: String,
    pub amount: BigDecimal,
    pub production_per_second: BigDecimal,
    pub click_value: BigDecimal,
    pub total_clicks: u64,
    pub total_gained: BigDecimal,
    pub achievements_unlocked: usize,
    pub prestige_points: BigDecimal,
    pub prestige_multiplier: BigDecimal,
    pub can_prestige: bool,
    pub next_prestige_points: BigDecimal,
    /// (id, count, next cost), in config order.
    pub buildings: Vec<(String, u64, BigDecimal)>,
}

#[derive(Clone, Debug)]
pub struct Game {
    config: EconomyConfig,
    ledger: ResourceLedger,
    buildings: BuildingRegistry,
    achievements: AchievementTracker,
    upgrades: UpgradeCatalog,
    prestige: PrestigeEngine,
    offline: OfflineProgressCalculator,
}

impl Game {
    pub fn new(config: EconomyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ledger: ResourceLedger::new(&config),
            buildings: BuildingRegistry::new(&config),
            achievements: AchievementTracker::new(&config),
            upgrades: UpgradeCatalog::new(&config),
            prestige: PrestigeEngine::new(&config.prestige),
            offline: OfflineProgressCalculator::new(&config.offline),
            config,
        })
    }

    /// Rebuild a game from a snapshot. Bad or unknown fields fall back to
    /// their configured defaults; only an invalid config fails.
    pub fn restore(config: EconomyConfig, snapshot: &StateSnapshot) -> Result<Self, ConfigError> {
        let mut game = Self::new(config)?;
        snapshot::apply_snapshot(&mut game, snapshot);
        Ok(game)
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn buildings(&self) -> &BuildingRegistry {
        &self.buildings
    }

    pub fn achievements(&self) -> &AchievementTracker {
        &self.achievements
    }

    pub fn upgrades(&self) -> &UpgradeCatalog {
        &self.upgrades
    }

    pub fn prestige_engine(&self) -> &PrestigeEngine {
        &self.prestige
    }

    /// Manual click: credit the current click value to the primary resource.
    /// Returns the amount credited.
    pub fn click_action(&mut self) -> BigDecimal {
        let primary = self.ledger.primary_id().to_string();
        let value = self.ledger.click_value();
        let credited = self.ledger.add(&primary, &value);
        let mut sink = Rewards {
            ledger: &mut self.ledger,
            buildings: &mut self.buildings,
        };
        self.achievements.register_click(&mut sink);
        self.record_gain(&credited);
        credited
    }

    pub fn purchase_building(&mut self, id: &str) -> PurchaseOutcome {
        let outcome = self.buildings.purchase(id, &mut self.ledger);
        if outcome.is_purchased() {
            let total = self.buildings.total_count();
            let mut sink = Rewards {
                ledger: &mut self.ledger,
                buildings: &mut self.buildings,
            };
            self.achievements.check_buildings(total, &mut sink);
        }
        outcome
    }

    pub fn purchase_upgrade(&mut self, id: &str) -> UpgradeOutcome {
        self.upgrades.purchase(id, &mut self.ledger)
    }

    /// Advance the simulation by `delta_ms`. Returns the primary resource
    /// credited. A zero delta does nothing.
    pub fn tick(&mut self, delta_ms: u64) -> BigDecimal {
        if delta_ms == 0 {
            return BigDecimal::zero();
        }
        let production = self.buildings.production();
        let gained = self.ledger.apply_generation(&production, delta_ms);
        self.record_gain(&gained);
        gained
    }

    fn record_gain(&mut self, amount: &BigDecimal) {
        let mut sink = Rewards {
            ledger: &mut self.ledger,
            buildings: &mut self.buildings,
        };
        self.achievements.add_resource_gain(amount, &mut sink);
    }

    /// Primary resource per second: buildings plus the resource's own
    /// passive rate.
    pub fn production_per_second(&self) -> BigDecimal {
        let primary = self.ledger.primary_id();
        self.buildings.production() + self.ledger.passive_rate(primary)
    }

    pub fn can_prestige(&self) -> bool {
        self.prestige.can_prestige(&self.ledger.primary_amount())
    }

    /// Points a prestige would grant right now. Pure.
    pub fn next_prestige_points_gain(&self) -> BigDecimal {
        self.prestige.points_for(&self.ledger.primary_amount())
    }

    pub fn prestige(&mut self) -> PrestigeOutcome {
        let outcome = self.prestige.prestige(&mut self.ledger, &mut self.buildings);
        if matches!(outcome, PrestigeOutcome::Prestiged { .. }) {
            self.upgrades.reset();
            self.reinstall_bonuses();
        }
        outcome
    }

    /// Rebuild the derived multiplier entries from owned achievements,
    /// upgrades and prestige points. Entries are replaced, so this never
    /// stacks a reward twice.
    fn reinstall_bonuses(&mut self) {
        let primary = self.ledger.primary_id().to_string();
        self.ledger.replace_click_bonus(
            MultiplierSource::Achievement,
            &self.achievements.reward_product(RewardKind::ClickBonus),
        );
        self.ledger.replace_generation_bonus(
            &primary,
            MultiplierSource::Achievement,
            &self.achievements.reward_product(RewardKind::GenerationBonus),
        );
        self.upgrades.reinstall(&mut self.ledger);
        self.prestige.install(&mut self.ledger, &mut self.buildings);
    }

    /// Re-check every achievement family, e.g. after a restore.
    fn check_all_achievements(&mut self) -> Vec<String> {
        let total = self.buildings.total_count();
        let mut sink = Rewards {
            ledger: &mut self.ledger,
            buildings: &mut self.buildings,
        };
        self.achievements.check_all(total, &mut sink)
    }

    /// Grant offline earnings for a gap of `offline_ms` (now minus the
    /// snapshot's `saved_at`), at the production rate as of now.
    pub fn apply_offline_progress(&mut self, offline_ms: i64) -> OfflineReport {
        let production = self.production_per_second();
        let report = self.offline.apply(&mut self.ledger, &production, offline_ms);
        self.record_gain(&report.earnings);
        report
    }

    /// Consistent copy of the persistent state. `saved_at_ms` is supplied by
    /// the caller; the core never reads the clock.
    pub fn snapshot(&self, saved_at_ms: i64) -> StateSnapshot {
        StateSnapshot::capture(self, saved_at_ms)
    }

    pub fn status(&self) -> GameStatus {
        GameStatus {
            primary_resource: self.ledger.primary_id().to_string(),
            amount: self.ledger.primary_amount(),
            production_per_second: self.production_per_second(),
            click_value: self.ledger.click_value(),
            total_clicks: self.achievements.total_clicks(),
            total_gained: self.achievements.total_gained().clone(),
            achievements_unlocked: self.achievements.unlocked().len(),
            prestige_points: self.prestige.points().clone(),
            prestige_multiplier: self.prestige.multiplier().clone(),
            can_prestige: self.can_prestige(),
            next_prestige_points: self.next_prestige_points_gain(),
            buildings: self
                .buildings
                .iter()
                .map(|b| (b.id.clone(), b.count, b.next_cost()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::config::{AchievementConfig, Metric};
    use num_traits::One;

    fn d(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn game() -> Game {
        Game::new(EconomyConfig::default()).unwrap()
    }

    #[test]
    fn click_adds_one_by_default() {
        let mut g = game();
        assert_eq!(g.click_action(), BigDecimal::one());
        assert_eq!(g.ledger().primary_amount(), BigDecimal::one());
        assert_eq!(g.achievements().total_clicks(), 1);
        assert_eq!(g.achievements().total_gained(), &BigDecimal::one());
    }

    #[test]
    fn first_grower_purchase() {
        let mut g = game();
        for _ in 0..20 {
            g.click_action();
        }
        let outcome = g.purchase_building("grower");
        assert_eq!(
            outcome,
            PurchaseOutcome::Purchased {
                cost: d("15"),
                count: 1
            }
        );
        assert_eq!(g.ledger().primary_amount(), d("5"));
        assert_eq!(g.buildings().next_cost("grower"), Some(d("17.25")));
    }

    #[test]
    fn cannot_afford_is_noop() {
        let mut g = game();
        g.click_action();
        let outcome = g.purchase_building("grower");
        assert_eq!(outcome, PurchaseOutcome::CannotAfford { cost: d("15") });
        assert_eq!(g.ledger().primary_amount(), BigDecimal::one());
    }

    #[test]
    fn tick_zero_does_nothing() {
        let mut g = game();
        assert_eq!(g.tick(0), BigDecimal::zero());
        assert_eq!(g.ledger().primary_amount(), BigDecimal::zero());
    }

    #[test]
    fn tick_produces_from_buildings_and_base_rate() {
        let mut g = game();
        g.buildings.restore("greenhouse", 5, BigDecimal::one());
        // 5 greenhouses (5/s) + base 0.1/s for one second
        assert_eq!(g.tick(1000), d("5.1"));
        assert_eq!(g.production_per_second(), d("5.1"));
    }

    #[test]
    fn click_achievement_compounds_click_value() {
        let mut config = EconomyConfig::default();
        config.achievements = vec![AchievementConfig {
            id: "clicks_2".into(),
            name: "two".into(),
            metric: Metric::Clicks(2),
            reward: RewardKind::ClickBonus,
            factor: d("1.5"),
        }];
        let mut g = Game::new(config).unwrap();
        g.click_action();
        g.click_action();
        assert_eq!(g.ledger().click_value(), d("1.5"));
        assert_eq!(g.click_action(), d("1.5"));
    }

    #[test]
    fn building_achievement_boosts_efficiency() {
        let mut config = EconomyConfig::default();
        config.achievements = vec![AchievementConfig {
            id: "buildings_2".into(),
            name: "two".into(),
            metric: Metric::BuildingCount(2),
            reward: RewardKind::BuildingEfficiencyBonus,
            factor: d("2"),
        }];
        let mut g = Game::new(config).unwrap();
        g.ledger.add("buds", &d("100"));
        g.purchase_building("grower");
        assert_eq!(g.buildings().production(), d("0.1"));
        g.purchase_building("grower");
        assert!(g.achievements().is_unlocked("buildings_2"));
        assert_eq!(g.buildings().production(), d("0.4"));
    }

    #[test]
    fn prestige_keeps_achievement_and_prestige_bonuses() {
        let mut config = EconomyConfig::default();
        config.prestige.requirement = d("10");
        config.achievements = vec![AchievementConfig {
            id: "clicks_1".into(),
            name: "one".into(),
            metric: Metric::Clicks(1),
            reward: RewardKind::ClickBonus,
            factor: d("2"),
        }];
        let mut g = Game::new(config).unwrap();
        g.ledger.add("buds", &d("99"));
        g.click_action();
        g.ledger.add("buds", &d("10"));
        g.purchase_upgrade("basic_click");
        assert_eq!(g.ledger().click_value(), d("4"));

        // 100 / 10 = 10 → 11.5 points → ×1.115
        let outcome = g.prestige();
        assert!(matches!(outcome, PrestigeOutcome::Prestiged { .. }));
        assert_eq!(g.ledger().primary_amount(), BigDecimal::zero());
        // Upgrade gone, achievement bonus kept.
        assert_eq!(g.ledger().click_value(), d("2"));
        assert!(g.upgrades().owned().is_empty());
        assert_eq!(g.prestige_engine().multiplier(), &d("1.115"));
        assert_eq!(g.ledger().generation_multiplier("buds"), d("1.115"));
    }

    #[test]
    fn prestige_refused_leaves_state() {
        let mut g = game();
        g.ledger.add("buds", &d("500"));
        let outcome = g.prestige();
        assert!(matches!(outcome, PrestigeOutcome::NotEligible { .. }));
        assert_eq!(g.ledger().primary_amount(), d("500"));
    }

    #[test]
    fn offline_grant_counts_toward_gain() {
        let mut g = game();
        g.buildings.restore("greenhouse", 2, BigDecimal::one());
        // (2 + 0.1) × 100s × 0.5
        let report = g.apply_offline_progress(100_000);
        assert_eq!(report.earnings, d("105"));
        assert_eq!(g.achievements().total_gained(), &d("105"));
    }

    #[test]
    fn status_reflects_state() {
        let mut g = game();
        g.click_action();
        let status = g.status();
        assert_eq!(status.primary_resource, "buds");
        assert_eq!(status.amount, BigDecimal::one());
        assert_eq!(status.total_clicks, 1);
        assert!(!status.can_prestige);
        assert_eq!(status.buildings.len(), 20);
        assert_eq!(status.buildings[0], ("grower".to_string(), 0, d("15")));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = EconomyConfig::default();
        config.tick_duration_ms = 0;
        assert!(Game::new(config).is_err());
    }
}
