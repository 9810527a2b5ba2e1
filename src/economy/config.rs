//! Immutable economy tables: resources, buildings, achievements, upgrades,
//! prestige and offline constants.
//!
//! A config value is built once (defaults or JSON overrides), validated, and
//! handed to [`crate::economy::Game::new`]. Nothing in the core reads global
//! state, so tests can run against tiny tables (thresholds of 10 instead of
//! 10,000,000).
//!
//! Decimal fields are written as strings (`"1.15"`) so they load exactly.

use std::collections::HashSet;
use std::path::Path;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Resource tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    #[default]
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,
    #[serde(default)]
    pub category: ResourceCategory,
    /// Amount after a fresh start or a prestige reset.
    #[serde(default)]
    pub initial: BigDecimal,
    /// Base passive generation per second, before multipliers.
    #[serde(default)]
    pub generation_rate: BigDecimal,
    /// Upper bound on the stored amount. `None` means unbounded.
    #[serde(default)]
    pub cap: Option<BigDecimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingConfig {
    pub id: String,
    pub name: String,
    /// Cost of the first unit.
    pub base_cost: BigDecimal,
    /// Geometric cost growth per unit owned. Must be > 1.
    pub cost_multiplier: BigDecimal,
    /// Primary resource per second per unit.
    pub base_production: BigDecimal,
}

/// Metric an achievement watches, with its threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", content = "threshold", rename_all = "snake_case")]
pub enum Metric {
    /// Cumulative manual clicks.
    Clicks(u64),
    /// Cumulative resource gain, never decreased by spending or prestige.
    ResourceGain(BigDecimal),
    /// Total buildings owned across all kinds.
    BuildingCount(u64),
}

/// Metric family, used to re-evaluate only the achievements an event can affect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    Clicks,
    ResourceGain,
    BuildingCount,
}

impl Metric {
    pub fn family(&self) -> MetricFamily {
        match self {
            Metric::Clicks(_) => MetricFamily::Clicks,
            Metric::ResourceGain(_) => MetricFamily::ResourceGain,
            Metric::BuildingCount(_) => MetricFamily::BuildingCount,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Compounds the click multiplier.
    ClickBonus,
    /// Compounds the primary resource's passive generation multiplier.
    GenerationBonus,
    /// Compounds the efficiency of every building.
    BuildingEfficiencyBonus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AchievementConfig {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub metric: Metric,
    pub reward: RewardKind,
    /// Multiplicative reward factor. Must be > 0.
    pub factor: BigDecimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "factor", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Multiplies the click value.
    Click(BigDecimal),
    /// Multiplies the primary resource's passive generation.
    Generation(BigDecimal),
}

impl UpgradeEffect {
    pub fn factor(&self) -> &BigDecimal {
        match self {
            UpgradeEffect::Click(f) | UpgradeEffect::Generation(f) => f,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    pub id: String,
    pub name: String,
    pub cost: BigDecimal,
    #[serde(flatten)]
    pub effect: UpgradeEffect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrestigeConfig {
    /// Primary resource needed before a prestige is allowed.
    pub requirement: BigDecimal,
    /// Points granted per whole multiple of `requirement`.
    pub points_rate: BigDecimal,
    /// Production bonus per prestige point (0.01 = +1%).
    pub per_point_bonus: BigDecimal,
}

impl Default for PrestigeConfig {
    fn default() -> Self {
        Self {
            requirement: dec(1_000_000, 0),
            points_rate: dec(115, 2),
            per_point_bonus: dec(1, 2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Longest absence that still earns offline progress.
    pub max_offline_ms: u64,
    /// Fraction of normal production granted while offline.
    pub rate: BigDecimal,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            max_offline_ms: 72 * 3600 * 1000,
            rate: dec(5, 1),
        }
    }
}

/// Every tunable of the economy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Scheduler cadence.
    pub tick_duration_ms: u64,
    /// Longest wall-clock gap the scheduler catches up in a single frame.
    pub max_frame_catchup_ms: u64,
    pub autosave_interval_ms: u64,
    /// Resource that clicks, buildings, costs and prestige operate on.
    pub primary_resource: String,
    pub base_click_power: BigDecimal,
    pub resources: Vec<ResourceConfig>,
    pub buildings: Vec<BuildingConfig>,
    pub achievements: Vec<AchievementConfig>,
    pub upgrades: Vec<UpgradeConfig>,
    pub prestige: PrestigeConfig,
    pub offline: OfflineConfig,
}

pub const PRIMARY_RESOURCE: &str = "buds";
pub const SECONDARY_RESOURCE: &str = "seeds";
pub const TERTIARY_RESOURCE: &str = "strains";

/// `mantissa × 10^-scale`.
pub(crate) fn dec(mantissa: i64, scale: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from(mantissa), scale)
}

/// (id, name, base cost, base production in tenths).
const BUILDING_TABLE: &[(&str, &str, i128, i64)] = &[
    ("grower", "Grower", 15, 1),
    ("greenhouse", "Greenhouse", 100, 10),
    ("hydroponic", "Hydroponic Bay", 1_100, 80),
    ("indoor_farm", "Indoor Farm", 12_000, 470),
    ("agricultural", "Agricultural Center", 130_000, 2_600),
    ("research_lab", "Research Lab", 1_400_000, 14_000),
    ("genetic_lab", "Genetic Lab", 20_000_000, 78_000),
    ("processing", "Processing Plant", 330_000_000, 440_000),
    ("packaging", "Packaging Line", 5_100_000_000, 2_600_000),
    ("distribution", "Distribution Hub", 75_000_000_000, 16_000_000),
    ("retail", "Retail Chain", 1_000_000_000_000, 100_000_000),
    ("medical", "Medical Dispensary", 14_000_000_000_000, 650_000_000),
    ("consulting", "Consulting Firm", 170_000_000_000_000, 4_300_000_000),
    ("marketing", "Marketing Agency", 2_100_000_000_000_000, 29_000_000_000),
    ("quality_control", "Quality Control", 26_000_000_000_000_000, 210_000_000_000),
    ("security", "Security Division", 310_000_000_000_000_000, 1_500_000_000_000),
    ("legal", "Legal Department", 7_100_000_000_000_000_000, 11_000_000_000_000),
    ("education", "Academy", 12_000_000_000_000_000_000, 83_000_000_000_000),
    ("innovation", "Innovation Center", 190_000_000_000_000_000_000, 640_000_000_000_000),
    ("empire", "Empire", 270_000_000_000_000_000_000, 5_100_000_000_000_000),
];

const CLICK_THRESHOLDS: &[u64] = &[
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000,
];
const RESOURCE_THRESHOLDS: &[i64] = &[
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
];
const BUILDING_COUNT_THRESHOLDS: &[u64] = &[10, 25, 50, 100];

impl EconomyConfig {
    pub fn default_resources() -> Vec<ResourceConfig> {
        vec![
            ResourceConfig {
                id: PRIMARY_RESOURCE.into(),
                category: ResourceCategory::Primary,
                initial: BigDecimal::zero(),
                generation_rate: dec(1, 1),
                cap: None,
            },
            ResourceConfig {
                id: SECONDARY_RESOURCE.into(),
                category: ResourceCategory::Secondary,
                initial: dec(10, 0),
                generation_rate: dec(1, 1),
                cap: None,
            },
            ResourceConfig {
                id: TERTIARY_RESOURCE.into(),
                category: ResourceCategory::Tertiary,
                initial: dec(5, 0),
                generation_rate: BigDecimal::zero(),
                cap: None,
            },
        ]
    }

    pub fn default_buildings() -> Vec<BuildingConfig> {
        BUILDING_TABLE
            .iter()
            .map(|&(id, name, cost, tenths)| BuildingConfig {
                id: id.into(),
                name: name.into(),
                base_cost: BigDecimal::new(BigInt::from(cost), 0),
                cost_multiplier: dec(115, 2),
                base_production: dec(tenths, 1),
            })
            .collect()
    }

    pub fn default_achievements() -> Vec<AchievementConfig> {
        let clicks = CLICK_THRESHOLDS.iter().map(|&n| AchievementConfig {
            id: format!("clicks_{n}"),
            name: format!("{n} clicks"),
            metric: Metric::Clicks(n),
            reward: RewardKind::ClickBonus,
            factor: dec(11, 1),
        });
        let gains = RESOURCE_THRESHOLDS.iter().map(|&n| AchievementConfig {
            id: format!("resources_{n}"),
            name: format!("{n} harvested"),
            metric: Metric::ResourceGain(dec(n, 0)),
            reward: RewardKind::GenerationBonus,
            factor: dec(105, 2),
        });
        let buildings = BUILDING_COUNT_THRESHOLDS.iter().map(|&n| AchievementConfig {
            id: format!("buildings_{n}"),
            name: format!("{n} buildings"),
            metric: Metric::BuildingCount(n),
            reward: RewardKind::BuildingEfficiencyBonus,
            factor: dec(11, 1),
        });
        clicks.chain(gains).chain(buildings).collect()
    }

    pub fn default_upgrades() -> Vec<UpgradeConfig> {
        vec![
            UpgradeConfig {
                id: "basic_click".into(),
                name: "Basic Click".into(),
                cost: dec(10, 0),
                effect: UpgradeEffect::Click(dec(2, 0)),
            },
            UpgradeConfig {
                id: "basic_passive".into(),
                name: "Basic Passive Income".into(),
                cost: dec(50, 0),
                effect: UpgradeEffect::Generation(dec(15, 1)),
            },
            UpgradeConfig {
                id: "trimming_shears".into(),
                name: "Trimming Shears".into(),
                cost: dec(500, 0),
                effect: UpgradeEffect::Click(dec(2, 0)),
            },
            UpgradeConfig {
                id: "drip_irrigation".into(),
                name: "Drip Irrigation".into(),
                cost: dec(5_000, 0),
                effect: UpgradeEffect::Generation(dec(2, 0)),
            },
        ]
    }

    /// Parse a JSON config. Fields left out keep their default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EconomyConfig = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Reject tables that would break the ledger's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_duration_ms == 0 {
            return Err(ConfigError::invalid("tick_duration_ms", "must be positive"));
        }
        if self.base_click_power < BigDecimal::zero() {
            return Err(ConfigError::invalid("base_click_power", "must be >= 0"));
        }

        let mut seen = HashSet::new();
        for r in &self.resources {
            if !seen.insert(r.id.as_str()) {
                return Err(ConfigError::invalid("resources", format!("duplicate id {}", r.id)));
            }
            if r.initial < BigDecimal::zero() || r.generation_rate < BigDecimal::zero() {
                return Err(ConfigError::invalid(
                    format!("resources.{}", r.id),
                    "initial amount and generation rate must be >= 0",
                ));
            }
            if let Some(cap) = &r.cap {
                if *cap < r.initial {
                    return Err(ConfigError::invalid(
                        format!("resources.{}.cap", r.id),
                        "cap must not be below the initial amount",
                    ));
                }
            }
        }
        if self.resource(&self.primary_resource).is_none() {
            return Err(ConfigError::invalid(
                "primary_resource",
                format!("{} is not a configured resource", self.primary_resource),
            ));
        }

        let mut seen = HashSet::new();
        for b in &self.buildings {
            if !seen.insert(b.id.as_str()) {
                return Err(ConfigError::invalid("buildings", format!("duplicate id {}", b.id)));
            }
            if b.cost_multiplier <= BigDecimal::one() {
                return Err(ConfigError::invalid(
                    format!("buildings.{}.cost_multiplier", b.id),
                    "must be > 1",
                ));
            }
            if b.base_cost < BigDecimal::zero() || b.base_production < BigDecimal::zero() {
                return Err(ConfigError::invalid(
                    format!("buildings.{}", b.id),
                    "base cost and base production must be >= 0",
                ));
            }
        }

        let mut seen = HashSet::new();
        for a in &self.achievements {
            if !seen.insert(a.id.as_str()) {
                return Err(ConfigError::invalid("achievements", format!("duplicate id {}", a.id)));
            }
            if a.factor <= BigDecimal::zero() {
                return Err(ConfigError::invalid(
                    format!("achievements.{}.factor", a.id),
                    "must be > 0",
                ));
            }
        }

        let mut seen = HashSet::new();
        for u in &self.upgrades {
            if !seen.insert(u.id.as_str()) {
                return Err(ConfigError::invalid("upgrades", format!("duplicate id {}", u.id)));
            }
            if *u.effect.factor() <= BigDecimal::zero() || u.cost < BigDecimal::zero() {
                return Err(ConfigError::invalid(
                    format!("upgrades.{}", u.id),
                    "factor must be > 0 and cost >= 0",
                ));
            }
        }

        if self.prestige.requirement <= BigDecimal::zero() {
            return Err(ConfigError::invalid("prestige.requirement", "must be > 0"));
        }
        if self.prestige.points_rate < BigDecimal::zero() || self.prestige.per_point_bonus < BigDecimal::zero() {
            return Err(ConfigError::invalid(
                "prestige",
                "points rate and per-point bonus must be >= 0",
            ));
        }
        if self.offline.rate < BigDecimal::zero() || self.offline.rate >= BigDecimal::one() {
            return Err(ConfigError::invalid("offline.rate", "must be within [0, 1)"));
        }
        Ok(())
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            tick_duration_ms: 50,
            max_frame_catchup_ms: 500,
            autosave_interval_ms: 60_000,
            primary_resource: PRIMARY_RESOURCE.into(),
            base_click_power: BigDecimal::one(),
            resources: Self::default_resources(),
            buildings: Self::default_buildings(),
            achievements: Self::default_achievements(),
            upgrades: Self::default_upgrades(),
            prestige: PrestigeConfig::default(),
            offline: OfflineConfig::default(),
        }
    }
}
