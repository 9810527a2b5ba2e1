//! Buildings: geometric cost curve, production and efficiency bonuses.

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};
use tracing::{debug, info, warn};

use super::config::{BuildingConfig, EconomyConfig};
use super::ledger::ResourceLedger;
use super::multiplier::{MultiplierSet, MultiplierSource};

/// Most units of one building that can be owned. The cost of the last one
/// has thousands of digits; counts above it only arrive through snapshots.
pub const MAX_COUNT: u64 = 10_000;

#[derive(Clone, Debug, PartialEq)]
pub struct Building {
    pub id: String,
    pub name: String,
    pub count: u64,
    pub base_cost: BigDecimal,
    pub cost_multiplier: BigDecimal,
    pub base_production: BigDecimal,
    /// Product of every efficiency bonus applied so far (starts at 1).
    pub efficiency_bonus: BigDecimal,
}

impl Building {
    pub fn new(config: &BuildingConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            count: 0,
            base_cost: config.base_cost.clone(),
            cost_multiplier: config.cost_multiplier.clone(),
            base_production: config.base_production.clone(),
            efficiency_bonus: BigDecimal::one(),
        }
    }

    /// `base_cost × cost_multiplier^owned`, exact. `owned` is clamped to
    /// [`MAX_COUNT`].
    pub fn cost_at(&self, owned: u64) -> BigDecimal {
        let exponent = u32::try_from(owned.min(MAX_COUNT)).unwrap_or(u32::MAX);
        let (mantissa, scale) = self.cost_multiplier.as_bigint_and_exponent();
        let growth = BigDecimal::new(mantissa.pow(exponent), scale * i64::from(exponent));
        &self.base_cost * growth
    }

    /// Current cost to buy the next one.
    pub fn next_cost(&self) -> BigDecimal {
        self.cost_at(self.count)
    }

    /// Production per second from this building type, before the global
    /// multiplier.
    pub fn current_production(&self) -> BigDecimal {
        &self.base_production * BigDecimal::from(self.count) * &self.efficiency_bonus
    }

    /// Production gained by buying the next unit.
    pub fn next_unit_production(&self) -> BigDecimal {
        &self.base_production * &self.efficiency_bonus
    }
}

/// Which buildings an efficiency bonus targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BonusTarget {
    All,
    One(String),
}

/// Result of a purchase attempt. Refusals are ordinary outcomes.
#[derive(Clone, Debug, PartialEq)]
pub enum PurchaseOutcome {
    Purchased { cost: BigDecimal, count: u64 },
    CannotAfford { cost: BigDecimal },
    UnknownBuilding,
}

impl PurchaseOutcome {
    pub fn is_purchased(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased { .. })
    }
}

#[derive(Clone, Debug)]
pub struct BuildingRegistry {
    /// In config order.
    buildings: Vec<Building>,
    global: MultiplierSet,
}

impl BuildingRegistry {
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            buildings: config.buildings.iter().map(Building::new).collect(),
            global: MultiplierSet::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    pub fn next_cost(&self, id: &str) -> Option<BigDecimal> {
        self.get(id).map(Building::next_cost)
    }

    pub fn total_count(&self) -> u64 {
        self.buildings
            .iter()
            .fold(0, |total, b| total.saturating_add(b.count))
    }

    /// Buy one unit, paying from the ledger's primary resource. The cost
    /// checked for affordability is the same value that gets charged.
    pub fn purchase(&mut self, id: &str, ledger: &mut ResourceLedger) -> PurchaseOutcome {
        let primary = ledger.primary_id().to_string();
        let Some(building) = self.get_mut(id) else {
            debug!("purchase of unknown building {id}");
            return PurchaseOutcome::UnknownBuilding;
        };
        let cost = building.next_cost();
        if building.count >= MAX_COUNT {
            debug!("{id} is at the maximum count of {MAX_COUNT}");
            return PurchaseOutcome::CannotAfford { cost };
        }
        if !ledger.spend(&primary, &cost) {
            return PurchaseOutcome::CannotAfford { cost };
        }
        building.count += 1;
        info!("purchased {} for {cost} ({} owned)", building.name, building.count);
        PurchaseOutcome::Purchased {
            cost,
            count: building.count,
        }
    }

    /// Total production per second, including the global (prestige) multiplier.
    pub fn production(&self) -> BigDecimal {
        let raw = self
            .buildings
            .iter()
            .fold(BigDecimal::zero(), |acc, b| acc + b.current_production());
        raw * self.global.effective()
    }

    /// Compound `factor` onto the targeted efficiency bonuses.
    pub fn apply_efficiency_bonus(&mut self, target: &BonusTarget, factor: &BigDecimal) -> bool {
        if *factor <= BigDecimal::zero() {
            return false;
        }
        match target {
            BonusTarget::All => {
                for b in &mut self.buildings {
                    b.efficiency_bonus = &b.efficiency_bonus * factor;
                }
                true
            }
            BonusTarget::One(id) => match self.get_mut(id) {
                Some(b) => {
                    b.efficiency_bonus = &b.efficiency_bonus * factor;
                    true
                }
                None => false,
            },
        }
    }

    pub fn set_prestige_multiplier(&mut self, factor: &BigDecimal) {
        self.global.replace(MultiplierSource::Prestige, factor);
    }

    pub fn global_multiplier(&self) -> BigDecimal {
        self.global.effective()
    }

    /// Overwrite count and efficiency, as loaded from a snapshot. Counts are
    /// clamped to [`MAX_COUNT`].
    pub fn restore(&mut self, id: &str, count: u64, efficiency_bonus: BigDecimal) -> bool {
        match self.get_mut(id) {
            Some(b) => {
                if count > MAX_COUNT {
                    warn!("{id} count {count} exceeds {MAX_COUNT}, clamping");
                }
                b.count = count.min(MAX_COUNT);
                b.efficiency_bonus = efficiency_bonus;
                true
            }
            None => false,
        }
    }
}
