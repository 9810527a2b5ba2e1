//! Resource ledger: amounts, generation rates, caps and multiplier sets.
//!
//! Amounts are unbounded decimals and every operation is exact, so a time
//! interval credits the same total however it is split into ticks. Amounts
//! never go negative and never exceed their cap.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use tracing::debug;

use super::config::{EconomyConfig, ResourceCategory, ResourceConfig};
use super::multiplier::{MultiplierSet, MultiplierSource};

/// Exact milliseconds-to-seconds conversion (scale 3, no rounding).
pub fn millis_to_seconds(ms: u64) -> BigDecimal {
    BigDecimal::new(BigInt::from(ms), 3)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub id: String,
    pub amount: BigDecimal,
    /// Base passive generation per second, before multipliers.
    pub generation_rate: BigDecimal,
    pub cap: Option<BigDecimal>,
    pub category: ResourceCategory,
}

impl Resource {
    fn from_config(config: &ResourceConfig) -> Self {
        Self {
            id: config.id.clone(),
            amount: config.initial.clone(),
            generation_rate: config.generation_rate.clone(),
            cap: config.cap.clone(),
            category: config.category,
        }
    }

    fn clamp(&self, amount: BigDecimal) -> BigDecimal {
        let amount = amount.max(BigDecimal::zero());
        match &self.cap {
            Some(cap) if amount > *cap => cap.clone(),
            _ => amount,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResourceLedger {
    resources: BTreeMap<String, Resource>,
    initial: Vec<ResourceConfig>,
    primary: String,
    base_click_power: BigDecimal,
    click: MultiplierSet,
    generation: BTreeMap<String, MultiplierSet>,
}

impl ResourceLedger {
    pub fn new(config: &EconomyConfig) -> Self {
        let mut ledger = Self {
            resources: BTreeMap::new(),
            initial: config.resources.clone(),
            primary: config.primary_resource.clone(),
            base_click_power: config.base_click_power.clone(),
            click: MultiplierSet::new(),
            generation: BTreeMap::new(),
        };
        ledger.seed();
        ledger
    }

    fn seed(&mut self) {
        self.resources = self
            .initial
            .iter()
            .map(|r| (r.id.clone(), Resource::from_config(r)))
            .collect();
        self.generation = self
            .initial
            .iter()
            .map(|r| (r.id.clone(), MultiplierSet::new()))
            .collect();
        self.click = MultiplierSet::new();
    }

    pub fn primary_id(&self) -> &str {
        &self.primary
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Current amount. Unknown ids read as zero.
    pub fn amount(&self, id: &str) -> BigDecimal {
        self.resources
            .get(id)
            .map_or_else(BigDecimal::zero, |r| r.amount.clone())
    }

    pub fn primary_amount(&self) -> BigDecimal {
        self.amount(&self.primary)
    }

    /// Credit `amount`, clamping at the cap. Returns what was actually
    /// credited. Negative amounts and unknown ids are ignored.
    pub fn add(&mut self, id: &str, amount: &BigDecimal) -> BigDecimal {
        if *amount < BigDecimal::zero() {
            debug!("ignoring negative credit of {amount} {id}");
            return BigDecimal::zero();
        }
        let Some(resource) = self.resources.get_mut(id) else {
            debug!("ignoring credit to unknown resource {id}");
            return BigDecimal::zero();
        };
        let raw = &resource.amount + amount;
        let clamped = resource.clamp(raw.clone());
        if clamped < raw {
            debug!("resource {id} hit cap of {clamped}");
        }
        let credited = &clamped - &resource.amount;
        resource.amount = clamped;
        credited
    }

    pub fn can_afford(&self, id: &str, amount: &BigDecimal) -> bool {
        self.resources
            .get(id)
            .is_some_and(|r| *amount >= BigDecimal::zero() && *amount <= r.amount)
    }

    /// Debit `amount` if affordable. A refused spend leaves the balance
    /// untouched; an accepted one never drives it below zero.
    pub fn spend(&mut self, id: &str, amount: &BigDecimal) -> bool {
        if !self.can_afford(id, amount) {
            debug!("cannot spend {amount} {id}: insufficient funds");
            return false;
        }
        if let Some(resource) = self.resources.get_mut(id) {
            resource.amount = (&resource.amount - amount).max(BigDecimal::zero());
            debug!("spent {amount} {id} (remaining {})", resource.amount);
        }
        true
    }

    pub fn generation_rate(&self, id: &str) -> BigDecimal {
        self.resources
            .get(id)
            .map_or_else(BigDecimal::zero, |r| r.generation_rate.clone())
    }

    pub fn set_generation_rate(&mut self, id: &str, rate: BigDecimal) -> bool {
        match self.resources.get_mut(id) {
            Some(r) if rate >= BigDecimal::zero() => {
                r.generation_rate = rate;
                true
            }
            _ => false,
        }
    }

    pub fn set_cap(&mut self, id: &str, cap: Option<BigDecimal>) -> bool {
        let Some(resource) = self.resources.get_mut(id) else {
            return false;
        };
        resource.cap = cap;
        resource.amount = resource.clamp(resource.amount.clone());
        true
    }

    /// Overwrite amount and base rate, as loaded from a snapshot. The amount
    /// is clamped into `[0, cap]`.
    pub fn restore(&mut self, id: &str, amount: BigDecimal, rate: BigDecimal) -> bool {
        let Some(resource) = self.resources.get_mut(id) else {
            return false;
        };
        resource.amount = resource.clamp(amount);
        resource.generation_rate = rate.max(BigDecimal::zero());
        true
    }

    /// Base rate times the resource's multiplier set.
    pub fn passive_rate(&self, id: &str) -> BigDecimal {
        self.generation_rate(id) * self.generation_multiplier(id)
    }

    /// Advance every resource by `delta_ms`. `building_production` (already
    /// including building and prestige multipliers) is credited to the
    /// primary resource on top of its own passive rate. Returns the amount
    /// credited to the primary resource.
    pub fn apply_generation(&mut self, building_production: &BigDecimal, delta_ms: u64) -> BigDecimal {
        let seconds = millis_to_seconds(delta_ms);
        let ids: Vec<String> = self.resources.keys().cloned().collect();
        let mut primary_gain = BigDecimal::zero();
        for id in ids {
            let mut rate = self.passive_rate(&id);
            if id == self.primary {
                rate = rate + building_production;
            }
            let gain = rate * &seconds;
            if gain > BigDecimal::zero() {
                let credited = self.add(&id, &gain);
                if id == self.primary {
                    primary_gain = credited;
                }
            }
        }
        primary_gain
    }

    /// Value of one manual click.
    pub fn click_value(&self) -> BigDecimal {
        &self.base_click_power * self.click.effective()
    }

    pub fn click_multiplier(&self) -> BigDecimal {
        self.click.effective()
    }

    /// Replace the `base` click entry.
    pub fn set_click_multiplier(&mut self, factor: &BigDecimal) -> bool {
        self.click.replace(MultiplierSource::Base, factor)
    }

    /// Compound the `base` click entry, so repeated upgrades stack.
    pub fn upgrade_click_multiplier(&mut self, factor: &BigDecimal) -> bool {
        self.click.apply(MultiplierSource::Base, factor)
    }

    pub fn apply_click_bonus(&mut self, source: MultiplierSource, factor: &BigDecimal) -> bool {
        self.click.apply(source, factor)
    }

    pub fn replace_click_bonus(&mut self, source: MultiplierSource, factor: &BigDecimal) -> bool {
        self.click.replace(source, factor)
    }

    pub fn generation_multiplier(&self, id: &str) -> BigDecimal {
        self.generation
            .get(id)
            .map_or_else(BigDecimal::one, MultiplierSet::effective)
    }

    pub fn apply_generation_bonus(&mut self, id: &str, source: MultiplierSource, factor: &BigDecimal) -> bool {
        self.generation
            .get_mut(id)
            .is_some_and(|set| set.apply(source, factor))
    }

    pub fn replace_generation_bonus(&mut self, id: &str, source: MultiplierSource, factor: &BigDecimal) -> bool {
        self.generation
            .get_mut(id)
            .is_some_and(|set| set.replace(source, factor))
    }

    /// Install the prestige factor on every resource's generation set.
    pub fn set_prestige_multiplier(&mut self, factor: &BigDecimal) {
        for set in self.generation.values_mut() {
            set.replace(MultiplierSource::Prestige, factor);
        }
    }

    /// Back to configured initial amounts, rates and caps. Every multiplier
    /// set is cleared down to `base = 1`.
    pub fn reset(&mut self) {
        self.seed();
        tracing::info!("resource ledger reset to initial state");
    }
}
