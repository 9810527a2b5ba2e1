//! One-shot upgrades bought with the primary resource.
//!
//! An owned upgrade contributes its factor under the `upgrade:<id>` source of
//! the click set or the primary resource's generation set. Upgrades do not
//! survive a prestige.

use std::collections::BTreeSet;

use bigdecimal::BigDecimal;
use tracing::{debug, info, warn};

use super::config::{EconomyConfig, UpgradeConfig, UpgradeEffect};
use super::ledger::ResourceLedger;
use super::multiplier::MultiplierSource;

#[derive(Clone, Debug, PartialEq)]
pub struct Upgrade {
    pub id: String,
    pub name: String,
    pub cost: BigDecimal,
    pub effect: UpgradeEffect,
    pub purchased: bool,
}

impl Upgrade {
    fn new(config: &UpgradeConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            cost: config.cost.clone(),
            effect: config.effect.clone(),
            purchased: false,
        }
    }

    fn source(&self) -> MultiplierSource {
        MultiplierSource::Upgrade(self.id.clone())
    }

    fn install(&self, ledger: &mut ResourceLedger) {
        match &self.effect {
            UpgradeEffect::Click(factor) => {
                ledger.replace_click_bonus(self.source(), factor);
            }
            UpgradeEffect::Generation(factor) => {
                let primary = ledger.primary_id().to_string();
                ledger.replace_generation_bonus(&primary, self.source(), factor);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpgradeOutcome {
    Purchased { cost: BigDecimal },
    AlreadyOwned,
    CannotAfford { cost: BigDecimal },
    UnknownUpgrade,
}

#[derive(Clone, Debug)]
pub struct UpgradeCatalog {
    upgrades: Vec<Upgrade>,
}

impl UpgradeCatalog {
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            upgrades: config.upgrades.iter().map(Upgrade::new).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Upgrade> {
        self.upgrades.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Upgrade> {
        self.upgrades.iter().find(|u| u.id == id)
    }

    pub fn owned(&self) -> BTreeSet<String> {
        self.upgrades
            .iter()
            .filter(|u| u.purchased)
            .map(|u| u.id.clone())
            .collect()
    }

    /// Try to buy an upgrade by id.
    pub fn purchase(&mut self, id: &str, ledger: &mut ResourceLedger) -> UpgradeOutcome {
        let primary = ledger.primary_id().to_string();
        let Some(upgrade) = self.upgrades.iter_mut().find(|u| u.id == id) else {
            debug!("purchase of unknown upgrade {id}");
            return UpgradeOutcome::UnknownUpgrade;
        };
        if upgrade.purchased {
            return UpgradeOutcome::AlreadyOwned;
        }
        if !ledger.spend(&primary, &upgrade.cost) {
            return UpgradeOutcome::CannotAfford {
                cost: upgrade.cost.clone(),
            };
        }
        upgrade.purchased = true;
        upgrade.install(ledger);
        info!("upgrade {} applied", upgrade.name);
        UpgradeOutcome::Purchased {
            cost: upgrade.cost.clone(),
        }
    }

    /// Re-install every owned upgrade's factor. Safe to repeat: entries are
    /// replaced, not compounded.
    pub fn reinstall(&self, ledger: &mut ResourceLedger) {
        for upgrade in self.upgrades.iter().filter(|u| u.purchased) {
            upgrade.install(ledger);
        }
    }

    /// Forget every purchase.
    pub fn reset(&mut self) {
        for upgrade in &mut self.upgrades {
            upgrade.purchased = false;
        }
    }

    /// Mark upgrades owned from a snapshot. Unknown ids are skipped.
    pub fn restore<'a>(&mut self, owned: impl IntoIterator<Item = &'a String>) {
        for id in owned {
            match self.upgrades.iter_mut().find(|u| &u.id == id) {
                Some(u) => u.purchased = true,
                None => warn!("snapshot names unknown upgrade {id}, skipping"),
            }
        }
    }
}
