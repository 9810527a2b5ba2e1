//! Composable multiplier sets.
//!
//! A [`MultiplierSet`] maps a fixed vocabulary of bonus sources to positive
//! decimal factors. The effective multiplier is the product of every entry,
//! so the order in which bonuses arrive never matters.

use std::collections::BTreeMap;
use std::fmt;

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};

/// Where a factor came from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MultiplierSource {
    Base,
    Upgrade(String),
    Achievement,
    Prestige,
}

impl fmt::Display for MultiplierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiplierSource::Base => write!(f, "base"),
            MultiplierSource::Upgrade(id) => write!(f, "upgrade:{id}"),
            MultiplierSource::Achievement => write!(f, "achievement"),
            MultiplierSource::Prestige => write!(f, "prestige"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultiplierSet {
    factors: BTreeMap<MultiplierSource, BigDecimal>,
}

impl MultiplierSet {
    /// A set seeded with `base = 1`.
    pub fn new() -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(MultiplierSource::Base, BigDecimal::one());
        Self { factors }
    }

    /// Compound `factor` onto the entry for `source`. Non-positive factors are
    /// refused and leave the set unchanged.
    pub fn apply(&mut self, source: MultiplierSource, factor: &BigDecimal) -> bool {
        if *factor <= BigDecimal::zero() {
            tracing::warn!("refusing non-positive factor {factor} for {source}");
            return false;
        }
        let entry = self.factors.entry(source).or_insert_with(BigDecimal::one);
        *entry = &*entry * factor;
        true
    }

    /// Overwrite the entry for `source`. Used for values recomputed from an
    /// absolute total (prestige) rather than accumulated.
    pub fn replace(&mut self, source: MultiplierSource, factor: &BigDecimal) -> bool {
        if *factor <= BigDecimal::zero() {
            tracing::warn!("refusing non-positive factor {factor} for {source}");
            return false;
        }
        self.factors.insert(source, factor.clone());
        true
    }

    pub fn factor(&self, source: &MultiplierSource) -> Option<&BigDecimal> {
        self.factors.get(source)
    }

    /// Product of every factor. An empty set yields 1.
    pub fn effective(&self) -> BigDecimal {
        self.factors
            .values()
            .fold(BigDecimal::one(), |acc, f| acc * f)
    }

    /// Drop every entry and re-seed `base = 1`.
    pub fn clear(&mut self) {
        self.factors.clear();
        self.factors.insert(MultiplierSource::Base, BigDecimal::one());
    }
}

impl Default for MultiplierSet {
    fn default() -> Self {
        Self::new()
    }
}
