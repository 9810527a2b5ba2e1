//! Prestige: trade the primary stockpile for a permanent production multiplier.
//!
//! Points accumulate across prestiges and never decrease. The multiplier is
//! always recomputed from the absolute point total, so it replaces (rather
//! than compounds) the previous prestige entry. Building counts survive.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Zero};
use tracing::{info, warn};

use super::buildings::BuildingRegistry;
use super::config::PrestigeConfig;
use super::ledger::ResourceLedger;

/// Fractional digits kept when converting a stockpile into points.
const RATIO_SCALE: i64 = 2;

#[derive(Clone, Debug, PartialEq)]
pub enum PrestigeOutcome {
    NotEligible {
        required: BigDecimal,
        current: BigDecimal,
    },
    Prestiged {
        points_gained: BigDecimal,
        total_points: BigDecimal,
        multiplier: BigDecimal,
    },
}

/// `numerator / denominator` truncated toward zero at `scale` fractional
/// digits. Both operands are non-negative and the denominator is non-zero.
fn truncated_ratio(numerator: &BigDecimal, denominator: &BigDecimal, scale: i64) -> BigDecimal {
    let (n, n_scale) = numerator.as_bigint_and_exponent();
    let (d, d_scale) = denominator.as_bigint_and_exponent();
    // n·10^-ns / (d·10^-ds) · 10^scale = n·10^(ds - ns + scale) / d
    let shift = d_scale - n_scale + scale;
    let (n, d) = if shift >= 0 {
        (n * pow10(shift), d)
    } else {
        (n, d * pow10(-shift))
    };
    BigDecimal::new(n / d, scale)
}

fn pow10(exponent: i64) -> BigInt {
    BigInt::from(10).pow(u32::try_from(exponent).unwrap_or(u32::MAX))
}

#[derive(Clone, Debug)]
pub struct PrestigeEngine {
    config: PrestigeConfig,
    points: BigDecimal,
    multiplier: BigDecimal,
}

impl PrestigeEngine {
    pub fn new(config: &PrestigeConfig) -> Self {
        Self {
            config: config.clone(),
            points: BigDecimal::zero(),
            multiplier: BigDecimal::one(),
        }
    }

    pub fn points(&self) -> &BigDecimal {
        &self.points
    }

    pub fn multiplier(&self) -> &BigDecimal {
        &self.multiplier
    }

    pub fn can_prestige(&self, primary_amount: &BigDecimal) -> bool {
        *primary_amount >= self.config.requirement
    }

    /// `floor(amount / requirement, 2dp) × points_rate`. Pure; callers check
    /// eligibility separately.
    pub fn points_for(&self, primary_amount: &BigDecimal) -> BigDecimal {
        if *primary_amount <= BigDecimal::zero() || self.config.requirement <= BigDecimal::zero() {
            return BigDecimal::zero();
        }
        truncated_ratio(primary_amount, &self.config.requirement, RATIO_SCALE) * &self.config.points_rate
    }

    /// `1 + points × per_point_bonus`.
    pub fn multiplier_for(&self, points: &BigDecimal) -> BigDecimal {
        BigDecimal::one() + points * &self.config.per_point_bonus
    }

    /// Convert the primary stockpile into points, reset the ledger and push
    /// the new multiplier to ledger and buildings. Building counts and
    /// efficiency are left alone.
    pub fn prestige(&mut self, ledger: &mut ResourceLedger, buildings: &mut BuildingRegistry) -> PrestigeOutcome {
        let current = ledger.primary_amount();
        if !self.can_prestige(&current) {
            warn!(
                "prestige refused: {current} of {} required",
                self.config.requirement
            );
            return PrestigeOutcome::NotEligible {
                required: self.config.requirement.clone(),
                current,
            };
        }

        let points_gained = self.points_for(&current);
        self.points = &self.points + &points_gained;
        self.multiplier = self.multiplier_for(&self.points);

        ledger.reset();
        self.install(ledger, buildings);

        info!(
            "prestige completed: gained {points_gained} points, total {}, multiplier {}",
            self.points, self.multiplier
        );
        PrestigeOutcome::Prestiged {
            points_gained,
            total_points: self.points.clone(),
            multiplier: self.multiplier.clone(),
        }
    }

    /// Push the current multiplier as the `prestige` entry.
    pub fn install(&self, ledger: &mut ResourceLedger, buildings: &mut BuildingRegistry) {
        ledger.set_prestige_multiplier(&self.multiplier);
        buildings.set_prestige_multiplier(&self.multiplier);
    }

    /// Load a saved point total. The multiplier is derived from it; a saved
    /// multiplier that disagrees is ignored.
    pub fn restore(&mut self, points: BigDecimal, saved_multiplier: Option<&BigDecimal>) {
        self.points = points.max(BigDecimal::zero());
        self.multiplier = self.multiplier_for(&self.points);
        if let Some(saved) = saved_multiplier {
            if *saved != self.multiplier {
                warn!(
                    "saved prestige multiplier {saved} disagrees with {} derived from {} points",
                    self.multiplier, self.points
                );
            }
        }
    }
}
