//! Offline progress: a single lump-sum grant computed at load time.
//!
//! Uses the production rate at load time, not an integral over changing
//! rates, so the same save and the same gap always grant the same amount.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use tracing::info;

use super::config::OfflineConfig;
use super::ledger::{millis_to_seconds, ResourceLedger};

/// What an offline catch-up granted.
#[derive(Clone, Debug, PartialEq)]
pub struct OfflineReport {
    /// Gap that was actually credited, after clamping.
    pub credited_ms: u64,
    pub earnings: BigDecimal,
}

#[derive(Clone, Debug)]
pub struct OfflineProgressCalculator {
    max_offline_ms: u64,
    rate: BigDecimal,
}

impl OfflineProgressCalculator {
    pub fn new(config: &OfflineConfig) -> Self {
        Self {
            max_offline_ms: config.max_offline_ms,
            rate: config.rate.clone(),
        }
    }

    /// Clamp a raw gap into `[0, max_offline_ms]`. Negative gaps (clock moved
    /// backwards) credit nothing.
    pub fn clamp_gap(&self, offline_ms: i64) -> u64 {
        u64::try_from(offline_ms).unwrap_or(0).min(self.max_offline_ms)
    }

    /// `production × seconds × rate` for the clamped gap.
    pub fn earnings(&self, production: &BigDecimal, offline_ms: i64) -> OfflineReport {
        let credited_ms = self.clamp_gap(offline_ms);
        let earnings = if *production > BigDecimal::zero() {
            production * millis_to_seconds(credited_ms) * &self.rate
        } else {
            BigDecimal::zero()
        };
        OfflineReport {
            credited_ms,
            earnings,
        }
    }

    /// Compute and credit the grant to the primary resource. The report
    /// carries what was actually credited, which may be less than the raw
    /// earnings if the resource is capped.
    pub fn apply(&self, ledger: &mut ResourceLedger, production: &BigDecimal, offline_ms: i64) -> OfflineReport {
        let mut report = self.earnings(production, offline_ms);
        let primary = ledger.primary_id().to_string();
        report.earnings = ledger.add(&primary, &report.earnings);
        info!(
            "offline progress: {} ms credited, {} {primary} granted",
            report.credited_ms, report.earnings
        );
        report
    }
}
