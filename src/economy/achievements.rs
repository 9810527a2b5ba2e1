//! Milestone achievements.
//!
//! Each achievement is locked until its metric crosses the threshold, then
//! unlocked for good. The reward is dispatched exactly once, at the moment
//! of unlock, through a [`RewardSink`]. Events only re-evaluate the metric
//! family they can affect: a click never scans building achievements.

use std::collections::{BTreeSet, HashMap};

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};
use tracing::{info, warn};

use super::config::{AchievementConfig, EconomyConfig, Metric, MetricFamily, RewardKind};

/// The only mutation an achievement may perform on the rest of the economy.
pub trait RewardSink {
    fn apply_reward(&mut self, kind: RewardKind, factor: &BigDecimal);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub metric: Metric,
    pub reward: RewardKind,
    pub factor: BigDecimal,
    pub unlocked: bool,
}

impl Achievement {
    fn new(config: &AchievementConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            metric: config.metric.clone(),
            reward: config.reward,
            factor: config.factor.clone(),
            unlocked: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AchievementTracker {
    achievements: Vec<Achievement>,
    by_family: HashMap<MetricFamily, Vec<usize>>,
    unlocked: BTreeSet<String>,
    total_clicks: u64,
    total_gained: BigDecimal,
}

impl AchievementTracker {
    pub fn new(config: &EconomyConfig) -> Self {
        let achievements: Vec<Achievement> = config.achievements.iter().map(Achievement::new).collect();
        let mut by_family: HashMap<MetricFamily, Vec<usize>> = HashMap::new();
        for (i, a) in achievements.iter().enumerate() {
            by_family.entry(a.metric.family()).or_default().push(i);
        }
        Self {
            achievements,
            by_family,
            unlocked: BTreeSet::new(),
            total_clicks: 0,
            total_gained: BigDecimal::zero(),
        }
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn unlocked(&self) -> &BTreeSet<String> {
        &self.unlocked
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    pub fn total_clicks(&self) -> u64 {
        self.total_clicks
    }

    pub fn total_gained(&self) -> &BigDecimal {
        &self.total_gained
    }

    /// Count one click and re-check click achievements.
    pub fn register_click(&mut self, sink: &mut dyn RewardSink) -> Vec<String> {
        self.total_clicks = self.total_clicks.saturating_add(1);
        self.evaluate(MetricFamily::Clicks, 0, sink)
    }

    /// Accumulate a resource gain and re-check gain achievements.
    /// Non-positive amounts are ignored.
    pub fn add_resource_gain(&mut self, amount: &BigDecimal, sink: &mut dyn RewardSink) -> Vec<String> {
        if *amount <= BigDecimal::zero() {
            return Vec::new();
        }
        self.total_gained = &self.total_gained + amount;
        self.evaluate(MetricFamily::ResourceGain, 0, sink)
    }

    /// Re-check building-count achievements.
    pub fn check_buildings(&mut self, total_buildings: u64, sink: &mut dyn RewardSink) -> Vec<String> {
        self.evaluate(MetricFamily::BuildingCount, total_buildings, sink)
    }

    /// Re-check every family.
    pub fn check_all(&mut self, total_buildings: u64, sink: &mut dyn RewardSink) -> Vec<String> {
        let mut unlocked = self.evaluate(MetricFamily::Clicks, total_buildings, sink);
        unlocked.extend(self.evaluate(MetricFamily::ResourceGain, total_buildings, sink));
        unlocked.extend(self.evaluate(MetricFamily::BuildingCount, total_buildings, sink));
        unlocked
    }

    fn evaluate(&mut self, family: MetricFamily, total_buildings: u64, sink: &mut dyn RewardSink) -> Vec<String> {
        let Some(indices) = self.by_family.get(&family) else {
            return Vec::new();
        };
        let mut newly = Vec::new();
        for &i in indices {
            let achievement = &mut self.achievements[i];
            if achievement.unlocked || self.unlocked.contains(&achievement.id) {
                continue;
            }
            let met = match &achievement.metric {
                Metric::Clicks(threshold) => self.total_clicks >= *threshold,
                Metric::ResourceGain(threshold) => self.total_gained >= *threshold,
                Metric::BuildingCount(threshold) => total_buildings >= *threshold,
            };
            if !met {
                continue;
            }
            achievement.unlocked = true;
            self.unlocked.insert(achievement.id.clone());
            info!("achievement unlocked: {}", achievement.id);
            sink.apply_reward(achievement.reward, &achievement.factor);
            newly.push(achievement.id.clone());
        }
        newly
    }

    /// Product of reward factors of unlocked achievements with `kind`.
    pub fn reward_product(&self, kind: RewardKind) -> BigDecimal {
        self.achievements
            .iter()
            .filter(|a| a.unlocked && a.reward == kind)
            .fold(BigDecimal::one(), |acc, a| acc * &a.factor)
    }

    /// Load counters and the unlocked set from a snapshot without dispatching
    /// rewards. Ids not in the catalog are dropped.
    pub fn restore<'a>(
        &mut self,
        unlocked: impl IntoIterator<Item = &'a String>,
        total_clicks: u64,
        total_gained: BigDecimal,
    ) {
        self.total_clicks = total_clicks;
        self.total_gained = total_gained.max(BigDecimal::zero());
        for id in unlocked {
            match self.achievements.iter_mut().find(|a| &a.id == id) {
                Some(a) => {
                    a.unlocked = true;
                    self.unlocked.insert(id.clone());
                }
                None => warn!("snapshot names unknown achievement {id}, skipping"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::config::dec;

    #[derive(Default)]
    struct Recorder(Vec<(RewardKind, BigDecimal)>);

    impl RewardSink for Recorder {
        fn apply_reward(&mut self, kind: RewardKind, factor: &BigDecimal) {
            self.0.push((kind, factor.clone()));
        }
    }

    fn small_config() -> EconomyConfig {
        let mut config = EconomyConfig::default();
        config.achievements = vec![
            AchievementConfig {
                id: "clicks_3".into(),
                name: "three".into(),
                metric: Metric::Clicks(3),
                reward: RewardKind::ClickBonus,
                factor: dec(11, 1),
            },
            AchievementConfig {
                id: "gain_10".into(),
                name: "ten".into(),
                metric: Metric::ResourceGain(dec(10, 0)),
                reward: RewardKind::GenerationBonus,
                factor: dec(105, 2),
            },
            AchievementConfig {
                id: "buildings_2".into(),
                name: "two".into(),
                metric: Metric::BuildingCount(2),
                reward: RewardKind::BuildingEfficiencyBonus,
                factor: dec(2, 0),
            },
        ];
        config
    }

    #[test]
    fn click_achievement_unlocks_at_threshold() {
        let mut tracker = AchievementTracker::new(&small_config());
        let mut sink = Recorder::default();
        assert!(tracker.register_click(&mut sink).is_empty());
        assert!(tracker.register_click(&mut sink).is_empty());
        assert_eq!(tracker.register_click(&mut sink), vec!["clicks_3".to_string()]);
        assert_eq!(sink.0, vec![(RewardKind::ClickBonus, dec(11, 1))]);
    }

    #[test]
    fn reward_applied_once() {
        let mut tracker = AchievementTracker::new(&small_config());
        let mut sink = Recorder::default();
        for _ in 0..10 {
            tracker.register_click(&mut sink);
        }
        tracker.check_all(0, &mut sink);
        tracker.check_all(0, &mut sink);
        assert_eq!(sink.0.len(), 1);
        assert_eq!(tracker.unlocked().len(), 1);
    }

    #[test]
    fn gain_ignores_non_positive() {
        let mut tracker = AchievementTracker::new(&small_config());
        let mut sink = Recorder::default();
        tracker.add_resource_gain(&dec(-50, 0), &mut sink);
        tracker.add_resource_gain(&BigDecimal::zero(), &mut sink);
        assert_eq!(tracker.total_gained(), &BigDecimal::zero());
        tracker.add_resource_gain(&dec(6, 0), &mut sink);
        assert!(!tracker.is_unlocked("gain_10"));
        tracker.add_resource_gain(&dec(4, 0), &mut sink);
        assert!(tracker.is_unlocked("gain_10"));
    }

    #[test]
    fn click_event_does_not_unlock_other_families() {
        let mut tracker = AchievementTracker::new(&small_config());
        let mut sink = Recorder::default();
        // Building count is met, but only click achievements are evaluated.
        for _ in 0..3 {
            tracker.register_click(&mut sink);
        }
        assert!(!tracker.is_unlocked("buildings_2"));
        tracker.check_buildings(2, &mut sink);
        assert!(tracker.is_unlocked("buildings_2"));
    }

    #[test]
    fn reward_product_by_kind() {
        let mut tracker = AchievementTracker::new(&small_config());
        let mut sink = Recorder::default();
        tracker.check_buildings(5, &mut sink);
        assert_eq!(tracker.reward_product(RewardKind::BuildingEfficiencyBonus), dec(2, 0));
        assert_eq!(tracker.reward_product(RewardKind::ClickBonus), BigDecimal::one());
    }

    #[test]
    fn restore_marks_without_rewarding() {
        let mut tracker = AchievementTracker::new(&small_config());
        let mut sink = Recorder::default();
        let ids = vec!["clicks_3".to_string(), "bogus".to_string()];
        tracker.restore(&ids, 7, dec(3, 0));
        assert!(tracker.is_unlocked("clicks_3"));
        assert!(!tracker.is_unlocked("bogus"));
        assert_eq!(tracker.total_clicks(), 7);
        tracker.register_click(&mut sink);
        assert!(sink.0.is_empty());
    }
}
