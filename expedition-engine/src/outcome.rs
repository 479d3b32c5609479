//! Outcome resolution: failure, partial success or full success.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::OutcomeConfig;
use crate::preferences::Preference;
use crate::reward::{ExpeditionRewards, RewardContext, calculate_rewards};
use crate::rng::unit_draw;

/// Coarse classification of a resolved expedition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    TotalFailure,
    PartialSuccess,
    Success,
}

/// Result of one resolution, turned into side effects by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionOutcome {
    pub total_failure: bool,
    pub partial_success: bool,
    pub love_change: i32,
    pub rewards: Option<ExpeditionRewards>,
}

impl ExpeditionOutcome {
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        if self.total_failure {
            OutcomeKind::TotalFailure
        } else if self.partial_success {
            OutcomeKind::PartialSuccess
        } else {
            OutcomeKind::Success
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        !self.total_failure
    }
}

/// Classify the two rolls without touching rewards.
#[must_use]
pub fn classify(
    effective_risk: f64,
    failure_roll: f64,
    partial_roll: f64,
    config: &OutcomeConfig,
) -> OutcomeKind {
    if failure_roll * 100.0 < effective_risk {
        OutcomeKind::TotalFailure
    } else if partial_roll < config.partial_chance(effective_risk) {
        OutcomeKind::PartialSuccess
    } else {
        OutcomeKind::Success
    }
}

#[must_use]
pub const fn love_change(kind: OutcomeKind, preference: Preference, config: &OutcomeConfig) -> i32 {
    match kind {
        OutcomeKind::TotalFailure => config.love_failure,
        OutcomeKind::PartialSuccess => config.love_partial,
        OutcomeKind::Success => match preference {
            Preference::Liked => config.love_success * 2,
            Preference::Neutral | Preference::Disliked => config.love_success,
        },
    }
}

/// Resolve an expedition. Draws come only from `rng`; the same stream and
/// inputs always produce the same outcome.
pub fn resolve_outcome<R: Rng + ?Sized>(
    effective_risk: f64,
    reward_ctx: &RewardContext,
    config: &OutcomeConfig,
    rng: &mut R,
) -> ExpeditionOutcome {
    let failure_roll = unit_draw(rng);
    let partial_roll = unit_draw(rng);
    let kind = classify(effective_risk, failure_roll, partial_roll, config);
    log::debug!(
        "outcome roll {failure_roll:.4} / {partial_roll:.4} against risk {effective_risk:.1}: {kind:?}"
    );

    let rewards = match kind {
        OutcomeKind::TotalFailure => None,
        OutcomeKind::PartialSuccess => Some(calculate_rewards(reward_ctx, true, rng)),
        OutcomeKind::Success => Some(calculate_rewards(reward_ctx, false, rng)),
    };

    ExpeditionOutcome {
        total_failure: kind == OutcomeKind::TotalFailure,
        partial_success: kind == OutcomeKind::PartialSuccess,
        love_change: love_change(kind, reward_ctx.preference, config),
        rewards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationType;
    use rand::RngCore;

    struct StubRng {
        values: Vec<u64>,
        cursor: usize,
    }

    impl StubRng {
        /// Each value is returned as the high bits of a u64, so a ratio of
        /// `n / 1000` yields a unit draw of roughly `n / 1000`.
        fn from_ratios(ratios: &[u64]) -> Self {
            Self {
                values: ratios.iter().map(|r| r * (u64::MAX / 1_000)).collect(),
                cursor: 0,
            }
        }
    }

    impl RngCore for StubRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let value = self.values[self.cursor % self.values.len()];
            self.cursor += 1;
            value
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let value = self.next_u64().to_le_bytes();
            for (idx, byte) in dest.iter_mut().enumerate() {
                *byte = value[idx % value.len()];
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn reward_ctx(preference: Preference) -> RewardContext {
        RewardContext {
            reward_index: 4,
            duration_minutes: 600,
            location_type: LocationType::Forest,
            preference,
            has_clone_talisman_bonus: false,
            has_bonus_tokens: false,
            player_has_clone_talisman: true,
        }
    }

    #[test]
    fn classify_orders_failure_then_partial() {
        let config = OutcomeConfig::default();
        assert_eq!(classify(30.0, 0.29, 0.99, &config), OutcomeKind::TotalFailure);
        assert_eq!(classify(30.0, 0.30, 0.05, &config), OutcomeKind::PartialSuccess);
        assert_eq!(classify(30.0, 0.30, 0.99, &config), OutcomeKind::Success);
        assert_eq!(classify(0.0, 0.0, 0.99, &config), OutcomeKind::Success);
        assert_eq!(classify(100.0, 0.999, 0.0, &config), OutcomeKind::TotalFailure);
    }

    #[test]
    fn love_change_doubles_only_for_liked_success() {
        let config = OutcomeConfig::default();
        assert_eq!(love_change(OutcomeKind::Success, Preference::Liked, &config), 6);
        assert_eq!(love_change(OutcomeKind::Success, Preference::Neutral, &config), 3);
        assert_eq!(love_change(OutcomeKind::PartialSuccess, Preference::Liked, &config), 1);
        assert_eq!(love_change(OutcomeKind::TotalFailure, Preference::Liked, &config), -3);
    }

    #[test]
    fn failure_carries_no_rewards() {
        let config = OutcomeConfig::default();
        let mut rng = StubRng::from_ratios(&[100, 900]);
        let outcome = resolve_outcome(50.0, &reward_ctx(Preference::Neutral), &config, &mut rng);
        assert!(outcome.total_failure);
        assert_eq!(outcome.kind(), OutcomeKind::TotalFailure);
        assert!(outcome.rewards.is_none());
        assert_eq!(outcome.love_change, -3);
    }

    #[test]
    fn partial_success_pays_half() {
        let config = OutcomeConfig::default();
        let ctx = reward_ctx(Preference::Neutral);
        let mut partial_rng = StubRng::from_ratios(&[900, 10, 0]);
        let partial = resolve_outcome(20.0, &ctx, &config, &mut partial_rng);
        let mut full_rng = StubRng::from_ratios(&[900, 990, 0]);
        let full = resolve_outcome(20.0, &ctx, &config, &mut full_rng);

        assert!(partial.partial_success && !partial.total_failure);
        assert!(!full.partial_success && full.is_success());
        let partial_money = partial.rewards.map(|r| r.money).unwrap_or_default();
        let full_money = full.rewards.map(|r| r.money).unwrap_or_default();
        assert_eq!(partial_money, (full_money + 1) / 2);
        assert_eq!(partial.love_change, 1);
        assert_eq!(full.love_change, 3);
    }

    #[test]
    fn identical_streams_resolve_identically() {
        use rand::SeedableRng;
        use rand::rngs::SmallRng;

        let config = OutcomeConfig::default();
        let ctx = reward_ctx(Preference::Liked);
        for seed in 0..50 {
            let mut a = SmallRng::seed_from_u64(seed);
            let mut b = SmallRng::seed_from_u64(seed);
            assert_eq!(
                resolve_outcome(35.0, &ctx, &config, &mut a),
                resolve_outcome(35.0, &ctx, &config, &mut b)
            );
        }
    }
}
