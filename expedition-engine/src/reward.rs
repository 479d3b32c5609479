//! Reward index and reward amount calculation.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_EXPERIENCE, BASE_MONEY, BASE_POINTS, CLONE_TALISMAN_BASE_CHANCE,
    CLONE_TALISMAN_CHANCE_PER_INDEX, CLONE_TALISMAN_TAG_MULTIPLIER, DIFFICULTY_SCORE_BOUNDS,
    DURATION_SCORE_BOUNDS, DURATION_SCORE_WEIGHT, ITEM_RARITY_INDEX_OFFSET, MAX_ITEM_RARITY,
    REWARD_INDEX_MAX, RISK_SCORE_BOUNDS, SCORE_MAX, TOKENS_BASE, TOKENS_BONUS_TAG,
    TOKENS_DURATION_HOURS_DIVISOR, TOKENS_INDEX_DIVISOR, TOKENS_MAX, TOKENS_RANDOM_BOOST_MAX,
    WEALTH_RATE_IMPACT,
};
use crate::location::LocationType;
use crate::numbers::round_f64_to_u32;
use crate::preferences::Preference;
use crate::rng::unit_draw;

/// Rarity bounds for the item granted on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReward {
    pub min_rarity: u8,
    pub max_rarity: u8,
}

/// Everything a successful expedition pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionRewards {
    pub money: u32,
    pub experience: u32,
    pub points: u32,
    pub tokens: u32,
    pub item: ItemReward,
    pub clone_talisman_found: bool,
}

/// Inputs frozen into a persisted expedition that drive reward amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardContext {
    pub reward_index: u8,
    pub duration_minutes: u32,
    pub location_type: LocationType,
    pub preference: Preference,
    pub has_clone_talisman_bonus: bool,
    pub has_bonus_tokens: bool,
    pub player_has_clone_talisman: bool,
}

fn linear_score(value: f64, (min, max): (f64, f64)) -> f64 {
    if max <= min {
        return 0.0;
    }
    (SCORE_MAX * (value - min) / (max - min)).clamp(0.0, SCORE_MAX)
}

/// Weighted base score before the wealth multiplier; duration counts triple.
#[must_use]
pub fn base_reward_score(duration_minutes: u32, risk_rate: u8, difficulty: u8) -> f64 {
    let duration = linear_score(f64::from(duration_minutes), DURATION_SCORE_BOUNDS);
    let risk = linear_score(f64::from(risk_rate), RISK_SCORE_BOUNDS);
    let difficulty = linear_score(f64::from(difficulty), DIFFICULTY_SCORE_BOUNDS);
    duration.mul_add(DURATION_SCORE_WEIGHT, risk + difficulty)
}

/// `1 + (wealth - 1) * 0.30`; wealth 1 is neutral.
#[must_use]
pub fn wealth_multiplier(wealth_rate: f64) -> f64 {
    let wealth = if wealth_rate.is_finite() {
        wealth_rate.clamp(0.0, 2.0)
    } else {
        1.0
    };
    (wealth - 1.0).mul_add(WEALTH_RATE_IMPACT, 1.0)
}

/// Discrete 0-9 bucket computed once at selection time.
#[must_use]
pub fn calculate_reward_index(
    duration_minutes: u32,
    risk_rate: u8,
    difficulty: u8,
    wealth_rate: f64,
) -> u8 {
    let base = base_reward_score(duration_minutes, risk_rate, difficulty);
    let scaled = base * wealth_multiplier(wealth_rate);
    let rounded = round_f64_to_u32(scaled).min(u32::from(REWARD_INDEX_MAX));
    u8::try_from(rounded).unwrap_or(REWARD_INDEX_MAX)
}

fn table_value(table: &[u32; 10], reward_index: u8) -> u32 {
    table[usize::from(reward_index.min(REWARD_INDEX_MAX))]
}

/// Money, experience and points for an index, location and preference.
#[must_use]
pub fn scaled_base_rewards(
    reward_index: u8,
    location: LocationType,
    preference: Preference,
    partial: bool,
) -> (u32, u32, u32) {
    let weights = location.reward_weights();
    let pref = preference.reward_multiplier();
    let scale = |base: u32, weight: f64| {
        let amount = f64::from(base) * weight * pref;
        if partial {
            round_f64_to_u32(amount / 2.0)
        } else {
            round_f64_to_u32(amount)
        }
    };
    (
        scale(table_value(&BASE_MONEY, reward_index), weights.money),
        scale(table_value(&BASE_EXPERIENCE, reward_index), weights.experience),
        scale(table_value(&BASE_POINTS, reward_index), weights.points),
    )
}

/// Tokens ignore preference; the random boost is the only draw.
pub fn calculate_tokens<R: Rng + ?Sized>(
    reward_index: u8,
    duration_minutes: u32,
    has_bonus_tokens: bool,
    rng: &mut R,
) -> u32 {
    let boost = rng.gen_range(0..=TOKENS_RANDOM_BOOST_MAX);
    let duration_hours = duration_minutes / 60;
    let mut tokens = TOKENS_BASE
        + u32::from(reward_index) / TOKENS_INDEX_DIVISOR
        + duration_hours / TOKENS_DURATION_HOURS_DIVISOR
        + boost;
    if has_bonus_tokens {
        tokens += TOKENS_BONUS_TAG;
    }
    tokens.min(TOKENS_MAX)
}

#[must_use]
pub fn item_rarity_range(reward_index: u8) -> ItemReward {
    let index = reward_index.min(REWARD_INDEX_MAX);
    ItemReward {
        min_rarity: index.saturating_sub(ITEM_RARITY_INDEX_OFFSET).max(1),
        max_rarity: MAX_ITEM_RARITY[usize::from(index)],
    }
}

/// Drop chance for the clone talisman, capped at 1.
#[must_use]
pub fn clone_talisman_chance(reward_index: u8, tagged: bool, location: LocationType) -> f64 {
    let mut chance =
        CLONE_TALISMAN_CHANCE_PER_INDEX.mul_add(f64::from(reward_index), CLONE_TALISMAN_BASE_CHANCE);
    if tagged {
        chance *= CLONE_TALISMAN_TAG_MULTIPLIER;
    }
    (chance * location.talisman_bonus_factor()).min(1.0)
}

/// Full reward roll for a non-failed outcome.
pub fn calculate_rewards<R: Rng + ?Sized>(
    ctx: &RewardContext,
    partial: bool,
    rng: &mut R,
) -> ExpeditionRewards {
    let (money, experience, points) =
        scaled_base_rewards(ctx.reward_index, ctx.location_type, ctx.preference, partial);
    let tokens = calculate_tokens(
        ctx.reward_index,
        ctx.duration_minutes,
        ctx.has_bonus_tokens,
        rng,
    );
    let clone_talisman_found = if ctx.player_has_clone_talisman || partial {
        false
    } else {
        let chance = clone_talisman_chance(
            ctx.reward_index,
            ctx.has_clone_talisman_bonus,
            ctx.location_type,
        );
        unit_draw(rng) < chance
    };

    ExpeditionRewards {
        money,
        experience,
        points,
        tokens,
        item: item_rarity_range(ctx.reward_index),
        clone_talisman_found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn reward_index_covers_extremes() {
        assert_eq!(calculate_reward_index(10, 0, 0, 1.0), 0);
        assert_eq!(calculate_reward_index(2_880, 100, 100, 1.0), 9);
        assert_eq!(calculate_reward_index(2_880, 100, 100, 2.0), 9);
        assert_eq!(calculate_reward_index(2_880, 100, 100, 0.0), 9);
        // 3 + 3 = 6 before wealth
        assert_eq!(calculate_reward_index(10, 100, 100, 0.0), 4);
        assert_eq!(calculate_reward_index(10, 100, 100, 2.0), 8);
    }

    #[test]
    fn neutral_wealth_leaves_base_unchanged() {
        for duration in [10, 95, 600, 1_445, 2_880] {
            for risk in [0, 33, 70, 100] {
                for difficulty in [0, 50, 100] {
                    let base = base_reward_score(duration, risk, difficulty).round().min(9.0);
                    assert_eq!(
                        f64::from(calculate_reward_index(duration, risk, difficulty, 1.0)),
                        base
                    );
                }
            }
        }
    }

    #[test]
    fn reward_index_is_monotonic_per_dimension() {
        for wealth in [0.0, 0.55, 1.0, 1.8, 2.0] {
            let mut previous = 0;
            for duration in (10..=2_880).step_by(35) {
                let index = calculate_reward_index(duration, 40, 60, wealth);
                assert!(index >= previous);
                assert!(index <= 9);
                previous = index;
            }
            let mut previous = 0;
            for risk in 0..=100 {
                let index = calculate_reward_index(800, risk, 60, wealth);
                assert!(index >= previous);
                previous = index;
            }
            let mut previous = 0;
            for difficulty in 0..=100 {
                let index = calculate_reward_index(800, 40, difficulty, wealth);
                assert!(index >= previous);
                previous = index;
            }
        }
    }

    #[test]
    fn preference_and_location_compose_multiplicatively() {
        let (liked_money, _, _) =
            scaled_base_rewards(5, LocationType::Ruins, Preference::Liked, false);
        let (neutral_money, _, _) =
            scaled_base_rewards(5, LocationType::Ruins, Preference::Neutral, false);
        let (disliked_money, _, _) =
            scaled_base_rewards(5, LocationType::Ruins, Preference::Disliked, false);
        // 320 * 2.2 = 704
        assert_eq!(liked_money, 704);
        assert_eq!(neutral_money, 563);
        assert_eq!(disliked_money, 176);
    }

    #[test]
    fn partial_success_halves_rounded() {
        let full = scaled_base_rewards(3, LocationType::Forest, Preference::Neutral, false);
        let partial = scaled_base_rewards(3, LocationType::Forest, Preference::Neutral, true);
        // money 160 * 1.0 * 0.8 = 128 -> 64; xp 220 * 1.2 * 0.8 = 211.2 -> 105.6 -> 106
        assert_eq!(full.0, 128);
        assert_eq!(partial.0, 64);
        assert_eq!(partial.1, 106);
    }

    #[test]
    fn tokens_are_capped_and_tagged() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            let small = calculate_tokens(0, 30, false, &mut rng);
            assert!((1..=2).contains(&small));
            let large = calculate_tokens(9, 2_880, true, &mut rng);
            assert_eq!(large, TOKENS_MAX);
        }
    }

    #[test]
    fn item_rarity_range_tracks_index() {
        assert_eq!(
            item_rarity_range(0),
            ItemReward {
                min_rarity: 1,
                max_rarity: 5
            }
        );
        assert_eq!(item_rarity_range(4).max_rarity, 8);
        assert_eq!(
            item_rarity_range(9),
            ItemReward {
                min_rarity: 5,
                max_rarity: 8
            }
        );
    }

    #[test]
    fn clone_talisman_chance_applies_tag_and_location() {
        let base = clone_talisman_chance(2, false, LocationType::Plains);
        assert!((base - 0.015).abs() < 1e-12);
        let tagged = clone_talisman_chance(2, true, LocationType::Plains);
        assert!((tagged - 0.15).abs() < 1e-12);
        let cave = clone_talisman_chance(2, true, LocationType::Cave);
        assert!((cave - 0.30).abs() < 1e-12);
        assert!(clone_talisman_chance(9, true, LocationType::Ruins) <= 1.0);
    }

    #[test]
    fn partial_or_owned_talisman_never_drops() {
        let mut rng = SmallRng::seed_from_u64(77);
        let ctx = RewardContext {
            reward_index: 9,
            duration_minutes: 2_000,
            location_type: LocationType::Ruins,
            preference: Preference::Liked,
            has_clone_talisman_bonus: true,
            has_bonus_tokens: false,
            player_has_clone_talisman: false,
        };
        for _ in 0..200 {
            assert!(!calculate_rewards(&ctx, true, &mut rng).clone_talisman_found);
        }
        let owned = RewardContext {
            player_has_clone_talisman: true,
            ..ctx
        };
        for _ in 0..200 {
            assert!(!calculate_rewards(&owned, false, &mut rng).clone_talisman_found);
        }
        // index 9, tagged, ruins: chance capped at 1
        assert!(calculate_rewards(&ctx, false, &mut rng).clone_talisman_found);
    }
}
