//! Expedition option generation and terrain risk sampling.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BONUS_TOKENS_TAG_ODDS, CLONE_TALISMAN_TAG_ODDS, DISPLAY_DURATION_STEP_MINUTES,
    LONG_DURATION_MINUTES, MEDIUM_DURATION_MINUTES, OPTIONS_PER_SET, PET_SPEED_CAP,
    PET_SPEED_DURATION_FACTOR, SHORT_DURATION_MINUTES, WEALTH_RATE_MAX,
};
use crate::food::food_required;
use crate::location::{LocationType, MapLink, MapLocation};
use crate::numbers::{round_f64_to_pct, round_f64_to_u32};
use crate::reward::calculate_reward_index;

/// Duration band an option is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBand {
    Short,
    Medium,
    Long,
}

impl DurationBand {
    #[must_use]
    pub const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Short => SHORT_DURATION_MINUTES,
            Self::Medium => MEDIUM_DURATION_MINUTES,
            Self::Long => LONG_DURATION_MINUTES,
        }
    }
}

/// A proposed, not yet confirmed expedition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpeditionOption {
    pub id: u64,
    /// Real duration after the pet's speed modifier.
    pub duration_minutes: u32,
    pub display_duration_minutes: u32,
    pub risk_rate: u8,
    pub difficulty: u8,
    pub wealth_rate: f64,
    pub location_type: LocationType,
    pub map_location_id: Option<u32>,
    /// Rations needed to fully supply the expedition.
    pub food_cost: u32,
    pub reward_index: u8,
    pub is_distant: bool,
    pub has_clone_talisman_bonus: bool,
    pub has_bonus_tokens: bool,
}

/// Everything the generator needs to know about the requesting player.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub current_link: &'a MapLink,
    pub distant_candidates: &'a [MapLocation],
    pub has_clone_talisman: bool,
    pub pet_speed: u32,
}

/// Pure mapping from a uniform draw to a risk percentage.
#[must_use]
pub fn risk_from_unit(location: LocationType, unit: f64) -> u8 {
    let u = if unit.is_nan() { 0.0 } else { unit.clamp(0.0, 1.0) };
    round_f64_to_pct(100.0 * u.powf(1.0 / location.risk_skew()))
}

/// Draw a terrain-skewed risk value.
pub fn sample_risk<R: Rng + ?Sized>(location: LocationType, rng: &mut R) -> u8 {
    risk_from_unit(location, rng.gen_range(0.0..=1.0))
}

/// Scale a displayed duration by the pet's speed.
#[must_use]
pub fn speed_adjusted_duration(display_minutes: u32, pet_speed: u32) -> u32 {
    let speed = f64::from(pet_speed.min(PET_SPEED_CAP));
    let factor = 1.0 - speed * PET_SPEED_DURATION_FACTOR;
    round_f64_to_u32(f64::from(display_minutes) * factor).max(SHORT_DURATION_MINUTES.0)
}

fn snap_display_duration(minutes: u32) -> u32 {
    let step = DISPLAY_DURATION_STEP_MINUTES;
    let snapped = (minutes + step / 2) / step * step;
    snapped.max(SHORT_DURATION_MINUTES.0)
}

/// Produce the three options offered on a status check.
pub fn generate_options<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    rng: &mut R,
) -> Vec<ExpeditionOption> {
    let mut options = Vec::with_capacity(OPTIONS_PER_SET);

    let slots = [
        (
            ctx.current_link.start.location_type(),
            Some(ctx.current_link.start.id),
            DurationBand::Short,
            false,
        ),
        (
            ctx.current_link.end.location_type(),
            Some(ctx.current_link.end.id),
            DurationBand::Medium,
            false,
        ),
        {
            let (location, map_id) = pick_distant(ctx.distant_candidates, rng);
            (location, map_id, DurationBand::Long, true)
        },
    ];

    for (location_type, map_location_id, band, is_distant) in slots {
        let id = unique_id(&options, rng);
        let option = build_option(
            id,
            location_type,
            map_location_id,
            band,
            is_distant,
            ctx,
            rng,
        );
        log::debug!(
            "generated option {} at {} ({} min, risk {}, index {})",
            option.id,
            option.location_type,
            option.duration_minutes,
            option.risk_rate,
            option.reward_index
        );
        options.push(option);
    }

    options
}

fn build_option<R: Rng + ?Sized>(
    id: u64,
    location_type: LocationType,
    map_location_id: Option<u32>,
    band: DurationBand,
    is_distant: bool,
    ctx: &GenerationContext<'_>,
    rng: &mut R,
) -> ExpeditionOption {
    let (min, max) = band.bounds();
    let display_duration_minutes = snap_display_duration(rng.gen_range(min..=max));
    let duration_minutes = speed_adjusted_duration(display_duration_minutes, ctx.pet_speed);
    let risk_rate = sample_risk(location_type, rng);
    let difficulty: u8 = rng.gen_range(0..=100);
    let wealth_rate = (rng.gen_range(0.0..=WEALTH_RATE_MAX) * 100.0).round() / 100.0;

    let has_clone_talisman_bonus =
        !ctx.has_clone_talisman && rng.gen_range(0..CLONE_TALISMAN_TAG_ODDS) == 0;
    let has_bonus_tokens =
        !has_clone_talisman_bonus && rng.gen_range(0..BONUS_TOKENS_TAG_ODDS) == 0;

    let reward_index = calculate_reward_index(
        display_duration_minutes,
        risk_rate,
        difficulty,
        wealth_rate,
    );

    ExpeditionOption {
        id,
        duration_minutes,
        display_duration_minutes,
        risk_rate,
        difficulty,
        wealth_rate,
        location_type,
        map_location_id,
        food_cost: food_required(reward_index),
        reward_index,
        is_distant,
        has_clone_talisman_bonus,
        has_bonus_tokens,
    }
}

fn pick_distant<R: Rng + ?Sized>(
    candidates: &[MapLocation],
    rng: &mut R,
) -> (LocationType, Option<u32>) {
    if candidates.is_empty() {
        let idx = rng.gen_range(0..LocationType::ALL.len());
        return (LocationType::ALL[idx], None);
    }
    let candidate = &candidates[rng.gen_range(0..candidates.len())];
    (candidate.location_type(), Some(candidate.id))
}

fn unique_id<R: Rng + ?Sized>(existing: &[ExpeditionOption], rng: &mut R) -> u64 {
    loop {
        let id = rng.next_u64();
        if id != 0 && existing.iter().all(|option| option.id != id) {
            return id;
        }
    }
}
