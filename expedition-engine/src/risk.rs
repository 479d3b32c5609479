//! Effective failure probability for a confirmed expedition.
use serde::{Deserialize, Serialize};

use crate::constants::{
    DIFFICULTY_RISK_DIVISOR, DISLIKED_RISK_BONUS, DISLIKED_SHORT_EXPEDITION_MINUTES,
    INSUFFICIENT_FOOD_MULTIPLIER, LIKED_RISK_REDUCTION, LOVE_RISK_DIVISOR, RISK_MAX,
};
use crate::food::food_required;
use crate::preferences::Preference;

/// Inputs to the risk formula, all frozen at selection time except the pet's
/// current force and love.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    pub risk_rate: u8,
    pub difficulty: u8,
    pub pet_force: u32,
    pub love_points: u32,
    /// `None` when the player has no guild; no food penalty applies.
    pub food_consumed: Option<u32>,
    pub reward_index: u8,
    pub duration_minutes: u32,
    pub preference: Preference,
}

/// Base formula before food and preference adjustments, clamped to 0..=100.
#[must_use]
pub fn base_risk(risk_rate: u8, difficulty: u8, pet_force: u32, love_points: u32) -> f64 {
    let raw = f64::from(risk_rate) + f64::from(difficulty) / DIFFICULTY_RISK_DIVISOR
        - f64::from(pet_force)
        - f64::from(love_points) / LOVE_RISK_DIVISOR;
    raw.clamp(0.0, RISK_MAX)
}

#[must_use]
pub fn is_underfed(food_consumed: Option<u32>, reward_index: u8) -> bool {
    food_consumed.is_some_and(|consumed| consumed < food_required(reward_index))
}

/// Final failure percentage in `0.0..=100.0`.
#[must_use]
pub fn effective_risk(inputs: &RiskInputs) -> f64 {
    let mut risk = base_risk(
        inputs.risk_rate,
        inputs.difficulty,
        inputs.pet_force,
        inputs.love_points,
    );

    if is_underfed(inputs.food_consumed, inputs.reward_index) {
        risk *= INSUFFICIENT_FOOD_MULTIPLIER;
    }

    match inputs.preference {
        Preference::Disliked if inputs.duration_minutes < DISLIKED_SHORT_EXPEDITION_MINUTES => {
            risk += DISLIKED_RISK_BONUS;
        }
        Preference::Liked => risk -= LIKED_RISK_REDUCTION,
        Preference::Disliked | Preference::Neutral => {}
    }

    risk.clamp(0.0, RISK_MAX)
}
