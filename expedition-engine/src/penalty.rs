//! Progressive love penalty for cancelling or recalling expeditions.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PenaltyConfig;

/// Which early-termination action is being priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyAction {
    Cancel,
    Recall,
}

impl PenaltyAction {
    #[must_use]
    pub const fn base(self, config: &PenaltyConfig) -> i32 {
        match self {
            Self::Cancel => config.cancel_base,
            Self::Recall => config.recall_base,
        }
    }
}

/// Start of the trailing window whose cancel and recall entries count.
#[must_use]
pub fn window_start(now: DateTime<Utc>, config: &PenaltyConfig) -> DateTime<Utc> {
    now.checked_sub_signed(config.window())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Love points lost, as a positive number. `prior_actions` counts cancel and
/// recall entries already logged inside the window, so a clean week is free.
#[must_use]
pub fn love_penalty(action: PenaltyAction, prior_actions: u32, config: &PenaltyConfig) -> u32 {
    action
        .base(config)
        .unsigned_abs()
        .saturating_mul(prior_actions)
        .min(config.max_penalty)
}
