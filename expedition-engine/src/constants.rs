//! Centralized balance tables for the expedition engine.
//!
//! Reward tables, duration bands and score bounds are reviewed code rather
//! than runtime JSON so that balance only moves through version control.
//! Per-deployment tunables live in [`crate::config::EngineConfig`].

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_REASON_COMPLETE: &str = "expedition.complete";
pub(crate) const LOG_REASON_CANCEL: &str = "expedition.cancel";
pub(crate) const LOG_REASON_RECALL: &str = "expedition.recall";

// Generation ---------------------------------------------------------------
/// Options offered per status check: two local, one distant.
pub const OPTIONS_PER_SET: usize = 3;
pub const SHORT_DURATION_MINUTES: (u32, u32) = (10, 180);
pub const MEDIUM_DURATION_MINUTES: (u32, u32) = (180, 720);
pub const LONG_DURATION_MINUTES: (u32, u32) = (720, 2_880);
/// Displayed durations snap to this many minutes.
pub const DISPLAY_DURATION_STEP_MINUTES: u32 = 5;
pub const PET_SPEED_CAP: u32 = 50;
pub const PET_SPEED_DURATION_FACTOR: f64 = 0.004;
/// One in N options carry the clone talisman bonus tag.
pub const CLONE_TALISMAN_TAG_ODDS: u32 = 20;
/// One in N untagged options carry the bonus tokens tag.
pub const BONUS_TOKENS_TAG_ODDS: u32 = 8;
pub const WEALTH_RATE_MAX: f64 = 2.0;

// Reward index -------------------------------------------------------------
pub const REWARD_INDEX_MAX: u8 = 9;
pub const SCORE_MAX: f64 = 3.0;
pub const DURATION_SCORE_BOUNDS: (f64, f64) = (10.0, 2_880.0);
pub const RISK_SCORE_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const DIFFICULTY_SCORE_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const DURATION_SCORE_WEIGHT: f64 = 3.0;
pub const WEALTH_RATE_IMPACT: f64 = 0.30;

// Reward amounts -----------------------------------------------------------
pub const BASE_MONEY: [u32; 10] = [40, 70, 110, 160, 230, 320, 430, 560, 720, 900];
pub const BASE_EXPERIENCE: [u32; 10] = [60, 100, 150, 220, 300, 400, 520, 660, 820, 1_000];
pub const BASE_POINTS: [u32; 10] = [20, 35, 55, 80, 110, 150, 200, 260, 330, 400];
pub const MAX_ITEM_RARITY: [u8; 10] = [5, 5, 6, 7, 8, 8, 8, 8, 8, 8];
pub const ITEM_RARITY_INDEX_OFFSET: u8 = 4;
pub const TOKENS_MAX: u32 = 10;
pub const TOKENS_BASE: u32 = 1;
pub const TOKENS_INDEX_DIVISOR: u32 = 3;
pub const TOKENS_DURATION_HOURS_DIVISOR: u32 = 12;
pub const TOKENS_RANDOM_BOOST_MAX: u32 = 1;
pub const TOKENS_BONUS_TAG: u32 = 3;
pub const CLONE_TALISMAN_BASE_CHANCE: f64 = 0.005;
pub const CLONE_TALISMAN_CHANCE_PER_INDEX: f64 = 0.005;
pub const CLONE_TALISMAN_TAG_MULTIPLIER: f64 = 10.0;

// Preference ---------------------------------------------------------------
pub const LIKED_REWARD_MULTIPLIER: f64 = 1.0;
pub const NEUTRAL_REWARD_MULTIPLIER: f64 = 0.8;
pub const DISLIKED_REWARD_MULTIPLIER: f64 = 0.25;
pub const DISLIKED_RISK_BONUS: f64 = 10.0;
pub const LIKED_RISK_REDUCTION: f64 = 5.0;
/// Disliked locations only add risk on expeditions shorter than this.
pub const DISLIKED_SHORT_EXPEDITION_MINUTES: u32 = 720;

// Risk ---------------------------------------------------------------------
pub const DIFFICULTY_RISK_DIVISOR: f64 = 4.0;
pub const LOVE_RISK_DIVISOR: f64 = 10.0;
pub const INSUFFICIENT_FOOD_MULTIPLIER: f64 = 3.0;
pub const RISK_MAX: f64 = 100.0;

// Food ---------------------------------------------------------------------
/// Rations required, indexed by reward index.
pub const FOOD_REQUIRED_BY_REWARD_INDEX: [u32; 10] = [1, 2, 3, 4, 5, 6, 8, 10, 12, 15];
pub const TREAT_RATIONS: u32 = 1;
pub const DIET_FOOD_RATIONS: u32 = 3;
pub const SOUP_RATIONS: u32 = 5;
pub const TREAT_PRICE: u32 = 20;
pub const DIET_FOOD_PRICE: u32 = 250;
pub const SOUP_PRICE: u32 = 600;

// Badges -------------------------------------------------------------------
/// Successful expeditions needed for the expedition badge.
pub const EXPEDITION_BADGE_THRESHOLD: u32 = 100;
