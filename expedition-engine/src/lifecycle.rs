//! Expedition state machine.
//!
//! Transitions are pure: each takes the current row plus the facts it needs
//! and returns the next row with the ordered side effects the caller must
//! apply. Nothing here touches storage.
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::constants::{LOG_REASON_CANCEL, LOG_REASON_COMPLETE, LOG_REASON_RECALL};
use crate::error::ExpeditionError;
use crate::food::{FoodConsumptionPlan, GuildFoodStock, PetDiet, plan_food_consumption};
use crate::generator::ExpeditionOption;
use crate::location::LocationType;
use crate::outcome::{ExpeditionOutcome, OutcomeKind, resolve_outcome};
use crate::penalty::{PenaltyAction, love_penalty};
use crate::ports::{PetSnapshot, PlayerSnapshot};
use crate::preferences::Preference;
use crate::reward::{ExpeditionRewards, RewardContext};
use crate::risk::{RiskInputs, effective_risk};

/// Persisted status. Pending proposals live only in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpeditionStatus {
    InProgress,
    Completed,
    Recalled,
    Cancelled,
}

impl ExpeditionStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// A confirmed expedition with every selection-time input frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetExpedition {
    pub id: u64,
    pub player_id: u64,
    pub pet_id: u64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub risk_rate: u8,
    pub difficulty: u8,
    pub wealth_rate: f64,
    pub location_type: LocationType,
    pub map_location_id: Option<u32>,
    pub status: ExpeditionStatus,
    /// Rations actually consumed; `None` when the player had no guild.
    pub food_consumed: Option<u32>,
    pub reward_index: u8,
    pub has_clone_talisman_bonus: bool,
    pub has_bonus_tokens: bool,
}

impl PetExpedition {
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        u32::try_from((self.end_date - self.start_date).num_minutes()).unwrap_or(0)
    }

    /// Whole minutes left before the pet returns, rounded up; zero once due.
    #[must_use]
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.end_date - now).num_seconds();
        if seconds <= 0 { 0 } else { (seconds + 59) / 60 }
    }

    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_date
    }

    fn with_status(&self, status: ExpeditionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Started,
    Completed,
    Cancelled,
    Recalled,
}

impl LogAction {
    #[must_use]
    pub const fn counts_toward_penalty(self) -> bool {
        matches!(self, Self::Cancelled | Self::Recalled)
    }
}

/// Activity log record written on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionLogEntry {
    pub player_id: u64,
    pub pet_id: u64,
    pub expedition_id: u64,
    pub action: LogAction,
    pub at: DateTime<Utc>,
    pub love_change: i32,
    pub food_consumed: Option<u32>,
    pub outcome: Option<OutcomeKind>,
    pub rewards: Option<ExpeditionRewards>,
}

/// Side effects produced by a transition, applied in order after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ConsumeFood {
        guild_id: u64,
        plan: FoodConsumptionPlan,
    },
    ScheduleNotification {
        at: DateTime<Utc>,
    },
    CancelNotification,
    ChangeLove {
        pet_id: u64,
        amount: i32,
        reason: &'static str,
    },
    GrantRewards {
        player_id: u64,
        rewards: ExpeditionRewards,
    },
    AppendLog(ExpeditionLogEntry),
    ReportSuccess {
        player_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Status the stored row must still have for the transition to commit.
    pub from: Option<ExpeditionStatus>,
    pub expedition: PetExpedition,
    pub effects: Vec<Effect>,
    pub outcome: Option<ExpeditionOutcome>,
}

/// Everything `start` needs besides the chosen option.
#[derive(Debug, Clone, Copy)]
pub struct StartRequest<'a> {
    pub expedition_id: u64,
    pub player: &'a PlayerSnapshot,
    pub pet: &'a PetSnapshot,
    pub diet: PetDiet,
    pub active: Option<&'a PetExpedition>,
    /// Guild stock, read only when the player belongs to a guild.
    pub guild_stock: Option<GuildFoodStock>,
    pub now: DateTime<Utc>,
}

/// Facts read at resolution time.
#[derive(Debug, Clone, Copy)]
pub struct CompletionInputs<'a> {
    pub pet: &'a PetSnapshot,
    pub pet_force: u32,
    pub preference: Preference,
    pub player_has_clone_talisman: bool,
}

/// Gate shared by option generation and `start`.
///
/// # Errors
///
/// Returns the first failed prerequisite.
pub fn check_prerequisites<'a>(
    player: &PlayerSnapshot,
    pet: Option<&'a PetSnapshot>,
    active: Option<&PetExpedition>,
    config: &EngineConfig,
) -> Result<&'a PetSnapshot, ExpeditionError> {
    if active.is_some() {
        return Err(ExpeditionError::ExpeditionInProgress);
    }
    if !player.has_talisman {
        return Err(ExpeditionError::NoTalisman);
    }
    let pet = pet.ok_or(ExpeditionError::NoPet)?;
    if pet.is_hungry() {
        return Err(ExpeditionError::PetHungry);
    }
    let required = config.lifecycle.min_love_points;
    if pet.love_points < required {
        return Err(ExpeditionError::InsufficientLove {
            love: pet.love_points,
            required,
        });
    }
    if !player.on_continent {
        return Err(ExpeditionError::NotOnContinent);
    }
    Ok(pet)
}

fn in_progress(expedition: Option<&PetExpedition>) -> Result<&PetExpedition, ExpeditionError> {
    expedition
        .filter(|row| row.status == ExpeditionStatus::InProgress)
        .ok_or(ExpeditionError::NoExpedition)
}

/// Pending → in progress.
///
/// # Errors
///
/// Fails when the player already has an active expedition or a
/// prerequisite does not hold.
pub fn start(
    option: &ExpeditionOption,
    request: &StartRequest<'_>,
    config: &EngineConfig,
) -> Result<Transition, ExpeditionError> {
    let pet = check_prerequisites(request.player, Some(request.pet), request.active, config)?;

    let food = request
        .player
        .guild_id
        .zip(request.guild_stock)
        .map(|(guild_id, stock)| {
            (
                guild_id,
                plan_food_consumption(option.food_cost, &stock, request.diet),
            )
        });
    if let Some((guild_id, plan)) = &food {
        log::debug!(
            "guild {guild_id} food plan: {} of {} rations, cost {}",
            plan.total_rations,
            plan.required_rations,
            plan.cost()
        );
    }

    let start_date = request.now;
    let end_date = start_date + Duration::minutes(i64::from(option.duration_minutes));
    let expedition = PetExpedition {
        id: request.expedition_id,
        player_id: request.player.id,
        pet_id: pet.id,
        start_date,
        end_date,
        risk_rate: option.risk_rate,
        difficulty: option.difficulty,
        wealth_rate: option.wealth_rate,
        location_type: option.location_type,
        map_location_id: option.map_location_id,
        status: ExpeditionStatus::InProgress,
        food_consumed: food.as_ref().map(|(_, plan)| plan.total_rations),
        reward_index: option.reward_index,
        has_clone_talisman_bonus: option.has_clone_talisman_bonus,
        has_bonus_tokens: option.has_bonus_tokens,
    };

    let mut effects = Vec::with_capacity(3);
    if let Some((guild_id, plan)) = food.filter(|(_, plan)| !plan.is_empty()) {
        effects.push(Effect::ConsumeFood { guild_id, plan });
    }
    effects.push(Effect::ScheduleNotification { at: end_date });
    effects.push(Effect::AppendLog(ExpeditionLogEntry {
        player_id: expedition.player_id,
        pet_id: expedition.pet_id,
        expedition_id: expedition.id,
        action: LogAction::Started,
        at: start_date,
        love_change: 0,
        food_consumed: expedition.food_consumed,
        outcome: None,
        rewards: None,
    }));

    Ok(Transition {
        from: None,
        expedition,
        effects,
        outcome: None,
    })
}

fn early_termination(
    expedition: &PetExpedition,
    action: PenaltyAction,
    prior_actions: u32,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Transition {
    let (status, log_action, reason) = match action {
        PenaltyAction::Cancel => (
            ExpeditionStatus::Cancelled,
            LogAction::Cancelled,
            LOG_REASON_CANCEL,
        ),
        PenaltyAction::Recall => (
            ExpeditionStatus::Recalled,
            LogAction::Recalled,
            LOG_REASON_RECALL,
        ),
    };
    let penalty = love_penalty(action, prior_actions, &config.penalty);
    let love_change = -i32::try_from(penalty).unwrap_or(i32::MAX);

    let mut effects = Vec::with_capacity(3);
    if love_change != 0 {
        effects.push(Effect::ChangeLove {
            pet_id: expedition.pet_id,
            amount: love_change,
            reason,
        });
    }
    effects.push(Effect::CancelNotification);
    effects.push(Effect::AppendLog(ExpeditionLogEntry {
        player_id: expedition.player_id,
        pet_id: expedition.pet_id,
        expedition_id: expedition.id,
        action: log_action,
        at: now,
        love_change,
        food_consumed: expedition.food_consumed,
        outcome: None,
        rewards: None,
    }));

    Transition {
        from: Some(ExpeditionStatus::InProgress),
        expedition: expedition.with_status(status),
        effects,
        outcome: None,
    }
}

/// In progress → cancelled, allowed only before the pet departs.
///
/// # Errors
///
/// `NoExpedition` without an in-progress row, `AlreadyDeparted` once the
/// departure grace has elapsed.
pub fn cancel(
    expedition: Option<&PetExpedition>,
    prior_actions: u32,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<Transition, ExpeditionError> {
    let expedition = in_progress(expedition)?;
    let departure = expedition
        .start_date
        .checked_add_signed(config.lifecycle.departure_grace())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if now >= departure {
        return Err(ExpeditionError::AlreadyDeparted);
    }
    Ok(early_termination(
        expedition,
        PenaltyAction::Cancel,
        prior_actions,
        now,
        config,
    ))
}

/// In progress → recalled, at any time before resolution.
///
/// # Errors
///
/// `NoExpedition` without an in-progress row.
pub fn recall(
    expedition: Option<&PetExpedition>,
    prior_actions: u32,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<Transition, ExpeditionError> {
    let expedition = in_progress(expedition)?;
    Ok(early_termination(
        expedition,
        PenaltyAction::Recall,
        prior_actions,
        now,
        config,
    ))
}

/// Risk inputs for a stored expedition and the pet as it is now.
#[must_use]
pub fn risk_inputs(expedition: &PetExpedition, inputs: &CompletionInputs<'_>) -> RiskInputs {
    RiskInputs {
        risk_rate: expedition.risk_rate,
        difficulty: expedition.difficulty,
        pet_force: inputs.pet_force,
        love_points: inputs.pet.love_points,
        food_consumed: expedition.food_consumed,
        reward_index: expedition.reward_index,
        duration_minutes: expedition.duration_minutes(),
        preference: inputs.preference,
    }
}

/// In progress → completed, resolving the outcome with `rng`.
///
/// # Errors
///
/// `NoExpedition` without an in-progress row, `ExpeditionNotComplete`
/// before the end date.
pub fn complete<R: Rng + ?Sized>(
    expedition: Option<&PetExpedition>,
    inputs: &CompletionInputs<'_>,
    now: DateTime<Utc>,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<Transition, ExpeditionError> {
    let expedition = in_progress(expedition)?;
    if !expedition.is_ready(now) {
        return Err(ExpeditionError::ExpeditionNotComplete {
            remaining_minutes: expedition.remaining_minutes(now),
        });
    }

    let risk = effective_risk(&risk_inputs(expedition, inputs));
    let reward_ctx = RewardContext {
        reward_index: expedition.reward_index,
        duration_minutes: expedition.duration_minutes(),
        location_type: expedition.location_type,
        preference: inputs.preference,
        has_clone_talisman_bonus: expedition.has_clone_talisman_bonus,
        has_bonus_tokens: expedition.has_bonus_tokens,
        player_has_clone_talisman: inputs.player_has_clone_talisman,
    };
    let outcome = resolve_outcome(risk, &reward_ctx, &config.outcome, rng);
    log::debug!(
        "expedition {} resolved at risk {risk:.1}: {:?}",
        expedition.id,
        outcome.kind()
    );

    let mut effects = Vec::with_capacity(5);
    effects.push(Effect::ChangeLove {
        pet_id: expedition.pet_id,
        amount: outcome.love_change,
        reason: LOG_REASON_COMPLETE,
    });
    if let Some(rewards) = outcome.rewards {
        effects.push(Effect::GrantRewards {
            player_id: expedition.player_id,
            rewards,
        });
    }
    effects.push(Effect::CancelNotification);
    effects.push(Effect::AppendLog(ExpeditionLogEntry {
        player_id: expedition.player_id,
        pet_id: expedition.pet_id,
        expedition_id: expedition.id,
        action: LogAction::Completed,
        at: now,
        love_change: outcome.love_change,
        food_consumed: expedition.food_consumed,
        outcome: Some(outcome.kind()),
        rewards: outcome.rewards,
    }));
    if outcome.is_success() {
        effects.push(Effect::ReportSuccess {
            player_id: expedition.player_id,
        });
    }

    Ok(Transition {
        from: Some(ExpeditionStatus::InProgress),
        expedition: expedition.with_status(ExpeditionStatus::Completed),
        effects,
        outcome: Some(outcome),
    })
}
