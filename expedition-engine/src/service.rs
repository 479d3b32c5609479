//! Composition root: reads through ports, runs pure transitions, commits
//! with a compare-and-set and then applies the resulting effects.
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::PendingChoiceCache;
use crate::config::EngineConfig;
use crate::constants::LOG_REASON_COMPLETE;
use crate::error::{ExpeditionError, PortError, ServiceError};
use crate::generator::{ExpeditionOption, GenerationContext, generate_options};
use crate::lifecycle::{self, CompletionInputs, Effect, PetExpedition, StartRequest, Transition};
use crate::penalty::window_start;
use crate::ports::{
    ActivityLog, BadgeSink, Clock, ExpeditionPorts, ExpeditionRepository, GuildFoodStore,
    NotificationScheduler, PetStore, PlayerStore,
};
use crate::preferences::PreferenceTable;
use crate::reward::ExpeditionRewards;
use crate::rng::ExpeditionRngs;

/// A committed transition whose effects stopped part way. Effects before
/// `next` have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEffects {
    transition: Transition,
    next: usize,
}

impl PendingEffects {
    #[must_use]
    pub const fn transition(&self) -> &Transition {
        &self.transition
    }

    #[must_use]
    pub const fn expedition_id(&self) -> u64 {
        self.transition.expedition.id
    }

    #[must_use]
    pub fn remaining(&self) -> &[Effect] {
        self.transition.effects.get(self.next..).unwrap_or_default()
    }
}

/// Answer to a status check.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    InProgress {
        expedition: PetExpedition,
        remaining_minutes: i64,
        ready_to_complete: bool,
    },
    Proposals {
        options: Vec<ExpeditionOption>,
    },
}

pub struct ExpeditionService<P: ExpeditionPorts> {
    ports: P,
    config: EngineConfig,
    preferences: PreferenceTable,
    pending: Mutex<PendingChoiceCache>,
    rngs: Mutex<ExpeditionRngs>,
}

impl<P: ExpeditionPorts> ExpeditionService<P> {
    /// Service seeded from OS entropy, using the shipped preference table.
    #[must_use]
    pub fn new(ports: P, config: EngineConfig) -> Self {
        Self::with_rngs(ports, config, ExpeditionRngs::from_entropy())
    }

    /// Deterministic service for replays and tests.
    #[must_use]
    pub fn with_seed(ports: P, config: EngineConfig, seed: u64) -> Self {
        Self::with_rngs(ports, config, ExpeditionRngs::from_user_seed(seed))
    }

    fn with_rngs(ports: P, config: EngineConfig, rngs: ExpeditionRngs) -> Self {
        Self {
            pending: Mutex::new(PendingChoiceCache::new(&config.cache)),
            preferences: PreferenceTable::builtin().clone(),
            ports,
            config,
            rngs: Mutex::new(rngs),
        }
    }

    /// Replace the preference table. Malformed species entries are still
    /// used but reported.
    #[must_use]
    pub fn with_preferences(mut self, preferences: PreferenceTable) -> Self {
        for pet_type_id in preferences.malformed_species() {
            log::warn!("preferences for pet type {pet_type_id} overlap or exceed their limits");
        }
        self.preferences = preferences;
        self
    }

    #[must_use]
    pub const fn ports(&self) -> &P {
        &self.ports
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn pending(&self) -> MutexGuard<'_, PendingChoiceCache> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rngs(&self) -> MutexGuard<'_, ExpeditionRngs> {
        self.rngs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_request(&self) -> DateTime<Utc> {
        let now = self.ports.clock().now();
        self.pending().maybe_sweep(now);
        now
    }

    /// Report the active expedition, or generate and cache a fresh proposal set.
    ///
    /// # Errors
    ///
    /// Fails with a rule error when the player may not start an expedition,
    /// or with a port error when a collaborator fails.
    pub fn check_status(&self, player_id: u64) -> Result<StatusReport, ServiceError> {
        let now = self.begin_request();
        if let Some(expedition) = self.ports.expeditions().active_for_player(player_id)? {
            return Ok(StatusReport::InProgress {
                remaining_minutes: expedition.remaining_minutes(now),
                ready_to_complete: expedition.is_ready(now),
                expedition,
            });
        }

        let player = self.ports.players().player(player_id)?;
        let pet = self.ports.pets().pet_of(player_id)?;
        let pet = lifecycle::check_prerequisites(&player, pet.as_ref(), None, &self.config)?;
        let species = self.ports.pets().species(pet.type_id)?;
        let distant = self.ports.players().distant_locations(player_id)?;

        let ctx = GenerationContext {
            current_link: &player.current_link,
            distant_candidates: &distant,
            has_clone_talisman: player.has_clone_talisman,
            pet_speed: species.speed,
        };
        let options = generate_options(&ctx, self.rngs().generation());
        self.pending().set(player_id, options.clone(), now);
        log::debug!("cached {} proposals for player {player_id}", options.len());
        Ok(StatusReport::Proposals { options })
    }

    /// Confirm a cached proposal and send the pet out.
    ///
    /// # Errors
    ///
    /// `InvalidState` when the proposal is unknown or expired, the
    /// prerequisite errors of [`lifecycle::start`], or a port error.
    pub fn select_option(
        &self,
        player_id: u64,
        option_id: u64,
    ) -> Result<Transition, ServiceError> {
        let now = self.begin_request();
        let option = self
            .pending()
            .find_by_id(player_id, option_id, now)
            .cloned()
            .ok_or(ExpeditionError::InvalidState)?;

        let active = self.ports.expeditions().active_for_player(player_id)?;
        let player = self.ports.players().player(player_id)?;
        let pet = self.ports.pets().pet_of(player_id)?;
        let pet =
            lifecycle::check_prerequisites(&player, pet.as_ref(), active.as_ref(), &self.config)
                .inspect_err(|err| log::warn!("player {player_id} cannot start: {err}"))?;
        let species = self.ports.pets().species(pet.type_id)?;
        let guild_stock = player
            .guild_id
            .map(|guild_id| self.ports.guilds().stock(guild_id))
            .transpose()?;

        let request = StartRequest {
            expedition_id: self.ports.expeditions().next_id()?,
            player: &player,
            pet,
            diet: species.diet,
            active: active.as_ref(),
            guild_stock,
            now,
        };
        let transition = lifecycle::start(&option, &request, &self.config)?;
        self.check_effect_targets(&transition)?;
        self.commit(&transition)?;
        log::info!(
            "player {player_id} started expedition {} to {} for {} min",
            transition.expedition.id,
            transition.expedition.location_type,
            transition.expedition.duration_minutes()
        );
        let result = self.apply(transition, 0);
        if !matches!(result, Err(ServiceError::Port(_))) {
            self.pending().delete(player_id);
        }
        result
    }

    /// Abort an expedition before the pet departs.
    ///
    /// # Errors
    ///
    /// `NoExpedition`, `AlreadyDeparted`, or a port error.
    pub fn cancel(&self, player_id: u64) -> Result<Transition, ServiceError> {
        let now = self.begin_request();
        let active = self.ports.expeditions().active_for_player(player_id)?;
        let prior = self.prior_penalty_actions(player_id, now)?;
        let transition = lifecycle::cancel(active.as_ref(), prior, now, &self.config)
            .inspect_err(|err| log::warn!("player {player_id} cancel refused: {err}"))?;
        self.check_effect_targets(&transition)?;
        self.commit(&transition)?;
        log::info!(
            "player {player_id} cancelled expedition {}",
            transition.expedition.id
        );
        self.apply(transition, 0)
    }

    /// Bring the pet home early.
    ///
    /// # Errors
    ///
    /// `NoExpedition` or a port error.
    pub fn recall(&self, player_id: u64) -> Result<Transition, ServiceError> {
        let now = self.begin_request();
        let active = self.ports.expeditions().active_for_player(player_id)?;
        let prior = self.prior_penalty_actions(player_id, now)?;
        let transition = lifecycle::recall(active.as_ref(), prior, now, &self.config)
            .inspect_err(|err| log::warn!("player {player_id} recall refused: {err}"))?;
        self.check_effect_targets(&transition)?;
        self.commit(&transition)?;
        log::info!(
            "player {player_id} recalled expedition {}",
            transition.expedition.id
        );
        self.apply(transition, 0)
    }

    /// Resolve a finished expedition.
    ///
    /// # Errors
    ///
    /// `NoExpedition`, `ExpeditionNotComplete`, `NoPet`, or a port error.
    pub fn complete(&self, player_id: u64) -> Result<Transition, ServiceError> {
        let now = self.begin_request();
        let Some(active) = self.ports.expeditions().active_for_player(player_id)? else {
            return Err(ExpeditionError::NoExpedition.into());
        };
        if !active.is_ready(now) {
            return Err(ExpeditionError::ExpeditionNotComplete {
                remaining_minutes: active.remaining_minutes(now),
            }
            .into());
        }

        let player = self.ports.players().player(player_id)?;
        let pet = self
            .ports
            .pets()
            .pet_of(player_id)?
            .ok_or(ExpeditionError::NoPet)?;
        let species = self.ports.pets().species(pet.type_id)?;
        let inputs = CompletionInputs {
            pet: &pet,
            pet_force: species.force,
            preference: self.preferences.preference(pet.type_id, active.location_type),
            player_has_clone_talisman: player.has_clone_talisman,
        };
        let transition = {
            let mut rngs = self.rngs();
            let transition =
                lifecycle::complete(Some(&active), &inputs, now, &self.config, rngs.outcome())?;
            log::debug!("outcome stream at {} draws", rngs.outcome().draws());
            transition
        };
        self.check_effect_targets(&transition)?;
        self.commit(&transition)?;
        if let Some(outcome) = &transition.outcome {
            log::info!(
                "player {player_id} completed expedition {}: {:?}, love {:+}",
                transition.expedition.id,
                outcome.kind(),
                outcome.love_change
            );
        }
        self.apply(transition, 0)
    }

    /// Apply the effects left over from an [`ServiceError::EffectsPending`].
    ///
    /// # Errors
    ///
    /// `InvalidState` when the stored row no longer carries the committed
    /// status, or another `EffectsPending` if an effect fails again.
    pub fn resume_effects(&self, pending: PendingEffects) -> Result<Transition, ServiceError> {
        let expedition_id = pending.expedition_id();
        let stored = self.ports.expeditions().get(expedition_id)?;
        if stored.status != pending.transition.expedition.status {
            log::warn!(
                "expedition {expedition_id} is {:?}, not resuming its effects",
                stored.status
            );
            return Err(ExpeditionError::InvalidState.into());
        }
        log::info!(
            "resuming {} effect(s) of expedition {expedition_id}",
            pending.remaining().len()
        );
        self.apply(pending.transition, pending.next)
    }

    fn prior_penalty_actions(&self, player_id: u64, now: DateTime<Utc>) -> Result<u32, PortError> {
        self.ports
            .log()
            .count_cancels_and_recalls(player_id, window_start(now, &self.config.penalty))
    }

    /// Persist the new row or flip its status. Nothing has been written
    /// before this point, so a failure here leaves storage untouched.
    fn commit(&self, transition: &Transition) -> Result<(), ServiceError> {
        let repo = self.ports.expeditions();
        let expedition = &transition.expedition;
        let result = match transition.from {
            None => repo.insert(expedition).map_err(|err| match err {
                PortError::Conflict => ServiceError::Rule(ExpeditionError::ExpeditionInProgress),
                other => other.into(),
            }),
            Some(expected) => repo
                .transition(expedition.id, expected, expedition.status)
                .map_err(|err| match err {
                    PortError::Conflict | PortError::NotFound => {
                        ServiceError::Rule(ExpeditionError::NoExpedition)
                    }
                    other => other.into(),
                }),
        };
        if let Err(err) = &result {
            log::warn!("expedition {} commit failed: {err}", expedition.id);
        }
        result
    }

    /// Read every record an effect writes to, so a missing pet, player or
    /// guild is refused before anything is stored.
    fn check_effect_targets(&self, transition: &Transition) -> Result<(), ServiceError> {
        let owner = transition.expedition.player_id;
        for effect in &transition.effects {
            match effect {
                Effect::ConsumeFood { guild_id, .. } => {
                    self.ports.guilds().stock(*guild_id)?;
                }
                Effect::ChangeLove { pet_id, .. } => {
                    let owned = self
                        .ports
                        .pets()
                        .pet_of(owner)?
                        .is_some_and(|pet| pet.id == *pet_id);
                    if !owned {
                        log::warn!("pet {pet_id} no longer belongs to player {owner}");
                        return Err(ExpeditionError::NoPet.into());
                    }
                }
                Effect::GrantRewards { player_id, .. } => {
                    self.ports.players().player(*player_id)?;
                }
                Effect::ScheduleNotification { .. }
                | Effect::CancelNotification
                | Effect::AppendLog(_)
                | Effect::ReportSuccess { .. } => {}
            }
        }
        Ok(())
    }

    /// Apply effects from index `next` on. A failure before anything was
    /// applied undoes the commit; a later one hands back the remainder.
    fn apply(&self, transition: Transition, next: usize) -> Result<Transition, ServiceError> {
        let expedition_id = transition.expedition.id;
        let failure = transition
            .effects
            .iter()
            .enumerate()
            .skip(next)
            .find_map(|(index, effect)| {
                self.apply_effect(expedition_id, effect)
                    .err()
                    .map(|source| (index, source))
            });
        match failure {
            Some((index, source)) => Err(self.effect_failed(transition, index, source)),
            None => Ok(transition),
        }
    }

    fn apply_effect(&self, expedition_id: u64, effect: &Effect) -> Result<(), PortError> {
        match effect {
            Effect::ConsumeFood { guild_id, plan } => self.ports.guilds().consume(*guild_id, plan),
            Effect::ScheduleNotification { at } => {
                self.ports.notifications().schedule(expedition_id, *at)
            }
            Effect::CancelNotification => self.ports.notifications().delete(expedition_id),
            Effect::ChangeLove {
                pet_id,
                amount,
                reason,
            } => self
                .ports
                .pets()
                .change_love_points(*pet_id, *amount, reason),
            Effect::GrantRewards { player_id, rewards } => self.grant_rewards(*player_id, rewards),
            Effect::AppendLog(entry) => self.ports.log().append(entry),
            Effect::ReportSuccess { player_id } => {
                let total = self.ports.log().count_successes(*player_id)?;
                self.ports.badges().successful_expeditions(*player_id, total)
            }
        }
    }

    fn effect_failed(
        &self,
        transition: Transition,
        index: usize,
        source: PortError,
    ) -> ServiceError {
        let expedition_id = transition.expedition.id;
        if index == 0 {
            match self.rollback(&transition) {
                Ok(()) => {
                    log::warn!("expedition {expedition_id} rolled back: {source}");
                    return source.into();
                }
                Err(err) => log::error!("expedition {expedition_id} rollback failed: {err}"),
            }
        }
        let pending = PendingEffects {
            transition,
            next: index,
        };
        log::error!(
            "expedition {expedition_id} has {} effect(s) pending: {source}",
            pending.remaining().len()
        );
        ServiceError::EffectsPending {
            pending: Box::new(pending),
            source,
        }
    }

    /// Undo a commit none of whose effects landed.
    fn rollback(&self, transition: &Transition) -> Result<(), PortError> {
        let repo = self.ports.expeditions();
        let expedition = &transition.expedition;
        match transition.from {
            None => repo.remove(expedition.id, expedition.status),
            Some(previous) => repo.transition(expedition.id, expedition.status, previous),
        }
    }

    fn grant_rewards(&self, player_id: u64, rewards: &ExpeditionRewards) -> Result<(), PortError> {
        let players = self.ports.players();
        players.add_money(player_id, rewards.money, LOG_REASON_COMPLETE)?;
        players.add_experience(player_id, rewards.experience, LOG_REASON_COMPLETE)?;
        players.add_score(player_id, rewards.points, LOG_REASON_COMPLETE)?;
        players.add_tokens(player_id, rewards.tokens, LOG_REASON_COMPLETE)?;
        players.give_random_item(
            player_id,
            rewards.item.min_rarity,
            rewards.item.max_rarity,
        )?;
        if rewards.clone_talisman_found {
            log::info!("player {player_id} found the clone talisman");
            players.grant_clone_talisman(player_id)?;
        }
        Ok(())
    }
}
