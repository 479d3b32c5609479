//! Narrow interfaces to the collaborators the engine does not own.
//!
//! Hosts implement these over their database, guild storage and scheduler;
//! [`crate::memory`] provides in-process implementations.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::food::{FoodConsumptionPlan, GuildFoodStock, PetDiet};
use crate::lifecycle::{ExpeditionLogEntry, ExpeditionStatus, PetExpedition};
use crate::location::{MapLink, MapLocation};

/// Player facts needed to validate and generate expeditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub has_talisman: bool,
    pub has_clone_talisman: bool,
    pub on_continent: bool,
    pub guild_id: Option<u64>,
    pub current_link: MapLink,
}

/// The player's pet as it is right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetSnapshot {
    pub id: u64,
    pub type_id: u16,
    pub love_points: u32,
    /// Time left before the pet can be fed again; zero or less means hungry.
    pub feed_cooldown: Duration,
}

impl PetSnapshot {
    #[must_use]
    pub fn is_hungry(&self) -> bool {
        self.feed_cooldown <= Duration::zero()
    }
}

/// Static species data looked up by pet type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetSpecies {
    pub type_id: u16,
    pub force: u32,
    pub speed: u32,
    pub diet: PetDiet,
}

pub trait PlayerStore {
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if the player does not exist.
    fn player(&self, player_id: u64) -> Result<PlayerSnapshot, PortError>;

    /// Map locations eligible for the distant option.
    ///
    /// # Errors
    ///
    /// Returns an error if the map data cannot be read.
    fn distant_locations(&self, player_id: u64) -> Result<Vec<MapLocation>, PortError>;

    /// # Errors
    ///
    /// Returns an error if the player cannot be updated.
    fn add_money(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError>;

    /// # Errors
    ///
    /// Returns an error if the player cannot be updated.
    fn add_experience(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError>;

    /// # Errors
    ///
    /// Returns an error if the player cannot be updated.
    fn add_score(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError>;

    /// # Errors
    ///
    /// Returns an error if the player cannot be updated.
    fn add_tokens(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError>;

    /// Hand out a random item whose rarity falls in the inclusive range.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be updated.
    fn give_random_item(
        &self,
        player_id: u64,
        min_rarity: u8,
        max_rarity: u8,
    ) -> Result<(), PortError>;

    /// # Errors
    ///
    /// Returns an error if the player cannot be updated.
    fn grant_clone_talisman(&self, player_id: u64) -> Result<(), PortError>;
}

pub trait PetStore {
    /// The player's current pet, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the pet cannot be read.
    fn pet_of(&self, player_id: u64) -> Result<Option<PetSnapshot>, PortError>;

    /// # Errors
    ///
    /// Returns `PortError::NotFound` for unknown type ids.
    fn species(&self, type_id: u16) -> Result<PetSpecies, PortError>;

    /// # Errors
    ///
    /// Returns an error if the pet cannot be updated.
    fn change_love_points(&self, pet_id: u64, amount: i32, reason: &str) -> Result<(), PortError>;
}

pub trait GuildFoodStore {
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if the guild does not exist.
    fn stock(&self, guild_id: u64) -> Result<GuildFoodStock, PortError>;

    /// Decrement every tier named by the plan in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the guild cannot be updated.
    fn consume(&self, guild_id: u64, plan: &FoodConsumptionPlan) -> Result<(), PortError>;
}

pub trait ExpeditionRepository {
    /// # Errors
    ///
    /// Returns an error if an id cannot be reserved.
    fn next_id(&self) -> Result<u64, PortError>;

    /// Persist a new in-progress expedition. Implementations must reject the
    /// insert with `PortError::Conflict` if the player already has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    fn insert(&self, expedition: &PetExpedition) -> Result<(), PortError>;

    /// # Errors
    ///
    /// Returns an error if the rows cannot be read.
    fn active_for_player(&self, player_id: u64) -> Result<Option<PetExpedition>, PortError>;

    /// # Errors
    ///
    /// Returns `PortError::NotFound` if the row does not exist.
    fn get(&self, expedition_id: u64) -> Result<PetExpedition, PortError>;

    /// Delete a freshly inserted row whose effects could not be applied.
    /// Fails with `PortError::Conflict` when the stored status is no longer
    /// `expected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is missing, changed, or cannot be deleted.
    fn remove(&self, expedition_id: u64, expected: ExpeditionStatus) -> Result<(), PortError>;

    /// Compare-and-set the status. Fails with `PortError::Conflict` when the
    /// stored status is no longer `expected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is missing, changed, or cannot be written.
    fn transition(
        &self,
        expedition_id: u64,
        expected: ExpeditionStatus,
        next: ExpeditionStatus,
    ) -> Result<(), PortError>;
}

pub trait NotificationScheduler {
    /// # Errors
    ///
    /// Returns an error if the notification cannot be scheduled.
    fn schedule(&self, expedition_id: u64, at: DateTime<Utc>) -> Result<(), PortError>;

    /// Deleting an unknown notification is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler cannot be reached.
    fn delete(&self, expedition_id: u64) -> Result<(), PortError>;
}

pub trait ActivityLog {
    /// # Errors
    ///
    /// Returns an error if the entry cannot be stored.
    fn append(&self, entry: &ExpeditionLogEntry) -> Result<(), PortError>;

    /// Cancel and recall entries for the player at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be queried.
    fn count_cancels_and_recalls(
        &self,
        player_id: u64,
        since: DateTime<Utc>,
    ) -> Result<u32, PortError>;

    /// Completed entries whose outcome was not a total failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be queried.
    fn count_successes(&self, player_id: u64) -> Result<u32, PortError>;
}

pub trait BadgeSink {
    /// # Errors
    ///
    /// Returns an error if the badge store cannot be updated.
    fn successful_expeditions(&self, player_id: u64, total: u32) -> Result<(), PortError>;
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Bundle of every collaborator the service talks to.
pub trait ExpeditionPorts {
    type Players: PlayerStore;
    type Pets: PetStore;
    type Guilds: GuildFoodStore;
    type Expeditions: ExpeditionRepository;
    type Notifications: NotificationScheduler;
    type Log: ActivityLog;
    type Badges: BadgeSink;
    type Clock: Clock;

    fn players(&self) -> &Self::Players;
    fn pets(&self) -> &Self::Pets;
    fn guilds(&self) -> &Self::Guilds;
    fn expeditions(&self) -> &Self::Expeditions;
    fn notifications(&self) -> &Self::Notifications;
    fn log(&self) -> &Self::Log;
    fn badges(&self) -> &Self::Badges;
    fn clock(&self) -> &Self::Clock;
}
