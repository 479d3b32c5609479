//! In-process implementations of every port.
//!
//! [`InMemoryPorts`] keeps the whole world behind one mutex so a service can
//! be shared across threads in tests and small embedding hosts.
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::constants::EXPEDITION_BADGE_THRESHOLD;
use crate::error::PortError;
use crate::food::{FoodConsumptionPlan, GuildFoodStock};
use crate::lifecycle::{ExpeditionLogEntry, ExpeditionStatus, LogAction, PetExpedition};
use crate::location::MapLocation;
use crate::outcome::OutcomeKind;
use crate::ports::{
    ActivityLog, BadgeSink, Clock, ExpeditionPorts, ExpeditionRepository, GuildFoodStore,
    NotificationScheduler, PetSnapshot, PetSpecies, PetStore, PlayerSnapshot, PlayerStore,
};
use crate::reward::ItemReward;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything credited to a player by resolved expeditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wallet {
    pub money: u32,
    pub experience: u32,
    pub score: u32,
    pub tokens: u32,
    pub items: Vec<ItemReward>,
}

/// Write paths that can be taken offline to exercise failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritePath {
    GuildFood,
    Notifications,
    Love,
    Rewards,
    ActivityLog,
    Badges,
}

#[derive(Debug, Default)]
struct World {
    players: HashMap<u64, PlayerSnapshot>,
    wallets: HashMap<u64, Wallet>,
    distant: Vec<MapLocation>,
    pets: HashMap<u64, PetSnapshot>,
    species: HashMap<u16, PetSpecies>,
    guilds: HashMap<u64, GuildFoodStock>,
    expeditions: BTreeMap<u64, PetExpedition>,
    next_expedition_id: u64,
    notifications: HashMap<u64, DateTime<Utc>>,
    log: Vec<ExpeditionLogEntry>,
    badges: HashMap<u64, u32>,
    offline: HashSet<WritePath>,
}

impl World {
    fn reachable(&self, path: WritePath) -> Result<(), PortError> {
        if self.offline.contains(&path) {
            return Err(PortError::Storage(format!("{path:?} is offline")));
        }
        Ok(())
    }
}

/// Single-process world implementing all expedition ports.
#[derive(Debug)]
pub struct InMemoryPorts {
    world: Mutex<World>,
    clock: FixedClock,
}

impl InMemoryPorts {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            world: Mutex::new(World::default()),
            clock: FixedClock::new(now),
        }
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_player(self, player: PlayerSnapshot) -> Self {
        self.world().players.insert(player.id, player);
        self
    }

    /// Give `player_id` a pet, replacing any previous one.
    #[must_use]
    pub fn with_pet(self, player_id: u64, pet: PetSnapshot) -> Self {
        self.world().pets.insert(player_id, pet);
        self
    }

    #[must_use]
    pub fn with_species(self, species: PetSpecies) -> Self {
        self.world().species.insert(species.type_id, species);
        self
    }

    #[must_use]
    pub fn with_guild(self, guild_id: u64, stock: GuildFoodStock) -> Self {
        self.world().guilds.insert(guild_id, stock);
        self
    }

    #[must_use]
    pub fn with_distant_locations(self, locations: Vec<MapLocation>) -> Self {
        self.world().distant = locations;
        self
    }

    /// Make every write through `path` fail until brought back online.
    pub fn set_offline(&self, path: WritePath, offline: bool) {
        let mut world = self.world();
        if offline {
            world.offline.insert(path);
        } else {
            world.offline.remove(&path);
        }
    }

    #[must_use]
    pub const fn fixed_clock(&self) -> &FixedClock {
        &self.clock
    }

    pub fn update_player(&self, player_id: u64, update: impl FnOnce(&mut PlayerSnapshot)) {
        if let Some(player) = self.world().players.get_mut(&player_id) {
            update(player);
        }
    }

    pub fn update_pet(&self, player_id: u64, update: impl FnOnce(&mut PetSnapshot)) {
        if let Some(pet) = self.world().pets.get_mut(&player_id) {
            update(pet);
        }
    }

    #[must_use]
    pub fn player_snapshot(&self, player_id: u64) -> Option<PlayerSnapshot> {
        self.world().players.get(&player_id).cloned()
    }

    #[must_use]
    pub fn pet_snapshot(&self, player_id: u64) -> Option<PetSnapshot> {
        self.world().pets.get(&player_id).cloned()
    }

    #[must_use]
    pub fn wallet(&self, player_id: u64) -> Wallet {
        self.world()
            .wallets
            .get(&player_id)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn guild_stock(&self, guild_id: u64) -> Option<GuildFoodStock> {
        self.world().guilds.get(&guild_id).copied()
    }

    #[must_use]
    pub fn expedition(&self, expedition_id: u64) -> Option<PetExpedition> {
        self.world().expeditions.get(&expedition_id).cloned()
    }

    #[must_use]
    pub fn scheduled_notification(&self, expedition_id: u64) -> Option<DateTime<Utc>> {
        self.world().notifications.get(&expedition_id).copied()
    }

    #[must_use]
    pub fn log_entries(&self) -> Vec<ExpeditionLogEntry> {
        self.world().log.clone()
    }

    /// Last total reported to the badge sink.
    #[must_use]
    pub fn badge_total(&self, player_id: u64) -> u32 {
        self.world().badges.get(&player_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_expedition_badge(&self, player_id: u64) -> bool {
        self.badge_total(player_id) >= EXPEDITION_BADGE_THRESHOLD
    }

    fn credit(
        &self,
        player_id: u64,
        reason: &str,
        apply: impl FnOnce(&mut Wallet),
    ) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::Rewards)?;
        if !world.players.contains_key(&player_id) {
            return Err(PortError::NotFound);
        }
        log::trace!("crediting player {player_id} ({reason})");
        apply(world.wallets.entry(player_id).or_default());
        Ok(())
    }
}

impl PlayerStore for InMemoryPorts {
    fn player(&self, player_id: u64) -> Result<PlayerSnapshot, PortError> {
        self.player_snapshot(player_id).ok_or(PortError::NotFound)
    }

    fn distant_locations(&self, _player_id: u64) -> Result<Vec<MapLocation>, PortError> {
        Ok(self.world().distant.clone())
    }

    fn add_money(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError> {
        self.credit(player_id, reason, |wallet| {
            wallet.money = wallet.money.saturating_add(amount);
        })
    }

    fn add_experience(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError> {
        self.credit(player_id, reason, |wallet| {
            wallet.experience = wallet.experience.saturating_add(amount);
        })
    }

    fn add_score(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError> {
        self.credit(player_id, reason, |wallet| {
            wallet.score = wallet.score.saturating_add(amount);
        })
    }

    fn add_tokens(&self, player_id: u64, amount: u32, reason: &str) -> Result<(), PortError> {
        self.credit(player_id, reason, |wallet| {
            wallet.tokens = wallet.tokens.saturating_add(amount);
        })
    }

    fn give_random_item(
        &self,
        player_id: u64,
        min_rarity: u8,
        max_rarity: u8,
    ) -> Result<(), PortError> {
        self.credit(player_id, "item", |wallet| {
            wallet.items.push(ItemReward {
                min_rarity,
                max_rarity,
            });
        })
    }

    fn grant_clone_talisman(&self, player_id: u64) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::Rewards)?;
        let player = world
            .players
            .get_mut(&player_id)
            .ok_or(PortError::NotFound)?;
        player.has_clone_talisman = true;
        Ok(())
    }
}

impl PetStore for InMemoryPorts {
    fn pet_of(&self, player_id: u64) -> Result<Option<PetSnapshot>, PortError> {
        Ok(self.pet_snapshot(player_id))
    }

    fn species(&self, type_id: u16) -> Result<PetSpecies, PortError> {
        self.world()
            .species
            .get(&type_id)
            .copied()
            .ok_or(PortError::NotFound)
    }

    fn change_love_points(&self, pet_id: u64, amount: i32, reason: &str) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::Love)?;
        let pet = world
            .pets
            .values_mut()
            .find(|pet| pet.id == pet_id)
            .ok_or(PortError::NotFound)?;
        pet.love_points = pet.love_points.saturating_add_signed(amount);
        log::trace!("pet {pet_id} love {amount:+} ({reason}) -> {}", pet.love_points);
        Ok(())
    }
}

impl GuildFoodStore for InMemoryPorts {
    fn stock(&self, guild_id: u64) -> Result<GuildFoodStock, PortError> {
        self.guild_stock(guild_id).ok_or(PortError::NotFound)
    }

    fn consume(&self, guild_id: u64, plan: &FoodConsumptionPlan) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::GuildFood)?;
        let stock = world.guilds.get_mut(&guild_id).ok_or(PortError::NotFound)?;
        stock.apply(plan);
        Ok(())
    }
}

impl ExpeditionRepository for InMemoryPorts {
    fn next_id(&self) -> Result<u64, PortError> {
        let mut world = self.world();
        world.next_expedition_id += 1;
        Ok(world.next_expedition_id)
    }

    fn insert(&self, expedition: &PetExpedition) -> Result<(), PortError> {
        let mut world = self.world();
        let player_busy = world.expeditions.values().any(|row| {
            row.player_id == expedition.player_id && row.status == ExpeditionStatus::InProgress
        });
        if player_busy || world.expeditions.contains_key(&expedition.id) {
            return Err(PortError::Conflict);
        }
        world.expeditions.insert(expedition.id, expedition.clone());
        Ok(())
    }

    fn active_for_player(&self, player_id: u64) -> Result<Option<PetExpedition>, PortError> {
        Ok(self
            .world()
            .expeditions
            .values()
            .find(|row| row.player_id == player_id && row.status == ExpeditionStatus::InProgress)
            .cloned())
    }

    fn get(&self, expedition_id: u64) -> Result<PetExpedition, PortError> {
        self.expedition(expedition_id).ok_or(PortError::NotFound)
    }

    fn remove(&self, expedition_id: u64, expected: ExpeditionStatus) -> Result<(), PortError> {
        let mut world = self.world();
        let row = world
            .expeditions
            .get(&expedition_id)
            .ok_or(PortError::NotFound)?;
        if row.status != expected {
            return Err(PortError::Conflict);
        }
        world.expeditions.remove(&expedition_id);
        Ok(())
    }

    fn transition(
        &self,
        expedition_id: u64,
        expected: ExpeditionStatus,
        next: ExpeditionStatus,
    ) -> Result<(), PortError> {
        let mut world = self.world();
        let row = world
            .expeditions
            .get_mut(&expedition_id)
            .ok_or(PortError::NotFound)?;
        if row.status != expected {
            return Err(PortError::Conflict);
        }
        row.status = next;
        Ok(())
    }
}

impl NotificationScheduler for InMemoryPorts {
    fn schedule(&self, expedition_id: u64, at: DateTime<Utc>) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::Notifications)?;
        world.notifications.insert(expedition_id, at);
        Ok(())
    }

    fn delete(&self, expedition_id: u64) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::Notifications)?;
        world.notifications.remove(&expedition_id);
        Ok(())
    }
}

impl ActivityLog for InMemoryPorts {
    fn append(&self, entry: &ExpeditionLogEntry) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::ActivityLog)?;
        world.log.push(entry.clone());
        Ok(())
    }

    fn count_cancels_and_recalls(
        &self,
        player_id: u64,
        since: DateTime<Utc>,
    ) -> Result<u32, PortError> {
        let count = self
            .world()
            .log
            .iter()
            .filter(|entry| {
                entry.player_id == player_id
                    && entry.at >= since
                    && entry.action.counts_toward_penalty()
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn count_successes(&self, player_id: u64) -> Result<u32, PortError> {
        let count = self
            .world()
            .log
            .iter()
            .filter(|entry| {
                entry.player_id == player_id
                    && entry.action == LogAction::Completed
                    && entry
                        .outcome
                        .is_some_and(|outcome| outcome != OutcomeKind::TotalFailure)
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

impl BadgeSink for InMemoryPorts {
    fn successful_expeditions(&self, player_id: u64, total: u32) -> Result<(), PortError> {
        let mut world = self.world();
        world.reachable(WritePath::Badges)?;
        world.badges.insert(player_id, total);
        Ok(())
    }
}

impl ExpeditionPorts for InMemoryPorts {
    type Players = Self;
    type Pets = Self;
    type Guilds = Self;
    type Expeditions = Self;
    type Notifications = Self;
    type Log = Self;
    type Badges = Self;
    type Clock = FixedClock;

    fn players(&self) -> &Self::Players {
        self
    }

    fn pets(&self) -> &Self::Pets {
        self
    }

    fn guilds(&self) -> &Self::Guilds {
        self
    }

    fn expeditions(&self) -> &Self::Expeditions {
        self
    }

    fn notifications(&self) -> &Self::Notifications {
        self
    }

    fn log(&self) -> &Self::Log {
        self
    }

    fn badges(&self) -> &Self::Badges {
        self
    }

    fn clock(&self) -> &Self::Clock {
        &self.clock
    }
}
