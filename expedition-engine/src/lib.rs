//! Expedition Engine
//!
//! Pet expedition simulation for a guild-based role-playing game: proposal
//! generation, food logistics, risk and reward math, outcome resolution and
//! the expedition lifecycle. Storage, scheduling and presentation are reached
//! only through the traits in [`ports`].

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod food;
pub mod generator;
pub mod lifecycle;
pub mod location;
pub mod memory;
pub mod numbers;
pub mod outcome;
pub mod penalty;
pub mod ports;
pub mod preferences;
pub mod reward;
pub mod risk;
pub mod rng;
pub mod service;

// Re-export commonly used types
pub use cache::{PendingChoiceCache, PendingChoices, TtlCache};
pub use config::{
    CacheConfig, ConfigError, EngineConfig, LifecycleConfig, OutcomeConfig, PenaltyConfig,
};
pub use error::{ExpeditionError, PortError, ServiceError};
pub use food::{
    FoodConsumption, FoodConsumptionPlan, FoodType, GuildFoodStock, PetDiet, food_required,
    plan_food_consumption,
};
pub use generator::{
    DurationBand, ExpeditionOption, GenerationContext, generate_options, risk_from_unit,
};
pub use lifecycle::{
    Effect, ExpeditionLogEntry, ExpeditionStatus, LogAction, PetExpedition, Transition,
};
pub use location::{LocationType, MapLink, MapLocation, RewardWeights};
pub use memory::{FixedClock, InMemoryPorts, Wallet, WritePath};
pub use outcome::{ExpeditionOutcome, OutcomeKind, resolve_outcome};
pub use penalty::{PenaltyAction, love_penalty};
pub use ports::{
    ActivityLog, BadgeSink, Clock, ExpeditionPorts, ExpeditionRepository, GuildFoodStore,
    NotificationScheduler, PetSnapshot, PetSpecies, PetStore, PlayerSnapshot, PlayerStore,
    SystemClock,
};
pub use preferences::{PetExpeditionPreferenceConfig, Preference, PreferenceTable};
pub use reward::{ExpeditionRewards, ItemReward, RewardContext, calculate_reward_index};
pub use risk::{RiskInputs, effective_risk};
pub use rng::{CountingRng, ExpeditionRngs};
pub use service::{ExpeditionService, PendingEffects, StatusReport};
