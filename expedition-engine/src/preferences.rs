//! Per-species location preferences.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::constants::{
    DISLIKED_REWARD_MULTIPLIER, LIKED_REWARD_MULTIPLIER, NEUTRAL_REWARD_MULTIPLIER,
};
use crate::location::LocationType::{self, Cave, Coast, Desert, Forest, Mountain, Plains, Ruins, Swamp};

/// How a pet feels about a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Liked,
    Neutral,
    Disliked,
}

impl Preference {
    #[must_use]
    pub const fn reward_multiplier(self) -> f64 {
        match self {
            Self::Liked => LIKED_REWARD_MULTIPLIER,
            Self::Neutral => NEUTRAL_REWARD_MULTIPLIER,
            Self::Disliked => DISLIKED_REWARD_MULTIPLIER,
        }
    }
}

/// Liked and disliked locations for one species.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetExpeditionPreferenceConfig {
    #[serde(default)]
    pub liked: SmallVec<[LocationType; 4]>,
    #[serde(default)]
    pub disliked: SmallVec<[LocationType; 2]>,
}

impl PetExpeditionPreferenceConfig {
    #[must_use]
    pub fn new(liked: &[LocationType], disliked: &[LocationType]) -> Self {
        Self {
            liked: liked.iter().copied().collect(),
            disliked: disliked.iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn preference_for(&self, location: LocationType) -> Preference {
        if self.liked.contains(&location) {
            Preference::Liked
        } else if self.disliked.contains(&location) {
            Preference::Disliked
        } else {
            Preference::Neutral
        }
    }

    /// Checks the 0-4 liked / 0-2 disliked / no-overlap shape.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.liked.len() <= 4
            && self.disliked.len() <= 2
            && !self.liked.iter().any(|loc| self.disliked.contains(loc))
    }
}

/// Species id to preference lookup. Unknown species are neutral everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceTable {
    #[serde(default)]
    species: HashMap<u16, PetExpeditionPreferenceConfig>,
}

impl PreferenceTable {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shipped preference data.
    #[must_use]
    pub fn builtin() -> &'static Self {
        static TABLE: OnceLock<PreferenceTable> = OnceLock::new();
        TABLE.get_or_init(Self::with_defaults)
    }

    #[must_use]
    pub fn with_entry(mut self, pet_type_id: u16, config: PetExpeditionPreferenceConfig) -> Self {
        self.species.insert(pet_type_id, config);
        self
    }

    #[must_use]
    pub fn get(&self, pet_type_id: u16) -> Option<&PetExpeditionPreferenceConfig> {
        self.species.get(&pet_type_id)
    }

    /// Species whose entry breaks the liked/disliked shape, in id order.
    #[must_use]
    pub fn malformed_species(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self
            .species
            .iter()
            .filter(|(_, config)| !config.is_well_formed())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn preference(&self, pet_type_id: u16, location: LocationType) -> Preference {
        self.get(pet_type_id)
            .map_or(Preference::Neutral, |config| config.preference_for(location))
    }

    fn with_defaults() -> Self {
        const DEFAULTS: &[(u16, &[LocationType], &[LocationType])] = &[
            (1, &[Forest, Plains, Mountain], &[Swamp]),
            (2, &[Plains, Coast], &[Cave, Mountain]),
            (3, &[Coast, Swamp], &[Desert]),
            (4, &[Forest, Swamp], &[Desert, Mountain]),
            (5, &[Forest, Plains], &[Coast]),
            (6, &[Plains], &[Cave]),
            (7, &[Forest, Ruins], &[Coast]),
            (8, &[Coast], &[Desert, Cave]),
            (9, &[Mountain, Plains], &[Swamp]),
            (10, &[Swamp, Coast], &[Desert]),
            (11, &[Forest, Mountain], &[]),
            (12, &[Cave, Ruins, Mountain], &[Plains]),
            (13, &[Desert, Ruins], &[Coast, Swamp]),
            (14, &[Coast, Plains], &[Mountain]),
            (15, &[Cave, Forest], &[Desert]),
            (16, &[Mountain, Cave], &[Coast]),
            (17, &[Desert, Plains, Ruins, Mountain], &[Swamp, Coast]),
            (18, &[], &[Cave]),
            (19, &[Ruins, Cave], &[Plains]),
            (20, &[Swamp, Forest, Coast], &[Ruins]),
            (21, &[Forest, Mountain, Cave, Ruins], &[]),
            (22, &[Plains, Desert], &[Forest]),
        ];

        DEFAULTS
            .iter()
            .fold(Self::empty(), |table, &(id, liked, disliked)| {
                table.with_entry(id, PetExpeditionPreferenceConfig::new(liked, disliked))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_entries_are_well_formed() {
        let table = PreferenceTable::builtin();
        assert!(table.get(1).is_some());
        assert!(table.malformed_species().is_empty());
    }

    #[test]
    fn malformed_species_are_listed_in_id_order() {
        let table = PreferenceTable::empty()
            .with_entry(9, PetExpeditionPreferenceConfig::new(&[Cave], &[Cave]))
            .with_entry(
                4,
                PetExpeditionPreferenceConfig::new(&[], &[Forest, Plains, Desert]),
            )
            .with_entry(2, PetExpeditionPreferenceConfig::new(&[Coast], &[Ruins]));
        assert_eq!(table.malformed_species(), vec![4, 9]);
    }

    #[test]
    fn preference_lookup_covers_all_three_cases() {
        let table = PreferenceTable::builtin();
        assert_eq!(table.preference(1, Forest), Preference::Liked);
        assert_eq!(table.preference(1, Swamp), Preference::Disliked);
        assert_eq!(table.preference(1, Desert), Preference::Neutral);
        assert_eq!(table.preference(9_999, Forest), Preference::Neutral);
    }

    #[test]
    fn overlapping_sets_are_rejected() {
        let config = PetExpeditionPreferenceConfig::new(&[Forest], &[Forest]);
        assert!(!config.is_well_formed());
    }

    #[test]
    fn reward_multipliers_order_by_preference() {
        assert!(Preference::Liked.reward_multiplier() > Preference::Neutral.reward_multiplier());
        assert!(
            Preference::Neutral.reward_multiplier() > Preference::Disliked.reward_multiplier()
        );
    }
}
