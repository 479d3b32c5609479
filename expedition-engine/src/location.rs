//! Location types and their terrain-dependent balance data.
use serde::{Deserialize, Serialize};

/// Terrain an expedition takes place in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Forest,
    Mountain,
    Desert,
    Swamp,
    Ruins,
    Cave,
    Plains,
    Coast,
}

/// Money, experience and points weights applied to base rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    pub money: f64,
    pub experience: f64,
    pub points: f64,
}

impl LocationType {
    pub const ALL: [Self; 8] = [
        Self::Forest,
        Self::Mountain,
        Self::Desert,
        Self::Swamp,
        Self::Ruins,
        Self::Cave,
        Self::Plains,
        Self::Coast,
    ];

    /// Derive the location from a two-letter map type code.
    #[must_use]
    pub fn from_map_type(map_type: &str) -> Self {
        match map_type.trim().to_ascii_lowercase().as_str() {
            "fo" => Self::Forest,
            "mo" => Self::Mountain,
            "de" => Self::Desert,
            "ma" => Self::Swamp,
            "ru" | "ci" | "cs" => Self::Ruins,
            "ca" => Self::Cave,
            "be" | "ri" | "la" => Self::Coast,
            _ => Self::Plains,
        }
    }

    /// Exponent shaping the risk distribution; below 1 favours low risk.
    #[must_use]
    pub const fn risk_skew(self) -> f64 {
        match self {
            Self::Plains => 0.5,
            Self::Coast => 0.7,
            Self::Forest => 0.8,
            Self::Desert => 1.2,
            Self::Swamp => 1.4,
            Self::Mountain => 1.5,
            Self::Ruins => 1.6,
            Self::Cave => 1.8,
        }
    }

    #[must_use]
    pub const fn reward_weights(self) -> RewardWeights {
        const fn w(money: f64, experience: f64, points: f64) -> RewardWeights {
            RewardWeights {
                money,
                experience,
                points,
            }
        }
        match self {
            Self::Forest => w(1.0, 1.2, 0.8),
            Self::Mountain => w(0.8, 1.6, 1.0),
            Self::Desert => w(1.4, 0.8, 1.0),
            Self::Swamp => w(0.6, 1.4, 1.2),
            Self::Ruins => w(2.2, 0.4, 1.4),
            Self::Cave => w(1.8, 1.0, 0.6),
            Self::Plains => w(0.8, 0.8, 1.6),
            Self::Coast => w(1.2, 0.2, 2.0),
        }
    }

    /// Multiplier on the clone talisman drop chance; 1.0 outside the bonus list.
    #[must_use]
    pub const fn talisman_bonus_factor(self) -> f64 {
        match self {
            Self::Ruins | Self::Cave => 2.0,
            _ => 1.0,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Mountain => "mountain",
            Self::Desert => "desert",
            Self::Swamp => "swamp",
            Self::Ruins => "ruins",
            Self::Cave => "cave",
            Self::Plains => "plains",
            Self::Coast => "coast",
        }
    }
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A map location as seen by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLocation {
    pub id: u32,
    pub map_type: String,
}

impl MapLocation {
    #[must_use]
    pub fn new(id: u32, map_type: impl Into<String>) -> Self {
        Self {
            id,
            map_type: map_type.into(),
        }
    }

    #[must_use]
    pub fn location_type(&self) -> LocationType {
        LocationType::from_map_type(&self.map_type)
    }
}

/// The path the player is currently travelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLink {
    pub id: u32,
    pub start: MapLocation,
    pub end: MapLocation,
}
