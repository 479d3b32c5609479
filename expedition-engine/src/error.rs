//! Error taxonomy for expedition commands and collaborator ports.
use thiserror::Error;

use crate::service::PendingEffects;

/// Expected, user-facing reasons a command is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExpeditionError {
    #[error("the player has no pet")]
    NoPet,
    #[error("the player does not own the expedition talisman")]
    NoTalisman,
    #[error("the player is not on the main continent")]
    NotOnContinent,
    #[error("pet love {love} is below the required {required}")]
    InsufficientLove { love: u32, required: u32 },
    #[error("the pet is hungry")]
    PetHungry,
    #[error("an expedition is already in progress")]
    ExpeditionInProgress,
    #[error("no expedition is in progress")]
    NoExpedition,
    #[error("the expedition ends in {remaining_minutes} minutes")]
    ExpeditionNotComplete { remaining_minutes: i64 },
    #[error("the selected proposal no longer exists")]
    InvalidState,
    #[error("the pet has already departed; recall it instead")]
    AlreadyDeparted,
}

impl ExpeditionError {
    /// Stable code the presentation layer maps to user copy.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoPet => "NO_PET",
            Self::NoTalisman => "NO_TALISMAN",
            Self::NotOnContinent => "NOT_ON_CONTINENT",
            Self::InsufficientLove { .. } => "INSUFFICIENT_LOVE",
            Self::PetHungry => "PET_HUNGRY",
            Self::ExpeditionInProgress => "EXPEDITION_IN_PROGRESS",
            Self::NoExpedition => "NO_EXPEDITION",
            Self::ExpeditionNotComplete { .. } => "EXPEDITION_NOT_COMPLETE",
            Self::InvalidState => "INVALID_STATE",
            Self::AlreadyDeparted => "ALREADY_DEPARTED",
        }
    }
}

/// Failures reported by persistence and other collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently")]
    Conflict,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Everything [`crate::service::ExpeditionService`] can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rule(#[from] ExpeditionError),
    #[error(transparent)]
    Port(#[from] PortError),
    /// The status change is stored but some effects are not. Hand `pending`
    /// back to [`crate::service::ExpeditionService::resume_effects`].
    #[error(
        "expedition {} committed with {} effect(s) unapplied: {source}",
        .pending.expedition_id(),
        .pending.remaining().len()
    )]
    EffectsPending {
        pending: Box<PendingEffects>,
        #[source]
        source: PortError,
    },
}

impl ServiceError {
    /// The rule violation, if this is not an infrastructure failure.
    #[must_use]
    pub const fn rule(&self) -> Option<ExpeditionError> {
        match self {
            Self::Rule(err) => Some(*err),
            Self::Port(_) | Self::EffectsPending { .. } => None,
        }
    }

    /// Consume the error, keeping the unapplied effects if there are any.
    #[must_use]
    pub fn into_pending(self) -> Option<PendingEffects> {
        match self {
            Self::EffectsPending { pending, .. } => Some(*pending),
            Self::Rule(_) | Self::Port(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExpeditionError::NoPet.code(), "NO_PET");
        assert_eq!(
            ExpeditionError::ExpeditionNotComplete {
                remaining_minutes: 3
            }
            .code(),
            "EXPEDITION_NOT_COMPLETE"
        );
        assert_eq!(ExpeditionError::InvalidState.code(), "INVALID_STATE");
    }

    #[test]
    fn service_error_wraps_both_layers() {
        let rule: ServiceError = ExpeditionError::PetHungry.into();
        assert_eq!(rule.rule(), Some(ExpeditionError::PetHungry));
        assert_eq!(rule.to_string(), "the pet is hungry");
        let port: ServiceError = PortError::Conflict.into();
        assert_eq!(port.rule(), None);
    }
}
