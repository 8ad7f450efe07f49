//! Errors raised while setting up a match
//!
//! Gameplay inputs never error: a trigger in the wrong phase is simply
//! ignored. Only roster and start-up requests can be rejected.

use thiserror::Error;

use crate::sim::GamePhase;

/// Reasons a setup request was rejected. Rejection never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("need at least 2 players to start, have {count}")]
    NotEnoughPlayers { count: usize },

    #[error("player name is empty")]
    EmptyName,

    #[error("no player at index {index}")]
    NoSuchPlayer { index: usize },

    #[error("not allowed during {phase:?}")]
    WrongPhase { phase: GamePhase },
}
