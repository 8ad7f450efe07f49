//! Deterministic game core
//!
//! All gameplay logic lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No rendering or platform dependencies
//!
//! The physics engine is reached only through the [`DiceRig`] trait.

pub mod director;
pub mod face;
pub mod rig;
pub mod rules;
pub mod settle;
pub mod state;

pub use director::{DelayToken, DirectorConfig, GameDirector, GameEvent, StatusView};
pub use face::{FACE_NORMALS, up_face};
pub use rig::{DiceRig, DieId, TableRig, random_throw};
pub use rules::{RollOutcome, RuleEvent, doubles_drinks, evaluate};
pub use settle::{DieObservation, Settlement, SettlementMonitor};
pub use state::{GamePhase, GameSession, Hud, Player};
