//! Three Man - a shake-and-throw dice drinking game
//!
//! Core modules:
//! - `sim`: Deterministic core (face reading, settlement, rules, game director)
//! - `input`: Shake sensor and manual trigger helpers
//! - `settings`: Tunable thresholds and delays
//! - `error`: Setup errors
//! - `audio`: Web Audio feedback (wasm only)

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod error;
pub mod input;
pub mod settings;
pub mod sim;

pub use error::SetupError;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 3;

    /// Table surface radius (dice beyond this have left the felt)
    pub const TABLE_RADIUS: f32 = 6.0;
    /// Height of the wooden rail around the table
    pub const RAIL_HEIGHT: f32 = 0.8;
    /// A die below this height has fallen off the table
    pub const FLOOR_THRESHOLD: f32 = -5.0;

    /// Half the edge length of a die
    pub const DIE_HALF_EXTENT: f32 = 0.3;
    /// Rest spots between turns
    pub const DIE_REST_X: f32 = 0.6;
    pub const DIE_REST_HEIGHT: f32 = 2.0;
    /// Dice are lifted to this height right before the throw
    pub const DIE_THROW_HEIGHT: f32 = 4.0;

    /// Gravity (units/s², pointing down)
    pub const GRAVITY: f32 = 30.0;

    /// Settlement thresholds (units/s and rad/s)
    pub const SETTLE_LINEAR_THRESHOLD: f32 = 0.05;
    pub const SETTLE_ANGULAR_THRESHOLD: f32 = 0.05;
    /// Consecutive still ticks required before a roll counts as settled
    pub const SETTLE_DWELL_TICKS: u32 = 30;

    /// Shake magnitude that starts a shake
    pub const SHAKE_ENGAGE: f32 = 22.0;
    /// Shake magnitude below which a shake is released into a throw
    pub const SHAKE_RELEASE: f32 = 15.0;

    /// Impact speed below which collisions are silent
    pub const CLACK_MIN_IMPACT: f32 = 0.3;

    /// Drinks owed for a sloppy roll
    pub const SLOPPY_DRINKS: u8 = 2;
}

/// Convert a duration in seconds to whole simulation ticks (at least one)
#[inline]
pub fn secs_to_ticks(secs: f32) -> u32 {
    ((secs / consts::SIM_DT).round() as u32).max(1)
}
