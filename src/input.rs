//! Input adapter helpers
//!
//! Turns raw platform input (accelerometer readings, key presses, pointer
//! presses) into the handful of signals the director understands.

use glam::Vec3;

/// Shake magnitude from an acceleration reading that includes gravity.
///
/// A phone lying still reads about 9.8; a vigorous shake goes well past
/// the engage threshold.
#[inline]
pub fn shake_magnitude(acceleration: Vec3) -> f32 {
    acceleration.length()
}

/// Build a reading from possibly-missing axes (browsers report `null`)
pub fn acceleration_from_axes(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Option<Vec3> {
    Some(Vec3::new(x? as f32, y? as f32, z? as f32))
}

/// Discrete commands from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Same as a tap: roll the dice
    Roll,
    /// Abandon the match and return to setup
    BackToSetup,
    ToggleSound,
}

impl Command {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            " " | "Enter" => Some(Command::Roll),
            "Escape" => Some(Command::BackToSetup),
            "m" | "M" => Some(Command::ToggleSound),
            _ => None,
        }
    }
}

/// Presses on UI buttons must not double as a roll
pub fn is_roll_press(target_tag: &str) -> bool {
    !target_tag.eq_ignore_ascii_case("button") && !target_tag.eq_ignore_ascii_case("input")
}

/// Enter in the name box adds a player; Enter on a focused button does not
pub fn submits_name(target_tag: &str, key: &str) -> bool {
    key == "Enter" && target_tag.eq_ignore_ascii_case("input")
}
