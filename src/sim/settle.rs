//! Settlement detection for a thrown pair of dice
//!
//! A single near-zero velocity reading is not proof of rest: contact noise
//! in the integrator produces momentary still ticks mid-bounce. A roll is
//! only settled after both dice stay below the velocity thresholds for more
//! than `dwell_ticks` consecutive ticks. Leaving the table is checked every
//! tick and always wins.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Per-tick kinematic snapshot of one die (read-only for the core)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DieObservation {
    pub position: Vec3,
    /// Linear velocity magnitude
    pub linear_speed: f32,
    /// Angular velocity magnitude
    pub angular_speed: f32,
    pub orientation: Quat,
}

impl DieObservation {
    /// Horizontal distance from the table center
    #[inline]
    pub fn horizontal_distance(&self) -> f32 {
        Vec3::new(self.position.x, 0.0, self.position.z).length()
    }
}

/// Outcome of a settlement check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Both dice have been still long enough to read
    Settled,
    /// A die fell below the floor or left the table footprint
    OffTable,
}

/// Consecutive-still-tick counter with fixed thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementMonitor {
    pub linear_threshold: f32,
    pub angular_threshold: f32,
    pub dwell_ticks: u32,
    pub floor_threshold: f32,
    pub table_radius: f32,
    counter: u32,
}

impl Default for SettlementMonitor {
    fn default() -> Self {
        Self {
            linear_threshold: SETTLE_LINEAR_THRESHOLD,
            angular_threshold: SETTLE_ANGULAR_THRESHOLD,
            dwell_ticks: SETTLE_DWELL_TICKS,
            floor_threshold: FLOOR_THRESHOLD,
            table_radius: TABLE_RADIUS,
            counter: 0,
        }
    }
}

impl SettlementMonitor {
    /// Consecutive still ticks seen so far
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Forget any still ticks (called when a throw starts)
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    fn is_still(&self, die: &DieObservation) -> bool {
        die.linear_speed < self.linear_threshold && die.angular_speed < self.angular_threshold
    }

    fn is_off_table(&self, die: &DieObservation) -> bool {
        die.position.y < self.floor_threshold || die.horizontal_distance() > self.table_radius
    }

    /// Inspect one tick worth of observations for both dice
    pub fn observe(&mut self, a: &DieObservation, b: &DieObservation) -> Option<Settlement> {
        if self.is_still(a) && self.is_still(b) {
            self.counter += 1;
        } else {
            self.counter = 0;
        }

        if self.is_off_table(a) || self.is_off_table(b) {
            return Some(Settlement::OffTable);
        }

        (self.counter > self.dwell_ticks).then_some(Settlement::Settled)
    }
}
