//! Dice rig: the boundary to the rigid-body engine
//!
//! The director only ever talks to physics through [`DiceRig`]. `TableRig`
//! is a small built-in kinematic rig (gravity, bounce, contact friction, a
//! rail that dice can clear) good enough to play whole matches headless.

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::face::up_normal;
use super::settle::DieObservation;
use crate::consts::*;

/// Which of the two dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieId {
    A,
    B,
}

impl DieId {
    pub const BOTH: [DieId; 2] = [DieId::A, DieId::B];

    pub fn index(self) -> usize {
        match self {
            DieId::A => 0,
            DieId::B => 1,
        }
    }

    /// Where this die waits between turns
    pub fn rest_position(self) -> Vec3 {
        match self {
            DieId::A => Vec3::new(-DIE_REST_X, DIE_REST_HEIGHT, 0.0),
            DieId::B => Vec3::new(DIE_REST_X, DIE_REST_HEIGHT, 0.0),
        }
    }
}

/// Physics collaborator owning the two die bodies
pub trait DiceRig {
    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);

    /// Lift both dice into the hand and make them dynamic
    fn prepare_throw(&mut self);

    /// Kick one die; `offset` is the application point relative to its center
    fn apply_throw_impulse(&mut self, die: DieId, impulse: Vec3, offset: Vec3);

    /// Kinematic state of one die this tick
    fn observe(&self, die: DieId) -> DieObservation;

    /// Freeze both dice at their rest spots, face 1 up
    fn park(&mut self);

    /// Impact speeds of collisions since the last call (audio feedback only)
    fn take_impacts(&mut self) -> Vec<f32> {
        Vec::new()
    }
}

/// Randomized throw impulse and application offset for one die
pub fn random_throw<R: Rng + ?Sized>(rng: &mut R) -> (Vec3, Vec3) {
    let impulse = Vec3::new(rng.random_range(-3.0..3.0), 15.0, -8.0);
    let offset = Vec3::new(
        rng.random::<f32>() * 0.2,
        0.2,
        rng.random::<f32>() * 0.2,
    );
    (impulse, offset)
}

const DIE_MASS: f32 = 2.0;
/// Solid cube: m * s² / 6
const DIE_INERTIA: f32 = DIE_MASS * (2.0 * DIE_HALF_EXTENT) * (2.0 * DIE_HALF_EXTENT) / 6.0;
const RESTITUTION: f32 = 0.3;
const LINEAR_DAMPING: f32 = 0.4;
const ANGULAR_DAMPING: f32 = 0.4;
/// Exponential decay rates while touching the felt
const CONTACT_FRICTION: f32 = 3.0;
const CONTACT_SPIN_DAMPING: f32 = 4.0;
/// How quickly a grounded die tips onto its nearest face
const FLATTEN_RATE: f32 = 8.0;
/// Bounces slower than this stick
const BOUNCE_STOP: f32 = 0.5;
/// Grounded dice slower than this are put to sleep
const SLEEP_SPEED: f32 = 0.02;

#[derive(Debug, Clone)]
struct DieBody {
    position: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    orientation: Quat,
    dynamic: bool,
}

impl DieBody {
    fn parked(id: DieId) -> Self {
        Self {
            position: id.rest_position(),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            dynamic: false,
        }
    }

    fn horizontal(&self) -> Vec3 {
        Vec3::new(self.position.x, 0.0, self.position.z)
    }

    fn asleep(&self) -> bool {
        self.position.y <= DIE_HALF_EXTENT
            && self.velocity == Vec3::ZERO
            && self.angular_velocity == Vec3::ZERO
    }

    /// Integrate one step, recording impact speeds against table and rail
    fn integrate(&mut self, dt: f32, impacts: &mut Vec<f32>) {
        if self.asleep() {
            return;
        }
        self.velocity.y -= GRAVITY * dt;
        self.velocity *= 1.0 - LINEAR_DAMPING * dt;
        self.angular_velocity *= 1.0 - ANGULAR_DAMPING * dt;

        self.position += self.velocity * dt;
        if self.angular_velocity.length_squared() > 0.0 {
            self.orientation =
                (Quat::from_scaled_axis(self.angular_velocity * dt) * self.orientation).normalize();
        }

        let r = self.horizontal().length();
        if r > TABLE_RADIUS {
            // Nothing underneath: free fall
            return;
        }

        // Rail
        let rail_r = TABLE_RADIUS - DIE_HALF_EXTENT;
        if self.position.y < RAIL_HEIGHT && r > rail_r {
            let n = self.horizontal() / r;
            let outward = self.velocity.dot(n);
            if outward > 0.0 {
                impacts.push(outward);
                self.velocity -= n * (1.0 + RESTITUTION) * outward;
            }
            self.position -= n * (r - rail_r);
        }

        // Felt
        if self.position.y <= DIE_HALF_EXTENT {
            self.position.y = DIE_HALF_EXTENT;
            if self.velocity.y < 0.0 {
                // Resting contact picks up one tick of gravity; that is not a hit
                if -self.velocity.y > 2.0 * GRAVITY * dt {
                    impacts.push(-self.velocity.y);
                }
                self.velocity.y = -self.velocity.y * RESTITUTION;
                if self.velocity.y < BOUNCE_STOP {
                    self.velocity.y = 0.0;
                }
            }

            let slide = (-CONTACT_FRICTION * dt).exp();
            self.velocity.x *= slide;
            self.velocity.z *= slide;
            self.angular_velocity *= (-CONTACT_SPIN_DAMPING * dt).exp();

            let (local_up, _) = up_normal(self.orientation);
            let flat = Quat::from_rotation_arc(self.orientation * local_up, Vec3::Y)
                * self.orientation;
            self.orientation = self
                .orientation
                .slerp(flat, (FLATTEN_RATE * dt).min(1.0))
                .normalize();

            if self.velocity.length() < SLEEP_SPEED && self.angular_velocity.length() < SLEEP_SPEED
            {
                self.velocity = Vec3::ZERO;
                self.angular_velocity = Vec3::ZERO;
            }
        }
    }
}

/// Built-in kinematic dice rig on a round table
#[derive(Debug, Clone)]
pub struct TableRig {
    dice: [DieBody; 2],
    impacts: Vec<f32>,
}

impl Default for TableRig {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRig {
    pub fn new() -> Self {
        Self {
            dice: [DieBody::parked(DieId::A), DieBody::parked(DieId::B)],
            impacts: Vec::new(),
        }
    }

    /// Push overlapping dice apart sideways and exchange normal velocity.
    /// Contact is horizontal only, so dice never stack.
    fn resolve_die_contact(&mut self) {
        let [a, b] = &mut self.dice;
        if !(a.dynamic && b.dynamic) {
            return;
        }
        let min_dist = 2.0 * DIE_HALF_EXTENT;
        if (b.position.y - a.position.y).abs() >= min_dist {
            return;
        }
        let delta = b.horizontal() - a.horizontal();
        let dist = delta.length();
        if dist >= min_dist || dist < 1e-4 {
            return;
        }
        let n = delta / dist;
        let push = n * (min_dist - dist) * 0.5;
        a.position -= push;
        b.position += push;

        let closing = (b.velocity - a.velocity).dot(n);
        if closing < 0.0 {
            self.impacts.push(-closing);
            let j = -(1.0 + RESTITUTION) * closing * 0.5;
            a.velocity -= n * j;
            b.velocity += n * j;
        }
    }
}

impl DiceRig for TableRig {
    fn step(&mut self, dt: f32) {
        for die in self.dice.iter_mut().filter(|d| d.dynamic) {
            die.integrate(dt, &mut self.impacts);
        }
        self.resolve_die_contact();
    }

    fn prepare_throw(&mut self) {
        for id in DieId::BOTH {
            let die = &mut self.dice[id.index()];
            die.position = Vec3::new(id.rest_position().x, DIE_THROW_HEIGHT, 0.0);
            die.velocity = Vec3::ZERO;
            die.angular_velocity = Vec3::ZERO;
            die.dynamic = true;
        }
    }

    fn apply_throw_impulse(&mut self, die: DieId, impulse: Vec3, offset: Vec3) {
        let body = &mut self.dice[die.index()];
        if !body.dynamic {
            return;
        }
        body.velocity += impulse / DIE_MASS;
        body.angular_velocity += offset.cross(impulse) / DIE_INERTIA;
    }

    fn observe(&self, die: DieId) -> DieObservation {
        let body = &self.dice[die.index()];
        DieObservation {
            position: body.position,
            linear_speed: body.velocity.length(),
            angular_speed: body.angular_velocity.length(),
            orientation: body.orientation,
        }
    }

    fn park(&mut self) {
        self.dice = [DieBody::parked(DieId::A), DieBody::parked(DieId::B)];
    }

    fn take_impacts(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.impacts)
    }
}
