//! Reading a die's value from its orientation
//!
//! A die's six faces point along its local ±X, ±Y, ±Z axes. Opposite faces
//! sum to 7. Whichever face normal, once rotated into world space, points
//! most nearly straight up is the rolled value.

use glam::{Quat, Vec3};

/// Local face normals and their values, in canonical order.
///
/// The order breaks ties: on an exact tie the earlier entry wins.
pub const FACE_NORMALS: [(Vec3, u8); 6] = [
    (Vec3::X, 2),
    (Vec3::NEG_X, 5),
    (Vec3::Y, 1),
    (Vec3::NEG_Y, 6),
    (Vec3::Z, 3),
    (Vec3::NEG_Z, 4),
];

/// Face value (1-6) pointing toward world up for the given orientation
pub fn up_face(orientation: Quat) -> u8 {
    up_normal(orientation).1
}

/// Local normal and value of the face pointing most nearly up
pub(crate) fn up_normal(orientation: Quat) -> (Vec3, u8) {
    let dots = FACE_NORMALS.map(|(normal, _)| (orientation * normal).dot(Vec3::Y));
    FACE_NORMALS[first_max(&dots)]
}

/// Index of the largest value; the earliest index wins a tie
fn first_max(values: &[f32; 6]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
