//! Hand-to-mouth proximity.
//!
//! All coordinates are normalised frame space: `(0, 0)` is the top-left
//! corner of the video frame and `(1, 1)` the bottom-right.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Geometry
// ════════════════════════════════════════════════════════════════════════════

/// A 2-D point in normalised frame space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned face bounding box, normalised like [`Point`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
    pub width:    f64,
    #[serde(default)]
    pub height:   f64,
}

// ════════════════════════════════════════════════════════════════════════════
// ProximityConfig
// ════════════════════════════════════════════════════════════════════════════

/// Tuning for the detection radius around the mouth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Radius used when no face box is available.
    pub fallback_threshold:    f64,
    /// Radius as a fraction of the detected face width.
    pub face_width_multiplier: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        ProximityConfig {
            fallback_threshold:    0.08,
            face_width_multiplier: 0.25,
        }
    }
}

impl ProximityConfig {
    /// [`proximity_threshold`] with this config's constants.
    pub fn threshold_for(&self, face_box: Option<&BoundingBox>) -> f64 {
        proximity_threshold(face_box, self.fallback_threshold, self.face_width_multiplier)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pure policy functions
// ════════════════════════════════════════════════════════════════════════════

/// Detection radius for this frame.
///
/// Scales with the face width so the radius grows as the user leans in;
/// without a face box the fixed `fallback` is used.
pub fn proximity_threshold(face_box: Option<&BoundingBox>, fallback: f64, multiplier: f64) -> f64 {
    match face_box {
        Some(bb) => bb.width * multiplier,
        None     => fallback,
    }
}

/// True iff any fingertip lies strictly within `threshold` of the mouth.
pub fn is_near_mouth(mouth: &Point, fingertips: &[Point], threshold: f64) -> bool {
    let threshold_sq = threshold * threshold;
    fingertips.iter().any(|tip| mouth.distance_sq(tip) < threshold_sq)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
