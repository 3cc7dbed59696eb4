//! Detection results and the landmark indices we read from them.

use serde::{Deserialize, Serialize};
use tracing::trace;

use bite_machine::{BoundingBox, Point};

// ════════════════════════════════════════════════════════════════════════════
// Detection results
// ════════════════════════════════════════════════════════════════════════════

/// One detected face.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Ordered keypoints as defined by the face model.
    #[serde(default)]
    pub keypoints:    Vec<Point>,
}

/// One detected hand: ordered landmarks with fixed anatomical indexing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks(pub Vec<Point>);

/// Everything the provider found in one video frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    #[serde(default)]
    pub faces: Vec<FaceDetection>,
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkLayout
// ════════════════════════════════════════════════════════════════════════════

/// Which keypoint is the mouth and which hand landmarks are fingertips.
///
/// These belong to the face/hand model's output contract. The defaults match
/// a six-keypoint short-range face detector (right eye, left eye, nose tip,
/// mouth, right ear, left ear) and a 21-point hand landmarker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkLayout {
    pub mouth_keypoint: usize,
    /// Thumb, index and middle tips.
    pub fingertips:     Vec<usize>,
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        LandmarkLayout {
            mouth_keypoint: 3,
            fingertips:     vec![4, 8, 12],
        }
    }
}

impl LandmarkLayout {
    /// Mouth position of `face`, if the face has enough keypoints.
    pub fn mouth(&self, face: &FaceDetection) -> Option<Point> {
        face.keypoints.get(self.mouth_keypoint).copied()
    }

    /// Fingertips of every hand, in hand order.
    ///
    /// A hand missing any configured fingertip is skipped entirely.
    pub fn fingertips(&self, hands: &[HandLandmarks]) -> Vec<Point> {
        let mut tips = Vec::with_capacity(hands.len() * self.fingertips.len());
        for (i, hand) in hands.iter().enumerate() {
            let found: Option<Vec<Point>> = self.fingertips.iter()
                .map(|&idx| hand.0.get(idx).copied())
                .collect();
            match found {
                Some(points) => tips.extend(points),
                None => trace!(hand = i, landmarks = hand.0.len(), "hand has too few landmarks"),
            }
        }
        tips
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(n: usize, base: f64) -> HandLandmarks {
        HandLandmarks((0..n).map(|i| Point::new(base + i as f64 * 0.001, base)).collect())
    }

    #[test]
    fn mouth_is_fourth_keypoint() {
        let face = FaceDetection {
            bounding_box: None,
            keypoints: vec![
                Point::new(0.4, 0.4),
                Point::new(0.6, 0.4),
                Point::new(0.5, 0.5),
                Point::new(0.5, 0.6),
            ],
        };
        assert_eq!(LandmarkLayout::default().mouth(&face), Some(Point::new(0.5, 0.6)));
    }

    #[test]
    fn short_keypoint_list_has_no_mouth() {
        let face = FaceDetection {
            bounding_box: None,
            keypoints: vec![Point::default(); 3],
        };
        assert_eq!(LandmarkLayout::default().mouth(&face), None);
    }

    #[test]
    fn three_tips_per_hand() {
        let layout = LandmarkLayout::default();
        let tips = layout.fingertips(&[hand(21, 0.1), hand(21, 0.7)]);
        assert_eq!(tips.len(), 6);
        assert_eq!(tips[0], hand(21, 0.1).0[4]);
        assert_eq!(tips[1], hand(21, 0.1).0[8]);
        assert_eq!(tips[2], hand(21, 0.1).0[12]);
        assert_eq!(tips[3], hand(21, 0.7).0[4]);
    }

    #[test]
    fn truncated_hand_is_skipped() {
        let tips = LandmarkLayout::default().fingertips(&[hand(10, 0.1), hand(21, 0.5)]);
        assert_eq!(tips.len(), 3);
        assert_eq!(tips[0], hand(21, 0.5).0[4]);
    }
}
