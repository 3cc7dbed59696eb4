//! Simulated face and hand inference.
//!
//! The window sends [`SimInput`]s: pointer motion places one hand, keys show
//! or hide the face and hand and move the face closer to or farther from the
//! camera. [`SimInference`] turns that into the same [`Detections`] a real
//! model would return, with a camera ticking at a fixed frame rate so stale
//! frames occur as they do with a live video element.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use bite_detect::{Detections, FaceDetection, HandLandmarks, InferenceError, InferenceProvider};
use bite_machine::{BoundingBox, Clock, ConfigError, MonotonicClock, Point};

// ════════════════════════════════════════════════════════════════════════════
// SimInput
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the window, in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer over the camera view, normalised to 0.0–1.0.
    Pointer { x: f64, y: f64 },
    KeyDown(SimKey),
}

/// Keys the window forwards (mapped from minifb `Key`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Up,           // ↑
    Down,         // ↓
    Enter,        // Return / Space
    Escape,       // Esc
    ToggleFace,   // F
    ToggleHands,  // H
    Preset(u8),   // 1–4
    Quit,         // Q
}

// ════════════════════════════════════════════════════════════════════════════
// SimConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub camera_fps: f64,
    /// Artificial inference cost per frame.
    pub latency_ms: u64,
    /// Initial face width as a fraction of the frame width.
    pub face_width: f64,
    pub face_step:  f64,
    pub min_face:   f64,
    pub max_face:   f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            camera_fps: 30.0,
            latency_ms: 0,
            face_width: 0.3,
            face_step:  0.04,
            min_face:   0.1,
            max_face:   0.8,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.camera_fps > 0.0) {
            return Err(ConfigError::NonPositive("camera_fps"));
        }
        if !(self.min_face > 0.0 && self.min_face <= self.max_face) {
            return Err(ConfigError::NonPositive("min_face"));
        }
        Ok(())
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.camera_fps)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimInference
// ════════════════════════════════════════════════════════════════════════════

const FACE_CENTRE: Point = Point::new(0.5, 0.42);

/// Tip offsets from the pointer: thumb, index, middle, ring, pinky.
const TIP_OFFSETS: [(f64, f64); 5] = [
    (-0.025,  0.010),
    (-0.005, -0.012),
    ( 0.012, -0.008),
    ( 0.028,  0.004),
    ( 0.040,  0.020),
];

/// Wrist sits below the pointer.
const WRIST_OFFSET: (f64, f64) = (0.01, 0.16);

pub struct SimInference<C: Clock = MonotonicClock> {
    config:        SimConfig,
    clock:         C,
    pointer:       Point,
    face_visible:  bool,
    hands_visible: bool,
    face_width:    f64,
}

impl<C: Clock> SimInference<C> {
    pub fn new(config: SimConfig, clock: C) -> Self {
        let face_width = config.face_width.clamp(config.min_face, config.max_face);
        SimInference {
            config,
            clock,
            pointer:       Point::new(0.8, 0.8),
            face_visible:  true,
            hands_visible: true,
            face_width,
        }
    }

    /// Apply the parts of an input that concern the simulated scene.
    pub fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Pointer { x, y } => {
                self.pointer = Point::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
            }
            SimInput::KeyDown(SimKey::ToggleFace)  => self.face_visible  = !self.face_visible,
            SimInput::KeyDown(SimKey::ToggleHands) => self.hands_visible = !self.hands_visible,
            SimInput::KeyDown(SimKey::Up)          => self.move_face(self.config.face_step),
            SimInput::KeyDown(SimKey::Down)        => self.move_face(-self.config.face_step),
            SimInput::KeyDown(_)                   => {}
        }
    }

    fn move_face(&mut self, delta: f64) {
        self.face_width = (self.face_width + delta).clamp(self.config.min_face, self.config.max_face);
        trace!(width = self.face_width, "face moved");
    }

    pub fn face_visible(&self)  -> bool  { self.face_visible }
    pub fn hands_visible(&self) -> bool  { self.hands_visible }
    pub fn face_width(&self)    -> f64   { self.face_width }
    pub fn pointer(&self)       -> Point { self.pointer }

    /// What the model would see right now.
    pub fn scene(&self) -> Detections {
        let mut d = Detections::default();
        if self.face_visible {
            d.faces.push(self.face());
        }
        if self.hands_visible {
            d.hands.push(self.hand());
        }
        d
    }

    /// Six keypoints: right eye, left eye, nose tip, mouth, right ear, left ear.
    fn face(&self) -> FaceDetection {
        let w = self.face_width;
        let h = w * 1.2;
        let c = FACE_CENTRE;
        let at = |dx: f64, dy: f64| Point::new(c.x + dx * w, c.y + dy * w);
        FaceDetection {
            bounding_box: Some(BoundingBox {
                origin_x: c.x - w / 2.0,
                origin_y: c.y - h / 2.0,
                width:    w,
                height:   h,
            }),
            keypoints: vec![
                at(-0.2, -0.15),
                at( 0.2, -0.15),
                at( 0.0,  0.05),
                at( 0.0,  0.28),
                at(-0.5,  0.0),
                at( 0.5,  0.0),
            ],
        }
    }

    /// 21 landmarks: the wrist, then four joints per finger ending at the tip.
    fn hand(&self) -> HandLandmarks {
        let p = self.pointer;
        let wrist = Point::new(p.x + WRIST_OFFSET.0, p.y + WRIST_OFFSET.1);
        let mut points = Vec::with_capacity(21);
        points.push(wrist);
        for (dx, dy) in TIP_OFFSETS {
            let tip = Point::new(p.x + dx, p.y + dy);
            for j in 1..=4u32 {
                let t = f64::from(j) / 4.0;
                points.push(Point::new(
                    wrist.x + (tip.x - wrist.x) * t,
                    wrist.y + (tip.y - wrist.y) * t,
                ));
            }
        }
        HandLandmarks(points)
    }
}

impl<C: Clock> InferenceProvider for SimInference<C> {
    fn video_time(&self) -> Option<Duration> {
        let period = self.config.frame_period();
        let frame  = (self.clock.now().as_secs_f64() / period.as_secs_f64()).floor();
        Some(period.mul_f64(frame))
    }

    fn detect(&mut self, _timestamp: Duration) -> Result<Detections, InferenceError> {
        if self.config.latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.latency_ms));
        }
        Ok(self.scene())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
