//! # bite_detect
//!
//! Turns per-frame face and hand detections into bite events.
//!
//! The inference itself lives behind [`InferenceProvider`]; this crate only
//! knows the shape of its answers and which landmarks matter. Each call to
//! [`DetectionLoop::process_frame`] does, in order:
//!
//! 1. honour the pacing interval and skip stale video frames,
//! 2. ask the provider for faces and hands,
//! 3. pull the mouth keypoint from the first face and three fingertips from
//!    every hand,
//! 4. report a [`TrackingStatus`],
//! 5. feed the proximity verdict into the bite state machine,
//! 6. record the frame's cost with the pacer.
//!
//! Bites, the limit and status changes come out as [`SessionEvent`]s on an
//! `mpsc` channel, so the consumer never needs to know how they were found.

pub mod config;
pub mod detection;
pub mod event;
pub mod landmarks;
pub mod provider;

pub use config::DetectionConfig;
pub use detection::{DetectionLoop, FrameOutcome};
pub use event::{SessionEvent, TrackingStatus};
pub use landmarks::{Detections, FaceDetection, HandLandmarks, LandmarkLayout};
pub use provider::{InferenceError, InferenceProvider};
