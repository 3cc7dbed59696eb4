//! The inference collaborator.

use std::time::Duration;

use thiserror::Error;

use crate::landmarks::Detections;

/// A single frame's inference failed. The loop logs it and carries on.
#[derive(Debug, Error)]
#[error("inference failed: {message}")]
pub struct InferenceError {
    pub message: String,
}

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        InferenceError { message: message.into() }
    }
}

/// Anything that can look at the current video frame and report faces and
/// hands in it. Real models, simulators and recordings all fit here.
pub trait InferenceProvider {
    /// Presentation time of the frame currently available, or `None` while
    /// the video is not ready yet.
    fn video_time(&self) -> Option<Duration>;

    /// Run face and hand inference on the current frame.
    fn detect(&mut self, timestamp: Duration) -> Result<Detections, InferenceError>;
}

impl<P: InferenceProvider + ?Sized> InferenceProvider for &mut P {
    fn video_time(&self) -> Option<Duration> {
        (**self).video_time()
    }

    fn detect(&mut self, timestamp: Duration) -> Result<Detections, InferenceError> {
        (**self).detect(timestamp)
    }
}

impl<P: InferenceProvider + ?Sized> InferenceProvider for Box<P> {
    fn video_time(&self) -> Option<Duration> {
        (**self).video_time()
    }

    fn detect(&mut self, timestamp: Duration) -> Result<Detections, InferenceError> {
        (**self).detect(timestamp)
    }
}
