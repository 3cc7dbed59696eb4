//! The per-frame detection loop.
//!
//! `DetectionLoop` owns the bite state machine and the frame pacer for the
//! life of one monitoring session. It is driven from a single thread, one
//! call per display refresh, and never re-entered.

use std::sync::mpsc::Sender;
use std::time::Duration;

use tracing::{debug, info, warn};

use bite_machine::{
    is_near_mouth, Bite, BiteLimit, BiteState, BiteStateMachine, Clock, ConfigError, FrameScheduler,
    Point,
};

use crate::config::DetectionConfig;
use crate::event::{SessionEvent, TrackingStatus};
use crate::landmarks::Detections;
use crate::provider::InferenceProvider;

// ════════════════════════════════════════════════════════════════════════════
// FrameOutcome
// ════════════════════════════════════════════════════════════════════════════

/// What happened to one call of [`DetectionLoop::process_frame`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// The session was stopped; nothing was touched.
    Stopped,
    /// Too soon after the previous frame.
    Throttled,
    /// The video has not produced a new frame yet.
    Stale,
    /// Inference raised an error; treated as no detection.
    Failed,
    Processed {
        status: TrackingStatus,
        /// Proximity verdict, when both a mouth and fingertips were seen.
        near:   Option<bool>,
        bite:   Option<Bite>,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// DetectionLoop
// ════════════════════════════════════════════════════════════════════════════

pub struct DetectionLoop<C: Clock + Clone> {
    config:          DetectionConfig,
    clock:           C,
    machine:         BiteStateMachine<C>,
    scheduler:       FrameScheduler,
    events:          Sender<SessionEvent>,
    detecting:       bool,
    last_video_time: Option<Duration>,
    status:          Option<TrackingStatus>,
}

impl<C: Clock + Clone> DetectionLoop<C> {
    /// Begin a session with a zero count and a fresh pacer. An invalid
    /// `config` is refused before anything starts.
    pub fn start(
        config: DetectionConfig,
        limit:  BiteLimit,
        clock:  C,
        events: Sender<SessionEvent>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = FrameScheduler::new(config.scheduler)?;
        let machine   = BiteStateMachine::new(config.machine, limit, clock.clone());
        info!(%limit, "detection started");
        Ok(DetectionLoop {
            config,
            clock,
            machine,
            scheduler,
            events,
            detecting:       true,
            last_video_time: None,
            status:          None,
        })
    }

    /// Halt frame submission. Any later `process_frame` is a no-op, so a
    /// frame that was already queued cannot touch the session after this.
    pub fn stop(&mut self) {
        if self.detecting {
            self.detecting = false;
            self.machine.reset_gesture();
            info!(count = self.machine.count(), "detection stopped");
        }
    }

    pub fn is_detecting(&self) -> bool     { self.detecting }
    pub fn bite_count(&self) -> u32        { self.machine.count() }
    pub fn limit(&self) -> BiteLimit       { self.machine.limit() }
    pub fn state(&self) -> BiteState       { self.machine.state() }
    pub fn frame_interval(&self) -> Duration { self.scheduler.interval() }
    pub fn status(&self) -> Option<TrackingStatus> { self.status }
    pub fn config(&self) -> &DetectionConfig { &self.config }

    /// Run one iteration against `provider`.
    pub fn process_frame<P>(&mut self, provider: &mut P) -> FrameOutcome
    where
        P: InferenceProvider + ?Sized,
    {
        if !self.detecting {
            return FrameOutcome::Stopped;
        }

        // timers fire between frames, independent of pacing
        self.machine.poll_cooldown();

        let timestamp = self.clock.now();
        if !self.scheduler.admit(timestamp) {
            return FrameOutcome::Throttled;
        }

        let video_time = match provider.video_time() {
            Some(t) if Some(t) != self.last_video_time => t,
            _ => return FrameOutcome::Stale,
        };
        self.last_video_time = Some(video_time);

        let outcome = match provider.detect(timestamp) {
            Ok(detections) => self.evaluate(&detections),
            Err(e) => {
                warn!(error = %e, "detection error");
                FrameOutcome::Failed
            }
        };

        let cost = self.clock.now().saturating_sub(timestamp);
        self.scheduler.record(cost);
        outcome
    }

    fn evaluate(&mut self, detections: &Detections) -> FrameOutcome {
        let layout = &self.config.landmarks;
        let face   = detections.faces.first();
        let mouth: Option<Point> = face.and_then(|f| layout.mouth(f));
        let tips   = layout.fingertips(&detections.hands);

        let status = TrackingStatus::from_presence(mouth.is_some(), !tips.is_empty());
        if self.status != Some(status) {
            debug!(%status, "tracking status");
            self.status = Some(status);
            let _ = self.events.send(SessionEvent::Status(status));
        }

        let mut near = None;
        let mut bite = None;
        match mouth {
            Some(mouth) if !tips.is_empty() => {
                let face_box  = face.and_then(|f| f.bounding_box.as_ref());
                let threshold = self.config.proximity.threshold_for(face_box);
                let verdict   = is_near_mouth(&mouth, &tips, threshold);
                near = Some(verdict);
                bite = self.machine.update(verdict);
            }
            // let an in-flight gesture cool down instead of freezing it
            _ if self.machine.state() != BiteState::Idle => {
                self.machine.update(false);
            }
            _ => {}
        }

        if let Some(b) = bite {
            let limit = self.machine.limit();
            let _ = self.events.send(SessionEvent::Bite { count: b.count, limit });
            if b.limit_reached {
                info!(count = b.count, %limit, "bite limit reached");
                let _ = self.events.send(SessionEvent::LimitReached { count: b.count, limit });
            }
        }

        FrameOutcome::Processed { status, near, bite }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
