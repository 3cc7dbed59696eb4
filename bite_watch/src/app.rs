//! Top-level application state machine.
//!
//! `AppState` owns the current screen, the bite limit, the running session
//! (a [`DetectionLoop`] and the receiving end of its events), the simulated
//! camera and the alarm. It handles [`SimInput`]s and drives the visualizer
//! each frame.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use tracing::{info, warn};

use bite_detect::{DetectionLoop, SessionEvent, TrackingStatus};
use bite_machine::{BiteLimit, BiteState, Clock, MonotonicClock, Point};

use crate::alarm::AlarmPlayer;
use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::replay::RecordingProvider;
use crate::sim::{SimInference, SimInput, SimKey};
use crate::visualizer::{Scene, Visualizer};

/// Limits offered by the `1`–`4` keys.
pub const LIMIT_PRESETS: [u32; 4] = [5, 10, 20, 50];

/// Render frames a bite flash lasts.
const FLASH_FRAMES: u32 = 18;

// ════════════════════════════════════════════════════════════════════════════
// Screen
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen { Setup, Monitor, Alarm }

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

struct Session<C: Clock + Clone> {
    detection: DetectionLoop<C>,
    events:    Receiver<SessionEvent>,
}

pub struct AppState<C: Clock + Clone = MonotonicClock> {
    config:    WatchConfig,
    clock:     C,
    screen:    Screen,
    limit:     BiteLimit,
    session:   Option<Session<C>>,
    sim:       SimInference<C>,
    alarm:     AlarmPlayer,
    recording: Option<BufWriter<File>>,

    // ── display ───────────────────────────────────────────────────────────
    status:    TrackingStatus,
    flash:     u32,
    /// Setup warning or alarm text.
    message:   String,
    /// Count shown on the alarm screen.
    last_count: u32,
    quit:      bool,
}

impl<C: Clock + Clone> AppState<C> {
    pub fn new(config: WatchConfig, alarm: AlarmPlayer, clock: C) -> Self {
        let sim = SimInference::new(config.sim.clone(), clock.clone());
        AppState {
            limit:      config.bite_limit,
            config,
            clock,
            screen:     Screen::Setup,
            session:    None,
            sim,
            alarm,
            recording:  None,
            status:     TrackingStatus::NoFaceNoHands,
            flash:      0,
            message:    String::new(),
            last_count: 0,
            quit:       false,
        }
    }

    /// Append every inference result to `path` as JSON lines.
    pub fn record_to(&mut self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(WatchError::RecordingWrite)?;
        info!(path = %path.display(), "recording detections");
        self.recording = Some(BufWriter::new(file));
        Ok(())
    }

    // ── transitions ──────────────────────────────────────────────────────

    /// Setup → Monitor with a fresh session.
    pub fn start_monitoring(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let detection = DetectionLoop::start(
            self.config.detection.clone(),
            self.limit,
            self.clock.clone(),
            tx,
        )?;
        if let Some(mut old) = self.session.take() {
            old.detection.stop();
        }
        self.session = Some(Session { detection, events: rx });
        self.status  = TrackingStatus::NoFaceNoHands;
        self.flash   = 0;
        self.message.clear();
        self.screen  = Screen::Monitor;
        info!(limit = %self.limit, "monitoring started");
        Ok(())
    }

    /// Monitor → Setup. The loop is halted before the session is dropped.
    pub fn stop_monitoring(&mut self) {
        self.end_session();
        self.screen = Screen::Setup;
        info!("monitoring stopped");
    }

    /// Monitor → Alarm, once the limit is reached.
    fn trigger_alarm(&mut self, count: u32) {
        self.end_session();
        self.last_count = count;
        self.message = format!("You hit {count} bites!");
        self.screen  = Screen::Alarm;
        self.alarm.start();
        info!(count, limit = %self.limit, "alarm");
    }

    /// Alarm → Setup.
    pub fn dismiss_alarm(&mut self) {
        self.alarm.stop();
        self.message.clear();
        self.screen = Screen::Setup;
    }

    fn end_session(&mut self) {
        if let Some(mut s) = self.session.take() {
            s.detection.stop();
        }
        self.flash = 0;
        if let Some(w) = self.recording.as_mut() {
            if let Err(e) = std::io::Write::flush(w) {
                warn!(error = %e, "flushing recording failed");
            }
        }
    }

    /// Set the limit from typed text (see [`BiteLimit::from_user_input`]).
    pub fn set_limit_text(&mut self, text: &str) {
        let input = BiteLimit::from_user_input(text);
        self.message = if input.is_refused() { "Don't be a fatty".to_string() } else { String::new() };
        self.limit = input.limit();
    }

    // ── input ────────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, input: SimInput) {
        if input == SimInput::KeyDown(SimKey::Quit) {
            self.quit = true;
            return;
        }
        match self.screen {
            Screen::Setup => match input {
                SimInput::KeyDown(SimKey::Up)   => self.limit = self.limit.saturating_add(1),
                SimInput::KeyDown(SimKey::Down) => self.limit = self.limit.saturating_add(-1),
                SimInput::KeyDown(SimKey::Preset(n)) => {
                    if let Some(&p) = LIMIT_PRESETS.get(usize::from(n).wrapping_sub(1)) {
                        self.set_limit_text(&p.to_string());
                    }
                }
                SimInput::KeyDown(SimKey::Enter) => {
                    if let Err(e) = self.start_monitoring() {
                        warn!(error = %e, "cannot start monitoring");
                        self.message = e.to_string();
                    }
                }
                SimInput::KeyDown(SimKey::Escape) => self.quit = true,
                _ => {}
            },
            Screen::Monitor => match input {
                SimInput::KeyDown(SimKey::Escape) => self.stop_monitoring(),
                other => self.sim.apply(other),
            },
            Screen::Alarm => match input {
                SimInput::KeyDown(SimKey::Enter | SimKey::Escape) => self.dismiss_alarm(),
                _ => {}
            },
        }
    }

    // ── per-frame tick ───────────────────────────────────────────────────

    pub fn tick(&mut self) {
        self.flash = self.flash.saturating_sub(1);

        let Some(session) = self.session.as_mut() else { return };
        match self.recording.as_mut() {
            Some(sink) => {
                let mut rec = RecordingProvider::new(&mut self.sim, sink);
                session.detection.process_frame(&mut rec);
            }
            None => {
                session.detection.process_frame(&mut self.sim);
            }
        }

        let mut reached = None;
        for event in session.events.try_iter() {
            match event {
                SessionEvent::Bite { count, limit } => {
                    info!(count, %limit, "bite");
                    self.flash = FLASH_FRAMES;
                }
                SessionEvent::Status(s) => self.status = s,
                SessionEvent::LimitReached { count, .. } => {
                    reached = Some(count);
                    break;
                }
            }
        }
        if let Some(count) = reached {
            self.trigger_alarm(count);
        }
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn screen(&self)      -> Screen          { self.screen }
    pub fn limit(&self)       -> BiteLimit       { self.limit }
    pub fn status(&self)      -> TrackingStatus  { self.status }
    pub fn message(&self)     -> &str            { &self.message }
    pub fn should_quit(&self) -> bool            { self.quit }
    pub fn alarm_sounding(&self) -> bool         { self.alarm.is_sounding() }

    pub fn bite_count(&self) -> u32 {
        match &self.session {
            Some(s) => s.detection.bite_count(),
            None    => self.last_count,
        }
    }

    pub fn gesture_state(&self) -> BiteState {
        self.session.as_ref().map_or(BiteState::Idle, |s| s.detection.state())
    }

    fn frame_interval(&self) -> Duration {
        self.session.as_ref().map_or(Duration::ZERO, |s| s.detection.frame_interval())
    }

    /// Build the visualizer's view of this frame and hand it to `draw`.
    fn with_scene<R>(&self, draw: impl FnOnce(&Scene<'_>) -> R) -> R {
        let detections = self.sim.scene();
        let layout     = &self.config.detection.landmarks;
        let face       = detections.faces.first();
        let mouth: Option<Point> = face.and_then(|f| layout.mouth(f));
        let tips       = layout.fingertips(&detections.hands);
        let threshold  = self.config.detection.proximity
            .threshold_for(face.and_then(|f| f.bounding_box.as_ref()));
        let cycle      = self.config.alarm.cycle_ms.max(1) as u128;
        let alarm_phase = (self.clock.now().as_millis() % cycle) * 2 < cycle;

        draw(&Scene {
            screen:     self.screen,
            limit:      self.limit,
            count:      self.bite_count(),
            status:     self.status.message(),
            state:      self.gesture_state(),
            interval:   self.frame_interval(),
            detections: (self.screen == Screen::Monitor).then_some(&detections),
            mouth,
            fingertips: &tips,
            threshold,
            flash:      self.flash as f32 / FLASH_FRAMES as f32,
            message:    &self.message,
            alarm_phase,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run()
// ════════════════════════════════════════════════════════════════════════════

/// Options from the command line that are not part of [`WatchConfig`].
#[derive(Debug, Default)]
pub struct RunOptions {
    pub record: Option<PathBuf>,
}

/// Open the window and run until it is closed or `Q` is pressed.
pub fn run(config: WatchConfig, opts: RunOptions) -> Result<()> {
    config.validate()?;

    let alarm   = AlarmPlayer::spawn(config.alarm.clone());
    let mut vis = Visualizer::new().map_err(WatchError::Window)?;
    let mut app = AppState::new(config, alarm, MonotonicClock::new());
    if let Some(path) = &opts.record {
        app.record_to(path)?;
    }

    while vis.is_open() && !app.should_quit() {
        for input in vis.poll_input() {
            app.handle_input(input);
        }
        app.tick();
        app.with_scene(|scene| vis.render(scene));
    }

    app.end_session();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
