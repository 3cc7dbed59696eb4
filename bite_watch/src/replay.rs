//! Recording inference results to JSON lines and replaying them headless.
//!
//! One line per video frame:
//!
//! ```text
//! {"t_ms":1033.3,"cost_ms":12.0,"detections":{"faces":[…],"hands":[[…]]}}
//! ```
//!
//! `t_ms` is the video time of the frame and `cost_ms` how long inference
//! took when it was recorded. Replay feeds the frames through a
//! [`DetectionLoop`] on a [`ManualClock`], so a recording reproduces the same
//! bites, pacing and cooldowns every time.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bite_detect::{
    DetectionLoop, Detections, FrameOutcome, InferenceError, InferenceProvider, SessionEvent,
};
use bite_machine::{BiteLimit, Clock, ManualClock};

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::loader::load_with_fallback;

// ════════════════════════════════════════════════════════════════════════════
// RecordedFrame
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub t_ms:       f64,
    #[serde(default)]
    pub cost_ms:    f64,
    pub detections: Detections,
}

/// Longest video time or inference cost a recording may hold.
pub const MAX_RECORDED: Duration = Duration::from_secs(24 * 60 * 60);

fn recorded_duration(ms: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0)
        .ok()
        .filter(|d| *d <= MAX_RECORDED)
}

impl RecordedFrame {
    /// Negative times read as zero; anything past [`MAX_RECORDED`] is capped.
    pub fn time(&self) -> Duration {
        recorded_duration(self.t_ms).unwrap_or(MAX_RECORDED)
    }

    pub fn cost(&self) -> Duration {
        recorded_duration(self.cost_ms).unwrap_or(MAX_RECORDED)
    }

    fn out_of_range(&self) -> Option<(&'static str, f64)> {
        [("t_ms", self.t_ms), ("cost_ms", self.cost_ms)]
            .into_iter()
            .find(|&(_, ms)| recorded_duration(ms).is_none())
    }
}

/// Parse a JSON-lines recording. Blank lines are ignored; frames are
/// returned in time order. A time or cost beyond [`MAX_RECORDED`] rejects
/// the whole recording.
pub fn parse_recording(text: &str, path: &Path) -> Result<Vec<RecordedFrame>> {
    let mut frames = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let frame: RecordedFrame = serde_json::from_str(line).map_err(|source| WatchError::Recording {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        if let Some((field, value)) = frame.out_of_range() {
            return Err(WatchError::RecordingTime {
                path: path.to_path_buf(),
                line: i + 1,
                field,
                value,
            });
        }
        frames.push(frame);
    }
    frames.sort_by(|a, b| a.t_ms.total_cmp(&b.t_ms));
    Ok(frames)
}

pub fn read_recording(path: &Path) -> Result<Vec<RecordedFrame>> {
    let text = fs::read_to_string(path).map_err(|source| WatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_recording(&text, path)
}

// ════════════════════════════════════════════════════════════════════════════
// RecordingProvider
// ════════════════════════════════════════════════════════════════════════════

/// Wraps a provider and writes every successful result to `sink`.
///
/// A failed write is logged and ends the recording; inference carries on.
pub struct RecordingProvider<P, W: Write> {
    inner: P,
    sink:  Option<W>,
}

impl<P: InferenceProvider, W: Write> RecordingProvider<P, W> {
    pub fn new(inner: P, sink: W) -> Self {
        RecordingProvider { inner, sink: Some(sink) }
    }

    pub fn is_recording(&self) -> bool {
        self.sink.is_some()
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: InferenceProvider, W: Write> InferenceProvider for RecordingProvider<P, W> {
    fn video_time(&self) -> Option<Duration> {
        self.inner.video_time()
    }

    fn detect(&mut self, timestamp: Duration) -> std::result::Result<Detections, InferenceError> {
        let started    = Instant::now();
        let detections = self.inner.detect(timestamp)?;
        let cost       = started.elapsed();

        if let Some(sink) = self.sink.as_mut() {
            let frame = RecordedFrame {
                t_ms:       self.inner.video_time().unwrap_or(timestamp).as_secs_f64() * 1000.0,
                cost_ms:    cost.as_secs_f64() * 1000.0,
                detections: detections.clone(),
            };
            let written = serde_json::to_string(&frame)
                .map_err(std::io::Error::from)
                .and_then(|line| writeln!(sink, "{line}"));
            if let Err(e) = written {
                warn!(error = %WatchError::RecordingWrite(e), "recording stopped");
                self.sink = None;
            }
        }
        Ok(detections)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayProvider
// ════════════════════════════════════════════════════════════════════════════

/// Serves recorded frames as a camera would: the current frame is the
/// latest one whose time has passed on `clock`. Inference advances the
/// clock by the recorded cost.
pub struct ReplayProvider {
    frames: Vec<RecordedFrame>,
    clock:  ManualClock,
    served: Option<usize>,
}

impl ReplayProvider {
    pub fn new(frames: Vec<RecordedFrame>, clock: ManualClock) -> Self {
        ReplayProvider { frames, clock, served: None }
    }

    fn current(&self) -> Option<usize> {
        let now = self.clock.now();
        self.frames.partition_point(|f| f.time() <= now).checked_sub(1)
    }

    /// Time of the last frame, or zero for an empty recording.
    pub fn end(&self) -> Duration {
        self.frames.last().map(RecordedFrame::time).unwrap_or_default()
    }

    /// True once the last frame has been served.
    pub fn exhausted(&self) -> bool {
        match self.frames.len() {
            0 => true,
            n => self.served == Some(n - 1),
        }
    }
}

impl InferenceProvider for ReplayProvider {
    fn video_time(&self) -> Option<Duration> {
        self.current().map(|i| self.frames[i].time())
    }

    fn detect(&mut self, _timestamp: Duration) -> std::result::Result<Detections, InferenceError> {
        let i = self.current().ok_or_else(|| InferenceError::new("no frame yet"))?;
        self.served = Some(i);
        let frame = &self.frames[i];
        self.clock.advance(frame.cost());
        Ok(frame.detections.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run_replay
// ════════════════════════════════════════════════════════════════════════════

/// Display refresh period the replay is stepped at.
const REFRESH: Duration = Duration::from_millis(16);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplayReport {
    /// Which recording was used.
    pub source:        String,
    /// `(session time, count)` of every bite.
    pub bites:         Vec<(Duration, u32)>,
    /// Count at which the limit fired, if it did.
    pub limit_reached: Option<u32>,
    pub processed:     usize,
    pub frames:        usize,
}

/// Replay the first readable recording in `paths` through a fresh session.
pub fn run_replay(paths: &[PathBuf], config: &WatchConfig, limit: BiteLimit) -> Result<ReplayReport> {
    config.validate()?;

    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let mut chosen = String::new();
    let frames = load_with_fallback(&names, &config.loader, |name| {
        chosen = name.clone();
        read_recording(Path::new(name))
    })?;
    info!(source = %chosen, frames = frames.len(), %limit, "replaying");

    let clock = ManualClock::new();
    let (tx, rx) = mpsc::channel();
    let mut session = DetectionLoop::start(config.detection.clone(), limit, clock.clone(), tx)?;
    let mut provider = ReplayProvider::new(frames, clock.clone());

    let mut report = ReplayReport {
        source: chosen,
        frames: provider.frames.len(),
        ..ReplayReport::default()
    };
    let deadline = provider.end().saturating_add(Duration::from_secs(1));

    while session.is_detecting() && !provider.exhausted() && clock.now() <= deadline {
        if let FrameOutcome::Processed { .. } = session.process_frame(&mut provider) {
            report.processed += 1;
        }
        for event in rx.try_iter() {
            match event {
                SessionEvent::Bite { count, .. } => {
                    debug!(count, at = ?clock.now(), "bite");
                    report.bites.push((clock.now(), count));
                }
                SessionEvent::LimitReached { count, .. } => {
                    session.stop();
                    report.limit_reached = Some(count);
                }
                SessionEvent::Status(_) => {}
            }
        }
        clock.advance(REFRESH);
    }
    session.stop();
    Ok(report)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use bite_detect::{FaceDetection, HandLandmarks};
    use bite_machine::{BoundingBox, Point};
    use crate::loader::RetryPolicy;
    use tempfile::NamedTempFile;

    fn frame(t_ms: f64, near: bool) -> RecordedFrame {
        let mut keypoints = vec![Point::new(0.5, 0.4); 6];
        keypoints[3] = Point::new(0.5, 0.6);
        let tip = if near { Point::new(0.5, 0.61) } else { Point::new(0.1, 0.1) };
        RecordedFrame {
            t_ms,
            cost_ms: 8.0,
            detections: Detections {
                faces: vec![FaceDetection {
                    bounding_box: Some(BoundingBox { width: 0.3, ..BoundingBox::default() }),
                    keypoints,
                }],
                hands: vec![HandLandmarks(vec![tip; 21])],
            },
        }
    }

    /// 30 fps, near for the first `near_ms` of every second.
    fn recording(total_ms: u32, near_ms: u32) -> Vec<RecordedFrame> {
        (0..total_ms / 33)
            .map(|i| {
                let t = i * 33;
                frame(f64::from(t), t % 1_000 < near_ms)
            })
            .collect()
    }

    fn write_jsonl(frames: &[RecordedFrame]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for fr in frames {
            writeln!(f, "{}", serde_json::to_string(fr).unwrap()).unwrap();
        }
        f
    }

    fn quick_config() -> WatchConfig {
        WatchConfig {
            loader: RetryPolicy { max_retries: 0, backoff_ms: 0 },
            ..WatchConfig::default()
        }
    }

    #[test]
    fn parse_skips_blank_lines_and_sorts() {
        let a = serde_json::to_string(&frame(66.0, false)).unwrap();
        let b = serde_json::to_string(&frame(33.0, true)).unwrap();
        let text = format!("{a}\n\n{b}\n");
        let frames = parse_recording(&text, Path::new("mem")).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].t_ms, 33.0);
    }

    #[test]
    fn parse_error_names_the_line() {
        let good = serde_json::to_string(&frame(0.0, false)).unwrap();
        let text = format!("{good}\nnot json\n");
        match parse_recording(&text, Path::new("rec.jsonl")) {
            Err(WatchError::Recording { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn absurd_times_are_rejected_with_the_line() {
        let good = serde_json::to_string(&frame(0.0, false)).unwrap();
        let huge = r#"{"t_ms":1e30,"detections":{"faces":[],"hands":[]}}"#;
        match parse_recording(&format!("{good}\n{huge}\n"), Path::new("rec.jsonl")) {
            Err(WatchError::RecordingTime { line, field, .. }) => {
                assert_eq!((line, field), (2, "t_ms"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let slow = r#"{"t_ms":10,"cost_ms":1e300,"detections":{"faces":[],"hands":[]}}"#;
        assert!(matches!(
            parse_recording(slow, Path::new("rec.jsonl")),
            Err(WatchError::RecordingTime { line: 1, field: "cost_ms", .. })
        ));
    }

    #[test]
    fn replay_of_absurd_recording_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"t_ms":1e30,"detections":{{"faces":[],"hands":[]}}}}"#).unwrap();
        let result = run_replay(&[f.path().to_path_buf()], &quick_config(), BiteLimit::default());
        assert!(result.is_err());
    }

    #[test]
    fn hand_built_frames_never_exceed_the_cap() {
        let mut f = frame(0.0, false);
        f.t_ms = f64::MAX;
        f.cost_ms = -5.0;
        assert_eq!(f.time(), MAX_RECORDED);
        assert_eq!(f.cost(), Duration::ZERO);
    }

    #[test]
    fn minimal_frame_parses() {
        let f: RecordedFrame = serde_json::from_str(
            r#"{"t_ms":10,"detections":{"faces":[{"keypoints":[{"x":0,"y":0}]}]}}"#,
        ).unwrap();
        assert_eq!(f.cost_ms, 0.0);
        assert!(f.detections.hands.is_empty());
        assert!(f.detections.faces[0].bounding_box.is_none());
    }

    #[test]
    fn replay_serves_latest_frame() {
        let clock = ManualClock::new();
        let mut p = ReplayProvider::new(vec![frame(0.0, false), frame(33.0, true)], clock.clone());
        assert_eq!(p.video_time(), Some(Duration::ZERO));
        clock.set(Duration::from_millis(40));
        assert_eq!(p.video_time(), Some(Duration::from_millis(33)));
        let d = p.detect(clock.now()).unwrap();
        assert_eq!(d, frame(33.0, true).detections);
        assert!(p.exhausted());
        assert_eq!(clock.now(), Duration::from_millis(48));
    }

    #[test]
    fn recording_provider_writes_one_line_per_frame() {
        let clock = ManualClock::new();
        let inner = ReplayProvider::new(vec![frame(0.0, true)], clock.clone());
        let mut rec = RecordingProvider::new(inner, Vec::new());
        rec.detect(Duration::ZERO).unwrap();
        rec.detect(Duration::ZERO).unwrap();
        assert!(rec.is_recording());
        let sink = rec.sink.take().unwrap();
        let text = String::from_utf8(sink).unwrap();
        let frames = parse_recording(&text, Path::new("mem")).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].detections, frame(0.0, true).detections);
    }

    #[test]
    fn replay_counts_bites() {
        let file = write_jsonl(&recording(3_500, 400));
        let report = run_replay(
            &[file.path().to_path_buf()],
            &quick_config(),
            BiteLimit::new(10).unwrap(),
        ).unwrap();
        let counts: Vec<u32> = report.bites.iter().map(|&(_, c)| c).collect();
        assert_eq!(counts, vec![1, 2, 3, 4]);
        assert_eq!(report.limit_reached, None);
        assert!(report.processed > 0);
    }

    #[test]
    fn replay_stops_at_limit() {
        let file = write_jsonl(&recording(5_000, 400));
        let report = run_replay(
            &[file.path().to_path_buf()],
            &quick_config(),
            BiteLimit::new(2).unwrap(),
        ).unwrap();
        assert_eq!(report.limit_reached, Some(2));
        assert_eq!(report.bites.len(), 2);
    }

    #[test]
    fn replay_falls_back_to_next_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jsonl");
        let file = write_jsonl(&recording(1_000, 400));
        let report = run_replay(
            &[missing, file.path().to_path_buf()],
            &quick_config(),
            BiteLimit::default(),
        ).unwrap();
        assert_eq!(report.source, file.path().display().to_string());
        assert_eq!(report.bites.len(), 1);
    }

    #[test]
    fn replay_with_no_readable_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_replay(&[dir.path().join("a")], &quick_config(), BiteLimit::default());
        assert!(matches!(err, Err(WatchError::Load(_))));
    }
}
