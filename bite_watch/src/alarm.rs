//! The alarm: two alternating square-wave tones until dismissed.
//!
//! Tones are played through MIDI on their own thread, controlled over a
//! command channel, so the render loop never waits on audio.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bite_machine::ConfigError;

// ════════════════════════════════════════════════════════════════════════════
// AlarmConfig
// ════════════════════════════════════════════════════════════════════════════

/// GM program 80, "Lead 1 (square)".
pub const SQUARE_LEAD: u8 = 80;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub high_hz:         f64,
    pub low_hz:          f64,
    /// 0.0–1.0, mapped onto MIDI velocity.
    pub gain:            f64,
    /// Length of each of the two tones.
    pub tone_ms:         u64,
    /// Period at which the high/low pair repeats.
    pub cycle_ms:        u64,
    pub channel:         u8,
    /// Substrings matched case-insensitively against MIDI port names.
    pub preferred_ports: Vec<String>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        AlarmConfig {
            high_hz:         800.0,
            low_hz:          600.0,
            gain:            0.7,
            tone_ms:         300,
            cycle_ms:        650,
            channel:         0,
            preferred_ports: ["fluid", "timidity", "microsoft", "gm", "synth"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl AlarmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.high_hz > 0.0) || !(self.low_hz > 0.0) {
            return Err(ConfigError::NonPositive("alarm frequency"));
        }
        if self.tone_ms == 0 {
            return Err(ConfigError::NonPositive("tone_ms"));
        }
        if self.cycle_ms == 0 {
            return Err(ConfigError::NonPositive("cycle_ms"));
        }
        Ok(())
    }

    /// The two notes of one cycle, high first.
    pub fn notes(&self) -> [u8; 2] {
        [freq_to_midi(self.high_hz), freq_to_midi(self.low_hz)]
    }

    pub fn velocity(&self) -> u8 {
        (self.gain.clamp(0.0, 1.0) * 127.0).round() as u8
    }

    pub fn tone(&self) -> Duration {
        Duration::from_millis(self.tone_ms)
    }

    /// Silence after the two tones before the next cycle.
    pub fn rest(&self) -> Duration {
        Duration::from_millis(self.cycle_ms.saturating_sub(2 * self.tone_ms))
    }
}

/// Nearest MIDI note number for `hz` (A4 = 440 Hz = 69).
pub fn freq_to_midi(hz: f64) -> u8 {
    let note = 69.0 + 12.0 * (hz / 440.0).log2();
    note.round().clamp(0.0, 127.0) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        let _ = self.conn.send(&[0xC0 | (channel & 0x0F), program]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let _ = self.conn.send(&[0x90 | (channel & 0x0F), note, velocity]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        let _ = self.conn.send(&[0x80 | (channel & 0x0F), note, 0]);
    }
}

struct NullOut;

impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8)  {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8) {}
    fn note_off(&mut self, _ch: u8, _n: u8)        {}
}

/// Connect to a preferred port if one is visible, else the first port,
/// else silence.
fn open_midi_output(preferred: &[String]) -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("bite_watch_alarm") {
        Ok(m)  => m,
        Err(e) => {
            warn!(error = %e, "MIDI init failed, alarm will be silent");
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("no MIDI output ports, alarm will be silent (try `timidity -iA` or `fluidsynth`)");
        return Box::new(NullOut);
    }

    let port_idx = ports.iter()
        .position(|p| {
            midi_out.port_name(p)
                .map(|n| port_matches(&n, preferred))
                .unwrap_or(false)
        })
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port).unwrap_or_else(|_| "unknown".to_string());
    info!(port = %name, "alarm MIDI port");

    match midi_out.connect(port, "bite-alarm") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            warn!(error = %e, "MIDI connect failed, alarm will be silent");
            Box::new(NullOut)
        }
    }
}

fn port_matches(name: &str, preferred: &[String]) -> bool {
    let name = name.to_lowercase();
    preferred.iter().any(|p| name.contains(&p.to_lowercase()))
}

// ════════════════════════════════════════════════════════════════════════════
// AlarmPlayer
// ════════════════════════════════════════════════════════════════════════════

enum AlarmCommand {
    Start,
    Stop,
    Quit,
}

/// Handle to the alarm thread. Dropping it shuts the thread down.
pub struct AlarmPlayer {
    cmd_tx:   Sender<AlarmCommand>,
    thread:   Option<JoinHandle<()>>,
    sounding: bool,
}

impl AlarmPlayer {
    pub fn spawn(config: AlarmConfig) -> Self {
        Self::spawn_with(config, move |cfg| open_midi_output(&cfg.preferred_ports))
    }

    /// Alarm thread writing to nowhere; for tests and headless runs.
    pub fn silent(config: AlarmConfig) -> Self {
        Self::spawn_with(config, |_| Box::new(NullOut))
    }

    fn spawn_with<F>(config: AlarmConfig, open: F) -> Self
    where
        F: FnOnce(&AlarmConfig) -> Box<dyn MidiOut> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AlarmCommand>();
        let thread = thread::spawn(move || {
            let out = open(&config);
            alarm_thread(config, out, cmd_rx);
        });
        AlarmPlayer { cmd_tx, thread: Some(thread), sounding: false }
    }

    pub fn start(&mut self) {
        self.sounding = true;
        let _ = self.cmd_tx.send(AlarmCommand::Start);
    }

    pub fn stop(&mut self) {
        self.sounding = false;
        let _ = self.cmd_tx.send(AlarmCommand::Stop);
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }
}

impl Drop for AlarmPlayer {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AlarmCommand::Quit);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

/// What the alarm thread should do next.
enum Next {
    Continue,
    Idle,
    Quit,
}

/// Wait up to `d` for a command. Anything but a timeout interrupts.
fn wait(cmd_rx: &Receiver<AlarmCommand>, d: Duration) -> Next {
    match cmd_rx.recv_timeout(d) {
        Err(RecvTimeoutError::Timeout)      => Next::Continue,
        Ok(AlarmCommand::Start)             => Next::Continue,
        Ok(AlarmCommand::Stop)              => Next::Idle,
        Ok(AlarmCommand::Quit)
        | Err(RecvTimeoutError::Disconnected) => Next::Quit,
    }
}

fn alarm_thread(config: AlarmConfig, mut midi: Box<dyn MidiOut>, cmd_rx: Receiver<AlarmCommand>) {
    let channel  = config.channel;
    let velocity = config.velocity();
    let notes    = config.notes();
    let tone     = config.tone();
    let rest     = config.rest();

    midi.program_change(channel, SQUARE_LEAD);

    'idle: loop {
        match cmd_rx.recv() {
            Ok(AlarmCommand::Start) => debug!("alarm sounding"),
            Ok(AlarmCommand::Stop)  => continue,
            Ok(AlarmCommand::Quit) | Err(_) => return,
        }

        loop {
            for &note in &notes {
                midi.note_on(channel, note, velocity);
                let next = wait(&cmd_rx, tone);
                midi.note_off(channel, note);
                match next {
                    Next::Continue => {}
                    Next::Idle     => { debug!("alarm silenced"); continue 'idle; }
                    Next::Quit     => return,
                }
            }
            match wait(&cmd_rx, rest) {
                Next::Continue => {}
                Next::Idle     => { debug!("alarm silenced"); continue 'idle; }
                Next::Quit     => return,
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
