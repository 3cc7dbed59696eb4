//! Software-rendered window using `minifb`.
//!
//! Layout while monitoring:
//!
//! ```text
//! ┌──────────────────────────────────────┬──────────────┐
//! │  camera view                         │  BITES       │
//! │    face box, mouth, reach ring       │   3 / 10     │
//! │    fingertips                        │              │
//! │                                      │  status      │
//! │                                      │  state       │
//! │                                      │  interval    │
//! ├──────────────────────────────────────┴──────────────┤
//! │  key legend                                         │
//! └─────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use bite_detect::Detections;
use bite_machine::{BiteLimit, BiteState, Point};

use crate::app::Screen;
use crate::sim::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 920;
pub const WIN_H:     usize = 560;
const VIEW_X:        usize = 20;
const VIEW_Y:        usize = 20;
const VIEW_W:        usize = 640;
const VIEW_H:        usize = 480;
const PANEL_X:       usize = VIEW_X + VIEW_W + 20;
const LEGEND_Y:      usize = WIN_H - 24;
const BG_COLOR:      u32   = 0xFF1A1A2E;
const VIEW_BG:       u32   = 0xFF0F3460;
const FACE_COLOR:    u32   = 0xFF88CCFF;
const MOUTH_COLOR:   u32   = 0xFFFF5577;
const RING_COLOR:    u32   = 0xFFFFD700;
const TIP_COLOR:     u32   = 0xFF77FF99;
const NEAR_COLOR:    u32   = 0xFFFF3333;
const TEXT_COLOR:    u32   = 0xFFEEEEEE;
const DIM_COLOR:     u32   = 0xFF888888;
const ALARM_BG:      u32   = 0xFF8B0000;

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

/// Snapshot of app state for one frame.
pub struct Scene<'a> {
    pub screen:      Screen,
    pub limit:       BiteLimit,
    pub count:       u32,
    pub status:      &'a str,
    pub state:       BiteState,
    pub interval:    Duration,
    /// What the camera currently sees (monitor screen only).
    pub detections:  Option<&'a Detections>,
    pub mouth:       Option<Point>,
    pub fingertips:  &'a [Point],
    pub threshold:   f64,
    /// 1.0 right after a bite, fading to 0.0.
    pub flash:       f32,
    pub message:     &'a str,
    /// Alternates every alarm tone.
    pub alarm_phase: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
}

impl Visualizer {
    pub fn new() -> Result<Self, String> {
        let mut window = Window::new(
            "No Fatties: bite counter",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.set_target_fps(60);

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse and translate to [`SimInput`]s.
    pub fn poll_input(&mut self) -> Vec<SimInput> {
        let mut inputs = Vec::new();
        if !self.window.is_open() {
            inputs.push(SimInput::KeyDown(SimKey::Quit));
            return inputs;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        let keys = [
            (one_shot(Key::Q),                               SimKey::Quit),
            (one_shot(Key::Enter) || one_shot(Key::Space),   SimKey::Enter),
            (one_shot(Key::Escape),                          SimKey::Escape),
            (one_shot(Key::F),                               SimKey::ToggleFace),
            (one_shot(Key::H),                               SimKey::ToggleHands),
            (held(Key::Up),                                  SimKey::Up),
            (held(Key::Down),                                SimKey::Down),
            (one_shot(Key::Key1),                            SimKey::Preset(1)),
            (one_shot(Key::Key2),                            SimKey::Preset(2)),
            (one_shot(Key::Key3),                            SimKey::Preset(3)),
            (one_shot(Key::Key4),                            SimKey::Preset(4)),
        ];
        inputs.extend(keys.into_iter().filter(|&(down, _)| down).map(|(_, k)| SimInput::KeyDown(k)));

        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Discard) {
            if let Some((x, y)) = to_view(mx as f64, my as f64) {
                inputs.push(SimInput::Pointer { x, y });
            }
        }
        inputs
    }

    /// Render one frame.
    pub fn render(&mut self, scene: &Scene<'_>) {
        self.buf.fill(BG_COLOR);

        match scene.screen {
            Screen::Setup   => self.draw_setup(scene),
            Screen::Monitor => self.draw_monitor(scene),
            Screen::Alarm   => self.draw_alarm(scene),
        }

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    fn draw_setup(&mut self, scene: &Scene<'_>) {
        self.draw_text("NO FATTIES", 60, 60, 8, TEXT_COLOR);
        self.draw_text("bite limit", 60, 160, 3, DIM_COLOR);
        self.draw_text(&scene.limit.to_string(), 60, 190, 10, RING_COLOR);
        if !scene.message.is_empty() {
            self.draw_text(scene.message, 60, 270, 3, MOUTH_COLOR);
        }
        self.draw_text("presets: 1=5  2=10  3=20  4=50", 60, 320, 2, DIM_COLOR);
        self.draw_legend("Up/Down=limit  1-4=preset  Enter=start  Q=quit", DIM_COLOR);
    }

    // ── Monitor ───────────────────────────────────────────────────────────

    fn draw_monitor(&mut self, scene: &Scene<'_>) {
        self.fill_rect(VIEW_X, VIEW_Y, VIEW_W, VIEW_H, VIEW_BG);

        if let Some(d) = scene.detections {
            for face in &d.faces {
                if let Some(b) = face.bounding_box {
                    let (x, y) = to_screen(Point::new(b.origin_x, b.origin_y));
                    let w = (b.width  * VIEW_W as f64) as usize;
                    let h = (b.height * VIEW_H as f64) as usize;
                    self.draw_border(x, y, w.max(1), h.max(1), FACE_COLOR);
                }
                for &k in &face.keypoints {
                    let (x, y) = to_screen(k);
                    self.fill_rect(x.saturating_sub(1), y.saturating_sub(1), 3, 3, FACE_COLOR);
                }
            }
        }

        let near = scene.state != BiteState::Idle;
        if let Some(m) = scene.mouth {
            let (x, y) = to_screen(m);
            let r = (scene.threshold * VIEW_W as f64) as usize;
            self.draw_circle(x, y, r, if near { NEAR_COLOR } else { RING_COLOR });
            self.fill_rect(x.saturating_sub(3), y.saturating_sub(3), 7, 7, MOUTH_COLOR);
        }
        for &tip in scene.fingertips {
            let (x, y) = to_screen(tip);
            self.fill_rect(x.saturating_sub(2), y.saturating_sub(2), 5, 5, TIP_COLOR);
        }

        if scene.flash > 0.0 {
            let c = blend(VIEW_BG, NEAR_COLOR, scene.flash);
            for i in 0..4 {
                self.draw_border(VIEW_X + i, VIEW_Y + i, VIEW_W - 2 * i, VIEW_H - 2 * i, c);
            }
        }

        // ── Side panel ────────────────────────────────────────────────────
        self.draw_text("BITES", PANEL_X, VIEW_Y, 3, DIM_COLOR);
        let counter = format!("{}/{}", scene.count, scene.limit);
        let counter_color = blend(TEXT_COLOR, NEAR_COLOR, scene.flash);
        self.draw_text(&counter, PANEL_X, VIEW_Y + 30, 6, counter_color);

        self.draw_text(scene.status, PANEL_X, VIEW_Y + 110, 2, MOUTH_COLOR);
        self.draw_text(&scene.state.to_string(), PANEL_X, VIEW_Y + 150, 2, TEXT_COLOR);
        let rate = format!("{:.0} ms", scene.interval.as_secs_f64() * 1000.0);
        self.draw_text(&rate, PANEL_X, VIEW_Y + 180, 2, DIM_COLOR);

        self.draw_legend(
            "mouse=hand  F=face  H=hands  Up/Down=closer/farther  Esc=stop  Q=quit",
            DIM_COLOR,
        );
    }

    // ── Alarm ─────────────────────────────────────────────────────────────

    fn draw_alarm(&mut self, scene: &Scene<'_>) {
        let bg = if scene.alarm_phase { ALARM_BG } else { blend(ALARM_BG, BG_COLOR, 0.5) };
        self.fill_rect(0, 0, WIN_W, WIN_H, bg);
        self.draw_text("STOP EATING!", 60, 120, 8, TEXT_COLOR);
        self.draw_text(scene.message, 60, 240, 5, RING_COLOR);
        self.draw_legend("Enter=dismiss  Q=quit", TEXT_COLOR);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    /// Clipped to the window.
    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        let (x1, y1) = ((x + w).min(WIN_W), (y + h).min(WIN_H));
        if x >= x1 {
            return;
        }
        for row in self.buf.chunks_exact_mut(WIN_W).take(y1).skip(y) {
            row[x..x1].fill(color);
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W {
            if let Some(px) = self.buf.get_mut(y * WIN_W + x) {
                *px = color;
            }
        }
    }

    fn draw_circle(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        let steps = (r * 8).max(16);
        for i in 0..steps {
            let a = i as f64 / steps as f64 * std::f64::consts::TAU;
            let x = cx as f64 + r as f64 * a.cos();
            let y = cy as f64 + r as f64 * a.sin();
            if x >= 0.0 && y >= 0.0 {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
    }

    fn draw_legend(&mut self, text: &str, color: u32) {
        self.draw_text(text, 10, LEGEND_Y, 1, color);
    }

    /// 3×5 glyphs, each pixel drawn as a `scale`×`scale` block. Stops at
    /// the right edge of the window.
    fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let advance = 4 * scale;
        for (i, ch) in text.chars().enumerate() {
            let cx = x + i * advance;
            if cx + advance > WIN_W {
                break;
            }
            let bits = glyph(ch);
            for cell in (0..15).filter(|c| bits & (1 << (14 - c)) != 0) {
                let (row, col) = (cell / 3, cell % 3);
                self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinates
// ────────────────────────────────────────────────────────────────────────────

/// Window pixel → normalised camera coordinates, if inside the view.
fn to_view(px: f64, py: f64) -> Option<(f64, f64)> {
    let x = (px - VIEW_X as f64) / VIEW_W as f64;
    let y = (py - VIEW_Y as f64) / VIEW_H as f64;
    ((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)).then_some((x, y))
}

/// Normalised camera coordinates → window pixel, clamped to the view.
fn to_screen(p: Point) -> (usize, usize) {
    let x = p.x.clamp(0.0, 1.0) * (VIEW_W - 1) as f64;
    let y = p.y.clamp(0.0, 1.0) * (VIEW_H - 1) as f64;
    (VIEW_X + x as usize, VIEW_Y + y as usize)
}

// ────────────────────────────────────────────────────────────────────────────
// Font
// ────────────────────────────────────────────────────────────────────────────

// Rows top to bottom, three bits each, packed into the low 15 bits.
const GLYPH_CHARS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ/-.,:=!'()_ ";
const GLYPH_BITS: [u16; 48] = [
    0x7B6F, 0x2C97, 0x73E7, 0x73CF, 0x5BC9, 0x79CF, 0x79EF, 0x7249, 0x7BEF, 0x7BCF,
    0x7BED, 0x6BAE, 0x7927, 0x6B6E, 0x79E7, 0x79E4, 0x796F, 0x5BED, 0x7497, 0x126F,
    0x5BAD, 0x4927, 0x5F6D, 0x7B6D, 0x7B6F, 0x7BE4, 0x7B79, 0x6BAD, 0x79CF, 0x7492,
    0x5B6F, 0x5B52, 0x5B7D, 0x5AAD, 0x5BD2, 0x72A7,
    0x12A4, 0x01C0, 0x0002, 0x0014, 0x0410, 0x0E38, 0x2482, 0x2400, 0x1491, 0x4494,
    0x0007, 0x0000,
];
/// Drawn for characters the font lacks.
const UNKNOWN_GLYPH: u16 = 0x0080;

fn glyph(c: char) -> u16 {
    GLYPH_CHARS
        .find(c.to_ascii_uppercase())
        .and_then(|i| GLYPH_BITS.get(i).copied())
        .unwrap_or(UNKNOWN_GLYPH)
}

/// Linear mix of two opaque colors; `t` is clamped to [0, 1].
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    [16u32, 8, 0].iter().fold(0xFF00_0000, |acc, &shift| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        acc | (((ca + (cb - ca) * t).round() as u32).min(0xFF) << shift)
    })
}
