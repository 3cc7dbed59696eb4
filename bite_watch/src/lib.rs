//! # bite_watch
//!
//! Bite counter with a monitor window, a simulated camera, JSON-lines
//! recording and replay, and a two-tone MIDI alarm.
//!
//! ## Screens
//!
//! | Screen | Shows | Leaves on |
//! |---|---|---|
//! | Setup | bite limit, presets | `Enter` → Monitor |
//! | Monitor | camera view, mouth reach ring, counter, tracking status | `Esc` → Setup, limit reached → Alarm |
//! | Alarm | "You hit N bites!" with the alarm sounding | `Enter` → Setup |
//!
//! ## Simulation controls
//!
//! | Input | Effect |
//! |---|---|
//! | Mouse over the view | Moves the hand; fingertips cluster around the pointer |
//! | `F` | Show / hide the face |
//! | `H` | Show / hide the hand |
//! | `↑` / `↓` | Face closer / farther (wider face → larger reach ring). On Setup: limit ± 1 |
//! | `1`–`4` | Limit presets 5, 10, 20, 50 (Setup) |
//! | `Enter` / `Space` | Start monitoring, dismiss alarm |
//! | `Esc` | Stop monitoring |
//! | `Q` | Quit |
//!
//! ## Headless replay
//!
//! `bite-watch replay rec.jsonl` feeds a recording (made with
//! `bite-watch watch --record rec.jsonl`) through the same detection loop on
//! a manual clock and prints every bite.

pub mod alarm;
pub mod app;
pub mod config;
pub mod error;
pub mod loader;
pub mod replay;
pub mod sim;
pub mod visualizer;

pub use config::WatchConfig;
pub use error::{Result, WatchError};
