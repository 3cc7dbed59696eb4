//! # bite_machine
//!
//! The deterministic core of the bite counter: per-frame proximity tests,
//! a debounced three-state bite automaton, and an adaptive frame pacer.
//! Nothing in here knows about cameras, windows or audio.
//!
//! ## Transition table
//!
//! | From | Signal | To | Effect |
//! |---|---|---|---|
//! | Idle | near | NearMouth | count += 1, report the bite (and the limit if reached) |
//! | Idle | not near | Idle | — |
//! | NearMouth | near | NearMouth | — |
//! | NearMouth | not near | Cooldown | arm the cooldown timer |
//! | Cooldown | near | NearMouth | cancel the timer, no recount |
//! | Cooldown | not near | Cooldown | — |
//! | Cooldown | timer elapses | Idle | clear the timer |
//!
//! ## Quick start
//!
//! ```rust
//! use bite_machine::{BiteLimit, BiteStateMachine, MachineConfig, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let limit = BiteLimit::new(2).unwrap();
//! let mut sm = BiteStateMachine::new(MachineConfig::default(), limit, clock.clone());
//!
//! assert_eq!(sm.update(true).map(|b| b.count), Some(1));
//! sm.update(false);                       // hand withdrawn → cooldown
//! clock.advance(Duration::from_millis(300));
//! let bite = sm.update(true).unwrap();    // cooldown elapsed → second bite
//! assert!(bite.limit_reached);
//! ```

pub mod clock;
pub mod limit;
pub mod machine;
pub mod proximity;
pub mod scheduler;
pub mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use limit::{BiteLimit, ConfigError, LimitInput};
pub use machine::{Bite, BiteState, BiteStateMachine, MachineConfig};
pub use proximity::{is_near_mouth, proximity_threshold, BoundingBox, Point, ProximityConfig};
pub use scheduler::{FrameScheduler, SchedulerConfig};
pub use timer::{OneShotTimer, TimerHandle};
