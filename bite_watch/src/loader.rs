//! Bounded retry with multi-source fallback for slow-to-appear resources.
//!
//! Sources are tried in order; each gets `max_retries + 1` attempts with a
//! linearly growing pause before every retry. The caller sees either the
//! first success or, once every source is exhausted, a single error.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts per source after the first.
    pub max_retries: u32,
    /// Pause before retry `n` is `n * backoff_ms`.
    pub backoff_ms:  u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_retries: 2, backoff_ms: 1_000 }
    }
}

impl RetryPolicy {
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no sources to load from")]
    NoSources,

    #[error("all {attempts} attempts failed, last from {source_name}: {message}")]
    Exhausted {
        attempts:    u32,
        source_name: String,
        message:     String,
    },
}

/// Load from the first source that works.
pub fn load_with_fallback<S, T, E, F>(
    sources: &[S],
    policy:  &RetryPolicy,
    mut load: F,
) -> Result<T, LoadError>
where
    S: Display,
    E: Display,
    F: FnMut(&S) -> Result<T, E>,
{
    let mut attempts = 0;
    let mut last = None;

    for source in sources {
        for attempt in 0..=policy.max_retries {
            if attempt > 0 {
                thread::sleep(policy.backoff_before(attempt));
            }
            attempts += 1;
            match load(source) {
                Ok(value) => {
                    debug!(%source, attempt = attempt + 1, "loaded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(%source, attempt = attempt + 1, error = %e, "load attempt failed");
                    last = Some((source.to_string(), e.to_string()));
                }
            }
        }
    }

    let err = match last {
        Some((source_name, message)) => LoadError::Exhausted { attempts, source_name, message },
        None => LoadError::NoSources,
    };
    error!(error = %err, "every source failed");
    Err(err)
}
