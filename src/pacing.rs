//! Randomised pacing between observable actions and between keystrokes.
//!
//! [`PacingPolicy`] is a pure function of its configured bounds: every call
//! samples a fresh uniform duration and the only side effect is wall-clock time.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

/// Bounds, in seconds, for the interaction cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_action_min_secs")]
    pub action_min_secs: f64,
    #[serde(default = "default_action_max_secs")]
    pub action_max_secs: f64,
    #[serde(default = "default_keystroke_min_secs")]
    pub keystroke_min_secs: f64,
    #[serde(default = "default_keystroke_max_secs")]
    pub keystroke_max_secs: f64,
}

fn default_action_min_secs() -> f64 {
    0.5
}

fn default_action_max_secs() -> f64 {
    2.0
}

fn default_keystroke_min_secs() -> f64 {
    0.05
}

fn default_keystroke_max_secs() -> f64 {
    0.15
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            action_min_secs: default_action_min_secs(),
            action_max_secs: default_action_max_secs(),
            keystroke_min_secs: default_keystroke_min_secs(),
            keystroke_max_secs: default_keystroke_max_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PacingPolicy {
    config: PacingConfig,
}

impl PacingPolicy {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// A policy whose every delay is zero. Used by tests and the demo.
    pub fn immediate() -> Self {
        Self {
            config: PacingConfig {
                action_min_secs: 0.0,
                action_max_secs: 0.0,
                keystroke_min_secs: 0.0,
                keystroke_max_secs: 0.0,
            },
        }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Samples a duration uniformly from `[lower, upper]` seconds.
    ///
    /// Negative or non-finite bounds are clamped to zero; an inverted range
    /// collapses to its lower bound.
    pub fn sample(lower_secs: f64, upper_secs: f64) -> Duration {
        let lower = sanitize(lower_secs);
        let upper = sanitize(upper_secs);
        if upper <= lower {
            return Duration::from_secs_f64(lower);
        }
        let secs = rand::thread_rng().gen_range(lower..=upper);
        Duration::from_secs_f64(secs)
    }

    /// Suspends the caller for a uniformly sampled duration in range.
    pub async fn delay(&self, lower_secs: f64, upper_secs: f64) {
        let wait = Self::sample(lower_secs, upper_secs);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    /// Pause between two observable actions, using the configured action bounds.
    pub async fn pause(&self) {
        self.delay(self.config.action_min_secs, self.config.action_max_secs)
            .await;
    }

    /// Per-character typing delay.
    pub fn keystroke_delay(&self) -> Duration {
        Self::sample(self.config.keystroke_min_secs, self.config.keystroke_max_secs)
    }
}

fn sanitize(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}
