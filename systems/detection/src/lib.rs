#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level-wide detection counter that flips a game-over flag at a threshold.

use std::{cell::RefCell, rc::Rc};

use nightwatch_core::DetectionSink;
use serde::{Deserialize, Serialize};

/// Detection counter shared by every agent of a level.
pub type SharedDetection = Rc<RefCell<DetectionCounter>>;

/// Tuning for the detection counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Number of detections that ends the game. Zero disables game over.
    pub threshold: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { threshold: 4 }
    }
}

/// Counts detections and latches game over once the threshold is reached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectionCounter {
    config: DetectionConfig,
    detections: u32,
    game_over: bool,
}

impl DetectionCounter {
    /// Creates a counter with no detections recorded.
    #[must_use]
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            detections: 0,
            game_over: false,
        }
    }

    /// Creates a counter wrapped for sharing between agents.
    #[must_use]
    pub fn shared(config: DetectionConfig) -> SharedDetection {
        Rc::new(RefCell::new(Self::new(config)))
    }

    /// Number of detections recorded so far.
    #[must_use]
    pub const fn detections(&self) -> u32 {
        self.detections
    }

    /// Detections that trigger game over.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.config.threshold
    }

    /// Whether the threshold has been reached.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Clears the count and the game-over flag for a new level.
    pub fn reset(&mut self) {
        self.detections = 0;
        self.game_over = false;
    }
}

impl DetectionSink for DetectionCounter {
    fn notify_detected(&mut self) {
        self.detections = self.detections.saturating_add(1);
        tracing::debug!(detections = self.detections, "player detected");

        let threshold = self.config.threshold;
        if !self.game_over && threshold > 0 && self.detections >= threshold {
            self.game_over = true;
            tracing::info!(detections = self.detections, threshold, "game over");
        }
    }
}
