//! Behavioural profiles that parameterise the shared visibility engine.

use nightwatch_core::{AngleConvention, RotationSense};
use nightwatch_system_visibility::TargetPolicy;
use serde::{Deserialize, Serialize};

const SCAN_INTERVAL_SECONDS: f32 = 0.2;

/// Where an agent's facing angle comes from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacingSource {
    /// Constant facing angle in degrees.
    Fixed {
        /// Facing angle in degrees.
        angle: f32,
    },
    /// Facing is set by the caller through `Agent::set_facing`.
    External,
    /// Facing follows the direction of the agent's last move.
    MovementDerived,
    /// Facing steps through an animation cycle.
    Sweep(SweepConfig),
}

/// Animation cycle that rotates the facing a fixed step per frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Facing of frame zero in degrees.
    pub base_angle: f32,
    /// Rotation added per frame in degrees.
    pub degrees_per_frame: f32,
    /// Seconds each frame is shown.
    pub frame_interval: f32,
    /// Number of frames in the cycle.
    pub frame_count: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base_angle: 180.0,
            degrees_per_frame: 30.0,
            frame_interval: 0.3,
            frame_count: 4,
        }
    }
}

impl SweepConfig {
    /// Facing angle shown by the provided frame.
    #[must_use]
    pub fn angle_of_frame(&self, frame: u32) -> f32 {
        self.base_angle + frame as f32 * self.degrees_per_frame
    }
}

/// When the agent is allowed to look for targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    /// The agent always scans and renders its view.
    #[default]
    AlwaysOn,
    /// The agent only scans and renders while awake.
    SleepCycle(SleepCycleConfig),
}

/// Durations of the sleep cycle in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepCycleConfig {
    /// Seconds spent asleep.
    pub sleep: f32,
    /// Seconds spent waking up.
    pub transition: f32,
    /// Seconds spent awake.
    pub awake: f32,
}

impl Default for SleepCycleConfig {
    fn default() -> Self {
        Self {
            sleep: 3.0,
            transition: 0.5,
            awake: 2.0,
        }
    }
}

/// Phases of the sleep cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SleepPhase {
    /// Eyes closed; nothing is seen.
    Asleep,
    /// Waking up; nothing is seen yet.
    Waking,
    /// Eyes open; targets are scanned.
    Awake,
}

/// How the agent moves around the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Movement {
    /// The agent never moves.
    #[default]
    Stationary,
    /// The agent steps between grid cells, drifting toward visible targets.
    Chase(ChaseConfig),
}

/// Tuning of grid-stepping movement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    /// Probability in `0.0..=1.0` of stepping toward a visible target.
    pub meanness: f32,
    /// Seconds between moves.
    pub move_interval: f32,
    /// Whether diagonal steps are allowed.
    pub diagonal: bool,
    /// Radius of the disc swept when checking whether a step is free.
    pub body_radius: f32,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            meanness: 0.5,
            move_interval: 1.0,
            diagonal: false,
            body_radius: 0.4,
        }
    }
}

/// Everything that distinguishes one enemy variant from another.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    /// Source of the facing angle.
    pub facing: FacingSource,
    /// Axis the facing angle is measured from.
    pub convention: AngleConvention,
    /// Rotation sense of the facing angle.
    pub sense: RotationSense,
    /// Whether scans keep going past the first visible target.
    pub policy: TargetPolicy,
    /// Whether visible targets are reported to the detection counter.
    pub notify: bool,
    /// When the agent is active.
    pub activity: Activity,
    /// How the agent moves.
    pub movement: Movement,
    /// Seconds between target scans.
    pub scan_interval: f32,
    /// Whether the agent renders its view and therefore needs a mesh sink.
    pub render: bool,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self::watcher(0.0)
    }
}

impl AgentProfile {
    /// Plain guard looking in a fixed direction; zero degrees faces up.
    #[must_use]
    pub fn watcher(facing: f32) -> Self {
        Self {
            facing: FacingSource::Fixed { angle: facing },
            convention: AngleConvention::UpZero,
            sense: RotationSense::CounterClockwise,
            policy: TargetPolicy::CollectAll,
            notify: true,
            activity: Activity::AlwaysOn,
            movement: Movement::Stationary,
            scan_interval: SCAN_INTERVAL_SECONDS,
            render: true,
        }
    }

    /// Rotating eye that steps through `frame_count` facings.
    ///
    /// Frame zero looks down; each frame turns a further thirty degrees,
    /// clockwise when `clockwise` is set.
    #[must_use]
    pub fn eye(frame_count: u32, clockwise: bool) -> Self {
        Self {
            facing: FacingSource::Sweep(SweepConfig {
                frame_count,
                ..SweepConfig::default()
            }),
            sense: if clockwise {
                RotationSense::Clockwise
            } else {
                RotationSense::CounterClockwise
            },
            ..Self::watcher(0.0)
        }
    }

    /// Sleeping guard looking along `direction`; zero degrees faces right.
    #[must_use]
    pub fn sleeper(direction: f32) -> Self {
        Self {
            facing: FacingSource::Fixed { angle: direction },
            convention: AngleConvention::RightZero,
            activity: Activity::SleepCycle(SleepCycleConfig::default()),
            ..Self::watcher(0.0)
        }
    }

    /// Grid chaser that follows the first target it sees without raising
    /// the alarm.
    #[must_use]
    pub fn chaser() -> Self {
        Self {
            facing: FacingSource::MovementDerived,
            convention: AngleConvention::RightZero,
            policy: TargetPolicy::FirstMatch,
            notify: false,
            movement: Movement::Chase(ChaseConfig::default()),
            ..Self::watcher(0.0)
        }
    }
}
