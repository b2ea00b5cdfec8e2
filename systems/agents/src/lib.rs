#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy agents built on the shared visibility engine.
//!
//! Every enemy variant is the same [`Agent`] driven by a different
//! [`AgentProfile`]. Periodic behaviour (target scans, animation frames,
//! sleep phases, movement) is held in explicit [`PeriodicTask`] and
//! [`PhaseCycle`] values that the agent starts on [`Agent::enable`] and stops
//! on [`Agent::disable`]; nothing runs in the background.

mod chaser;
mod profile;
mod schedule;

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

use glam::Vec2;
use nightwatch_core::{
    angle_from_direction, Command, DetectionSink, GeometryQuery, MeshSink, TargetId,
};
use nightwatch_system_detection::SharedDetection;
use nightwatch_system_visibility::{ViewConfig, Visibility, VisibilityPolygon, VisibleTargets};
use rand::RngCore;
use thiserror::Error;

pub use profile::{
    Activity, AgentProfile, ChaseConfig, FacingSource, Movement, SleepCycleConfig, SleepPhase,
    SweepConfig,
};
pub use schedule::{PeriodicTask, PhaseCycle};

/// Mesh sink shared between an agent and whoever displays its view.
pub type SharedMeshSink = Rc<RefCell<dyn MeshSink>>;

/// Reasons an agent refuses to enable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AgentError {
    /// The agent renders its view but has nowhere to put the mesh.
    #[error("agent `{0}` has no mesh sink to render into")]
    MissingMeshSink(String),
    /// The agent sweeps through an animation without any frames.
    #[error("agent `{0}` has no animation frames")]
    NoAnimationFrames(String),
    /// The view radius, angle or resolution cannot describe a view.
    #[error("agent `{0}` has an unusable view configuration")]
    InvalidView(String),
    /// A periodic task has a non-positive or non-finite interval.
    #[error("agent `{agent}` has an invalid {task} interval")]
    InvalidSchedule {
        /// Name of the agent.
        agent: String,
        /// Task whose interval is invalid.
        task: &'static str,
    },
}

#[derive(Clone, Debug)]
struct SweepState {
    config: SweepConfig,
    task: PeriodicTask,
    frame: u32,
}

#[derive(Clone, Debug)]
struct ChaseState {
    config: ChaseConfig,
    task: PeriodicTask,
}

/// Enemy with a field of view.
pub struct Agent {
    name: String,
    profile: AgentProfile,
    view: ViewConfig,
    position: Vec2,
    facing: f32,
    body: Option<TargetId>,
    detection: SharedDetection,
    mesh: Option<SharedMeshSink>,
    enabled: bool,
    scan_task: PeriodicTask,
    sweep: Option<SweepState>,
    cycle: Option<PhaseCycle<SleepPhase>>,
    chase: Option<ChaseState>,
    visibility: Visibility,
    visible: VisibleTargets,
    polygon: VisibilityPolygon,
}

impl Agent {
    /// Creates a disabled agent.
    ///
    /// The profile's angle convention and rotation sense replace the ones in
    /// `view`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        profile: AgentProfile,
        view: ViewConfig,
        position: Vec2,
        detection: SharedDetection,
    ) -> Self {
        let view = ViewConfig {
            convention: profile.convention,
            sense: profile.sense,
            ..view
        };
        let facing = match profile.facing {
            FacingSource::Fixed { angle } => angle,
            FacingSource::Sweep(sweep) => sweep.angle_of_frame(0),
            FacingSource::External | FacingSource::MovementDerived => 0.0,
        };

        Self {
            name: name.into(),
            profile,
            view,
            position,
            facing,
            body: None,
            detection,
            mesh: None,
            enabled: false,
            scan_task: PeriodicTask::new(Duration::ZERO),
            sweep: None,
            cycle: None,
            chase: None,
            visibility: Visibility::new(),
            visible: VisibleTargets::new(),
            polygon: VisibilityPolygon::new(),
        }
    }

    /// Attaches the sink that receives the rendered view.
    #[must_use]
    pub fn with_mesh_sink(mut self, sink: SharedMeshSink) -> Self {
        self.mesh = Some(sink);
        self
    }

    /// Links the agent to the collider representing its body.
    ///
    /// Moving agents emit [`Command::MoveCollider`] for this collider.
    #[must_use]
    pub fn with_body(mut self, body: TargetId) -> Self {
        self.body = Some(body);
        self
    }

    /// Validates the configuration and starts every periodic task.
    ///
    /// On failure the agent stays disabled and the error is logged.
    pub fn enable(&mut self) -> Result<(), AgentError> {
        if self.enabled {
            return Ok(());
        }

        if let Err(error) = self.prepare() {
            tracing::error!(agent = %self.name, %error, "agent disabled");
            return Err(error);
        }

        self.scan_task.start();
        if let Some(sweep) = &mut self.sweep {
            sweep.frame = 0;
            sweep.task.start();
        }
        if let Some(cycle) = &mut self.cycle {
            cycle.start();
        }
        if let Some(chase) = &mut self.chase {
            chase.task.start();
        }
        self.enabled = true;
        tracing::debug!(agent = %self.name, position = ?self.position, "agent enabled");
        Ok(())
    }

    /// Stops every periodic task. Ticking a disabled agent does nothing.
    pub fn disable(&mut self) {
        self.scan_task.stop();
        if let Some(sweep) = &mut self.sweep {
            sweep.task.stop();
        }
        if let Some(cycle) = &mut self.cycle {
            cycle.stop();
        }
        if let Some(chase) = &mut self.chase {
            chase.task.stop();
        }
        self.visible.clear();
        if self.enabled {
            tracing::debug!(agent = %self.name, "agent disabled");
        }
        self.enabled = false;
    }

    fn prepare(&mut self) -> Result<(), AgentError> {
        if !self.view.is_usable() {
            return Err(AgentError::InvalidView(self.name.clone()));
        }
        if self.profile.render && self.mesh.is_none() {
            return Err(AgentError::MissingMeshSink(self.name.clone()));
        }

        let scan_interval = self.interval(self.profile.scan_interval, "scan")?;

        let sweep = match self.profile.facing {
            FacingSource::Sweep(config) => {
                if config.frame_count == 0 {
                    return Err(AgentError::NoAnimationFrames(self.name.clone()));
                }
                let interval = self.interval(config.frame_interval, "animation")?;
                Some(SweepState {
                    config,
                    task: PeriodicTask::new(interval).firing_on_start(),
                    frame: 0,
                })
            }
            _ => None,
        };

        let cycle = match self.profile.activity {
            Activity::SleepCycle(config) => {
                let phase = |seconds: f32| Duration::try_from_secs_f32(seconds).unwrap_or_default();
                let cycle = PhaseCycle::new(vec![
                    (SleepPhase::Asleep, phase(config.sleep)),
                    (SleepPhase::Waking, phase(config.transition)),
                    (SleepPhase::Awake, phase(config.awake)),
                ]);
                if !cycle.is_well_formed() {
                    return Err(AgentError::InvalidSchedule {
                        agent: self.name.clone(),
                        task: "sleep cycle",
                    });
                }
                Some(cycle)
            }
            Activity::AlwaysOn => None,
        };

        let chase = match self.profile.movement {
            Movement::Chase(config) => Some(ChaseState {
                config: ChaseConfig {
                    meanness: clamp_probability(config.meanness),
                    ..config
                },
                task: PeriodicTask::new(self.interval(config.move_interval, "movement")?),
            }),
            Movement::Stationary => None,
        };

        self.scan_task = PeriodicTask::new(scan_interval);
        self.sweep = sweep;
        self.cycle = cycle;
        self.chase = chase;
        Ok(())
    }

    fn interval(&self, seconds: f32, task: &'static str) -> Result<Duration, AgentError> {
        Duration::try_from_secs_f32(seconds)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| AgentError::InvalidSchedule {
                agent: self.name.clone(),
                task,
            })
    }

    /// Advances every running task by `dt`.
    ///
    /// Detections go to the shared counter; body moves are appended to `out`.
    pub fn tick(
        &mut self,
        dt: Duration,
        geometry: &dyn GeometryQuery,
        rng: &mut dyn RngCore,
        out: &mut Vec<Command>,
    ) {
        if !self.enabled {
            return;
        }

        if let Some(sweep) = &mut self.sweep {
            for _ in 0..sweep.task.advance(dt) {
                self.facing = sweep.config.angle_of_frame(sweep.frame);
                sweep.frame = (sweep.frame + 1) % sweep.config.frame_count;
            }
        }

        if let Some(cycle) = &mut self.cycle {
            if let Some(phase) = cycle.advance(dt) {
                tracing::trace!(agent = %self.name, ?phase, "sleep phase changed");
            }
        }

        for _ in 0..self.scan_task.advance(dt) {
            self.scan(geometry);
        }

        let moves = self
            .chase
            .as_mut()
            .map_or(0, |chase| chase.task.advance(dt));
        for _ in 0..moves {
            self.step(geometry, rng, out);
        }
    }

    fn scan(&mut self, geometry: &dyn GeometryQuery) {
        if !self.is_awake() {
            self.visible.clear();
            return;
        }

        let policy = self.profile.policy;
        if !self.profile.notify {
            let _ = self.visibility.scan_targets(
                self.position,
                self.facing,
                &self.view,
                policy,
                geometry,
                None,
                &mut self.visible,
            );
            return;
        }

        match self.detection.try_borrow_mut() {
            Ok(mut counter) => {
                let _ = self.visibility.scan_targets(
                    self.position,
                    self.facing,
                    &self.view,
                    policy,
                    geometry,
                    Some(&mut *counter as &mut dyn DetectionSink),
                    &mut self.visible,
                );
            }
            Err(_) => {
                tracing::warn!(agent = %self.name, "detection counter busy; scan skipped");
            }
        }
    }

    fn step(&mut self, geometry: &dyn GeometryQuery, rng: &mut dyn RngCore, out: &mut Vec<Command>) {
        let Some(chase) = &self.chase else {
            return;
        };

        let target = self.visible.first().map(|(_, position)| position);
        let Some(step) = chaser::decide_step(
            self.position,
            target,
            &chase.config,
            self.view.obstacle_mask,
            geometry,
            rng,
        ) else {
            return;
        };

        self.position += step;
        if self.profile.facing == FacingSource::MovementDerived {
            self.facing = angle_from_direction(step, self.view.convention, self.view.sense);
        }
        if let Some(body) = self.body {
            out.push(Command::MoveCollider {
                target: body,
                position: self.position,
            });
        }
    }

    /// Rebuilds the visibility fan and pushes it to the mesh sink.
    ///
    /// An agent that is not awake publishes an empty mesh.
    pub fn render(&mut self, geometry: &dyn GeometryQuery) {
        if !self.enabled {
            return;
        }

        if self.is_awake() {
            self.visibility.rebuild_polygon(
                self.position,
                self.facing,
                &self.view,
                geometry,
                &mut self.polygon,
            );
        } else {
            self.polygon = VisibilityPolygon::new();
        }

        if let Some(mesh) = &self.mesh {
            match mesh.try_borrow_mut() {
                Ok(mut sink) => self.polygon.write_to(&mut *sink),
                Err(_) => tracing::warn!(agent = %self.name, "mesh sink busy; frame dropped"),
            }
        }
    }

    /// Overrides the facing of an agent with an external facing source.
    ///
    /// Returns `false` and leaves the facing untouched for other sources.
    pub fn set_facing(&mut self, angle: f32) -> bool {
        if self.profile.facing != FacingSource::External {
            return false;
        }
        self.facing = angle;
        true
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Profile the agent was built from.
    #[must_use]
    pub const fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Effective view configuration.
    #[must_use]
    pub const fn view(&self) -> &ViewConfig {
        &self.view
    }

    /// World-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Current facing angle in degrees.
    #[must_use]
    pub const fn facing(&self) -> f32 {
        self.facing
    }

    /// Collider representing the agent's body, if linked.
    #[must_use]
    pub const fn body(&self) -> Option<TargetId> {
        self.body
    }

    /// Whether the agent is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current sleep phase for agents with a sleep cycle.
    #[must_use]
    pub fn sleep_phase(&self) -> Option<SleepPhase> {
        self.cycle.as_ref().and_then(PhaseCycle::current)
    }

    /// Whether the agent is currently able to see.
    #[must_use]
    pub fn is_awake(&self) -> bool {
        match &self.cycle {
            Some(cycle) => cycle.current() == Some(SleepPhase::Awake),
            None => true,
        }
    }

    /// Targets seen by the latest scan.
    #[must_use]
    pub const fn visible_targets(&self) -> &VisibleTargets {
        &self.visible
    }

    /// Most recently rendered visibility fan.
    #[must_use]
    pub const fn polygon(&self) -> &VisibilityPolygon {
        &self.polygon
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("facing", &self.facing)
            .field("enabled", &self.enabled)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

fn clamp_probability(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Collection of agents ticked together.
///
/// One agent failing to enable never affects the others.
#[derive(Debug, Default)]
pub struct Roster {
    agents: Vec<Agent>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an agent and returns its index.
    pub fn push(&mut self, agent: Agent) -> usize {
        self.agents.push(agent);
        self.agents.len() - 1
    }

    /// Enables every agent, returning the failures.
    pub fn enable_all(&mut self) -> Vec<AgentError> {
        self.agents
            .iter_mut()
            .filter_map(|agent| agent.enable().err())
            .collect()
    }

    /// Disables every agent.
    pub fn disable_all(&mut self) {
        for agent in &mut self.agents {
            agent.disable();
        }
    }

    /// Ticks every enabled agent.
    pub fn tick(
        &mut self,
        dt: Duration,
        geometry: &dyn GeometryQuery,
        rng: &mut dyn RngCore,
        out: &mut Vec<Command>,
    ) {
        for agent in &mut self.agents {
            agent.tick(dt, geometry, rng, out);
        }
    }

    /// Renders every enabled agent.
    pub fn render(&mut self, geometry: &dyn GeometryQuery) {
        for agent in &mut self.agents {
            agent.render(geometry);
        }
    }

    /// Agents in insertion order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the roster holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of enabled agents.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_enabled()).count()
    }
}
