//! Headless patrol run: a generated level, its enemies, and a player walking
//! the shortest route to the treasure and on to the exit.

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

use anyhow::{bail, Context, Result};
use glam::Vec2;
use nightwatch_core::{
    CellCoord, ColliderShape, Command, Event, LayerMask, MeshBuffer, PrefabKind, TargetId,
    ENEMY_LAYER, OBSTACLE_LAYER, TARGET_LAYER,
};
use nightwatch_system_agents::{Agent, AgentProfile, PeriodicTask, Roster};
use nightwatch_system_detection::{DetectionCounter, SharedDetection};
use nightwatch_system_map_generation::{GeneratedMap, MapGenerator, ReachabilityValidator};
use nightwatch_world::{apply, query, PlacementSession, World};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{config::CliConfig, debug_view::AsciiView};

/// Simulated time advanced per tick.
pub(crate) const TICK: Duration = Duration::from_millis(100);

const PLAYER_STEP: Duration = Duration::from_millis(400);
const PLAYER_RADIUS: f32 = 0.3;
const AGENT_RADIUS: f32 = 0.4;
const EYE_FRAMES: u32 = 12;
const SLEEPER_FACINGS: [f32; 4] = [0.0, 90.0, 180.0, 270.0];

/// Generates a validated map and commits it to `world`.
pub(crate) fn generate_map(
    config: &CliConfig,
    rng: &mut dyn RngCore,
    world: &mut World,
) -> Result<GeneratedMap> {
    let generator = MapGenerator::new(config.map).context("invalid map configuration")?;
    let mut events = Vec::new();
    let map = generator
        .generate_valid(
            rng,
            &ReachabilityValidator,
            &mut PlacementSession::new(world, &mut events),
        )
        .context("map generation failed")?;
    tracing::info!(
        attempts = map.attempts(),
        placed = events.len(),
        skipped = map.skipped_placements(),
        "map generated"
    );
    Ok(map)
}

/// Outcome of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SimulationReport {
    pub(crate) ticks: u64,
    pub(crate) agents: usize,
    pub(crate) enabled_agents: usize,
    pub(crate) detections: u32,
    pub(crate) game_over: bool,
    pub(crate) treasure_reached: bool,
    pub(crate) exit_reached: bool,
    pub(crate) rendered_triangles: usize,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks:              {}", self.ticks)?;
        writeln!(
            f,
            "agents:             {} ({} enabled)",
            self.agents, self.enabled_agents
        )?;
        writeln!(f, "detections:         {}", self.detections)?;
        writeln!(f, "game over:          {}", self.game_over)?;
        writeln!(f, "treasure reached:   {}", self.treasure_reached)?;
        writeln!(f, "exit reached:       {}", self.exit_reached)?;
        write!(f, "rendered triangles: {}", self.rendered_triangles)
    }
}

/// Level, agents and player advanced in lockstep.
pub(crate) struct Simulation {
    world: World,
    map: GeneratedMap,
    roster: Roster,
    generated_agents: usize,
    detection: SharedDetection,
    meshes: Vec<Rc<RefCell<MeshBuffer>>>,
    rng: ChaCha8Rng,
    player: TargetId,
    player_cell: CellCoord,
    player_step: PeriodicTask,
    route: Vec<CellCoord>,
    route_index: usize,
    treasure_reached: bool,
    exit_reached: bool,
    ticks: u64,
}

impl Simulation {
    /// Generates a level from `seed` and populates it with agents.
    pub(crate) fn build(config: &CliConfig, seed: u64) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut world = World::with_cell_size(config.map.cell_size);
        let map = generate_map(config, &mut rng, &mut world)?;
        let layout = map.layout();
        let cell_size = config.map.cell_size;

        for cell in layout.grid().cells() {
            if !layout.grid().is_interior(cell) {
                let _ = spawn(
                    &mut world,
                    ColliderShape::Box {
                        half_extents: Vec2::splat(cell_size / 2.0),
                    },
                    cell.to_world(cell_size),
                    OBSTACLE_LAYER,
                )?;
            }
        }

        let start = layout.start();
        let player = spawn(
            &mut world,
            ColliderShape::Circle {
                radius: PLAYER_RADIUS * cell_size,
            },
            start.to_world(cell_size),
            TARGET_LAYER,
        )?;

        let detection = DetectionCounter::shared(config.detection);
        let mut roster = Roster::new();
        let mut meshes = Vec::new();

        let placed = query::placed_objects(&world).to_vec();
        for (index, object) in placed.iter().enumerate() {
            let profile = match object.prefab() {
                PrefabKind::EnemyType1 => AgentProfile::eye(EYE_FRAMES, index % 2 == 0),
                PrefabKind::EnemyType2 => {
                    AgentProfile::sleeper(SLEEPER_FACINGS[rng.gen_range(0..SLEEPER_FACINGS.len())])
                }
                _ => continue,
            };
            let mesh = Rc::new(RefCell::new(MeshBuffer::new()));
            let agent = Agent::new(
                format!("{:?}#{}", object.prefab(), object.instance().get()),
                profile,
                config.view,
                query::cell_center(&world, object.cell()),
                detection.clone(),
            )
            .with_mesh_sink(mesh.clone())
            .with_body(object.collider());
            meshes.push(mesh);
            let _ = roster.push(agent);
        }
        let generated_agents = roster.len();

        for entry in &config.agents {
            let position = entry.cell.to_world(cell_size);
            let body = spawn(
                &mut world,
                ColliderShape::Circle {
                    radius: AGENT_RADIUS * cell_size,
                },
                position,
                ENEMY_LAYER,
            )?;
            let mesh = Rc::new(RefCell::new(MeshBuffer::new()));
            let agent = Agent::new(
                entry.name.clone(),
                entry.profile,
                entry.view.unwrap_or(config.view),
                position,
                detection.clone(),
            )
            .with_mesh_sink(mesh.clone())
            .with_body(body);
            meshes.push(mesh);
            let _ = roster.push(agent);
        }

        for failure in roster.enable_all() {
            tracing::warn!(%failure, "agent left disabled");
        }

        let route = plan_route(&map)?;
        tracing::info!(
            agents = roster.len(),
            enabled = roster.enabled_count(),
            route = route.len(),
            "simulation ready"
        );

        let mut player_step = PeriodicTask::new(PLAYER_STEP);
        player_step.start();

        Ok(Self {
            world,
            map,
            roster,
            generated_agents,
            detection,
            meshes,
            rng,
            player,
            player_cell: start,
            player_step,
            route,
            route_index: 0,
            treasure_reached: false,
            exit_reached: false,
            ticks: 0,
        })
    }

    /// Runs until game over, until the player escapes, or for `ticks` ticks.
    pub(crate) fn run(&mut self, ticks: u64) -> SimulationReport {
        for _ in 0..ticks {
            if self.detection.borrow().is_game_over() || self.exit_reached {
                break;
            }
            self.step();
        }
        self.report()
    }

    fn step(&mut self) {
        let mut events = Vec::new();
        for _ in 0..self.player_step.advance(TICK) {
            if let Some(command) = self.advance_player() {
                apply(&mut self.world, command, &mut events);
            }
        }

        let mut commands = Vec::new();
        self.roster
            .tick(TICK, &self.world, &mut self.rng, &mut commands);
        for command in commands {
            apply(&mut self.world, command, &mut events);
        }
        self.roster.render(&self.world);

        self.ticks += 1;
        tracing::trace!(tick = self.ticks, events = events.len(), "simulation tick");
    }

    fn advance_player(&mut self) -> Option<Command> {
        let next = *self.route.get(self.route_index + 1)?;
        self.route_index += 1;
        self.player_cell = next;

        let layout = self.map.layout();
        if Some(next) == layout.treasure() && !self.treasure_reached {
            self.treasure_reached = true;
            tracing::info!(tick = self.ticks, "treasure reached");
        }
        if Some(next) == layout.exit() && self.treasure_reached {
            self.exit_reached = true;
            tracing::info!(tick = self.ticks, "exit reached");
        }

        Some(Command::MoveCollider {
            target: self.player,
            position: query::cell_center(&self.world, next),
        })
    }

    /// Summary of the run so far.
    pub(crate) fn report(&self) -> SimulationReport {
        let detection = self.detection.borrow();
        SimulationReport {
            ticks: self.ticks,
            agents: self.roster.len(),
            enabled_agents: self.roster.enabled_count(),
            detections: detection.detections(),
            game_over: detection.is_game_over(),
            treasure_reached: self.treasure_reached,
            exit_reached: self.exit_reached,
            rendered_triangles: self
                .meshes
                .iter()
                .map(|mesh| mesh.borrow().triangles().len())
                .sum(),
        }
    }

    /// ASCII frame of the level with every agent's current view shaded.
    pub(crate) fn view(&self) -> String {
        let layout = self.map.layout();
        let grid = layout.grid();
        let mut view = AsciiView::layout(
            grid.width(),
            grid.height(),
            layout.start(),
            layout.placements(),
        );

        for agent in self.roster.agents().iter().skip(self.generated_agents) {
            if let Some(cell) = query::cell_at(&self.world, agent.position()) {
                view.mark_agent(cell);
            }
        }
        view.mark_player(self.player_cell);
        view.shade(|cell| {
            let point = query::cell_center(&self.world, cell);
            self.roster
                .agents()
                .iter()
                .any(|agent| agent.polygon().contains(point))
        });
        view.render()
    }
}

fn spawn(
    world: &mut World,
    shape: ColliderShape,
    position: Vec2,
    layers: LayerMask,
) -> Result<TargetId> {
    let mut events = Vec::new();
    apply(
        world,
        Command::SpawnCollider {
            shape,
            position,
            layers,
        },
        &mut events,
    );
    match events.as_slice() {
        [Event::ColliderSpawned { target, .. }] => Ok(*target),
        other => bail!("unexpected events while spawning a collider: {other:?}"),
    }
}

/// Start to treasure, then treasure to exit.
fn plan_route(map: &GeneratedMap) -> Result<Vec<CellCoord>> {
    let layout = map.layout();
    let treasure = layout.treasure().context("accepted map has no treasure")?;
    let exit = layout.exit().context("accepted map has no exit")?;

    let mut route = layout
        .route(layout.start(), treasure)
        .context("treasure is unreachable")?;
    let onward = layout
        .route(treasure, exit)
        .context("exit is unreachable from the treasure")?;
    route.extend(onward.into_iter().skip(1));
    Ok(route)
}
