//! Seeded body simulation feeding the spatial context.

use tessel_core::math::{DeterministicRng, Vec2};
use tessel_core::spatial::{
    Aabb, CollisionLayers, EntityHandle, EntitySource, MapId, Placement, SpatialContext,
};
use tessel_core::time::TICK_DURATION;
use tessel_core::{SpatialError, SpatialSettings};
use tessel_metrics::TickTimer;

const WORLD_EXTENT: f32 = 4096.0;
const MAX_SPEED: f32 = 24.0; // world units per tick
const PORTAL_CHANCE: f32 = 0.002;
const DESPAWN_CHANCE: f32 = 0.001;
const RESPAWN_CHANCE: f32 = 0.02;
const QUERY_POINTS: usize = 4;
const QUERY_RADIUS: f32 = 96.0;
const REPORT_EVERY: u64 = 120;

const SOLID: CollisionLayers = CollisionLayers::DEFAULT;
const GHOST: CollisionLayers = CollisionLayers::from_bits(0b10);

#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    pub entities: u32,
    pub maps: u16,
    pub seed: u64,
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    half_extents: Vec2,
    map: MapId,
    layers: CollisionLayers,
    alive: bool,
}

/// Stand-in for the entity registry: a dense body array indexed by handle.
struct World {
    bodies: Vec<Body>,
    maps: u16,
}

impl World {
    fn spawn(options: &SimOptions, rng: &mut DeterministicRng) -> Self {
        let bodies = (0..options.entities)
            .map(|i| Body {
                position: rng.point_in(Vec2::ZERO, Vec2::splat(WORLD_EXTENT)),
                velocity: rng.point_in(Vec2::splat(-MAX_SPEED), Vec2::splat(MAX_SPEED)),
                half_extents: Vec2::splat(rng.range_f32(4.0, 40.0)),
                map: MapId::new((i % u32::from(options.maps)) as u16),
                layers: if i % 8 == 0 { GHOST } else { SOLID },
                alive: true,
            })
            .collect();
        Self {
            bodies,
            maps: options.maps,
        }
    }

    fn handles(&self) -> impl Iterator<Item = EntityHandle> {
        (0..self.bodies.len() as u32).map(EntityHandle::new)
    }

    fn body(&self, entity: EntityHandle) -> Option<&Body> {
        self.bodies.get(entity.index() as usize).filter(|b| b.alive)
    }

    fn step(&mut self, rng: &mut DeterministicRng) {
        for body in &mut self.bodies {
            if !body.alive {
                if rng.next_f32() < RESPAWN_CHANCE {
                    body.alive = true;
                    body.position = rng.point_in(Vec2::ZERO, Vec2::splat(WORLD_EXTENT));
                }
                continue;
            }
            if rng.next_f32() < DESPAWN_CHANCE {
                body.alive = false;
                continue;
            }
            body.position += body.velocity;
            bounce(&mut body.position.x, &mut body.velocity.x);
            bounce(&mut body.position.y, &mut body.velocity.y);
            if self.maps > 1 && rng.next_f32() < PORTAL_CHANCE {
                body.map = MapId::new((body.map.raw() + 1) % self.maps);
            }
        }
    }
}

fn bounce(position: &mut f32, velocity: &mut f32) {
    if *position < 0.0 || *position > WORLD_EXTENT {
        *velocity = -*velocity;
        *position = position.clamp(0.0, WORLD_EXTENT);
    }
}

impl EntitySource for World {
    fn is_valid(&self, entity: EntityHandle) -> bool {
        self.body(entity).is_some()
    }

    fn placement(&self, entity: EntityHandle) -> Option<Placement> {
        self.body(entity).map(|body| Placement {
            map: body.map,
            bounds: Aabb::from_center(body.position, body.half_extents),
            layers: body.layers,
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub total_pairs: u64,
    pub rejected: u64,
    pub ticks_per_second: f64,
}

pub struct Simulation {
    world: World,
    spatial: SpatialContext,
    rng: DeterministicRng,
    timer: TickTimer,
    query_points: Vec<(MapId, Vec2)>,
}

impl Simulation {
    pub fn new(settings: &SpatialSettings, options: SimOptions) -> Result<Self, SpatialError> {
        let mut rng = DeterministicRng::new(options.seed);
        let world = World::spawn(&options, &mut rng);
        let spatial = SpatialContext::new(settings)?;
        tracing::info!(
            entities = options.entities,
            maps = options.maps,
            tasks = spatial.broad_phase_task_count(),
            cell_size = settings.grid.cell_size,
            "simulation ready"
        );
        Ok(Self {
            world,
            spatial,
            rng,
            timer: TickTimer::new(REPORT_EVERY as usize, TICK_DURATION),
            query_points: Vec::with_capacity(QUERY_POINTS),
        })
    }

    pub fn run(&mut self, ticks: u64) -> RunSummary {
        let mut summary = RunSummary::default();
        for _ in 0..ticks {
            let (pairs, rejected) = self.tick();
            summary.ticks += 1;
            summary.total_pairs += pairs as u64;
            summary.rejected += rejected as u64;
        }
        summary.ticks_per_second = self.timer.ticks_per_second();

        for phase in self.spatial.profiler().iter().chain(self.spatial.broad_phase_profiler().iter()) {
            tracing::info!(
                phase = phase.name,
                calls = phase.calls,
                total_ms = phase.total.as_secs_f64() * 1000.0,
                "phase timing"
            );
        }
        summary
    }

    /// One tick: move, sync, pair, query. Returns `(pairs, rejected)`.
    fn tick(&mut self) -> (usize, usize) {
        self.timer.begin();
        self.spatial.begin_tick();

        self.world.step(&mut self.rng);
        let report = self.spatial.sync(&self.world, self.world.handles());
        let emitted = self.spatial.run_broad_phase();

        let mut deepest = 0.0f32;
        for pair in self.spatial.candidate_pairs() {
            deepest = deepest.max(pair.overlap.width().min(pair.overlap.height()));
        }

        // Gameplay code tends to ask the same question more than once per
        // tick; the second, slightly jittered query is served from the cache.
        self.query_points.clear();
        self.query_points.extend(
            self.world
                .bodies
                .iter()
                .filter(|b| b.alive)
                .take(QUERY_POINTS)
                .map(|b| (b.map, b.position)),
        );
        let mut neighbours = 0;
        for &(map, origin) in &self.query_points {
            neighbours += self.spatial.nearby_entities(map, origin, QUERY_RADIUS).len();
            let jitter = Vec2::splat(self.rng.range_f32(-0.25, 0.25));
            neighbours += self.spatial.nearby_entities(map, origin + jitter, QUERY_RADIUS).len();
        }

        let elapsed = self.timer.end();
        let tick = self.spatial.tick();
        tracing::trace!(tick, emitted, neighbours, deepest, ?elapsed, "tick complete");
        if tick % REPORT_EVERY == 0 {
            self.log_progress(tick, emitted, &report.rejected);
        }
        (emitted, report.rejected.len())
    }

    fn log_progress(&self, tick: u64, emitted: usize, rejected: &[EntityHandle]) {
        let stats = self.spatial.broad_phase_stats();
        let (hits, misses) = self.spatial.nearby_cache_stats();
        let (fastest, slowest) = self.timer.tick_time_range_ms();
        tracing::info!(
            tick,
            tracked = self.spatial.len(),
            maps = self.spatial.maps().len(),
            cells = stats.cells_scanned,
            pairs = emitted,
            duplicates = stats.slot_duplicates + stats.cross_slot_duplicates,
            cache_hits = hits,
            cache_misses = misses,
            tick_ms = self.timer.tick_time_ms(),
            fastest_ms = fastest,
            slowest_ms = slowest,
            "progress"
        );
        if !rejected.is_empty() {
            tracing::warn!(count = rejected.len(), "entities refused by the grid this tick");
        }
        let overruns = self.timer.overruns();
        if overruns > 0 {
            tracing::debug!(overruns, budget = ?TICK_DURATION, "ticks over budget so far");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::config::BroadPhaseConfig;

    fn settings(worker_threads: usize) -> SpatialSettings {
        SpatialSettings {
            broad_phase: BroadPhaseConfig {
                worker_threads,
                pair_capacity: 256,
            },
            ..SpatialSettings::default()
        }
    }

    fn options() -> SimOptions {
        SimOptions {
            entities: 300,
            maps: 3,
            seed: 99,
        }
    }

    #[test]
    fn same_seed_gives_the_same_run() {
        let mut a = Simulation::new(&settings(0), options()).unwrap();
        let mut b = Simulation::new(&settings(2), options()).unwrap();
        let (left, right) = (a.run(30), b.run(30));
        assert_eq!(left.total_pairs, right.total_pairs);
        assert_eq!(left.ticks, 30);
        assert_eq!(left.rejected, 0);
    }

    #[test]
    fn grid_tracks_every_live_body() {
        let mut sim = Simulation::new(&settings(1), options()).unwrap();
        sim.run(20);
        let alive = sim.world.bodies.iter().filter(|b| b.alive).count();
        assert_eq!(sim.spatial.len(), alive);
        for (map, grid) in sim.spatial.maps().iter() {
            assert!(grid.verify().is_ok(), "{map}");
        }
    }

    #[test]
    fn bodies_stay_inside_the_world() {
        let mut rng = DeterministicRng::new(1);
        let mut world = World::spawn(&options(), &mut rng);
        for _ in 0..500 {
            world.step(&mut rng);
        }
        assert!(world.bodies.iter().all(|b| {
            (0.0..=WORLD_EXTENT).contains(&b.position.x) && (0.0..=WORLD_EXTENT).contains(&b.position.y)
        }));
    }
}
