//! Snapshot demo: populates a world, round-trips it, and checks the copy.
//!
//! Spawns a field of particles with random `Position`/`Velocity`, chains
//! some of them with a `ChildOf` relation, despawns a random few (parents
//! included) to leave holes in the entity pool, and adds a `SimClock`
//! resource. The world is then
//! serialised (repeatedly, when `--iterations` asks for a rough timing),
//! optionally written to `--out`, and restored into a freshly registered
//! world that is compared against the source.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_snapshot::{SerdeOptions, deserialize, serialize};
use engine_world::{Component, Entity, Resource, World};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Position {
    x: f64,
    y: f64,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "demo.Position"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Velocity {
    x: f64,
    y: f64,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "demo.Velocity"
    }
}

/// Links a particle to the one spawned before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChildOf;

impl Component for ChildOf {
    fn type_name() -> &'static str {
        "demo.ChildOf"
    }

    fn is_relation() -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SimClock {
    tick: u64,
    dt: f64,
}

impl Resource for SimClock {
    fn type_name() -> &'static str {
        "demo.SimClock"
    }
}

#[derive(Parser)]
#[command(name = "snapshot_demo", about = "Round-trip an ECS world through a JSON snapshot")]
struct Args {
    /// Number of entities to spawn
    #[arg(short, long, default_value_t = 1000)]
    entities: usize,

    /// Gzip the snapshot
    #[arg(short, long)]
    compress: bool,

    /// Gzip level (0-9); implies --compress
    #[arg(short, long)]
    level: Option<u32>,

    /// Write the snapshot to this file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Seed for the random particle field
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Serialise this many times and report the mean duration
    #[arg(short, long, default_value_t = 1)]
    iterations: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("snapshot_demo=info".parse()?))
        .init();

    let args = Args::parse();

    let mut options = SerdeOptions::new();
    if let Some(level) = args.level {
        options = options.compress_level(level);
    } else if args.compress {
        options = options.compress();
    }

    let source = populate(args.entities, args.seed)?;
    info!(
        entities = source.entity_count(),
        slots = source.ever_allocated(),
        archetypes = source.archetype_count(),
        "populated source world"
    );

    let iterations = args.iterations.max(1);
    let started = Instant::now();
    let mut bytes = Vec::new();
    for _ in 0..iterations {
        bytes = serialize(&source, &options)?;
    }
    let elapsed = started.elapsed();
    info!(
        bytes = bytes.len(),
        iterations,
        mean_us = elapsed.as_micros() / u128::from(iterations),
        "serialized"
    );

    if let Some(path) = &args.out {
        std::fs::write(path, &bytes)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        info!(path = %path.display(), "wrote snapshot");
    }

    let mut target = prepare_target()?;
    let started = Instant::now();
    deserialize(&bytes, &mut target, &options)?;
    info!(us = started.elapsed().as_micros(), "deserialized");

    verify(&source, &target)?;
    info!(entities = target.entity_count(), "restored world matches the source");
    Ok(())
}

fn populate(count: usize, seed: u64) -> Result<World> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = World::new();

    let mut previous: Option<Entity> = None;
    let mut spawned = Vec::with_capacity(count);
    for i in 0..count {
        let entity = world.spawn_with(Position {
            x: rng.gen_range(-100.0..100.0),
            y: rng.gen_range(-100.0..100.0),
        })?;
        if rng.gen_bool(0.5) {
            world.insert(
                entity,
                Velocity {
                    x: rng.gen_range(-1.0..1.0),
                    y: rng.gen_range(-1.0..1.0),
                },
            )?;
        }
        if i % 10 != 0
            && let Some(parent) = previous
        {
            world.insert_relation(entity, ChildOf, parent)?;
        }
        previous = Some(entity);
        spawned.push(entity);
    }

    // Free a random tenth of the slots, parents included, so the pool
    // carries a free list and some relations fall back to INVALID.
    for entity in spawned {
        if rng.gen_bool(0.1) {
            world.despawn(entity)?;
        }
    }

    world.add_resource(SimClock {
        tick: rng.gen_range(0..10_000),
        dt: 1.0 / 60.0,
    })?;
    Ok(world)
}

fn prepare_target() -> Result<World> {
    let mut world = World::new();
    world.register_component::<Position>()?;
    world.register_component::<Velocity>()?;
    world.register_component::<ChildOf>()?;
    world.add_resource(SimClock::default())?;
    Ok(world)
}

fn verify(source: &World, target: &World) -> Result<()> {
    if source.entity_count() != target.entity_count() {
        bail!(
            "entity count differs: {} vs {}",
            source.entity_count(),
            target.entity_count()
        );
    }
    for entity in source.entities() {
        if !target.is_alive(entity) {
            bail!("{entity} is not alive in the restored world");
        }
        if source.get::<Position>(entity) != target.get::<Position>(entity)
            || source.get::<Velocity>(entity) != target.get::<Velocity>(entity)
            || source.relation_target::<ChildOf>(entity) != target.relation_target::<ChildOf>(entity)
        {
            bail!("{entity} differs after the round trip");
        }
    }
    if source.resource::<SimClock>() != target.resource::<SimClock>() {
        bail!("SimClock differs after the round trip");
    }

    let mut from_source = World::new();
    from_source.load_entities(&source.dump_entities())?;
    let mut from_target = World::new();
    from_target.load_entities(&target.dump_entities())?;
    if from_source.spawn() != from_target.spawn() {
        bail!("entity allocation diverged after the round trip");
    }
    Ok(())
}
