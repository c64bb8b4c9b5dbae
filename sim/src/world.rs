//! Seeded world generation.

use burrow::core::types::{Direction, Heading, Pose, Position};
use burrow::io::config::AgentConfig;
use burrow::test_support::{Container, GRAVEL, GridWorld};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::case::WorldSpec;

pub const STONE: &str = "minecraft:stone";
pub const BEDROCK: &str = "minecraft:bedrock";

/// Build the world for `spec`, with the base laid out the way `config`
/// expects to find it.
///
/// Equal inputs always yield the same world.
pub fn generate(spec: &WorldSpec, config: &AgentConfig) -> GridWorld {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let base = config.base.position;
    let mut world = GridWorld::open(Pose::new(base, Heading::North));
    world.set_fuel(spec.fuel);

    world.fill(spec.min, spec.max, STONE);
    let floor = spec.bedrock_y.unwrap_or(spec.min.y - 1);
    world.fill(
        Position::new(spec.min.x, floor, spec.min.z),
        Position::new(spec.max.x, floor, spec.max.z),
        BEDROCK,
    );

    let bounds = Bounds {
        min: Position::new(spec.min.x, spec.min.y.max(floor + 1), spec.min.z),
        max: spec.max,
    };
    if bounds.is_empty() {
        debug!(seed = spec.seed, "no room above the floor for ores or gravel");
    } else {
        for _ in 0..spec.gravel {
            let cell = bounds.random_cell(&mut rng);
            world.set_block(cell, GRAVEL);
            world.set_debris(cell, 1);
        }
        for ore in &spec.ores {
            for _ in 0..ore.veins {
                let mut cell = bounds.random_cell(&mut rng);
                for _ in 0..ore.size {
                    world.set_block(cell, &ore.material);
                    let direction = Direction::PROBE_ORDER[rng.gen_range(0..6)];
                    cell = bounds.clamp(cell.step(direction));
                }
            }
        }
    }

    world.clear(base);
    world.place_container(
        base.step(config.base.drop_direction),
        Container::drop_box(spec.drop_capacity),
    );
    world.place_container(
        base.step(config.base.fuel_direction),
        Container::fuel_box(spec.fuel_stock),
    );
    debug!(seed = spec.seed, cells = world.cells().count(), "world generated");
    world
}

struct Bounds {
    min: Position,
    max: Position,
}

impl Bounds {
    fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    fn random_cell(&self, rng: &mut StdRng) -> Position {
        Position::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
            rng.gen_range(self.min.z..=self.max.z),
        )
    }

    fn clamp(&self, cell: Position) -> Position {
        Position::new(
            cell.x.clamp(self.min.x, self.max.x),
            cell.y.clamp(self.min.y, self.max.y),
            cell.z.clamp(self.min.z, self.max.z),
        )
    }
}
