//! Headless collision demo
//!
//! Generates a rolling procedural terrain, streams it into an octree through
//! the loader while logging progress, then:
//! - Drops a capsule character onto the terrain and lets it settle
//! - Fires a batch of random ray probes at the ground
//! - Optionally writes a RON snapshot of the built tree
//!
//! Usage: `collision_demo [config.toml|config.ron] [snapshot.ron]`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use world_collision::foundation::logging::{self, info, warn};
use world_collision::prelude::*;
use world_collision::spatial::OctreeError;

// Terrain settings
const TERRAIN_CELLS: u32 = 96;
const TERRAIN_SPACING: f32 = 1.0;
const TERRAIN_SEED: u64 = 7;

// Character settings
const CAPSULE_RADIUS: f32 = 0.4;
const CAPSULE_HEIGHT: f32 = 1.8;
const GRAVITY: f32 = -9.81;
const TIME_STEP: f32 = 1.0 / 60.0;
const SIMULATION_STEPS: usize = 300;

const RAY_PROBES: usize = 200;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Octree(#[from] OctreeError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Sum of a few sine octaves with random phases
struct Heightfield {
    octaves: Vec<(f32, f32, f32, f32)>,
}

impl Heightfield {
    fn new(rng: &mut StdRng) -> Self {
        let octaves = (0..4)
            .map(|octave| {
                let scale = 0.5_f32.powi(octave);
                (
                    3.0 * scale,
                    0.05 / scale,
                    rng.gen_range(0.0..std::f32::consts::TAU),
                    rng.gen_range(0.0..std::f32::consts::TAU),
                )
            })
            .collect();
        Self { octaves }
    }

    fn height(&self, x: f32, z: f32) -> f32 {
        self.octaves
            .iter()
            .map(|&(amplitude, frequency, phase_x, phase_z)| {
                amplitude * (x * frequency + phase_x).sin() * (z * frequency + phase_z).cos()
            })
            .sum()
    }

    /// Indexed grid mesh, centered on the origin
    fn mesh(&self, cells: u32, spacing: f32) -> MeshSource {
        let side = cells + 1;
        let mut vertices = Vec::with_capacity((side * side) as usize);
        for i in 0..side {
            for j in 0..side {
                let (x, z) = (i as f32 * spacing, j as f32 * spacing);
                vertices.push(Vec3::new(x, self.height(x, z), z));
            }
        }

        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for i in 0..cells {
            for j in 0..cells {
                let corner = i * side + j;
                indices.extend_from_slice(&[corner, corner + 1, corner + side]);
                indices.extend_from_slice(&[corner + side, corner + 1, corner + side + 1]);
            }
        }

        let half = cells as f32 * spacing * 0.5;
        MeshSource::from_indexed(vertices, indices).with_transform(Mat4::new_translation(&Vec3::new(-half, 0.0, -half)))
    }
}

/// Capsule character falling under gravity
struct Character {
    capsule: Capsule,
    velocity: Vec3,
    grounded: bool,
}

impl Character {
    fn spawn(position: Vec3) -> Self {
        Self {
            capsule: Capsule::new(position, position + Vec3::new(0.0, CAPSULE_HEIGHT - 2.0 * CAPSULE_RADIUS, 0.0), CAPSULE_RADIUS),
            velocity: Vec3::zeros(),
            grounded: false,
        }
    }

    fn update(&mut self, octree: &Octree, dt: f32) {
        self.velocity.y += GRAVITY * dt;
        self.capsule.translate(&(self.velocity * dt));

        self.grounded = false;
        if let Some(collision) = octree.capsule_intersect(&self.capsule) {
            self.capsule.translate(&collision.correction());

            // Remove the velocity component pushing into the surface
            let into_surface = self.velocity.dot(&collision.normal);
            if into_surface < 0.0 {
                self.velocity -= collision.normal * into_surface;
            }
            self.grounded = collision.normal.y > 0.5;
        }
    }

    fn feet(&self) -> Vec3 {
        self.capsule.start - Vec3::new(0.0, CAPSULE_RADIUS, 0.0)
    }
}

fn load_config() -> Result<CollisionConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            CollisionConfig::load_from_file(&path)?
        }
        None => CollisionConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn build_terrain(config: &CollisionConfig, heightfield: &Heightfield) -> Result<Octree, DemoError> {
    let mesh = heightfield.mesh(TERRAIN_CELLS, TERRAIN_SPACING);
    info!("Streaming {} terrain triangles into the octree", mesh.triangle_count());

    let mut next_report = 0.0;
    let octree = OctreeLoader::new(Octree::new(config.octree), mesh.triangles(), config.build)
        .run_to_completion(|progress| {
            let fraction = progress.fraction();
            if fraction >= next_report {
                info!("Loading... {:>3.0}%", fraction * 100.0);
                next_report = (fraction + 0.1).min(1.0);
            }
        })?;

    info!(
        "Terrain octree: {} triangles, {} nodes, {} leaves, depth {}",
        octree.triangle_count(),
        octree.node_count(),
        octree.leaf_count(),
        octree.max_depth_reached()
    );
    Ok(octree)
}

fn drop_character(octree: &Octree, heightfield: &Heightfield, rng: &mut StdRng) {
    let half = TERRAIN_CELLS as f32 * TERRAIN_SPACING * 0.5;
    let (x, z) = (rng.gen_range(-half * 0.5..half * 0.5), rng.gen_range(-half * 0.5..half * 0.5));
    let mut character = Character::spawn(Vec3::new(x, 12.0, z));

    for step in 0..SIMULATION_STEPS {
        let was_grounded = character.grounded;
        character.update(octree, TIME_STEP);
        if character.grounded && !was_grounded {
            info!("Character landed at step {} at {:?}", step, character.feet());
        }
    }

    let ground = heightfield.height(x + half, z + half);
    let feet = character.feet();
    info!(
        "Character resting at {:.3} above the sampled terrain height {:.3}",
        feet.y - ground,
        ground
    );
    if !character.grounded {
        warn!("Character never came to rest on the terrain");
    }
}

fn probe_rays(octree: &Octree, rng: &mut StdRng) {
    let half = TERRAIN_CELLS as f32 * TERRAIN_SPACING * 0.5;
    let mut hits = 0;
    let mut total_distance = 0.0;

    for _ in 0..RAY_PROBES {
        let origin = Vec3::new(rng.gen_range(-half..half), 20.0, rng.gen_range(-half..half));
        let direction = Vec3::new(rng.gen_range(-0.3..0.3), -1.0, rng.gen_range(-0.3..0.3));
        if let Some(hit) = octree.ray_intersect(&Ray::new(origin, direction)) {
            hits += 1;
            total_distance += hit.distance;
        }
    }

    let mean = if hits > 0 { total_distance / hits as f32 } else { 0.0 };
    info!("Ray probes: {}/{} hit, mean distance {:.2}", hits, RAY_PROBES, mean);
}

fn main() -> Result<(), DemoError> {
    logging::init_with_level(log::LevelFilter::Info);

    info!("=== Collision Demo ===");
    let config = load_config()?;
    let mut rng = StdRng::seed_from_u64(TERRAIN_SEED);
    let heightfield = Heightfield::new(&mut rng);

    let octree = build_terrain(&config, &heightfield)?;
    drop_character(&octree, &heightfield, &mut rng);
    probe_rays(&octree, &mut rng);

    if let Some(path) = std::env::args().nth(2) {
        octree.to_snapshot().save_to_file(&path)?;
        info!("Snapshot written to {}", path);
    }
    Ok(())
}
