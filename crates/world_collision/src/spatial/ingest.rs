//! Batched triangle ingest and the ingest-then-build pipeline
//!
//! Large worlds carry 10^5 to 10^6 triangles, so inserting them is split
//! into bounded steps the same way subdivision is. [`OctreeLoader`] chains
//! a [`TriangleIngest`] and an [`OctreeBuilder`] and folds both into one
//! weighted progress value for a loading screen.

use log::debug;

use super::builder::{BuildStatus, OctreeBuilder};
use super::octree::{Octree, OctreeError};
use crate::config::BuildConfig;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::foundation::progress::{Progress, WeightedProgress};
use crate::physics::collision::Triangle;

/// Share of the overall load spent inserting triangles
const INGEST_WEIGHT: f32 = 0.3;

/// Share of the overall load spent subdividing
const BUILD_WEIGHT: f32 = 0.7;

/// Indexed triangle mesh placed in the world by a transform
#[derive(Debug, Clone)]
pub struct MeshSource {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    transform: Mat4,
}

impl MeshSource {
    /// Create a source from a vertex list and a flat triangle index list
    ///
    /// Every three indices form one triangle; a trailing partial triple is
    /// ignored.
    pub fn from_indexed(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            transform: Mat4::identity(),
        }
    }

    /// Place the mesh in the world with a model matrix
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Number of index triples
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn world_vertex(&self, index: u32) -> Option<Vec3> {
        let local = self.vertices.get(index as usize)?;
        Some(self.transform.transform_point(&Point3::from(*local)).coords)
    }

    /// World-space triangles, skipping any that reference a missing vertex
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).filter_map(|triple| {
            Some(Triangle::new(
                self.world_vertex(triple[0])?,
                self.world_vertex(triple[1])?,
                self.world_vertex(triple[2])?,
            ))
        })
    }
}

/// Inserts triangles from an iterator a batch at a time
#[derive(Debug)]
pub struct TriangleIngest<I> {
    source: I,
    octree: Octree,
    batch_size: usize,
    inserted: usize,
    expected: usize,
    exhausted: bool,
}

impl<I: Iterator<Item = Triangle>> TriangleIngest<I> {
    /// Prepare to insert `source` into `octree`
    ///
    /// The expected total for progress comes from the iterator's size hint.
    pub fn new(
        octree: Octree,
        source: impl IntoIterator<IntoIter = I>,
        batch_size: usize,
    ) -> Self {
        let source = source.into_iter();
        let (lower, upper) = source.size_hint();
        Self {
            source,
            octree,
            batch_size: batch_size.max(1),
            inserted: 0,
            expected: upper.unwrap_or(lower),
            exhausted: false,
        }
    }

    /// Insert up to one batch of triangles
    ///
    /// Completes on the step that finds the source empty.
    pub fn step(&mut self) -> Result<BuildStatus, OctreeError> {
        if self.exhausted {
            return Ok(BuildStatus::Complete);
        }

        let mut taken = 0;
        for triangle in self.source.by_ref().take(self.batch_size) {
            self.octree.add_triangle(triangle)?;
            taken += 1;
        }
        self.inserted += taken;
        debug!("Ingested {} triangles ({} so far)", taken, self.inserted);

        if taken < self.batch_size {
            self.exhausted = true;
            return Ok(BuildStatus::Complete);
        }
        Ok(BuildStatus::InProgress(self.progress()))
    }

    /// Inserted count against the expected total
    pub fn progress(&self) -> Progress {
        if self.exhausted {
            return Progress::complete();
        }
        let total = self.expected.max(self.inserted + 1);
        Progress::new(self.inserted as f32, total as f32)
    }

    /// Triangles inserted so far
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Whether the source has run dry
    pub fn is_complete(&self) -> bool {
        self.exhausted
    }

    /// The target tree, holding whatever has been inserted so far
    pub fn into_octree(self) -> Octree {
        self.octree
    }

    fn take_octree(&mut self) -> Octree {
        std::mem::take(&mut self.octree)
    }
}

enum LoadState<I> {
    Ingesting(TriangleIngest<I>),
    Building(OctreeBuilder),
}

/// Ingest followed by an incremental build, with combined progress
pub struct OctreeLoader<I> {
    state: LoadState<I>,
    config: BuildConfig,
    progress: WeightedProgress,
    ingest_stage: usize,
    build_stage: usize,
}

impl<I: Iterator<Item = Triangle>> OctreeLoader<I> {
    /// Load `source` into `octree` and build it
    pub fn new(octree: Octree, source: impl IntoIterator<IntoIter = I>, config: BuildConfig) -> Self {
        let mut progress = WeightedProgress::new();
        let ingest_stage = progress.add_stage("ingest", INGEST_WEIGHT);
        let build_stage = progress.add_stage("build", BUILD_WEIGHT);
        Self {
            state: LoadState::Ingesting(TriangleIngest::new(octree, source, config.ingest_batch_size)),
            config,
            progress,
            ingest_stage,
            build_stage,
        }
    }

    /// Advance the current stage by one batch
    pub fn step(&mut self) -> Result<BuildStatus, OctreeError> {
        match &mut self.state {
            LoadState::Ingesting(ingest) => {
                if let BuildStatus::InProgress(progress) = ingest.step()? {
                    return Ok(BuildStatus::InProgress(self.progress.report(self.ingest_stage, progress)));
                }
                let octree = ingest.take_octree();
                debug!("Ingest finished with {} triangles, starting build", octree.triangle_count());
                self.progress.complete(self.ingest_stage);

                let builder = OctreeBuilder::new(octree, self.config);
                let done = builder.is_complete();
                self.state = LoadState::Building(builder);
                if done {
                    self.progress.complete(self.build_stage);
                    return Ok(BuildStatus::Complete);
                }
                Ok(BuildStatus::InProgress(self.progress.overall()))
            }
            LoadState::Building(builder) => match builder.step() {
                BuildStatus::InProgress(progress) => {
                    Ok(BuildStatus::InProgress(self.progress.report(self.build_stage, progress)))
                }
                BuildStatus::Complete => {
                    self.progress.complete(self.build_stage);
                    Ok(BuildStatus::Complete)
                }
            },
        }
    }

    /// Combined progress over both stages
    pub fn progress(&self) -> Progress {
        self.progress.overall()
    }

    /// Name of the stage currently running
    pub fn stage_name(&self) -> &'static str {
        let stage = match self.state {
            LoadState::Ingesting(_) => self.ingest_stage,
            LoadState::Building(_) => self.build_stage,
        };
        self.progress.stage_name(stage).unwrap_or("unknown")
    }

    /// Take the finished tree, or `None` if loading has not completed
    pub fn into_octree(self) -> Option<Octree> {
        match self.state {
            LoadState::Ingesting(_) => None,
            LoadState::Building(builder) => builder.into_octree(),
        }
    }

    /// Run both stages to the end, reporting combined progress
    ///
    /// Values passed to `on_progress` never decrease and the last one is
    /// exactly complete.
    pub fn run_to_completion(self, mut on_progress: impl FnMut(Progress)) -> Result<Octree, OctreeError> {
        let Self {
            state,
            config,
            mut progress,
            ingest_stage,
            build_stage,
        } = self;

        let builder = match state {
            LoadState::Ingesting(mut ingest) => {
                while let BuildStatus::InProgress(stage_progress) = ingest.step()? {
                    on_progress(progress.report(ingest_stage, stage_progress));
                }
                on_progress(progress.complete(ingest_stage));
                OctreeBuilder::new(ingest.into_octree(), config)
            }
            LoadState::Building(builder) => builder,
        };

        Ok(builder.run_to_completion(|stage_progress| {
            on_progress(progress.report(build_stage, stage_progress));
        }))
    }
}
