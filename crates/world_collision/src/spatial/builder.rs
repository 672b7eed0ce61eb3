//! Incremental octree construction
//!
//! [`OctreeBuilder`] owns an unbuilt [`Octree`] and subdivides it a bounded
//! number of nodes at a time. Nodes waiting for a split check sit in a FIFO
//! queue seeded with the root, so the tree grows breadth-first and each
//! [`OctreeBuilder::step`] call does at most `batch_size` node checks before
//! handing control back to the caller.

use std::collections::VecDeque;

use log::{info, trace};

use super::octree::{NodeKey, Octree};
use crate::config::BuildConfig;
use crate::foundation::progress::Progress;

/// Highest fraction reported before the queue is actually drained
const MAX_PARTIAL_PROGRESS: f32 = 0.99;

/// Result of advancing a build by one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildStatus {
    /// Work remains; carries the progress so far
    InProgress(Progress),
    /// The tree is fully subdivided
    Complete,
}

/// Step-wise subdivision of an octree
#[derive(Debug)]
pub struct OctreeBuilder {
    octree: Octree,
    config: BuildConfig,
    queue: VecDeque<NodeKey>,

    /// Nodes popped from the queue so far
    processed: usize,

    /// Rough node count used for progress, `ceil(triangles / capacity) * 2`
    estimate: usize,

    steps: usize,
    reported: f32,
    finished: bool,
}

impl OctreeBuilder {
    /// Prepare a build over the triangles already added to `octree`
    ///
    /// Fixes the root cell immediately. A tree with no triangles, or one that
    /// is already built, is complete before the first step.
    pub fn new(mut octree: Octree, config: BuildConfig) -> Self {
        let triangle_count = octree.triangle_count();
        let capacity = octree.config().leaf_capacity.max(1);
        let estimate = (triangle_count.div_ceil(capacity) * 2).max(1);

        let mut queue = VecDeque::new();
        if !octree.is_built() {
            octree.calc_box();
            if triangle_count > 0 {
                queue.push_back(octree.root());
            }
        }

        let mut builder = Self {
            octree,
            config,
            queue,
            processed: 0,
            estimate,
            steps: 0,
            reported: 0.0,
            finished: false,
        };

        if builder.queue.is_empty() {
            builder.complete();
        } else {
            info!(
                "Building octree: {} triangles, batch size {}",
                triangle_count, builder.config.batch_size
            );
        }
        builder
    }

    /// Examine up to one batch of queued nodes
    ///
    /// Every popped node that is over capacity and above the depth limit is
    /// split; children that still need splitting go to the back of the
    /// queue. Calling this after completion is a no-op.
    pub fn step(&mut self) -> BuildStatus {
        if self.finished {
            return BuildStatus::Complete;
        }

        let batch = self.config.batch_size.max(1);
        let mut examined = 0;
        let mut splits = 0;

        while examined < batch {
            let Some(key) = self.queue.pop_front() else {
                break;
            };
            examined += 1;

            if !self.octree.needs_split(key) {
                continue;
            }
            splits += 1;
            for child in self.octree.split_node(key) {
                if self.octree.needs_split(child) {
                    self.queue.push_back(child);
                }
            }
        }

        self.processed += examined;
        self.steps += 1;
        trace!(
            "Octree build step {}: examined {}, split {}, {} queued",
            self.steps,
            examined,
            splits,
            self.queue.len()
        );

        if self.queue.is_empty() {
            self.complete();
            return BuildStatus::Complete;
        }

        let fraction = (self.processed as f32 / self.estimate as f32).min(MAX_PARTIAL_PROGRESS);
        self.reported = self.reported.max(fraction);
        BuildStatus::InProgress(self.progress())
    }

    fn complete(&mut self) {
        self.finished = true;
        self.queue.clear();
        self.octree.mark_built();
        info!(
            "Octree built: {} triangles, {} nodes, {} leaves, depth {}, {} steps",
            self.octree.triangle_count(),
            self.octree.node_count(),
            self.octree.leaf_count(),
            self.octree.max_depth_reached(),
            self.steps
        );
    }

    /// Whether the queue has drained
    pub fn is_complete(&self) -> bool {
        self.finished
    }

    /// Progress so far, exactly complete once the build has finished
    pub fn progress(&self) -> Progress {
        if self.finished {
            Progress::complete()
        } else {
            Progress::new(self.reported, 1.0)
        }
    }

    /// Number of `step` calls that did work
    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    /// Nodes still waiting for a split check
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The tree being built; partially subdivided until complete
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Take the finished tree, or `None` if the build has not completed
    pub fn into_octree(self) -> Option<Octree> {
        self.finished.then_some(self.octree)
    }

    /// Step until complete, reporting progress after every batch
    ///
    /// The last value passed to `on_progress` is always exactly complete.
    pub fn run_to_completion(mut self, mut on_progress: impl FnMut(Progress)) -> Octree {
        while let BuildStatus::InProgress(progress) = self.step() {
            on_progress(progress);
        }
        on_progress(Progress::complete());
        self.octree
    }

    /// Abandon the build, returning an empty tree with the same configuration
    pub fn cancel(self) -> Octree {
        let mut octree = self.octree;
        octree.clear();
        octree
    }
}

impl Octree {
    /// Build this tree synchronously
    pub fn build(self, config: BuildConfig, on_progress: impl FnMut(Progress)) -> Self {
        OctreeBuilder::new(self, config).run_to_completion(on_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OctreeConfig;
    use crate::foundation::math::Vec3;
    use crate::physics::collision::Triangle;

    /// Small triangles spread over a 10 x 10 x N lattice
    fn lattice(count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|i| {
                let origin = Vec3::new((i % 10) as f32, ((i / 10) % 10) as f32, (i / 100) as f32);
                Triangle::new(
                    origin,
                    origin + Vec3::new(0.4, 0.0, 0.0),
                    origin + Vec3::new(0.0, 0.4, 0.1),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_tree_completes_immediately() {
        let mut builder = OctreeBuilder::new(Octree::default(), BuildConfig::default());
        assert!(builder.is_complete());
        assert_eq!(builder.progress(), Progress::complete());
        assert_eq!(builder.step(), BuildStatus::Complete);
        assert_eq!(builder.steps_taken(), 0);

        let octree = builder.into_octree().unwrap();
        assert!(octree.is_built());
        assert_eq!(octree.node_count(), 1);
    }

    #[test]
    fn test_small_tree_finishes_in_one_step_without_splitting() {
        let octree = Octree::from_triangles(lattice(8), OctreeConfig::default());
        let mut builder = OctreeBuilder::new(octree, BuildConfig::default());
        assert!(!builder.is_complete());
        assert_eq!(builder.step(), BuildStatus::Complete);

        let octree = builder.into_octree().unwrap();
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.leaf_count(), 1);
    }

    #[test]
    fn test_steps_are_bounded_by_batch_size() {
        let octree = Octree::from_triangles(lattice(1000), OctreeConfig::default());
        let mut builder = OctreeBuilder::new(octree, BuildConfig::default().with_batch_size(1));

        // The first step may only split the root
        assert!(matches!(builder.step(), BuildStatus::InProgress(_)));
        assert_eq!(builder.octree().node(builder.octree().root()).unwrap().children.len(), builder.pending());
        assert!(builder.into_octree().is_none());
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_one() {
        let octree = Octree::from_triangles(lattice(1000), OctreeConfig::default());
        let mut reports = Vec::new();
        let octree = OctreeBuilder::new(octree, BuildConfig::default().with_batch_size(3))
            .run_to_completion(|progress| reports.push(progress.fraction()));

        assert!(octree.is_built());
        assert!(reports.len() > 2);
        assert!(reports.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(reports.last().copied(), Some(1.0));
        assert!(reports[..reports.len() - 1].iter().all(|&f| f < 1.0));
    }

    #[test]
    fn test_built_leaves_respect_capacity_or_depth() {
        let config = OctreeConfig::default();
        let octree = Octree::from_triangles(lattice(1000), config).build(BuildConfig::default(), |_| {});

        for leaf in octree.leaves() {
            assert!(leaf.triangles.len() <= config.leaf_capacity || leaf.depth == config.max_depth);
        }
        assert!(octree.max_depth_reached() <= config.max_depth);
    }

    #[test]
    fn test_building_a_built_tree_is_immediate() {
        let octree = Octree::from_triangles(lattice(100), OctreeConfig::default())
            .build(BuildConfig::default(), |_| {});
        let nodes = octree.node_count();

        let builder = OctreeBuilder::new(octree, BuildConfig::default());
        assert!(builder.is_complete());
        assert_eq!(builder.into_octree().unwrap().node_count(), nodes);
    }

    #[test]
    fn test_cancel_returns_cleared_tree() {
        let config = OctreeConfig::default().with_leaf_capacity(4);
        let mut builder = OctreeBuilder::new(
            Octree::from_triangles(lattice(500), config),
            BuildConfig::default().with_batch_size(1),
        );
        builder.step();

        let octree = builder.cancel();
        assert!(!octree.is_built());
        assert_eq!(octree.triangle_count(), 0);
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.config(), &config);
    }
}
