//! Octree spatial partitioning over a static triangle mesh
//!
//! Triangles are stored once in a pool and referenced by [`TriangleId`].
//! Nodes live in a slot map and hold id lists, so a triangle straddling a
//! split boundary is shared by every leaf it touches without being copied.
//!
//! The tree has two phases. While collecting, [`Octree::add_triangle`] only
//! appends to the root and grows the root bounds. Subdivision happens later,
//! one node at a time, driven by [`super::OctreeBuilder`]; once it finishes
//! the tree is read-only until [`Octree::clear`].

use slotmap::{new_key_type, SlotMap};

use super::aabb::AABB;
use crate::config::OctreeConfig;
use crate::physics::collision::Triangle;

new_key_type! {
    /// Handle to a node in the octree arena
    pub struct NodeKey;
}

/// Index of a triangle in the octree's triangle pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub usize);

/// Errors raised by octree mutation
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OctreeError {
    /// Triangles can only be added before the tree is built
    #[error("octree is already built; clear it before adding triangles")]
    AlreadyBuilt,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space cell of this node, fixed once computed
    pub aabb: AABB,

    /// Triangles referenced by this node (leaves only, once built)
    pub triangles: Vec<TriangleId>,

    /// Non-empty child octants; empty for a leaf
    pub children: Vec<NodeKey>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(aabb: AABB, depth: u32) -> Self {
        Self {
            aabb,
            triangles: Vec::new(),
            children: Vec::new(),
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Octree over a static triangle mesh
#[derive(Debug, Clone)]
pub struct Octree {
    /// Subdivision parameters
    config: OctreeConfig,

    /// Triangle pool, indexed by `TriangleId`
    triangles: Vec<Triangle>,

    /// Union of every inserted triangle
    bounds: AABB,

    /// Node arena
    nodes: SlotMap<NodeKey, OctreeNode>,

    /// Root node handle
    root: NodeKey,

    /// Set once subdivision has finished
    built: bool,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

impl Octree {
    /// Create an empty octree
    pub fn new(config: OctreeConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(OctreeNode::new(AABB::empty(), 0));
        Self {
            config,
            triangles: Vec::new(),
            bounds: AABB::empty(),
            nodes,
            root,
            built: false,
        }
    }

    /// Create an unbuilt octree holding the given triangles
    pub fn from_triangles(
        triangles: impl IntoIterator<Item = Triangle>,
        config: OctreeConfig,
    ) -> Self {
        let mut octree = Self::new(config);
        for triangle in triangles {
            octree.push_triangle(triangle);
        }
        octree
    }

    /// Add a triangle to the root and grow the bounds around it
    ///
    /// Triangles with NaN or infinite vertices are pooled but never widen the
    /// bounds and never reach a child cell. Fails once the tree has been built; there is no incremental update of
    /// a subdivided tree.
    pub fn add_triangle(&mut self, triangle: Triangle) -> Result<TriangleId, OctreeError> {
        if self.built {
            return Err(OctreeError::AlreadyBuilt);
        }
        Ok(self.push_triangle(triangle))
    }

    fn push_triangle(&mut self, triangle: Triangle) -> TriangleId {
        let id = TriangleId(self.triangles.len());
        if triangle.is_finite() {
            self.bounds.expand_by_triangle(&triangle);
        }
        self.triangles.push(triangle);
        self.nodes[self.root].triangles.push(id);
        id
    }

    /// Fix the root cell to the bounds padded by the configured margin
    ///
    /// A tree with no triangles keeps an empty root cell.
    pub fn calc_box(&mut self) {
        let aabb = self.bounds.expanded(self.config.box_margin);
        self.nodes[self.root].aabb = aabb;
    }

    /// Whether a node is over capacity and still allowed to split
    pub fn needs_split(&self, key: NodeKey) -> bool {
        self.nodes.get(key).is_some_and(|node| {
            node.is_leaf()
                && node.triangles.len() > self.config.leaf_capacity
                && node.depth < self.config.max_depth
        })
    }

    /// Subdivide one leaf into its non-empty octants
    ///
    /// Each triangle is copied (by id) into every octant whose cell it
    /// touches; non-finite triangles touch none. The node's own list is emptied, octants that received nothing
    /// are dropped, and the handles of the created children are returned.
    pub fn split_node(&mut self, key: NodeKey) -> Vec<NodeKey> {
        let Some(node) = self.nodes.get_mut(key) else {
            return Vec::new();
        };
        if !node.is_leaf() {
            return Vec::new();
        }

        let parent_box = node.aabb;
        let depth = node.depth + 1;
        let triangles = std::mem::take(&mut node.triangles);

        let boxes: [AABB; 8] = std::array::from_fn(|octant| parent_box.octant(octant));
        let mut buckets: [Vec<TriangleId>; 8] = Default::default();

        for id in triangles {
            let triangle = &self.triangles[id.0];
            for (aabb, bucket) in boxes.iter().zip(buckets.iter_mut()) {
                if aabb.intersects_triangle(triangle) {
                    bucket.push(id);
                }
            }
        }

        let mut children = Vec::with_capacity(8);
        for (aabb, bucket) in boxes.into_iter().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }
            let mut child = OctreeNode::new(aabb, depth);
            child.triangles = bucket;
            children.push(self.nodes.insert(child));
        }

        self.nodes[key].children.clone_from(&children);
        children
    }

    /// Flag the tree as fully subdivided
    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }

    /// Reset to an empty, unbuilt tree with the same configuration
    pub fn clear(&mut self) {
        *self = Self::new(self.config);
    }

    /// Whether subdivision has finished
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Subdivision parameters
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Union of all inserted triangles
    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    /// Root node handle
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Look up a node
    pub fn node(&self, key: NodeKey) -> Option<&OctreeNode> {
        self.nodes.get(key)
    }

    /// Look up a triangle by id
    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id.0)
    }

    /// All pooled triangles in insertion order
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of distinct triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Total nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves that hold triangles
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.is_leaf() && !node.triangles.is_empty())
            .count()
    }

    /// Deepest node depth present
    pub fn max_depth_reached(&self) -> u32 {
        self.nodes.values().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Get all leaf nodes that hold triangles (for visualization)
    pub fn leaves(&self) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        self.walk(self.root, &mut |node| {
            if node.is_leaf() && !node.triangles.is_empty() {
                leaves.push(node);
            }
        });
        leaves
    }

    /// Depth-first pre-order walk from `key`, children in stored order
    pub(crate) fn walk<'a>(&'a self, key: NodeKey, visit: &mut dyn FnMut(&'a OctreeNode)) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        visit(node);
        for &child in &node.children {
            self.walk(child, visit);
        }
    }

    /// Visit every node whose cell passes `overlaps`, pruning whole subtrees
    /// whose cell fails it
    pub(crate) fn visit_overlapping<'a>(
        &'a self,
        key: NodeKey,
        overlaps: &dyn Fn(&AABB) -> bool,
        visit: &mut dyn FnMut(&'a OctreeNode),
    ) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        if !overlaps(&node.aabb) {
            return;
        }
        visit(node);
        for &child in &node.children {
            self.visit_overlapping(child, overlaps, visit);
        }
    }

    /// Rebuild a tree from already-subdivided parts
    pub(crate) fn from_parts(
        config: OctreeConfig,
        triangles: Vec<Triangle>,
        bounds: AABB,
        nodes: SlotMap<NodeKey, OctreeNode>,
        root: NodeKey,
    ) -> Self {
        Self {
            config,
            triangles,
            bounds,
            nodes,
            root,
            built: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn strip(count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|i| {
                let x = i as f32;
                Triangle::new(
                    Vec3::new(x, 0.0, 0.0),
                    Vec3::new(x, 0.0, 1.0),
                    Vec3::new(x + 1.0, 0.0, 0.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_add_triangle_grows_bounds_without_splitting() {
        let mut octree = Octree::default();
        for triangle in strip(20) {
            octree.add_triangle(triangle).unwrap();
        }
        assert_eq!(octree.triangle_count(), 20);
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.bounds().min, Vec3::zeros());
        assert_eq!(octree.bounds().max, Vec3::new(20.0, 0.0, 1.0));
        let root = octree.node(octree.root()).unwrap();
        assert_eq!(root.triangles.len(), 20);
        assert!(root.aabb.is_empty());
    }

    #[test]
    fn test_calc_box_pads_every_face() {
        let mut octree = Octree::from_triangles(strip(2), OctreeConfig::default());
        octree.calc_box();
        let root = octree.node(octree.root()).unwrap();
        assert_relative_eq!(root.aabb.min, Vec3::repeat(-0.01));
        assert_relative_eq!(root.aabb.max, Vec3::new(2.01, 0.01, 1.01));
    }

    #[test]
    fn test_calc_box_on_empty_tree_stays_empty() {
        let mut octree = Octree::default();
        octree.calc_box();
        assert!(octree.node(octree.root()).unwrap().aabb.is_empty());
        assert!(!octree.needs_split(octree.root()));
    }

    #[test]
    fn test_split_distributes_and_prunes() {
        let mut octree = Octree::from_triangles(strip(16), OctreeConfig::default());
        octree.calc_box();
        assert!(octree.needs_split(octree.root()));

        let children = octree.split_node(octree.root());
        let root = octree.node(octree.root()).unwrap();
        assert!(root.triangles.is_empty());
        assert_eq!(root.children, children);
        // The strip is flat and thin, so only the octants touching y = 0 and
        // both z halves can receive triangles
        assert!(!children.is_empty() && children.len() <= 8);

        let mut seen = vec![false; octree.triangle_count()];
        for &child in &children {
            let node = octree.node(child).unwrap();
            assert_eq!(node.depth, 1);
            assert!(!node.triangles.is_empty());
            for id in &node.triangles {
                assert!(node.aabb.intersects_triangle(octree.triangle(*id).unwrap()));
                seen[id.0] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_split_respects_depth_limit() {
        let config = OctreeConfig::default().with_max_depth(0);
        let mut octree = Octree::from_triangles(strip(16), config);
        octree.calc_box();
        assert!(!octree.needs_split(octree.root()));
    }

    #[test]
    fn test_non_finite_triangles_do_not_blow_up_subdivision() {
        let nan = Triangle::new(Vec3::repeat(f32::NAN), Vec3::repeat(f32::NAN), Vec3::repeat(f32::NAN));
        let mut triangles = vec![nan; 9];
        triangles.extend(strip(1));
        triangles.push(Triangle::new(
            Vec3::new(f32::NEG_INFINITY, 0.0, 0.0),
            Vec3::new(f32::INFINITY, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ));

        let mut octree = Octree::from_triangles(triangles, OctreeConfig::default());
        assert_eq!(octree.bounds().min, Vec3::zeros());
        assert_eq!(octree.bounds().max, Vec3::new(1.0, 0.0, 1.0));

        octree.calc_box();
        let children = octree.split_node(octree.root());
        assert!(!children.is_empty());
        for child in children {
            let node = octree.node(child).unwrap();
            assert_eq!(node.triangles, vec![TriangleId(9)]);
            assert!(!octree.needs_split(child));
        }
        assert_eq!(octree.triangle_count(), 11);
    }

    #[test]
    fn test_add_after_build_is_rejected_until_clear() {
        let mut octree = Octree::from_triangles(strip(1), OctreeConfig::default());
        octree.mark_built();
        assert_eq!(octree.add_triangle(strip(1)[0]), Err(OctreeError::AlreadyBuilt));

        octree.clear();
        assert!(!octree.is_built());
        assert_eq!(octree.triangle_count(), 0);
        assert!(octree.bounds().is_empty());
        assert!(octree.add_triangle(strip(1)[0]).is_ok());
    }
}
