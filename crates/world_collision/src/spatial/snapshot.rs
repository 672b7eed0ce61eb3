//! Plain-record snapshots of a built octree
//!
//! A snapshot mirrors the tree as nested records: each node carries its
//! cell, the triangles it holds by value, and its children. Vectors are
//! `{x, y, z}` records. The root also carries the triangle bounds; child
//! records carry an empty box there. The text form is RON, which keeps the
//! infinite components of an empty box intact.
//!
//! Decoding rebuilds the triangle pool by value, so a triangle shared by
//! several leaves comes back as one pooled triangle. Pool ids are assigned
//! in traversal order and may differ from the tree that was saved; query
//! results do not depend on them.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::aabb::AABB;
use super::octree::{NodeKey, Octree, OctreeNode, TriangleId};
use crate::config::OctreeConfig;
use crate::foundation::math::Vec3;
use crate::physics::collision::Triangle;

/// Errors from encoding or decoding snapshots
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    /// The records do not describe a valid tree
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    /// Serialization to text failed
    #[error("Failed to encode snapshot: {0}")]
    Encode(String),

    /// The text could not be parsed
    #[error("Failed to decode snapshot: {0}")]
    Decode(String),

    /// File access failed
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vector as an `{x, y, z}` record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct Vec3Record {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Box as a `{min, max}` record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AabbRecord {
    /// Minimum corner
    pub min: Vec3Record,
    /// Maximum corner
    pub max: Vec3Record,
}

/// Triangle as an `{a, b, c}` record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct TriangleRecord {
    pub a: Vec3Record,
    pub b: Vec3Record,
    pub c: Vec3Record,
}

/// One node of a snapshot, with its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OctreeSnapshot {
    /// Cell of this node
    #[serde(rename = "box")]
    pub aabb: AabbRecord,

    /// Union of all triangles; only meaningful on the root
    pub bounds: AabbRecord,

    /// Triangles held by this node
    pub triangles: Vec<TriangleRecord>,

    /// Child nodes
    pub children: Vec<OctreeSnapshot>,
}

impl From<Vec3> for Vec3Record {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Record> for Vec3 {
    fn from(r: Vec3Record) -> Self {
        Vec3::new(r.x, r.y, r.z)
    }
}

impl From<AABB> for AabbRecord {
    fn from(aabb: AABB) -> Self {
        Self {
            min: aabb.min.into(),
            max: aabb.max.into(),
        }
    }
}

impl From<AabbRecord> for AABB {
    fn from(r: AabbRecord) -> Self {
        AABB::new(r.min.into(), r.max.into())
    }
}

impl From<Triangle> for TriangleRecord {
    fn from(t: Triangle) -> Self {
        Self {
            a: t.a.into(),
            b: t.b.into(),
            c: t.c.into(),
        }
    }
}

impl From<TriangleRecord> for Triangle {
    fn from(r: TriangleRecord) -> Self {
        Triangle::new(r.a.into(), r.b.into(), r.c.into())
    }
}

impl TriangleRecord {
    fn is_finite(&self) -> bool {
        [self.a, self.b, self.c]
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }

    /// Exact bit pattern, used to recognise the same triangle in several leaves
    fn bits(&self) -> [u32; 9] {
        let Self { a, b, c } = self;
        [a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z].map(f32::to_bits)
    }
}

impl OctreeSnapshot {
    /// Encode as pretty-printed RON
    pub fn to_ron(&self) -> Result<String, SnapshotError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decode from RON text
    ///
    /// Missing or unknown fields are reported as [`SnapshotError::Malformed`];
    /// text that does not parse at all is [`SnapshotError::Decode`].
    pub fn from_ron(text: &str) -> Result<Self, SnapshotError> {
        ron::from_str(text).map_err(|e| match e.code {
            ron::Error::MissingStructField { .. }
            | ron::Error::NoSuchStructField { .. }
            | ron::Error::DuplicateStructField { .. } => SnapshotError::Malformed(e.to_string()),
            _ => SnapshotError::Decode(e.to_string()),
        })
    }

    /// Write the RON encoding to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Read a snapshot from a RON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }
}

impl Octree {
    /// Capture the tree as nested records
    pub fn to_snapshot(&self) -> OctreeSnapshot {
        let mut snapshot = self.node_snapshot(self.root());
        snapshot.bounds = (*self.bounds()).into();
        snapshot
    }

    fn node_snapshot(&self, key: NodeKey) -> OctreeSnapshot {
        let Some(node) = self.node(key) else {
            return OctreeSnapshot {
                aabb: AABB::empty().into(),
                bounds: AABB::empty().into(),
                triangles: Vec::new(),
                children: Vec::new(),
            };
        };
        OctreeSnapshot {
            aabb: node.aabb.into(),
            bounds: AABB::empty().into(),
            triangles: node
                .triangles
                .iter()
                .filter_map(|&id| self.triangle(id))
                .map(|&t| t.into())
                .collect(),
            children: node.children.iter().map(|&child| self.node_snapshot(child)).collect(),
        }
    }

    /// Rebuild a built tree from records
    ///
    /// Node depths are recomputed from the nesting. The result answers every
    /// query exactly as the tree that was captured.
    pub fn from_snapshot(snapshot: &OctreeSnapshot, config: OctreeConfig) -> Result<Self, SnapshotError> {
        let mut decoder = SnapshotDecoder::default();
        let root = decoder.decode(snapshot, 0)?;

        let bounds = decode_box(&snapshot.bounds)
            .ok_or_else(|| SnapshotError::Malformed("root bounds are not a valid box".to_string()))?;
        if bounds.is_empty() != decoder.triangles.is_empty() {
            return Err(SnapshotError::Malformed(
                "root bounds disagree with the stored triangles".to_string(),
            ));
        }

        debug!(
            "Decoded octree snapshot: {} pooled triangles, {} nodes",
            decoder.triangles.len(),
            decoder.nodes.len()
        );
        Ok(Self::from_parts(config, decoder.triangles, bounds, decoder.nodes, root))
    }
}

/// Accepts finite boxes with `min <= max`, or the exact empty box
fn decode_box(record: &AabbRecord) -> Option<AABB> {
    let aabb = AABB::from(*record);
    if aabb == AABB::empty() {
        return Some(aabb);
    }
    let finite = aabb.min.iter().chain(aabb.max.iter()).all(|v| v.is_finite());
    (finite && !aabb.is_empty()).then_some(aabb)
}

#[derive(Default)]
struct SnapshotDecoder {
    triangles: Vec<Triangle>,
    nodes: SlotMap<NodeKey, OctreeNode>,

    /// Pooled copies of each distinct triangle value
    pooled: HashMap<[u32; 9], Vec<TriangleId>>,
}

impl SnapshotDecoder {
    fn decode(&mut self, record: &OctreeSnapshot, depth: u32) -> Result<NodeKey, SnapshotError> {
        let malformed = |what: &str| SnapshotError::Malformed(format!("node at depth {depth}: {what}"));

        if record.children.len() > 8 {
            return Err(malformed("more than 8 children"));
        }
        if !record.children.is_empty() && !record.triangles.is_empty() {
            return Err(malformed("holds both triangles and children"));
        }
        if depth > 0 && record.children.is_empty() && record.triangles.is_empty() {
            return Err(malformed("empty non-root node"));
        }

        let aabb = decode_box(&record.aabb).ok_or_else(|| malformed("invalid box"))?;
        if aabb.is_empty() && (depth > 0 || !record.triangles.is_empty() || !record.children.is_empty()) {
            return Err(malformed("occupied node with an empty box"));
        }

        let mut node = OctreeNode::new(aabb, depth);
        node.triangles = self.pool_leaf(&record.triangles).ok_or_else(|| malformed("non-finite triangle"))?;
        let key = self.nodes.insert(node);

        let mut children = Vec::with_capacity(record.children.len());
        for child in &record.children {
            children.push(self.decode(child, depth + 1)?);
        }
        self.nodes[key].children = children;
        Ok(key)
    }

    /// Map a leaf's triangles to pool ids
    ///
    /// The k-th occurrence of a value within one leaf maps to the k-th pooled
    /// copy, so genuinely duplicated mesh triangles stay distinct.
    fn pool_leaf(&mut self, records: &[TriangleRecord]) -> Option<Vec<TriangleId>> {
        let mut occurrences: HashMap<[u32; 9], usize> = HashMap::new();
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            if !record.is_finite() {
                return None;
            }
            let bits = record.bits();
            let occurrence = occurrences.entry(bits).or_insert(0);
            let copies = self.pooled.entry(bits).or_default();

            let id = if let Some(&id) = copies.get(*occurrence) {
                id
            } else {
                let id = TriangleId(self.triangles.len());
                self.triangles.push((*record).into());
                copies.push(id);
                id
            };
            *occurrence += 1;
            ids.push(id);
        }
        Some(ids)
    }
}
