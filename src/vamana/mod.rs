//! Streaming Vamana graph index.
//!
//! A directed proximity graph in the style of DiskANN's Vamana
//! construction, maintained incrementally: `insert` wires a new node in via
//! greedy search plus α-RNG pruning, `update` re-wires an existing node
//! around its replacement vector, and `remove` patches the hole a deletion
//! leaves (IP-DiskANN style) instead of rebuilding. A streaming centroid
//! keeps the search entry point close to the data medoid as the set drifts.
//!
//! # Algorithm
//!
//! - Insert: greedy-search seed -> robust prune -> back-edge patch.
//! - Remove: local search around the victim -> approximate in-neighbors ->
//!   patch in- and out-edges with the closest live alternates -> tombstone
//!   and physical erase. Tombstones stay traversable (but never surface in
//!   results) until [`VamanaIndex::batch_delete`] sweeps them out of the
//!   surviving neighbor lists.
//!
//! # Thread-safety contract
//!
//! Concurrent readers are safe against a stable graph: the search path
//! touches only the node map read-only, the tombstone set read-only, the
//! atomic entry point (relaxed), and per-thread scratch. Writers require
//! external exclusion, against each other and against readers.
//!
//! # References
//!
//! - Subramanya et al. (2019): "DiskANN: Fast Accurate Billion-point
//!   Nearest Neighbor Search on a Single Node"
//! - Xu et al. (2025): "In-Place Updates of a Graph Index for Streaming
//!   Approximate Nearest Neighbor Search" - <https://arxiv.org/abs/2502.13826>

mod prune;
mod search;

pub use search::{Candidate, SearchFilter};

use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::distance::DistanceMetric;
use crate::error::{IndexError, Result};
use crate::medoid::StreamingMedoid;

/// Neighbor list storage. Inline capacity covers typical degree bounds
/// without a heap allocation per node.
pub type NeighborList = SmallVec<[u32; 32]>;

// In-place deletion constants: beam width and kept candidates for the local
// search around the victim, and edges copied per patched anchor.
const DELETE_BEAM_WIDTH: usize = 128;
const DELETE_CANDIDATES: usize = 50;
const DELETE_PATCH_FANOUT: usize = 3;

/// Alpha used when a patched neighbor list overflows and must be re-pruned.
pub(crate) const PATCH_ALPHA: f32 = 1.2;

// Small search used to re-seat the entry point near the centroid.
const ENTRY_REPAIR_BEAM: usize = 64;

/// Remove duplicate ids, keeping first occurrences in order.
pub(crate) fn dedup_neighbors(list: &mut NeighborList) {
    let mut seen: HashSet<u32> = HashSet::with_capacity(list.len());
    list.retain(|id| seen.insert(*id));
}

/// A graph node: its vector and out-neighbor ids.
///
/// The neighbor list is semantically unordered, duplicate-free, never
/// contains the owning id, and holds at most `max_degree` entries.
#[derive(Debug, Clone, Default)]
pub struct VamanaNode {
    pub vector: Vec<f32>,
    pub neighbors: NeighborList,
}

impl VamanaNode {
    fn with_vector(vector: Vec<f32>) -> Self {
        Self {
            vector,
            neighbors: NeighborList::new(),
        }
    }
}

/// Construction parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VamanaParams {
    /// Maximum out-degree per node (R).
    pub max_degree: usize,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Mutations between entry-point recomputes; 0 selects the default
    /// interval of 10 000.
    pub recompute_interval: u64,
}

impl Default for VamanaParams {
    fn default() -> Self {
        Self {
            max_degree: 32,
            metric: DistanceMetric::L2,
            recompute_interval: 0,
        }
    }
}

/// Index statistics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VamanaStats {
    pub live_nodes: usize,
    pub tombstones: usize,
    pub avg_out_degree: f32,
}

/// A queued mutation, replayed in order by [`VamanaIndex::apply_ops`].
///
/// Each variant maps onto the method of the same name and inherits its
/// semantics: an `Update` against a missing or tombstoned id and a
/// `Remove` of an absent id fall through as no-ops.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexOp {
    Insert { id: u32, vector: Vec<f32> },
    Update { id: u32, vector: Vec<f32> },
    Remove { id: u32 },
}

/// In-memory streaming Vamana index over fixed-dimension `f32` vectors
/// keyed by `u32` ids.
///
/// Ids are assigned by the caller and assumed unique; tombstoned ids are
/// not recycled. See the module docs for the thread-safety contract.
pub struct VamanaIndex {
    dims: usize,
    params: VamanaParams,

    /// Membership here is the source of truth for "live".
    node_map: HashMap<u32, VamanaNode>,

    /// Logically deleted ids, swept by [`Self::batch_delete`]. Also used by
    /// search to keep pending deletions out of results.
    delete_list: HashSet<u32>,

    /// Seed of every greedy search. Readers load relaxed; a stale value
    /// costs recall, never correctness.
    start_node: AtomicU32,

    medoid_tracker: StreamingMedoid,
}

impl VamanaIndex {
    /// Create an empty index for `dims`-dimensional vectors.
    pub fn new(dims: usize, params: VamanaParams) -> Result<Self> {
        if dims == 0 {
            return Err(IndexError::InvalidParameter(
                "dims must be non-zero".to_string(),
            ));
        }
        if params.max_degree == 0 {
            return Err(IndexError::InvalidParameter(
                "max_degree must be non-zero".to_string(),
            ));
        }

        let medoid_tracker = StreamingMedoid::new(dims, params.recompute_interval);
        Ok(Self {
            dims,
            params,
            node_map: HashMap::new(),
            delete_list: HashSet::new(),
            start_node: AtomicU32::new(0),
            medoid_tracker,
        })
    }

    /// Insert a vector under a fresh id.
    ///
    /// `l` is the construction beam width, `alpha` the pruning relaxation
    /// (typically 1.2). Re-inserting an existing id keeps the stored vector
    /// and only re-wires edges; callers must not rely on this.
    pub fn insert(&mut self, id: u32, vector: Vec<f32>, l: usize, alpha: f32) {
        debug_assert_eq!(vector.len(), self.dims);

        let was_empty = self.node_map.is_empty();
        self.node_map
            .entry(id)
            .or_insert_with(|| VamanaNode::with_vector(vector.clone()));

        if was_empty {
            // First node seeds every future search.
            self.start_node.store(id, Ordering::Relaxed);
        }

        self.try_medoid_compute(&vector);

        let start = self.start_node.load(Ordering::Relaxed);
        let mut nearest = self.greedy_search(start, &vector, l, l, None);
        self.robust_prune(id, &mut nearest, alpha);
        self.update_neighbors(id, &vector, alpha);
    }

    /// Replace the vector of an existing node and re-wire its edges.
    ///
    /// No-op when the id is absent or tombstoned. The medoid tracker is not
    /// adjusted: the running sum keeps the original vector's contribution,
    /// matching the insert/remove accounting. The drift this allows in the
    /// streaming centroid is bounded and tolerated.
    pub fn update(&mut self, id: u32, new_vector: Vec<f32>, l: usize, alpha: f32) {
        debug_assert_eq!(new_vector.len(), self.dims);

        if self.delete_list.contains(&id) {
            return;
        }
        let Some(node) = self.node_map.get_mut(&id) else {
            return;
        };
        node.vector.clear();
        node.vector.extend_from_slice(&new_vector);

        let start = self.start_node.load(Ordering::Relaxed);
        let mut nearest = self.greedy_search(start, &new_vector, l, l, None);
        self.robust_prune(id, &mut nearest, alpha);
        self.update_neighbors(id, &new_vector, alpha);
    }

    /// Remove a node in place, patching the edges around it.
    ///
    /// The victim's approximate in-neighbors and its out-neighbors are
    /// re-homed onto the closest live alternates found by a local search,
    /// so the graph stays navigable without a rebuild. The id is
    /// tombstoned until [`Self::batch_delete`] runs. Removing an absent id
    /// is a no-op, which also makes remove idempotent.
    pub fn remove(&mut self, id: u32) {
        let Some(victim) = self.node_map.get(&id) else {
            return;
        };
        let victim_vec = victim.vector.clone();
        let victim_out: NeighborList = victim.neighbors.clone();

        // Local neighborhood around the victim.
        let start = self.start_node.load(Ordering::Relaxed);
        let sr = self.greedy_search(
            start,
            &victim_vec,
            DELETE_CANDIDATES,
            DELETE_BEAM_WIDTH,
            None,
        );

        // Approximate in-neighbors: anyone nearby that links to the victim.
        let mut approx_in: Vec<u32> = Vec::new();
        for nn in &sr {
            if let Some(node) = self.node_map.get(&nn.id) {
                if node.neighbors.contains(&id) {
                    approx_in.push(nn.id);
                }
            }
        }

        // Isolated node: nothing to patch.
        if approx_in.is_empty() && victim_out.is_empty() {
            self.medoid_tracker.sub(&victim_vec);
            self.delete_list.insert(id);
            self.node_map.remove(&id);
            if self.start_node.load(Ordering::Relaxed) == id {
                if let Some(&next) = self.node_map.keys().next() {
                    self.start_node.store(next, Ordering::Relaxed);
                }
            }
            return;
        }

        // Re-home edges that point at the victim.
        for &z in &approx_in {
            if !self.node_map.contains_key(&z) {
                continue;
            }
            let alternates = self.closest_alternates(z, id, &sr);
            self.patch_edges(z, &alternates);
        }

        // Re-home the victim's out-edges: each former target gains the
        // victim's role for the alternates closest to it.
        for &w in &victim_out {
            if !self.node_map.contains_key(&w) {
                continue;
            }
            let alternates = self.closest_alternates(w, id, &sr);
            for &y in &alternates {
                if y == w || !self.node_map.contains_key(&y) {
                    continue;
                }
                self.patch_edges(y, &[w]);
            }
        }

        // Sum first, then tombstone, then physical erase.
        self.medoid_tracker.sub(&victim_vec);
        self.delete_list.insert(id);
        self.node_map.remove(&id);

        // Keep the entry point live.
        if self.start_node.load(Ordering::Relaxed) == id && !self.node_map.is_empty() {
            let centroid = self.medoid_tracker.centroid();
            if let Some(&seed) = self.node_map.keys().next() {
                let res = self.greedy_search(seed, &centroid, 1, ENTRY_REPAIR_BEAM, None);
                match res.first() {
                    Some(best) => self.start_node.store(best.id, Ordering::Relaxed),
                    None => self.start_node.store(seed, Ordering::Relaxed),
                }
            }
        }
    }

    /// Sweep tombstoned ids out of every live neighbor list and clear the
    /// tombstone set.
    ///
    /// Must not run concurrently with any other operation.
    pub fn batch_delete(&mut self) {
        if self.delete_list.is_empty() {
            return;
        }

        for node in self.node_map.values_mut() {
            node.neighbors.retain(|id| !self.delete_list.contains(id));
        }

        self.delete_list.clear();
    }

    /// Replay queued mutations in order, sharing one beam width and alpha
    /// across the whole pass.
    ///
    /// Returns the number of operations that actually mutated the graph;
    /// updates and removals that targeted dead ids are skipped and not
    /// counted.
    pub fn apply_ops(
        &mut self,
        ops: impl IntoIterator<Item = IndexOp>,
        l: usize,
        alpha: f32,
    ) -> usize {
        let mut applied = 0;
        for op in ops {
            match op {
                IndexOp::Insert { id, vector } => {
                    self.insert(id, vector, l, alpha);
                    applied += 1;
                }
                IndexOp::Update { id, vector } => {
                    if self.node_map.contains_key(&id) && !self.delete_list.contains(&id) {
                        self.update(id, vector, l, alpha);
                        applied += 1;
                    }
                }
                IndexOp::Remove { id } => {
                    if self.node_map.contains_key(&id) {
                        self.remove(id);
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    /// Fold a new vector into the centroid tracker and re-seat the entry
    /// point when the recompute countdown fires.
    fn try_medoid_compute(&mut self, point: &[f32]) {
        self.medoid_tracker.add(point);

        if self.medoid_tracker.should_recompute() {
            let centroid = self.medoid_tracker.centroid();
            let start = self.start_node.load(Ordering::Relaxed);
            let res = self.greedy_search(start, &centroid, 1, ENTRY_REPAIR_BEAM, None);
            if let Some(best) = res.first() {
                self.start_node.store(best.id, Ordering::Relaxed);
            }
        }
    }

    /// The live candidates from `pool` closest to `anchor`, excluding
    /// `skip`, capped at the patch fanout.
    fn closest_alternates(&self, anchor: u32, skip: u32, pool: &[Candidate]) -> SmallVec<[u32; 4]> {
        let mut out = SmallVec::new();
        let Some(anchor_node) = self.node_map.get(&anchor) else {
            return out;
        };

        let mut scored: Vec<(f32, u32)> = Vec::with_capacity(pool.len());
        for cand in pool {
            if cand.id == skip {
                continue;
            }
            let Some(node) = self.node_map.get(&cand.id) else {
                continue;
            };
            scored.push((
                self.params.metric.compute(&anchor_node.vector, &node.vector),
                cand.id,
            ));
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        out.extend(
            scored
                .into_iter()
                .take(DELETE_PATCH_FANOUT)
                .map(|(_, id)| id),
        );
        out
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The underlying id-to-node map.
    #[must_use]
    pub fn node_map(&self) -> &HashMap<u32, VamanaNode> {
        &self.node_map
    }

    /// Clone of the node for `id`; an empty node when the id is missing or
    /// tombstoned.
    #[must_use]
    pub fn get_node(&self, id: u32) -> VamanaNode {
        if self.delete_list.contains(&id) {
            return VamanaNode::default();
        }
        self.node_map.get(&id).cloned().unwrap_or_default()
    }

    /// Current search entry point.
    #[must_use]
    pub fn start_node(&self) -> u32 {
        self.start_node.load(Ordering::Relaxed)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// True when the index holds no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Vector dimensionality fixed at construction.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Degree bound (R).
    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.params.max_degree
    }

    /// Configured distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.params.metric
    }

    /// Centroid tracker feeding the entry-point controller.
    #[must_use]
    pub fn medoid_tracker(&self) -> &StreamingMedoid {
        &self.medoid_tracker
    }

    /// Check structural invariants: no node may carry a duplicate neighbor
    /// or exceed the degree bound.
    #[must_use]
    pub fn validate_graph(&self) -> bool {
        for node in self.node_map.values() {
            if node.neighbors.len() > self.params.max_degree {
                return false;
            }
            let mut seen: HashSet<u32> = HashSet::with_capacity(node.neighbors.len());
            for &neighbor in &node.neighbors {
                if !seen.insert(neighbor) {
                    return false;
                }
            }
        }
        true
    }

    /// Snapshot of index statistics.
    #[must_use]
    pub fn stats(&self) -> VamanaStats {
        let live = self.node_map.len();
        let total_degree: usize = self.node_map.values().map(|n| n.neighbors.len()).sum();
        VamanaStats {
            live_nodes: live,
            tombstones: self.delete_list.len(),
            avg_out_degree: if live > 0 {
                total_degree as f32 / live as f32
            } else {
                0.0
            },
        }
    }
}
