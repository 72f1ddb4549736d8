//! Greedy beam search over the Vamana graph.
//!
//! Best-first traversal with two bounded priority queues: a min-heap
//! frontier of candidates to expand and a max-heap of the `L` best results
//! seen so far. Once the result heap is full, its worst distance becomes the
//! pruning radius and the loop terminates as soon as the frontier can no
//! longer improve on it.
//!
//! Both heaps live in thread-local scratch and are reset, not reallocated,
//! between calls; the visited set comes from the thread-local pool in
//! [`crate::visited`]. The read path therefore performs no heap allocation
//! once a thread is warm.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::Ordering;

use super::VamanaIndex;
use crate::visited;

/// How many neighbor positions ahead to prefetch vectors during expansion.
const PREFETCH_DISTANCE: usize = 4;

/// A scored node produced by search and consumed by pruning.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub id: u32,
    pub dist: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: larger distance = higher priority (for result eviction).
        // total_cmp gives IEEE 754 total ordering (NaN-safe).
        self.dist.total_cmp(&other.dist)
    }
}

/// Per-query result filter.
///
/// Applied to results only, never to traversal, so the search can still
/// route through nodes the filter rejects. Must be callable from the search
/// thread without external locking. Closures `Fn(u32) -> bool` implement
/// this automatically.
pub trait SearchFilter {
    fn accept(&self, id: u32) -> bool;
}

impl<F: Fn(u32) -> bool> SearchFilter for F {
    fn accept(&self, id: u32) -> bool {
        self(id)
    }
}

#[derive(Default)]
struct HeapScratch {
    frontier: BinaryHeap<Reverse<Candidate>>,
    results: BinaryHeap<Candidate>,
}

thread_local! {
    static SCRATCH: RefCell<HeapScratch> = RefCell::new(HeapScratch::default());
}

#[inline(always)]
fn prefetch_vector(v: &[f32]) {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: prefetch is a hint and is sound for any address.
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch::<_MM_HINT_T0>(v.as_ptr().cast());
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = v;
}

impl VamanaIndex {
    /// Greedy beam search from `start` toward `query`.
    ///
    /// Returns the `k` nearest live ids in ascending distance, using beam
    /// width `l` (callers must keep `l >= k`). Tombstoned nodes are
    /// traversed, so a pending deletion cannot disconnect the neighborhood
    /// behind it, but they never appear in results. If `start` is not in
    /// the store the result is empty.
    #[must_use]
    pub fn greedy_search(
        &self,
        start: u32,
        query: &[f32],
        k: usize,
        l: usize,
        filter: Option<&dyn SearchFilter>,
    ) -> Vec<Candidate> {
        debug_assert_eq!(query.len(), self.dims);

        let Some(start_node) = self.node_map.get(&start) else {
            return Vec::new();
        };

        let mut visited = visited::acquire(self.node_map.len());

        let nearest = SCRATCH.with(|scratch| {
            let scratch = &mut *scratch.borrow_mut();
            scratch.frontier.clear();
            scratch.results.clear();

            scratch.frontier.push(Reverse(Candidate {
                id: start,
                dist: self.params.metric.compute(&start_node.vector, query),
            }));
            visited.mark(start);

            let mut radius = f32::INFINITY;

            while let Some(&Reverse(nn)) = scratch.frontier.peek() {
                if nn.dist > radius {
                    // Every remaining candidate is worse than the worst
                    // result we already hold.
                    break;
                }
                scratch.frontier.pop();

                let worst = scratch.results.peek().map_or(f32::INFINITY, |w| w.dist);
                if (scratch.results.len() < l || nn.dist < worst)
                    && !self.delete_list.contains(&nn.id)
                {
                    if filter.map_or(true, |f| f.accept(nn.id)) {
                        scratch.results.push(nn);
                    }
                    if scratch.results.len() > l {
                        scratch.results.pop();
                    }
                    if scratch.results.len() == l {
                        radius = scratch.results.peek().map_or(f32::INFINITY, |w| w.dist);
                    }
                }

                let Some(node) = self.node_map.get(&nn.id) else {
                    continue;
                };

                let ids = &node.neighbors;
                for i in 0..ids.len() {
                    // Pull the vector we will score a few iterations from
                    // now into cache while this one computes.
                    if i + PREFETCH_DISTANCE < ids.len() {
                        if let Some(ahead) = self.node_map.get(&ids[i + PREFETCH_DISTANCE]) {
                            prefetch_vector(&ahead.vector);
                        }
                    }

                    if !visited.mark(ids[i]) {
                        continue;
                    }
                    let Some(neighbor) = self.node_map.get(&ids[i]) else {
                        continue;
                    };
                    scratch.frontier.push(Reverse(Candidate {
                        id: ids[i],
                        dist: self.params.metric.compute(&neighbor.vector, query),
                    }));
                }
            }

            let mut nearest = Vec::with_capacity(scratch.results.len());
            while let Some(c) = scratch.results.pop() {
                nearest.push(c);
            }
            nearest.reverse();
            nearest.truncate(k);
            nearest
        });

        visited::release(visited);
        nearest
    }

    /// Search from the current entry point.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize, l: usize) -> Vec<Candidate> {
        let start = self.start_node.load(Ordering::Relaxed);
        self.greedy_search(start, query, k, l, None)
    }

    /// Search from the current entry point with a result filter.
    #[must_use]
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        l: usize,
        filter: &dyn SearchFilter,
    ) -> Vec<Candidate> {
        let start = self.start_node.load(Ordering::Relaxed);
        self.greedy_search(start, query, k, l, Some(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vamana::VamanaParams;

    fn small_index() -> VamanaIndex {
        let params = VamanaParams {
            max_degree: 4,
            ..VamanaParams::default()
        };
        let mut index = VamanaIndex::new(2, params).expect("valid params");
        index.insert(0, vec![0.0, 0.0], 16, 1.2);
        index.insert(1, vec![1.0, 0.0], 16, 1.2);
        index.insert(2, vec![0.0, 1.0], 16, 1.2);
        index.insert(3, vec![5.0, 5.0], 16, 1.2);
        index
    }

    #[test]
    fn returns_ascending_distances() {
        let index = small_index();
        let hits = index.search(&[0.1, 0.1], 4, 16);

        assert_eq!(hits[0].id, 0);
        for pair in hits.windows(2) {
            assert!(pair[0].dist <= pair[1].dist);
        }
    }

    #[test]
    fn absent_start_yields_empty() {
        let index = small_index();
        let hits = index.greedy_search(999, &[0.0, 0.0], 3, 16, None);
        assert!(hits.is_empty());
    }

    #[test]
    fn beam_smaller_than_store_still_truncates_to_k() {
        let index = small_index();
        let hits = index.search(&[0.0, 0.0], 2, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 0);
    }

    #[test]
    fn filter_applies_to_results_not_traversal() {
        let index = small_index();
        let odd_only = |id: u32| id % 2 == 1;
        let hits = index.search_filtered(&[0.1, 0.1], 4, 16, &odd_only);

        assert!(!hits.is_empty());
        for c in &hits {
            assert_eq!(c.id % 2, 1);
        }
    }

    #[test]
    fn candidate_ordering_is_by_distance() {
        let near = Candidate { id: 7, dist: 0.5 };
        let far = Candidate { id: 3, dist: 2.5 };
        assert!(far > near);
        assert_eq!(near.cmp(&near), std::cmp::Ordering::Equal);
    }
}
