//! proxima: streaming in-memory Vamana graph index for approximate
//! nearest neighbor search.
//!
//! Stores fixed-dimension `f32` vectors keyed by `u32` ids in a directed
//! proximity graph (the Vamana construction used by DiskANN) and supports
//! four operations: insert, update, in-place remove, and greedy beam
//! search with optional result filtering. A streaming centroid keeps the
//! search entry point close to the data medoid as the set evolves, so the
//! index never needs a rebuild under churn.
//!
//! # Which knobs matter?
//!
//! | Parameter | Effect |
//! |-----------|--------|
//! | `max_degree` (R) | Out-edges per node. More edges, better recall, more memory. |
//! | `l` (beam width) | Results retained during search. Larger L, better recall, more work. |
//! | `alpha` | Pruning relaxation. 1.0 keeps only strict RNG edges; 1.2 adds long-range shortcuts. |
//!
//! # Usage
//!
//! ```rust
//! use proxima::{VamanaIndex, VamanaParams};
//!
//! let params = VamanaParams { max_degree: 8, ..VamanaParams::default() };
//! let mut index = VamanaIndex::new(3, params).unwrap();
//!
//! index.insert(0, vec![0.0, 0.0, 0.0], 32, 1.2);
//! index.insert(1, vec![1.0, 0.0, 0.0], 32, 1.2);
//!
//! let hits = index.search(&[0.1, 0.0, 0.0], 1, 16);
//! assert_eq!(hits[0].id, 0);
//! ```
//!
//! # Concurrency
//!
//! Readers are safe against a stable graph and against each other: the
//! search path uses thread-local scratch, a thread-local visited-set pool,
//! and a relaxed atomic entry point. Writers need external exclusion (a
//! single writer lock or an RwLock pattern). See [`vamana`] for the full
//! contract.
//!
//! Nothing here performs I/O, logs, or retries; errors at the operation
//! level are expressed as absence (empty results, no-ops).

pub mod distance;
pub mod error;
pub mod medoid;
pub mod simd;
pub mod vamana;
pub mod visited;

pub use distance::DistanceMetric;
pub use error::{IndexError, Result};
pub use vamana::{
    Candidate, IndexOp, SearchFilter, VamanaIndex, VamanaNode, VamanaParams, VamanaStats,
};
