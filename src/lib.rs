//! Unicost Set Cover Problem (USCP) solver

// useful additional warnings if docs are missing, or crates imported but unused, etc.
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_code)]
#![warn(unused_extern_crates)]
#![warn(variant_size_differences)]

// not sure if already by default in clippy
#![warn(clippy::similar_names)]
#![warn(clippy::shadow_unrelated)]
#![warn(clippy::shadow_same)]
#![warn(clippy::shadow_reuse)]

/// fixed-length bitset used for subset coverage and selections
pub mod bitset;

/// error kinds shared by the readers and the algorithms
pub mod error;

/// problem instance model and random instance generation
pub mod instance;

/// solution model, serialization and reduction expansion
pub mod solution;

/// dominated row/column instance reduction
pub mod reduction;

/// read/write the OR-Library formats (standard and rail)
pub mod orlibrary;

/// read the Steiner triple systems (STS) format
pub mod sts;

/// registry of known benchmark instances
pub mod instances;

/// greedy constructors (deterministic, randomized, restricted)
pub mod greedy;

/// Row Weighting Local Search (RWLS) improvement engine
pub mod rwls;

/// crossover operators combining two parent solutions
pub mod crossover;

/// crossover operators combining two RWLS weight vectors
pub mod wcrossover;

/// memetic algorithm driver
pub mod memetic;
