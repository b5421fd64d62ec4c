//! Bounded lazy cache for derived artifacts such as built proof paths.
//!
//! Entries are evicted least-recently-used once capacity is reached and are
//! recomputed on demand; the cache is never needed for correctness.

pub mod error;
pub mod lazy;

pub use error::{CacheError, CacheResult};
pub use lazy::{CacheStats, LazyCache};
