//! persistcache
//!
//! Persistent memoization: wrap a function so results computed for a given
//! argument list are stored in SQLite and reused, across process restarts,
//! until their TTL runs out.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod memoize;

pub use cache::{init, CacheEngine};
pub use config::CacheConfig;
pub use error::CacheError;
pub use memoize::{
    invalidate_cache, memoize0, memoize1, memoize2, memoize3, memoize4, memoize5, memoize6,
    memoize7, memoize8, memoize9, memoize_n, FunctionId, Memoizer,
};
