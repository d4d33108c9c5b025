//! Memoization of functions through the persistent cache
//!
//! ```no_run
//! use std::time::Duration;
//! use persistcache::memoize::memoize1;
//!
//! fn square(x: i64) -> i64 {
//!     x * x
//! }
//!
//! let cached_square = memoize1("square", Duration::from_secs(5), square);
//! assert_eq!(cached_square(4), 16);
//! ```

mod key;
mod wrap;

pub use key::{CacheArgs, KeyBuilder};
pub use wrap::{
    invalidate_cache, memoize0, memoize1, memoize2, memoize3, memoize4, memoize5, memoize6,
    memoize7, memoize8, memoize9, memoize_n, FunctionId, Memoizer,
};
