//! Persistent cache engine
//!
//! This module stores encoded function results in a SQLite table keyed by a
//! function identifier and an argument key. Entries expire `ttl` after they were
//! written; expiry is checked when an entry is read, and expired rows are
//! deleted at that point. There is no background sweep.

mod codec;
mod engine;
mod finite;
mod store;

pub use codec::{Codec, JsonCodec};
pub use engine::{global, init, CacheEngine};
pub(crate) use finite::check_finite;
pub use store::{RecordStore, SqliteStore, StoredRecord};
