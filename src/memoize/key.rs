//! Argument key derivation
//!
//! A key is the argument count followed by one segment per argument:
//!
//! ```text
//! 2|i32:1:2|i32:1:3
//! ```
//!
//! Each segment is `<type tag>:<byte length>:<JSON rendering>`. The length
//! prefix means an argument containing `|` can never be mistaken for two
//! arguments, and the count keeps `f()` apart from `f(1)`. Keys are persisted,
//! so the rendering must not depend on anything but the argument values and
//! their types: map entries are sorted by key, and arguments holding NaN or
//! infinite floats have no key at all, so calls with them run uncached.
//! Sequences keep their iteration order, so pass a `BTreeSet` rather than a
//! `HashSet` when set arguments should share entries.

use std::any::type_name;

use serde::Serialize;
use serde_json::Value;

use crate::cache::check_finite;
use crate::error::CacheError;

/// Argument lists that can be turned into a cache key
///
/// Implemented for tuples of up to nine `Serialize` values and for slices of
/// `serde_json::Value` (the dynamic, any-arity form).
pub trait CacheArgs {
    fn cache_key(&self) -> Result<String, CacheError>;
}

/// Accumulates tagged argument segments in call order
#[derive(Debug, Default)]
pub struct KeyBuilder {
    segments: Vec<String>,
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a typed argument, tagged with its Rust type name.
    ///
    /// The value goes through `serde_json::Value` first so map entries are
    /// rendered in sorted key order rather than iteration order. Arguments
    /// holding NaN or infinite floats are rejected.
    pub fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CacheError> {
        check_finite(value).map_err(|e| CacheError::Key(e.to_string()))?;
        let canonical = serde_json::to_value(value).map_err(|e| CacheError::Key(e.to_string()))?;
        self.push_tagged(type_name::<T>(), &canonical.to_string());
        Ok(())
    }

    /// Adds a dynamic argument, tagged with its JSON kind
    pub fn push_value(&mut self, value: &Value) {
        self.push_tagged(value_tag(value), &value.to_string());
    }

    fn push_tagged(&mut self, tag: &str, rendered: &str) {
        self.segments.push(format!("{tag}:{}:{rendered}", rendered.len()));
    }

    pub fn finish(self) -> String {
        format!("{}|{}", self.segments.len(), self.segments.join("|"))
    }
}

fn value_tag(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() => "int",
        Value::Number(n) if n.is_u64() => "uint",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

macro_rules! impl_cache_args {
    ($($arg:ident),*) => {
        impl<$($arg: Serialize),*> CacheArgs for ($($arg,)*) {
            #[allow(non_snake_case, unused_mut)]
            fn cache_key(&self) -> Result<String, CacheError> {
                let ($($arg,)*) = self;
                let mut key = KeyBuilder::new();
                $(key.push($arg)?;)*
                Ok(key.finish())
            }
        }
    };
}

impl_cache_args!();
impl_cache_args!(A);
impl_cache_args!(A, B);
impl_cache_args!(A, B, C);
impl_cache_args!(A, B, C, D);
impl_cache_args!(A, B, C, D, E);
impl_cache_args!(A, B, C, D, E, F);
impl_cache_args!(A, B, C, D, E, F, G);
impl_cache_args!(A, B, C, D, E, F, G, H);
impl_cache_args!(A, B, C, D, E, F, G, H, I);

impl<T: CacheArgs + ?Sized> CacheArgs for &T {
    fn cache_key(&self) -> Result<String, CacheError> {
        (**self).cache_key()
    }
}

impl CacheArgs for [Value] {
    fn cache_key(&self) -> Result<String, CacheError> {
        let mut key = KeyBuilder::new();
        for value in self {
            key.push_value(value);
        }
        Ok(key.finish())
    }
}
