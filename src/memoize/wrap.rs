//! Memoization wrappers
//!
//! [`Memoizer::call`] is the whole protocol: derive the argument key, return
//! the cached value on a hit, otherwise run the function, store its result and
//! return it. The `wrapN`/`memoizeN` adapters only pack a call's arguments
//! into a tuple so closures of each arity keep their own signature.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{self, CacheEngine, Codec, JsonCodec};
use crate::memoize::key::CacheArgs;

/// Identifies a memoized function in the store
///
/// Use an explicit name that stays the same across builds. [`FunctionId::of_val`]
/// derives one from the function's type name instead; that name can change
/// between compiler versions, and every closure defined in the same function
/// gets the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId(Cow<'static, str>);

impl FunctionId {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Derives an identifier from the type name of `f`, e.g. `my_crate::square`
    pub fn of_val<F: ?Sized>(_f: &F) -> Self {
        Self(Cow::Borrowed(type_name::<F>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for FunctionId {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for FunctionId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&FunctionId> for FunctionId {
    fn from(id: &FunctionId) -> Self {
        id.clone()
    }
}

/// Binds a function identifier and TTL to a cache engine
pub struct Memoizer<C: Codec = JsonCodec> {
    function: FunctionId,
    ttl: Duration,
    engine: Arc<CacheEngine<C>>,
}

impl Memoizer {
    /// Uses the process-wide engine, creating it if needed.
    ///
    /// # Panics
    ///
    /// Panics if the process-wide engine has to be created and its store
    /// cannot be opened. See [`cache::global`].
    pub fn new(function: impl Into<FunctionId>, ttl: Duration) -> Self {
        Self::with_engine(function, ttl, cache::global())
    }
}

impl<C: Codec> Memoizer<C> {
    /// Uses a specific engine instead of the process-wide one
    pub fn with_engine(
        function: impl Into<FunctionId>,
        ttl: Duration,
        engine: Arc<CacheEngine<C>>,
    ) -> Self {
        Self {
            function: function.into(),
            ttl,
            engine,
        }
    }

    /// Returns the cached result for `args`, or runs `compute(args)` and caches its result.
    ///
    /// `compute` runs exactly once on a miss and never on a hit. If the
    /// arguments cannot be rendered into a key the call is not cached at all.
    /// Concurrent misses on the same key each run `compute`.
    pub fn call<A, R, F>(&self, args: A, compute: F) -> R
    where
        A: CacheArgs,
        R: Serialize + DeserializeOwned,
        F: FnOnce(A) -> R,
    {
        let function = self.function.as_str();
        let key = match args.cache_key() {
            Ok(key) => key,
            Err(e) => {
                debug!(function, error = %e, "Uncacheable arguments");
                return compute(args);
            }
        };

        if let Some(value) = self.engine.get::<R>(function, &key, self.ttl) {
            debug!(function, key = %key, "Cache hit");
            return value;
        }

        debug!(function, key = %key, "Cache miss");
        let result = compute(args);
        self.engine.set(function, &key, &result);
        result
    }

    /// Drops every cached result of this function
    pub fn invalidate(&self) {
        self.engine.invalidate(self.function.as_str());
    }

    /// Wraps a function taking its arguments as a slice of JSON values
    ///
    /// Calls with different argument counts never share an entry.
    pub fn wrap_n<R, Func>(self, f: Func) -> impl Fn(&[Value]) -> R
    where
        R: Serialize + DeserializeOwned,
        Func: Fn(&[Value]) -> R,
    {
        move |args: &[Value]| self.call(args, |args| f(args))
    }
}

macro_rules! memoize_arity {
    ($wrap:ident, $memoize:ident, $arity:literal $(, $arg:ident: $ty:ident)*) => {
        impl<C: Codec> Memoizer<C> {
            #[doc = concat!("Wraps a function of ", $arity, " argument(s) with the same signature")]
            pub fn $wrap<$($ty,)* R, Func>(self, f: Func) -> impl Fn($($ty),*) -> R
            where
                $($ty: Serialize,)*
                R: Serialize + DeserializeOwned,
                Func: Fn($($ty),*) -> R,
            {
                move |$($arg: $ty),*| self.call(($($arg,)*), |($($arg,)*)| f($($arg),*))
            }
        }

        #[doc = concat!("Memoizes a function of ", $arity, " argument(s) in the global cache")]
        pub fn $memoize<$($ty,)* R, Func>(
            function: impl Into<FunctionId>,
            ttl: Duration,
            f: Func,
        ) -> impl Fn($($ty),*) -> R
        where
            $($ty: Serialize,)*
            R: Serialize + DeserializeOwned,
            Func: Fn($($ty),*) -> R,
        {
            Memoizer::new(function, ttl).$wrap(f)
        }
    };
}

memoize_arity!(wrap0, memoize0, 0);
memoize_arity!(wrap1, memoize1, 1, a1: T1);
memoize_arity!(wrap2, memoize2, 2, a1: T1, a2: T2);
memoize_arity!(wrap3, memoize3, 3, a1: T1, a2: T2, a3: T3);
memoize_arity!(wrap4, memoize4, 4, a1: T1, a2: T2, a3: T3, a4: T4);
memoize_arity!(wrap5, memoize5, 5, a1: T1, a2: T2, a3: T3, a4: T4, a5: T5);
memoize_arity!(wrap6, memoize6, 6, a1: T1, a2: T2, a3: T3, a4: T4, a5: T5, a6: T6);
memoize_arity!(wrap7, memoize7, 7, a1: T1, a2: T2, a3: T3, a4: T4, a5: T5, a6: T6, a7: T7);
memoize_arity!(wrap8, memoize8, 8, a1: T1, a2: T2, a3: T3, a4: T4, a5: T5, a6: T6, a7: T7, a8: T8);
memoize_arity!(
    wrap9, memoize9, 9,
    a1: T1, a2: T2, a3: T3, a4: T4, a5: T5, a6: T6, a7: T7, a8: T8, a9: T9
);

/// Memoizes a function taking a slice of JSON values in the process-wide cache
pub fn memoize_n<R, Func>(
    function: impl Into<FunctionId>,
    ttl: Duration,
    f: Func,
) -> impl Fn(&[Value]) -> R
where
    R: Serialize + DeserializeOwned,
    Func: Fn(&[Value]) -> R,
{
    Memoizer::new(function, ttl).wrap_n(f)
}

/// Removes every entry of `function` from the process-wide cache
pub fn invalidate_cache(function: impl Into<FunctionId>) {
    let function = function.into();
    cache::global().invalidate(function.as_str());
}
