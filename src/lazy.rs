//! A generic "produce once, validate on change" cache.
//!
//! The cache is split into two collaborating values: a capability (the
//! producer/validity pair, owned by the client) and the plain cache state
//! ([`LazyCache`], an optional derived value). `validate` never mutates a
//! populated cache in place; it either returns the same cache (shared
//! slot) or a fresh empty one, so anyone still holding the old instance
//! keeps its value.

use std::sync::{Arc, OnceLock};

use crate::error::GlazeResult;

/// The producer/validity pair of one derived value.
///
/// `is_still_valid` must be cheaper than `produce`: it answers "would the
/// value produced from `old` still be correct for `new`", without
/// recomputing it. Stating it that way is what lets a caller skip
/// production entirely on cycles where nothing relevant changed.
pub trait CacheCapability<S, C> {
    type Value;

    fn produce(&self, state: &S, ctx: &C) -> GlazeResult<Self::Value>;

    fn is_still_valid(&self, old: &S, new: &S, ctx: &C) -> bool;
}

/// A single-slot cache for one derived value.
///
/// Clones share the slot, so a `validate` that returns `self` hands every
/// holder the same already-produced value.
#[derive(Debug)]
pub struct LazyCache<T> {
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T> Clone for LazyCache<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for LazyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyCache<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }

    pub fn is_produced(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The stored value, if one has been produced.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    /// Decides whether the stored value survives the `old -> new` state
    /// transition. An empty cache has nothing to invalidate and is
    /// returned as-is; a stale one is *replaced* by a fresh empty cache
    /// rather than cleared, so other holders keep the stale-but-consistent
    /// value they produced it for.
    #[must_use]
    pub fn validate<S, C>(
        &self,
        capability: &impl CacheCapability<S, C, Value = T>,
        old: &S,
        new: &S,
        ctx: &C,
    ) -> Self {
        if !self.is_produced() {
            return self.clone();
        }
        if capability.is_still_valid(old, new, ctx) {
            return self.clone();
        }
        Self::new()
    }

    /// Returns the derived value for `state`, producing it on first use.
    ///
    /// A failing producer is logged and reported as `None`; the caller
    /// decides the fallback. A later call may retry production.
    pub fn get_for<S, C>(
        &self,
        capability: &impl CacheCapability<S, C, Value = T>,
        state: &S,
        ctx: &C,
    ) -> Option<Arc<T>> {
        if let Some(value) = self.slot.get() {
            return Some(value.clone());
        }
        match capability.produce(state, ctx) {
            Ok(value) => {
                // A concurrent producer may have won the race; the slot
                // keeps whichever value landed first.
                let _ = self.slot.set(Arc::new(value));
                self.slot.get().cloned()
            }
            Err(error) => {
                tracing::warn!(%error, "derived value production failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlazeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Doubler {
        produced: AtomicUsize,
    }

    impl CacheCapability<u32, ()> for Doubler {
        type Value = u32;

        fn produce(&self, state: &u32, _ctx: &()) -> GlazeResult<u32> {
            self.produced.fetch_add(1, Ordering::SeqCst);
            Ok(state * 2)
        }

        fn is_still_valid(&self, old: &u32, new: &u32, _ctx: &()) -> bool {
            old == new
        }
    }

    #[test]
    fn produces_exactly_once_per_slot() {
        let cap = Doubler {
            produced: AtomicUsize::new(0),
        };
        let cache = LazyCache::new();
        for _ in 0..5 {
            assert_eq!(cache.get_for(&cap, &21, &()).as_deref(), Some(&42));
        }
        assert_eq!(cap.produced.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validate_keeps_slot_when_predicate_holds() {
        let cap = Doubler {
            produced: AtomicUsize::new(0),
        };
        let cache = LazyCache::new();
        let first = cache.get_for(&cap, &3, &()).unwrap();
        let validated = cache.validate(&cap, &3, &3, &());
        let second = validated.get_for(&cap, &3, &()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cap.produced.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validate_replaces_slot_when_predicate_fails() {
        let cap = Doubler {
            produced: AtomicUsize::new(0),
        };
        let cache = LazyCache::new();
        let stale = cache.get_for(&cap, &3, &()).unwrap();
        let validated = cache.validate(&cap, &3, &4, &());
        assert!(!validated.is_produced());
        // The old holder still sees its value.
        assert_eq!(cache.peek().as_deref(), Some(&*stale));
        assert_eq!(validated.get_for(&cap, &4, &()).as_deref(), Some(&8));
        assert_eq!(cap.produced.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_cache_survives_validate_unchanged() {
        let cap = Doubler {
            produced: AtomicUsize::new(0),
        };
        let cache: LazyCache<u32> = LazyCache::new();
        let validated = cache.validate(&cap, &1, &2, &());
        assert!(Arc::ptr_eq(&cache.slot, &validated.slot));
    }

    struct Failing;

    impl CacheCapability<u32, ()> for Failing {
        type Value = u32;

        fn produce(&self, _state: &u32, _ctx: &()) -> GlazeResult<u32> {
            Err(GlazeError::render("cannot derive"))
        }

        fn is_still_valid(&self, _old: &u32, _new: &u32, _ctx: &()) -> bool {
            true
        }
    }

    #[test]
    fn producer_failure_is_neutralized() {
        let cache = LazyCache::new();
        assert_eq!(cache.get_for(&Failing, &1, &()), None);
        assert!(!cache.is_produced());
    }
}
