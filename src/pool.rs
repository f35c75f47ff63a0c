//! Process-wide value interning.
//!
//! A [`Pool`] canonicalizes `Arc`-shared immutable values: structurally
//! equal values collapse onto one instance over time, which makes pointer
//! equality a valid *hint* in higher layers. The pool only holds weak
//! references, so it never keeps a value alive on its own.
//!
//! Interning is best-effort: two threads racing on the first insertion of
//! equal values may each keep their own instance until one is dropped.
//! Correctness-sensitive comparisons must therefore always fall back to
//! structural equality.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use crate::box_model::BoxModelConf;
use crate::render_conf::LayerRenderConf;
use crate::style_conf::StyleLayerConf;

/// Dead weak entries across all buckets are swept after this many inserts.
const SWEEP_INTERVAL: usize = 512;

/// A weakly-referenced interning pool for one value type.
pub struct Pool<T> {
    buckets: Mutex<HashMap<u64, Vec<Weak<T>>>>,
    inserts: AtomicUsize,
}

impl<T: Eq + Hash> Pool<T> {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Returns the canonical instance for `value`: an already-pooled equal
    /// value if one is still alive, otherwise `value` itself (now pooled).
    pub fn intern(&self, value: Arc<T>) -> Arc<T> {
        let hash = structural_hash(&*value);
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let bucket = buckets.entry(hash).or_default();
        bucket.retain(|weak| weak.strong_count() > 0);
        for weak in bucket.iter() {
            if let Some(existing) = weak.upgrade()
                && existing == value
            {
                return existing;
            }
        }
        bucket.push(Arc::downgrade(&value));

        if self.inserts.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            buckets.retain(|_, bucket| {
                bucket.retain(|weak| weak.strong_count() > 0);
                !bucket.is_empty()
            });
        }
        value
    }

    /// Number of live entries, dead weak refs excluded.
    pub fn live_len(&self) -> usize {
        let buckets = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        buckets
            .values()
            .map(|b| b.iter().filter(|w| w.strong_count() > 0).count())
            .sum()
    }
}

impl<T: Eq + Hash> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn structural_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Config node types with a process-wide interning pool.
pub trait Pooled: Eq + Hash + Send + Sync + Sized + 'static {
    fn pool() -> &'static Pool<Self>;
}

/// Canonicalizes `value` through its type's process-wide pool.
pub fn intern<T: Pooled>(value: Arc<T>) -> Arc<T> {
    T::pool().intern(value)
}

static LAYER_STYLE_POOL: LazyLock<Pool<StyleLayerConf>> = LazyLock::new(Pool::new);
static BOX_MODEL_POOL: LazyLock<Pool<BoxModelConf>> = LazyLock::new(Pool::new);
static LAYER_RENDER_POOL: LazyLock<Pool<LayerRenderConf>> = LazyLock::new(Pool::new);

impl Pooled for StyleLayerConf {
    fn pool() -> &'static Pool<Self> {
        &LAYER_STYLE_POOL
    }
}

impl Pooled for BoxModelConf {
    fn pool() -> &'static Pool<Self> {
        &BOX_MODEL_POOL
    }
}

impl Pooled for LayerRenderConf {
    fn pool() -> &'static Pool<Self> {
        &LAYER_RENDER_POOL
    }
}
