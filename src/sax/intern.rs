use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Bounded string interner for element and attribute names.
///
/// Large feeds repeat the same few dozen names thousands of times. Interning
/// hands out one shared `Arc<str>` per distinct name while the LRU bound keeps
/// memory flat on documents with pathological name variety.
///
/// A capacity of zero disables caching; every call then allocates.
#[derive(Debug)]
pub struct Interner {
    cache: Option<LruCache<Arc<str>, Arc<str>>>,
}

impl Interner {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn intern(&mut self, value: &str) -> Arc<str> {
        let Some(cache) = self.cache.as_mut() else {
            return Arc::from(value);
        };
        if let Some(existing) = cache.get(value) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(value);
        cache.put(Arc::clone(&shared), Arc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_names_share_allocation() {
        let mut interner = Interner::new(8);
        let a = interner.intern("item");
        let b = interner.intern("item");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut interner = Interner::new(2);
        let first = interner.intern("a");
        interner.intern("b");
        interner.intern("c");
        assert_eq!(interner.len(), 2);

        // "a" was evicted, so a fresh allocation comes back
        let again = interner.intern("a");
        assert_eq!(first, again);
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut interner = Interner::new(0);
        let a = interner.intern("x");
        let b = interner.intern("x");
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 0);
    }
}
