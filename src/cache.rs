use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};
use tracing::debug;

use crate::{
    any::{ErasedInstance, Key},
    errors::{DisposeErrorKind, ResolveErrorKind},
    finalizer::BoxedFinalizer,
};

type CacheCell = Arc<OnceCell<Result<ErasedInstance, ResolveErrorKind>>>;

/// Instance created and owned by a cache, finalized when the owner is disposed
pub(crate) struct Resolved {
    pub(crate) key: Key,
    pub(crate) dependency: ErasedInstance,
    pub(crate) finalizer: Option<BoxedFinalizer>,
}

/// Runs finalizers in the given order, continuing after failures
pub(crate) fn finalize(resolved: Vec<Resolved>) -> Vec<DisposeErrorKind> {
    let mut errors = Vec::new();
    for Resolved { key, dependency, finalizer } in resolved {
        let Some(finalizer) = finalizer else {
            continue;
        };
        match finalizer(&dependency) {
            Ok(()) => debug!(dependency = %key, "Finalizer called"),
            Err(source) => {
                tracing::error!(dependency = %key, "Finalizer failed: {source}");
                errors.push(DisposeErrorKind::Finalizer { key, source });
            }
        }
    }
    errors
}

/// Owned instances in creation order.
/// An instance is pushed once its construction completes, so dependencies come before their dependents.
#[derive(Default)]
pub(crate) struct ResolvedSet(VecDeque<Resolved>);

impl ResolvedSet {
    #[inline]
    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    /// Takes every instance, last created first
    #[inline]
    #[must_use]
    pub(crate) fn take_reversed(&mut self) -> Vec<Resolved> {
        let mut resolved = Vec::from(core::mem::take(&mut self.0));
        resolved.reverse();
        resolved
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Default)]
struct CacheState {
    cells: BTreeMap<Key, CacheCell>,
    resolved: ResolvedSet,
    closed: bool,
}

/// Per-key once-only construction cache, shared by the container (singletons) and scopes (scoped instances).
///
/// The lock is held only to find or insert the cell of a key, never while an instance is being built,
/// so constructors can resolve other cached keys of the same cache.
/// Concurrent callers of one key wait for a single construction and observe the same result.
#[derive(Default)]
pub(crate) struct Cache {
    state: RwLock<CacheState>,
}

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `key`, or builds it with `create`.
    ///
    /// On success the instance is recorded with its finalizer for [`Self::close`] and [`Self::drain`].
    /// If `memoize_failures` is `false`, a failed construction is forgotten and the next call builds again.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::ScopeDisposed`] if the cache is closed, including when it's closed while `create` runs.
    ///   In the latter case the new instance is finalized right away.
    /// - Any error returned by `create`
    pub(crate) fn get_or_create<F>(
        &self,
        key: &Key,
        finalizer: Option<&BoxedFinalizer>,
        memoize_failures: bool,
        create: F,
    ) -> Result<ErasedInstance, ResolveErrorKind>
    where
        F: FnOnce() -> Result<ErasedInstance, ResolveErrorKind>,
    {
        let cell = self.cell(key)?;
        if let Some(result) = cell.get() {
            debug!("Found in cache");
            return result.clone();
        }

        let result = cell
            .get_or_init(|| {
                debug!("Not found in cache");
                let dependency = create()?;
                self.push_resolved(key, dependency.clone(), finalizer)?;
                Ok(dependency)
            })
            .clone();

        if result.is_err() && !memoize_failures {
            let mut guard = self.state.write();
            if guard.cells.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
                guard.cells.remove(key);
            }
        }
        result
    }

    fn cell(&self, key: &Key) -> Result<CacheCell, ResolveErrorKind> {
        {
            let guard = self.state.read();
            if guard.closed {
                return Err(ResolveErrorKind::ScopeDisposed);
            }
            if let Some(cell) = guard.cells.get(key) {
                return Ok(cell.clone());
            }
        }

        let mut guard = self.state.write();
        if guard.closed {
            return Err(ResolveErrorKind::ScopeDisposed);
        }
        Ok(guard.cells.entry(key.clone()).or_default().clone())
    }

    fn push_resolved(&self, key: &Key, dependency: ErasedInstance, finalizer: Option<&BoxedFinalizer>) -> Result<(), ResolveErrorKind> {
        let mut guard = self.state.write();
        if guard.closed {
            drop(guard);
            if let Some(finalizer) = finalizer {
                if let Err(err) = finalizer(&dependency) {
                    tracing::error!(dependency = %key, "Finalizer of instance created during disposal failed: {err}");
                }
            }
            return Err(ResolveErrorKind::ScopeDisposed);
        }

        guard.resolved.push(Resolved {
            key: key.clone(),
            dependency,
            finalizer: finalizer.cloned(),
        });
        Ok(())
    }

    /// Marks the cache closed and takes every owned instance, last created first.
    /// Later lookups fail with [`ResolveErrorKind::ScopeDisposed`].
    #[must_use]
    pub(crate) fn close(&self) -> Vec<Resolved> {
        let mut guard = self.state.write();
        guard.closed = true;
        guard.cells.clear();
        guard.resolved.take_reversed()
    }

    /// Takes every owned instance, last created first, and forgets cached results. The cache stays usable.
    #[must_use]
    pub(crate) fn drain(&self) -> Vec<Resolved> {
        let mut guard = self.state.write();
        guard.cells.clear();
        guard.resolved.take_reversed()
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.state
            .read()
            .cells
            .get(key)
            .is_some_and(|cell| matches!(cell.get(), Some(Ok(_))))
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn resolved_len(&self) -> usize {
        self.state.read().resolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;
    use crate::{
        any::{erase, ErasedInstance, Key},
        errors::ResolveErrorKind,
        finalizer::{boxed_finalizer, BoxedFinalizer},
    };

    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Barrier,
    };
    use std::thread;
    use tracing_test::traced_test;

    struct A;
    struct B;

    fn create_u8(counter: &AtomicU8) -> Result<ErasedInstance, ResolveErrorKind> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(erase(Arc::new(1u8)))
    }

    fn fail(counter: &AtomicU8) -> Result<ErasedInstance, ResolveErrorKind> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(ResolveErrorKind::ScopeDisposed)
    }

    #[test]
    #[traced_test]
    fn test_created_once() {
        let cache = Cache::new();
        let counter = AtomicU8::new(0);

        let first = cache.get_or_create(&Key::of::<A>(), None, true, || create_u8(&counter)).unwrap();
        let second = cache.get_or_create(&Key::of::<A>(), None, true, || create_u8(&counter)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&Key::of::<A>()));
        assert_eq!(cache.resolved_len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_failure_memoization() {
        let counter = AtomicU8::new(0);

        let memoizing = Cache::new();
        assert!(memoizing.get_or_create(&Key::of::<A>(), None, true, || fail(&counter)).is_err());
        assert!(memoizing.get_or_create(&Key::of::<A>(), None, true, || fail(&counter)).is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let retrying = Cache::new();
        assert!(retrying.get_or_create(&Key::of::<A>(), None, false, || fail(&counter)).is_err());
        assert!(retrying.get_or_create(&Key::of::<A>(), None, false, || create_u8(&counter)).is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(retrying.resolved_len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_close_order_and_guard() {
        let finalized = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let finalizer: BoxedFinalizer = {
            let finalized = finalized.clone();
            boxed_finalizer(move |value: &Arc<u8>| {
                finalized.lock().push(**value);
                Ok(())
            })
        };

        let cache = Cache::new();
        cache
            .get_or_create(&Key::of::<A>(), Some(&finalizer), true, || Ok(erase(Arc::new(1u8))))
            .unwrap();
        cache
            .get_or_create(&Key::of::<B>(), Some(&finalizer), true, || Ok(erase(Arc::new(2u8))))
            .unwrap();

        for resolved in cache.close() {
            (resolved.finalizer.unwrap())(&resolved.dependency).unwrap();
        }
        assert_eq!(*finalized.lock(), [2, 1]);

        assert!(matches!(
            cache.get_or_create(&Key::of::<A>(), None, true, || Ok(erase(Arc::new(3u8)))),
            Err(ResolveErrorKind::ScopeDisposed)
        ));
    }

    #[test]
    #[traced_test]
    fn test_drain_keeps_cache_usable() {
        let cache = Cache::new();
        let counter = AtomicU8::new(0);

        cache.get_or_create(&Key::of::<A>(), None, true, || create_u8(&counter)).unwrap();
        assert_eq!(cache.drain().len(), 1);
        cache.get_or_create(&Key::of::<A>(), None, true, || create_u8(&counter)).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_concurrent_created_once() {
        const THREADS: usize = 8;

        let cache = Cache::new();
        let counter = AtomicU8::new(0);
        let barrier = Barrier::new(THREADS);

        let instances = thread::scope(|scope| {
            let handles = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_create(&Key::of::<A>(), None, true, || {
                                thread::sleep(std::time::Duration::from_millis(10));
                                create_u8(&counter)
                            })
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
