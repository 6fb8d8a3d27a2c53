//! Request-scoped decision cache.
//!
//! Decisions are memoized per principal for the lifetime of one request. The
//! host owns the cache (usually through its principal type, see
//! [`crate::Principal::decision_cache`]) and must call
//! [`DecisionCache::reset`] whenever a new request starts with a long-lived
//! principal object. A stale cache silently returns outdated decisions.
//!
//! Keys carry the handler instance and its decision generation, so attaching
//! or detaching logics and re-registering handlers need no reset. Changes to
//! the principal or to the objects themselves do.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rowguard_core::{ObjectKey, PermissionResult, UserId};

use crate::Permission;

/// Typed cache key.
///
/// `handler` is the id of the handler instance that produced the decision,
/// so two handlers for the same model (in separate registries, or before and
/// after re-registration) never share entries. `generation` is the handler's
/// decision generation; attaching or detaching a logic moves it and orphans
/// the older entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A `has_perm` decision. `object: None` is the class-level sentinel.
    Perm {
        handler: u64,
        generation: u64,
        principal: Option<UserId>,
        perm: Permission,
        object: Option<ObjectKey>,
    },
    /// A `has_module_perms` decision.
    Module {
        handler: u64,
        generation: u64,
        principal: Option<UserId>,
        app_label: String,
    },
}

#[derive(Debug, Default)]
pub struct DecisionCache {
    entries: Mutex<HashMap<CacheKey, bool>>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<bool> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    pub fn insert(&self, key: CacheKey, granted: bool) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, granted);
    }

    /// Return the cached decision or compute, store and return it.
    ///
    /// The lock is not held while `compute` runs, so `compute` may itself
    /// consult the cache. Errors are returned as-is and never cached.
    pub fn get_or_try_insert_with<F>(&self, key: CacheKey, compute: F) -> PermissionResult<bool>
    where
        F: FnOnce() -> PermissionResult<bool>,
    {
        if let Some(granted) = self.get(&key) {
            tracing::trace!(?key, granted, "decision cache hit");
            return Ok(granted);
        }

        let granted = compute()?;
        self.insert(key, granted);
        Ok(granted)
    }

    /// Drop every memoized decision. Call at the start of each request.
    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rowguard_core::{Model, PermissionError};

    use super::*;

    fn key(object: Option<ObjectKey>) -> CacheKey {
        CacheKey::Perm {
            handler: 1,
            generation: 0,
            principal: None,
            perm: Permission::from("blog.change_article"),
            object,
        }
    }

    #[test]
    fn computes_once() {
        let cache = DecisionCache::new();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let granted = cache
                .get_or_try_insert_with(key(None), || {
                    calls.set(calls.get() + 1);
                    Ok(true)
                })
                .unwrap();
            assert!(granted);
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn object_identity_separates_entries() {
        let cache = DecisionCache::new();
        let article = Model::new("blog", "article");

        cache.insert(key(None), false);
        cache.insert(key(Some(ObjectKey::new(article.clone(), "1"))), true);

        assert_eq!(cache.get(&key(None)), Some(false));
        assert_eq!(cache.get(&key(Some(ObjectKey::new(article.clone(), "1")))), Some(true));
        assert_eq!(cache.get(&key(Some(ObjectKey::new(article, "2")))), None);
    }

    #[test]
    fn handler_and_generation_separate_entries() {
        let cache = DecisionCache::new();
        cache.insert(key(None), true);

        let other_handler = CacheKey::Perm {
            handler: 2,
            generation: 0,
            principal: None,
            perm: Permission::from("blog.change_article"),
            object: None,
        };
        let later_generation = CacheKey::Perm {
            handler: 1,
            generation: 1,
            principal: None,
            perm: Permission::from("blog.change_article"),
            object: None,
        };

        assert_eq!(cache.get(&other_handler), None);
        assert_eq!(cache.get(&later_generation), None);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = DecisionCache::new();
        let result = cache.get_or_try_insert_with(key(None), || {
            Err(PermissionError::NotImplemented("base".into()))
        });

        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let cache = DecisionCache::new();
        cache.insert(key(None), true);
        cache.reset();
        assert_eq!(cache.get(&key(None)), None);
    }
}
