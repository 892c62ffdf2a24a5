//! Lock-free publication of the active rule set.
//!
//! Readers take an `Arc<RuleSet>` snapshot and resolve against it for the
//! whole request; a reload builds a new set and swaps the pointer. Nothing
//! mutates a published set.
//!
//! Writers (file watcher, SIGHUP) are serialized: a reload reads the file and
//! publishes under one lock, so the last reload to finish is also the one that
//! read the newest file. Readers never take the lock.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, LoadError};
use crate::observability::metrics;
use crate::routing::router::RuleSet;

/// What a successful reload did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    /// A different rule set is now active.
    Applied,
    /// The new document compiled to the rule set already active.
    Unchanged,
}

/// Holds the active [`RuleSet`].
pub struct RuleStore {
    inner: ArcSwap<RuleSet>,
    write_lock: Mutex<()>,
}

impl RuleStore {
    pub fn new(initial: RuleSet) -> Self {
        metrics::set_rule_count(initial.len());
        Self {
            inner: ArcSwap::from_pointee(initial),
            write_lock: Mutex::new(()),
        }
    }

    /// Load, validate and compile `path`, then publish it.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let validated = load_config(path)?;
        Ok(Self::new(RuleSet::compile(&validated)))
    }

    /// Current snapshot. Cheap; never blocks writers.
    pub fn load(&self) -> Arc<RuleSet> {
        self.inner.load_full()
    }

    /// Swap in `rules` unless it equals the active set.
    pub fn publish(&self, rules: RuleSet) -> ReloadStatus {
        let _guard = self.lock_writers();
        self.publish_locked(rules)
    }

    /// Rebuild from `path`. On any error the active set is kept.
    pub fn reload(&self, path: &Path) -> Result<ReloadStatus, LoadError> {
        let result = {
            let _guard = self.lock_writers();
            load_config(path).map(|validated| self.publish_locked(RuleSet::compile(&validated)))
        };

        match &result {
            Ok(status) => {
                metrics::record_reload(match status {
                    ReloadStatus::Applied => "applied",
                    ReloadStatus::Unchanged => "unchanged",
                });
                tracing::info!(path = %path.display(), status = ?status, "Configuration reloaded");
            }
            Err(e) => {
                metrics::record_reload("rejected");
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to reload config. Keeping current configuration."
                );
            }
        }
        result
    }

    fn publish_locked(&self, rules: RuleSet) -> ReloadStatus {
        if **self.inner.load() == rules {
            return ReloadStatus::Unchanged;
        }
        metrics::set_rule_count(rules.len());
        self.inner.store(Arc::new(rules));
        ReloadStatus::Applied
    }

    fn lock_writers(&self) -> MutexGuard<'_, ()> {
        // the guarded data is (), so a poisoned lock holds nothing inconsistent
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.inner.load();
        f.debug_struct("RuleStore")
            .field("tunnel", &current.tunnel_id())
            .field("rules", &current.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Configuration, IngressRule};
    use crate::config::validation::validate_config;

    fn rule_set(service: &str) -> RuleSet {
        let config = Configuration {
            ingress: vec![IngressRule {
                service: service.into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        RuleSet::compile(&validate_config(&config).unwrap())
    }

    #[test]
    fn test_publish_swaps_and_detects_no_change() {
        let store = RuleStore::new(rule_set("http://localhost:1"));
        let before = store.load();

        assert_eq!(store.publish(rule_set("http://localhost:1")), ReloadStatus::Unchanged);
        assert!(Arc::ptr_eq(&before, &store.load()));

        assert_eq!(store.publish(rule_set("http://localhost:2")), ReloadStatus::Applied);
        let after = store.load();
        assert!(!Arc::ptr_eq(&before, &after));

        // the old snapshot is still intact for whoever holds it
        assert_eq!(*before, rule_set("http://localhost:1"));
    }

    #[test]
    fn test_concurrent_publish_applies_once() {
        let store = Arc::new(RuleStore::new(rule_set("http://localhost:1")));

        let handles = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.publish(rule_set("http://localhost:2")))
            })
            .collect::<Vec<_>>();
        let statuses = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        let applied = statuses.iter().filter(|s| **s == ReloadStatus::Applied).count();
        assert_eq!(applied, 1);
        assert_eq!(*store.load(), rule_set("http://localhost:2"));
    }
}
