// src/dictionary.rs
//! Operation name dictionary.
//! Turns `(application id, operation name)` into the compact id assigned by the
//! naming authority. Lookups never block on the network: a miss can only queue
//! the name for the next reconciliation round.

use crate::config::DictionaryConfig;
use crate::key::OperationKey;
use crate::outcome::PossibleFound;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::AtomicU64;

pub struct OperationNameDictionary {
    /// Names the authority has assigned an id to. Only reconciliation writes here.
    operation_names: DashMap<OperationKey, i32>,
    /// Names seen by instrumentation that still wait for an id.
    unregistered: DashSet<OperationKey>,
    buffer_size: usize,
    /// Serializes reconciliation rounds. Lookups never take it.
    pub(crate) sync_lock: tokio::sync::Mutex<()>,
    pub(crate) unmatched_total: AtomicU64,
}

impl OperationNameDictionary {
    pub fn new(config: DictionaryConfig) -> Self {
        Self {
            operation_names: DashMap::new(),
            unregistered: DashSet::new(),
            buffer_size: config.operation_name_buffer_size,
            sync_lock: tokio::sync::Mutex::new(()),
            unmatched_total: AtomicU64::new(0),
        }
    }

    /// Look the name up and, on a miss, queue it for registration if the
    /// buffer still has room. Used while building trace segments.
    pub fn find_or_prepare_for_register(
        &self,
        application_id: i32,
        operation_name: &str,
    ) -> PossibleFound {
        self.find(application_id, operation_name, true)
    }

    /// Look the name up without queueing anything on a miss.
    pub fn find_only(&self, application_id: i32, operation_name: &str) -> PossibleFound {
        self.find(application_id, operation_name, false)
    }

    fn find(
        &self,
        application_id: i32,
        operation_name: &str,
        register_when_not_found: bool,
    ) -> PossibleFound {
        if operation_name.is_empty() {
            return PossibleFound::NotFound;
        }

        let key = OperationKey::new(application_id, operation_name);
        if let Some(id) = self.operation_names.get(&key) {
            return PossibleFound::Found(*id);
        }

        if register_when_not_found {
            // Size check and insert are separate steps; concurrent callers may
            // overshoot the bound by a few entries.
            if self.operation_names.len() + self.unregistered.len() < self.buffer_size {
                if self.unregistered.insert(key) {
                    tracing::trace!(
                        application_id,
                        operation_name,
                        "operation name queued for registration"
                    );
                }
            } else {
                tracing::debug!(
                    application_id,
                    operation_name,
                    buffer_size = self.buffer_size,
                    "operation name buffer full, not queued"
                );
            }
        }
        PossibleFound::NotFound
    }

    /// Number of names with an assigned id.
    pub fn len(&self) -> usize {
        self.operation_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operation_names.is_empty()
    }

    /// Number of names waiting for an id.
    pub fn pending_len(&self) -> usize {
        self.unregistered.len()
    }

    pub fn is_pending(&self, application_id: i32, operation_name: &str) -> bool {
        self.unregistered
            .contains(&OperationKey::new(application_id, operation_name))
    }

    pub fn capacity(&self) -> usize {
        self.buffer_size
    }

    /// Point-in-time copy of the pending keys.
    pub fn pending_snapshot(&self) -> Vec<OperationKey> {
        self.unregistered.iter().map(|k| k.key().clone()).collect()
    }

    /// Copy of every resolved entry, in no particular order.
    pub fn resolved_snapshot(&self) -> Vec<(OperationKey, i32)> {
        self.operation_names
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub(crate) fn resolved_id(&self, key: &OperationKey) -> Option<i32> {
        self.operation_names.get(key).map(|id| *id)
    }

    pub(crate) fn contains_pending(&self, key: &OperationKey) -> bool {
        self.unregistered.contains(key)
    }

    /// Drop a pending key that has meanwhile been resolved. That happens when an
    /// admission races with `install`.
    pub(crate) fn discard_pending(&self, key: &OperationKey) -> bool {
        self.unregistered.remove(key).is_some()
    }

    /// Record an assigned id and retire the key from the pending set.
    ///
    /// The id becomes visible before the key leaves the pending set, so a
    /// concurrent reader sees either a miss or the final id.
    pub(crate) fn install(&self, key: OperationKey, id: i32) {
        self.operation_names.insert(key.clone(), id);
        self.unregistered.remove(&key);
    }

    #[cfg(test)]
    pub(crate) fn push_pending(&self, key: OperationKey) {
        self.unregistered.insert(key);
    }
}

impl Default for OperationNameDictionary {
    fn default() -> Self {
        Self::new(DictionaryConfig::default())
    }
}
