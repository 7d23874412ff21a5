// src/reconcile.rs
//! Reconciliation: trade the pending names for ids assigned by the naming authority.

use crate::authority::{NamingAuthority, ServiceNameCollection, ServiceNameElement};
use crate::dictionary::OperationNameDictionary;
use crate::error::Result;
use std::sync::atomic::Ordering;

/// What one reconciliation round did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Names sent to the authority.
    pub requested: usize,
    /// Names that received an id and left the pending set.
    pub resolved: usize,
    /// Response entries that matched nothing pending and were dropped.
    pub unmatched: usize,
    /// Pending names left after the round.
    pub still_pending: usize,
}

impl OperationNameDictionary {
    /// Send every pending name to `authority` and install the ids it returns.
    ///
    /// Does nothing when no name is pending. Names the authority leaves out stay
    /// pending for the next round. On a transport error neither the pending set
    /// nor the resolved entries are modified.
    pub async fn sync_remote_dictionary<A>(
        &self,
        authority: &A,
    ) -> Result<SyncReport>
    where
        A: NamingAuthority + ?Sized,
    {
        let _round = self.sync_lock.lock().await;

        if self.pending_len() == 0 {
            return Ok(SyncReport::default());
        }

        let mut request = ServiceNameCollection::default();
        // An admission that raced with a previous install leaves a resolved key
        // behind in the pending set. Those are dropped only once the round can no
        // longer fail.
        let mut stale = Vec::new();
        for key in self.pending_snapshot() {
            if self.resolved_id(&key).is_some() {
                stale.push(key);
                continue;
            }
            request.elements.push(ServiceNameElement::from(&key));
        }
        if request.elements.is_empty() {
            for key in &stale {
                self.discard_pending(key);
            }
            return Ok(SyncReport {
                still_pending: self.pending_len(),
                ..SyncReport::default()
            });
        }

        let requested = request.elements.len();
        let response = match authority.discovery(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(requested, error = %err, "operation name discovery failed");
                return Err(err);
            }
        };
        for key in &stale {
            self.discard_pending(key);
        }

        let mut report = SyncReport {
            requested,
            ..SyncReport::default()
        };
        for mapping in response.elements {
            let key = mapping.element.key();
            if mapping.service_id >= 0 && self.contains_pending(&key) {
                self.install(key, mapping.service_id);
                report.resolved += 1;
            } else if self.resolved_id(&key) == Some(mapping.service_id) {
                // Already installed by an earlier round; harmless repeat.
                continue;
            } else {
                tracing::warn!(
                    application_id = key.application_id(),
                    operation_name = key.operation_name(),
                    service_id = mapping.service_id,
                    "discovery returned a mapping for a name that is not pending"
                );
                report.unmatched += 1;
            }
        }

        if report.unmatched > 0 {
            self.unmatched_total
                .fetch_add(report.unmatched as u64, Ordering::Relaxed);
        }
        report.still_pending = self.pending_len();

        tracing::debug!(
            requested = report.requested,
            resolved = report.resolved,
            unmatched = report.unmatched,
            still_pending = report.still_pending,
            "operation name dictionary synced"
        );
        Ok(report)
    }

    /// Response entries dropped because they matched no pending name, over the
    /// dictionary's lifetime.
    pub fn unmatched_total(&self) -> u64 {
        self.unmatched_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::{ServiceNameMappingCollection, ServiceNameMappingElement};
    use crate::config::DictionaryConfig;
    use crate::error::TransportError;
    use crate::key::OperationKey;
    use crate::outcome::PossibleFound;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Answers every request with a fixed list and counts the calls.
    struct Scripted {
        reply: Vec<(i32, &'static str, i32)>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: Vec<(i32, &'static str, i32)>) -> Self {
            Self { reply, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl NamingAuthority for Scripted {
        async fn discovery(
            &self,
            _request: ServiceNameCollection,
        ) -> Result<ServiceNameMappingCollection, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ServiceNameMappingCollection {
                elements: self
                    .reply
                    .iter()
                    .map(|(app, name, id)| ServiceNameMappingElement {
                        element: ServiceNameElement {
                            application_id: *app,
                            service_name: name.to_string(),
                        },
                        service_id: *id,
                    })
                    .collect(),
            })
        }
    }

    fn dictionary() -> OperationNameDictionary {
        OperationNameDictionary::new(DictionaryConfig::default().with_buffer_size(16))
    }

    #[tokio::test]
    async fn empty_pending_skips_the_authority() {
        let dict = dictionary();
        let authority = Scripted::new(vec![(1, "a", 1)]);
        let report = dict.sync_remote_dictionary(&authority).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrequested_and_negative_ids_are_ignored() {
        let dict = dictionary();
        dict.find_or_prepare_for_register(1, "a");
        let authority = Scripted::new(vec![(1, "a", -5), (9, "never-asked", 3)]);

        let report = dict.sync_remote_dictionary(&authority).await.unwrap();
        assert_eq!(report.resolved, 0);
        assert_eq!(report.unmatched, 2);
        assert_eq!(report.still_pending, 1);
        assert_eq!(dict.find_only(9, "never-asked"), PossibleFound::NotFound);
        assert_eq!(dict.unmatched_total(), 2);
    }

    #[tokio::test]
    async fn stale_pending_entry_is_dropped_before_sending() {
        let dict = dictionary();
        dict.find_or_prepare_for_register(1, "a");
        dict.install(OperationKey::new(1, "a"), 4);
        // Admission that checked the resolved map just before the install.
        dict.push_pending(OperationKey::new(1, "a"));
        dict.find_or_prepare_for_register(1, "b");
        let authority = Scripted::new(vec![(1, "b", 5)]);

        let report = dict.sync_remote_dictionary(&authority).await.unwrap();
        assert_eq!(report.requested, 1);
        assert_eq!(report.resolved, 1);
        assert_eq!(dict.find_only(1, "b"), PossibleFound::Found(5));
        assert!(!dict.is_pending(1, "a"));
        assert_eq!(dict.find_only(1, "a"), PossibleFound::Found(4));
    }

    #[tokio::test]
    async fn repeated_mapping_is_not_counted_as_unmatched() {
        let dict = dictionary();
        dict.find_or_prepare_for_register(1, "a");
        dict.find_or_prepare_for_register(1, "b");
        let authority = Scripted::new(vec![(1, "a", 10)]);
        dict.sync_remote_dictionary(&authority).await.unwrap();

        let report = dict.sync_remote_dictionary(&authority).await.unwrap();
        assert_eq!(report.requested, 1);
        assert_eq!(report.unmatched, 0);
        assert_eq!(dict.unmatched_total(), 0);
    }

    struct Unreachable;

    #[async_trait]
    impl NamingAuthority for Unreachable {
        async fn discovery(
            &self,
            _request: ServiceNameCollection,
        ) -> Result<ServiceNameMappingCollection, TransportError> {
            Err(TransportError::Unavailable("collector down".into()))
        }
    }

    #[tokio::test]
    async fn failed_round_keeps_stale_pending_entry() {
        let dict = dictionary();
        dict.install(OperationKey::new(1, "a"), 4);
        dict.push_pending(OperationKey::new(1, "a"));
        dict.find_or_prepare_for_register(1, "b");
        let before = dict.pending_snapshot().len();

        let err = dict.sync_remote_dictionary(&Unreachable).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert_eq!(dict.pending_snapshot().len(), before);
        assert!(dict.is_pending(1, "a"));
        assert!(dict.is_pending(1, "b"));

        // The next successful round clears it.
        dict.sync_remote_dictionary(&Scripted::new(vec![(1, "b", 5)]))
            .await
            .unwrap();
        assert_eq!(dict.pending_len(), 0);
    }

    #[tokio::test]
    async fn round_with_only_stale_entries_skips_the_authority() {
        let dict = dictionary();
        dict.install(OperationKey::new(1, "a"), 4);
        dict.push_pending(OperationKey::new(1, "a"));
        let authority = Scripted::new(vec![]);

        let report = dict.sync_remote_dictionary(&authority).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
        assert_eq!(dict.pending_len(), 0);
    }
}
