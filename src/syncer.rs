// src/syncer.rs
//! Background task that reconciles the dictionary on a fixed cadence.

use crate::authority::NamingAuthority;
use crate::dictionary::OperationNameDictionary;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Cadence the tracing agent uses for its register client.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3);

pub struct SyncerHandle {
    task: JoinHandle<()>,
    rounds: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl SyncerHandle {
    /// Rounds that finished without a transport error.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for SyncerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the reconciliation loop on the current tokio runtime.
///
/// The first round runs immediately. A failed round is logged and retried on
/// the next tick; nothing else happens to the dictionary.
pub fn spawn_syncer(
    dictionary: Arc<OperationNameDictionary>,
    authority: Arc<dyn NamingAuthority>,
    interval: Duration,
) -> SyncerHandle {
    let rounds = Arc::new(AtomicU64::new(0));
    let failures = Arc::new(AtomicU64::new(0));
    let (r, f) = (rounds.clone(), failures.clone());

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match dictionary.sync_remote_dictionary(authority.as_ref()).await {
                Ok(_) => {
                    r.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    f.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "operation name sync round failed");
                }
            }
        }
    });

    SyncerHandle {
        task,
        rounds,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DictionaryConfig;
    use crate::network::NamingServer;
    use crate::outcome::PossibleFound;

    #[tokio::test]
    async fn pending_names_resolve_in_the_background() {
        let dict = Arc::new(OperationNameDictionary::new(
            DictionaryConfig::default().with_buffer_size(16),
        ));
        dict.find_or_prepare_for_register(1, "GET /a");

        let handle = spawn_syncer(
            dict.clone(),
            Arc::new(NamingServer::new()),
            Duration::from_millis(10),
        );

        for _ in 0..200 {
            if dict.find_only(1, "GET /a").is_found() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(dict.find_only(1, "GET /a"), PossibleFound::Found(1));
        assert!(handle.rounds() >= 1);
        assert_eq!(handle.failures(), 0);
        handle.stop();
    }
}
