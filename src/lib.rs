// src/lib.rs
//! Operation name dictionary for tracing agents.
//!
//! Instrumentation asks [`OperationNameDictionary`] for the id of an
//! `(application id, operation name)` pair and gets an answer from local
//! memory. Unknown names are queued, and a background round
//! ([`OperationNameDictionary::sync_remote_dictionary`], usually driven by
//! [`spawn_syncer`]) exchanges them with a [`NamingAuthority`] for ids.
//!
//! ```no_run
//! use opname::{DictionaryConfig, OperationNameDictionary, TcpNamingAuthority};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let dictionary = Arc::new(OperationNameDictionary::new(DictionaryConfig::from_env()?));
//! let authority = Arc::new(TcpNamingAuthority::new("collector:11800"));
//! let _syncer = opname::spawn_syncer(dictionary.clone(), authority, Duration::from_secs(3));
//!
//! let id = dictionary.find_or_prepare_for_register(1, "GET /orders").id();
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod authority;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod key;
pub mod logging;
pub mod network;
pub mod outcome;
pub mod reconcile;
pub mod syncer;
pub mod wire;

pub use authority::{
    NamingAuthority, ServiceNameCollection, ServiceNameElement, ServiceNameMappingCollection,
    ServiceNameMappingElement,
};
pub use config::DictionaryConfig;
pub use dictionary::OperationNameDictionary;
pub use error::{ConfigError, TransportError};
pub use key::OperationKey;
pub use network::{NamingServer, TcpNamingAuthority};
pub use outcome::PossibleFound;
pub use reconcile::SyncReport;
pub use syncer::{spawn_syncer, SyncerHandle, DEFAULT_SYNC_INTERVAL};
