// src/authority.rs
//! Discovery protocol types and the interface to the remote naming authority.

use crate::error::Result;
use crate::key::OperationKey;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceNameElement {
    pub application_id: i32,
    pub service_name: String,
}

impl ServiceNameElement {
    pub fn key(&self) -> OperationKey {
        OperationKey::new(self.application_id, self.service_name.clone())
    }
}

impl From<&OperationKey> for ServiceNameElement {
    fn from(key: &OperationKey) -> Self {
        Self {
            application_id: key.application_id(),
            service_name: key.operation_name().to_string(),
        }
    }
}

/// Batch of unregistered names sent in one discovery call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceNameCollection {
    pub elements: Vec<ServiceNameElement>,
}

/// One assignment made by the authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceNameMappingElement {
    pub element: ServiceNameElement,
    pub service_id: i32,
}

/// Assignments returned for a batch. Requested names missing from here are
/// simply not assigned yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceNameMappingCollection {
    pub elements: Vec<ServiceNameMappingElement>,
}

/// The remote side that hands out operation ids.
///
/// Implementations own their timeouts and connection handling; the dictionary
/// only awaits the result.
#[async_trait]
pub trait NamingAuthority: Send + Sync {
    async fn discovery(
        &self,
        request: ServiceNameCollection,
    ) -> Result<ServiceNameMappingCollection>;
}

#[async_trait]
impl<T: NamingAuthority + ?Sized> NamingAuthority for Arc<T> {
    async fn discovery(
        &self,
        request: ServiceNameCollection,
    ) -> Result<ServiceNameMappingCollection> {
        (**self).discovery(request).await
    }
}
