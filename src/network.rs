// src/network.rs
//! TCP discovery transport and a reference naming authority.

use crate::authority::{
    NamingAuthority, ServiceNameCollection, ServiceNameMappingCollection,
    ServiceNameMappingElement,
};
use crate::error::{Result, TransportError};
use crate::key::OperationKey;
use crate::wire::{read_frame, split_request, write_frame, Frame, MAX_FRAME_LEN};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Client side: one connection per frame-sized batch of a discovery round.
pub struct TcpNamingAuthority {
    addr: String,
    timeout: Option<Duration>,
}

impl TcpNamingAuthority {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: None,
        }
    }

    /// Bound each batch's round trip, connect included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn round_trip(
        &self,
        request: ServiceNameCollection,
    ) -> Result<ServiceNameMappingCollection> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        write_frame(&mut stream, &Frame::Request(request)).await?;

        match read_frame(&mut stream).await? {
            Some(Frame::Response(resp)) => Ok(resp),
            Some(Frame::Error(msg)) => Err(TransportError::Unavailable(msg)),
            Some(Frame::Request(_)) => Err(TransportError::Malformed(
                "authority answered with a request frame".into(),
            )),
            None => Err(TransportError::Unavailable(format!(
                "{} closed the connection without answering",
                self.addr
            ))),
        }
    }
}

#[async_trait]
impl NamingAuthority for TcpNamingAuthority {
    async fn discovery(
        &self,
        request: ServiceNameCollection,
    ) -> Result<ServiceNameMappingCollection> {
        let mut merged = ServiceNameMappingCollection::default();
        for batch in split_request(request, MAX_FRAME_LEN)? {
            let resp = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.round_trip(batch))
                    .await
                    .map_err(|_| {
                        TransportError::Unavailable(format!(
                            "{} timed out after {limit:?}",
                            self.addr
                        ))
                    })??,
                None => self.round_trip(batch).await?,
            };
            merged.elements.extend(resp.elements);
        }
        Ok(merged)
    }
}

/// Pause after a failed `accept`, e.g. when the process is out of descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Assignments {
    ids: HashMap<OperationKey, i32>,
    next_id: i32,
}

/// In-process naming authority. Hands out sequential ids from 1, one per
/// distinct `(application id, name)`, and answers repeated requests with the
/// same id.
pub struct NamingServer {
    assignments: Mutex<Assignments>,
    /// New ids handed out per request at most; the rest are left unanswered.
    batch_limit: Option<usize>,
}

impl Default for NamingServer {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingServer {
    pub fn new() -> Self {
        Self {
            assignments: Mutex::new(Assignments {
                ids: HashMap::new(),
                next_id: 1,
            }),
            batch_limit: None,
        }
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = Some(limit);
        self
    }

    /// Number of distinct names assigned so far.
    pub fn assigned(&self) -> usize {
        self.assignments.lock().ids.len()
    }

    pub fn id_of(&self, application_id: i32, name: &str) -> Option<i32> {
        self.assignments
            .lock()
            .ids
            .get(&OperationKey::new(application_id, name))
            .copied()
    }

    pub fn assign(&self, request: &ServiceNameCollection) -> ServiceNameMappingCollection {
        let mut state = self.assignments.lock();
        let mut fresh = 0usize;
        let mut elements = Vec::with_capacity(request.elements.len());

        for element in &request.elements {
            if element.service_name.is_empty() {
                continue;
            }
            let key = element.key();
            let service_id = match state.ids.get(&key) {
                Some(id) => *id,
                None => {
                    if self.batch_limit.is_some_and(|limit| fresh >= limit) {
                        continue;
                    }
                    let id = state.next_id;
                    state.next_id += 1;
                    state.ids.insert(key, id);
                    fresh += 1;
                    id
                }
            };
            elements.push(ServiceNameMappingElement {
                element: element.clone(),
                service_id,
            });
        }
        ServiceNameMappingCollection { elements }
    }

    /// Bind `addr` and answer discovery frames in the background. Returns the
    /// bound address, which matters when `addr` asks for port 0.
    pub async fn start(self: Arc<Self>, addr: &str) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        tokio::spawn(self.serve(listener));
        Ok(local)
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            let (mut socket, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "naming server accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let server = self.clone();
            tokio::spawn(async move {
                loop {
                    let reply = match read_frame(&mut socket).await {
                        Ok(Some(Frame::Request(req))) => Frame::Response(server.assign(&req)),
                        Ok(Some(_)) => Frame::Error("expected a discovery request".into()),
                        Ok(None) => break,
                        Err(e) => {
                            tracing::debug!(%peer, error = %e, "dropping discovery connection");
                            let _ = write_frame(&mut socket, &Frame::Error(e.to_string())).await;
                            break;
                        }
                    };
                    let stop = matches!(reply, Frame::Error(_));
                    if let Err(e) = write_frame(&mut socket, &reply).await {
                        tracing::debug!(%peer, error = %e, "discovery reply failed");
                        break;
                    }
                    if stop {
                        break;
                    }
                }
            });
        }
    }
}

#[async_trait]
impl NamingAuthority for NamingServer {
    async fn discovery(
        &self,
        request: ServiceNameCollection,
    ) -> Result<ServiceNameMappingCollection> {
        Ok(self.assign(&request))
    }
}
