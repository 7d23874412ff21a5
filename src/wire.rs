// src/wire.rs
//! Binary framing for the discovery exchange.
//!
//! Every frame is `[KIND:u8][LEN:u32][PAYLOAD]`, integers big-endian.
//!
//! - Request (kind 1): `[COUNT:u32]` then `[APP:i32][LEN:u32][NAME]` per element.
//! - Response (kind 2): `[COUNT:u32]` then `[APP:i32][LEN:u32][NAME][ID:i32]` per element.
//! - Error (kind 255): UTF-8 message.

use crate::authority::{
    ServiceNameCollection, ServiceNameElement, ServiceNameMappingCollection,
    ServiceNameMappingElement,
};
use crate::error::{Result, TransportError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const KIND_REQUEST: u8 = 1;
pub const KIND_RESPONSE: u8 = 2;
pub const KIND_ERROR: u8 = 255;

/// Largest payload either side will accept.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Request(ServiceNameCollection),
    Response(ServiceNameMappingCollection),
    Error(String),
}

impl Frame {
    pub fn encode(&self) -> Bytes {
        let mut payload = BytesMut::new();
        let kind = match self {
            Frame::Request(req) => {
                payload.put_u32(req.elements.len() as u32);
                for el in &req.elements {
                    put_element(&mut payload, el);
                }
                KIND_REQUEST
            }
            Frame::Response(resp) => {
                payload.put_u32(resp.elements.len() as u32);
                for mapping in &resp.elements {
                    put_element(&mut payload, &mapping.element);
                    payload.put_i32(mapping.service_id);
                }
                KIND_RESPONSE
            }
            Frame::Error(msg) => {
                payload.put_slice(msg.as_bytes());
                KIND_ERROR
            }
        };

        let mut buf = BytesMut::with_capacity(5 + payload.len());
        buf.put_u8(kind);
        buf.put_u32(payload.len() as u32);
        buf.put(payload);
        buf.freeze()
    }

    pub fn decode(kind: u8, mut payload: Bytes) -> Result<Frame> {
        let frame = match kind {
            KIND_REQUEST => {
                let count = get_u32(&mut payload)? as usize;
                let mut elements = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    elements.push(get_element(&mut payload)?);
                }
                Frame::Request(ServiceNameCollection { elements })
            }
            KIND_RESPONSE => {
                let count = get_u32(&mut payload)? as usize;
                let mut elements = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let element = get_element(&mut payload)?;
                    let service_id = get_i32(&mut payload)?;
                    elements.push(ServiceNameMappingElement { element, service_id });
                }
                Frame::Response(ServiceNameMappingCollection { elements })
            }
            KIND_ERROR => {
                let msg = String::from_utf8_lossy(&payload).into_owned();
                payload.advance(payload.len());
                Frame::Error(msg)
            }
            other => {
                return Err(TransportError::Malformed(format!("unknown frame kind {other}")))
            }
        };
        if payload.has_remaining() {
            return Err(TransportError::Malformed(format!(
                "{} trailing bytes after frame",
                payload.remaining()
            )));
        }
        Ok(frame)
    }
}

/// Split `request` into batches whose frames, and the response frames they can
/// produce, stay within `limit` payload bytes. A single name that cannot fit
/// any frame is rejected.
pub fn split_request(
    request: ServiceNameCollection,
    limit: usize,
) -> Result<Vec<ServiceNameCollection>> {
    // Sizes are counted as response entries, which carry the extra id.
    let budget = limit.saturating_sub(4);
    let mut chunks = Vec::new();
    let mut current = ServiceNameCollection::default();
    let mut used = 0usize;

    for el in request.elements {
        let cost = 12 + el.service_name.len();
        if cost > budget {
            return Err(TransportError::Malformed(format!(
                "operation name of {} bytes does not fit a {limit} byte frame",
                el.service_name.len()
            )));
        }
        if used + cost > budget {
            chunks.push(std::mem::take(&mut current));
            used = 0;
        }
        used += cost;
        current.elements.push(el);
    }
    if !current.elements.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

fn put_element(buf: &mut BytesMut, el: &ServiceNameElement) {
    buf.put_i32(el.application_id);
    buf.put_u32(el.service_name.len() as u32);
    buf.put_slice(el.service_name.as_bytes());
}

fn get_element(buf: &mut Bytes) -> Result<ServiceNameElement> {
    let application_id = get_i32(buf)?;
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(truncated());
    }
    let raw = buf.split_to(len);
    let service_name = String::from_utf8(raw.to_vec())
        .map_err(|_| TransportError::Malformed("service name is not valid UTF-8".into()))?;
    Ok(ServiceNameElement { application_id, service_name })
}

fn get_u32(buf: &mut Bytes) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(truncated());
    }
    Ok(buf.get_u32())
}

fn get_i32(buf: &mut Bytes) -> Result<i32> {
    if buf.remaining() < 4 {
        return Err(truncated());
    }
    Ok(buf.get_i32())
}

fn truncated() -> TransportError {
    TransportError::Malformed("frame truncated".into())
}

/// Read one frame. `Ok(None)` means the peer closed the stream cleanly
/// before a new frame started.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; 1];
    match reader.read_exact(&mut head).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Malformed(format!(
            "frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
        )));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Frame::decode(head[0], Bytes::from(data)).map(Some)
}

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await?;
    writer.flush().await?;
    Ok(())
}
