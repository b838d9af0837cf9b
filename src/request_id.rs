//! Request-ID generation and propagation.
//!
//! A request ID correlates every log line produced for one call across the
//! gateway and the services behind it. It travels as the `x-request-id`
//! metadata entry and, inside a process, as a [`RequestId`] request extension.

use std::fmt;

use tonic::{
    metadata::{AsciiMetadataValue, MetadataMap},
    Extensions, Request, Status,
};
use uuid::Uuid;

/// Metadata key carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log field holding the request ID.
pub const REQUEST_ID_FIELD: &str = "request_id";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Fresh UUID v4 request ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<&Self> {
        extensions.get::<Self>()
    }

    /// First non-empty `x-request-id` entry.
    pub fn from_metadata(metadata: &MetadataMap) -> Option<Self> {
        metadata
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side interceptor assigning a [`RequestId`] to every inbound call.
///
/// An inbound `x-request-id` is reused, otherwise one is generated and written
/// back into the request metadata so handlers forwarding the metadata keep it.
///
/// ```ignore
/// let service = GreeterServer::with_interceptor(greeter, request_id_interceptor);
/// ```
pub fn request_id_interceptor<T>(mut request: Request<T>) -> Result<Request<T>, Status> {
    let request_id = match RequestId::from_metadata(request.metadata()) {
        Some(id) => id,
        None => {
            let id = RequestId::generate();
            let value = id
                .as_str()
                .parse::<AsciiMetadataValue>()
                .map_err(|_| Status::internal("failed to encode request id"))?;
            request.metadata_mut().insert(REQUEST_ID_HEADER, value);
            id
        }
    };

    tracing::trace!(request_id = %request_id, "assigned request id");
    request.extensions_mut().insert(request_id);
    Ok(request)
}
