//! Outbound interceptors, as [`tower`] layers over [`UnaryCall`](crate::call::UnaryCall).
//!
//! The gateway layer goes first in the chain and the sentinel layer last,
//! right in front of the transport:
//!
//! ```ignore
//! let client = ServiceBuilder::new()
//!     .layer(GatewayLoggingLayer::new(logger, GatewayLogConfig::default()))
//!     .layer(AuthLayer::new())
//!     .layer(SentinelLayer)
//!     .service(transport);
//! ```

pub mod gateway;
pub mod sentinel;
