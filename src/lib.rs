//! # Gateway logging
//! This crate provides interceptors and helpers for gRPC gateways: request
//! scoped loggers, request-ID propagation, account-ID enrichment from JWTs and
//! resource identifiers.
//!
//! ## Setup
//! The `tracing` subscriber the default logger writes to can be installed
//! using [`setup::setup`]. This should be the first call of any gateway binary.
//! With `LOG_FORMAT=json` lines are written by [`format::JsonFormat`], which
//! keeps the call fields as a nested object.
//!
//! ## Outbound call logging
//! Outbound calls are [`call::UnaryCall`]s going through a [`tower`] stack.
//! [`middleware::gateway::GatewayLoggingLayer`] goes first and attaches a
//! logger with the call's fields, [`middleware::sentinel::SentinelLayer`] goes
//! last, in front of the transport.
//!
//! Every call is logged exactly once: calls reaching the sentinel are logged
//! by the server they are sent to, all other calls (rejected by an interceptor
//! in between) are logged by the gateway layer.
//!
//! ```ignore
//! let logger = Logger::new(LevelFilter::INFO);
//! let mut client = ServiceBuilder::new()
//!     .layer(GatewayLoggingLayer::new(logger, GatewayLogConfig::default()))
//!     .layer(SentinelLayer)
//!     .service(service_fn(move |call: UnaryCall<HelloRequest>| {
//!         let mut greeter = greeter.clone();
//!         async move { greeter.say_hello(call.into_request()).await }
//!     }));
//! ```
//!
//! Handlers and interceptors further down the chain reach the call's logger
//! through [`context::logger_from`].

pub mod auth;
pub mod call;
pub mod config;
pub mod context;
pub mod fields;
pub mod format;
pub mod level;
pub mod logger;
pub mod metadata;
pub mod middleware;
pub mod request_id;
pub mod resource;
pub mod setup;
pub mod testing;

pub use call::UnaryCall;
pub use config::GatewayLogConfig;
pub use context::{logger_from, sentinel_value};
pub use logger::Logger;
pub use middleware::{gateway::GatewayLoggingLayer, sentinel::SentinelLayer};
