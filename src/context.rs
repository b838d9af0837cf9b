//! Per-call state carried in a call's request extensions.
//!
//! Two values live there while a call travels down the outbound chain: the
//! [`ScopedLogger`] the gateway interceptor attached, and the [`Sentinel`] the
//! sentinel interceptor marks once the call reaches the transport.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tonic::Extensions;

use crate::logger::{Fields, Logger};

/// Single-assignment flag shared between the gateway interceptor and the
/// sentinel interceptor of one call.
#[derive(Debug, Clone, Default)]
pub struct Sentinel(Arc<OnceLock<()>>);

impl Sentinel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        let _ = self.0.set(());
    }

    pub fn is_marked(&self) -> bool {
        self.0.get().is_some()
    }
}

/// State of the call's sentinel, `None` when no gateway interceptor put one
/// in place.
pub fn sentinel_value(extensions: &Extensions) -> Option<bool> {
    extensions.get::<Sentinel>().map(Sentinel::is_marked)
}

/// Handle to the logger attached to one call.
///
/// Clones share the logger, so fields added further down the chain are seen
/// by the interceptor that attached it.
#[derive(Debug, Clone)]
pub struct ScopedLogger(Arc<RwLock<Logger>>);

impl ScopedLogger {
    pub fn new(logger: Logger) -> Self {
        Self(Arc::new(RwLock::new(logger)))
    }

    pub fn current(&self) -> Logger {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn add_fields(&self, fields: Fields) {
        let mut logger = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *logger = logger.with_fields(fields);
    }
}

/// Attaches `logger` to the call, replacing any logger attached before.
pub fn attach_logger(extensions: &mut Extensions, logger: Logger) -> ScopedLogger {
    let scoped = ScopedLogger::new(logger);
    extensions.insert(scoped.clone());
    scoped
}

/// Logger attached to the call, or a default one.
pub fn logger_from(extensions: &Extensions) -> Logger {
    extensions
        .get::<ScopedLogger>()
        .map(ScopedLogger::current)
        .unwrap_or_default()
}

/// Adds fields to the attached logger. Returns `false` when there is none.
pub fn add_fields(extensions: &Extensions, fields: Fields) -> bool {
    match extensions.get::<ScopedLogger>() {
        Some(scoped) => {
            scoped.add_fields(fields);
            true
        }
        None => false,
    }
}
