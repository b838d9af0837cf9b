//! Helpers for tests of services using this crate: signed test tokens and a
//! sink that keeps every record in memory.

use std::sync::{Arc, Mutex, PoisonError};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth::{Keyfunc, MULTI_TENANCY_FIELD},
    logger::{LogSink, Record},
};

/// Dummy secret used for signing test JWTs.
pub const TEST_SECRET: &str = "some-secret-123";

/// The standard payload inside a test JWT.
pub fn standard_claims() -> Value {
    json!({ MULTI_TENANCY_FIELD: "TestAccount" })
}

/// Signs `claims` with [`TEST_SECRET`]. Only the HMAC algorithms are usable.
pub fn make_test_jwt(
    alg: Algorithm,
    claims: &impl Serialize,
) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &Header::new(alg),
        claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
}

/// HS256 token carrying [`standard_claims`].
pub fn standard_test_jwt() -> Result<String, jsonwebtoken::errors::Error> {
    make_test_jwt(Algorithm::HS256, &standard_claims())
}

/// Keyfunc resolving every token to [`TEST_SECRET`].
pub fn test_keyfunc() -> Keyfunc {
    Arc::new(|_| Ok(DecodingKey::from_secret(TEST_SECRET.as_bytes())))
}

/// [`LogSink`] collecting records for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &Record) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
