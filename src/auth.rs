//! Account-ID extraction from signed tokens.
//!
//! The account ID identifies the tenant a call is made on behalf of. It is the
//! `account_id` claim of the JWT carried in the `authorization` metadata entry.

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Header, Validation};
use serde_json::Value;
use tonic::metadata::MetadataMap;

/// Claim (and log field) holding the account ID.
pub const MULTI_TENANCY_FIELD: &str = "account_id";

pub const AUTHORIZATION_HEADER: &str = "authorization";

const TOKEN_SCHEMES: [&str; 2] = ["bearer", "token"];

/// Resolves the key used to verify a token from its header.
pub type Keyfunc = Arc<dyn Fn(&Header) -> Result<DecodingKey, AuthError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("request unauthenticated with bearer")]
    MissingToken,
    #[error("unsupported authorization scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("invalid token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("unable to get field {0} from token")]
    MissingClaim(String),
    #[error("unable to resolve verification key: {0}")]
    KeyResolution(String),
}

/// Raw token from the first `authorization` entry.
pub fn token_from_metadata(metadata: &MetadataMap) -> Result<&str, AuthError> {
    let value = metadata
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !TOKEN_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return Err(AuthError::UnsupportedScheme(scheme.to_string()));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Reads `field` from the token's claims.
///
/// With a `keyfunc` the signature is verified against the key it resolves.
/// Without one the claims are read as-is. Non-string claims are rendered as
/// JSON.
pub fn jwt_field(
    metadata: &MetadataMap,
    field: &str,
    keyfunc: Option<&Keyfunc>,
) -> Result<String, AuthError> {
    let token = token_from_metadata(metadata)?;
    let header = jsonwebtoken::decode_header(token)?;

    let mut validation = Validation::new(header.alg);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;

    let key = match keyfunc {
        Some(keyfunc) => keyfunc(&header)?,
        None => {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        }
    };

    let data = jsonwebtoken::decode::<serde_json::Map<String, Value>>(token, &key, &validation)?;
    match data.claims.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(Value::Null) | None => Err(AuthError::MissingClaim(field.to_string())),
        Some(value) => Ok(value.to_string()),
    }
}

/// Account ID of the caller, see [`MULTI_TENANCY_FIELD`].
pub fn account_id(metadata: &MetadataMap, keyfunc: Option<&Keyfunc>) -> Result<String, AuthError> {
    jwt_field(metadata, MULTI_TENANCY_FIELD, keyfunc)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::Algorithm;
    use serde_json::json;

    use super::*;
    use crate::testing::{make_test_jwt, standard_test_jwt, test_keyfunc};

    fn metadata_with(value: &str) -> MetadataMap {
        let mut md = MetadataMap::new();
        md.insert(AUTHORIZATION_HEADER, value.parse().unwrap());
        md
    }

    #[test]
    fn reads_unverified_account_id() {
        let token = standard_test_jwt().unwrap();
        let md = metadata_with(&format!("Bearer {token}"));

        assert_eq!(account_id(&md, None).unwrap(), "TestAccount");
    }

    #[test]
    fn verifies_with_keyfunc() {
        let token = standard_test_jwt().unwrap();
        let md = metadata_with(&format!("token {token}"));

        assert_eq!(account_id(&md, Some(&test_keyfunc())).unwrap(), "TestAccount");
    }

    #[test]
    fn rejects_wrong_key() {
        let token = standard_test_jwt().unwrap();
        let md = metadata_with(&format!("Bearer {token}"));
        let keyfunc: Keyfunc = Arc::new(|_| Ok(DecodingKey::from_secret(b"other-secret")));

        let err = account_id(&md, Some(&keyfunc)).unwrap_err();
        assert!(matches!(err, AuthError::Jwt(_)));
    }

    #[test]
    fn keyfunc_errors_propagate() {
        let token = standard_test_jwt().unwrap();
        let md = metadata_with(&format!("Bearer {token}"));
        let keyfunc: Keyfunc = Arc::new(|_| Err(AuthError::KeyResolution("no key".into())));

        let err = account_id(&md, Some(&keyfunc)).unwrap_err();
        assert!(matches!(err, AuthError::KeyResolution(_)));
    }

    #[test]
    fn missing_token() {
        assert!(matches!(
            account_id(&MetadataMap::new(), None),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            account_id(&metadata_with("Bearer"), None),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            account_id(&metadata_with("Basic dXNlcjpwYXNz"), None),
            Err(AuthError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn missing_claim() {
        let token = make_test_jwt(Algorithm::HS256, &json!({ "sub": "someone" })).unwrap();
        let md = metadata_with(&format!("Bearer {token}"));

        let err = account_id(&md, None).unwrap_err();
        assert!(matches!(err, AuthError::MissingClaim(ref f) if f == MULTI_TENANCY_FIELD));
    }

    #[test]
    fn numeric_claims_are_stringified() {
        let token = make_test_jwt(Algorithm::HS256, &json!({ "account_id": 42 })).unwrap();
        let md = metadata_with(&format!("Bearer {token}"));

        assert_eq!(account_id(&md, None).unwrap(), "42");
    }

    #[test]
    fn garbage_token() {
        let md = metadata_with("Bearer not.a.jwt");
        assert!(matches!(account_id(&md, None), Err(AuthError::Jwt(_))));
    }
}
