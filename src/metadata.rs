use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, MetadataMap};

/// Prefix HTTP-to-gRPC gateways put in front of forwarded HTTP headers.
pub const GATEWAY_HEADER_PREFIX: &str = "grpcgateway-";

/// Looks up a header forwarded by the gateway.
///
/// The plain `key` wins over its `grpcgateway-` prefixed form. Values that are
/// not visible ASCII are ignored.
pub fn gateway_header(metadata: &MetadataMap, key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    first_str(metadata, &key)
        .or_else(|| first_str(metadata, &format!("{GATEWAY_HEADER_PREFIX}{key}")))
        .map(str::to_string)
}

fn first_str<'a>(metadata: &'a MetadataMap, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(|v| v.to_str().ok())
}

/// Sets `key` to `value`, replacing any values already present.
///
/// Keys or values that are not valid metadata are dropped.
pub fn set_metadata(metadata: &mut MetadataMap, key: &str, value: &str) {
    let Ok(key) = AsciiMetadataKey::from_bytes(key.as_bytes()) else {
        tracing::debug!(%key, "failed to parse metadata key");
        return;
    };
    let Ok(value) = value.parse::<AsciiMetadataValue>() else {
        tracing::debug!(%value, "failed to parse metadata value");
        return;
    };
    metadata.insert(key, value);
}
