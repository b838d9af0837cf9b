use std::time::Duration;

use tonic::{metadata::MetadataMap, Extensions, Request};

/// Metadata entry carrying the call timeout, as written by
/// [`Request::set_timeout`].
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// One outbound unary call travelling down the interceptor chain.
///
/// Services in the chain take a `UnaryCall<Req>` and answer with
/// `Result<tonic::Response<Res>, tonic::Status>`. The request metadata is the
/// outgoing metadata, its extensions are the per-call context.
#[derive(Debug)]
pub struct UnaryCall<T> {
    method: String,
    request: Request<T>,
}

impl<T> UnaryCall<T> {
    /// `method` is the full path, `/package.Service/Method`.
    pub fn new(method: impl Into<String>, request: Request<T>) -> Self {
        Self {
            method: method.into(),
            request,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn request(&self) -> &Request<T> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<T> {
        &mut self.request
    }

    pub fn metadata(&self) -> &MetadataMap {
        self.request.metadata()
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataMap {
        self.request.metadata_mut()
    }

    pub fn extensions(&self) -> &Extensions {
        self.request.extensions()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.request.extensions_mut()
    }

    /// Time left for the call, if the caller set a timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.metadata()
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout)
    }

    pub fn into_request(self) -> Request<T> {
        self.request
    }

    pub fn into_parts(self) -> (String, Request<T>) {
        (self.method, self.request)
    }
}

/// Parses a `grpc-timeout` value: at most eight digits followed by a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

/// Splits `/package.Service/Method` into its service and method parts.
pub fn split_method(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((service, method)) => (service.strip_prefix('/').unwrap_or(service), method),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_full_method() {
        assert_eq!(split_method("/svc.Pkg/Method"), ("svc.Pkg", "Method"));
        assert_eq!(split_method("/Method"), ("", "Method"));
        assert_eq!(split_method("Method"), ("", "Method"));
    }

    #[test]
    fn parses_timeouts() {
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("30S"), Some(Duration::from_secs(30)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("7u"), Some(Duration::from_micros(7)));
        assert_eq!(parse_grpc_timeout("9n"), Some(Duration::from_nanos(9)));
    }

    #[test]
    fn rejects_bad_timeouts() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("10x"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
        assert_eq!(parse_grpc_timeout("-1S"), None);
    }

    #[test]
    fn reads_timeout_set_on_request() {
        let mut request = Request::new(());
        request.set_timeout(Duration::from_secs(5));
        let call = UnaryCall::new("/svc.Pkg/Method", request);

        let timeout = call.timeout().unwrap();
        assert!(timeout <= Duration::from_secs(5));
        assert!(timeout >= Duration::from_millis(4900));
        assert_eq!(UnaryCall::new("/a/B", Request::new(())).timeout(), None);
    }
}
