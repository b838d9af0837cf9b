use std::{
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use chrono::Utc;
use futures::future::BoxFuture;
use tonic::{metadata::MetadataMap, Code, Response, Status};
use tower::Service;
use tower_layer::Layer;
use tracing_core::LevelFilter;

use crate::{
    auth::{self, MULTI_TENANCY_FIELD},
    call::{split_method, UnaryCall},
    config::GatewayLogConfig,
    context::{attach_logger, Sentinel},
    fields::{call_fields, outcome_fields, LOG_FLAG_FIELD, VALUE_UNDEFINED},
    level::{code_name, parse_level, CodeToLevel},
    logger::{Fields, Logger},
    metadata::{gateway_header, set_metadata},
    request_id::{RequestId, REQUEST_ID_FIELD, REQUEST_ID_HEADER},
};

/// Logs outbound unary calls made by a gateway.
///
/// Every call gets a logger carrying the call's fields (service, method,
/// request ID, account ID, ...) attached to its extensions, and the request ID
/// is forwarded in the outgoing metadata.
///
/// The outcome line is only written when the call never reached the
/// [`SentinelLayer`](super::sentinel::SentinelLayer), i.e. when an interceptor
/// in between rejected it. Calls that did reach it are logged by the server.
#[derive(Debug, Clone)]
pub struct GatewayLoggingLayer {
    logger: Logger,
    config: Arc<GatewayLogConfig>,
}

impl GatewayLoggingLayer {
    pub fn new(logger: Logger, config: GatewayLogConfig) -> Self {
        Self {
            logger,
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for GatewayLoggingLayer {
    type Service = GatewayLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        GatewayLoggingService {
            service,
            logger: self.logger.clone(),
            config: self.config.clone(),
        }
    }
}

/// This service implements the GatewayLogging behavior
#[derive(Debug, Clone)]
pub struct GatewayLoggingService<S> {
    service: S,
    logger: Logger,
    config: Arc<GatewayLogConfig>,
}

impl<S> GatewayLoggingService<S> {
    /// The call's request ID: the [`RequestId`] extension, then the
    /// `x-request-id` header (plain or `grpcgateway-` prefixed), then a fresh
    /// one.
    fn request_id<T>(&self, call: &UnaryCall<T>) -> RequestId {
        RequestId::from_extensions(call.extensions())
            .filter(|id| !id.is_empty())
            .cloned()
            .or_else(|| {
                gateway_header(call.metadata(), REQUEST_ID_HEADER)
                    .filter(|id| !id.is_empty())
                    .map(RequestId)
            })
            .unwrap_or_else(RequestId::generate)
    }

    /// Level of the call's logger, taken from the log level header when it
    /// holds a valid level name.
    fn dynamic_level<T>(&self, call: &UnaryCall<T>, fields: &mut Fields) -> LevelFilter {
        if let Some(flag) = gateway_header(call.metadata(), &self.config.log_flag_key) {
            fields.insert(LOG_FLAG_FIELD.into(), flag.into());
        }

        gateway_header(call.metadata(), &self.config.log_level_key)
            .and_then(|name| parse_level(&name).ok())
            .unwrap_or_else(|| self.logger.level())
    }

    /// The extraction reads inbound metadata, so it is handed a copy of the
    /// outgoing metadata.
    fn account_id<T>(&self, call: &UnaryCall<T>) -> String {
        let incoming = MetadataMap::from_headers(call.metadata().clone().into_headers());
        match auth::account_id(&incoming, self.config.account_id_keyfunc.as_ref()) {
            Ok(account_id) => account_id,
            Err(err) => {
                self.logger.info(err.to_string());
                VALUE_UNDEFINED.to_string()
            }
        }
    }
}

impl<S, Req, Res> Service<UnaryCall<Req>> for GatewayLoggingService<S>
where
    S: Service<UnaryCall<Req>, Response = Response<Res>, Error = Status>,
    S::Future: Send + 'static,
    Res: Send + 'static,
{
    type Error = Status;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = Response<Res>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut call: UnaryCall<Req>) -> Self::Future {
        let started = Instant::now();
        let start_time = Utc::now();

        let (service, method) = split_method(call.method());
        let deadline = call
            .timeout()
            .and_then(|timeout| chrono::Duration::from_std(timeout).ok())
            .and_then(|timeout| start_time.checked_add_signed(timeout));
        let mut fields = call_fields(service, method, start_time, deadline);

        if !self.config.disable_request_id {
            let request_id = self.request_id(&call);
            // exactly one value, the one that is logged
            set_metadata(call.metadata_mut(), REQUEST_ID_HEADER, request_id.as_str());
            fields.insert(REQUEST_ID_FIELD.into(), request_id.0.into());
        }

        let level = if self.config.dynamic_log_level {
            self.dynamic_level(&call, &mut fields)
        } else {
            self.logger.level()
        };

        if self.config.with_account_id {
            fields.insert(MULTI_TENANCY_FIELD.into(), self.account_id(&call).into());
        }

        let logger = self.logger.with_level(level).with_fields(fields);
        let scoped = attach_logger(call.extensions_mut(), logger);

        let sentinel = Sentinel::new();
        call.extensions_mut().insert(sentinel.clone());

        let code_to_level = self.config.code_to_level.clone();
        let future = self.service.call(call);

        Box::pin(async move {
            let result = future.await;

            // the call reached the transport, the server logs it
            if sentinel.is_marked() {
                return result;
            }

            // re-read, interceptors down the chain may have added fields
            log_outcome(
                &scoped.current(),
                &code_to_level,
                started.elapsed(),
                result.as_ref().err(),
            );
            result
        })
    }
}

fn log_outcome(
    logger: &Logger,
    code_to_level: &CodeToLevel,
    elapsed: Duration,
    error: Option<&Status>,
) {
    let code = error.map_or(Code::Ok, Status::code);
    logger.with_fields(outcome_fields(elapsed, error)).log(
        code_to_level(code),
        format!("finished client unary call with code {}", code_name(code)),
    );
}
