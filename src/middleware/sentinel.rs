use std::task::{Context, Poll};

use tower::Service;
use tower_layer::Layer;

use crate::{call::UnaryCall, context::Sentinel};

/// Marks the call's [`Sentinel`] before handing it to the transport.
///
/// This must be the last layer of the outbound chain. A call that gets here
/// passed every other interceptor and will be logged by the server, so the
/// [`GatewayLoggingLayer`](super::gateway::GatewayLoggingLayer) stays quiet
/// about it, whatever the outcome.
///
/// Without a sentinel in the call (no gateway layer in front of it) the call
/// is forwarded untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelLayer;

impl<S> Layer<S> for SentinelLayer {
    type Service = SentinelService<S>;

    fn layer(&self, service: S) -> Self::Service {
        SentinelService { service }
    }
}

/// This service implements the Sentinel behavior
#[derive(Debug, Clone)]
pub struct SentinelService<S> {
    service: S,
}

impl<S, Req> Service<UnaryCall<Req>> for SentinelService<S>
where
    S: Service<UnaryCall<Req>>,
{
    type Error = S::Error;
    type Future = S::Future;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, call: UnaryCall<Req>) -> Self::Future {
        if let Some(sentinel) = call.extensions().get::<Sentinel>() {
            sentinel.mark();
        }
        self.service.call(call)
    }
}
