//! Resource watch middleware.
//!
//! Wraps the create/update handlers of the resource types the configuration
//! names. Per request the interceptor delegates first, then inspects only
//! the outcome: on a successful mutation it parses the persisted payload,
//! runs the extractor, and attempts a non-blocking publish of the resulting
//! envelope. The response is passed through byte-for-byte in every case;
//! nothing that happens here can fail, delay, or alter the request itself.
//!
//! A request cancelled before the wrapped handler returns drops this
//! middleware's future, so extraction and publish never run for it.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use vitalio_core::{PublishError, UpdateExtractor, UpdateSender};

/// Produce a watch interceptor closing over the write end of the update
/// channel. The factory takes a sender only, so the interceptor cannot read
/// from the channel it publishes to. No effects until a request flows
/// through the returned unit.
pub fn generate_resource_watch(
    sender: UpdateSender,
    extractor: Arc<UpdateExtractor>,
) -> ResourceWatch {
    ResourceWatch { sender, extractor }
}

/// The installed interception unit; cloned into each watched route group.
#[derive(Clone)]
pub struct ResourceWatch {
    sender: UpdateSender,
    extractor: Arc<UpdateExtractor>,
}

impl ResourceWatch {
    /// Extraction and publish for one observed mutation. Synchronous and
    /// bounded-time; errors are logged and swallowed.
    fn observe(&self, resource_type: &str, body: &[u8]) {
        let payload: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    resource_type,
                    error = %err,
                    "Mutation response body is not JSON; skipping update notification"
                );
                return;
            }
        };

        match self.extractor.extract(resource_type, &payload) {
            Ok(envelope) => match self.sender.try_publish(envelope) {
                Ok(()) => {
                    tracing::debug!(resource_type, "Queued resource update");
                }
                Err(PublishError::ChannelFull) => {
                    tracing::warn!(
                        resource_type,
                        dropped_total = self.sender.dropped_count(),
                        "Update channel full; envelope dropped"
                    );
                }
                Err(PublishError::Closed) => {
                    tracing::warn!(resource_type, "Update channel closed; envelope discarded");
                }
            },
            Err(err) => {
                tracing::warn!(
                    resource_type,
                    missing = err.missing(),
                    error = %err,
                    "Skipping update notification"
                );
            }
        }
    }
}

/// Middleware entry point installed per watched resource type.
pub async fn observe_mutation(
    State(watch): State<ResourceWatch>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let resource_type = leading_segment(req.uri().path()).to_string();

    let response = next.run(req).await;

    // Only successful create/update outcomes are observed; everything else
    // passes through untouched.
    if !matches!(method, Method::POST | Method::PUT) || !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(
                resource_type = %resource_type,
                error = %err,
                "Failed to buffer mutation response body"
            );
            return Response::from_parts(parts, Body::empty());
        }
    };

    watch.observe(&resource_type, &bytes);

    Response::from_parts(parts, Body::from(bytes))
}

/// First path segment: the resource-type name the route group was
/// registered under.
fn leading_segment(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}
