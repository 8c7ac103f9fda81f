//! Forwarding multiplexer.
//!
//! # Responsibilities
//! - Forward to the effective primary and hand its result back
//! - Spawn one independent task per secondary route
//! - Deliver each secondary outcome (response or failure) to the recorder
//!
//! # Design Decisions
//! - Secondaries are spawned before the primary call starts
//! - `SecondaryDispatch` is the completion signal for the spawned tasks;
//!   dropping it detaches them, it never cancels them

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::forwarding::{ForwardError, ForwardRequest, Upstream, UpstreamResponse};
use crate::model::{RouteDescriptor, RouteResult};
use crate::observability::metrics;
use crate::recorder::TransactionRecorder;
use crate::routing::RouteSelection;

/// Result of a multiplexed forward.
pub struct Forwarded {
    pub primary: Result<UpstreamResponse, ForwardError>,
    pub secondaries: SecondaryDispatch,
}

/// Handles to in-flight secondary route tasks.
#[derive(Debug, Default)]
pub struct SecondaryDispatch {
    handles: Vec<JoinHandle<()>>,
}

impl SecondaryDispatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every secondary task has delivered its outcome.
    /// Returns the number of tasks that ran to completion.
    pub async fn settled(self) -> usize {
        let mut completed = 0;
        for handle in self.handles {
            match handle.await {
                Ok(()) => completed += 1,
                Err(e) => tracing::error!(error = %e, "Secondary route task aborted"),
            }
        }
        completed
    }
}

#[derive(Clone)]
pub struct Multiplexer {
    upstream: Arc<dyn Upstream>,
    recorder: TransactionRecorder,
    default_timeout: Duration,
}

impl Multiplexer {
    pub fn new(upstream: Arc<dyn Upstream>, recorder: TransactionRecorder, default_timeout: Duration) -> Self {
        Self {
            upstream,
            recorder,
            default_timeout,
        }
    }

    /// Forward `request` along `selection` for transaction `transaction_id`.
    pub async fn forward(
        &self,
        transaction_id: Uuid,
        request: Arc<ForwardRequest>,
        selection: RouteSelection,
    ) -> Forwarded {
        let secondaries = self.dispatch_secondaries(transaction_id, request.clone(), selection.secondaries);
        let primary = self.call(&selection.primary, &request, "primary").await;
        Forwarded { primary, secondaries }
    }

    fn dispatch_secondaries(
        &self,
        transaction_id: Uuid,
        request: Arc<ForwardRequest>,
        routes: Vec<RouteDescriptor>,
    ) -> SecondaryDispatch {
        let handles = routes
            .into_iter()
            .map(|route| {
                let this = self.clone();
                let request = request.clone();
                tokio::spawn(async move {
                    let result = match this.call(&route, &request, "secondary").await {
                        Ok(response) => RouteResult::Response(response.recorded()),
                        Err(e) => {
                            tracing::warn!(
                                transaction_id = %transaction_id,
                                route = %route.name,
                                error = %e,
                                "Secondary route failed"
                            );
                            RouteResult::Failure { error: e.to_string() }
                        }
                    };

                    if let Err(e) = this
                        .recorder
                        .append_secondary(transaction_id, &route.name, request.recorded_for(&route), result)
                        .await
                    {
                        tracing::error!(
                            transaction_id = %transaction_id,
                            route = %route.name,
                            error = %e,
                            "Failed to record secondary route outcome"
                        );
                    }
                })
            })
            .collect();

        SecondaryDispatch { handles }
    }

    async fn call(
        &self,
        route: &RouteDescriptor,
        request: &ForwardRequest,
        kind: &'static str,
    ) -> Result<UpstreamResponse, ForwardError> {
        let timeout = route.timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();

        tracing::debug!(route = %route.name, target = %route.authority(), kind, "Forwarding to route");
        let result = self.upstream.send(route, request, timeout).await;

        let outcome = match &result {
            Ok(r) => r.status.as_str().to_string(),
            Err(e) if e.is_timeout() => "timeout".to_string(),
            Err(_) => "error".to_string(),
        };
        metrics::record_route_call(&route.name, kind, &outcome, start);
        result
    }
}
