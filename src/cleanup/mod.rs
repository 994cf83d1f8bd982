//! # Cleanup
//!
//! Deletes the resources a run created, newest first, so children go before
//! their parents. Cleanup is advisory: failures are logged and counted but
//! never change the run's verdict.

use serde::Serialize;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::http::client::Executor;
use crate::http::method::HttpMethod;
use crate::http::request::RequestInput;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
    pub failures: Vec<String>,
}

/// Issues one DELETE per recorded resource, using `token` (the most
/// privileged available) for every call.
pub async fn run_cleanup(executor: &Executor, ctx: &mut RunContext, token: Option<&str>) -> CleanupSummary {
    let mut summary = CleanupSummary::default();

    for resource in ctx.drain_for_cleanup() {
        summary.attempted += 1;
        let request = RequestInput::new(HttpMethod::Delete, resource.endpoint.clone()).with_bearer(token);
        let response = executor.send(&request).await;

        // 404: already gone, for instance removed together with its parent.
        if response.is_success() || response.status == 404 {
            summary.deleted += 1;
            continue;
        }

        summary.failed += 1;
        let reason = response
            .error
            .clone()
            .unwrap_or_else(|| format!("status {}", response.status));
        warn!(
            resource_type = %resource.resource_type,
            endpoint = %resource.endpoint,
            %reason,
            "cleanup delete failed"
        );
        summary.failures.push(format!("{}: {reason}", resource.endpoint));
    }

    if summary.attempted > 0 {
        info!(
            attempted = summary.attempted,
            deleted = summary.deleted,
            failed = summary.failed,
            "cleanup finished"
        );
    }
    summary
}
