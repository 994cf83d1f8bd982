use tracing::debug;

use crate::classify::{KeywordTable, ResourceKind, resource_kinds};
use crate::context::{CreatedResource, RunContext};
use crate::http::method::HttpMethod;
use crate::http::response::HttpResponse;

use super::ExpectedStatusPolicy;

/// Verdict for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub passed: bool,
    pub message: String,
    pub captured: Option<CreatedResource>,
}

/// Checks statuses against the policy and captures identifiers of
/// resources created by POST/PUT.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    policy: ExpectedStatusPolicy,
    kinds: KeywordTable<ResourceKind>,
}

impl ResponseValidator {
    pub fn new(policy: ExpectedStatusPolicy) -> Self {
        Self {
            policy,
            kinds: resource_kinds(),
        }
    }

    pub fn with_kinds(mut self, kinds: KeywordTable<ResourceKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn policy(&self) -> &ExpectedStatusPolicy {
        &self.policy
    }

    /// Infers the resource kind from the URL, falling back to a generic one.
    pub fn resource_kind(&self, url: &str) -> ResourceKind {
        self.kinds
            .deepest_match(url_path(url))
            .cloned()
            .unwrap_or_else(ResourceKind::generic)
    }

    pub fn validate(
        &self,
        method: HttpMethod,
        url: &str,
        response: &HttpResponse,
        ctx: &mut RunContext,
    ) -> Validation {
        if !self.policy.allows(method, response.status) {
            let detail = response
                .error
                .as_deref()
                .map(|error| format!(" ({error})"))
                .unwrap_or_default();
            return Validation {
                passed: false,
                message: format!(
                    "status {} not in {:?} for {method}{detail}",
                    response.status,
                    self.policy.allowed(method)
                ),
                captured: None,
            };
        }

        let captured = self.capture(method, url, response, ctx);
        let message = match &captured {
            Some(resource) => format!(
                "status {} accepted; created {} at {}",
                response.status, resource.resource_type, resource.endpoint
            ),
            None => format!("status {} accepted", response.status),
        };

        Validation {
            passed: true,
            message,
            captured,
        }
    }

    fn capture(
        &self,
        method: HttpMethod,
        url: &str,
        response: &HttpResponse,
        ctx: &mut RunContext,
    ) -> Option<CreatedResource> {
        if !method.creates_resources() || !response.is_success() {
            return None;
        }
        let id = response.numeric_id()?;
        let kind = self.resource_kind(url);
        let resource = CreatedResource {
            resource_type: kind.resource_type.clone(),
            endpoint: resource_endpoint(url, id),
        };

        ctx.set_identifier(&kind.id_key, id);
        debug!(id_key = %kind.id_key, id, "captured identifier");

        if ctx.record_created(resource.clone()) {
            Some(resource)
        } else {
            None
        }
    }
}

fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |index| &rest[index..]),
        None => without_query,
    }
}

/// URL of a created resource: the request URL when it already ends with
/// the id (PUT), otherwise the collection URL with `<id>/` appended.
fn resource_endpoint(url: &str, id: u64) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = base.trim_end_matches('/');
    let id_text = id.to_string();
    if trimmed.rsplit('/').next() == Some(id_text.as_str()) {
        return format!("{trimmed}/");
    }
    format!("{trimmed}/{id_text}/")
}
