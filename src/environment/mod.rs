//! # Variable resolution
//!
//! Expands a recorded URL template into a concrete URL:
//!
//! - `{{baseUrl}}` becomes the configured base URL
//! - other `{{name}}` tokens come from configured variables, then from
//!   identifiers captured earlier in the run
//! - `:name` path segments come from captured identifiers
//!
//! Anything that cannot be resolved yet stays in the URL as written.

use std::collections::HashMap;

use tracing::debug;

use crate::classify::{KeywordTable, ResourceKind, resource_kinds};
use crate::context::RunContext;

pub const BASE_URL_VARIABLE: &str = "baseUrl";

#[derive(Debug, Clone)]
pub struct VariableResolver {
    variables: HashMap<String, String>,
    kinds: KeywordTable<ResourceKind>,
}

impl VariableResolver {
    pub fn new(base_url: &str, variables: &HashMap<String, String>) -> Self {
        let mut merged = variables.clone();
        merged.insert(
            BASE_URL_VARIABLE.to_string(),
            base_url.trim_end_matches('/').to_string(),
        );
        Self {
            variables: merged,
            kinds: resource_kinds(),
        }
    }

    pub fn with_kinds(mut self, kinds: KeywordTable<ResourceKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn base_url(&self) -> &str {
        self.variables
            .get(BASE_URL_VARIABLE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn resolve_url(&self, template: &str, ctx: &RunContext) -> String {
        let mut url = interpolate(template.trim(), &self.variables);

        if url.contains("{{") {
            let captured: HashMap<String, String> = ctx
                .identifiers()
                .iter()
                .map(|(key, id)| (key.clone(), id.to_string()))
                .collect();
            url = interpolate(&url, &captured);
        }

        let resolved = self.resolve_path_placeholders(&url, ctx);
        if resolved.contains("{{") || has_path_placeholder(&resolved) {
            debug!(url = %resolved, "url still contains unresolved placeholders");
        }
        resolved
    }

    fn resolve_path_placeholders(&self, url: &str, ctx: &RunContext) -> String {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };

        let segments: Vec<&str> = path.split('/').collect();
        let mut resolved: Vec<String> = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let replacement = placeholder_name(segment).and_then(|name| {
                let previous = index.checked_sub(1).map(|i| segments[i]).unwrap_or_default();
                self.lookup_placeholder(name, previous, ctx)
            });
            resolved.push(replacement.map_or_else(|| (*segment).to_string(), |id| id.to_string()));
        }

        let mut out = resolved.join("/");
        if let Some(query) = query {
            out.push('?');
            out.push_str(query);
        }
        out
    }

    /// `:id` takes its meaning from the segment before it
    /// (`/hospitals/:id/` means `hospitalId`) and stays literal until that
    /// identifier is captured. Only when the segment names no known resource
    /// kind is the last captured identifier used, as a best guess. Named
    /// placeholders such as `:doctor_id` map to the camel-cased context key
    /// (`doctorId`).
    fn lookup_placeholder(&self, name: &str, previous_segment: &str, ctx: &RunContext) -> Option<u64> {
        if name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("pk") {
            return match self.kinds.deepest_match(previous_segment) {
                Some(kind) => ctx.identifier(&kind.id_key),
                None => ctx.last_identifier(),
            };
        }
        ctx.identifier(&snake_to_camel(name))
    }
}

/// Interpolate `{{key}}` placeholders in a string using the provided variable map.
pub fn interpolate(input: &str, variables: &HashMap<String, String>) -> String {
    let mut result = input.to_string();
    for (key, value) in variables {
        result = result.replace(&format!("{{{{{key}}}}}"), value);
    }
    result
}

fn placeholder_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix(':')
        .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

fn has_path_placeholder(url: &str) -> bool {
    let path = url.split_once('?').map_or(url, |(path, _)| path);
    path.split('/').any(|segment| placeholder_name(segment).is_some())
}

fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
