//! # Endpoint corpus
//!
//! A corpus file is the flat list of recorded endpoints a run replays:
//!
//! ```json
//! { "summary": {...}, "categories": {"agents": [...]}, "allEndpoints": [...] }
//! ```
//!
//! Descriptors are read once per run and never modified.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::categorize;
use crate::error::{ReplayError, Result};
use crate::http::method::HttpMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub name: String,
    pub method: HttpMethod,
    #[serde(rename = "url", alias = "urlTemplate")]
    pub url_template: String,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
    #[serde(default, rename = "body", alias = "exampleBody", skip_serializing_if = "Option::is_none")]
    pub example_body: Option<Value>,
    #[serde(default)]
    pub description: String,
}

impl EndpointDescriptor {
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|header| (header.key.clone(), header.value.clone()))
            .collect()
    }

    fn identity(&self) -> (HttpMethod, &str, &str) {
        (self.method, self.url_template.as_str(), self.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusSummary {
    #[serde(default)]
    pub total_endpoints: usize,
    #[serde(default)]
    pub by_method: BTreeMap<String, usize>,
    #[serde(default)]
    pub by_category: BTreeMap<String, usize>,
}

impl CorpusSummary {
    pub fn from_categories(categories: &BTreeMap<String, Vec<EndpointDescriptor>>) -> Self {
        let mut summary = CorpusSummary::default();
        for (category, endpoints) in categories {
            summary.by_category.insert(category.clone(), endpoints.len());
            summary.total_endpoints += endpoints.len();
            for endpoint in endpoints {
                *summary.by_method.entry(endpoint.method.to_string()).or_default() += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corpus {
    #[serde(default)]
    pub summary: CorpusSummary,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<EndpointDescriptor>>,
    #[serde(default)]
    pub all_endpoints: Vec<EndpointDescriptor>,
}

/// One endpoint scheduled for replay, with the category it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct PlannedEndpoint<'a> {
    pub category: &'a str,
    pub descriptor: &'a EndpointDescriptor,
}

impl Corpus {
    /// Groups descriptors by URL category and computes the summary.
    pub fn from_endpoints(endpoints: Vec<EndpointDescriptor>) -> Self {
        let mut categories: BTreeMap<String, Vec<EndpointDescriptor>> = BTreeMap::new();
        for endpoint in &endpoints {
            categories
                .entry(categorize(&endpoint.url_template))
                .or_default()
                .push(endpoint.clone());
        }
        Self {
            summary: CorpusSummary::from_categories(&categories),
            categories,
            all_endpoints: endpoints,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let corpus: Corpus = serde_json::from_str(raw)?;
        if corpus.all_endpoints.is_empty() && corpus.categories.values().all(Vec::is_empty) {
            return Err(ReplayError::InvalidCorpus("corpus contains no endpoints".into()));
        }
        Ok(corpus)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| ReplayError::io(path, err))?;
        Self::from_json(&raw)
    }

    /// Endpoints in replay order. `allEndpoints` is authoritative; a corpus
    /// that only carries `categories` is flattened in category order.
    /// A non-empty `only` keeps the listed categories.
    pub fn plan(&self, only: &[String]) -> Vec<PlannedEndpoint<'_>> {
        let planned: Vec<PlannedEndpoint<'_>> = if self.all_endpoints.is_empty() {
            self.categories
                .iter()
                .flat_map(|(category, endpoints)| {
                    endpoints.iter().map(move |descriptor| PlannedEndpoint {
                        category: category.as_str(),
                        descriptor,
                    })
                })
                .collect()
        } else {
            let index: HashMap<(HttpMethod, &str, &str), &str> = self
                .categories
                .iter()
                .flat_map(|(category, endpoints)| {
                    endpoints
                        .iter()
                        .map(move |endpoint| (endpoint.identity(), category.as_str()))
                })
                .collect();

            self.all_endpoints
                .iter()
                .map(|descriptor| PlannedEndpoint {
                    category: index
                        .get(&descriptor.identity())
                        .copied()
                        .unwrap_or(crate::classify::OTHER_CATEGORY),
                    descriptor,
                })
                .collect()
        };

        if only.is_empty() {
            return planned;
        }
        planned
            .into_iter()
            .filter(|entry| only.iter().any(|name| name.eq_ignore_ascii_case(entry.category)))
            .collect()
    }

    /// Endpoint counts per category, recomputed from the descriptors.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.plan(&[]) {
            *counts.entry(entry.category.to_string()).or_default() += 1;
        }
        counts
    }
}
