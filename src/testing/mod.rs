//! # Validation & reports
//!
//! Status-code allow-lists per method, the per-endpoint validator and the
//! run report produced by a replay.

mod validator;

pub use validator::{ResponseValidator, Validation};

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::cleanup::CleanupSummary;
use crate::context::CreatedResource;
use crate::error::{ReplayError, Result};
use crate::http::method::HttpMethod;

/// Accepted status codes per method.
///
/// The defaults are deliberately loose: recorded endpoints are reference
/// material, not a contract. 404 is accepted for every method, which also
/// hides "masked for security" not-found answers behind genuine ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedStatusPolicy {
    allowed: BTreeMap<HttpMethod, BTreeSet<u16>>,
}

impl Default for ExpectedStatusPolicy {
    fn default() -> Self {
        let table: [(HttpMethod, &[u16]); 5] = [
            (HttpMethod::Get, &[200, 201, 401, 403, 404, 500]),
            (HttpMethod::Post, &[200, 201, 400, 401, 403, 404, 405, 409, 422, 500]),
            (HttpMethod::Put, &[200, 201, 204, 400, 401, 403, 404, 405, 422, 500]),
            (HttpMethod::Patch, &[200, 201, 204, 400, 401, 403, 404, 405, 422, 500]),
            (HttpMethod::Delete, &[200, 202, 204, 401, 403, 404, 405, 500]),
        ];
        Self {
            allowed: table
                .into_iter()
                .map(|(method, codes)| (method, codes.iter().copied().collect()))
                .collect(),
        }
    }
}

impl ExpectedStatusPolicy {
    /// Default policy with the listed methods' sets replaced.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<u16>>) -> Result<Self> {
        let mut policy = Self::default();
        for (method, codes) in overrides {
            let method: HttpMethod = method
                .parse()
                .map_err(|err: String| ReplayError::InvalidConfig(format!("status_policy: {err}")))?;
            policy.set(method, codes.iter().copied());
        }
        Ok(policy)
    }

    pub fn set(&mut self, method: HttpMethod, codes: impl IntoIterator<Item = u16>) {
        self.allowed.insert(method, codes.into_iter().collect());
    }

    pub fn allows(&self, method: HttpMethod, status: u16) -> bool {
        self.allowed
            .get(&method)
            .is_some_and(|codes| codes.contains(&status))
    }

    pub fn allowed(&self, method: HttpMethod) -> Vec<u16> {
        self.allowed
            .get(&method)
            .map(|codes| codes.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of replaying one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub category: String,
    pub method: HttpMethod,
    pub url: String,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub message: String,
    pub duration_ms: u64,
}

/// Summary report for a replay run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub authenticated_roles: Vec<String>,
    pub failed_roles: Vec<String>,
    pub results: Vec<CaseResult>,
    pub created_resources: Vec<CreatedResource>,
    pub cleanup: CleanupSummary,
}

impl RunReport {
    pub fn push(&mut self, result: CaseResult) {
        self.total += 1;
        match result.status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::Failed => self.failed += 1,
            CaseStatus::Skipped => self.skipped += 1,
        }
        self.results.push(result);
    }

    /// Skipped cases do not fail a run.
    pub fn passed_overall(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results
            .iter()
            .filter(|result| result.status == CaseStatus::Failed)
    }

    /// Case counts per category: (passed, failed, skipped).
    pub fn by_category(&self) -> BTreeMap<String, (usize, usize, usize)> {
        let mut counts: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
        for result in &self.results {
            let entry = counts.entry(result.category.clone()).or_default();
            match result.status {
                CaseStatus::Passed => entry.0 += 1,
                CaseStatus::Failed => entry.1 += 1,
                CaseStatus::Skipped => entry.2 += 1,
            }
        }
        counts
    }
}
