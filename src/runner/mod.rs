//! # Replay runner
//!
//! Replays a corpus strictly in order, one request in flight at a time.
//! Every endpoint is an independent case: a failing case is recorded and
//! the run moves on.

use std::time::Instant;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::auth::{TokenChoice, TokenSet, authenticate_all};
use crate::cleanup::run_cleanup;
use crate::config::RunnerConfig;
use crate::context::RunContext;
use crate::corpus::{Corpus, PlannedEndpoint};
use crate::environment::VariableResolver;
use crate::error::Result;
use crate::fixtures::FixtureGenerator;
use crate::http::client::Executor;
use crate::http::request::RequestInput;
use crate::testing::{CaseResult, CaseStatus, ExpectedStatusPolicy, ResponseValidator, RunReport};

/// Options that vary per invocation rather than per target.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Replay only these categories; empty means all.
    pub categories: Vec<String>,
}

pub struct Runner {
    config: RunnerConfig,
    executor: Executor,
    resolver: VariableResolver,
    validator: ResponseValidator,
    fixtures: FixtureGenerator,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        let executor = Executor::new(&config.executor_settings())?;
        let resolver = VariableResolver::new(&config.base_url, &config.variables);
        let validator = ResponseValidator::new(ExpectedStatusPolicy::with_overrides(&config.status_policy)?);
        let fixtures = FixtureGenerator::new(config.seed);

        Ok(Self {
            config,
            executor,
            resolver,
            validator,
            fixtures,
        })
    }

    pub fn with_fixtures(mut self, fixtures: FixtureGenerator) -> Self {
        self.fixtures = fixtures;
        self
    }

    #[instrument(skip_all, fields(base_url = %self.config.base_url))]
    pub async fn run(&mut self, corpus: &Corpus, options: &RunOptions) -> RunReport {
        let started = Instant::now();
        let plan = corpus.plan(&options.categories);
        info!(endpoints = plan.len(), "starting replay");

        let tokens = authenticate_all(
            &self.executor,
            self.resolver.base_url(),
            &self.config.login_path,
            &self.config.roles,
        )
        .await;

        let mut report = RunReport {
            base_url: self.resolver.base_url().to_string(),
            ..RunReport::default()
        };
        for role in &self.config.roles {
            if tokens.get(&role.name).is_some() {
                report.authenticated_roles.push(role.name.clone());
            } else {
                report.failed_roles.push(role.name.clone());
            }
        }

        let mut ctx = RunContext::new();
        for entry in plan {
            let result = self.run_case(entry, &tokens, &mut ctx).await;
            match result.status {
                CaseStatus::Passed => info!(name = %result.name, url = %result.url, "{}", result.message),
                CaseStatus::Failed => warn!(name = %result.name, url = %result.url, "{}", result.message),
                CaseStatus::Skipped => info!(name = %result.name, url = %result.url, "skipped: {}", result.message),
            }
            report.push(result);
        }

        report.created_resources = ctx.created_resources().to_vec();
        if self.config.cleanup {
            let token = tokens.most_privileged().map(|(_, token)| token);
            report.cleanup = run_cleanup(&self.executor, &mut ctx, token).await;
        }

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "replay finished"
        );
        report
    }

    async fn run_case(&mut self, entry: PlannedEndpoint<'_>, tokens: &TokenSet, ctx: &mut RunContext) -> CaseResult {
        let descriptor = entry.descriptor;
        let url = self.resolver.resolve_url(&descriptor.url_template, ctx);
        let mut result = CaseResult {
            name: descriptor.name.clone(),
            category: entry.category.to_string(),
            method: descriptor.method,
            url: url.clone(),
            status: CaseStatus::Skipped,
            http_status: None,
            role: None,
            message: String::new(),
            duration_ms: 0,
        };

        let token = match tokens.appropriate_token(&url) {
            TokenChoice::Token { role, token } => {
                result.role = Some(role.to_string());
                Some(token)
            }
            TokenChoice::Missing { role } => {
                result.role = Some(role.to_string());
                result.message = format!("no token for role `{role}`");
                return result;
            }
            TokenChoice::Anonymous => None,
        };

        let body: Option<Value> = descriptor.method.carries_body().then(|| {
            let kind = self.validator.resource_kind(&url);
            self.fixtures
                .generate(descriptor.example_body.as_ref(), &kind.resource_type)
        });

        let mut request = RequestInput::new(descriptor.method, url.as_str())
            .with_headers(descriptor.header_pairs())
            .with_bearer(token);
        request.body = body;

        let response = self.executor.send(&request).await;
        let validation = self.validator.validate(descriptor.method, &url, &response, ctx);

        result.http_status = Some(response.status);
        result.duration_ms = response.duration_ms;
        result.message = validation.message;
        result.status = if validation.passed {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        result
    }
}

/// Builds a runner and replays the corpus once.
pub async fn replay(corpus: &Corpus, config: RunnerConfig, options: &RunOptions) -> Result<RunReport> {
    let mut runner = Runner::new(config)?;
    Ok(runner.run(corpus, options).await)
}
