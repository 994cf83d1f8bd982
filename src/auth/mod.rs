//! # Authentication
//!
//! Logs every configured role in once per run and picks the bearer token to
//! attach to each endpoint from URL keywords (`/admin/`, `/doctor/`, ...).
//! Role selection is a heuristic; ambiguous URLs may get the wrong role.

use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::classify::KeywordTable;
use crate::config::RoleConfig;
use crate::http::client::Executor;
use crate::http::method::HttpMethod;
use crate::http::request::RequestInput;

/// Email/password pair posted to the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl From<&RoleConfig> for Credentials {
    fn from(role: &RoleConfig) -> Self {
        Self {
            email: role.email.clone(),
            password: role.password.clone(),
        }
    }
}

/// Reads a bearer token from a login response body.
///
/// The two target platforms disagree on the shape: one answers
/// `{"token": "..."}`, the other `{"tokens": {"access": "..."}}`. Both are
/// tried, in that order.
pub fn extract_token(body: &Value) -> Option<String> {
    let candidates = [body.get("token"), body.pointer("/tokens/access")];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

pub fn login_url(base_url: &str, login_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        login_path.trim_start_matches('/')
    )
}

/// One login attempt. Any outcome other than HTTP 200 with a token is
/// `None`; the caller decides what to skip.
#[instrument(skip(executor, credentials), fields(email = %credentials.email))]
pub async fn login(
    executor: &Executor,
    base_url: &str,
    login_path: &str,
    credentials: &Credentials,
) -> Option<String> {
    let request = RequestInput::new(HttpMethod::Post, login_url(base_url, login_path)).with_body(json!({
        "email": credentials.email,
        "password": credentials.password,
    }));
    let response = executor.send(&request).await;

    if response.status != 200 {
        warn!(status = response.status, error = ?response.error, "login rejected");
        return None;
    }

    let token = extract_token(&response.body);
    if token.is_none() {
        warn!("login succeeded but response carried no token");
    }
    token
}

/// What the run should do about authentication for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenChoice<'a> {
    Token { role: &'a str, token: &'a str },
    /// The URL demands a role whose login failed.
    Missing { role: &'a str },
    /// No role configured or logged in; send without credentials.
    Anonymous,
}

/// Role name to bearer token, in privilege order (most privileged first).
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    roles: Vec<String>,
    tokens: Vec<(String, String)>,
    keywords: KeywordTable<String>,
}

impl TokenSet {
    /// An empty set that knows the configured roles and their URL keywords.
    pub fn for_roles(roles: &[RoleConfig]) -> Self {
        let mut keywords = KeywordTable::new();
        for role in roles {
            if role.url_keywords.is_empty() {
                keywords.push(&format!("/{}/", role.name), role.name.clone());
            } else {
                for keyword in &role.url_keywords {
                    keywords.push(keyword, role.name.clone());
                }
            }
        }
        Self {
            roles: roles.iter().map(|role| role.name.clone()).collect(),
            tokens: Vec::new(),
            keywords,
        }
    }

    pub fn insert(&mut self, role: &str, token: String) {
        self.tokens.retain(|(existing, _)| existing != role);
        self.tokens.push((role.to_string(), token));
        let roles = &self.roles;
        self.tokens
            .sort_by_key(|(name, _)| roles.iter().position(|r| r == name).unwrap_or(usize::MAX));
    }

    pub fn get(&self, role: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(name, _)| name == role)
            .map(|(_, token)| token.as_str())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn most_privileged(&self) -> Option<(&str, &str)> {
        self.tokens
            .first()
            .map(|(role, token)| (role.as_str(), token.as_str()))
    }

    /// Role an URL asks for, judged by the role keyword table.
    pub fn required_role(&self, url: &str) -> Option<&str> {
        self.keywords.first_match(url).map(String::as_str)
    }

    pub fn appropriate_token(&self, url: &str) -> TokenChoice<'_> {
        if let Some(role) = self.required_role(url) {
            return match self.get(role) {
                Some(token) => TokenChoice::Token { role, token },
                None => TokenChoice::Missing { role },
            };
        }
        match self.most_privileged() {
            Some((role, token)) => TokenChoice::Token { role, token },
            None => TokenChoice::Anonymous,
        }
    }
}

/// Logs in every configured role, keeping the tokens that succeeded.
pub async fn authenticate_all(
    executor: &Executor,
    base_url: &str,
    login_path: &str,
    roles: &[RoleConfig],
) -> TokenSet {
    let mut tokens = TokenSet::for_roles(roles);
    for role in roles {
        match login(executor, base_url, login_path, &Credentials::from(role)).await {
            Some(token) => {
                info!(role = %role.name, "authenticated");
                tokens.insert(&role.name, token);
            }
            None => warn!(role = %role.name, "authentication failed; endpoints for this role will be skipped"),
        }
    }
    tokens
}
