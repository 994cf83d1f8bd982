//! # Runner configuration
//!
//! Precedence (highest wins): command-line flags, `REPLAY_*` environment
//! variables, the TOML config file, built-in defaults.
//!
//! ```toml
//! base_url = "https://staging.example.com"
//! login_path = "/api/auth/login/"
//! timeout_ms = 30000
//!
//! [[roles]]
//! name = "superUser"
//! email = "root@example.com"
//! password = "..."
//!
//! [status_policy]
//! DELETE = [200, 204, 404]
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};
use crate::http::client::ExecutorSettings;

pub const ENV_BASE_URL: &str = "REPLAY_BASE_URL";
pub const ENV_LOGIN_PATH: &str = "REPLAY_LOGIN_PATH";
pub const ENV_TIMEOUT_MS: &str = "REPLAY_TIMEOUT_MS";
pub const ENV_RETRY_COUNT: &str = "REPLAY_RETRY_COUNT";
const ENV_PREFIX: &str = "REPLAY_";

pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/login/";

/// Login credentials for one role. Roles are listed most privileged first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// URL substrings that require this role. Defaults to `/<name>/`.
    #[serde(default)]
    pub url_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub base_url: String,
    pub login_path: String,
    pub timeout_ms: u64,
    /// Extra attempts after a transport error. POST and PUT are never
    /// retried, since a timed-out create may still have been applied.
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub verify_ssl: bool,
    pub cleanup: bool,
    pub seed: Option<u64>,
    pub roles: Vec<RoleConfig>,
    pub variables: HashMap<String, String>,
    /// Per-method replacement of the accepted status codes, keyed by
    /// method name (`GET`, `POST`, ...).
    pub status_policy: BTreeMap<String, Vec<u16>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let transport = ExecutorSettings::default();
        Self {
            base_url: String::new(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout_ms: transport.timeout_ms,
            retry_count: transport.retry_count,
            retry_delay_ms: transport.retry_delay_ms,
            verify_ssl: transport.verify_ssl,
            cleanup: true,
            seed: None,
            roles: Vec::new(),
            variables: HashMap::new(),
            status_policy: BTreeMap::new(),
        }
    }
}

impl RunnerConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| ReplayError::io(path, err))?;
        Self::from_toml(&raw)
    }

    /// Applies `REPLAY_*` overrides. Role credentials are read from
    /// `REPLAY_<ROLE>_EMAIL` / `REPLAY_<ROLE>_PASSWORD`; a role named only in
    /// the environment is appended as the least privileged.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(value) = non_empty(env, ENV_BASE_URL) {
            self.base_url = value.to_string();
        }
        if let Some(value) = non_empty(env, ENV_LOGIN_PATH) {
            self.login_path = value.to_string();
        }
        if let Some(value) = non_empty(env, ENV_TIMEOUT_MS) {
            self.timeout_ms = parse_number(ENV_TIMEOUT_MS, value)?;
        }
        if let Some(value) = non_empty(env, ENV_RETRY_COUNT) {
            self.retry_count = parse_number(ENV_RETRY_COUNT, value)?;
        }

        let mut env_roles: Vec<(&str, &str, &str)> = Vec::new();
        for key in env.keys() {
            let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if let Some(role) = rest.strip_suffix("_EMAIL") {
                env_roles.push((role, "email", env[key].as_str()));
            } else if let Some(role) = rest.strip_suffix("_PASSWORD") {
                env_roles.push((role, "password", env[key].as_str()));
            }
        }
        env_roles.sort();

        for (env_role, field, value) in env_roles {
            let index = match self
                .roles
                .iter()
                .position(|role| role.name.eq_ignore_ascii_case(env_role))
            {
                Some(index) => index,
                None => {
                    self.roles.push(RoleConfig {
                        name: env_role.to_ascii_lowercase(),
                        email: String::new(),
                        password: String::new(),
                        url_keywords: Vec::new(),
                    });
                    self.roles.len() - 1
                }
            };
            let role = &mut self.roles[index];
            match field {
                "email" => role.email = value.to_string(),
                _ => role.password = value.to_string(),
            }
        }

        Ok(())
    }

    pub fn apply_process_env(&mut self) -> Result<()> {
        let env: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self.apply_env(&env)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ReplayError::InvalidConfig(
                "base_url is required (config file, REPLAY_BASE_URL or --base-url)".into(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ReplayError::InvalidConfig(format!(
                "base_url must start with http:// or https://, got `{base_url}`"
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ReplayError::InvalidConfig(
                "timeout_ms must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for role in &self.roles {
            if role.name.trim().is_empty() {
                return Err(ReplayError::InvalidConfig("role name cannot be empty".into()));
            }
            if !seen.insert(role.name.to_ascii_lowercase()) {
                return Err(ReplayError::InvalidConfig(format!(
                    "duplicate role `{}`",
                    role.name
                )));
            }
        }

        Ok(())
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            timeout_ms: self.timeout_ms,
            retry_count: self.retry_count,
            retry_delay_ms: self.retry_delay_ms,
            verify_ssl: self.verify_ssl,
        }
    }
}

fn non_empty<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ReplayError::InvalidConfig(format!("{key} must be a number, got `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_sensible() {
        let config = RunnerConfig::default();
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.cleanup);
        assert!(config.verify_ssl);
    }

    #[test]
    fn parses_toml_file() {
        let raw = r#"
            base_url = "https://x.test"
            timeout_ms = 5000
            seed = 9

            [[roles]]
            name = "superUser"
            email = "root@x.test"
            password = "pw"

            [[roles]]
            name = "doctor"
            email = "doc@x.test"
            password = "pw"
            url_keywords = ["/doctor/", "/doctors/me/"]

            [variables]
            tenant = "acme"

            [status_policy]
            DELETE = [200, 204]
        "#;
        let config = RunnerConfig::from_toml(raw).unwrap();

        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.roles.len(), 2);
        assert_eq!(config.roles[1].url_keywords.len(), 2);
        assert_eq!(config.variables.get("tenant").map(String::as_str), Some("acme"));
        assert_eq!(config.status_policy.get("DELETE"), Some(&vec![200, 204]));
        config.validate().unwrap();
    }

    #[test]
    fn invalid_toml_is_reported() {
        let err = RunnerConfig::from_toml("timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ReplayError::Toml(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = RunnerConfig::from_toml(
            "base_url = \"https://file.test\"\n[[roles]]\nname = \"admin\"\nemail = \"a@file\"\npassword = \"x\"\n",
        )
        .unwrap();
        config
            .apply_env(&env(&[
                (ENV_BASE_URL, "https://env.test"),
                (ENV_TIMEOUT_MS, "1500"),
                ("REPLAY_ADMIN_PASSWORD", "from-env"),
                ("REPLAY_DOCTOR_EMAIL", "doc@env"),
                ("REPLAY_DOCTOR_PASSWORD", "doc-pw"),
                ("UNRELATED_EMAIL", "ignored"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "https://env.test");
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.roles[0].email, "a@file");
        assert_eq!(config.roles[0].password, "from-env");
        assert_eq!(config.roles[1].name, "doctor");
        assert_eq!(config.roles[1].email, "doc@env");
        assert_eq!(config.roles[1].password, "doc-pw");
    }

    #[test]
    fn env_rejects_bad_numbers() {
        let mut config = RunnerConfig::default();
        let err = config.apply_env(&env(&[(ENV_TIMEOUT_MS, "fast")])).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidConfig(_)));
    }

    #[test]
    fn validate_requires_base_url() {
        let err = RunnerConfig::default().validate().unwrap_err();
        assert!(matches!(err, ReplayError::InvalidConfig(_)));

        let config = RunnerConfig {
            base_url: "x.test".into(),
            ..RunnerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = RunnerConfig {
            base_url: "https://x.test".into(),
            timeout_ms: 0,
            ..RunnerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ReplayError::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_duplicate_roles() {
        let role = RoleConfig {
            name: "admin".into(),
            email: String::new(),
            password: String::new(),
            url_keywords: Vec::new(),
        };
        let mut twin = role.clone();
        twin.name = "ADMIN".into();
        let config = RunnerConfig {
            base_url: "https://x.test".into(),
            roles: vec![role, twin],
            ..RunnerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
