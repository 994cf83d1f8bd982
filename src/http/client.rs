use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, redirect};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::Result;

use super::request::RequestInput;
use super::response::HttpResponse;

/// Transport settings shared by every request of a run.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub timeout_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub verify_ssl: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_count: 0,
            retry_delay_ms: 1_000,
            verify_ssl: true,
        }
    }
}

/// Sends one request at a time and reports every outcome as an
/// [`HttpResponse`], including transport failures.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
    retry_count: u32,
    retry_delay: Duration,
}

impl Executor {
    pub fn new(settings: &ExecutorSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::limited(10))
            .timeout(Duration::from_millis(settings.timeout_ms));

        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            retry_count: settings.retry_count,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        })
    }

    pub async fn send(&self, request: &RequestInput) -> HttpResponse {
        let headers = match build_headers(&request.headers, request.bearer_token.is_some()) {
            Ok(headers) => headers,
            Err(message) => return HttpResponse::transport_error(message, 0),
        };

        let mut last_error: Option<String> = None;
        let started = Instant::now();

        // A creating request that timed out may already be committed server-side.
        let retries = if request.method.creates_resources() {
            0
        } else {
            self.retry_count
        };

        for attempt in 0..=retries {
            if attempt > 0 {
                debug!(attempt, url = %request.url, "retrying request");
                tokio::time::sleep(self.retry_delay).await;
            }

            let mut builder = self
                .client
                .request(request.method.into(), &request.url)
                .headers(headers.clone());

            if let Some(token) = &request.bearer_token {
                builder = builder.bearer_auth(token);
            }

            if request.method.carries_body() {
                if let Some(body) = &request.body {
                    builder = builder.json(body);
                }
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = match response.bytes().await {
                        Ok(bytes) => parse_body(&bytes),
                        Err(err) => {
                            warn!(url = %request.url, "failed to read response body: {err}");
                            Value::Null
                        }
                    };

                    return HttpResponse {
                        status,
                        duration_ms: elapsed_ms(started),
                        body,
                        error: None,
                    };
                }
                Err(err) => {
                    last_error = Some(format!("Request failed: {err}"));
                }
            }
        }

        HttpResponse::transport_error(
            last_error.unwrap_or_else(|| "Request failed".into()),
            elapsed_ms(started),
        )
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// JSON when the body parses, a JSON string otherwise, `null` when empty.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Recorded `Authorization` headers are dropped when the run attaches its
/// own bearer token.
fn build_headers(input: &[(String, String)], has_bearer: bool) -> std::result::Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| format!("Invalid header name `{key}`: {err}"))?;
        if has_bearer && header_name == AUTHORIZATION {
            continue;
        }
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|err| format!("Invalid header value for `{key}`: {err}"))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor() -> Executor {
        Executor::new(&ExecutorSettings {
            timeout_ms: 2_000,
            ..ExecutorSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn parse_body_falls_back_to_text() {
        assert_eq!(parse_body(b"{\"id\": 3}"), json!({"id": 3}));
        assert_eq!(parse_body(b"<html>"), json!("<html>"));
        assert_eq!(parse_body(b"  "), Value::Null);
    }

    #[test]
    fn build_headers_drops_recorded_authorization() {
        let input = vec![
            ("Authorization".to_string(), "Bearer {{token}}".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        let headers = build_headers(&input, true).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get("accept").unwrap(), "application/json");

        let kept = build_headers(&input, false).unwrap();
        assert!(kept.get(AUTHORIZATION).is_some());
    }

    #[test]
    fn build_headers_rejects_invalid_names() {
        let input = vec![("bad header".to_string(), "x".to_string())];
        assert!(build_headers(&input, false).is_err());
    }

    #[tokio::test]
    async fn sends_json_body_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agents/api/"))
            .and(header("authorization", "Bearer abc"))
            .and(body_json(json!({"name": "x"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let request = RequestInput::new(HttpMethod::Post, format!("{}/agents/api/", server.uri()))
            .with_body(json!({"name": "x"}))
            .with_bearer(Some("abc"));
        let response = executor().send(&request).await;

        assert_eq!(response.status, 201);
        assert_eq!(response.numeric_id(), Some(7));
    }

    #[tokio::test]
    async fn non_success_status_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let request = RequestInput::new(HttpMethod::Get, format!("{}/x/", server.uri()));
        let response = executor().send(&request).await;

        assert_eq!(response.status, 500);
        assert_eq!(response.body, json!("boom"));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_becomes_status_zero() {
        let request = RequestInput::new(HttpMethod::Get, "http://127.0.0.1:1/unreachable/");
        let response = executor().send(&request).await;

        assert_eq!(response.status, 0);
        assert!(response.error.is_some());
    }

    async fn attempts_after_timeouts(verb: HttpMethod) -> usize {
        let server = MockServer::start().await;
        Mock::given(method(verb.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let executor = Executor::new(&ExecutorSettings {
            timeout_ms: 50,
            retry_count: 2,
            retry_delay_ms: 10,
            ..ExecutorSettings::default()
        })
        .unwrap();
        let request = RequestInput::new(verb, format!("{}/items/", server.uri())).with_body(json!({}));
        let response = executor.send(&request).await;
        assert_eq!(response.status, 0);

        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn reads_are_retried_after_transport_errors() {
        assert_eq!(attempts_after_timeouts(HttpMethod::Get).await, 3);
    }

    #[tokio::test]
    async fn creating_requests_are_sent_once() {
        assert_eq!(attempts_after_timeouts(HttpMethod::Post).await, 1);
        assert_eq!(attempts_after_timeouts(HttpMethod::Put).await, 1);
    }

    #[tokio::test]
    async fn timeout_becomes_status_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let executor = Executor::new(&ExecutorSettings {
            timeout_ms: 50,
            ..ExecutorSettings::default()
        })
        .unwrap();
        let request = RequestInput::new(HttpMethod::Get, format!("{}/slow/", server.uri()));
        let response = executor.send(&request).await;

        assert_eq!(response.status, 0);
    }
}
