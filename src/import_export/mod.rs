//! # Import
//!
//! Builds an endpoint corpus from a Postman Collection v2.1 export. Folders
//! are flattened in document order; each request becomes one descriptor and
//! descriptors are grouped into categories by URL.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::corpus::{Corpus, EndpointDescriptor, HeaderEntry};
use crate::error::{ReplayError, Result};
use crate::http::method::HttpMethod;

#[derive(Debug, Deserialize)]
struct PostmanCollection {
    #[serde(default)]
    item: Vec<PostmanItem>,
}

#[derive(Debug, Deserialize)]
struct PostmanItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    item: Vec<PostmanItem>,
    #[serde(default)]
    request: Option<PostmanRequest>,
}

#[derive(Debug, Deserialize)]
struct PostmanRequest {
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    header: Vec<PostmanHeader>,
    #[serde(default)]
    url: Option<PostmanUrl>,
    #[serde(default)]
    body: Option<PostmanBody>,
    #[serde(default)]
    description: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Deserialize)]
struct PostmanHeader {
    key: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostmanUrl {
    Raw(String),
    Detailed {
        #[serde(default)]
        raw: String,
    },
}

impl PostmanUrl {
    fn raw(&self) -> &str {
        match self {
            PostmanUrl::Raw(raw) => raw,
            PostmanUrl::Detailed { raw } => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostmanBody {
    #[serde(default)]
    mode: String,
    #[serde(default)]
    raw: Option<String>,
}

/// Parses a Postman v2.1 collection into a corpus. Requests with methods
/// outside GET/POST/PUT/PATCH/DELETE are skipped.
pub fn corpus_from_postman(raw: &str) -> Result<Corpus> {
    let collection: PostmanCollection = serde_json::from_str(raw)?;
    let mut endpoints = Vec::new();
    collect(&collection.item, &mut endpoints);

    if endpoints.is_empty() {
        return Err(ReplayError::InvalidCorpus(
            "collection contains no importable requests".into(),
        ));
    }
    Ok(Corpus::from_endpoints(endpoints))
}

pub fn import_postman_file(path: &Path) -> Result<Corpus> {
    let raw = fs::read_to_string(path).map_err(|err| ReplayError::io(path, err))?;
    corpus_from_postman(&raw)
}

fn collect(items: &[PostmanItem], out: &mut Vec<EndpointDescriptor>) {
    for item in items {
        if let Some(request) = &item.request {
            match descriptor_from(item, request) {
                Some(descriptor) => out.push(descriptor),
                None => warn!(name = %item.name, method = %request.method, "skipping unsupported request"),
            }
        }
        collect(&item.item, out);
    }
}

fn descriptor_from(item: &PostmanItem, request: &PostmanRequest) -> Option<EndpointDescriptor> {
    let method: HttpMethod = request.method.parse().ok()?;
    let url = request.url.as_ref().map(PostmanUrl::raw).unwrap_or_default();
    if url.trim().is_empty() {
        return None;
    }

    let example_body = request
        .body
        .as_ref()
        .filter(|body| body.mode.is_empty() || body.mode == "raw")
        .and_then(|body| body.raw.as_deref())
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(_) => {
                debug!(name = %item.name, "keeping non-JSON body as text");
                Value::String(raw.to_string())
            }
        });

    let description = match &request.description {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(fields)) => fields
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    Some(EndpointDescriptor {
        name: item.name.clone(),
        method,
        url_template: url.trim().to_string(),
        headers: request
            .header
            .iter()
            .filter(|header| !header.disabled)
            .map(|header| HeaderEntry {
                key: header.key.clone(),
                value: header.value.clone(),
            })
            .collect(),
        example_body,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLLECTION: &str = r#"{
        "info": {"name": "Platform API", "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"},
        "item": [
            {"name": "Auth", "item": [
                {"name": "Login", "request": {
                    "method": "POST",
                    "header": [{"key": "Content-Type", "value": "application/json"},
                               {"key": "X-Debug", "value": "1", "disabled": true}],
                    "body": {"mode": "raw", "raw": "{\"email\": \"{{email}}\", \"password\": \"{{password}}\"}"},
                    "url": {"raw": "{{baseUrl}}/api/auth/login/", "host": ["{{baseUrl}}"]}
                }}
            ]},
            {"name": "Agents", "item": [
                {"name": "List agents", "request": {"method": "GET", "url": "{{baseUrl}}/agents/api/",
                    "description": {"content": "All agents"}}},
                {"name": "Head agents", "request": {"method": "HEAD", "url": "{{baseUrl}}/agents/api/"}}
            ]},
            {"name": "Notes", "request": {"method": "PUT", "url": "{{baseUrl}}/misc/notes/1/",
                "body": {"mode": "raw", "raw": "plain text"}, "description": "Update note"}}
        ]
    }"#;

    #[test]
    fn imports_nested_folders_in_order() {
        let corpus = corpus_from_postman(COLLECTION).unwrap();
        let names: Vec<_> = corpus.all_endpoints.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Login", "List agents", "Notes"]);
        assert_eq!(corpus.summary.total_endpoints, 3);
        assert_eq!(corpus.summary.by_category.get("authentication"), Some(&1));
        assert_eq!(corpus.summary.by_category.get("agents"), Some(&1));
        assert_eq!(corpus.summary.by_category.get("other"), Some(&1));
    }

    #[test]
    fn raw_json_bodies_are_parsed() {
        let corpus = corpus_from_postman(COLLECTION).unwrap();
        let login = &corpus.all_endpoints[0];
        assert_eq!(login.method, HttpMethod::Post);
        assert_eq!(login.url_template, "{{baseUrl}}/api/auth/login/");
        assert_eq!(
            login.example_body,
            Some(json!({"email": "{{email}}", "password": "{{password}}"}))
        );
        assert_eq!(login.headers.len(), 1);
    }

    #[test]
    fn descriptions_and_text_bodies() {
        let corpus = corpus_from_postman(COLLECTION).unwrap();
        assert_eq!(corpus.all_endpoints[1].description, "All agents");
        assert_eq!(corpus.all_endpoints[2].description, "Update note");
        assert_eq!(corpus.all_endpoints[2].example_body, Some(json!("plain text")));
    }

    #[test]
    fn imported_corpus_round_trips_through_the_corpus_format() {
        let corpus = corpus_from_postman(COLLECTION).unwrap();
        let raw = serde_json::to_string(&corpus).unwrap();
        let reloaded = Corpus::from_json(&raw).unwrap();
        assert_eq!(reloaded, corpus);
    }

    #[test]
    fn empty_collection_is_rejected() {
        assert!(corpus_from_postman(r#"{"item": []}"#).is_err());
    }
}
