use serde::Serialize;
use serde_json::Value;

/// Outcome of one request. Transport failures are carried as data with
/// `status == 0` and the error text in `error`.
#[derive(Debug, Clone, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    pub duration_ms: u64,
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            duration_ms: 0,
            body,
            error: None,
        }
    }

    pub fn transport_error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: 0,
            duration_ms,
            body: Value::Null,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Numeric `id` field of a JSON object body.
    pub fn numeric_id(&self) -> Option<u64> {
        self.body.get("id").and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_id_requires_a_number() {
        assert_eq!(HttpResponse::new(201, json!({"id": 42})).numeric_id(), Some(42));
        assert_eq!(HttpResponse::new(201, json!({"id": "42"})).numeric_id(), None);
        assert_eq!(HttpResponse::new(201, json!([1, 2])).numeric_id(), None);
    }

    #[test]
    fn transport_error_has_zero_status() {
        let response = HttpResponse::transport_error("connection refused", 12);
        assert_eq!(response.status, 0);
        assert!(!response.is_success());
        assert_eq!(response.error.as_deref(), Some("connection refused"));
    }
}
