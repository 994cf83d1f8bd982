//! # Fixture generation
//!
//! Turns a recorded example body into a fresh request body. String fields
//! are rewritten according to the field name (`email`, `phone`, `date`, ...),
//! negative numbers are made positive and the shape of the body is kept.
//! Fields whose names match no keyword keep their recorded value.

use chrono::{DateTime, TimeDelta, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Number, Value};

use crate::classify::KeywordTable;

const FIRST_NAMES: [&str; 8] = [
    "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Avery",
];
const LAST_NAMES: [&str; 8] = [
    "Smith", "Johnson", "Brown", "Garcia", "Miller", "Davis", "Wilson", "Clark",
];
const STREETS: [&str; 4] = ["Main St", "Oak Ave", "Pine Rd", "Cedar Ln"];

/// How a string field is regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Email,
    Password,
    Phone,
    FirstName,
    LastName,
    Username,
    Name,
    Date,
    Time,
    Status,
    Gender,
    Address,
    Url,
    Description,
    Flag,
}

/// Default field-name table. Order matters: the first keyword found in
/// the key wins, so `first_name` is checked before `name`.
pub fn field_kinds() -> KeywordTable<FieldKind> {
    KeywordTable::new()
        .with("email", FieldKind::Email)
        .with("password", FieldKind::Password)
        .with("phone", FieldKind::Phone)
        .with("first_name", FieldKind::FirstName)
        .with("firstname", FieldKind::FirstName)
        .with("last_name", FieldKind::LastName)
        .with("lastname", FieldKind::LastName)
        .with("username", FieldKind::Username)
        .with("name", FieldKind::Name)
        .with("date", FieldKind::Date)
        .with("time", FieldKind::Time)
        .with("status", FieldKind::Status)
        .with("gender", FieldKind::Gender)
        .with("address", FieldKind::Address)
        .with("url", FieldKind::Url)
        .with("website", FieldKind::Url)
        .with("description", FieldKind::Description)
        .with("is_", FieldKind::Flag)
}

pub struct FixtureGenerator {
    rng: StdRng,
    clock: fn() -> DateTime<Utc>,
    kinds: KeywordTable<FieldKind>,
}

impl FixtureGenerator {
    /// A generator seeded from `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            clock: Utc::now,
            kinds: field_kinds(),
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_kinds(mut self, kinds: KeywordTable<FieldKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Builds a request body from a recorded example.
    ///
    /// A string example is parsed as JSON text first. Without a usable
    /// example the body is `{"test_data": "<type>_<timestamp>_<random>"}`.
    pub fn generate(&mut self, example: Option<&Value>, resource_type: &str) -> Value {
        let now = (self.clock)();
        let parsed;
        let example = match example {
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(value) if !value.is_string() => {
                    parsed = value;
                    Some(&parsed)
                }
                _ => None,
            },
            Some(Value::Null) | None => None,
            Some(other) => Some(other),
        };

        match example {
            Some(value) => self.rewrite(None, value, now, resource_type),
            None => {
                let timestamp = now.timestamp_millis();
                let mut map = Map::new();
                map.insert(
                    "test_data".into(),
                    Value::String(format!(
                        "{resource_type}_{timestamp}_{}",
                        self.random_token(8)
                    )),
                );
                Value::Object(map)
            }
        }
    }

    fn rewrite(&mut self, key: Option<&str>, value: &Value, now: DateTime<Utc>, resource_type: &str) -> Value {
        match value {
            Value::Object(fields) => {
                let mut out = Map::with_capacity(fields.len());
                for (field, inner) in fields {
                    out.insert(
                        field.clone(),
                        self.rewrite(Some(field.as_str()), inner, now, resource_type),
                    );
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.rewrite(key, item, now, resource_type))
                    .collect(),
            ),
            Value::Number(number) => Value::Number(absolute(number)),
            Value::String(original) => {
                let kind = key.and_then(|key| self.kinds.first_match(key)).copied();
                match kind {
                    Some(kind) => self.value_for(kind, now, resource_type),
                    None => Value::String(original.clone()),
                }
            }
            other => other.clone(),
        }
    }

    fn value_for(&mut self, kind: FieldKind, now: DateTime<Utc>, resource_type: &str) -> Value {
        let timestamp = now.timestamp_millis();
        let suffix = self.random_token(6).to_ascii_lowercase();
        let text = match kind {
            FieldKind::Email => format!("test.{resource_type}.{timestamp}.{suffix}@example.com"),
            FieldKind::Password => format!("Pw!{suffix}{}", self.rng.gen_range(100..1000)),
            FieldKind::Phone => format!("+1555{:07}", self.rng.gen_range(0..10_000_000)),
            FieldKind::FirstName => self.pick(&FIRST_NAMES).to_string(),
            FieldKind::LastName => self.pick(&LAST_NAMES).to_string(),
            FieldKind::Username => format!("user_{timestamp}_{suffix}"),
            FieldKind::Name => format!("Test {} {suffix}", capitalize(resource_type)),
            FieldKind::Date => {
                let days_ahead = self.rng.gen_range(1..=30);
                format_date(now + TimeDelta::days(days_ahead))
            }
            FieldKind::Time => format!("{:02}:{:02}", self.rng.gen_range(9..17), self.pick(&[0, 15, 30, 45])),
            FieldKind::Status => "active".to_string(),
            FieldKind::Gender => self.pick(&["male", "female", "other"]).to_string(),
            FieldKind::Address => format!(
                "{} {}",
                self.rng.gen_range(1..9999),
                self.pick(&STREETS)
            ),
            FieldKind::Url => format!("https://example.com/{resource_type}/{suffix}"),
            FieldKind::Description => format!("Generated {resource_type} fixture {timestamp}"),
            FieldKind::Flag => return Value::Bool(self.rng.gen_bool(0.5)),
        };
        Value::String(text)
    }

    fn pick<T: Copy>(&mut self, options: &[T]) -> T {
        // Every caller passes a non-empty constant slice.
        *options.choose(&mut self.rng).unwrap_or(&options[0])
    }

    fn random_token(&mut self, len: usize) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

fn absolute(number: &Number) -> Number {
    if let Some(value) = number.as_i64() {
        if value < 0 {
            return Number::from(value.unsigned_abs());
        }
        return number.clone();
    }
    match number.as_f64() {
        Some(value) if value < 0.0 => Number::from_f64(value.abs()).unwrap_or_else(|| number.clone()),
        _ => number.clone(),
    }
}

fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at_millis(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn fixed_clock() -> DateTime<Utc> {
        at_millis(1_700_000_000_000)
    }

    fn generator() -> FixtureGenerator {
        FixtureGenerator::new(Some(7)).with_clock(fixed_clock)
    }

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn null_example_yields_test_data_fallback() {
        let body = generator().generate(None, "agent");
        let text = body["test_data"].as_str().unwrap();
        assert!(text.starts_with("agent_1700000000000_"));
        assert_eq!(keys(&body), vec!["test_data"]);
    }

    #[test]
    fn shape_is_stable_across_calls() {
        let example = json!({
            "email": "{{email}}",
            "first_name": "{{first}}",
            "phone_number": "x",
            "age": -3,
            "address": {"street_address": "y", "zip": "z"},
            "tags": ["a", "b"]
        });
        let mut generator = FixtureGenerator::new(None);
        let first = generator.generate(Some(&example), "patient");
        let second = generator.generate(Some(&example), "patient");

        assert_eq!(keys(&first), keys(&second));
        assert_eq!(keys(&first["address"]), keys(&second["address"]));
    }

    #[test]
    fn rewrites_by_field_name() {
        let example = json!({
            "email": "old@example.com",
            "contact_phone": "000",
            "appointment_date": "2020-01-01",
            "status": "draft",
            "is_active": "yes",
            "first_name": "{{name}}"
        });
        let body = generator().generate(Some(&example), "patient");

        let email = body["email"].as_str().unwrap();
        assert!(email.starts_with("test.patient.1700000000000."));
        assert!(email.ends_with("@example.com"));
        assert!(body["contact_phone"].as_str().unwrap().starts_with("+1555"));
        assert_eq!(body["status"], "active");
        assert!(body["is_active"].is_boolean());
        assert!(FIRST_NAMES.contains(&body["first_name"].as_str().unwrap()));

        let date = body["appointment_date"].as_str().unwrap();
        assert_eq!(date.len(), 10);
        assert!(date.as_bytes()[4] == b'-' && date.as_bytes()[7] == b'-');
        assert!(date > "2023-11-14");
    }

    #[test]
    fn unknown_keys_pass_through_unchanged() {
        let example = json!({"specialty": "{{specialty}}", "notes": "keep me"});
        let body = generator().generate(Some(&example), "doctor");
        assert_eq!(body["specialty"], "{{specialty}}");
        assert_eq!(body["notes"], "keep me");
    }

    #[test]
    fn negative_numbers_become_positive() {
        let example = json!({"count": -5, "ratio": -0.5, "ok": 3, "nested": {"delta": -1}});
        let body = generator().generate(Some(&example), "call");
        assert_eq!(body["count"], 5);
        assert_eq!(body["ratio"], 0.5);
        assert_eq!(body["ok"], 3);
        assert_eq!(body["nested"]["delta"], 1);
    }

    #[test]
    fn string_example_is_parsed_as_json() {
        let example = Value::String("{\"email\": \"a@b.c\", \"x\": 1}".into());
        let body = generator().generate(Some(&example), "user");
        assert!(body["email"].as_str().unwrap().ends_with("@example.com"));
        assert_eq!(body["x"], 1);
    }

    #[test]
    fn unparsable_string_example_falls_back() {
        let example = Value::String("not json".into());
        let body = generator().generate(Some(&example), "user");
        assert!(body.get("test_data").is_some());
    }

    #[test]
    fn seeded_generators_agree() {
        let example = json!({"email": "", "phone": ""});
        let a = FixtureGenerator::new(Some(42)).with_clock(fixed_clock).generate(Some(&example), "x");
        let b = FixtureGenerator::new(Some(42)).with_clock(fixed_clock).generate(Some(&example), "x");
        assert_eq!(a, b);
    }

    #[test]
    fn dates_land_within_the_next_month() {
        let example = json!({"start_date": ""});
        let mut generator = generator();
        for _ in 0..20 {
            let body = generator.generate(Some(&example), "appointment");
            let date = body["start_date"].as_str().unwrap().to_string();
            assert!(date.as_str() >= "2023-11-15" && date.as_str() <= "2023-12-14", "{date}");
        }
    }

    #[test]
    fn format_date_known_values() {
        assert_eq!(format_date(at_millis(0)), "1970-01-01");
        assert_eq!(format_date(at_millis(1_700_000_000_000)), "2023-11-14");
        assert_eq!(format_date(at_millis(951_782_400_000)), "2000-02-29");
    }
}
