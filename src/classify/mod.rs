//! # Keyword classification
//!
//! Resource types, roles, fixture field kinds and corpus categories are all
//! inferred by case-insensitive substring matching against a keyword table.
//! The tables live here so each heuristic can be inspected, replaced and
//! tested on its own.

/// A single `keyword -> value` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule<V> {
    pub keyword: String,
    pub value: V,
}

/// Ordered set of keyword rules. Keywords are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable<V> {
    rules: Vec<KeywordRule<V>>,
}

impl<V> Default for KeywordTable<V> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<V> KeywordTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: &str, value: V) -> Self {
        self.push(keyword, value);
        self
    }

    pub fn push(&mut self, keyword: &str, value: V) {
        self.rules.push(KeywordRule {
            keyword: keyword.to_ascii_lowercase(),
            value,
        });
    }

    pub fn rules(&self) -> &[KeywordRule<V>] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule, in table order, whose keyword occurs in `haystack`.
    pub fn first_match(&self, haystack: &str) -> Option<&V> {
        let haystack = haystack.to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| haystack.contains(&rule.keyword))
            .map(|rule| &rule.value)
    }

    /// Rule whose keyword occurs furthest to the right in `haystack`.
    /// Ties go to the earlier rule. For URLs this picks the deepest path
    /// segment, so `/hospitals/3/doctors/` classifies as a doctor.
    pub fn deepest_match(&self, haystack: &str) -> Option<&V> {
        let haystack = haystack.to_ascii_lowercase();
        let mut best: Option<(usize, &V)> = None;
        for rule in &self.rules {
            if let Some(position) = haystack.rfind(&rule.keyword) {
                if best.is_none_or(|(best_position, _)| position > best_position) {
                    best = Some((position, &rule.value));
                }
            }
        }
        best.map(|(_, value)| value)
    }
}

/// What a created resource is called and which run-context identifier
/// holds its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKind {
    pub resource_type: String,
    pub id_key: String,
}

impl ResourceKind {
    pub fn new(resource_type: &str, id_key: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id_key: id_key.to_string(),
        }
    }

    /// Used when a created resource's URL matches no known keyword.
    pub fn generic() -> Self {
        Self::new("resource", "resourceId")
    }
}

/// Resource types of the two target platforms (call automation and
/// healthcare).
pub fn resource_kinds() -> KeywordTable<ResourceKind> {
    [
        ("hospital", "hospital", "hospitalId"),
        ("department", "department", "departmentId"),
        ("doctor", "doctor", "doctorId"),
        ("patient", "patient", "patientId"),
        ("appointment", "appointment", "appointmentId"),
        ("prescription", "prescription", "prescriptionId"),
        ("agent", "agent", "agentId"),
        ("contact", "contact", "contactId"),
        ("campaign", "campaign", "campaignId"),
        ("phone-number", "phone_number", "phoneNumberId"),
        ("phone_number", "phone_number", "phoneNumberId"),
        ("knowledge", "knowledge_base", "knowledgeBaseId"),
        ("call", "call", "callId"),
        ("webhook", "webhook", "webhookId"),
        ("user", "user", "userId"),
    ]
    .into_iter()
    .fold(KeywordTable::new(), |table, (keyword, resource_type, id_key)| {
        table.with(keyword, ResourceKind::new(resource_type, id_key))
    })
}

/// Corpus category by URL substring. Anything unmatched is `other`.
pub fn categories() -> KeywordTable<String> {
    [
        ("/auth", "authentication"),
        ("/login", "authentication"),
        ("/token", "authentication"),
        ("/register", "authentication"),
        ("/agents", "agents"),
        ("/contacts", "contacts"),
        ("/calls", "calls"),
        ("/campaigns", "campaigns"),
        ("/phone-numbers", "phone_numbers"),
        ("/knowledge", "knowledge_base"),
        ("/webhooks", "webhooks"),
        ("/hospitals", "hospitals"),
        ("/departments", "departments"),
        ("/doctors", "doctors"),
        ("/doctor/", "doctors"),
        ("/patients", "patients"),
        ("/patient/", "patients"),
        ("/appointments", "appointments"),
        ("/prescriptions", "prescriptions"),
        ("/users", "users"),
        ("/profile", "users"),
        ("/admin", "admin"),
    ]
    .into_iter()
    .fold(KeywordTable::new(), |table, (keyword, category)| {
        table.with(keyword, category.to_string())
    })
}

pub const OTHER_CATEGORY: &str = "other";

pub fn categorize(url: &str) -> String {
    categories()
        .first_match(url)
        .cloned()
        .unwrap_or_else(|| OTHER_CATEGORY.to_string())
}
