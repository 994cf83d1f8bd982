use std::collections::BTreeMap;

use serde::Serialize;

/// A resource created during the run, deleted again by cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedResource {
    pub resource_type: String,
    pub endpoint: String,
}

/// Mutable state of one replay run: identifiers captured from earlier
/// responses and the resources awaiting cleanup, oldest first.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    identifiers: BTreeMap<String, u64>,
    last_identifier: Option<u64>,
    created_resources: Vec<CreatedResource>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier(&self, key: &str) -> Option<u64> {
        self.identifiers.get(key).copied()
    }

    pub fn identifiers(&self) -> &BTreeMap<String, u64> {
        &self.identifiers
    }

    /// The most recently captured identifier of any kind.
    pub fn last_identifier(&self) -> Option<u64> {
        self.last_identifier
    }

    pub fn set_identifier(&mut self, key: &str, id: u64) {
        self.identifiers.insert(key.to_string(), id);
        self.last_identifier = Some(id);
    }

    /// Records a resource for cleanup. An endpoint already recorded (for
    /// example a PUT to a resource created earlier) is not recorded twice.
    pub fn record_created(&mut self, resource: CreatedResource) -> bool {
        if self
            .created_resources
            .iter()
            .any(|existing| existing.endpoint == resource.endpoint)
        {
            return false;
        }
        self.created_resources.push(resource);
        true
    }

    pub fn created_resources(&self) -> &[CreatedResource] {
        &self.created_resources
    }

    /// Empties the register, returning resources newest first.
    pub fn drain_for_cleanup(&mut self) -> Vec<CreatedResource> {
        let mut drained = std::mem::take(&mut self.created_resources);
        drained.reverse();
        drained
    }
}
