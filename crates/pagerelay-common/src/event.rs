//! Monitoring event records
//!
//! One record per monitoring notification: a flat map of string fields as
//! handed over by the monitoring process, kept opaque apart from the pager
//! target key. The persisted queue is a JSON array of these records, so the
//! serialized form must stay a flat JSON object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field carrying the pager/target identifier. A record without this field
/// cannot be routed and is never queued.
pub const TRIGGER_KEY: &str = "CONTACTPAGER";

/// One monitoring notification.
///
/// Keys are the monitoring variable names with their `ICINGA_`/`NAGIOS_`
/// prefix stripped; values pass through untouched. No schema beyond the
/// presence of [`TRIGGER_KEY`] is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord {
    fields: BTreeMap<String, String>,
}

impl EventRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Look up a field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The pager target this event should be delivered to.
    pub fn trigger_id(&self) -> Option<&str> {
        self.get(TRIGGER_KEY)
    }

    /// Whether the record carries a pager target.
    pub fn has_trigger(&self) -> bool {
        self.fields.contains_key(TRIGGER_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for EventRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
