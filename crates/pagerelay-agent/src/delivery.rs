//! Incident API delivery
//!
//! One event per HTTPS POST. The wire format is a URL-encoded form with a
//! fixed source and payload-type tag, the event's pager target as the
//! trigger id, and the full record as a JSON string under `data`. The API
//! accepts anonymous submissions, so the Basic credentials are fixed.

use async_trait::async_trait;
use pagerelay_common::{EventRecord, TRIGGER_KEY};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Config;

/// Fixed source tag sent with every incident.
const SOURCE: &str = "service";
/// Fixed payload-type tag understood by the incident API.
const DATA_TYPE: &str = "nagios";
/// Incident resource below the versioned API root.
const INCIDENT_RESOURCE: &str = "ims.incidents";
const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous";

/// Normalized result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// HTTP 200: the incident was accepted.
    Accepted,
    /// HTTP [400, 500): the event is permanently rejected and must not be
    /// retried.
    Rejected { status: u16, body: String },
    /// Any other status: the server is unhealthy, retry later.
    ServerError { status: u16 },
    /// The request timed out.
    TimedOut,
    /// The request failed before an HTTP status was available. Treated as
    /// transient, like a server error.
    Unreachable { reason: String },
}

/// Errors building the delivery payload. These are per-event and permanent.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("event has no {TRIGGER_KEY} value")]
    MissingTrigger,

    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Posting side of the drain loop. Implemented by [`IncidentClient`] in
/// production and by scripted fakes in tests.
#[async_trait]
pub trait IncidentApi: Send + Sync {
    async fn post_incident(&self, event: &EventRecord) -> Result<DeliveryOutcome, DeliveryError>;
}

/// reqwest-based client for the remote incident API.
pub struct IncidentClient {
    client: reqwest::Client,
    endpoint: String,
}

impl IncidentClient {
    /// Build a client bound to the configured host with the configured
    /// request timeout.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint_url(config),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IncidentApi for IncidentClient {
    async fn post_incident(&self, event: &EventRecord) -> Result<DeliveryOutcome, DeliveryError> {
        let form = build_form(event)?;

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(ANONYMOUS_USER, Some(ANONYMOUS_PASSWORD))
            .form(&form)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Ok(classify(status, body))
            }
            Err(e) if e.is_timeout() => Ok(DeliveryOutcome::TimedOut),
            Err(e) => Ok(DeliveryOutcome::Unreachable {
                reason: e.to_string(),
            }),
        }
    }
}

fn endpoint_url(config: &Config) -> String {
    format!(
        "https://{}/api/{}/{}",
        config.api_host, config.api_version, INCIDENT_RESOURCE
    )
}

/// URL-encoded form fields for one event.
fn build_form(event: &EventRecord) -> Result<Vec<(&'static str, String)>, DeliveryError> {
    let trigger = event.trigger_id().ok_or(DeliveryError::MissingTrigger)?;
    Ok(vec![
        ("source", SOURCE.to_string()),
        ("data_type", DATA_TYPE.to_string()),
        ("triggerid", trigger.to_string()),
        ("data", serde_json::to_string(event)?),
    ])
}

/// Map an HTTP status to the drain loop's outcome classes.
fn classify(status: StatusCode, body: String) -> DeliveryOutcome {
    match status.as_u16() {
        200 => DeliveryOutcome::Accepted,
        code @ 400..=499 => DeliveryOutcome::Rejected { status: code, body },
        code => DeliveryOutcome::ServerError { status: code },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pager: &str) -> EventRecord {
        let mut record = EventRecord::new();
        record.insert(TRIGGER_KEY, pager);
        record.insert("HOSTSTATE", "DOWN");
        record
    }

    #[test]
    fn form_carries_trigger_and_full_record() {
        let event = event("pager-1");
        let form = build_form(&event).unwrap();

        assert_eq!(form[0], ("source", "service".to_string()));
        assert_eq!(form[1], ("data_type", "nagios".to_string()));
        assert_eq!(form[2], ("triggerid", "pager-1".to_string()));

        let (name, data) = &form[3];
        assert_eq!(*name, "data");
        let round_tripped: EventRecord = serde_json::from_str(data).unwrap();
        assert_eq!(round_tripped, event);
    }

    #[test]
    fn missing_trigger_is_a_payload_error() {
        let mut record = EventRecord::new();
        record.insert("HOSTSTATE", "DOWN");

        let result = build_form(&record);
        assert!(matches!(result, Err(DeliveryError::MissingTrigger)));
    }

    #[test]
    fn status_classification() {
        let ok = |code: u16| classify(StatusCode::from_u16(code).unwrap(), String::new());

        assert_eq!(ok(200), DeliveryOutcome::Accepted);
        assert_eq!(ok(302), DeliveryOutcome::ServerError { status: 302 });
        assert!(matches!(
            ok(400),
            DeliveryOutcome::Rejected { status: 400, .. }
        ));
        assert!(matches!(
            ok(404),
            DeliveryOutcome::Rejected { status: 404, .. }
        ));
        assert!(matches!(
            ok(499),
            DeliveryOutcome::Rejected { status: 499, .. }
        ));
        assert_eq!(ok(500), DeliveryOutcome::ServerError { status: 500 });
        assert_eq!(ok(503), DeliveryOutcome::ServerError { status: 503 });
    }

    #[test]
    fn endpoint_from_default_config() {
        let config = Config::default();
        assert_eq!(
            endpoint_url(&config),
            "https://api.pingdom.com/api/3.0/ims.incidents"
        );
    }
}
