//! Event capture
//!
//! The monitoring process exports each notification as `ICINGA_*` /
//! `NAGIOS_*` environment variables. `--queue` collects them into one
//! event record and appends it to the durable queue.

use std::sync::OnceLock;

use pagerelay_common::{EventRecord, TRIGGER_KEY};
use regex::Regex;
use tracing::{debug, error};

use crate::queue::store::{QueueError, QueueStore};

/// Result of one enqueue invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueStatus {
    /// An event was extracted and appended.
    Queued,
    /// The environment carried no monitoring variables.
    NoEvent,
    /// The matched variables had no pager target; the event was dropped.
    Discarded,
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^(ICINGA|NAGIOS)_(.+)$").expect("static pattern"))
}

#[derive(Debug, PartialEq, Eq)]
enum Extraction {
    Empty,
    MissingTrigger,
    Event(EventRecord),
}

/// Collect monitoring variables into one record, keyed by the variable
/// name with its prefix stripped.
fn scan<I>(vars: I) -> Extraction
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut record = EventRecord::new();
    for (name, value) in vars {
        if let Some(captures) = variable_pattern().captures(&name) {
            record.insert(&captures[2], value);
        }
    }

    if record.is_empty() {
        Extraction::Empty
    } else if !record.has_trigger() {
        Extraction::MissingTrigger
    } else {
        Extraction::Event(record)
    }
}

/// Run the enqueue action over the current process environment.
///
/// Must be called inside the queue's exclusive region.
pub fn enqueue_from_env(store: &QueueStore) -> Result<EnqueueStatus, QueueError> {
    enqueue_vars(store, std::env::vars())
}

/// Enqueue over explicit (name, value) pairs.
///
/// A record without the pager target is a malformed producer notification:
/// it is dropped with an error log and never queued, since retrying cannot
/// fix it. A queue that cannot be read (other than not existing) aborts
/// the append without rewriting the file.
pub fn enqueue_vars<I>(store: &QueueStore, vars: I) -> Result<EnqueueStatus, QueueError>
where
    I: IntoIterator<Item = (String, String)>,
{
    match scan(vars) {
        Extraction::Empty => Ok(EnqueueStatus::NoEvent),
        Extraction::MissingTrigger => {
            error!("no {TRIGGER_KEY} in event, ignoring");
            Ok(EnqueueStatus::Discarded)
        }
        Extraction::Event(record) => {
            let mut events = store.load()?;
            events.push_back(record);
            store.save(&events)?;
            debug!(pending = events.len(), "event queued");
            Ok(EnqueueStatus::Queued)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn scan_strips_prefixes_and_ignores_other_variables() {
        let extraction = scan(vars(&[
            ("NAGIOS_CONTACTPAGER", "pager-1"),
            ("ICINGA_HOSTNAME", "db01"),
            ("PATH", "/usr/bin"),
            ("NAGIOSLIKE_BUT_NOT", "x"),
        ]));

        let Extraction::Event(record) = extraction else {
            panic!("expected an event");
        };
        assert_eq!(record.len(), 2);
        assert_eq!(record.trigger_id(), Some("pager-1"));
        assert_eq!(record.get("HOSTNAME"), Some("db01"));
        assert_eq!(record.get("PATH"), None);
    }

    #[test]
    fn scan_without_monitoring_variables_is_empty() {
        assert_eq!(
            scan(vars(&[("PATH", "/usr/bin"), ("HOME", "/root")])),
            Extraction::Empty
        );
    }

    #[test]
    fn scan_without_pager_target_is_rejected() {
        assert_eq!(
            scan(vars(&[("NAGIOS_HOSTNAME", "db01")])),
            Extraction::MissingTrigger
        );
    }

    #[test]
    fn enqueue_appends_in_fifo_order() {
        let dir = tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("queue.json"));

        for pager in ["a", "b", "c"] {
            let status =
                enqueue_vars(&store, vars(&[("NAGIOS_CONTACTPAGER", pager)])).unwrap();
            assert_eq!(status, EnqueueStatus::Queued);
        }

        let events = store.load().unwrap();
        let triggers: Vec<_> = events.iter().filter_map(|e| e.trigger_id()).collect();
        assert_eq!(triggers, vec!["a", "b", "c"]);
    }

    #[test]
    fn enqueue_preserves_previously_queued_events() {
        let dir = tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("queue.json"));

        enqueue_vars(&store, vars(&[("NAGIOS_CONTACTPAGER", "old")])).unwrap();
        enqueue_vars(
            &store,
            vars(&[("ICINGA_CONTACTPAGER", "new"), ("ICINGA_HOSTSTATE", "UP")]),
        )
        .unwrap();

        let events = store.load().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].trigger_id(), Some("old"));
        assert_eq!(events[1].trigger_id(), Some("new"));
        assert_eq!(events[1].get("HOSTSTATE"), Some("UP"));
    }

    #[test]
    fn missing_pager_queues_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let store = QueueStore::new(&path);

        let status = enqueue_vars(&store, vars(&[("NAGIOS_HOSTNAME", "db01")])).unwrap();
        assert_eq!(status, EnqueueStatus::Discarded);
        assert!(!path.exists());
    }

    #[test]
    fn empty_environment_queues_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let store = QueueStore::new(&path);

        let status = enqueue_vars(&store, vars(&[("HOME", "/root")])).unwrap();
        assert_eq!(status, EnqueueStatus::NoEvent);
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_queue_aborts_without_writing() {
        let dir = tempdir().unwrap();
        // A directory at the queue path: load fails with something other
        // than NotFound, and the append must not touch it.
        let store = QueueStore::new(dir.path());

        let result = enqueue_vars(&store, vars(&[("NAGIOS_CONTACTPAGER", "pager-1")]));
        assert!(result.is_err());
        assert!(dir.path().is_dir());
    }
}
