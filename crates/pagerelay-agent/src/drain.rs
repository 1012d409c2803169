//! Queue drain
//!
//! Repeatedly takes the head of the persisted queue, posts it, and decides
//! per outcome: remove and continue (accepted), log, remove and continue
//! (permanently rejected), or persist the remainder unchanged and stop
//! (server error, timeout, unreachable). Events behind a deferred head are
//! not attempted; FIFO order is part of the remote contract.
//!
//! The shrinking queue is persisted on the terminating paths only, so an
//! invocation killed mid-batch re-delivers events that were accepted but
//! not yet committed. At-least-once, by design.

use tracing::{error, warn};

use crate::delivery::{DeliveryOutcome, IncidentApi};
use crate::queue::store::{QueueError, QueueStore};

/// Result of one drain invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// Every pending event was accepted or permanently rejected.
    Completed { delivered: usize, rejected: usize },
    /// A transient failure stopped the drain; `pending` events remain
    /// queued, the deferred head first.
    Deferred { pending: usize },
}

/// Drain the queue. Must be called inside the queue's exclusive region.
pub async fn drain(store: &QueueStore, api: &dyn IncidentApi) -> Result<DrainStatus, QueueError> {
    let mut events = store.load()?;
    let mut delivered = 0usize;
    let mut rejected = 0usize;

    while let Some(event) = events.front() {
        match api.post_incident(event).await {
            Ok(DeliveryOutcome::Accepted) => {
                events.pop_front();
                delivered += 1;
            }
            Ok(DeliveryOutcome::Rejected { status, body }) => {
                warn!("event rejected by incident API, HTTP {status}: {body}");
                events.pop_front();
                rejected += 1;
            }
            Ok(DeliveryOutcome::ServerError { status }) => {
                warn!("incident API server error HTTP {status}, deferring event");
                store.save(&events)?;
                return Ok(DrainStatus::Deferred {
                    pending: events.len(),
                });
            }
            Ok(DeliveryOutcome::TimedOut) => {
                warn!("incident API timed out, deferring event");
                store.save(&events)?;
                return Ok(DrainStatus::Deferred {
                    pending: events.len(),
                });
            }
            Ok(DeliveryOutcome::Unreachable { reason }) => {
                warn!("incident API unreachable ({reason}), deferring event");
                store.save(&events)?;
                return Ok(DrainStatus::Deferred {
                    pending: events.len(),
                });
            }
            Err(e) => {
                // Payload errors are per-event and permanent.
                error!("undeliverable event dropped: {e}");
                events.pop_front();
                rejected += 1;
            }
        }
    }

    store.save(&events)?;
    Ok(DrainStatus::Completed {
        delivered,
        rejected,
    })
}
