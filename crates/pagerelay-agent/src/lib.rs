//! pagerelay agent library
//!
//! Core components of the pagerelay forwarding agent: event capture from
//! the monitoring environment, the durable on-disk queue with its
//! cross-process exclusion discipline, the incident API client, and the
//! drain loop.

pub mod config;
pub mod delivery;
pub mod drain;
pub mod enqueue;
pub mod logging;
pub mod queue;

pub use config::Config;
pub use delivery::{DeliveryOutcome, IncidentApi, IncidentClient};
pub use drain::DrainStatus;
pub use enqueue::EnqueueStatus;
pub use queue::{QueueError, QueueLockGuard, QueueStore};
