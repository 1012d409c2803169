//! Persistent FIFO queue with cross-process exclusion
//!
//! The pending event queue lives in a single snapshot file; every mutation
//! happens inside the exclusive region guarded by the `<queue>.lock`
//! sidecar, so concurrently scheduled enqueue and drain invocations never
//! interleave.

pub mod lock;
pub mod store;

pub use lock::{with_exclusive, QueueLockGuard};
pub use store::{QueueError, QueueStore};
