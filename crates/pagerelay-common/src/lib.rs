//! Common types for pagerelay
//!
//! This crate provides the event record shared between the capture and
//! delivery sides of the forwarding agent.

pub mod event;

pub use event::{EventRecord, TRIGGER_KEY};
