//! Shared domain types for Gantry.
//!
//! Currently this is just [`Event`] — the external input that triggers a
//! pipeline run. It lives in its own crate so ingress adapters (HTTP
//! handlers, queue consumers) can construct events without depending on the
//! pipeline engine.

pub mod event;

pub use event::Event;
