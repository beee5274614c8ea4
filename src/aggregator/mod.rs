//! Aggregation core.
//!
//! This module provides the orchestrator and the guarded wrapper used for
//! its dependent fetches.

pub mod guarded;
pub mod orchestrator;

pub use guarded::{guarded, FallbackReason, Guarded, DEFAULT_DEPENDENT_TIMEOUT};
pub use orchestrator::{Aggregation, Aggregator, Settlement};
