//! User aggregation library.
//!
//! Loads a user's details, then their comments and friends concurrently,
//! bounding each dependent fetch by a timeout and degrading failures to
//! empty lists. The whole aggregation is cancellable.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod report;

pub use aggregator::{Aggregation, Aggregator, Settlement};
pub use error::{AggregateError, FetchError};
pub use models::{AggregatedResult, Comment, UserDetails, UserId};
