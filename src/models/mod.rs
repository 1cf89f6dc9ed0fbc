//! Data models for the Autotask REST API.
//!
//! This module contains the query request envelope, page and count
//! responses, zone discovery and error bodies.

mod page;
mod query;

pub use page::*;
pub use query::*;
