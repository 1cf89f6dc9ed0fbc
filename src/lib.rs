//! # Autotask
//!
//! A client library for the Autotask PSA REST API.
//!
//! Its two core pieces are a filter expression language, which turns text
//! such as `Status!=5 AND (Priority=1 OR Priority=2)` into the structured
//! filter tree the API expects, and a cursor pagination engine that walks
//! query results by following the server's page URLs.
//!
//! ## Features
//!
//! - **Filters**: comparisons, text matching, `in` lists, null checks,
//!   `AND` / `OR` with nesting, and explicit parse errors
//! - **Pagination**: a step-by-step iterator, fetch-all and per-page
//!   callback helpers, page-by-number and one-shot cursor follows
//! - **Zones**: automatic zone discovery from the API user name
//! - **Rate limiting**: client-side request spacing (60 per minute by default)
//! - **Security**: the API secret is never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with security-conscious message sanitization
//! - [`filter`] - Filter expression lexer, parser and filter tree
//! - [`models`] - Query parameters and page envelopes
//! - [`transport`] - The request-submission seam used by pagination
//! - [`client`] - reqwest-backed transport for the Autotask API
//! - [`rate_limiter`] - Requests-per-minute spacing
//! - [`pagination`] - Cursor pagination iterator and helpers
//! - [`entity`] - Entity-bound facade (`Tickets`, `Companies`, ...)
//!
//! ## Configuration
//!
//! - `AUTOTASK_USERNAME`: API user name
//! - `AUTOTASK_SECRET`: API user secret
//! - `AUTOTASK_INTEGRATION_CODE`: API tracking identifier
//!
//! Optional:
//! - `AUTOTASK_BASE_URL`: zone base URL, skips zone discovery
//! - `AUTOTASK_REQUESTS_PER_MINUTE`: request budget (default 60)
//! - `RUST_LOG`: Log level (e.g., `autotask=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use autotask::client::AutotaskClient;
//! use autotask::config::Config;
//!
//! async fn example() -> Result<(), autotask::error::AutotaskError> {
//!     let config = Config::from_env()?;
//!     let client = AutotaskClient::new(&config)?;
//!
//!     let open = client.tickets().count("Status!=5").await?;
//!     println!("{} open tickets", open);
//!
//!     let mut tickets = client
//!         .tickets()
//!         .iter::<serde_json::Value>("Status!=5 AND Priority=1", 50)
//!         .await?;
//!     while tickets.advance().await {
//!         println!("{}", tickets.item().unwrap()["title"]);
//!     }
//!     if let Some(err) = tickets.error() {
//!         eprintln!("traversal stopped: {}", err);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod filter;
pub mod models;
pub mod pagination;
pub mod rate_limiter;
pub mod transport;
