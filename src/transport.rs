//! The request-submission seam between the pagination engine and HTTP.
//!
//! [`AutotaskClient`](crate::client::AutotaskClient) is the production
//! implementation. Tests substitute scripted transports so pagination can
//! be exercised without a server.

use std::future::Future;

use reqwest::Method;

use crate::error::AutotaskError;

/// Submits a request and returns the decoded JSON body.
///
/// `target` is either a path relative to the API base URL
/// (`Tickets/query?search=...`) or an absolute cursor URL previously
/// returned by the server. Implementations follow absolute URLs verbatim.
pub trait Transport: Send + Sync {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns the transport, status or body failure as an `AutotaskError`.
    fn submit(
        &self,
        method: Method,
        target: &str,
        body: Option<&serde_json::Value>,
    ) -> impl Future<Output = Result<serde_json::Value, AutotaskError>> + Send;
}
