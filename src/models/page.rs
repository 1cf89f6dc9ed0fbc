//! Page envelopes returned by the Autotask REST API.
//!
//! Every query response carries an `items` array and a `pageDetails` block
//! describing where the page sits in the result set. Cursors are opaque
//! URLs supplied by the server and are followed verbatim.

use serde::{Deserialize, Serialize};

/// Position of a page within a query result.
///
/// The server omits, nulls or empties cursor fields on the first and last
/// pages; all of those decode to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
    /// 1-based page counter.
    #[serde(default)]
    pub page_number: u32,

    /// Number of records the page was requested with.
    #[serde(default)]
    pub page_size: u32,

    /// Server-reported record count. Informational only; the next-page
    /// cursor decides whether more pages exist.
    #[serde(default, rename = "count")]
    pub total_count: u64,

    /// Absolute URL of the following page.
    #[serde(
        default,
        rename = "nextPageUrl",
        deserialize_with = "deserialize_cursor",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_page_cursor: Option<String>,

    /// Absolute URL of the preceding page.
    #[serde(
        default,
        rename = "prevPageUrl",
        deserialize_with = "deserialize_cursor",
        skip_serializing_if = "Option::is_none"
    )]
    pub prev_page_cursor: Option<String>,
}

impl PageDescriptor {
    /// Returns true if the server supplied a next-page cursor.
    pub fn has_next(&self) -> bool {
        self.next_page_cursor.is_some()
    }

    /// Returns true if the server supplied a previous-page cursor.
    pub fn has_previous(&self) -> bool {
        self.prev_page_cursor.is_some()
    }
}

/// Deserializes a cursor URL, treating `null` and blank strings as absent.
fn deserialize_cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct CursorVisitor;

    impl<'de> Visitor<'de> for CursorVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("null or a URL string")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let value = value.trim();
            if value.is_empty() {
                Ok(None)
            } else {
                Ok(Some(value.to_string()))
            }
        }
    }

    deserializer.deserialize_option(CursorVisitor)
}

/// Raw query response: one page of items plus its descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Records on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    /// Page position and cursors.
    #[serde(default)]
    pub page_details: PageDescriptor,
}

/// A page returned by a targeted page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Records on the page.
    pub items: Vec<T>,

    /// Descriptor with `page_number` set to the page actually reached.
    pub page_details: PageDescriptor,
}

/// Response of `<entity>/query/count`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    /// Number of matching records.
    #[serde(default)]
    pub query_count: u64,
}

/// Zone information returned by the zone discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    /// Zone display name.
    #[serde(default)]
    pub zone_name: Option<String>,

    /// REST base URL for the zone, e.g. `https://webservices5.autotask.net/ATServicesRest/`.
    pub url: String,

    /// Web UI URL for the zone.
    #[serde(default)]
    pub web_url: Option<String>,

    /// Customer identifier for the tenant.
    #[serde(default)]
    pub ci: Option<i64>,
}

/// Structured error body returned on failed requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    /// Summary message, when present.
    #[serde(default, rename = "Message")]
    pub message: Option<String>,

    /// Individual error messages.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ApiErrorResponse {
    /// Returns true if the body carried any error text.
    pub fn has_content(&self) -> bool {
        self.message.as_deref().is_some_and(|m| !m.trim().is_empty()) || !self.errors.is_empty()
    }

    /// Returns the most descriptive single message available.
    pub fn primary_message(&self) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.errors.first().cloned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_descriptor_from_wire() {
        let details: PageDescriptor = serde_json::from_value(json!({
            "count": 500,
            "requestCount": 500,
            "prevPageUrl": null,
            "nextPageUrl": "https://webservices5.autotask.net/atservicesrest/v1.0/Tickets/query/next?paging=abc"
        }))
        .unwrap();

        assert_eq!(details.total_count, 500);
        assert!(details.has_next());
        assert!(!details.has_previous());
        assert_eq!(details.page_number, 0);
    }

    #[test]
    fn test_empty_cursor_is_absent() {
        let details: PageDescriptor =
            serde_json::from_value(json!({"nextPageUrl": "", "prevPageUrl": "  "})).unwrap();
        assert_eq!(details.next_page_cursor, None);
        assert_eq!(details.prev_page_cursor, None);
    }

    #[test]
    fn test_list_response_defaults() {
        let response: ListResponse<serde_json::Value> = serde_json::from_value(json!({})).unwrap();
        assert!(response.items.is_empty());
        assert_eq!(response.page_details, PageDescriptor::default());
    }

    #[test]
    fn test_list_response_rejects_non_array_items() {
        let result: Result<ListResponse<serde_json::Value>, _> =
            serde_json::from_value(json!({"items": "nope"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_count_response() {
        let response: CountResponse = serde_json::from_value(json!({"queryCount": 42})).unwrap();
        assert_eq!(response.query_count, 42);
    }

    #[test]
    fn test_zone_info() {
        let zone: ZoneInfo = serde_json::from_value(json!({
            "zoneName": "America West",
            "url": "https://webservices5.autotask.net/ATServicesRest/",
            "webUrl": "https://ww5.autotask.net/",
            "ci": 12345
        }))
        .unwrap();
        assert_eq!(zone.url, "https://webservices5.autotask.net/ATServicesRest/");
        assert_eq!(zone.ci, Some(12345));
    }

    #[test]
    fn test_api_error_primary_message() {
        let body: ApiErrorResponse =
            serde_json::from_value(json!({"errors": ["Field Foo does not exist"]})).unwrap();
        assert!(body.has_content());
        assert_eq!(body.primary_message(), "Field Foo does not exist");

        let body: ApiErrorResponse =
            serde_json::from_value(json!({"Message": "An error has occurred."})).unwrap();
        assert_eq!(body.primary_message(), "An error has occurred.");

        let body: ApiErrorResponse = serde_json::from_value(json!({"other": 1})).unwrap();
        assert!(!body.has_content());
    }
}
