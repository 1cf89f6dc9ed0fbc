//! Query request envelope.

use serde::{Deserialize, Serialize};

use crate::error::AutotaskError;
use crate::filter::Filter;

/// Request-shaping parameters for `<entity>/query`.
///
/// Serialized to JSON and sent URL-encoded in the `search` query parameter.
///
/// # Example
///
/// ```
/// use autotask::filter::parse_filter;
/// use autotask::models::EntityQueryParams;
///
/// let filter = parse_filter("Status!=5").unwrap();
/// let params = EntityQueryParams::new(filter)
///     .with_fields(["id", "title"])
///     .with_max_records(50);
/// assert_eq!(
///     params.to_search_json().unwrap(),
///     r#"{"filter":{"field":"Status","op":"noteq","value":5},"fields":["id","title"],"maxRecords":50}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityQueryParams {
    /// Filter tree; omitted when the query is unfiltered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// Fields to return.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    /// Maximum number of records per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_records: Option<u32>,

    /// Additional fields to include.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_fields: Vec<String>,

    /// Fields to leave out of the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,

    /// Requested page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl EntityQueryParams {
    /// Creates parameters around an optional filter.
    pub fn new(filter: Option<Filter>) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Sets the fields to return.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets additional fields to include.
    pub fn with_include_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets fields to exclude.
    pub fn with_exclude_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum number of records per page.
    pub fn with_max_records(mut self, max_records: u32) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// Sets the requested page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Serializes the parameters to the JSON sent in `search`.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Serialization` if serialization fails.
    pub fn to_search_json(&self) -> Result<String, AutotaskError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Builds the request target `<entity>/query?search=<encoded JSON>`.
    pub fn to_query_target(&self, entity: &str) -> Result<String, AutotaskError> {
        self.to_target(entity, "query")
    }

    /// Builds the request target `<entity>/query/count?search=<encoded JSON>`.
    pub fn to_count_target(&self, entity: &str) -> Result<String, AutotaskError> {
        self.to_target(entity, "query/count")
    }

    fn to_target(&self, entity: &str, endpoint: &str) -> Result<String, AutotaskError> {
        let search = self.to_search_json()?;
        Ok(format!(
            "{}/{}?search={}",
            entity.trim_matches('/'),
            endpoint,
            urlencoding::encode(&search)
        ))
    }
}
