//! Entity-bound facade over queries, counts and pagination.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::AutotaskError;
use crate::filter::{parse_filter, Filter, FilterGroup, QueryFilter, QueryOperator};
use crate::models::{CountResponse, EntityQueryParams, ListResponse, Page, PageDescriptor};
use crate::pagination::{self, PaginationIterator, PaginationOptions};
use crate::transport::Transport;

/// Largest page the query endpoint returns in one response.
pub const MAX_QUERY_RECORDS: u32 = 500;

/// IDs per request in [`EntityService::batch_get`] when none is given.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Operations scoped to one Autotask entity such as `Tickets`.
///
/// Filters are written in the expression language of [`crate::filter`].
#[derive(Debug)]
pub struct EntityService<'a, Tr> {
    transport: &'a Tr,
    name: String,
}

impl<Tr> Clone for EntityService<'_, Tr> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport,
            name: self.name.clone(),
        }
    }
}

impl<'a, Tr: Transport> EntityService<'a, Tr> {
    /// Binds `name` to a transport.
    pub fn new(transport: &'a Tr, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into().trim_matches('/').to_string(),
        }
    }

    /// The entity name used in request paths.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs a single query and returns up to [`MAX_QUERY_RECORDS`] items.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Filter` for a bad filter, the transport
    /// failure, or `AutotaskError::Serialization` for an unexpected body.
    pub async fn query<T: DeserializeOwned>(&self, filter: &str) -> Result<Vec<T>, AutotaskError> {
        self.query_filter(parse_filter(filter)?).await
    }

    async fn query_filter<T: DeserializeOwned>(
        &self,
        filter: Option<Filter>,
    ) -> Result<Vec<T>, AutotaskError> {
        let params = EntityQueryParams::new(filter).with_max_records(MAX_QUERY_RECORDS);
        Ok(self.query_with_params(&params).await?.items)
    }

    /// Returns records whose `field` is on or after `since`.
    ///
    /// The date is sent as RFC 3339 in UTC. At most [`MAX_QUERY_RECORDS`]
    /// items come back.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or `AutotaskError::Serialization`.
    pub async fn query_since<T: DeserializeOwned>(
        &self,
        field: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>, AutotaskError> {
        let date = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let filter = QueryFilter::new(field, QueryOperator::GreaterOrEqual, date);
        self.query_filter(Some(filter.into())).await
    }

    /// Returns records with `start_id <= id <= end_id`.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or `AutotaskError::Serialization`.
    pub async fn query_id_range<T: DeserializeOwned>(
        &self,
        start_id: i64,
        end_id: i64,
    ) -> Result<Vec<T>, AutotaskError> {
        let filter = FilterGroup::and([
            QueryFilter::new("id", QueryOperator::GreaterOrEqual, start_id).into(),
            QueryFilter::new("id", QueryOperator::LessOrEqual, end_id).into(),
        ]);
        self.query_filter(Some(filter.into())).await
    }

    /// Fetches records by ID, `batch_size` IDs per `in` query.
    ///
    /// A batch size of zero uses [`DEFAULT_BATCH_SIZE`]; sizes above
    /// [`MAX_QUERY_RECORDS`] are capped. No request is made for an empty
    /// slice.
    ///
    /// # Errors
    ///
    /// Returns the first failing batch's error; earlier results are dropped.
    pub async fn batch_get<T: DeserializeOwned>(
        &self,
        ids: &[i64],
        batch_size: usize,
    ) -> Result<Vec<T>, AutotaskError> {
        let batch_size = match batch_size {
            0 => DEFAULT_BATCH_SIZE,
            n => n.min(MAX_QUERY_RECORDS as usize),
        };

        let mut all = Vec::with_capacity(ids.len());
        for (index, batch) in ids.chunks(batch_size).enumerate() {
            let filter = QueryFilter::new("id", QueryOperator::In, batch.to_vec());
            let items: Vec<T> = self.query_filter(Some(filter.into())).await?;

            tracing::debug!(
                entity = %self.name,
                batch = index + 1,
                requested = batch.len(),
                found = items.len(),
                "Fetched batch"
            );
            all.extend(items);
        }
        Ok(all)
    }

    /// Runs a single query with prepared parameters.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or `AutotaskError::Serialization`.
    pub async fn query_with_params<T: DeserializeOwned>(
        &self,
        params: &EntityQueryParams,
    ) -> Result<ListResponse<T>, AutotaskError> {
        let target = params.to_query_target(&self.name)?;
        let body = self.transport.submit(Method::GET, &target, None).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Counts records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Filter` for a bad filter, the transport
    /// failure, or `AutotaskError::Serialization` for an unexpected body.
    pub async fn count(&self, filter: &str) -> Result<u64, AutotaskError> {
        let params = EntityQueryParams::new(parse_filter(filter)?);
        let target = params.to_count_target(&self.name)?;
        let body = self.transport.submit(Method::GET, &target, None).await?;
        let response: CountResponse = serde_json::from_value(body)?;

        tracing::debug!(entity = %self.name, count = response.query_count, "Counted records");
        Ok(response.query_count)
    }

    /// Starts a [`PaginationIterator`] over records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the filter or first-page failure.
    pub async fn iter<T: DeserializeOwned>(
        &self,
        filter: &str,
        page_size: u32,
    ) -> Result<PaginationIterator<'a, Tr, T>, AutotaskError> {
        PaginationIterator::new(self.transport, self.name.clone(), filter, page_size).await
    }

    /// Fetches every matching record.
    ///
    /// # Errors
    ///
    /// See [`pagination::fetch_all_pages`].
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        filter: &str,
        page_size: u32,
    ) -> Result<Vec<T>, AutotaskError> {
        pagination::fetch_all_pages(self.transport, &self.name, filter, page_size).await
    }

    /// Walks every matching page, handing each to `on_page`.
    ///
    /// # Errors
    ///
    /// See [`pagination::fetch_all_pages_with_callback`].
    pub async fn fetch_all_with_callback<T, E, F>(
        &self,
        filter: &str,
        page_size: u32,
        on_page: F,
    ) -> Result<(), E>
    where
        T: DeserializeOwned,
        E: From<AutotaskError>,
        F: FnMut(Vec<T>, &PageDescriptor) -> Result<(), E>,
    {
        pagination::fetch_all_pages_with_callback(
            self.transport,
            &self.name,
            filter,
            page_size,
            on_page,
        )
        .await
    }

    /// Fetches one page by walking cursors from the first page.
    ///
    /// # Errors
    ///
    /// See [`pagination::fetch_page`].
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        filter: &str,
        options: PaginationOptions,
    ) -> Result<Page<T>, AutotaskError> {
        pagination::fetch_page(self.transport, &self.name, filter, options).await
    }

    /// Follows the next cursor of `details`.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::NoNextPage` or the fetch failure.
    pub async fn next_page<T: DeserializeOwned>(
        &self,
        details: &PageDescriptor,
    ) -> Result<ListResponse<T>, AutotaskError> {
        pagination::next_page(self.transport, details).await
    }

    /// Follows the previous cursor of `details`.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::NoPreviousPage` or the fetch failure.
    pub async fn previous_page<T: DeserializeOwned>(
        &self,
        details: &PageDescriptor,
    ) -> Result<ListResponse<T>, AutotaskError> {
        pagination::previous_page(self.transport, details).await
    }
}
