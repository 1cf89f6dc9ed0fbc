//! Cursor-based pagination over Autotask query results.
//!
//! Only the first request is built locally: the filter is parsed, wrapped
//! in [`EntityQueryParams`] with `maxRecords` set to the page size, and sent
//! to `<entity>/query`. Every later page is fetched by submitting the
//! server's `nextPageUrl` (or `prevPageUrl`) verbatim; the cursor already
//! encodes the query.
//!
//! Page numbers reported here are counted locally, one per successful
//! fetch, and always replace whatever the server put in `pageNumber`.
//!
//! The presence of a next-page cursor is the only signal that more results
//! exist. The server's `count` is informational.

use std::fmt;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::{AutotaskError, FetchStage};
use crate::filter::parse_filter;
use crate::models::{EntityQueryParams, ListResponse, Page, PageDescriptor};
use crate::transport::Transport;

/// Page size used when none (or zero) is given.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Options for fetching one specific page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Records per page; zero means [`DEFAULT_PAGE_SIZE`].
    pub page_size: u32,
    /// 1-based page to fetch.
    pub page: u32,
}

impl PaginationOptions {
    /// Creates options for `page` with `page_size` records per page.
    pub fn new(page_size: u32, page: u32) -> Self {
        Self { page_size, page }
    }
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }
}

fn effective_page_size(page_size: u32) -> u32 {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    }
}

/// Builds the first-page request target for `entity`.
fn first_page_target(
    entity: &str,
    filter: &str,
    page_size: u32,
) -> Result<String, AutotaskError> {
    let params = EntityQueryParams::new(parse_filter(filter)?)
        .with_max_records(effective_page_size(page_size));
    params.to_query_target(entity)
}

/// Submits one GET and decodes the page.
async fn fetch_list<Tr, T>(
    transport: &Tr,
    target: &str,
    stage: FetchStage,
) -> Result<ListResponse<T>, AutotaskError>
where
    Tr: Transport,
    T: DeserializeOwned,
{
    tracing::debug!(stage = %stage, "Fetching page");

    let body = transport.submit(Method::GET, target, None).await?;
    serde_json::from_value(body).map_err(|e| AutotaskError::decode(stage, e))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    /// A page is buffered; `next_cursor` locates the one after it.
    Positioned { next_cursor: Option<String> },
    /// Buffer drained and nothing left to fetch.
    Exhausted,
}

/// Step-by-step traversal of a query result.
///
/// The first page is fetched when the iterator is created. Each call to
/// [`advance`](Self::advance) moves to the next item, fetching the next page
/// through its cursor when the buffered page runs out.
///
/// A `false` from `advance` means either the results are exhausted or a
/// fetch failed; check [`error`](Self::error) to tell them apart. After a
/// failure the cursor is kept, so the next `advance` retries the same page.
///
/// ```ignore
/// let mut tickets = PaginationIterator::<_, Ticket>::new(&client, "Tickets", "Status!=5", 50).await?;
/// while tickets.advance().await {
///     let ticket = tickets.item().unwrap();
///     println!("{}", ticket.title);
/// }
/// if let Some(err) = tickets.error() {
///     eprintln!("stopped early: {}", err);
/// }
/// ```
pub struct PaginationIterator<'a, Tr, T = serde_json::Value> {
    transport: &'a Tr,
    entity: String,
    page_size: u32,
    items: Vec<T>,
    next_index: usize,
    current: Option<usize>,
    page_details: PageDescriptor,
    page_number: u32,
    state: State,
    error: Option<AutotaskError>,
}

impl<Tr, T: fmt::Debug> fmt::Debug for PaginationIterator<'_, Tr, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationIterator")
            .field("entity", &self.entity)
            .field("page_size", &self.page_size)
            .field("page_number", &self.page_number)
            .field("items", &self.items.len())
            .field("current", &self.current)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

impl<'a, Tr, T> PaginationIterator<'a, Tr, T>
where
    Tr: Transport,
    T: DeserializeOwned,
{
    /// Parses `filter` and fetches the first page of `entity`.
    ///
    /// An empty filter queries without conditions. A page size of zero
    /// uses [`DEFAULT_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::Filter` if the filter does not parse, or the
    /// first-page fetch failure. No iterator exists in either case.
    pub async fn new(
        transport: &'a Tr,
        entity: impl Into<String>,
        filter: &str,
        page_size: u32,
    ) -> Result<Self, AutotaskError> {
        let entity = entity.into();
        let page_size = effective_page_size(page_size);
        let target = first_page_target(&entity, filter, page_size)?;
        Self::start(transport, entity, page_size, &target).await
    }

    /// Starts from prepared query parameters instead of a filter string.
    ///
    /// `max_records` is used as the page size when set.
    ///
    /// # Errors
    ///
    /// Returns the first-page fetch failure.
    pub async fn with_params(
        transport: &'a Tr,
        entity: impl Into<String>,
        params: EntityQueryParams,
    ) -> Result<Self, AutotaskError> {
        let entity = entity.into();
        let page_size = effective_page_size(params.max_records.unwrap_or(0));
        let target = params.with_max_records(page_size).to_query_target(&entity)?;
        Self::start(transport, entity, page_size, &target).await
    }

    async fn start(
        transport: &'a Tr,
        entity: String,
        page_size: u32,
        target: &str,
    ) -> Result<Self, AutotaskError> {
        let first: ListResponse<T> = fetch_list(transport, target, FetchStage::FirstPage).await?;

        let mut iterator = Self {
            transport,
            entity,
            page_size,
            items: Vec::new(),
            next_index: 0,
            current: None,
            page_details: PageDescriptor::default(),
            page_number: 0,
            state: State::Exhausted,
            error: None,
        };
        iterator.load(first, 1);
        Ok(iterator)
    }

    /// Replaces the buffer with a freshly fetched page.
    fn load(&mut self, response: ListResponse<T>, page_number: u32) {
        self.page_number = page_number;
        self.page_details = response.page_details;
        self.page_details.page_number = page_number;
        self.page_details.page_size = self.page_size;
        self.items = response.items;
        self.next_index = 0;
        self.current = None;

        // An empty page ends traversal even if it carries a cursor.
        self.state = if self.items.is_empty() {
            State::Exhausted
        } else {
            State::Positioned {
                next_cursor: self.page_details.next_page_cursor.clone(),
            }
        };

        tracing::debug!(
            entity = %self.entity,
            page = page_number,
            items = self.items.len(),
            has_next = self.page_details.has_next(),
            "Page loaded"
        );
    }

    /// Moves to the next item, fetching the next page when needed.
    ///
    /// Returns `false` when there are no more items or a fetch failed.
    /// Once exhausted, further calls make no requests.
    pub async fn advance(&mut self) -> bool {
        if self.state == State::Exhausted {
            self.current = None;
            return false;
        }
        self.error = None;

        loop {
            if self.next_index < self.items.len() {
                self.current = Some(self.next_index);
                self.next_index += 1;
                return true;
            }
            self.current = None;

            let cursor = match &self.state {
                State::Positioned {
                    next_cursor: Some(cursor),
                } => cursor.clone(),
                _ => {
                    self.state = State::Exhausted;
                    return false;
                }
            };

            match fetch_list(self.transport, &cursor, FetchStage::NextPage).await {
                Ok(response) => {
                    let page_number = self.page_number + 1;
                    self.load(response, page_number);
                }
                Err(e) => {
                    tracing::debug!(
                        entity = %self.entity,
                        page = self.page_number + 1,
                        error = %e,
                        "Next page fetch failed"
                    );
                    self.error = Some(e);
                    return false;
                }
            }
        }
    }

    /// Advances and returns the new current item.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure that stopped the traversal. A later call
    /// retries the failed page.
    pub async fn try_next(&mut self) -> Result<Option<&T>, AutotaskError> {
        if self.advance().await {
            return Ok(self.item());
        }
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Steps back to the previous page using the server's previous cursor.
    ///
    /// The buffer is replaced; the next `advance` yields the first item of
    /// that page.
    ///
    /// # Errors
    ///
    /// Returns `AutotaskError::NoPreviousPage` if the current page has no
    /// previous cursor, or the fetch failure.
    pub async fn previous_page(&mut self) -> Result<(), AutotaskError> {
        let cursor = self
            .page_details
            .prev_page_cursor
            .clone()
            .ok_or(AutotaskError::NoPreviousPage)?;

        let response = fetch_list(self.transport, &cursor, FetchStage::PreviousPage).await?;
        let page_number = self.page_number.saturating_sub(1).max(1);
        self.error = None;
        self.load(response, page_number);
        Ok(())
    }

    /// The item the iterator is positioned on.
    pub fn item(&self) -> Option<&T> {
        self.current.and_then(|index| self.items.get(index))
    }

    /// The failure that ended the last `advance`, if any.
    pub fn error(&self) -> Option<&AutotaskError> {
        self.error.as_ref()
    }

    /// Items of the buffered page.
    pub fn page_items(&self) -> &[T] {
        &self.items
    }

    /// Descriptor of the buffered page, with the local page number.
    pub fn page_details(&self) -> &PageDescriptor {
        &self.page_details
    }

    /// Local page counter (1 for the first page).
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Records requested per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns true if another item is buffered or a next page can be fetched.
    pub fn has_more(&self) -> bool {
        match &self.state {
            State::Exhausted => false,
            State::Positioned { next_cursor } => {
                self.next_index < self.items.len() || next_cursor.is_some()
            }
        }
    }
}

/// Fetches every page and returns all items in server order.
///
/// Memory grows with the result set; use
/// [`fetch_all_pages_with_callback`] for large collections.
///
/// # Errors
///
/// Returns `AutotaskError::Filter` for a bad filter, or the first fetch
/// failure.
pub async fn fetch_all_pages<Tr, T>(
    transport: &Tr,
    entity: &str,
    filter: &str,
    page_size: u32,
) -> Result<Vec<T>, AutotaskError>
where
    Tr: Transport,
    T: DeserializeOwned,
{
    let mut all = Vec::new();
    fetch_all_pages_with_callback(transport, entity, filter, page_size, |items, _| {
        all.extend(items);
        Ok::<(), AutotaskError>(())
    })
    .await?;
    Ok(all)
}

/// Walks every page, handing each one to `on_page` instead of collecting.
///
/// `on_page` receives the page's items and descriptor (with the local page
/// number). The first page is always delivered, even when empty. Traversal
/// stops at the first callback error, which is returned unchanged.
///
/// # Errors
///
/// Returns the callback's error, or an `AutotaskError` converted into `E`.
pub async fn fetch_all_pages_with_callback<Tr, T, E, F>(
    transport: &Tr,
    entity: &str,
    filter: &str,
    page_size: u32,
    mut on_page: F,
) -> Result<(), E>
where
    Tr: Transport,
    T: DeserializeOwned,
    E: From<AutotaskError>,
    F: FnMut(Vec<T>, &PageDescriptor) -> Result<(), E>,
{
    let page_size = effective_page_size(page_size);
    let target = first_page_target(entity, filter, page_size)?;
    let mut response: ListResponse<T> =
        fetch_list(transport, &target, FetchStage::FirstPage).await?;
    let mut page_number = 1;

    loop {
        let mut details = response.page_details;
        details.page_number = page_number;
        details.page_size = page_size;
        let was_empty = response.items.is_empty();

        tracing::debug!(
            entity = %entity,
            page = page_number,
            items = response.items.len(),
            "Delivering page"
        );

        on_page(response.items, &details)?;

        let cursor = match details.next_page_cursor {
            Some(cursor) if !was_empty => cursor,
            _ => break,
        };

        response = fetch_list(transport, &cursor, FetchStage::NextPage).await?;
        page_number += 1;
    }

    Ok(())
}

/// Fetches page `options.page` by walking cursors from the first page.
///
/// This costs one request per page up to the target. If the cursors run
/// out first, the last page reached is returned with its own page number.
/// The first request carries no page number; later pages are only reached
/// through the server's cursors.
///
/// # Errors
///
/// Returns `AutotaskError::Validation` if `options.page` is zero,
/// `AutotaskError::Filter` for a bad filter, or the fetch failure.
pub async fn fetch_page<Tr, T>(
    transport: &Tr,
    entity: &str,
    filter: &str,
    options: PaginationOptions,
) -> Result<Page<T>, AutotaskError>
where
    Tr: Transport,
    T: DeserializeOwned,
{
    if options.page == 0 {
        return Err(AutotaskError::validation("page must be at least 1"));
    }

    let page_size = effective_page_size(options.page_size);
    let target = first_page_target(entity, filter, page_size)?;
    let mut response: ListResponse<T> =
        fetch_list(transport, &target, FetchStage::FirstPage).await?;
    let mut page_number = 1;

    while page_number < options.page {
        let cursor = match &response.page_details.next_page_cursor {
            Some(cursor) if !response.items.is_empty() => cursor.clone(),
            _ => {
                tracing::debug!(
                    entity = %entity,
                    requested = options.page,
                    reached = page_number,
                    "Ran out of pages before the requested page"
                );
                break;
            }
        };

        let next = page_number + 1;
        response = fetch_list(transport, &cursor, FetchStage::TargetPage { page: next }).await?;
        page_number = next;
    }

    let mut page_details = response.page_details;
    page_details.page_number = page_number;
    page_details.page_size = page_size;
    Ok(Page {
        items: response.items,
        page_details,
    })
}

/// Fetches the page after `details` through its next cursor.
///
/// # Errors
///
/// Returns `AutotaskError::NoNextPage` without a request if `details` has
/// no next cursor, or the fetch failure.
pub async fn next_page<Tr, T>(
    transport: &Tr,
    details: &PageDescriptor,
) -> Result<ListResponse<T>, AutotaskError>
where
    Tr: Transport,
    T: DeserializeOwned,
{
    let cursor = details
        .next_page_cursor
        .as_deref()
        .ok_or(AutotaskError::NoNextPage)?;
    let mut response: ListResponse<T> =
        fetch_list(transport, cursor, FetchStage::NextPage).await?;
    response.page_details.page_number = details.page_number.saturating_add(1);
    response.page_details.page_size = details.page_size;
    Ok(response)
}

/// Fetches the page before `details` through its previous cursor.
///
/// # Errors
///
/// Returns `AutotaskError::NoPreviousPage` without a request if `details`
/// has no previous cursor, or the fetch failure.
pub async fn previous_page<Tr, T>(
    transport: &Tr,
    details: &PageDescriptor,
) -> Result<ListResponse<T>, AutotaskError>
where
    Tr: Transport,
    T: DeserializeOwned,
{
    let cursor = details
        .prev_page_cursor
        .as_deref()
        .ok_or(AutotaskError::NoPreviousPage)?;
    let mut response: ListResponse<T> =
        fetch_list(transport, cursor, FetchStage::PreviousPage).await?;
    response.page_details.page_number = details.page_number.saturating_sub(1).max(1);
    response.page_details.page_size = details.page_size;
    Ok(response)
}
