//! Cursor-based traversal of paginated GraphQL collections

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::graphql::{page_at, Page};
use crate::transport::{operation_name, Transport};
use crate::{Error, Result};

/// Largest page GitHub's GraphQL API will serve
pub const MAX_PAGE_SIZE: u32 = 100;

/// Walks a cursor-paginated collection to completion
///
/// The document must declare `$first: Int!` and `$after: String`; both are
/// injected into the variables of every request. `extract` turns one raw
/// response into a [`Page`]. Items come back in server order.
///
/// The walk is a bounded loop: when the server claims another page but hands
/// back the cursor it was just given (or none at all), the walk stops with
/// [`Error::Pagination`] instead of requesting the same page forever.
pub struct Paginator<'a, T, F> {
    transport: &'a dyn Transport,
    document: &'a str,
    variables: Value,
    extract: F,
    cursor: Option<String>,
    max_pages: Option<usize>,
    page_size: u32,
    _items: PhantomData<fn() -> T>,
}

impl<'a, T, F> Paginator<'a, T, F>
where
    F: Fn(Value) -> Result<Page<T>>,
{
    /// Create a paginator starting at the first page
    pub fn new(transport: &'a dyn Transport, document: &'a str, variables: Value, extract: F) -> Self {
        Self {
            transport,
            document,
            variables,
            extract,
            cursor: None,
            max_pages: None,
            page_size: MAX_PAGE_SIZE,
            _items: PhantomData,
        }
    }

    /// Resume from a cursor obtained earlier
    pub fn starting_at(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Stop after this many pages even if more are available
    pub fn max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Request pages of this size (clamped to 1..=100)
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Fetch every page and concatenate the items
    pub async fn collect_all(self) -> Result<Vec<T>> {
        self.collect_while(|_| true).await
    }

    /// Fetch pages until an item fails `keep`
    ///
    /// The first rejected item and everything after it are dropped, and no
    /// further page is requested.
    pub async fn collect_while(self, mut keep: impl FnMut(&T) -> bool) -> Result<Vec<T>> {
        let operation = operation_name(self.document);
        let mut items = Vec::new();
        let mut cursor = self.cursor;
        let mut pages = 0usize;

        loop {
            if self.max_pages.is_some_and(|max| pages >= max) {
                debug!(operation, pages, "Page limit reached");
                break;
            }

            let mut variables = self.variables.clone();
            let map = variables.as_object_mut().ok_or_else(|| {
                Error::Pagination(format!("{} variables must be a JSON object", operation))
            })?;
            map.insert("first".to_string(), Value::from(self.page_size));
            map.insert(
                "after".to_string(),
                cursor.clone().map(Value::String).unwrap_or(Value::Null),
            );

            let data = self.transport.execute(self.document, variables).await?;
            let page = (self.extract)(data)?;
            pages += 1;

            debug!(
                operation,
                page = pages,
                items = page.items.len(),
                has_next_page = page.page_info.has_next_page,
                "Fetched page"
            );

            for item in page.items {
                if !keep(&item) {
                    debug!(operation, pages, "Stopping at cutoff");
                    return Ok(items);
                }
                items.push(item);
            }

            if !page.page_info.has_next_page {
                break;
            }

            let next = page.page_info.end_cursor.ok_or_else(|| {
                Error::Pagination(format!(
                    "{} reported another page without a cursor",
                    operation
                ))
            })?;

            if cursor.as_deref() == Some(next.as_str()) {
                return Err(Error::Pagination(format!(
                    "{} returned cursor '{}' twice in a row",
                    operation, next
                )));
            }

            cursor = Some(next);
        }

        Ok(items)
    }
}

/// Paginator over the connection found at a JSON pointer of each response
pub(crate) fn paginate_at<'a, T: DeserializeOwned>(
    transport: &'a dyn Transport,
    document: &'a str,
    variables: Value,
    pointer: &'a str,
) -> Paginator<'a, T, impl Fn(Value) -> Result<Page<T>> + 'a> {
    Paginator::new(transport, document, variables, move |data| {
        page_at(data, pointer)
    })
}
