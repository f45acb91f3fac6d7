//! Paged query results.

/// Header carrying the requested page size.
pub const MAX_ITEM_COUNT_HEADER: &str = "x-ms-max-item-count";

/// Header carrying the continuation token, in both directions.
pub const CONTINUATION_HEADER: &str = "x-ms-continuation";

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage<T> {
    /// Items on this page.
    pub items: Vec<T>,

    /// Token to pass back for the next page; `None` on the last page.
    pub continuation: Option<String>,
}

impl<T> QueryPage<T> {
    /// Whether more pages follow.
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }
}
