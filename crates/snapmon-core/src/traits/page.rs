// # Pagination Contract
//
// Every paged collaborator call returns a `Page`: the items of that page in
// collaborator order plus an opaque continuation token. A missing token means
// the listing is exhausted.

/// One page of a paged collaborator listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in collaborator order
    pub items: Vec<T>,
    /// Token to request the next page with; `None` on the last page
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// Create the final page of a listing
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Whether more pages follow this one
    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::last(Vec::new())
    }
}
