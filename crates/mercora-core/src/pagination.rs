//! Pagination types for list operations.

use serde::{Deserialize, Serialize};

/// A request for a page of results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// The page number (0-indexed).
    pub page: usize,
    /// The number of items per page.
    pub size: usize,
}

impl PageRequest {
    /// The default page size.
    pub const DEFAULT_SIZE: usize = 20;
    /// The maximum allowed page size.
    pub const MAX_SIZE: usize = 100;

    /// Creates a new page request, clamping the size to [`Self::MAX_SIZE`].
    #[must_use]
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.min(Self::MAX_SIZE).max(1),
        }
    }

    /// Creates a page request for the first page with default size.
    #[must_use]
    pub fn first() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }

    /// Returns the offset for database queries.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page * self.size
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// A page of results together with the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub total: u64,
    /// The page number this slice corresponds to (0-indexed).
    pub page: usize,
    /// The page size the slice was cut with.
    pub size: usize,
}

impl<T> Page<T> {
    /// Creates a new page.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }

    /// Creates an empty page.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    /// Returns true if more items exist beyond this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        let seen = (self.page * self.size + self.items.len()) as u64;
        seen < self.total
    }

    /// Returns true if the page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maps the page items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        let req = PageRequest::new(2, 10);
        assert_eq!(req.offset(), 20);
        assert_eq!(req.limit(), 10);
    }

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::new(0, 1000).size, PageRequest::MAX_SIZE);
        assert_eq!(PageRequest::new(0, 0).size, 1);
    }

    #[test]
    fn test_has_more() {
        let req = PageRequest::new(0, 10);
        let page = Page::new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], 25, req);
        assert!(page.has_more());

        let last = Page::new(vec![1, 2, 3, 4, 5], 25, PageRequest::new(2, 10));
        assert!(!last.has_more());
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page::empty(PageRequest::first());
        assert!(page.is_empty());
        assert!(!page.has_more());
        assert_eq!(page.len(), 0);
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2, 3], 3, PageRequest::first());
        let mapped = page.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 3);
    }
}
