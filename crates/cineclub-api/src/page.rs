//! Generic paginated-fetch support.
//!
//! List endpoints answer with the `{count, next, previous, results}`
//! envelope. [`Pager`] accumulates pages into one list and tells the
//! caller when to stop: `next == null` means `has_more == false` and no
//! further request may be issued.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug)]
pub struct Pager<T> {
    pub items: Vec<T>,
    next_page: u32,
    has_more: bool,
}

impl<T> Pager<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_page: 1,
            has_more: true,
        }
    }

    /// Page number the next request should ask for (1-based).
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Append a fetched page and advance the cursor.
    pub fn absorb(&mut self, page: Page<T>) {
        self.items.extend(page.results);
        self.has_more = page.next.is_some();
        self.next_page += 1;
    }
}

impl<T> Default for Pager<T> {
    fn default() -> Self {
        Self::new()
    }
}
