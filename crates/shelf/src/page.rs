use libris_catalog::{Book, Pagination};

/// One page of a book listing or search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedBookList {
    pub books: Vec<Book>,
    pub per_page: u32,
    pub page: u32,
    /// Matching books across all pages.
    pub total_count: u64,
}

impl PaginatedBookList {
    pub fn new(books: Vec<Book>, pagination: Pagination, total_count: u64) -> Self {
        Self {
            books,
            per_page: pagination.per_page(),
            page: pagination.page(),
            total_count,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.per_page.max(1)))
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}
