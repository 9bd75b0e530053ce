//! Sorting and pagination for catalog listings.
//!
//! Both are built leniently from raw request parameters: anything that isn't
//! recognised falls back to a default instead of failing, and only whitelisted
//! column names ever reach the SQL text.

use derive_more::Display;
use std::str::FromStr;

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

/// Columns a listing may be ordered by.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    #[display("title")]
    Title,
    #[display("author")]
    Author,
    #[display("publisher")]
    Publisher,
    #[display("year")]
    Year,
    #[default]
    #[display("created_at")]
    CreatedAt,
    #[display("updated_at")]
    UpdatedAt,
    #[display("isbn")]
    Isbn,
}

impl SortBy {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Publisher => "publisher",
            Self::Year => "year",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Isbn => "isbn",
        }
    }
}

impl SortBy {
    fn is_text(&self) -> bool {
        matches!(self, Self::Title | Self::Author | Self::Publisher)
    }
}

impl FromStr for SortBy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "publisher" => Ok(Self::Publisher),
            "year" => Ok(Self::Year),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "isbn" => Ok(Self::Isbn),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    #[display("asc")]
    Asc,
    #[default]
    #[display("desc")]
    Desc,
}

impl SortOrder {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

/// Listing order: a whitelisted column plus direction.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq)]
#[display("{by} {order}")]
pub struct Sort {
    pub by: SortBy,
    pub order: SortOrder,
}

impl Sort {
    /// Parse raw request parameters, silently falling back to
    /// `created_at`/`desc` for anything unrecognised.
    pub fn parse(by: &str, order: &str) -> Self {
        Self {
            by: by.parse().unwrap_or_default(),
            order: order.parse().unwrap_or_default(),
        }
    }

    /// `ORDER BY` clause. Ties are broken on `id` (time-ordered) in the same
    /// direction, so equal sort keys keep a stable position across pages.
    /// Text columns compare case-insensitively.
    pub(crate) fn order_by(&self) -> String {
        let direction = self.order.keyword();
        let collation = if self.by.is_text() { " COLLATE NOCASE" } else { "" };
        format!("ORDER BY {}{collation} {direction}, id {direction}", self.by.column())
    }
}

/// A normalized, 1-based page request.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("page {page} ({per_page} per page)")]
pub struct Pagination {
    page: u32,
    per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PER_PAGE }
    }
}

impl Pagination {
    /// Pages below 1 become 1; page sizes outside `1..=100` become 25.
    pub fn new(page: i64, per_page: i64) -> Self {
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        let per_page = u32::try_from(per_page)
            .ok()
            .filter(|n| (1..=MAX_PER_PAGE).contains(n))
            .unwrap_or(DEFAULT_PER_PAGE);
        Self { page, per_page }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub(crate) fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub(crate) fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.per_page)
    }
}

/// `LIKE` pattern matching `query` as a literal substring.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
