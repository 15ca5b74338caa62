//! Pagination types
//!
//! Pages are 1-based and sized through `page`/`size` query parameters.

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Maximum items per page
const MAX_SIZE: u32 = 100;

/// Default items per page
pub const DEFAULT_SIZE: u32 = 10;

const STRICT_MESSAGE: &str =
    "Invalid page or size parameter. Both must be positive integers greater than zero.";

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 100)
    pub size: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Size is clamped to 1..=100
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, MAX_SIZE),
        }
    }

    /// Both values must be present and positive; used by the listing
    /// endpoints that reject malformed paging instead of defaulting.
    pub fn strict(page: Option<&str>, size: Option<&str>) -> Result<Self, ValidationError> {
        let parse = |raw: Option<&str>| {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v > 0)
        };
        match (parse(page), parse(size)) {
            (Some(page), Some(size)) => Ok(Self::new(
                u32::try_from(page).unwrap_or(u32::MAX),
                u32::try_from(size).unwrap_or(MAX_SIZE),
            )),
            _ => Err(ValidationError::message(STRICT_MESSAGE)),
        }
    }

    /// Number of documents to skip.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    /// Maximum number of documents to return.
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_SIZE,
        }
    }
}

/// Paginated result wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items for current page
    pub items: Vec<T>,
    /// Total count across all pages
    pub total: u64,
    /// Current page number
    pub page: u32,
    /// Items per page
    pub size: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, page: Pagination) -> Self {
        Self {
            items,
            total,
            page: page.page,
            size: page.size,
        }
    }

    /// Calculate total number of pages.
    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            1
        } else {
            let pages = self.total.div_ceil(u64::from(self.size));
            u32::try_from(pages).unwrap_or(u32::MAX).max(1)
        }
    }

    /// Check if there's a next page.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

/// Query parameters for pagination.
///
/// Kept as raw strings so that malformed numbers fall back to defaults
/// instead of failing query extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

impl PageQuery {
    /// Lenient conversion with a caller-chosen default size.
    pub fn with_default_size(&self, default_size: u32) -> Pagination {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(|v| v.trim().parse::<u32>().ok());
        Pagination::new(
            parse(&self.page).unwrap_or(1),
            parse(&self.size).filter(|s| *s > 0).unwrap_or(default_size),
        )
    }

    pub fn strict(&self) -> Result<Pagination, ValidationError> {
        Pagination::strict(self.page.as_deref(), self.size.as_deref())
    }
}

impl From<PageQuery> for Pagination {
    fn from(params: PageQuery) -> Self {
        params.with_default_size(DEFAULT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_calculation() {
        assert_eq!(Pagination::new(1, 10).skip(), 0);
        assert_eq!(Pagination::new(2, 10).skip(), 10);
        assert_eq!(Pagination::new(3, 25).skip(), 50);
    }

    #[test]
    fn clamps_page_and_size() {
        assert_eq!(Pagination::new(0, 10).page, 1);
        assert_eq!(Pagination::new(1, 0).size, 1);
        assert_eq!(Pagination::new(1, 999).size, 100);
    }

    #[test]
    fn defaults_to_ten_per_page() {
        let page = Pagination::from(PageQuery::default());
        assert_eq!(page, Pagination { page: 1, size: 10 });

        let page = Pagination::from(PageQuery {
            page: Some("abc".into()),
            size: Some("-4".into()),
        });
        assert_eq!(page, Pagination { page: 1, size: 10 });
    }

    #[test]
    fn caller_default_size() {
        let query = PageQuery {
            page: Some("2".into()),
            size: None,
        };
        assert_eq!(query.with_default_size(5), Pagination { page: 2, size: 5 });
    }

    #[test]
    fn strict_rejects_missing_or_non_positive() {
        assert!(Pagination::strict(Some("1"), Some("10")).is_ok());
        assert!(Pagination::strict(None, Some("10")).is_err());
        assert!(Pagination::strict(Some("0"), Some("10")).is_err());
        assert!(Pagination::strict(Some("1"), Some("x")).is_err());

        let err = Pagination::strict(Some("-1"), Some("10")).unwrap_err();
        assert!(err.to_string().starts_with("Invalid page or size parameter"));
    }

    #[test]
    fn total_pages() {
        let paginated: Paginated<()> = Paginated {
            items: vec![],
            total: 0,
            page: 1,
            size: 10,
        };
        assert_eq!(paginated.total_pages(), 1);

        let paginated: Paginated<()> = Paginated {
            items: vec![],
            total: 25,
            page: 1,
            size: 10,
        };
        assert_eq!(paginated.total_pages(), 3);
    }

    #[test]
    fn has_next_prev() {
        let paginated: Paginated<()> = Paginated {
            items: vec![],
            total: 30,
            page: 2,
            size: 10,
        };
        assert!(paginated.has_next());
        assert!(paginated.has_prev());

        let last: Paginated<()> = Paginated {
            items: vec![],
            total: 30,
            page: 3,
            size: 10,
        };
        assert!(!last.has_next());
    }
}
