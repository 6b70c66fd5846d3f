//! Database repositories
//!
//! Repositories are grouped into catalog/ (entries, images, entry files), tagging/
//! (tags, tag types) and control/ (accounts). Methods taking `&mut PgConnection` are
//! meant to be composed inside a [`TransactionGuard`].

pub mod catalog;
pub mod control;
pub mod tagging;
pub mod transaction;

pub use catalog::{EntryFileRepository, EntryRepository, ImageRepository};
pub use control::UserRepository;
pub use tagging::{TagRepository, TagTypeRepository};
pub use transaction::{contains_pattern, TransactionGuard};

/// One-based page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, page_size: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offsets() {
        let page = Pagination::new(Some(3), 12);
        assert_eq!(page.limit(), 12);
        assert_eq!(page.offset(), 24);

        let first = Pagination::new(None, 24);
        assert_eq!(first.offset(), 0);

        let clamped = Pagination::new(Some(-4), 0);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.page_size, 1);
    }
}
