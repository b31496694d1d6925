//! Pagination types shared by the list endpoints

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{api_success_with_meta, ApiResponse, PaginationInfo, ResponseMetadata};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Standard pagination parameters for list endpoints
#[derive(Debug, Deserialize, IntoParams, ToSchema, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[param(example = 50, minimum = 1, maximum = 500)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Page number, defaults to 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page().saturating_sub(1)) * i64::from(self.page_size())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }

    /// Total pages for `total_count` rows; an empty result still has one page
    pub fn total_pages(&self, total_count: i64) -> u32 {
        let size = i64::from(self.page_size());
        let pages = (total_count.max(0) + size - 1) / size;
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    pub fn to_metadata(&self, total_count: i64) -> ResponseMetadata {
        let total_pages = self.total_pages(total_count);

        ResponseMetadata {
            pagination: Some(PaginationInfo {
                page: self.page(),
                page_size: self.page_size(),
                total_pages,
                has_next: self.page() < total_pages,
                has_previous: self.page() > 1,
            }),
            total_count: Some(total_count),
        }
    }

    /// Wrap data with pagination metadata
    pub fn wrap_response<T>(&self, data: T, total_count: i64) -> ApiResponse<T> {
        api_success_with_meta(data, self.to_metadata(total_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<u32>, page_size: Option<u32>) -> PaginationParams {
        PaginationParams { page, page_size }
    }

    #[test]
    fn test_pagination_defaults() {
        let p = params(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), 50);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_offset() {
        assert_eq!(params(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(params(Some(0), None).page(), 1);
        assert_eq!(params(None, Some(0)).page_size(), 1);
        assert_eq!(params(None, Some(10_000)).page_size(), 500);
    }

    #[test]
    fn test_total_pages() {
        let p = params(Some(1), Some(20));
        assert_eq!(p.total_pages(100), 5);
        assert_eq!(p.total_pages(101), 6);
        assert_eq!(p.total_pages(0), 1);
        assert_eq!(p.total_pages(15), 1);
    }

    #[test]
    fn test_to_metadata_middle_page() {
        let metadata = params(Some(2), Some(20)).to_metadata(100);
        let pagination = metadata.pagination.unwrap();
        assert_eq!(pagination.total_pages, 5);
        assert!(pagination.has_next);
        assert!(pagination.has_previous);
        assert_eq!(metadata.total_count, Some(100));
    }

    #[test]
    fn test_to_metadata_last_page() {
        let pagination = params(Some(5), Some(20)).to_metadata(100).pagination.unwrap();
        assert!(pagination.has_previous);
        assert!(!pagination.has_next);
    }

    #[test]
    fn test_wrap_response() {
        let response = params(None, None).wrap_response(vec!["a", "b"], 2);
        assert!(response.success);
        assert_eq!(response.metadata.unwrap().total_count, Some(2));
    }
}
