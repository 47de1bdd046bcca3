use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

const MAX_PER_PAGE: u64 = 100;

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    /// Rows to skip. Follows the clamped `limit()` and stays within `i64`
    /// so callers can hand it to SQL unchanged.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit())
            .min(i64::MAX as u64)
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        let total_pages = total.div_ceil(per_page);
        Self {
            items,
            total,
            page: params.page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_starts_at_zero() {
        let params = PaginationParams { page: 1, per_page: 20 };
        assert_eq!(params.offset(), 0);
        let params = PaginationParams { page: 3, per_page: 10 };
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn page_zero_does_not_underflow() {
        let params = PaginationParams { page: 0, per_page: 10 };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn limit_is_capped() {
        let params = PaginationParams { page: 1, per_page: 500 };
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams { page: 1, per_page: 20 };
        let page = Paginated::new(vec![1, 2, 3], 41, &params);
        assert_eq!(page.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn zero_per_page_is_raised_to_one() {
        let params = PaginationParams { page: 3, per_page: 0 };
        assert_eq!(params.limit(), 1);
        assert_eq!(params.offset(), 2);

        let page = Paginated::new(vec![1], 5, &params);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.total_pages, 5);
    }

    #[test]
    fn offset_uses_capped_page_size() {
        let params = PaginationParams { page: 2, per_page: 500 };
        assert_eq!(params.offset(), 100);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let params = PaginationParams { page: u64::MAX, per_page: 100 };
        assert_eq!(params.offset(), i64::MAX as u64);
    }
}
