use serde::Deserialize;
use utoipa::ToSchema;

const fn default_page() -> u64 {
    1
}

#[derive(Debug, Deserialize, ToSchema, PartialEq, Eq, Clone, Copy)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,
    pub page_size: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: None,
        }
    }
}

impl Pagination {
    pub fn with_default_page_size(page: u64) -> Self {
        Self {
            page,
            page_size: None,
        }
    }

    pub fn with_page_size(page: u64, page_size: u64) -> Self {
        Self {
            page,
            page_size: Some(page_size),
        }
    }

    /// Keep only the items on the requested page. Pages start at 1, page 0 is treated as page 1.
    pub fn apply<T>(&self, items: Vec<T>, default_page_size: u64) -> Vec<T> {
        let page_size = self.page_size.unwrap_or(default_page_size);
        let skip = self.page.saturating_sub(1).saturating_mul(page_size);

        items
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::page_zero(Pagination::with_page_size(0, 2), vec![1, 2])]
    #[case::first_page(Pagination::with_page_size(1, 2), vec![1, 2])]
    #[case::second_page(Pagination::with_page_size(2, 2), vec![3, 4])]
    #[case::partial_last_page(Pagination::with_page_size(3, 2), vec![5])]
    #[case::past_the_end(Pagination::with_page_size(9, 2), vec![])]
    #[case::default_size(Pagination::with_default_page_size(1), vec![1, 2, 3])]
    fn apply_returns_requested_window(#[case] pagination: Pagination, #[case] expected: Vec<u32>) {
        assert_eq!(expected, pagination.apply(vec![1, 2, 3, 4, 5], 3));
    }
}
