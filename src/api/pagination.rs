use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_LIMIT: i64 = 50;
pub(crate) const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default, alias = "offset")]
    pub(crate) skip: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Page {
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl Page {
    pub(crate) fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            skip: skip.unwrap_or(0).max(0),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Self::new(query.skip, query.limit)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl<T> PaginatedResponse<T> {
    pub(crate) fn new(items: Vec<T>, total_count: i64, page: Page) -> Self {
        Self { items, total_count, skip: page.skip, limit: page.limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::new(None, None), Page { skip: 0, limit: DEFAULT_LIMIT });
        assert_eq!(Page::new(Some(-5), Some(0)), Page { skip: 0, limit: 1 });
        assert_eq!(Page::new(Some(20), Some(1000)), Page { skip: 20, limit: MAX_LIMIT });
    }
}
