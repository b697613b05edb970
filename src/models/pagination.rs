use serde::{Deserialize, Serialize};

/// Page-number pagination query, shared by every list endpoint
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

impl PageParams {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Resolve to a 1-based page number and a limit within `[1, max_limit]`
    pub fn resolve(&self, default_limit: usize, max_limit: usize) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(default_limit)
            .clamp(1, max_limit.max(1));
        (page, limit)
    }
}

impl<T> Page<T> {
    /// Cut one page out of an already ordered collection
    pub fn from_items(items: Vec<T>, page: usize, limit: usize) -> Self {
        let count = items.len();
        let page = page.max(1);
        let limit = limit.max(1);
        let start = (page - 1).saturating_mul(limit);

        let results: Vec<T> = items.into_iter().skip(start).take(limit).collect();

        Self {
            count,
            next: (start + results.len() < count && !results.is_empty()).then_some(page + 1),
            previous: (page > 1).then_some(page - 1),
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_and_clamps() {
        assert_eq!(PageParams::default().resolve(6, 100), (1, 6));
        assert_eq!(PageParams::new(0, 0).resolve(6, 100), (1, 1));
        assert_eq!(PageParams::new(3, 500).resolve(6, 100), (3, 100));
    }

    #[test]
    fn test_page_from_items() {
        let items: Vec<u32> = (1..=7).collect();

        let first = Page::from_items(items.clone(), 1, 3);
        assert_eq!(first.count, 7);
        assert_eq!(first.results, vec![1, 2, 3]);
        assert_eq!(first.next, Some(2));
        assert_eq!(first.previous, None);

        let last = Page::from_items(items.clone(), 3, 3);
        assert_eq!(last.results, vec![7]);
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));

        let beyond = Page::from_items(items, 10, 3);
        assert!(beyond.results.is_empty());
        assert_eq!(beyond.next, None);
    }

    #[test]
    fn test_page_map() {
        let page = Page::from_items(vec![1, 2], 1, 10).map(|n| n * 10);
        assert_eq!(page.results, vec![10, 20]);
        assert_eq!(page.count, 2);
    }
}
