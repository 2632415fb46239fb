//! Page-number pagination helpers.

use serde::Serialize;

/// One-based page window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Build a request from a raw `page` query value; absent, unparsable or zero means page 1.
    pub fn from_param(raw: Option<&str>, per_page: u32) -> Self {
        Self::new(parse_page_param(raw), per_page)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

pub fn parse_page_param(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

/// One page of results together with the information needed to link neighbours.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }

    pub fn total_pages(&self) -> u32 {
        let per_page = u64::from(self.per_page.max(1));
        let pages = self.total.div_ceil(per_page).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn prev_page(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        (self.page < self.total_pages()).then(|| self.page + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_param_defaults_to_first_page() {
        assert_eq!(parse_page_param(None), 1);
        assert_eq!(parse_page_param(Some("abc")), 1);
        assert_eq!(parse_page_param(Some("0")), 1);
        assert_eq!(parse_page_param(Some("-3")), 1);
        assert_eq!(parse_page_param(Some(" 4 ")), 4);
    }

    #[test]
    fn offset_follows_page_and_size() {
        let request = PageRequest::from_param(Some("3"), 5);
        assert_eq!(request.offset(), 10);
        assert_eq!(request.limit(), 5);
    }

    #[test]
    fn neighbours_are_bounded_by_total() {
        let page = Paginated::new(vec![1, 2], PageRequest::new(2, 2), 5);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.prev_page(), Some(1));
        assert_eq!(page.next_page(), Some(3));

        let last = Paginated::new(vec![5], PageRequest::new(3, 2), 5);
        assert_eq!(last.next_page(), None);

        let empty: Paginated<u8> = Paginated::new(Vec::new(), PageRequest::new(1, 5), 0);
        assert_eq!(empty.total_pages(), 1);
        assert_eq!(empty.prev_page(), None);
        assert_eq!(empty.next_page(), None);
    }
}
