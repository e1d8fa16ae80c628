/// Pagination
///
/// A pure, stateless transform: given the size of an ordered record set and
/// a requested 1-based page number, compute the slice window and the
/// metadata the templates need for previous/next controls. Out-of-range
/// requests clamp to the nearest valid page; absent or unparseable input
/// defaults to page 1.
use serde::Serialize;

/// Fixed page size for all listing views
pub const POSTS_PER_PAGE: i64 = 10;

/// Parse the `page` query parameter.
pub fn requested_page(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Computed slice window over an ordered record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub per_page: i64,
    pub offset: i64,
    pub limit: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Clamp `requested` into the valid page range and compute offsets.
pub fn window(total_items: i64, per_page: i64, requested: i64) -> PageWindow {
    debug_assert!(per_page > 0);
    let total_pages = if total_items <= 0 {
        1
    } else {
        (total_items + per_page - 1) / per_page
    };
    let number = requested.clamp(1, total_pages);
    let offset = (number - 1) * per_page;
    PageWindow {
        number,
        total_pages,
        total_items: total_items.max(0),
        per_page,
        offset,
        limit: per_page,
        has_previous: number > 1,
        has_next: number < total_pages,
    }
}

/// One page of records plus the metadata rendered as `page_obj`
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            total_pages: window.total_pages,
            total_items: window.total_items,
            has_previous: window.has_previous,
            has_next: window.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_items_split_ten_three() {
        let first = window(13, POSTS_PER_PAGE, 1);
        assert_eq!(first.offset, 0);
        assert_eq!(first.limit, 10);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let second = window(13, POSTS_PER_PAGE, 2);
        assert_eq!(second.offset, 10);
        // the query LIMIT stays at page size; only 3 rows remain to fetch
        assert_eq!(second.limit, 10);
        assert!(!second.has_next);
        assert!(second.has_previous);
    }

    #[test]
    fn out_of_range_clamps_to_last_page() {
        let page = window(13, POSTS_PER_PAGE, 99);
        assert_eq!(page.number, 2);
        assert_eq!(page.offset, 10);
    }

    #[test]
    fn below_range_clamps_to_first_page() {
        let page = window(13, POSTS_PER_PAGE, 0);
        assert_eq!(page.number, 1);
        let page = window(13, POSTS_PER_PAGE, -4);
        assert_eq!(page.number, 1);
    }

    #[test]
    fn empty_set_is_a_single_empty_page() {
        let page = window(0, POSTS_PER_PAGE, 1);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn requested_page_defaults() {
        assert_eq!(requested_page(None), 1);
        assert_eq!(requested_page(Some("")), 1);
        assert_eq!(requested_page(Some("abc")), 1);
        assert_eq!(requested_page(Some("0")), 1);
        assert_eq!(requested_page(Some("-2")), 1);
        assert_eq!(requested_page(Some("3")), 3);
        assert_eq!(requested_page(Some(" 2 ")), 2);
    }
}
