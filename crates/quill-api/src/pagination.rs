use quill_types::api::PageMeta;

/// Items per feed page. Fixed everywhere; never configurable per request.
pub const PAGE_SIZE: u32 = 10;

/// Clamp a requested 1-based page number against the total item count.
/// Page 0 or negative maps to the first page, past-the-end maps to the
/// last; an empty set still has exactly one (empty) page.
pub fn paginate(total_items: u64, requested: i64) -> PageMeta {
    let total_pages = total_items.div_ceil(PAGE_SIZE as u64).max(1);
    let number = if requested < 1 {
        1
    } else {
        (requested as u64).min(total_pages)
    };

    PageMeta {
        number,
        total_pages,
        total_items,
        has_next: number < total_pages,
        has_prev: number > 1,
    }
}

pub fn offset(page: &PageMeta) -> u64 {
    (page.number - 1) * PAGE_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_is_ceiling_of_total() {
        assert_eq!(paginate(0, 1).total_pages, 1);
        assert_eq!(paginate(1, 1).total_pages, 1);
        assert_eq!(paginate(10, 1).total_pages, 1);
        assert_eq!(paginate(11, 1).total_pages, 2);
        assert_eq!(paginate(95, 1).total_pages, 10);
    }

    #[test]
    fn out_of_range_pages_clamp() {
        // page(0) == page(1) == first
        assert_eq!(paginate(25, 0), paginate(25, 1));
        assert_eq!(paginate(25, -7), paginate(25, 1));
        // past-the-end == last
        assert_eq!(paginate(25, 99).number, 3);
        assert_eq!(paginate(25, 99), paginate(25, 3));
    }

    #[test]
    fn empty_set_is_one_empty_page() {
        let page = paginate(0, 5);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_items, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn offsets_step_by_page_size() {
        assert_eq!(offset(&paginate(25, 1)), 0);
        assert_eq!(offset(&paginate(25, 2)), 10);
        assert_eq!(offset(&paginate(25, 3)), 20);
        // clamped page yields the last page's offset
        assert_eq!(offset(&paginate(25, 99)), 20);
    }

    #[test]
    fn navigation_flags() {
        let middle = paginate(25, 2);
        assert!(middle.has_next);
        assert!(middle.has_prev);

        let first = paginate(25, 1);
        assert!(first.has_next);
        assert!(!first.has_prev);

        let last = paginate(25, 3);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }
}
