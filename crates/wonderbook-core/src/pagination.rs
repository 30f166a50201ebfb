/// Books per page in every list view.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Window of 1-based `page`. No clamping: a page past the end (or page 0)
/// is an empty slice, so callers decide whether to disable the control.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Number of non-empty pages.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        len.div_ceil(page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slices_of_25_items() {
        let items: Vec<usize> = (0..25).collect();
        assert_eq!(paginate(&items, 1, 10), &items[0..10]);
        assert_eq!(paginate(&items, 3, 10), &items[20..25]);
        assert_eq!(paginate(&items, 3, 10).len(), 5);
        assert!(paginate(&items, 4, 10).is_empty());
        assert_eq!(page_count(items.len(), 10), 3);
    }

    #[test]
    fn test_degenerate_inputs() {
        let items = [1, 2, 3];
        assert!(paginate(&items, 0, 10).is_empty());
        assert!(paginate(&items, 1, 0).is_empty());
        assert!(paginate::<u8>(&[], 1, 10).is_empty());
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(paginate(&items, usize::MAX, 10).len(), 0);
    }
}
