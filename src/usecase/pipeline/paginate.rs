use crate::domain::entities::dataset::{PageLink, PageState, PageWindow};

const PAGE_DELTA: usize = 2;

pub fn paginate<R: Clone>(records: &[R], state: PageState) -> PageWindow<R> {
    let len = records.len();
    let per_page = state.items_per_page();
    let start_index = (state.current_page() - 1).saturating_mul(per_page).min(len);
    let end_index = start_index.saturating_add(per_page).min(len);

    PageWindow {
        records: records[start_index..end_index].to_vec(),
        total_pages: state.total_pages(len),
        start_index,
        end_index,
        total_items: len,
    }
}

/// Pager buttons: the first and last page always, `PAGE_DELTA` pages either
/// side of `current`, and a gap wherever pages are skipped.
pub fn visible_pages(current: usize, total: usize) -> Vec<PageLink> {
    if total <= 1 {
        return vec![PageLink::Page(1)];
    }
    let current = current.clamp(1, total);
    let low = current.saturating_sub(PAGE_DELTA).max(2);
    let high = (current + PAGE_DELTA).min(total - 1);

    let mut links = vec![PageLink::Page(1)];
    if low > 2 {
        links.push(PageLink::Gap);
    }
    links.extend((low..=high).map(PageLink::Page));
    if high + 1 < total {
        links.push(PageLink::Gap);
    }
    links.push(PageLink::Page(total));
    links
}
