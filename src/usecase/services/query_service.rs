use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::entities::dataset::{PageState, PageView, SortSpec};
use crate::domain::entities::filter::FilterSet;
use crate::domain::entities::record::{Record, RecordId};
use crate::usecase::pipeline::selection::SelectionSet;
use crate::usecase::pipeline::{filter, paginate, sort};
use crate::usecase::ports::repo::RecordStore;

/// Read side of a record kind: filter, sort and slice a store snapshot.
pub struct QueryService<R: Record> {
    store: Arc<dyn RecordStore<R>>,
}

impl<R: Record> QueryService<R> {
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self { store }
    }

    pub fn view(
        &self,
        filters: &FilterSet,
        sort_spec: &SortSpec,
        page: PageState,
        selection: &SelectionSet,
        now: DateTime<Utc>,
    ) -> PageView<R> {
        compute_view(&self.store.list(), filters, sort_spec, page, selection, now)
    }

    /// Every record passing `filters`, in sorted order. Used for exports of
    /// the whole result rather than one page.
    pub fn matching(
        &self,
        filters: &FilterSet,
        sort_spec: &SortSpec,
        now: DateTime<Utc>,
    ) -> Vec<R> {
        let filtered = filter::apply(&self.store.list(), filters, now);
        sort::sort(&filtered, sort_spec)
    }
}

/// Filter, then sort, then paginate. A page past the end is pulled back to
/// the last page, or to page 1 when nothing matches.
pub fn compute_view<R: Record>(
    records: &[R],
    filters: &FilterSet,
    sort_spec: &SortSpec,
    page: PageState,
    selection: &SelectionSet,
    now: DateTime<Utc>,
) -> PageView<R> {
    let filtered = filter::apply(records, filters, now);
    let sorted = sort::sort(&filtered, sort_spec);

    let total_pages = page.total_pages(sorted.len());
    let page = page.with_page(page.current_page().min(total_pages.max(1)));
    let window = paginate::paginate(&sorted, page);

    debug!(
        kind = R::schema().kind,
        total = records.len(),
        matched = window.total_items,
        page = page.current_page(),
        "view recomputed"
    );

    let selected: Vec<RecordId> = selection.ids();
    PageView {
        visible_pages: paginate::visible_pages(page.current_page(), window.total_pages),
        current_page: page.current_page(),
        items_per_page: page.items_per_page(),
        active_filters: filters.active_count(),
        selected,
        window,
    }
}
