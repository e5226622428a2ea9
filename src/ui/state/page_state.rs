use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::entities::dataset::{PageState, PageView, SortDirection, SortSpec};
use crate::domain::entities::edit::{BulkOp, DeleteConfirmation};
use crate::domain::entities::filter::{FilterSet, Predicate};
use crate::domain::entities::record::{Record, RecordId};
use crate::usecase::pipeline::bulk::BulkOutcome;
use crate::usecase::pipeline::selection::SelectionSet;
use crate::usecase::ports::repo::RecordStore;
use crate::usecase::services::edit_service::{EditError, EditService};
use crate::usecase::services::query_service::QueryService;

/// View state of one management page: filters, sort, pager and the row
/// selection, over a shared store.
pub struct PageController<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    query: QueryService<R>,
    edits: EditService<R>,
    filters: FilterSet,
    sort: SortSpec,
    page: PageState,
    selection: SelectionSet,
    /// Ids on the page returned by the last `view`.
    visible: Vec<RecordId>,
    seen_len: usize,
}

impl<R: Record> PageController<R> {
    pub fn new(store: Arc<dyn RecordStore<R>>, items_per_page: usize) -> Self {
        let seen_len = store.len();
        Self {
            query: QueryService::new(Arc::clone(&store)),
            edits: EditService::new(Arc::clone(&store)),
            store,
            filters: FilterSet::new(),
            sort: SortSpec::default(),
            page: PageState::new(1, items_per_page),
            selection: SelectionSet::new(),
            visible: Vec::new(),
            seen_len,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore<R>> {
        &self.store
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn page(&self) -> PageState {
        self.page
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// An empty predicate removes the filter.
    pub fn set_filter(&mut self, key: impl Into<String>, predicate: Predicate) {
        let key = key.into();
        if predicate.is_empty() {
            self.filters.remove(&key);
        } else {
            self.filters.set(key, predicate);
        }
        self.filters_changed();
    }

    pub fn remove_filter(&mut self, key: &str) {
        if self.filters.remove(key).is_some() {
            self.filters_changed();
        }
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.filters_changed();
    }

    fn filters_changed(&mut self) {
        self.page = self.page.with_page(1);
        self.selection.clear();
    }

    /// Same key flips direction; a new key starts ascending.
    pub fn toggle_sort(&mut self, key: &str) {
        self.sort = if self.sort.key == key {
            SortSpec::new(key, self.sort.direction.toggled())
        } else {
            SortSpec::new(key, SortDirection::Asc)
        };
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = self.page.with_page(page);
        self.selection.clear();
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.page = PageState::new(1, items_per_page);
        self.selection.clear();
    }

    pub fn toggle_selected(&mut self, id: RecordId) {
        self.selection.toggle(id);
    }

    /// Header checkbox: selects or clears every row on the current page.
    pub fn toggle_all_visible(&mut self, selected: bool) {
        self.selection.toggle_all(&self.visible, selected);
    }

    pub fn all_visible_selected(&self) -> bool {
        self.selection.all_selected(&self.visible)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Any page move made here (store size reset or clamp) also clears the
    /// selection, so a bulk action never reaches rows that went off screen.
    pub fn view(&mut self, now: DateTime<Utc>) -> PageView<R> {
        let requested = self.page.current_page();
        let len = self.store.len();
        if len != self.seen_len {
            debug!(
                kind = R::schema().kind,
                from = self.seen_len,
                to = len,
                "store size changed"
            );
            self.seen_len = len;
            self.page = self.page.with_page(1);
            let store = &self.store;
            self.selection.retain(|id| store.get(id).is_some());
        }

        let mut view = self
            .query
            .view(&self.filters, &self.sort, self.page, &self.selection, now);
        if view.current_page != requested {
            self.selection.clear();
            view.selected.clear();
        }
        self.page = self.page.with_page(view.current_page);
        self.visible = view.window.records.iter().map(R::id).collect();
        view
    }

    /// Every matching record across all pages.
    pub fn matching(&self, now: DateTime<Utc>) -> Vec<R> {
        self.query.matching(&self.filters, &self.sort, now)
    }

    pub fn create(&mut self, draft: R::Draft, now: DateTime<Utc>) -> Result<R, EditError> {
        self.edits.create(draft, now)
    }

    pub fn update(
        &mut self,
        id: RecordId,
        patch: R::Patch,
        now: DateTime<Utc>,
    ) -> Result<R, EditError> {
        self.edits.update(id, patch, now)
    }

    /// What the user has to type before `delete` goes through.
    pub fn delete_confirmation(&self, id: RecordId) -> Option<DeleteConfirmation> {
        self.store.get(id).map(|record| DeleteConfirmation::single(&record))
    }

    /// `Ok(None)` while `typed` does not match the record's name.
    pub fn delete(&mut self, id: RecordId, typed: &str) -> Result<Option<R>, EditError> {
        let Some(confirmation) = self.delete_confirmation(id) else {
            return self.edits.delete(id).map(Some);
        };
        if !confirmation.is_satisfied(typed) {
            return Ok(None);
        }
        let removed = self.edits.delete(id)?;
        self.selection.set(id, false);
        Ok(Some(removed))
    }

    pub fn bulk_update(
        &mut self,
        change: R::Change,
        now: DateTime<Utc>,
    ) -> Result<BulkOutcome<R>, EditError> {
        self.run_bulk(&BulkOp::Update(change), now)
    }

    pub fn bulk_export(&mut self, now: DateTime<Utc>) -> Result<BulkOutcome<R>, EditError> {
        self.run_bulk(&BulkOp::Export, now)
    }

    /// `Ok(None)` unless `typed` is the bulk delete phrase.
    pub fn bulk_delete(
        &mut self,
        typed: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BulkOutcome<R>>, EditError> {
        if !DeleteConfirmation::Bulk.is_satisfied(typed) {
            return Ok(None);
        }
        self.run_bulk(&BulkOp::Delete, now).map(Some)
    }

    fn run_bulk(
        &mut self,
        op: &BulkOp<R>,
        now: DateTime<Utc>,
    ) -> Result<BulkOutcome<R>, EditError> {
        let outcome = self.edits.bulk(op, &self.selection.ids(), now)?;
        self.selection.clear();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::project::{Project, ProjectChange, ProjectDraft, ProjectStatus};
    use crate::infra::memory::store::InMemoryStore;
    use crate::usecase::pipeline::bulk::BulkError;
    use chrono::NaiveDate;

    fn now() -> DateTime<Utc> {
        "2024-05-01T12:00:00Z".parse().expect("timestamp should parse")
    }

    fn draft(n: u32) -> ProjectDraft {
        ProjectDraft {
            name: format!("Project {n:02}"),
            client: "Acme Corporation".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            deadline: NaiveDate::from_ymd_opt(2024, 12, 31),
            progress: 10,
            ..ProjectDraft::default()
        }
    }

    fn controller(count: u32, per_page: usize) -> PageController<Project> {
        let store: Arc<dyn RecordStore<Project>> = Arc::new(InMemoryStore::new());
        let mut controller = PageController::new(store, per_page);
        for n in 1..=count {
            controller.create(draft(n), now()).expect("create should succeed");
        }
        controller
    }

    #[test]
    fn page_size_change_resets_page_and_selection() {
        let mut controller = controller(30, 10);
        controller.view(now());
        controller.set_page(2);
        controller.view(now());
        controller.toggle_all_visible(true);
        assert_eq!(controller.selection().len(), 10);

        controller.set_items_per_page(25);

        assert!(controller.selection().is_empty());
        assert_eq!(controller.view(now()).current_page, 1);
    }

    #[test]
    fn filter_change_returns_to_first_page() {
        let mut controller = controller(30, 10);
        controller.view(now());
        controller.set_page(3);
        controller.toggle_selected(RecordId(25));

        controller.set_filter("search", Predicate::search("project"));

        assert_eq!(controller.page().current_page(), 1);
        assert!(controller.selection().is_empty());
        assert_eq!(controller.view(now()).active_filters, 1);
    }

    #[test]
    fn toggle_sort_flips_then_restarts() {
        let mut controller = controller(0, 10);

        controller.toggle_sort("name");
        assert_eq!(controller.sort(), &SortSpec::asc("name"));
        controller.toggle_sort("name");
        assert_eq!(controller.sort(), &SortSpec::desc("name"));
        controller.toggle_sort("progress");
        assert_eq!(controller.sort(), &SortSpec::asc("progress"));
    }

    #[test]
    fn store_growth_resets_to_first_page() {
        let mut controller = controller(30, 10);
        controller.view(now());
        controller.set_page(3);
        controller.view(now());

        controller.create(draft(31), now()).expect("create should succeed");

        assert_eq!(controller.view(now()).current_page, 1);
    }

    #[test]
    fn delete_waits_for_matching_name() {
        let mut controller = controller(2, 10);

        let pending = controller.delete(RecordId(1), "project 01").expect("delete should not fail");
        assert!(pending.is_none());
        assert_eq!(controller.store().len(), 2);

        let removed = controller.delete(RecordId(1), "Project 01").expect("delete should succeed");
        assert_eq!(removed.map(|p| p.id), Some(RecordId(1)));
        assert_eq!(controller.store().len(), 1);
    }

    #[test]
    fn bulk_actions_clear_selection() {
        let mut controller = controller(3, 10);
        controller.view(now());
        controller.toggle_all_visible(true);

        let outcome = controller
            .bulk_update(ProjectChange::Status(ProjectStatus::Completed), now())
            .expect("bulk should succeed");

        assert_eq!(outcome.affected.len(), 3);
        assert!(controller.selection().is_empty());

        controller.toggle_selected(RecordId(1));
        assert!(controller.bulk_delete("delete", now()).expect("gate should not fail").is_none());
        assert_eq!(controller.selection().len(), 1);
    }

    #[test]
    fn page_change_clears_selection() {
        let mut controller = controller(30, 10);
        controller.view(now());
        controller.toggle_all_visible(true);
        assert_eq!(controller.selection().len(), 10);

        controller.set_page(2);

        assert!(controller.selection().is_empty());
        let view = controller.view(now());
        assert_eq!(view.current_page, 2);
        assert!(view.selected.is_empty());
    }

    #[test]
    fn delete_that_moves_the_page_drops_hidden_selection() {
        let mut controller = controller(30, 10);
        controller.view(now());
        controller.set_page(3);
        controller.view(now());
        controller.toggle_all_visible(true);

        let removed = controller
            .delete(RecordId(21), "Project 21")
            .expect("delete should succeed");
        assert!(removed.is_some());

        let view = controller.view(now());
        assert_eq!(view.current_page, 1);
        assert!(view.selected.is_empty());
        assert!(controller.selection().is_empty());

        let result = controller.bulk_delete("DELETE", now());
        assert!(matches!(
            result,
            Err(EditError::Bulk(BulkError::EmptySelection))
        ));
        assert_eq!(controller.store().len(), 29);
    }

    #[test]
    fn clamped_page_clears_selection() {
        let mut controller = controller(30, 10);
        controller.view(now());
        controller.set_page(3);
        controller.view(now());
        controller.toggle_selected(RecordId(25));

        controller.set_filter("search", Predicate::search("project 0"));
        controller.toggle_selected(RecordId(5));
        controller.set_page(2);
        controller.toggle_selected(RecordId(5));

        let view = controller.view(now());
        assert_eq!(view.current_page, 1);
        assert!(controller.selection().is_empty());
    }
}
