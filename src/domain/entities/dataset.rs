use crate::domain::entities::record::RecordId;

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Column sort. An empty key keeps store order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn asc(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Asc)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Desc)
    }

    pub fn is_unsorted(&self) -> bool {
        self.key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    current_page: usize,
    items_per_page: usize,
}

impl PageState {
    /// Both values are clamped to at least 1.
    pub fn new(current_page: usize, items_per_page: usize) -> Self {
        Self {
            current_page: current_page.max(1),
            items_per_page: items_per_page.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn with_page(self, page: usize) -> Self {
        Self::new(page, self.items_per_page)
    }

    pub fn with_items_per_page(self, items_per_page: usize) -> Self {
        Self::new(self.current_page, items_per_page)
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        total_items.div_ceil(self.items_per_page)
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow<R> {
    pub records: Vec<R>,
    pub total_pages: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub total_items: usize,
}

impl<R> PageWindow<R> {
    /// An empty result still shows as "page 1 of 1".
    pub fn display_total_pages(&self) -> usize {
        self.total_pages.max(1)
    }

    /// 1-based "Showing a-b of n" bounds; `(0, 0)` for an empty window.
    pub fn display_range(&self) -> (usize, usize) {
        if self.records.is_empty() {
            (0, 0)
        } else {
            (self.start_index + 1, self.end_index)
        }
    }
}

/// A page-button slot in the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Gap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView<R> {
    pub window: PageWindow<R>,
    pub current_page: usize,
    pub items_per_page: usize,
    pub visible_pages: Vec<PageLink>,
    pub selected: Vec<RecordId>,
    pub active_filters: usize,
}
