//! Catalogue/graph join and the table row model
//!
//! Each catalogue measure becomes one row, paired with the first discovered
//! work item whose raw `System.Tags` contains the measure name (ignoring
//! case). Names are the only join key: renaming a measure leaves its earlier
//! work item unmatched.

use cc_model::tags::{split_tags, tags_contain};
use cc_model::{Measure, WorkItem, WorkItemId};
use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

/// One catalogue measure and its work item, if any
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureRow {
    /// No work item tracks this measure yet
    Unlinked(Measure),
    /// Tracked by a work item
    Linked(Measure, WorkItem),
}

impl MeasureRow {
    /// The catalogue entry
    #[must_use]
    pub fn measure(&self) -> &Measure {
        match self {
            Self::Unlinked(m) | Self::Linked(m, _) => m,
        }
    }

    /// The linked work item
    #[must_use]
    pub fn work_item(&self) -> Option<&WorkItem> {
        match self {
            Self::Unlinked(_) => None,
            Self::Linked(_, wi) => Some(wi),
        }
    }

    /// Whether a work item tracks the measure
    #[must_use]
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked(..))
    }

    /// Tags shown in the tag column.
    ///
    /// Linked rows show the work item's tags without the measure name and
    /// the conformance tag; unlinked rows show the measure's additional tags.
    #[must_use]
    pub fn visible_tags(&self, conformance_tag: &str) -> Vec<String> {
        match self {
            Self::Unlinked(m) => m.additional_tag_list().map(str::to_string).collect(),
            Self::Linked(m, wi) => split_tags(wi.tags().unwrap_or_default())
                .filter(|t| {
                    !t.eq_ignore_ascii_case(&m.name) && !t.eq_ignore_ascii_case(conformance_tag)
                })
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Pair every catalogue measure with its discovered work item.
///
/// Output order is catalogue order; `discovered` order only matters when
/// several work items match one measure (the first wins).
#[must_use]
pub fn join(catalogue: &[Measure], discovered: &[WorkItem]) -> Vec<MeasureRow> {
    catalogue
        .iter()
        .map(|measure| {
            discovered
                .iter()
                .find(|wi| wi.tags().is_some_and(|tags| tags_contain(tags, &measure.name)))
                .map_or_else(
                    || MeasureRow::Unlinked(measure.clone()),
                    |wi| MeasureRow::Linked(measure.clone(), wi.clone()),
                )
        })
        .collect()
}

/// Lifecycle of a row within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowState {
    /// Selectable; no work item
    Unlinked,
    /// A create is in flight
    Creating,
    /// Tracked by a work item; terminal
    Linked,
}

/// One table slot. `row` is `None` while the table is being refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    /// Row content, absent while blanked
    pub row: Option<MeasureRow>,
    creating: bool,
}

impl TableEntry {
    /// Entry with content
    #[must_use]
    pub fn new(row: MeasureRow) -> Self {
        Self {
            row: Some(row),
            creating: false,
        }
    }

    /// Blank placeholder
    #[must_use]
    pub fn blank() -> Self {
        Self {
            row: None,
            creating: false,
        }
    }

    /// Current state; blanks count as unlinked
    #[must_use]
    pub fn state(&self) -> RowState {
        match &self.row {
            Some(row) if row.is_linked() => RowState::Linked,
            _ if self.creating => RowState::Creating,
            _ => RowState::Unlinked,
        }
    }

    /// Only unlinked rows with content may be selected
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.row.is_some() && self.state() == RowState::Unlinked
    }

    pub(crate) fn set_creating(&mut self, creating: bool) {
        self.creating = creating;
    }

    pub(crate) fn link(&mut self, work_item: WorkItem) {
        if let Some(row) = self.row.take() {
            self.row = Some(MeasureRow::Linked(row.measure().clone(), work_item));
        }
        self.creating = false;
    }
}

/// Sortable table columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    /// Measure name
    Name,
    /// Work-item id
    WorkItem,
    /// Additional tags
    Tags,
    /// State, then reason
    State,
    /// Last modification, newest first
    LastModified,
    /// Assignee display name
    AssignedTo,
}

impl SortColumn {
    /// All columns in table order
    pub const ALL: [Self; 6] = [
        Self::Name,
        Self::WorkItem,
        Self::Tags,
        Self::State,
        Self::LastModified,
        Self::AssignedTo,
    ];

    /// Column key used on the command line
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::WorkItem => "work-item",
            Self::Tags => "tags",
            Self::State => "state",
            Self::LastModified => "last-modified",
            Self::AssignedTo => "assigned-to",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let keys: Vec<_> = Self::ALL.iter().map(|c| c.key()).collect();
                format!("unknown column {s:?}; expected one of {}", keys.join(", "))
            })
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Case-insensitive first, exact as tie-break
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn locale_key_cmp(a: &(String, Option<String>), b: &(String, Option<String>)) -> Ordering {
    locale_cmp(&a.0, &b.0).then_with(|| match (&a.1, &b.1) {
        (Some(x), Some(y)) => locale_cmp(x, y),
        (x, y) => x.cmp(y),
    })
}

/// Defined keys are ordered by `order`; missing keys always come first.
fn cmp_defined<T>(a: Option<T>, b: Option<T>, order: SortOrder, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => order.apply(cmp(&a, &b)),
    }
}

fn work_item_id(row: &MeasureRow) -> Option<WorkItemId> {
    row.work_item().map(|wi| wi.id)
}

fn last_modified(row: &MeasureRow) -> Option<Reverse<DateTime<Utc>>> {
    row.work_item().and_then(WorkItem::changed_date).map(Reverse)
}

fn state_key(row: &MeasureRow) -> Option<(String, Option<String>)> {
    let wi = row.work_item()?;
    Some((wi.state()?.to_string(), wi.reason().map(str::to_string)))
}

fn assignee(row: &MeasureRow) -> Option<String> {
    row.work_item()?.assigned_to().map(|id| id.display_name)
}

/// Compare two rows on one column
#[must_use]
pub fn compare_rows(a: &MeasureRow, b: &MeasureRow, column: SortColumn, order: SortOrder) -> Ordering {
    match column {
        SortColumn::Name => order.apply(locale_cmp(&a.measure().name, &b.measure().name)),
        SortColumn::WorkItem => cmp_defined(work_item_id(a), work_item_id(b), order, Ord::cmp),
        SortColumn::Tags => cmp_defined(
            a.measure().additional_tags.as_deref(),
            b.measure().additional_tags.as_deref(),
            order,
            |x, y| locale_cmp(x, y),
        ),
        SortColumn::State => cmp_defined(state_key(a), state_key(b), order, locale_key_cmp),
        SortColumn::LastModified => cmp_defined(last_modified(a), last_modified(b), order, Ord::cmp),
        SortColumn::AssignedTo => {
            cmp_defined(assignee(a), assignee(b), order, |x, y| locale_cmp(x, y))
        }
    }
}

/// Compare table entries; blanks sort first
#[must_use]
pub fn compare_entries(a: &TableEntry, b: &TableEntry, column: SortColumn, order: SortOrder) -> Ordering {
    match (&a.row, &b.row) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_rows(x, y, column, order),
    }
}

/// Stable sort of table entries
pub fn sort_entries(entries: &mut [TableEntry], column: SortColumn, order: SortOrder) {
    entries.sort_by(|a, b| compare_entries(a, b, column, order));
}
