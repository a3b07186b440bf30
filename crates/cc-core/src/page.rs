//! Work-item page controller
//!
//! Drives the measure table shown on a work-item form: discovery on form
//! lifecycle events, selection, sorting and the Create action.
//!
//! Locks are never held across an await. Each change of parent bumps an
//! epoch; results of discovery or creation started under an older epoch are
//! dropped.

use crate::error::{ConformanceError, Result};
use crate::graph::GraphEngine;
use crate::notify::{Banner, Notifier};
use crate::session::SessionContext;
use crate::settings_store::SettingsStore;
use crate::table::{join, sort_entries, RowState, SortColumn, SortOrder, TableEntry};
use cc_model::{Settings, WorkItemId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Work-item form lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    /// A work item was loaded into the form
    Loaded(WorkItemId),
    /// The open work item was saved
    Saved,
    /// Unsaved changes were discarded
    Reset,
    /// The open work item was reloaded from the server
    Refreshed,
}

/// Outcome of a Create action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    /// Newly created measure work items, in creation order
    pub created: Vec<WorkItemId>,
    /// Existing work items linked to their rows
    pub adopted: Vec<WorkItemId>,
    /// Rows skipped because they were already linked
    pub skipped: Vec<String>,
    /// The parent changed mid-way; the rest was dropped
    pub discarded: bool,
}

#[derive(Debug, Default)]
struct PageState {
    parent: Option<WorkItemId>,
    epoch: u64,
    settings: Option<Settings>,
    entries: Vec<TableEntry>,
    selection: Vec<String>,
    sort: Option<(SortColumn, SortOrder)>,
    loaded: bool,
    creating: bool,
}

impl PageState {
    fn entry_mut(&mut self, name: &str) -> Option<&mut TableEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.row.as_ref().is_some_and(|r| r.measure().name == name))
    }

    fn entry(&self, name: &str) -> Option<&TableEntry> {
        self.entries
            .iter()
            .find(|e| e.row.as_ref().is_some_and(|r| r.measure().name == name))
    }
}

/// Clears the page's creating flag when a Create run ends, however it ends
struct CreatingGuard<'a>(&'a Mutex<PageState>);

impl Drop for CreatingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().creating = false;
    }
}

/// Controller of the conformance table on a work-item form
pub struct WorkItemPage {
    engine: Arc<GraphEngine>,
    store: Arc<SettingsStore>,
    session: Arc<SessionContext>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<PageState>,
}

impl std::fmt::Debug for WorkItemPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItemPage")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl WorkItemPage {
    /// Create a page controller
    #[must_use]
    pub fn new(
        engine: Arc<GraphEngine>,
        store: Arc<SettingsStore>,
        session: Arc<SessionContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            store,
            session,
            notifier,
            state: Mutex::new(PageState::default()),
        }
    }

    /// Initial load for the work item open in the form.
    ///
    /// # Errors
    /// [`ConformanceError::Precondition`] without an open work item (the
    /// table stays empty), or a backend failure during discovery.
    pub async fn load(&self) -> Result<()> {
        let parent = match self.session.current_work_item().await {
            Ok(parent) => parent,
            Err(err) => {
                tracing::warn!(error = %err, "conformance table unavailable");
                return Err(err);
            }
        };
        self.update_items(parent).await.map(|_| ())
    }

    /// React to a form lifecycle event. Returns whether rows were reloaded.
    ///
    /// # Errors
    /// Backend failure during discovery, or no open work item.
    pub async fn handle_event(&self, event: FormEvent) -> Result<bool> {
        let parent = match event {
            FormEvent::Loaded(id) => {
                let shown = {
                    let state = self.state.lock();
                    state.loaded && state.parent == Some(id)
                };
                if shown {
                    tracing::debug!(id, "same work item loaded; keeping rows");
                    return Ok(false);
                }
                id
            }
            FormEvent::Saved | FormEvent::Reset => self.session.current_work_item().await?,
            FormEvent::Refreshed => {
                {
                    let mut state = self.state.lock();
                    let len = state.entries.len();
                    state.entries = vec![TableEntry::blank(); len];
                }
                self.session.current_work_item().await?
            }
        };
        self.update_items(parent).await
    }

    async fn update_items(&self, parent: WorkItemId) -> Result<bool> {
        let epoch = {
            let mut state = self.state.lock();
            if state.parent != Some(parent) {
                if let Some(previous) = state.parent.replace(parent) {
                    self.engine.forget(previous);
                }
                state.epoch += 1;
                state.selection.clear();
                state.loaded = false;
            }
            state.epoch
        };

        let settings = self.settings().await;
        let discovered = match self.engine.discover(parent, &settings).await {
            Ok(discovered) => discovered,
            Err(err) => {
                let mut state = self.state.lock();
                if state.epoch == epoch {
                    // Rows of any previous work item must not stay on screen.
                    state.entries.clear();
                    state.selection.clear();
                    state.loaded = false;
                }
                return Err(err);
            }
        };
        let rows = join(&settings.available_measures, &discovered.measures);

        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!(parent, "discarding discovery for a previous work item");
            return Ok(false);
        }
        state.entries = rows.into_iter().map(TableEntry::new).collect();
        let sort = state.sort;
        if let Some((column, order)) = sort {
            sort_entries(&mut state.entries, column, order);
        }
        let selectable: Vec<String> = state
            .selection
            .iter()
            .filter(|name| state.entry(name).is_some_and(TableEntry::is_selectable))
            .cloned()
            .collect();
        state.selection = selectable;
        state.loaded = true;
        Ok(true)
    }

    // Settings are read once per page, like the rest of the session state.
    async fn settings(&self) -> Settings {
        let cached = self.state.lock().settings.clone();
        if let Some(settings) = cached {
            return settings;
        }
        let settings = self.store.get_settings().await;
        self.state.lock().settings = Some(settings.clone());
        settings
    }

    /// Snapshot of the table
    #[must_use]
    pub fn entries(&self) -> Vec<TableEntry> {
        self.state.lock().entries.clone()
    }

    /// Row states in table order
    #[must_use]
    pub fn row_states(&self) -> Vec<RowState> {
        self.state.lock().entries.iter().map(TableEntry::state).collect()
    }

    /// Whether rows have been loaded at least once
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    /// Parent currently displayed
    #[must_use]
    pub fn parent(&self) -> Option<WorkItemId> {
        self.state.lock().parent
    }

    /// Conformance tag in effect for this page
    #[must_use]
    pub fn conformance_tag(&self) -> Option<String> {
        self.state
            .lock()
            .settings
            .as_ref()
            .map(|s| s.conformance_tag.clone())
    }

    /// Select a measure row by name.
    ///
    /// # Errors
    /// [`ConformanceError::Precondition`] when the row is unknown or not
    /// in the unlinked state.
    pub fn select(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        let selectable = state.entry(name).map(TableEntry::is_selectable);
        match selectable {
            Some(true) => {
                if !state.selection.iter().any(|n| n == name) {
                    state.selection.push(name.to_string());
                }
                Ok(())
            }
            Some(false) => Err(ConformanceError::precondition(format!(
                "measure {name:?} cannot be selected"
            ))),
            None => Err(ConformanceError::precondition(format!(
                "no row for measure {name:?}"
            ))),
        }
    }

    /// Remove a row from the selection
    pub fn deselect(&self, name: &str) {
        self.state.lock().selection.retain(|n| n != name);
    }

    /// Selected measure names, in selection order
    #[must_use]
    pub fn selection(&self) -> Vec<String> {
        self.state.lock().selection.clone()
    }

    /// Whether the Create command is enabled: something is selected and no
    /// Create run is in progress
    #[must_use]
    pub fn create_enabled(&self) -> bool {
        let state = self.state.lock();
        !state.creating && !state.selection.is_empty()
    }

    /// Sort the table; later reloads keep the order
    pub fn sort(&self, column: SortColumn, order: SortOrder) {
        let mut state = self.state.lock();
        state.sort = Some((column, order));
        sort_entries(&mut state.entries, column, order);
    }

    /// Materialise work items for the selected rows, in selection order.
    ///
    /// Stops at the first failure: rows already linked stay linked, the
    /// failed row and the rest stay unlinked, and one error banner is shown.
    ///
    /// # Errors
    /// The failure that stopped the run, a missing parent, or
    /// [`ConformanceError::Precondition`] while another run is in progress.
    pub async fn create_selected(&self) -> Result<CreateOutcome> {
        let (parent, epoch, selection) = {
            let mut state = self.state.lock();
            if state.creating {
                return Err(ConformanceError::precondition("a Create run is already in progress"));
            }
            let parent = state
                .parent
                .ok_or_else(|| ConformanceError::precondition("no current work item"))?;
            state.creating = true;
            (parent, state.epoch, std::mem::take(&mut state.selection))
        };
        let _creating = CreatingGuard(&self.state);
        let settings = self.settings().await;
        let mut outcome = CreateOutcome::default();

        for name in selection {
            let measure = {
                let mut state = self.state.lock();
                if state.epoch != epoch {
                    outcome.discarded = true;
                    break;
                }
                let Some(entry) = state.entry_mut(&name) else {
                    continue;
                };
                let Some(row) = entry.row.as_ref() else {
                    continue;
                };
                if row.is_linked() {
                    outcome.skipped.push(name.clone());
                    continue;
                }
                let measure = row.measure().clone();
                entry.set_creating(true);
                measure
            };

            let result = self.engine.materialise_measure(parent, &measure, &settings).await;

            let mut state = self.state.lock();
            if state.epoch != epoch {
                tracing::debug!(parent, measure = %name, "parent changed; dropping create result");
                outcome.discarded = true;
                break;
            }
            match result {
                Ok(materialised) => {
                    let id = materialised.work_item().id;
                    if materialised.was_created() {
                        outcome.created.push(id);
                    } else {
                        outcome.adopted.push(id);
                    }
                    if let Some(entry) = state.entry_mut(&name) {
                        entry.link(materialised.into_work_item());
                    }
                }
                Err(err) => {
                    if let Some(entry) = state.entry_mut(&name) {
                        entry.set_creating(false);
                    }
                    drop(state);
                    tracing::error!(measure = %name, error = %err, "creating conformance work item failed");
                    self.notifier.notify(Banner::work_item_creation_failed(&err));
                    return Err(err);
                }
            }
        }

        let linked = outcome.created.len() + outcome.adopted.len();
        if linked > 0 {
            self.notifier.notify(Banner::work_items_created(linked));
        }
        Ok(outcome)
    }
}
