//! Settings editor controller
//!
//! Holds the project-settings view state. Every edit replaces one measure
//! in a persistent vector, so snapshots taken for undo or rendering share
//! structure with the live state.

use crate::error::{ConformanceError, Result};
use crate::notify::{Banner, Notifier};
use crate::settings_store::SettingsStore;
use cc_model::tags::{append_tag, is_valid_tag, remove_tag, split_tags};
use cc_model::{validate_new_name, Measure, Settings, ValidationError, WorkItemType};
use indexmap::IndexSet;
use std::sync::Arc;

/// Editable copy of the settings document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    /// Catalogue, in display order
    pub measures: im::Vector<Measure>,
    /// Tag shared by the whole graph
    pub conformance_tag: String,
    /// Type of measure work items
    pub work_item_type: String,
    /// Type of the aggregator
    pub aggregation_work_item_type: String,
    etag: Option<String>,
}

impl From<Settings> for EditorState {
    fn from(settings: Settings) -> Self {
        Self {
            measures: settings.available_measures.into_iter().collect(),
            conformance_tag: settings.conformance_tag,
            work_item_type: settings.work_item_type,
            aggregation_work_item_type: settings.aggregation_work_item_type,
            etag: settings.etag,
        }
    }
}

impl EditorState {
    /// Settings document for this state
    #[must_use]
    pub fn to_settings(&self) -> Settings {
        Settings {
            etag: self.etag.clone(),
            available_measures: self.measures.iter().cloned().collect(),
            conformance_tag: self.conformance_tag.clone(),
            work_item_type: self.work_item_type.clone(),
            aggregation_work_item_type: self.aggregation_work_item_type.clone(),
            ..Settings::default()
        }
    }

    fn position(&self, name: &str) -> Result<usize, ValidationError> {
        self.measures
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| ValidationError::UnknownMeasure(name.to_string()))
    }

    fn update(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut Measure) -> Result<(), ValidationError>,
    ) -> Result<(), ValidationError> {
        let index = self.position(name)?;
        let mut measure = self.measures[index].clone();
        edit(&mut measure)?;
        self.measures.set(index, measure);
        Ok(())
    }
}

/// Pending "add measure" panel input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasureDraft {
    /// Name typed so far
    pub name: String,
    /// Tooltip typed so far
    pub tool_tip: String,
    /// Description typed so far
    pub description: String,
}

impl MeasureDraft {
    fn into_measure(self) -> Measure {
        let mut measure = Measure::new(self.name);
        if !self.tool_tip.is_empty() {
            measure = measure.with_tool_tip(self.tool_tip);
        }
        if !self.description.is_empty() {
            measure = measure.with_description(self.description);
        }
        measure
    }
}

/// Work-item types offered by the two pickers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOptions {
    /// Type names, in backend order
    pub names: Vec<String>,
    /// Index of the configured measure type
    pub selected_work_item_type: Option<usize>,
    /// Index of the configured aggregator type
    pub selected_aggregation_type: Option<usize>,
}

/// Controller of the project-settings view
pub struct SettingsEditor {
    store: Arc<SettingsStore>,
    notifier: Arc<dyn Notifier>,
    state: EditorState,
    saved: EditorState,
    draft: Option<MeasureDraft>,
}

impl std::fmt::Debug for SettingsEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsEditor")
            .field("state", &self.state)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

impl SettingsEditor {
    /// Open the editor on the active settings
    pub async fn load(store: Arc<SettingsStore>, notifier: Arc<dyn Notifier>) -> Self {
        let state = EditorState::from(store.get_settings().await);
        Self {
            store,
            notifier,
            saved: state.clone(),
            state,
            draft: None,
        }
    }

    /// Current, possibly unsaved, editor state
    #[must_use]
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Catalogue in display order
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.state.measures.iter()
    }

    /// Whether there are unsaved edits
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state != self.saved
    }

    /// Open the add-measure panel with empty fields
    pub fn open_draft(&mut self) {
        self.draft = Some(MeasureDraft::default());
    }

    /// Close the add-measure panel, discarding its input
    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    /// Panel input, if open
    #[must_use]
    pub fn draft(&self) -> Option<&MeasureDraft> {
        self.draft.as_ref()
    }

    /// Mutable panel input; opens the panel when closed
    pub fn draft_mut(&mut self) -> &mut MeasureDraft {
        self.draft.get_or_insert_with(MeasureDraft::default)
    }

    /// Inline validation of the panel's name
    #[must_use]
    pub fn draft_error(&self) -> Option<ValidationError> {
        let draft = self.draft.as_ref()?;
        validate_new_name(&draft.name, self.state.measures.iter()).err()
    }

    /// Save is blocked while the panel holds an invalid name
    #[must_use]
    pub fn can_save(&self) -> bool {
        self.draft_error().is_none()
    }

    /// Add the panel's measure to the catalogue and close the panel.
    ///
    /// # Errors
    /// Invalid or duplicate name; the catalogue and the panel are unchanged.
    pub fn submit_draft(&mut self) -> Result<(), ValidationError> {
        let draft = self.draft.clone().unwrap_or_default();
        self.add_measure(draft.into_measure())?;
        self.draft = None;
        Ok(())
    }

    /// Append a measure to the catalogue.
    ///
    /// # Errors
    /// [`ValidationError::InvalidName`] or [`ValidationError::DuplicateName`].
    pub fn add_measure(&mut self, measure: Measure) -> Result<(), ValidationError> {
        validate_new_name(&measure.name, self.state.measures.iter())?;
        tracing::debug!(measure = %measure.name, "measure added");
        self.state.measures.push_back(measure);
        Ok(())
    }

    /// Drop a measure from the catalogue.
    ///
    /// # Errors
    /// [`ValidationError::UnknownMeasure`].
    pub fn remove_measure(&mut self, name: &str) -> Result<Measure, ValidationError> {
        let index = self.state.position(name)?;
        Ok(self.state.measures.remove(index))
    }

    /// Replace a measure's description; empty text clears it.
    ///
    /// # Errors
    /// [`ValidationError::UnknownMeasure`].
    pub fn edit_description(&mut self, name: &str, text: &str) -> Result<(), ValidationError> {
        self.state.update(name, |m| {
            m.description = (!text.is_empty()).then(|| text.to_string());
            Ok(())
        })
    }

    /// Replace a measure's tooltip; empty text clears it.
    ///
    /// # Errors
    /// [`ValidationError::UnknownMeasure`].
    pub fn edit_tooltip(&mut self, name: &str, text: &str) -> Result<(), ValidationError> {
        self.state.update(name, |m| {
            m.tool_tip = (!text.is_empty()).then(|| text.to_string());
            Ok(())
        })
    }

    /// Append an additional tag to a measure.
    ///
    /// # Errors
    /// [`ValidationError::InvalidTag`] or [`ValidationError::UnknownMeasure`].
    pub fn add_tag(&mut self, name: &str, tag: &str) -> Result<(), ValidationError> {
        if !is_valid_tag(tag) {
            return Err(ValidationError::InvalidTag(tag.to_string()));
        }
        self.state.update(name, |m| {
            m.additional_tags = Some(append_tag(m.additional_tags.as_deref(), tag));
            Ok(())
        })
    }

    /// Remove every occurrence of an additional tag from a measure.
    ///
    /// # Errors
    /// [`ValidationError::UnknownMeasure`].
    pub fn remove_tag(&mut self, name: &str, tag: &str) -> Result<(), ValidationError> {
        self.state.update(name, |m| {
            m.additional_tags = m
                .additional_tags
                .as_deref()
                .and_then(|tags| remove_tag(tags, tag));
            Ok(())
        })
    }

    /// Tags used by other measures that `name` does not have yet
    #[must_use]
    pub fn tag_suggestions(&self, name: &str) -> Vec<String> {
        let own: IndexSet<&str> = self
            .state
            .measures
            .iter()
            .filter(|m| m.name == name)
            .flat_map(Measure::additional_tag_list)
            .collect();
        let others: IndexSet<&str> = self
            .state
            .measures
            .iter()
            .filter(|m| m.name != name)
            .flat_map(Measure::additional_tag_list)
            .filter(|tag| !own.contains(tag))
            .collect();
        others.into_iter().map(str::to_string).collect()
    }

    /// Work-item type used for measure children
    pub fn set_work_item_type(&mut self, work_item_type: &str) {
        self.state.work_item_type = work_item_type.to_string();
    }

    /// Work-item type used for the aggregator
    pub fn set_aggregation_work_item_type(&mut self, work_item_type: &str) {
        self.state.aggregation_work_item_type = work_item_type.to_string();
    }

    /// Change the conformance tag.
    ///
    /// # Errors
    /// [`ValidationError::InvalidTag`] when it is not a legal tag.
    pub fn set_conformance_tag(&mut self, tag: &str) -> Result<(), ValidationError> {
        let tag = tag.trim();
        if !is_valid_tag(tag) || split_tags(tag).count() != 1 {
            return Err(ValidationError::InvalidTag(tag.to_string()));
        }
        self.state.conformance_tag = tag.to_string();
        Ok(())
    }

    /// Picker options with the configured types preselected
    #[must_use]
    pub fn type_options(&self, types: &[WorkItemType]) -> TypeOptions {
        let index_of = |wanted: &str| types.iter().position(|t| t.name == wanted);
        TypeOptions {
            selected_work_item_type: index_of(&self.state.work_item_type),
            selected_aggregation_type: index_of(&self.state.aggregation_work_item_type),
            names: types.iter().map(|t| t.name.clone()).collect(),
        }
    }

    /// Picker options for the project's types.
    ///
    /// # Errors
    /// Backend failure loading the types.
    pub async fn load_type_options(&self) -> Result<TypeOptions> {
        let types = self.store.get_work_item_types().await?;
        Ok(self.type_options(types))
    }

    /// Persist the current state and report the outcome as a banner.
    ///
    /// # Errors
    /// A pending invalid measure name, an invalid catalogue, or the backend
    /// failure.
    pub async fn save(&mut self) -> Result<()> {
        if let Some(err) = self.draft_error() {
            return Err(ConformanceError::Validation(err));
        }
        let settings = self.state.to_settings();
        settings.validate()?;
        match self.store.store_settings(&settings).await {
            Ok(stored) => {
                self.state = EditorState::from(stored);
                self.saved = self.state.clone();
                self.notifier.notify(Banner::settings_saved());
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "saving settings failed");
                self.notifier.notify(Banner::settings_save_failed(&err));
                Err(err)
            }
        }
    }

    /// Throw away all edits and stored settings, showing the defaults
    pub async fn restore_defaults(&mut self) -> &EditorState {
        let defaults = self.store.restore_default().await;
        self.state = EditorState::from(defaults);
        self.saved = self.state.clone();
        self.draft = None;
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;
    use crate::session::SessionContext;
    use cc_test_utils::{test_host, InMemoryDataService, InMemoryWorkItems};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    async fn editor() -> (SettingsEditor, Arc<CollectingNotifier>, Arc<InMemoryDataService>) {
        let data = Arc::new(InMemoryDataService::new());
        let session = Arc::new(SessionContext::new(test_host()));
        let store = Arc::new(SettingsStore::new(
            data.clone(),
            Arc::new(InMemoryWorkItems::new()),
            session,
        ));
        let notifier = Arc::new(CollectingNotifier::new());
        let editor = SettingsEditor::load(store, notifier.clone()).await;
        (editor, notifier, data)
    }

    fn offline_editor(measures: Vec<Measure>) -> SettingsEditor {
        let session = Arc::new(SessionContext::new(test_host()));
        let store = Arc::new(SettingsStore::new(
            Arc::new(InMemoryDataService::new()),
            Arc::new(InMemoryWorkItems::new()),
            session,
        ));
        let state = EditorState::from(Settings {
            available_measures: measures,
            ..Settings::default()
        });
        SettingsEditor {
            store,
            notifier: Arc::new(CollectingNotifier::new()),
            saved: state.clone(),
            state,
            draft: None,
        }
    }

    #[tokio::test]
    async fn invalid_draft_blocks_save() {
        let (mut editor, notifier, _) = editor().await;
        editor.draft_mut().name = "Bad;Name".into();

        let err = editor.draft_error().unwrap();
        assert!(err.to_string().contains("Azure DevOps naming restrictions"));
        assert!(!editor.can_save());
        assert!(editor.submit_draft().is_err());
        assert_eq!(editor.measures().count(), 11);
        assert!(matches!(editor.save().await, Err(ConformanceError::Validation(_))));
        assert!(notifier.banners().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let (mut editor, _, _) = editor().await;
        assert_eq!(
            editor.add_measure(Measure::new("Data Privacy")),
            Err(ValidationError::DuplicateName("Data Privacy".into()))
        );
        assert!(editor.add_measure(Measure::new("data privacy")).is_ok());
    }

    #[tokio::test]
    async fn submit_draft_adds_measure() {
        let (mut editor, _, _) = editor().await;
        editor.open_draft();
        let draft = editor.draft_mut();
        draft.name = "Custom".into();
        draft.tool_tip = "Custom check".into();
        editor.submit_draft().unwrap();

        assert!(editor.draft().is_none());
        let custom = editor.measures().last().unwrap();
        assert_eq!(custom.tool_tip.as_deref(), Some("Custom check"));
        assert_eq!(custom.description, None);
        assert!(editor.is_dirty());
    }

    #[tokio::test]
    async fn save_reports_success_and_persists() {
        let (mut editor, notifier, data) = editor().await;
        editor.add_measure(Measure::new("Custom")).unwrap();
        editor.save().await.unwrap();

        assert!(!editor.is_dirty());
        assert_eq!(notifier.banners(), vec![Banner::settings_saved()]);
        let stored = data.document(cc_test_utils::PROJECT_ID, "settings").unwrap();
        assert_eq!(stored["availableMeasures"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn failed_save_shows_error_banner() {
        let (mut editor, notifier, data) = editor().await;
        data.fail_writes(true);
        editor.set_work_item_type("Bug");
        assert!(editor.save().await.is_err());
        assert!(editor.is_dirty());

        let banners = notifier.banners();
        assert_eq!(banners.len(), 1);
        assert!(banners[0]
            .message
            .starts_with("Failed to save Continuous Conformance Settings."));
    }

    #[tokio::test]
    async fn restore_defaults_resets_state() {
        let (mut editor, _, _) = editor().await;
        editor.add_measure(Measure::new("Custom")).unwrap();
        editor.save().await.unwrap();
        let state = editor.restore_defaults().await;
        assert!(state.measures.iter().all(|m| m.name != "Custom"));
    }

    #[test]
    fn edits_touch_only_the_named_measure() {
        let mut editor = offline_editor(vec![Measure::new("A"), Measure::new("B")]);
        let before = editor.state().clone();
        editor.edit_description("A", "<p>desc</p>").unwrap();
        editor.edit_tooltip("A", "tip").unwrap();

        assert_eq!(editor.state().measures[1], before.measures[1]);
        assert_eq!(editor.state().measures[0].display_tool_tip(), "tip");
        editor.edit_tooltip("A", "").unwrap();
        assert_eq!(editor.state().measures[0].display_tool_tip(), "A");
        assert_eq!(
            editor.edit_description("Z", "x"),
            Err(ValidationError::UnknownMeasure("Z".into()))
        );
        assert_eq!(before.measures[0], Measure::new("A"));
    }

    #[test]
    fn tags_add_remove_and_suggest() {
        let mut editor = offline_editor(vec![
            Measure::new("A").with_additional_tags("Develop"),
            Measure::new("B").with_additional_tags("Design;Develop"),
            Measure::new("C"),
        ]);
        editor.add_tag("A", "Release").unwrap();
        assert_eq!(editor.state().measures[0].additional_tags.as_deref(), Some("Develop;Release"));
        assert_eq!(editor.tag_suggestions("A"), vec!["Design"]);
        assert_eq!(editor.tag_suggestions("C"), vec!["Develop", "Release", "Design"]);

        editor.remove_tag("A", "Develop").unwrap();
        assert_eq!(editor.state().measures[0].additional_tags.as_deref(), Some("Release"));
        editor.remove_tag("A", "Release").unwrap();
        assert_eq!(editor.state().measures[0].additional_tags, None);
        assert!(editor.add_tag("A", "x;y").is_err());
    }

    #[test]
    fn remove_measure_and_types() {
        let mut editor = offline_editor(vec![Measure::new("A"), Measure::new("B")]);
        assert_eq!(editor.remove_measure("A").unwrap().name, "A");
        assert!(editor.remove_measure("A").is_err());

        editor.set_aggregation_work_item_type("Epic");
        let options = editor.type_options(&[
            WorkItemType::named("Epic"),
            WorkItemType::named("Task"),
        ]);
        assert_eq!(options.selected_work_item_type, Some(1));
        assert_eq!(options.selected_aggregation_type, Some(0));
    }

    #[test]
    fn conformance_tag_must_be_one_tag() {
        let mut editor = offline_editor(Vec::new());
        assert!(editor.set_conformance_tag("A;B").is_err());
        assert!(editor.set_conformance_tag("").is_err());
        editor.set_conformance_tag(" CC ").unwrap();
        assert_eq!(editor.state().to_settings().conformance_tag, "CC");
    }

    proptest! {
        #[test]
        fn add_then_remove_tag_restores_tags(
            existing in proptest::option::of("[A-Za-z]{1,5}(;[A-Za-z]{1,5}){0,3}"),
            tag in "[0-9]{1,4}",
        ) {
            let mut measure = Measure::new("M");
            measure.additional_tags = existing.clone();
            let mut editor = offline_editor(vec![measure]);
            editor.add_tag("M", &tag).unwrap();
            editor.remove_tag("M", &tag).unwrap();
            prop_assert_eq!(editor.state().measures[0].additional_tags.clone(), existing);
        }
    }
}
