//! Quantified properties of the conformance graph
//!
//! Each case builds a fresh in-memory backend and drives it through the
//! public services, so shrinking reports a minimal failing sequence.

use cc_core::{CollectingNotifier, ConformanceServices};
use cc_model::{is_valid_measure_name, Measure, Settings, WorkItemId};
use cc_test_utils::{
    backend_with_parent, host_for, small_settings, InMemoryDataService, InMemoryWorkItems,
    PROJECT_ID,
};
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn services(
    backend: &Arc<InMemoryWorkItems>,
    data: &Arc<InMemoryDataService>,
    parent: WorkItemId,
) -> ConformanceServices {
    ConformanceServices::new(
        backend.clone(),
        data.clone(),
        host_for(parent, "Login"),
        Arc::new(CollectingNotifier::new()),
    )
}

fn seeded_data() -> Arc<InMemoryDataService> {
    let data = Arc::new(InMemoryDataService::new());
    data.seed(PROJECT_ID, serde_json::to_value(small_settings()).unwrap());
    data
}

/// Indices into the three measures of the small catalogue
fn selection() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..3, 0..4)
}

fn measure_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ()-]{0,30}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// However sessions interleave, a parent never gets a second aggregator
    /// and an aggregator never gets two work items for the same measure.
    #[test]
    fn at_most_one_aggregator_and_one_item_per_measure(sessions in prop::collection::vec(selection(), 1..5)) {
        runtime().block_on(async {
            let (backend, parent) = backend_with_parent("Login");
            let data = seeded_data();
            let names: Vec<String> = small_settings().available_measures.into_iter().map(|m| m.name).collect();

            for picks in &sessions {
                let page = services(&backend, &data, parent).work_item_page();
                page.load().await.unwrap();
                for &i in picks {
                    // Already linked or already selected rows refuse selection.
                    let _ = page.select(&names[i]);
                }
                if page.create_enabled() {
                    page.create_selected().await.unwrap();
                }
            }

            let aggregators = backend.children(parent);
            prop_assert!(aggregators.len() <= 1);
            if let Some(&aggregator) = aggregators.first() {
                for name in &names {
                    prop_assert!(backend.children_tagged(aggregator, name).len() <= 1);
                }
            }
            Ok::<_, TestCaseError>(())
        })?;
    }

    /// Materialising the same measures twice creates nothing the second time.
    #[test]
    fn materialise_is_idempotent(picks in prop::collection::btree_set(0usize..3, 1..=3)) {
        runtime().block_on(async {
            let (backend, parent) = backend_with_parent("Login");
            let data = seeded_data();
            let settings = small_settings();

            let first = services(&backend, &data, parent);
            for &i in &picks {
                let created = first
                    .engine
                    .materialise_measure(parent, &settings.available_measures[i], &settings)
                    .await
                    .unwrap();
                prop_assert!(created.was_created());
            }
            let creates = backend.create_calls();

            // A second session starts with empty caches.
            let second = services(&backend, &data, parent);
            for &i in &picks {
                let again = second
                    .engine
                    .materialise_measure(parent, &settings.available_measures[i], &settings)
                    .await
                    .unwrap();
                prop_assert!(!again.was_created());
            }
            prop_assert_eq!(backend.create_calls(), creates);
            Ok::<_, TestCaseError>(())
        })?;
    }

    /// A stored catalogue reads back with the same content in a new session.
    #[test]
    fn stored_settings_read_back(names in prop::collection::btree_set(measure_name(), 0..8), tag in measure_name()) {
        runtime().block_on(async {
            let (backend, parent) = backend_with_parent("Login");
            let data = Arc::new(InMemoryDataService::new());
            let settings = Settings {
                available_measures: names.iter().map(Measure::new).collect(),
                conformance_tag: tag.clone(),
                ..Settings::defaults()
            };

            let stored = services(&backend, &data, parent)
                .store
                .store_settings(&settings)
                .await
                .unwrap();
            prop_assert!(stored.same_content(&settings));

            let read = services(&backend, &data, parent).store.get_settings().await;
            prop_assert!(read.same_content(&settings));
            prop_assert_eq!(read.conformance_tag, tag);
            Ok::<_, TestCaseError>(())
        })?;
    }

    /// Names with a delimiter or a control character are never legal.
    #[test]
    fn forbidden_characters_reject_name(prefix in "[a-z]{0,10}", bad in prop::sample::select(vec![';', ',', '\u{0}', '\u{1f}', '\u{7f}', '\n']), suffix in "[a-z]{0,10}") {
        let name = format!("{prefix}{bad}{suffix}");
        prop_assert!(!is_valid_measure_name(&name));
    }

    /// Length is counted in UTF-16 code units.
    #[test]
    fn length_limit_counts_utf16_units(len in 1usize..=450) {
        let ascii = "a".repeat(len);
        prop_assert_eq!(is_valid_measure_name(&ascii), len <= 400);

        // Each of these takes two UTF-16 code units.
        let wide = "\u{1F600}".repeat(len);
        prop_assert_eq!(is_valid_measure_name(&wide), len <= 200);
    }
}

#[test]
fn boundary_lengths() {
    assert!(is_valid_measure_name(&"x".repeat(400)));
    assert!(!is_valid_measure_name(&"x".repeat(401)));
    assert!(!is_valid_measure_name(""));
}
