//! Presentation store: retry idempotence and concurrent appends.

use std::sync::Arc;

use proptest::prelude::*;
use vigil_engine::presentation::{PresentationStore, ProblemRecord, Severity, TextRange};
use vigil_engine::tools::{GroupRegistry, ToolId};

fn record(tool: u8, unit: u8, start: Option<u8>, message: u8) -> ProblemRecord {
    ProblemRecord::new(
        ToolId::new(format!("tool{tool}")),
        format!("unit{unit}.txt").into(),
        Severity::Warning,
        format!("message {message}"),
        start.map(|s| TextRange::new(s as u32, s as u32 + 1)),
        None,
    )
}

proptest! {
    /// Committing a unit's records again (a retried unit) changes nothing.
    #[test]
    fn prop_recommit_is_idempotent(
        raw in prop::collection::vec((0u8..3, 0u8..5, prop::option::of(0u8..4), 0u8..4), 0..40),
        retried in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let records: Vec<_> = raw.iter().map(|&(t, u, s, m)| record(t, u, s, m)).collect();
        let groups = GroupRegistry::default();

        let once = PresentationStore::default();
        once.commit(&groups, records.clone());

        let twice = PresentationStore::default();
        twice.commit(&groups, records.clone());
        if !records.is_empty() {
            let again: Vec<_> = retried.iter().map(|i| records[i.index(records.len())].clone()).collect();
            prop_assert_eq!(twice.commit(&groups, again), 0);
        }
        twice.commit(&groups, records);

        prop_assert_eq!(once.snapshot(), twice.snapshot());
        prop_assert_eq!(once.total_problems(), twice.total_problems());
    }
}

#[test]
fn test_concurrent_commits_keep_every_distinct_record() {
    let store = Arc::new(PresentationStore::default());
    let groups = Arc::new(GroupRegistry::default());
    std::thread::scope(|s| {
        for worker in 0..8u8 {
            let store = Arc::clone(&store);
            let groups = Arc::clone(&groups);
            s.spawn(move || {
                for unit in 0..25u8 {
                    // Every worker also commits worker 0's records.
                    store.commit(&groups, vec![record(0, unit, None, worker), record(0, unit, None, 0)]);
                }
            });
        }
    });
    let presentation = store.get(&ToolId::from("tool0")).unwrap();
    assert_eq!(presentation.problem_count(), 8 * 25);
    assert_eq!(store.tool_ids(), vec![ToolId::from("tool0")]);
}
