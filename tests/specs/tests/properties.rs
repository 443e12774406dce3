// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Universal engine properties exercised end-to-end.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use fleawatch::store::history::HistoryStore;
use fleawatch::store::DataLayout;
use fleawatch::token::manager::RefreshReason;
use fleawatch_specs::{aged_item, wait_retired, wait_until, TestEngineBuilder};
use proptest::prelude::*;

#[tokio::test(start_paused = true)]
async fn any_item_id_is_notified_at_most_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default().build(dir.path())?;
    // Heavily overlapping batches across five iterations.
    engine.adapter.enqueue_items(vec![aged_item("A", 5), aged_item("B", 5)]);
    engine.adapter.enqueue_items(vec![aged_item("B", 5), aged_item("C", 5)]);
    engine.adapter.enqueue_items(vec![aged_item("A", 5), aged_item("C", 5), aged_item("D", 5)]);
    engine.adapter.enqueue_items(vec![aged_item("D", 5), aged_item("A", 5)]);
    engine.adapter.enqueue_items(vec![aged_item("E", 5), aged_item("E", 5)]);

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;
    wait_until(|| engine.notifier.item_captions_for(42).len() >= 5).await;
    // Give further iterations room to violate the property if they could.
    tokio::time::sleep(std::time::Duration::from_secs(60)).await;

    let captions = engine.notifier.item_captions_for(42);
    let mut per_id: HashMap<String, usize> = HashMap::new();
    for caption in &captions {
        for id in ["A", "B", "C", "D", "E"] {
            if caption.contains(&format!("id={id}")) {
                *per_id.entry(id.to_owned()).or_default() += 1;
            }
        }
    }
    for (id, count) in &per_id {
        assert_eq!(*count, 1, "item {id} notified {count} times");
    }
    assert_eq!(captions.len(), 5);

    engine.supervisor.stop(42).await;
    wait_retired(&engine, 42).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn at_most_one_loop_task_per_user() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default().build(dir.path())?;

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;
    // Repeated starts while the first loop lives are all refused, so the
    // adapter sees at most one loop's worth of traffic per interval.
    for _ in 0..5 {
        let outcome = engine.supervisor.start(42, vec!["phone".to_owned()]).await;
        assert_eq!(outcome, fleawatch::engine::StartOutcome::AlreadyRunning);
    }

    engine.supervisor.stop(42).await;
    wait_retired(&engine, 42).await;
    Ok(())
}

#[tokio::test]
async fn k_concurrent_refreshes_hit_the_provider_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default().build(dir.path())?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tokens = Arc::clone(&engine.tokens);
        handles.push(tokio::spawn(async move {
            tokens.refresh(RefreshReason::AuthError).await.map(|t| t.token_seed.clone())
        }));
    }
    let mut seeds = HashSet::new();
    for handle in handles {
        seeds.insert(handle.await??);
    }
    assert_eq!(seeds.len(), 1, "all callers observed the same result");
    assert_eq!(
        engine.provider_calls.calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// `mark_sent(S)` then, after a reload from disk,
    /// `filter_new(S') == S' \ S` (order-preserving, deduplicated).
    #[test]
    fn history_roundtrip_matches_set_difference(
        marked in prop::collection::hash_set("[a-z]{1,6}", 0..30),
        queried in prop::collection::vec("[a-z]{1,6}", 0..30),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let result: anyhow::Result<()> = rt.block_on(async {
            let dir = tempfile::tempdir()?;
            let marked_vec: Vec<String> = marked.iter().cloned().collect();
            {
                let store = HistoryStore::new(DataLayout::new(dir.path().to_owned()), 50_000);
                store.mark_sent(7, &marked_vec).await?;
            }
            // Fresh store: answers must come from the persisted file.
            let store = HistoryStore::new(DataLayout::new(dir.path().to_owned()), 50_000);
            let fresh = store.filter_new(7, &queried).await?;

            let mut seen = HashSet::new();
            let expected: Vec<String> = queried
                .iter()
                .filter(|id| !marked.contains(*id) && seen.insert((*id).clone()))
                .cloned()
                .collect();
            anyhow::ensure!(fresh == expected, "got {fresh:?}, expected {expected:?}");
            Ok(())
        });
        result.map_err(|e| TestCaseError::fail(format!("{e:#}")))?;
    }
}
