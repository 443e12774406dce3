// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios over the wired engine with scripted collaborators.

use std::sync::atomic::Ordering;
use std::time::Duration;

use fleawatch::adapter::SearchError;
use fleawatch::config::ParserDefaults;
use fleawatch::engine::StartOutcome;
use fleawatch_specs::{aged_item, wait_retired, wait_until, TestEngineBuilder};

fn s1_defaults() -> ParserDefaults {
    ParserDefaults {
        check_interval_s: 10,
        max_age_min: 1_440,
        max_pages: 1,
        rows_per_page: 3,
        notify_new_only: true,
    }
}

#[tokio::test(start_paused = true)]
async fn happy_path_three_items_in_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default().defaults(s1_defaults()).build(dir.path())?;
    engine.adapter.enqueue_items(vec![
        aged_item("A", 5),
        aged_item("B", 10),
        aged_item("C", 15),
    ]);

    let outcome = engine.supervisor.start(42, vec!["phone".to_owned()]).await;
    assert_eq!(outcome, StartOutcome::Started);

    wait_until(|| engine.notifier.item_captions_for(42).len() == 3).await;
    let captions = engine.notifier.item_captions_for(42);
    assert!(captions[0].contains("id=A"));
    assert!(captions[1].contains("id=B"));
    assert!(captions[2].contains("id=C"));

    let status = engine
        .supervisor
        .status(42)
        .await
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(status.items_found, 3);
    assert_eq!(status.requests, 1);
    assert_eq!(status.errors, 0);

    // History now contains exactly {A, B, C}.
    let unseen = engine
        .history
        .filter_new(42, &["A".to_owned(), "B".to_owned(), "C".to_owned(), "Z".to_owned()])
        .await?;
    assert_eq!(unseen, vec!["Z".to_owned()]);

    engine.supervisor.stop(42).await;
    wait_retired(&engine, 42).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicate_suppression_across_iterations() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default().defaults(s1_defaults()).build(dir.path())?;
    engine.adapter.enqueue_items(vec![
        aged_item("A", 5),
        aged_item("B", 10),
        aged_item("C", 15),
    ]);
    engine.adapter.enqueue_items(vec![
        aged_item("B", 5),
        aged_item("C", 10),
        aged_item("D", 15),
    ]);

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;

    wait_until(|| engine.notifier.item_captions_for(42).len() == 4).await;
    let captions = engine.notifier.item_captions_for(42);
    // Second iteration contributed exactly one notification: D.
    assert!(captions[3].contains("id=D"));

    let unseen = engine
        .history
        .filter_new(
            42,
            &["A".to_owned(), "B".to_owned(), "C".to_owned(), "D".to_owned(), "E".to_owned()],
        )
        .await?;
    assert_eq!(unseen, vec!["E".to_owned()]);

    engine.supervisor.stop(42).await;
    wait_retired(&engine, 42).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reactive_refresh_retries_with_the_new_token() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default().defaults(s1_defaults()).build(dir.path())?;
    engine.adapter.enqueue(Err(SearchError::Auth("FAIL_SYS_TOKEN_EXPIRED::令牌过期".to_owned())));
    engine.adapter.enqueue_items(vec![aged_item("A", 5)]);

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;

    wait_until(|| engine.notifier.item_captions_for(42).len() == 1).await;
    assert_eq!(engine.provider_calls.calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.adapter.last_seed.lock().as_deref(), Some("fresh1"));

    engine.supervisor.stop(42).await;
    wait_retired(&engine, 42).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn concurrent_auth_errors_share_one_refresh() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = TestEngineBuilder::default()
        .defaults(s1_defaults())
        .allowed(&[42, 43])
        .build(dir.path())?;
    // Both loops pop auth errors first; their retries then drain items.
    engine.adapter.enqueue(Err(SearchError::Auth("FAIL_SYS_TOKEN_EXPIRED".to_owned())));
    engine.adapter.enqueue(Err(SearchError::Auth("FAIL_SYS_TOKEN_EXPIRED".to_owned())));
    engine.adapter.enqueue_items(vec![aged_item("A", 5)]);
    engine.adapter.enqueue_items(vec![aged_item("B", 5)]);

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;
    engine.supervisor.start(43, vec!["bike".to_owned()]).await;

    wait_until(|| {
        engine.notifier.item_captions_for(42).len() == 1
            && engine.notifier.item_captions_for(43).len() == 1
    })
    .await;
    // The token provider was invoked exactly once for both users.
    assert_eq!(engine.provider_calls.calls.load(Ordering::SeqCst), 1);

    engine.supervisor.stop(42).await;
    engine.supervisor.stop(43).await;
    wait_retired(&engine, 42).await;
    wait_retired(&engine, 43).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_during_long_interval_sleep_is_fast() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut defaults = s1_defaults();
    defaults.check_interval_s = 300;
    let engine = TestEngineBuilder::default().defaults(defaults).build(dir.path())?;
    engine.adapter.enqueue_items(vec![aged_item("A", 5)]);

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;
    wait_until(|| engine.notifier.item_captions_for(42).len() == 1).await;

    // The loop is now inside its 300 s inter-iteration sleep.
    let before = tokio::time::Instant::now();
    assert!(engine.supervisor.stop(42).await);
    wait_retired(&engine, 42).await;
    assert!(before.elapsed() < Duration::from_millis(1_100));

    // The final summary reports the earlier find.
    let summary = engine
        .notifier
        .deliveries_for(42)
        .into_iter()
        .rev()
        .find_map(|sent| match sent {
            fleawatch_specs::Sent::Text { text, .. } if text.starts_with("Polling stopped") => {
                Some(text)
            }
            _ => None,
        })
        .ok_or_else(|| anyhow::anyhow!("no final summary"))?;
    assert!(summary.contains("Found 1 items"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn age_filter_limits_the_pipeline() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut defaults = s1_defaults();
    defaults.max_age_min = 1_000;
    defaults.rows_per_page = 30;
    let engine = TestEngineBuilder::default().defaults(defaults).build(dir.path())?;
    engine.adapter.enqueue_items(vec![
        aged_item("fresh", 30),
        aged_item("mid", 600),
        aged_item("stale", 2_000),
    ]);

    engine.supervisor.start(42, vec!["phone".to_owned()]).await;
    wait_until(|| engine.notifier.item_captions_for(42).len() == 2).await;

    let status = engine
        .supervisor
        .status(42)
        .await
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(status.items_found, 2);

    let unseen = engine.history.filter_new(42, &["stale".to_owned()]).await?;
    assert_eq!(unseen, vec!["stale".to_owned()]);

    engine.supervisor.stop(42).await;
    wait_retired(&engine, 42).await;
    Ok(())
}
