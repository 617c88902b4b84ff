mod common;

use std::sync::Arc;
use std::time::Duration;

use dongol_core::api::{
    Chunk, ChunkHandler, EngineError, EngineEvent, PoolKind, TaskOptions, TaskStatus,
};
use serde_json::json;
use tokio::sync::Notify;

use common::engine;

#[tokio::test]
async fn cancel_before_execution() {
    let engine = engine();
    let task = engine
        .create_task("t", json!("some text"), TaskOptions::default())
        .await
        .unwrap();

    assert_eq!(engine.cancel_task(&task.id).await.unwrap(), TaskStatus::Cancelled);
    assert_eq!(
        engine.get_task(&task.id).await.unwrap().status,
        TaskStatus::Cancelled
    );

    let err = engine.execute_task(&task.id, "default").await.unwrap_err();
    assert!(matches!(err, EngineError::Transition(_)));

    // Terminal tasks cannot be cancelled again.
    assert!(engine.cancel_task(&task.id).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_running_task_stops_at_next_level() {
    let engine = engine();
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());

    let (g, e) = (Arc::clone(&gate), Arc::clone(&entered));
    engine
        .register_handler(
            "gated",
            ChunkHandler::suspending(move |chunk: Chunk| {
                let (g, e) = (Arc::clone(&g), Arc::clone(&e));
                async move {
                    if chunk.id == "first" {
                        e.notify_one();
                        g.notified().await;
                    }
                    Ok(json!(chunk.id))
                }
            }),
        )
        .await;

    let chunks = vec![
        Chunk::with_id("first", 0),
        Chunk::with_id("second", 0).depends_on(["first"]),
    ];
    let task = engine
        .create_task_from_chunks("gated", chunks, TaskOptions::default())
        .await
        .unwrap();

    let runner = {
        let engine = engine.clone();
        let id = task.id.clone();
        tokio::spawn(async move { engine.execute_task(&id, "gated").await })
    };

    entered.notified().await;
    assert_eq!(engine.cancel_task(&task.id).await.unwrap(), TaskStatus::Running);
    gate.notify_one();

    let done = runner.await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Cancelled);
    assert!(done.results.contains_key("first"));
    assert!(!done.results.contains_key("second"));
    assert_eq!(done.metadata["report"]["cancelled"], json!(true));
}

#[tokio::test]
async fn stats_reflect_status_histogram() {
    let engine = engine();
    let a = engine
        .create_task("a", json!("one two"), TaskOptions::default())
        .await
        .unwrap();
    let b = engine
        .create_task("b", json!({"k": 1, "v": 2}), TaskOptions::default())
        .await
        .unwrap();
    engine
        .create_task("c", json!(3), TaskOptions::default())
        .await
        .unwrap();

    engine.execute_task(&a.id, "default").await.unwrap();
    engine.cancel_task(&b.id).await.unwrap();

    let stats = engine.get_stats().await;
    assert_eq!(stats.total_tasks, 3);
    assert_eq!(stats.status_distribution["COMPLETED"], 1);
    assert_eq!(stats.status_distribution["CANCELLED"], 1);
    assert_eq!(stats.status_distribution["PENDING"], 1);
    assert_eq!(
        stats.avg_chunks_per_task,
        stats.total_chunks as f64 / 3.0
    );
    assert!(!stats.engine_running);
}

#[tokio::test]
async fn event_loop_rebroadcasts_lifecycle() {
    let engine = engine();
    engine.start().await;
    assert!(engine.is_running());
    assert!(engine.get_stats().await.engine_running);

    let mut events = engine.subscribe();
    let task = engine
        .create_task("t", json!("hello"), TaskOptions::default())
        .await
        .unwrap();
    engine.execute_task(&task.id, "default").await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within timeout")
            .unwrap();
        assert_eq!(event.task_id(), task.id);
        seen.push(event);
    }

    assert!(matches!(seen[0], EngineEvent::TaskCreated { chunks: 1, .. }));
    assert!(matches!(seen[1], EngineEvent::TaskStarted { .. }));
    assert!(matches!(
        seen[2],
        EngineEvent::TaskCompleted {
            status: TaskStatus::Completed,
            ..
        }
    ));

    engine.stop().await;
    assert!(!engine.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn isolated_pool_runs_cpu_bound_handler() {
    let engine = engine();
    engine
        .register_handler(
            "sum",
            ChunkHandler::sync(|chunk: &Chunk| {
                let n = chunk.content["value"].as_u64().unwrap_or(0);
                Ok(json!((0..=n).sum::<u64>()))
            }),
        )
        .await;

    let task = engine
        .create_task(
            "numbers",
            json!([10, 100, 1000]),
            TaskOptions {
                pool: Some(PoolKind::Isolated),
                max_workers: Some(2),
                ..TaskOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(task.pool, PoolKind::Isolated);

    let done = engine.execute_task(&task.id, "sum").await.unwrap();
    let mut sums: Vec<u64> = done
        .results
        .values()
        .map(|r| r.value().unwrap().as_u64().unwrap())
        .collect();
    sums.sort_unstable();
    assert_eq!(sums, vec![55, 5050, 500500]);
}
