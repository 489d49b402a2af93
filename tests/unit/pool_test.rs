// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use docrawl::utils::errors::{PoolError, WorkError};
use docrawl::workers::pool::{PoolConfig, PoolState, WorkerPool};
use docrawl::workers::retry::RetryCoordinator;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

fn identifiers(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://docs.example.com/{}", i)).collect()
}

#[tokio::test]
async fn test_every_identifier_yields_one_outcome() {
    let pool = WorkerPool::with_size(3, PoolConfig::default()).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let outcomes = pool
        .process_all(&identifiers(10), move |id, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, WorkError>(id.len()) }
        })
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 10);
    assert_eq!(calls.load(Ordering::SeqCst), 10);
    assert!(outcomes.iter().all(|o| o.is_success() && o.worker_index < 3));
    let seen: HashSet<_> = outcomes.iter().map(|o| o.identifier.clone()).collect();
    assert_eq!(seen.len(), 10);
}

#[tokio::test]
async fn test_progress_reaches_total() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pool = WorkerPool::with_size(2, PoolConfig::default())
        .unwrap()
        .with_progress(tx);

    pool.process_all(&identifiers(6), |_, _| async { Ok::<_, WorkError>(()) })
        .await
        .unwrap();
    drop(pool);

    let mut last = 0;
    while let Some(event) = rx.recv().await {
        assert_eq!(event.total, 6);
        last = last.max(event.completed);
    }
    assert_eq!(last, 6);
}

#[tokio::test]
async fn test_uninitialized_and_closed_pools_reject_work() {
    let pool = WorkerPool::new(PoolConfig::default());
    assert_eq!(pool.state(), PoolState::Uninitialized);
    let err = pool
        .process_all(&identifiers(1), |_, _| async { Ok::<_, WorkError>(()) })
        .await
        .unwrap_err();
    assert_eq!(err, PoolError::NotInitialized);

    pool.initialize(1).unwrap();
    assert_eq!(pool.initialize(1), Err(PoolError::AlreadyInitialized));
    pool.close().await;

    let coordinator = RetryCoordinator::default();
    let err = coordinator
        .process_with_retry(&pool, &identifiers(1), |_, _| async { Ok::<_, WorkError>(()) }, 2)
        .await
        .unwrap_err();
    assert_eq!(err, PoolError::Closed);
}
