// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use docrawl::domain::models::{WorkerStats, WorkerStatus};
use docrawl::fleet::{FleetConfig, FleetManager};
use docrawl::queue::{InMemoryWorkQueue, WorkQueue};
use std::sync::Arc;

use super::helpers::mock_runtime::MockRuntime;

fn fleet(runtime: Arc<MockRuntime>, queue: Arc<InMemoryWorkQueue>) -> FleetManager {
    FleetManager::new(
        runtime,
        queue,
        FleetConfig {
            image: "docrawl-worker:test".to_string(),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_scale_up_then_down_is_lifo() {
    let runtime = Arc::new(MockRuntime::default());
    let manager = fleet(runtime.clone(), Arc::new(InMemoryWorkQueue::new()));

    let up = manager.scale_to(5).await;
    assert!(up.is_clean());
    assert_eq!(up.workers.len(), 5);

    let down = manager.scale_to(2).await;
    assert_eq!(down.removed.len(), 3);
    assert_eq!(
        *runtime.removed.lock(),
        vec!["docrawl-worker-4", "docrawl-worker-3", "docrawl-worker-2"]
    );
    assert_eq!(runtime.live_count(), 2);

    let again = manager.scale_to(2).await;
    assert!(again.created.is_empty() && again.removed.is_empty());
    assert_eq!(again.workers.len(), 2);
    assert_eq!(runtime.created.lock().len(), 5);
}

#[tokio::test]
async fn test_work_distribution_and_health() {
    let runtime = Arc::new(MockRuntime::default());
    let queue = Arc::new(InMemoryWorkQueue::new());
    let manager = fleet(runtime.clone(), queue.clone());
    manager.scale_to(3).await;

    let identifiers: Vec<String> = (0..45)
        .map(|i| format!("https://docs.example.com/page/{}", i))
        .collect();
    assert_eq!(manager.distribute_work(&identifiers, 20).await.unwrap(), 3);

    // 模拟工作进程消费一个批次并上报统计
    let batch = queue.pop().await.unwrap().unwrap();
    assert_eq!(batch.len(), 20);
    queue
        .record_stats("docrawl-worker-0", WorkerStats::new(18, 2))
        .await
        .unwrap();

    let spec = runtime.created.lock()[2].clone();
    assert_eq!(spec.image, "docrawl-worker:test");
    runtime.vanish("container-2");

    let workers = manager.refresh_health().await;
    assert_eq!(workers[0].stats.processed, 20);
    assert_eq!(workers[0].stats.failed, 2);
    assert_eq!(workers[0].status, WorkerStatus::Running);
    assert_eq!(workers[2].status, WorkerStatus::NotFound);
    assert_eq!(runtime.created.lock().len(), 3);

    assert!(manager.cleanup().await.is_empty());
    assert_eq!(runtime.live_count(), 0);
    assert!(manager.workers().await.is_empty());
}
