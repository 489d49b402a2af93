// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use docrawl::application::use_cases::ScrapeUseCase;
use docrawl::config::settings::Settings;
use docrawl::domain::models::WorkerStats;
use docrawl::engines::reqwest_strategy::ReqwestStrategy;
use docrawl::engines::StrategyRegistry;
use docrawl::infrastructure::metrics::init_metrics;
use docrawl::infrastructure::repositories::FileDocumentRepository;
use docrawl::queue::{RedisWorkQueue, WorkQueue};
use docrawl::utils::telemetry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 工作进程入口
///
/// 从共享队列中取出批次，抓取并写入本地存储，直到收到关闭信号
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();

    // 2. Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    let worker_name = settings.worker_name();
    info!("Starting docrawl worker {}", worker_name);

    if settings.metrics.enabled {
        let addr: SocketAddr = settings
            .metrics
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid metrics address {}", settings.metrics.listen_addr))?;
        init_metrics(addr);
    }

    // 3. Connect to the shared queue
    let queue = RedisWorkQueue::new(&settings.fleet.queue_url, settings.fleet.queue_key.clone())
        .context("Failed to create work queue client")?;
    info!("Consuming batches from {}", queue.address());

    // 4. Initialize components
    let registry = StrategyRegistry::new().with_strategy(Arc::new(ReqwestStrategy::new(
        settings.reqwest_strategy_config(),
    )));
    let repository = Arc::new(FileDocumentRepository::new(&settings.storage.local_path));
    let shutdown = CancellationToken::new();
    let use_case = ScrapeUseCase::new(Arc::new(registry))
        .with_repository(repository)
        .with_pool_config(settings.pool_config())
        .with_retry_policy(settings.retry_policy())
        .with_cancellation(shutdown.clone());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
        signal_token.cancel();
    });

    // 5. Process batches until shutdown
    let idle = Duration::from_secs(settings.fleet.poll_interval_secs.max(1));
    while !shutdown.is_cancelled() {
        let batch = match queue.pop().await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                tokio::select! {
                    _ = tokio::time::sleep(idle) => {}
                    _ = shutdown.cancelled() => {}
                }
                continue;
            }
            Err(e) => {
                error!("Failed to pop batch: {}", e);
                tokio::select! {
                    _ = tokio::time::sleep(idle) => {}
                    _ = shutdown.cancelled() => {}
                }
                continue;
            }
        };

        info!("Received batch of {} identifiers", batch.len());
        match use_case
            .execute(&batch, settings.crawler.max_concurrent, true)
            .await
        {
            Ok(result) => {
                for message in result.errors() {
                    warn!("{}", message);
                }
                let stats = WorkerStats::new(result.succeeded() as u64, result.failed() as u64);
                if let Err(e) = queue.record_stats(&worker_name, stats).await {
                    warn!("Failed to record stats: {}", e);
                }
                match queue.requeue(result.cancelled()).await {
                    Ok(true) => info!(
                        "Returned {} unprocessed identifiers to the queue",
                        result.cancelled().len()
                    ),
                    Ok(false) => {}
                    Err(e) => error!(
                        "Failed to requeue {} identifiers: {}",
                        result.cancelled().len(),
                        e
                    ),
                }
            }
            Err(e) => error!("Batch aborted: {}", e),
        }
    }

    info!("Worker {} shut down", worker_name);
    Ok(())
}
