// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::domain::models::fleet_worker::{FleetWorker, WorkerStatus};
use crate::fleet::runtime::{ContainerHandle, ContainerRuntime, ContainerSpec, RuntimeError};
use crate::queue::work_queue::WorkQueue;
use crate::utils::errors::FleetError;

/// 集群配置
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// 工作进程镜像
    pub image: String,
    /// 容器名前缀，容器名为 `{prefix}-{ordinal}`
    pub name_prefix: String,
    /// 工作进程读取的队列键
    pub queue_key: String,
    pub network: Option<String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            image: "docrawl-worker:latest".to_string(),
            name_prefix: "docrawl-worker".to_string(),
            queue_key: "docrawl:work".to_string(),
            network: None,
        }
    }
}

/// 一次伸缩操作的结果
#[derive(Debug, Default)]
pub struct ScaleReport {
    /// 操作结束后跟踪的工作进程
    pub workers: Vec<FleetWorker>,
    /// 新建的容器名
    pub created: Vec<String>,
    /// 移除的容器名，按移除顺序
    pub removed: Vec<String>,
    pub errors: Vec<FleetError>,
}

impl ScaleReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Default)]
struct FleetState {
    /// 按创建顺序排列
    workers: Vec<FleetWorker>,
    /// 下一个工作进程的序号，只增不减，容器名和统计键因此不会复用
    next_ordinal: usize,
}

/// 集群管理器
///
/// 让实际运行的工作进程数量与期望数量一致，通过共享队列分发工作，
/// 并轮询工作进程的健康状态
pub struct FleetManager {
    runtime: Arc<dyn ContainerRuntime>,
    queue: Arc<dyn WorkQueue>,
    config: FleetConfig,
    state: Mutex<FleetState>,
    cancel: CancellationToken,
}

impl FleetManager {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        queue: Arc<dyn WorkQueue>,
        config: FleetConfig,
    ) -> Self {
        Self {
            runtime,
            queue,
            config,
            state: Mutex::new(FleetState::default()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 当前跟踪的工作进程快照
    pub async fn workers(&self) -> Vec<FleetWorker> {
        self.state.lock().await.workers.clone()
    }

    fn spec_for(&self, ordinal: usize) -> ContainerSpec {
        ContainerSpec {
            name: format!("{}-{}", self.config.name_prefix, ordinal),
            image: self.config.image.clone(),
            env: vec![
                ("DOCRAWL__WORKER__INDEX".to_string(), ordinal.to_string()),
                ("DOCRAWL__FLEET__QUEUE_URL".to_string(), self.queue.address()),
                (
                    "DOCRAWL__FLEET__QUEUE_KEY".to_string(),
                    self.config.queue_key.clone(),
                ),
            ],
            network: self.config.network.clone(),
        }
    }

    /// 伸缩到期望数量
    ///
    /// 扩容时按递增序号创建新容器，序号不复用；缩容时先移除最近创建的容器。
    /// 单个容器的生命周期错误记录在报告中，不会中断整个操作。
    /// 取消后立即返回当前已完成的部分
    #[instrument(skip(self))]
    pub async fn scale_to(&self, desired: usize) -> ScaleReport {
        let mut state = self.state.lock().await;
        let mut report = ScaleReport::default();
        let current = state.workers.len();

        if desired > current {
            info!("Scaling fleet up from {} to {}", current, desired);
            for _ in current..desired {
                if self.cancel.is_cancelled() {
                    report.errors.push(FleetError::Cancelled);
                    break;
                }

                let ordinal = state.next_ordinal;
                state.next_ordinal += 1;
                let spec = self.spec_for(ordinal);
                match self.runtime.create(&spec).await {
                    Ok(handle) => {
                        let status = self.runtime.status(&handle).await;
                        info!(
                            "Created worker {} ({}), status {:?}",
                            handle.name, handle.id, status
                        );
                        if status != WorkerStatus::Running {
                            warn!("Worker {} is not running after create", handle.name);
                        }
                        report.created.push(handle.name.clone());
                        state
                            .workers
                            .push(FleetWorker::new(handle.id, handle.name, ordinal, status));
                    }
                    Err(e) => report.errors.push(lifecycle_error(&spec.name, "create", e)),
                }
            }
        } else if desired < current {
            info!("Scaling fleet down from {} to {}", current, desired);
            for _ in desired..current {
                if self.cancel.is_cancelled() {
                    report.errors.push(FleetError::Cancelled);
                    break;
                }

                let Some(worker) = state.workers.pop() else {
                    break;
                };
                report.errors.extend(self.retire(&worker).await);
                report.removed.push(worker.name);
            }
        }

        gauge!("fleet_workers").set(state.workers.len() as f64);
        report.workers = state.workers.clone();
        report
    }

    /// 停止并删除一个容器，两步都会尝试
    async fn retire(&self, worker: &FleetWorker) -> Vec<FleetError> {
        let handle = ContainerHandle {
            id: worker.process_id.clone(),
            name: worker.name.clone(),
        };

        let mut errors = Vec::new();
        if let Err(e) = self.runtime.stop(&handle).await {
            errors.push(lifecycle_error(&worker.name, "stop", e));
        }
        match self.runtime.remove(&handle).await {
            Ok(()) => info!("Removed worker {}", worker.name),
            Err(e) => errors.push(lifecycle_error(&worker.name, "remove", e)),
        }
        errors
    }

    /// 把标识符按批次推入共享队列，不等待消费
    ///
    /// 返回推入的批次数
    #[instrument(skip(self, identifiers), fields(identifiers = identifiers.len()))]
    pub async fn distribute_work(
        &self,
        identifiers: &[String],
        batch_size: usize,
    ) -> Result<usize, FleetError> {
        let mut batches = 0;
        for chunk in identifiers.chunks(batch_size.max(1)) {
            self.queue.push(chunk.to_vec()).await?;
            batches += 1;
        }
        info!(
            "Queued {} identifiers in {} batches on {}",
            identifiers.len(),
            batches,
            self.queue.address()
        );
        Ok(batches)
    }

    /// 查询每个工作进程的实际状态和累计统计
    ///
    /// 消失的工作进程只记录日志，不会自动重建
    pub async fn refresh_health(&self) -> Vec<FleetWorker> {
        let mut state = self.state.lock().await;
        for worker in state.workers.iter_mut() {
            let handle = ContainerHandle {
                id: worker.process_id.clone(),
                name: worker.name.clone(),
            };
            let status = self.runtime.status(&handle).await;
            match status {
                WorkerStatus::NotFound => warn!("Worker {} not found", worker.name),
                WorkerStatus::Stopped if worker.status == WorkerStatus::Running => {
                    warn!("Worker {} has stopped", worker.name)
                }
                _ => {}
            }
            worker.status = status;

            match self.queue.stats(&worker.name).await {
                Ok(stats) => worker.stats = stats,
                Err(e) => warn!("Failed to read stats for {}: {}", worker.name, e),
            }
        }
        state.workers.clone()
    }

    /// 按固定间隔轮询健康状态，直到取消
    pub async fn monitor_health(&self, poll_interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(poll_interval);
        info!("Monitoring fleet health every {:?}", poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Fleet health monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let workers = self.refresh_health().await;
                    let running = workers
                        .iter()
                        .filter(|w| w.status == WorkerStatus::Running)
                        .count();
                    info!("Fleet health: {}/{} workers running", running, workers.len());
                }
            }
        }
    }

    /// 停止并删除所有工作进程
    ///
    /// 逐个尽力处理，返回所有失败
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Vec<FleetError> {
        let mut state = self.state.lock().await;
        let mut errors = Vec::new();

        while let Some(worker) = state.workers.pop() {
            errors.extend(self.retire(&worker).await);
        }

        gauge!("fleet_workers").set(0.0);
        if errors.is_empty() {
            info!("Fleet cleaned up");
        } else {
            error!("Fleet cleanup finished with {} errors", errors.len());
        }
        errors
    }
}

fn lifecycle_error(worker: &str, action: &'static str, error: RuntimeError) -> FleetError {
    error!("Failed to {} worker {}: {}", action, worker, error);
    counter!("fleet_lifecycle_errors_total", "action" => action).increment(1);
    FleetError::Lifecycle {
        worker: worker.to_string(),
        action,
        reason: error.to_string(),
    }
}
