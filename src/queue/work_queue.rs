// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;

use crate::domain::models::fleet_worker::WorkerStats;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// Redis 错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 工作队列特质
///
/// 集群模式下管理器与工作进程之间共享的先进先出队列，
/// 元素为一批标识符
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// 入队一批标识符
    async fn push(&self, batch: Vec<String>) -> Result<(), QueueError>;

    /// 出队一批标识符，队列为空时返回 None
    async fn pop(&self) -> Result<Option<Vec<String>>, QueueError>;

    /// 队列中剩余的批次数
    async fn len(&self) -> Result<usize, QueueError>;

    async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    /// 把没有处理的标识符作为新批次放回队列
    ///
    /// 列表为空时不入队，返回是否入队
    async fn requeue(&self, identifiers: &[String]) -> Result<bool, QueueError> {
        if identifiers.is_empty() {
            return Ok(false);
        }
        self.push(identifiers.to_vec()).await?;
        Ok(true)
    }

    /// 累加工作进程统计
    async fn record_stats(&self, worker: &str, delta: WorkerStats) -> Result<(), QueueError>;

    /// 读取工作进程累计统计
    async fn stats(&self, worker: &str) -> Result<WorkerStats, QueueError>;

    /// 工作进程连接队列使用的地址
    fn address(&self) -> String;
}

/// 内存工作队列
///
/// 只在单个进程内可达，用于测试和单机部署
#[derive(Debug, Default)]
pub struct InMemoryWorkQueue {
    batches: Mutex<VecDeque<Vec<String>>>,
    stats: DashMap<String, WorkerStats>,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn push(&self, batch: Vec<String>) -> Result<(), QueueError> {
        self.batches.lock().push_back(batch);
        Ok(())
    }

    async fn pop(&self) -> Result<Option<Vec<String>>, QueueError> {
        Ok(self.batches.lock().pop_front())
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.batches.lock().len())
    }

    async fn record_stats(&self, worker: &str, delta: WorkerStats) -> Result<(), QueueError> {
        let mut entry = self.stats.entry(worker.to_string()).or_default();
        entry.processed += delta.processed;
        entry.succeeded += delta.succeeded;
        entry.failed += delta.failed;
        Ok(())
    }

    async fn stats(&self, worker: &str) -> Result<WorkerStats, QueueError> {
        Ok(self.stats.get(worker).map(|s| *s).unwrap_or_default())
    }

    fn address(&self) -> String {
        "memory://local".to_string()
    }
}
