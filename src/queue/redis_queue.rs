// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;
use tokio::sync::OnceCell;

use crate::domain::models::fleet_worker::WorkerStats;
use crate::queue::work_queue::{QueueError, WorkQueue};

/// Redis 工作队列
///
/// 批次以 JSON 数组形式保存在 Redis 列表中（RPUSH 入队，LPOP 出队），
/// 工作进程统计保存在 `<key>:stats:<worker>` 哈希中
pub struct RedisWorkQueue {
    /// Redis客户端
    client: redis::Client,
    /// 复用的多路复用连接
    connection: OnceCell<MultiplexedConnection>,
    /// 连接URL
    url: String,
    /// 列表键
    key: String,
}

impl RedisWorkQueue {
    /// 创建新的Redis工作队列
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    /// * `key` - 队列使用的列表键
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            url: redis_url.to_string(),
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> Result<MultiplexedConnection, QueueError> {
        let con = self
            .connection
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(con.clone())
    }

    fn stats_key(&self, worker: &str) -> String {
        format!("{}:stats:{}", self.key, worker)
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn push(&self, batch: Vec<String>) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&batch)?;
        let mut con = self.connection().await?;
        con.rpush::<_, _, ()>(&self.key, payload).await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Option<Vec<String>>, QueueError> {
        let mut con = self.connection().await?;
        let payload: Option<String> = con.lpop(&self.key, None).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let mut con = self.connection().await?;
        let len: usize = con.llen(&self.key).await?;
        Ok(len)
    }

    async fn record_stats(&self, worker: &str, delta: WorkerStats) -> Result<(), QueueError> {
        let key = self.stats_key(worker);
        let mut con = self.connection().await?;
        redis::pipe()
            .atomic()
            .hincr(&key, "processed", delta.processed)
            .ignore()
            .hincr(&key, "succeeded", delta.succeeded)
            .ignore()
            .hincr(&key, "failed", delta.failed)
            .ignore()
            .query_async::<()>(&mut con)
            .await?;
        Ok(())
    }

    async fn stats(&self, worker: &str) -> Result<WorkerStats, QueueError> {
        let mut con = self.connection().await?;
        let fields: HashMap<String, u64> = con.hgetall(self.stats_key(worker)).await?;
        let field = |name: &str| fields.get(name).copied().unwrap_or(0);
        Ok(WorkerStats {
            processed: field("processed"),
            succeeded: field("succeeded"),
            failed: field("failed"),
        })
    }

    fn address(&self) -> String {
        self.url.clone()
    }
}
