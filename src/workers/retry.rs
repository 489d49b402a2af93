// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::models::outcome::WorkerResult;
use crate::utils::errors::{PoolError, WorkError};
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::pool::WorkerPool;

/// 重试协调器
///
/// 包装工作池，只把失败的标识符重新提交，每轮之间按指数退避等待。
/// 重试总是从头执行，不会从上一次的部分状态恢复
#[derive(Debug, Clone, Default)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 使用策略中的最大尝试次数处理
    pub async fn process<T, F, Fut>(
        &self,
        pool: &WorkerPool,
        identifiers: &[String],
        work_fn: F,
        cancel: CancellationToken,
    ) -> Result<Vec<WorkerResult<T>>, PoolError>
    where
        T: Send + 'static,
        F: Fn(String, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        self.process_with_retry_and_cancel(
            pool,
            identifiers,
            work_fn,
            self.policy.max_attempts,
            cancel,
        )
        .await
    }

    /// 处理标识符并重试失败项
    ///
    /// 返回每个标识符最后一次记录的结果，顺序与输入一致；重复的标识符只处理一次
    pub async fn process_with_retry<T, F, Fut>(
        &self,
        pool: &WorkerPool,
        identifiers: &[String],
        work_fn: F,
        max_attempts: u32,
    ) -> Result<Vec<WorkerResult<T>>, PoolError>
    where
        T: Send + 'static,
        F: Fn(String, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        self.process_with_retry_and_cancel(
            pool,
            identifiers,
            work_fn,
            max_attempts,
            CancellationToken::new(),
        )
        .await
    }

    /// 带取消信号的 `process_with_retry`
    ///
    /// 取消后不再开始新一轮，退避等待也会立即结束
    pub async fn process_with_retry_and_cancel<T, F, Fut>(
        &self,
        pool: &WorkerPool,
        identifiers: &[String],
        work_fn: F,
        max_attempts: u32,
        cancel: CancellationToken,
    ) -> Result<Vec<WorkerResult<T>>, PoolError>
    where
        T: Send + 'static,
        F: Fn(String, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        let max_attempts = max_attempts.max(1);
        let mut seen = HashSet::new();
        let order: Vec<String> = identifiers
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let work_fn = Arc::new(work_fn);
        let mut latest: HashMap<String, WorkerResult<T>> = HashMap::with_capacity(order.len());
        let mut pending = order.clone();
        let mut attempt = 1;

        loop {
            let f = work_fn.clone();
            let outcomes = pool
                .process_all_with_cancel(&pending, move |id, slot| (*f)(id, slot), cancel.clone())
                .await?;

            let mut failed = HashSet::new();
            for outcome in outcomes {
                let outcome = outcome.with_attempt(attempt);
                if outcome.error().is_some_and(WorkError::is_retryable) {
                    failed.insert(outcome.identifier.clone());
                }
                latest.insert(outcome.identifier.clone(), outcome);
            }

            if failed.is_empty() {
                break;
            }
            if attempt >= max_attempts {
                warn!(
                    "{} identifiers still failing after {} attempts",
                    failed.len(),
                    attempt
                );
                break;
            }
            if cancel.is_cancelled() {
                break;
            }

            let backoff = self.policy.calculate_backoff(attempt);
            warn!(
                "Attempt {} left {} failed identifiers, retrying in {:?}",
                attempt,
                failed.len(),
                backoff
            );
            counter!("retry_attempts_total").increment(1);

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = cancel.cancelled() => {
                    info!("Retry cancelled during backoff");
                    break;
                }
            }

            attempt += 1;
            pending.retain(|id| failed.contains(id));
        }

        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .collect())
    }
}
