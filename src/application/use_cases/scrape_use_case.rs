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

use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::domain::models::document::Document;
use crate::domain::models::outcome::WorkerResult;
use crate::domain::models::scraping_result::{ScrapingResult, ScrapingResultBuilder};
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::engines::registry::{StrategyGroup, StrategyRegistry};
use crate::engines::traits::{DiscoveryStrategy, ExtractRequest};
use crate::utils::errors::{PoolError, WorkError};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils::normalize_url;
use crate::workers::pool::{PoolConfig, WorkerPool};
use crate::workers::retry::RetryCoordinator;

#[derive(Error, Debug)]
pub enum ScrapeUseCaseError {
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Persistence requested but no document repository is configured")]
    RepositoryNotConfigured,
}

/// 抓取用例
///
/// 按策略对标识符分组，每组使用独立的工作池执行，最后汇总为不可变的
/// `ScrapingResult`。预期内的失败（网络错误、不支持的URL、持久化失败）
/// 都记录在结果中，只有契约错误才以 `Err` 返回
pub struct ScrapeUseCase {
    registry: Arc<StrategyRegistry>,
    repository: Option<Arc<dyn DocumentRepository>>,
    discovery: Option<Arc<dyn DiscoveryStrategy>>,
    pool_config: PoolConfig,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ScrapeUseCase {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self {
            registry,
            repository: None,
            discovery: None,
            pool_config: PoolConfig::default(),
            retry_policy: RetryPolicy::none(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn DocumentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_discovery(mut self, strategy: Arc<dyn DiscoveryStrategy>) -> Self {
        self.discovery = Some(strategy);
        self
    }

    pub fn with_pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// `max_attempts > 1` 时每组通过重试协调器执行
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 执行一次批量抓取
    ///
    /// # 参数
    ///
    /// * `identifiers` - 待抓取的标识符，规范化后重复的只处理一次
    /// * `max_concurrent` - 每个策略组的并发上限
    /// * `persist` - 是否把成功的文档写入仓库
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapingResult)` - 本次运行的完整记录，持久化失败也在其中
    /// * `Err(ScrapeUseCaseError)` - 并发数非法，或要求持久化但没有仓库
    #[instrument(skip(self, identifiers), fields(identifiers = identifiers.len()))]
    pub async fn execute(
        &self,
        identifiers: &[String],
        max_concurrent: usize,
        persist: bool,
    ) -> Result<ScrapingResult, ScrapeUseCaseError> {
        if persist && self.repository.is_none() {
            return Err(ScrapeUseCaseError::RepositoryNotConfigured);
        }
        if max_concurrent == 0 {
            return Err(PoolError::InvalidSize(0).into());
        }

        let mut seen = HashSet::new();
        let mut distinct = Vec::with_capacity(identifiers.len());
        let mut duplicates = Vec::new();
        for identifier in identifiers {
            let normalized = normalize_url(identifier);
            if seen.insert(normalized.clone()) {
                distinct.push(normalized);
            } else {
                duplicates.push(identifier.clone());
            }
        }

        let mut builder = ScrapingResultBuilder::new(distinct.clone());
        for duplicate in duplicates {
            builder.add_warning(format!("duplicate identifier ignored: {}", duplicate));
        }

        let groups = self.registry.group_by_strategy(&distinct);
        for identifier in &groups.unsupported {
            warn!("No strategy supports {}", identifier);
            builder.add_skipped(format!("no strategy supports identifier {}", identifier));
        }

        for group in &groups.groups {
            if self.cancel.is_cancelled() {
                for identifier in &group.identifiers {
                    builder.add_cancelled(identifier);
                }
                continue;
            }

            info!(
                "Running {} identifiers through strategy {}",
                group.identifiers.len(),
                group.strategy.name()
            );
            let outcomes = self.run_group(group, max_concurrent).await?;
            merge_outcomes(&mut builder, group, outcomes);
        }

        if persist {
            self.persist(&mut builder).await;
        }

        counter!("scrape_batches_total").increment(1);
        let result = builder.finish();
        info!(
            "Scrape finished: {} total, {} succeeded, {} failed, {} skipped in {:.2}s",
            result.total(),
            result.succeeded(),
            result.failed(),
            result.skipped(),
            result.duration_seconds()
        );
        Ok(result)
    }

    /// 把完整爬取委托给发现策略，结果原样返回
    #[instrument(skip(self))]
    pub async fn execute_discovery(&self, seed: &str) -> ScrapingResult {
        match &self.discovery {
            Some(strategy) => {
                info!("Delegating discovery of {} to {}", seed, strategy.name());
                strategy.discover(seed).await
            }
            None => {
                warn!("No discovery strategy configured");
                let mut builder = ScrapingResultBuilder::new(vec![seed.to_string()]);
                builder.add_skipped(format!("no discovery strategy supports identifier {}", seed));
                builder.finish()
            }
        }
    }

    async fn run_group(
        &self,
        group: &StrategyGroup,
        max_concurrent: usize,
    ) -> Result<Vec<WorkerResult<Document>>, PoolError> {
        let pool = WorkerPool::with_size(max_concurrent, self.pool_config.clone())?;
        let strategy = group.strategy.clone();
        let work_fn = move |identifier: String, slot: usize| {
            let strategy = strategy.clone();
            async move {
                let request = ExtractRequest::new(identifier, slot);
                strategy.extract(&request).await.map_err(WorkError::from)
            }
        };

        let outcomes = if self.retry_policy.max_attempts > 1 {
            RetryCoordinator::new(self.retry_policy.clone())
                .process(&pool, &group.identifiers, work_fn, self.cancel.clone())
                .await
        } else {
            pool.process_all_with_cancel(&group.identifiers, work_fn, self.cancel.clone())
                .await
        };

        pool.close().await;
        outcomes
    }

    async fn persist(&self, builder: &mut ScrapingResultBuilder) {
        let Some(repository) = &self.repository else {
            return;
        };
        if builder.units().is_empty() {
            return;
        }

        match repository.save_batch(builder.units()).await {
            Ok(()) => info!("Persisted {} documents", builder.units().len()),
            Err(e) => {
                error!("Failed to persist batch: {}", e);
                builder.add_error(format!("persistence failed: {}", e));
            }
        }
    }
}

fn merge_outcomes(
    builder: &mut ScrapingResultBuilder,
    group: &StrategyGroup,
    outcomes: Vec<WorkerResult<Document>>,
) {
    let mut processed = HashSet::with_capacity(outcomes.len());
    for outcome in outcomes {
        processed.insert(outcome.identifier.clone());
        match outcome.result {
            Ok(document) => {
                builder.add_unit(document.with_provenance(outcome.worker_index, outcome.duration))
            }
            Err(WorkError::Cancelled) => builder.add_cancelled(&outcome.identifier),
            Err(WorkError::NoStrategyFound(_)) => {
                warn!("Strategy {} rejected {}", group.strategy.name(), outcome.identifier);
                builder.add_skipped(format!(
                    "no strategy supports identifier {}",
                    outcome.identifier
                ));
            }
            Err(e) => {
                warn!("Extraction of {} failed: {}", outcome.identifier, e);
                builder.add_failure(&outcome.identifier, e);
            }
        }
    }

    // 取消后未被领取的标识符
    for identifier in &group.identifiers {
        if !processed.contains(identifier) {
            builder.add_cancelled(identifier);
        }
    }
}
