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

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::domain::models::document::Document;
use crate::domain::models::scraping_result::{ScrapingResult, ScrapingResultBuilder};
use crate::engines::reqwest_strategy::{Page, ReqwestStrategy};
use crate::engines::traits::{
    DiscoveryStrategy, ExtractRequest, ExtractionStrategy, StrategyError,
};
use crate::utils::errors::WorkError;
use crate::utils::url_utils::{normalize_url, UrlResolver};
use crate::workers::pool::{PoolConfig, WorkerPool};

/// 链接发现配置
#[derive(Debug, Clone)]
pub struct LinkCrawlConfig {
    /// 单次发现最多抓取的页面数
    pub max_pages: usize,
    /// 距离种子页面的最大链接深度
    pub max_depth: usize,
    /// 每层并发抓取数
    pub max_concurrent: usize,
    /// 拒绝访问的URL模式
    pub deny_patterns: Vec<String>,
    pub pool: PoolConfig,
}

impl Default for LinkCrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 500,
            max_depth: 5,
            max_concurrent: 5,
            deny_patterns: Vec::new(),
            pool: PoolConfig::default(),
        }
    }
}

/// 从种子页面出发按层抓取同站点链接
///
/// 范围限制为种子的主机，每层通过独立的工作池并发抓取
pub struct LinkCrawlStrategy {
    fetcher: Arc<ReqwestStrategy>,
    config: LinkCrawlConfig,
}

impl LinkCrawlStrategy {
    pub fn new(fetcher: Arc<ReqwestStrategy>, config: LinkCrawlConfig) -> Self {
        Self { fetcher, config }
    }

    fn resolver_for(&self, seed: &str, builder: &mut ScrapingResultBuilder) -> UrlResolver {
        match UrlResolver::new()
            .with_allowed_hosts([seed])
            .with_deny_patterns(&self.config.deny_patterns)
        {
            Ok(resolver) => resolver,
            Err(e) => {
                builder.add_warning(format!("invalid deny pattern ignored: {}", e));
                UrlResolver::new().with_allowed_hosts([seed])
            }
        }
    }
}

/// 去掉普通页内锚点，保留 `#/` 和 `#!/` 形式的 hash 路由
fn strip_anchor(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let is_route = parsed
                .fragment()
                .is_some_and(|f| f.starts_with('/') || f.starts_with("!/"));
            if !is_route {
                parsed.set_fragment(None);
            }
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

#[async_trait]
impl ExtractionStrategy for LinkCrawlStrategy {
    fn name(&self) -> &str {
        "link-crawler"
    }

    fn supports(&self, url: &str) -> bool {
        self.fetcher.supports(url)
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Document, StrategyError> {
        self.fetcher.extract(request).await
    }
}

#[async_trait]
impl DiscoveryStrategy for LinkCrawlStrategy {
    async fn discover(&self, seed: &str) -> ScrapingResult {
        let seed = normalize_url(&strip_anchor(seed));
        let mut builder = ScrapingResultBuilder::new(vec![seed.clone()]);

        if !self.supports(&seed) {
            builder.add_skipped(format!("no strategy supports identifier {}", seed));
            return builder.finish();
        }

        let resolver = self.resolver_for(&seed, &mut builder);
        let pool = match WorkerPool::with_size(self.config.max_concurrent, self.config.pool.clone())
        {
            Ok(pool) => pool,
            Err(e) => {
                builder.add_error(e.to_string());
                return builder.finish();
            }
        };

        resolver.mark_visited(&seed);
        let mut frontier = vec![seed.clone()];
        let mut fetched = 0usize;
        let mut depth = 0usize;
        let mut not_fetched = 0usize;

        while !frontier.is_empty() && depth <= self.config.max_depth {
            let remaining = self.config.max_pages.saturating_sub(fetched);
            if remaining == 0 {
                break;
            }
            if frontier.len() > remaining {
                not_fetched += frontier.len() - remaining;
                frontier.truncate(remaining);
            }

            let fetcher = self.fetcher.clone();
            let outcomes = pool
                .process_all(&frontier, move |url, slot| {
                    let fetcher = fetcher.clone();
                    async move {
                        fetcher
                            .fetch_page(&ExtractRequest::new(url, slot))
                            .await
                            .map_err(WorkError::from)
                    }
                })
                .await;

            let outcomes = match outcomes {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    builder.add_error(format!("crawl aborted at depth {}: {}", depth, e));
                    break;
                }
            };

            let mut next = Vec::new();
            for outcome in outcomes {
                fetched += 1;
                let worker_index = outcome.worker_index;
                let duration = outcome.duration;
                match outcome.result {
                    Ok(Page { document, links }) => {
                        if depth < self.config.max_depth {
                            for link in links {
                                let Some(absolute) = resolver.resolve(&document.source_url, &link)
                                else {
                                    continue;
                                };
                                let absolute = strip_anchor(&absolute);
                                if resolver.should_visit(&absolute) && resolver.mark_visited(&absolute)
                                {
                                    next.push(normalize_url(&absolute));
                                }
                            }
                        }
                        builder.add_unit(document.with_provenance(worker_index, duration));
                    }
                    Err(e) => builder.add_failure(&outcome.identifier, e),
                }
            }

            info!(
                "Depth {} done: {} pages fetched, {} new links queued",
                depth,
                fetched,
                next.len()
            );
            frontier = next;
            depth += 1;
        }

        not_fetched += frontier.len();
        if not_fetched > 0 {
            warn!("Discovery from {} stopped with {} links left", seed, not_fetched);
            builder.add_warning(format!(
                "discovery limit reached, {} links not fetched",
                not_fetched
            ));
        }

        pool.close().await;
        builder.finish()
    }
}
