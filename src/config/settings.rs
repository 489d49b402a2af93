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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::engines::link_crawler::LinkCrawlConfig;
use crate::engines::reqwest_strategy::ReqwestStrategyConfig;
use crate::fleet::manager::FleetConfig;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::pool::PoolConfig;

/// 应用程序配置设置
///
/// 包含抓取、集群、工作进程、存储和指标配置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 抓取配置
    pub crawler: CrawlerSettings,
    /// 集群配置
    pub fleet: FleetSettings,
    /// 当前工作进程配置
    pub worker: WorkerSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 每个策略组的并发上限
    pub max_concurrent: usize,
    /// 单项超时时间（秒），0 表示不限制
    pub item_timeout_secs: u64,
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 退避上限（秒）
    pub backoff_cap_secs: u64,
    pub user_agent: String,
    /// 允许的主机，为空不限制
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// 拒绝访问的URL正则
    #[serde(default)]
    pub deny_patterns: Vec<String>,
    /// 链接发现的最大页面数
    pub max_pages: usize,
    /// 链接发现的最大深度
    pub max_depth: usize,
}

/// 集群配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct FleetSettings {
    /// 工作进程镜像
    pub image: String,
    pub name_prefix: String,
    /// 共享队列地址
    pub queue_url: String,
    pub queue_key: String,
    pub batch_size: usize,
    /// 健康检查间隔（秒）
    pub poll_interval_secs: u64,
    pub network: Option<String>,
}

/// 工作进程配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// 工作进程序号，由集群管理器注入
    pub index: usize,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 本地文档目录
    pub local_path: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 导出器监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `DOCRAWL__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        Self::build(Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("DOCRAWL")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("crawler.allowed_hosts")
            .with_list_parse_key("crawler.deny_patterns")
            .try_parsing(true)
    }

    fn build(environment: Environment) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Crawler defaults
            .set_default("crawler.max_concurrent", 5)?
            .set_default("crawler.item_timeout_secs", 60)?
            .set_default("crawler.max_attempts", 3)?
            .set_default("crawler.backoff_cap_secs", 30)?
            .set_default("crawler.user_agent", "Mozilla/5.0 (compatible; docrawl/1.0)")?
            .set_default("crawler.max_pages", 500)?
            .set_default("crawler.max_depth", 5)?
            // Fleet defaults
            .set_default("fleet.image", "docrawl-worker:latest")?
            .set_default("fleet.name_prefix", "docrawl-worker")?
            .set_default("fleet.queue_url", "redis://127.0.0.1:6379")?
            .set_default("fleet.queue_key", "docrawl:work")?
            .set_default("fleet.batch_size", 20)?
            .set_default("fleet.poll_interval_secs", 10)?
            .set_default("worker.index", 0)?
            .set_default("storage.local_path", "./storage")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(environment);

        builder.build()?.try_deserialize()
    }

    /// 工作池配置
    pub fn pool_config(&self) -> PoolConfig {
        match self.crawler.item_timeout_secs {
            0 => PoolConfig::default(),
            secs => PoolConfig::with_item_timeout(Duration::from_secs(secs)),
        }
    }

    /// 重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.crawler.max_attempts.max(1),
            Duration::from_secs(self.crawler.backoff_cap_secs),
        )
    }

    /// HTTP 提取策略配置
    pub fn reqwest_strategy_config(&self) -> ReqwestStrategyConfig {
        let defaults = ReqwestStrategyConfig::default();
        ReqwestStrategyConfig {
            user_agent: self.crawler.user_agent.clone(),
            timeout: match self.crawler.item_timeout_secs {
                0 => defaults.timeout,
                secs => Duration::from_secs(secs),
            },
            allowed_hosts: self.crawler.allowed_hosts.clone(),
            ..defaults
        }
    }

    /// 链接发现配置
    pub fn link_crawl_config(&self) -> LinkCrawlConfig {
        LinkCrawlConfig {
            max_pages: self.crawler.max_pages,
            max_depth: self.crawler.max_depth,
            max_concurrent: self.crawler.max_concurrent,
            deny_patterns: self.crawler.deny_patterns.clone(),
            pool: self.pool_config(),
        }
    }

    /// 集群配置
    pub fn fleet_config(&self) -> FleetConfig {
        FleetConfig {
            image: self.fleet.image.clone(),
            name_prefix: self.fleet.name_prefix.clone(),
            queue_key: self.fleet.queue_key.clone(),
            network: self.fleet.network.clone(),
        }
    }

    /// 当前工作进程在集群中的名称
    pub fn worker_name(&self) -> String {
        format!("{}-{}", self.fleet.name_prefix, self.worker.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(vars: &[(&str, &str)]) -> Settings {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::build(Settings::environment().source(Some(source))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = settings_with(&[]);

        assert_eq!(settings.crawler.max_concurrent, 5);
        assert_eq!(settings.crawler.max_attempts, 3);
        assert_eq!(settings.fleet.queue_key, "docrawl:work");
        assert_eq!(settings.fleet.batch_size, 20);
        assert_eq!(settings.worker.index, 0);
        assert!(!settings.metrics.enabled);
        assert!(settings.fleet.network.is_none());
        assert_eq!(settings.worker_name(), "docrawl-worker-0");
    }

    #[test]
    fn test_environment_overrides() {
        let settings = settings_with(&[
            ("DOCRAWL__CRAWLER__MAX_CONCURRENT", "8"),
            ("DOCRAWL__CRAWLER__ALLOWED_HOSTS", "docs.example.com,help.example.com"),
            ("DOCRAWL__WORKER__INDEX", "3"),
            ("DOCRAWL__FLEET__NETWORK", "crawl-net"),
        ]);

        assert_eq!(settings.crawler.max_concurrent, 8);
        assert_eq!(
            settings.crawler.allowed_hosts,
            vec!["docs.example.com", "help.example.com"]
        );
        assert_eq!(settings.worker.index, 3);
        assert_eq!(settings.fleet_config().network.as_deref(), Some("crawl-net"));
        assert_eq!(settings.worker_name(), "docrawl-worker-3");
    }

    #[test]
    fn test_runtime_conversions() {
        let settings = settings_with(&[
            ("DOCRAWL__CRAWLER__ITEM_TIMEOUT_SECS", "0"),
            ("DOCRAWL__CRAWLER__BACKOFF_CAP_SECS", "4"),
        ]);

        assert_eq!(settings.pool_config().item_timeout, None);
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.calculate_backoff(5), Duration::from_secs(4));
        assert_eq!(settings.link_crawl_config().max_pages, 500);
    }
}
