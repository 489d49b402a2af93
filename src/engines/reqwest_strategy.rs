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
use dashmap::DashMap;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::domain::models::document::Document;
use crate::engines::traits::{ExtractRequest, ExtractionStrategy, StrategyError};

/// 抓取到的页面：文档及页面中的原始链接
#[derive(Debug, Clone)]
pub struct Page {
    pub document: Document,
    pub links: Vec<String>,
}

/// HTTP 提取策略配置
#[derive(Debug, Clone)]
pub struct ReqwestStrategyConfig {
    /// 策略名称
    pub name: String,
    /// User-Agent
    pub user_agent: String,
    /// 请求超时
    pub timeout: Duration,
    /// 允许的主机，为空表示任意 http(s) 主机
    pub allowed_hosts: Vec<String>,
}

impl Default for ReqwestStrategyConfig {
    fn default() -> Self {
        Self {
            name: "reqwest".to_string(),
            user_agent: "Mozilla/5.0 (compatible; docrawl/1.0)".to_string(),
            timeout: Duration::from_secs(30),
            allowed_hosts: Vec::new(),
        }
    }
}

/// 基于 reqwest 的静态页面提取策略
///
/// 每个工作槽独占一个 `reqwest::Client`，槽之间不共享连接
pub struct ReqwestStrategy {
    config: ReqwestStrategyConfig,
    clients: DashMap<usize, reqwest::Client>,
}

impl ReqwestStrategy {
    pub fn new(mut config: ReqwestStrategyConfig) -> Self {
        config.allowed_hosts = config
            .allowed_hosts
            .iter()
            .map(|h| {
                Url::parse(h)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| h.trim().to_string())
                    .to_ascii_lowercase()
            })
            .collect();
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    fn client_for(&self, slot: usize) -> Result<reqwest::Client, StrategyError> {
        if let Some(client) = self.clients.get(&slot) {
            return Ok(client.value().clone());
        }

        let client = reqwest::Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(self.config.timeout)
            .build()?;
        Ok(self.clients.entry(slot).or_insert(client).value().clone())
    }

    /// 抓取页面并解析出文档和链接
    pub async fn fetch_page(&self, request: &ExtractRequest) -> Result<Page, StrategyError> {
        if !self.supports(&request.url) {
            return Err(StrategyError::Unsupported(request.url.clone()));
        }

        let client = self.client_for(request.slot)?;
        debug!("Slot {} fetching {}", request.slot, request.url);

        let response = client.get(&request.url).send().await.map_err(|e| {
            if e.is_timeout() {
                StrategyError::Timeout
            } else {
                StrategyError::RequestFailed(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::HttpStatus(status.as_u16()));
        }

        let html = response.text().await?;
        parse_page(&request.url, &html, &self.config.name)
    }
}

#[async_trait]
impl ExtractionStrategy for ReqwestStrategy {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supports(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        if self.config.allowed_hosts.is_empty() {
            return parsed.has_host();
        }
        parsed
            .host_str()
            .map(|host| host.to_ascii_lowercase())
            .is_some_and(|host| self.config.allowed_hosts.contains(&host))
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Document, StrategyError> {
        Ok(self.fetch_page(request).await?.document)
    }
}

fn selector(css: &str) -> Result<Selector, StrategyError> {
    Selector::parse(css).map_err(|e| StrategyError::Parse(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 从 HTML 中解析文档和链接
pub fn parse_page(url: &str, html: &str, strategy_name: &str) -> Result<Page, StrategyError> {
    let document = Html::parse_document(html);

    let title = ["title", "h1"]
        .iter()
        .map(|css| selector(css))
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .filter_map(|s| document.select(s).next().map(element_text))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let body = ["main", "article", "[role=main]", "body"]
        .iter()
        .map(|css| selector(css))
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .filter_map(|s| document.select(s).next().map(element_text))
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let link_selector = selector("a[href]")?;
    let links = document
        .select(&link_selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect();

    Ok(Page {
        document: Document::new(url, title, body, module_for(url), strategy_name),
        links,
    })
}

/// 粗粒度分类：hash 路由的第一段，否则为路径第一段
pub fn module_for(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "general".to_string();
    };

    let from_fragment = parsed
        .fragment()
        .and_then(|f| f.strip_prefix('/').or_else(|| f.strip_prefix("!/")))
        .and_then(|route| route.split('/').find(|s| !s.is_empty()));

    from_fragment
        .or_else(|| parsed.path_segments().and_then(|mut s| s.find(|s| !s.is_empty())))
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "general".to_string())
}
