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
use thiserror::Error;

use crate::domain::models::document::Document;
use crate::domain::models::scraping_result::ScrapingResult;
use crate::utils::errors::WorkError;

/// 提取策略错误类型
#[derive(Error, Debug)]
pub enum StrategyError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非成功的HTTP状态码
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),
    /// 内容解析失败
    #[error("Parse error: {0}")]
    Parse(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 策略不支持该标识符
    #[error("Unsupported identifier: {0}")]
    Unsupported(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl From<StrategyError> for WorkError {
    fn from(error: StrategyError) -> Self {
        match error {
            StrategyError::Unsupported(identifier) => WorkError::NoStrategyFound(identifier),
            other => WorkError::Extraction(other.to_string()),
        }
    }
}

/// 提取请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// 目标URL
    pub url: String,
    /// 执行请求的工作槽，策略据此选择该槽独占的会话/连接
    pub slot: usize,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>, slot: usize) -> Self {
        Self {
            url: url.into(),
            slot,
        }
    }
}

/// 提取策略特质
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// 策略名称
    fn name(&self) -> &str;

    /// 是否能处理该标识符
    fn supports(&self, url: &str) -> bool;

    /// 提取文档
    async fn extract(&self, request: &ExtractRequest) -> Result<Document, StrategyError>;
}

/// 同时具备提取和链接发现能力的策略
///
/// 遍历逻辑完全属于策略本身，返回的结果由编排器原样转交
#[async_trait]
pub trait DiscoveryStrategy: ExtractionStrategy {
    /// 从种子标识符开始完整爬取
    async fn discover(&self, seed: &str) -> ScrapingResult;
}
