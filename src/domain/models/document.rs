// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::utils::url_utils::normalize_url;

/// 抓取文档实体
///
/// 每个成功处理的标识符产生一个文档。文档创建后不再修改，
/// 补充来源信息时通过 `with_provenance` 生成新的副本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 由规范化URL派生的稳定标识
    pub id: String,
    /// 来源URL
    pub source_url: String,
    /// 标题
    pub title: String,
    /// 正文
    pub body: String,
    /// 粗粒度分类
    pub module: String,
    /// 产生该文档的提取策略名称
    pub strategy_name: String,
    /// 提取时间
    pub extracted_at: DateTime<Utc>,
    /// 处理该文档的工作槽，未经工作池处理时为 None
    pub worker_index: Option<usize>,
    /// 处理耗时（秒）
    pub duration_seconds: f64,
}

impl Document {
    /// 创建一个新的文档
    ///
    /// # 参数
    ///
    /// * `source_url` - 来源URL
    /// * `title` - 标题
    /// * `body` - 正文
    /// * `module` - 分类
    /// * `strategy_name` - 提取策略名称
    pub fn new(
        source_url: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        module: impl Into<String>,
        strategy_name: impl Into<String>,
    ) -> Self {
        let source_url = source_url.into();
        Self {
            id: Self::id_for(&source_url),
            source_url,
            title: title.into(),
            body: body.into(),
            module: module.into(),
            strategy_name: strategy_name.into(),
            extracted_at: Utc::now(),
            worker_index: None,
            duration_seconds: 0.0,
        }
    }

    /// 计算标识符对应的文档ID
    ///
    /// 规范化后相同的URL得到相同的ID
    pub fn id_for(url: &str) -> String {
        let digest = Sha256::digest(normalize_url(url).as_bytes());
        hex::encode(&digest[..16])
    }

    /// 返回补充了工作池来源信息的副本
    pub fn with_provenance(self, worker_index: usize, duration: Duration) -> Self {
        Self {
            worker_index: Some(worker_index),
            duration_seconds: duration.as_secs_f64(),
            ..self
        }
    }
}
