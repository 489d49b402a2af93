// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;
use thiserror::Error;

use crate::queue::work_queue::QueueError;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("存储错误: {0}")]
    Storage(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 工作池错误类型
///
/// 这些错误代表调用方违反了工作池的使用约定，必须向上传播
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// 工作槽数量无效
    #[error("Pool size must be at least 1, got {0}")]
    InvalidSize(usize),

    /// 工作池尚未初始化
    #[error("Worker pool is not initialized")]
    NotInitialized,

    /// 工作池重复初始化
    #[error("Worker pool is already initialized")]
    AlreadyInitialized,

    /// 工作池已关闭或正在关闭
    #[error("Worker pool is closed")]
    Closed,
}

/// 单个工作项的失败类型
///
/// 工作池会把工作函数的所有失败都转换为此类型并记录在结果中
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// 没有策略支持该标识符
    #[error("no strategy supports identifier {0}")]
    NoStrategyFound(String),

    /// 提取失败
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// 超时
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// 工作函数发生panic
    #[error("work function panicked: {0}")]
    Panicked(String),

    /// 被取消
    #[error("cancelled")]
    Cancelled,
}

impl WorkError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkError::Extraction(_) | WorkError::Timeout(_))
    }

    /// 错误类别名称，用于指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            WorkError::NoStrategyFound(_) => "no_strategy",
            WorkError::Extraction(_) => "extraction",
            WorkError::Timeout(_) => "timeout",
            WorkError::Panicked(_) => "panicked",
            WorkError::Cancelled => "cancelled",
        }
    }
}

/// 集群管理错误类型
#[derive(Error, Debug)]
pub enum FleetError {
    /// 容器生命周期操作失败
    #[error("Failed to {action} worker {worker}: {reason}")]
    Lifecycle {
        worker: String,
        action: &'static str,
        reason: String,
    },

    /// 工作队列错误
    #[error("Work queue error: {0}")]
    Queue(#[from] QueueError),

    /// 操作被取消
    #[error("Fleet operation cancelled")]
    Cancelled,
}
