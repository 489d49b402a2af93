// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 工作进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    /// 运行中
    Running,
    /// 已停止
    Stopped,
    /// 进程已消失
    NotFound,
}

/// 工作进程累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// 已处理数量
    pub processed: u64,
    /// 成功数量
    pub succeeded: u64,
    /// 失败数量
    pub failed: u64,
}

impl WorkerStats {
    pub fn new(succeeded: u64, failed: u64) -> Self {
        Self {
            processed: succeeded + failed,
            succeeded,
            failed,
        }
    }
}

/// 集群中的一个工作进程
///
/// 扩容时创建，缩容或清理时销毁；状态只通过轮询刷新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetWorker {
    /// 容器运行时返回的句柄
    pub process_id: String,
    /// 名称
    pub name: String,
    /// 序号，在同一个管理器内不复用
    pub index: usize,
    /// 最近一次观察到的状态
    pub status: WorkerStatus,
    /// 累计统计
    pub stats: WorkerStats,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl FleetWorker {
    /// `status` 取自创建后对运行时的查询
    pub fn new(
        process_id: impl Into<String>,
        name: impl Into<String>,
        index: usize,
        status: WorkerStatus,
    ) -> Self {
        Self {
            process_id: process_id.into(),
            name: name.into(),
            index,
            status,
            stats: WorkerStats::default(),
            created_at: Utc::now(),
        }
    }
}
