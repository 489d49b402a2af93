// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use crate::utils::errors::WorkError;

/// 单个工作项单次执行的结果
///
/// 成功时携带负载，失败时携带错误分类。结果是临时值，
/// 由编排器或重试协调器消费后丢弃
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResult<T> {
    /// 提交的标识符
    pub identifier: String,
    /// 执行结果
    pub result: Result<T, WorkError>,
    /// 执行该项的工作槽
    pub worker_index: usize,
    /// 执行耗时
    pub duration: Duration,
    /// 第几次尝试（从1开始）
    pub attempt: u32,
}

impl<T> WorkerResult<T> {
    /// 创建成功结果
    pub fn success(
        identifier: impl Into<String>,
        payload: T,
        worker_index: usize,
        duration: Duration,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            result: Ok(payload),
            worker_index,
            duration,
            attempt: 1,
        }
    }

    /// 创建失败结果
    pub fn failure(
        identifier: impl Into<String>,
        error: WorkError,
        worker_index: usize,
        duration: Duration,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            result: Err(error),
            worker_index,
            duration,
            attempt: 1,
        }
    }

    /// 设置尝试次数
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn payload(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&WorkError> {
        self.result.as_ref().err()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
