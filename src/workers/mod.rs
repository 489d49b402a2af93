// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 进程内的有界并发执行：
/// - 工作池（pool）：固定数量的工作槽、先进先出队列和准入信号量
/// - 重试协调器（retry）：只重新提交失败项的指数退避重试
pub mod pool;
pub mod retry;

pub use pool::{PoolConfig, PoolState, ProgressEvent, WorkerPool};
pub use retry::RetryCoordinator;
