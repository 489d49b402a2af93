// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 集群模式下的共享工作队列：特质定义、内存实现和 Redis 实现
pub mod redis_queue;
pub mod work_queue;

pub use redis_queue::RedisWorkQueue;
pub use work_queue::{InMemoryWorkQueue, QueueError, WorkQueue};
