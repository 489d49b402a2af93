// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心值对象和仓库接口：
/// - 领域模型（models）：文档、执行结果、聚合结果和集群工作进程
/// - 仓库接口（repositories）：文档持久化抽象接口
///
/// 领域层不依赖于任何外部实现
pub mod models;
pub mod repositories;
