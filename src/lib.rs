// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含抓取用例
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含文档、结果等值类型和仓库接口
pub mod domain;

/// 引擎模块
///
/// 提取策略、策略注册表和参考实现
pub mod engines;

/// 集群模块
///
/// 工作进程的伸缩、分发和健康检查
pub mod fleet;

/// 基础设施模块
///
/// 提供指标导出和文档仓库实现
pub mod infrastructure;

/// 队列模块
///
/// 集群模式下共享的工作队列
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 有界并发工作池和重试协调器
pub mod workers;
