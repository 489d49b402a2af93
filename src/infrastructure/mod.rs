// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节：
/// - 指标（metrics）：Prometheus 指标导出
/// - 仓库实现（repositories）：文档仓库接口的内存与本地文件实现
///
/// 基础设施层依赖于领域层的抽象接口
pub mod metrics;
pub mod repositories;
