// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心值对象，包括：
/// - 文档（document）：一个成功抓取的页面
/// - 执行结果（outcome）：单个标识符单次执行的结果
/// - 聚合结果（scraping_result）：一次编排运行的不可变记录
/// - 集群工作进程（fleet_worker）：被集群管理器跟踪的工作进程
pub mod document;
pub mod fleet_worker;
pub mod outcome;
pub mod scraping_result;

pub use document::Document;
pub use fleet_worker::{FleetWorker, WorkerStats, WorkerStatus};
pub use outcome::WorkerResult;
pub use scraping_result::{ScrapingResult, ScrapingResultBuilder};
