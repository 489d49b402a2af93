// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 安装 Prometheus 导出器并注册指标说明。未安装导出器时，
/// 库代码中的指标调用不产生任何效果
pub fn init_metrics(addr: SocketAddr) {
    // 重复安装或端口占用只记录警告
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder on {}: {}", addr, e);
        return;
    }

    describe_counter!("pool_items_total", "Total number of work items processed by worker pools");
    describe_histogram!(
        "pool_item_duration_seconds",
        "Duration of individual work items in seconds"
    );
    describe_counter!("retry_attempts_total", "Total number of retry rounds started");
    describe_counter!("scrape_batches_total", "Total number of orchestration runs");
    describe_gauge!("fleet_workers", "Number of worker processes tracked by the fleet manager");
    describe_counter!(
        "fleet_lifecycle_errors_total",
        "Total number of failed worker create/stop/remove operations"
    );

    info!("Metrics exporter listening on {}", addr);
}
