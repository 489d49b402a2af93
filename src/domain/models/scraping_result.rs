// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;

use super::document::Document;

/// 一次编排运行的聚合结果
///
/// 只能通过 [`ScrapingResultBuilder::finish`] 创建，创建后不可修改。
/// 始终满足 `succeeded + failed + skipped == total`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapingResult {
    units: Vec<Document>,
    total: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    source_identifiers: Vec<String>,
    cancelled: Vec<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ScrapingResult {
    /// 成功产出的文档，按合并顺序排列
    pub fn units(&self) -> &[Document] {
        &self.units
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// 本次运行处理的标识符，已规范化并去重
    pub fn source_identifiers(&self) -> &[String] {
        &self.source_identifiers
    }

    /// 因取消而没有处理的标识符，已计入 `skipped`，可以重新入队
    pub fn cancelled(&self) -> &[String] {
        &self.cancelled
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 运行耗时（秒）
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// 成功率 (0.0 - 1.0)，空批次视为 1.0
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    /// 没有失败也没有错误
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }

    /// 拆出文档，结果本身随之消费
    pub fn into_units(self) -> Vec<Document> {
        self.units
    }
}

/// 聚合结果构建器
///
/// 编排过程中累积文档、失败和跳过记录，最后冻结为 [`ScrapingResult`]
#[derive(Debug)]
pub struct ScrapingResultBuilder {
    units: Vec<Document>,
    failed: usize,
    skipped: usize,
    started_at: DateTime<Utc>,
    source_identifiers: Vec<String>,
    cancelled: Vec<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ScrapingResultBuilder {
    /// 开始构建，记录开始时间
    pub fn new(source_identifiers: Vec<String>) -> Self {
        Self {
            units: Vec::new(),
            failed: 0,
            skipped: 0,
            started_at: Utc::now(),
            source_identifiers,
            cancelled: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 记录一个成功的文档
    pub fn add_unit(&mut self, unit: Document) {
        self.units.push(unit);
    }

    /// 记录一个处理失败的标识符
    pub fn add_failure(&mut self, identifier: &str, cause: impl Display) {
        self.failed += 1;
        self.errors.push(format!("{}: {}", identifier, cause));
    }

    /// 记录一个被跳过的标识符
    pub fn add_skipped(&mut self, warning: impl Into<String>) {
        self.skipped += 1;
        self.warnings.push(warning.into());
    }

    /// 记录一个因取消而没有处理的标识符，按跳过计数
    pub fn add_cancelled(&mut self, identifier: &str) {
        self.add_skipped(format!("cancelled before processing: {}", identifier));
        self.cancelled.push(identifier.to_string());
    }

    /// 记录与单个标识符计数无关的错误，例如持久化失败
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn units(&self) -> &[Document] {
        &self.units
    }

    /// 冻结结果并记录结束时间
    pub fn finish(self) -> ScrapingResult {
        let succeeded = self.units.len();
        ScrapingResult {
            total: succeeded + self.failed + self.skipped,
            succeeded,
            failed: self.failed,
            skipped: self.skipped,
            units: self.units,
            started_at: self.started_at,
            finished_at: Utc::now(),
            source_identifiers: self.source_identifiers,
            cancelled: self.cancelled,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
