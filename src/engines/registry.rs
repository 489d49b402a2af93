// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::engines::traits::ExtractionStrategy;

/// 同一策略下的一组标识符
#[derive(Clone)]
pub struct StrategyGroup {
    /// 策略
    pub strategy: Arc<dyn ExtractionStrategy>,
    /// 该策略负责的标识符，保持输入顺序
    pub identifiers: Vec<String>,
}

impl fmt::Debug for StrategyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyGroup")
            .field("strategy", &self.strategy.name())
            .field("identifiers", &self.identifiers)
            .finish()
    }
}

/// 按策略划分后的标识符
#[derive(Debug, Clone, Default)]
pub struct StrategyGroups {
    /// 按注册顺序排列的分组，不含空分组
    pub groups: Vec<StrategyGroup>,
    /// 没有任何策略支持的标识符
    pub unsupported: Vec<String>,
}

impl StrategyGroups {
    /// 所有标识符数量
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.identifiers.len()).sum::<usize>() + self.unsupported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 提取策略注册表
///
/// 按注册顺序匹配，第一个 `supports` 返回 true 的策略胜出
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个策略，顺序即优先级
    pub fn register(&mut self, strategy: Arc<dyn ExtractionStrategy>) -> &mut Self {
        debug!("Registering extraction strategy {}", strategy.name());
        self.strategies.push(strategy);
        self
    }

    /// 构建器风格的注册
    pub fn with_strategy(mut self, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// 已注册的策略名称，按注册顺序
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// 查找第一个支持该标识符的策略
    pub fn find_strategy(&self, url: &str) -> Option<Arc<dyn ExtractionStrategy>> {
        self.position_of(url).map(|i| self.strategies[i].clone())
    }

    fn position_of(&self, url: &str) -> Option<usize> {
        self.strategies.iter().position(|s| s.supports(url))
    }

    /// 按策略划分标识符
    ///
    /// 不被任何策略支持的标识符进入 `unsupported`，不会被丢弃
    pub fn group_by_strategy(&self, identifiers: &[String]) -> StrategyGroups {
        let mut buckets: Vec<Vec<String>> = vec![Vec::new(); self.strategies.len()];
        let mut unsupported = Vec::new();

        for identifier in identifiers {
            match self.position_of(identifier) {
                Some(i) => buckets[i].push(identifier.clone()),
                None => unsupported.push(identifier.clone()),
            }
        }

        let groups = self
            .strategies
            .iter()
            .zip(buckets)
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(strategy, identifiers)| StrategyGroup {
                strategy: strategy.clone(),
                identifiers,
            })
            .collect();

        StrategyGroups {
            groups,
            unsupported,
        }
    }
}
