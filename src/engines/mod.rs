// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod link_crawler;
pub mod registry;
pub mod reqwest_strategy;
pub mod traits;

pub use registry::{StrategyGroup, StrategyGroups, StrategyRegistry};
pub use traits::{DiscoveryStrategy, ExtractRequest, ExtractionStrategy, StrategyError};
