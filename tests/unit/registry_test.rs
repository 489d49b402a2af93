// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use docrawl::engines::reqwest_strategy::{ReqwestStrategy, ReqwestStrategyConfig};
use docrawl::engines::{ExtractionStrategy, StrategyRegistry};
use std::sync::Arc;

fn scoped(name: &str, hosts: &[&str]) -> Arc<ReqwestStrategy> {
    Arc::new(ReqwestStrategy::new(ReqwestStrategyConfig {
        name: name.to_string(),
        allowed_hosts: hosts.iter().map(|h| h.to_string()).collect(),
        ..Default::default()
    }))
}

#[test]
fn test_registration_order_decides_overlaps() {
    let registry = StrategyRegistry::new()
        .with_strategy(scoped("help-center", &["help.example.com"]))
        .with_strategy(scoped("generic", &[]));

    let help = registry
        .find_strategy("https://help.example.com/articles/1")
        .unwrap();
    assert_eq!(help.name(), "help-center");

    let docs = registry.find_strategy("https://docs.example.com/").unwrap();
    assert_eq!(docs.name(), "generic");

    assert!(registry.find_strategy("mailto:x@y.com").is_none());
}

#[test]
fn test_group_by_strategy_is_exhaustive() {
    let registry = StrategyRegistry::new()
        .with_strategy(scoped("help-center", &["help.example.com"]))
        .with_strategy(scoped("docs", &["docs.example.com"]));
    let identifiers: Vec<String> = [
        "https://docs.example.com/a",
        "https://help.example.com/b",
        "https://docs.example.com/c",
        "ftp://files.example.com/d",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let groups = registry.group_by_strategy(&identifiers);

    let grouped: usize = groups.groups.iter().map(|g| g.identifiers.len()).sum();
    assert_eq!(grouped + groups.unsupported.len(), identifiers.len());
    assert_eq!(groups.unsupported, vec!["ftp://files.example.com/d"]);
    assert_eq!(groups.groups[0].strategy.name(), "help-center");
    assert_eq!(groups.groups[1].identifiers.len(), 2);
}
