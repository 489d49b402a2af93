// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use docrawl::engines::link_crawler::{LinkCrawlConfig, LinkCrawlStrategy};
use docrawl::engines::reqwest_strategy::{ReqwestStrategy, ReqwestStrategyConfig};
use docrawl::engines::DiscoveryStrategy;
use std::sync::Arc;

use super::helpers::docs_site::start_docs_site;

fn crawler(config: LinkCrawlConfig) -> LinkCrawlStrategy {
    LinkCrawlStrategy::new(
        Arc::new(ReqwestStrategy::new(ReqwestStrategyConfig::default())),
        config,
    )
}

#[tokio::test]
async fn test_page_limit_stops_discovery() {
    let site = start_docs_site().await;

    let result = crawler(LinkCrawlConfig {
        max_pages: 2,
        ..Default::default()
    })
    .discover(&format!("{}/", site.uri()))
    .await;

    assert_eq!(result.succeeded(), 2);
    assert!(result
        .warnings()
        .iter()
        .any(|w| w.contains("discovery limit reached")));
}

#[tokio::test]
async fn test_deny_patterns_exclude_sections() {
    let site = start_docs_site().await;

    let result = crawler(LinkCrawlConfig {
        deny_patterns: vec!["/api/".to_string()],
        ..Default::default()
    })
    .discover(&format!("{}/", site.uri()))
    .await;

    assert_eq!(result.succeeded(), 3);
    assert!(result
        .units()
        .iter()
        .all(|d| !d.source_url.contains("/api/")));
}

#[tokio::test]
async fn test_invalid_deny_pattern_is_reported() {
    let site = start_docs_site().await;

    let result = crawler(LinkCrawlConfig {
        deny_patterns: vec!["(unclosed".to_string()],
        max_depth: 0,
        ..Default::default()
    })
    .discover(&format!("{}/", site.uri()))
    .await;

    assert_eq!(result.succeeded(), 1);
    assert!(result
        .warnings()
        .iter()
        .any(|w| w.contains("invalid deny pattern")));
}
