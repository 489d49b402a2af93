// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use docrawl::application::use_cases::ScrapeUseCase;
use docrawl::domain::models::Document;
use docrawl::domain::repositories::document_repository::DocumentRepository;
use docrawl::engines::link_crawler::{LinkCrawlConfig, LinkCrawlStrategy};
use docrawl::engines::reqwest_strategy::{ReqwestStrategy, ReqwestStrategyConfig};
use docrawl::engines::StrategyRegistry;
use docrawl::infrastructure::repositories::{FileDocumentRepository, InMemoryDocumentRepository};
use docrawl::utils::retry_policy::RetryPolicy;
use docrawl::workers::pool::PoolConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::helpers::docs_site::start_docs_site;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_backoff: Duration::from_millis(10),
        ..RetryPolicy::new(3, Duration::from_millis(50))
    }
}

fn registry() -> Arc<StrategyRegistry> {
    Arc::new(
        StrategyRegistry::new().with_strategy(Arc::new(ReqwestStrategy::new(
            ReqwestStrategyConfig::default(),
        ))),
    )
}

#[tokio::test]
async fn test_execute_end_to_end() {
    let site = start_docs_site().await;
    let base = site.uri();
    let repository = Arc::new(InMemoryDocumentRepository::new());
    let use_case = ScrapeUseCase::new(registry())
        .with_repository(repository.clone())
        .with_pool_config(PoolConfig::with_item_timeout(Duration::from_secs(10)))
        .with_retry_policy(fast_retry());

    let identifiers = vec![
        format!("{}/guide/intro", base),
        format!("{}/guide/install", base),
        format!("{}/flaky", base),
        format!("{}/gone", base),
        "mailto:x@y.com".to_string(),
        format!("{}//guide//intro", base),
    ];

    let result = use_case.execute(&identifiers, 2, true).await.unwrap();

    assert_eq!(result.total(), 5);
    assert_eq!(result.succeeded(), 3);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.skipped(), 1);
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].contains("/gone"));
    assert!(result.warnings().iter().any(|w| w.contains("mailto:x@y.com")));
    assert!(result.warnings().iter().any(|w| w.contains("duplicate")));
    assert!(result.finished_at() >= result.started_at());

    let titles: HashSet<_> = result.units().iter().map(|d| d.title.as_str()).collect();
    assert_eq!(
        titles,
        HashSet::from(["Introduction", "Installation", "Flaky"])
    );
    for document in result.units() {
        assert_eq!(document.strategy_name, "reqwest");
        assert!(document.worker_index.is_some_and(|i| i < 2));
    }

    assert_eq!(repository.count().await.unwrap(), 3);
    let intro_id = Document::id_for(&format!("{}/guide/intro", base));
    let stored = repository.load(&intro_id).await.unwrap().unwrap();
    assert_eq!(stored.module, "guide");
}

#[tokio::test]
async fn test_documents_persist_to_disk() {
    let site = start_docs_site().await;
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(FileDocumentRepository::new(dir.path()));
    let use_case = ScrapeUseCase::new(registry()).with_repository(repository.clone());

    let url = format!("{}/api/reference", site.uri());
    let result = use_case.execute(&[url.clone()], 1, true).await.unwrap();

    assert!(result.is_success());
    assert_eq!(repository.count().await.unwrap(), 1);
    let stored = repository
        .load(&Document::id_for(&url))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "API Reference");
    assert_eq!(stored.module, "api");
}

#[tokio::test]
async fn test_discovery_is_relayed_unchanged() {
    let site = start_docs_site().await;
    let fetcher = Arc::new(ReqwestStrategy::new(ReqwestStrategyConfig::default()));
    let use_case = ScrapeUseCase::new(registry()).with_discovery(Arc::new(LinkCrawlStrategy::new(
        fetcher,
        LinkCrawlConfig {
            max_concurrent: 3,
            ..Default::default()
        },
    )));

    let result = use_case
        .execute_discovery(&format!("{}/", site.uri()))
        .await;

    assert_eq!(result.succeeded(), 4);
    assert_eq!(result.failed(), 0);
    let urls: HashSet<_> = result.units().iter().map(|d| d.source_url.clone()).collect();
    assert_eq!(urls.len(), 4);
    assert!(urls.iter().all(|u| !u.contains('#')));
}
