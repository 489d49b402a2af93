// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use docrawl::utils::url_utils::{normalize_url, resolve_url, UrlResolver};
use std::sync::Arc;

#[test]
fn test_resolver_crawl_step() {
    let resolver = UrlResolver::new().with_allowed_hosts(["https://docs.example.com"]);
    let base = "https://docs.example.com/guide/intro";

    let links = ["install", "../api", "#/faq", "https://other.com/", "mailto:a@b.c"];
    let accepted: Vec<String> = links
        .iter()
        .filter_map(|link| resolver.resolve(base, link))
        .filter(|url| resolver.should_visit(url) && resolver.mark_visited(url))
        .collect();

    assert_eq!(
        accepted,
        vec![
            "https://docs.example.com/guide/install",
            "https://docs.example.com/api",
            "https://docs.example.com/guide/intro#/faq",
        ]
    );
    assert_eq!(resolver.visited_count(), 3);
}

#[test]
fn test_fragment_routes_are_distinct_identifiers() {
    let a = resolve_url("https://docs.example.com/app/", "#/guide").unwrap();
    let b = resolve_url("https://docs.example.com/app/", "#/api").unwrap();
    assert_ne!(normalize_url(&a), normalize_url(&b));
}

#[tokio::test]
async fn test_concurrent_mark_visited_commits_once() {
    let resolver = Arc::new(UrlResolver::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            let url = if i % 2 == 0 {
                "https://Docs.example.com//page"
            } else {
                "https://docs.example.com/page"
            };
            resolver.should_visit(url) && resolver.mark_visited(url)
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
