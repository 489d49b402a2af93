// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><main><h1>{}</h1><p>Content of {}.</p>{}</main></body></html>",
        title, title, title, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(title, links)))
        .mount(server)
        .await;
}

/// 启动一个小型文档站点
///
/// `/flaky` 第一次请求返回 503，之后正常；`/gone` 始终返回 404
pub async fn start_docs_site() -> MockServer {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        "Home",
        &["/guide/intro", "/guide/install", "/api/reference", "#top"],
    )
    .await;
    mount_page(&server, "/guide/intro", "Introduction", &["/", "/guide/install"]).await;
    mount_page(&server, "/guide/install", "Installation", &["/guide/intro"]).await;
    mount_page(&server, "/api/reference", "API Reference", &["/api/reference"]).await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", "Flaky", &[]).await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    server
}
