use crate::common::{mount_html, sitemap, source, test_config};
use sumi_harvest::config::Config;
use sumi_harvest::crawler::fetcher_from_config;
use sumi_harvest::frontier::{FrontierBuilder, FrontierEntry};
use sumi_harvest::{HarvestError, Result};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn discover(config: &Config) -> Result<Vec<FrontierEntry>> {
    let fetcher = fetcher_from_config(config).expect("Failed to build fetcher");
    FrontierBuilder::new(config, fetcher)?
        .build(&config.sources)
        .await
}

fn paths(entries: &[FrontierEntry], base: &str) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.url.as_str().trim_start_matches(base).to_string())
        .collect()
}

fn category_page(links: &[&str], next: &str) -> String {
    let mut body = String::from("<html><body><main>\n");
    for link in links {
        body.push_str(&format!("<a href=\"{}\">Read</a>\n", link));
    }
    body.push_str("</main>\n");
    body.push_str(next);
    body.push_str("\n</body></html>");
    body
}

#[tokio::test]
async fn test_category_walk_stops_at_disabled_next() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/category/ai",
        category_page(
            &["/archives/10", "/archives/11?ref=cat", "/about"],
            r#"<a class="next" href="/category/ai/page/2">Next</a>"#,
        ),
    )
    .await;
    mount_html(
        &server,
        "/category/ai/page/2",
        category_page(
            &["/archives/12/", "/archives/10#comments"],
            r#"<ul class="pagination"><li class="next disabled"><a href="/category/ai/page/3">Next</a></li></ul>"#,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/ai/page/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("category", "ai", &format!("{}/category/ai", base)),
    );
    let frontier = discover(&config).await.unwrap();

    assert_eq!(
        paths(&frontier, &base),
        vec!["/archives/12", "/archives/11", "/archives/10"]
    );
    assert!(frontier.iter().all(|e| e.source == "ai"));
}

#[tokio::test]
async fn test_transient_page_failure_is_retried() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/category/news",
        category_page(
            &["/archives/1"],
            r#"<a rel="next" href="/category/news/page/2">Older</a>"#,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/news/page/2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/category/news/page/2",
        category_page(&["/archives/2"], ""),
    )
    .await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("category", "news", &format!("{}/category/news", base)),
    );
    let frontier = discover(&config).await.unwrap();

    assert_eq!(paths(&frontier, &base), vec!["/archives/2", "/archives/1"]);
}

#[tokio::test]
async fn test_later_page_failure_keeps_earlier_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/category/long",
        category_page(
            &["/archives/30", "/archives/31"],
            r#"<a class="next" href="/category/long/page/2">Next</a>"#,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/long/page/2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("category", "long", &format!("{}/category/long", base)),
    );
    let frontier = discover(&config).await.unwrap();

    assert_eq!(paths(&frontier, &base), vec!["/archives/31", "/archives/30"]);
}

#[tokio::test]
async fn test_every_source_failing_finds_no_urls() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let extra = format!(
        "{}\n{}",
        source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
        source("category", "ai", &format!("{}/category/ai", base))
    );
    let config = test_config(&base, dir.path(), 10, &extra);

    let result = discover(&config).await;
    assert!(matches!(result, Err(HarvestError::NoUrlsFound)));
}

#[tokio::test]
async fn test_one_failing_source_is_not_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/sitemap.xml",
        sitemap(&[format!("{}/archives/7", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/broken"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let extra = format!(
        "{}\n{}",
        source("category", "broken", &format!("{}/category/broken", base)),
        source("listing", "sitemap", &format!("{}/sitemap.xml", base))
    );
    let config = test_config(&base, dir.path(), 10, &extra);
    let frontier = discover(&config).await.unwrap();

    assert_eq!(paths(&frontier, &base), vec!["/archives/7"]);
    assert_eq!(frontier[0].source, "sitemap");
}

#[tokio::test]
async fn test_nested_listing_is_followed() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/sitemap.xml",
        format!(
            "<sitemapindex>\n<sitemap><loc><![CDATA[{}/posts.xml]]></loc></sitemap>\n\
             <sitemap><loc>{}/archives/2</loc></sitemap>\n</sitemapindex>",
            base, base
        ),
    )
    .await;
    mount_html(
        &server,
        "/posts.xml",
        sitemap(&[
            format!("{}/archives/5", base),
            format!("{}/articles/hello-world", base),
        ]),
    )
    .await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
    );
    let frontier = discover(&config).await.unwrap();

    assert_eq!(
        paths(&frontier, &base),
        vec!["/archives/5", "/archives/2", "/articles/hello-world"]
    );
}

#[tokio::test]
async fn test_variants_across_sources_are_deduplicated() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/sitemap.xml",
        sitemap(&[
            format!("{}/archives/4?utm_source=feed", base),
            format!("{}/archives/3", base),
        ]),
    )
    .await;
    mount_html(
        &server,
        "/category/misc",
        category_page(&["/archives/4/", "/archives/3#top"], ""),
    )
    .await;

    let extra = format!(
        "{}\n{}",
        source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
        source("category", "misc", &format!("{}/category/misc", base))
    );
    let config = test_config(&base, dir.path(), 10, &extra);
    let frontier = discover(&config).await.unwrap();

    assert_eq!(paths(&frontier, &base), vec!["/archives/4", "/archives/3"]);
    assert!(frontier.iter().all(|e| e.source == "sitemap"));
}
