use crate::common::{article_html, markdown_files, mount_html, sitemap, source, test_config};
use sumi_harvest::config::Config;
use sumi_harvest::crawler::{fetcher_from_config, Coordinator, RunOutcome};
use sumi_harvest::frontier::{FrontierBuilder, FrontierEntry};
use sumi_harvest::progress::{load_url_list, write_url_list, Outcome, ProgressRecord};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn discover(config: &Config) -> Vec<FrontierEntry> {
    let fetcher = fetcher_from_config(config).expect("Failed to build fetcher");
    FrontierBuilder::new(config, fetcher)
        .expect("Failed to create builder")
        .build(&config.sources)
        .await
        .expect("Discovery failed")
}

fn coordinator(config: &Config) -> Coordinator {
    let fetcher = fetcher_from_config(config).expect("Failed to build fetcher");
    Coordinator::from_config(config, fetcher).expect("Failed to create coordinator")
}

fn progress_records(config: &Config) -> Vec<ProgressRecord> {
    std::fs::read_to_string(config.output.progress_path())
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("Progress line should parse"))
        .collect()
}

#[tokio::test]
async fn test_full_harvest_archives_articles_newest_first() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    let urls: Vec<String> = ["/archives/3", "/archives/1", "/archives/9", "/about"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();
    mount_html(&server, "/sitemap.xml", sitemap(&urls)).await;
    for id in [1, 3, 9] {
        mount_html(
            &server,
            &format!("/archives/{}", id),
            article_html(&format!("Article {}", id)),
        )
        .await;
    }

    let config = test_config(
        &base,
        dir.path(),
        2,
        &source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
    );

    let frontier = discover(&config).await;
    let ids: Vec<_> = frontier.iter().map(|e| e.article_id).collect();
    assert_eq!(ids, vec![Some(9), Some(3), Some(1)]);

    let list_path = config.output.url_list_path();
    write_url_list(&list_path, frontier.iter().map(|e| &e.url)).unwrap();
    let listed = load_url_list(&list_path).unwrap();
    assert_eq!(listed[0].as_str(), format!("{}/archives/9", base));

    let report = coordinator(&config).run(&frontier).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.batches, 2);

    let files = markdown_files(&config.output.archive_dir);
    assert_eq!(files.len(), 3);
    let content = std::fs::read_to_string(&files[0]).unwrap();
    assert!(content.starts_with("---\nsource_url: "));
    assert!(content.contains("category: \"Research\""));
    assert!(content.contains("publish_date: 2024-05-01"));
    assert!(content.contains("real text"));

    let records = progress_records(&config);
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.outcome == Outcome::Success));

    let capture = std::fs::read_to_string(config.output.capture_log_path()).unwrap();
    assert!(capture.starts_with("url,outcome,timestamp,retries,method,error\n"));
    assert_eq!(capture.lines().count(), 4);
}

#[tokio::test]
async fn test_second_run_skips_completed_urls() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/sitemap.xml",
        sitemap(&[format!("{}/archives/42", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/archives/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html("Once")))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
    );
    let frontier = discover(&config).await;

    let first = coordinator(&config).run(&frontier).await.unwrap();
    assert_eq!(first.succeeded, 1);

    let second = coordinator(&config).run(&frontier).await.unwrap();
    assert_eq!(second.already_done, 1);
    assert_eq!(second.attempted, 0);
    assert_eq!(second.succeeded, 0);

    assert_eq!(progress_records(&config).len(), 1);
}

#[tokio::test]
async fn test_failing_url_is_retried_then_recorded_once() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/sitemap.xml",
        sitemap(&[
            format!("{}/archives/5", base),
            format!("{}/archives/4", base),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/archives/5"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_html(&server, "/archives/4", article_html("Survivor")).await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
    );
    let frontier = discover(&config).await;
    let report = coordinator(&config).run(&frontier).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 1);

    let failures: Vec<_> = progress_records(&config)
        .into_iter()
        .filter(|r| r.url.as_str().ends_with("/archives/5"))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].outcome, Outcome::Failure);
    assert_eq!(failures[0].retries, 2);
    assert_eq!(failures[0].error.as_deref(), Some("HTTP 503"));
}

#[tokio::test]
async fn test_missing_article_is_skipped_without_retry() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &server,
        "/sitemap.xml",
        sitemap(&[format!("{}/archives/8", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/archives/8"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(
        &base,
        dir.path(),
        10,
        &source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
    );
    let frontier = discover(&config).await;
    let report = coordinator(&config).run(&frontier).await.unwrap();

    assert_eq!(report.skipped, 1);
    let records = progress_records(&config);
    assert_eq!(records[0].outcome, Outcome::Skipped);
    assert_eq!(records[0].error.as_deref(), Some("HTTP 404"));
}

#[tokio::test]
async fn test_expired_session_stops_run_before_next_batch() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    // Logged in for the first check only
    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a class="logout">Log out</a></body></html>"#),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a class="login">Log in</a></body></html>"#),
        )
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/sitemap.xml",
        sitemap(&[
            format!("{}/archives/3", base),
            format!("{}/archives/2", base),
            format!("{}/archives/1", base),
        ]),
    )
    .await;
    mount_html(&server, "/archives/3", article_html("First")).await;
    for id in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!("/archives/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_html("Locked")))
            .expect(0)
            .mount(&server)
            .await;
    }

    let extra = format!(
        "[session]\nprobe-url = \"{}/account\"\nmarker-selector = \".logout, .user-menu\"\n\n{}",
        base,
        source("listing", "sitemap", &format!("{}/sitemap.xml", base))
    );
    let config = test_config(&base, dir.path(), 1, &extra);
    let frontier = discover(&config).await;

    let coordinator = coordinator(&config);
    let report = coordinator.run(&frontier).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::SessionExpired { batch: 2 });
    assert_eq!(report.attempted, 1);
    assert!(coordinator.cancel_token().is_cancelled());

    let records = progress_records(&config);
    assert_eq!(records.len(), 1);
    assert!(records[0].url.as_str().ends_with("/archives/3"));
}

#[tokio::test]
async fn test_parallel_workers_record_every_url() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    let urls: Vec<String> = (1..=6).map(|id| format!("{}/archives/{}", base, id)).collect();
    mount_html(&server, "/sitemap.xml", sitemap(&urls)).await;
    for id in 1..=6 {
        mount_html(
            &server,
            &format!("/archives/{}", id),
            article_html(&format!("Parallel {}", id)),
        )
        .await;
    }

    let mut config = test_config(
        &base,
        dir.path(),
        3,
        &source("listing", "sitemap", &format!("{}/sitemap.xml", base)),
    );
    config.harvest.workers = 3;

    let frontier = discover(&config).await;
    let coordinator = coordinator(&config);
    let report = coordinator.run(&frontier).await.unwrap();

    assert_eq!(report.succeeded, 6);
    assert_eq!(progress_records(&config).len(), 6);

    let store = coordinator.store();
    let store = store.lock().await;
    assert_eq!(store.outcome_counts().success, 6);
    assert_eq!(store.pending(), 0);
}
