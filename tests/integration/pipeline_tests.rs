//! Complete pipeline runs against a mock site

use crate::common::{
    article_html, batch_fetcher, malformed_article_html, mount_html, mount_listing, mount_status,
    test_site, unreachable_url,
};
use std::sync::Arc;
use std::time::Duration;
use tag_harvest::{
    ExtractError, FetchError, HarvestError, ItemError, Pipeline, Record, Stage, WorkerError,
    WorkerPool,
};
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

/// Two listing pages with three articles each; article 1 of page 2 has no
/// timestamp. Later articles answer faster to shuffle completion order.
async fn mount_news_site(mock_server: &MockServer) -> Vec<String> {
    let base_url = mock_server.uri();
    let mut links = Vec::new();

    for page in 1..=2u32 {
        let page_links: Vec<String> = (0..3)
            .map(|j| format!("{}/news/{}-{}", base_url, page, j))
            .collect();
        mount_listing(mock_server, page, &page_links).await;
        links.extend(page_links);
    }

    for (index, link) in links.iter().enumerate() {
        let url_path = link.trim_start_matches(&base_url).to_string();
        let title = format!("Story {}", index);
        let body = if url_path == "/news/2-1" {
            malformed_article_html(&title)
        } else {
            article_html(&title, &format!("2020-03-{:02}T10:00:00", index + 1))
        };
        let delay = Duration::from_millis((6 - index as u64) * 10);
        mount_html(mock_server, &url_path, body, delay).await;
    }

    links
}

fn pipeline_for(mock_server: &MockServer, fetch_limit: usize, workers: usize) -> Pipeline {
    let site = test_site(&mock_server.uri(), 2);
    let pool = Arc::new(WorkerPool::started(workers).expect("Failed to start pool"));
    Pipeline::new(Arc::new(site), batch_fetcher(fetch_limit), pool)
}

#[tokio::test]
async fn test_end_to_end_with_one_malformed_item() {
    let mock_server = MockServer::start().await;
    let links = mount_news_site(&mock_server).await;
    let pipeline = pipeline_for(&mock_server, 10, 4);

    let output = pipeline
        .run(&CancellationToken::new())
        .await
        .expect("Run failed");

    assert_eq!(output.len(), 6);
    assert_eq!(output.stats.seeds, 2);
    assert_eq!(output.stats.links, 6);
    assert_eq!(output.stats.extract_failures, 1);
    assert_eq!(output.stats.records(), 5);

    // Outcomes follow discovery order: page 1 links, then page 2 links
    let urls: Vec<&str> = output.outcomes.iter().map(|o| o.url.as_str()).collect();
    assert_eq!(urls, links.iter().map(String::as_str).collect::<Vec<_>>());

    let records = output.records();
    assert_eq!(records.len(), 6);
    for (index, record) in records.iter().enumerate() {
        if index == 4 {
            assert_eq!(record, &Record::empty());
        } else {
            assert_eq!(record.title, format!("Story {}", index));
            assert_eq!(record.source, mock_server.uri());
            assert_eq!(record.timestamp, format!("2020-03-{:02}T10:00:00", index + 1));
            assert_eq!(record.body, format!("Body of Story {}.", index));
        }
    }

    assert_eq!(
        output.outcomes[4].result,
        Err(ItemError::Extract(ExtractError::MissingTimestamp {
            url: links[4].clone()
        }))
    );
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let mock_server = MockServer::start().await;
    mount_news_site(&mock_server).await;
    let pipeline = pipeline_for(&mock_server, 3, 2);

    let first = pipeline.run(&CancellationToken::new()).await.unwrap();
    let second = pipeline.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_listing_contributes_no_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let page_links: Vec<String> = (0..3).map(|j| format!("{}/news/1-{}", base_url, j)).collect();
    mount_listing(&mock_server, 1, &page_links).await;
    // Page 2 is not mounted, wiremock answers 404
    for (j, link) in page_links.iter().enumerate() {
        let url_path = link.trim_start_matches(&base_url).to_string();
        mount_html(
            &mock_server,
            &url_path,
            article_html(&format!("Story {}", j), "2020-01-01"),
            Duration::ZERO,
        )
        .await;
    }

    let output = pipeline_for(&mock_server, 5, 2)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.stats.seed_failures, 1);
    assert_eq!(output.len(), 3);
    assert!(output.outcomes.iter().all(|o| o.is_success()));
}

#[tokio::test]
async fn test_failed_item_fetch_keeps_its_slot() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links: Vec<String> = (0..3).map(|j| format!("{}/news/1-{}", base_url, j)).collect();
    mount_listing(&mock_server, 1, &links).await;
    mount_listing(&mock_server, 2, &[]).await;
    mount_html(
        &mock_server,
        "/news/1-0",
        article_html("First", "2020-01-01"),
        Duration::ZERO,
    )
    .await;
    mount_status(&mock_server, "/news/1-1", 503).await;
    mount_html(
        &mock_server,
        "/news/1-2",
        article_html("Third", "2020-01-03"),
        Duration::ZERO,
    )
    .await;

    let output = pipeline_for(&mock_server, 5, 2)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.len(), 3);
    assert_eq!(output.stats.fetch_failures, 1);
    assert_eq!(
        output.outcomes[1].result,
        Err(ItemError::Fetch(FetchError::Status {
            url: links[1].clone(),
            status: 503
        }))
    );

    let titles: Vec<String> = output.records().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["First", "", "Third"]);
}

#[tokio::test]
async fn test_unreachable_listings_fail_the_run() {
    let base_url = unreachable_url("");
    let pool = Arc::new(WorkerPool::started(2).unwrap());
    let pipeline = Pipeline::new(Arc::new(test_site(&base_url, 2)), batch_fetcher(5), pool);

    let result = pipeline.run(&CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(HarvestError::AllFetchesFailed {
            stage: Stage::Listing,
            attempted: 2
        })
    ));
}

#[tokio::test]
async fn test_unreachable_items_fail_the_run() {
    let mock_server = MockServer::start().await;
    let dead_base = unreachable_url("");

    let links: Vec<String> = (0..4).map(|j| format!("{}/news/{}", dead_base, j)).collect();
    mount_listing(&mock_server, 1, &links).await;
    mount_listing(&mock_server, 2, &[]).await;

    let result = pipeline_for(&mock_server, 5, 2)
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::AllFetchesFailed {
            stage: Stage::Item,
            attempted: 4
        })
    ));
}

#[tokio::test]
async fn test_error_statuses_keep_the_run_alive() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Both listings load, but the only linked article is a 404
    mount_listing(&mock_server, 1, &[format!("{}/news/gone", base_url)]).await;
    mount_listing(&mock_server, 2, &[]).await;

    let output = pipeline_for(&mock_server, 5, 2)
        .run(&CancellationToken::new())
        .await
        .expect("an error status is not lost connectivity");

    assert_eq!(output.len(), 1);
    assert_eq!(output.stats.fetch_failures, 1);
    assert_eq!(output.records(), vec![Record::empty()]);
}

#[tokio::test]
async fn test_missing_listings_yield_empty_output() {
    let mock_server = MockServer::start().await;
    // Nothing mounted: every listing page is a 404

    let output = pipeline_for(&mock_server, 5, 2)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert!(output.is_empty());
    assert_eq!(output.stats.seed_failures, 2);
}

#[tokio::test]
async fn test_listings_without_links_yield_empty_output() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 1, &[]).await;
    mount_listing(&mock_server, 2, &[]).await;

    let output = pipeline_for(&mock_server, 5, 2)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert!(output.is_empty());
    assert_eq!(output.stats.seeds, 2);
    assert_eq!(output.stats.links, 0);
}

#[tokio::test]
async fn test_stopped_pool_fails_the_run() {
    let mock_server = MockServer::start().await;
    mount_news_site(&mock_server).await;

    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let pipeline = Pipeline::new(
        Arc::new(test_site(&mock_server.uri(), 2)),
        batch_fetcher(5),
        Arc::clone(&pool),
    );

    let result = pipeline.run(&CancellationToken::new()).await;
    assert!(matches!(
        result,
        Err(HarvestError::Worker(WorkerError::NotRunning))
    ));

    pool.start().unwrap();
    assert_eq!(pipeline.run(&CancellationToken::new()).await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_limits_hold_across_a_full_run() {
    let mock_server = MockServer::start().await;
    mount_news_site(&mock_server).await;
    let pipeline = pipeline_for(&mock_server, 2, 1);

    let output = pipeline.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(output.len(), 6);
    assert!(pipeline.limiter().peak() <= 2);
    assert_eq!(pipeline.limiter().active(), 0);
    assert!(pipeline.pool().peak() <= 1);
}

#[tokio::test]
async fn test_cancelled_run() {
    let mock_server = MockServer::start().await;
    mount_news_site(&mock_server).await;
    let pipeline = pipeline_for(&mock_server, 2, 2);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        trigger.cancel();
    });

    let result = pipeline.run(&cancel).await;
    assert!(matches!(result, Err(HarvestError::Cancelled)));
    assert_eq!(pipeline.limiter().active(), 0);
}
