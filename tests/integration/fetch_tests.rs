//! Batch fetching against a mock server

use crate::common::{batch_fetcher, mount_html, mount_status, test_settings, unreachable_url};
use std::time::Duration;
use tag_harvest::fetch::{BatchFetcher, ConcurrencyLimiter, FetchSettings};
use tag_harvest::FetchError;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_batch_preserves_order_with_shuffled_completion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Earlier URLs answer slower, so completion order is reversed
    for i in 0..10u64 {
        mount_html(
            &mock_server,
            &format!("/item/{}", i),
            format!("body-{}", i),
            Duration::from_millis((10 - i) * 15),
        )
        .await;
    }

    let urls: Vec<String> = (0..10).map(|i| format!("{}/item/{}", base_url, i)).collect();
    let outcomes = batch_fetcher(10)
        .fetch_all(urls.clone(), &CancellationToken::new())
        .await;

    assert_eq!(outcomes.len(), 10);
    for (i, outcome) in outcomes.iter().enumerate() {
        let document = outcome.as_ref().expect("fetch should succeed");
        assert_eq!(document.body, format!("body-{}", i));
        assert_eq!(document.url, urls[i]);
    }
}

#[tokio::test]
async fn test_single_failure_does_not_affect_siblings() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for i in 0..10 {
        if i == 3 {
            mount_status(&mock_server, "/item/3", 500).await;
        } else {
            mount_html(
                &mock_server,
                &format!("/item/{}", i),
                format!("body-{}", i),
                Duration::from_millis(5),
            )
            .await;
        }
    }

    let urls: Vec<String> = (0..10).map(|i| format!("{}/item/{}", base_url, i)).collect();
    let outcomes = batch_fetcher(4)
        .fetch_all(urls, &CancellationToken::new())
        .await;

    assert_eq!(outcomes.len(), 10);
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 9);
    assert_eq!(
        outcomes[3],
        Err(FetchError::Status {
            url: format!("{}/item/3", base_url),
            status: 500,
        })
    );
}

#[tokio::test]
async fn test_connection_failure_isolated_to_its_slot() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/ok", "fine".to_string(), Duration::ZERO).await;

    let dead = unreachable_url("/gone");
    let urls = vec![format!("{}/ok", mock_server.uri()), dead.clone()];
    let outcomes = batch_fetcher(2)
        .fetch_all(urls, &CancellationToken::new())
        .await;

    assert_eq!(outcomes[0].as_ref().unwrap().body, "fine");
    match &outcomes[1] {
        Err(error @ FetchError::Transport { .. }) => assert_eq!(error.url(), dead),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_millis(40)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = batch_fetcher(3);
    let urls: Vec<String> = (0..20)
        .map(|i| format!("{}/page/{}", mock_server.uri(), i))
        .collect();
    let outcomes = fetcher.fetch_all(urls, &CancellationToken::new()).await;

    assert_eq!(outcomes.len(), 20);
    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert!(
        fetcher.limiter().peak() <= 3,
        "peak concurrency was {}",
        fetcher.limiter().peak()
    );
    assert!(fetcher.limiter().peak() >= 1);
    assert_eq!(fetcher.limiter().active(), 0);
}

#[tokio::test]
async fn test_body_size_bound() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/huge", "x".repeat(1024), Duration::ZERO).await;

    let settings = FetchSettings {
        max_body_bytes: 100,
        ..test_settings()
    };
    let fetcher = BatchFetcher::new(settings, ConcurrencyLimiter::default());
    let url = format!("{}/huge", mock_server.uri());
    let outcomes = fetcher
        .fetch_all(vec![url.clone()], &CancellationToken::new())
        .await;

    assert_eq!(outcomes[0], Err(FetchError::BodyTooLarge { url, limit: 100 }));
}

#[tokio::test]
async fn test_request_deadline() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/stuck",
        "late".to_string(),
        Duration::from_secs(3),
    )
    .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(200),
        ..test_settings()
    };
    let fetcher = BatchFetcher::new(settings, ConcurrencyLimiter::default());
    let url = format!("{}/stuck", mock_server.uri());
    let outcomes = fetcher
        .fetch_all(vec![url.clone()], &CancellationToken::new())
        .await;

    assert_eq!(outcomes[0], Err(FetchError::Timeout { url }));
    assert_eq!(fetcher.limiter().active(), 0);
}

#[tokio::test]
async fn test_invalid_utf8_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/binary"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0xfd]))
        .mount(&mock_server)
        .await;

    let url = format!("{}/binary", mock_server.uri());
    let outcomes = batch_fetcher(1)
        .fetch_all(vec![url.clone()], &CancellationToken::new())
        .await;

    assert_eq!(outcomes[0], Err(FetchError::Decode { url }));
}

#[tokio::test]
async fn test_cancellation_releases_permits() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("never seen")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = batch_fetcher(2);
    let urls: Vec<String> = (0..6)
        .map(|i| format!("{}/slow/{}", mock_server.uri(), i))
        .collect();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let outcomes = fetcher.fetch_all(urls, &cancel).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcomes.len(), 6);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, Err(FetchError::Cancelled { .. }))));
    assert_eq!(fetcher.limiter().active(), 0);
}
