use crate::{olx_crawler, olx_page, quick_policy};
use listing_spy::actions::{preview_source, register_source};
use listing_spy::crawler::SourceOutcome;
use listing_spy::model::{BrokenReason, Source};
use listing_spy::storage::{ListingGateway, SqliteStorage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_two_pages(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(olx_page(
            &[
                ("Flat A", "/d/oferta/flat-a.html"),
                ("Flat B", "/d/oferta/flat-b.html#photos"),
            ],
            Some(&format!("{}/search/page-2", base)),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(olx_page(
            &[
                ("Flat B", "/d/oferta/flat-b.html"),
                ("Flat C", "/d/oferta/flat-c.html"),
            ],
            None,
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_follows_pagination_over_http() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let offers = preview_source(&olx_crawler(&server), &format!("{}/search", server.uri()))
        .await
        .expect("Crawl failed");

    let urls: Vec<String> = offers.iter().map(|o| o.url.to_string()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/d/oferta/flat-a.html", server.uri()),
            format!("{}/d/oferta/flat-b.html", server.uri()),
            format!("{}/d/oferta/flat-c.html", server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(olx_page(&[("Flat A", "/d/oferta/flat-a.html")], None)),
        )
        .mount(&server)
        .await;

    let source = Source::unsaved(format!("{}/search", server.uri()), "mock");
    let outcome = quick_policy()
        .crawl_source(&olx_crawler(&server), &source)
        .await;

    match outcome {
        SourceOutcome::Crawled { offers, attempts } => {
            assert_eq!(attempts, 3);
            assert_eq!(offers.len(), 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_changed_markup_marks_source_for_adapter_update() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><table><tr><td class="offer"><span>Flat</span></td></tr></table></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().expect("Failed to open storage");
    let key = storage
        .add_source(&format!("{}/search", server.uri()), "mock")
        .expect("Failed to add source");
    let sources = storage.get_sources().expect("Failed to load sources");

    let results = quick_policy()
        .scrape_sources(&olx_crawler(&server), &mut storage, &sources)
        .await;

    assert!(results.offers.is_empty());
    let stored = storage.get_sources().expect("Failed to load sources");
    assert_eq!(stored[0].key.as_deref(), Some(key.as_str()));
    assert!(stored[0].broken);
    assert_eq!(stored[0].broken_reason, Some(BrokenReason::NeedsAdapterUpdate));
}

#[tokio::test]
async fn test_register_source_with_file_database() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("listings.sqlite");
    let mut storage = SqliteStorage::new(&db_path).expect("Failed to open DB");

    let registered = register_source(
        &olx_crawler(&server),
        &quick_policy(),
        &mut storage,
        &format!("{}/search", server.uri()),
        Some("mock flats"),
    )
    .await
    .expect("Failed to register source");
    drop(storage);

    assert_eq!(registered.primed, 3);

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen DB");
    assert_eq!(storage.count_listings().expect("Failed to count"), 3);
    assert_eq!(storage.get_sources().expect("Failed to load").len(), 1);
}
