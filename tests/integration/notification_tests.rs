use crate::{channel_factory, olx_crawler, olx_page, quick_policy};
use listing_spy::actions::{register_notification, CycleOptions, ScrapeCycle};
use listing_spy::storage::{ListingGateway, RunStatus, SqliteStorage};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(olx_page(
            &[
                ("Flat A", "/d/oferta/flat-a.html"),
                ("Flat B", "/d/oferta/flat-b.html"),
            ],
            None,
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_cycle_pushes_new_listings_once() {
    let server = MockServer::start().await;
    mount_listing_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/pushes"))
        .and(header("Access-Token", "o.token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().expect("Failed to open storage");
    storage
        .add_source(&format!("{}/search", server.uri()), "mock")
        .expect("Failed to add source");
    storage
        .add_notification_handler("pushbullet", "o.token", "phone")
        .expect("Failed to add handler");

    let crawler = olx_crawler(&server);
    let notifiers = channel_factory(&server);
    let cycle = ScrapeCycle::new(&crawler, quick_policy(), &notifiers);

    let first = cycle
        .run(&mut storage, &CycleOptions::default())
        .await
        .expect("First cycle failed");
    let second = cycle
        .run(&mut storage, &CycleOptions::default())
        .await
        .expect("Second cycle failed");

    assert_eq!(first.new_listings.len(), 2);
    assert_eq!(first.dispatch.sent, 2);
    assert_eq!(first.status, RunStatus::Completed);
    assert!(second.new_listings.is_empty());
    assert_eq!(second.dispatch.sent, 0);
}

#[tokio::test]
async fn test_rejected_handler_does_not_block_others() {
    let server = MockServer::start().await;
    mount_listing_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/pushes"))
        .and(header("Access-Token", "o.revoked"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/pushes"))
        .and(header("Access-Token", "o.valid"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().expect("Failed to open storage");
    storage
        .add_source(&format!("{}/search", server.uri()), "mock")
        .expect("Failed to add source");
    storage
        .add_notification_handler("pushbullet", "o.revoked", "old phone")
        .expect("Failed to add handler");
    storage
        .add_notification_handler("pushbullet", "o.valid", "new phone")
        .expect("Failed to add handler");

    let crawler = olx_crawler(&server);
    let notifiers = channel_factory(&server);

    let report = ScrapeCycle::new(&crawler, quick_policy(), &notifiers)
        .run(&mut storage, &CycleOptions::default())
        .await
        .expect("Cycle failed");

    assert_eq!(report.status, RunStatus::Degraded);
    assert_eq!(report.dispatch.sent, 2);
    assert_eq!(report.dispatch.failures.len(), 2);
    assert!(report
        .dispatch
        .failures
        .iter()
        .all(|failure| failure.handler_name == "old phone"));
}

#[tokio::test]
async fn test_register_pushbullet_handler() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/pushes"))
        .and(header("Access-Token", "o.token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().expect("Failed to open storage");
    let id = register_notification(
        &mut storage,
        &channel_factory(&server),
        "pushbullet",
        "o.token",
        "phone",
    )
    .await
    .expect("Registration failed");

    let handlers = storage
        .get_notification_handlers()
        .expect("Failed to load handlers");
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].id, id);
}

#[tokio::test]
async fn test_register_with_bad_token_stores_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/pushes"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut storage = SqliteStorage::new_in_memory().expect("Failed to open storage");
    let result = register_notification(
        &mut storage,
        &channel_factory(&server),
        "pushbullet",
        "o.bad",
        "phone",
    )
    .await;

    assert!(result.is_err());
    assert!(storage
        .get_notification_handlers()
        .expect("Failed to load handlers")
        .is_empty());
}
