mod common;

use common::record;
use honeybadger_client::{
    DispatchStatus, Dispatcher, ExclusionPolicy, HttpTransport, PayloadBuilder, Transport,
};
use honeybadger_core::DispatchConfig;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> DispatchConfig {
    DispatchConfig::builder("test-api-key")
        .endpoint(format!("{}/v1/notices", server.uri()))
        .build()
        .unwrap()
}

fn notice_for(config: &DispatchConfig) -> honeybadger_client::Notice {
    PayloadBuilder::with_host(config, "test-host", "/srv/app")
        .build(&record("boom"))
        .unwrap()
}

#[tokio::test]
async fn test_created_response_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/notices"))
        .and(header("X-API-Key", "test-api-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_string_contains("billing::InvoiceError"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let transport = HttpTransport::new(&config).unwrap();
    let outcome = transport.send(&notice_for(&config)).await;

    assert!(outcome.succeeded);
    assert_eq!(outcome.status_code, Some(201));
    assert!(outcome.transport_error.is_none());
}

#[tokio::test]
async fn test_ok_is_not_created() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/notices"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let transport = HttpTransport::new(&config).unwrap();
    let outcome = transport.send(&notice_for(&config)).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.status_code, Some(200));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let mock_server = MockServer::builder().start().await;
    let config = config_for(&mock_server);
    drop(mock_server);

    let transport = HttpTransport::new(&config).unwrap();
    let outcome = transport.send(&notice_for(&config)).await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.status_code, None);
    assert!(outcome.transport_error.is_some());
}

#[tokio::test]
async fn test_dispatch_gives_up_after_three_rejections() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/notices"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let dispatcher = Dispatcher::new(
        ExclusionPolicy::from_config(&config),
        PayloadBuilder::with_host(&config, "test-host", "/srv/app"),
        Arc::new(HttpTransport::new(&config).unwrap()),
    );

    let status = dispatcher.dispatch(&record("rejected")).await;
    assert_eq!(status, DispatchStatus::GaveUp { attempts: 3 });
}

#[tokio::test]
async fn test_dispatch_recovers_from_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/notices"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/notices"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let dispatcher = Dispatcher::new(
        ExclusionPolicy::from_config(&config),
        PayloadBuilder::with_host(&config, "test-host", "/srv/app"),
        Arc::new(HttpTransport::new(&config).unwrap()),
    );

    let status = dispatcher.dispatch(&record("eventually")).await;
    assert_eq!(status, DispatchStatus::Delivered { attempts: 3 });

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}
