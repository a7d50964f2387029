mod common;

use common::{record, test_config, ScriptedTransport};
use honeybadger_client::{DispatchStatus, Dispatcher, ExclusionPolicy, PayloadBuilder, MAX_ATTEMPTS};
use honeybadger_core::{DispatchConfig, ErrorRecord, Fault, HoneybadgerError, StackFrame};
use std::sync::Arc;

fn dispatcher(config: &DispatchConfig, transport: Arc<ScriptedTransport>) -> Dispatcher {
    Dispatcher::new(
        ExclusionPolicy::from_config(config),
        PayloadBuilder::with_host(config, "test-host", "/srv/app"),
        transport,
    )
}

#[tokio::test]
async fn test_always_failing_transport_is_called_three_times() {
    let config = test_config();
    let transport = Arc::new(ScriptedTransport::always(500));
    let dispatcher = dispatcher(&config, transport.clone());

    let status = dispatcher.dispatch(&record("boom")).await;

    assert_eq!(status, DispatchStatus::GaveUp { attempts: 3 });
    assert_eq!(transport.calls(), MAX_ATTEMPTS as usize);
}

#[tokio::test]
async fn test_retry_then_succeed() {
    let config = test_config();
    let transport = Arc::new(ScriptedTransport::new(&[503, 500], 201));
    let dispatcher = dispatcher(&config, transport.clone());

    let status = dispatcher.dispatch(&record("flaky network")).await;

    assert_eq!(status, DispatchStatus::Delivered { attempts: 3 });
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_first_attempt_success_stops_retrying() {
    let config = test_config();
    let transport = Arc::new(ScriptedTransport::always(201));
    let dispatcher = dispatcher(&config, transport.clone());

    let status = dispatcher.dispatch(&record("once")).await;

    assert!(status.is_delivered());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_excluded_type_never_reaches_transport() {
    let config = DispatchConfig::builder("key")
        .exclude_exception_prefixes(["billing"])
        .build()
        .unwrap();
    let transport = Arc::new(ScriptedTransport::always(201));
    let dispatcher = dispatcher(&config, transport.clone());

    let status = dispatcher.dispatch(&record("ignored")).await;

    assert_eq!(status, DispatchStatus::Filtered);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_excluded_innermost_frame_never_reaches_transport() {
    let config = DispatchConfig::builder("key")
        .exclude_frame_prefixes(["com.acme.internal"])
        .build()
        .unwrap();
    let transport = Arc::new(ScriptedTransport::always(201));
    let dispatcher = dispatcher(&config, transport.clone());

    let excluded = ErrorRecord::new(
        Fault::new("java.lang.IllegalStateException")
            .with_frame(StackFrame::new("com.acme.internal.Helper", "run")),
    );
    let kept = ErrorRecord::new(
        Fault::new("java.lang.IllegalStateException")
            .with_frame(StackFrame::new("com.acme.internalz.Helper", "run")),
    );

    assert_eq!(dispatcher.dispatch(&excluded).await, DispatchStatus::Filtered);
    assert!(dispatcher.dispatch(&kept).await.is_delivered());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_record_without_fault_is_filtered() {
    let config = test_config();
    let transport = Arc::new(ScriptedTransport::always(201));
    let dispatcher = dispatcher(&config, transport.clone());

    let status = dispatcher.dispatch(&ErrorRecord::default()).await;

    assert_eq!(status, DispatchStatus::Filtered);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_own_errors_are_never_reported() {
    let config = test_config();
    let transport = Arc::new(ScriptedTransport::always(201));
    let dispatcher = dispatcher(&config, transport.clone());

    let own = HoneybadgerError::configuration("bad setting");
    let status = dispatcher.dispatch(&ErrorRecord::from_error(&own)).await;

    assert_eq!(status, DispatchStatus::Filtered);
    assert_eq!(transport.calls(), 0);
}
