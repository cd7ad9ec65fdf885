//! End-to-end loads through the router and the hyper transport.

use axum::body::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use url::Url;

use fetch_mediator::auth::BearerTokenAuthoriser;
use fetch_mediator::config::TransportConfig;
use fetch_mediator::http::{AuthorisationError, LoadError};
use fetch_mediator::{HyperTransport, Request, Router};

mod common;
use common::{start_programmable_backend, wait_for, Event, RecordingHandler, SeenRequest};

fn transport() -> Arc<HyperTransport> {
    Arc::new(HyperTransport::new(&TransportConfig::default(), Handle::current()))
}

fn url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}{path}")).unwrap()
}

async fn terminal(handler: &RecordingHandler) -> Event {
    assert!(
        wait_for(Duration::from_secs(5), || !handler.terminal_events().is_empty()).await,
        "no terminal event arrived"
    );
    handler.terminal_events().remove(0)
}

#[tokio::test]
async fn test_successful_load() {
    let backend = start_programmable_backend(|_| async { (200, "hello".into()) }).await;
    let router = Router::builder().build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/greeting")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(terminal(&handler).await, Event::Success(req.id(), Some(Bytes::from("hello"))));
    assert_eq!(handler.events()[0], Event::Initial(req.id(), Some(200)));
    assert_eq!(router.in_flight(), 0);
}

#[tokio::test]
async fn test_chunked_load_streams_body() {
    let body = "x".repeat(64 * 1024);
    let served = body.clone();
    let backend = start_programmable_backend(move |_| {
        let served = served.clone();
        async move { (200, served) }
    })
    .await;
    let router = Router::builder().build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/large")).chunks(true).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(terminal(&handler).await, Event::Success(req.id(), None));
    assert_eq!(handler.chunks(), body.into_bytes());
}

#[tokio::test]
async fn test_server_error_is_failure() {
    let backend = start_programmable_backend(|_| async { (500, "boom".into()) }).await;
    let router = Router::builder().build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(
        terminal(&handler).await,
        Event::Failure(req.id(), Some(LoadError::Http { status: 500 }))
    );
}

#[tokio::test]
async fn test_stale_token_is_refreshed_once() {
    let hits = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::<SeenRequest>::new()));
    let (h, s) = (hits.clone(), seen.clone());
    let backend = start_programmable_backend(move |req| {
        h.fetch_add(1, Ordering::SeqCst);
        let accepted = req.authorization.as_deref() == Some("Bearer fresh");
        s.lock().unwrap().push(req);
        async move {
            if accepted {
                (200, "secret".into())
            } else {
                (401, "denied".into())
            }
        }
    })
    .await;

    let authoriser = Arc::new(BearerTokenAuthoriser::new(
        "api",
        "127.0.0.1",
        vec!["stale".into(), "fresh".into()],
    ));
    let router = Router::builder()
        .authoriser(authoriser.clone())
        .build(transport())
        .unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/private")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(terminal(&handler).await, Event::Success(req.id(), Some(Bytes::from("secret"))));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(req.retried_authorisation());
    assert_eq!(authoriser.current_token(), Some("fresh"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer stale"));
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer fresh"));
}

#[tokio::test]
async fn test_second_unauthorised_is_delivered() {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let backend = start_programmable_backend(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (401, "denied".into()) }
    })
    .await;

    let router = Router::builder()
        .authoriser(Arc::new(BearerTokenAuthoriser::new(
            "api",
            "127.0.0.1",
            vec!["one".into(), "two".into()],
        )))
        .build(transport())
        .unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/private")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(
        terminal(&handler).await,
        Event::Failure(req.id(), Some(LoadError::Http { status: 401 }))
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_credentials_fail_without_network() {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let backend = start_programmable_backend(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (200, "ok".into()) }
    })
    .await;

    let router = Router::builder()
        .authoriser(Arc::new(BearerTokenAuthoriser::new("api", "127.0.0.1", Vec::new())))
        .build(transport())
        .unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/private")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(
        terminal(&handler).await,
        Event::Failure(
            req.id(),
            Some(LoadError::Authorisation(AuthorisationError::NoCredentials(
                "127.0.0.1".into()
            )))
        )
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_offline_load_never_reaches_backend() {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let backend = start_programmable_backend(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (200, "ok".into()) }
    })
    .await;

    let router = Router::builder().offline(true).build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(terminal(&handler).await, Event::Failure(req.id(), Some(LoadError::NotCached)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, "late".into())
    })
    .await;
    let router = Router::builder().build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/slow"))
        .timeout(Duration::from_millis(100))
        .build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(
        terminal(&handler).await,
        Event::Failure(req.id(), Some(LoadError::Timeout(Duration::from_millis(100))))
    );

    // The real response arrives later and is dropped.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(handler.terminal_events().len(), 1);
}

#[tokio::test]
async fn test_cancel_aborts_exchange() {
    let backend = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        (200, "late".into())
    })
    .await;
    let transport = transport();
    let router = Router::builder().build(transport.clone()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/slow")).build();

    let cancel = router.dispatch(&handler, req.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    assert_eq!(terminal(&handler).await, Event::Cancelled(req.id()));
    assert!(wait_for(Duration::from_secs(1), || transport.active_exchanges() == 0).await);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let router = Router::builder().build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(addr, "/")).build();

    router.dispatch(&handler, req.clone()).unwrap();

    match terminal(&handler).await {
        Event::Failure(id, Some(LoadError::Transport(_))) => assert_eq!(id, req.id()),
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timed_out_exchange_is_released() {
    let backend = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        (200, "never".into())
    })
    .await;
    let transport = transport();
    let router = Router::builder().build(transport.clone()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/hang"))
        .timeout(Duration::from_millis(100))
        .build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(
        terminal(&handler).await,
        Event::Failure(req.id(), Some(LoadError::Timeout(Duration::from_millis(100))))
    );
    assert!(wait_for(Duration::from_secs(1), || transport.active_exchanges() == 0).await);
    assert_eq!(handler.terminal_events().len(), 1);
}

#[tokio::test]
async fn test_chunked_retry_streams_only_authorised_body() {
    let backend = start_programmable_backend(|req| {
        let accepted = req.authorization.as_deref() == Some("Bearer fresh");
        async move {
            if accepted {
                (200, "secret".into())
            } else {
                (401, "denied".into())
            }
        }
    })
    .await;

    let router = Router::builder()
        .authoriser(Arc::new(BearerTokenAuthoriser::new(
            "api",
            "127.0.0.1",
            vec!["stale".into(), "fresh".into()],
        )))
        .build(transport())
        .unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/private")).chunks(true).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(terminal(&handler).await, Event::Success(req.id(), None));
    assert_eq!(handler.chunks(), b"secret".to_vec());
    assert_eq!(handler.events()[0], Event::Initial(req.id(), Some(200)));
    assert!(!handler
        .events()
        .iter()
        .any(|e| matches!(e, Event::Initial(_, Some(401)))));
}

#[tokio::test]
async fn test_error_status_emits_no_partial_events() {
    let backend = start_programmable_backend(|_| async { (503, "unavailable".into()) }).await;
    let router = Router::builder().build(transport()).unwrap();
    let handler = RecordingHandler::new();
    let req = Request::builder(url(backend, "/")).chunks(true).build();

    router.dispatch(&handler, req.clone()).unwrap();

    assert_eq!(
        terminal(&handler).await,
        Event::Failure(req.id(), Some(LoadError::Http { status: 503 }))
    );
    assert_eq!(handler.events().len(), 1);
}
