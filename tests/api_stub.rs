//! Client and loader against a tiny in-process axum stub.

use axum::Router;
use axum::http::{StatusCode, Uri, header};
use metro_growth::dashboard::{self, DataOrigin, Dataset};
use metro_growth::{Client, DashboardConfig, FetchError, RecordSource, SeriesSpec};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

type Route = fn(&str) -> (u16, String);

struct Stub {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

/// Serve `route` on an ephemeral port until the test process exits. The
/// router runs on its own runtime thread so the blocking client can be
/// called straight from the test.
fn serve(route: Route) -> Stub {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().fallback(move |uri: Uri| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = route(uri.path());
            let status = StatusCode::from_u16(status).expect("valid status");
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        }
    });

    let (addr_tx, addr_rx) = mpsc::channel();
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind listener");
            addr_tx
                .send(listener.local_addr().expect("local addr"))
                .expect("send addr");
            axum::serve(listener, app).await.expect("serve app");
        });
    });
    let addr = addr_rx.recv().expect("stub server address");
    Stub {
        base_url: format!("http://{}", addr),
        hits,
    }
}

fn config_for(base_url: &str) -> DashboardConfig {
    DashboardConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        connect_timeout_secs: 2,
        ..DashboardConfig::default()
    }
}

fn housing_specs() -> Vec<SeriesSpec> {
    vec![
        SeriesSpec::starts_by_month(&["Toronto", "Hamilton"]),
        SeriesSpec::completions_by_month(&["Toronto", "Hamilton"]),
    ]
}

fn backend(path: &str) -> (u16, String) {
    match path {
        "/api/housingStats" => (
            200,
            r#"[
                {"id": 1, "censusArea": "Toronto", "month": 1, "totalStarts": 100, "totalComplete": 80},
                {"id": 2, "censusArea": "Hamilton", "month": "2", "totalStarts": 20, "totalComplete": null},
                "not a record"
            ]"#
            .to_string(),
        ),
        "/api/housingStats/starts/Ottawa-Gatineau" => (200, "1234".into()),
        "/api/housingStats/Complete/Trois%20Rivi%C3%A8res" => (200, "56".into()),
        "/api/housingStats/count" => (200, "2".into()),
        "/api/labourMarket" => (404, r#"{"error":"not here"}"#.into()),
        "/api/housingStats/starts/Atlantis" => (503, "maintenance".into()),
        _ => (500, "oops".into()),
    }
}

#[test]
fn fetches_and_aggregates_records() {
    let stub = serve(backend);
    let client = Client::new(&stub.base_url).unwrap();
    let records = client.housing_stats().unwrap();
    assert_eq!(records.len(), 2);

    let cfg = config_for(&stub.base_url);
    let report = dashboard::load(&client, Dataset::Housing, &housing_specs(), &cfg);
    assert_eq!(report.origin, DataOrigin::Remote);
    assert!(report.banner.is_none());
    assert_eq!(report.record_count, 2);
    assert_eq!(report.result.key_domain.len(), 2);
    let completions = report.result.series("completions").unwrap();
    assert_eq!(completions.column("Hamilton"), vec![0.0, 0.0]);
}

#[test]
fn backend_totals_use_encoded_segments() {
    let stub = serve(backend);
    let client = Client::new(&stub.base_url).unwrap();
    assert_eq!(client.total_starts_by_area("Ottawa-Gatineau").unwrap(), 1234);
    assert_eq!(client.total_complete_by_area("Trois Rivières").unwrap(), 56);
    assert_eq!(client.record_count().unwrap(), 2);
}

#[test]
fn not_found_is_not_retried() {
    let stub = serve(backend);
    let client = Client::new(&stub.base_url).unwrap();
    let err = client.labour_market().unwrap_err();
    assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 404));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[test]
fn status_codes_reach_the_client_unchanged() {
    let stub = serve(backend);
    let client = Client::new(&stub.base_url).unwrap();
    let err = client.total_starts_by_area("Atlantis").unwrap_err();
    assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
}

#[test]
fn server_errors_are_retried_then_reported() {
    let stub = serve(|_| (500, "boom".into()));
    let client = Client::new(&stub.base_url).unwrap();
    let err = client.fetch_records("/api/housingStats").unwrap_err();
    assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 500));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
}

#[test]
fn malformed_and_non_array_bodies() {
    let stub = serve(|path| match path {
        "/broken" => (200, "[{\"censusArea\": ".into()),
        _ => (200, r#"{"records": []}"#.into()),
    });
    let client = Client::new(&stub.base_url).unwrap();
    assert!(matches!(client.fetch_records("/broken"), Err(FetchError::Decode(_))));
    assert!(matches!(client.fetch_records("/object"), Err(FetchError::Shape(_))));
}

#[test]
fn failed_load_is_empty_with_banner() {
    let stub = serve(|_| (500, "down".into()));
    let cfg = config_for(&stub.base_url);
    let client = Client::from_config(&cfg).unwrap();
    let report = dashboard::load(&client, Dataset::Housing, &housing_specs(), &cfg);
    assert_eq!(report.origin, DataOrigin::Unavailable);
    assert!(report.result.is_empty());
    assert!(report.result.key_domain.is_empty());
    let banner = report.banner.unwrap();
    assert!(banner.starts_with("Could not load data"), "{banner}");
}

#[test]
fn refused_connection_falls_back_to_synthetic_when_enabled() {
    // Port 9 (discard) is not expected to be listening.
    let mut cfg = config_for("http://127.0.0.1:9");
    let client = Client::from_config(&cfg).unwrap();

    let report = dashboard::load(&client, Dataset::Housing, &housing_specs(), &cfg);
    assert_eq!(report.origin, DataOrigin::Unavailable);
    assert!(report.result.is_empty());

    cfg.use_synthetic_fallback = true;
    let report = dashboard::load(&client, Dataset::Labour, &[SeriesSpec::labour_status_by(vec![])], &cfg);
    assert_eq!(report.origin, DataOrigin::Synthetic);
    assert!(!report.result.is_empty());
    assert!(report.banner.unwrap().contains("synthetic"));
}
