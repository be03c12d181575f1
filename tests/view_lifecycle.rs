use metro_growth::correlate::{CorrelationView, HousingType, LabourMetric};
use metro_growth::dashboard::{ChartView, DataOrigin, Dataset, SharedSource, WorkerOutcome, spawn_load};
use metro_growth::models::{Field, GroupKey, RawStatRecord};
use metro_growth::{DashboardConfig, FetchError, RecordSource, SeriesSpec};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn housing(month: i64, city: &str, starts: i64, complete: i64) -> RawStatRecord {
    RawStatRecord::default()
        .with(Field::CensusArea, city)
        .with(Field::Month, month)
        .with(Field::TotalStarts, starts)
        .with(Field::TotalComplete, complete)
}

struct Fixed(Vec<RawStatRecord>);

impl RecordSource for Fixed {
    fn fetch_records(&self, _endpoint: &str) -> Result<Vec<RawStatRecord>, FetchError> {
        Ok(self.0.clone())
    }
}

/// Blocks every fetch until the test releases it, and reports when it returns.
struct Gated {
    release: Mutex<Receiver<()>>,
    done: Mutex<Sender<()>>,
    records: Vec<RawStatRecord>,
}

impl RecordSource for Gated {
    fn fetch_records(&self, _endpoint: &str) -> Result<Vec<RawStatRecord>, FetchError> {
        let _ = self.release.lock().unwrap().recv();
        let _ = self.done.lock().unwrap().send(());
        Ok(self.records.clone())
    }
}

fn gated(records: Vec<RawStatRecord>) -> (SharedSource, Sender<()>, Receiver<()>) {
    let (release_tx, release_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    let source = Gated {
        release: Mutex::new(release_rx),
        done: Mutex::new(done_tx),
        records,
    };
    (Arc::new(source), release_tx, done_rx)
}

fn sample() -> Vec<RawStatRecord> {
    vec![
        housing(1, "Toronto", 100, 80),
        housing(2, "Toronto", 120, 90),
        housing(2, "Hamilton", 25, 18),
    ]
}

#[test]
fn toggle_and_filter_without_reaggregating() {
    let cfg = DashboardConfig::default();
    let mut view = ChartView::housing_comparison(&["Toronto", "Hamilton"]);
    view.load_now(&Fixed(sample()), &cfg);

    assert_eq!(view.key_domain(), &[GroupKey::number(1), GroupKey::number(2)]);
    assert_eq!(view.visible_entries().len(), 2);

    view.select_key(Some(GroupKey::number(2)));
    let feb = view.visible_entries();
    assert_eq!(feb.len(), 1);
    assert_eq!(feb[0].value("Toronto"), 120.0);

    view.toggle_series();
    assert_eq!(view.active_series_name(), Some("completions"));
    assert_eq!(view.visible_entries()[0].value("Hamilton"), 18.0);
    assert_eq!(view.report().unwrap().origin, DataOrigin::Remote);
}

#[test]
fn reload_clears_a_selection_outside_the_new_domain() {
    let cfg = DashboardConfig::default();
    let mut view = ChartView::housing_comparison(&["Toronto"]);
    view.load_now(&Fixed(sample()), &cfg);
    view.select_key(Some(GroupKey::number(2)));

    view.load_now(&Fixed(vec![housing(1, "Toronto", 5, 5)]), &cfg);
    assert_eq!(view.selected_key(), None);
    assert_eq!(view.visible_entries().len(), 1);
}

#[test]
fn background_load_is_applied_on_wait() {
    let cfg = DashboardConfig::default();
    let (source, release, _done) = gated(sample());
    let mut view = ChartView::housing_comparison(&["Toronto", "Hamilton"]);
    view.begin_load(source, &cfg);
    assert!(view.is_loading());
    assert!(!view.poll());

    release.send(()).unwrap();
    assert!(view.wait());
    assert!(!view.is_loading());
    assert_eq!(view.key_domain().len(), 2);
}

#[test]
fn cancelled_worker_sends_nothing() {
    let cfg = DashboardConfig::default();
    let (source, release, done) = gated(sample());
    let specs = vec![SeriesSpec::starts_by_month(&["Toronto"])];

    let pending = spawn_load(source, Dataset::Housing, specs, cfg);
    assert!(pending.try_take().is_none());
    pending.cancel();
    release.send(()).unwrap();
    done.recv_timeout(Duration::from_secs(5)).unwrap();

    // The worker finished its fetch and hung up without a report.
    assert!(matches!(pending.settle(Duration::from_secs(5)), WorkerOutcome::Discarded));
    assert!(pending.wait().is_none());
    assert!(pending.is_cancelled());
}

#[test]
fn uncancelled_worker_delivers() {
    let cfg = DashboardConfig::default();
    let (source, release, _done) = gated(sample());
    let specs = vec![SeriesSpec::starts_by_month(&["Toronto"])];

    let pending = spawn_load(source, Dataset::Housing, specs, cfg);
    assert!(matches!(pending.settle(Duration::from_millis(20)), WorkerOutcome::StillRunning));
    release.send(()).unwrap();
    match pending.settle(Duration::from_secs(5)) {
        WorkerOutcome::Delivered(report) => assert_eq!(report.record_count, 3),
        other => panic!("expected a report, got {:?}", other),
    }
}

#[test]
fn disposing_the_view_raises_the_workers_flag() {
    let cfg = DashboardConfig::default();
    let (source, release, done) = gated(sample());
    let mut view = ChartView::housing_comparison(&["Toronto"]);
    view.begin_load(source, &cfg);
    let flag = view.pending().unwrap().cancel_flag();
    assert!(!flag.load(Ordering::SeqCst));

    view.dispose();
    assert!(flag.load(Ordering::SeqCst));
    release.send(()).unwrap();
    done.recv_timeout(Duration::from_secs(5)).unwrap();
}

/// Serves labour records on the labour endpoint and housing records elsewhere.
struct Backend {
    labour_endpoint: String,
}

impl RecordSource for Backend {
    fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawStatRecord>, FetchError> {
        if endpoint != self.labour_endpoint {
            return Ok(vec![
                housing(1, "Toronto", 100, 80).with(Field::SinglesStarts, 40),
                housing(1, "Montreal", 60, 50).with(Field::SinglesStarts, 10),
            ]);
        }
        let person = |province: i64, status: i64| {
            RawStatRecord::default()
                .with(Field::Province, province)
                .with(Field::LabourForceStatus, status)
        };
        Ok(vec![person(1, 1), person(1, 2), person(2, 1), person(2, 3)])
    }
}

#[test]
fn correlation_view_combines_both_datasets() {
    let cfg = DashboardConfig::default();
    let source = Backend {
        labour_endpoint: cfg.labour_endpoint.clone(),
    };
    let mut view = CorrelationView::new(LabourMetric::Employment, HousingType::MultiUnit);
    assert!(view.rows().is_empty());
    view.load_now(&source, &cfg);
    assert!(view.banners().is_empty());

    let rows = view.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].label, "Ontario");
    assert!((rows[0].rate - 50.0).abs() < 1e-9);
    assert_eq!(rows[0].starts, 60.0);
    assert_eq!(rows[1].label, "Quebec");
    assert_eq!(rows[1].rate, 100.0);
    assert_eq!(rows[1].starts, 50.0);

    view.metric = LabourMetric::Participation;
    view.housing_type = HousingType::Single;
    let rows = view.rows();
    assert!((rows[1].rate - 50.0).abs() < 1e-9);
    assert_eq!(rows[1].starts, 10.0);
}

#[test]
fn correlation_view_reports_each_failed_load() {
    let cfg = DashboardConfig::default();
    struct Down;
    impl RecordSource for Down {
        fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawStatRecord>, FetchError> {
            Err(FetchError::Shape(format!("{} is down", endpoint)))
        }
    }
    let mut view = CorrelationView::default();
    view.begin_load(Arc::new(Down), &cfg);
    assert!(view.wait());
    assert!(!view.is_loading());
    assert_eq!(view.banners().len(), 2);
    assert!(view.rows().is_empty());
}
