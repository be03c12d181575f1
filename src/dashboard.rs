//! Loading data for a chart view and keeping the view's toggle/filter state.
//!
//! A load is one fetch followed by one aggregation pass. [`load`] never fails:
//! fetch errors become an empty result (or synthetic data, when enabled) plus a
//! banner message for the user.

use crate::api::{FetchError, RecordSource};
use crate::config::DashboardConfig;
use crate::models::{Dimension, GroupKey, GroupedSeriesEntry, RawStatRecord};
use crate::series::{AggregationResult, Series, SeriesSpec, aggregate};
use crate::synthetic;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

/// Where the records behind a [`LoadReport`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Remote,
    Synthetic,
    /// The fetch failed and no fallback was allowed.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Housing,
    Labour,
}

impl Dataset {
    pub fn endpoint<'a>(&self, config: &'a DashboardConfig) -> &'a str {
        match self {
            Dataset::Housing => &config.housing_endpoint,
            Dataset::Labour => &config.labour_endpoint,
        }
    }

    pub fn synthetic_records(&self, config: &DashboardConfig) -> Vec<RawStatRecord> {
        match self {
            Dataset::Housing => {
                let mut cities: Vec<String> = config.cities.clone();
                for c in crate::lookup::HOUSING_TYPE_CITIES {
                    if !cities.iter().any(|known| known == c) {
                        cities.push(c.to_string());
                    }
                }
                synthetic::housing_records(&cities)
            }
            Dataset::Labour => synthetic::labour_records(),
        }
    }
}

/// Outcome of one load, applied to a view as a whole.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub result: AggregationResult,
    pub origin: DataOrigin,
    /// User-facing message when something went wrong.
    pub banner: Option<String>,
    pub record_count: usize,
    pub loaded_at: DateTime<Utc>,
}

fn report(
    records: &[RawStatRecord],
    specs: &[SeriesSpec],
    origin: DataOrigin,
    banner: Option<String>,
) -> LoadReport {
    LoadReport {
        result: aggregate(records, specs),
        origin,
        banner,
        record_count: records.len(),
        loaded_at: Utc::now(),
    }
}

fn fallback(
    dataset: Dataset,
    specs: &[SeriesSpec],
    config: &DashboardConfig,
    reason: String,
) -> LoadReport {
    if config.use_synthetic_fallback {
        let records = dataset.synthetic_records(config);
        log::info!("using {} synthetic {:?} record(s)", records.len(), dataset);
        let banner = format!("{}. Showing synthetic baseline data.", reason);
        report(&records, specs, DataOrigin::Synthetic, Some(banner))
    } else {
        report(&[], specs, DataOrigin::Unavailable, Some(reason))
    }
}

/// Fetch `dataset` from `source` and aggregate it into `specs`.
pub fn load(
    source: &dyn RecordSource,
    dataset: Dataset,
    specs: &[SeriesSpec],
    config: &DashboardConfig,
) -> LoadReport {
    let endpoint = dataset.endpoint(config);
    match source.fetch_records(endpoint) {
        Ok(records) if records.is_empty() && config.use_synthetic_fallback => fallback(
            dataset,
            specs,
            config,
            format!("No records returned by {}", endpoint),
        ),
        Ok(records) => report(&records, specs, DataOrigin::Remote, None),
        Err(err) => {
            log::error!("loading {} failed: {}", endpoint, err);
            fallback(dataset, specs, config, banner_for(&err))
        }
    }
}

fn banner_for(err: &FetchError) -> String {
    format!("Could not load data: {}", err)
}

pub type SharedSource = Arc<dyn RecordSource + Send + Sync>;

/// What a background worker did with its report.
#[derive(Debug)]
pub enum WorkerOutcome {
    Delivered(Box<LoadReport>),
    /// The worker exited without sending: it was cancelled.
    Discarded,
    StillRunning,
}

/// A load running on a background thread.
///
/// Dropping it (or calling [`cancel`](Self::cancel)) raises the cancellation
/// flag; the worker then discards its result instead of sending it.
#[derive(Debug)]
pub struct PendingLoad {
    rx: mpsc::Receiver<LoadReport>,
    cancelled: Arc<AtomicBool>,
}

impl PendingLoad {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The report, if the worker has delivered it.
    pub fn try_take(&self) -> Option<LoadReport> {
        if self.is_cancelled() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("load worker exited without a report");
                None
            }
        }
    }

    /// Wait up to `timeout` for the worker to finish, ignoring the
    /// cancellation flag on this side.
    pub fn settle(&self, timeout: Duration) -> WorkerOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(report) => WorkerOutcome::Delivered(Box::new(report)),
            Err(RecvTimeoutError::Disconnected) => WorkerOutcome::Discarded,
            Err(RecvTimeoutError::Timeout) => WorkerOutcome::StillRunning,
        }
    }

    /// The flag the worker checks before sending; shared with the thread.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Block until the worker finishes. `None` when cancelled.
    pub fn wait(&self) -> Option<LoadReport> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.recv().ok()
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run [`load`] on a new thread.
pub fn spawn_load(
    source: SharedSource,
    dataset: Dataset,
    specs: Vec<SeriesSpec>,
    config: DashboardConfig,
) -> PendingLoad {
    let (tx, rx) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    thread::spawn(move || {
        let report = load(source.as_ref(), dataset, &specs, &config);
        if flag.load(Ordering::SeqCst) {
            log::debug!("discarding {:?} load: view was disposed", dataset);
            return;
        }
        let _ = tx.send(report);
    });
    PendingLoad { rx, cancelled }
}

/// State behind one chart: which series is shown, which key is selected,
/// and the last applied load.
#[derive(Debug)]
pub struct ChartView {
    dataset: Dataset,
    specs: Vec<SeriesSpec>,
    active: usize,
    selected: Option<GroupKey>,
    report: Option<LoadReport>,
    pending: Option<PendingLoad>,
}

impl ChartView {
    pub fn new(dataset: Dataset, specs: Vec<SeriesSpec>) -> Self {
        Self {
            dataset,
            specs,
            active: 0,
            selected: None,
            report: None,
            pending: None,
        }
    }

    /// Monthly starts vs. completions for a set of cities, starts first.
    pub fn housing_comparison<S: AsRef<str>>(cities: &[S]) -> Self {
        Self::new(
            Dataset::Housing,
            vec![
                SeriesSpec::starts_by_month(cities),
                SeriesSpec::completions_by_month(cities),
            ],
        )
    }

    /// Housing-type distribution per census area, starts first.
    pub fn housing_types() -> Self {
        Self::new(
            Dataset::Housing,
            vec![
                SeriesSpec::housing_types_by_area(false),
                SeriesSpec::housing_types_by_area(true),
            ],
        )
    }

    pub fn employment(group_by: Vec<Dimension>) -> Self {
        Self::new(Dataset::Labour, vec![SeriesSpec::labour_status_by(group_by)])
    }

    pub fn specs(&self) -> &[SeriesSpec] {
        &self.specs
    }

    /// Load synchronously, replacing whatever was shown and cancelling any
    /// background load.
    pub fn load_now(&mut self, source: &dyn RecordSource, config: &DashboardConfig) {
        self.pending = None;
        let report = load(source, self.dataset, &self.specs, config);
        self.apply(report);
    }

    /// Start a background load. A load already in flight is cancelled.
    pub fn begin_load(&mut self, source: SharedSource, config: &DashboardConfig) {
        self.pending = Some(spawn_load(
            source,
            self.dataset,
            self.specs.clone(),
            config.clone(),
        ));
    }

    /// Apply a finished background load, if any. Returns true when applied.
    pub fn poll(&mut self) -> bool {
        let Some(report) = self.pending.as_ref().and_then(PendingLoad::try_take) else {
            return false;
        };
        self.pending = None;
        self.apply(report);
        true
    }

    /// Block until the background load finishes and apply it.
    pub fn wait(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        match pending.wait() {
            Some(report) => {
                self.apply(report);
                true
            }
            None => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingLoad> {
        self.pending.as_ref()
    }

    fn apply(&mut self, report: LoadReport) {
        if let Some(key) = &self.selected
            && !report.result.key_domain.contains(key)
        {
            log::debug!("clearing selection {}: not in new key domain", key);
            self.selected = None;
        }
        self.report = Some(report);
    }

    /// Switch to the next series (starts -> completions -> starts ...).
    pub fn toggle_series(&mut self) {
        if !self.specs.is_empty() {
            self.active = (self.active + 1) % self.specs.len();
        }
    }

    pub fn set_active_series(&mut self, name: &str) -> bool {
        match self.specs.iter().position(|s| s.name == name) {
            Some(i) => {
                self.active = i;
                true
            }
            None => false,
        }
    }

    pub fn active_series_name(&self) -> Option<&str> {
        self.specs.get(self.active).map(|s| s.name.as_str())
    }

    pub fn active_series(&self) -> Option<&Series> {
        let name = self.active_series_name()?;
        self.report.as_ref()?.result.series(name)
    }

    /// Restrict the view to one key, or show everything with `None`.
    pub fn select_key(&mut self, key: Option<GroupKey>) {
        self.selected = key;
    }

    pub fn selected_key(&self) -> Option<&GroupKey> {
        self.selected.as_ref()
    }

    /// Keys offered by the filter control.
    pub fn key_domain(&self) -> &[GroupKey] {
        self.report
            .as_ref()
            .map(|r| r.result.key_domain.as_slice())
            .unwrap_or(&[])
    }

    /// Entries of the active series under the current filter.
    pub fn visible_entries(&self) -> &[GroupedSeriesEntry] {
        self.active_series()
            .map(|s| s.filter(self.selected.as_ref()))
            .unwrap_or(&[])
    }

    pub fn banner(&self) -> Option<&str> {
        self.report.as_ref()?.banner.as_deref()
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }

    /// Tear the view down. A background load still running is cancelled and
    /// its result dropped.
    pub fn dispose(self) {
        if self.pending.is_some() {
            log::debug!("disposing {:?} view with a load in flight", self.dataset);
        }
    }
}
