//! Labour-market rates next to housing starts, per province.
//!
//! Housing records carry a census area and labour records a province code.
//! Areas are folded into provinces through [`lookup::province_of_area`]; areas
//! with no known province are left out of the comparison and logged.

use crate::api::RecordSource;
use crate::config::DashboardConfig;
use crate::dashboard::{ChartView, Dataset, LoadReport, SharedSource};
use crate::lookup;
use crate::models::{Dimension, Field, KeyPart, Measure};
use crate::rates::{self, RATE_FALLBACK, StatusCounts};
use crate::series::{Series, SeriesSpec, Slots};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabourMetric {
    #[default]
    Employment,
    Unemployment,
    Participation,
}

impl LabourMetric {
    pub fn rate(self, counts: &StatusCounts) -> f64 {
        match self {
            LabourMetric::Employment => counts.employment_rate_or(RATE_FALLBACK),
            LabourMetric::Unemployment => counts.unemployment_rate_or(RATE_FALLBACK),
            LabourMetric::Participation => counts.participation_rate_or(RATE_FALLBACK),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LabourMetric::Employment => "Employment rate",
            LabourMetric::Unemployment => "Unemployment rate",
            LabourMetric::Participation => "Participation rate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HousingType {
    #[default]
    Total,
    Single,
    /// Everything but singles: `total - single`.
    MultiUnit,
}

impl HousingType {
    pub fn value(self, total: f64, single: f64) -> f64 {
        match self {
            HousingType::Total => total,
            HousingType::Single => single,
            HousingType::MultiUnit => total - single,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HousingType::Total => "Total starts",
            HousingType::Single => "Single-detached starts",
            HousingType::MultiUnit => "Multi-unit starts",
        }
    }
}

/// Total and single-detached starts per census area.
pub fn area_starts_spec() -> SeriesSpec {
    SeriesSpec::new(
        "area_starts",
        vec![Dimension::CensusArea],
        Slots::ByMeasure(vec![
            Measure::Sum(Field::TotalStarts),
            Measure::Sum(Field::SinglesStarts),
        ]),
    )
}

/// Labour-status counts per province.
pub fn province_status_spec() -> SeriesSpec {
    SeriesSpec::labour_status_by(vec![Dimension::Province])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRow {
    pub province: i64,
    pub label: String,
    /// Percentage for the chosen [`LabourMetric`].
    pub rate: f64,
    pub starts: f64,
}

/// One row per province seen in either series, ordered by province code.
///
/// `labour` must come from [`province_status_spec`] and `housing` from
/// [`area_starts_spec`]. A province without survey data gets the rate
/// fallback; one without housing data gets zero starts.
pub fn correlate(
    labour: &Series,
    housing: &Series,
    metric: LabourMetric,
    housing_type: HousingType,
) -> Vec<CorrelationRow> {
    let mut counts: BTreeMap<i64, StatusCounts> = BTreeMap::new();
    for row in rates::rate_table(labour, &[Dimension::Province]) {
        if let Some(KeyPart::Number(p)) = row.key.parts().first() {
            *counts.entry(*p).or_default() += row.counts;
        }
    }

    let total_slot = Measure::Sum(Field::TotalStarts).label();
    let single_slot = Measure::Sum(Field::SinglesStarts).label();
    let mut starts: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
    for entry in &housing.entries {
        let area = entry.key.to_string();
        let Some(province) = lookup::province_of_area(&area) else {
            log::debug!("census area {} has no province; left out", area);
            continue;
        };
        let slot = starts.entry(province).or_default();
        slot.0 += entry.value(total_slot);
        slot.1 += entry.value(single_slot);
    }

    let mut provinces: Vec<i64> = counts.keys().chain(starts.keys()).copied().collect();
    provinces.sort_unstable();
    provinces.dedup();
    provinces
        .into_iter()
        .map(|p| {
            let rate = counts
                .get(&p)
                .map(|c| metric.rate(c))
                .unwrap_or(RATE_FALLBACK);
            let (total, single) = starts.get(&p).copied().unwrap_or_default();
            CorrelationRow {
                province: p,
                label: lookup::code_label(Dimension::Province, p),
                rate,
                starts: housing_type.value(total, single),
            }
        })
        .collect()
}

/// Pearson coefficient between rate and starts across `rows`.
/// `None` with fewer than two rows or when either side is constant.
pub fn pearson(rows: &[CorrelationRow]) -> Option<f64> {
    if rows.len() < 2 {
        return None;
    }
    let n = rows.len() as f64;
    let mean_x = rows.iter().map(|r| r.rate).sum::<f64>() / n;
    let mean_y = rows.iter().map(|r| r.starts).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for r in rows {
        let dx = r.rate - mean_x;
        let dy = r.starts - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        None
    } else {
        Some(sxy / denom)
    }
}

/// The labour/housing comparison: one view per dataset, loaded together.
#[derive(Debug)]
pub struct CorrelationView {
    labour: ChartView,
    housing: ChartView,
    pub metric: LabourMetric,
    pub housing_type: HousingType,
}

impl Default for CorrelationView {
    fn default() -> Self {
        Self::new(LabourMetric::default(), HousingType::default())
    }
}

impl CorrelationView {
    pub fn new(metric: LabourMetric, housing_type: HousingType) -> Self {
        Self {
            labour: ChartView::new(Dataset::Labour, vec![province_status_spec()]),
            housing: ChartView::new(Dataset::Housing, vec![area_starts_spec()]),
            metric,
            housing_type,
        }
    }

    pub fn load_now(&mut self, source: &dyn RecordSource, config: &DashboardConfig) {
        self.labour.load_now(source, config);
        self.housing.load_now(source, config);
    }

    /// Both fetches run on their own background thread.
    pub fn begin_load(&mut self, source: SharedSource, config: &DashboardConfig) {
        self.labour.begin_load(source.clone(), config);
        self.housing.begin_load(source, config);
    }

    /// Apply whichever loads have finished. True once nothing is pending.
    pub fn poll(&mut self) -> bool {
        self.labour.poll();
        self.housing.poll();
        !self.is_loading()
    }

    /// Block until both loads finish. True when both were applied.
    pub fn wait(&mut self) -> bool {
        let labour = self.labour.wait();
        let housing = self.housing.wait();
        labour && housing
    }

    pub fn is_loading(&self) -> bool {
        self.labour.is_loading() || self.housing.is_loading()
    }

    /// Banners of both loads, labour first.
    pub fn banners(&self) -> Vec<&str> {
        [self.labour.banner(), self.housing.banner()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn reports(&self) -> impl Iterator<Item = &LoadReport> {
        [self.labour.report(), self.housing.report()].into_iter().flatten()
    }

    /// Rows for the current metric and housing type. Empty until both
    /// datasets have loaded.
    pub fn rows(&self) -> Vec<CorrelationRow> {
        match (self.labour.active_series(), self.housing.active_series()) {
            (Some(labour), Some(housing)) => correlate(labour, housing, self.metric, self.housing_type),
            _ => Vec::new(),
        }
    }

    pub fn dispose(self) {
        self.labour.dispose();
        self.housing.dispose();
    }
}
