//! Labour-force rates over grouped status counts.
//!
//! Rates are percentages in `0..=100`. Whenever a denominator is zero the
//! caller's fallback is returned instead, so NaN or infinity never reach a chart.

use crate::lookup::{self, EMPLOYED, NOT_IN_LABOUR_FORCE, UNEMPLOYED};
use crate::models::{Dimension, GroupKey, GroupedSeriesEntry, KeyPart};
use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// Rate reported when a cell has no labour force to divide by.
pub const RATE_FALLBACK: f64 = 0.0;

/// Labour-force status tallies for one (province, education level) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub employed: u64,
    pub unemployed: u64,
    pub not_in_labour_force: u64,
}

fn slot_count(entry: &GroupedSeriesEntry, status: i64) -> u64 {
    let name = lookup::labour_status_name(status).unwrap_or(lookup::UNKNOWN);
    let v = entry.value(name);
    if v.is_finite() && v > 0.0 { v.round() as u64 } else { 0 }
}

impl StatusCounts {
    /// Read counts from an entry whose slots are labour-status names.
    pub fn from_entry(entry: &GroupedSeriesEntry) -> Self {
        Self {
            employed: slot_count(entry, EMPLOYED),
            unemployed: slot_count(entry, UNEMPLOYED),
            not_in_labour_force: slot_count(entry, NOT_IN_LABOUR_FORCE),
        }
    }

    /// Employed plus unemployed. People outside the labour force are excluded.
    pub fn labour_force(&self) -> u64 {
        self.employed + self.unemployed
    }

    pub fn population(&self) -> u64 {
        self.labour_force() + self.not_in_labour_force
    }

    pub fn employment_rate_or(&self, fallback: f64) -> f64 {
        percent(self.employed, self.labour_force(), fallback)
    }

    pub fn unemployment_rate_or(&self, fallback: f64) -> f64 {
        percent(self.unemployed, self.labour_force(), fallback)
    }

    pub fn participation_rate_or(&self, fallback: f64) -> f64 {
        percent(self.labour_force(), self.population(), fallback)
    }
}

impl Add for StatusCounts {
    type Output = StatusCounts;

    fn add(self, rhs: StatusCounts) -> StatusCounts {
        StatusCounts {
            employed: self.employed + rhs.employed,
            unemployed: self.unemployed + rhs.unemployed,
            not_in_labour_force: self.not_in_labour_force + rhs.not_in_labour_force,
        }
    }
}

impl AddAssign for StatusCounts {
    fn add_assign(&mut self, rhs: StatusCounts) {
        *self = *self + rhs;
    }
}

fn percent(part: u64, whole: u64, fallback: f64) -> f64 {
    if whole == 0 {
        fallback
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// `employed / labour force * 100`, or [`RATE_FALLBACK`] for an empty labour force.
pub fn derive_employment_rate(counts: &StatusCounts) -> f64 {
    counts.employment_rate_or(RATE_FALLBACK)
}

/// One row of an employment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub key: GroupKey,
    pub label: String,
    pub counts: StatusCounts,
    pub employment_rate: f64,
    pub unemployment_rate: f64,
    pub participation_rate: f64,
}

impl RateRow {
    pub fn new(key: GroupKey, label: String, counts: StatusCounts) -> Self {
        Self {
            key,
            label,
            employment_rate: counts.employment_rate_or(RATE_FALLBACK),
            unemployment_rate: counts.unemployment_rate_or(RATE_FALLBACK),
            participation_rate: counts.participation_rate_or(RATE_FALLBACK),
            counts,
        }
    }
}

/// Rates for every entry of a labour-status series (see
/// [`SeriesSpec::labour_status_by`](crate::series::SeriesSpec::labour_status_by)).
/// `dimensions` are the series' group dimensions, used for row labels.
pub fn rate_table(series: &Series, dimensions: &[Dimension]) -> Vec<RateRow> {
    series
        .entries
        .iter()
        .map(|e| {
            RateRow::new(
                e.key.clone(),
                lookup::key_label(&e.key, dimensions),
                StatusCounts::from_entry(e),
            )
        })
        .collect()
}

/// Rows whose key part at `part` equals `code`.
pub fn filter_part(rows: &[RateRow], part: usize, code: i64) -> Vec<RateRow> {
    rows.iter()
        .filter(|r| r.key.parts().get(part) == Some(&KeyPart::Number(code)))
        .cloned()
        .collect()
}

/// Employment rates laid out for a line chart: one x position per distinct
/// key part at `x_part`, one line per distinct key part at `line_part`.
/// Cells with no row get [`RATE_FALLBACK`].
pub fn employment_grid(
    rows: &[RateRow],
    (x_part, x_dim): (usize, Dimension),
    (line_part, line_dim): (usize, Dimension),
) -> (Vec<String>, Vec<(String, Vec<f64>)>) {
    let mut cells: BTreeMap<(KeyPart, KeyPart), f64> = BTreeMap::new();
    for row in rows {
        let parts = row.key.parts();
        if let (Some(x), Some(line)) = (parts.get(x_part), parts.get(line_part)) {
            cells.insert((line.clone(), x.clone()), row.employment_rate);
        }
    }
    let mut xs: Vec<&KeyPart> = cells.keys().map(|(_, x)| x).collect();
    xs.sort();
    xs.dedup();
    let mut lines: Vec<&KeyPart> = cells.keys().map(|(l, _)| l).collect();
    lines.dedup();

    let label = |p: &KeyPart, dim: Dimension| lookup::key_label(&GroupKey(vec![p.clone()]), &[dim]);
    let labels = xs.iter().map(|x| label(x, x_dim)).collect();
    let series = lines
        .iter()
        .map(|l| {
            let values = xs
                .iter()
                .map(|x| {
                    cells
                        .get(&((*l).clone(), (*x).clone()))
                        .copied()
                        .unwrap_or(RATE_FALLBACK)
                })
                .collect();
            (label(l, line_dim), values)
        })
        .collect();
    (labels, series)
}

/// Merge rows on the key part at `part`, summing counts and recomputing rates.
/// The new keys have a single part labelled through `dimension`.
pub fn rollup(rows: &[RateRow], part: usize, dimension: Dimension) -> Vec<RateRow> {
    let mut merged: BTreeMap<KeyPart, StatusCounts> = BTreeMap::new();
    for row in rows {
        if let Some(p) = row.key.parts().get(part) {
            *merged.entry(p.clone()).or_default() += row.counts;
        }
    }
    merged
        .into_iter()
        .map(|(p, counts)| {
            let key = GroupKey(vec![p]);
            let label = lookup::key_label(&key, &[dimension]);
            RateRow::new(key, label, counts)
        })
        .collect()
}
