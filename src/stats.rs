use crate::models::{Field, RawStatRecord};
use crate::normalize::Normalizer;
use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics for one category slot of a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub category: String,
    pub count: usize,
    pub total: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute per-category statistics across the entries of a series.
pub fn series_summary(series: &Series) -> Vec<Summary> {
    let mut out = Vec::with_capacity(series.categories.len());
    for category in &series.categories {
        let mut vals = series.column(category);
        vals.sort_by(|a, b| a.total_cmp(b));
        let count = vals.len();
        let total: f64 = vals.iter().sum();
        let min = vals.first().cloned();
        let max = vals.last().cloned();
        let mean = if count > 0 {
            Some(total / count as f64)
        } else {
            None
        };
        let median = if count == 0 {
            None
        } else if count % 2 == 1 {
            Some(vals[count / 2])
        } else {
            Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
        };
        out.push(Summary {
            category: category.clone(),
            count,
            total,
            min,
            max,
            mean,
            median,
        });
    }
    out
}

/// Sum of `field` per census area, e.g. total starts by city.
pub fn area_totals(records: &[RawStatRecord], field: Field) -> BTreeMap<String, f64> {
    let normalizer = Normalizer::new([field]);
    let (normalized, _) = normalizer.normalize_all(records);
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for r in &normalized {
        *totals.entry(r.census_area.clone()).or_default() += r.number(field);
    }
    totals
}
