//! Series specs, the aggregation entry point, and the result handed to views.

use crate::accumulator::Accumulator;
use crate::lookup;
use crate::models::{Diagnostic, Dimension, Field, GroupKey, GroupedSeriesEntry, Measure, RawStatRecord};
use crate::normalize::{NormalizedRecord, Normalizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the slots of a series are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slots {
    /// One slot per category value (e.g. per city), all fed by one measure.
    /// `declared` slots exist in every entry even when no record hits them.
    ByCategory {
        dimensions: Vec<Dimension>,
        measure: Measure,
        declared: Vec<String>,
    },
    /// One slot per measure (e.g. per housing type).
    ByMeasure(Vec<Measure>),
}

/// Describes one output series of an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub name: String,
    pub group_by: Vec<Dimension>,
    pub slots: Slots,
}

fn owned<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_string()).collect()
}

impl SeriesSpec {
    pub fn new(name: impl Into<String>, group_by: Vec<Dimension>, slots: Slots) -> Self {
        Self {
            name: name.into(),
            group_by,
            slots,
        }
    }

    /// Per-month sums of `field`, one slot per census area.
    pub fn monthly_by_area<S: AsRef<str>>(name: &str, field: Field, areas: &[S]) -> Self {
        Self::new(
            name,
            vec![Dimension::Month],
            Slots::ByCategory {
                dimensions: vec![Dimension::CensusArea],
                measure: Measure::Sum(field),
                declared: owned(areas),
            },
        )
    }

    /// The `starts` series of the monthly comparison view.
    pub fn starts_by_month<S: AsRef<str>>(areas: &[S]) -> Self {
        Self::monthly_by_area("starts", Field::TotalStarts, areas)
    }

    /// The `completions` series of the monthly comparison view.
    pub fn completions_by_month<S: AsRef<str>>(areas: &[S]) -> Self {
        Self::monthly_by_area("completions", Field::TotalComplete, areas)
    }

    /// Housing-type distribution per census area: singles, semis, townhomes
    /// and apartments, either started or completed.
    pub fn housing_types_by_area(completions: bool) -> Self {
        let (name, fields) = if completions {
            ("type_completions", Field::HOUSING_TYPE_COMPLETIONS)
        } else {
            ("type_starts", Field::HOUSING_TYPE_STARTS)
        };
        Self::new(
            name,
            vec![Dimension::CensusArea],
            Slots::ByMeasure(fields.into_iter().map(Measure::Sum).collect()),
        )
    }

    /// Record counts per labour-force status, grouped by `group_by`.
    pub fn labour_status_by(group_by: Vec<Dimension>) -> Self {
        Self::new(
            "labour_status",
            group_by,
            Slots::ByCategory {
                dimensions: vec![Dimension::LabourForceStatus],
                measure: Measure::Count,
                declared: lookup::LABOUR_STATUSES
                    .iter()
                    .map(|(_, name)| name.to_string())
                    .collect(),
            },
        )
    }

    /// Record fields this spec reads.
    pub fn fields(&self) -> Vec<Field> {
        let mut out: Vec<Field> = self.group_by.iter().map(|d| d.field()).collect();
        match &self.slots {
            Slots::ByCategory {
                dimensions,
                measure,
                ..
            } => {
                out.extend(dimensions.iter().map(|d| d.field()));
                out.extend(measure.field());
            }
            Slots::ByMeasure(measures) => out.extend(measures.iter().filter_map(|m| m.field())),
        }
        out
    }

    fn declared_slots(&self) -> Vec<String> {
        match &self.slots {
            Slots::ByCategory { declared, .. } => declared.clone(),
            Slots::ByMeasure(measures) => measures.iter().map(|m| m.label().to_string()).collect(),
        }
    }

    pub fn group_key(&self, record: &NormalizedRecord) -> GroupKey {
        GroupKey(self.group_by.iter().map(|d| record.key_part(*d)).collect())
    }

    fn apply(&self, acc: &mut Accumulator, record: &NormalizedRecord) -> GroupKey {
        let key = self.group_key(record);
        match &self.slots {
            Slots::ByCategory {
                dimensions,
                measure,
                ..
            } => {
                let category = dimensions
                    .iter()
                    .map(|d| record.category_label(*d))
                    .collect::<Vec<_>>()
                    .join(" / ");
                acc.upsert(&key, &category, amount(*measure, record));
            }
            Slots::ByMeasure(measures) => {
                for m in measures {
                    acc.upsert(&key, m.label(), amount(*m, record));
                }
            }
        }
        key
    }
}

fn amount(measure: Measure, record: &NormalizedRecord) -> f64 {
    match measure {
        Measure::Count => 1.0,
        Measure::Sum(field) => record.number(field),
    }
}

/// One ordered series: entries sorted ascending by group key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// Slot names in display order.
    pub categories: Vec<String>,
    pub entries: Vec<GroupedSeriesEntry>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&GroupKey> {
        self.entries.iter().map(|e| &e.key).collect()
    }

    pub fn entry(&self, key: &GroupKey) -> Option<&GroupedSeriesEntry> {
        self.entries
            .binary_search_by(|e| e.key.cmp(key))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Entries visible under a filter: everything when `selected` is `None`,
    /// otherwise the single matching entry (or nothing).
    pub fn filter(&self, selected: Option<&GroupKey>) -> &[GroupedSeriesEntry] {
        match selected {
            None => &self.entries,
            Some(key) => match self.entries.binary_search_by(|e| e.key.cmp(key)) {
                Ok(i) => &self.entries[i..=i],
                Err(_) => &[],
            },
        }
    }

    /// Column of values for one slot across the entries, in key order.
    pub fn column(&self, category: &str) -> Vec<f64> {
        self.entries.iter().map(|e| e.value(category)).collect()
    }
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub series: Vec<Series>,
    /// Distinct group keys seen across all input records, ascending.
    pub key_domain: Vec<GroupKey>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AggregationResult {
    /// Result with no series at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    /// True when no series has any entry.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(Series::is_empty)
    }

    /// Entries of series `name` under an optional key filter.
    pub fn filtered(&self, name: &str, selected: Option<&GroupKey>) -> &[GroupedSeriesEntry] {
        self.series(name).map(|s| s.filter(selected)).unwrap_or(&[])
    }
}

/// Normalize `records` and fold them into one series per spec.
///
/// Total: malformed records are defaulted (see [`Normalizer`]) and an empty
/// input yields empty series with an empty key domain.
pub fn aggregate(records: &[RawStatRecord], specs: &[SeriesSpec]) -> AggregationResult {
    let normalizer = Normalizer::new(specs.iter().flat_map(|s| s.fields()));
    let (normalized, diagnostics) = normalizer.normalize_all(records);
    if !diagnostics.is_empty() {
        log::warn!(
            "{} default(s) applied while normalizing {} record(s)",
            diagnostics.len(),
            records.len()
        );
    }
    build(&normalized, specs, diagnostics)
}

/// Fold already-normalized records into series.
pub fn build(
    records: &[NormalizedRecord],
    specs: &[SeriesSpec],
    diagnostics: Vec<Diagnostic>,
) -> AggregationResult {
    let mut domain: BTreeSet<GroupKey> = BTreeSet::new();
    let mut series = Vec::with_capacity(specs.len());
    for spec in specs {
        let declared = spec.declared_slots();
        let mut acc = Accumulator::new(declared.as_slice());
        for record in records {
            domain.insert(spec.apply(&mut acc, record));
        }
        log::debug!("series '{}': {} entries", spec.name, acc.len());
        series.push(acc.finish(&spec.name));
    }
    AggregationResult {
        series,
        key_domain: domain.into_iter().collect(),
        diagnostics,
    }
}
