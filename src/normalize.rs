//! Record normalization: the one place where loosely-typed backend fields
//! are turned into typed values, with defaults and diagnostics.

use crate::lookup::{self, UNKNOWN};
use crate::models::{Diagnostic, DiagnosticKind, Dimension, Field, KeyPart, Loose, RawStatRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Month assigned to records whose month is missing or unparseable.
pub const DEFAULT_MONTH: i64 = 1;

/// A record after defaults were applied. Every field has a value.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub index: usize,
    pub census_area: String,
    pub month: i64,
    /// Survey codes; `0` when the record carried none.
    pub province: i64,
    pub education_level: i64,
    pub labour_force_status: i64,
    numbers: BTreeMap<Field, f64>,
}

impl NormalizedRecord {
    /// Value of a numeric field, `0` for non-numeric fields.
    pub fn number(&self, field: Field) -> f64 {
        self.numbers.get(&field).copied().unwrap_or(0.0)
    }

    pub fn key_part(&self, dimension: Dimension) -> KeyPart {
        match dimension {
            Dimension::Month => KeyPart::Number(self.month),
            Dimension::CensusArea => KeyPart::Label(self.census_area.clone()),
            Dimension::Province => KeyPart::Number(self.province),
            Dimension::EducationLevel => KeyPart::Number(self.education_level),
            Dimension::LabourForceStatus => KeyPart::Number(self.labour_force_status),
        }
    }

    /// Category label for a dimension: census areas verbatim, codes through
    /// the lookup tables.
    pub fn category_label(&self, dimension: Dimension) -> String {
        match dimension {
            Dimension::Month => lookup::month_abbr(self.month).to_string(),
            Dimension::CensusArea => self.census_area.clone(),
            Dimension::Province => lookup::code_label(dimension, self.province),
            Dimension::EducationLevel => lookup::code_label(dimension, self.education_level),
            Dimension::LabourForceStatus => {
                lookup::code_label(dimension, self.labour_force_status)
            }
        }
    }
}

/// Applies defaults to raw records.
///
/// Diagnostics are only raised for the fields in scope, so a housing run does
/// not complain about housing records lacking a `province`.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    scope: BTreeSet<Field>,
}

impl Normalizer {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            scope: fields.into_iter().collect(),
        }
    }

    /// Normalizer that reports on every known field.
    pub fn all() -> Self {
        let mut scope: BTreeSet<Field> = Field::NUMERIC.into_iter().collect();
        scope.extend([
            Field::CensusArea,
            Field::Month,
            Field::Province,
            Field::EducationLevel,
            Field::LabourForceStatus,
        ]);
        Self { scope }
    }

    pub fn in_scope(&self, field: Field) -> bool {
        self.scope.contains(&field)
    }

    /// Normalize one record. Never fails; substituted defaults are appended
    /// to `diagnostics`.
    pub fn normalize(
        &self,
        index: usize,
        record: &RawStatRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> NormalizedRecord {
        let mut note = |field: Field, kind: DiagnosticKind, applied: String| {
            if self.in_scope(field) {
                let d = Diagnostic {
                    record_index: index,
                    field,
                    kind,
                    applied,
                };
                match kind {
                    DiagnosticKind::MissingNumber => log::debug!("{}", d),
                    _ => log::warn!("{}", d),
                }
                diagnostics.push(d);
            }
        };

        let month = match &record.month {
            Loose::Absent => {
                note(Field::Month, DiagnosticKind::MissingGroupKey, DEFAULT_MONTH.to_string());
                DEFAULT_MONTH
            }
            raw => match raw.as_int() {
                Some(m) => m,
                None => {
                    note(Field::Month, DiagnosticKind::InvalidGroupKey, DEFAULT_MONTH.to_string());
                    DEFAULT_MONTH
                }
            },
        };

        let census_area = match record.census_area.as_label() {
            Some(area) => area,
            None => {
                let kind = if matches!(record.census_area, Loose::Absent | Loose::Text(_)) {
                    DiagnosticKind::MissingCategory
                } else {
                    DiagnosticKind::InvalidCategory
                };
                note(Field::CensusArea, kind, UNKNOWN.to_string());
                UNKNOWN.to_string()
            }
        };

        let mut code = |dimension: Dimension| -> i64 {
            let field = dimension.field();
            let raw = record.field(field);
            match raw.as_int() {
                Some(c) => {
                    if !lookup::is_known_code(dimension, c) {
                        note(field, DiagnosticKind::UnrecognizedCode, c.to_string());
                    }
                    c
                }
                None if raw.is_absent() => {
                    note(field, DiagnosticKind::MissingCategory, "0".to_string());
                    0
                }
                None => {
                    note(field, DiagnosticKind::InvalidCategory, "0".to_string());
                    0
                }
            }
        };
        let province = code(Dimension::Province);
        let education_level = code(Dimension::EducationLevel);
        let labour_force_status = code(Dimension::LabourForceStatus);

        let mut numbers = BTreeMap::new();
        for field in Field::NUMERIC {
            let raw = record.field(field);
            let value = match raw.as_number() {
                Some(v) => v,
                None if raw.is_absent() => {
                    note(field, DiagnosticKind::MissingNumber, "0".to_string());
                    0.0
                }
                None => {
                    note(field, DiagnosticKind::InvalidNumber, "0".to_string());
                    0.0
                }
            };
            numbers.insert(field, value);
        }

        NormalizedRecord {
            index,
            census_area,
            month,
            province,
            education_level,
            labour_force_status,
            numbers,
        }
    }

    /// Normalize a batch, returning records in input order plus all diagnostics.
    pub fn normalize_all(&self, records: &[RawStatRecord]) -> (Vec<NormalizedRecord>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let normalized = records
            .iter()
            .enumerate()
            .map(|(i, r)| self.normalize(i, r, &mut diagnostics))
            .collect();
        (normalized, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> RawStatRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn missing_month_defaults_to_one_with_diagnostic() {
        let n = Normalizer::new([Field::Month, Field::CensusArea, Field::TotalStarts]);
        let mut diags = Vec::new();
        let out = n.normalize(0, &record(r#"{"censusArea":"Toronto","totalStarts":5}"#), &mut diags);
        assert_eq!(out.month, 1);
        assert_eq!(out.census_area, "Toronto");
        assert_eq!(out.number(Field::TotalStarts), 5.0);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::MissingGroupKey);
    }

    #[test]
    fn out_of_scope_fields_stay_quiet() {
        let n = Normalizer::new([Field::Month]);
        let mut diags = Vec::new();
        let out = n.normalize(3, &record(r#"{"month":"4"}"#), &mut diags);
        assert_eq!(out.month, 4);
        assert_eq!(out.census_area, UNKNOWN);
        assert_eq!(out.province, 0);
        assert!(diags.is_empty());
    }
}
