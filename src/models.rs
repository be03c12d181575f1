use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A record field exactly as the backend sent it.
///
/// The backend is not trusted to send consistent types: `month` has been seen
/// as a number, a numeric string and `null`. Every field is captured as-is and
/// only interpreted later by the normalizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loose {
    /// Missing from the object, or explicitly `null`.
    #[default]
    Absent,
    Number(f64),
    Text(String),
    /// Booleans, arrays or objects, kept as their JSON text.
    Other(String),
}

impl Loose {
    pub fn is_absent(&self) -> bool {
        matches!(self, Loose::Absent)
    }

    /// Integer prefix parse: `7`, `7.9`, `"7"` and `" 7th"` all give `7`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Loose::Number(v) if v.is_finite() => Some(v.trunc() as i64),
            Loose::Text(s) => parse_int_prefix(s),
            _ => None,
        }
    }

    /// Numeric value, accepting numeric strings. Non-finite values are rejected.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Loose::Number(v) if v.is_finite() => Some(*v),
            Loose::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Text label; numbers are rendered without a trailing `.0`.
    /// Blank strings count as missing.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Loose::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            // Beyond i64 range the cast saturates; keep those distinct.
            Loose::Number(v) if v.fract() == 0.0 && v.abs() < I64_LIMIT => Some(format!("{}", *v as i64)),
            Loose::Number(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

/// 2^63: whole floats below this magnitude convert to `i64` exactly.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

impl From<Value> for Loose {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Loose::Absent,
            Value::Number(n) => match n.as_f64() {
                Some(f) => Loose::Number(f),
                None => Loose::Other(n.to_string()),
            },
            Value::String(s) => Loose::Text(s),
            other => Loose::Other(other.to_string()),
        }
    }
}

impl From<f64> for Loose {
    fn from(v: f64) -> Self {
        Loose::Number(v)
    }
}

impl From<i64> for Loose {
    fn from(v: i64) -> Self {
        Loose::Number(v as f64)
    }
}

impl From<&str> for Loose {
    fn from(s: &str) -> Self {
        Loose::Text(s.to_string())
    }
}

impl<'de> Deserialize<'de> for Loose {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Loose::from)
    }
}

impl Serialize for Loose {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Loose::Absent => serializer.serialize_none(),
            Loose::Number(v) => serializer.serialize_f64(*v),
            Loose::Text(s) | Loose::Other(s) => serializer.serialize_str(s),
        }
    }
}

/// Raw record from a stats endpoint (housing or labour market).
///
/// Both record families share one shape; fields that do not apply to a family
/// are simply absent. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatRecord {
    pub id: Loose,
    #[serde(alias = "census_metropolitan_area")]
    pub census_area: Loose,
    pub month: Loose,
    #[serde(alias = "total_starts")]
    pub total_starts: Loose,
    #[serde(alias = "total_complete")]
    pub total_complete: Loose,
    #[serde(alias = "singlesStarts", alias = "singles_starts")]
    pub single_starts: Loose,
    #[serde(alias = "semis_starts")]
    pub semis_starts: Loose,
    #[serde(alias = "row_starts")]
    pub row_starts: Loose,
    #[serde(alias = "apartment_starts")]
    pub apartment_starts: Loose,
    #[serde(alias = "singles_complete")]
    pub singles_complete: Loose,
    #[serde(alias = "semis_complete")]
    pub semis_complete: Loose,
    #[serde(alias = "row_complete")]
    pub row_complete: Loose,
    #[serde(alias = "apartment_complete")]
    pub apartment_complete: Loose,
    pub province: Loose,
    #[serde(alias = "education_level")]
    pub education_level: Loose,
    #[serde(alias = "labour_force_status")]
    pub labour_force_status: Loose,
}

impl RawStatRecord {
    pub fn field(&self, field: Field) -> &Loose {
        match field {
            Field::CensusArea => &self.census_area,
            Field::Month => &self.month,
            Field::TotalStarts => &self.total_starts,
            Field::TotalComplete => &self.total_complete,
            Field::SinglesStarts => &self.single_starts,
            Field::SemisStarts => &self.semis_starts,
            Field::RowStarts => &self.row_starts,
            Field::ApartmentStarts => &self.apartment_starts,
            Field::SinglesComplete => &self.singles_complete,
            Field::SemisComplete => &self.semis_complete,
            Field::RowComplete => &self.row_complete,
            Field::ApartmentComplete => &self.apartment_complete,
            Field::Province => &self.province,
            Field::EducationLevel => &self.education_level,
            Field::LabourForceStatus => &self.labour_force_status,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut Loose {
        match field {
            Field::CensusArea => &mut self.census_area,
            Field::Month => &mut self.month,
            Field::TotalStarts => &mut self.total_starts,
            Field::TotalComplete => &mut self.total_complete,
            Field::SinglesStarts => &mut self.single_starts,
            Field::SemisStarts => &mut self.semis_starts,
            Field::RowStarts => &mut self.row_starts,
            Field::ApartmentStarts => &mut self.apartment_starts,
            Field::SinglesComplete => &mut self.singles_complete,
            Field::SemisComplete => &mut self.semis_complete,
            Field::RowComplete => &mut self.row_complete,
            Field::ApartmentComplete => &mut self.apartment_complete,
            Field::Province => &mut self.province,
            Field::EducationLevel => &mut self.education_level,
            Field::LabourForceStatus => &mut self.labour_force_status,
        }
    }

    /// Builder-style setter, mostly for synthetic data and tests.
    pub fn with(mut self, field: Field, value: impl Into<Loose>) -> Self {
        *self.field_mut(field) = value.into();
        self
    }
}

/// Named record fields the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    CensusArea,
    Month,
    TotalStarts,
    TotalComplete,
    SinglesStarts,
    SemisStarts,
    RowStarts,
    ApartmentStarts,
    SinglesComplete,
    SemisComplete,
    RowComplete,
    ApartmentComplete,
    Province,
    EducationLevel,
    LabourForceStatus,
}

impl Field {
    pub const NUMERIC: [Field; 10] = [
        Field::TotalStarts,
        Field::TotalComplete,
        Field::SinglesStarts,
        Field::SemisStarts,
        Field::RowStarts,
        Field::ApartmentStarts,
        Field::SinglesComplete,
        Field::SemisComplete,
        Field::RowComplete,
        Field::ApartmentComplete,
    ];

    pub const HOUSING_TYPE_STARTS: [Field; 4] = [
        Field::SinglesStarts,
        Field::SemisStarts,
        Field::RowStarts,
        Field::ApartmentStarts,
    ];

    pub const HOUSING_TYPE_COMPLETIONS: [Field; 4] = [
        Field::SinglesComplete,
        Field::SemisComplete,
        Field::RowComplete,
        Field::ApartmentComplete,
    ];

    /// Wire name as sent by the backend.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Field::CensusArea => "censusArea",
            Field::Month => "month",
            Field::TotalStarts => "totalStarts",
            Field::TotalComplete => "totalComplete",
            Field::SinglesStarts => "singleStarts",
            Field::SemisStarts => "semisStarts",
            Field::RowStarts => "rowStarts",
            Field::ApartmentStarts => "apartmentStarts",
            Field::SinglesComplete => "singlesComplete",
            Field::SemisComplete => "semisComplete",
            Field::RowComplete => "rowComplete",
            Field::ApartmentComplete => "apartmentComplete",
            Field::Province => "province",
            Field::EducationLevel => "educationLevel",
            Field::LabourForceStatus => "labourForceStatus",
        }
    }

    /// Human label used for slots and legends.
    pub fn label(&self) -> &'static str {
        match self {
            Field::CensusArea => "Census Area",
            Field::Month => "Month",
            Field::TotalStarts => "Housing Starts",
            Field::TotalComplete => "Housing Completions",
            Field::SinglesStarts | Field::SinglesComplete => "Singles",
            Field::SemisStarts | Field::SemisComplete => "Semis",
            Field::RowStarts | Field::RowComplete => "Townhomes",
            Field::ApartmentStarts | Field::ApartmentComplete => "Apartments",
            Field::Province => "Province",
            Field::EducationLevel => "Education Level",
            Field::LabourForceStatus => "Labour Force Status",
        }
    }

    pub fn is_numeric(&self) -> bool {
        Field::NUMERIC.contains(self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Record attributes that can key a group or a category slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Month,
    CensusArea,
    Province,
    EducationLevel,
    LabourForceStatus,
}

impl Dimension {
    pub fn field(&self) -> Field {
        match self {
            Dimension::Month => Field::Month,
            Dimension::CensusArea => Field::CensusArea,
            Dimension::Province => Field::Province,
            Dimension::EducationLevel => Field::EducationLevel,
            Dimension::LabourForceStatus => Field::LabourForceStatus,
        }
    }
}

/// What a slot accumulates per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    /// One per record.
    Count,
    /// The record's value for a numeric field.
    Sum(Field),
}

impl Measure {
    pub fn label(&self) -> &'static str {
        match self {
            Measure::Count => "Count",
            Measure::Sum(field) => field.label(),
        }
    }

    pub fn field(&self) -> Option<Field> {
        match self {
            Measure::Count => None,
            Measure::Sum(field) => Some(*field),
        }
    }
}

/// One component of a group key. Numbers order before labels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Number(i64),
    Label(String),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Number(n) => write!(f, "{}", n),
            KeyPart::Label(s) => f.write_str(s),
        }
    }
}

/// Grouping key of a series entry, e.g. `[1]` for January or
/// `[1, 3]` for (Ontario, University). Ordered part by part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    pub fn number(n: i64) -> Self {
        GroupKey(vec![KeyPart::Number(n)])
    }

    pub fn label(s: impl Into<String>) -> Self {
        GroupKey(vec![KeyPart::Label(s.into())])
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// The value of a single-part numeric key.
    pub fn as_number(&self) -> Option<i64> {
        match self.0.as_slice() {
            [KeyPart::Number(n)] => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// One row of a series: a group key and one accumulator per category slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedSeriesEntry {
    pub key: GroupKey,
    pub values: BTreeMap<String, f64>,
}

impl GroupedSeriesEntry {
    /// New entry with every slot at zero.
    pub fn new<S: AsRef<str>>(key: GroupKey, slots: &[S]) -> Self {
        let values = slots.iter().map(|s| (s.as_ref().to_string(), 0.0)).collect();
        Self { key, values }
    }

    /// Slot value; slots the entry never saw read as zero.
    pub fn value(&self, slot: &str) -> f64 {
        self.values.get(slot).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

/// Why a default was substituted while normalizing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    MissingGroupKey,
    InvalidGroupKey,
    MissingCategory,
    InvalidCategory,
    UnrecognizedCode,
    MissingNumber,
    InvalidNumber,
}

/// Non-fatal note about a record that needed a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Position of the record in the fetched array.
    pub record_index: usize,
    pub field: Field,
    pub kind: DiagnosticKind,
    /// What the record now carries for that field.
    pub applied: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record #{}: {} {:?}, using {}",
            self.record_index, self.field, self.kind, self.applied
        )
    }
}
