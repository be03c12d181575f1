//! Read-only code tables for the labour-market survey and month labels.

use crate::models::{Dimension, GroupKey, KeyPart};

/// Bucket name for records without a usable category.
pub const UNKNOWN: &str = "Unknown";

/// Cities compared by the monthly starts/completions views.
pub const DEFAULT_CITIES: &[&str] = &["Toronto", "Hamilton"];

/// Cities shown by the housing-type distribution view.
pub const HOUSING_TYPE_CITIES: &[&str] = &[
    "Vancouver",
    "Toronto",
    "Montreal",
    "Edmonton",
    "Ottawa-Gatineau",
];

pub const PROVINCES: &[(i64, &str)] = &[
    (1, "Ontario"),
    (2, "Quebec"),
    (3, "British Columbia"),
    (4, "Alberta"),
    (5, "Manitoba"),
    (6, "Saskatchewan"),
    (7, "Nova Scotia"),
    (8, "New Brunswick"),
    (9, "Newfoundland and Labrador"),
    (10, "Prince Edward Island"),
];

/// Province code of each census metropolitan area the backend reports.
/// Ottawa-Gatineau straddles a border and is counted under Ontario.
pub const AREA_PROVINCES: &[(&str, i64)] = &[
    ("Toronto", 1),
    ("Hamilton", 1),
    ("Ottawa-Gatineau", 1),
    ("Kitchener-Cambridge-Waterloo", 1),
    ("London", 1),
    ("Montreal", 2),
    ("Quebec", 2),
    ("Trois Rivières", 2),
    ("Vancouver", 3),
    ("Victoria", 3),
    ("Calgary", 4),
    ("Edmonton", 4),
    ("Winnipeg", 5),
    ("Saskatoon", 6),
    ("Regina", 6),
    ("Halifax", 7),
    ("Moncton", 8),
    ("St. John's", 9),
    ("Charlottetown", 10),
];

pub const EDUCATION_LEVELS: &[(i64, &str)] = &[
    (1, "High School"),
    (2, "College"),
    (3, "University"),
    (4, "Post Graduate"),
];

pub const EMPLOYED: i64 = 1;
pub const UNEMPLOYED: i64 = 2;
pub const NOT_IN_LABOUR_FORCE: i64 = 3;

pub const LABOUR_STATUSES: &[(i64, &str)] = &[
    (EMPLOYED, "Employed"),
    (UNEMPLOYED, "Unemployed"),
    (NOT_IN_LABOUR_FORCE, "Not in Labour Force"),
];

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn find(table: &[(i64, &'static str)], code: i64) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

pub fn province_name(code: i64) -> Option<&'static str> {
    find(PROVINCES, code)
}

pub fn province_of_area(area: &str) -> Option<i64> {
    AREA_PROVINCES
        .iter()
        .find(|(name, _)| *name == area)
        .map(|(_, code)| *code)
}

pub fn education_name(code: i64) -> Option<&'static str> {
    find(EDUCATION_LEVELS, code)
}

pub fn labour_status_name(code: i64) -> Option<&'static str> {
    find(LABOUR_STATUSES, code)
}

/// Short month label for axis ticks. Out-of-range months are clamped into
/// Jan..Dec so a bad record never breaks a chart.
pub fn month_abbr(month: i64) -> &'static str {
    MONTH_ABBREVIATIONS[month.saturating_sub(1).clamp(0, 11) as usize]
}

/// Full month name for filter controls, `Month N` when out of range.
pub fn month_name(month: i64) -> String {
    if (1..=12).contains(&month) {
        MONTH_NAMES[(month - 1) as usize].to_string()
    } else {
        format!("Month {}", month)
    }
}

/// Whether `code` is a known value for a coded dimension.
/// Month and census area are not coded and always pass.
pub fn is_known_code(dimension: Dimension, code: i64) -> bool {
    match dimension {
        Dimension::Province => province_name(code).is_some(),
        Dimension::EducationLevel => education_name(code).is_some(),
        Dimension::LabourForceStatus => labour_status_name(code).is_some(),
        Dimension::Month | Dimension::CensusArea => true,
    }
}

/// Display label for a coded value. Code `0` marks a missing value; other
/// unknown codes keep their own bucket, e.g. `Province 42`.
pub fn code_label(dimension: Dimension, code: i64) -> String {
    let known = match dimension {
        Dimension::Province => province_name(code),
        Dimension::EducationLevel => education_name(code),
        Dimension::LabourForceStatus => labour_status_name(code),
        Dimension::Month => return month_name(code),
        Dimension::CensusArea => return code.to_string(),
    };
    match known {
        Some(name) => name.to_string(),
        None if code == 0 => UNKNOWN.to_string(),
        None => {
            let kind = match dimension {
                Dimension::Province => "Province",
                Dimension::EducationLevel => "Education",
                _ => "Status",
            };
            format!("{} {}", kind, code)
        }
    }
}

/// Human label for a group key whose parts follow `dimensions`.
pub fn key_label(key: &GroupKey, dimensions: &[Dimension]) -> String {
    key.parts()
        .iter()
        .enumerate()
        .map(|(i, part)| match (part, dimensions.get(i)) {
            (KeyPart::Number(n), Some(Dimension::Month)) => month_abbr(*n).to_string(),
            (KeyPart::Number(n), Some(dim)) => code_label(*dim, *n),
            (other, _) => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" / ")
}
