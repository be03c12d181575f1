//! Deterministic baseline records for when the backend is unavailable.
//!
//! Only used when `use_synthetic_fallback` is enabled. The numbers are fixed
//! yearly baselines per city spread over the months with a construction-season
//! profile, plus a labour survey whose employment rate rises with education.

use crate::lookup;
use crate::models::{Field, RawStatRecord};

/// Yearly (starts, completions) per housing type: singles, semis, row, apartments.
struct CityBaseline {
    name: &'static str,
    starts: [f64; 4],
    completions: [f64; 4],
}

const BASELINES: &[CityBaseline] = &[
    CityBaseline {
        name: "Vancouver",
        starts: [1200.0, 850.0, 1700.0, 4500.0],
        completions: [1100.0, 820.0, 1600.0, 4200.0],
    },
    CityBaseline {
        name: "Toronto",
        starts: [2000.0, 1800.0, 3200.0, 9800.0],
        completions: [1950.0, 1750.0, 3100.0, 9500.0],
    },
    CityBaseline {
        name: "Montreal",
        starts: [1100.0, 950.0, 1300.0, 6200.0],
        completions: [1050.0, 900.0, 1250.0, 5900.0],
    },
    CityBaseline {
        name: "Edmonton",
        starts: [1500.0, 650.0, 1400.0, 2800.0],
        completions: [1450.0, 600.0, 1350.0, 2600.0],
    },
    CityBaseline {
        name: "Ottawa-Gatineau",
        starts: [900.0, 700.0, 1100.0, 3500.0],
        completions: [850.0, 680.0, 1050.0, 3300.0],
    },
    CityBaseline {
        name: "Hamilton",
        starts: [420.0, 160.0, 610.0, 1350.0],
        completions: [400.0, 150.0, 580.0, 1200.0],
    },
];

/// Used for cities without a baseline of their own.
const GENERIC: CityBaseline = CityBaseline {
    name: "",
    starts: [300.0, 120.0, 250.0, 600.0],
    completions: [280.0, 110.0, 240.0, 560.0],
};

/// Share of the yearly volume falling in each month; sums to 12.
const SEASON: [f64; 12] = [
    0.6, 0.65, 0.85, 1.05, 1.2, 1.25, 1.3, 1.25, 1.1, 0.95, 0.8, 1.0,
];

fn baseline(city: &str) -> &'static CityBaseline {
    BASELINES.iter().find(|b| b.name == city).unwrap_or(&GENERIC)
}

fn monthly(yearly: f64, month: usize) -> f64 {
    (yearly / 12.0 * SEASON[month]).round()
}

/// Twelve months of housing records for each city.
pub fn housing_records<S: AsRef<str>>(cities: &[S]) -> Vec<RawStatRecord> {
    let mut out = Vec::with_capacity(cities.len() * 12);
    for city in cities {
        let city = city.as_ref();
        let b = baseline(city);
        for m in 0..12 {
            let starts: Vec<f64> = b.starts.iter().map(|y| monthly(*y, m)).collect();
            let completions: Vec<f64> = b.completions.iter().map(|y| monthly(*y, m)).collect();
            let mut r = RawStatRecord::default()
                .with(Field::CensusArea, city)
                .with(Field::Month, (m + 1) as i64)
                .with(Field::TotalStarts, starts.iter().sum::<f64>())
                .with(Field::TotalComplete, completions.iter().sum::<f64>());
            for (i, field) in Field::HOUSING_TYPE_STARTS.into_iter().enumerate() {
                r = r.with(field, starts[i]);
            }
            for (i, field) in Field::HOUSING_TYPE_COMPLETIONS.into_iter().enumerate() {
                r = r.with(field, completions[i]);
            }
            out.push(r);
        }
    }
    out
}

/// Labour survey responses for the four largest provinces and every
/// education level.
pub fn labour_records() -> Vec<RawStatRecord> {
    let mut out = Vec::new();
    let mut id = 1i64;
    for province in 1..=4i64 {
        for &(education, _) in lookup::EDUCATION_LEVELS {
            let employed = 55 + 8 * education + province;
            let unemployed = 9 - education;
            let outside = 30 - 2 * education;
            for (status, n) in [
                (lookup::EMPLOYED, employed),
                (lookup::UNEMPLOYED, unemployed),
                (lookup::NOT_IN_LABOUR_FORCE, outside),
            ] {
                for _ in 0..n {
                    let mut r = RawStatRecord::default()
                        .with(Field::Province, province)
                        .with(Field::EducationLevel, education)
                        .with(Field::LabourForceStatus, status);
                    r.id = id.into();
                    out.push(r);
                    id += 1;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_profile_sums_to_twelve() {
        assert!((SEASON.iter().sum::<f64>() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn housing_records_cover_every_month_and_city() {
        let records = housing_records(&["Toronto", "Kingston"]);
        assert_eq!(records.len(), 24);
        assert_eq!(records[0].census_area.as_label().as_deref(), Some("Toronto"));
        assert_eq!(records[23].month.as_int(), Some(12));
        assert!(records.iter().all(|r| r.total_starts.as_number().unwrap_or(0.0) > 0.0));
    }
}
