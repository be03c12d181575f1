//! Live backend tests. Run with:
//! `METRO_BASE_URL=http://localhost:8080 cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use metro_growth::dashboard::{self, DataOrigin, Dataset};
use metro_growth::{Client, DashboardConfig, SeriesSpec};

fn config() -> DashboardConfig {
    let mut cfg = DashboardConfig::default();
    cfg.apply_env();
    cfg
}

#[test]
fn housing_stats_load_from_backend() {
    let cfg = config();
    let client = Client::from_config(&cfg).unwrap();
    let specs = [
        SeriesSpec::starts_by_month(&cfg.cities),
        SeriesSpec::completions_by_month(&cfg.cities),
    ];
    let report = dashboard::load(&client, Dataset::Housing, &specs, &cfg);
    assert_eq!(report.origin, DataOrigin::Remote, "{:?}", report.banner);
    assert!(report.record_count > 0);
    assert!(report.result.key_domain.len() <= 12);
}

#[test]
fn backend_count_matches_listing() {
    let cfg = config();
    let client = Client::from_config(&cfg).unwrap();
    let listed = client.housing_stats().unwrap().len() as i64;
    assert_eq!(client.record_count().unwrap(), listed);
}

#[test]
fn labour_market_rates_are_finite() {
    let cfg = config();
    let client = Client::from_config(&cfg).unwrap();
    let dims = vec![metro_growth::Dimension::Province, metro_growth::Dimension::EducationLevel];
    let report = dashboard::load(&client, Dataset::Labour, &[SeriesSpec::labour_status_by(dims.clone())], &cfg);
    let series = report.result.series("labour_status").unwrap();
    for row in metro_growth::rates::rate_table(series, &dims) {
        assert!(row.employment_rate.is_finite());
        assert!((0.0..=100.0).contains(&row.employment_rate));
    }
}
