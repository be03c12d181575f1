use metro_growth::models::{Dimension, Field, RawStatRecord};
use metro_growth::viz::{self, ChartSeries, ChartSpec};
use metro_growth::{SeriesSpec, aggregate};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn monthly() -> (Vec<String>, Vec<ChartSeries>) {
    let records: Vec<RawStatRecord> = [("Toronto", 1, 100), ("Toronto", 2, 140), ("Hamilton", 2, 30)]
        .into_iter()
        .map(|(city, m, n)| {
            RawStatRecord::default()
                .with(Field::CensusArea, city)
                .with(Field::Month, m as i64)
                .with(Field::TotalStarts, n as i64)
        })
        .collect();
    let result = aggregate(&records, &[SeriesSpec::starts_by_month(&["Toronto", "Hamilton"])]);
    let series = result.series("starts").unwrap();
    (
        viz::key_labels(&series.entries, &[Dimension::Month]),
        viz::chart_series(&series.entries, &series.categories),
    )
}

fn assert_svg(path: &Path) {
    let txt = fs::read_to_string(path).expect("file created");
    assert!(txt.contains("<svg"), "not an svg");
    assert!(txt.len() > 200, "svg has content");
}

#[test]
fn bars_and_lines_produce_svg() {
    let (labels, datasets) = monthly();
    assert_eq!(labels, vec!["Jan", "Feb"]);
    let dir = tempdir().unwrap();
    let spec = ChartSpec::new("Housing starts").axes("Month", "Units");

    let bars = dir.path().join("bars.svg");
    viz::plot_bars(&labels, &datasets, &spec, &bars).unwrap();
    assert_svg(&bars);
    assert!(fs::read_to_string(&bars).unwrap().contains("Housing starts"));

    let lines = dir.path().join("lines.svg");
    viz::plot_lines(&labels, &datasets, &spec, &lines).unwrap();
    assert_svg(&lines);
}

#[test]
fn percent_chart_renders() {
    let labels = vec!["High School".to_string(), "University".to_string()];
    let datasets = vec![ChartSeries {
        label: "Employment rate".into(),
        values: vec![62.5, 88.0],
    }];
    let dir = tempdir().unwrap();
    let path = dir.path().join("rates.svg");
    let spec = ChartSpec {
        percent: true,
        ..ChartSpec::new("Employment rate by education")
    };
    viz::plot_bars(&labels, &datasets, &spec, &path).unwrap();
    assert_svg(&path);
}

#[test]
fn empty_input_and_bitmap_paths_are_errors() {
    let dir = tempdir().unwrap();
    let spec = ChartSpec::new("Empty");
    assert!(viz::plot_bars(&[], &[], &spec, dir.path().join("empty.svg")).is_err());

    let (labels, datasets) = monthly();
    assert!(viz::plot_lines(&labels, &datasets, &spec, dir.path().join("chart.png")).is_err());
}

#[test]
fn dual_axis_chart_renders_both_measures() {
    let labels = vec!["Ontario".to_string(), "Quebec".to_string()];
    let starts = ChartSeries {
        label: "Total starts".into(),
        values: vec![18000.0, 9500.0],
    };
    let rate = ChartSeries {
        label: "Employment rate".into(),
        values: vec![88.5, 84.0],
    };
    let dir = tempdir().unwrap();
    let path = dir.path().join("dual.svg");
    let spec = ChartSpec {
        percent: true,
        ..ChartSpec::new("Employment rate vs. total starts").axes("Province", "Units")
    };
    viz::plot_dual(&labels, &starts, &rate, "Employment rate", &spec, &path).unwrap();
    assert_svg(&path);
    let txt = fs::read_to_string(&path).unwrap();
    assert!(txt.contains("Total starts") && txt.contains("Employment rate"));

    let short = ChartSeries {
        label: "Employment rate".into(),
        values: vec![88.5],
    };
    assert!(viz::plot_dual(&labels, &starts, &short, "Employment rate", &spec, &path).is_err());
}
