//! SVG charts for grouped series: grouped bars, multi-series lines and a
//! bar/line chart with two y axes.
//!
//! One label per x position (a month, a city, a province ...) and one
//! [`ChartSeries`] per dataset drawn over those positions.

use crate::lookup;
use crate::models::{Dimension, GroupedSeriesEntry};
use anyhow::{Result, anyhow, bail};
use num_format::{Locale, ToFormattedString};
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters_svg::SVGBackend;
use std::path::Path;

/// Office (2013+) chart series palette.
const OFFICE10: [RGBColor; 10] = [
    RGBColor(68, 114, 196),
    RGBColor(237, 125, 49),
    RGBColor(165, 165, 165),
    RGBColor(255, 192, 0),
    RGBColor(91, 155, 213),
    RGBColor(112, 173, 71),
    RGBColor(38, 68, 120),
    RGBColor(158, 72, 14),
    RGBColor(99, 99, 99),
    RGBColor(153, 115, 0),
];

#[inline]
fn office_color(idx: usize) -> RGBAColor {
    OFFICE10[idx % OFFICE10.len()].to_rgba()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub width: u32,
    pub height: u32,
    /// Fix the y axis to 0..100 and print ticks as percentages.
    pub percent: bool,
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_desc: String::new(),
            y_desc: String::new(),
            width: 1000,
            height: 600,
            percent: false,
        }
    }
}

impl ChartSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn axes(mut self, x_desc: impl Into<String>, y_desc: impl Into<String>) -> Self {
        self.x_desc = x_desc.into();
        self.y_desc = y_desc.into();
        self
    }
}

/// One dataset: a value per x label.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// One dataset per category slot, valued across `entries` in order.
pub fn chart_series(entries: &[GroupedSeriesEntry], categories: &[String]) -> Vec<ChartSeries> {
    categories
        .iter()
        .map(|c| ChartSeries {
            label: c.clone(),
            values: entries.iter().map(|e| e.value(c)).collect(),
        })
        .collect()
}

/// X labels for `entries`, e.g. month abbreviations or province names.
pub fn key_labels(entries: &[GroupedSeriesEntry], dimensions: &[Dimension]) -> Vec<String> {
    entries
        .iter()
        .map(|e| lookup::key_label(&e.key, dimensions))
        .collect()
}

fn check_inputs(labels: &[String], datasets: &[ChartSeries], path: &Path) -> Result<()> {
    if path.extension().and_then(|s| s.to_str()) != Some("svg") {
        bail!("unsupported chart format for {}: only .svg is written", path.display());
    }
    if labels.is_empty() || datasets.is_empty() {
        return Err(anyhow!("no data to plot"));
    }
    if let Some(bad) = datasets.iter().find(|d| d.values.len() != labels.len()) {
        bail!(
            "dataset '{}' has {} values for {} labels",
            bad.label,
            bad.values.len(),
            labels.len()
        );
    }
    Ok(())
}

fn y_range(datasets: &[ChartSeries], percent: bool) -> (f64, f64) {
    if percent {
        return (0.0, 100.0);
    }
    let vals = datasets.iter().flat_map(|d| d.values.iter().copied());
    let (min, max) = vals.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if (max - min).abs() < f64::EPSILON {
        (min, min + 1.0)
    } else {
        (min, max * 1.1)
    }
}

/// Label for an x tick; ticks between positions stay blank.
fn tick_label(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

fn open_svg<'p>(out_path: &'p Path, spec: &ChartSpec) -> DrawingArea<SVGBackend<'p>, Shift> {
    SVGBackend::new(out_path, (spec.width, spec.height)).into_drawing_area()
}

/// Grouped bar chart: for each label, one bar per dataset side by side.
pub fn plot_bars<P: AsRef<Path>>(
    labels: &[String],
    datasets: &[ChartSeries],
    spec: &ChartSpec,
    out_path: P,
) -> Result<()> {
    let out_path = out_path.as_ref();
    check_inputs(labels, datasets, out_path)?;
    let root = open_svg(out_path, spec);
    let y = y_range(datasets, spec.percent);
    draw_chart(&root, labels, y, spec, false, |chart| {
        let width = 0.8 / datasets.len() as f64;
        for (j, ds) in datasets.iter().enumerate() {
            let color = office_color(j);
            let bars = ds.values.iter().enumerate().map(move |(i, v)| {
                let x0 = i as f64 - 0.4 + j as f64 * width;
                Rectangle::new([(x0, 0.0), (x0 + width, *v)], color.filled())
            });
            chart
                .draw_series(bars)
                .map_err(|e| anyhow!("{:?}", e))?
                .label(ds.label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }
        Ok(())
    })
}

/// Line chart over the labels, one line per dataset.
pub fn plot_lines<P: AsRef<Path>>(
    labels: &[String],
    datasets: &[ChartSeries],
    spec: &ChartSpec,
    out_path: P,
) -> Result<()> {
    let out_path = out_path.as_ref();
    check_inputs(labels, datasets, out_path)?;
    let root = open_svg(out_path, spec);
    let y = y_range(datasets, spec.percent);
    draw_chart(&root, labels, y, spec, true, |chart| {
        for (j, ds) in datasets.iter().enumerate() {
            let color = office_color(j);
            let points = positions(&ds.values);
            chart
                .draw_series(LineSeries::new(points.clone(), line_style(color)))
                .map_err(|e| anyhow!("{:?}", e))?
                .label(ds.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], color));
            chart
                .draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))
                .map_err(|e| anyhow!("{:?}", e))?;
        }
        Ok(())
    })
}

/// Bars on the left axis with a line on its own right axis, for comparing
/// two measures of different scale over the same labels. `spec.percent`
/// applies to the line's axis.
pub fn plot_dual<P: AsRef<Path>>(
    labels: &[String],
    bars: &ChartSeries,
    line: &ChartSeries,
    line_desc: &str,
    spec: &ChartSpec,
    out_path: P,
) -> Result<()> {
    let out_path = out_path.as_ref();
    check_inputs(labels, &[bars.clone(), line.clone()], out_path)?;
    let root = open_svg(out_path, spec);
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
    let n = labels.len() as f64;
    let (y_min, y_max) = y_range(std::slice::from_ref(bars), false);
    let (l_min, l_max) = y_range(std::slice::from_ref(line), spec.percent);

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(&spec.title, ("sans-serif", 24))
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Right, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 44)
        .build_cartesian_2d(-0.5..(n - 0.5), y_min..y_max)
        .map_err(|e| anyhow!("{:?}", e))?
        .set_secondary_coord(-0.5..(n - 0.5), l_min..l_max);

    let x_fmt = |x: &f64| tick_label(labels, *x);
    let y_fmt = |v: &f64| y_label(v, false);
    let l_fmt = |v: &f64| y_label(v, spec.percent);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&spec.x_desc)
        .y_desc(&spec.y_desc)
        .x_labels(labels.len().min(24))
        .y_labels(10)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;
    chart
        .configure_secondary_axes()
        .y_desc(line_desc)
        .y_labels(10)
        .y_label_formatter(&l_fmt)
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let bar_color = office_color(0);
    let line_color = office_color(1);
    let rects = bars.values.iter().enumerate().map(|(i, v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *v)], bar_color.filled())
    });
    chart
        .draw_series(rects)
        .map_err(|e| anyhow!("{:?}", e))?
        .label(bars.label.clone())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], bar_color.filled()));
    let points = positions(&line.values);
    chart
        .draw_secondary_series(LineSeries::new(points.clone(), line_style(line_color)))
        .map_err(|e| anyhow!("{:?}", e))?
        .label(line.label.clone())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], line_color));
    chart
        .draw_secondary_series(points.into_iter().map(|p| Circle::new(p, 3, line_color.filled())))
        .map_err(|e| anyhow!("{:?}", e))?;

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;
    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

fn positions(values: &[f64]) -> Vec<(f64, f64)> {
    values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect()
}

fn line_style(color: RGBAColor) -> ShapeStyle {
    ShapeStyle {
        color,
        filled: false,
        stroke_width: 2,
    }
}

fn y_label(v: &f64, percent: bool) -> String {
    if percent {
        format!("{:.0}%", v)
    } else {
        ((*v).round() as i64).to_formatted_string(&Locale::en)
    }
}

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Axes, mesh and legend around whatever `draw_series` puts on the chart.
fn draw_chart<'a, DB, F>(
    root: &'a DrawingArea<DB, Shift>,
    labels: &[String],
    (y_min, y_max): (f64, f64),
    spec: &ChartSpec,
    x_mesh: bool,
    draw_series: F,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    F: FnOnce(&mut Chart<'a, DB>) -> Result<()>,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;
    let n = labels.len() as f64;

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(&spec.title, ("sans-serif", 24))
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 44)
        .build_cartesian_2d(-0.5..(n - 0.5), y_min..y_max)
        .map_err(|e| anyhow!("{:?}", e))?;

    let x_fmt = |x: &f64| tick_label(labels, *x);
    let y_fmt = |v: &f64| y_label(v, spec.percent);
    let mut mesh = chart.configure_mesh();
    if !x_mesh {
        mesh.disable_x_mesh();
    }
    mesh.x_desc(&spec.x_desc)
        .y_desc(&spec.y_desc)
        .x_labels(labels.len().min(24))
        .y_labels(10)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    draw_series(&mut chart)?;

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.85))
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;
    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_label_whole_positions() {
        let labels = vec!["Jan".to_string(), "Feb".to_string()];
        assert_eq!(tick_label(&labels, 1.0), "Feb");
        assert_eq!(tick_label(&labels, 0.5), "");
        assert_eq!(tick_label(&labels, -0.5), "");
        assert_eq!(tick_label(&labels, 2.0), "");
    }

    #[test]
    fn y_range_starts_at_zero_and_pads_the_top() {
        let ds = [ChartSeries {
            label: "a".into(),
            values: vec![10.0, 50.0],
        }];
        let (lo, hi) = y_range(&ds, false);
        assert_eq!(lo, 0.0);
        assert!(hi > 50.0 && hi < 60.0);
        assert_eq!(y_range(&ds, true), (0.0, 100.0));
    }

    #[test]
    fn rejects_non_svg_and_mismatched_lengths() {
        let labels = vec!["Jan".to_string()];
        let ds = [ChartSeries {
            label: "a".into(),
            values: vec![1.0, 2.0],
        }];
        assert!(check_inputs(&labels, &ds, Path::new("x.png")).is_err());
        assert!(check_inputs(&labels, &ds, Path::new("x.svg")).is_err());
    }
}
