use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use metro_growth::correlate::{self, CorrelationView, HousingType, LabourMetric};
use metro_growth::dashboard::{ChartView, DataOrigin};
use metro_growth::models::{Dimension, Field, GroupKey};
use metro_growth::rates::{self, RateRow};
use metro_growth::viz::{self, ChartSeries, ChartSpec};
use metro_growth::{Client, DashboardConfig, lookup, stats, storage, synthetic};
use num_format::{Locale, ToFormattedString};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "metro",
    version,
    about = "Metropolitan housing and employment growth index: fetch, aggregate, export & chart"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Backend base URL (overrides config file and METRO_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Show synthetic baseline data when the backend cannot be reached.
    #[arg(long, global = true, default_value_t = false)]
    synthetic_fallback: bool,
    /// HTTP request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monthly housing starts (or completions) per city.
    Housing(HousingArgs),
    /// Housing-type distribution (singles, semis, townhomes, apartments) per city.
    Types(TypesArgs),
    /// Employment rates by education level or province.
    Employment(EmploymentArgs),
    /// Yearly totals per city as computed by the backend.
    Totals(TotalsArgs),
    /// A labour-market rate next to housing starts, per province.
    LabourHousing(LabourHousingArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum By {
    Education,
    Province,
}

#[derive(Args, Debug)]
struct HousingArgs {
    /// Cities separated by comma or semicolon (default: from config).
    #[arg(long)]
    cities: Option<String>,
    /// Only show one month (1-12).
    #[arg(long)]
    month: Option<i64>,
    /// Show completions instead of starts.
    #[arg(long, default_value_t = false)]
    completions: bool,
    /// Save all series to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Write a bar chart of the shown series (.svg).
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Print per-city statistics across months.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

#[derive(Args, Debug)]
struct TypesArgs {
    #[arg(long, default_value_t = false)]
    completions: bool,
    /// Cities separated by comma or semicolon (default: the five largest metros).
    #[arg(long)]
    cities: Option<String>,
    #[arg(long)]
    plot: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EmploymentArgs {
    #[arg(long, value_enum, default_value_t = By::Education)]
    by: By,
    /// Restrict to one province code (1-10).
    #[arg(long)]
    province: Option<i64>,
    #[arg(long)]
    plot: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Metric {
    Employment,
    Unemployment,
    Participation,
}

impl From<Metric> for LabourMetric {
    fn from(m: Metric) -> Self {
        match m {
            Metric::Employment => LabourMetric::Employment,
            Metric::Unemployment => LabourMetric::Unemployment,
            Metric::Participation => LabourMetric::Participation,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Starts {
    Total,
    Single,
    Multi,
}

impl From<Starts> for HousingType {
    fn from(s: Starts) -> Self {
        match s {
            Starts::Total => HousingType::Total,
            Starts::Single => HousingType::Single,
            Starts::Multi => HousingType::MultiUnit,
        }
    }
}

#[derive(Args, Debug)]
struct LabourHousingArgs {
    #[arg(long, value_enum, default_value_t = Metric::Employment)]
    metric: Metric,
    /// Which housing starts to compare against (multi = total - single).
    #[arg(long, value_enum, default_value_t = Starts::Total)]
    housing: Starts,
    /// Write a bar (starts) and line (rate) chart (.svg).
    #[arg(long)]
    plot: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TotalsArgs {
    #[arg(long)]
    cities: Option<String>,
    #[arg(long, default_value_t = false)]
    completions: bool,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn fmt_count(v: f64) -> String {
    (v.round() as i64).to_formatted_string(&Locale::en)
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            let s = format!("{:.2}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn resolve_config(args: &GlobalArgs) -> Result<DashboardConfig> {
    let mut cfg = match &args.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    cfg.apply_env();
    if let Some(url) = &args.base_url {
        cfg.base_url = url.clone();
    }
    if args.synthetic_fallback {
        cfg.use_synthetic_fallback = true;
    }
    if let Some(t) = args.timeout_secs {
        cfg.timeout_secs = t;
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn show_banner(view: &ChartView) {
    if let Some(banner) = view.banner() {
        eprintln!("[!] {}", banner);
    }
    if let Some(report) = view.report() {
        log::info!(
            "{} record(s) loaded at {} ({:?})",
            report.record_count,
            report.loaded_at.to_rfc3339(),
            report.origin
        );
    }
}

fn plot_or_skip(path: &Path, labels: &[String], draw: impl FnOnce() -> Result<()>) -> Result<()> {
    if labels.is_empty() {
        eprintln!("Nothing to plot; skipped {}", path.display());
        return Ok(());
    }
    draw()?;
    eprintln!("Wrote plot to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = resolve_config(&cli.global)?;
    match cli.cmd {
        Command::Housing(args) => cmd_housing(args, &cfg),
        Command::Types(args) => cmd_types(args, &cfg),
        Command::Employment(args) => cmd_employment(args, &cfg),
        Command::Totals(args) => cmd_totals(args, &cfg),
        Command::LabourHousing(args) => cmd_labour_housing(args, &cfg),
    }
}

fn cmd_housing(args: HousingArgs, cfg: &DashboardConfig) -> Result<()> {
    let cities = match &args.cities {
        Some(s) => parse_list(s),
        None => cfg.cities.clone(),
    };
    let cfg = DashboardConfig {
        cities: cities.clone(),
        ..cfg.clone()
    };
    let client = Client::from_config(&cfg)?;
    let mut view = ChartView::housing_comparison(&cities);
    if args.completions {
        view.set_active_series("completions");
    }
    view.load_now(&client, &cfg);
    show_banner(&view);
    view.select_key(args.month.map(GroupKey::number));

    let Some(series) = view.active_series() else {
        return Ok(());
    };
    let entries = view.visible_entries();
    let what = if args.completions { "completions" } else { "starts" };

    // The backend reports every census area; only the requested ones are shown.
    println!("Month\t{}", cities.join("\t"));
    for e in entries {
        let cells: Vec<String> = cities.iter().map(|c| fmt_count(e.value(c))).collect();
        println!("{}\t{}", lookup::key_label(&e.key, &[Dimension::Month]), cells.join("\t"));
    }
    if entries.is_empty() {
        println!("(no {} data)", what);
    }

    if let Some(path) = args.out.as_ref()
        && let Some(report) = view.report()
    {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&report.result, path)?,
            "json" => storage::save_json(&report.result, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} series to {}", report.result.series.len(), path.display());
    }

    if let Some(path) = args.plot.as_ref() {
        let labels = viz::key_labels(entries, &[Dimension::Month]);
        let datasets = viz::chart_series(entries, &cities);
        let spec = ChartSpec::new(format!("Housing {} by month", what)).axes("Month", "Units");
        plot_or_skip(path, &labels, || viz::plot_bars(&labels, &datasets, &spec, path))?;
    }

    if args.stats {
        for s in stats::series_summary(series)
            .into_iter()
            .filter(|s| cities.contains(&s.category))
        {
            println!(
                "{}  count={} total={} min={} max={} mean={} median={}",
                s.category,
                s.count,
                fmt_count(s.total),
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median)
            );
        }
    }
    Ok(())
}

fn cmd_types(args: TypesArgs, cfg: &DashboardConfig) -> Result<()> {
    let cities = match &args.cities {
        Some(s) => parse_list(s),
        None => lookup::HOUSING_TYPE_CITIES.iter().map(|c| c.to_string()).collect(),
    };
    let client = Client::from_config(cfg)?;
    let mut view = ChartView::housing_types();
    if args.completions {
        view.set_active_series("type_completions");
    }
    view.load_now(&client, cfg);
    show_banner(&view);

    let Some(series) = view.active_series() else {
        return Ok(());
    };
    let mut entries = Vec::new();
    for city in &cities {
        match series.entry(&GroupKey::label(city.as_str())) {
            Some(e) => entries.push(e.clone()),
            None => eprintln!("No housing-type data for {}", city),
        }
    }

    println!("City\t{}", series.categories.join("\t"));
    for e in &entries {
        let cells: Vec<String> = series.categories.iter().map(|c| fmt_count(e.value(c))).collect();
        println!("{}\t{}", e.key, cells.join("\t"));
    }

    if let Some(path) = args.plot.as_ref() {
        let labels = viz::key_labels(&entries, &[Dimension::CensusArea]);
        let datasets = viz::chart_series(&entries, &series.categories);
        let title = if args.completions {
            "Housing completions by type"
        } else {
            "Housing starts by type"
        };
        let spec = ChartSpec::new(title).axes("City", "Units");
        plot_or_skip(path, &labels, || viz::plot_bars(&labels, &datasets, &spec, path))?;
    }
    Ok(())
}

fn cmd_employment(args: EmploymentArgs, cfg: &DashboardConfig) -> Result<()> {
    let dims = [Dimension::Province, Dimension::EducationLevel];
    let client = Client::from_config(cfg)?;
    let mut view = ChartView::employment(dims.to_vec());
    view.load_now(&client, cfg);
    show_banner(&view);

    let Some(series) = view.active_series() else {
        return Ok(());
    };
    let mut cells = rates::rate_table(series, &dims);
    if let Some(p) = args.province {
        cells = rates::filter_part(&cells, 0, p);
    }
    let rows: Vec<RateRow> = match args.by {
        By::Education => rates::rollup(&cells, 1, Dimension::EducationLevel),
        By::Province => rates::rollup(&cells, 0, Dimension::Province),
    };

    let heading = match args.by {
        By::Education => "Education",
        By::Province => "Province",
    };
    println!("{}\tEmployed\tUnemployed\tNot in LF\tEmployment %\tUnemployment %\tParticipation %", heading);
    for r in &rows {
        println!(
            "{}\t{}\t{}\t{}\t{:.1}\t{:.1}\t{:.1}",
            r.label,
            r.counts.employed,
            r.counts.unemployed,
            r.counts.not_in_labour_force,
            r.employment_rate,
            r.unemployment_rate,
            r.participation_rate
        );
    }

    // One line per shown row across the other dimension.
    if let Some(path) = args.plot.as_ref() {
        let (x, line) = match args.by {
            By::Education => ((0, Dimension::Province), (1, Dimension::EducationLevel)),
            By::Province => ((1, Dimension::EducationLevel), (0, Dimension::Province)),
        };
        let (labels, grid) = rates::employment_grid(&cells, x, line);
        let datasets: Vec<ChartSeries> = grid
            .into_iter()
            .map(|(label, values)| ChartSeries { label, values })
            .collect();
        let x_desc = match args.by {
            By::Education => "Province",
            By::Province => "Education",
        };
        let spec = ChartSpec {
            percent: true,
            ..ChartSpec::new(format!("Employment rate by {}", heading.to_lowercase()))
                .axes(x_desc, "Employment rate")
        };
        plot_or_skip(path, &labels, || viz::plot_lines(&labels, &datasets, &spec, path))?;
    }
    Ok(())
}

fn cmd_totals(args: TotalsArgs, cfg: &DashboardConfig) -> Result<()> {
    let cities = match &args.cities {
        Some(s) => parse_list(s),
        None => cfg.cities.clone(),
    };
    let client = Client::from_config(cfg)?;
    let field = if args.completions {
        Field::TotalComplete
    } else {
        Field::TotalStarts
    };

    let mut origin = DataOrigin::Remote;
    let mut totals = Vec::with_capacity(cities.len());
    for city in &cities {
        let fetched = if args.completions {
            client.total_complete_by_area(city)
        } else {
            client.total_starts_by_area(city)
        };
        match fetched {
            Ok(n) => totals.push((city.clone(), n as f64)),
            Err(e) => {
                eprintln!("[!] Could not load data: {}", e);
                origin = if cfg.use_synthetic_fallback {
                    DataOrigin::Synthetic
                } else {
                    DataOrigin::Unavailable
                };
                break;
            }
        }
    }

    match origin {
        DataOrigin::Remote => {
            if let Ok(count) = client.record_count() {
                log::info!("backend holds {} housing record(s)", count);
            }
        }
        DataOrigin::Synthetic => {
            eprintln!("[!] Showing synthetic baseline data.");
            let by_area = stats::area_totals(&synthetic::housing_records(&cities), field);
            totals = cities
                .iter()
                .map(|c| (c.clone(), by_area.get(c).copied().unwrap_or(0.0)))
                .collect();
        }
        DataOrigin::Unavailable => totals.clear(),
    }

    println!("City\t{}", field.label());
    for (city, n) in &totals {
        println!("{}\t{}", city, fmt_count(*n));
    }
    Ok(())
}

fn cmd_labour_housing(args: LabourHousingArgs, cfg: &DashboardConfig) -> Result<()> {
    let client = Client::from_config(cfg)?;
    let mut view = CorrelationView::new(args.metric.into(), args.housing.into());
    view.load_now(&client, cfg);
    for banner in view.banners() {
        eprintln!("[!] {}", banner);
    }

    let rows = view.rows();
    let metric = view.metric.label();
    let housing = view.housing_type.label();
    println!("Province\t{} %\t{}", metric, housing);
    for r in &rows {
        println!("{}\t{:.1}\t{}", r.label, r.rate, fmt_count(r.starts));
    }
    if rows.is_empty() {
        println!("(no labour/housing data)");
    }
    if let Some(r) = correlate::pearson(&rows) {
        println!("Pearson r = {:.3}", r);
    }

    if let Some(path) = args.plot.as_ref() {
        let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();
        let bars = ChartSeries {
            label: housing.to_string(),
            values: rows.iter().map(|r| r.starts).collect(),
        };
        let line = ChartSeries {
            label: metric.to_string(),
            values: rows.iter().map(|r| r.rate).collect(),
        };
        let spec = ChartSpec {
            percent: true,
            ..ChartSpec::new(format!("{} vs. {}", metric, housing.to_lowercase())).axes("Province", "Units")
        };
        plot_or_skip(path, &labels, || viz::plot_dual(&labels, &bars, &line, metric, &spec, path))?;
    }
    Ok(())
}
