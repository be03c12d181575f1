use crate::series::AggregationResult;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Quote cells a spreadsheet would otherwise evaluate as a formula.
fn defuse(cell: &str) -> Cow<'_, str> {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => Cow::Owned(format!("'{}", cell)),
        _ => Cow::Borrowed(cell),
    }
}

/// Save every series as tidy CSV: one row per (series, key, category).
pub fn save_csv<P: AsRef<Path>>(result: &AggregationResult, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(["series", "key", "category", "value"])?;
    for series in &result.series {
        for entry in &series.entries {
            let key = entry.key.to_string();
            for category in &series.categories {
                let value = entry.value(category).to_string();
                wtr.write_record([
                    defuse(&series.name).as_ref(),
                    defuse(&key).as_ref(),
                    defuse(category).as_ref(),
                    value.as_str(),
                ])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Save the whole result (series, key domain, diagnostics) as pretty JSON.
pub fn save_json<P: AsRef<Path>>(result: &AggregationResult, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let s = serde_json::to_string_pretty(result)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
