use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use famalbum_core::domain::TrackedField;
use famalbum_core::ledger::{Projection, ReconcileReport};
use famalbum_core::Album;

/// Values listed per field before the table is cut off.
const TOP_VALUES: usize = 10;

pub fn show(album: &Album, json: bool) -> Result<()> {
    let counters = album.counters();
    if json {
        println!("{}", serde_json::to_string_pretty(counters)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field"),
        Cell::new("Distinct"),
        Cell::new("Top values"),
    ]);
    for field in TrackedField::ALL {
        let values = counters.field(field);
        table.add_row(vec![
            Cell::new(field),
            Cell::new(values.len()),
            Cell::new(top_values(counters, field, TOP_VALUES)),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// `value (count)` pairs, most frequent first, ties by value.
pub(crate) fn top_values(counters: &Projection, field: TrackedField, limit: usize) -> String {
    let mut values: Vec<(&String, &u64)> = counters.field(field).iter().collect();
    values.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let shown: Vec<String> = values
        .iter()
        .take(limit)
        .map(|(value, count)| format!("{value} ({count})"))
        .collect();
    let mut out = shown.join(", ");
    if values.len() > limit {
        out.push_str(&format!(", … +{}", values.len() - limit));
    }
    out
}

pub fn recompute(album: &mut Album, field: &str) -> Result<()> {
    let reports = if field.eq_ignore_ascii_case("all") {
        album.recompute_all()?
    } else {
        vec![album.recompute_stat(field.parse()?)?]
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field"),
        Cell::new("Created"),
        Cell::new("Updated"),
        Cell::new("Deleted"),
        Cell::new("Unchanged"),
    ]);
    for report in &reports {
        table.add_row(report_row(report));
    }
    println!("{table}");
    Ok(())
}

fn report_row(report: &ReconcileReport) -> Vec<Cell> {
    let field = report
        .field
        .map(|f| f.to_string())
        .unwrap_or_else(|| "-".to_string());
    let colored = |n: usize| {
        if n > 0 {
            Cell::new(n).fg(Color::Yellow)
        } else {
            Cell::new(n)
        }
    };
    vec![
        Cell::new(field),
        colored(report.created),
        colored(report.updated),
        colored(report.deleted),
        Cell::new(report.unchanged),
    ]
}

pub fn bucket(album: &Album, recompute: bool) -> Result<()> {
    let bucket = if recompute {
        album.recompute_bucket()?
    } else {
        album.bucket()?
    };
    println!("  Photos: {}", bucket.count);
    println!("  Size:   {}", format_size(bucket.size));
    Ok(())
}

pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}
