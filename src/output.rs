use crate::error::{Result, WriteCsvFileSnafu, WriteFileSnafu, WriteJsonSnafu};
use serde::Serialize;
use snafu::ResultExt;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let label = path.display().to_string();
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
        .context(WriteCsvFileSnafu { path: label.clone() })?;
    for r in rows {
        wtr.serialize(r).context(WriteCsvFileSnafu { path: label.clone() })?;
    }
    wtr.flush().context(WriteFileSnafu { path: label })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let label = path.display().to_string();
    let s = serde_json::to_string_pretty(value).context(WriteJsonSnafu { path: label.clone() })?;
    std::fs::write(path, s).context(WriteFileSnafu { path: label })?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).context(WriteFileSnafu {
        path: path.display().to_string(),
    })
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
