// Semicolon-separated CSV dialect used by the institutions table.
//
// No quoting: `"` is an ordinary character. Reading is permissive and
// never fails; writing replaces separators instead of escaping them.
use csv::{ReaderBuilder, StringRecord, Terminator};
use log::{debug, warn};

/// One parsed line: header names mapped to raw cell text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, keeping its original position if it was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rec = Record::new();
        for (k, v) in iter {
            rec.insert(k, v);
        }
        rec
    }
}

fn is_blank(rec: &StringRecord) -> bool {
    rec.iter().all(|cell| cell.trim().is_empty()) && rec.len() <= 1
}

/// Parse `;`-separated text into records keyed by the first non-blank line.
///
/// Header cells are trimmed, data cells are kept verbatim. Short lines are
/// padded with empty cells and cells past the header width are dropped.
pub fn parse(text: &str) -> Vec<Record> {
    let text = text.trim_start_matches('\u{feff}');
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .terminator(Terminator::CRLF)
        .from_reader(text.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Record> = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let line = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable CSV line {}: {}", idx + 1, e);
                continue;
            }
        };
        if is_blank(&line) {
            continue;
        }
        if header.is_none() {
            header = Some(line.iter().map(|h| h.trim().to_string()).collect());
            continue;
        }
        let names = header.as_deref().unwrap_or_default();
        let rec: Record = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), line.get(i).unwrap_or("")))
            .collect();
        rows.push(rec);
    }
    debug!("Parsed {} CSV rows", rows.len());
    rows
}

/// Make a value safe to place in a cell: newlines become spaces and
/// separators become commas. Not reversible.
pub fn sanitize_cell(value: &str) -> String {
    value.replace(['\n', '\r'], " ").replace(';', ",")
}

/// Write `rows` as `;`-separated text with `\n` line endings.
///
/// Without an explicit `header` the key order of the first row is used.
/// Keys missing from a row are written as empty cells, so a lone empty
/// cell is an empty line.
pub fn serialize(rows: &[Record], header: Option<&[&str]>) -> String {
    let head: Vec<String> = match header {
        Some(h) => h.iter().map(|s| s.to_string()).collect(),
        None => rows
            .first()
            .map(|r| r.keys().map(str::to_string).collect())
            .unwrap_or_default(),
    };
    if head.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&head.join(";"));
    out.push('\n');
    for r in rows {
        let cells: Vec<String> = head
            .iter()
            .map(|h| sanitize_cell(r.get(h).unwrap_or("")))
            .collect();
        out.push_str(&cells.join(";"));
        out.push('\n');
    }
    out
}
