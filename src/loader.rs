use crate::codec::{self, Record};
use crate::error::{ResourceUnavailableSnafu, Result};
use crate::types::{Field, InstitutionRow, Region};
use crate::util::{clean_text, to_non_negative_int};
use log::{debug, info};
use snafu::ResultExt;
use std::fs;
use std::path::Path;

/// Conventional location of the institutions table.
pub const DEFAULT_CSV_PATH: &str = "data/instituicoes.csv";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub missing_municipio: usize,
    pub unknown_regiao: usize,
}

impl LoadReport {
    pub fn from_rows(rows: &[InstitutionRow]) -> Self {
        let missing_municipio = rows.iter().filter(|r| r.municipio.is_empty()).count();
        let unknown_regiao = rows
            .iter()
            .filter(|r| !r.municipio.is_empty() && Region::from_exact(&r.regiao).is_none())
            .count();
        LoadReport {
            total_rows: rows.len(),
            missing_municipio,
            unknown_regiao,
        }
    }
}

/// First non-blank value among the accepted spellings of `field`.
pub fn resolve<'a>(record: &'a Record, field: Field) -> Option<&'a str> {
    field
        .aliases()
        .iter()
        .filter_map(|alias| record.get(alias))
        .find(|v| !v.trim().is_empty())
}

pub fn canonicalize(record: &Record) -> InstitutionRow {
    let text = |f: Field| clean_text(resolve(record, f));
    let qty = |f: Field| to_non_negative_int(resolve(record, f), 0);
    InstitutionRow {
        municipio: text(Field::Municipio),
        regiao: text(Field::Regiao),
        nome_instituicao: text(Field::NomeInstituicao),
        qt_servicos: qty(Field::QtServicos),
        qt_recurso_ta: qty(Field::QtRecursoTa),
        qt_open_day: qty(Field::QtOpenDay),
    }
}

/// Parse and canonicalize a whole file's text. Never fails; garbage in
/// gives empty or zeroed rows out.
pub fn rows_from_text(text: &str) -> Vec<InstitutionRow> {
    codec::parse(text).iter().map(canonicalize).collect()
}

pub fn load_instituicoes<P: AsRef<Path>>(path: P) -> Result<(Vec<InstitutionRow>, LoadReport)> {
    let path = path.as_ref();
    let bytes = fs::read(path).context(ResourceUnavailableSnafu {
        path: path.display().to_string(),
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let rows = rows_from_text(&text);
    let report = LoadReport::from_rows(&rows);
    info!(
        "Loaded {} rows from {} ({} without municipio, {} outside the known regions)",
        report.total_rows,
        path.display(),
        report.missing_municipio,
        report.unknown_regiao
    );
    debug!("rows: {:?}", rows);
    Ok((rows, report))
}
