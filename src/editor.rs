// In-memory admin table.
//
// Edits arrive as discrete commands so any front end (terminal menu,
// web page, tests) drives the same operations.
use crate::codec::{self, Record};
use crate::error::{Result, RowOutOfRangeSnafu};
use crate::loader;
use crate::types::{EditableRow, EditorTableRow, Field};
use crate::util::{normalize_key, to_non_negative_int};
use log::{debug, info};
use snafu::ensure;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    AddRow,
    SetField {
        index: usize,
        field: Field,
        value: String,
    },
    DeleteRow {
        index: usize,
    },
}

impl EditableRow {
    pub fn set(&mut self, field: Field, value: &str) {
        let qty = || to_non_negative_int(Some(value), 0);
        match field {
            Field::Municipio => self.municipio = value.trim().to_string(),
            Field::Regiao => self.regiao = value.trim().to_string(),
            Field::NomeInstituicao => self.nome_instituicao = value.trim().to_string(),
            Field::QtServicos => self.qt_servicos = qty(),
            Field::QtRecursoTa => self.qt_recurso_ta = qty(),
            Field::QtOpenDay => self.qt_open_day = qty(),
        }
    }

    pub fn to_record(&self) -> Record {
        Record::from_iter([
            (Field::Municipio.header(), self.municipio.trim().to_string()),
            (Field::Regiao.header(), self.regiao.trim().to_string()),
            (Field::NomeInstituicao.header(), self.nome_instituicao.trim().to_string()),
            (Field::QtServicos.header(), self.qt_servicos.to_string()),
            (Field::QtRecursoTa.header(), self.qt_recurso_ta.to_string()),
            (Field::QtOpenDay.header(), self.qt_open_day.to_string()),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    rows: Vec<EditableRow>,
    municipios: Vec<String>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known municipality names, used to flag rows that will not land on
    /// the map.
    pub fn with_municipios(municipios: Vec<String>) -> Self {
        Editor {
            rows: Vec::new(),
            municipios,
        }
    }

    pub fn rows(&self) -> &[EditableRow] {
        &self.rows
    }

    pub fn apply(&mut self, cmd: EditCommand) -> Result<()> {
        debug!("apply {:?}", cmd);
        match cmd {
            EditCommand::AddRow => self.rows.push(EditableRow::default()),
            EditCommand::SetField {
                index,
                field,
                value,
            } => {
                let len = self.rows.len();
                ensure!(index < len, RowOutOfRangeSnafu { index, len });
                self.rows[index].set(field, &value);
            }
            EditCommand::DeleteRow { index } => {
                let len = self.rows.len();
                ensure!(index < len, RowOutOfRangeSnafu { index, len });
                self.rows.remove(index);
            }
        }
        Ok(())
    }

    /// Replace the table with the rows found in `text`, accepting every
    /// known header spelling.
    pub fn import_text(&mut self, text: &str) -> usize {
        self.rows = loader::rows_from_text(text)
            .into_iter()
            .map(EditableRow::from)
            .collect();
        info!("Editor holds {} rows", self.rows.len());
        self.rows.len()
    }

    /// Like [`Editor::import_text`] from a file. On failure the current
    /// table is kept.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let (rows, _) = loader::load_instituicoes(path)?;
        self.rows = rows.into_iter().map(EditableRow::from).collect();
        Ok(self.rows.len())
    }

    pub fn export_csv(&self) -> String {
        let records: Vec<Record> = self.rows.iter().map(EditableRow::to_record).collect();
        codec::serialize(&records, Some(&Field::export_header()))
    }

    /// Indices of rows whose municipality is not a known name. Empty when
    /// no names were provided.
    pub fn unknown_municipios(&self) -> Vec<usize> {
        if self.municipios.is_empty() {
            return Vec::new();
        }
        let known: HashSet<String> = self.municipios.iter().map(|m| normalize_key(m)).collect();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| !known.contains(&normalize_key(&r.municipio)))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn table_rows(&self) -> Vec<EditorTableRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, r)| EditorTableRow {
                index,
                municipio: r.municipio.clone(),
                regiao: r.regiao.clone(),
                nome_instituicao: r.nome_instituicao.clone(),
                qt_servicos: r.qt_servicos,
                qt_recurso_ta: r.qt_recurso_ta,
                qt_open_day: r.qt_open_day,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;

    fn set(index: usize, field: Field, value: &str) -> EditCommand {
        EditCommand::SetField {
            index,
            field,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_add_and_set_fields() {
        let mut ed = Editor::new();
        ed.apply(EditCommand::AddRow).unwrap();
        assert_eq!(ed.rows()[0], EditableRow::default());

        ed.apply(set(0, Field::Municipio, "  Joinville ")).unwrap();
        ed.apply(set(0, Field::Regiao, "Norte")).unwrap();
        ed.apply(set(0, Field::QtServicos, "12")).unwrap();
        ed.apply(set(0, Field::QtRecursoTa, "-3")).unwrap();
        ed.apply(set(0, Field::QtOpenDay, "muitos")).unwrap();

        let r = &ed.rows()[0];
        assert_eq!(r.municipio, "Joinville");
        assert_eq!(r.regiao, "Norte");
        assert_eq!((r.qt_servicos, r.qt_recurso_ta, r.qt_open_day), (12, 0, 0));
    }

    #[test]
    fn test_out_of_range_commands() {
        let mut ed = Editor::new();
        let err = ed.apply(set(0, Field::Municipio, "X")).unwrap_err();
        assert!(matches!(err, DashboardError::RowOutOfRange { index: 0, len: 0 }));
        ed.apply(EditCommand::AddRow).unwrap();
        assert!(ed.apply(EditCommand::DeleteRow { index: 1 }).is_err());
        assert_eq!(ed.rows().len(), 1);
    }

    #[test]
    fn test_delete_keeps_order() {
        let mut ed = Editor::new();
        ed.import_text("Municipio\nA\nB\nC\n");
        ed.apply(EditCommand::DeleteRow { index: 1 }).unwrap();
        let names: Vec<&str> = ed.rows().iter().map(|r| r.municipio.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(ed.table_rows()[1].index, 1);
        assert_eq!(ed.table_rows()[1].municipio, "C");
    }

    #[test]
    fn test_import_accepts_aliases_and_export_uses_canonical_header() {
        let mut ed = Editor::new();
        let n = ed.import_text(
            "municipio;regiao;Nome da Instituição;Qt de Serviços;RecursosTA;OpenDay\n\
             Lages ;Serra;APAE;3;x;1\n",
        );
        assert_eq!(n, 1);
        assert_eq!(
            ed.export_csv(),
            "Municipio;Regiao;Nome_Instituicao;Qt_Servicos;Qt_Recurso_TA;Qt_Open_Day\n\
             Lages;Serra;APAE;3;0;1\n"
        );
    }

    #[test]
    fn test_export_sanitizes_text() {
        let mut ed = Editor::new();
        ed.apply(EditCommand::AddRow).unwrap();
        ed.apply(set(0, Field::NomeInstituicao, "Escola; Centro\nNorte")).unwrap();
        let out = ed.export_csv();
        assert!(out.ends_with(";;Escola, Centro Norte;0;0;0\n"));
    }

    #[test]
    fn test_unknown_municipios() {
        let mut ed = Editor::with_municipios(vec!["Florianópolis".to_string(), "São José".to_string()]);
        ed.import_text("Municipio\nflorianopolis\nSao  Jose\nFloripa\n\n");
        assert_eq!(ed.unknown_municipios(), vec![2]);
        assert!(Editor::new().unknown_municipios().is_empty());
    }

    #[test]
    fn test_load_failure_keeps_rows() {
        let mut ed = Editor::new();
        ed.import_text("Municipio\nA\n");
        assert!(ed.load("missing/instituicoes.csv").is_err());
        assert_eq!(ed.rows().len(), 1);
    }
}
