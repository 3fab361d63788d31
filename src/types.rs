use crate::error::{DashboardError, UnknownFieldSnafu};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// The six administrative regions, in chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Grande Florianópolis")]
    GrandeFlorianopolis,
    #[serde(rename = "Norte")]
    Norte,
    #[serde(rename = "Oeste")]
    Oeste,
    #[serde(rename = "Vale do Itajai")]
    ValeDoItajai,
    #[serde(rename = "Sul")]
    Sul,
    #[serde(rename = "Serra")]
    Serra,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::GrandeFlorianopolis,
        Region::Norte,
        Region::Oeste,
        Region::ValeDoItajai,
        Region::Sul,
        Region::Serra,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::GrandeFlorianopolis => "Grande Florianópolis",
            Region::Norte => "Norte",
            Region::Oeste => "Oeste",
            Region::ValeDoItajai => "Vale do Itajai",
            Region::Sul => "Sul",
            Region::Serra => "Serra",
        }
    }

    /// Exact, case-sensitive membership. `"Norte "` and `"norte"` are not regions.
    pub fn from_exact(s: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The columns of the institutions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Municipio,
    Regiao,
    NomeInstituicao,
    QtServicos,
    QtRecursoTa,
    QtOpenDay,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Municipio,
        Field::Regiao,
        Field::NomeInstituicao,
        Field::QtServicos,
        Field::QtRecursoTa,
        Field::QtOpenDay,
    ];

    /// Accepted header spellings, most canonical first. The first entry is
    /// the one written on export.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Municipio => &["Municipio", "municipio"],
            Field::Regiao => &["Regiao", "regiao"],
            Field::NomeInstituicao => &["Nome_Instituicao", "Nome da Instituição", "Instituicao"],
            Field::QtServicos => &["Qt_Servicos", "Qt de Serviços", "Servicos"],
            Field::QtRecursoTa => &["Qt_Recurso_TA", "Qt de Recurso de TA", "RecursosTA"],
            Field::QtOpenDay => &["Qt_Open_Day", "Qt de Open Day", "OpenDay"],
        }
    }

    pub fn header(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn is_quantity(self) -> bool {
        matches!(self, Field::QtServicos | Field::QtRecursoTa | Field::QtOpenDay)
    }

    pub fn export_header() -> [&'static str; 6] {
        Field::ALL.map(Field::header)
    }
}

impl FromStr for Field {
    type Err = DashboardError;

    /// Any known header spelling, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Field::ALL
            .into_iter()
            .find(|f| f.aliases().iter().any(|a| a.eq_ignore_ascii_case(wanted)))
            .ok_or_else(|| UnknownFieldSnafu { name: wanted }.build())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One institution in one municipality, after header resolution and
/// coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionRow {
    pub municipio: String,
    pub regiao: String,
    pub nome_instituicao: String,
    pub qt_servicos: u64,
    pub qt_recurso_ta: u64,
    pub qt_open_day: u64,
}

/// A row of the admin table. Same content as [`InstitutionRow`], written
/// with the capitalized column names used by the exported file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableRow {
    #[serde(rename = "Municipio")]
    pub municipio: String,
    #[serde(rename = "Regiao")]
    pub regiao: String,
    #[serde(rename = "Nome_Instituicao")]
    pub nome_instituicao: String,
    #[serde(rename = "Qt_Servicos")]
    pub qt_servicos: u64,
    #[serde(rename = "Qt_Recurso_TA")]
    pub qt_recurso_ta: u64,
    #[serde(rename = "Qt_Open_Day")]
    pub qt_open_day: u64,
}

impl From<InstitutionRow> for EditableRow {
    fn from(r: InstitutionRow) -> Self {
        EditableRow {
            municipio: r.municipio,
            regiao: r.regiao,
            nome_instituicao: r.nome_instituicao,
            qt_servicos: r.qt_servicos,
            qt_recurso_ta: r.qt_recurso_ta,
            qt_open_day: r.qt_open_day,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstitutionSummary {
    pub nome: String,
    pub servicos: u64,
    #[serde(rename = "recursoTA")]
    pub recurso_ta: u64,
    #[serde(rename = "openDay")]
    pub open_day: u64,
}

impl InstitutionSummary {
    pub fn total(&self) -> u64 {
        self.servicos
            .saturating_add(self.recurso_ta)
            .saturating_add(self.open_day)
    }
}

impl From<&InstitutionRow> for InstitutionSummary {
    fn from(r: &InstitutionRow) -> Self {
        InstitutionSummary {
            nome: r.nome_instituicao.trim().to_string(),
            servicos: r.qt_servicos,
            recurso_ta: r.qt_recurso_ta,
            open_day: r.qt_open_day,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MunicipioBucket {
    /// Display name, as first seen.
    pub municipio: String,
    pub regiao: String,
    pub institutions: Vec<InstitutionSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeTotals {
    pub servicos: u64,
    #[serde(rename = "recursoTA")]
    pub recurso_ta: u64,
    #[serde(rename = "openDay")]
    pub open_day: u64,
}

impl TypeTotals {
    pub fn add(&mut self, inst: &InstitutionSummary) {
        self.servicos = self.servicos.saturating_add(inst.servicos);
        self.recurso_ta = self.recurso_ta.saturating_add(inst.recurso_ta);
        self.open_day = self.open_day.saturating_add(inst.open_day);
    }

    pub fn total(&self) -> u64 {
        self.servicos
            .saturating_add(self.recurso_ta)
            .saturating_add(self.open_day)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MuniTotals {
    pub servicos: u64,
    #[serde(rename = "recursoTA")]
    pub recurso_ta: u64,
    #[serde(rename = "openDay")]
    pub open_day: u64,
    pub total: u64,
}

impl From<TypeTotals> for MuniTotals {
    fn from(t: TypeTotals) -> Self {
        MuniTotals {
            servicos: t.servicos,
            recurso_ta: t.recurso_ta,
            open_day: t.open_day,
            total: t.total(),
        }
    }
}

/// Everything the charts, the map and the popups read. Rebuilt from
/// scratch for every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub by_municipio: BTreeMap<String, MunicipioBucket>,
    pub muni_totals: BTreeMap<String, MuniTotals>,
    pub totals_by_type: TypeTotals,
    pub totals_by_regiao: BTreeMap<Region, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct SeriesRow {
    #[tabled(rename = "Categoria")]
    pub label: String,
    #[tabled(rename = "Quantidade")]
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct MunicipioTotalsRow {
    #[serde(rename = "Municipio")]
    #[tabled(rename = "Município")]
    pub municipio: String,
    #[serde(rename = "Regiao")]
    #[tabled(rename = "Região")]
    pub regiao: String,
    #[serde(rename = "Instituicoes")]
    #[tabled(rename = "Instituições")]
    pub instituicoes: usize,
    #[serde(rename = "Servicos")]
    #[tabled(rename = "Serviços")]
    pub servicos: u64,
    #[serde(rename = "RecursosTA")]
    #[tabled(rename = "Recursos de TA")]
    pub recurso_ta: u64,
    #[serde(rename = "OpenDay")]
    #[tabled(rename = "Open Day")]
    pub open_day: u64,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: u64,
}

#[derive(Debug, Clone, Tabled)]
pub struct EditorTableRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Município")]
    pub municipio: String,
    #[tabled(rename = "Região")]
    pub regiao: String,
    #[tabled(rename = "Nome da Instituição")]
    pub nome_instituicao: String,
    #[tabled(rename = "Qt de Serviços")]
    pub qt_servicos: u64,
    #[tabled(rename = "Qt de Recurso de TA")]
    pub qt_recurso_ta: u64,
    #[tabled(rename = "Qt de Open Day")]
    pub qt_open_day: u64,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: DateTime<Utc>,
    pub total_rows: usize,
    pub total_municipios: usize,
    pub municipios_with_data: usize,
    pub grand_total: u64,
    pub totals_by_type: TypeTotals,
    pub totals_by_regiao: BTreeMap<Region, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_exact_match_only() {
        assert_eq!(Region::from_exact("Norte"), Some(Region::Norte));
        assert_eq!(
            Region::from_exact("Grande Florianópolis"),
            Some(Region::GrandeFlorianopolis)
        );
        assert_eq!(Region::from_exact("Norte "), None);
        assert_eq!(Region::from_exact("norte"), None);
        assert_eq!(Region::from_exact("Grande Florianopolis"), None);
        assert_eq!(Region::from_exact(""), None);
    }

    #[test]
    fn test_region_order_follows_chart_order() {
        let names: Vec<&str> = Region::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            names,
            vec!["Grande Florianópolis", "Norte", "Oeste", "Vale do Itajai", "Sul", "Serra"]
        );
        let mut sorted = Region::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Region::ALL.to_vec());
    }

    #[test]
    fn test_field_from_str_accepts_aliases() {
        assert_eq!("Municipio".parse::<Field>().unwrap(), Field::Municipio);
        assert_eq!("qt_servicos".parse::<Field>().unwrap(), Field::QtServicos);
        assert_eq!("OpenDay".parse::<Field>().unwrap(), Field::QtOpenDay);
        assert_eq!(
            "Nome da Instituição".parse::<Field>().unwrap(),
            Field::NomeInstituicao
        );
        assert!(matches!(
            "Prefeito".parse::<Field>(),
            Err(DashboardError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_export_header() {
        assert_eq!(
            Field::export_header(),
            ["Municipio", "Regiao", "Nome_Instituicao", "Qt_Servicos", "Qt_Recurso_TA", "Qt_Open_Day"]
        );
    }

    #[test]
    fn test_aggregate_json_shape() {
        let mut totals_by_regiao = BTreeMap::new();
        totals_by_regiao.insert(Region::GrandeFlorianopolis, 3);
        let aggs = AggregateResult {
            by_municipio: BTreeMap::new(),
            muni_totals: BTreeMap::new(),
            totals_by_type: TypeTotals { servicos: 1, recurso_ta: 2, open_day: 0 },
            totals_by_regiao,
        };
        let js = serde_json::to_value(&aggs).unwrap();
        assert_eq!(js["totalsByType"]["recursoTA"], 2);
        assert_eq!(js["totalsByRegiao"]["Grande Florianópolis"], 3);
        assert!(js["byMunicipio"].as_object().unwrap().is_empty());
    }
}
