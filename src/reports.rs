use crate::types::{
    AggregateResult, InstitutionRow, InstitutionSummary, MuniTotals, MunicipioBucket,
    MunicipioTotalsRow, Region, SeriesRow, SummaryStats, TypeTotals,
};
use crate::util::normalize_key;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeMap;

/// Fold canonical rows into the per-municipality, per-type and per-region
/// rollups.
///
/// - Type totals take every row.
/// - Rows without a municipality stop there.
/// - Region totals take the row only when `regiao` is exactly one of the
///   six region names.
/// - Spelling variants of a municipality share a bucket through
///   [`normalize_key`]. The first row names the bucket; the first non-empty
///   region sticks.
pub fn build_aggregates(rows: &[InstitutionRow]) -> AggregateResult {
    let mut totals_by_type = TypeTotals::default();
    let mut totals_by_regiao: BTreeMap<Region, u64> =
        Region::ALL.iter().map(|r| (*r, 0)).collect();
    let mut by_municipio: BTreeMap<String, MunicipioBucket> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let inst = InstitutionSummary::from(row);
        totals_by_type.add(&inst);

        let municipio = row.municipio.trim();
        if municipio.is_empty() {
            skipped += 1;
            continue;
        }

        if let Some(region) = Region::from_exact(&row.regiao) {
            let e = totals_by_regiao.entry(region).or_insert(0);
            *e = e.saturating_add(inst.total());
        }

        let regiao = row.regiao.trim();
        let bucket = by_municipio
            .entry(normalize_key(municipio))
            .or_insert_with(|| MunicipioBucket {
                municipio: municipio.to_string(),
                regiao: regiao.to_string(),
                institutions: Vec::new(),
            });
        if bucket.regiao.is_empty() && !regiao.is_empty() {
            bucket.regiao = regiao.to_string();
        }
        bucket.institutions.push(inst);
    }

    let muni_totals: BTreeMap<String, MuniTotals> = by_municipio
        .iter()
        .map(|(k, b)| (k.clone(), b.totals()))
        .collect();

    debug!(
        "Aggregated {} rows into {} municipios ({} rows without municipio)",
        rows.len(),
        by_municipio.len(),
        skipped
    );

    AggregateResult {
        by_municipio,
        muni_totals,
        totals_by_type,
        totals_by_regiao,
    }
}

impl MunicipioBucket {
    pub fn totals(&self) -> MuniTotals {
        let mut t = TypeTotals::default();
        for inst in &self.institutions {
            t.add(inst);
        }
        MuniTotals::from(t)
    }

    /// Institutions worth listing in a popup: something counted, or at
    /// least a name.
    pub fn detailed_institutions(&self) -> Vec<&InstitutionSummary> {
        self.institutions
            .iter()
            .filter(|i| i.total() > 0 || !i.nome.trim().is_empty())
            .collect()
    }
}

impl AggregateResult {
    /// Bucket and totals for any spelling of a municipality name.
    pub fn lookup(&self, name: &str) -> Option<(&MunicipioBucket, MuniTotals)> {
        let key = normalize_key(name);
        let bucket = self.by_municipio.get(&key)?;
        let totals = self.muni_totals.get(&key).copied().unwrap_or_default();
        Some((bucket, totals))
    }

    /// Total for a map feature name; unknown names count as zero.
    pub fn total_for(&self, name: &str) -> u64 {
        self.muni_totals
            .get(&normalize_key(name))
            .map(|t| t.total)
            .unwrap_or(0)
    }

    pub fn type_series(&self) -> Vec<SeriesRow> {
        let t = &self.totals_by_type;
        vec![
            SeriesRow { label: "Serviços".to_string(), value: t.servicos },
            SeriesRow { label: "Recursos de TA".to_string(), value: t.recurso_ta },
            SeriesRow { label: "Open Day".to_string(), value: t.open_day },
        ]
    }

    pub fn region_series(&self) -> Vec<SeriesRow> {
        Region::ALL
            .iter()
            .map(|r| SeriesRow {
                label: r.to_string(),
                value: self.totals_by_regiao.get(r).copied().unwrap_or(0),
            })
            .collect()
    }

    /// One line per municipality, largest total first.
    pub fn municipio_table(&self) -> Vec<MunicipioTotalsRow> {
        let mut rows: Vec<MunicipioTotalsRow> = self
            .by_municipio
            .iter()
            .map(|(key, b)| {
                let t = self.muni_totals.get(key).copied().unwrap_or_default();
                MunicipioTotalsRow {
                    municipio: b.municipio.clone(),
                    regiao: b.regiao.clone(),
                    instituicoes: b.institutions.len(),
                    servicos: t.servicos,
                    recurso_ta: t.recurso_ta,
                    open_day: t.open_day,
                    total: t.total,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.municipio.cmp(&b.municipio)));
        rows
    }
}

pub fn generate_summary(
    rows: &[InstitutionRow],
    aggs: &AggregateResult,
    generated_at: DateTime<Utc>,
) -> SummaryStats {
    SummaryStats {
        generated_at,
        total_rows: rows.len(),
        total_municipios: aggs.by_municipio.len(),
        municipios_with_data: aggs.muni_totals.values().filter(|t| t.total > 0).count(),
        grand_total: aggs.totals_by_type.total(),
        totals_by_type: aggs.totals_by_type,
        totals_by_regiao: aggs.totals_by_regiao.clone(),
    }
}

/// One-line JSON view of the headline counts, plain integers.
pub fn summary_headline(s: &SummaryStats) -> String {
    format!(
        "{{\"total_municipios\": {}, \"grand_total\": {}}}",
        s.total_municipios, s.grand_total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::rows_from_text;

    fn row(municipio: &str, regiao: &str, nome: &str, qts: (u64, u64, u64)) -> InstitutionRow {
        InstitutionRow {
            municipio: municipio.to_string(),
            regiao: regiao.to_string(),
            nome_instituicao: nome.to_string(),
            qt_servicos: qts.0,
            qt_recurso_ta: qts.1,
            qt_open_day: qts.2,
        }
    }

    #[test]
    fn test_empty_input_has_all_regions_at_zero() {
        let aggs = build_aggregates(&[]);
        assert!(aggs.by_municipio.is_empty());
        assert!(aggs.muni_totals.is_empty());
        assert_eq!(aggs.totals_by_type, TypeTotals::default());
        assert_eq!(aggs.totals_by_regiao.len(), 6);
        assert!(aggs.totals_by_regiao.values().all(|v| *v == 0));
        for r in Region::ALL {
            assert!(aggs.totals_by_regiao.contains_key(&r));
        }
    }

    #[test]
    fn test_accent_variants_share_a_bucket() {
        let rows = rows_from_text(
            "Municipio;Regiao;Qt_Servicos\n\
             São José;Grande Florianópolis;3\n\
             sao jose;;2\n",
        );
        let aggs = build_aggregates(&rows);
        assert_eq!(aggs.by_municipio.len(), 1);
        let bucket = &aggs.by_municipio["sao jose"];
        assert_eq!(bucket.municipio, "São José");
        assert_eq!(bucket.regiao, "Grande Florianópolis");
        assert_eq!(bucket.institutions.len(), 2);
        assert_eq!(aggs.muni_totals["sao jose"].servicos, 5);
        assert_eq!(aggs.muni_totals["sao jose"].total, 5);
    }

    #[test]
    fn test_first_non_empty_region_wins() {
        let rows = vec![
            row("Palhoça", "", "A", (1, 0, 0)),
            row("palhoca", "Grande Florianópolis", "B", (1, 0, 0)),
            row("PALHOÇA", "Sul", "C", (1, 0, 0)),
        ];
        let aggs = build_aggregates(&rows);
        let bucket = &aggs.by_municipio["palhoca"];
        assert_eq!(bucket.municipio, "Palhoça");
        assert_eq!(bucket.regiao, "Grande Florianópolis");
        let names: Vec<&str> = bucket.institutions.iter().map(|i| i.nome.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_region_rollup_is_exact_match() {
        let rows = vec![
            row("Joinville", "Norte ", "A", (2, 1, 0)),
            row("Jaraguá do Sul", "Norte", "B", (1, 0, 0)),
            row("Mafra", "norte", "C", (4, 0, 0)),
        ];
        let aggs = build_aggregates(&rows);
        assert_eq!(aggs.totals_by_regiao[&Region::Norte], 1);
        assert_eq!(aggs.totals_by_type.servicos, 7);
        assert_eq!(aggs.totals_by_type.recurso_ta, 1);
        // The bucket still gets a trimmed region and its totals.
        assert_eq!(aggs.by_municipio["joinville"].regiao, "Norte");
        assert_eq!(aggs.muni_totals["joinville"].total, 3);
    }

    #[test]
    fn test_type_totals_include_rows_without_municipio() {
        let rows = vec![
            row("", "Sul", "Sem município", (5, 1, 1)),
            row("Criciúma", "Sul", "X", (2, 0, 0)),
            row("Tubarão", "Planalto", "Y", (3, 0, 0)),
        ];
        let aggs = build_aggregates(&rows);
        assert_eq!(aggs.totals_by_type.servicos, 10);
        assert_eq!(aggs.totals_by_type.total(), 12);
        // Municipality and region rollups skip the anonymous row.
        assert_eq!(aggs.by_municipio.len(), 2);
        assert_eq!(aggs.totals_by_regiao[&Region::Sul], 2);
        let muni_sum: u64 = aggs.muni_totals.values().map(|t| t.servicos).sum();
        assert_eq!(muni_sum, 5);
        let region_sum: u64 = aggs.totals_by_regiao.values().sum();
        assert!(region_sum <= aggs.totals_by_type.total());
    }

    #[test]
    fn test_muni_totals_sum_three_types() {
        let rows = vec![
            row("Lages", "Serra", "A", (1, 2, 3)),
            row("Lages", "Serra", "B", (4, 5, 6)),
        ];
        let aggs = build_aggregates(&rows);
        assert_eq!(
            aggs.muni_totals["lages"],
            MuniTotals { servicos: 5, recurso_ta: 7, open_day: 9, total: 21 }
        );
        assert_eq!(aggs.totals_by_regiao[&Region::Serra], 21);
    }

    #[test]
    fn test_series_and_lookup() {
        let rows = vec![
            row("Itajaí", "Vale do Itajai", "", (0, 0, 0)),
            row("Itajaí", "Vale do Itajai", "APAE", (0, 0, 0)),
            row("Blumenau", "Vale do Itajai", "", (1, 0, 2)),
        ];
        let aggs = build_aggregates(&rows);

        let types = aggs.type_series();
        assert_eq!(types[0], SeriesRow { label: "Serviços".to_string(), value: 1 });
        assert_eq!(types[2].value, 2);

        let regions = aggs.region_series();
        assert_eq!(regions.len(), 6);
        assert_eq!(regions[0].label, "Grande Florianópolis");
        assert_eq!(regions[3].label, "Vale do Itajai");
        assert_eq!(regions[3].value, 3);

        let (bucket, totals) = aggs.lookup("ITAJAI").unwrap();
        assert_eq!(totals.total, 0);
        let detailed = bucket.detailed_institutions();
        assert_eq!(detailed.len(), 1);
        assert_eq!(detailed[0].nome, "APAE");

        assert!(aggs.lookup("Florianópolis").is_none());
        assert_eq!(aggs.total_for("blumenau"), 3);
        assert_eq!(aggs.total_for("Florianópolis"), 0);

        let table = aggs.municipio_table();
        assert_eq!(table[0].municipio, "Blumenau");
        assert_eq!(table[1].instituicoes, 2);
    }

    #[test]
    fn test_generate_summary() {
        let rows = vec![
            row("Lages", "Serra", "A", (1, 0, 0)),
            row("Urubici", "Serra", "B", (0, 0, 0)),
            row("", "", "", (2, 0, 0)),
        ];
        let aggs = build_aggregates(&rows);
        let now = Utc::now();
        let s = generate_summary(&rows, &aggs, now);
        assert_eq!(s.generated_at, now);
        assert_eq!(s.total_rows, 3);
        assert_eq!(s.total_municipios, 2);
        assert_eq!(s.municipios_with_data, 1);
        assert_eq!(s.grand_total, 3);
        assert_eq!(s.totals_by_regiao[&Region::Serra], 1);
    }

    #[test]
    fn test_summary_headline_is_valid_json() {
        let rows = vec![row("Lages", "Serra", "A", (1234, 0, 0))];
        let aggs = build_aggregates(&rows);
        let line = summary_headline(&generate_summary(&rows, &aggs, Utc::now()));
        assert_eq!(line, r#"{"total_municipios": 1, "grand_total": 1234}"#);
        let js: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(js["grand_total"], 1234);
    }
}
