// Municipality polygons for the choropleth.
//
// Only the feature names matter here; geometry is left to whatever draws
// the map.
use crate::error::{GeoJsonParseSnafu, ResourceUnavailableSnafu, Result};
use crate::types::AggregateResult;
use crate::util::normalize_key;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value as JSValue;
use snafu::ResultExt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_GEOJSON_PATH: &str = "data/sc_municipios.geojson";

const COLOR_RED: &str = "#DC2626";
const COLOR_GRAY: &str = "#CBD5E1";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<JSValue>,
}

impl RawFeature {
    fn name(&self) -> Option<String> {
        match self.properties.as_ref()?.get("name")? {
            JSValue::String(s) => Some(s.clone()),
            JSValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStyle {
    HasData,
    NoData,
}

impl FillStyle {
    pub fn color(self) -> &'static str {
        match self {
            FillStyle::HasData => COLOR_RED,
            FillStyle::NoData => COLOR_GRAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStyle {
    pub name: String,
    pub key: String,
    pub total: u64,
    pub fill: FillStyle,
}

/// Feature names of a GeoJSON layer, in file order. Unnamed features keep
/// their slot with an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoLayer {
    pub names: Vec<String>,
}

impl FromStr for GeoLayer {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let fc: FeatureCollection = serde_json::from_str(s)?;
        let names = fc
            .features
            .iter()
            .map(|f| f.name().unwrap_or_default())
            .collect();
        Ok(GeoLayer { names })
    }
}

pub fn load_geojson<P: AsRef<Path>>(path: P) -> Result<GeoLayer> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let bytes = fs::read(path).context(ResourceUnavailableSnafu { path: label.clone() })?;
    let text = String::from_utf8_lossy(&bytes);
    let layer = text.parse::<GeoLayer>().context(GeoJsonParseSnafu { path: label })?;
    info!("Loaded {} map features from {}", layer.names.len(), path.display());
    Ok(layer)
}

impl GeoLayer {
    /// Fill for every feature. Names with no matching municipality are
    /// drawn as "no data".
    pub fn styles(&self, aggs: &AggregateResult) -> Vec<FeatureStyle> {
        self.names
            .iter()
            .map(|name| {
                let key = normalize_key(name);
                let total = aggs.muni_totals.get(&key).map(|t| t.total).unwrap_or(0);
                let fill = if total > 0 {
                    FillStyle::HasData
                } else {
                    FillStyle::NoData
                };
                FeatureStyle {
                    name: name.clone(),
                    key,
                    total,
                    fill,
                }
            })
            .collect()
    }

    /// Distinct trimmed names for the editor's suggestion list.
    pub fn municipio_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_by(|a, b| normalize_key(a).cmp(&normalize_key(b)).then_with(|| a.cmp(b)));
        names.dedup();
        debug!("{} distinct municipio names", names.len());
        names
    }

    /// Aggregate keys with no polygon on the map (usually typos in the CSV).
    pub fn unmatched_keys<'a>(&self, aggs: &'a AggregateResult) -> Vec<&'a str> {
        let known: std::collections::HashSet<String> =
            self.names.iter().map(|n| normalize_key(n)).collect();
        aggs.by_municipio
            .keys()
            .filter(|k| !known.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}
