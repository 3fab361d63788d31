use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DashboardError {
    #[snafu(display("Failed to load {path}"))]
    ResourceUnavailable {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid GeoJSON in {path}"))]
    GeoJsonParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Failed to write CSV file {path}"))]
    WriteCsvFile { source: csv::Error, path: String },
    #[snafu(display("Failed to encode JSON for {path}"))]
    WriteJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Failed to write {path}"))]
    WriteFile {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Row {index} does not exist (table has {len} rows)"))]
    RowOutOfRange { index: usize, len: usize },
    #[snafu(display("Unknown field '{name}'"))]
    UnknownField { name: String },
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
