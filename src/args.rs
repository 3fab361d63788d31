use certa_dashboard::geo::DEFAULT_GEOJSON_PATH;
use certa_dashboard::loader::DEFAULT_CSV_PATH;
use clap::{Parser, Subcommand};

/// Dashboard and admin editor for the institutions-per-municipality table.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The `;`-separated institutions table.
    #[clap(short, long, value_parser, default_value = DEFAULT_CSV_PATH)]
    pub data: String,

    /// (file path) GeoJSON layer of municipalities, matched on `properties.name`.
    /// The summary still runs when it is missing.
    #[clap(short, long, value_parser, default_value = DEFAULT_GEOJSON_PATH)]
    pub geojson: String,

    /// (directory) Where reports and exported files are written.
    #[clap(short, long, value_parser, default_value = ".")]
    pub out_dir: String,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    /// Run a single action and exit. Without it the interactive menu starts.
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Aggregate the table, print the chart series and write the reports.
    Summary,
    /// Re-export the table with canonical headers and cleaned values.
    Export {
        /// (file path) Defaults to `<out-dir>/instituicoes.csv`.
        #[clap(long, value_parser)]
        output: Option<String>,
    },
    /// Open the table in the interactive editor.
    Edit,
}
