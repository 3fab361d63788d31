//! Data core of the CERTA institutions dashboard: loads the `;`-separated
//! institutions table, normalizes it and rolls it up per municipality,
//! type of assistance and region for the charts, the map and the admin
//! editor.
pub mod codec;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod geo;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{DashboardError, Result};
pub use reports::build_aggregates;
pub use types::{AggregateResult, EditableRow, Field, InstitutionRow, Region};
