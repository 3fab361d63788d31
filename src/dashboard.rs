use crate::error::Result;
use crate::loader::{self, LoadReport};
use crate::reports::build_aggregates;
use crate::types::{AggregateResult, InstitutionRow};
use log::warn;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub rows: Vec<InstitutionRow>,
    pub aggregates: AggregateResult,
    pub report: LoadReport,
}

/// Owns whatever the charts and the map currently show.
#[derive(Debug, Default)]
pub struct Dashboard {
    state: Option<DashboardState>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&DashboardState> {
        self.state.as_ref()
    }

    /// Load and aggregate `path`. If loading fails the previous state stays.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<&DashboardState> {
        let (rows, report) = match loader::load_instituicoes(path) {
            Ok(x) => x,
            Err(e) => {
                warn!("Keeping previous dashboard data: {}", e);
                return Err(e);
            }
        };
        let aggregates = build_aggregates(&rows);
        Ok(self.state.insert(DashboardState {
            rows,
            aggregates,
            report,
        }))
    }
}
