mod error;
mod model;
mod normalize;
mod parser;
mod tempo;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;

pub use error::ChartError;
pub use model::{Chart, Difficulty, LANE_COUNT, Metadata, Note, SectionMarker};
pub use normalize::normalize_chart_text;
pub use parser::ChartParser;
pub use tempo::{TempoChange, TempoMap, TimeSignature};

/// Resolves a chart id to a parsed chart. Storage is an external concern;
/// implementations: `FsChartLibrary` (production), `MemoryChartLibrary`
/// (tests, preloaded charts).
pub trait ChartLibrary {
    fn load(&self, chart_id: &str) -> Result<Chart>;
}

/// Loads `<root>/<id>.chart`, normalizing the text before parsing.
pub struct FsChartLibrary {
    root: PathBuf,
    difficulty: Difficulty,
}

impl FsChartLibrary {
    pub fn new(root: impl Into<PathBuf>, difficulty: Difficulty) -> Self {
        Self {
            root: root.into(),
            difficulty,
        }
    }
}

impl ChartLibrary for FsChartLibrary {
    fn load(&self, chart_id: &str) -> Result<Chart> {
        let path = self.root.join(format!("{chart_id}.chart"));
        let text = std::fs::read_to_string(&path).map_err(|source| ChartError::FileRead {
            path: path.clone(),
            source,
        })?;
        ChartParser::parse(&normalize_chart_text(&text), self.difficulty)
    }
}

#[derive(Default)]
pub struct MemoryChartLibrary {
    charts: HashMap<String, Chart>,
}

impl MemoryChartLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, chart: Chart) {
        self.charts.insert(id.into(), chart);
    }
}

impl ChartLibrary for MemoryChartLibrary {
    fn load(&self, chart_id: &str) -> Result<Chart> {
        self.charts
            .get(chart_id)
            .cloned()
            .ok_or_else(|| {
                ChartError::UnknownChart {
                    id: chart_id.to_string(),
                }
                .into()
            })
    }
}
