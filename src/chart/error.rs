use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Failed to read chart file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse chart: {0}")]
    Parse(String),

    #[error("Unknown chart: {id}")]
    UnknownChart { id: String },
}
