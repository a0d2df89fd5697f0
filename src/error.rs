use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tier table is empty")]
    EmptyTierTable,

    #[error("tier {index} is unbounded but is not the last tier")]
    UnboundedTierNotLast { index: usize },

    #[error("last tier must be unbounded, found threshold {threshold}")]
    BoundedFinalTier { threshold: u32 },

    #[error("tier thresholds must be strictly increasing: tier {index} has {threshold} after {previous}")]
    ThresholdsNotIncreasing {
        index: usize,
        threshold: u32,
        previous: u32,
    },

    #[error("pause chance {value} in tier {index} exceeds 100")]
    PauseChanceOutOfRange { index: usize, value: u32 },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f32 },

    #[error("{field} ({value}) must not exceed {limit_field} ({limit})")]
    OutOfOrder {
        field: &'static str,
        value: f32,
        limit_field: &'static str,
        limit: f32,
    },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
