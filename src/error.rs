use std::path::PathBuf;

use thiserror::Error;

/// Why a layer's data could not be fetched or parsed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("invalid GeoJSON in {source_ref}: {source}")]
    Parse {
        source_ref: String,
        #[source]
        source: geojson::Error,
    },
    #[error("{source_ref} is not a FeatureCollection")]
    NotFeatureCollection { source_ref: String },
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("layer '{0}' not found")]
    NotFound(String),
    #[error("layer id '{0}' is already registered")]
    DuplicateLayer(String),
    #[error("layer '{id}' failed to load: {source}")]
    Load {
        id: String,
        #[source]
        source: LoadError,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("layer id '{0}' is declared more than once")]
    DuplicateLayer(String),
}
