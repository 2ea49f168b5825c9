//! Layer catalog for small city map apps.
//!
//! [`LayerRegistry`] keeps the overlays of a map, loads their GeoJSON lazily
//! through an injected [`LayerLoader`](crate::geojson::LayerLoader), and
//! caches a length/orientation summary and a bounds center for each one.
//! Rendering is left to whoever subscribes to the registry.

pub mod error;
pub mod geojson;
pub mod registry;
pub mod settings;
pub mod types;

pub use error::{LoadError, RegistryError, SettingsError};
pub use registry::{
    BulkLoadReport, LayerEvent, LayerRegistry, LoadOutcome, RegistryFlavor, ThemeMap,
};
pub use settings::RegistrySettings;
