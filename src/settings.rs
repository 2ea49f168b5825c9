//! Registry configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "flavor": "institution",
//!   "defaultZoom": 12,
//!   "baseUrl": "https://example.org/data",
//!   "themes": { "default": "light", "byColor": { "neon": "dark" } },
//!   "groups": [
//!     { "name": "Education", "layers": [
//!       { "id": "schools", "displayName": "Schools", "kind": "point",
//!         "colorTag": "gold", "sourceRef": "paris/schools.geojson",
//!         "anchor": { "lon": 2.35, "lat": 48.85, "zoom": 13 } }
//!     ] }
//!   ]
//! }
//! ```

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::geojson::{FileLoader, HttpLoader, LayerLoader};
use crate::registry::{DEFAULT_ZOOM, RegistryFlavor, ThemeMap};
use crate::types::{Anchor, LayerKind, LayerRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrySettings {
    pub flavor: RegistryFlavor,
    pub default_zoom: u8,
    /// Directory for local GeoJSON files.
    pub data_root: Option<PathBuf>,
    /// Static file server; takes precedence over `data_root`.
    pub base_url: Option<String>,
    pub themes: ThemeMap,
    pub groups: Vec<GroupSettings>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            flavor: RegistryFlavor::default(),
            default_zoom: DEFAULT_ZOOM,
            data_root: None,
            base_url: None,
            themes: ThemeMap::default(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<LayerSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSettings {
    pub id: String,
    /// Falls back to the id.
    #[serde(default)]
    pub display_name: Option<String>,
    pub kind: LayerKind,
    #[serde(default)]
    pub color_tag: String,
    pub source_ref: String,
    #[serde(default)]
    pub anchor: Option<Anchor>,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub externally_managed: bool,
}

impl LayerSettings {
    pub fn to_record(&self) -> LayerRecord {
        let display_name = self.display_name.clone().unwrap_or_else(|| self.id.clone());
        let mut record = LayerRecord::new(
            self.id.clone(),
            display_name,
            self.kind,
            self.color_tag.clone(),
            self.source_ref.clone(),
        )
        .with_visible(self.visible);
        if let Some(anchor) = self.anchor {
            record = record.with_anchor(anchor);
        }
        if self.externally_managed {
            record = record.externally_managed();
        }
        record
    }
}

impl RegistrySettings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let data = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, SettingsError> {
        let settings: RegistrySettings = serde_json::from_str(data)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Layer ids must be unique across every group.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut seen = HashSet::new();
        for layer in self.groups.iter().flat_map(|group| group.layers.iter()) {
            if !seen.insert(layer.id.as_str()) {
                return Err(SettingsError::DuplicateLayer(layer.id.clone()));
            }
        }
        Ok(())
    }

    pub fn data_root(&self) -> PathBuf {
        self.data_root.clone().unwrap_or_else(default_data_dir)
    }

    /// HTTP when a base URL is configured, local files otherwise.
    pub fn loader(&self) -> Arc<dyn LayerLoader> {
        match &self.base_url {
            Some(base_url) => Arc::new(HttpLoader::new(base_url)),
            None => Arc::new(FileLoader::new(self.data_root())),
        }
    }
}

/// Per-user data directory, or `./data` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "map-layers")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    const SETTINGS: &str = r#"{
        "flavor": "city",
        "defaultZoom": 10,
        "dataRoot": "/srv/maps",
        "themes": {"default": "light", "byColor": {"neon": "dark"}},
        "groups": [
            {"name": "Cities", "layers": [
                {"id": "berlin", "displayName": "Berlin", "kind": "polygon",
                 "colorTag": "neon", "sourceRef": "berlin/boundary.geojson",
                 "anchor": {"lon": 13.4, "lat": 52.52, "zoom": 10}},
                {"id": "rivers", "kind": "line", "sourceRef": "berlin/rivers.geojson",
                 "externallyManaged": true}
            ]}
        ]
    }"#;

    #[test]
    fn parses_full_settings() {
        let settings = RegistrySettings::from_json(SETTINGS).unwrap();
        assert_eq!(settings.flavor, RegistryFlavor::City);
        assert_eq!(settings.default_zoom, 10);
        assert_eq!(settings.data_root(), PathBuf::from("/srv/maps"));
        assert_eq!(settings.themes.theme_for("neon"), "dark");

        let layers = &settings.groups[0].layers;
        let berlin = layers[0].to_record();
        assert_eq!(berlin.kind(), LayerKind::Polygon);
        assert_eq!(berlin.anchor().unwrap().center, Coord::new(13.4, 52.52));

        let rivers = layers[1].to_record();
        assert_eq!(rivers.display_name(), "rivers");
        assert!(rivers.is_externally_managed());
        assert!(!rivers.is_visible());
    }

    #[test]
    fn empty_object_uses_defaults() {
        let settings = RegistrySettings::from_json("{}").unwrap();
        assert_eq!(settings, RegistrySettings::default());
        assert_eq!(settings.flavor, RegistryFlavor::Institution);
        assert_eq!(settings.default_zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let data = r#"{"groups": [
            {"name": "A", "layers": [{"id": "x", "kind": "point", "sourceRef": "a.geojson"}]},
            {"name": "B", "layers": [{"id": "x", "kind": "line", "sourceRef": "b.geojson"}]}
        ]}"#;
        let err = RegistrySettings::from_json(data).unwrap_err();
        assert!(matches!(err, SettingsError::DuplicateLayer(id) if id == "x"));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let data = r#"{"groups": [{"name": "A", "layers": [
            {"id": "x", "kind": "raster", "sourceRef": "a.tif"}
        ]}]}"#;
        assert!(matches!(
            RegistrySettings::from_json(data),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers.json");
        std::fs::write(&path, SETTINGS).unwrap();
        let settings = RegistrySettings::from_file(&path).unwrap();
        assert_eq!(settings.groups.len(), 1);

        let missing = RegistrySettings::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, SettingsError::Io { .. }));
    }
}
