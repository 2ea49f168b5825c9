use std::sync::Arc;

use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

use super::{Anchor, Coord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Point,
    Line,
    Polygon,
}

impl LayerKind {
    /// Line and polygon layers carry a length/orientation summary.
    pub fn has_summary(&self) -> bool {
        matches!(self, LayerKind::Line | LayerKind::Polygon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotRequested,
    Loading,
    Loaded,
    Failed,
}

impl LoadState {
    /// `Loading` and `Loaded` block another fetch; the other states allow one.
    pub fn can_request(&self) -> bool {
        matches!(self, LoadState::NotRequested | LoadState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySummary {
    pub length_label: String,
    pub angle_label: String,
}

/// What a loader hands back for a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPayload {
    pub geometry: FeatureCollection,
    pub table_rows: Option<serde_json::Value>,
    pub summary_stats: Option<serde_json::Value>,
    pub legend_entries: Option<serde_json::Value>,
}

impl LayerPayload {
    pub fn new(geometry: FeatureCollection) -> Self {
        Self {
            geometry,
            table_rows: None,
            summary_stats: None,
            legend_entries: None,
        }
    }
}

impl From<FeatureCollection> for LayerPayload {
    fn from(geometry: FeatureCollection) -> Self {
        Self::new(geometry)
    }
}

/// One map overlay. `source_ref` and `kind` are fixed at construction; the
/// loaded fields are only written by the registry.
#[derive(Debug, Clone)]
pub struct LayerRecord {
    pub(crate) id: String,
    pub(crate) display_name: String,
    pub(crate) kind: LayerKind,
    pub(crate) color_tag: String,
    pub(crate) source_ref: String,
    pub(crate) load_state: LoadState,
    pub(crate) visible: bool,
    pub(crate) externally_managed: bool,
    pub(crate) anchor: Option<Anchor>,
    pub(crate) geometry: Option<Arc<FeatureCollection>>,
    pub(crate) summary: Option<GeometrySummary>,
    pub(crate) bounds_center_cache: Option<Coord>,
    pub(crate) table_rows: Option<serde_json::Value>,
    pub(crate) summary_stats: Option<serde_json::Value>,
    pub(crate) legend_entries: Option<serde_json::Value>,
    pub(crate) loaded_at: Option<DateTime<Utc>>,
}

/// These implementations are for constructors.
impl LayerRecord {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: LayerKind,
        color_tag: impl Into<String>,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            color_tag: color_tag.into(),
            source_ref: source_ref.into(),
            load_state: LoadState::NotRequested,
            visible: false,
            externally_managed: false,
            anchor: None,
            geometry: None,
            summary: None,
            bounds_center_cache: None,
            table_rows: None,
            summary_stats: None,
            legend_entries: None,
            loaded_at: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Marks a layer whose data is filled in by another subsystem, so turning
    /// it on never triggers a fetch.
    pub fn externally_managed(mut self) -> Self {
        self.externally_managed = true;
        self
    }
}

impl LayerRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn color_tag(&self) -> &str {
        &self.color_tag
    }

    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_externally_managed(&self) -> bool {
        self.externally_managed
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    pub fn geometry(&self) -> Option<&FeatureCollection> {
        self.geometry.as_deref()
    }

    pub fn summary(&self) -> Option<&GeometrySummary> {
        self.summary.as_ref()
    }

    pub fn bounds_center_cache(&self) -> Option<Coord> {
        self.bounds_center_cache
    }

    pub fn table_rows(&self) -> Option<&serde_json::Value> {
        self.table_rows.as_ref()
    }

    pub fn summary_stats(&self) -> Option<&serde_json::Value> {
        self.summary_stats.as_ref()
    }

    pub fn legend_entries(&self) -> Option<&serde_json::Value> {
        self.legend_entries.as_ref()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

/// Presentation grouping; has no lifecycle of its own.
#[derive(Debug, Clone)]
pub struct LayerGroup {
    pub name: String,
    pub layers: Vec<LayerRecord>,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>, layers: Vec<LayerRecord>) -> Self {
        Self {
            name: name.into(),
            layers,
        }
    }
}
