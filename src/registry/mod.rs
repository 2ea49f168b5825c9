use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use events::LayerEvent;
pub use loading::*;
pub use theme::ThemeMap;

use crate::error::{RegistryError, SettingsError};
use crate::geojson::{LayerLoader, bounds_center};
use crate::settings::RegistrySettings;
use crate::types::{LayerGroup, LayerRecord, NavigationTarget};
use events::EventBus;

mod events;
mod loading;
mod theme;

/// How visibility behaves across the whole registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryFlavor {
    /// Every layer is always shown and there is no toggle.
    City,
    /// Layers are switched on and off by the user and load on first show.
    #[default]
    Institution,
}

pub const DEFAULT_ZOOM: u8 = 12;

struct LayerEntry {
    record: LayerRecord,
    loader: Arc<dyn LayerLoader>,
}

struct GroupSlot {
    name: String,
    entries: Vec<LayerEntry>,
}

/// In-memory catalog of map layers.
///
/// All access goes through `&self`; the catalog lock is never held across a
/// loader await, so overlapping calls on one executor are safe.
pub struct LayerRegistry {
    flavor: RegistryFlavor,
    default_zoom: u8,
    themes: ThemeMap,
    groups: Mutex<Vec<GroupSlot>>,
    events: EventBus,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new(RegistryFlavor::default())
    }
}

/// These implementations are for constructors.
impl LayerRegistry {
    pub fn new(flavor: RegistryFlavor) -> Self {
        Self {
            flavor,
            default_zoom: DEFAULT_ZOOM,
            themes: ThemeMap::default(),
            groups: Mutex::new(Vec::new()),
            events: EventBus::default(),
        }
    }

    pub fn with_default_zoom(mut self, zoom: u8) -> Self {
        self.default_zoom = zoom;
        self
    }

    pub fn with_themes(mut self, themes: ThemeMap) -> Self {
        self.themes = themes;
        self
    }

    /// Builds the catalog described by `settings`, loading every layer
    /// through the loader the settings select.
    pub fn from_settings(settings: &RegistrySettings) -> Result<Self, SettingsError> {
        Self::from_settings_with_loader(settings, settings.loader())
    }

    pub fn from_settings_with_loader(
        settings: &RegistrySettings,
        loader: Arc<dyn LayerLoader>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let mut registry = Self::new(settings.flavor)
            .with_default_zoom(settings.default_zoom)
            .with_themes(settings.themes.clone());
        for group in &settings.groups {
            for layer in &group.layers {
                registry.insert(&group.name, layer.to_record(), loader.clone());
            }
        }
        Ok(registry)
    }

    /// Adds every layer of `group`, all sharing one loader.
    pub fn add_group(
        &mut self,
        group: LayerGroup,
        loader: Arc<dyn LayerLoader>,
    ) -> Result<(), RegistryError> {
        for record in group.layers {
            self.add_layer(&group.name, record, loader.clone())?;
        }
        Ok(())
    }

    /// Appends a layer to the named group, creating the group at the end if
    /// it does not exist yet. Ids must be unique across all groups.
    pub fn add_layer(
        &mut self,
        group_name: &str,
        record: LayerRecord,
        loader: Arc<dyn LayerLoader>,
    ) -> Result<(), RegistryError> {
        if self.contains(record.id()) {
            return Err(RegistryError::DuplicateLayer(record.id().to_string()));
        }
        self.insert(group_name, record, loader);
        Ok(())
    }

    fn insert(&mut self, group_name: &str, mut record: LayerRecord, loader: Arc<dyn LayerLoader>) {
        if self.flavor == RegistryFlavor::City {
            record.visible = true;
        }
        let groups = self.groups.get_mut().unwrap_or_else(PoisonError::into_inner);
        let entry = LayerEntry { record, loader };
        match groups.iter().position(|slot| slot.name == group_name) {
            Some(index) => groups[index].entries.push(entry),
            None => groups.push(GroupSlot {
                name: group_name.to_string(),
                entries: vec![entry],
            }),
        }
    }
}

impl LayerRegistry {
    pub fn flavor(&self) -> RegistryFlavor {
        self.flavor
    }

    pub fn default_zoom(&self) -> u8 {
        self.default_zoom
    }

    pub fn themes(&self) -> &ThemeMap {
        &self.themes
    }

    /// Receives every layer event published after this call.
    pub fn subscribe(&self) -> Receiver<LayerEvent> {
        self.events.subscribe()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.with_record(id, |_| ()).is_some()
    }

    pub fn find_by_id(&self, id: &str) -> Option<LayerRecord> {
        self.with_record(id, LayerRecord::clone)
    }

    /// Snapshot of every layer, in group order then insertion order.
    pub fn list_all(&self) -> Vec<LayerRecord> {
        self.lock()
            .iter()
            .flat_map(|slot| slot.entries.iter().map(|entry| entry.record.clone()))
            .collect()
    }

    /// Layers currently shown. A city registry shows everything.
    pub fn list_visible(&self) -> Vec<LayerRecord> {
        match self.flavor {
            RegistryFlavor::City => self.list_all(),
            RegistryFlavor::Institution => self
                .list_all()
                .into_iter()
                .filter(|record| record.visible)
                .collect(),
        }
    }

    pub fn group_names(&self) -> Vec<String> {
        self.lock().iter().map(|slot| slot.name.clone()).collect()
    }

    pub fn list_groups(&self) -> Vec<LayerGroup> {
        self.lock()
            .iter()
            .map(|slot| {
                LayerGroup::new(
                    slot.name.clone(),
                    slot.entries.iter().map(|entry| entry.record.clone()).collect(),
                )
            })
            .collect()
    }

    /// Basemap theme matching the layer's color tag.
    pub fn basemap_theme(&self, id: &str) -> Option<String> {
        self.with_record(id, |record| self.themes.theme_for(&record.color_tag).to_string())
    }

    /// Where to fly the map for a layer.
    ///
    /// Takes the cached bounding-box center first, then a center computed from
    /// loaded geometry, then the configured anchor. Never writes the cache.
    pub fn resolve_navigation_target(&self, id: &str) -> Result<NavigationTarget, RegistryError> {
        let target = self.with_record(id, |record| {
            let zoom = record.anchor.map_or(self.default_zoom, |anchor| anchor.zoom);
            if let Some(center) = record.bounds_center_cache {
                return Some(NavigationTarget { center, zoom });
            }
            if let Some(center) = record
                .geometry
                .as_ref()
                .and_then(|geometry| bounds_center(&geometry.features))
            {
                return Some(NavigationTarget { center, zoom });
            }
            record.anchor.map(|anchor| NavigationTarget {
                center: anchor.center,
                zoom: anchor.zoom,
            })
        });

        match target.flatten() {
            Some(target) => Ok(target),
            None => {
                warn!(layer = id, "no navigation target for layer");
                Err(RegistryError::NotFound(id.to_string()))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GroupSlot>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_record<R>(&self, id: &str, f: impl FnOnce(&LayerRecord) -> R) -> Option<R> {
        let groups = self.lock();
        groups
            .iter()
            .flat_map(|slot| slot.entries.iter())
            .find(|entry| entry.record.id == id)
            .map(|entry| f(&entry.record))
    }

    fn with_entry_mut<R>(&self, id: &str, f: impl FnOnce(&mut LayerEntry) -> R) -> Option<R> {
        let mut groups = self.lock();
        groups
            .iter_mut()
            .flat_map(|slot| slot.entries.iter_mut())
            .find(|entry| entry.record.id == id)
            .map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::types::{Anchor, Coord, LayerKind, LayerPayload};

    fn never_loads() -> Arc<dyn LayerLoader> {
        Arc::new(|_: &LayerRecord| async {
            Err::<LayerPayload, _>(LoadError::Other("offline".into()))
        })
    }

    fn registry(flavor: RegistryFlavor) -> LayerRegistry {
        let mut registry = LayerRegistry::new(flavor);
        registry
            .add_layer(
                "Transport",
                LayerRecord::new("metro", "Metro", LayerKind::Line, "blue", "metro.geojson"),
                never_loads(),
            )
            .unwrap();
        registry
            .add_layer(
                "Education",
                LayerRecord::new("schools", "Schools", LayerKind::Point, "gold", "schools.geojson")
                    .with_anchor(Anchor::new(Coord::new(2.35, 48.85), 13)),
                never_loads(),
            )
            .unwrap();
        registry
            .add_layer(
                "Transport",
                LayerRecord::new("tram", "Tram", LayerKind::Line, "green", "tram.geojson")
                    .with_visible(true),
                never_loads(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn list_all_keeps_group_then_insertion_order() {
        let ids: Vec<String> = registry(RegistryFlavor::Institution)
            .list_all()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, ["metro", "tram", "schools"]);
    }

    #[test]
    fn visible_filter_depends_on_flavor() {
        let institution = registry(RegistryFlavor::Institution);
        let visible: Vec<String> = institution
            .list_visible()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(visible, ["tram"]);

        let city = registry(RegistryFlavor::City);
        assert_eq!(city.list_visible().len(), 3);
        assert!(city.list_all().iter().all(LayerRecord::is_visible));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = registry(RegistryFlavor::Institution);
        let err = registry
            .add_layer(
                "Other",
                LayerRecord::new("metro", "Metro again", LayerKind::Line, "red", "x.geojson"),
                never_loads(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateLayer(id) if id == "metro"));
        assert_eq!(registry.group_names(), ["Transport", "Education"]);
    }

    #[test]
    fn add_group_appends_to_existing_group() {
        let mut registry = registry(RegistryFlavor::Institution);
        let group = LayerGroup::new(
            "Education",
            vec![LayerRecord::new(
                "libraries",
                "Libraries",
                LayerKind::Point,
                "gold",
                "lib.geojson",
            )],
        );
        registry.add_group(group, never_loads()).unwrap();

        let groups = registry.list_groups();
        assert_eq!(groups.len(), 2);
        let ids: Vec<&str> = groups[1].layers.iter().map(LayerRecord::id).collect();
        assert_eq!(ids, ["schools", "libraries"]);
    }

    #[test]
    fn find_by_id_misses_quietly() {
        let registry = registry(RegistryFlavor::Institution);
        assert!(registry.find_by_id("ferry").is_none());
        assert_eq!(registry.find_by_id("schools").unwrap().display_name(), "Schools");
    }

    #[test]
    fn navigation_falls_back_to_anchor() {
        let registry = registry(RegistryFlavor::Institution);
        let target = registry.resolve_navigation_target("schools").unwrap();
        assert_eq!(target.center, Coord::new(2.35, 48.85));
        assert_eq!(target.zoom, 13);
    }

    #[test]
    fn navigation_without_any_source_is_not_found() {
        let registry = registry(RegistryFlavor::Institution);
        assert!(matches!(
            registry.resolve_navigation_target("metro"),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            registry.resolve_navigation_target("ferry"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn basemap_theme_uses_injected_map() {
        let registry = registry(RegistryFlavor::City)
            .with_themes(ThemeMap::default().with_theme("gold", "toner"));
        assert_eq!(registry.basemap_theme("schools").as_deref(), Some("toner"));
        assert_eq!(registry.basemap_theme("metro").as_deref(), Some("light"));
        assert_eq!(registry.basemap_theme("ferry"), None);
    }
}
