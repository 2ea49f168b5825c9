use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::{LayerEvent, LayerRegistry, RegistryFlavor};
use crate::error::{LoadError, RegistryError};
use crate::geojson::{bounds_center, summarize};
use crate::types::{LayerPayload, LayerRecord, LoadState};

/// What a single `request_load` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Another request for the layer is still in flight.
    AlreadyLoading,
    AlreadyLoaded,
}

/// Per-layer results of a bulk load, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkLoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: Vec<String>,
}

impl BulkLoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl LayerRegistry {
    /// Fetches a layer's data through its loader, at most once.
    ///
    /// A layer that is loading or loaded is left alone. On success the
    /// geometry, the summary (line and polygon layers) and the bounds center
    /// are stored. On failure the layer is marked failed and, in an
    /// institution registry, hidden again.
    pub async fn request_load(&self, id: &str) -> Result<LoadOutcome, RegistryError> {
        let claimed = self.with_entry_mut(id, |entry| match entry.record.load_state {
            LoadState::Loading => Err(LoadOutcome::AlreadyLoading),
            LoadState::Loaded => Err(LoadOutcome::AlreadyLoaded),
            LoadState::NotRequested | LoadState::Failed => {
                entry.record.load_state = LoadState::Loading;
                Ok((entry.record.clone(), entry.loader.clone()))
            }
        });

        let (snapshot, loader) = match claimed {
            None => {
                warn!(layer = id, "load requested for unknown layer");
                return Err(RegistryError::NotFound(id.to_string()));
            }
            Some(Err(outcome)) => {
                debug!(layer = id, ?outcome, "skipping load");
                return Ok(outcome);
            }
            Some(Ok(claimed)) => claimed,
        };

        info!(layer = id, source = snapshot.source_ref(), "loading layer");
        self.events.publish(LayerEvent::LoadStarted { id: id.to_string() });

        match loader.load(&snapshot).await {
            Ok(payload) => {
                let features = payload.geometry.features.len();
                self.store_loaded(&snapshot, payload);
                info!(layer = id, features, "layer loaded");
                self.events.publish(LayerEvent::Loaded { id: id.to_string() });
                Ok(LoadOutcome::Loaded)
            }
            Err(source) => {
                error!(layer = id, error = %source, "layer failed to load");
                self.store_failed(id, &source);
                Err(RegistryError::Load {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    fn store_loaded(&self, snapshot: &LayerRecord, payload: LayerPayload) {
        let features = &payload.geometry.features;
        let summary = snapshot.kind.has_summary().then(|| summarize(features));
        let center = if features.is_empty() {
            None
        } else {
            bounds_center(features)
        };

        self.with_entry_mut(&snapshot.id, |entry| {
            let record = &mut entry.record;
            record.geometry = Some(Arc::new(payload.geometry));
            record.summary = summary;
            record.bounds_center_cache = center;
            record.table_rows = payload.table_rows;
            record.summary_stats = payload.summary_stats;
            record.legend_entries = payload.legend_entries;
            record.loaded_at = Some(Utc::now());
            record.load_state = LoadState::Loaded;
        });
    }

    fn store_failed(&self, id: &str, source: &LoadError) {
        let hide = self.flavor == RegistryFlavor::Institution;
        let hidden = self
            .with_entry_mut(id, |entry| {
                entry.record.load_state = LoadState::Failed;
                let was_visible = entry.record.visible;
                if hide {
                    entry.record.visible = false;
                }
                hide && was_visible
            })
            .unwrap_or(false);

        self.events.publish(LayerEvent::LoadFailed {
            id: id.to_string(),
            reason: source.to_string(),
        });
        if hidden {
            self.events.publish(LayerEvent::VisibilityChanged {
                id: id.to_string(),
                visible: false,
            });
        }
    }

    /// Flips a layer on or off and returns its visibility afterwards.
    ///
    /// Turning on a layer that has not loaded yet (or failed before) loads it,
    /// unless its data is managed elsewhere. Turning off keeps loaded data.
    /// Load failures are logged, not returned. Unknown ids and city
    /// registries are a logged no-op.
    pub async fn toggle_visibility(&self, id: &str) -> Option<bool> {
        if self.flavor == RegistryFlavor::City {
            warn!(layer = id, "city layers are always visible");
            return self.with_record(id, |record| record.visible);
        }

        let toggled = self.with_entry_mut(id, |entry| {
            let record = &mut entry.record;
            record.visible = !record.visible;
            let needs_load =
                record.visible && record.load_state.can_request() && !record.externally_managed;
            (record.visible, needs_load)
        });
        let Some((visible, needs_load)) = toggled else {
            warn!(layer = id, "toggle requested for unknown layer");
            return None;
        };

        self.events.publish(LayerEvent::VisibilityChanged {
            id: id.to_string(),
            visible,
        });

        if needs_load {
            if let Err(err) = self.request_load(id).await {
                debug!(layer = id, error = %err, "toggle load did not complete");
            }
            return self.with_record(id, |record| record.visible);
        }
        Some(visible)
    }

    /// Loads every matching layer that is not loaded yet, one after another.
    ///
    /// The predicate sees the group name and the layer. A failing layer is
    /// recorded in the report and the batch carries on. Layers whose data is
    /// managed elsewhere are never fetched. The predicate runs with the
    /// catalog locked and must not call back into the registry.
    pub async fn bulk_load(
        &self,
        predicate: impl Fn(&str, &LayerRecord) -> bool,
    ) -> BulkLoadReport {
        let ids: Vec<String> = self
            .lock()
            .iter()
            .flat_map(|slot| {
                slot.entries
                    .iter()
                    .map(move |entry| (slot.name.as_str(), &entry.record))
            })
            .filter(|(group, record)| {
                record.load_state != LoadState::Loaded
                    && !record.externally_managed
                    && predicate(*group, *record)
            })
            .map(|(_, record)| record.id.clone())
            .collect();

        let mut report = BulkLoadReport::default();
        for id in ids {
            match self.request_load(&id).await {
                Ok(LoadOutcome::Loaded) => report.loaded.push(id),
                Ok(_) => report.skipped.push(id),
                Err(err) => {
                    warn!(layer = %id, error = %err, "bulk load continuing past failure");
                    report.failed.push((id, err.to_string()));
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "bulk load finished"
        );
        report
    }

    /// Bulk loads every layer of one group.
    pub async fn load_group(&self, group_name: &str) -> BulkLoadReport {
        self.bulk_load(|group, _| group == group_name).await
    }
}
