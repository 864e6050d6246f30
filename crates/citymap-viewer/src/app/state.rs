//! Viewer state
//!
//! Holds the catalog, the current layers and the user's selection, and builds
//! render passes from consistent snapshots of both.

use crate::app::report::RenderPass;
use crate::app::settings::Settings;
use citymap_lib::{
    LayerStore, SelectionState, SharedSelection, SourceRegistry, catalog, layer_list, resolve_all,
};
use std::sync::Arc;

/// Main viewer state
pub struct ViewerState {
    /// Sources in layer order
    pub registry: SourceRegistry,

    /// Current layers, replaced whole on (re-)ingestion
    pub store: Arc<LayerStore>,

    /// Visibility overrides, basemap and quantity
    pub selection: SharedSelection,

    /// Zoom level render passes are resolved at
    pub zoom: f64,
}

impl ViewerState {
    pub fn new(registry: SourceRegistry, zoom: f64) -> citymap_lib::Result<Self> {
        let selection = SelectionState::for_registry(&registry, catalog::basemaps())?;
        Ok(Self {
            registry,
            store: Arc::new(LayerStore::default()),
            selection: SharedSelection::new(selection),
            zoom,
        })
    }

    /// Apply the selection given on the command line
    ///
    /// Hidden layers are applied after shown ones, so a layer named in both
    /// ends up hidden.
    pub fn apply_settings(&self, settings: &Settings) -> citymap_lib::Result<()> {
        if let Some(basemap) = &settings.basemap {
            self.selection.set_basemap(basemap)?;
        }
        self.selection.set_active_quantity(&settings.quantity)?;
        for id in &settings.show {
            self.selection.set_layer_visible(id, true)?;
        }
        for id in &settings.hide {
            self.selection.set_layer_visible(id, false)?;
        }
        Ok(())
    }

    /// Build a render pass from the current layers and selection
    pub fn render_pass(&self) -> RenderPass {
        let layers = self.store.snapshot();
        let selection = self.selection.snapshot();
        RenderPass {
            basemap: selection.basemap().clone(),
            quantity: selection.active_quantity(),
            zoom: self.zoom,
            layers: layer_list(&layers, &selection),
            styles: resolve_all(&layers, self.zoom, &selection),
        }
    }
}
