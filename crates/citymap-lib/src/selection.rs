//! Selection state: per-layer visibility, active basemap, active quantity
//!
//! Setters validate against the known sets and reject unknown values with
//! [`Error::InvalidSelection`], leaving the state unchanged.

use crate::{Basemap, Error, Layer, Quantity, Result, SourceRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// The user-controlled toggles read on every render pass
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionState {
    basemaps: Arc<[Basemap]>,
    layer_ids: Arc<HashSet<String>>,
    basemap: usize,
    quantity: Quantity,
    overrides: HashMap<String, bool>,
}

impl SelectionState {
    /// Create a selection with the first basemap and the default quantity active
    pub fn new<I, S>(basemaps: Vec<Basemap>, layer_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if basemaps.is_empty() {
            return Err(Error::InvalidCatalog("no basemaps configured".to_string()));
        }
        Ok(Self {
            basemaps: basemaps.into(),
            layer_ids: Arc::new(layer_ids.into_iter().map(Into::into).collect()),
            basemap: 0,
            quantity: Quantity::default(),
            overrides: HashMap::new(),
        })
    }

    /// Create a selection whose known layers are the registry's sources
    pub fn for_registry(registry: &SourceRegistry, basemaps: Vec<Basemap>) -> Result<Self> {
        Self::new(basemaps, registry.ids())
    }

    /// Override a layer's visibility
    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        if !self.layer_ids.contains(id) {
            return Err(Error::InvalidSelection(format!("unknown layer `{id}`")));
        }
        self.overrides.insert(id.to_string(), visible);
        Ok(())
    }

    /// Flip a layer's effective visibility, returning the new value
    pub fn toggle_layer(&mut self, layer: &Layer) -> Result<bool> {
        let visible = !self.layer_visible(layer);
        self.set_layer_visible(layer.id(), visible)?;
        Ok(visible)
    }

    /// Drop an override so the layer's own flag applies again
    pub fn clear_override(&mut self, id: &str) {
        self.overrides.remove(id);
    }

    pub fn visibility_override(&self, id: &str) -> Option<bool> {
        self.overrides.get(id).copied()
    }

    /// Effective visibility: the override if set, else the layer's own flag
    #[inline]
    pub fn layer_visible(&self, layer: &Layer) -> bool {
        self.visibility_override(layer.id())
            .unwrap_or_else(|| layer.visible())
    }

    /// Activate a basemap by identifier or display name
    pub fn set_basemap(&mut self, id: &str) -> Result<()> {
        let index = self
            .basemaps
            .iter()
            .position(|basemap| basemap.id == id || basemap.name == id)
            .ok_or_else(|| Error::InvalidSelection(format!("unknown basemap `{id}`")))?;
        self.basemap = index;
        Ok(())
    }

    #[inline]
    pub fn basemap(&self) -> &Basemap {
        &self.basemaps[self.basemap]
    }

    #[inline]
    pub fn basemaps(&self) -> &[Basemap] {
        &self.basemaps
    }

    /// Activate a quantity by key (`AQI`, `PM25`, ...)
    pub fn set_active_quantity(&mut self, key: &str) -> Result<()> {
        self.quantity = key.parse()?;
        Ok(())
    }

    #[inline]
    pub fn active_quantity(&self) -> Quantity {
        self.quantity
    }
}

/// A selection shared between the UI (single writer) and render passes (readers)
#[derive(Clone, Debug)]
pub struct SharedSelection {
    inner: Arc<RwLock<SelectionState>>,
}

impl SharedSelection {
    pub fn new(state: SelectionState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// A consistent copy for one render pass
    pub fn snapshot(&self) -> SelectionState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a change under the write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut SelectionState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn set_layer_visible(&self, id: &str, visible: bool) -> Result<()> {
        self.update(|state| state.set_layer_visible(id, visible))
    }

    pub fn set_basemap(&self, id: &str) -> Result<()> {
        self.update(|state| state.set_basemap(id))
    }

    pub fn set_active_quantity(&self, key: &str) -> Result<()> {
        self.update(|state| state.set_active_quantity(key))
    }
}
