//! Render pass output, as text for people or JSON for a renderer

use citymap_lib::{Basemap, LayerIndicator, LayerListEntry, LayerStyle, Quantity};
use serde::Serialize;
use std::io::{self, Write};

/// What a map UI would show for one render pass
#[derive(Debug, Serialize)]
pub struct RenderPass {
    pub basemap: Basemap,
    pub quantity: Quantity,
    pub zoom: f64,
    pub layers: Vec<LayerListEntry>,
    pub styles: Vec<LayerStyle>,
}

impl RenderPass {
    /// Number of layers with the given indicator
    pub fn count(&self, indicator: LayerIndicator) -> usize {
        self.layers
            .iter()
            .filter(|entry| entry.indicator == indicator)
            .count()
    }

    pub fn descriptor_count(&self) -> usize {
        self.styles.iter().map(|style| style.descriptors.len()).sum()
    }

    /// Write the pass as one JSON document per line
    pub fn write_json(&self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        writeln!(out)
    }

    /// Write the layer list as an aligned table followed by a summary line
    pub fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "basemap: {}  quantity: {}  zoom: {}",
            self.basemap.name, self.quantity, self.zoom
        )?;

        let id_width = self
            .layers
            .iter()
            .map(|entry| entry.id.chars().count())
            .max()
            .unwrap_or(0);
        for (entry, style) in self.layers.iter().zip(&self.styles) {
            write!(
                out,
                "  {:<id_width$}  {:<11}  {:>6} features  {:>6} drawn  {}",
                entry.id,
                indicator_label(entry.indicator),
                entry.feature_count,
                style.descriptors.len(),
                entry.name,
            )?;
            if let Some(error) = &entry.error {
                write!(out, "  ({error})")?;
            }
            writeln!(out)?;
        }

        writeln!(
            out,
            "{} layers: {} shown, {} hidden, {} degraded, {} unsupported; {} descriptors",
            self.layers.len(),
            self.count(LayerIndicator::Shown),
            self.count(LayerIndicator::Hidden),
            self.count(LayerIndicator::Degraded),
            self.count(LayerIndicator::Unsupported),
            self.descriptor_count(),
        )
    }

    pub fn write(&self, out: &mut dyn Write, json: bool) -> io::Result<()> {
        if json {
            self.write_json(out)
        } else {
            self.write_text(out)
        }
    }
}

fn indicator_label(indicator: LayerIndicator) -> &'static str {
    match indicator {
        LayerIndicator::Shown => "shown",
        LayerIndicator::Hidden => "hidden",
        LayerIndicator::Degraded => "degraded",
        LayerIndicator::Unsupported => "unsupported",
    }
}
