//! One annotation workspace: layers, history, compositor and view state.
//!
//! The session wires the core together in the order a painting front end
//! needs it. It only calls into the core; front ends poll it for state.

use image::{Rgba, RgbaImage};

use crate::compositor::LayerCompositor;
use crate::config::AnnotationConfig;
use crate::coords::{self, AxisPosition, MarkerPlacement, PhysicalExtent};
use crate::enums::Orientation;
use crate::error::{ConfigError, VolumeError};
use crate::layers::LayerSet;
use crate::palette::ChannelVisibility;
use crate::undo::{UndoDelta, UndoManager};
use crate::volume::VolumeDimensions;

pub struct AnnotationSession {
    layers: LayerSet,
    history: UndoManager,
    compositor: LayerCompositor,
    channel_visibility: ChannelVisibility,
    global_opacity: f32,
    extent: PhysicalExtent,
    active_axis: Orientation,
    cursor: Option<AxisPosition>,
}

impl AnnotationSession {
    /// Create empty layers for a scan of `dims` voxels covering `extent`.
    pub fn new(
        config: &AnnotationConfig,
        dims: VolumeDimensions,
        extent: PhysicalExtent,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut layers = LayerSet::new(config.layers.as_slice(), dims, config.channels)?;
        if config.palette.is_some() {
            let color_map = config.color_map()?;
            for index in 0..layers.len() {
                if let Some(volume) = layers.volume_mut(index) {
                    volume.set_color_map(color_map.clone());
                }
            }
        }
        let history = UndoManager::with_capacity(layers.ids().clone(), config.undo_capacity);
        let compositor = LayerCompositor::new(layers.ids().clone());
        log::info!(
            "Annotation session with {} layers over {}x{}x{} voxels",
            layers.len(),
            dims.width,
            dims.height,
            dims.depth
        );
        Ok(Self {
            layers,
            history,
            compositor,
            channel_visibility: ChannelVisibility::all_visible(),
            global_opacity: config.global_opacity,
            extent,
            active_axis: Orientation::Axial,
            cursor: None,
        })
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn active_layer(&self) -> &str {
        self.history.active_layer()
    }

    pub fn set_active_layer(&mut self, id: &str) {
        self.history.set_active_layer(id);
    }

    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> bool {
        self.compositor.set_layer_visible(id, visible)
    }

    pub fn set_channel_visible(&mut self, label: usize, visible: bool) -> bool {
        self.channel_visibility.set(label, visible)
    }

    pub fn channel_visibility(&self) -> &ChannelVisibility {
        &self.channel_visibility
    }

    pub fn set_channel_color(&mut self, id: &str, label: usize, color: Rgba<u8>) -> Result<(), VolumeError> {
        self.layers.set_channel_color(id, label, color)
    }

    pub fn set_global_opacity(&mut self, opacity: f32) {
        self.global_opacity = opacity.clamp(0.0, 1.0);
    }

    /// Write a stroke raster (volume orientation) into a layer and record it
    /// for undo. Strokes that change nothing are not recorded.
    pub fn paint(
        &mut self,
        layer_id: &str,
        index: usize,
        orientation: Orientation,
        raster: &RgbaImage,
        active_channel: usize,
    ) -> Result<(), VolumeError> {
        let layer_id = self.layers.ids().resolve_name(layer_id).to_owned();
        let volume = self.layers.get_mut(&layer_id);
        let old_slice = volume.get_slice_raw_bytes(index, orientation)?;
        volume.write_slice_labels_from_raster(
            index,
            raster,
            orientation,
            active_channel,
            Some(&self.channel_visibility),
        )?;
        let new_slice = volume.get_slice_raw_bytes(index, orientation)?;
        if old_slice != new_slice {
            self.history.push(UndoDelta {
                layer_id,
                orientation,
                slice_index: index,
                old_slice,
                new_slice,
            });
        }
        Ok(())
    }

    /// Like [`Self::paint`], for a raster in display orientation.
    pub fn paint_from_display(
        &mut self,
        layer_id: &str,
        index: usize,
        orientation: Orientation,
        display: &RgbaImage,
        active_channel: usize,
    ) -> Result<(), VolumeError> {
        let raster = LayerCompositor::capture(orientation, display);
        self.paint(layer_id, index, orientation, &raster, active_channel)
    }

    /// Wipe one layer and forget its history.
    pub fn clear_layer(&mut self, layer_id: &str) {
        let layer_id = self.layers.ids().resolve_name(layer_id).to_owned();
        self.layers.get_mut(&layer_id).clear();
        self.history.clear_layer(&layer_id);
    }

    /// Revert the newest edit of the active layer. Returns the slice that
    /// changed, or `None` if there was nothing to undo.
    pub fn undo(&mut self) -> Result<Option<(Orientation, usize)>, VolumeError> {
        let Some(delta) = self.history.undo() else {
            return Ok(None);
        };
        self.layers.get_mut(&delta.layer_id).set_slice_raw_bytes(
            delta.slice_index,
            delta.orientation,
            &delta.old_slice,
        )?;
        Ok(Some((delta.orientation, delta.slice_index)))
    }

    pub fn redo(&mut self) -> Result<Option<(Orientation, usize)>, VolumeError> {
        let Some(delta) = self.history.redo() else {
            return Ok(None);
        };
        self.layers.get_mut(&delta.layer_id).set_slice_raw_bytes(
            delta.slice_index,
            delta.orientation,
            &delta.new_slice,
        )?;
        Ok(Some((delta.orientation, delta.slice_index)))
    }

    /// Composite all visible layers at full opacity, in volume orientation.
    pub fn render(&mut self, index: usize, orientation: Orientation) -> Result<&RgbaImage, VolumeError> {
        self.compositor
            .render_layers(&self.layers, index, orientation, &self.channel_visibility)
    }

    /// Composite, mirror for the display and apply the global opacity.
    pub fn render_display(
        &mut self,
        index: usize,
        orientation: Orientation,
        display: &mut RgbaImage,
    ) -> Result<(), VolumeError> {
        let master = self.compositor.render_layers(
            &self.layers,
            index,
            orientation,
            &self.channel_visibility,
        )?;
        LayerCompositor::present(orientation, master, display)?;
        LayerCompositor::apply_global_opacity(display, self.global_opacity);
        Ok(())
    }

    pub fn active_axis(&self) -> Orientation {
        self.active_axis
    }

    pub fn cursor(&self) -> Option<AxisPosition> {
        self.cursor
    }

    /// Remember a cursor on the active axis.
    pub fn register_cursor(&mut self, cursor_x: f64, cursor_y: f64, slice_index: usize) {
        self.cursor = Some(AxisPosition {
            slice_index,
            cursor_x,
            cursor_y,
        });
    }

    /// Make `to` the active axis, carrying the registered cursor over.
    pub fn switch_axis(&mut self, to: Orientation) -> Option<AxisPosition> {
        if let Some(cursor) = self.cursor {
            if let Some(moved) = coords::convert(
                self.active_axis,
                to,
                cursor.cursor_x,
                cursor.cursor_y,
                cursor.slice_index,
                self.layers.dimensions(),
                self.extent,
            ) {
                self.cursor = Some(moved);
            }
        }
        log::debug!("Active axis {} -> {}", self.active_axis, to);
        self.active_axis = to;
        self.cursor
    }

    /// Resolve a point picked on the active axis onto all three axes.
    pub fn place_marker(&self, cursor_x: f64, cursor_y: f64, slice_index: usize) -> MarkerPlacement {
        coords::place_marker(
            self.active_axis,
            cursor_x,
            cursor_y,
            slice_index,
            self.layers.dimensions(),
            self.extent,
        )
    }

    /// Drop all labels and all history, keeping layers and palettes.
    pub fn reset(&mut self) {
        self.layers.clear_all();
        self.history.clear_all();
        self.cursor = None;
        self.active_axis = Orientation::Axial;
    }
}
