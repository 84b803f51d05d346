//! Layer compositor for multi-layer slice rendering.
//!
//! Every layer is rendered at full opacity into its own scratch raster and
//! then drawn onto one master raster in layer order. Global opacity is
//! applied once, downstream of compositing, so stacked layers keep their
//! relative opacity. Scratch rasters are reused between calls and only
//! reallocated when the axis or the slice dimensions change.

use image::RgbaImage;

use crate::enums::Orientation;
use crate::error::VolumeError;
use crate::layers::{LayerIds, LayerSet};
use crate::palette::ChannelVisibility;
use crate::volume::VolumeDimensions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BufferKey {
    orientation: Orientation,
    width: usize,
    height: usize,
}

impl BufferKey {
    fn new(orientation: Orientation, dims: VolumeDimensions) -> Self {
        let (width, height) = dims.slice_dimensions(orientation);
        Self {
            orientation,
            width,
            height,
        }
    }
}

fn reuse_or_allocate(
    slot: &mut Option<(BufferKey, RgbaImage)>,
    key: BufferKey,
) -> &mut RgbaImage {
    if !slot.as_ref().is_some_and(|(current, _)| *current == key) {
        log::debug!(
            "Allocating {}x{} slice buffer for the {} axis",
            key.width,
            key.height,
            key.orientation
        );
        *slot = None;
    }
    &mut slot
        .get_or_insert_with(|| (key, RgbaImage::new(key.width as u32, key.height as u32)))
        .1
}

/// Manages per-layer visibility and the reusable slice rasters.
pub struct LayerCompositor {
    ids: LayerIds,
    layer_visible: Vec<bool>,
    master: Option<(BufferKey, RgbaImage)>,
    layer_key: Option<BufferKey>,
    layer_buffers: Vec<RgbaImage>,
}

impl LayerCompositor {
    /// Create a compositor for a fixed set of layers, all visible.
    pub fn new(ids: LayerIds) -> Self {
        let count = ids.len();
        Self {
            ids,
            layer_visible: vec![true; count],
            master: None,
            layer_key: None,
            layer_buffers: Vec::with_capacity(count),
        }
    }

    /// Show or hide a layer. Returns `false` for an unknown id.
    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> bool {
        match self.ids.position(id) {
            Some(index) => {
                self.layer_visible[index] = visible;
                true
            }
            None => {
                log::warn!("Cannot change visibility of unknown layer {:?}", id);
                false
            }
        }
    }

    pub fn is_layer_visible(&self, id: &str) -> bool {
        self.ids
            .position(id)
            .is_some_and(|index| self.layer_visible[index])
    }

    pub fn layer_visibility(&self) -> &[bool] {
        &self.layer_visible
    }

    /// The master raster for `orientation`, reallocated only when the axis or
    /// the slice dimensions differ from the previous call. Its contents are
    /// whatever the last render left behind.
    pub fn get_or_create_slice_buffer(
        &mut self,
        orientation: Orientation,
        dims: VolumeDimensions,
    ) -> &mut RgbaImage {
        reuse_or_allocate(&mut self.master, BufferKey::new(orientation, dims))
    }

    fn prepare_layer_buffers(&mut self, key: BufferKey, count: usize) {
        if self.layer_key == Some(key) && self.layer_buffers.len() == count {
            return;
        }
        log::debug!(
            "Allocating {} layer buffers of {}x{} for the {} axis",
            count,
            key.width,
            key.height,
            key.orientation
        );
        self.layer_buffers.clear();
        self.layer_buffers.extend(
            (0..count).map(|_| RgbaImage::new(key.width as u32, key.height as u32)),
        );
        self.layer_key = Some(key);
    }

    /// Render every visible layer of `layers` at slice `index` and composite
    /// them into the master raster, which is returned.
    pub fn render_layers(
        &mut self,
        layers: &LayerSet,
        index: usize,
        orientation: Orientation,
        channel_visibility: &ChannelVisibility,
    ) -> Result<&RgbaImage, VolumeError> {
        let key = BufferKey::new(orientation, layers.dimensions());
        self.prepare_layer_buffers(key, layers.len());

        for (layer, (volume, buffer)) in layers
            .volumes()
            .iter()
            .zip(self.layer_buffers.iter_mut())
            .enumerate()
        {
            if !self.layer_visible.get(layer).copied().unwrap_or(true) {
                continue;
            }
            volume.render_label_slice_into(index, orientation, buffer, channel_visibility, 1.0)?;
        }

        let master = reuse_or_allocate(&mut self.master, key);
        Self::composite_all_layers(&self.layer_buffers, &self.layer_visible, master)?;
        log::trace!(
            "Composited {} layers on {} slice {}",
            layers.len(),
            orientation,
            index
        );
        Ok(&*master)
    }

    /// Clear `master` and draw every visible layer raster onto it in order.
    ///
    /// Later layers cover earlier ones where they are opaque. `visibility`
    /// is indexed like `layers`; missing entries count as visible.
    pub fn composite_all_layers(
        layers: &[RgbaImage],
        visibility: &[bool],
        master: &mut RgbaImage,
    ) -> Result<(), VolumeError> {
        let expected = (master.width() as usize, master.height() as usize);
        for layer in layers {
            let actual = (layer.width() as usize, layer.height() as usize);
            if actual != expected {
                return Err(VolumeError::ShapeMismatch { expected, actual });
            }
        }

        let out: &mut [u8] = master;
        out.fill(0);
        let out: &mut [[u8; 4]] = bytemuck::cast_slice_mut(out);
        for (layer, raster) in layers.iter().enumerate() {
            if !visibility.get(layer).copied().unwrap_or(true) {
                continue;
            }
            let src: &[[u8; 4]] = bytemuck::cast_slice(raster.as_raw());
            for (dst, src) in out.iter_mut().zip(src) {
                source_over(dst, *src);
            }
        }
        Ok(())
    }

    /// Copy a rendered raster to a display target.
    ///
    /// Coronal rasters are mirrored vertically: the coronal display runs
    /// depth the other way than the volume does. [`Self::capture`] undoes the
    /// mirror, so display -> write -> render -> display is the identity.
    pub fn present(
        orientation: Orientation,
        rendered: &RgbaImage,
        display: &mut RgbaImage,
    ) -> Result<(), VolumeError> {
        if rendered.dimensions() != display.dimensions() {
            return Err(VolumeError::ShapeMismatch {
                expected: (rendered.width() as usize, rendered.height() as usize),
                actual: (display.width() as usize, display.height() as usize),
            });
        }
        let dst: &mut [u8] = display;
        dst.copy_from_slice(rendered.as_raw());
        if orientation == Orientation::Coronal {
            image::imageops::flip_vertical_in_place(display);
        }
        Ok(())
    }

    /// Turn a display raster (e.g. a finished brush stroke) back into
    /// volume orientation for the write path.
    pub fn capture(orientation: Orientation, display: &RgbaImage) -> RgbaImage {
        if orientation == Orientation::Coronal {
            image::imageops::flip_vertical(display)
        } else {
            display.clone()
        }
    }

    /// Scale every alpha by `opacity`.
    pub fn apply_global_opacity(buffer: &mut RgbaImage, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        let pixels: &mut [u8] = buffer;
        for pixel in bytemuck::cast_slice_mut::<u8, [u8; 4]>(pixels) {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }
    }
}

/// Non-premultiplied source-over.
#[inline]
fn source_over(dst: &mut [u8; 4], src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => *dst = src,
        src_alpha => {
            let sa = src_alpha as f32 / 255.0;
            let da = dst[3] as f32 / 255.0 * (1.0 - sa);
            let out_alpha = sa + da;
            for i in 0..3 {
                let blended = (src[i] as f32 * sa + dst[i] as f32 * da) / out_alpha;
                dst[i] = blended.round().min(255.0) as u8;
            }
            dst[3] = (out_alpha * 255.0).round().min(255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn ids() -> LayerIds {
        LayerIds::new(&["layer1", "layer2"]).unwrap()
    }

    #[test]
    fn later_layers_cover_earlier_ones() {
        let bottom = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        let mut top = RgbaImage::new(2, 1);
        top.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let mut master = RgbaImage::from_pixel(2, 1, Rgba([9, 9, 9, 9]));

        LayerCompositor::composite_all_layers(&[bottom.clone(), top.clone()], &[true, true], &mut master)
            .unwrap();
        assert_eq!(master.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(master.get_pixel(1, 0), &Rgba([0, 0, 255, 255]));

        LayerCompositor::composite_all_layers(&[bottom, top], &[false, true], &mut master).unwrap();
        assert_eq!(master.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(master.get_pixel(1, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn composite_rejects_mismatched_layers() {
        let mut master = RgbaImage::new(2, 2);
        let layer = RgbaImage::new(2, 3);
        assert!(matches!(
            LayerCompositor::composite_all_layers(&[layer], &[true], &mut master),
            Err(VolumeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn translucent_layer_blends_over_opaque() {
        let mut dst = [0, 0, 0, 255];
        source_over(&mut dst, [255, 255, 255, 51]);
        assert_eq!(dst, [51, 51, 51, 255]);
    }

    #[test]
    fn slice_buffer_is_reused_until_shape_changes() {
        let mut compositor = LayerCompositor::new(ids());
        let dims = VolumeDimensions::new(8, 6, 4);
        compositor
            .get_or_create_slice_buffer(Orientation::Axial, dims)
            .put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        let buffer = compositor.get_or_create_slice_buffer(Orientation::Axial, dims);
        assert_eq!(buffer.get_pixel(0, 0), &Rgba([1, 2, 3, 4]));

        let buffer = compositor.get_or_create_slice_buffer(Orientation::Coronal, dims);
        assert_eq!(buffer.dimensions(), (8, 4));
        assert_eq!(buffer.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));

        let buffer = compositor.get_or_create_slice_buffer(Orientation::Sagittal, dims);
        assert_eq!(buffer.dimensions(), (4, 6));
    }

    #[test]
    fn layer_visibility_setters() {
        let mut compositor = LayerCompositor::new(ids());
        assert!(compositor.set_layer_visible("layer2", false));
        assert!(!compositor.is_layer_visible("layer2"));
        assert!(compositor.is_layer_visible("layer1"));
        assert!(!compositor.set_layer_visible("nope", false));
        assert_eq!(compositor.layer_visibility(), &[true, false]);
    }

    #[test]
    fn render_layers_respects_layer_visibility() {
        let dims = VolumeDimensions::new(3, 2, 2);
        let mut layers = LayerSet::new(&["layer1", "layer2"], dims, 1).unwrap();
        layers.get_mut("layer1").set_voxel(0, 0, 1, 1, 0).unwrap();
        layers.get_mut("layer2").set_voxel(0, 0, 1, 2, 0).unwrap();
        let green = layers.get("layer1").color_map().color(1);
        let red = layers.get("layer2").color_map().color(2);

        let mut compositor = LayerCompositor::new(layers.ids().clone());
        let visibility = ChannelVisibility::all_visible();
        let master = compositor
            .render_layers(&layers, 1, Orientation::Axial, &visibility)
            .unwrap();
        assert_eq!(master.get_pixel(0, 0), &red);

        compositor.set_layer_visible("layer2", false);
        let master = compositor
            .render_layers(&layers, 1, Orientation::Axial, &visibility)
            .unwrap();
        assert_eq!(master.get_pixel(0, 0), &green);
        assert_eq!(master.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn coronal_present_and_capture_are_inverse() {
        let rendered = RgbaImage::from_fn(2, 3, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let mut display = RgbaImage::new(2, 3);

        LayerCompositor::present(Orientation::Coronal, &rendered, &mut display).unwrap();
        assert_eq!(display.get_pixel(1, 0), rendered.get_pixel(1, 2));
        assert_eq!(LayerCompositor::capture(Orientation::Coronal, &display), rendered);

        LayerCompositor::present(Orientation::Axial, &rendered, &mut display).unwrap();
        assert_eq!(display, rendered);
        assert_eq!(LayerCompositor::capture(Orientation::Axial, &display), rendered);
    }

    #[test]
    fn present_flips_odd_and_even_heights() {
        for height in [1, 4, 5] {
            let rendered = RgbaImage::from_fn(3, height, |x, y| Rgba([x as u8, y as u8, 9, 255]));
            let mut display = RgbaImage::new(3, height);
            LayerCompositor::present(Orientation::Coronal, &rendered, &mut display).unwrap();
            for y in 0..height {
                assert_eq!(display.get_pixel(2, y), rendered.get_pixel(2, height - 1 - y));
            }
            assert_eq!(LayerCompositor::capture(Orientation::Coronal, &display), rendered);
        }
        let mut wrong = RgbaImage::new(3, 2);
        assert!(matches!(
            LayerCompositor::present(Orientation::Coronal, &RgbaImage::new(2, 3), &mut wrong),
            Err(VolumeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn global_opacity_scales_alpha_once() {
        let mut buffer = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 200]));
        LayerCompositor::apply_global_opacity(&mut buffer, 0.5);
        assert_eq!(buffer.get_pixel(0, 0), &Rgba([10, 20, 30, 100]));
    }
}
