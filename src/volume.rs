use crate::enums::{Orientation, RenderMode};
use crate::error::VolumeError;
use crate::palette::{ChannelVisibility, ColorMap, LABEL_COUNT, TRANSPARENT};

use image::{Rgba, RgbaImage};
use ndarray::{ArrayView2, ArrayView4, s};
use rayon::prelude::*;

/// Stroke pixels with an alpha below this are treated as erased.
pub const ERASE_ALPHA_THRESHOLD: u8 = 128;

/// Size of a volume in voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VolumeDimensions {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl VolumeDimensions {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Number of slices along the axis the orientation walks.
    pub fn slice_count(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Axial => self.depth,
            Orientation::Coronal => self.height,
            Orientation::Sagittal => self.width,
        }
    }

    /// Get the (width, height) of a slice - standard image convention
    pub fn slice_dimensions(&self, orientation: Orientation) -> (usize, usize) {
        match orientation {
            // Looking down Z-axis: X is width, Y is height
            Orientation::Axial => (self.width, self.height),
            // Looking down Y-axis: X is width, Z is height
            Orientation::Coronal => (self.width, self.depth),
            // Looking down X-axis: Z is width, Y is height
            Orientation::Sagittal => (self.depth, self.height),
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.width * self.height * self.depth
    }
}

/// Options for [`VoxelLabelVolume::get_slice_raster`].
#[derive(Clone, Copy, Debug)]
pub struct SliceRenderOptions {
    pub mode: RenderMode,
    /// Storage channel used by `Grayscale` and `ColoredSingle`.
    pub channel: usize,
    pub visibility: ChannelVisibility,
    pub opacity: f32,
}

impl Default for SliceRenderOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            channel: 0,
            visibility: ChannelVisibility::all_visible(),
            opacity: 1.0,
        }
    }
}

impl SliceRenderOptions {
    pub fn with_mode(mode: RenderMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Precomputed addressing of one slice inside the flat buffer.
///
/// Offsets are in bytes; pixel `(col, row)` of the slice lives at
/// `base + row * row_stride + col * col_stride`.
#[derive(Clone, Copy, Debug)]
struct SliceLayout {
    base: usize,
    row_stride: usize,
    col_stride: usize,
    width: usize,
    height: usize,
}

impl SliceLayout {
    #[inline]
    fn row_start(&self, row: usize) -> usize {
        self.base + row * self.row_stride
    }
}

/// Dense per-voxel label storage for one annotation layer.
///
/// The buffer is slice-major: `z * (w * h * c) + y * (w * c) + x * c + channel`,
/// so axial slices are contiguous while coronal and sagittal slices are
/// strided.
///
/// Single-channel volumes store a label (0..=8) per voxel. Volumes with more
/// channels store one intensity byte per channel, and storage channel `n`
/// is drawn with the palette color of label `n + 1`.
#[derive(Clone, Debug)]
pub struct VoxelLabelVolume {
    data: Vec<u8>,
    dims: VolumeDimensions,
    channels: usize,
    color_map: ColorMap,
}

impl VoxelLabelVolume {
    /// Create a zero-initialized volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidDimensions`] if any dimension or the
    /// channel count is zero, or if the buffer size overflows `usize`.
    pub fn new(
        width: usize,
        height: usize,
        depth: usize,
        channels: usize,
    ) -> Result<Self, VolumeError> {
        let invalid = VolumeError::InvalidDimensions {
            width,
            height,
            depth,
            channels,
        };
        if width == 0 || height == 0 || depth == 0 || channels == 0 {
            return Err(invalid);
        }
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .and_then(|n| n.checked_mul(channels))
            .ok_or(invalid)?;
        let dims = VolumeDimensions::new(width, height, depth);
        Ok(Self {
            data: vec![0; len],
            dims,
            channels,
            color_map: ColorMap::default(),
        })
    }

    pub fn with_dimensions(dims: VolumeDimensions, channels: usize) -> Result<Self, VolumeError> {
        Self::new(dims.width, dims.height, dims.depth, channels)
    }

    pub fn dimensions(&self) -> VolumeDimensions {
        self.dims
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn slice_dimensions(&self, orientation: Orientation) -> (usize, usize) {
        self.dims.slice_dimensions(orientation)
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    pub fn set_color_map(&mut self, color_map: ColorMap) {
        self.color_map = color_map;
    }

    pub fn set_channel_color(&mut self, label: usize, color: Rgba<u8>) -> Result<(), VolumeError> {
        self.color_map.set_channel_color(label, color)
    }

    #[inline]
    fn voxel_index(&self, x: usize, y: usize, z: usize, channel: usize) -> Result<usize, VolumeError> {
        let VolumeDimensions {
            width,
            height,
            depth,
        } = self.dims;
        if x >= width || y >= height || z >= depth || channel >= self.channels {
            return Err(VolumeError::VoxelOutOfBounds { x, y, z, channel });
        }
        let c = self.channels;
        Ok(z * (width * height * c) + y * (width * c) + x * c + channel)
    }

    pub fn get_voxel(&self, x: usize, y: usize, z: usize, channel: usize) -> Result<u8, VolumeError> {
        let index = self.voxel_index(x, y, z, channel)?;
        Ok(self.data[index])
    }

    pub fn set_voxel(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        value: u8,
        channel: usize,
    ) -> Result<(), VolumeError> {
        let index = self.voxel_index(x, y, z, channel)?;
        self.data[index] = value;
        Ok(())
    }

    fn check_channel(&self, channel: usize) -> Result<(), VolumeError> {
        if channel >= self.channels {
            return Err(VolumeError::ChannelOutOfRange {
                channel,
                channels: self.channels,
            });
        }
        Ok(())
    }

    fn layout(&self, index: usize, orientation: Orientation) -> Result<SliceLayout, VolumeError> {
        let len = self.dims.slice_count(orientation);
        if index >= len {
            return Err(VolumeError::SliceOutOfRange {
                index,
                len,
                orientation,
            });
        }
        let VolumeDimensions { width, height, .. } = self.dims;
        let c = self.channels;
        let plane = width * height * c;
        let line = width * c;
        let (slice_width, slice_height) = self.dims.slice_dimensions(orientation);
        let (base, row_stride, col_stride) = match orientation {
            Orientation::Axial => (index * plane, line, c),
            Orientation::Coronal => (index * line, plane, c),
            Orientation::Sagittal => (index * c, line, plane),
        };
        Ok(SliceLayout {
            base,
            row_stride,
            col_stride,
            width: slice_width,
            height: slice_height,
        })
    }

    fn check_raster(layout: &SliceLayout, raster: &RgbaImage) -> Result<(), VolumeError> {
        let actual = (raster.width() as usize, raster.height() as usize);
        let expected = (layout.width, layout.height);
        if actual != expected {
            return Err(VolumeError::ShapeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Walk every pixel of a slice, handing the voxel's channel bytes to
    /// `shade` and storing the returned color in `out`.
    #[inline]
    fn shade_slice(
        &self,
        layout: &SliceLayout,
        out: &mut [u8],
        mut shade: impl FnMut(&[u8]) -> [u8; 4],
    ) {
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(out);
        let c = self.channels;
        for (row, row_pixels) in pixels.chunks_exact_mut(layout.width).enumerate() {
            let mut index = layout.row_start(row);
            for pixel in row_pixels {
                *pixel = shade(&self.data[index..index + c]);
                index += layout.col_stride;
            }
        }
    }

    /// Render a slice into a freshly allocated RGBA raster.
    ///
    /// # Errors
    ///
    /// Range error if `index` is outside the axis, or if the options name a
    /// storage channel the volume does not have.
    pub fn get_slice_raster(
        &self,
        index: usize,
        orientation: Orientation,
        options: &SliceRenderOptions,
    ) -> Result<RgbaImage, VolumeError> {
        let layout = self.layout(index, orientation)?;
        self.check_channel(options.channel)?;
        let mut raster = RgbaImage::new(layout.width as u32, layout.height as u32);
        let opacity = options.opacity.clamp(0.0, 1.0);
        let visibility = &options.visibility;
        let channel = options.channel;
        let out: &mut [u8] = &mut raster;

        match options.mode {
            RenderMode::Grayscale => self.shade_slice(&layout, out, |voxel| {
                let v = voxel[channel];
                [v, v, v, if v > 0 { 255 } else { 0 }]
            }),
            RenderMode::ColoredSingle => self.shade_slice(&layout, out, |voxel| {
                self.shade_single(voxel[channel], channel, visibility, opacity)
            }),
            RenderMode::ColoredMulti => self.shade_slice(&layout, out, |voxel| {
                self.shade_priority(voxel, visibility, opacity)
            }),
            RenderMode::Blended => self.shade_slice(&layout, out, |voxel| {
                self.shade_blended(voxel, visibility, opacity)
            }),
        }
        Ok(raster)
    }

    /// Colored rendering into a caller-owned buffer. This is the repaint hot
    /// path and never allocates.
    ///
    /// # Errors
    ///
    /// Range error for a bad `index`; shape mismatch if `target` is not the
    /// slice's (width, height).
    pub fn render_label_slice_into(
        &self,
        index: usize,
        orientation: Orientation,
        target: &mut RgbaImage,
        visibility: &ChannelVisibility,
        opacity: f32,
    ) -> Result<(), VolumeError> {
        let layout = self.layout(index, orientation)?;
        Self::check_raster(&layout, target)?;
        let opacity = opacity.clamp(0.0, 1.0);
        let out: &mut [u8] = target;
        self.shade_slice(&layout, out, |voxel| {
            self.shade_priority(voxel, visibility, opacity)
        });
        Ok(())
    }

    #[inline]
    fn label_of_channel(&self, value: u8, channel: usize) -> usize {
        if self.channels == 1 {
            value as usize
        } else {
            channel + 1
        }
    }

    /// Labels past the palette have no color and are never drawn.
    #[inline]
    fn is_drawn(label: usize, visibility: &ChannelVisibility) -> bool {
        label <= LABEL_COUNT && visibility.is_visible(label)
    }

    #[inline]
    fn shade_single(
        &self,
        value: u8,
        channel: usize,
        visibility: &ChannelVisibility,
        opacity: f32,
    ) -> [u8; 4] {
        let label = self.label_of_channel(value, channel);
        if value == 0 || !Self::is_drawn(label, visibility) {
            return TRANSPARENT.0;
        }
        let color = self.color_map.color(label);
        // Single-channel volumes hold label ids, not intensities.
        let intensity = if self.channels == 1 {
            1.0
        } else {
            value as f32 / 255.0
        };
        [
            color[0],
            color[1],
            color[2],
            scale_alpha(color[3], intensity * opacity),
        ]
    }

    #[inline]
    fn shade_priority(&self, voxel: &[u8], visibility: &ChannelVisibility, opacity: f32) -> [u8; 4] {
        for channel in (0..voxel.len()).rev() {
            let value = voxel[channel];
            if value == 0 {
                continue;
            }
            let label = self.label_of_channel(value, channel);
            if !Self::is_drawn(label, visibility) {
                continue;
            }
            let color = self.color_map.color(label);
            return [
                color[0],
                color[1],
                color[2],
                scale_alpha(color[3], opacity),
            ];
        }
        TRANSPARENT.0
    }

    #[inline]
    fn shade_blended(&self, voxel: &[u8], visibility: &ChannelVisibility, opacity: f32) -> [u8; 4] {
        let mut rgb = [0.0f32; 3];
        let mut alpha = 0.0f32;
        for (channel, &value) in voxel.iter().enumerate() {
            if value == 0 {
                continue;
            }
            let label = self.label_of_channel(value, channel);
            if !Self::is_drawn(label, visibility) {
                continue;
            }
            let color = self.color_map.color(label);
            let intensity = if self.channels == 1 {
                1.0
            } else {
                value as f32 / 255.0
            };
            let weight = color[3] as f32 / 255.0 * intensity * opacity;
            for (sum, &component) in rgb.iter_mut().zip(&color.0[..3]) {
                *sum += component as f32 * weight;
            }
            alpha += weight;
        }
        [
            rgb[0].round().min(255.0) as u8,
            rgb[1].round().min(255.0) as u8,
            rgb[2].round().min(255.0) as u8,
            (alpha * 255.0).round().min(255.0) as u8,
        ]
    }

    /// Copy raster bytes straight into a slice.
    ///
    /// Four-channel volumes take the whole RGBA pixel (a single bulk copy on
    /// the axial axis). Other volumes take the red byte of each pixel into
    /// `channel`, which inverts grayscale rendering.
    pub fn set_slice_from_raster(
        &mut self,
        index: usize,
        raster: &RgbaImage,
        orientation: Orientation,
        channel: usize,
    ) -> Result<(), VolumeError> {
        let layout = self.layout(index, orientation)?;
        Self::check_raster(&layout, raster)?;
        self.check_channel(channel)?;
        let pixels: &[[u8; 4]] = bytemuck::cast_slice(raster.as_raw());

        if self.channels == 4 {
            if orientation == Orientation::Axial {
                let len = layout.width * layout.height * 4;
                self.data[layout.base..layout.base + len].copy_from_slice(raster.as_raw());
                return Ok(());
            }
            for (row, row_pixels) in pixels.chunks_exact(layout.width).enumerate() {
                let mut index = layout.row_start(row);
                for pixel in row_pixels {
                    self.data[index..index + 4].copy_from_slice(pixel);
                    index += layout.col_stride;
                }
            }
            return Ok(());
        }

        for (row, row_pixels) in pixels.chunks_exact(layout.width).enumerate() {
            let mut index = layout.row_start(row) + channel;
            for pixel in row_pixels {
                self.data[index] = pixel[0];
                index += layout.col_stride;
            }
        }
        Ok(())
    }

    /// Store a painted RGBA slice back into the volume.
    ///
    /// Pixels with alpha below [`ERASE_ALPHA_THRESHOLD`] erase, except where
    /// the voxel currently holds a label hidden by `visibility`: those
    /// voxels were never drawn, so a transparent pixel says nothing about
    /// them. Opaque pixels are decoded with the color map (exact match, then
    /// nearest label color), which keeps anti-aliased stroke edges from
    /// growing the mask over repeated save/load cycles.
    ///
    /// Single-channel volumes store the decoded label and only validate
    /// `active_channel`. Multi-channel volumes write a 255/0 mask into
    /// storage channel `active_channel - 1`.
    pub fn write_slice_labels_from_raster(
        &mut self,
        index: usize,
        raster: &RgbaImage,
        orientation: Orientation,
        active_channel: usize,
        visibility: Option<&ChannelVisibility>,
    ) -> Result<(), VolumeError> {
        let layout = self.layout(index, orientation)?;
        Self::check_raster(&layout, raster)?;
        if active_channel == 0 || active_channel > LABEL_COUNT {
            return Err(VolumeError::UnknownLabel {
                label: active_channel,
            });
        }
        let all_visible = ChannelVisibility::all_visible();
        let visibility = visibility.unwrap_or(&all_visible);
        let pixels: &[[u8; 4]] = bytemuck::cast_slice(raster.as_raw());

        if self.channels == 1 {
            for (row, row_pixels) in pixels.chunks_exact(layout.width).enumerate() {
                let mut index = layout.row_start(row);
                for &[r, g, b, a] in row_pixels {
                    if a < ERASE_ALPHA_THRESHOLD {
                        if visibility.is_visible(self.data[index] as usize) {
                            self.data[index] = 0;
                        }
                    } else {
                        self.data[index] = self.color_map.label_for_rgb([r, g, b]);
                    }
                    index += layout.col_stride;
                }
            }
            return Ok(());
        }

        let channel = active_channel - 1;
        self.check_channel(channel)?;
        let erase = visibility.is_visible(active_channel);
        for (row, row_pixels) in pixels.chunks_exact(layout.width).enumerate() {
            let mut index = layout.row_start(row) + channel;
            for pixel in row_pixels {
                if pixel[3] >= ERASE_ALPHA_THRESHOLD {
                    self.data[index] = 255;
                } else if erase {
                    self.data[index] = 0;
                }
                index += layout.col_stride;
            }
        }
        Ok(())
    }

    /// Raw bytes of a slice, row-major in slice coordinates with all
    /// channels interleaved.
    pub fn get_slice_raw_bytes(&self, index: usize, orientation: Orientation) -> Result<Vec<u8>, VolumeError> {
        let layout = self.layout(index, orientation)?;
        let c = self.channels;
        let len = layout.width * layout.height * c;
        if orientation == Orientation::Axial {
            return Ok(self.data[layout.base..layout.base + len].to_vec());
        }
        let mut bytes = Vec::with_capacity(len);
        for row in 0..layout.height {
            let mut index = layout.row_start(row);
            for _ in 0..layout.width {
                bytes.extend_from_slice(&self.data[index..index + c]);
                index += layout.col_stride;
            }
        }
        Ok(bytes)
    }

    /// Inverse of [`Self::get_slice_raw_bytes`].
    pub fn set_slice_raw_bytes(
        &mut self,
        index: usize,
        orientation: Orientation,
        bytes: &[u8],
    ) -> Result<(), VolumeError> {
        let layout = self.layout(index, orientation)?;
        let c = self.channels;
        let expected = layout.width * layout.height * c;
        if bytes.len() != expected {
            return Err(VolumeError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        if orientation == Orientation::Axial {
            self.data[layout.base..layout.base + expected].copy_from_slice(bytes);
            return Ok(());
        }
        for (row, row_bytes) in bytes.chunks_exact(layout.width * c).enumerate() {
            let mut index = layout.row_start(row);
            for voxel in row_bytes.chunks_exact(c) {
                self.data[index..index + c].copy_from_slice(voxel);
                index += layout.col_stride;
            }
        }
        Ok(())
    }

    /// Get a reference to the underlying data
    pub fn get_raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the whole buffer. `bytes` must match the volume size exactly.
    pub fn set_raw_data(&mut self, bytes: &[u8]) -> Result<(), VolumeError> {
        if bytes.len() != self.data.len() {
            return Err(VolumeError::LengthMismatch {
                expected: self.data.len(),
                actual: bytes.len(),
            });
        }
        self.data.copy_from_slice(bytes);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Zero one slice, either every channel or just `channel`.
    pub fn clear_slice(
        &mut self,
        index: usize,
        orientation: Orientation,
        channel: Option<usize>,
    ) -> Result<(), VolumeError> {
        let layout = self.layout(index, orientation)?;
        let c = self.channels;
        match channel {
            None if orientation == Orientation::Axial => {
                let len = layout.width * layout.height * c;
                self.data[layout.base..layout.base + len].fill(0);
            }
            None => {
                for row in 0..layout.height {
                    let mut index = layout.row_start(row);
                    for _ in 0..layout.width {
                        self.data[index..index + c].fill(0);
                        index += layout.col_stride;
                    }
                }
            }
            Some(channel) => {
                self.check_channel(channel)?;
                for row in 0..layout.height {
                    let mut index = layout.row_start(row) + channel;
                    for _ in 0..layout.width {
                        self.data[index] = 0;
                        index += layout.col_stride;
                    }
                }
            }
        }
        Ok(())
    }

    /// `true` iff any voxel is non-zero.
    pub fn has_data(&self) -> bool {
        self.data.par_iter().any(|&v| v != 0)
    }

    /// Whether one slice holds any non-zero byte.
    pub fn slice_has_data(&self, index: usize, orientation: Orientation) -> Result<bool, VolumeError> {
        self.layout(index, orientation)?;
        let view = self.view()?;
        let slice = match orientation {
            Orientation::Axial => view.slice_move(s![index, .., .., ..]),
            Orientation::Coronal => view.slice_move(s![.., index, .., ..]),
            Orientation::Sagittal => view.slice_move(s![.., .., index, ..]),
        };
        Ok(slice.iter().any(|&v| v != 0))
    }

    /// Borrow the whole buffer as a `(depth, height, width, channels)` array.
    pub fn view(&self) -> Result<ArrayView4<'_, u8>, VolumeError> {
        let VolumeDimensions {
            width,
            height,
            depth,
        } = self.dims;
        Ok(ArrayView4::from_shape(
            (depth, height, width, self.channels),
            &self.data,
        )?)
    }

    /// Strided view of one channel of a slice, shaped (height, width) of the
    /// slice.
    pub fn slice_view(
        &self,
        index: usize,
        orientation: Orientation,
        channel: usize,
    ) -> Result<ArrayView2<'_, u8>, VolumeError> {
        self.layout(index, orientation)?;
        self.check_channel(channel)?;
        let view = self.view()?;
        let slice = match orientation {
            Orientation::Axial => view.slice_move(s![index, .., .., channel]),
            Orientation::Coronal => view.slice_move(s![.., index, .., channel]),
            // (depth, height) -> rows walk y, columns walk z
            Orientation::Sagittal => view.slice_move(s![.., .., index, channel]).reversed_axes(),
        };
        Ok(slice)
    }
}

#[inline]
fn scale_alpha(alpha: u8, factor: f32) -> u8 {
    (alpha as f32 * factor).round().clamp(0.0, 255.0) as u8
}
