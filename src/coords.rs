//! Keeps a cursor registered across the three viewing axes.
//!
//! Cursor coordinates are in millimetres of the view they belong to, slice
//! indices are in voxels. The views lay their axes out as
//!
//! | view     | index | cursor x | cursor y |
//! |----------|-------|----------|----------|
//! | axial    | z     | x        | y        |
//! | coronal  | y     | x        | z (flip) |
//! | sagittal | x     | z        | y        |
//!
//! The coronal view draws depth in the opposite direction, so every pair
//! that moves z into or out of the coronal cursor goes through `1 - ratio`;
//! all other pairs are direct ratios.

use crate::enums::Orientation;
use crate::volume::VolumeDimensions;

// Absorbs the rounding error of index -> mm -> index.
const INDEX_EPSILON: f64 = 1e-6;

/// Physical extent of the volume along x, y and z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicalExtent {
    pub width_mm: f64,
    pub height_mm: f64,
    pub depth_mm: f64,
}

impl PhysicalExtent {
    pub fn new(width_mm: f64, height_mm: f64, depth_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            depth_mm,
        }
    }

    /// Extent from per-voxel spacing `(x, y, z)` in millimetres.
    pub fn from_spacing(dims: VolumeDimensions, spacing: (f32, f32, f32)) -> Self {
        let (x_spacing, y_spacing, z_spacing) = spacing;
        Self {
            width_mm: dims.width as f64 * x_spacing as f64,
            height_mm: dims.height as f64 * y_spacing as f64,
            depth_mm: dims.depth as f64 * z_spacing as f64,
        }
    }
}

/// A cursor and the slice it sits on, in one view's coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisPosition {
    pub slice_index: usize,
    pub cursor_x: f64,
    pub cursor_y: f64,
}

#[inline]
fn index_to_mm(index: usize, len: usize, extent_mm: f64) -> f64 {
    index as f64 / len as f64 * extent_mm
}

#[inline]
fn index_to_mm_flipped(index: usize, len: usize, extent_mm: f64) -> f64 {
    (1.0 - index as f64 / len as f64) * extent_mm
}

#[inline]
fn ratio_to_index(ratio: f64, len: usize) -> usize {
    let index = (ratio * len as f64 + INDEX_EPSILON).floor();
    index.clamp(0.0, len.saturating_sub(1) as f64) as usize
}

#[inline]
fn mm_to_index(position_mm: f64, extent_mm: f64, len: usize) -> usize {
    ratio_to_index(position_mm / extent_mm, len)
}

#[inline]
fn mm_to_index_flipped(position_mm: f64, extent_mm: f64, len: usize) -> usize {
    ratio_to_index(1.0 - position_mm / extent_mm, len)
}

/// Translate a cursor on `from` into the slice and cursor on `to`.
///
/// Returns `None` when `from == to`.
pub fn convert(
    from: Orientation,
    to: Orientation,
    cursor_x: f64,
    cursor_y: f64,
    slice_index: usize,
    dims: VolumeDimensions,
    extent: PhysicalExtent,
) -> Option<AxisPosition> {
    let VolumeDimensions {
        width,
        height,
        depth,
    } = dims;
    let PhysicalExtent {
        width_mm,
        height_mm,
        depth_mm,
    } = extent;

    let (slice_index, cursor_x, cursor_y) = match (from, to) {
        (Orientation::Axial, Orientation::Coronal) => (
            mm_to_index(cursor_y, height_mm, height),
            cursor_x,
            index_to_mm_flipped(slice_index, depth, depth_mm),
        ),
        (Orientation::Coronal, Orientation::Axial) => (
            mm_to_index_flipped(cursor_y, depth_mm, depth),
            cursor_x,
            index_to_mm(slice_index, height, height_mm),
        ),
        (Orientation::Axial, Orientation::Sagittal) => (
            mm_to_index(cursor_x, width_mm, width),
            index_to_mm(slice_index, depth, depth_mm),
            cursor_y,
        ),
        (Orientation::Sagittal, Orientation::Axial) => (
            mm_to_index(cursor_x, depth_mm, depth),
            index_to_mm(slice_index, width, width_mm),
            cursor_y,
        ),
        (Orientation::Coronal, Orientation::Sagittal) => (
            mm_to_index(cursor_x, width_mm, width),
            depth_mm - cursor_y,
            index_to_mm(slice_index, height, height_mm),
        ),
        (Orientation::Sagittal, Orientation::Coronal) => (
            mm_to_index(cursor_y, height_mm, height),
            index_to_mm(slice_index, width, width_mm),
            depth_mm - cursor_x,
        ),
        _ => return None,
    };

    Some(AxisPosition {
        slice_index,
        cursor_x,
        cursor_y,
    })
}

/// A point feature resolved on all three views.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPlacement {
    positions: [AxisPosition; 3],
}

impl MarkerPlacement {
    pub fn position(&self, orientation: Orientation) -> AxisPosition {
        self.positions[orientation.index()]
    }
}

/// Place a marker picked on `origin` so it shows up on every view.
pub fn place_marker(
    origin: Orientation,
    cursor_x: f64,
    cursor_y: f64,
    slice_index: usize,
    dims: VolumeDimensions,
    extent: PhysicalExtent,
) -> MarkerPlacement {
    let picked = AxisPosition {
        slice_index,
        cursor_x,
        cursor_y,
    };
    let mut positions = [picked; 3];
    for target in Orientation::ALL {
        if let Some(position) =
            convert(origin, target, cursor_x, cursor_y, slice_index, dims, extent)
        {
            positions[target.index()] = position;
        }
    }
    MarkerPlacement { positions }
}
