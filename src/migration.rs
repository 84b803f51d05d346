//! Conversion to and from the legacy per-slice raster layout.
//!
//! Older datasets kept annotations as one colored RGBA raster per painted
//! slice along a single axis, skipping empty slices. These helpers move a
//! single-channel label volume in and out of that layout.

use std::collections::BTreeMap;

use image::RgbaImage;
use rayon::prelude::*;

use crate::enums::Orientation;
use crate::error::VolumeError;
use crate::palette::ChannelVisibility;
use crate::volume::{VolumeDimensions, VoxelLabelVolume};

/// Colored rasters of the non-empty slices of one layer along one axis.
#[derive(Clone, Debug, PartialEq)]
pub struct LegacySliceRasters {
    pub orientation: Orientation,
    pub slices: BTreeMap<usize, RgbaImage>,
}

impl LegacySliceRasters {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            slices: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Render every non-empty slice of `volume` along `orientation`.
pub fn to_legacy(
    volume: &VoxelLabelVolume,
    orientation: Orientation,
) -> Result<LegacySliceRasters, VolumeError> {
    let count = volume.dimensions().slice_count(orientation);
    let (width, height) = volume.slice_dimensions(orientation);
    let visibility = ChannelVisibility::all_visible();

    let rendered = (0..count)
        .into_par_iter()
        .map(|index| -> Result<Option<(usize, RgbaImage)>, VolumeError> {
            if !volume.slice_has_data(index, orientation)? {
                return Ok(None);
            }
            let mut raster = RgbaImage::new(width as u32, height as u32);
            volume.render_label_slice_into(index, orientation, &mut raster, &visibility, 1.0)?;
            Ok(Some((index, raster)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let slices: BTreeMap<_, _> = rendered.into_iter().flatten().collect();
    log::debug!(
        "Exported {} of {} {} slices to legacy rasters",
        slices.len(),
        count,
        orientation
    );
    Ok(LegacySliceRasters {
        orientation,
        slices,
    })
}

/// Replace the contents of `volume` with the labels in `legacy`.
///
/// Rasters are decoded with the volume's own color map, so it must match
/// the palette the rasters were rendered with.
pub fn apply_legacy(
    legacy: &LegacySliceRasters,
    volume: &mut VoxelLabelVolume,
) -> Result<(), VolumeError> {
    volume.clear();
    for (&index, raster) in &legacy.slices {
        volume.write_slice_labels_from_raster(index, raster, legacy.orientation, 1, None)?;
    }
    log::debug!(
        "Imported {} legacy {} slices",
        legacy.slices.len(),
        legacy.orientation
    );
    Ok(())
}

/// Build a fresh single-channel volume with the default palette from
/// `legacy`.
pub fn from_legacy(
    legacy: &LegacySliceRasters,
    dims: VolumeDimensions,
) -> Result<VoxelLabelVolume, VolumeError> {
    let mut volume = VoxelLabelVolume::with_dimensions(dims, 1)?;
    apply_legacy(legacy, &mut volume)?;
    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn painted() -> VoxelLabelVolume {
        let mut volume = VoxelLabelVolume::new(5, 4, 6, 1).unwrap();
        volume.set_voxel(1, 1, 2, 3, 0).unwrap();
        volume.set_voxel(4, 3, 2, 8, 0).unwrap();
        volume.set_voxel(0, 2, 5, 1, 0).unwrap();
        volume
    }

    #[test]
    fn only_non_empty_slices_are_exported() {
        let volume = painted();
        let legacy = to_legacy(&volume, Orientation::Axial).unwrap();
        assert_eq!(legacy.slices.keys().copied().collect::<Vec<_>>(), vec![2, 5]);

        let legacy = to_legacy(&volume, Orientation::Sagittal).unwrap();
        assert_eq!(legacy.slices.keys().copied().collect::<Vec<_>>(), vec![0, 1, 4]);
        assert_eq!(legacy.slices[&1].dimensions(), (6, 4));
    }

    #[test]
    fn legacy_round_trip_on_every_axis() {
        let volume = painted();
        for orientation in Orientation::ALL {
            let legacy = to_legacy(&volume, orientation).unwrap();
            let restored = from_legacy(&legacy, volume.dimensions()).unwrap();
            assert_eq!(restored.get_raw_data(), volume.get_raw_data(), "{orientation}");
        }
    }

    #[test]
    fn apply_uses_the_volume_palette() {
        let mut volume = painted();
        volume.set_channel_color(3, Rgba([10, 20, 30, 255])).unwrap();
        let legacy = to_legacy(&volume, Orientation::Coronal).unwrap();

        let mut target = VoxelLabelVolume::new(5, 4, 6, 1).unwrap();
        target.set_color_map(volume.color_map().clone());
        target.set_voxel(0, 0, 0, 7, 0).unwrap();
        apply_legacy(&legacy, &mut target).unwrap();
        assert_eq!(target.get_raw_data(), volume.get_raw_data());
    }

    #[test]
    fn empty_volume_exports_nothing() {
        let volume = VoxelLabelVolume::new(2, 2, 2, 1).unwrap();
        assert!(to_legacy(&volume, Orientation::Coronal).unwrap().is_empty());
    }
}
