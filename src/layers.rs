//! The fixed set of annotation layers of a dataset.
//!
//! Layer ids are decided once at construction and map by position to their
//! volumes. Looking up an id that is not part of the set is not an error:
//! it logs a warning and resolves to the first layer, so a typo in a caller
//! degrades the paint loop instead of breaking it.

use image::Rgba;

use crate::error::VolumeError;
use crate::volume::{VolumeDimensions, VoxelLabelVolume};

/// Ordered, duplicate-free list of layer ids with the unknown-id fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerIds(Vec<String>);

impl LayerIds {
    pub fn new<S: AsRef<str>>(ids: &[S]) -> Result<Self, VolumeError> {
        if ids.is_empty() {
            return Err(VolumeError::NoLayers);
        }
        let mut owned: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            if owned.iter().any(|existing| existing == id) {
                return Err(VolumeError::DuplicateLayer(id.to_owned()));
            }
            owned.push(id.to_owned());
        }
        Ok(Self(owned))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|existing| existing == id)
    }

    /// Position of `id`, or of the first layer if `id` is unknown.
    pub fn resolve(&self, id: &str) -> usize {
        self.position(id).unwrap_or_else(|| {
            log::warn!(
                "Unknown layer id {:?}, falling back to {:?}",
                id,
                self.0[0]
            );
            0
        })
    }

    /// Canonical id `id` resolves to.
    pub fn resolve_name(&self, id: &str) -> &str {
        &self.0[self.resolve(id)]
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

/// All annotation volumes of a dataset. Created and reset together.
#[derive(Clone, Debug)]
pub struct LayerSet {
    ids: LayerIds,
    volumes: Vec<VoxelLabelVolume>,
    dims: VolumeDimensions,
}

impl LayerSet {
    pub fn new<S: AsRef<str>>(
        ids: &[S],
        dims: VolumeDimensions,
        channels: usize,
    ) -> Result<Self, VolumeError> {
        let ids = LayerIds::new(ids)?;
        let volumes = (0..ids.len())
            .map(|_| VoxelLabelVolume::with_dimensions(dims, channels))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ids, volumes, dims })
    }

    pub fn ids(&self) -> &LayerIds {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn dimensions(&self) -> VolumeDimensions {
        self.dims
    }

    /// Volume for `id`, falling back to the first layer.
    pub fn get(&self, id: &str) -> &VoxelLabelVolume {
        &self.volumes[self.ids.resolve(id)]
    }

    pub fn get_mut(&mut self, id: &str) -> &mut VoxelLabelVolume {
        let index = self.ids.resolve(id);
        &mut self.volumes[index]
    }

    pub fn volume(&self, index: usize) -> Option<&VoxelLabelVolume> {
        self.volumes.get(index)
    }

    pub fn volume_mut(&mut self, index: usize) -> Option<&mut VoxelLabelVolume> {
        self.volumes.get_mut(index)
    }

    pub fn volumes(&self) -> &[VoxelLabelVolume] {
        &self.volumes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VoxelLabelVolume)> {
        self.ids.as_slice().iter().map(String::as_str).zip(&self.volumes)
    }

    /// Set one label color on one layer.
    pub fn set_channel_color(&mut self, id: &str, label: usize, color: Rgba<u8>) -> Result<(), VolumeError> {
        self.get_mut(id).set_channel_color(label, color)
    }

    /// Ids of layers holding at least one non-zero voxel, in layer order.
    pub fn layers_with_data(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, volume)| volume.has_data())
            .map(|(id, _)| id)
            .collect()
    }

    /// Zero every volume. Color maps are kept.
    pub fn clear_all(&mut self) {
        for volume in &mut self.volumes {
            volume.clear();
        }
    }
}
