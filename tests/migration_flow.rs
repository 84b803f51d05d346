use voxel_annotation::migration::{self, LegacySliceRasters};
use voxel_annotation::{Orientation, VolumeDimensions, VoxelLabelVolume};

fn painted(dims: VolumeDimensions) -> VoxelLabelVolume {
    let mut volume = VoxelLabelVolume::with_dimensions(dims, 1).unwrap();
    for (x, y, z, label) in [(0, 0, 0, 1), (3, 2, 1, 4), (5, 4, 3, 8), (2, 4, 3, 6)] {
        volume.set_voxel(x, y, z, label, 0).unwrap();
    }
    volume
}

#[test]
fn every_axis_exports_and_imports_the_same_labels() {
    let dims = VolumeDimensions::new(6, 5, 4);
    let volume = painted(dims);
    for orientation in Orientation::ALL {
        let legacy = migration::to_legacy(&volume, orientation).unwrap();
        let restored = migration::from_legacy(&legacy, dims).unwrap();
        assert_eq!(restored.get_raw_data(), volume.get_raw_data(), "{orientation}");
    }
}

#[test]
fn empty_slices_are_skipped() {
    let dims = VolumeDimensions::new(6, 5, 4);
    let legacy = migration::to_legacy(&painted(dims), Orientation::Axial).unwrap();
    assert_eq!(legacy.slices.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3]);

    let empty = VoxelLabelVolume::with_dimensions(dims, 1).unwrap();
    assert!(migration::to_legacy(&empty, Orientation::Sagittal).unwrap().is_empty());
}

#[test]
fn importing_replaces_previous_contents() {
    let dims = VolumeDimensions::new(6, 5, 4);
    let mut target = painted(dims);
    migration::apply_legacy(&LegacySliceRasters::new(Orientation::Coronal), &mut target).unwrap();
    assert!(!target.has_data());
}
