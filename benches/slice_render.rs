use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::RgbaImage;

use voxel_annotation::{
    ChannelVisibility, LayerCompositor, LayerSet, Orientation, VolumeDimensions,
    VoxelLabelVolume,
};

fn create_test_volume(width: usize, height: usize, depth: usize) -> VoxelLabelVolume {
    let mut volume = VoxelLabelVolume::new(width, height, depth, 1).unwrap();
    let bytes: Vec<u8> = (0..width * height * depth).map(|i| (i % 9) as u8).collect();
    volume.set_raw_data(&bytes).unwrap();
    volume
}

fn bench_render_into(c: &mut Criterion) {
    let volume = create_test_volume(512, 512, 128);
    let visibility = ChannelVisibility::all_visible();

    for orientation in Orientation::ALL {
        let (w, h) = volume.slice_dimensions(orientation);
        let mut target = RgbaImage::new(w as u32, h as u32);
        c.bench_function(&format!("render_label_slice_into_{orientation}"), |b| {
            b.iter(|| {
                volume
                    .render_label_slice_into(
                        black_box(64),
                        orientation,
                        &mut target,
                        &visibility,
                        1.0,
                    )
                    .unwrap()
            });
        });
    }
}

fn bench_write_labels(c: &mut Criterion) {
    let mut volume = create_test_volume(512, 512, 128);
    let mut stroke = RgbaImage::new(512, 128);
    let visibility = ChannelVisibility::all_visible();
    volume
        .render_label_slice_into(100, Orientation::Coronal, &mut stroke, &visibility, 1.0)
        .unwrap();

    c.bench_function("write_slice_labels_coronal", |b| {
        b.iter(|| {
            volume
                .write_slice_labels_from_raster(
                    black_box(100),
                    &stroke,
                    Orientation::Coronal,
                    1,
                    None,
                )
                .unwrap()
        });
    });
}

fn bench_composite_layers(c: &mut Criterion) {
    let dims = VolumeDimensions::new(256, 256, 64);
    let layers = LayerSet::new(&["layer1", "layer2", "layer3", "layer4"], dims, 1).unwrap();
    let mut compositor = LayerCompositor::new(layers.ids().clone());
    let visibility = ChannelVisibility::all_visible();

    c.bench_function("render_layers_axial_4", |b| {
        b.iter(|| {
            compositor
                .render_layers(&layers, black_box(32), Orientation::Axial, &visibility)
                .map(|master| master.width())
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_render_into,
    bench_write_labels,
    bench_composite_layers
);
criterion_main!(benches);
