use image::{Rgba, RgbaImage};
use voxel_annotation::{
    AnnotationConfig, AnnotationSession, Orientation, PhysicalExtent, VolumeDimensions,
};

const DIMS: VolumeDimensions = VolumeDimensions {
    width: 12,
    height: 10,
    depth: 8,
};

fn session() -> AnnotationSession {
    let extent = PhysicalExtent::from_spacing(DIMS, (0.5, 0.5, 1.5));
    let mut config = AnnotationConfig::default();
    config.global_opacity = 1.0;
    AnnotationSession::new(&config, DIMS, extent).unwrap()
}

fn square(orientation: Orientation, color: Rgba<u8>, from: u32, to: u32) -> RgbaImage {
    let (w, h) = DIMS.slice_dimensions(orientation);
    RgbaImage::from_fn(w as u32, h as u32, |x, y| {
        if (from..to).contains(&x) && (from..to).contains(&y) {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[test]
fn paint_render_undo_redo() {
    let mut session = session();
    let green = session.layers().get("layer1").color_map().color(1);
    let blue = session.layers().get("layer1").color_map().color(3);

    let first = square(Orientation::Axial, green, 1, 4);
    session
        .paint("layer1", 3, Orientation::Axial, &first, 1)
        .unwrap();
    let after_first = session.layers().get("layer1").get_raw_data().to_vec();

    let mut second = first.clone();
    for x in 5..9 {
        second.put_pixel(x, 6, blue);
    }
    session
        .paint("layer1", 3, Orientation::Axial, &second, 3)
        .unwrap();
    let after_second = session.layers().get("layer1").get_raw_data().to_vec();

    let rendered = session.render(3, Orientation::Axial).unwrap().clone();
    assert_eq!(rendered, second);

    assert_eq!(session.undo().unwrap(), Some((Orientation::Axial, 3)));
    assert_eq!(session.layers().get("layer1").get_raw_data(), after_first.as_slice());
    assert_eq!(session.undo().unwrap(), Some((Orientation::Axial, 3)));
    assert!(!session.layers().get("layer1").has_data());
    assert_eq!(session.undo().unwrap(), None);

    session.redo().unwrap();
    session.redo().unwrap();
    assert_eq!(session.redo().unwrap(), None);
    assert_eq!(session.layers().get("layer1").get_raw_data(), after_second.as_slice());
}

#[test]
fn undo_follows_the_active_layer() {
    let mut session = session();
    let red = session.layers().get("layer2").color_map().color(2);
    session
        .paint("layer2", 0, Orientation::Sagittal, &square(Orientation::Sagittal, red, 0, 3), 2)
        .unwrap();

    assert_eq!(session.undo().unwrap(), None);
    session.set_active_layer("layer2");
    assert_eq!(session.undo().unwrap(), Some((Orientation::Sagittal, 0)));
    assert!(session.layers().layers_with_data().is_empty());
}

#[test]
fn coronal_display_round_trip_is_identity() {
    let mut session = session();
    let yellow = session.layers().get("layer1").color_map().color(4);
    let (w, h) = DIMS.slice_dimensions(Orientation::Coronal);

    let mut stroke = RgbaImage::new(w as u32, h as u32);
    stroke.put_pixel(2, 0, yellow);
    session
        .paint_from_display("layer1", 5, Orientation::Coronal, &stroke, 4)
        .unwrap();

    // The top display row is the deepest slice of the volume.
    assert_eq!(
        session.layers().get("layer1").get_voxel(2, 5, DIMS.depth - 1, 0).unwrap(),
        4
    );

    let mut display = RgbaImage::new(w as u32, h as u32);
    session
        .render_display(5, Orientation::Coronal, &mut display)
        .unwrap();
    assert_eq!(display, stroke);
}

#[test]
fn stacked_layers_and_global_opacity() {
    let mut session = session();
    let green = session.layers().get("layer1").color_map().color(1);
    let red = session.layers().get("layer3").color_map().color(2);
    session
        .paint("layer1", 1, Orientation::Axial, &square(Orientation::Axial, green, 0, 4), 1)
        .unwrap();
    session
        .paint("layer3", 1, Orientation::Axial, &square(Orientation::Axial, red, 2, 6), 2)
        .unwrap();

    session.set_global_opacity(0.5);
    let mut display = RgbaImage::new(DIMS.width as u32, DIMS.height as u32);
    session
        .render_display(1, Orientation::Axial, &mut display)
        .unwrap();
    assert_eq!(display.get_pixel(1, 1), &Rgba([0, 255, 0, 128]));
    assert_eq!(display.get_pixel(3, 3), &Rgba([255, 0, 0, 128]));
    assert_eq!(display.get_pixel(8, 8), &Rgba([0, 0, 0, 0]));

    assert!(session.set_layer_visible("layer3", false));
    session
        .render_display(1, Orientation::Axial, &mut display)
        .unwrap();
    assert_eq!(display.get_pixel(3, 3), &Rgba([0, 255, 0, 128]));
}

#[test]
fn hidden_channels_survive_a_repaint() {
    let mut session = session();
    let colors = session.layers().get("layer1").color_map().clone();
    let mut both = square(Orientation::Axial, colors.color(1), 0, 3);
    both.put_pixel(6, 6, colors.color(5));
    session
        .paint("layer1", 2, Orientation::Axial, &both, 1)
        .unwrap();

    // With label 5 hidden the front end only sees label 1, erases it and
    // writes back a blank raster.
    session.set_channel_visible(5, false);
    let blank = RgbaImage::new(DIMS.width as u32, DIMS.height as u32);
    session
        .paint("layer1", 2, Orientation::Axial, &blank, 1)
        .unwrap();

    let volume = session.layers().get("layer1");
    assert_eq!(volume.get_voxel(0, 0, 2, 0).unwrap(), 0);
    assert_eq!(volume.get_voxel(6, 6, 2, 0).unwrap(), 5);
}

#[test]
fn unknown_layer_paints_the_first_layer() {
    let mut session = session();
    let green = session.layers().get("layer1").color_map().color(1);
    session
        .paint("lyaer2", 0, Orientation::Axial, &square(Orientation::Axial, green, 0, 1), 1)
        .unwrap();
    assert_eq!(session.layers().layers_with_data(), vec!["layer1"]);
    assert_eq!(session.history().undo_depth("layer1"), 1);
}

#[test]
fn marker_and_axis_switch_agree() {
    let mut session = session();
    session.register_cursor(2.5, 3.0, 4);
    let placement = session.place_marker(2.5, 3.0, 4);
    let on_coronal = session.switch_axis(Orientation::Coronal).unwrap();
    assert_eq!(on_coronal, placement.position(Orientation::Coronal));
    assert_eq!(on_coronal.slice_index, 6);

    session.reset();
    assert_eq!(session.cursor(), None);
    assert_eq!(session.active_axis(), Orientation::Axial);
}
