use image::RgbaImage;
use voxel_annotation::{
    AnnotationConfig, AnnotationSession, Orientation, PhysicalExtent, VolumeDimensions,
};

fn main() {
    voxel_annotation::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => AnnotationConfig::load(&path).expect("should have loaded the config file"),
        None => AnnotationConfig::default(),
    };
    let dims = VolumeDimensions::new(128, 128, 64);
    let extent = PhysicalExtent::from_spacing(dims, (0.8, 0.8, 2.5));
    let mut session =
        AnnotationSession::new(&config, dims, extent).expect("should have created the session");
    let layer = config.layers[0].clone();
    let center = dims.depth / 2;

    let color = session.layers().get(&layer).color_map().color(1);
    let stroke = RgbaImage::from_fn(dims.width as u32, dims.height as u32, |x, y| {
        let (dx, dy) = (x as f32 - 64.0, y as f32 - 64.0);
        if dx * dx + dy * dy < 30.0 * 30.0 {
            color
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    session
        .paint(&layer, center, Orientation::Axial, &stroke, 1)
        .expect("should have painted the axial slice");

    let mut display = RgbaImage::new(dims.width as u32, dims.height as u32);
    session
        .render_display(center, Orientation::Axial, &mut display)
        .expect("should have rendered the axial slice");
    display
        .save("labels.png")
        .expect("should have saved labels.png");
    log::info!("Saved axial slice {} to labels.png", center);
}
