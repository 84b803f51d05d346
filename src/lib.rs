//! # Voxel annotation library
//!
//! This crate provides the storage and slicing core for painting
//! segmentation labels onto a 3D scan volume.
//!
//! Every annotation layer is a dense [`VoxelLabelVolume`] holding one byte per
//! voxel and channel. Label volumes store 0 (background) or one of eight
//! labels. Volumes are sliced in the three medical axes:
//!  - Axial (z), slices are width x height
//!  - Coronal (y), slices are width x depth
//!  - Sagittal (x), slices are depth x height
//!
//!  Slices leave the volume as RGBA rasters for display and come back as
//!  painted RGBA rasters. The paint path tolerates anti-aliased brush edges:
//!  pixels are decoded to the exact or nearest label color, and nearly
//!  transparent pixels erase. Labels hidden from view survive a transparent
//!  stroke.
//!
//!  Around the volume the crate provides:
//!   - [`LayerSet`], a fixed set of named layers with a forgiving lookup
//!   - [`LayerCompositor`], which renders all visible layers of a slice into
//!     one raster while reusing its buffers
//!   - [`UndoManager`], bounded per-layer undo/redo of slice edits
//!   - [`coords`], which keeps a cursor registered when switching axes
//!   - [`migration`], conversion from and to per-slice legacy rasters
//!   - [`AnnotationSession`], which wires all of the above together
//!
//! Everything is synchronous. A render issued after a write always sees it.
//!
//! # Examples
//!
//! ## Painting a label and reading it back
//!
//! ```
//! # use voxel_annotation::{Orientation, VoxelLabelVolume, ChannelVisibility};
//! # use image::RgbaImage;
//! let mut volume = VoxelLabelVolume::new(10, 10, 5, 1)?;
//! let red = volume.color_map().color(2);
//!
//! let mut stroke = RgbaImage::new(10, 10);
//! stroke.put_pixel(4, 4, red);
//! volume.write_slice_labels_from_raster(2, &stroke, Orientation::Axial, 2, None)?;
//! assert_eq!(volume.get_voxel(4, 4, 2, 0)?, 2);
//!
//! let mut display = RgbaImage::new(10, 10);
//! volume.render_label_slice_into(
//!     2,
//!     Orientation::Axial,
//!     &mut display,
//!     &ChannelVisibility::all_visible(),
//!     1.0,
//! )?;
//! assert_eq!(display.get_pixel(4, 4), &red);
//! # Ok::<(), voxel_annotation::VolumeError>(())
//! ```

pub mod compositor;
pub mod config;
pub mod coords;
pub mod enums;
pub mod error;
pub mod layers;
pub mod migration;
pub mod palette;
pub mod session;
pub mod undo;
pub mod volume;

pub use compositor::LayerCompositor;
pub use config::AnnotationConfig;
pub use coords::{AxisPosition, PhysicalExtent};
pub use enums::{Orientation, RenderMode};
pub use error::{ConfigError, VolumeError};
pub use layers::{LayerIds, LayerSet};
pub use palette::{ChannelVisibility, ColorMap};
pub use session::AnnotationSession;
pub use undo::{UndoDelta, UndoManager};
pub use volume::{SliceRenderOptions, VolumeDimensions, VoxelLabelVolume};

/// Initialize logging for binaries and tools.
///
/// Uses env_logger with a default filter of `info`; override with
/// `RUST_LOG`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
