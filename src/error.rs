use thiserror::Error;

use crate::enums::Orientation;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Invalid volume dimensions {width}x{height}x{depth} with {channels} channel(s)")]
    InvalidDimensions {
        width: usize,
        height: usize,
        depth: usize,
        channels: usize,
    },

    #[error("Voxel ({x}, {y}, {z}) channel {channel} is outside the volume")]
    VoxelOutOfBounds {
        x: usize,
        y: usize,
        z: usize,
        channel: usize,
    },

    #[error("Slice index {index} is outside [0, {len}) on the {orientation} axis")]
    SliceOutOfRange {
        index: usize,
        len: usize,
        orientation: Orientation,
    },

    #[error("Channel {channel} is outside [0, {channels})")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("Label {label} has no palette entry")]
    UnknownLabel { label: usize },

    #[error("Raster is {actual:?} but the slice is {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("A layer set needs at least one layer")]
    NoLayers,

    #[error("Duplicate layer id {0:?}")]
    DuplicateLayer(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),
}
