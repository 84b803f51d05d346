use std::fmt;

/// Viewing direction of a slice.
///
/// The letter in parentheses is the volume axis the slice index walks along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// (z): slices are `width x height`
    Axial,
    /// (y): slices are `width x depth`
    Coronal,
    /// (x): slices are `depth x height`
    Sagittal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Axial,
        Orientation::Coronal,
        Orientation::Sagittal,
    ];

    /// Axis letter used in logs and error messages.
    pub fn axis_name(self) -> &'static str {
        match self {
            Orientation::Axial => "z",
            Orientation::Coronal => "y",
            Orientation::Sagittal => "x",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.axis_name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Raw value replicated into R/G/B, opaque where non-zero.
    Grayscale,
    /// A single channel drawn with its palette color.
    ColoredSingle,
    /// Highest-indexed visible non-zero channel wins.
    #[default]
    ColoredMulti,
    /// Additive, alpha-weighted sum over all visible channels.
    Blended,
}
