//! Label colors and per-channel visibility.
//!
//! Every volume owns a [`ColorMap`]. Besides the label -> RGBA table it keeps
//! an exact RGB -> label lookup so the paint path can decode stroke pixels
//! without searching, and falls back to the nearest label color for pixels
//! whose RGB was altered by anti-aliasing.

use std::collections::HashMap;

use image::Rgba;

use crate::error::VolumeError;

/// Number of semantic labels (1..=8). Label 0 is background.
pub const LABEL_COUNT: usize = 8;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

pub const DEFAULT_PALETTE: [Rgba<u8>; LABEL_COUNT + 1] = [
    TRANSPARENT,
    Rgba([0, 255, 0, 255]),
    Rgba([255, 0, 0, 255]),
    Rgba([0, 0, 255, 255]),
    Rgba([255, 255, 0, 255]),
    Rgba([255, 0, 255, 255]),
    Rgba([0, 255, 255, 255]),
    Rgba([255, 128, 0, 255]),
    Rgba([128, 0, 255, 255]),
];

#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    colors: [Rgba<u8>; LABEL_COUNT + 1],
    exact: HashMap<[u8; 3], u8>,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE)
    }
}

impl ColorMap {
    pub fn new(colors: [Rgba<u8>; LABEL_COUNT + 1]) -> Self {
        let mut map = Self {
            colors,
            exact: HashMap::with_capacity(LABEL_COUNT),
        };
        map.rebuild_lookup();
        map
    }

    /// Build a color map from plain `[r, g, b, a]` entries, index 0 first.
    pub fn from_rgba(entries: &[[u8; 4]]) -> Result<Self, VolumeError> {
        if entries.len() != LABEL_COUNT + 1 {
            return Err(VolumeError::LengthMismatch {
                expected: LABEL_COUNT + 1,
                actual: entries.len(),
            });
        }
        let mut colors = DEFAULT_PALETTE;
        for (slot, entry) in colors.iter_mut().zip(entries) {
            *slot = Rgba(*entry);
        }
        Ok(Self::new(colors))
    }

    pub fn colors(&self) -> &[Rgba<u8>] {
        &self.colors
    }

    /// Color of `label`; labels without a palette entry are transparent.
    #[inline]
    pub fn color(&self, label: usize) -> Rgba<u8> {
        self.colors.get(label).copied().unwrap_or(TRANSPARENT)
    }

    /// Replace the color of one label. Label 0 stays transparent.
    pub fn set_channel_color(&mut self, label: usize, color: Rgba<u8>) -> Result<(), VolumeError> {
        if label == 0 || label > LABEL_COUNT {
            return Err(VolumeError::UnknownLabel { label });
        }
        self.colors[label] = color;
        self.rebuild_lookup();
        Ok(())
    }

    /// Decode a stroke pixel's RGB into a label.
    ///
    /// Exact palette matches win; anything else maps to the label whose
    /// color is nearest by squared Euclidean distance.
    #[inline]
    pub fn label_for_rgb(&self, rgb: [u8; 3]) -> u8 {
        match self.exact.get(&rgb) {
            Some(&label) => label,
            None => self.nearest_label(rgb),
        }
    }

    pub fn nearest_label(&self, rgb: [u8; 3]) -> u8 {
        let mut best_label = 1u8;
        let mut best_distance = u32::MAX;
        for (label, color) in self.colors.iter().enumerate().skip(1) {
            let distance = squared_distance(rgb, [color[0], color[1], color[2]]);
            if distance < best_distance {
                best_distance = distance;
                best_label = label as u8;
            }
        }
        best_label
    }

    fn rebuild_lookup(&mut self) {
        self.exact.clear();
        for (label, color) in self.colors.iter().enumerate().skip(1) {
            // Lowest label keeps a color shared by several labels.
            self.exact
                .entry([color[0], color[1], color[2]])
                .or_insert(label as u8);
        }
    }
}

#[inline]
fn squared_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&a, &b)| {
            let d = a as i32 - b as i32;
            (d * d) as u32
        })
        .sum()
}

/// Which labels (channels) are currently shown.
///
/// Labels without an entry (0 and anything above [`LABEL_COUNT`]) count as
/// visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelVisibility([bool; LABEL_COUNT + 1]);

impl Default for ChannelVisibility {
    fn default() -> Self {
        Self::all_visible()
    }
}

impl ChannelVisibility {
    pub fn all_visible() -> Self {
        Self([true; LABEL_COUNT + 1])
    }

    /// Everything visible except `hidden`.
    pub fn hiding(hidden: &[usize]) -> Self {
        let mut visibility = Self::all_visible();
        for &label in hidden {
            visibility.set(label, false);
        }
        visibility
    }

    #[inline]
    pub fn is_visible(&self, label: usize) -> bool {
        label == 0 || self.0.get(label).copied().unwrap_or(true)
    }

    #[inline]
    pub fn is_hidden(&self, label: usize) -> bool {
        !self.is_visible(label)
    }

    /// Returns `false` if `label` is not a settable label.
    pub fn set(&mut self, label: usize, visible: bool) -> bool {
        if label == 0 || label > LABEL_COUNT {
            return false;
        }
        self.0[label] = visible;
        true
    }
}
