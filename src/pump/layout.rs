/// LED placement on the host canvas.
///
/// The pump has two concentric rings. Each LED gets a grid cell on the
/// host canvas and a protocol index: outer ring first, then inner ring,
/// both clockwise from the top.
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::protocol::Zone;

/// Canvas width and height in grid cells.
pub const GRID_SIZE: (i32, i32) = (10, 8);
pub const GRID_CENTER: (f64, f64) = (5.0, 4.0);
pub const OUTER_RADIUS: f64 = 3.0;
pub const INNER_RADIUS: f64 = 1.5;

/// Which rings the host drives and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RingMode {
    #[default]
    Combined,
    #[serde(rename = "Outer Ring Only")]
    OuterOnly,
    #[serde(rename = "Inner Ring Only")]
    InnerOnly,
    #[serde(rename = "Independent Rings")]
    Independent,
}

impl RingMode {
    pub const ALL: [Self; 4] = [
        Self::Combined,
        Self::OuterOnly,
        Self::InnerOnly,
        Self::Independent,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Combined => "Combined",
            Self::OuterOnly => "Outer Ring Only",
            Self::InnerOnly => "Inner Ring Only",
            Self::Independent => "Independent Rings",
        }
    }

    /// Zone byte used for colour commands sent in this mode.
    #[must_use]
    pub const fn zone(self) -> Zone {
        match self {
            Self::Combined => Zone::All,
            Self::OuterOnly => Zone::Outer,
            Self::InnerOnly => Zone::Inner,
            Self::Independent => Zone::Independent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ring {
    Outer,
    Inner,
}

/// One LED: its ring, canvas cell and protocol index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedEntry {
    pub ring: Ring,
    pub position: (i32, i32),
    pub index: u8,
}

/// Immutable layout for one pair of ring sizes. Rebuilt, never edited, when counts change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedLayout {
    entries: Vec<LedEntry>,
    names: Vec<String>,
    outer: Vec<u8>,
    inner: Vec<u8>,
}

impl LedLayout {
    #[must_use]
    pub fn build(outer_count: u8, inner_count: u8) -> Self {
        let mut entries = Vec::with_capacity(usize::from(outer_count) + usize::from(inner_count));
        let mut names = Vec::with_capacity(entries.capacity());

        for i in 0..outer_count {
            entries.push(LedEntry {
                ring: Ring::Outer,
                position: ring_point(i, outer_count, OUTER_RADIUS),
                index: i,
            });
            names.push(format!("Outer {}", u16::from(i) + 1));
        }
        for i in 0..inner_count {
            entries.push(LedEntry {
                ring: Ring::Inner,
                position: ring_point(i, inner_count, INNER_RADIUS),
                index: outer_count + i,
            });
            names.push(format!("Inner {}", u16::from(i) + 1));
        }

        let outer = (0..outer_count).collect();
        let inner = (outer_count..outer_count + inner_count).collect();

        Self {
            entries,
            names,
            outer,
            inner,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[LedEntry] {
        &self.entries
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn positions(&self) -> Vec<(i32, i32)> {
        self.entries.iter().map(|e| e.position).collect()
    }

    /// Canvas cell of a protocol index.
    #[must_use]
    pub fn position(&self, index: u8) -> Option<(i32, i32)> {
        self.entries.get(usize::from(index)).map(|e| e.position)
    }

    #[must_use]
    pub fn ring_indices(&self, ring: Ring) -> &[u8] {
        match ring {
            Ring::Outer => &self.outer,
            Ring::Inner => &self.inner,
        }
    }

    /// Protocol indices the host drives in `mode`, outer ring first.
    #[must_use]
    pub fn active_indices(&self, mode: RingMode) -> Vec<u8> {
        match mode {
            RingMode::OuterOnly => self.outer.clone(),
            RingMode::InnerOnly => self.inner.clone(),
            RingMode::Combined | RingMode::Independent => {
                self.outer.iter().chain(&self.inner).copied().collect()
            }
        }
    }
}

/// Point `i` of `count` on a circle, starting at the top and going clockwise.
fn ring_point(i: u8, count: u8, radius: f64) -> (i32, i32) {
    let angle = f64::from(i) / f64::from(count) * 2.0 * PI - PI / 2.0;
    let x = (GRID_CENTER.0 + radius * angle.cos()).round() as i32;
    let y = (GRID_CENTER.1 + radius * angle.sin()).round() as i32;
    (x.clamp(0, GRID_SIZE.0 - 1), y.clamp(0, GRID_SIZE.1 - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_indices_per_mode() {
        let layout = LedLayout::build(16, 8);
        assert_eq!(layout.len(), 24);
        assert_eq!(
            layout.active_indices(RingMode::OuterOnly),
            (0..16).collect::<Vec<u8>>()
        );
        assert_eq!(
            layout.active_indices(RingMode::InnerOnly),
            (16..24).collect::<Vec<u8>>()
        );
        assert_eq!(
            layout.active_indices(RingMode::Combined),
            (0..24).collect::<Vec<u8>>()
        );
        assert_eq!(
            layout.active_indices(RingMode::Independent),
            layout.active_indices(RingMode::Combined)
        );
    }

    #[test]
    fn test_positions_start_at_top_clockwise() {
        let layout = LedLayout::build(16, 8);
        // top of the outer ring
        assert_eq!(layout.position(0), Some((5, 1)));
        // a quarter turn clockwise is to the right
        assert_eq!(layout.position(4), Some((8, 4)));
        assert_eq!(layout.position(8), Some((5, 7)));
        assert_eq!(layout.position(12), Some((2, 4)));
        // inner ring starts at its own top
        assert_eq!(layout.position(16), Some((5, 3)));
        assert_eq!(layout.position(24), None);
    }

    #[test]
    fn test_positions_within_grid() {
        let layout = LedLayout::build(43, 21);
        for (x, y) in layout.positions() {
            assert!((0..GRID_SIZE.0).contains(&x));
            assert!((0..GRID_SIZE.1).contains(&y));
        }
    }

    #[test]
    fn test_names_and_rings() {
        let layout = LedLayout::build(3, 2);
        assert_eq!(
            layout.names(),
            &["Outer 1", "Outer 2", "Outer 3", "Inner 1", "Inner 2"]
        );
        assert_eq!(layout.entries()[3].ring, Ring::Inner);
        assert_eq!(layout.entries()[3].index, 3);
        assert_eq!(layout.ring_indices(Ring::Inner), &[3, 4]);
    }

    #[test]
    fn test_ring_mode_labels_deserialize() {
        for mode in RingMode::ALL {
            let json = format!("\"{}\"", mode.label());
            let parsed: RingMode = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, mode);
        }
    }
}
