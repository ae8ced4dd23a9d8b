//! Iteration state bit fields
//!
//! One word holds the repeat counter of every level. Level `k` occupies the
//! bit range `[(k - 1) * bits_per_level, k * bits_per_level)`, counted from
//! the least significant bit.

use crate::limits::Geometry;
use bitvec::prelude::*;
use smallvec::SmallVec;
use std::ops::Range;

/// Packed per-level repeat counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IterationState(u64);

impl IterationState {
    /// State with no level entered
    pub const EMPTY: IterationState = IterationState(0);

    /// Wrap a raw state word
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw state word
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Field of a 1-based level, `None` outside `1..=geometry.levels()`
    pub fn level_field(&self, geometry: &Geometry, level: u32) -> Option<u64> {
        (1..=geometry.levels())
            .contains(&level)
            .then(|| self.field(geometry, level))
    }

    /// Read the field of a 1-based level; `level` must be in `1..=levels`
    pub(crate) fn field(&self, geometry: &Geometry, level: u32) -> u64 {
        self.0.view_bits::<Lsb0>()[field_range(geometry, level)].load_le::<u64>()
    }

    /// Overwrite the field of a 1-based level.
    ///
    /// Bits above the field width are discarded; callers check the value
    /// against [`Geometry::field_mask`] first.
    pub(crate) fn set_field(&mut self, geometry: &Geometry, level: u32, value: u64) {
        self.0.view_bits_mut::<Lsb0>()[field_range(geometry, level)].store_le(value);
    }

    /// Zero the field of a 1-based level, leaving every other bit untouched
    pub(crate) fn clear_field(&mut self, geometry: &Geometry, level: u32) {
        self.0.view_bits_mut::<Lsb0>()[field_range(geometry, level)].fill(false);
    }

    /// Fields of levels `1..=depth`, outermost first; `depth` is capped at the
    /// geometry's level count
    pub fn fields(&self, geometry: &Geometry, depth: u32) -> SmallVec<[u64; 8]> {
        (1..=depth.min(geometry.levels())).map(|level| self.field(geometry, level)).collect()
    }

    /// Number of leading levels holding a non-zero field
    pub fn entered_depth(&self, geometry: &Geometry) -> u32 {
        (1..=geometry.levels())
            .take_while(|level| self.field(geometry, *level) != 0)
            .count() as u32
    }
}

fn field_range(geometry: &Geometry, level: u32) -> Range<usize> {
    let start = geometry.shift_of(level) as usize;
    start..start + geometry.bits_per_level() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_packed_from_the_low_bits() {
        let geometry = Geometry::new(32, 5).unwrap();
        let mut state = IterationState::EMPTY;
        state.set_field(&geometry, 1, 3);
        state.set_field(&geometry, 2, 1);
        assert_eq!(state.raw(), 3 | (1 << 6));
        assert_eq!(state.field(&geometry, 1), 3);
        assert_eq!(state.field(&geometry, 2), 1);
        assert_eq!(state.field(&geometry, 3), 0);
    }

    #[test]
    fn clear_field_leaves_neighbours_alone() {
        let geometry = Geometry::new(64, 5).unwrap();
        let mut state = IterationState::EMPTY;
        for level in 1..=5 {
            state.set_field(&geometry, level, 4095);
        }
        state.clear_field(&geometry, 3);
        assert_eq!(
            state.fields(&geometry, 5).as_slice(),
            &[4095, 4095, 0, 4095, 4095]
        );
    }

    #[test]
    fn full_width_field_round_trips() {
        let geometry = Geometry::new(64, 1).unwrap();
        let mut state = IterationState::EMPTY;
        state.set_field(&geometry, 1, u64::MAX);
        assert_eq!(state.field(&geometry, 1), u64::MAX);
        assert_eq!(state.raw(), u64::MAX);
    }

    #[test]
    fn level_field_is_none_outside_the_geometry() {
        let geometry = Geometry::new(16, 4).unwrap();
        let mut state = IterationState::EMPTY;
        state.set_field(&geometry, 4, 9);
        assert_eq!(state.level_field(&geometry, 0), None);
        assert_eq!(state.level_field(&geometry, 5), None);
        assert_eq!(state.level_field(&geometry, u32::MAX), None);
        assert_eq!(state.level_field(&geometry, 4), Some(9));
        assert_eq!(state.fields(&geometry, 10).as_slice(), &[0, 0, 0, 9]);
    }

    #[test]
    fn entered_depth_counts_leading_fields() {
        let geometry = Geometry::new(16, 4).unwrap();
        let mut state = IterationState::EMPTY;
        assert_eq!(state.entered_depth(&geometry), 0);
        state.set_field(&geometry, 1, 1);
        state.set_field(&geometry, 2, 2);
        assert_eq!(state.entered_depth(&geometry), 2);
    }
}
