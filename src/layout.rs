//! Interleaved layout of the reactor state vector.
//!
//! The state holds one `(A, B, C)` triple per axial segment, stored segment-major:
//! `[A_0, B_0, C_0, A_1, B_1, C_1, ..., A_{N-1}, B_{N-1}, C_{N-1}]`.
//! Derivative vectors use the same layout so integrators can treat both alike.

use std::ops::Index;

/// Number of species stored per segment.
pub const SPECIES_PER_SEGMENT: usize = 3;

/// The three species of the coke formation network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    /// Feed species.
    A,
    /// Intermediate product.
    B,
    /// Coke.
    C,
}

impl Species {
    /// All species in storage order.
    pub const ALL: [Species; 3] = [Species::A, Species::B, Species::C];

    /// Offset of the species inside a segment triple.
    pub fn offset(self) -> usize {
        match self {
            Species::A => 0,
            Species::B => 1,
            Species::C => 2,
        }
    }
}

/// Position of `species` of segment `segment` in the flat state vector.
pub fn index(segment: usize, species: Species) -> usize {
    SPECIES_PER_SEGMENT * segment + species.offset()
}

/// Number of segments encoded by a state of length `len`, or `None` if the
/// length is not a whole number of triples.
pub fn segment_count(len: usize) -> Option<usize> {
    if len % SPECIES_PER_SEGMENT == 0 {
        Some(len / SPECIES_PER_SEGMENT)
    } else {
        None
    }
}

/// Read-only strided view of one species across all segments.
///
/// No data is copied: element `i` is read from `3 * i + offset` of the borrowed state.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesView<'a> {
    state: &'a [f64],
    species: Species,
}

impl<'a> SpeciesView<'a> {
    /// Creates a view of `species` over `state`.
    ///
    /// A trailing partial triple is ignored; callers validate the length with [`segment_count`].
    pub fn new(state: &'a [f64], species: Species) -> Self {
        SpeciesView { state, species }
    }

    /// Number of segments covered by the view.
    pub fn len(&self) -> usize {
        self.state.len() / SPECIES_PER_SEGMENT
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn species(&self) -> Species {
        self.species
    }

    /// Value at `segment`, or `None` past the last segment.
    pub fn get(&self, segment: usize) -> Option<f64> {
        if segment < self.len() {
            Some(self.state[index(segment, self.species)])
        } else {
            None
        }
    }

    /// Iterates over the species values from inlet to outlet.
    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        let state: &'a [f64] = self.state;
        state[..self.len() * SPECIES_PER_SEGMENT]
            .iter()
            .skip(self.species.offset())
            .step_by(SPECIES_PER_SEGMENT)
            .copied()
    }

    /// Copies the view into an owned vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

impl<'a> Index<usize> for SpeciesView<'a> {
    type Output = f64;

    fn index(&self, segment: usize) -> &f64 {
        &self.state[index(segment, self.species)]
    }
}

/// Views of all three species over one state.
pub fn species_views(state: &[f64]) -> (SpeciesView<'_>, SpeciesView<'_>, SpeciesView<'_>) {
    (
        SpeciesView::new(state, Species::A),
        SpeciesView::new(state, Species::B),
        SpeciesView::new(state, Species::C),
    )
}
