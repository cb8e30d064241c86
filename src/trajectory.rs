//! Sampled solution of an integration run.

use crate::layout::{index, segment_count, Species, SpeciesView};

use nalgebra::{DMatrix, DVector};

/// States recorded at the sample times of an integration run.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<V> {
    times: Vec<f64>,
    states: Vec<V>,
}

impl<V> Trajectory<V> {
    pub(crate) fn new(times: Vec<f64>, states: Vec<V>) -> Self {
        debug_assert_eq!(times.len(), states.len());
        Trajectory { times, states }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[V] {
        &self.states
    }

    /// Sample at position `i`.
    pub fn get(&self, i: usize) -> Option<(f64, &V)> {
        Some((*self.times.get(i)?, self.states.get(i)?))
    }

    pub fn last(&self) -> Option<(f64, &V)> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Splits into times and states.
    pub fn into_parts(self) -> (Vec<f64>, Vec<V>) {
        (self.times, self.states)
    }
}

/// Views of a reactor trajectory through the interleaved state layout.
impl Trajectory<DVector<f64>> {
    /// Number of axial segments, or `None` for an empty or malformed trajectory.
    pub fn segment_count(&self) -> Option<usize> {
        self.states.first().and_then(|s| segment_count(s.len()))
    }

    /// Concentration of `species` in `segment` at every sample time.
    pub fn species_history(&self, segment: usize, species: Species) -> Option<Vec<f64>> {
        if segment >= self.segment_count()? {
            return None;
        }
        Some(
            self.states
                .iter()
                .map(|s| s[index(segment, species)])
                .collect(),
        )
    }

    /// Concentration of `species` at the reactor outlet over time.
    pub fn outlet(&self, species: Species) -> Option<Vec<f64>> {
        let last = self.segment_count()?.checked_sub(1)?;
        self.species_history(last, species)
    }

    /// Axial profile of `species` at sample `time_index`, from inlet to outlet.
    pub fn profile(&self, time_index: usize, species: Species) -> Option<Vec<f64>> {
        let state = self.states.get(time_index)?;
        Some(SpeciesView::new(state.as_slice(), species).to_vec())
    }

    /// Time-by-state matrix, one row per sample.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let ncols = self.states.first().map_or(0, |s| s.len());
        DMatrix::from_fn(self.len(), ncols, |r, c| self.states[r][c])
    }
}
