//! First-order upwind difference along the axial coordinate.

use crate::layout::SpeciesView;

/// Upwind first difference of a species profile.
///
/// Returns `Npoints - 1` values where element `i` is `(v[i+1] - v[i]) / dtau`, the
/// advective gradient at segment `i + 1`. The inlet segment has no upstream neighbour
/// and is not part of the result. A zero `dtau` yields infinities or NaN.
pub fn upwind_difference(v: &SpeciesView<'_>, dtau: f64) -> Vec<f64> {
    v.iter()
        .zip(v.iter().skip(1))
        .map(|(upstream, here)| (here - upstream) / dtau)
        .collect()
}
