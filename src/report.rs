//! Plain-text tables of a reactor trajectory.

use crate::driver::axial_coordinates;
use crate::layout::Species;
use crate::trajectory::Trajectory;

use nalgebra::DVector;
use prettytable::{row, Cell, Row, Table};

/// Header line with the active-site density, printed before the tables.
pub fn site_density_line(active_sites: f64) -> String {
    format!("Active site density: {:.4}", active_sites)
}

/// Outlet concentrations of A and B over time.
pub fn outlet_table(trajectory: &Trajectory<DVector<f64>>) -> Table {
    let mut table = Table::new();
    table.add_row(row!["Time", "[A] outlet", "[B] outlet"]);

    if let (Some(a), Some(b)) = (
        trajectory.outlet(Species::A),
        trajectory.outlet(Species::B),
    ) {
        for ((t, a), b) in trajectory.times().iter().zip(a).zip(b) {
            table.add_row(Row::new(vec![
                Cell::new(&format!("{:.4}", t)),
                Cell::new(&format!("{:.6}", a)),
                Cell::new(&format!("{:.6}", b)),
            ]));
        }
    }
    table
}

/// Coke concentration along the reactor, one row per time sample.
///
/// At most `max_columns` evenly spread segments are shown; inlet and outlet are always included.
pub fn coke_profile_table(trajectory: &Trajectory<DVector<f64>>, max_columns: usize) -> Table {
    let mut table = Table::new();
    let n_points = match trajectory.segment_count() {
        Some(n) if n > 0 => n,
        _ => return table,
    };
    let columns = profile_columns(n_points, max_columns);
    let coordinates = axial_coordinates(n_points);

    let mut header = vec![Cell::new("Time \\ z")];
    header.extend(
        columns
            .iter()
            .map(|&i| Cell::new(&format!("{:.3}", coordinates[i]))),
    );
    table.add_row(Row::new(header));

    for (k, t) in trajectory.times().iter().enumerate() {
        if let Some(profile) = trajectory.profile(k, Species::C) {
            let mut cells = vec![Cell::new(&format!("{:.4}", t))];
            cells.extend(
                columns
                    .iter()
                    .map(|&i| Cell::new(&format!("{:.5}", profile[i]))),
            );
            table.add_row(Row::new(cells));
        }
    }
    table
}

/// Indices of at most `max_columns` segments spread evenly from inlet to outlet.
fn profile_columns(n_points: usize, max_columns: usize) -> Vec<usize> {
    let shown = max_columns.max(2).min(n_points);
    if shown <= 1 {
        return vec![0];
    }
    let mut columns: Vec<usize> = (0..shown)
        .map(|j| (j * (n_points - 1) + (shown - 1) / 2) / (shown - 1))
        .collect();
    columns.dedup();
    columns
}
