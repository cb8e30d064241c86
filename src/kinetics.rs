//! Local reaction rates of the coke formation network.
//!
//! Three first-order reactions run on the free active sites of the catalyst:
//! A → B (`k1`), A → C (`k2`) and B → C (`k3`). Each rate is scaled by the local
//! capacity `N - C`, which shrinks as coke accumulates.

use serde::{Deserialize, Serialize};

/// Rate constants of the three reactions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateConstants {
    /// A → B
    pub k1: f64,
    /// A → C
    pub k2: f64,
    /// B → C
    pub k3: f64,
}

impl RateConstants {
    pub fn new(k1: f64, k2: f64, k3: f64) -> Self {
        RateConstants { k1, k2, k3 }
    }

    /// Rate constants with every reaction switched off.
    pub fn inert() -> Self {
        RateConstants::new(0.0, 0.0, 0.0)
    }

    /// Evaluates the local rates at one spatial point.
    ///
    /// The capacity is deliberately left unclamped: once `c` exceeds `sites` every
    /// term changes sign.
    pub fn rates(&self, a: f64, b: f64, c: f64, sites: f64) -> ReactionRates {
        let capacity = sites - c;
        ReactionRates {
            capacity,
            consumption_a: (self.k1 + self.k2) * a * capacity,
            net_b: (self.k1 * a - self.k3 * b) * capacity,
            production_c: (self.k2 * a + self.k3 * b) * capacity,
        }
    }
}

/// Instantaneous reaction rates at one spatial point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionRates {
    /// Free active-site density `N - C`.
    pub capacity: f64,
    /// Rate at which A disappears.
    pub consumption_a: f64,
    /// Net formation rate of B.
    pub net_b: f64,
    /// Coke deposition rate.
    pub production_c: f64,
}
