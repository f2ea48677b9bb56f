//
// tolerance.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::collections::HashMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Used for species missing from the element table, which are rejected before generation starts
const FALLBACK_RADIUS: f64 = 0.76;

/// The minimum separation allowed between two species
///
/// Implementations are shared between independent generation runs, so they must be thread safe.
///
pub trait ToleranceOracle: Debug + Send + Sync {
    fn min_separation(&self, a: &str, b: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prototype {
    /// Half the sum of the covalent radii
    Atomic,
    /// 1.2 times the sum of the covalent radii, keeping atoms in separate molecules apart
    Molecular,
}

impl Prototype {
    fn scale(&self) -> f64 {
        match self {
            Prototype::Atomic => 0.5,
            Prototype::Molecular => 1.2,
        }
    }
}

/// Tolerances derived from covalent radii with optional overrides for individual pairs
///
/// ```
/// use crystal_generator::{Prototype, TolMatrix, ToleranceOracle};
/// let mut tol = TolMatrix::new(Prototype::Atomic);
/// tol.set("C", "O", 2.);
/// assert_eq!(tol.min_separation("O", "C"), 2.);
/// assert!((tol.min_separation("C", "C") - 0.76).abs() < 1e-12);
/// ```
///
#[derive(Debug, Clone)]
pub struct TolMatrix {
    prototype: Prototype,
    factor: f64,
    custom: HashMap<(String, String), f64>,
}

impl TolMatrix {
    pub fn new(prototype: Prototype) -> Self {
        Self {
            prototype,
            factor: 1.,
            custom: HashMap::new(),
        }
    }

    /// The tolerance used for clusters, which allows closer contacts than bulk crystals
    pub fn cluster(prototype: Prototype) -> Self {
        let mut tol = Self::new(prototype);
        tol.factor(0.7);
        tol
    }

    pub fn factor(&mut self, factor: f64) -> &mut Self {
        self.factor = factor;
        self
    }

    /// Override the tolerance for a pair of species, applying in both orders
    pub fn set(&mut self, a: &str, b: &str, tolerance: f64) -> &mut Self {
        self.custom.insert(Self::key(a, b), tolerance);
        self
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    fn radius(species: &str) -> f64 {
        Element::from_symbol(species)
            .map(|e| e.covalent_radius)
            .unwrap_or(FALLBACK_RADIUS)
    }
}

impl ToleranceOracle for TolMatrix {
    fn min_separation(&self, a: &str, b: &str) -> f64 {
        match self.custom.get(&Self::key(a, b)) {
            Some(&value) => value,
            None => self.factor * self.prototype.scale() * (Self::radius(a) + Self::radius(b)),
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn symmetric() {
        let tol = TolMatrix::new(Prototype::Molecular);
        assert_abs_diff_eq!(tol.min_separation("C", "H"), tol.min_separation("H", "C"));
        assert_abs_diff_eq!(tol.min_separation("C", "H"), 1.2 * (0.76 + 0.31));
    }

    #[test]
    fn factor_scales() {
        let mut tol = TolMatrix::new(Prototype::Atomic);
        tol.factor(2.);
        assert_abs_diff_eq!(tol.min_separation("O", "O"), 1.32);
        assert_abs_diff_eq!(
            TolMatrix::cluster(Prototype::Atomic).min_separation("C", "C"),
            0.7 * 0.76,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            TolMatrix::cluster(Prototype::Molecular).min_separation("C", "O"),
            0.7 * 1.2 * (0.76 + 0.66),
            epsilon = 1e-12
        );
    }

    #[test]
    fn custom_pairs() {
        let mut tol = TolMatrix::new(Prototype::Atomic);
        tol.set("Na", "Cl", 2.5).set("Na", "Na", 3.);
        assert_abs_diff_eq!(tol.min_separation("Cl", "Na"), 2.5);
        assert_abs_diff_eq!(tol.min_separation("Na", "Na"), 3.);
        assert_abs_diff_eq!(tol.min_separation("Cl", "Cl"), 1.02);
    }
}
