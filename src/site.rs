//
// site.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;
use std::sync::Arc;

use itertools::iproduct;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::molecule::{Molecule, Orientation};
use crate::tolerance::ToleranceOracle;
use crate::wyckoff::WyckoffPosition;

/// A set of symmetry equivalent entities placed on a Wyckoff position
///
/// Sites are created once a placement passes every check and are never modified afterwards.
///
pub trait Site: fmt::Debug + fmt::Display + Clone + Send + Sync + Serialize {
    /// The index of the entity type within the composition
    fn entity(&self) -> usize;

    /// The name used for the entity in the formula
    fn species(&self) -> &str;

    fn wyckoff(&self) -> &WyckoffPosition;

    /// The representative position in fractional coordinates
    fn position(&self) -> Point3<f64>;

    fn multiplicity(&self) -> usize {
        self.wyckoff().multiplicity()
    }

    /// The species and fractional coordinates of every atom of every symmetry image
    fn atoms(&self, lattice: &Lattice) -> Vec<(&str, Point3<f64>)>;

    /// Whether every atom of this site is far enough from every atom of the other site
    fn check_with(&self, other: &Self, lattice: &Lattice, tolerance: &dyn ToleranceOracle) -> bool {
        let ours = self.atoms(lattice);
        let theirs = other.atoms(lattice);
        iproduct!(ours.iter(), theirs.iter()).all(|((sa, pa), (sb, pb))| {
            lattice.distance(pa, pb) >= tolerance.min_separation(sa, sb)
        })
    }
}

/// A single atom species on a Wyckoff position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomSite {
    pub entity: usize,
    pub species: String,
    pub wyckoff: WyckoffPosition,
    pub position: Point3<f64>,
}

impl fmt::Display for AtomSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} @ {:>8.4} {:>8.4} {:>8.4}, Wyckoff {}",
            self.species,
            self.position.x,
            self.position.y,
            self.position.z,
            self.wyckoff.label()
        )
    }
}

impl Site for AtomSite {
    fn entity(&self) -> usize {
        self.entity
    }

    fn species(&self) -> &str {
        &self.species
    }

    fn wyckoff(&self) -> &WyckoffPosition {
        &self.wyckoff
    }

    fn position(&self) -> Point3<f64> {
        self.position
    }

    fn atoms(&self, lattice: &Lattice) -> Vec<(&str, Point3<f64>)> {
        self.wyckoff
            .images(&self.position)
            .iter()
            .map(|p| (self.species.as_str(), lattice.wrap(p)))
            .collect()
    }
}

/// A rigid molecule on a Wyckoff position
///
/// Each image is centred on the symmetry copy of the position, and rotated by the operation of
/// the general position which generates that copy.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MolSite {
    pub entity: usize,
    pub molecule: Arc<Molecule>,
    pub wyckoff: WyckoffPosition,
    pub position: Point3<f64>,
    pub orientation: Orientation,
}

impl fmt::Display for MolSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} @ {:>8.4} {:>8.4} {:>8.4}, Wyckoff {}, orientation degrees {}",
            self.molecule.name,
            self.position.x,
            self.position.y,
            self.position.z,
            self.wyckoff.label(),
            self.orientation.degrees(),
        )
    }
}

impl Site for MolSite {
    fn entity(&self) -> usize {
        self.entity
    }

    fn species(&self) -> &str {
        &self.molecule.name
    }

    fn wyckoff(&self) -> &WyckoffPosition {
        &self.wyckoff
    }

    fn position(&self) -> Point3<f64> {
        self.position
    }

    fn atoms(&self, lattice: &Lattice) -> Vec<(&str, Point3<f64>)> {
        let offsets = self.offsets(lattice);
        self.wyckoff
            .operations()
            .iter()
            .zip(self.wyckoff.generators())
            .flat_map(|(op, generator)| {
                let centre = lattice.wrap(&(op * self.position));
                let rotation = generator.rotation();
                self.molecule
                    .atoms()
                    .iter()
                    .zip(offsets.iter())
                    .map(move |(atom, offset)| (atom.species.as_str(), centre + rotation * offset))
            })
            .collect()
    }
}

impl MolSite {
    /// The atoms of the oriented molecule relative to the centre, in fractional coordinates
    fn offsets(&self, lattice: &Lattice) -> Vec<Vector3<f64>> {
        self.molecule
            .rotated(&self.orientation.matrix())
            .iter()
            .map(|p| lattice.inverse() * p.coords)
            .collect()
    }

    /// The smallest ratio of distance to tolerance for atoms within the site
    ///
    /// This compares atoms in different images, and atoms of the same image with the periodic
    /// copies of that image. Bonded atoms within a single molecule are never compared. A site
    /// with nothing to compare returns infinity.
    ///
    pub fn separation_ratio(&self, lattice: &Lattice, tolerance: &dyn ToleranceOracle) -> f64 {
        let atoms = self.atoms(lattice);
        let size = self.molecule.len();
        let mut ratio = f64::INFINITY;

        for (i, (sa, pa)) in atoms.iter().enumerate() {
            for (j, (sb, pb)) in atoms.iter().enumerate().skip(i) {
                let distance = if i / size == j / size {
                    lattice.separation(pa, pb, false)
                } else {
                    lattice.distance(pa, pb)
                };
                ratio = f64::min(ratio, distance / tolerance.min_separation(sa, sb));
            }
        }
        ratio
    }

    /// Whether the images of the molecule are all far enough from each other
    pub fn check_distances(&self, lattice: &Lattice, tolerance: &dyn ToleranceOracle) -> bool {
        self.separation_ratio(lattice, tolerance) >= 1.
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix3;

    use super::*;
    use crate::groups::{get_group, GroupName};
    use crate::lattice::{LatticeType, Periodicity};
    use crate::molecule::MoleculeName;
    use crate::tolerance::{Prototype, TolMatrix};

    fn cubic(length: f64) -> Lattice {
        Lattice::from_parameters(
            LatticeType::Cubic,
            [length; 3],
            [90.; 3],
            Periodicity::bulk(),
        )
        .unwrap()
    }

    fn nitrogen(length: f64, position: Point3<f64>) -> (MolSite, Lattice) {
        let group = get_group(GroupName::P1).unwrap();
        let site = MolSite {
            entity: 0,
            molecule: Arc::new(Molecule::from_name(MoleculeName::N2).unwrap()),
            wyckoff: group.general_position().clone(),
            position,
            orientation: Orientation::fixed(Matrix3::identity()),
        };
        (site, cubic(length))
    }

    #[test]
    fn atom_images() {
        let group = get_group(GroupName::P222).unwrap();
        let site = AtomSite {
            entity: 0,
            species: String::from("C"),
            wyckoff: group.general_position().clone(),
            position: Point3::new(0.1, 0.2, 0.3),
        };
        let lattice = cubic(10.);
        let atoms = site.atoms(&lattice);
        assert_eq!(atoms.len(), 4);
        assert_eq!(site.multiplicity(), 4);
        assert_abs_diff_eq!(atoms[1].1, Point3::new(0.9, 0.8, 0.3), epsilon = 1e-12);
    }

    #[test]
    fn atom_sites_too_close() {
        let group = get_group(GroupName::P1).unwrap();
        let lattice = cubic(10.);
        let tol = TolMatrix::new(Prototype::Atomic);
        let site = |x: f64| AtomSite {
            entity: 0,
            species: String::from("C"),
            wyckoff: group.general_position().clone(),
            position: Point3::new(x, 0.5, 0.5),
        };
        // Distance of 0.5 A, less than the tolerance of 0.76 A
        assert!(!site(0.1).check_with(&site(0.15), &lattice, &tol));
        assert!(site(0.1).check_with(&site(0.2), &lattice, &tol));
        // Across the periodic boundary
        assert!(!site(0.01).check_with(&site(0.98), &lattice, &tol));
    }

    #[test]
    fn molecule_in_large_cell() {
        let (site, lattice) = nitrogen(10., Point3::new(0.5, 0.5, 0.5));
        let tol = TolMatrix::new(Prototype::Molecular);
        assert_eq!(site.atoms(&lattice).len(), 2);
        assert!(site.check_distances(&lattice, &tol));
        // The closest contact is with the periodic copy of the other atom along z
        assert_abs_diff_eq!(
            site.separation_ratio(&lattice, &tol),
            (10. - 1.1) / (1.2 * 1.42),
            epsilon = 1e-8
        );
    }

    #[test]
    fn molecule_overlaps_periodic_copy() {
        let (site, lattice) = nitrogen(1.5, Point3::new(0.5, 0.5, 0.5));
        let tol = TolMatrix::new(Prototype::Molecular);
        assert!(!site.check_distances(&lattice, &tol));
    }

    #[test]
    fn molecule_images_rotated() {
        let group = get_group(GroupName::P2).unwrap();
        let lattice = cubic(10.);
        let site = MolSite {
            entity: 0,
            molecule: Arc::new(Molecule::from_name(MoleculeName::CO2).unwrap()),
            wyckoff: group.general_position().clone(),
            position: Point3::new(0.2, 0.5, 0.2),
            orientation: Orientation::fixed(Matrix3::new(
                0., 0., 1., 0., 1., 0., -1., 0., 0.,
            )),
        };
        let atoms = site.atoms(&lattice);
        assert_eq!(atoms.len(), 6);
        // The oxygen of the first image lies along x, in the second image it is reversed
        assert_abs_diff_eq!(atoms[1].1, Point3::new(0.316, 0.5, 0.2), epsilon = 1e-12);
        assert_abs_diff_eq!(atoms[4].1, Point3::new(0.684, 0.5, 0.8), epsilon = 1e-12);
    }
}
