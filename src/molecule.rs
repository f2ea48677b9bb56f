//
// molecule.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::f64::consts::PI;
use std::fmt;

use clap::arg_enum;
use itertools::{iproduct, Itertools};
use nalgebra::{Matrix3, Point3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{Error, Result};
use crate::lattice::reference_matrix;
use crate::wyckoff::{Group, WyckoffPosition};

/// Distance within which a transformed atom is considered to coincide with another
const SYMMETRY_TOLERANCE: f64 = 0.3;

/// A single atom within a molecule, with the position relative to the molecular centre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolAtom {
    pub species: String,
    pub position: Point3<f64>,
}

impl fmt::Display for MolAtom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {{ {:.3}, {:.3}, {:.3} }}",
            self.species, self.position.x, self.position.y, self.position.z
        )
    }
}

/// A rigid molecule
///
/// The atoms are stored in Cartesian coordinates in Angstroms, centred on the geometric centre of
/// the molecule.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub name: String,
    atoms: Vec<MolAtom>,
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Molecule {} {{ ", self.name)?;
        for atom in self.atoms.iter() {
            write!(f, "{}, ", atom)?;
        }
        write!(f, "}}")
    }
}

arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum MoleculeName {
        H2O,
        CH4,
        N2,
        CO2,
        C6H6,
    }
}

impl Molecule {
    pub fn new(name: &str, atoms: Vec<MolAtom>) -> Result<Molecule> {
        let invalid = |reason: String| Error::Molecule {
            name: name.to_string(),
            reason,
        };
        if atoms.is_empty() {
            return Err(invalid("A molecule needs at least one atom".into()));
        }
        for atom in atoms.iter() {
            Element::from_symbol(&atom.species).map_err(|e| invalid(e.to_string()))?;
        }

        let centre: Vector3<f64> =
            atoms.iter().map(|a| a.position.coords).sum::<Vector3<f64>>() / atoms.len() as f64;
        let atoms = atoms
            .into_iter()
            .map(|a| MolAtom {
                species: a.species,
                position: a.position - centre,
            })
            .collect();

        Ok(Molecule {
            name: name.to_string(),
            atoms,
        })
    }

    /// Read a molecule from JSON, with the same layout the molecule is serialised to
    pub fn from_json(json: &str) -> Result<Molecule> {
        let raw: Molecule = serde_json::from_str(json).map_err(|e| Error::Molecule {
            name: String::from("<json>"),
            reason: e.to_string(),
        })?;
        Molecule::new(&raw.name, raw.atoms)
    }

    pub fn from_name(name: MoleculeName) -> Result<Molecule> {
        let atom = |species: &str, x: f64, y: f64, z: f64| MolAtom {
            species: species.to_string(),
            position: Point3::new(x, y, z),
        };
        match name {
            MoleculeName::H2O => Molecule::new(
                "H2O",
                vec![
                    atom("O", 0., 0., 0.),
                    atom("H", 0.7572, 0.5858, 0.),
                    atom("H", -0.7572, 0.5858, 0.),
                ],
            ),
            MoleculeName::CH4 => Molecule::new(
                "CH4",
                vec![
                    atom("C", 0., 0., 0.),
                    atom("H", 0.629, 0.629, 0.629),
                    atom("H", -0.629, -0.629, 0.629),
                    atom("H", -0.629, 0.629, -0.629),
                    atom("H", 0.629, -0.629, -0.629),
                ],
            ),
            MoleculeName::N2 => {
                Molecule::new("N2", vec![atom("N", 0., 0., 0.55), atom("N", 0., 0., -0.55)])
            }
            MoleculeName::CO2 => Molecule::new(
                "CO2",
                vec![
                    atom("C", 0., 0., 0.),
                    atom("O", 0., 0., 1.16),
                    atom("O", 0., 0., -1.16),
                ],
            ),
            MoleculeName::C6H6 => {
                let mut atoms = Vec::with_capacity(12);
                for &(species, radius) in &[("C", 1.39), ("H", 2.47)] {
                    for k in 0..6 {
                        let theta = f64::from(k) * PI / 3.;
                        atoms.push(atom(species, radius * theta.cos(), radius * theta.sin(), 0.));
                    }
                }
                Molecule::new("C6H6", atoms)
            }
        }
    }

    pub fn atoms(&self) -> &[MolAtom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    fn covalent_radius(species: &str) -> f64 {
        Element::from_symbol(species).map_or(0., |e| e.covalent_radius)
    }

    fn vdw_radius(species: &str) -> f64 {
        Element::from_symbol(species).map_or(0., |e| e.vdw_radius)
    }

    /// The radius of the sphere enclosing the atoms
    pub fn radius(&self) -> f64 {
        self.atoms
            .iter()
            .map(|a| a.position.coords.norm() + Self::covalent_radius(&a.species))
            .fold(0., f64::max)
    }

    /// The volume of the bounding box of the atoms, padded by their van der Waals radii
    pub fn volume(&self) -> f64 {
        (0..3)
            .map(|axis| {
                let upper = self
                    .atoms
                    .iter()
                    .map(|a| a.position[axis] + Self::vdw_radius(&a.species))
                    .fold(f64::MIN, f64::max);
                let lower = self
                    .atoms
                    .iter()
                    .map(|a| a.position[axis] - Self::vdw_radius(&a.species))
                    .fold(f64::MAX, f64::min);
                upper - lower
            })
            .product()
    }

    /// The atoms after applying a rotation in Cartesian space
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Vec<Point3<f64>> {
        self.atoms
            .iter()
            .map(|a| Point3::from(rotation * a.position.coords))
            .collect()
    }

    /// Whether the molecule maps onto itself under the Cartesian operation
    fn is_invariant(&self, positions: &[Point3<f64>], operation: &Matrix3<f64>) -> bool {
        positions.iter().zip(self.atoms.iter()).all(|(p, atom)| {
            let image = Point3::from(operation * p.coords);
            positions
                .iter()
                .zip(self.atoms.iter())
                .any(|(q, other)| {
                    other.species == atom.species
                        && (image - q).norm() < SYMMETRY_TOLERANCE
                })
        })
    }

    /// The orientations in which the molecule is compatible with the site symmetry of a position
    ///
    /// A position without site symmetry gives a single orientation with complete rotational
    /// freedom. Otherwise each of the cube aligned orientations of the molecule is tested, keeping
    /// those which are unchanged by every operation of the site symmetry. Orientations with a
    /// change of handedness are only considered when inversion is allowed. An empty list means
    /// the molecule can't be placed on the position.
    ///
    pub fn allowed_orientations(
        &self,
        group: &Group,
        position: &WyckoffPosition,
        allow_inversion: bool,
    ) -> Vec<Orientation> {
        let site = group.site_symmetry(position);
        if site.is_empty() {
            return vec![Orientation::free()];
        }

        let reference = reference_matrix(group.lattice_type);
        let reference_inv = reference.try_inverse().unwrap_or_else(Matrix3::identity);
        let operations: Vec<Matrix3<f64>> =
            site.iter().map(|s| reference * s * reference_inv).collect();

        let (degrees, axis) = constrained_axis(&operations);

        cube_rotations(allow_inversion)
            .into_iter()
            .filter(|base| {
                let positions = self.rotated(base);
                operations
                    .iter()
                    .all(|op| self.is_invariant(&positions, op))
            })
            .map(|base| Orientation {
                base,
                axis,
                angle: 0.,
                degrees,
            })
            .collect()
    }
}

/// The signed permutation matrices, the rotations of a cube, with the reflections if requested
fn cube_rotations(improper: bool) -> Vec<Matrix3<f64>> {
    let signs = [1., -1.];
    (0..3_usize)
        .permutations(3)
        .flat_map(|perm| {
            iproduct!(signs.iter(), signs.iter(), signs.iter()).map(move |(&s0, &s1, &s2)| {
                let sign = [s0, s1, s2];
                Matrix3::from_fn(|i, j| if perm[i] == j { sign[i] } else { 0. })
            })
        })
        .filter(|m| improper || m.determinant() > 0.)
        .collect()
}

/// The axis of a proper rotation
fn rotation_axis(rotation: &Matrix3<f64>) -> Option<Vector3<f64>> {
    if (rotation - Matrix3::identity()).norm() < 1e-6 {
        return None;
    }
    let skew = Vector3::new(
        rotation[(2, 1)] - rotation[(1, 2)],
        rotation[(0, 2)] - rotation[(2, 0)],
        rotation[(1, 0)] - rotation[(0, 1)],
    );
    if skew.norm() > 1e-6 {
        return Some(skew.normalize());
    }
    // A rotation of pi, the axis is any non-zero column of R + I
    let symmetric = rotation + Matrix3::identity();
    symmetric
        .column_iter()
        .map(|c| c.into_owned())
        .max_by(|a, b| a.norm().partial_cmp(&b.norm()).unwrap_or(std::cmp::Ordering::Equal))
        .map(|c| c.normalize())
}

/// The rotational freedom left by the site symmetry operations
///
/// Inversion commutes with every rotation so places no constraint. Every other operation fixes an
/// axis, either the rotation axis or the normal of a mirror. When all the axes are parallel the
/// molecule can still spin about them.
///
fn constrained_axis(operations: &[Matrix3<f64>]) -> (usize, Option<Vector3<f64>>) {
    let axes: Vec<Vector3<f64>> = operations
        .iter()
        .filter_map(|op| {
            if op.determinant() > 0. {
                rotation_axis(op)
            } else {
                rotation_axis(&(-op))
            }
        })
        .collect();

    match axes.first() {
        None => (2, Some(Vector3::z())),
        Some(first) if axes.iter().all(|a| a.cross(first).norm() < 1e-6) => (1, Some(*first)),
        Some(_) => (0, None),
    }
}

fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let z: f64 = rng.gen_range(-1.0..1.0);
    let phi = rng.gen_range(0.0..2. * PI);
    let r = f64::sqrt(1. - z * z);
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

/// A rotation uniformly distributed over all orientations
fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> Matrix3<f64> {
    let (u1, u2, u3): (f64, f64, f64) = (rng.gen(), rng.gen(), rng.gen());
    let quaternion = Quaternion::new(
        u1.sqrt() * f64::cos(2. * PI * u3),
        f64::sqrt(1. - u1) * f64::sin(2. * PI * u2),
        f64::sqrt(1. - u1) * f64::cos(2. * PI * u2),
        u1.sqrt() * f64::sin(2. * PI * u3),
    );
    UnitQuaternion::from_quaternion(quaternion)
        .to_rotation_matrix()
        .into_inner()
}

/// The orientation of a molecule on a site
///
/// This is a base rotation, which keeps the molecule compatible with the site symmetry, followed
/// by a rotation of `angle` about `axis`. The degrees of freedom are 0 for a fixed orientation,
/// 1 for rotation about a single axis and 2 when the orientation is unconstrained.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    base: Matrix3<f64>,
    axis: Option<Vector3<f64>>,
    angle: f64,
    degrees: usize,
}

impl Orientation {
    pub fn free() -> Self {
        Self {
            base: Matrix3::identity(),
            axis: Some(Vector3::z()),
            angle: 0.,
            degrees: 2,
        }
    }

    pub fn fixed(base: Matrix3<f64>) -> Self {
        Self {
            base,
            axis: None,
            angle: 0.,
            degrees: 0,
        }
    }

    pub fn degrees(&self) -> usize {
        self.degrees
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn axis(&self) -> Option<Vector3<f64>> {
        self.axis
    }

    /// The complete rotation of the molecule
    pub fn matrix(&self) -> Matrix3<f64> {
        match self.axis {
            Some(axis) if self.degrees > 0 => {
                Rotation3::from_axis_angle(&Unit::new_normalize(axis), self.angle).into_inner()
                    * self.base
            }
            _ => self.base,
        }
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    /// Draw a random orientation within the freedom of the site
    ///
    /// A free orientation is replaced by a uniformly random rotation, with a new random axis for
    /// later refinement. An axial orientation gets a random angle, and when `flip` is set, a
    /// half turn about a perpendicular axis with probability one half.
    ///
    pub fn randomize<R: Rng + ?Sized>(&mut self, flip: bool, rng: &mut R) {
        match (self.degrees, self.axis) {
            (2, _) => {
                self.base = random_rotation(rng) * self.base;
                self.axis = Some(random_unit(rng));
                self.angle = 0.;
            }
            (1, Some(axis)) => {
                self.angle = rng.gen_range(0.0..2. * PI);
                if flip && rng.gen_bool(0.5) {
                    let mut perpendicular = axis.cross(&Vector3::x());
                    if perpendicular.norm() < 1e-6 {
                        perpendicular = axis.cross(&Vector3::y());
                    }
                    self.base = Rotation3::from_axis_angle(&Unit::new_normalize(perpendicular), PI)
                        .into_inner()
                        * self.base;
                }
            }
            _ => (),
        }
    }
}
