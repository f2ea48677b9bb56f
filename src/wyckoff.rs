//
// wyckoff.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use log::trace;
use nalgebra::{Matrix3, Point3};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lattice::{Lattice, LatticeType};
use crate::transform::Transform3;

/// Generic points used to compare symmetry operations as functions
const PROBES: [[f64; 3]; 2] = [[0.1327, 0.2741, 0.3911], [0.6173, 0.8209, 0.0583]];

/// Whether two fractional points coincide, ignoring whole lattice translations on periodic axes
fn coincident(a: &Point3<f64>, b: &Point3<f64>, pbc: &[bool; 3]) -> bool {
    let mut difference = a - b;
    for axis in 0..3 {
        if pbc[axis] {
            difference[axis] -= difference[axis].round();
        }
    }
    difference.norm() < 1e-6
}

/// The label of a Wyckoff position, like `4a`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WyckoffLabel {
    pub multiplicity: usize,
    pub letter: char,
}

impl fmt::Display for WyckoffLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.multiplicity, self.letter)
    }
}

impl FromStr for WyckoffLabel {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidLabel {
            label: label.to_string(),
            reason: reason.to_string(),
        };
        let label_trimmed = label.trim();
        let letter = label_trimmed
            .chars()
            .last()
            .ok_or_else(|| invalid("Label is empty"))?;
        if !letter.is_ascii_alphabetic() {
            return Err(invalid("Label must end with the Wyckoff letter"));
        }
        let multiplicity: usize = label_trimmed[..label_trimmed.len() - 1]
            .parse()
            .map_err(|_| invalid("Label must start with the multiplicity"))?;
        if multiplicity == 0 {
            return Err(invalid("Multiplicity must be positive"));
        }
        Ok(WyckoffLabel {
            multiplicity,
            letter,
        })
    }
}

/// A single Wyckoff position, the orbit of a point under the operations of the group
///
/// The first operation maps any point onto the subspace of the position, the remaining operations
/// generate the symmetry copies. For each copy the group also records the operation from the
/// general position which maps the first copy onto it, which is what rotates a rigid body
/// consistently between images.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WyckoffPosition {
    pub letter: char,
    operations: Vec<Transform3>,
    generators: Vec<Transform3>,
    index: usize,
}

impl fmt::Display for WyckoffPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl WyckoffPosition {
    pub fn multiplicity(&self) -> usize {
        self.operations.len()
    }

    pub fn label(&self) -> WyckoffLabel {
        WyckoffLabel {
            multiplicity: self.multiplicity(),
            letter: self.letter,
        }
    }

    /// The position within the ordering of the group, the general position is 0
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn operations(&self) -> &[Transform3] {
        &self.operations
    }

    pub fn generators(&self) -> &[Transform3] {
        &self.generators
    }

    /// A point on this position can move continuously
    pub fn has_freedom(&self) -> bool {
        self.operations.iter().any(Transform3::has_rotation)
    }

    /// Every symmetry copy of the point, the first being the point moved onto the position
    pub fn images(&self, point: &Point3<f64>) -> Vec<Point3<f64>> {
        self.operations.iter().map(|op| op * point).collect()
    }

    /// Move a point onto the subspace of this position
    ///
    /// Of the periodic copies of the projected point, the one nearest the original is returned.
    ///
    pub fn project(&self, point: &Point3<f64>, lattice: &Lattice) -> Point3<f64> {
        let mut projected = self.operations[0] * point;
        for axis in 0..3 {
            if lattice.periodicity().pbc[axis] {
                projected[axis] += (point[axis] - projected[axis]).round();
            }
        }
        projected
    }
}

/// A symmetry group described by its Wyckoff positions
///
/// The positions are ordered by descending multiplicity, so the general position is always the
/// first. The dimension is the number of periodic axes, 3 for bulk crystals, 2 for layers, 1 for
/// rods and 0 for point groups.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub number: usize,
    pub lattice_type: LatticeType,
    pub dimension: usize,
    positions: Vec<WyckoffPosition>,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.number)
    }
}

impl Group {
    /// Create a group from the letters and operations of each Wyckoff position
    ///
    /// ```
    /// use crystal_generator::{Group, LatticeType};
    /// let group = Group::new(
    ///     "P-1",
    ///     2,
    ///     LatticeType::Triclinic,
    ///     3,
    ///     vec![('i', vec!["x,y,z", "-x,-y,-z"]), ('a', vec!["0,0,0"])],
    /// ).unwrap();
    /// assert_eq!(group.general_position().multiplicity(), 2);
    /// ```
    ///
    pub fn new(
        name: &str,
        number: usize,
        lattice_type: LatticeType,
        dimension: usize,
        positions: Vec<(char, Vec<&str>)>,
    ) -> Result<Group> {
        let invalid = |reason: String| Error::InvalidGroup {
            group: name.to_string(),
            reason,
        };

        let mut parsed = positions
            .into_iter()
            .map(|(letter, ops)| {
                let operations = ops
                    .into_iter()
                    .map(Transform3::from_operations)
                    .collect::<Result<Vec<_>>>()?;
                Ok((letter, operations))
            })
            .collect::<Result<Vec<(char, Vec<Transform3>)>>>()?;

        if parsed.iter().any(|(_, ops)| ops.is_empty()) {
            return Err(invalid("Wyckoff positions must have at least one operation".into()));
        }
        // Stable, so positions of equal multiplicity keep their given order
        parsed.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let general = match parsed.first() {
            Some((_, ops)) => ops.clone(),
            None => return Err(invalid("No Wyckoff positions".into())),
        };
        if parsed.iter().skip(1).any(|(_, ops)| ops.len() == general.len()) {
            return Err(invalid("The general position must have the largest multiplicity".into()));
        }

        let pbc = crate::lattice::Periodicity::from_dimension(dimension).pbc;
        let positions = parsed
            .into_iter()
            .enumerate()
            .map(|(index, (letter, operations))| {
                let generators = operations
                    .iter()
                    .map(|op| find_generator(&general, &operations[0], op, &pbc))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        invalid(format!(
                            "Operations of position {}{} are not generated by the group",
                            operations.len(),
                            letter
                        ))
                    })?;
                Ok(WyckoffPosition {
                    letter,
                    operations,
                    generators,
                    index,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Group {
            name: name.to_string(),
            number,
            lattice_type,
            dimension,
            positions,
        })
    }

    pub fn positions(&self) -> &[WyckoffPosition] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> &WyckoffPosition {
        &self.positions[index]
    }

    pub fn general_position(&self) -> &WyckoffPosition {
        &self.positions[0]
    }

    /// The axes which repeat periodically
    pub fn pbc(&self) -> [bool; 3] {
        crate::lattice::Periodicity::from_dimension(self.dimension).pbc
    }

    /// The positions grouped by their multiplicity, from largest to smallest
    pub fn multiplicity_classes(&self) -> Vec<(usize, Vec<&WyckoffPosition>)> {
        self.positions
            .iter()
            .group_by(|wp| wp.multiplicity())
            .into_iter()
            .map(|(multiplicity, group)| (multiplicity, group.collect()))
            .collect()
    }

    /// Find the position with the given label
    ///
    /// Both the letter and the multiplicity have to match.
    ///
    pub fn find(&self, label: &WyckoffLabel) -> Result<&WyckoffPosition> {
        self.positions
            .iter()
            .find(|wp| wp.letter == label.letter && wp.multiplicity() == label.multiplicity)
            .ok_or_else(|| Error::UnknownSite {
                label: label.to_string(),
                group: self.name.clone(),
            })
    }

    /// The multiplier between the conventional and primitive cells
    pub fn cell_size(&self) -> usize {
        if self.dimension == 0 {
            return 1;
        }
        match self.name.chars().next() {
            Some('A') | Some('B') | Some('C') | Some('I') => 2,
            Some('R') => 3,
            Some('F') => 4,
            _ => 1,
        }
    }

    /// The rotation parts of the operations leaving a point on the position unchanged
    ///
    /// The identity is excluded, so positions with trivial site symmetry return an empty list.
    ///
    pub fn site_symmetry(&self, position: &WyckoffPosition) -> Vec<Matrix3<f64>> {
        let pbc = self.pbc();
        self.general_position()
            .operations
            .iter()
            .filter(|op| op.rotation() != Matrix3::identity())
            .filter(|op| {
                PROBES.iter().all(|probe| {
                    let point = position.operations[0] * Point3::from(*probe);
                    coincident(&(*op * point), &point, &pbc)
                })
            })
            .map(Transform3::rotation)
            .collect()
    }

    /// Randomly choose a Wyckoff position for the remaining number of entities
    ///
    /// Without a label the choice is uniform over the usable positions with a multiplicity no
    /// larger than the remaining count. With a label only that position can be returned. `None`
    /// is returned when nothing fits.
    ///
    pub fn select_position<R, F>(
        &self,
        remaining: usize,
        label: Option<&WyckoffLabel>,
        usable: F,
        rng: &mut R,
    ) -> Option<&WyckoffPosition>
    where
        R: Rng + ?Sized,
        F: Fn(&WyckoffPosition) -> bool,
    {
        match label {
            Some(label) => self
                .find(label)
                .ok()
                .filter(|&wp| wp.multiplicity() <= remaining && usable(wp)),
            None => {
                let candidates: Vec<&WyckoffPosition> = self
                    .positions
                    .iter()
                    .filter(|&wp| wp.multiplicity() <= remaining && usable(wp))
                    .collect();
                candidates.choose(rng).copied()
            }
        }
    }

    /// Merge a point which is too close to its own symmetry copies onto a special position
    ///
    /// While any of the copies of the point lie within the tolerance of each other, the point is
    /// moved onto the nearest usable position whose multiplicity divides the current one. The
    /// final point and position are returned, or `None` when the point cannot be separated.
    ///
    pub fn merge<F>(
        &self,
        point: &Point3<f64>,
        position: &WyckoffPosition,
        lattice: &Lattice,
        tolerance: f64,
        usable: F,
    ) -> Option<(Point3<f64>, &WyckoffPosition)>
    where
        F: Fn(&WyckoffPosition) -> bool,
    {
        let mut current = &self.positions[position.index];
        let mut point = current.project(point, lattice);

        loop {
            if lattice.check_images(&current.images(&point), tolerance) {
                return Some((point, current));
            }
            let multiplicity = current.multiplicity();
            let (distance, projected, next) = self
                .positions
                .iter()
                .filter(|&wp| {
                    wp.multiplicity() < multiplicity
                        && multiplicity % wp.multiplicity() == 0
                        && usable(wp)
                })
                .map(|wp| {
                    let projected = wp.project(&point, lattice);
                    (lattice.distance(&projected, &point), projected, wp)
                })
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))?;
            trace!(
                "Merging {} onto {}, moving {:.3} A",
                current.label(),
                next.label(),
                distance
            );
            current = next;
            point = projected;
        }
    }
}

/// Find the operation of the general position taking the first image of a position to another
fn find_generator(
    general: &[Transform3],
    first: &Transform3,
    image: &Transform3,
    pbc: &[bool; 3],
) -> Option<Transform3> {
    general
        .iter()
        .find(|g| {
            PROBES.iter().all(|probe| {
                let probe = Point3::from(*probe);
                coincident(&(*g * (first * probe)), &(image * probe), pbc)
            })
        })
        .map(|g| {
            // Absorb the lattice translation so the generator reproduces the image exactly
            let probe = first * Point3::from(PROBES[0]);
            let offset = (image * Point3::from(PROBES[0])) - (g * probe);
            Transform3::from_parts(g.rotation(), g.translation() + offset.map(f64::round))
        })
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::lattice::Periodicity;

    fn p2() -> Group {
        Group::new(
            "P2",
            3,
            LatticeType::Monoclinic,
            3,
            vec![
                ('e', vec!["x,y,z", "-x,y,-z"]),
                ('a', vec!["0,y,0"]),
                ('b', vec!["0,y,1/2"]),
                ('c', vec!["1/2,y,0"]),
                ('d', vec!["1/2,y,1/2"]),
            ],
        )
        .unwrap()
    }

    fn cubic(length: f64) -> Lattice {
        Lattice::from_parameters(
            LatticeType::Cubic,
            [length; 3],
            [90.; 3],
            Periodicity::bulk(),
        )
        .unwrap()
    }

    #[test]
    fn parse_label() {
        let label: WyckoffLabel = "12k".parse().unwrap();
        assert_eq!(label.multiplicity, 12);
        assert_eq!(label.letter, 'k');
        assert_eq!(label.to_string(), "12k");
    }

    #[test]
    fn parse_invalid_labels() {
        assert!("".parse::<WyckoffLabel>().is_err());
        assert!("a".parse::<WyckoffLabel>().is_err());
        assert!("4".parse::<WyckoffLabel>().is_err());
        assert!("0a".parse::<WyckoffLabel>().is_err());
        assert!("xa".parse::<WyckoffLabel>().is_err());
    }

    #[test]
    fn ordering() {
        let group = p2();
        assert_eq!(group.general_position().letter, 'e');
        assert_eq!(group.positions()[1].letter, 'a');
        for (index, wp) in group.positions().iter().enumerate() {
            assert_eq!(wp.index(), index);
        }
    }

    #[test]
    fn freedom() {
        let group = p2();
        assert!(group.positions().iter().all(WyckoffPosition::has_freedom));
        let group = Group::new(
            "P-1",
            2,
            LatticeType::Triclinic,
            3,
            vec![('i', vec!["x,y,z", "-x,-y,-z"]), ('a', vec!["0,0,0"])],
        )
        .unwrap();
        assert!(!group.position(1).has_freedom());
    }

    #[test]
    fn classes() {
        let group = p2();
        let classes = group.multiplicity_classes();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].0, 2);
        assert_eq!(classes[1].0, 1);
        assert_eq!(classes[1].1.len(), 4);
    }

    #[test]
    fn find_by_label() {
        let group = p2();
        assert_eq!(group.find(&"1c".parse().unwrap()).unwrap().letter, 'c');
        assert!(group.find(&"2c".parse().unwrap()).is_err());
        assert!(group.find(&"1z".parse().unwrap()).is_err());
    }

    #[test]
    fn invalid_group() {
        let result = Group::new(
            "bad",
            0,
            LatticeType::Triclinic,
            3,
            vec![
                ('c', vec!["x,y,z", "-x,-y,z", "-x,y,-z", "x,-y,-z"]),
                ('b', vec!["x,0,0", "x+1/3,0,0"]),
            ],
        );
        // No operation of the general position maps x,0,0 onto x+1/3,0,0
        assert!(result.is_err());
        assert!(Group::new("empty", 0, LatticeType::Triclinic, 3, vec![]).is_err());
    }

    #[test]
    fn generators_map_images() {
        let group = p2();
        let wp = group.general_position();
        let point = Point3::new(0.3, 0.2, 0.7);
        for (op, generator) in wp.operations().iter().zip(wp.generators()) {
            assert_abs_diff_eq!(generator * (wp.operations()[0] * point), op * point);
        }
    }

    #[test]
    fn site_symmetry_of_axis() {
        let group = p2();
        assert!(group.site_symmetry(group.general_position()).is_empty());
        let symmetry = group.site_symmetry(group.position(1));
        assert_eq!(symmetry.len(), 1);
        assert_abs_diff_eq!(symmetry[0], Matrix3::new(-1., 0., 0., 0., 1., 0., 0., 0., -1.));
    }

    #[test]
    fn project_onto_axis() {
        let group = p2();
        let lattice = cubic(10.);
        let projected = group.position(3).project(&Point3::new(0.9, 0.3, 0.6), &lattice);
        assert_abs_diff_eq!(projected, Point3::new(0.5, 0.3, 1.));
    }

    #[test]
    fn select_respects_remaining() {
        let group = p2();
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        for _ in 0..50 {
            let wp = group.select_position(1, None, |_| true, &mut rng).unwrap();
            assert_eq!(wp.multiplicity(), 1);
        }
        assert!(group.select_position(0, None, |_| true, &mut rng).is_none());
    }

    #[test]
    fn select_with_label() {
        let group = p2();
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        let label = "1d".parse().unwrap();
        let wp = group.select_position(4, Some(&label), |_| true, &mut rng).unwrap();
        assert_eq!(wp.letter, 'd');
        assert!(group.select_position(4, Some(&label), |_| false, &mut rng).is_none());
    }

    #[test]
    fn merge_onto_axis() {
        let group = p2();
        let lattice = cubic(10.);
        let point = Point3::new(0.01, 0.3, 0.02);
        let (merged, wp) = group
            .merge(&point, group.general_position(), &lattice, 1., |_| true)
            .unwrap();
        assert_eq!(wp.letter, 'a');
        assert_abs_diff_eq!(merged, Point3::new(0., 0.3, 0.));
    }

    #[test]
    fn no_merge_needed() {
        let group = p2();
        let lattice = cubic(10.);
        let point = Point3::new(0.25, 0.3, 0.25);
        let (merged, wp) = group
            .merge(&point, group.general_position(), &lattice, 1., |_| true)
            .unwrap();
        assert_eq!(wp.index(), 0);
        assert_abs_diff_eq!(merged, point);
    }

    #[test]
    fn merge_declined() {
        let group = p2();
        let lattice = cubic(10.);
        let point = Point3::new(0.01, 0.3, 0.02);
        assert!(group
            .merge(&point, group.general_position(), &lattice, 1., |wp| wp.index() == 0)
            .is_none());
    }
}
