//
// lattice.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::convert::TryFrom;
use std::f64::consts::PI;
use std::fmt;

use itertools::iproduct;
use log::trace;
use nalgebra::{Matrix3, Point3, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shortest allowed lattice vector of a generated cell, in Angstroms
const MIN_VECTOR: f64 = 1.2;
/// Largest allowed ratio between the longest and shortest lattice vectors
const MAX_RATIO: f64 = 10.;
const MIN_ANGLE: f64 = PI / 6.;
const MAX_ANGLE: f64 = 5. * PI / 6.;
const MAX_ATTEMPTS: usize = 100;
/// Distances beyond this are never compared, it bounds the number of periodic images searched
const CUTOFF: f64 = 4.;

/// The different lattice types that can be represented
///
/// The lattice type constrains the degrees of freedom of the unit cell, fixing angles to 90 or
/// 120 degrees and forcing lengths to be equal. The `Spherical` type is used for clusters where
/// there is no periodicity and points are placed within a sphere.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatticeType {
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Tetragonal,
    Hexagonal,
    Cubic,
    Spherical,
}


/// Which axes of the cell repeat periodically
///
/// This replaces having separate generators for bulk crystals, layers, rods and clusters. A layer
/// can have a fixed thickness along the non-periodic c axis, and a rod a fixed cross-sectional
/// area perpendicular to the periodic c axis.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Periodicity {
    pub pbc: [bool; 3],
    pub thickness: Option<f64>,
    pub area: Option<f64>,
}

impl Default for Periodicity {
    fn default() -> Self {
        Self::bulk()
    }
}

impl Periodicity {
    pub fn bulk() -> Self {
        Self {
            pbc: [true, true, true],
            thickness: None,
            area: None,
        }
    }

    pub fn layer(thickness: Option<f64>) -> Self {
        Self {
            pbc: [true, true, false],
            thickness,
            area: None,
        }
    }

    pub fn rod(area: Option<f64>) -> Self {
        Self {
            pbc: [false, false, true],
            thickness: None,
            area,
        }
    }

    pub fn cluster() -> Self {
        Self {
            pbc: [false, false, false],
            thickness: None,
            area: None,
        }
    }

    pub fn from_dimension(dimension: usize) -> Self {
        match dimension {
            3 => Self::bulk(),
            2 => Self::layer(None),
            1 => Self::rod(None),
            _ => Self::cluster(),
        }
    }

    /// The number of periodic axes
    pub fn dimension(&self) -> usize {
        self.pbc.iter().filter(|&&p| p).count()
    }

    /// A layer thin enough that every point is pinned to the plane z = 0
    pub fn is_planar(&self) -> bool {
        !self.pbc[2] && self.thickness.map_or(false, |t| t < 0.1)
    }
}

/// The values which completely describe a lattice, used for serialisation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeParameters {
    pub lattice_type: LatticeType,
    pub periodicity: Periodicity,
    pub lengths: [f64; 3],
    /// The angles alpha, beta, gamma in degrees
    pub angles: [f64; 3],
    pub allow_volume_reset: bool,
}

/// The unit cell containing the structure
///
/// The cell is stored as a matrix where each column is one of the lattice vectors, so that
/// multiplying a fractional coordinate gives the Cartesian position. A lattice generated from a
/// volume can be redrawn with [`Lattice::reset_matrix`], while one that was supplied from outside
/// is fixed.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "LatticeParameters", try_from = "LatticeParameters")]
pub struct Lattice {
    lattice_type: LatticeType,
    periodicity: Periodicity,
    lengths: Vector3<f64>,
    angles: Vector3<f64>,
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
    shifts: Vec<Vector3<f64>>,
    volume: f64,
    allow_volume_reset: bool,
}

impl From<Lattice> for LatticeParameters {
    fn from(lattice: Lattice) -> Self {
        let lengths = lattice.lengths;
        let angles = lattice.angles.map(f64::to_degrees);
        LatticeParameters {
            lattice_type: lattice.lattice_type,
            periodicity: lattice.periodicity,
            lengths: [lengths.x, lengths.y, lengths.z],
            angles: [angles.x, angles.y, angles.z],
            allow_volume_reset: lattice.allow_volume_reset,
        }
    }
}

impl TryFrom<LatticeParameters> for Lattice {
    type Error = Error;

    fn try_from(parameters: LatticeParameters) -> Result<Self> {
        let mut lattice = Lattice::from_parameters(
            parameters.lattice_type,
            parameters.lengths,
            parameters.angles,
            parameters.periodicity,
        )?;
        lattice.allow_volume_reset = parameters.allow_volume_reset;
        Ok(lattice)
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Lattice {{ a: {:.4}, b: {:.4}, c: {:.4}, alpha: {:.2}, beta: {:.2}, gamma: {:.2} }}",
            self.lengths.x,
            self.lengths.y,
            self.lengths.z,
            self.angles.x.to_degrees(),
            self.angles.y.to_degrees(),
            self.angles.z.to_degrees(),
        )
    }
}

/// Build the matrix with lattice vectors as columns
///
/// The a vector lies along x, and b lies in the xy plane. `None` is returned when the angles
/// cannot form a cell.
///
fn cell_matrix(lengths: &Vector3<f64>, angles: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let (a, b, c) = (lengths.x, lengths.y, lengths.z);
    let (cos_alpha, cos_beta, cos_gamma) = (angles.x.cos(), angles.y.cos(), angles.z.cos());
    let sin_gamma = angles.z.sin();

    if a <= 0. || b <= 0. || c <= 0. || sin_gamma.abs() < 1e-6 {
        return None;
    }

    let c_x = c * cos_beta;
    let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
    let c_z_squared = c * c - c_x * c_x - c_y * c_y;
    if c_z_squared <= 1e-8 {
        return None;
    }

    #[rustfmt::skip]
    let matrix = Matrix3::new(
        a, b * cos_gamma, c_x,
        0., b * sin_gamma, c_y,
        0., 0., c_z_squared.sqrt(),
    );
    Some(matrix)
}

/// A cell with unit lengths and the angles of the lattice type
///
/// Symmetry operations share their Cartesian form between every cell of the same lattice type,
/// so this is used to convert the site symmetry of a position into rotations of a molecule.
///
pub fn reference_matrix(lattice_type: LatticeType) -> Matrix3<f64> {
    match lattice_type {
        LatticeType::Hexagonal => {
            let angles = Vector3::new(PI / 2., PI / 2., 2. * PI / 3.);
            cell_matrix(&Vector3::repeat(1.), &angles).unwrap_or_else(Matrix3::identity)
        }
        _ => Matrix3::identity(),
    }
}

/// The volume of a cell with unit lengths and the given angles
fn angle_factor(angles: &Vector3<f64>) -> f64 {
    let (ca, cb, cg) = (angles.x.cos(), angles.y.cos(), angles.z.cos());
    let value = 1. - ca * ca - cb * cb - cg * cg + 2. * ca * cb * cg;
    if value > 0. {
        value.sqrt()
    } else {
        0.
    }
}

/// Draw random cell parameters with the given volume
///
/// Returns `None` when the drawn parameters violate the restrictions on the shape of the cell,
/// in which case the caller should draw again.
///
fn random_parameters<R: Rng + ?Sized>(
    lattice_type: LatticeType,
    volume: f64,
    periodicity: &Periodicity,
    rng: &mut R,
) -> Option<(Vector3<f64>, Vector3<f64>)> {
    let right = PI / 2.;
    let angles = match lattice_type {
        LatticeType::Triclinic => Vector3::new(
            rng.gen_range(MIN_ANGLE..MAX_ANGLE),
            rng.gen_range(MIN_ANGLE..MAX_ANGLE),
            rng.gen_range(MIN_ANGLE..MAX_ANGLE),
        ),
        LatticeType::Monoclinic => Vector3::new(right, rng.gen_range(MIN_ANGLE..MAX_ANGLE), right),
        LatticeType::Hexagonal => Vector3::new(right, right, 2. * PI / 3.),
        _ => Vector3::new(right, right, right),
    };

    let mut ratios = Vector3::new(
        rng.gen_range(0.5..2.0),
        rng.gen_range(0.5..2.0),
        rng.gen_range(0.5..2.0),
    );
    match lattice_type {
        LatticeType::Tetragonal | LatticeType::Hexagonal => ratios.y = ratios.x,
        LatticeType::Cubic | LatticeType::Spherical => ratios = Vector3::repeat(1.),
        _ => (),
    }

    let factor = angle_factor(&angles);
    if factor < 0.1 {
        return None;
    }

    let lengths = match (periodicity.thickness, periodicity.area) {
        // The sphere containing the points has the requested volume
        _ if lattice_type == LatticeType::Spherical => {
            Vector3::repeat(f64::cbrt(6. * volume / PI))
        }
        // A layer with the c axis fixed to the thickness
        (Some(thickness), _) if !periodicity.pbc[2] => {
            // Planar layers have every point at z = 0, so the length of c only needs to be valid
            let c = if periodicity.is_planar() { 1. } else { thickness };
            let ratio = ratios.y / ratios.x;
            let a = f64::sqrt(volume / (c * factor * ratio));
            Vector3::new(a, ratio * a, c)
        }
        // A rod with the cross section in the ab plane fixed
        (_, Some(area)) if !periodicity.pbc[0] && !periodicity.pbc[1] => {
            let ratio = ratios.y / ratios.x;
            let a = f64::sqrt(area / (angles.z.sin() * ratio));
            let b = ratio * a;
            Vector3::new(a, b, volume / (a * b * factor))
        }
        _ => {
            let scale = f64::cbrt(volume / (ratios.x * ratios.y * ratios.z * factor));
            ratios * scale
        }
    };

    // The fixed thickness of a layer is excluded from the checks on the shape
    let free: Vec<f64> = (0..3)
        .filter(|&axis| !(axis == 2 && periodicity.thickness.is_some() && !periodicity.pbc[2]))
        .map(|axis| lengths[axis])
        .collect();
    let shortest = free.iter().cloned().fold(f64::MAX, f64::min);
    let longest = free.iter().cloned().fold(f64::MIN, f64::max);

    if shortest < MIN_VECTOR || longest / shortest > MAX_RATIO {
        return None;
    }
    Some((lengths, angles))
}

impl Lattice {
    /// Generate a random lattice with the given volume
    ///
    /// The shape of the cell is drawn at random subject to the constraints of the lattice type,
    /// with lattice vectors no shorter than 1.2 Angstroms and no more than 10 times longer than
    /// each other. An error is returned if no valid cell is found within 100 draws.
    ///
    pub fn from_volume<R: Rng + ?Sized>(
        lattice_type: LatticeType,
        volume: f64,
        periodicity: Periodicity,
        rng: &mut R,
    ) -> Result<Lattice> {
        if !(volume > 0.) {
            return Err(Error::Lattice(format!("Volume must be positive, found {}", volume)));
        }
        for _ in 0..MAX_ATTEMPTS {
            if let Some((lengths, angles)) =
                random_parameters(lattice_type, volume, &periodicity, rng)
            {
                if let Some(matrix) = cell_matrix(&lengths, &angles) {
                    let mut lattice = Lattice::from_matrix(lattice_type, lengths, angles, matrix)?;
                    lattice.periodicity = periodicity;
                    lattice.allow_volume_reset = true;
                    lattice.update_shifts();
                    return Ok(lattice);
                }
            }
        }
        Err(Error::Lattice(format!(
            "No valid {:?} cell with volume {:.3} after {} attempts",
            lattice_type, volume, MAX_ATTEMPTS
        )))
    }

    /// Create a lattice from known cell parameters
    ///
    /// The lengths are in Angstroms and the angles in degrees. A lattice created this way is
    /// fixed and will not be redrawn during the search.
    ///
    /// ```
    /// use crystal_generator::{Lattice, LatticeType, Periodicity};
    /// let lattice = Lattice::from_parameters(
    ///     LatticeType::Cubic, [4., 4., 4.], [90., 90., 90.], Periodicity::bulk()
    /// ).unwrap();
    /// assert!((lattice.volume() - 64.).abs() < 1e-8);
    /// assert!(!lattice.allow_volume_reset());
    /// ```
    ///
    pub fn from_parameters(
        lattice_type: LatticeType,
        lengths: [f64; 3],
        angles: [f64; 3],
        periodicity: Periodicity,
    ) -> Result<Lattice> {
        let lengths = Vector3::new(lengths[0], lengths[1], lengths[2]);
        let angles = Vector3::new(angles[0], angles[1], angles[2]).map(f64::to_radians);
        let matrix = cell_matrix(&lengths, &angles).ok_or_else(|| {
            Error::Lattice(format!(
                "Invalid cell parameters, lengths: {:?}, angles: {:?}",
                lengths, angles
            ))
        })?;
        let mut lattice = Lattice::from_matrix(lattice_type, lengths, angles, matrix)?;
        lattice.periodicity = periodicity;
        lattice.update_shifts();
        Ok(lattice)
    }

    fn from_matrix(
        lattice_type: LatticeType,
        lengths: Vector3<f64>,
        angles: Vector3<f64>,
        matrix: Matrix3<f64>,
    ) -> Result<Lattice> {
        let inverse = matrix
            .try_inverse()
            .ok_or_else(|| Error::Lattice(String::from("Cell matrix is singular")))?;
        Ok(Lattice {
            lattice_type,
            periodicity: Periodicity::bulk(),
            lengths,
            angles,
            matrix,
            inverse,
            shifts: Vec::new(),
            volume: matrix.determinant().abs(),
            allow_volume_reset: false,
        })
    }

    /// Redraw the shape of the cell while keeping the volume
    ///
    /// This does nothing for a lattice which was supplied from outside.
    ///
    pub fn reset_matrix<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        if !self.allow_volume_reset {
            return Ok(());
        }
        let new = Lattice::from_volume(self.lattice_type, self.volume, self.periodicity, rng)?;
        trace!("Reset lattice from {} to {}", self, new);
        *self = new;
        Ok(())
    }

    /// Compute the translations to periodic images within the cutoff distance
    fn update_shifts(&mut self) {
        let shells: Vec<i64> = (0..3)
            .map(|axis| {
                if self.periodicity.pbc[axis] {
                    // The spacing between lattice planes is the inverse of the norm of the
                    // corresponding row of the inverse matrix.
                    let spacing = 1. / self.inverse.row(axis).norm();
                    i64::min(f64::ceil(CUTOFF / spacing) as i64, 3).max(1)
                } else {
                    0
                }
            })
            .collect();
        self.shifts = iproduct!(
            -shells[0]..=shells[0],
            -shells[1]..=shells[1],
            -shells[2]..=shells[2]
        )
        .map(|(x, y, z)| Vector3::new(x as f64, y as f64, z as f64))
        .collect();
    }

    pub fn lattice_type(&self) -> LatticeType {
        self.lattice_type
    }

    pub fn periodicity(&self) -> &Periodicity {
        &self.periodicity
    }

    /// Override the periodic axes, used when a supplied lattice doesn't match the group
    pub fn set_periodicity(&mut self, periodicity: Periodicity) {
        self.periodicity = periodicity;
        self.update_shifts();
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn lengths(&self) -> Vector3<f64> {
        self.lengths
    }

    /// The cell angles in radians
    pub fn angles(&self) -> Vector3<f64> {
        self.angles
    }

    pub fn allow_volume_reset(&self) -> bool {
        self.allow_volume_reset
    }

    /// Sample a random fractional coordinate within the cell
    ///
    /// Periodic axes are sampled from [0, 1) and non-periodic axes from [-0.5, 0.5), centring
    /// finite structures on the origin. Spherical cells are sampled uniformly within the sphere
    /// inscribed in the cell.
    ///
    pub fn generate_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3<f64> {
        if self.lattice_type == LatticeType::Spherical {
            loop {
                let point = Vector3::new(
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                );
                if point.norm() < 0.5 {
                    return Point3::from(point);
                }
            }
        }
        let mut point = Point3::new(rng.gen(), rng.gen(), rng.gen());
        for axis in 0..3 {
            if !self.periodicity.pbc[axis] {
                point[axis] -= 0.5;
            }
        }
        if self.periodicity.is_planar() {
            point.z = 0.;
        }
        point
    }

    /// Convert a point in fractional coordinates to Cartesian coordinates
    ///
    /// ```
    /// use crystal_generator::{Lattice, LatticeType, Periodicity};
    /// use nalgebra::Point3;
    /// let lattice = Lattice::from_parameters(
    ///     LatticeType::Cubic, [8., 8., 8.], [90., 90., 90.], Periodicity::bulk()
    /// ).unwrap();
    /// let point = lattice.to_cartesian(&Point3::new(0.5, 0.5, 0.25));
    /// assert!((point - Point3::new(4., 4., 2.)).norm() < 1e-12);
    /// ```
    ///
    pub fn to_cartesian(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.matrix * point.coords)
    }

    pub fn to_fractional(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.inverse * point.coords)
    }

    /// Move a point into the cell along each periodic axis
    pub fn wrap(&self, point: &Point3<f64>) -> Point3<f64> {
        let mut wrapped = *point;
        for axis in 0..3 {
            if self.periodicity.pbc[axis] {
                wrapped[axis] -= wrapped[axis].floor();
            }
        }
        wrapped
    }

    /// The translations to neighbouring cells, optionally including the zero translation
    pub fn periodic_shifts(&self, zero: bool) -> impl Iterator<Item = &Vector3<f64>> + '_ {
        self.shifts
            .iter()
            .filter(move |shift| zero || shift.iter().any(|&v| v != 0.))
    }

    /// The shortest distance between `a` and any periodic copy of `b`
    pub fn distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.separation(a, b, true)
    }

    /// The shortest Cartesian distance between `a` and the periodic copies of `b`
    ///
    /// When `zero` is true the difference is first reduced to the nearest image and all copies
    /// are searched. When it is false the points are taken as belonging to the same rigid body,
    /// their difference is used as is, and only copies in other cells are considered.
    ///
    pub fn separation(&self, a: &Point3<f64>, b: &Point3<f64>, zero: bool) -> f64 {
        let mut difference = a - b;
        if zero {
            for axis in 0..3 {
                if self.periodicity.pbc[axis] {
                    difference[axis] -= difference[axis].round();
                }
            }
        }
        self.periodic_shifts(zero)
            .map(|shift| (self.matrix * (difference + shift)).norm())
            .fold(f64::INFINITY, f64::min)
    }

    /// Check the symmetry copies of a point are separated by at least the tolerance
    ///
    /// The first point is compared with each of the others and with its own periodic copies.
    ///
    pub fn check_images(&self, points: &[Point3<f64>], tolerance: f64) -> bool {
        let first = match points.first() {
            Some(p) => p,
            None => return true,
        };
        if self.separation(first, first, false) < tolerance {
            return false;
        }
        points
            .iter()
            .skip(1)
            .all(|point| self.distance(first, point) >= tolerance)
    }
}
