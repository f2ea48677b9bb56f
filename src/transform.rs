//
// transform.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;
use std::ops::Mul;

#[cfg(test)]
use approx::AbsDiffEq;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A symmetry operation acting on fractional coordinates
///
/// The operation is made up of a 'rotation' component, which is in quotes since the matrix also
/// holds mirrors, inversions and, for special Wyckoff positions, projections onto a plane, line
/// or point. This is followed by a translation. Both are stored together as a homogeneous matrix.
///
/// ```
/// use crystal_generator::Transform3;
/// use nalgebra::Point3;
/// let t = Transform3::from_operations("-x, -y, z+1/2").unwrap();
/// assert_eq!(t * Point3::new(0.25, 0.5, 0.125), Point3::new(-0.25, -0.5, 0.625));
/// ```
///
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform3(nalgebra::Transform3<f64>);

impl From<Matrix4<f64>> for Transform3 {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self(nalgebra::Transform3::from_matrix_unchecked(matrix))
    }
}

#[cfg(test)]
impl AbsDiffEq for Transform3 {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.0.abs_diff_eq(&other.0, epsilon)
    }
}

binop_impl_all!(
    Mul, mul;
    self: Transform3, rhs: Point3<f64>, Output = Point3<f64>;
    [ref ref] => {
        self.0 * rhs
    };
);

binop_impl_all!(
    Mul, mul;
    self: Transform3, rhs: Transform3, Output = Transform3;
    [ref ref] => {
        Transform3(self.0 * rhs.0)
    };
);

impl fmt::Display for Transform3 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_operations())
    }
}

impl Transform3 {
    pub fn identity() -> Self {
        Self(nalgebra::Transform3::identity())
    }

    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        for i in 0..3 {
            for j in 0..3 {
                matrix[(i, j)] = rotation[(i, j)];
            }
            matrix[(i, 3)] = translation[i];
        }
        Self::from(matrix)
    }

    /// The linear part of the operation
    pub fn rotation(&self) -> Matrix3<f64> {
        let matrix = self.0.matrix();
        Matrix3::from_fn(|i, j| matrix[(i, j)])
    }

    pub fn translation(&self) -> Vector3<f64> {
        let matrix = self.0.matrix();
        Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
    }

    /// Whether the operation has any non-zero linear component
    ///
    /// An operation which is purely a translation, like `0,1/2,0`, pins the point it is applied
    /// to, while any operation containing `x`, `y` or `z` leaves some continuous freedom.
    ///
    pub fn has_rotation(&self) -> bool {
        self.rotation().iter().any(|v| v.abs() > 1e-8)
    }

    /// Convert the string representation of a symmetry operation into a transform
    ///
    /// Each of the three comma separated components is a signed sum of the variables `x`, `y`,
    /// `z` (optionally with an integer coefficient, as in `2x`) and rational constants such as
    /// `1/2` or `-3/4`. Surrounding braces and whitespace are ignored.
    ///
    /// ```
    /// use crystal_generator::Transform3;
    /// let t = Transform3::from_operations("(-y, x-y, z+1/3)").unwrap();
    /// assert_eq!(t.as_operations(), "-y,x-y,z+1/3");
    /// ```
    ///
    pub fn from_operations(sym_ops: &str) -> Result<Transform3> {
        let invalid = |reason: String| Error::InvalidOperation {
            operation: sym_ops.to_string(),
            reason,
        };

        let braces: &[_] = &['(', ')'];
        let operations: Vec<&str> = sym_ops
            .trim()
            // Remove braces from front and back
            .trim_matches(braces)
            .split_terminator(',')
            .collect();

        match operations.len() {
            x if x < 3 => return Err(invalid("Not enough dimensions in input".into())),
            x if x > 3 => return Err(invalid("Too many dimensions in input".into())),
            _ => (),
        }

        let mut transform: Matrix4<f64> = Matrix4::zeros();
        transform[(3, 3)] = 1.;

        for (index, op) in operations.iter().enumerate() {
            let (coefficients, constant) = parse_component(op).map_err(invalid)?;
            if coefficients.iter().all(|&c| c == 0.) && op.trim().is_empty() {
                return Err(invalid(format!("Component {} is empty", index)));
            }
            for (axis, value) in coefficients.iter().enumerate() {
                transform[(index, axis)] = *value;
            }
            transform[(index, 3)] = constant;
        }
        Ok(Transform3::from(transform))
    }

    /// The string form of the operation, the inverse of [`Transform3::from_operations`]
    pub fn as_operations(&self) -> String {
        let rotation = self.rotation();
        let translation = self.translation();
        (0..3)
            .map(|row| {
                let mut component = String::new();
                for (axis, name) in ['x', 'y', 'z'].iter().enumerate() {
                    let value = rotation[(row, axis)];
                    if value.abs() < 1e-8 {
                        continue;
                    }
                    if value < 0. {
                        component.push('-');
                    } else if !component.is_empty() {
                        component.push('+');
                    }
                    if (value.abs() - 1.).abs() > 1e-8 {
                        component.push_str(&format_fraction(value.abs()));
                    }
                    component.push(*name);
                }
                let constant = translation[row];
                if constant.abs() > 1e-8 {
                    if constant < 0. {
                        component.push('-');
                    } else if !component.is_empty() {
                        component.push('+');
                    }
                    component.push_str(&format_fraction(constant.abs()));
                }
                if component.is_empty() {
                    component.push('0');
                }
                component
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Write a positive value as the simplest fraction with a crystallographic denominator
fn format_fraction(value: f64) -> String {
    for &denominator in &[1_u32, 2, 3, 4, 6, 8, 12] {
        let numerator = value * f64::from(denominator);
        if (numerator - numerator.round()).abs() < 1e-6 {
            return match denominator {
                1 => format!("{}", numerator.round()),
                _ => format!("{}/{}", numerator.round(), denominator),
            };
        }
    }
    format!("{:.6}", value)
}

/// Parse a single component of a symmetry operation into variable coefficients and a constant
fn parse_component(op: &str) -> std::result::Result<([f64; 3], f64), String> {
    let mut coefficients = [0.; 3];
    let mut constant = 0.;
    let mut sign = 1.;
    let mut chars = op.chars().filter(|c| !c.is_whitespace()).peekable();

    while let Some(c) = chars.next() {
        match c {
            '+' => sign = 1.,
            '-' => sign = -1.,
            'x' | 'y' | 'z' => {
                coefficients[axis_index(c)] += sign;
                sign = 1.;
            }
            '0'..='9' | '.' => {
                let mut digits = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        digits.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let mut value: f64 = digits
                    .parse()
                    .map_err(|_| format!("Invalid number '{}'", digits))?;

                if chars.peek() == Some(&'/') {
                    chars.next();
                    let mut denominator = String::new();
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_digit() {
                            denominator.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let denominator: f64 = denominator
                        .parse()
                        .map_err(|_| String::from("Missing denominator"))?;
                    if denominator == 0. {
                        return Err(String::from("Division by zero"));
                    }
                    value /= denominator;
                }

                match chars.peek() {
                    // A coefficient of one of the variables, like 2x
                    Some(&axis) if matches!(axis, 'x' | 'y' | 'z') => {
                        chars.next();
                        coefficients[axis_index(axis)] += sign * value;
                    }
                    _ => constant += sign * value,
                }
                sign = 1.;
            }
            x => return Err(format!("Found invalid value: '{}'", x)),
        }
    }
    Ok((coefficients, constant))
}

fn axis_index(axis: char) -> usize {
    match axis {
        'x' => 0,
        'y' => 1,
        _ => 2,
    }
}
