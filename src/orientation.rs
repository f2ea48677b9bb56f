//
// orientation.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::f64::consts::PI;
use std::sync::Arc;

use log::trace;
use nalgebra::Point3;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::molecule::{Molecule, Orientation};
use crate::placement::{Environment, SearchContext};
use crate::site::MolSite;
use crate::wyckoff::WyckoffPosition;

/// Refinement stops early once the separation ratio is above this value and every check passes
const ACCEPTANCE: f64 = 0.8;

/// Find an orientation of a molecule which keeps its symmetry images apart
///
/// One of the allowed orientations is chosen at random and randomised within its freedom. When
/// that isn't enough, the rotation angle is refined by bisection over half a turn, moving towards
/// whichever end of the bracket keeps the atoms further apart. `None` means no acceptable
/// orientation was found within the budget.
///
pub fn refine<R: Rng + ?Sized>(
    molecule: &Arc<Molecule>,
    entity: usize,
    position: &WyckoffPosition,
    point: Point3<f64>,
    orientations: &[Orientation],
    env: &Environment,
    ctx: &mut SearchContext<R>,
) -> Option<MolSite> {
    let mut orientation = orientations.choose(&mut *ctx.rng)?.clone();
    orientation.randomize(true, &mut *ctx.rng);

    let mut site = MolSite {
        entity,
        molecule: Arc::clone(molecule),
        wyckoff: position.clone(),
        position: point,
        orientation,
    };
    if site.check_distances(env.lattice, env.tolerance) {
        return Some(site);
    }
    if molecule.len() <= 1 || site.orientation.degrees() == 0 {
        return None;
    }

    let evaluate = |site: &mut MolSite, angle: f64| {
        site.orientation.set_angle(angle);
        site.separation_ratio(env.lattice, env.tolerance)
    };

    let mut lower = site.orientation.angle();
    let mut upper = lower + PI;
    let mut value_lower = evaluate(&mut site, lower);
    let mut value_upper = evaluate(&mut site, upper);
    // The site is left at the upper end, which is checked first
    let mut value = value_upper;

    for _ in 0..ctx.budget.orientation {
        if value > ACCEPTANCE && site.check_distances(env.lattice, env.tolerance) {
            trace!(
                "Refined orientation of {} to angle {:.3}",
                molecule.name,
                site.orientation.angle()
            );
            return Some(site);
        }
        let middle = 0.5 * (lower + upper);
        value = evaluate(&mut site, middle);
        if value_lower > value_upper {
            upper = middle;
            value_upper = value;
        } else {
            lower = middle;
            value_lower = value;
        }
    }
    None
}
